//! The environment's weak-referenced source bookkeeping.

use std::sync::Weak;

use crate::effect_send::EffectSendSlot;
use crate::source::SourceShared;

/// Shared between an [`crate::Environment`] handle and its
/// [`crate::environment::EnvironmentNode`]: every currently-live source
/// (weakly, so a dropped [`crate::Source`] is simply pruned rather than
/// kept alive) plus the registered effect sends.
pub(crate) struct EnvironmentRegistry {
    pub sources: Vec<Weak<SourceShared>>,
    pub effect_sends: Vec<EffectSendSlot>,
}

impl EnvironmentRegistry {
    pub fn new() -> Self {
        Self { sources: Vec::new(), effect_sends: Vec::new() }
    }

    /// Drops dead weak references, returning the still-alive sources.
    pub fn live_sources(&mut self) -> Vec<std::sync::Arc<SourceShared>> {
        let mut alive = Vec::with_capacity(self.sources.len());
        self.sources.retain(|weak| match weak.upgrade() {
            Some(strong) => {
                alive.push(strong);
                true
            }
            None => false,
        });
        alive
    }
}
