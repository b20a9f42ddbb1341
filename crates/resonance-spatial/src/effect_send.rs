//! Effect-send bus descriptors.

/// One registered effect-send bus on an [`crate::Environment`]: an
/// additional output channel group (beyond the fixed 8-channel main mix)
/// that sources can optionally feed via [`crate::Source::feed_effect`].
#[derive(Debug, Clone, Copy)]
pub struct EffectSendSlot {
    /// Stable id assigned at [`crate::Environment::add_effect_send`] time
    /// (0-based — see SPEC_FULL.md §6 on why this implementation does not
    /// reproduce the C ABI's 1-based external numbering).
    pub id: usize,
    /// Channel count, one of `{1,2,4,6,8}`.
    pub channels: usize,
    /// Whether this send is reverb-tagged (always 4 channels; see
    /// `Source::update`'s reverb-gain division across active reverb
    /// sends).
    pub is_reverb: bool,
    /// Whether every source created after this send existed (and every
    /// pre-existing source, applied once at registration time) should feed
    /// it automatically.
    pub connect_by_default: bool,
    /// The environment node's input slot index this send's buffers are
    /// gathered into.
    pub input_slot: usize,
}
