//! Strategy-dispatching panner: the node a source's subgraph actually owns.
//!
//! A multipanner holds both an [`crate::panner::AmplitudePanner`] sized to
//! its current output channel count and an [`crate::panner::HrtfPanner`],
//! and dispatches to whichever the `strategy` property selects. `Delegate`
//! is resolved to a concrete strategy (`Stereo` or `Surround*`, matching
//! the environment's current output channel count) before it ever reaches
//! this node — see the environment's per-block update — so `process` here
//! only ever sees a concrete choice.

use std::sync::Arc;

use crate::graph::node::{NodeBehavior, ProcessContext};
use crate::graph::property::{PropertyRange, PropertyTable, PropertyValue};
use crate::hrtf::HrtfData;
use crate::panner::{AmplitudePanner, HrtfPanner};

/// Property tag: panning strategy, one of the [`Strategy`] discriminants.
pub const STRATEGY: &str = "strategy";
/// Property tag: azimuth in degrees (not clamped).
pub const AZIMUTH: &str = "azimuth";
/// Property tag: elevation in degrees, clamped to `[-90, 90]` (used by the
/// `Hrtf` strategy only).
pub const ELEVATION: &str = "elevation";
/// Property tag: distance from the listener, in world units. Informational
/// only — the panning math here is direction-only; distance attenuation is
/// computed by the owning source and applied via its dry/reverb gain nodes,
/// not here. Kept as a property so a source's `update()` has one place to
/// write everything it derives per-block.
pub const DISTANCE: &str = "distance";
/// Property tag: final output multiplier, applied after panning.
pub const MUL: &str = "mul";

/// Panning strategy discriminants, as stored in the `strategy` property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i64)]
pub enum Strategy {
    /// Resolved elsewhere to `Stereo` or a `Surround*` strategy depending
    /// on the environment's current output channel count.
    Delegate = 0,
    /// Two-channel equal-power panning.
    Stereo = 1,
    /// Four-channel (quad) equal-power panning.
    Surround40 = 2,
    /// Six-channel (5.1) equal-power panning.
    Surround51 = 3,
    /// Eight-channel (7.1) equal-power panning.
    Surround71 = 4,
    /// Binaural HRTF convolution (always stereo output).
    Hrtf = 5,
}

impl Strategy {
    /// Maps a raw `strategy` property value to a `Strategy`, defaulting to
    /// `Delegate` for anything out of range.
    pub fn from_i64(v: i64) -> Self {
        match v {
            1 => Strategy::Stereo,
            2 => Strategy::Surround40,
            3 => Strategy::Surround51,
            4 => Strategy::Surround71,
            5 => Strategy::Hrtf,
            _ => Strategy::Delegate,
        }
    }

    /// The output channel count this strategy drives, or `None` for
    /// `Delegate`, which has no fixed channel count of its own.
    pub fn channel_count(self) -> Option<usize> {
        match self {
            Strategy::Delegate => None,
            Strategy::Stereo | Strategy::Hrtf => Some(2),
            Strategy::Surround40 => Some(4),
            Strategy::Surround51 => Some(6),
            Strategy::Surround71 => Some(8),
        }
    }
}

/// Dispatches a mono input to an amplitude or HRTF panner depending on the
/// `strategy` property.
pub struct MultipannerNode {
    amplitude: AmplitudePanner,
    hrtf: HrtfPanner,
}

impl MultipannerNode {
    /// Builds the property table: `strategy` (discrete `0..=5`, default
    /// `0` / `Delegate`), `azimuth`, `elevation`, `distance`, `mul`.
    pub fn properties() -> PropertyTable {
        let mut table = PropertyTable::new();
        table.declare_ranged(STRATEGY, PropertyValue::Int(0), PropertyRange::Discrete((0..=5).collect()));
        table.declare(AZIMUTH, PropertyValue::Float(0.0));
        table.declare_ranged(ELEVATION, PropertyValue::Float(0.0), PropertyRange::Continuous { min: -90.0, max: 90.0 });
        table.declare_ranged(DISTANCE, PropertyValue::Float(0.0), PropertyRange::Continuous { min: 0.0, max: f64::from(f32::MAX) });
        table.declare_ranged(MUL, PropertyValue::Float(1.0), PropertyRange::Continuous { min: 0.0, max: 16.0 });
        table
    }

    /// Creates a multipanner whose amplitude path currently drives
    /// `output_channels` channels (resized by the owner when the resolved
    /// strategy's channel count differs — see
    /// [`crate::graph::Graph::reconfigure`]) and whose HRTF path uses
    /// `hrtf_data` at `sample_rate`/`block_size`.
    pub fn new(output_channels: usize, hrtf_data: Arc<HrtfData>, block_size: usize, sample_rate: f32) -> Self {
        Self {
            amplitude: AmplitudePanner::new(output_channels.max(1)),
            hrtf: HrtfPanner::new(hrtf_data, block_size, sample_rate, 0.05),
        }
    }
}

impl NodeBehavior for MultipannerNode {
    fn process(&mut self, ctx: &mut ProcessContext<'_>) {
        let strategy =
            Strategy::from_i64(ctx.properties.get(STRATEGY).ok().and_then(|p| p.value().as_int()).unwrap_or(0));
        let azimuth = ctx.properties.get(AZIMUTH).ok().and_then(|p| p.value().as_float()).unwrap_or(0.0);
        let elevation = ctx.properties.get(ELEVATION).ok().and_then(|p| p.value().as_float()).unwrap_or(0.0);
        let mul = ctx.properties.get(MUL).ok().and_then(|p| p.value().as_float()).unwrap_or(1.0);

        let Some(input) = ctx.inputs.first().and_then(|i| i.first()) else { return };
        let Some(output) = ctx.outputs.first_mut() else { return };

        match strategy {
            Strategy::Hrtf => {
                if output.len() < 2 {
                    return;
                }
                self.hrtf.set_direction(azimuth, elevation);
                let (left, right) = output.split_at_mut(1);
                self.hrtf.process(input, &mut left[0], &mut right[0]);
            }
            Strategy::Delegate => {
                // No strategy resolved yet (should not reach process() in
                // practice since the owning environment resolves this
                // before the first tick); emit silence rather than guess.
                for ch in output.iter_mut() {
                    ch.fill(0.0);
                }
                return;
            }
            Strategy::Stereo | Strategy::Surround40 | Strategy::Surround51 | Strategy::Surround71 => {
                if self.amplitude.channel_count() != output.len() {
                    self.amplitude = AmplitudePanner::new(output.len());
                }
                self.amplitude.set_azimuth(azimuth);
                self.amplitude.set_elevation(elevation);
                self.amplitude.pan_block(input, output);
            }
        }

        if mul != 1.0 {
            for ch in output.iter_mut() {
                for s in ch.iter_mut() {
                    *s *= mul;
                }
            }
        }
    }

    fn reset(&mut self) {
        self.hrtf.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Simulation;

    struct ConstSource(f32);
    impl NodeBehavior for ConstSource {
        fn process(&mut self, ctx: &mut ProcessContext<'_>) {
            ctx.outputs[0][0].fill(self.0);
        }
    }

    #[test]
    fn stereo_strategy_pans_like_amplitude_panner() {
        let sim = Simulation::new(48_000.0, 4);
        let data = Arc::new(HrtfData::default_dataset(48_000.0));
        let src = sim.create_node("src", Box::new(ConstSource(1.0)), &[], &[1], PropertyTable::new());
        let pan = sim.create_node(
            "multipanner",
            Box::new(MultipannerNode::new(2, data, 4, 48_000.0)),
            &[1],
            &[2],
            MultipannerNode::properties(),
        );
        sim.connect(src, 0, pan, 0).unwrap();
        sim.set_property(pan, STRATEGY, PropertyValue::Int(Strategy::Stereo as i64)).unwrap();
        sim.set_property(pan, AZIMUTH, PropertyValue::Float(90.0)).unwrap();
        sim.set_output_node(pan);
        let block = sim.render_block(pan, 2);
        assert!(block[1][0] > 0.99);
    }

    #[test]
    fn delegate_strategy_emits_silence() {
        let sim = Simulation::new(48_000.0, 4);
        let data = Arc::new(HrtfData::default_dataset(48_000.0));
        let src = sim.create_node("src", Box::new(ConstSource(1.0)), &[], &[1], PropertyTable::new());
        let pan = sim.create_node(
            "multipanner",
            Box::new(MultipannerNode::new(2, data, 4, 48_000.0)),
            &[1],
            &[2],
            MultipannerNode::properties(),
        );
        sim.connect(src, 0, pan, 0).unwrap();
        sim.set_output_node(pan);
        let block = sim.render_block(pan, 2);
        assert!(block[0].iter().all(|&s| s == 0.0));
    }
}
