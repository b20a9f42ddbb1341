//! Binaural HRTF panning as a graph node.

use crate::graph::node::{NodeBehavior, ProcessContext};
use crate::graph::property::{PropertyRange, PropertyTable, PropertyValue};
use crate::hrtf::HrtfData;
use crate::panner::HrtfPanner;
use std::sync::Arc;

/// Property tag: azimuth in degrees. Not clamped — wraps via the
/// underlying dataset's angular lookup.
pub const AZIMUTH: &str = "azimuth";
/// Property tag: elevation in degrees, clamped to `[-90, 90]`.
pub const ELEVATION: &str = "elevation";

/// Pans a mono input to stereo output via HRTF convolution, crossfading
/// between impulse responses as direction changes.
pub struct HrtfPannerNode {
    panner: HrtfPanner,
}

impl HrtfPannerNode {
    /// Builds the property table: `azimuth` (unranged) and `elevation`
    /// (`[-90, 90]`).
    pub fn properties() -> PropertyTable {
        let mut table = PropertyTable::new();
        table.declare(AZIMUTH, PropertyValue::Float(0.0));
        table.declare_ranged(ELEVATION, PropertyValue::Float(0.0), PropertyRange::Continuous { min: -90.0, max: 90.0 });
        table
    }

    /// Creates a panner against `data`, processing `block_size`-sample
    /// blocks at `sample_rate`, with `crossfade_seconds`-long direction
    /// transitions.
    pub fn new(data: Arc<HrtfData>, block_size: usize, sample_rate: f32, crossfade_seconds: f32) -> Self {
        Self { panner: HrtfPanner::new(data, block_size, sample_rate, crossfade_seconds) }
    }
}

impl NodeBehavior for HrtfPannerNode {
    fn process(&mut self, ctx: &mut ProcessContext<'_>) {
        let azimuth = ctx.properties.get(AZIMUTH).ok().and_then(|p| p.value().as_float()).unwrap_or(0.0);
        let elevation = ctx.properties.get(ELEVATION).ok().and_then(|p| p.value().as_float()).unwrap_or(0.0);
        self.panner.set_direction(azimuth, elevation);
        let Some(input) = ctx.inputs.first().and_then(|i| i.first()) else { return };
        let Some(output) = ctx.outputs.first_mut() else { return };
        if output.len() < 2 {
            return;
        }
        let (left, right) = output.split_at_mut(1);
        self.panner.process(input, &mut left[0], &mut right[0]);
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
    fn produces_stereo_output() {
        let sim = Simulation::new(44_100.0, 64);
        let data = Arc::new(HrtfData::default_dataset(44_100.0));
        let src = sim.create_node("src", Box::new(ConstSource(1.0)), &[], &[1], PropertyTable::new());
        let pan = sim.create_node(
            "hrtf",
            Box::new(HrtfPannerNode::new(data, 64, 44_100.0, 0.01)),
            &[1],
            &[2],
            HrtfPannerNode::properties(),
        );
        sim.connect(src, 0, pan, 0).unwrap();
        sim.set_output_node(pan);
        let block = sim.render_block(pan, 2);
        assert!(block[0].iter().any(|&s| s != 0.0) || block[1].iter().any(|&s| s != 0.0));
    }
}
