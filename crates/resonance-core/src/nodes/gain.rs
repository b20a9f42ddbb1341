//! Simple per-channel gain stage.

use crate::graph::node::{NodeBehavior, ProcessContext};
use crate::graph::property::{PropertyRange, PropertyTable, PropertyValue};

/// Property tag for the linear gain multiplier (0 = silence, 1 = unity).
pub const GAIN: &str = "gain";

/// Multiplies every channel of its single input by a `gain` property,
/// writing the result to its single output of the same channel count.
pub struct GainNode {
    channels: usize,
}

impl GainNode {
    /// Builds the property table a [`GainNode`] expects: `gain` (float,
    /// `[0, 16]`, default `1.0`).
    pub fn properties() -> PropertyTable {
        let mut table = PropertyTable::new();
        table.declare_ranged(GAIN, PropertyValue::Float(1.0), PropertyRange::Continuous { min: 0.0, max: 16.0 });
        table
    }

    /// Creates a gain node operating on `channels` channels.
    pub fn new(channels: usize) -> Self {
        Self { channels }
    }
}

impl NodeBehavior for GainNode {
    fn process(&mut self, ctx: &mut ProcessContext<'_>) {
        let gain = ctx.properties.get(GAIN).ok().and_then(|p| p.value().as_float()).unwrap_or(1.0);
        let Some(input) = ctx.inputs.first() else { return };
        let Some(output) = ctx.outputs.first_mut() else { return };
        for ch in 0..self.channels.min(input.len()).min(output.len()) {
            for (o, &i) in output[ch].iter_mut().zip(input[ch].iter()) {
                *o = i * gain;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Simulation;
    use crate::graph::node::NodeState;

    struct ConstSource(f32);
    impl NodeBehavior for ConstSource {
        fn process(&mut self, ctx: &mut ProcessContext<'_>) {
            for ch in ctx.outputs[0].iter_mut() {
                ch.fill(self.0);
            }
        }
    }

    #[test]
    fn gain_scales_input() {
        let sim = Simulation::new(48_000.0, 8);
        let source = sim.create_node("const_source", Box::new(ConstSource(2.0)), &[], &[1], PropertyTable::new());
        let gain = sim.create_node("gain", Box::new(GainNode::new(1)), &[1], &[1], GainNode::properties());
        sim.connect(source, 0, gain, 0).unwrap();
        sim.set_property(gain, GAIN, PropertyValue::Float(0.25)).unwrap();
        sim.set_output_node(gain);
        let block = sim.render_block(gain, 1);
        assert!(block[0].iter().all(|&s| (s - 0.5).abs() < 1e-6));
    }

    #[test]
    fn gain_is_clamped_to_range() {
        let sim = Simulation::new(48_000.0, 4);
        let gain = sim.create_node("gain", Box::new(GainNode::new(1)), &[1], &[1], GainNode::properties());
        sim.set_property(gain, GAIN, PropertyValue::Float(1000.0)).unwrap();
        assert_eq!(sim.get_property(gain, GAIN).unwrap(), PropertyValue::Float(16.0));
        sim.set_state(gain, NodeState::Paused).unwrap();
    }
}
