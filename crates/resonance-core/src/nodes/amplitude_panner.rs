//! Equal-power amplitude panning as a graph node.

use crate::graph::node::{NodeBehavior, ProcessContext};
use crate::graph::property::{PropertyRange, PropertyTable, PropertyValue};
use crate::panner::AmplitudePanner;

/// Property tag: azimuth in degrees, `0` = front, positive = clockwise.
/// Not clamped — azimuth wraps rather than saturates.
pub const AZIMUTH: &str = "azimuth";
/// Property tag: elevation in degrees above (positive) or below (negative)
/// the horizontal plane. Clamped to `[-90, 90]`.
pub const ELEVATION: &str = "elevation";

/// Pans a mono input to `channel_count` output channels by equal-power
/// amplitude panning.
pub struct AmplitudePannerNode {
    panner: AmplitudePanner,
}

impl AmplitudePannerNode {
    /// Builds the property table: `azimuth` (float, unranged — wraps mod
    /// 360 internally rather than clamping) and `elevation` (float,
    /// clamped to `[-90, 90]`).
    pub fn properties() -> PropertyTable {
        let mut table = PropertyTable::new();
        table.declare(AZIMUTH, PropertyValue::Float(0.0));
        table.declare_ranged(ELEVATION, PropertyValue::Float(0.0), PropertyRange::Continuous { min: -90.0, max: 90.0 });
        table
    }

    /// Creates a panner driving `channel_count` output channels.
    pub fn new(channel_count: usize) -> Self {
        Self { panner: AmplitudePanner::new(channel_count) }
    }
}

impl NodeBehavior for AmplitudePannerNode {
    fn process(&mut self, ctx: &mut ProcessContext<'_>) {
        let azimuth = ctx.properties.get(AZIMUTH).ok().and_then(|p| p.value().as_float()).unwrap_or(0.0);
        let elevation = ctx.properties.get(ELEVATION).ok().and_then(|p| p.value().as_float()).unwrap_or(0.0);
        self.panner.set_azimuth(azimuth);
        self.panner.set_elevation(elevation);
        let Some(input) = ctx.inputs.first().and_then(|i| i.first()) else { return };
        let Some(output) = ctx.outputs.first_mut() else { return };
        self.panner.pan_block(input, output);
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
    fn panner_routes_hard_left() {
        let sim = Simulation::new(48_000.0, 4);
        let src = sim.create_node("src", Box::new(ConstSource(1.0)), &[], &[1], PropertyTable::new());
        let pan = sim.create_node("pan", Box::new(AmplitudePannerNode::new(2)), &[1], &[2], AmplitudePannerNode::properties());
        sim.connect(src, 0, pan, 0).unwrap();
        sim.set_property(pan, AZIMUTH, PropertyValue::Float(-90.0)).unwrap();
        sim.set_output_node(pan);
        let block = sim.render_block(pan, 2);
        assert!(block[0][0] > 0.99);
        assert!(block[1][0] < 0.01);
    }
}
