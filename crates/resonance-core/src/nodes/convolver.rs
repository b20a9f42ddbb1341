//! Fixed impulse-response convolution as a graph node.

use crate::convolve::BlockConvolver;
use crate::graph::node::{NodeBehavior, ProcessContext};
use crate::graph::property::PropertyTable;

/// Mono-in, mono-out block convolution against a fixed impulse response set
/// at construction time (short responses only — for long HRTF-style
/// responses use [`crate::nodes::hrtf_panner::HrtfPannerNode`] instead,
/// which is built on [`crate::convolve::FftConvolver`]).
pub struct ConvolverNode {
    convolver: BlockConvolver,
}

impl ConvolverNode {
    /// No tunable properties; the response is fixed at construction.
    pub fn properties() -> PropertyTable {
        PropertyTable::new()
    }

    /// Creates a convolver processing `block_size`-sample blocks against
    /// `response`.
    pub fn new(block_size: usize, response: &[f32]) -> Self {
        let mut convolver = BlockConvolver::new(block_size);
        convolver.set_response(response);
        Self { convolver }
    }
}

impl NodeBehavior for ConvolverNode {
    fn process(&mut self, ctx: &mut ProcessContext<'_>) {
        let Some(input) = ctx.inputs.first().and_then(|i| i.first()) else { return };
        let Some(output) = ctx.outputs.first_mut().and_then(|o| o.first_mut()) else { return };
        self.convolver.convolve(input, output);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Simulation;

    struct Impulse;
    impl NodeBehavior for Impulse {
        fn process(&mut self, ctx: &mut ProcessContext<'_>) {
            ctx.outputs[0][0][0] = 1.0;
        }
    }

    #[test]
    fn convolver_reproduces_impulse_response() {
        let sim = Simulation::new(48_000.0, 8);
        let src = sim.create_node("impulse", Box::new(Impulse), &[], &[1], PropertyTable::new());
        let conv = sim.create_node(
            "convolver",
            Box::new(ConvolverNode::new(8, &[0.0, 0.5, 0.25])),
            &[1],
            &[1],
            ConvolverNode::properties(),
        );
        sim.connect(src, 0, conv, 0).unwrap();
        sim.set_output_node(conv);
        let block = sim.render_block(conv, 1);
        assert!((block[0][1] - 0.5).abs() < 1e-5);
        assert!((block[0][2] - 0.25).abs() < 1e-5);
    }
}
