//! The output adapter: pulls fixed-size blocks from a
//! [`resonance_core::graph::Simulation`] and feeds them to whatever
//! [`AudioBackend`](crate::backend::AudioBackend) the caller selected,
//! buffering across calls when the device's requested period doesn't match
//! the simulation's block size (per the simulation-kernel spec's §4.4
//! output-device coupling).

use resonance_core::graph::{NodeId, Simulation};

use crate::backend::{AudioBackend, BackendStreamConfig, ErrorCallback, StreamHandle};
use crate::Result;

/// Drives one [`Simulation`] from a realtime device callback.
///
/// Holds interleaved carry-over samples from the last simulation block that
/// didn't exactly fill the device's last callback, so a device period that
/// isn't a multiple of the simulation's block size still gets gapless,
/// correctly-ordered audio.
pub struct SimulationPump {
    sim: Simulation,
    output_node: NodeId,
    channels: usize,
    carry: Vec<f32>,
    carry_pos: usize,
}

impl SimulationPump {
    /// Creates a pump pulling `channels`-channel blocks from `output_node`.
    pub fn new(sim: Simulation, output_node: NodeId, channels: usize) -> Self {
        Self { sim, output_node, channels, carry: Vec::new(), carry_pos: 0 }
    }

    /// Fills `dst` (interleaved, `dst.len()` a multiple of `self.channels`)
    /// with consecutive simulation output, rendering as many blocks as
    /// needed and carrying any remainder to the next call.
    pub fn fill(&mut self, dst: &mut [f32]) {
        let mut filled = 0;
        while filled < dst.len() {
            if self.carry_pos >= self.carry.len() {
                let block_size = self.sim.block_size();
                self.carry = vec![0.0; block_size * self.channels];
                self.sim.render_block_interleaved(self.output_node, self.channels, &mut self.carry);
                self.carry_pos = 0;
            }
            let available = self.carry.len() - self.carry_pos;
            let take = (dst.len() - filled).min(available);
            dst[filled..filled + take].copy_from_slice(&self.carry[self.carry_pos..self.carry_pos + take]);
            self.carry_pos += take;
            filled += take;
        }
    }
}

/// Registers a [`SimulationPump`] with a backend's output stream, so the
/// device callback thread renders directly from `sim`. The returned
/// [`StreamHandle`] keeps the stream (and, transitively, the pump's carry
/// buffer) alive; dropping it stops playback.
pub fn run_simulation_output(
    backend: &dyn AudioBackend,
    sim: Simulation,
    output_node: NodeId,
    config: &BackendStreamConfig,
) -> Result<StreamHandle> {
    let mut pump = SimulationPump::new(sim, output_node, config.channels as usize);
    let error_callback: ErrorCallback = Box::new(|err| tracing::warn!(error = %err, "output stream error"));
    backend.build_output_stream(config, Box::new(move |dst| pump.fill(dst)), error_callback)
}

#[cfg(test)]
mod tests {
    use super::*;
    use resonance_core::graph::{NodeBehavior, ProcessContext, PropertyTable};

    struct ConstSource(f32);
    impl NodeBehavior for ConstSource {
        fn process(&mut self, ctx: &mut ProcessContext<'_>) {
            for ch in ctx.outputs[0].iter_mut() {
                ch.fill(self.0);
            }
        }
    }

    #[test]
    fn fill_spans_multiple_blocks_and_carries_remainder() {
        let sim = Simulation::new(48_000.0, 4);
        let node = sim.create_node("const", Box::new(ConstSource(0.25)), &[], &[1], PropertyTable::new());
        sim.set_output_node(node);

        let mut pump = SimulationPump::new(sim, node, 1);
        let mut dst = vec![0.0f32; 6];
        pump.fill(&mut dst);
        assert!(dst.iter().all(|&s| (s - 0.25).abs() < 1e-6));

        let mut dst2 = vec![0.0f32; 6];
        pump.fill(&mut dst2);
        assert!(dst2.iter().all(|&s| (s - 0.25).abs() < 1e-6));
    }

    #[test]
    fn fill_handles_multichannel_interleave() {
        let sim = Simulation::new(48_000.0, 4);
        let gain = sim.create_node("const", Box::new(ConstSource(0.5)), &[], &[1], PropertyTable::new());
        sim.set_output_node(gain);

        let mut pump = SimulationPump::new(sim, gain, 2);
        let mut dst = vec![0.0f32; 8];
        pump.fill(&mut dst);
        assert_eq!(dst.len(), 8);
        assert!(dst.iter().all(|&s| (s - 0.5).abs() < 1e-6));
    }
}
