//! The top-level realtime handle: sample rate, block size, the scheduler,
//! the out-of-graph task queue, the mix lock, and the output pump.
//!
//! [`Simulation`] is the crate's public entry point. Every mutating call
//! (creating a node, connecting two nodes, writing a property) takes the
//! mix lock for the duration of the call; [`Simulation::render_block`] takes
//! it for the duration of one `tick()`. Because the lock is reentrant, a
//! property's post-change callback — or a task queue entry run via
//! [`Simulation::render_block`]'s caller — may itself call back into
//! `Simulation` without deadlocking.

use std::sync::{Arc, Mutex};

use super::error::GraphError;
use super::mix_lock::ReentrantMixLock;
use super::node::{NodeBehavior, NodeId, NodeState};
use super::property::{PropertyTable, PropertyTag, PropertyValue};
use super::schedule::Scheduler;
use super::task_queue::Task;
use crate::buffer_asset::{Buffer, BufferStore};
use crate::hrtf::HrtfData;
use crate::nodes::{
    AmplitudePannerNode, BufferNode, ConvolverNode, CrossfaderNode, CrossfadingDelayNode, GainNode, MultipannerNode,
};
use crate::remix;

struct Inner {
    scheduler: Scheduler,
    buffers: Arc<Mutex<BufferStore>>,
}

/// Owns a node graph and drives it one block at a time.
///
/// Cloning a `Simulation` is cheap and shares the same underlying graph —
/// the handle is really just `Arc<ReentrantMixLock<Inner>>` — which is how a
/// device callback thread and a UI/control thread safely share one engine.
#[derive(Clone)]
pub struct Simulation {
    inner: Arc<ReentrantMixLock<Inner>>,
    sample_rate: f32,
    block_size: usize,
}

impl Simulation {
    /// Creates an empty simulation at the given sample rate and block size.
    pub fn new(sample_rate: f32, block_size: usize) -> Self {
        Self {
            inner: Arc::new(ReentrantMixLock::new(Inner {
                scheduler: Scheduler::new(sample_rate, block_size),
                buffers: Arc::new(Mutex::new(BufferStore::new())),
            })),
            sample_rate,
            block_size,
        }
    }

    /// The simulation's sample rate, fixed at construction.
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Samples per block. Changeable live via [`Simulation::resize_block`].
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Resizes every node's buffers to a new block size, e.g. when an
    /// output device negotiates a different period than the simulation's
    /// default.
    pub fn resize_block(&mut self, block_size: usize) {
        let mut guard = self.inner.lock();
        guard.scheduler.graph_mut().resize_block(block_size);
        guard.scheduler.invalidate_plan();
        drop(guard);
        self.block_size = block_size;
    }

    /// Registers a new node.
    pub fn create_node(
        &self,
        label: &'static str,
        behavior: Box<dyn NodeBehavior>,
        input_channels: &[usize],
        output_channels: &[usize],
        properties: PropertyTable,
    ) -> NodeId {
        let mut guard = self.inner.lock();
        let id =
            guard.scheduler.graph_mut().create_node(label, behavior, input_channels, output_channels, properties);
        guard.scheduler.invalidate_plan();
        id
    }

    /// Connects an output slot to an input slot.
    pub fn connect(&self, from: NodeId, from_output: usize, to: NodeId, to_input: usize) -> Result<(), GraphError> {
        let mut guard = self.inner.lock();
        guard.scheduler.graph_mut().connect(from, from_output, to, to_input)?;
        guard.scheduler.invalidate_plan();
        Ok(())
    }

    /// Removes every connection touching `node`.
    pub fn isolate(&self, node: NodeId) -> Result<(), GraphError> {
        let mut guard = self.inner.lock();
        guard.scheduler.graph_mut().isolate(node)?;
        guard.scheduler.invalidate_plan();
        Ok(())
    }

    /// Sets a node's play state.
    pub fn set_state(&self, node: NodeId, state: NodeState) -> Result<(), GraphError> {
        let mut guard = self.inner.lock();
        guard.scheduler.graph_mut().set_state(node, state)?;
        guard.scheduler.invalidate_plan();
        Ok(())
    }

    /// Reads a node's play state.
    pub fn state(&self, node: NodeId) -> Result<NodeState, GraphError> {
        let guard = self.inner.lock();
        guard.scheduler.graph().state(node)
    }

    /// Clears a node's in-flight click-suppression state (see
    /// [`NodeBehavior::reset`]) — used to re-seat a `playAsync` cache entry
    /// without an audible HRTF crossfade from the previous source.
    pub fn reset_node(&self, node: NodeId) -> Result<(), GraphError> {
        let mut guard = self.inner.lock();
        guard.scheduler.graph_mut().reset_node(node)
    }

    /// Designates the node whose output-reachability anchors liveness.
    pub fn set_output_node(&self, node: NodeId) {
        let mut guard = self.inner.lock();
        guard.scheduler.set_output_node(node);
    }

    /// Reads a property (following any forward redirect).
    pub fn get_property(&self, node: NodeId, tag: PropertyTag) -> Result<PropertyValue, GraphError> {
        let guard = self.inner.lock();
        guard.scheduler.graph().get_property(node, tag)
    }

    /// Writes a property.
    pub fn set_property(&self, node: NodeId, tag: PropertyTag, value: PropertyValue) -> Result<(), GraphError> {
        let mut guard = self.inner.lock();
        guard.scheduler.graph_mut().set_property(node, tag, value)
    }

    /// Registers a one-way forward: reads of `local_tag` on `node` redirect
    /// to `(other, other_tag)`.
    pub fn forward_property(
        &self,
        node: NodeId,
        local_tag: PropertyTag,
        other: NodeId,
        other_tag: PropertyTag,
    ) -> Result<(), GraphError> {
        let mut guard = self.inner.lock();
        guard.scheduler.graph_mut().forward_property(node, local_tag, other, other_tag)
    }

    /// Loads a buffer asset (resampling it to the simulation's rate if
    /// needed) and returns a handle nodes can reference via a `Buffer`
    /// property.
    pub fn load_buffer(&self, source_rate: f32, channels: usize, frames: &[Vec<f32>]) -> PropertyValue {
        let buffer = Buffer::load_from_array(source_rate, channels, frames, self.sample_rate);
        let guard = self.inner.lock();
        let mut store = guard.buffers.lock().unwrap_or_else(|e| e.into_inner());
        let handle = store.insert(buffer);
        PropertyValue::Buffer(Some(handle))
    }

    /// Looks up a loaded buffer's metadata (channel count, frame count) by
    /// handle, for callers that need to validate a `Buffer` property before
    /// using it.
    pub fn buffer_frame_count(&self, value: &PropertyValue) -> Option<usize> {
        let handle = value.as_buffer()?;
        let guard = self.inner.lock();
        let store = guard.buffers.lock().unwrap_or_else(|e| e.into_inner());
        store.get(handle).map(|b| b.frame_count())
    }

    /// The shared buffer store backing every [`BufferNode`] created by this
    /// simulation (via [`Simulation::create_buffer_node`] or directly).
    /// Exposed so composite-node constructors outside this crate (the
    /// environment/source subgraph) can wire up their own `BufferNode`s the
    /// same way the built-in factories do.
    pub fn buffer_store(&self) -> Arc<Mutex<BufferStore>> {
        self.inner.lock().buffers.clone()
    }

    /// Creates a gain node operating on `channels` channels.
    pub fn create_gain_node(&self, channels: usize) -> NodeId {
        self.create_node("gain", Box::new(GainNode::new(channels)), &[channels], &[channels], GainNode::properties())
    }

    /// Creates a buffer player node outputting `channels` channels, wired to
    /// this simulation's shared buffer store. `on_ended` fires (via the task
    /// queue, outside the mix lock) the first block a non-looping buffer
    /// reaches its end.
    pub fn create_buffer_node(&self, channels: usize, on_ended: Option<Arc<dyn Fn() + Send + Sync>>) -> NodeId {
        let mut node = BufferNode::new(channels, self.buffer_store());
        if let Some(cb) = on_ended {
            node.set_on_ended(cb);
        }
        self.create_node("buffer", Box::new(node), &[], &[channels], BufferNode::properties())
    }

    /// Creates a crossfading delay line node over `channels` independent
    /// channels, able to hold up to `max_delay_seconds`.
    pub fn create_crossfading_delay_node(&self, channels: usize, max_delay_seconds: f32) -> NodeId {
        let node = CrossfadingDelayNode::new(channels, max_delay_seconds, self.sample_rate);
        let props = CrossfadingDelayNode::properties(max_delay_seconds, self.sample_rate);
        self.create_node("crossfading_delay", Box::new(node), &[channels], &[channels], props)
    }

    /// Creates an N-input crossfader over `channels` channels each.
    pub fn create_crossfader_node(&self, input_count: usize, channels: usize) -> NodeId {
        let node = CrossfaderNode::new(input_count, channels, self.sample_rate);
        let inputs = vec![channels; input_count];
        self.create_node("crossfader", Box::new(node), &inputs, &[channels], CrossfaderNode::properties(input_count))
    }

    /// Creates a fixed-response block convolver (mono in, mono out).
    pub fn create_convolver_node(&self, response: &[f32]) -> NodeId {
        let node = ConvolverNode::new(self.block_size, response);
        self.create_node("convolver", Box::new(node), &[1], &[1], ConvolverNode::properties())
    }

    /// Creates an equal-power amplitude panner driving `channel_count`
    /// output channels from a mono input.
    pub fn create_amplitude_panner_node(&self, channel_count: usize) -> NodeId {
        let node = AmplitudePannerNode::new(channel_count);
        self.create_node("amplitude_panner", Box::new(node), &[1], &[channel_count], AmplitudePannerNode::properties())
    }

    /// Creates a strategy-dispatching multipanner, initially driving
    /// `output_channels` channels on its amplitude path.
    pub fn create_multipanner_node(&self, output_channels: usize, hrtf_data: Arc<HrtfData>) -> NodeId {
        let node = MultipannerNode::new(output_channels, hrtf_data, self.block_size, self.sample_rate);
        self.create_node("multipanner", Box::new(node), &[1], &[output_channels], MultipannerNode::properties())
    }

    /// Runs exactly one block and returns the deferred tasks the caller
    /// must run with the mix lock released (buffer-end callbacks,
    /// crossfade-complete notifications). The lock is held only for the
    /// duration of the tick itself.
    pub fn tick(&self) -> Vec<Task> {
        let mut guard = self.inner.lock();
        guard.scheduler.tick()
    }

    /// Runs one block and remixes the output node's first output slot to
    /// `out_channels`-channel planar buffers, each `self.block_size()`
    /// samples long. Runs any deferred tasks after releasing the lock.
    pub fn render_block(&self, output_node: NodeId, out_channels: usize) -> Vec<Vec<f32>> {
        let tasks = self.tick();
        for task in tasks {
            task();
        }
        let guard = self.inner.lock();
        let graph = guard.scheduler.graph();
        let src = match graph.output_buffer(output_node, 0) {
            Ok(buffers) => buffers,
            Err(_) => return vec![vec![0.0; self.block_size]; out_channels],
        };
        if src.len() == out_channels {
            return src.to_vec();
        }
        let matrix = remix::build_matrix(src.len(), out_channels);
        let refs: Vec<&[f32]> = src.iter().map(|v| v.as_slice()).collect();
        let mut out = vec![vec![0.0f32; self.block_size]; out_channels];
        remix::remix_planar(&matrix, &refs, &mut out);
        out
    }

    /// Renders one block and interleaves it into `dst`
    /// (`dst.len() == out_channels * self.block_size()`), for device
    /// callback glue that expects interleaved `f32` frames.
    pub fn render_block_interleaved(&self, output_node: NodeId, out_channels: usize, dst: &mut [f32]) {
        let planar = self.render_block(output_node, out_channels);
        for (frame, chunk) in dst.chunks_mut(out_channels).enumerate() {
            for (ch, sample) in chunk.iter_mut().enumerate() {
                *sample = planar.get(ch).and_then(|c| c.get(frame)).copied().unwrap_or(0.0);
            }
        }
    }

    /// Grants a closure temporary direct access to the underlying scheduler
    /// under the mix lock — the escape hatch used by specialized node
    /// constructors (environment, source) that need to create and wire up
    /// several sub-nodes as one atomic unit.
    pub fn with_scheduler<R>(&self, f: impl FnOnce(&mut Scheduler) -> R) -> R {
        let mut guard = self.inner.lock();
        f(&mut guard.scheduler)
    }

    /// Stats about the underlying node/connection arena.
    pub fn graph_stats(&self) -> super::graph::GraphStats {
        let guard = self.inner.lock();
        guard.scheduler.graph().stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::node::ProcessContext;

    struct ConstGain(f32);
    impl NodeBehavior for ConstGain {
        fn process(&mut self, ctx: &mut ProcessContext<'_>) {
            let gain = ctx.properties.get("gain").ok().and_then(|p| p.value().as_float()).unwrap_or(self.0);
            for (out, inp) in ctx.outputs[0].iter_mut().zip(ctx.inputs.first().into_iter().flatten()) {
                for (o, i) in out.iter_mut().zip(inp.iter()) {
                    *o = i * gain;
                }
            }
        }
    }

    struct ConstSource(f32);
    impl NodeBehavior for ConstSource {
        fn process(&mut self, ctx: &mut ProcessContext<'_>) {
            for ch in ctx.outputs[0].iter_mut() {
                ch.fill(self.0);
            }
        }
    }

    #[test]
    fn render_block_applies_gain() {
        let sim = Simulation::new(48_000.0, 4);
        let source = sim.create_node("const_source", Box::new(ConstSource(1.0)), &[], &[1], PropertyTable::new());
        let mut props = PropertyTable::new();
        props.declare("gain", PropertyValue::Float(0.5));
        let gain = sim.create_node("gain", Box::new(ConstGain(0.5)), &[1], &[1], props);
        sim.connect(source, 0, gain, 0).unwrap();
        sim.set_output_node(gain);

        let block = sim.render_block(gain, 1);
        assert_eq!(block.len(), 1);
        assert!(block[0].iter().all(|&s| (s - 0.5).abs() < 1e-6));
    }

    #[test]
    fn paused_node_produces_silence() {
        let sim = Simulation::new(48_000.0, 4);
        let source = sim.create_node("const_source", Box::new(ConstSource(1.0)), &[], &[1], PropertyTable::new());
        sim.set_state(source, NodeState::Paused).unwrap();
        sim.set_output_node(source);
        let block = sim.render_block(source, 1);
        assert!(block[0].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn render_block_remixes_to_requested_channel_count() {
        let sim = Simulation::new(48_000.0, 4);
        let source = sim.create_node("const_source", Box::new(ConstSource(1.0)), &[], &[1], PropertyTable::new());
        sim.set_output_node(source);
        let block = sim.render_block(source, 2);
        assert_eq!(block.len(), 2);
    }
}
