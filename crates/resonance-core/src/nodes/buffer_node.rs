//! Streaming buffer playback.

use crate::buffer_asset::BufferStore;
use crate::graph::node::{NodeBehavior, ProcessContext};
use crate::graph::property::{PropertyRange, PropertyTable, PropertyValue};
use crate::graph::task_queue::Task;
use std::sync::{Arc, Mutex};

/// Property tag: the [`crate::graph::property::BufferHandle`] to play, or
/// unset for silence.
pub const BUFFER: &str = "buffer";
/// Property tag: the current read position, in seconds (fractional).
pub const POSITION: &str = "position";
/// Property tag: playback rate multiplier (1.0 = normal speed).
pub const RATE: &str = "rate";
/// Property tag: nonzero to loop back to frame 0 at end-of-buffer.
pub const LOOPING: &str = "looping";
/// Property tag: count of times playback has reached the end since the
/// buffer was last assigned (read-only from the caller's perspective; set
/// by the node).
pub const ENDED_COUNT: &str = "ended_count";

/// Plays back a loaded [`crate::buffer_asset::Buffer`] at an arbitrary,
/// modulatable rate, remixing its native channel layout to this node's
/// output channel count.
///
/// End-of-buffer behavior: looping buffers wrap the position back into
/// range; non-looping buffers hold at the last frame (continuing to emit
/// its last sample's remix) until the position is rewound, and queue an
/// "ended" task the first block the end is crossed. `ended_count` is
/// incremented once per crossing, letting callers detect repeated
/// non-looping plays of the same buffer across ticks.
pub struct BufferNode {
    channels: usize,
    buffers: Arc<Mutex<BufferStore>>,
    on_ended: Option<Arc<dyn Fn() + Send + Sync>>,
    was_past_end: bool,
}

impl BufferNode {
    /// Builds the property table a [`BufferNode`] expects.
    pub fn properties() -> PropertyTable {
        let mut table = PropertyTable::new();
        table.declare(BUFFER, PropertyValue::Buffer(None));
        table.declare(POSITION, PropertyValue::Double(0.0));
        table.declare_ranged(RATE, PropertyValue::Float(1.0), PropertyRange::Continuous { min: -8.0, max: 8.0 });
        table.declare_ranged(LOOPING, PropertyValue::Int(0), PropertyRange::Discrete(vec![0, 1]));
        table.declare(ENDED_COUNT, PropertyValue::Int(0));
        table
    }

    /// Creates a player outputting `channels` channels, reading buffers from
    /// the shared `buffers` store (the same store a [`crate::graph::Simulation`]
    /// loads buffers into).
    pub fn new(channels: usize, buffers: Arc<Mutex<BufferStore>>) -> Self {
        Self { channels, buffers, on_ended: None, was_past_end: false }
    }

    /// Installs a callback invoked (via the task queue, outside the mix
    /// lock) the first block playback reaches the end of a non-looping
    /// buffer.
    pub fn set_on_ended(&mut self, cb: Arc<dyn Fn() + Send + Sync>) {
        self.on_ended = Some(cb);
    }
}

impl NodeBehavior for BufferNode {
    fn process(&mut self, ctx: &mut ProcessContext<'_>) {
        let handle = ctx.properties.get(BUFFER).ok().and_then(|p| p.value().as_buffer());
        let rate = ctx.properties.get(RATE).ok().and_then(|p| p.value().as_float()).unwrap_or(1.0) as f64;
        let looping = ctx.properties.get(LOOPING).ok().and_then(|p| p.value().as_bool()).unwrap_or(false);
        let sample_rate = f64::from(ctx.sample_rate);
        let position_seconds = ctx.properties.get(POSITION).ok().and_then(|p| p.value().as_double()).unwrap_or(0.0);
        let mut position = position_seconds * sample_rate;

        let Some(output) = ctx.outputs.first_mut() else { return };
        let Some(handle) = handle else {
            for ch in output.iter_mut() {
                ch.fill(0.0);
            }
            return;
        };

        let store = self.buffers.lock().unwrap_or_else(|e| e.into_inner());
        let Some(buffer) = store.get(handle) else {
            drop(store);
            for ch in output.iter_mut() {
                ch.fill(0.0);
            }
            return;
        };
        let frame_count = buffer.frame_count() as f64;
        let mut frame = vec![0.0f32; self.channels];
        let mut crossed_end = false;
        for i in 0..ctx.block_size {
            if frame_count <= 0.0 {
                frame.fill(0.0);
            } else if position >= frame_count || position < 0.0 {
                if looping {
                    position = position.rem_euclid(frame_count);
                    buffer.sample_with_remix(position, &mut frame);
                } else {
                    frame.fill(0.0);
                    crossed_end = true;
                }
            } else {
                buffer.sample_with_remix(position, &mut frame);
            }
            for (ch, &s) in frame.iter().enumerate() {
                if ch < output.len() {
                    output[ch][i] = s;
                }
            }
            position += rate;
        }
        drop(store);

        if let Ok(p) = ctx.properties.get_mut(POSITION) {
            let _ = p.set(POSITION, PropertyValue::Double(position / sample_rate));
        }

        if crossed_end && !self.was_past_end {
            self.was_past_end = true;
            let count = ctx.properties.get(ENDED_COUNT).ok().and_then(|p| p.value().as_int()).unwrap_or(0);
            if let Ok(p) = ctx.properties.get_mut(ENDED_COUNT) {
                let _ = p.set(ENDED_COUNT, PropertyValue::Int(count + 1));
            }
            if let Some(cb) = self.on_ended.clone() {
                let task: Task = Box::new(move || cb());
                ctx.tasks.enqueue(task);
            }
        } else if !crossed_end {
            self.was_past_end = false;
        }
    }

    fn on_property_changed(&mut self, tag: &'static str, _properties: &mut PropertyTable) {
        if tag == BUFFER || tag == POSITION {
            self.was_past_end = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer_asset::Buffer;
    use crate::graph::Simulation;

    fn store_with(buffer: Buffer) -> (Arc<Mutex<BufferStore>>, PropertyValue) {
        let mut store = BufferStore::new();
        let handle = store.insert(buffer);
        (Arc::new(Mutex::new(store)), PropertyValue::Buffer(Some(handle)))
    }

    #[test]
    fn plays_back_loaded_samples() {
        let buffer = Buffer::load_from_array(48_000.0, 1, &[vec![1.0, 2.0, 3.0, 4.0]], 48_000.0);
        let (store, handle) = store_with(buffer);
        let sim = Simulation::new(48_000.0, 4);
        let node = sim.create_node("buffer", Box::new(BufferNode::new(1, store)), &[], &[1], BufferNode::properties());
        sim.set_property(node, BUFFER, handle).unwrap();
        sim.set_output_node(node);
        let block = sim.render_block(node, 1);
        assert!((block[0][0] - 1.0).abs() < 1e-3);
        assert!((block[0][3] - 4.0).abs() < 1e-3);
    }

    #[test]
    fn non_looping_buffer_holds_silence_past_end_and_increments_ended_count() {
        let buffer = Buffer::load_from_array(48_000.0, 1, &[vec![1.0, 1.0]], 48_000.0);
        let (store, handle) = store_with(buffer);
        let sim = Simulation::new(48_000.0, 4);
        let node = sim.create_node("buffer", Box::new(BufferNode::new(1, store)), &[], &[1], BufferNode::properties());
        sim.set_property(node, BUFFER, handle).unwrap();
        sim.set_output_node(node);
        let block = sim.render_block(node, 1);
        assert!((block[0][0] - 1.0).abs() < 1e-3);
        assert_eq!(block[0][2], 0.0);
        assert_eq!(block[0][3], 0.0);
        assert_eq!(sim.get_property(node, ENDED_COUNT).unwrap(), PropertyValue::Int(1));
    }

    #[test]
    fn looping_buffer_wraps_position() {
        let buffer = Buffer::load_from_array(48_000.0, 1, &[vec![1.0, 2.0]], 48_000.0);
        let (store, handle) = store_with(buffer);
        let sim = Simulation::new(48_000.0, 4);
        let node = sim.create_node("buffer", Box::new(BufferNode::new(1, store)), &[], &[1], BufferNode::properties());
        sim.set_property(node, BUFFER, handle).unwrap();
        sim.set_property(node, LOOPING, PropertyValue::Int(1)).unwrap();
        sim.set_output_node(node);
        let block = sim.render_block(node, 1);
        assert!((block[0][0] - 1.0).abs() < 1e-3);
        assert!((block[0][2] - 1.0).abs() < 1e-3);
    }
}
