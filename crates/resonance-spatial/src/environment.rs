//! The listener-centric mix point: a fixed 8-channel main bus plus any
//! number of registered effect-send buses, and the per-block source update
//! pass.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use resonance_core::graph::{
    Graph, NodeBehavior, NodeId, NodeState, ProcessContext, PropertyRange, PropertyTable, PropertyValue, Simulation,
    WillTickContext,
};
use resonance_core::nodes::buffer_node;
use resonance_core::HrtfData;

use crate::distance::DistanceModel;
use crate::effect_send::EffectSendSlot;
use crate::error::SpatialError;
use crate::registry::EnvironmentRegistry;
use crate::source::{self, EnvSnapshot, Source};
use crate::transform::WorldToListener;

/// Property tag: listener world-space position.
pub const LISTENER_POSITION: &str = "listener_position";
/// Property tag: listener forward direction (need not be unit length).
pub const LISTENER_AT: &str = "listener_at";
/// Property tag: listener up direction (re-orthogonalized against `at`).
pub const LISTENER_UP: &str = "listener_up";
/// Property tag: distance attenuation model, one of [`DistanceModel`]
/// (`Delegate` resolves to `Linear`).
pub const DISTANCE_MODEL: &str = "distance_model";
/// Property tag: the concrete panning strategy every source in `Delegate`
/// mode resolves to (`Stereo`, `Surround40`, `Surround51`, `Surround71`, or
/// `Hrtf` — never `Delegate` itself).
pub const DEFAULT_PANNING_STRATEGY: &str = "default_panning_strategy";
/// Property tag: reverb send gain multiplier floor, applied at the reverb
/// falloff horizon.
pub const MIN_REVERB: &str = "min_reverb";
/// Property tag: reverb send gain multiplier ceiling, applied at zero
/// distance.
pub const MAX_REVERB: &str = "max_reverb";

const MAIN_BUS_CHANNELS: usize = 8;

/// Default bound on the `playAsync` idle-entry cache: the number of
/// recently-finished fire-and-forget sources kept alive (paused, subgraph
/// intact) for instant reuse before a `playAsync` call falls back to
/// building a fresh subgraph. Chosen generously relative to a typical
/// simultaneous one-shot count (footsteps, impacts, UI blips) without
/// keeping an unbounded number of idle node subgraphs around.
pub const DEFAULT_PLAY_CACHE_CAPACITY: usize = 32;

fn strategy_to_channels(s: resonance_core::nodes::multipanner::Strategy) -> usize {
    use resonance_core::nodes::multipanner::Strategy::*;
    match s {
        Hrtf | Stereo | Delegate => 2,
        Surround40 => 4,
        Surround51 => 6,
        Surround71 => 8,
    }
}

/// The environment's [`NodeBehavior`]: recomputes the listener transform
/// and every live source's panner/gain properties in `will_tick`, then
/// concatenates its input slots (main bus + effect sends) into one output
/// slot in `process`.
pub(crate) struct EnvironmentNode {
    registry: Arc<Mutex<EnvironmentRegistry>>,
}

impl EnvironmentNode {
    fn new(registry: Arc<Mutex<EnvironmentRegistry>>) -> Self {
        Self { registry }
    }
}

impl NodeBehavior for EnvironmentNode {
    fn process(&mut self, ctx: &mut ProcessContext<'_>) {
        let Some(output) = ctx.outputs.first_mut() else { return };
        let mut offset = 0;
        for slot in ctx.inputs {
            for (ch, buf) in slot.iter().enumerate() {
                if offset + ch < output.len() {
                    output[offset + ch].copy_from_slice(buf);
                }
            }
            offset += slot.len();
        }
    }

    fn will_tick(&mut self, ctx: &mut WillTickContext<'_>) -> Result<(), String> {
        let node = ctx.self_id;
        let graph: &mut Graph = ctx.graph;

        let position = graph.get_property(node, LISTENER_POSITION).ok().and_then(|v| v.as_float3()).unwrap_or([0.0; 3]);
        let at = graph.get_property(node, LISTENER_AT).ok().and_then(|v| v.as_float3()).unwrap_or([0.0, 0.0, -1.0]);
        let up = graph.get_property(node, LISTENER_UP).ok().and_then(|v| v.as_float3()).unwrap_or([0.0, 1.0, 0.0]);
        let transform = WorldToListener::look_at(position, at, up);

        let raw_model = graph.get_property(node, DISTANCE_MODEL).ok().and_then(|v| v.as_int()).unwrap_or(0);
        let distance_model = match DistanceModel::from_i64(raw_model) {
            DistanceModel::Delegate => DistanceModel::Linear,
            other => other,
        };

        let raw_strategy = graph.get_property(node, DEFAULT_PANNING_STRATEGY).ok().and_then(|v| v.as_int()).unwrap_or(1);
        let resolved_panning_strategy = match resonance_core::nodes::multipanner::Strategy::from_i64(raw_strategy) {
            resonance_core::nodes::multipanner::Strategy::Delegate => resonance_core::nodes::multipanner::Strategy::Stereo,
            other => other,
        };

        let min_reverb = graph.get_property(node, MIN_REVERB).ok().and_then(|v| v.as_float()).unwrap_or(0.0);
        let max_reverb = graph.get_property(node, MAX_REVERB).ok().and_then(|v| v.as_float()).unwrap_or(1.0);

        let snapshot = EnvSnapshot { transform, distance_model, resolved_panning_strategy, min_reverb, max_reverb };

        let live = self.registry.lock().unwrap_or_else(|e| e.into_inner()).live_sources();
        for shared in &live {
            source::update(shared, graph, &snapshot);
        }
        Ok(())
    }
}

struct PlayCacheEntry {
    source: Source,
    buffer_node: NodeId,
}

/// The listener-centric mix point. Owns the fixed 8-channel main bus every
/// source feeds by default, any number of additional effect-send buses, and
/// the bounded `playAsync` fire-and-forget cache.
#[derive(Clone)]
pub struct Environment {
    sim: Simulation,
    node: NodeId,
    hrtf: Arc<HrtfData>,
    registry: Arc<Mutex<EnvironmentRegistry>>,
    play_cache: Arc<Mutex<Vec<PlayCacheEntry>>>,
    play_cache_capacity: usize,
}

impl Environment {
    /// Creates an environment with the default `playAsync` cache capacity
    /// (see [`DEFAULT_PLAY_CACHE_CAPACITY`]).
    pub fn new(sim: &Simulation, hrtf: Arc<HrtfData>) -> Self {
        Self::with_play_cache_capacity(sim, hrtf, DEFAULT_PLAY_CACHE_CAPACITY)
            .expect("DEFAULT_PLAY_CACHE_CAPACITY is nonzero")
    }

    /// Creates an environment with an explicit `playAsync` cache capacity.
    pub fn with_play_cache_capacity(
        sim: &Simulation,
        hrtf: Arc<HrtfData>,
        play_cache_capacity: usize,
    ) -> Result<Self, SpatialError> {
        if play_cache_capacity == 0 {
            return Err(SpatialError::ZeroCacheCapacity);
        }

        let mut props = PropertyTable::new();
        props.declare(LISTENER_POSITION, PropertyValue::Float3([0.0, 0.0, 0.0]));
        props.declare(LISTENER_AT, PropertyValue::Float3([0.0, 0.0, -1.0]));
        props.declare(LISTENER_UP, PropertyValue::Float3([0.0, 1.0, 0.0]));
        props.declare_ranged(DISTANCE_MODEL, PropertyValue::Int(1), PropertyRange::Discrete(vec![0, 1, 2, 3]));
        props.declare_ranged(DEFAULT_PANNING_STRATEGY, PropertyValue::Int(1), PropertyRange::Discrete(vec![1, 2, 3, 4, 5]));
        props.declare_ranged(MIN_REVERB, PropertyValue::Float(0.0), PropertyRange::Continuous { min: 0.0, max: 1.0 });
        props.declare_ranged(MAX_REVERB, PropertyValue::Float(1.0), PropertyRange::Continuous { min: 0.0, max: 1.0 });

        let registry = Arc::new(Mutex::new(EnvironmentRegistry::new()));
        let node = sim.create_node(
            "environment",
            Box::new(EnvironmentNode::new(registry.clone())),
            &[MAIN_BUS_CHANNELS],
            &[MAIN_BUS_CHANNELS],
            props,
        );

        Ok(Self {
            sim: sim.clone(),
            node,
            hrtf,
            registry,
            play_cache: Arc::new(Mutex::new(Vec::new())),
            play_cache_capacity,
        })
    }

    /// This environment's node id — pass to
    /// [`Simulation::set_output_node`] to make it the simulation's final
    /// mix, or wire it further downstream (a master gain, a limiter).
    pub fn node_id(&self) -> NodeId {
        self.node
    }

    /// Sets the listener's world-space position.
    pub fn set_listener_position(&self, position: [f32; 3]) -> Result<(), SpatialError> {
        self.sim.set_property(self.node, LISTENER_POSITION, PropertyValue::Float3(position))?;
        Ok(())
    }

    /// Sets the listener's forward and up directions.
    pub fn set_listener_orientation(&self, at: [f32; 3], up: [f32; 3]) -> Result<(), SpatialError> {
        self.sim.set_property(self.node, LISTENER_AT, PropertyValue::Float3(at))?;
        self.sim.set_property(self.node, LISTENER_UP, PropertyValue::Float3(up))?;
        Ok(())
    }

    /// Sets the distance attenuation model every source resolves
    /// `Delegate` to.
    pub fn set_distance_model(&self, model: DistanceModel) -> Result<(), SpatialError> {
        self.sim.set_property(self.node, DISTANCE_MODEL, PropertyValue::Int(model.as_i64()))?;
        Ok(())
    }

    /// Sets the concrete panning strategy every source's `Delegate` mode
    /// resolves to.
    pub fn set_default_panning_strategy(
        &self,
        strategy: resonance_core::nodes::multipanner::Strategy,
    ) -> Result<(), SpatialError> {
        self.sim.set_property(self.node, DEFAULT_PANNING_STRATEGY, PropertyValue::Int(strategy as i64))?;
        Ok(())
    }

    /// Sets the reverb send gain range (`min` at the reverb falloff
    /// horizon, `max` at zero distance).
    pub fn set_reverb_gain_range(&self, min: f32, max: f32) -> Result<(), SpatialError> {
        self.sim.set_property(self.node, MIN_REVERB, PropertyValue::Float(min))?;
        self.sim.set_property(self.node, MAX_REVERB, PropertyValue::Float(max))?;
        Ok(())
    }

    /// Registers a new effect-send bus of `channels` channels (one of
    /// `{1,2,4,6,8}`; a reverb send must be exactly 4). Returns the send's
    /// id, used with [`Source::feed_effect`]/[`Source::stop_feeding_effect`].
    /// If `connect_by_default` is set, every currently-live source starts
    /// feeding it immediately (later sources decide for themselves via
    /// `feed_effect`).
    pub fn add_effect_send(
        &self,
        channels: usize,
        is_reverb: bool,
        connect_by_default: bool,
    ) -> Result<usize, SpatialError> {
        if !resonance_core::remix::is_supported_channel_count(channels) {
            return Err(SpatialError::UnsupportedChannelCount(channels));
        }
        if is_reverb && channels != 4 {
            return Err(SpatialError::ReverbChannelMismatch(channels));
        }

        let node = self.node;
        let input_slot = self.sim.with_scheduler(|sched| -> Result<usize, SpatialError> {
            let graph = sched.graph_mut();
            let old_total = graph.output_buffer(node, 0).map(|b| b.len()).unwrap_or(MAIN_BUS_CHANNELS);
            let slot = graph.append_input(node, channels)?;
            graph.reconfigure(node, true, 0, old_total + channels)?;
            sched.invalidate_plan();
            Ok(slot)
        })?;

        let id = {
            let mut registry = self.registry.lock().unwrap_or_else(|e| e.into_inner());
            let id = registry.effect_sends.len();
            registry.effect_sends.push(EffectSendSlot { id, channels, is_reverb, connect_by_default, input_slot });
            id
        };

        if connect_by_default {
            let live = self.registry.lock().unwrap_or_else(|e| e.into_inner()).live_sources();
            for shared in live {
                Source(shared).feed_effect(id)?;
            }
        }

        Ok(id)
    }

    /// Creates a new, independently-owned [`Source`] feeding this
    /// environment's main bus. Every effect send registered with
    /// `connect_by_default` is fed automatically.
    pub fn create_source(&self) -> Result<Source, SpatialError> {
        let source = Source::create(&self.sim, self.node, self.registry.clone(), self.hrtf.clone())?;
        let defaults: Vec<usize> = self
            .registry
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .effect_sends
            .iter()
            .filter(|s| s.connect_by_default)
            .map(|s| s.id)
            .collect();
        for id in defaults {
            source.feed_effect(id)?;
        }
        Ok(source)
    }

    /// Plays `buffer` once at `position`, reusing an idle cache entry if one
    /// is available or building a fresh source/buffer-player pair
    /// otherwise. `is_dry` selects whether the played sound only feeds the
    /// main bus (`true`) or also feeds every `connect_by_default` effect
    /// send (`false`). The returned handle can be used to stop/reposition
    /// playback early; dropping it has no effect on the scheduled playback
    /// (the pair is kept alive by this environment's own bookkeeping until
    /// the buffer ends).
    pub fn play_async(&self, buffer: PropertyValue, position: [f32; 3], is_dry: bool) -> Result<Source, SpatialError> {
        let popped = self.play_cache.lock().unwrap_or_else(|e| e.into_inner()).pop();
        let (source, buffer_node) = match popped {
            Some(entry) => (entry.source, entry.buffer_node),
            None => {
                let source = Source::create(&self.sim, self.node, self.registry.clone(), self.hrtf.clone())?;
                let buffer_node_cell: Arc<Mutex<Option<NodeId>>> = Arc::new(Mutex::new(None));
                let cell_for_cb = buffer_node_cell.clone();
                let sim_for_cb = self.sim.clone();
                let source_for_cb = source.clone();
                let play_cache = self.play_cache.clone();
                let capacity = self.play_cache_capacity;
                let buffer_node = self.sim.create_buffer_node(
                    1,
                    Some(Arc::new(move || {
                        let Some(buffer_node) = *cell_for_cb.lock().unwrap_or_else(|e| e.into_inner()) else {
                            return;
                        };
                        let _ = sim_for_cb.set_state(source_for_cb.node_id(), NodeState::Paused);
                        let mut cache = play_cache.lock().unwrap_or_else(|e| e.into_inner());
                        if cache.len() < capacity {
                            cache.push(PlayCacheEntry { source: source_for_cb.clone(), buffer_node });
                        } else {
                            drop(cache);
                            let _ = sim_for_cb.isolate(source_for_cb.node_id());
                            let _ = sim_for_cb.isolate(source_for_cb.gain_node_id());
                            let _ = sim_for_cb.isolate(buffer_node);
                        }
                    })),
                );
                *buffer_node_cell.lock().unwrap_or_else(|e| e.into_inner()) = Some(buffer_node);
                self.sim.connect(buffer_node, 0, source.gain_node_id(), 0)?;
                source.set_input(buffer_node);
                (source, buffer_node)
            }
        };

        source.reset();
        self.sim.set_property(buffer_node, buffer_node::BUFFER, buffer)?;
        self.sim.set_property(buffer_node, buffer_node::POSITION, PropertyValue::Double(0.0))?;
        self.sim.set_property(buffer_node, buffer_node::LOOPING, PropertyValue::Int(0))?;
        source.set_position(position)?;
        source.set_state(NodeState::Playing)?;
        self.sim.set_state(buffer_node, NodeState::Playing)?;

        if !is_dry {
            let defaults: Vec<usize> = self
                .registry
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .effect_sends
                .iter()
                .filter(|s| s.connect_by_default)
                .map(|s| s.id)
                .collect();
            for id in defaults {
                source.feed_effect(id)?;
            }
        }

        Ok(source)
    }
}
