//! A positioned audio source: the subgraph `gain -> multipanner ->
//! environment`, plus one property-only identity node, plus whatever
//! lazily-created effect-send panners/gains it has fed.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use resonance_core::graph::{Graph, NodeId, NodeState, PropertyValue, Simulation};
use resonance_core::nodes::{amplitude_panner, gain, multipanner};

use crate::distance::{self, DistanceModel};
use crate::effect_send::EffectSendSlot;
use crate::error::SpatialError;
use crate::registry::EnvironmentRegistry;
use crate::transform::WorldToListener;

/// Property tag: world- or head-relative position.
pub const POSITION: &str = "position";
/// Property tag: `0` = `position` is world-space, nonzero = listener-relative.
pub const HEAD_RELATIVE: &str = "head_relative";
/// Property tag: distance beyond which the source is culled (paused).
pub const MAX_DISTANCE: &str = "max_distance";
/// Property tag: physical radius used to shift the distance-attenuation
/// origin (see [`distance::model_gain`]).
pub const SIZE: &str = "size";
/// Property tag: falloff horizon used for the reverb send's distance curve,
/// independent of `max_distance`.
pub const REVERB_DISTANCE: &str = "reverb_distance";
/// Property tag: final linear multiplier applied after distance
/// attenuation.
pub const MUL: &str = "mul";
/// Property tag: mirrors the source's multipanner's `strategy` property
/// (read-through; see [`Source::set_panning_strategy`] to write it).
pub const PANNING_STRATEGY: &str = "panning_strategy";

const DEFAULT_MAX_DISTANCE: f32 = 1000.0;
const DEFAULT_REVERB_DISTANCE: f32 = 1.0;

/// No-op behavior for a source's property-only identity node: it has no
/// input/output slots and never runs meaningful DSP, it exists purely to
/// host the position/max_distance/.../panning_strategy property table and a
/// user-settable Paused/Playing/AlwaysPlaying intent.
struct IdentityBehavior;

impl resonance_core::graph::NodeBehavior for IdentityBehavior {
    fn process(&mut self, _ctx: &mut resonance_core::graph::ProcessContext<'_>) {}
}

pub(crate) fn strategy_from_i64(v: i64) -> multipanner::Strategy {
    use multipanner::Strategy::*;
    match v {
        1 => Stereo,
        2 => Surround40,
        3 => Surround51,
        4 => Surround71,
        5 => Hrtf,
        _ => Delegate,
    }
}

struct EffectGainEntry {
    gain_node: NodeId,
    is_reverb: bool,
}

/// The shared state behind a [`Source`] handle. Lives as long as any clone
/// of the handle (or the environment's `playAsync` idle cache) holds an
/// `Arc` to it; the environment's registry only ever holds a `Weak`, so a
/// source with no external owner and not presently cached is torn down the
/// block after its last handle drops.
pub(crate) struct SourceShared {
    sim: Simulation,
    node: NodeId,
    gain: NodeId,
    multipanner: NodeId,
    environment_node: NodeId,
    registry: Arc<Mutex<EnvironmentRegistry>>,
    input: Mutex<Option<NodeId>>,
    effect_panners: Mutex<HashMap<usize, NodeId>>,
    effect_gains: Mutex<HashMap<usize, EffectGainEntry>>,
    culled: AtomicBool,
    last_panner_channels: AtomicUsize,
}

impl Drop for SourceShared {
    fn drop(&mut self) {
        let _ = self.sim.isolate(self.gain);
        let _ = self.sim.isolate(self.multipanner);
        let _ = self.sim.isolate(self.node);
        if let Ok(panners) = self.effect_panners.lock() {
            for &id in panners.values() {
                let _ = self.sim.isolate(id);
            }
        }
        if let Ok(gains) = self.effect_gains.lock() {
            for entry in gains.values() {
                let _ = self.sim.isolate(entry.gain_node);
            }
        }
    }
}

/// A positioned, panned audio source feeding one [`crate::Environment`].
///
/// Cloning a `Source` is cheap and shares the same underlying subgraph — it
/// is, like [`Simulation`], really just an `Arc` handle.
#[derive(Clone)]
pub struct Source(pub(crate) Arc<SourceShared>);

impl Source {
    /// Builds a source's subgraph (`gain -> multipanner -> environment`
    /// plus its property-only identity node) and registers it with the
    /// environment so its panner/gain properties get recomputed every
    /// block.
    pub(crate) fn create(
        sim: &Simulation,
        environment_node: NodeId,
        registry: Arc<Mutex<EnvironmentRegistry>>,
        hrtf: Arc<resonance_core::HrtfData>,
    ) -> Result<Self, SpatialError> {
        let gain_node = sim.create_gain_node(1);
        let multipanner_node = sim.create_multipanner_node(2, hrtf);
        sim.connect(gain_node, 0, multipanner_node, 0)?;
        sim.connect(multipanner_node, 0, environment_node, 0)?;

        let mut props = resonance_core::graph::PropertyTable::new();
        props.declare(POSITION, PropertyValue::Float3([0.0, 0.0, 0.0]));
        props.declare(HEAD_RELATIVE, PropertyValue::Int(0));
        props.declare_ranged(
            MAX_DISTANCE,
            PropertyValue::Float(DEFAULT_MAX_DISTANCE),
            resonance_core::graph::PropertyRange::Continuous { min: 0.0, max: f64::from(f32::MAX) as f64 },
        );
        props.declare_ranged(
            SIZE,
            PropertyValue::Float(0.0),
            resonance_core::graph::PropertyRange::Continuous { min: 0.0, max: f64::from(f32::MAX) as f64 },
        );
        props.declare_ranged(
            REVERB_DISTANCE,
            PropertyValue::Float(DEFAULT_REVERB_DISTANCE),
            resonance_core::graph::PropertyRange::Continuous { min: 0.0, max: f64::from(f32::MAX) as f64 },
        );
        props.declare_ranged(MUL, PropertyValue::Float(1.0), resonance_core::graph::PropertyRange::Continuous { min: 0.0, max: 16.0 });
        props.declare_ranged(PANNING_STRATEGY, PropertyValue::Int(0), resonance_core::graph::PropertyRange::Discrete((0..=5).collect()));

        let node = sim.create_node("source", Box::new(IdentityBehavior), &[], &[], props);
        sim.forward_property(node, PANNING_STRATEGY, multipanner_node, multipanner::STRATEGY)?;

        let shared = Arc::new(SourceShared {
            sim: sim.clone(),
            node,
            gain: gain_node,
            multipanner: multipanner_node,
            environment_node,
            registry: registry.clone(),
            input: Mutex::new(None),
            effect_panners: Mutex::new(HashMap::new()),
            effect_gains: Mutex::new(HashMap::new()),
            culled: AtomicBool::new(false),
            last_panner_channels: AtomicUsize::new(2),
        });
        registry.lock().unwrap_or_else(|e| e.into_inner()).sources.push(Arc::downgrade(&shared));
        Ok(Source(shared))
    }

    /// This source's identity node, for use with [`Simulation::set_state`]
    /// to express Paused/Playing/AlwaysPlaying intent.
    pub fn node_id(&self) -> NodeId {
        self.0.node
    }

    /// The internal mono gain node that feeds this source's multipanner —
    /// connect an upstream generator (buffer player, oscillator, ...) to
    /// this node's input 0.
    pub fn gain_node_id(&self) -> NodeId {
        self.0.gain
    }

    /// Records which upstream node feeds this source, so the cull state
    /// machine can force it `AlwaysPlaying`/`Paused` as the source enters
    /// or leaves range.
    pub fn set_input(&self, input: NodeId) {
        *self.0.input.lock().unwrap_or_else(|e| e.into_inner()) = Some(input);
    }

    /// Sets the source's position (world-space, or listener-relative if
    /// [`Source::set_head_relative`] is `true`).
    pub fn set_position(&self, position: [f32; 3]) -> Result<(), SpatialError> {
        self.0.sim.set_property(self.0.node, POSITION, PropertyValue::Float3(position))?;
        Ok(())
    }

    /// Sets whether `position` is interpreted relative to the listener
    /// rather than in world space.
    pub fn set_head_relative(&self, head_relative: bool) -> Result<(), SpatialError> {
        self.0.sim.set_property(self.0.node, HEAD_RELATIVE, PropertyValue::Int(head_relative as i64))?;
        Ok(())
    }

    /// Sets the falloff horizon beyond which the source is culled.
    pub fn set_max_distance(&self, max_distance: f32) -> Result<(), SpatialError> {
        self.0.sim.set_property(self.0.node, MAX_DISTANCE, PropertyValue::Float(max_distance))?;
        Ok(())
    }

    /// Sets the source's physical radius.
    pub fn set_size(&self, size: f32) -> Result<(), SpatialError> {
        self.0.sim.set_property(self.0.node, SIZE, PropertyValue::Float(size))?;
        Ok(())
    }

    /// Sets the falloff horizon used for the reverb send's distance curve.
    pub fn set_reverb_distance(&self, reverb_distance: f32) -> Result<(), SpatialError> {
        self.0.sim.set_property(self.0.node, REVERB_DISTANCE, PropertyValue::Float(reverb_distance))?;
        Ok(())
    }

    /// Sets the final linear gain multiplier.
    pub fn set_mul(&self, mul: f32) -> Result<(), SpatialError> {
        self.0.sim.set_property(self.0.node, MUL, PropertyValue::Float(mul))?;
        Ok(())
    }

    /// Writes the panning strategy through to the internal multipanner
    /// directly (`source.panning_strategy` itself is a read-only forward —
    /// see [`resonance_core::graph::Graph::forward_property`] — so the
    /// write has to land on the real target).
    pub fn set_panning_strategy(&self, strategy: multipanner::Strategy) -> Result<(), SpatialError> {
        self.0.sim.set_property(self.0.multipanner, multipanner::STRATEGY, PropertyValue::Int(strategy as i64))?;
        Ok(())
    }

    /// Reads the current panning strategy (following the forward, so this
    /// always matches the multipanner's actual value).
    pub fn panning_strategy(&self) -> multipanner::Strategy {
        self.0
            .sim
            .get_property(self.0.node, PANNING_STRATEGY)
            .ok()
            .and_then(|v| v.as_int())
            .map(strategy_from_i64)
            .unwrap_or(multipanner::Strategy::Delegate)
    }

    /// Sets the source's own Paused/Playing/AlwaysPlaying intent. This is
    /// what the cull state machine restores the panner/input to once the
    /// source comes back into range.
    pub fn set_state(&self, state: NodeState) -> Result<(), SpatialError> {
        self.0.sim.set_state(self.0.node, state)?;
        Ok(())
    }

    /// Whether the source is currently culled (beyond `max_distance`).
    pub fn is_culled(&self) -> bool {
        self.0.culled.load(Ordering::Relaxed)
    }

    /// Clears the internal multipanner's HRTF crossfade state, so a
    /// `playAsync` cache entry re-seated at a new position doesn't bleed a
    /// crossfade in from wherever the previous source last pointed.
    pub fn reset(&self) {
        let _ = self.0.sim.reset_node(self.0.multipanner);
    }

    /// Starts feeding this source's dry signal into effect send `send_id`
    /// (lazily creating the per-channel-count panner and this send's gain
    /// node the first time any source feeds it). Idempotent — feeding a
    /// send this source already feeds is a no-op.
    pub fn feed_effect(&self, send_id: usize) -> Result<(), SpatialError> {
        if self.0.effect_gains.lock().unwrap_or_else(|e| e.into_inner()).contains_key(&send_id) {
            return Ok(());
        }
        let slot = find_send(&self.0.registry, send_id)?;

        let panner = {
            let mut panners = self.0.effect_panners.lock().unwrap_or_else(|e| e.into_inner());
            *panners.entry(slot.channels).or_insert_with(|| {
                let p = self.0.sim.create_amplitude_panner_node(slot.channels);
                let _ = self.0.sim.connect(self.0.gain, 0, p, 0);
                p
            })
        };

        let gain_node = self.0.sim.create_gain_node(slot.channels);
        self.0.sim.connect(panner, 0, gain_node, 0)?;
        self.0.sim.connect(gain_node, 0, self.0.environment_node, slot.input_slot)?;

        self.0
            .effect_gains
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(send_id, EffectGainEntry { gain_node, is_reverb: slot.is_reverb });
        Ok(())
    }

    /// Stops feeding effect send `send_id`. Idempotent — stopping a send
    /// this source never fed is a no-op.
    pub fn stop_feeding_effect(&self, send_id: usize) -> Result<(), SpatialError> {
        let entry = self.0.effect_gains.lock().unwrap_or_else(|e| e.into_inner()).remove(&send_id);
        if let Some(entry) = entry {
            self.0.sim.isolate(entry.gain_node)?;
        }
        Ok(())
    }
}

fn find_send(registry: &Arc<Mutex<EnvironmentRegistry>>, send_id: usize) -> Result<EffectSendSlot, SpatialError> {
    registry
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .effect_sends
        .iter()
        .find(|s| s.id == send_id)
        .copied()
        .ok_or(SpatialError::UnknownSendId(send_id))
}

/// A frozen-for-this-block view of the environment's listener transform and
/// resolved `Delegate` choices, built once in `EnvironmentNode::will_tick`
/// and shared read-only across every source's `update`.
pub struct EnvSnapshot {
    /// World-to-listener transform for this block.
    pub transform: WorldToListener,
    /// Concrete distance model (`Delegate` already resolved to `Linear`).
    pub distance_model: DistanceModel,
    /// Concrete panning strategy sources in `Delegate` mode resolve to.
    pub resolved_panning_strategy: multipanner::Strategy,
    /// Minimum reverb send gain multiplier (applied to the most distant
    /// sources at the reverb falloff horizon).
    pub min_reverb: f32,
    /// Maximum reverb send gain multiplier (applied to sources at zero
    /// distance).
    pub max_reverb: f32,
}

/// Recomputes one source's panner/gain-node properties for this block,
/// given the frozen environment snapshot and effect-send list. Runs
/// entirely through `Graph::get_property`/`set_property` on the already-
/// created nodes — no node creation happens here, only in
/// [`Source::feed_effect`].
pub(crate) fn update(
    shared: &Arc<SourceShared>,
    graph: &mut Graph,
    snapshot: &EnvSnapshot,
) {
    let node = shared.node;
    let position = graph.get_property(node, POSITION).ok().and_then(|v| v.as_float3()).unwrap_or([0.0, 0.0, 0.0]);
    let head_relative = graph.get_property(node, HEAD_RELATIVE).ok().and_then(|v| v.as_bool()).unwrap_or(false);
    let max_distance =
        graph.get_property(node, MAX_DISTANCE).ok().and_then(|v| v.as_float()).unwrap_or(DEFAULT_MAX_DISTANCE);
    let size = graph.get_property(node, SIZE).ok().and_then(|v| v.as_float()).unwrap_or(0.0);
    let reverb_distance = graph
        .get_property(node, REVERB_DISTANCE)
        .ok()
        .and_then(|v| v.as_float())
        .unwrap_or(DEFAULT_REVERB_DISTANCE);
    let mul = graph.get_property(node, MUL).ok().and_then(|v| v.as_float()).unwrap_or(1.0);

    let npos = if head_relative { position } else { snapshot.transform.transform_point(position) };
    let distance = (npos[0] * npos[0] + npos[1] * npos[1] + npos[2] * npos[2]).sqrt();
    let should_cull = distance > max_distance;

    handle_state_updates(shared, graph, should_cull);
    if should_cull {
        return;
    }

    let xz = (npos[0] * npos[0] + npos[2] * npos[2]).sqrt();
    let elevation = (npos[1].atan2(xz) * 180.0 / core::f32::consts::PI).clamp(-90.0, 90.0);
    let azimuth = npos[0].atan2(-npos[2]) * 180.0 / core::f32::consts::PI;

    let dry_base = distance::model_gain(snapshot.distance_model, distance, max_distance, size);
    let unscaled_reverb = 1.0 - distance::model_gain(snapshot.distance_model, distance, reverb_distance, 0.0);
    let scaled_reverb = snapshot.min_reverb + (snapshot.max_reverb - snapshot.min_reverb) * unscaled_reverb;

    let mut dry_gain = dry_base;
    let mut reverb_gain = dry_base * scaled_reverb;

    let active_reverb_sends =
        shared.effect_gains.lock().unwrap_or_else(|e| e.into_inner()).values().filter(|e| e.is_reverb).count();
    if active_reverb_sends > 0 {
        dry_gain *= 1.0 - scaled_reverb;
        reverb_gain /= active_reverb_sends as f32;
    } else {
        reverb_gain = 0.0;
    }

    dry_gain *= mul;
    reverb_gain *= mul;

    // The forwarded `panning_strategy` read returns the multipanner's own
    // current value, so this is really "what is the panner set to",
    // post-Delegate-resolution.
    let raw_strategy =
        graph.get_property(shared.multipanner, multipanner::STRATEGY).ok().and_then(|v| v.as_int()).unwrap_or(0);
    let concrete = match strategy_from_i64(raw_strategy) {
        multipanner::Strategy::Delegate => snapshot.resolved_panning_strategy,
        other => other,
    };
    let channels = match concrete {
        multipanner::Strategy::Hrtf => 2,
        other => other.channel_count().unwrap_or(2),
    };
    if shared.last_panner_channels.swap(channels, Ordering::Relaxed) != channels {
        let _ = graph.reconfigure(shared.multipanner, true, 0, channels);
    }

    let _ = graph.set_property(shared.multipanner, multipanner::AZIMUTH, PropertyValue::Float(azimuth));
    let _ = graph.set_property(shared.multipanner, multipanner::ELEVATION, PropertyValue::Float(elevation));
    let _ = graph.set_property(shared.multipanner, multipanner::DISTANCE, PropertyValue::Float(distance));
    let _ = graph.set_property(shared.multipanner, multipanner::MUL, PropertyValue::Float(dry_gain));

    for &panner_id in shared.effect_panners.lock().unwrap_or_else(|e| e.into_inner()).values() {
        let _ = graph.set_property(panner_id, amplitude_panner::AZIMUTH, PropertyValue::Float(azimuth));
        let _ = graph.set_property(panner_id, amplitude_panner::ELEVATION, PropertyValue::Float(elevation));
    }

    for entry in shared.effect_gains.lock().unwrap_or_else(|e| e.into_inner()).values() {
        let g = if entry.is_reverb { reverb_gain } else { dry_gain };
        let _ = graph.set_property(entry.gain_node, gain::GAIN, PropertyValue::Float(g));
    }
}

/// Applies the four-case cull transition table: `(was_culled, should_cull)`.
/// `(false, false)` and `(true, false)` both (re)apply the source's own
/// explicit state to its panner/input, which makes the table total (a
/// source paused by its owner while in range is silenced immediately,
/// rather than only on its next cull transition) without weakening the
/// `(true, true)` idempotence or the `(false, true)`/cull-entry override.
fn handle_state_updates(shared: &Arc<SourceShared>, graph: &mut Graph, should_cull: bool) {
    let was_culled = shared.culled.load(Ordering::Relaxed);
    let own_state = graph.state(shared.node).unwrap_or(NodeState::Playing);
    let input = *shared.input.lock().unwrap_or_else(|e| e.into_inner());

    match (was_culled, should_cull) {
        (true, true) => {}
        (false, true) => {
            let _ = graph.set_state(shared.multipanner, NodeState::Paused);
            if let Some(input_id) = input {
                let target = if matches!(own_state, NodeState::Paused) { NodeState::Paused } else { NodeState::AlwaysPlaying };
                let _ = graph.set_state(input_id, target);
            }
        }
        (false, false) | (true, false) => {
            let _ = graph.set_state(shared.multipanner, own_state);
            if let Some(input_id) = input {
                let _ = graph.set_state(input_id, own_state);
            }
        }
    }
    shared.culled.store(should_cull, Ordering::Relaxed);
}
