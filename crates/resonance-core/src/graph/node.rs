//! Node identity, play state, and the per-block processing contract.

use super::property::PropertyTable;
use super::task_queue::TaskQueue;

/// Unique identifier for a node in a [`super::Graph`]'s arena.
///
/// Assigned sequentially and never reused within a graph instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Returns the raw numeric identifier.
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

/// A node's play state, governing whether the scheduler runs it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeState {
    /// Never runs, regardless of reachability from the output.
    Paused,
    /// Runs if (and only if) it is an ancestor of the output.
    Playing,
    /// Always runs, whether or not it is reachable from the output — used to
    /// keep a culled source's buffer player advancing.
    AlwaysPlaying,
}

/// Everything a node's [`NodeBehavior::process`] needs for one block: the
/// already-remixed input buffers, the output buffers to fill, and handles
/// back into the simulation for properties and deferred (post-block) work.
pub struct ProcessContext<'a> {
    /// Per-input-slot channel buffers, already remixed to the slot's
    /// declared channel count.
    pub inputs: &'a [Vec<Vec<f32>>],
    /// Per-output-slot channel buffers to fill. Pre-zeroed by the scheduler
    /// before `process()` is invoked.
    pub outputs: &'a mut [Vec<Vec<f32>>],
    /// This node's property table.
    pub properties: &'a mut PropertyTable,
    /// Samples per block.
    pub block_size: usize,
    /// The simulation's sample rate.
    pub sample_rate: f32,
    /// Queue for work that must run outside the mix lock (buffer-end
    /// callbacks, crossfade-complete events). Drained by the scheduler after
    /// the block's final stage.
    pub tasks: &'a mut TaskQueue,
}

/// The behavior a concrete node kind (gain, buffer player, delay, panner...)
/// implements. Identity, connections, state, and properties are handled
/// generically by the graph; this trait is strictly the DSP/logic contract.
pub trait NodeBehavior: Send {
    /// Render exactly one block into `ctx.outputs`, reading `ctx.inputs`.
    /// Invoked at most once per node per block, and only for live nodes (see
    /// [`super::Scheduler::plan`]).
    fn process(&mut self, ctx: &mut ProcessContext<'_>);

    /// Additional dependencies beyond declared input connections — used by
    /// composite nodes (e.g. a source's internal gain/panner subgraph) whose
    /// sub-nodes must be scheduled but are never exposed to the public
    /// connection API.
    fn internal_dependencies(&self) -> &[NodeId] {
        &[]
    }

    /// Called once, synchronously, right after a property set succeeds, with
    /// mutable access to this node's own property table (but no other
    /// node's — for that, use `will_tick`). Default implementation does
    /// nothing; nodes that keep derived state in sync with a property (e.g.
    /// the crossfading delay's `delay`/`delay_samples` pair) override this.
    fn on_property_changed(&mut self, _tag: &'static str, _properties: &mut PropertyTable) {}

    /// Called once per block, before any node's `process()`. Relative
    /// ordering between different nodes' `will_tick` calls is unspecified,
    /// but every `will_tick` runs before every `process()` in the same
    /// block. Only the environment node uses this in practice (recomputing
    /// the listener transform and updating sources, which requires reaching
    /// across the graph to other nodes' properties — hence the
    /// [`WillTickContext`] handle, unlike `process()` which only ever
    /// touches its own buffers). A pre-tick callback that returns `Err` is
    /// logged and skipped for the remainder of the block rather than
    /// aborting it.
    fn will_tick(&mut self, _ctx: &mut WillTickContext<'_>) -> Result<(), String> {
        Ok(())
    }

    /// Clears any in-flight click-suppression state (HRTF crossfades,
    /// pending delay interpolation) so the node starts clean the next time
    /// it becomes audible. Default implementation does nothing; used by a
    /// source's internal multipanner when a `playAsync` pair is re-seated
    /// from the cache, so the old source's direction doesn't bleed a
    /// crossfade into the new one.
    fn reset(&mut self) {}
}

/// Context passed to [`NodeBehavior::will_tick`]. Unlike [`ProcessContext`],
/// this exposes the whole graph (property reads/writes and state changes on
/// *other* nodes), since the environment's pre-tick work is exactly "update
/// every live source's panner/gain properties".
pub struct WillTickContext<'a> {
    /// The owning graph, with this node's own behavior temporarily removed
    /// (see [`super::graph::Graph::run_will_tick`]) so it can be mutated
    /// freely without aliasing the caller.
    pub graph: &'a mut super::graph::Graph,
    /// This node's own id (for self-reference, e.g. re-reading its own
    /// properties through the graph rather than a stale local copy).
    pub self_id: NodeId,
    /// The simulation's sample rate.
    pub sample_rate: f32,
    /// Samples per block.
    pub block_size: usize,
}
