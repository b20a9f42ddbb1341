//! Topological scheduling: `plan()`, `tick()`, `invalidatePlan()`.
//!
//! The plan is a sequence of stages; nodes within a stage have no mutual
//! dependency, so a thread-pool-backed executor could in principle run them
//! concurrently — this implementation runs them serially, matching the
//! choice not to pull in a thread-pool dependency for a moderate-sized
//! graph. Tie-breaks within a stage are by node creation id, making test
//! output reproducible regardless of `HashMap`/arena iteration order.

use std::collections::{HashSet, VecDeque};

use super::graph::Graph;
use super::node::{NodeId, NodeState};
use super::task_queue::{Task, TaskQueue};

/// One stage of the plan: nodes with no dependency on one another, safe to
/// run in any order (or in parallel).
pub struct Stage {
    /// Node ids in this stage, already sorted by creation id.
    pub nodes: Vec<NodeId>,
}

/// A compiled topological order, grouped into dependency-free stages.
#[derive(Default)]
pub struct Plan {
    stages: Vec<Stage>,
    /// Edges the planner had to treat as a one-block-delayed feedback path
    /// to break a cycle, for diagnostics/tests.
    pub feedback_edges: Vec<(NodeId, NodeId)>,
}

impl Plan {
    /// Iterates stages in execution order.
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }
}

/// Owns a [`Graph`] and the compiled [`Plan`] derived from its current
/// topology and node states.
pub struct Scheduler {
    graph: Graph,
    plan: Plan,
    dirty: bool,
    output_node: Option<NodeId>,
    tasks: TaskQueue,
}

impl Scheduler {
    /// Creates a scheduler over a fresh graph.
    pub fn new(sample_rate: f32, block_size: usize) -> Self {
        Self {
            graph: Graph::new(sample_rate, block_size),
            plan: Plan::default(),
            dirty: true,
            output_node: None,
            tasks: TaskQueue::new(),
        }
    }

    /// Shared reference to the underlying graph (node/connection/property
    /// operations all live there).
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Mutable reference to the underlying graph. Any topology-affecting
    /// mutation (connect/disconnect/reconfigure/state change) should be
    /// followed by [`Scheduler::invalidate_plan`] — the node-graph mutation
    /// helpers on [`Scheduler`] itself do this automatically; reach for
    /// `graph_mut()` only for property get/set, which never invalidates.
    pub fn graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }

    /// Designates the node whose reachability anchors liveness — normally
    /// the simulation's environment output / final mix node.
    pub fn set_output_node(&mut self, node: NodeId) {
        self.output_node = Some(node);
        self.invalidate_plan();
    }

    /// Marks the plan stale; the next [`Scheduler::tick`] recomputes before
    /// use. Called automatically by topology/state mutations routed through
    /// this type; call directly after mutating the graph through
    /// [`Scheduler::graph_mut`] in ways that affect reachability (state
    /// changes, connect/disconnect, slot reconfiguration).
    pub fn invalidate_plan(&mut self) {
        self.dirty = true;
    }

    /// Recomputes the topological order from the current connection graph
    /// and node states, if the plan is stale. A Kahn-style sort over the
    /// *live* subgraph: a node is live if its state is not `Paused`, and
    /// either it's an ancestor of the output node or its state is
    /// `AlwaysPlaying`. Cycles (feedback connections) are tolerated by
    /// dropping one back-edge per cycle from the ordering constraint — the
    /// consumer on that edge reads the producer's previous-block output,
    /// since the producer simply hasn't run yet this block when the
    /// consumer does (see module docs).
    pub fn plan(&mut self) {
        if !self.dirty {
            return;
        }
        self.dirty = false;
        self.plan = Plan::default();

        let Some(output) = self.output_node else {
            return;
        };

        let ancestors = self.ancestors_of(output);
        let live: Vec<NodeId> = self
            .graph
            .all_ids_by_creation()
            .into_iter()
            .filter(|&n| {
                let state = self.graph.state(n).unwrap_or(NodeState::Paused);
                !matches!(state, NodeState::Paused)
                    && (ancestors.contains(&n) || matches!(state, NodeState::AlwaysPlaying))
            })
            .collect();
        let live_set: HashSet<NodeId> = live.iter().copied().collect();

        // in-degree counts restricted to the live subgraph
        let mut indegree: std::collections::HashMap<NodeId, usize> = live
            .iter()
            .map(|&n| {
                let deps = self.graph.dependencies_unconditional(n).unwrap_or_default();
                let count = deps.iter().filter(|d| live_set.contains(d)).count();
                (n, count)
            })
            .collect();

        let mut ready: VecDeque<NodeId> = live
            .iter()
            .copied()
            .filter(|n| indegree[n] == 0)
            .collect();
        sort_by_creation(&self.graph, &mut ready);

        let mut remaining: HashSet<NodeId> = live_set.clone();
        let mut feedback_edges = Vec::new();

        while !remaining.is_empty() {
            let mut stage_nodes: Vec<NodeId> = Vec::new();

            if ready.is_empty() {
                // Cycle: every remaining node has nonzero live in-degree.
                // Break it deterministically by forcing the lowest
                // creation-id remaining node into the ready set, treating
                // its unresolved dependency edges as one-block-delayed
                // feedback.
                let mut left: Vec<NodeId> = remaining.iter().copied().collect();
                sort_by_creation(&self.graph, &mut left);
                if let Some(&forced) = left.first() {
                    for dep in self.graph.dependencies_unconditional(forced).unwrap_or_default() {
                        if remaining.contains(&dep) {
                            feedback_edges.push((dep, forced));
                        }
                    }
                    ready.push_back(forced);
                } else {
                    break;
                }
            }

            while let Some(n) = ready.pop_front() {
                if !remaining.remove(&n) {
                    continue;
                }
                stage_nodes.push(n);
                for dependent in self.graph.dependents(n) {
                    if let Some(count) = indegree.get_mut(&dependent) {
                        if *count > 0 {
                            *count -= 1;
                        }
                        if *count == 0 && remaining.contains(&dependent) {
                            ready.push_back(dependent);
                        }
                    }
                }
            }

            stage_nodes.sort_by_key(|n| self.graph.creation_id(*n));
            if !stage_nodes.is_empty() {
                self.plan.stages.push(Stage { nodes: stage_nodes });
            }
            sort_by_creation(&self.graph, &mut ready);
        }

        self.plan.feedback_edges = feedback_edges;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            stages = self.plan.stages.len(),
            live_nodes = live_set.len(),
            feedback_edges = self.plan.feedback_edges.len(),
            "recomputed schedule plan"
        );
    }

    fn ancestors_of(&self, node: NodeId) -> HashSet<NodeId> {
        let mut seen = HashSet::new();
        let mut stack = vec![node];
        seen.insert(node);
        while let Some(n) = stack.pop() {
            for dep in self.graph.dependencies_unconditional(n).unwrap_or_default() {
                if seen.insert(dep) {
                    stack.push(dep);
                }
            }
        }
        seen
    }

    /// Runs exactly one block: recomputes the plan if stale, invokes
    /// `will_tick` on every live node (in creation-id order for
    /// reproducibility, though nothing depends on the order across nodes),
    /// executes every stage in order, then drains the task queue. Returns
    /// the queued tasks for the caller to run outside the mix lock.
    pub fn tick(&mut self) -> Vec<Task> {
        self.plan();
        self.graph.reset_ran_flags();

        let mut will_tick_nodes = self.graph.all_ids_by_creation();
        will_tick_nodes.retain(|n| !matches!(self.graph.state(*n), Ok(NodeState::Paused)));
        for n in will_tick_nodes {
            if let Ok(Err(_msg)) = self.graph.run_will_tick(n) {
                #[cfg(feature = "tracing")]
                tracing::warn!(node = ?n, label = self.graph.label(n), message = %_msg, "pre-tick callback failed; skipped for this block");
            }
        }

        for stage in &self.plan.stages {
            for &node in &stage.nodes {
                let _ = self.graph.process_node(node, &mut self.tasks);
            }
        }

        self.graph.clear_all_modified();
        self.tasks.drain()
    }
}

fn sort_by_creation(graph: &Graph, nodes: &mut VecDeque<NodeId>) {
    let mut v: Vec<NodeId> = nodes.drain(..).collect();
    v.sort_by_key(|n| graph.creation_id(*n));
    nodes.extend(v);
}
