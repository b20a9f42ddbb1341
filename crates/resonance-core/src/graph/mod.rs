//! Node-graph kernel: arena-backed graph, typed properties, topological
//! scheduling, and the [`Simulation`] handle that ties them together.
//!
//! # Architecture
//!
//! Nodes live in a [`graph::Graph`] arena (a `Vec<Option<NodeData>>`)
//! addressed by [`node::NodeId`]; connections are a parallel arena of
//! [`connection::Edge`] addressed by [`connection::EdgeId`]. Index-pair
//! addressing means connections can never form an ownership cycle — a
//! feedback loop in the audio graph is just a cycle in the index graph,
//! tolerated by the scheduler rather than forbidden by the type system.
//!
//! [`schedule::Scheduler`] computes a topological [`schedule::Plan`] over
//! the *live* subgraph (nodes reachable from the designated output, plus
//! any [`node::NodeState::AlwaysPlaying`] node) and executes it one stage
//! at a time. [`mix_lock::ReentrantMixLock`] serializes all graph mutation
//! and the per-block tick against each other, while staying reentrant so a
//! property's post-change callback can safely call back into the same
//! [`Simulation`].
//!
//! [`task_queue::TaskQueue`] carries work that must run outside the mix
//! lock — buffer-end notifications, crossfade-complete events — so that a
//! callback can freely call back into the simulation without deadlocking
//! against itself.

pub mod connection;
pub mod error;
pub mod graph;
pub mod mix_lock;
pub mod node;
pub mod property;
pub mod schedule;
pub mod simulation;
pub mod task_queue;

pub use connection::{EdgeId, Slot};
pub use error::GraphError;
pub use graph::{Graph, GraphStats};
pub use mix_lock::{MixLockGuard, ReentrantMixLock};
pub use node::{NodeBehavior, NodeId, NodeState, ProcessContext, WillTickContext};
pub use property::{
    BufferHandle, Float3, Float6, Property, PropertyError, PropertyRange, PropertyTable,
    PropertyTag, PropertyValue,
};
pub use schedule::{Plan, Scheduler, Stage};
pub use simulation::Simulation;
pub use task_queue::{Task, TaskQueue};
