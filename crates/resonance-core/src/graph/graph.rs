//! The node arena: owns every node and connection, and knows how to
//! execute one node's `process()` given the current connection topology.
//!
//! Nodes live in a `Vec<Option<NodeData>>` arena rather than behind
//! `Arc`/`Rc` edges, so connections are plain index pairs (`NodeId`,
//! `EdgeId`) and cannot form ownership cycles — `isolate()` is just "remove
//! every edge touching this index", which can never leak (see DESIGN.md).

use super::connection::{Edge, EdgeId, Slot};
use super::error::GraphError;
use super::node::{NodeBehavior, NodeId, NodeState, ProcessContext, WillTickContext};
use super::property::{PropertyTable, PropertyTag, PropertyValue};
use super::task_queue::TaskQueue;
use crate::remix;

/// No-op placeholder swapped into a node's `behavior` slot while its real
/// behavior is on loan to [`Graph::run_will_tick`] (which needs `&mut Graph`
/// at the same time as the behavior it's calling into).
struct NullBehavior;

impl NodeBehavior for NullBehavior {
    fn process(&mut self, _ctx: &mut ProcessContext<'_>) {}
}

pub(crate) struct NodeData {
    pub id: NodeId,
    pub label: &'static str,
    pub behavior: Box<dyn NodeBehavior>,
    pub state: NodeState,
    pub properties: PropertyTable,
    pub inputs: Vec<Slot>,
    pub outputs: Vec<Slot>,
    pub output_buffers: Vec<Vec<Vec<f32>>>,
    pub input_buffers: Vec<Vec<Vec<f32>>>,
    pub incoming: Vec<EdgeId>,
    pub outgoing: Vec<EdgeId>,
    pub creation_id: u64,
    pub ran_this_block: bool,
}

impl NodeData {
    fn resize_output_buffers(&mut self, block_size: usize) {
        self.output_buffers = self
            .outputs
            .iter()
            .map(|s| vec![vec![0.0; block_size]; s.channels])
            .collect();
    }

    fn resize_input_buffers(&mut self, block_size: usize) {
        self.input_buffers = self
            .inputs
            .iter()
            .map(|s| vec![vec![0.0; block_size]; s.channels])
            .collect();
    }
}

/// The mutable node/connection graph. A thin layer above this (`Scheduler`,
/// `Simulation`) adds topological ordering and realtime-safety discipline;
/// this struct is purely the arena and its invariants.
pub struct Graph {
    pub(crate) nodes: Vec<Option<NodeData>>,
    pub(crate) edges: Vec<Option<Edge>>,
    next_node: u32,
    next_edge: u32,
    next_creation_id: u64,
    pub(crate) block_size: usize,
    pub(crate) sample_rate: f32,
}

impl Graph {
    /// Creates an empty graph at the given sample rate / block size.
    pub fn new(sample_rate: f32, block_size: usize) -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            next_node: 0,
            next_edge: 0,
            next_creation_id: 0,
            block_size,
            sample_rate,
        }
    }

    /// Resizes every node's buffers to a new block size (used if the output
    /// device requests a different block size than the simulation default).
    pub fn resize_block(&mut self, block_size: usize) {
        self.block_size = block_size;
        for slot in self.nodes.iter_mut().flatten() {
            slot.resize_output_buffers(block_size);
            slot.resize_input_buffers(block_size);
        }
    }

    fn data(&self, id: NodeId) -> Result<&NodeData, GraphError> {
        self.nodes
            .get(id.0 as usize)
            .and_then(|s| s.as_ref())
            .ok_or(GraphError::InvalidHandle(id))
    }

    fn data_mut(&mut self, id: NodeId) -> Result<&mut NodeData, GraphError> {
        self.nodes
            .get_mut(id.0 as usize)
            .and_then(|s| s.as_mut())
            .ok_or(GraphError::InvalidHandle(id))
    }

    /// Registers a new node with `input_channels.len()` input slots and
    /// `output_channels.len()` output slots, each sized as given.
    pub fn create_node(
        &mut self,
        label: &'static str,
        behavior: Box<dyn NodeBehavior>,
        input_channels: &[usize],
        output_channels: &[usize],
        properties: PropertyTable,
    ) -> NodeId {
        let id = NodeId(self.next_node);
        self.next_node += 1;
        let creation_id = self.next_creation_id;
        self.next_creation_id += 1;
        let mut data = NodeData {
            id,
            label,
            behavior,
            state: NodeState::Playing,
            properties,
            inputs: input_channels.iter().map(|&c| Slot { channels: c }).collect(),
            outputs: output_channels.iter().map(|&c| Slot { channels: c }).collect(),
            output_buffers: Vec::new(),
            input_buffers: Vec::new(),
            incoming: Vec::new(),
            outgoing: Vec::new(),
            creation_id,
            ran_this_block: false,
        };
        data.resize_output_buffers(self.block_size);
        data.resize_input_buffers(self.block_size);
        if id.0 as usize == self.nodes.len() {
            self.nodes.push(Some(data));
        } else {
            self.nodes[id.0 as usize] = Some(data);
        }
        id
    }

    /// Appends a new input slot with `channels` channels, returning its
    /// index.
    pub fn append_input(&mut self, node: NodeId, channels: usize) -> Result<usize, GraphError> {
        let data = self.data_mut(node)?;
        data.inputs.push(Slot { channels });
        data.input_buffers.push(vec![vec![0.0; self.block_size]; channels]);
        Ok(data.inputs.len() - 1)
    }

    /// Appends a new output slot with `channels` channels, returning its
    /// index.
    pub fn append_output(&mut self, node: NodeId, channels: usize) -> Result<usize, GraphError> {
        let data = self.data_mut(node)?;
        data.outputs.push(Slot { channels });
        data.output_buffers.push(vec![vec![0.0; self.block_size]; channels]);
        Ok(data.outputs.len() - 1)
    }

    /// Changes the channel count of an existing slot in place, without
    /// disturbing its connections. Invalidates the plan (channel-count
    /// changes can change remix matrices).
    pub fn reconfigure(
        &mut self,
        node: NodeId,
        output: bool,
        index: usize,
        channels: usize,
    ) -> Result<(), GraphError> {
        let block_size = self.block_size;
        let data = self.data_mut(node)?;
        let slot = if output {
            data.outputs.get_mut(index)
        } else {
            data.inputs.get_mut(index)
        }
        .ok_or(GraphError::InvalidSlot {
            node,
            kind: if output { "output" } else { "input" },
            index,
        })?;
        slot.channels = channels;
        if output {
            data.output_buffers[index] = vec![vec![0.0; block_size]; channels];
        } else {
            data.input_buffers[index] = vec![vec![0.0; block_size]; channels];
        }
        Ok(())
    }

    /// Connects `from`'s output slot to `to`'s input slot. Channel mismatch
    /// between the two slots is resolved by remix at processing time — no
    /// matrix is stored on the edge itself, since slot channel counts (and
    /// therefore the matrix) can change live via `reconfigure`.
    pub fn connect(
        &mut self,
        from: NodeId,
        from_output: usize,
        to: NodeId,
        to_input: usize,
    ) -> Result<EdgeId, GraphError> {
        {
            let f = self.data(from)?;
            if from_output >= f.outputs.len() {
                return Err(GraphError::InvalidSlot { node: from, kind: "output", index: from_output });
            }
        }
        {
            let t = self.data(to)?;
            if to_input >= t.inputs.len() {
                return Err(GraphError::InvalidSlot { node: to, kind: "input", index: to_input });
            }
        }
        let id = EdgeId(self.next_edge);
        self.next_edge += 1;
        let edge = Edge { id, from, from_output, to, to_input };
        if id.0 as usize == self.edges.len() {
            self.edges.push(Some(edge));
        } else {
            self.edges[id.0 as usize] = Some(edge);
        }
        self.data_mut(from)?.outgoing.push(id);
        self.data_mut(to)?.incoming.push(id);
        Ok(id)
    }

    /// Removes a single connection.
    pub fn disconnect(&mut self, edge: EdgeId) -> Result<(), GraphError> {
        let Some(e) = self.edges.get(edge.0 as usize).and_then(|e| e.as_ref()) else {
            return Ok(());
        };
        let (from, to) = (e.from, e.to);
        if let Ok(f) = self.data_mut(from) {
            f.outgoing.retain(|e| *e != edge);
        }
        if let Ok(t) = self.data_mut(to) {
            t.incoming.retain(|e| *e != edge);
        }
        self.edges[edge.0 as usize] = None;
        Ok(())
    }

    /// Severs every connection touching `node`, incoming and outgoing.
    /// Should be called before a node's last external handle is dropped.
    /// With an arena-backed graph this is topology hygiene, not memory
    /// safety: an un-isolated node simply keeps running (or keeps being a
    /// no-op dependency) rather than leaking.
    pub fn isolate(&mut self, node: NodeId) -> Result<(), GraphError> {
        let (incoming, outgoing) = {
            let data = self.data(node)?;
            (data.incoming.clone(), data.outgoing.clone())
        };
        for e in incoming.into_iter().chain(outgoing) {
            self.disconnect(e)?;
        }
        Ok(())
    }

    /// Sets a node's play state.
    pub fn set_state(&mut self, node: NodeId, state: NodeState) -> Result<(), GraphError> {
        self.data_mut(node)?.state = state;
        Ok(())
    }

    /// Reads a node's play state.
    pub fn state(&self, node: NodeId) -> Result<NodeState, GraphError> {
        Ok(self.data(node)?.state)
    }

    /// Clears a node's in-flight click-suppression state (see
    /// [`NodeBehavior::reset`]).
    pub fn reset_node(&mut self, node: NodeId) -> Result<(), GraphError> {
        self.data_mut(node)?.behavior.reset();
        Ok(())
    }

    /// Every node this one reads from: connection sources plus internal
    /// (subgraph) dependencies. Used by the scheduler to build the DAG.
    pub fn dependencies_unconditional(&self, node: NodeId) -> Result<Vec<NodeId>, GraphError> {
        let data = self.data(node)?;
        let mut deps: Vec<NodeId> = data
            .incoming
            .iter()
            .filter_map(|e| self.edges.get(e.0 as usize).and_then(|e| e.as_ref()))
            .map(|e| e.from)
            .collect();
        deps.extend(data.behavior.internal_dependencies().iter().copied());
        Ok(deps)
    }

    /// Nodes that directly consume `node`'s output (used to determine
    /// output-reachability).
    pub(crate) fn dependents(&self, node: NodeId) -> Vec<NodeId> {
        self.data(node)
            .map(|data| {
                data.outgoing
                    .iter()
                    .filter_map(|e| self.edges.get(e.0 as usize).and_then(|e| e.as_ref()))
                    .map(|e| e.to)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// All currently live node ids, in creation order.
    pub(crate) fn all_ids_by_creation(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self.nodes.iter().flatten().map(|n| n.id).collect();
        ids.sort_by_key(|id| self.data(*id).map(|d| d.creation_id).unwrap_or(u64::MAX));
        ids
    }

    pub(crate) fn creation_id(&self, node: NodeId) -> u64 {
        self.data(node).map(|d| d.creation_id).unwrap_or(u64::MAX)
    }

    // --- Properties -----------------------------------------------------

    /// Reads a property, following forward redirects to their final target.
    pub fn get_property(&self, node: NodeId, tag: PropertyTag) -> Result<PropertyValue, GraphError> {
        let mut current = (node, tag);
        for _ in 0..64 {
            let data = self.data(current.0)?;
            let prop = data.properties.get(current.1)?;
            match prop.forward_target() {
                Some(target) => current = target,
                None => return Ok(prop.value().clone()),
            }
        }
        Err(GraphError::InvalidForwardTarget(tag))
    }

    /// Writes a property directly on `node`. Fails if the property forwards
    /// elsewhere (one-way mirror — write through the target instead).
    pub fn set_property(
        &mut self,
        node: NodeId,
        tag: PropertyTag,
        value: PropertyValue,
    ) -> Result<(), GraphError> {
        let data = self.data_mut(node)?;
        data.properties.get_mut(tag)?.set(tag, value)?;
        data.behavior.on_property_changed(tag, &mut data.properties);
        Ok(())
    }

    /// `true` if any of `tags` were written on `node` since the previous
    /// tick boundary. Follows forward redirects, since a forwarded
    /// property's modification state mirrors its target's.
    pub fn were_properties_modified(
        &self,
        node: NodeId,
        tags: &[PropertyTag],
    ) -> Result<bool, GraphError> {
        for &tag in tags {
            let mut current = (node, tag);
            for _ in 0..64 {
                let data = self.data(current.0)?;
                let prop = data.properties.get(current.1)?;
                match prop.forward_target() {
                    Some(target) => current = target,
                    None => {
                        if prop.is_modified() {
                            return Ok(true);
                        }
                        break;
                    }
                }
            }
        }
        Ok(false)
    }

    /// Registers a one-way forward: reads of `local_tag` on `node` redirect
    /// to `(other, other_tag)`.
    pub fn forward_property(
        &mut self,
        node: NodeId,
        local_tag: PropertyTag,
        other: NodeId,
        other_tag: PropertyTag,
    ) -> Result<(), GraphError> {
        // Validate the target actually exists.
        self.data(other)?.properties.get(other_tag)?;
        self.data_mut(node)?
            .properties
            .get_mut(local_tag)?
            .set_forward(Some((other, other_tag)));
        Ok(())
    }

    /// Clears every node's "modified since last observation" flags. Called
    /// by the scheduler at the end of each tick.
    pub(crate) fn clear_all_modified(&mut self) {
        for data in self.nodes.iter_mut().flatten() {
            for (_, prop) in data.properties.iter_mut() {
                prop.clear_modified();
            }
        }
    }

    // --- Processing -------------------------------------------------------

    /// Gathers a node's input buffers for this block: for each input slot,
    /// sums every incoming connection's (remixed) contribution, zeroing the
    /// slot first. Paused upstream nodes contribute silence (their output
    /// buffer was zeroed and never written this block).
    fn gather_inputs(&mut self, node: NodeId) {
        let incoming = self.data(node).map(|d| d.incoming.clone()).unwrap_or_default();
        let input_slot_count = self.data(node).map(|d| d.inputs.len()).unwrap_or(0);
        let mut scratch: Vec<Vec<Vec<f32>>> = self
            .data(node)
            .map(|d| d.inputs.iter().map(|s| vec![vec![0.0; self.block_size]; s.channels]).collect())
            .unwrap_or_default();

        for edge_id in incoming {
            let Some(edge) = self.edges.get(edge_id.0 as usize).and_then(|e| e.as_ref()) else {
                continue;
            };
            let (from, from_output, to_input) = (edge.from, edge.from_output, edge.to_input);
            if to_input >= input_slot_count {
                continue;
            }
            let (src_channels, dst_channels) = {
                let src = match self.data(from) {
                    Ok(s) => s,
                    Err(_) => continue,
                };
                let dst_channels = self.data(node).unwrap().inputs[to_input].channels;
                (src.outputs.get(from_output).map(|s| s.channels).unwrap_or(0), dst_channels)
            };
            let src_buffers = match self.data(from) {
                Ok(s) => match s.output_buffers.get(from_output) {
                    Some(b) => b.clone(),
                    None => continue,
                },
                Err(_) => continue,
            };
            if src_channels == dst_channels {
                for (ch, buf) in src_buffers.iter().enumerate() {
                    for (dst, src) in scratch[to_input][ch].iter_mut().zip(buf.iter()) {
                        *dst += *src;
                    }
                }
            } else {
                let matrix = remix::build_matrix(src_channels, dst_channels);
                let refs: Vec<&[f32]> = src_buffers.iter().map(|v| v.as_slice()).collect();
                let mut remixed = vec![vec![0.0f32; self.block_size]; dst_channels];
                remix::remix_planar(&matrix, &refs, &mut remixed);
                for (ch, buf) in remixed.iter().enumerate() {
                    for (dst, src) in scratch[to_input][ch].iter_mut().zip(buf.iter()) {
                        *dst += *src;
                    }
                }
            }
        }
        if let Ok(data) = self.data_mut(node) {
            data.input_buffers = scratch;
        }
    }

    /// Runs one node's `process()` for this block: gathers remixed inputs,
    /// zeros its outputs, invokes the behavior, marks it as having run.
    pub(crate) fn process_node(&mut self, node: NodeId, tasks: &mut TaskQueue) -> Result<(), GraphError> {
        self.gather_inputs(node);
        let block_size = self.block_size;
        let sample_rate = self.sample_rate;
        let data = self.data_mut(node)?;
        for buf in data.output_buffers.iter_mut() {
            for ch in buf.iter_mut() {
                ch.fill(0.0);
            }
        }
        let mut ctx = ProcessContext {
            inputs: &data.input_buffers,
            outputs: &mut data.output_buffers,
            properties: &mut data.properties,
            block_size,
            sample_rate,
            tasks,
        };
        data.behavior.process(&mut ctx);
        data.ran_this_block = true;
        Ok(())
    }

    /// Runs a node's `will_tick`, giving it mutable access to the whole
    /// graph by temporarily swapping its own behavior out for a no-op
    /// placeholder. A callback that returns `Err` is logged (by the caller)
    /// and otherwise has no effect on the block.
    pub(crate) fn run_will_tick(&mut self, node: NodeId) -> Result<Result<(), String>, GraphError> {
        let mut behavior: Box<dyn NodeBehavior> = {
            let data = self.data_mut(node)?;
            std::mem::replace(&mut data.behavior, Box::new(NullBehavior))
        };
        let sample_rate = self.sample_rate;
        let block_size = self.block_size;
        let mut ctx = WillTickContext {
            graph: self,
            self_id: node,
            sample_rate,
            block_size,
        };
        let result = behavior.will_tick(&mut ctx);
        if let Ok(data) = self.data_mut(node) {
            data.behavior = behavior;
        }
        Ok(result)
    }

    pub(crate) fn reset_ran_flags(&mut self) {
        for data in self.nodes.iter_mut().flatten() {
            data.ran_this_block = false;
        }
    }

    /// Reads back a node's output slot after processing (used by the
    /// simulation to pull the final mix, and by tests).
    pub fn output_buffer(&self, node: NodeId, output: usize) -> Result<&[Vec<f32>], GraphError> {
        let data = self.data(node)?;
        data.output_buffers
            .get(output)
            .map(|v| v.as_slice())
            .ok_or(GraphError::InvalidSlot { node, kind: "output", index: output })
    }

    /// Direct mutable access to an output buffer — used by leaf source
    /// nodes (oscillators, file playback) that generate rather than derive
    /// samples. Exposed so custom node implementations defined outside this
    /// crate's `nodes` module can still write their output without a
    /// round-trip through `process_node`.
    pub fn output_buffer_mut(&mut self, node: NodeId, output: usize) -> Result<&mut [Vec<f32>], GraphError> {
        let data = self.data_mut(node)?;
        data.output_buffers
            .get_mut(output)
            .map(|v| v.as_mut_slice())
            .ok_or(GraphError::InvalidSlot { node, kind: "output", index: output })
    }

    pub(crate) fn label(&self, node: NodeId) -> &'static str {
        self.data(node).map(|d| d.label).unwrap_or("<invalid>")
    }
}

/// Counts of live nodes/edges, useful for logging and tests.
pub struct GraphStats {
    /// Number of live nodes.
    pub nodes: usize,
    /// Number of live connections.
    pub edges: usize,
}

impl Graph {
    /// Snapshot of how many nodes/edges currently exist.
    pub fn stats(&self) -> GraphStats {
        GraphStats {
            nodes: self.nodes.iter().filter(|n| n.is_some()).count(),
            edges: self.edges.iter().filter(|e| e.is_some()).count(),
        }
    }
}
