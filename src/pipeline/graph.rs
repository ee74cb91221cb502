// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Demand-driven processing graph.
//!
//! The [`Pipeline`] owns its nodes in an arena and addresses them with
//! [`NodeId`] handles. Every node carries two logical timestamps: when its
//! configuration was last modified, and when its outputs were last
//! computed. Updating an output first updates the nodes feeding it
//! (depth-first), then regenerates the owner only if one of its inputs, or
//! its own configuration, is newer than its outputs.

use std::sync::Arc;

use crate::core::Timestamp;
use crate::{MocapError, Result};

use super::node::{ProcessNode, SharedAcquisition};

/// Handle of a node in a [`Pipeline`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Handle of the output slot `index` of this node.
    pub const fn output(self, index: usize) -> OutputId {
        OutputId { node: self, index }
    }

    pub const fn index(self) -> usize {
        self.0
    }
}

/// Handle of one output slot of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OutputId {
    node: NodeId,
    index: usize,
}

impl OutputId {
    pub const fn node(self) -> NodeId {
        self.node
    }

    pub const fn index(self) -> usize {
        self.index
    }
}

/// Freshness of an output slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputState {
    /// Never computed, or older than an input or the node configuration
    Stale,
    /// Being computed
    Computing,
    /// Up to date with every input
    Fresh,
}

#[derive(Debug)]
struct NodeEntry {
    node: Box<dyn ProcessNode>,
    inputs: Vec<Option<OutputId>>,
    outputs: Vec<Option<SharedAcquisition>>,
    modified: Timestamp,
    computed: Timestamp,
    updating: bool,
}

impl NodeEntry {
    fn needs_update(&self, newest_input: Timestamp) -> bool {
        self.computed.is_zero() || self.modified > self.computed || newest_input > self.computed
    }
}

/// Arena of process nodes and their connections.
///
/// # Example
///
/// ```rust,no_run
/// use mocapcodec::pipeline::{AcquisitionFileReader, Pipeline, SubAcquisitionFilter};
///
/// let mut pipeline = Pipeline::new();
/// let reader = pipeline.add_node(AcquisitionFileReader::new().with_filename("gait.c3d"));
/// let filter = pipeline.add_node(SubAcquisitionFilter::new().with_frames_index(10, 59));
/// pipeline.connect(reader.output(0), filter, 0)?;
///
/// let cropped = pipeline.update(filter.output(0))?;
/// assert_eq!(cropped.point_frame_number(), 50);
/// # Ok::<(), mocapcodec::MocapError>(())
/// ```
#[derive(Debug, Default)]
pub struct Pipeline {
    nodes: Vec<NodeEntry>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes in the graph.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Add a node and return its handle.
    pub fn add_node<N: ProcessNode>(&mut self, node: N) -> NodeId {
        self.add_boxed(Box::new(node))
    }

    pub fn add_boxed(&mut self, node: Box<dyn ProcessNode>) -> NodeId {
        let id = NodeId(self.nodes.len());
        tracing::debug!(node = node.name(), id = id.0, "added pipeline node");
        self.nodes.push(NodeEntry {
            inputs: vec![None; node.input_number()],
            outputs: vec![None; node.output_number()],
            node,
            modified: Timestamp::now(),
            computed: Timestamp::ZERO,
            updating: false,
        });
        id
    }

    fn entry(&self, id: NodeId) -> Result<&NodeEntry> {
        self.nodes
            .get(id.0)
            .ok_or_else(|| MocapError::index_out_of_range("pipeline nodes", id.0, self.nodes.len()))
    }

    fn entry_mut(&mut self, id: NodeId) -> Result<&mut NodeEntry> {
        let len = self.nodes.len();
        self.nodes
            .get_mut(id.0)
            .ok_or_else(|| MocapError::index_out_of_range("pipeline nodes", id.0, len))
    }

    fn check_output(&self, output: OutputId) -> Result<&NodeEntry> {
        let entry = self.entry(output.node)?;
        if output.index >= entry.outputs.len() {
            return Err(MocapError::index_out_of_range(
                format!("outputs of {}", entry.node.name()),
                output.index,
                entry.outputs.len(),
            ));
        }
        Ok(entry)
    }

    /// Feed the input slot `input` of `target` with `source`.
    ///
    /// Replaces any previous connection and makes `target` stale.
    pub fn connect(&mut self, source: OutputId, target: NodeId, input: usize) -> Result<()> {
        self.check_output(source)?;
        let entry = self.entry_mut(target)?;
        let len = entry.inputs.len();
        let name = entry.node.name();
        let slot = entry
            .inputs
            .get_mut(input)
            .ok_or_else(|| MocapError::index_out_of_range(format!("inputs of {name}"), input, len))?;
        *slot = Some(source);
        entry.modified = Timestamp::now();
        Ok(())
    }

    /// Remove the connection of an input slot, returning the former source.
    pub fn disconnect(&mut self, target: NodeId, input: usize) -> Result<Option<OutputId>> {
        let entry = self.entry_mut(target)?;
        let len = entry.inputs.len();
        let name = entry.node.name();
        let slot = entry
            .inputs
            .get_mut(input)
            .ok_or_else(|| MocapError::index_out_of_range(format!("inputs of {name}"), input, len))?;
        let previous = slot.take();
        entry.modified = Timestamp::now();
        Ok(previous)
    }

    /// Source connected to an input slot.
    pub fn input(&self, target: NodeId, input: usize) -> Option<OutputId> {
        self.nodes.get(target.0)?.inputs.get(input).copied().flatten()
    }

    /// Borrow a node with its concrete type.
    pub fn node<N: ProcessNode>(&self, id: NodeId) -> Option<&N> {
        self.nodes.get(id.0)?.node.as_any().downcast_ref::<N>()
    }

    /// Borrow a node mutably with its concrete type.
    ///
    /// The node is considered modified: its outputs become stale.
    pub fn node_mut<N: ProcessNode>(&mut self, id: NodeId) -> Option<&mut N> {
        let entry = self.nodes.get_mut(id.0)?;
        if !entry.node.as_any().is::<N>() {
            return None;
        }
        entry.modified = Timestamp::now();
        entry.node.as_any_mut().downcast_mut::<N>()
    }

    /// Mark a node as modified so that its next update recomputes it.
    pub fn touch(&mut self, id: NodeId) -> Result<()> {
        self.entry_mut(id)?.modified = Timestamp::now();
        Ok(())
    }

    /// Freshness of an output, without updating anything.
    pub fn state(&self, output: OutputId) -> Result<OutputState> {
        self.check_output(output)?;
        if self.is_updating(output.node) {
            return Ok(OutputState::Computing);
        }
        if self.is_stale(output.node) {
            Ok(OutputState::Stale)
        } else {
            Ok(OutputState::Fresh)
        }
    }

    fn is_updating(&self, id: NodeId) -> bool {
        self.nodes.get(id.0).is_some_and(|entry| entry.updating)
    }

    fn is_stale(&self, id: NodeId) -> bool {
        let Some(entry) = self.nodes.get(id.0) else {
            return true;
        };
        let mut newest = Timestamp::ZERO;
        for source in entry.inputs.iter().flatten() {
            if self.is_stale(source.node) {
                return true;
            }
            if let Some(upstream) = self.nodes.get(source.node.0) {
                newest = newest.max(upstream.computed);
            }
        }
        entry.needs_update(newest)
    }

    /// Logical time of the last computation of an output.
    pub fn timestamp(&self, output: OutputId) -> Result<Timestamp> {
        Ok(self.check_output(output)?.computed)
    }

    /// Last computed data of an output, without updating anything.
    pub fn data(&self, output: OutputId) -> Option<SharedAcquisition> {
        self.nodes.get(output.node.0)?.outputs.get(output.index)?.clone()
    }

    /// Bring an output up to date and return its data.
    pub fn update(&mut self, output: OutputId) -> Result<SharedAcquisition> {
        self.check_output(output)?;
        self.update_node(output.node)?;
        self.data(output).ok_or_else(|| {
            MocapError::invariant_violation(format!(
                "output #{} of node #{} holds no data after its update",
                output.index, output.node.0
            ))
        })
    }

    /// Bring every output of a node up to date.
    ///
    /// This is how sinks without outputs (writers) are run.
    pub fn update_node(&mut self, id: NodeId) -> Result<()> {
        let entry = self.entry_mut(id)?;
        if entry.updating {
            return Err(MocapError::invariant_violation(format!(
                "cycle detected in the pipeline at node {}",
                entry.node.name()
            )));
        }
        entry.updating = true;
        let result = self.refresh(id);
        if let Some(entry) = self.nodes.get_mut(id.0) {
            entry.updating = false;
        }
        result
    }

    fn refresh(&mut self, id: NodeId) -> Result<()> {
        let sources = self.entry(id)?.inputs.clone();
        let mut newest = Timestamp::ZERO;
        for source in sources.iter().flatten() {
            self.update_node(source.node)?;
            newest = newest.max(self.entry(source.node)?.computed);
        }

        if !self.entry(id)?.needs_update(newest) {
            return Ok(());
        }

        let inputs: Vec<Option<SharedAcquisition>> = sources
            .iter()
            .map(|source| source.and_then(|source| self.data(source)))
            .collect();

        let entry = self.entry_mut(id)?;
        tracing::debug!(node = entry.node.name(), id = id.0, "generating data");
        let produced = entry.node.generate_data(&inputs)?;
        if produced.len() != entry.outputs.len() {
            return Err(MocapError::invariant_violation(format!(
                "node {} produced {} outputs instead of {}",
                entry.node.name(),
                produced.len(),
                entry.outputs.len()
            )));
        }
        entry.outputs = produced.into_iter().map(|data| Some(Arc::new(data))).collect();
        entry.computed = Timestamp::now();
        Ok(())
    }
}
