// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Lazy, timestamp-memoized processing graph.
//!
//! A [`Pipeline`] connects [`ProcessNode`]s: file readers, transforms and
//! file writers. Pulling an output with [`Pipeline::update`] recomputes only
//! the nodes whose inputs or configuration changed since their last run.
//! Evaluation is synchronous and single-threaded.

pub mod filters;
pub mod graph;
pub mod node;
pub mod reader;
pub mod writer;

pub use filters::{AnalogOffsetRemover, ExtractionOption, SubAcquisitionFilter};
pub use graph::{NodeId, OutputId, OutputState, Pipeline};
pub use node::{required_input, ProcessNode, SharedAcquisition};
pub use reader::AcquisitionFileReader;
pub use writer::AcquisitionFileWriter;
