// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! The process node abstraction.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::model::Acquisition;
use crate::{MocapError, Result};

/// An acquisition shared read-only between pipeline edges.
pub type SharedAcquisition = Arc<Acquisition>;

/// A node of the processing graph: a reader, a writer or a transform.
///
/// A node declares how many inputs and outputs it has. The graph calls
/// [`generate_data`](ProcessNode::generate_data) with the current data of
/// every input (in input order, `None` when not connected) and stores the
/// returned acquisitions as the node outputs.
///
/// Inputs are shared with other consumers and must never be modified;
/// a transform clones what it needs into its own outputs.
///
/// # Example
///
/// ```rust
/// use std::any::Any;
/// use mocapcodec::model::Acquisition;
/// use mocapcodec::pipeline::{required_input, ProcessNode, SharedAcquisition};
/// use mocapcodec::Result;
///
/// #[derive(Debug)]
/// struct DropEvents;
///
/// impl ProcessNode for DropEvents {
///     fn name(&self) -> &'static str {
///         "DropEvents"
///     }
///
///     fn generate_data(&mut self, inputs: &[Option<SharedAcquisition>]) -> Result<Vec<Acquisition>> {
///         let mut output = required_input(inputs, 0, self.name())?.clone();
///         output.clear_events();
///         Ok(vec![output])
///     }
///
///     fn as_any(&self) -> &dyn Any { self }
///     fn as_any_mut(&mut self) -> &mut dyn Any { self }
/// }
/// ```
pub trait ProcessNode: fmt::Debug + 'static {
    /// Name used in logs and error messages.
    fn name(&self) -> &'static str;

    /// Number of input slots.
    fn input_number(&self) -> usize {
        1
    }

    /// Number of output slots.
    fn output_number(&self) -> usize {
        1
    }

    /// Compute every output from the inputs.
    ///
    /// Must return exactly [`output_number`](ProcessNode::output_number)
    /// acquisitions.
    fn generate_data(&mut self, inputs: &[Option<SharedAcquisition>]) -> Result<Vec<Acquisition>>;

    /// Downcast to `Any` for accessing node-specific options.
    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Get the input at `index`, failing when it is not connected or was never
/// computed.
pub fn required_input<'a>(
    inputs: &'a [Option<SharedAcquisition>],
    index: usize,
    node: &str,
) -> Result<&'a Acquisition> {
    inputs
        .get(index)
        .and_then(Option::as_deref)
        .ok_or_else(|| MocapError::configuration(format!("{node}: input #{index} is missing.")))
}
