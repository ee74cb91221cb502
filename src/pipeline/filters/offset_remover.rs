// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Removal of the analog offsets measured in a separate recording.

use std::any::Any;

use crate::model::Acquisition;
use crate::pipeline::node::{required_input, ProcessNode, SharedAcquisition};
use crate::Result;

/// Index of the raw acquisition input.
pub const RAW_INPUT: usize = 0;
/// Index of the offset acquisition input.
pub const OFFSET_INPUT: usize = 1;

/// Subtracts from every raw analog channel the mean of the offset channel
/// with the same label. Channels without a counterpart are copied as is.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnalogOffsetRemover;

impl AnalogOffsetRemover {
    pub fn new() -> Self {
        Self
    }

    pub fn apply(&self, raw: &Acquisition, offset: &Acquisition) -> Acquisition {
        let mut output = raw.clone();
        for analog in output.analogs_mut().iter_mut() {
            let Some(reference) = offset.find_analog(analog.label()) else {
                continue;
            };
            let dc = reference.mean();
            for value in analog.values_mut() {
                *value -= dc;
            }
        }
        output
    }
}

impl ProcessNode for AnalogOffsetRemover {
    fn name(&self) -> &'static str {
        "AnalogOffsetRemover"
    }

    fn input_number(&self) -> usize {
        2
    }

    fn generate_data(&mut self, inputs: &[Option<SharedAcquisition>]) -> Result<Vec<Acquisition>> {
        let raw = required_input(inputs, RAW_INPUT, self.name())?;
        let offset = required_input(inputs, OFFSET_INPUT, self.name())?;
        Ok(vec![self.apply(raw, offset)])
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Analog;

    fn acquisition(channels: &[(&str, Vec<f64>)]) -> Acquisition {
        let frames = channels[0].1.len();
        let mut acq = Acquisition::new();
        acq.init(0, frames, 0, 1).unwrap();
        for (label, values) in channels {
            let mut analog = Analog::new(*label, frames);
            analog.values_mut().copy_from_slice(values);
            acq.append_analog(analog).unwrap();
        }
        acq
    }

    #[test]
    fn test_offsets_removed_by_label() {
        let raw = acquisition(&[
            ("Fx", vec![5.0, 6.0, 7.0]),
            ("Fy", vec![1.0, 1.0, 1.0]),
            ("Fz", vec![0.0, 3.0, 6.0]),
        ]);
        let offset = acquisition(&[("Fz", vec![1.0, 2.0]), ("Fx", vec![4.0, 6.0])]);
        let output = AnalogOffsetRemover::new().apply(&raw, &offset);

        assert_eq!(output.find_analog("Fx").unwrap().values(), &[0.0, 1.0, 2.0]);
        assert_eq!(output.find_analog("Fy").unwrap().values(), &[1.0, 1.0, 1.0]);
        assert_eq!(output.find_analog("Fz").unwrap().values(), &[-1.5, 1.5, 4.5]);
        assert_eq!(raw.find_analog("Fx").unwrap().values(), &[5.0, 6.0, 7.0]);
    }

    #[test]
    fn test_both_inputs_required() {
        let raw = std::sync::Arc::new(acquisition(&[("Fx", vec![1.0])]));
        let err = AnalogOffsetRemover::new()
            .generate_data(&[Some(raw), None])
            .unwrap_err();
        assert_eq!(err.cause(), "AnalogOffsetRemover: input #1 is missing.");
    }
}
