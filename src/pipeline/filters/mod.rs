// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Transforms between readers and writers.

pub mod offset_remover;
pub mod sub_acquisition;

pub use offset_remover::AnalogOffsetRemover;
pub use sub_acquisition::{ExtractionOption, SubAcquisitionFilter};
