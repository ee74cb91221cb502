// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Core types used throughout mocapcodec.
//!
//! This module provides the foundational types for the library:
//! - [`MocapError`] - Error handling shared by every layer
//! - [`Timestamp`] - Logical clock used by the pipeline

pub mod clock;
pub mod error;

pub use clock::Timestamp;
pub use error::{MocapError, Result};
