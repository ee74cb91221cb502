// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! I/O layer for acquisition files.
//!
//! - [`binary`]: endian-aware binary stream over files or memory
//! - [`traits`]: the read/write contract implemented by every format
//! - [`formats`]: the format implementations
//! - [`detection`]: automatic format detection

pub mod binary;
pub mod detection;
pub mod formats;
pub mod traits;

pub use binary::{BinaryStream, ByteOrderFormat, OpenMode, SeekOrigin, StreamFailure};
pub use detection::{Dispatcher, SharedCodec};
pub use traits::AcquisitionCodec;
