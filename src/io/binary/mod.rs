// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Endian-aware binary streams.
//!
//! [`BinaryStream`] reads and writes primitive values over a seekable byte
//! source with one byte-order/floating-point format chosen when the stream is
//! created. It knows nothing about acquisitions or file formats.
//!
//! Failures are reported through three flags (end-of-file, fault, logic).
//! Each flag can be escalated into a [`StreamFailure`] error or masked, in
//! which case the operation yields a zero value and the flag stays set for
//! the caller to inspect.

pub mod stream;
pub mod vax;

use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

pub use stream::BinaryStream;

/// Byte order and floating-point encoding of a binary stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ByteOrderFormat {
    /// Byte order of the running processor
    Native,
    /// IEEE floats, little-endian (Intel)
    #[default]
    IeeeLittleEndian,
    /// IEEE floats, big-endian (MIPS)
    IeeeBigEndian,
    /// VAX floats, little-endian integers (DEC)
    VaxLittleEndian,
}

impl ByteOrderFormat {
    /// Replace `Native` by the concrete order of the running processor.
    pub const fn resolve(self) -> Self {
        match self {
            ByteOrderFormat::Native => {
                if cfg!(target_endian = "big") {
                    ByteOrderFormat::IeeeBigEndian
                } else {
                    ByteOrderFormat::IeeeLittleEndian
                }
            }
            other => other,
        }
    }

    /// Check whether integers are stored big-endian.
    pub const fn is_big_endian(self) -> bool {
        matches!(self.resolve(), ByteOrderFormat::IeeeBigEndian)
    }

    /// Check whether floats use the VAX encoding.
    pub const fn is_vax(self) -> bool {
        matches!(self, ByteOrderFormat::VaxLittleEndian)
    }
}

/// How a stream is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Read only
    Read,
    /// Write only, truncating any existing content
    Write,
    /// Read and write an existing or new file without truncation
    ReadWrite,
}

impl OpenMode {
    pub const fn can_read(self) -> bool {
        matches!(self, OpenMode::Read | OpenMode::ReadWrite)
    }

    pub const fn can_write(self) -> bool {
        matches!(self, OpenMode::Write | OpenMode::ReadWrite)
    }
}

/// Reference point of a seek.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekOrigin {
    Begin,
    Current,
    End,
}

/// Kind of stream failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// A read ran past the available bytes
    EndOfFile,
    /// Integrity violation of the underlying device
    Fault,
    /// Invalid operation, e.g. seek before the start or write on a read-only stream
    Logic,
}

impl FailureKind {
    const fn bit(self) -> u8 {
        match self {
            FailureKind::EndOfFile => 0b001,
            FailureKind::Fault => 0b010,
            FailureKind::Logic => 0b100,
        }
    }
}

/// Set of failure kinds, used both as the current state and as the
/// escalation mask of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FailureMask(u8);

impl FailureMask {
    pub const NONE: FailureMask = FailureMask(0);
    pub const END_OF_FILE: FailureMask = FailureMask(0b001);
    pub const FAULT: FailureMask = FailureMask(0b010);
    pub const LOGIC: FailureMask = FailureMask(0b100);
    pub const ALL: FailureMask = FailureMask(0b111);

    /// Check whether the mask contains a failure kind.
    pub const fn contains(self, kind: FailureKind) -> bool {
        self.0 & kind.bit() != 0
    }

    /// Check whether no failure is set.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub(crate) fn insert(&mut self, kind: FailureKind) {
        self.0 |= kind.bit();
    }
}

impl From<FailureKind> for FailureMask {
    fn from(kind: FailureKind) -> Self {
        FailureMask(kind.bit())
    }
}

impl BitOr for FailureMask {
    type Output = FailureMask;

    fn bitor(self, rhs: Self) -> Self::Output {
        FailureMask(self.0 | rhs.0)
    }
}

impl BitOrAssign for FailureMask {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Escalated failure of a binary stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{}", self.cause())]
pub struct StreamFailure {
    /// Which condition occurred
    pub kind: FailureKind,
    /// Whether the stream was open when the failure occurred
    pub is_open: bool,
}

impl StreamFailure {
    pub const fn new(kind: FailureKind, is_open: bool) -> Self {
        Self { kind, is_open }
    }

    /// Diagnostic shared by every format codec for this failure.
    pub const fn cause(&self) -> &'static str {
        if !self.is_open {
            return "Invalid file path.";
        }
        match self.kind {
            FailureKind::EndOfFile => "Unexpected end of file.",
            FailureKind::Fault => "Loss of integrity of the file stream.",
            FailureKind::Logic => {
                "Internal logic operation error on the stream associated with the file."
            }
        }
    }

    /// Classify an I/O error raised by an open (or not yet open) device.
    pub fn from_io(err: &std::io::Error, is_open: bool) -> Self {
        let kind = match err.kind() {
            std::io::ErrorKind::UnexpectedEof => FailureKind::EndOfFile,
            std::io::ErrorKind::InvalidInput | std::io::ErrorKind::Unsupported => {
                FailureKind::Logic
            }
            _ => FailureKind::Fault,
        };
        Self { kind, is_open }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_resolves() {
        let resolved = ByteOrderFormat::Native.resolve();
        assert_ne!(resolved, ByteOrderFormat::Native);
        assert!(!resolved.is_vax());
    }

    #[test]
    fn test_failure_mask() {
        let mask = FailureMask::END_OF_FILE | FailureMask::LOGIC;
        assert!(mask.contains(FailureKind::EndOfFile));
        assert!(!mask.contains(FailureKind::Fault));
        assert!(mask.contains(FailureKind::Logic));
        assert!(FailureMask::NONE.is_empty());
    }

    #[test]
    fn test_stream_failure_causes() {
        assert_eq!(
            StreamFailure::new(FailureKind::EndOfFile, true).cause(),
            "Unexpected end of file."
        );
        assert_eq!(
            StreamFailure::new(FailureKind::Fault, true).to_string(),
            "Loss of integrity of the file stream."
        );
        assert_eq!(
            StreamFailure::new(FailureKind::EndOfFile, false).cause(),
            "Invalid file path."
        );
    }

    #[test]
    fn test_byte_order_from_toml_name() {
        #[derive(Deserialize)]
        struct Wrapper {
            order: ByteOrderFormat,
        }
        let parsed: Wrapper = toml::from_str("order = \"vax_little_endian\"").unwrap();
        assert_eq!(parsed.order, ByteOrderFormat::VaxLittleEndian);
    }
}
