// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Core error types for mocapcodec.
//!
//! Provides error types for acquisition I/O and processing:
//! - Stream failures raised by the binary codec
//! - Format-specific decoding/encoding failures
//! - Rejected model mutations
//! - Reader/writer configuration problems
//! - Writes requested from read-only formats

use std::fmt;

use crate::io::binary::StreamFailure;

/// Errors that can occur while reading, writing or processing acquisitions.
#[derive(Debug, Clone)]
pub enum MocapError {
    /// Escalated failure of a binary stream
    Stream(StreamFailure),

    /// Format codec failure
    Format {
        /// Format family (e.g., "C3D", "ANB", "TRC")
        format: String,
        /// Human-readable cause
        cause: String,
    },

    /// Attempt to violate an acquisition invariant
    InvariantViolation {
        /// Description of the invariant that was violated
        invariant: String,
    },

    /// Reader/writer misconfiguration detected before any I/O
    Configuration {
        /// Error message
        message: String,
    },

    /// Index-based access past the end of a collection
    IndexOutOfRange {
        /// Collection name
        collection: String,
        /// Requested index
        index: usize,
        /// Collection length
        len: usize,
    },

    /// Unsupported feature
    Unsupported {
        /// What is not supported
        feature: String,
    },
}

impl MocapError {
    /// Create a format error.
    pub fn format(format: impl Into<String>, cause: impl Into<String>) -> Self {
        MocapError::Format {
            format: format.into(),
            cause: cause.into(),
        }
    }

    /// Create an invariant violation error.
    pub fn invariant_violation(invariant: impl Into<String>) -> Self {
        MocapError::InvariantViolation {
            invariant: invariant.into(),
        }
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        MocapError::Configuration {
            message: message.into(),
        }
    }

    /// Create an index out of range error.
    pub fn index_out_of_range(collection: impl Into<String>, index: usize, len: usize) -> Self {
        MocapError::IndexOutOfRange {
            collection: collection.into(),
            index,
            len,
        }
    }

    /// Create an unsupported feature error.
    pub fn unsupported(feature: impl Into<String>) -> Self {
        MocapError::Unsupported {
            feature: feature.into(),
        }
    }

    /// Re-wrap an error into the error of a format family.
    ///
    /// Stream failures become a format error whose cause is derived from the
    /// stream flags. Errors that already belong to a format are kept as is.
    pub fn into_format(self, format: &str) -> Self {
        match self {
            MocapError::Stream(failure) => MocapError::format(format, failure.cause()),
            MocapError::Format { .. } => self,
            MocapError::InvariantViolation { invariant } => MocapError::format(format, invariant),
            other => MocapError::format(format, other.to_string()),
        }
    }

    /// The human-readable cause carried by this error.
    pub fn cause(&self) -> String {
        match self {
            MocapError::Stream(failure) => failure.cause().to_string(),
            MocapError::Format { cause, .. } => cause.clone(),
            MocapError::InvariantViolation { invariant } => invariant.clone(),
            MocapError::Configuration { message } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Get structured fields for logging.
    pub fn log_fields(&self) -> Vec<(&'static str, String)> {
        match self {
            MocapError::Stream(failure) => vec![
                ("kind", format!("{:?}", failure.kind)),
                ("open", failure.is_open.to_string()),
            ],
            MocapError::Format { format, cause } => {
                vec![("format", format.clone()), ("cause", cause.clone())]
            }
            MocapError::InvariantViolation { invariant } => {
                vec![("invariant", invariant.clone())]
            }
            MocapError::Configuration { message } => vec![("message", message.clone())],
            MocapError::IndexOutOfRange {
                collection,
                index,
                len,
            } => vec![
                ("collection", collection.clone()),
                ("index", index.to_string()),
                ("len", len.to_string()),
            ],
            MocapError::Unsupported { feature } => vec![("feature", feature.clone())],
        }
    }
}

impl fmt::Display for MocapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MocapError::Stream(failure) => write!(f, "Stream failure: {failure}"),
            MocapError::Format { format, cause } => write!(f, "{format} file error: {cause}"),
            MocapError::InvariantViolation { invariant } => {
                write!(f, "Invariant violation: {invariant}")
            }
            MocapError::Configuration { message } => {
                write!(f, "Configuration error: {message}")
            }
            MocapError::IndexOutOfRange {
                collection,
                index,
                len,
            } => write!(
                f,
                "Index {index} out of range for {collection} (length: {len})"
            ),
            MocapError::Unsupported { feature } => {
                write!(f, "Unsupported feature: '{feature}'")
            }
        }
    }
}

impl std::error::Error for MocapError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MocapError::Stream(failure) => Some(failure),
            _ => None,
        }
    }
}

impl From<StreamFailure> for MocapError {
    fn from(failure: StreamFailure) -> Self {
        MocapError::Stream(failure)
    }
}

impl From<std::io::Error> for MocapError {
    fn from(err: std::io::Error) -> Self {
        MocapError::Stream(StreamFailure::from_io(&err, true))
    }
}

/// Result type for mocapcodec operations.
pub type Result<T> = std::result::Result<T, MocapError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::binary::FailureKind;

    #[test]
    fn test_format_error() {
        let err = MocapError::format("C3D", "Bad header key");
        assert!(matches!(err, MocapError::Format { .. }));
        assert_eq!(err.to_string(), "C3D file error: Bad header key");
        assert_eq!(err.cause(), "Bad header key");
    }

    #[test]
    fn test_invariant_violation_error() {
        let err = MocapError::invariant_violation("frame count must be positive");
        assert_eq!(
            err.to_string(),
            "Invariant violation: frame count must be positive"
        );
    }

    #[test]
    fn test_configuration_error() {
        let err = MocapError::configuration("Filename must be specified.");
        assert_eq!(
            err.to_string(),
            "Configuration error: Filename must be specified."
        );
        assert_eq!(err.cause(), "Filename must be specified.");
    }

    #[test]
    fn test_index_out_of_range_error() {
        let err = MocapError::index_out_of_range("points", 4, 2);
        assert_eq!(
            err.to_string(),
            "Index 4 out of range for points (length: 2)"
        );
        let fields = err.log_fields();
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[1], ("index", "4".to_string()));
    }

    #[test]
    fn test_stream_failure_into_format() {
        let err: MocapError = StreamFailure::new(FailureKind::EndOfFile, true).into();
        let wrapped = err.into_format("ANB");
        assert_eq!(wrapped.cause(), "Unexpected end of file.");
        assert_eq!(wrapped.to_string(), "ANB file error: Unexpected end of file.");
    }

    #[test]
    fn test_closed_stream_into_format() {
        let err: MocapError = StreamFailure::new(FailureKind::Logic, false).into();
        assert_eq!(err.into_format("TRC").cause(), "Invalid file path.");
    }

    #[test]
    fn test_format_error_kept_by_into_format() {
        let err = MocapError::format("C3D", "Invalid processor type");
        let wrapped = err.into_format("ANB");
        assert_eq!(wrapped.to_string(), "C3D file error: Invalid processor type");
    }

    #[test]
    fn test_log_fields_format() {
        let err = MocapError::format("RIC", "Unexpected end of file.");
        let fields = err.log_fields();
        assert_eq!(fields[0].0, "format");
        assert_eq!(fields[0].1, "RIC");
        assert_eq!(fields[1].0, "cause");
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "eof");
        let err: MocapError = io_err.into();
        assert_eq!(err.cause(), "Unexpected end of file.");
    }

    #[test]
    fn test_error_clone() {
        let err1 = MocapError::unsupported("compressed data");
        let err2 = err1.clone();
        assert_eq!(err1.to_string(), err2.to_string());
        assert_eq!(err2.to_string(), "Unsupported feature: 'compressed data'");
    }
}
