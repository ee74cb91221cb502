// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Read/write contract shared by every acquisition file format.
//!
//! Each format implements [`AcquisitionCodec`]. Detection (`can_read`) looks
//! at the file content, while `can_write` only looks at the file name.
//! Reads build a fresh [`Acquisition`] and return it only once the whole
//! file was decoded; writes serialize into memory first and only then
//! touch the destination file.

use std::any::Any;
use std::fmt;
use std::path::Path;

use crate::io::binary::{BinaryStream, ByteOrderFormat, OpenMode};
use crate::model::Acquisition;
use crate::{MocapError, Result};

/// A file format able to read and possibly write acquisitions.
///
/// # Example
///
/// ```rust,no_run
/// use std::path::Path;
/// use mocapcodec::io::traits::AcquisitionCodec;
///
/// fn describe(codec: &dyn AcquisitionCodec, path: &Path) {
///     if codec.can_read(path) {
///         println!("{} can read {}", codec.name(), path.display());
///     }
/// }
/// ```
pub trait AcquisitionCodec: fmt::Debug + Send + Sync {
    /// Short name of the format, used in error messages ("C3D", "TRC", ...).
    fn name(&self) -> &'static str;

    /// Lower-case file extensions handled by this format, without the dot.
    fn extensions(&self) -> &'static [&'static str];

    /// Check whether the content of `path` looks like this format.
    fn can_read(&self, path: &Path) -> bool;

    /// Check whether this format writes files named like `path`.
    ///
    /// Read-only formats return false.
    fn can_write(&self, path: &Path) -> bool {
        self.supports_write() && has_extension(path, self.extensions())
    }

    /// Check whether this format has a writer.
    fn supports_write(&self) -> bool {
        false
    }

    /// Decode a file into a new acquisition.
    fn read(&self, path: &Path) -> Result<Acquisition>;

    /// Encode an acquisition into a file.
    ///
    /// Read-only formats fail with [`MocapError::Unsupported`].
    fn write(&self, _path: &Path, _acquisition: &Acquisition) -> Result<()> {
        Err(MocapError::unsupported(format!("{} writing", self.name())))
    }

    /// Downcast to `Any` for accessing format-specific options.
    fn as_any(&self) -> &dyn Any;
}

/// Check whether `path` ends with one of the extensions (case-insensitive).
pub fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            extensions.iter().any(|e| *e == ext)
        })
        .unwrap_or(false)
}

/// Read the first `n` bytes of a file (fewer when the file is shorter).
pub fn read_prefix(path: &Path, n: usize) -> Option<Vec<u8>> {
    use std::io::Read;

    let file = std::fs::File::open(path).ok()?;
    let mut buf = Vec::with_capacity(n);
    file.take(n as u64).read_to_end(&mut buf).ok()?;
    Some(buf)
}

/// Open `path` for reading, reporting failures as errors of `format`.
pub(crate) fn open_for_read(
    path: &Path,
    order: ByteOrderFormat,
    format: &str,
) -> Result<BinaryStream> {
    BinaryStream::open(path, OpenMode::Read, order)
        .map_err(|failure| MocapError::from(failure).into_format(format))
}

/// Write a fully serialized file, removing any partial output on failure.
pub(crate) fn persist(path: &Path, bytes: &[u8], format: &str) -> Result<()> {
    if let Err(err) = std::fs::write(path, bytes) {
        let _ = std::fs::remove_file(path);
        return Err(MocapError::from(err).into_format(format));
    }
    tracing::debug!(path = %path.display(), format, bytes = bytes.len(), "wrote acquisition");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_extension_case_insensitive() {
        assert!(has_extension(Path::new("/data/trial.C3D"), &["c3d"]));
        assert!(has_extension(Path::new("walk.rah"), &["rah", "raw"]));
        assert!(!has_extension(Path::new("walk.c3d.bak"), &["c3d"]));
        assert!(!has_extension(Path::new("noext"), &["c3d"]));
    }

    #[test]
    fn test_read_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.bin");
        std::fs::write(&path, [1u8, 2, 3]).unwrap();
        assert_eq!(read_prefix(&path, 2).unwrap(), vec![1, 2]);
        assert_eq!(read_prefix(&path, 10).unwrap(), vec![1, 2, 3]);
        assert!(read_prefix(&dir.path().join("missing"), 2).is_none());
    }

    #[test]
    fn test_open_missing_file_is_format_error() {
        let err = open_for_read(
            Path::new("/nonexistent/trial.c3d"),
            ByteOrderFormat::IeeeLittleEndian,
            "C3D",
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "C3D file error: Invalid file path.");
    }
}
