// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Sink node writing an acquisition file.

use std::any::Any;
use std::path::{Path, PathBuf};

use crate::io::detection::{Dispatcher, SharedCodec};
use crate::model::Acquisition;
use crate::{MocapError, Result};

use super::node::{required_input, ProcessNode, SharedAcquisition};

/// Writes its input acquisition to a file.
///
/// Without an explicit codec the format is chosen from the file extension.
/// A file created by a failed write is removed.
#[derive(Debug, Clone, Default)]
pub struct AcquisitionFileWriter {
    filename: Option<PathBuf>,
    codec: Option<SharedCodec>,
    dispatcher: Dispatcher,
}

impl AcquisitionFileWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filename<P: Into<PathBuf>>(mut self, filename: P) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn with_codec(mut self, codec: SharedCodec) -> Self {
        self.codec = Some(codec);
        self
    }

    /// Choose formats with `dispatcher`, for example one built from a
    /// [`CodecConfig`](crate::config::CodecConfig).
    pub fn with_dispatcher(mut self, dispatcher: Dispatcher) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    pub fn filename(&self) -> Option<&Path> {
        self.filename.as_deref()
    }

    pub fn set_filename<P: Into<PathBuf>>(&mut self, filename: P) {
        self.filename = Some(filename.into());
    }

    pub fn codec(&self) -> Option<&SharedCodec> {
        self.codec.as_ref()
    }

    pub fn set_codec(&mut self, codec: Option<SharedCodec>) {
        self.codec = codec;
    }

    /// Write `acquisition` to the file.
    pub fn write(&self, acquisition: &Acquisition) -> Result<()> {
        let path = match &self.filename {
            Some(path) if !path.as_os_str().is_empty() => path.as_path(),
            _ => return Err(MocapError::configuration("Filename must be specified.")),
        };
        let codec = match &self.codec {
            Some(codec) => codec.clone(),
            None => self.dispatcher.detect_writer(path).ok_or_else(|| {
                MocapError::configuration("No IO found, the file is not supported.")
            })?,
        };

        let existed = path.exists();
        if let Err(err) = codec.write(path, acquisition) {
            if !existed && path.exists() {
                let _ = std::fs::remove_file(path);
            }
            tracing::warn!(path = %path.display(), format = codec.name(), error = %err, "write failed");
            return Err(err);
        }
        Ok(())
    }
}

impl ProcessNode for AcquisitionFileWriter {
    fn name(&self) -> &'static str {
        "AcquisitionFileWriter"
    }

    fn output_number(&self) -> usize {
        0
    }

    fn generate_data(&mut self, inputs: &[Option<SharedAcquisition>]) -> Result<Vec<Acquisition>> {
        let input = required_input(inputs, 0, self.name())?;
        self.write(input)?;
        Ok(Vec::new())
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
    use std::sync::Arc;

    use super::*;
    use crate::io::formats::{AnbCodec, RicCodec};

    fn sample() -> Acquisition {
        let mut acq = Acquisition::new();
        acq.init(0, 4, 2, 1).unwrap();
        acq.set_point_frequency(200.0);
        acq
    }

    #[test]
    fn test_missing_filename() {
        let err = AcquisitionFileWriter::new().write(&sample()).unwrap_err();
        assert_eq!(err.cause(), "Filename must be specified.");
    }

    #[test]
    fn test_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.xyz");
        let err = AcquisitionFileWriter::new()
            .with_filename(&path)
            .write(&sample())
            .unwrap_err();
        assert_eq!(err.cause(), "No IO found, the file is not supported.");
        assert!(!path.exists());
    }

    #[test]
    fn test_write_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.anb");
        AcquisitionFileWriter::new().with_filename(&path).write(&sample()).unwrap();
        let back = AnbCodec::new().read_bytes(std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(back.analog_number(), 2);
        assert_eq!(back.analog_frequency(), 200.0);
    }

    #[test]
    fn test_failed_write_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.ric");
        let err = AcquisitionFileWriter::new()
            .with_filename(&path)
            .with_codec(Arc::new(RicCodec::new()))
            .write(&sample())
            .unwrap_err();
        assert_eq!(err.to_string(), "Unsupported feature: 'RIC writing'");
        assert!(!path.exists());
    }
}
