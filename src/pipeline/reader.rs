// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Source node reading an acquisition file.

use std::any::Any;
use std::path::{Path, PathBuf};

use crate::io::detection::{Dispatcher, SharedCodec};
use crate::model::Acquisition;
use crate::{MocapError, Result};

use super::node::{ProcessNode, SharedAcquisition};

/// Reads an acquisition from a file.
///
/// Without an explicit codec the reader asks its [`Dispatcher`] on the next
/// read and keeps the detected codec until [`set_codec`](Self::set_codec)
/// clears it.
///
/// # Example
///
/// ```rust,no_run
/// use mocapcodec::pipeline::AcquisitionFileReader;
///
/// let mut reader = AcquisitionFileReader::new().with_filename("walk.trc");
/// let acquisition = reader.read()?;
/// println!("read with {}", reader.codec().map(|c| c.name()).unwrap_or("?"));
/// # Ok::<(), mocapcodec::MocapError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct AcquisitionFileReader {
    filename: Option<PathBuf>,
    codec: Option<SharedCodec>,
    dispatcher: Dispatcher,
}

impl AcquisitionFileReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filename<P: Into<PathBuf>>(mut self, filename: P) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Use `codec` instead of detecting the format.
    pub fn with_codec(mut self, codec: SharedCodec) -> Self {
        self.codec = Some(codec);
        self
    }

    /// Detect formats with `dispatcher` instead of the default one.
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

    /// Codec given explicitly or detected by the last read.
    pub fn codec(&self) -> Option<&SharedCodec> {
        self.codec.as_ref()
    }

    /// Set the codec; `None` makes the next read detect the format again.
    pub fn set_codec(&mut self, codec: Option<SharedCodec>) {
        self.codec = codec;
    }

    /// Read the file.
    pub fn read(&mut self) -> Result<Acquisition> {
        let path = match &self.filename {
            Some(path) if !path.as_os_str().is_empty() => path.clone(),
            _ => return Err(MocapError::configuration("Filename must be specified.")),
        };
        if !path.exists() {
            return Err(MocapError::configuration("File doesn't exist."));
        }
        let codec = match &self.codec {
            Some(codec) => codec.clone(),
            None => {
                let detected = self.dispatcher.detect_reader(&path).ok_or_else(|| {
                    MocapError::configuration("No IO found, the file is not supported.")
                })?;
                self.codec = Some(detected.clone());
                detected
            }
        };
        let acquisition = codec.read(&path)?;
        tracing::debug!(
            path = %path.display(),
            format = codec.name(),
            points = acquisition.point_number(),
            analogs = acquisition.analog_number(),
            events = acquisition.event_number(),
            "read acquisition"
        );
        Ok(acquisition)
    }
}

impl ProcessNode for AcquisitionFileReader {
    fn name(&self) -> &'static str {
        "AcquisitionFileReader"
    }

    fn input_number(&self) -> usize {
        0
    }

    fn generate_data(&mut self, _inputs: &[Option<SharedAcquisition>]) -> Result<Vec<Acquisition>> {
        Ok(vec![self.read()?])
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
    use crate::io::formats::{C3dCodec, TrcCodec};

    fn write_trc(dir: &Path) -> PathBuf {
        let mut acq = Acquisition::new();
        acq.init(1, 2, 0, 1).unwrap();
        acq.set_point_frequency(100.0);
        let path = dir.join("walk.trc");
        let text = TrcCodec::new().write_text(&acq, "walk.trc").unwrap();
        std::fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn test_missing_filename() {
        let err = AcquisitionFileReader::new().read().unwrap_err();
        assert_eq!(err.cause(), "Filename must be specified.");
        let err = AcquisitionFileReader::new().with_filename("").read().unwrap_err();
        assert_eq!(err.cause(), "Filename must be specified.");
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = AcquisitionFileReader::new()
            .with_filename(dir.path().join("nothing.c3d"))
            .read()
            .unwrap_err();
        assert_eq!(err.cause(), "File doesn't exist.");
    }

    #[test]
    fn test_unsupported_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "not an acquisition").unwrap();
        let mut reader = AcquisitionFileReader::new().with_filename(&path);
        let err = reader.read().unwrap_err();
        assert_eq!(err.cause(), "No IO found, the file is not supported.");
        assert!(reader.codec().is_none());
    }

    #[test]
    fn test_detected_codec_is_remembered() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_trc(dir.path());
        let mut reader = AcquisitionFileReader::new().with_filename(&path);
        let acq = reader.read().unwrap();
        assert_eq!(acq.point_frame_number(), 2);
        assert_eq!(reader.codec().unwrap().name(), "TRC");

        reader.set_codec(None);
        assert!(reader.codec().is_none());
    }

    #[test]
    fn test_explicit_codec_is_used() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_trc(dir.path());
        let mut reader = AcquisitionFileReader::new()
            .with_filename(&path)
            .with_codec(Arc::new(C3dCodec::new()));
        let err = reader.read().unwrap_err();
        assert!(err.to_string().starts_with("C3D file error"));
    }
}
