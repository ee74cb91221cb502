// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! RIC files: marker trajectories with gait events.
//!
//! The header stores up to twelve frames for each kind of gait event (foot
//! off and foot strike, left and right). The label section is required.

use std::any::Any;
use std::path::Path;

use crate::io::binary::{BinaryStream, ByteOrderFormat};
use crate::io::traits::{open_for_read, AcquisitionCodec};
use crate::model::Acquisition;
use crate::Result;

use super::{can_read_elite, read_header, read_labels, read_marker_values, SampleLayout};

/// Name used in RIC error messages.
pub const RIC_FORMAT: &str = "RIC";

/// Reader of RIC files.
#[derive(Debug, Clone, Copy, Default)]
pub struct RicCodec;

impl RicCodec {
    pub fn new() -> Self {
        Self
    }

    /// Decode RIC content held in memory.
    pub fn read_bytes(&self, bytes: Vec<u8>) -> Result<Acquisition> {
        let mut stream = BinaryStream::from_bytes(bytes, ByteOrderFormat::IeeeLittleEndian);
        read(&mut stream).map_err(|e| e.into_format(RIC_FORMAT))
    }
}

impl AcquisitionCodec for RicCodec {
    fn name(&self) -> &'static str {
        RIC_FORMAT
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["ric"]
    }

    fn can_read(&self, path: &Path) -> bool {
        can_read_elite(path, self.extensions())
    }

    fn read(&self, path: &Path) -> Result<Acquisition> {
        let mut stream = open_for_read(path, ByteOrderFormat::IeeeLittleEndian, RIC_FORMAT)?;
        let acquisition = read(&mut stream).map_err(|e| e.into_format(RIC_FORMAT))?;
        tracing::debug!(
            path = %path.display(),
            points = acquisition.point_number(),
            events = acquisition.event_number(),
            "decoded RIC file"
        );
        Ok(acquisition)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn read(stream: &mut BinaryStream) -> Result<Acquisition> {
    let mut acquisition = Acquisition::new();
    read_header(stream, &mut acquisition, true, SampleLayout::Markers)?;
    read_marker_values(stream, &mut acquisition)?;
    read_labels(stream, &mut acquisition)?;
    Ok(acquisition)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::formats::elite::tests::{header_bytes, write_label, write_samples, HeaderFields};

    fn sample_stream() -> BinaryStream {
        let mut stream = header_bytes(&HeaderFields {
            frames: 2,
            markers: 1,
            rate: 100,
            events: [vec![], vec![40], vec![12], vec![60, 160]],
            ..HeaderFields::default()
        });
        write_samples(&mut stream, &[[1.0, 2.0, 3.0], [-9999.0, -9999.0, -9999.0]]);
        stream
    }

    #[test]
    fn test_events_and_labels() {
        let mut stream = sample_stream();
        write_label(&mut stream, "RTOE");
        let acq = RicCodec::new().read_bytes(stream.into_bytes()).unwrap();

        assert_eq!(acq.points().labels(), vec!["RTOE"]);
        assert!(!acq.point(0).unwrap().is_valid(1));
        assert_eq!(acq.event_number(), 4);
        let labels: Vec<(&str, &str, i32)> = acq
            .events()
            .iter()
            .map(|e| (e.label(), e.context(), e.frame()))
            .collect();
        assert_eq!(
            labels,
            vec![
                ("Foot Off", "Right", 40),
                ("Foot Strike", "Left", 12),
                ("Foot Strike", "Right", 60),
                ("Foot Strike", "Right", 160),
            ]
        );
        assert_eq!(acq.event(3).unwrap().time(), 1.6);
    }

    #[test]
    fn test_labels_required() {
        let err = RicCodec::new().read_bytes(sample_stream().into_bytes()).unwrap_err();
        assert_eq!(err.cause(), "Unexpected end of file.");
    }
}
