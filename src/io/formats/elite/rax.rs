// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! RAH and RAW files: marker trajectories.
//!
//! The trailing label section is optional; without it markers keep their
//! generated labels.

use std::any::Any;
use std::path::Path;

use crate::io::binary::{BinaryStream, ByteOrderFormat};
use crate::io::traits::{open_for_read, AcquisitionCodec};
use crate::model::Acquisition;
use crate::Result;

use super::{can_read_elite, read_header, read_labels, read_marker_values, SampleLayout};

/// Name used in RAx error messages.
pub const RAX_FORMAT: &str = "RAx";

/// Reader of RAH and RAW files.
#[derive(Debug, Clone, Copy, Default)]
pub struct RaxCodec;

impl RaxCodec {
    pub fn new() -> Self {
        Self
    }

    /// Decode RAH/RAW content held in memory.
    pub fn read_bytes(&self, bytes: Vec<u8>) -> Result<Acquisition> {
        let mut stream = BinaryStream::from_bytes(bytes, ByteOrderFormat::IeeeLittleEndian);
        read(&mut stream).map_err(|e| e.into_format(RAX_FORMAT))
    }
}

impl AcquisitionCodec for RaxCodec {
    fn name(&self) -> &'static str {
        RAX_FORMAT
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["rah", "raw"]
    }

    fn can_read(&self, path: &Path) -> bool {
        can_read_elite(path, self.extensions())
    }

    fn read(&self, path: &Path) -> Result<Acquisition> {
        let mut stream = open_for_read(path, ByteOrderFormat::IeeeLittleEndian, RAX_FORMAT)?;
        let acquisition = read(&mut stream).map_err(|e| e.into_format(RAX_FORMAT))?;
        tracing::debug!(
            path = %path.display(),
            points = acquisition.point_number(),
            frames = acquisition.point_frame_number(),
            "decoded RAx file"
        );
        Ok(acquisition)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn read(stream: &mut BinaryStream) -> Result<Acquisition> {
    let mut acquisition = Acquisition::new();
    read_header(stream, &mut acquisition, false, SampleLayout::Markers)?;
    read_marker_values(stream, &mut acquisition)?;
    if stream.at_end()? {
        tracing::warn!("There is no section containing the labels of the markers.");
    } else {
        read_labels(stream, &mut acquisition)?;
    }
    Ok(acquisition)
}
