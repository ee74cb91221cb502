// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! C3D format support.
//!
//! C3D files are split into 512-byte blocks: a header block, a parameter
//! section holding a two-level metadata tree (groups and parameters), and a
//! data section with interleaved point and analog samples. Samples are
//! stored either as scaled 16-bit integers or as floats, with IEEE
//! little-endian, IEEE big-endian or VAX encoding.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use mocapcodec::io::formats::c3d::C3dCodec;
//! use mocapcodec::io::traits::AcquisitionCodec;
//!
//! let codec = C3dCodec::new();
//! let acquisition = codec.read(Path::new("gait.c3d"))?;
//! println!("{} markers at {} Hz", acquisition.point_number(), acquisition.point_frequency());
//! # Ok::<(), mocapcodec::MocapError>(())
//! ```

pub mod parameters;
pub mod reader;
pub mod writer;

use std::any::Any;
use std::path::Path;

use crate::config::{C3dConfig, C3dStorage};
use crate::io::binary::{BinaryStream, ByteOrderFormat};
use crate::io::traits::{open_for_read, persist, read_prefix, AcquisitionCodec};
use crate::model::Acquisition;
use crate::Result;

/// Name used in C3D error messages.
pub const C3D_FORMAT: &str = "C3D";

/// Processor-type byte for a byte order (83 + 1, 2 or 3).
pub(crate) const fn processor_byte(order: ByteOrderFormat) -> u8 {
    match order.resolve() {
        ByteOrderFormat::VaxLittleEndian => 85,
        ByteOrderFormat::IeeeBigEndian => 86,
        _ => 84,
    }
}

/// Reader and writer of C3D files.
#[derive(Debug, Clone, Default)]
pub struct C3dCodec {
    config: C3dConfig,
}

impl C3dCodec {
    /// Create a codec writing little-endian float files.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: C3dConfig) -> Self {
        Self { config }
    }

    /// Set the byte order of written files.
    pub fn with_byte_order(mut self, order: ByteOrderFormat) -> Self {
        self.config.byte_order = order;
        self
    }

    /// Set the sample storage of written files.
    pub fn with_storage(mut self, storage: C3dStorage) -> Self {
        self.config.storage = storage;
        self
    }

    /// Set the magnitude of the point scale factor of written files.
    pub fn with_point_scale(mut self, scale: f32) -> Self {
        self.config.point_scale = scale;
        self
    }

    pub fn config(&self) -> &C3dConfig {
        &self.config
    }

    /// Decode C3D content held in memory.
    pub fn read_bytes(&self, bytes: Vec<u8>) -> Result<Acquisition> {
        let mut stream = BinaryStream::from_bytes(bytes, ByteOrderFormat::IeeeLittleEndian);
        reader::read(&mut stream).map_err(|e| e.into_format(C3D_FORMAT))
    }

    /// Encode an acquisition into C3D bytes.
    pub fn write_bytes(&self, acquisition: &Acquisition) -> Result<Vec<u8>> {
        writer::write(acquisition, &self.config).map_err(|e| e.into_format(C3D_FORMAT))
    }
}

impl AcquisitionCodec for C3dCodec {
    fn name(&self) -> &'static str {
        C3D_FORMAT
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["c3d"]
    }

    /// The first byte points to the parameter section and the second one
    /// is the key 80.
    fn can_read(&self, path: &Path) -> bool {
        match read_prefix(path, 2).as_deref() {
            Some(&[first_block, key]) => (first_block as i8) > 0 && key == parameters::PARAMETER_KEY,
            _ => false,
        }
    }

    fn supports_write(&self) -> bool {
        true
    }

    fn read(&self, path: &Path) -> Result<Acquisition> {
        let mut stream = open_for_read(path, ByteOrderFormat::IeeeLittleEndian, C3D_FORMAT)?;
        let acquisition = reader::read(&mut stream).map_err(|e| e.into_format(C3D_FORMAT))?;
        tracing::debug!(
            path = %path.display(),
            points = acquisition.point_number(),
            analogs = acquisition.analog_number(),
            frames = acquisition.point_frame_number(),
            "decoded C3D file"
        );
        Ok(acquisition)
    }

    fn write(&self, path: &Path, acquisition: &Acquisition) -> Result<()> {
        let bytes = self.write_bytes(acquisition)?;
        persist(path, &bytes, C3D_FORMAT)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
