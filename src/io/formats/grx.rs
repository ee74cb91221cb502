// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! GRx format support (BTS force platform files `.gr1` to `.gr9`).
//!
//! The 512-byte header holds the frame count, the rate, the time of the
//! first frame (ms), the platform dimensions and its corners. Each frame
//! then stores six floats: Fy, -Fx, -Fz, the centre of pressure (Py then
//! Px, relative to a platform corner) and Mz. The digit of the extension
//! numbers the platform and suffixes the channel labels.

use std::any::Any;
use std::path::Path;

use crate::io::binary::{BinaryStream, ByteOrderFormat, FailureKind, SeekOrigin, StreamFailure};
use crate::io::traits::{has_extension, open_for_read, AcquisitionCodec};
use crate::metadata::{create_child, create_child_2d, create_scalar_child};
use crate::model::Acquisition;
use crate::Result;

/// Name used in GRx error messages.
pub const GRX_FORMAT: &str = "GRx";

const HEADER_SIZE: i64 = 512;
const FRAME_BYTES: u64 = 24;

/// Reader of GRx files.
#[derive(Debug, Clone, Copy, Default)]
pub struct GrxCodec;

impl GrxCodec {
    pub fn new() -> Self {
        Self
    }

    /// Decode GRx content held in memory. `suffix` is appended to the
    /// channel labels (the platform digit of the file extension).
    pub fn read_bytes(&self, bytes: Vec<u8>, suffix: &str) -> Result<Acquisition> {
        let mut stream = BinaryStream::from_bytes(bytes, ByteOrderFormat::IeeeLittleEndian);
        read(&mut stream, suffix).map_err(|e| e.into_format(GRX_FORMAT))
    }
}

impl AcquisitionCodec for GrxCodec {
    fn name(&self) -> &'static str {
        GRX_FORMAT
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["gr1", "gr2", "gr3", "gr4", "gr5", "gr6", "gr7", "gr8", "gr9"]
    }

    fn can_read(&self, path: &Path) -> bool {
        has_extension(path, self.extensions()) && path.is_file()
    }

    fn read(&self, path: &Path) -> Result<Acquisition> {
        let suffix: String = path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| ext.chars().last())
            .map(String::from)
            .unwrap_or_default();
        let mut stream = open_for_read(path, ByteOrderFormat::IeeeLittleEndian, GRX_FORMAT)?;
        let acquisition = read(&mut stream, &suffix).map_err(|e| e.into_format(GRX_FORMAT))?;
        tracing::debug!(path = %path.display(), frames = acquisition.point_frame_number(), "decoded GRx file");
        Ok(acquisition)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn read(stream: &mut BinaryStream, suffix: &str) -> Result<Acquisition> {
    let frames = usize::from(stream.read_u16()?);
    let rate = f64::from(stream.read_u16()?);
    stream.seek(50, SeekOrigin::Current)?;
    let first_time_ms = f64::from(stream.read_u16()?);
    stream.seek(80, SeekOrigin::Current)?;
    let length = f64::from(stream.read_f32()?);
    let width = f64::from(stream.read_f32()?);
    let height = f64::from(stream.read_f32()?);
    let corners = stream.read_f32_vec(12)?;

    stream.seek(HEADER_SIZE, SeekOrigin::Begin)?;
    if frames as u64 * FRAME_BYTES > stream.remaining()? {
        return Err(StreamFailure::new(FailureKind::EndOfFile, true).into());
    }

    let mut acquisition = Acquisition::new();
    acquisition.init(0, frames, 6, 1)?;
    acquisition.set_first_frame((first_time_ms / 1000.0 * rate + 1.0).ceil() as i32, false);
    acquisition.set_point_frequency(rate);

    let platform = acquisition.metadata_mut().child_or_insert("FORCE_PLATFORM");
    create_scalar_child(platform, "USED", 1i16)?;
    create_child(platform, "ZERO", vec![0i16, 0])?;
    create_child(platform, "TYPE", vec![1i16])?;
    create_child_2d(platform, "CORNERS", corners, 3)?;
    let origin = vec![(length / 2.0) as f32, (width / 2.0) as f32, (-height / 2.0) as f32];
    create_child(platform, "ORIGIN", origin)?;
    create_child(platform, "CHANNEL", (1..=6).collect::<Vec<i16>>())?;

    for (analog, label) in acquisition
        .analogs_mut()
        .iter_mut()
        .zip(["Fx", "Fy", "Fz", "Px", "Py", "Mz"])
    {
        analog.set_label(format!("{label}{suffix}"));
    }

    for frame in 0..frames {
        let raw = stream.read_f32_vec(6)?;
        let [fy, fx, fz, py, px, mz] = [0, 1, 2, 3, 4, 5].map(|i| f64::from(raw[i]));
        let values = [-fx, fy, -fz, length / 2.0 - px, py - width / 2.0, mz];
        for (analog, value) in acquisition.analogs_mut().iter_mut().zip(values) {
            analog.values_mut()[frame] = value;
        }
    }
    Ok(acquisition)
}
