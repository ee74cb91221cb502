// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! PWR files: hip, knee and ankle powers of both sides.
//!
//! Each frame stores six floats in two groups of three, every group
//! followed by an unused float. Powers are kept in the X component.

use std::any::Any;
use std::path::Path;

use crate::io::binary::{BinaryStream, ByteOrderFormat, SeekOrigin};
use crate::io::traits::{open_for_read, AcquisitionCodec};
use crate::model::{Acquisition, PointType};
use crate::Result;

use super::{can_read_elite, read_header, SampleLayout, INVALID_VALUE};

/// Name used in PWR error messages.
pub const PWR_FORMAT: &str = "PWR";

const POWERS: [(&str, &str); 6] = [
    ("RHipPower", "Right Hip Power"),
    ("RKneePower", "Right Knee Power"),
    ("RAnklePower", "Right Ankle Power"),
    ("LHipPower", "Left Hip Power"),
    ("LKneePower", "Left Knee Power"),
    ("LAnklePower", "Left Ankle Power"),
];

/// Reader of PWR files.
#[derive(Debug, Clone, Copy, Default)]
pub struct PwrCodec;

impl PwrCodec {
    pub fn new() -> Self {
        Self
    }

    /// Decode PWR content held in memory.
    pub fn read_bytes(&self, bytes: Vec<u8>) -> Result<Acquisition> {
        let mut stream = BinaryStream::from_bytes(bytes, ByteOrderFormat::IeeeLittleEndian);
        read(&mut stream).map_err(|e| e.into_format(PWR_FORMAT))
    }
}

impl AcquisitionCodec for PwrCodec {
    fn name(&self) -> &'static str {
        PWR_FORMAT
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["pwr"]
    }

    fn can_read(&self, path: &Path) -> bool {
        can_read_elite(path, self.extensions())
    }

    fn read(&self, path: &Path) -> Result<Acquisition> {
        let mut stream = open_for_read(path, ByteOrderFormat::IeeeLittleEndian, PWR_FORMAT)?;
        let acquisition = read(&mut stream).map_err(|e| e.into_format(PWR_FORMAT))?;
        tracing::debug!(path = %path.display(), frames = acquisition.point_frame_number(), "decoded PWR file");
        Ok(acquisition)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn read(stream: &mut BinaryStream) -> Result<Acquisition> {
    let mut acquisition = Acquisition::new();
    // The header count is not reliable: there are always six powers,
    // stored as two padded triplets per frame.
    let layout = SampleLayout::Fixed {
        points: POWERS.len(),
        frame_bytes: 32,
    };
    read_header(stream, &mut acquisition, false, layout)?;
    for (point, (label, description)) in acquisition.points_mut().iter_mut().zip(POWERS) {
        point.set_label(label);
        point.set_description(description);
        point.set_point_type(PointType::Power);
    }

    for frame in 0..acquisition.point_frame_number() {
        for (joint, point) in acquisition.points_mut().iter_mut().enumerate() {
            let value = stream.read_f32()?;
            if (value.abs() - INVALID_VALUE.abs()).abs() < f32::EPSILON {
                point.residuals_mut()[frame] = -1.0;
            } else {
                point.values_mut()[frame][0] = f64::from(value);
            }
            if (joint + 1) % 3 == 0 {
                stream.seek(4, SeekOrigin::Current)?;
            }
        }
    }
    Ok(acquisition)
}
