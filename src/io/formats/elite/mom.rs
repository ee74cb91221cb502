// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! MOM files: hip, knee and ankle moments of both sides.
//!
//! A frame holds three planes (frontal, transverse, sagittal). Each plane
//! stores the right then the left side as three floats (hip, knee, ankle)
//! followed by an unused float. Values are in Nm and are converted to Nmm.

use std::any::Any;
use std::path::Path;

use crate::io::binary::{BinaryStream, ByteOrderFormat, SeekOrigin};
use crate::io::traits::{open_for_read, AcquisitionCodec};
use crate::model::{Acquisition, PointType};
use crate::Result;

use super::{can_read_elite, read_header, SampleLayout, INVALID_VALUE};

/// Name used in MOM error messages.
pub const MOM_FORMAT: &str = "MOM";

const MOMENTS: [(&str, &str); 6] = [
    ("RHipMoment", "Right Hip Moment"),
    ("RKneeMoment", "Right Knee Moment"),
    ("RAnkleMoment", "Right Ankle Moment"),
    ("LHipMoment", "Left Hip Moment"),
    ("LKneeMoment", "Left Knee Moment"),
    ("LAnkleMoment", "Left Ankle Moment"),
];

/// Reader of MOM files.
#[derive(Debug, Clone, Copy, Default)]
pub struct MomCodec;

impl MomCodec {
    pub fn new() -> Self {
        Self
    }

    /// Decode MOM content held in memory.
    pub fn read_bytes(&self, bytes: Vec<u8>) -> Result<Acquisition> {
        let mut stream = BinaryStream::from_bytes(bytes, ByteOrderFormat::IeeeLittleEndian);
        read(&mut stream).map_err(|e| e.into_format(MOM_FORMAT))
    }
}

impl AcquisitionCodec for MomCodec {
    fn name(&self) -> &'static str {
        MOM_FORMAT
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["mom"]
    }

    fn can_read(&self, path: &Path) -> bool {
        can_read_elite(path, self.extensions())
    }

    fn read(&self, path: &Path) -> Result<Acquisition> {
        let mut stream = open_for_read(path, ByteOrderFormat::IeeeLittleEndian, MOM_FORMAT)?;
        let acquisition = read(&mut stream).map_err(|e| e.into_format(MOM_FORMAT))?;
        tracing::debug!(path = %path.display(), frames = acquisition.point_frame_number(), "decoded MOM file");
        Ok(acquisition)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn read(stream: &mut BinaryStream) -> Result<Acquisition> {
    let mut acquisition = Acquisition::new();
    let layout = SampleLayout::Fixed {
        points: MOMENTS.len(),
        frame_bytes: 96,
    };
    read_header(stream, &mut acquisition, false, layout)?;
    for (point, (label, description)) in acquisition.points_mut().iter_mut().zip(MOMENTS) {
        point.set_label(label);
        point.set_description(description);
        point.set_point_type(PointType::Moment);
    }

    let invalid = f64::from(INVALID_VALUE.abs()) * 1000.0;
    for frame in 0..acquisition.point_frame_number() {
        for axis in 0..3 {
            for side in 0..2 {
                for joint in 0..3 {
                    let value = f64::from(stream.read_f32()?) * 1000.0;
                    acquisition.point_mut(side * 3 + joint)?.values_mut()[frame][axis] = value;
                }
                stream.seek(4, SeekOrigin::Current)?;
            }
        }
        for point in acquisition.points_mut().iter_mut() {
            let xyz = point.values()[frame];
            if xyz.iter().all(|v| (v.abs() - invalid).abs() < f64::EPSILON) {
                point.values_mut()[frame] = [0.0; 3];
                point.residuals_mut()[frame] = -1.0;
            }
        }
    }
    Ok(acquisition)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::formats::elite::tests::{header_bytes, HeaderFields};

    /// `frames[f][axis][side]` holds the hip, knee and ankle values.
    fn sample_file(frames: &[[[[f32; 3]; 2]; 3]]) -> Vec<u8> {
        let mut stream = header_bytes(&HeaderFields {
            frames: frames.len() as u16,
            markers: 6,
            rate: 60,
            ..HeaderFields::default()
        });
        for frame in frames {
            for plane in frame {
                for side in plane {
                    for &v in side {
                        stream.write_f32(v).unwrap();
                    }
                    stream.write_f32(0.0).unwrap();
                }
            }
        }
        stream.into_bytes()
    }

    #[test]
    fn test_six_moments() {
        let first = [
            [[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]],
            [[0.5, 0.25, 0.0], [-1.0, -2.0, -3.0]],
            [[7.0, 8.0, 9.0], [10.0, 11.0, 12.0]],
        ];
        let second = [
            [[-9999.0, 1.0, 1.0], [1.0, 1.0, 1.0]],
            [[9999.0, 1.0, 1.0], [1.0, 1.0, 1.0]],
            [[-9999.0, 1.0, 1.0], [1.0, 1.0, 1.0]],
        ];
        let acq = MomCodec::new().read_bytes(sample_file(&[first, second])).unwrap();

        assert_eq!(acq.point_number(), 6);
        assert_eq!(acq.point_frequency(), 60.0);
        assert!(acq.points().iter().all(|p| p.point_type() == PointType::Moment));
        assert_eq!(acq.point(0).unwrap().label(), "RHipMoment");
        assert_eq!(acq.point(5).unwrap().description(), "Left Ankle Moment");

        assert_eq!(acq.point(0).unwrap().values()[0], [1000.0, 500.0, 7000.0]);
        assert_eq!(acq.point(4).unwrap().values()[0], [5000.0, -2000.0, 11000.0]);
        let hip = acq.point(0).unwrap();
        assert!(!hip.is_valid(1));
        assert_eq!(hip.values()[1], [0.0; 3]);
        assert!(acq.point(1).unwrap().is_valid(1));
    }

    #[test]
    fn test_truncated_values() {
        let frame = [[[1.0; 3]; 2]; 3];
        let mut bytes = sample_file(&[frame, frame]);
        bytes.truncate(bytes.len() - 4);
        let err = MomCodec::new().read_bytes(bytes).unwrap_err();
        assert_eq!(err.to_string(), "MOM file error: Unexpected end of file.");
    }
}
