// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! ANG files: joint angles.
//!
//! Angles are stored like markers. Known Elite labels are renamed, and each
//! ankle channel also carries the foot progression angle in its second
//! component, which is moved to a dedicated point.

use std::any::Any;
use std::path::Path;

use crate::io::binary::{BinaryStream, ByteOrderFormat, SeekOrigin};
use crate::io::traits::{open_for_read, AcquisitionCodec};
use crate::model::{Acquisition, Point, PointType};
use crate::Result;

use super::{can_read_elite, clean_label, is_invalid, read_header, read_marker_values, SampleLayout};

/// Name used in ANG error messages.
pub const ANG_FORMAT: &str = "ANG";

/// Elite label, renamed label and description of the known angles.
const KNOWN_ANGLES: [(&str, &str, &str); 8] = [
    ("R_PELV", "RPelvisAngle", "Pelvis relative to Global/Body axes (Right)"),
    ("R_HIP", "RHipAngle", "Right Hip Rotation"),
    ("L_HIP", "LHipAngle", "Left Hip Rotation"),
    ("R_KNEE", "RKneeAngle", "Right Knee Rotation"),
    ("L_KNEE", "LKneeAngle", "Left Knee Rotation"),
    ("R_SHOU", "RShoulderAngle", "Right Shoulder Rotation"),
    ("L_PELV", "LPelvisAngle", "Pelvis relative to Global/Body axes (Left)"),
    ("L_SHOU", "LShoulderAngle", "Left Shoulder Rotation"),
];

/// Elite label, ankle label, ankle description, foot progression label and
/// description.
const ANKLES: [(&str, &str, &str, &str, &str); 2] = [
    (
        "R_ANKL",
        "RAnkleAngle",
        "Right Ankle Rotation",
        "RFootProgressAngle",
        "Right Foot relative to Global/Body axes",
    ),
    (
        "L_ANKL",
        "LAnkleAngle",
        "Left Ankle Rotation",
        "LFootProgressAngle",
        "Left Foot relative to Global/Body axes",
    ),
];

/// Reader of ANG files.
#[derive(Debug, Clone, Copy, Default)]
pub struct AngCodec;

impl AngCodec {
    pub fn new() -> Self {
        Self
    }

    /// Decode ANG content held in memory.
    pub fn read_bytes(&self, bytes: Vec<u8>) -> Result<Acquisition> {
        let mut stream = BinaryStream::from_bytes(bytes, ByteOrderFormat::IeeeLittleEndian);
        read(&mut stream).map_err(|e| e.into_format(ANG_FORMAT))
    }
}

impl AcquisitionCodec for AngCodec {
    fn name(&self) -> &'static str {
        ANG_FORMAT
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["ang"]
    }

    fn can_read(&self, path: &Path) -> bool {
        can_read_elite(path, self.extensions())
    }

    fn read(&self, path: &Path) -> Result<Acquisition> {
        let mut stream = open_for_read(path, ByteOrderFormat::IeeeLittleEndian, ANG_FORMAT)?;
        let acquisition = read(&mut stream).map_err(|e| e.into_format(ANG_FORMAT))?;
        tracing::debug!(path = %path.display(), angles = acquisition.point_number(), "decoded ANG file");
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

    let mut labels = Vec::with_capacity(acquisition.point_number());
    for _ in 0..acquisition.point_number() {
        stream.seek(10, SeekOrigin::Current)?;
        labels.push(clean_label(&stream.read_string(6)?));
    }

    let mut foot_progressions = Vec::new();
    for (point, label) in acquisition.points_mut().iter_mut().zip(labels) {
        point.set_point_type(PointType::Angle);
        if let Some((_, renamed, description)) = KNOWN_ANGLES.iter().find(|(l, _, _)| *l == label) {
            point.set_label(*renamed);
            point.set_description(*description);
        } else if let Some(&(_, ankle, ankle_description, progression, progression_description)) =
            ANKLES.iter().find(|(l, ..)| *l == label)
        {
            point.set_label(ankle);
            point.set_description(ankle_description);
            foot_progressions.push(split_foot_progression(point, progression, progression_description));
        } else {
            point.set_label(label);
        }
    }
    for point in foot_progressions {
        acquisition.append_point(point)?;
    }
    Ok(acquisition)
}

/// Move the second component of an ankle angle into a foot progression
/// angle. The first component is always invalid and is cleared.
fn split_foot_progression(ankle: &mut Point, label: &str, description: &str) -> Point {
    let frames = ankle.frame_number();
    let mut progression = Point::new(label, frames)
        .with_type(PointType::Angle)
        .with_description(description);
    progression.residuals_mut().copy_from_slice(ankle.residuals());

    for frame in 0..frames {
        let [_, y, z] = ankle.values()[frame];
        progression.values_mut()[frame] = [0.0, y, 0.0];
        ankle.values_mut()[frame] = [0.0, 0.0, z];
        if is_invalid(z as f32) {
            ankle.values_mut()[frame][2] = 0.0;
            ankle.residuals_mut()[frame] = -1.0;
        }
        if is_invalid(y as f32) {
            progression.values_mut()[frame][1] = 0.0;
            progression.residuals_mut()[frame] = -1.0;
        }
    }
    progression
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::formats::elite::tests::{header_bytes, write_samples, HeaderFields};

    fn write_angle_label(stream: &mut BinaryStream, label: &str) {
        stream.fill(10).unwrap();
        stream.write_padded_string(label, 6, 0).unwrap();
    }

    fn sample_file() -> Vec<u8> {
        let mut stream = header_bytes(&HeaderFields {
            frames: 2,
            markers: 3,
            ..HeaderFields::default()
        });
        write_samples(
            &mut stream,
            &[
                [10.0, 20.0, 30.0],
                [-9999.0, 5.0, 12.0],
                [1.0, 2.0, 3.0],
                [11.0, 21.0, 31.0],
                [-9999.0, -9999.0, 14.0],
                [4.0, 5.0, 6.0],
            ],
        );
        write_angle_label(&mut stream, "R_KNEE");
        write_angle_label(&mut stream, "R_ANKL");
        write_angle_label(&mut stream, "TRUNK");
        stream.into_bytes()
    }

    #[test]
    fn test_labels_renamed() {
        let acq = AngCodec::new().read_bytes(sample_file()).unwrap();
        assert_eq!(
            acq.points().labels(),
            vec!["RKneeAngle", "RAnkleAngle", "TRUNK", "RFootProgressAngle"]
        );
        let knee = acq.point(0).unwrap();
        assert_eq!(knee.description(), "Right Knee Rotation");
        assert!(acq.points().iter().all(|p| p.point_type() == PointType::Angle));
    }

    #[test]
    fn test_ankle_split() {
        let acq = AngCodec::new().read_bytes(sample_file()).unwrap();
        let ankle = acq.find_point("RAnkleAngle").unwrap();
        assert_eq!(ankle.values()[0], [0.0, 0.0, 12.0]);
        assert_eq!(ankle.values()[1], [0.0, 0.0, 14.0]);
        assert!(ankle.is_valid(1));

        let progression = acq.find_point("RFootProgressAngle").unwrap();
        assert_eq!(progression.values()[0], [0.0, 5.0, 0.0]);
        assert!(progression.is_valid(0));
        assert!(!progression.is_valid(1));
        assert_eq!(progression.description(), "Right Foot relative to Global/Body axes");
    }

    #[test]
    fn test_truncated_labels() {
        let mut bytes = sample_file();
        bytes.truncate(bytes.len() - 4);
        let err = AngCodec::new().read_bytes(bytes).unwrap_err();
        assert_eq!(err.cause(), "Unexpected end of file.");
    }
}
