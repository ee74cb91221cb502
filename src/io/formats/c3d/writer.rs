// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! C3D encoding.
//!
//! The parameter section is regenerated from the acquisition: the
//! `POINT`, `ANALOG`, `TRIAL` and `EVENT` parameters describing the data
//! are rewritten, every other group and parameter of the acquisition
//! metadata is written unchanged.

use crate::config::{C3dConfig, C3dStorage};
use crate::io::binary::BinaryStream;
use crate::metadata::{create_child, create_child_2d, create_scalar_child, MetaData};
use crate::model::{Acquisition, PointType};
use crate::{MocapError, Result};

use super::parameters::{self, BLOCK_SIZE, PARAMETER_KEY};
use super::reader::gain_code;
use super::{processor_byte, C3D_FORMAT};

/// Header marker of 4-character event labels.
const LONG_EVENT_LABELS: u16 = 12345;

/// Encode an acquisition into the bytes of a C3D file.
pub(crate) fn write(acquisition: &Acquisition, config: &C3dConfig) -> Result<Vec<u8>> {
    let point_count = u16::try_from(acquisition.point_number())
        .map_err(|_| MocapError::format(C3D_FORMAT, "Too many points."))?;
    let ratio = u16::try_from(acquisition.analog_samples_per_frame())
        .map_err(|_| MocapError::format(C3D_FORMAT, "Too many analog samples per frame."))?;
    let analog_total = u16::try_from(acquisition.analog_number() * acquisition.analog_samples_per_frame())
        .map_err(|_| MocapError::format(C3D_FORMAT, "Too many analog channels."))?;

    let magnitude = if config.point_scale > 0.0 { config.point_scale } else { 0.1 };
    let scale = match config.storage {
        C3dStorage::Integer => magnitude,
        C3dStorage::Float => -magnitude,
    };

    let mut root = build_parameters(acquisition, scale)?;
    let parameter_blocks = parameters::section_len(&root).div_ceil(BLOCK_SIZE as usize);
    let parameter_blocks = u8::try_from(parameter_blocks)
        .map_err(|_| MocapError::format(C3D_FORMAT, "The parameter section is too large."))?;
    let data_first_block = 2 + u16::from(parameter_blocks);
    if let Some(point) = root.find_child_mut("POINT") {
        create_scalar_child(point, "DATA_START", data_first_block as i16)?;
    }

    let order = config.byte_order.resolve();
    let mut stream = BinaryStream::from_bytes(Vec::new(), order);

    // Header block
    let first_frame = acquisition.first_frame().clamp(0, i32::from(u16::MAX)) as u16;
    let last_frame = acquisition.last_frame().clamp(0, i32::from(u16::MAX)) as u16;
    stream.write_u8(2)?;
    stream.write_u8(PARAMETER_KEY)?;
    stream.write_u16(point_count)?;
    stream.write_u16(analog_total)?;
    stream.write_u16(first_frame)?;
    stream.write_u16(last_frame)?;
    stream.write_u16(acquisition.max_interpolation_gap())?;
    stream.write_f32(scale)?;
    stream.write_u16(data_first_block)?;
    stream.write_u16(ratio)?;
    stream.write_f32(acquisition.point_frequency() as f32)?;
    stream.fill(270)?;
    stream.write_u16(0)?;
    stream.write_u16(0)?;
    stream.write_u16(LONG_EVENT_LABELS)?;
    // Events are only stored in the EVENT group.
    stream.write_u16(0)?;
    pad_to_block(&mut stream)?;

    // Parameter section
    parameters::write_section(&mut stream, &root, parameter_blocks, processor_byte(order))?;
    pad_to_block(&mut stream)?;

    // Data section
    write_samples(&mut stream, acquisition, config.storage, scale)?;
    pad_to_block(&mut stream)?;
    Ok(stream.into_bytes())
}

fn pad_to_block(stream: &mut BinaryStream) -> Result<()> {
    let position = stream.tell()?;
    let padding = (BLOCK_SIZE - position % BLOCK_SIZE) % BLOCK_SIZE;
    stream.fill(padding as usize)?;
    Ok(())
}

/// Effective scale of an analog channel (a zero scale cannot be inverted).
fn analog_scale(scale: f64) -> f64 {
    if scale.is_finite() && scale != 0.0 {
        scale
    } else {
        1.0
    }
}

/// Remove `stem`, `stem2`, ... from a group.
fn remove_split_children(group: &mut MetaData, stem: &str) {
    if group.take_child_by_label(stem).is_none() {
        return;
    }
    let mut index = 2;
    while group.take_child_by_label(&format!("{stem}{index}")).is_some() {
        index += 1;
    }
}

/// Frame number split into two 16-bit words, low word first.
fn frame_words(frame: i32) -> Vec<i16> {
    let bits = frame as u32;
    vec![(bits & 0xFFFF) as u16 as i16, (bits >> 16) as u16 as i16]
}

fn build_parameters(acquisition: &Acquisition, scale: f32) -> Result<MetaData> {
    let mut root = acquisition.metadata().clone();
    let frames = acquisition.point_frame_number();

    {
        let point = root.child_or_insert("POINT");
        create_scalar_child(point, "USED", acquisition.point_number() as i16)?;
        create_scalar_child(point, "FRAMES", frames.min(u16::MAX as usize) as u16 as i16)?;
        create_scalar_child(point, "DATA_START", 0i16)?;
        create_scalar_child(point, "SCALE", scale)?;
        create_scalar_child(point, "RATE", acquisition.point_frequency() as f32)?;
        create_child(
            point,
            "LABELS",
            acquisition.points().iter().map(|p| p.label().to_string()).collect(),
        )?;
        create_child(
            point,
            "DESCRIPTIONS",
            acquisition
                .points()
                .iter()
                .map(|p| p.description().to_string())
                .collect(),
        )?;
        for (point_type, unit_label) in [
            (PointType::Marker, "UNITS"),
            (PointType::Angle, "ANGLE_UNITS"),
            (PointType::Force, "FORCE_UNITS"),
            (PointType::Moment, "MOMENT_UNITS"),
            (PointType::Power, "POWER_UNITS"),
            (PointType::Scalar, "SCALAR_UNITS"),
        ] {
            create_scalar_child(point, unit_label, acquisition.point_unit(point_type).to_string())?;
        }
        for point_type in PointType::ALL {
            let Some(stem) = point_type.group_parameter() else {
                continue;
            };
            let labels: Vec<String> = acquisition
                .points()
                .iter()
                .filter(|p| p.point_type() == point_type)
                .map(|p| p.label().to_string())
                .collect();
            if labels.is_empty() {
                remove_split_children(point, stem);
            } else {
                create_child(point, stem, labels)?;
            }
        }
    }

    {
        let analogs = acquisition.analogs();
        let analog = root.child_or_insert("ANALOG");
        create_scalar_child(analog, "USED", analogs.len() as i16)?;
        create_child(analog, "LABELS", analogs.iter().map(|a| a.label().to_string()).collect())?;
        create_child(
            analog,
            "DESCRIPTIONS",
            analogs.iter().map(|a| a.description().to_string()).collect(),
        )?;
        create_scalar_child(analog, "GEN_SCALE", 1.0f32)?;
        create_child(
            analog,
            "SCALE",
            analogs.iter().map(|a| analog_scale(a.scale()) as f32).collect(),
        )?;
        create_child(
            analog,
            "OFFSET",
            analogs
                .iter()
                .map(|a| a.offset().clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16)
                .collect(),
        )?;
        create_child(analog, "UNITS", analogs.iter().map(|a| a.unit().to_string()).collect())?;
        create_child(analog, "GAIN", analogs.iter().map(|a| gain_code(a.gain())).collect())?;
        create_scalar_child(analog, "RATE", acquisition.analog_frequency() as f32)?;
        create_scalar_child(analog, "FORMAT", "SIGNED".to_string())?;
        create_scalar_child(analog, "BITS", i16::from(acquisition.analog_resolution().bits()))?;
    }

    {
        let trial = root.child_or_insert("TRIAL");
        create_child(trial, "ACTUAL_START_FIELD", frame_words(acquisition.first_frame()))?;
        create_child(trial, "ACTUAL_END_FIELD", frame_words(acquisition.last_frame()))?;
    }

    let events = acquisition.events();
    if !events.is_empty() || root.find_child("EVENT").is_some() {
        let group = root.child_or_insert("EVENT");
        create_scalar_child(group, "USED", events.len() as i16)?;
        create_child(group, "LABELS", events.iter().map(|e| e.label().to_string()).collect())?;
        create_child(group, "CONTEXTS", events.iter().map(|e| e.context().to_string()).collect())?;
        create_child(group, "SUBJECTS", events.iter().map(|e| e.subject().to_string()).collect())?;
        create_child(
            group,
            "DESCRIPTIONS",
            events.iter().map(|e| e.description().to_string()).collect(),
        )?;
        let times: Vec<f32> = events
            .iter()
            .flat_map(|e| {
                let minutes = (e.time() / 60.0).floor();
                [minutes as f32, (e.time() - minutes * 60.0) as f32]
            })
            .collect();
        create_child_2d(group, "TIMES", times, 2)?;
        create_child(group, "ICON_IDS", events.iter().map(|e| e.id() as i16).collect())?;
    }

    Ok(root)
}

/// Residual word: scaled residual in the low byte, camera mask (7 bits)
/// in the high byte, -1 for an invalid sample.
fn encode_residual(residual: f64, mask: u8, scale: f32) -> i16 {
    if residual < 0.0 {
        return -1;
    }
    let low = (residual / f64::from(scale.abs())).round().clamp(0.0, 255.0) as u16;
    (((u16::from(mask & 0x7F)) << 8) | low) as i16
}

fn to_i16(value: f64) -> i16 {
    value.round().clamp(f64::from(i16::MIN), f64::from(i16::MAX)) as i16
}

fn write_samples(
    stream: &mut BinaryStream,
    acquisition: &Acquisition,
    storage: C3dStorage,
    scale: f32,
) -> Result<()> {
    let ratio = acquisition.analog_samples_per_frame();
    let point_scale = f64::from(scale.abs());
    let analog_scales: Vec<f64> = acquisition
        .analogs()
        .iter()
        .map(|a| analog_scale(a.scale()))
        .collect();

    for frame in 0..acquisition.point_frame_number() {
        for point in acquisition.points() {
            let [x, y, z] = point.values()[frame];
            let word = encode_residual(point.residuals()[frame], point.masks()[frame], scale);
            match storage {
                C3dStorage::Integer => {
                    stream.write_i16(to_i16(x / point_scale))?;
                    stream.write_i16(to_i16(y / point_scale))?;
                    stream.write_i16(to_i16(z / point_scale))?;
                    stream.write_i16(word)?;
                }
                C3dStorage::Float => {
                    stream.write_f32(x as f32)?;
                    stream.write_f32(y as f32)?;
                    stream.write_f32(z as f32)?;
                    stream.write_f32(f32::from(word))?;
                }
            }
        }
        for sample in 0..ratio {
            for (channel, analog) in acquisition.analogs().iter().enumerate() {
                let value = analog.values()[frame * ratio + sample];
                let raw = value / analog_scales[channel] + f64::from(analog.offset());
                match storage {
                    C3dStorage::Integer => {
                        stream.write_i16(to_i16(raw))?;
                    }
                    C3dStorage::Float => {
                        stream.write_f32(raw as f32)?;
                    }
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::binary::ByteOrderFormat;
    use crate::io::formats::c3d::reader;
    use crate::model::{Analog, Event, Point};

    fn sample() -> Acquisition {
        let mut acq = Acquisition::new();
        acq.init(2, 5, 2, 2).unwrap();
        acq.set_point_frequency(50.0);
        acq.set_first_frame(10, false);
        for (i, label) in ["LASI", "RASI"].iter().enumerate() {
            let point = acq.point_mut(i).unwrap();
            point.set_label(*label);
            for f in 0..5 {
                point
                    .set_frame(f, [f as f64 + 0.5, -(i as f64) * 10.0, 100.25], 0.5)
                    .unwrap();
            }
        }
        acq.point_mut(1).unwrap().residuals_mut()[3] = -1.0;
        for (i, label) in ["EMG1", "EMG2"].iter().enumerate() {
            let analog = acq.analog_mut(i).unwrap();
            analog.set_label(*label);
            for s in 0..10 {
                analog.set_value(s, (s as f64) * 0.25 - i as f64).unwrap();
            }
        }
        acq.append_event(
            Event::new("Foot Strike", 0.3)
                .with_context("Left")
                .with_id(1),
        );
        acq
    }

    fn decode(bytes: Vec<u8>) -> Acquisition {
        let mut stream = BinaryStream::from_bytes(bytes, ByteOrderFormat::IeeeLittleEndian);
        reader::read(&mut stream).unwrap()
    }

    #[test]
    fn test_float_round_trip_all_orders() {
        let acq = sample();
        for order in [
            ByteOrderFormat::IeeeLittleEndian,
            ByteOrderFormat::IeeeBigEndian,
            ByteOrderFormat::VaxLittleEndian,
        ] {
            let config = C3dConfig {
                byte_order: order,
                ..C3dConfig::default()
            };
            let bytes = write(&acq, &config).unwrap();
            assert_eq!(bytes.len() % 512, 0);
            let back = decode(bytes);
            assert_eq!(back.first_frame(), 10, "{order:?}");
            assert_eq!(back.point_frequency(), 50.0);
            assert_eq!(back.analog_samples_per_frame(), 2);
            assert_eq!(back.points().labels(), vec!["LASI", "RASI"]);
            assert_eq!(back.analogs().labels(), vec!["EMG1", "EMG2"]);
            assert_eq!(back.point(0).unwrap().values()[4], [4.5, 0.0, 100.25]);
            assert!(!back.point(1).unwrap().is_valid(3));
            assert!((back.point(0).unwrap().residuals()[0] - 0.5).abs() < 0.05);
            assert_eq!(back.analog(1).unwrap().values()[9], 9.0 * 0.25 - 1.0);
        }
    }

    #[test]
    fn test_integer_storage_quantizes_points() {
        let acq = sample();
        let config = C3dConfig {
            storage: C3dStorage::Integer,
            point_scale: 0.25,
            ..C3dConfig::default()
        };
        let back = decode(write(&acq, &config).unwrap());
        assert_eq!(back.point(0).unwrap().values()[2], [2.5, 0.0, 100.25]);
        assert_eq!(back.point(1).unwrap().values()[0], [0.5, -10.0, 100.25]);
    }

    #[test]
    fn test_events_round_trip() {
        let back = decode(write(&sample(), &C3dConfig::default()).unwrap());
        assert_eq!(back.event_number(), 1);
        let event = back.event(0).unwrap();
        assert_eq!(event.label(), "Foot Strike");
        assert_eq!(event.context(), "Left");
        assert_eq!(event.id(), 1);
        assert!((event.time() - 0.3).abs() < 1e-6);
        assert_eq!(event.frame(), 25);
    }

    #[test]
    fn test_header_events_kept_with_group_events() {
        let mut bytes = write(&sample(), &C3dConfig::default()).unwrap();
        bytes[300..302].copy_from_slice(&1u16.to_le_bytes());
        bytes[304..308].copy_from_slice(&0.1f32.to_le_bytes());
        bytes[396..400].copy_from_slice(b"HEEL");

        let back = decode(bytes);
        assert_eq!(back.events().labels(), vec!["HEEL", "Foot Strike"]);
        let heel = back.event(0).unwrap();
        assert!((heel.time() - 0.1).abs() < 1e-6);
        assert_eq!(heel.frame(), 15);
    }

    #[test]
    fn test_oversized_sample_count_rejected() {
        let mut bytes = write(&sample(), &C3dConfig::default()).unwrap();
        // Analog samples per point frame.
        bytes[18..20].copy_from_slice(&u16::MAX.to_le_bytes());
        let mut stream = BinaryStream::from_bytes(bytes, ByteOrderFormat::IeeeLittleEndian);
        let err = reader::read(&mut stream).unwrap_err();
        assert_eq!(err.cause(), "Unexpected end of file.");
    }

    #[test]
    fn test_user_parameters_preserved() {
        let mut acq = sample();
        let mut subjects = MetaData::new("SUBJECTS").with_description("subject info");
        subjects.append_child(MetaData::with_value("NAMES", vec!["Jane".to_string()]).unwrap());
        acq.metadata_mut().append_child(subjects);

        let back = decode(write(&acq, &C3dConfig::default()).unwrap());
        let names = back.metadata().get("SUBJECTS:NAMES").unwrap();
        assert_eq!(names.info().unwrap().string_at(0).unwrap(), "Jane");
        assert_eq!(
            back.metadata().find_child("SUBJECTS").unwrap().description(),
            "subject info"
        );
    }

    #[test]
    fn test_point_types_and_units() {
        let mut acq = sample();
        acq.point_mut(1).unwrap().set_point_type(PointType::Angle);
        acq.set_point_unit(PointType::Angle, "rad");
        let back = decode(write(&acq, &C3dConfig::default()).unwrap());
        assert_eq!(back.point(1).unwrap().point_type(), PointType::Angle);
        assert_eq!(back.point(0).unwrap().point_type(), PointType::Marker);
        assert_eq!(back.point_unit(PointType::Angle), "rad");
    }

    #[test]
    fn test_large_frame_numbers() {
        let mut acq = Acquisition::new();
        acq.init(1, 3, 0, 1).unwrap();
        acq.set_first_frame(70000, false);
        let back = decode(write(&acq, &C3dConfig::default()).unwrap());
        assert_eq!(back.first_frame(), 70000);
        assert_eq!(back.point_frame_number(), 3);
    }

    #[test]
    fn test_many_points_split_labels() {
        let mut acq = Acquisition::new();
        acq.init(300, 1, 0, 1).unwrap();
        let back = decode(write(&acq, &C3dConfig::default()).unwrap());
        assert_eq!(back.point_number(), 300);
        assert_eq!(back.point(299).unwrap().label(), "uname*300");
        assert!(back.metadata().get("POINT:LABELS2").is_some());
    }

    #[test]
    fn test_analog_scale_and_offset() {
        let mut acq = Acquisition::new();
        acq.init(0, 2, 0, 1).unwrap();
        let mut analog = Analog::new("FZ", 2).with_scale(0.5);
        analog.set_offset(10);
        analog.set_value(1, 3.0).unwrap();
        acq.append_analog(analog).unwrap();
        acq.append_point(Point::new("M", 2)).unwrap();

        let config = C3dConfig {
            storage: C3dStorage::Integer,
            ..C3dConfig::default()
        };
        let back = decode(write(&acq, &config).unwrap());
        let fz = back.find_analog("FZ").unwrap();
        assert_eq!(fz.values(), &[0.0, 3.0]);
        assert_eq!(fz.offset(), 10);
        assert_eq!(fz.scale(), 0.5);
    }

    #[test]
    fn test_encode_residual() {
        assert_eq!(encode_residual(-1.0, 3, 0.1), -1);
        assert_eq!(encode_residual(1.0, 3, -0.1), 0x030A);
        assert_eq!(encode_residual(1000.0, 0, 0.1), 255);
    }
}
