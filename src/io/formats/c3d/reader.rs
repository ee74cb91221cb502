// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! C3D decoding: header, parameter section, then sample blocks.

use crate::io::binary::{BinaryStream, ByteOrderFormat, SeekOrigin};
use crate::metadata::{collapse_children_values, MetaData, ROOT_LABEL};
use crate::model::{Acquisition, AnalogGain, AnalogResolution, Event, PointType, GENERATED_LABEL_PREFIX};
use crate::{MocapError, Result};

use super::parameters::{self, BLOCK_SIZE, PARAMETER_KEY};
use super::C3D_FORMAT;

/// Number of event slots in the header.
const HEADER_EVENT_SLOTS: usize = 18;

/// Marker of 4-character event labels in the header.
const LONG_EVENT_LABELS: u16 = 12345;

fn format_error(cause: impl Into<String>) -> MocapError {
    MocapError::format(C3D_FORMAT, cause)
}

/// Fields of the header block.
#[derive(Debug, Default)]
struct Header {
    point_count: u16,
    analog_samples_per_frame: u16,
    first_frame: u16,
    last_frame: u16,
    max_gap: u16,
    scale: f32,
    data_first_block: u16,
    analog_ratio: u16,
    frequency: f32,
    events: Vec<Event>,
}

/// Decode a whole C3D stream.
pub(crate) fn read(stream: &mut BinaryStream) -> Result<Acquisition> {
    let order = detect_byte_order(stream)?;
    stream.restart_with(order)?;

    let parameter_first_block = stream.read_i8()?;
    if parameter_first_block <= 0 {
        return Err(format_error("Bad parameter first block number"));
    }
    if stream.read_u8()? != PARAMETER_KEY {
        return Err(format_error("Bad header key"));
    }
    let header = if parameter_first_block != 1 {
        let header = read_header(stream)?;
        stream.seek(
            BLOCK_SIZE as i64 * (i64::from(parameter_first_block) - 1),
            SeekOrigin::Begin,
        )?;
        header
    } else {
        Header::default()
    };

    let section = parameters::read_section(stream)?;
    let mut root = MetaData::new(ROOT_LABEL);
    for group in section.groups {
        root.append_child(group);
    }

    let mut acquisition = Acquisition::new();
    acquisition.set_max_interpolation_gap(header.max_gap);
    acquisition.set_point_frequency(f64::from(header.frequency));
    acquisition.set_first_frame(i32::from(header.first_frame), false);

    if header.data_first_block != 0 {
        let first_block = section.first_block.max(1) as usize;
        let minimum = parameter_first_block as usize + (first_block - 1) + section.block_count;
        if (header.data_first_block as usize) < minimum {
            return Err(format_error("Bad data first block"));
        }
        stream.seek(
            BLOCK_SIZE as i64 * (i64::from(header.data_first_block) - 1),
            SeekOrigin::Begin,
        )?;
        read_samples(stream, &header, &root, &mut acquisition)?;
    }

    let mut events = header.events;
    events.extend(read_parameter_events(&root).unwrap_or_default());
    for event in events {
        let frame = acquisition.frame_for_time(event.time());
        acquisition.append_event(event.with_frame(frame));
    }

    acquisition.set_metadata(root);
    Ok(acquisition)
}

/// Read the processor type stored in the fourth byte of the parameter
/// section.
fn detect_byte_order(stream: &mut BinaryStream) -> Result<ByteOrderFormat> {
    stream.seek(0, SeekOrigin::Begin)?;
    let first_block = stream.read_u8()?;
    if first_block == 0 {
        return Err(format_error("Bad parameter first block number"));
    }
    stream.seek(
        BLOCK_SIZE as i64 * (i64::from(first_block) - 1) + 3,
        SeekOrigin::Begin,
    )?;
    match stream.read_i8()? as i16 - 83 {
        1 => Ok(ByteOrderFormat::IeeeLittleEndian),
        2 => Ok(ByteOrderFormat::VaxLittleEndian),
        3 => Ok(ByteOrderFormat::IeeeBigEndian),
        _ => Err(format_error("Invalid processor type")),
    }
}

fn read_header(stream: &mut BinaryStream) -> Result<Header> {
    let mut header = Header {
        point_count: stream.read_u16()?,
        analog_samples_per_frame: stream.read_u16()?,
        first_frame: stream.read_u16()?,
        last_frame: stream.read_u16()?,
        max_gap: stream.read_u16()?,
        scale: stream.read_f32()?,
        ..Header::default()
    };
    if header.scale == 0.0 {
        return Err(format_error("Incorrect 3D scale factor"));
    }
    header.data_first_block = stream.read_u16()?;
    header.analog_ratio = stream.read_u16()?;
    header.frequency = stream.read_f32()?;
    stream.seek(270, SeekOrigin::Current)?;

    let label_range_section = stream.read_u16()?;
    let label_range_block = stream.read_u16()?;
    if label_range_section == LONG_EVENT_LABELS {
        tracing::warn!(
            block = label_range_block,
            "The file has a 'Label and Range Section' which is not supported."
        );
    }
    let event_label_format = stream.read_u16()?;
    let event_count = (stream.read_u16()? as usize).min(HEADER_EVENT_SLOTS);
    if event_count > 0 {
        stream.seek(2, SeekOrigin::Current)?;
        let times = stream.read_f32_vec(HEADER_EVENT_SLOTS)?;
        // Activation flags are not kept.
        stream.seek(HEADER_EVENT_SLOTS as i64 + 2, SeekOrigin::Current)?;
        let label_len = if event_label_format == LONG_EVENT_LABELS { 4 } else { 2 };
        let labels = stream.read_strings(event_count, label_len)?;
        header.events = labels
            .iter()
            .zip(times)
            .map(|(label, time)| Event::new(label.trim(), f64::from(time)))
            .collect();
    }
    Ok(header)
}

/// First value of `group:label` as an integer.
fn parameter_i32(group: Option<&MetaData>, label: &str) -> Option<i32> {
    group?.find_child(label)?.info()?.i32_at(0)
}

/// Frame stored in a pair of 16-bit words (low word first).
fn parameter_field(group: Option<&MetaData>, label: &str) -> Option<i32> {
    let values = group?.find_child(label)?.info()?.to_i32s();
    match values.as_slice() {
        [low, high, ..] => Some(((*high as u16 as u32) << 16 | (*low as u16 as u32)) as i32),
        _ => None,
    }
}

fn read_samples(
    stream: &mut BinaryStream,
    header: &Header,
    root: &MetaData,
    acquisition: &mut Acquisition,
) -> Result<()> {
    let ratio = header.analog_ratio.max(1) as usize;
    let analog_group = root.find_child("ANALOG");
    let point_group = root.find_child("POINT");
    let trial_group = root.find_child("TRIAL");

    let mut analog_count = header.analog_samples_per_frame as usize / ratio;
    if let Some(used) = parameter_i32(analog_group, "USED") {
        if used as usize != analog_count {
            tracing::warn!(
                header = analog_count,
                parameter = used,
                "The number of analog channels in the header and in the parameter section differ. The parameter section is kept."
            );
            analog_count = used.max(0) as usize;
        }
    }
    let mut point_count = header.point_count as usize;
    if let Some(used) = parameter_i32(point_group, "USED") {
        if used as usize != point_count {
            tracing::warn!(
                header = point_count,
                parameter = used,
                "The number of markers in the header and in the parameter section differ. The parameter section is kept."
            );
            point_count = used.max(0) as usize;
        }
    }

    let mut first_frame = i64::from(header.first_frame);
    let mut last_frame = i64::from(header.last_frame);
    if let (Some(start), Some(end)) = (
        parameter_field(trial_group, "ACTUAL_START_FIELD"),
        parameter_field(trial_group, "ACTUAL_END_FIELD"),
    ) {
        if end >= start {
            first_frame = i64::from(start);
            last_frame = i64::from(end);
        }
    }
    let frames = (last_frame - first_frame + 1).max(0) as usize;
    let word_size = if header.scale > 0.0 { 2 } else { 4 };
    let needed = (point_count * 4)
        .checked_add(analog_count.saturating_mul(ratio))
        .and_then(|per_frame| per_frame.checked_mul(frames))
        .and_then(|words| words.checked_mul(word_size));
    let available = stream.remaining()?;
    if !needed.is_some_and(|bytes| bytes as u64 <= available) {
        return Err(format_error("Unexpected end of file."));
    }
    acquisition.set_first_frame(first_frame as i32, false);
    acquisition.init(point_count, frames, analog_count, ratio)?;

    // Analog conversion parameters.
    let unsigned = analog_group
        .and_then(|g| g.find_child("FORMAT"))
        .and_then(|f| f.info())
        .and_then(|i| i.string_at(0))
        .is_some_and(|f| f == "UNSIGNED");
    let mut scales: Vec<f64> = collapse_children_values(analog_group, "SCALE", Some(analog_count), None);
    scales.resize(analog_count, 1.0);
    let mut offsets: Vec<i32> = collapse_children_values(analog_group, "OFFSET", Some(analog_count), None);
    offsets.resize(analog_count, 0);
    if unsigned {
        for offset in offsets.iter_mut() {
            *offset = i32::from(*offset as i16 as u16);
        }
    }
    let gen_scale = analog_group
        .and_then(|g| g.find_child("GEN_SCALE"))
        .and_then(|p| p.info())
        .and_then(|i| i.f64_at(0))
        .unwrap_or(1.0);

    let point_scale = f64::from(header.scale);
    let integer = header.scale > 0.0;
    for frame in 0..frames {
        for point in acquisition.points_mut().iter_mut() {
            let (xyz, word) = if integer {
                let x = f64::from(stream.read_i16()?) * point_scale;
                let y = f64::from(stream.read_i16()?) * point_scale;
                let z = f64::from(stream.read_i16()?) * point_scale;
                ([x, y, z], stream.read_i16()?)
            } else {
                let x = f64::from(stream.read_f32()?);
                let y = f64::from(stream.read_f32()?);
                let z = f64::from(stream.read_f32()?);
                ([x, y, z], stream.read_f32()? as i16)
            };
            let (residual, mask) = decode_residual(word, point_scale);
            point.values_mut()[frame] = xyz;
            point.residuals_mut()[frame] = residual;
            point.masks_mut()[frame] = mask;
        }
        for sample in 0..ratio {
            for (channel, analog) in acquisition.analogs_mut().iter_mut().enumerate() {
                let raw = match (integer, unsigned) {
                    (true, true) => f64::from(stream.read_u16()?),
                    (true, false) => f64::from(stream.read_i16()?),
                    (false, _) => f64::from(stream.read_f32()?),
                };
                analog.values_mut()[frame * ratio + sample] =
                    (raw - f64::from(offsets[channel])) * scales[channel] * gen_scale;
            }
        }
    }

    apply_point_parameters(point_group, acquisition)?;
    apply_analog_parameters(analog_group, acquisition, &scales, &offsets, gen_scale)?;
    Ok(())
}

/// Split a residual word: low byte is the scaled residual, high byte the
/// camera mask; a negative word marks an invalid sample.
fn decode_residual(word: i16, scale: f64) -> (f64, u8) {
    if word < 0 {
        (-1.0, 0)
    } else {
        let [low, high] = (word as u16).to_le_bytes();
        (f64::from(low) * scale.abs(), high)
    }
}

fn apply_point_parameters(group: Option<&MetaData>, acquisition: &mut Acquisition) -> Result<()> {
    let count = acquisition.point_number();
    let labels: Vec<String> = collapse_children_values(
        group,
        "LABELS",
        Some(count),
        Some(&GENERATED_LABEL_PREFIX.to_string()),
    );
    let descriptions: Vec<String> = collapse_children_values(group, "DESCRIPTIONS", Some(count), None);
    for (index, label) in labels.into_iter().enumerate() {
        acquisition.point_mut(index)?.set_label(label);
    }
    for (index, description) in descriptions.into_iter().enumerate() {
        acquisition.point_mut(index)?.set_description(description);
    }

    let Some(group) = group else {
        return Ok(());
    };
    for (point_type, unit_label) in [
        (PointType::Marker, "UNITS"),
        (PointType::Angle, "ANGLE_UNITS"),
        (PointType::Force, "FORCE_UNITS"),
        (PointType::Moment, "MOMENT_UNITS"),
        (PointType::Power, "POWER_UNITS"),
        (PointType::Scalar, "SCALAR_UNITS"),
    ] {
        if let Some(unit) = group
            .find_child(unit_label)
            .and_then(|p| p.info())
            .and_then(|i| i.string_at(0))
        {
            acquisition.set_point_unit(point_type, unit);
        }
    }
    for point_type in PointType::ALL {
        let Some(stem) = point_type.group_parameter() else {
            continue;
        };
        let typed: Vec<String> = collapse_children_values(Some(group), stem, None, None);
        for label in typed.iter().filter(|l| !l.is_empty()) {
            if let Some(point) = acquisition.find_point_mut(label) {
                point.set_point_type(point_type);
            }
        }
    }
    Ok(())
}

fn apply_analog_parameters(
    group: Option<&MetaData>,
    acquisition: &mut Acquisition,
    scales: &[f64],
    offsets: &[i32],
    gen_scale: f64,
) -> Result<()> {
    let count = acquisition.analog_number();
    let labels: Vec<String> = collapse_children_values(
        group,
        "LABELS",
        Some(count),
        Some(&GENERATED_LABEL_PREFIX.to_string()),
    );
    let descriptions: Vec<String> = collapse_children_values(group, "DESCRIPTIONS", Some(count), None);
    let units: Vec<String> = collapse_children_values(group, "UNITS", Some(count), None);
    let gains: Vec<i32> = collapse_children_values(group, "GAIN", Some(count), None);

    for (index, analog) in acquisition.analogs_mut().iter_mut().enumerate() {
        if let Some(label) = labels.get(index) {
            analog.set_label(label.clone());
        }
        if let Some(description) = descriptions.get(index) {
            analog.set_description(description.clone());
        }
        if let Some(unit) = units.get(index) {
            analog.set_unit(unit.clone());
        }
        if let Some(&code) = gains.get(index) {
            analog.set_gain(gain_from_code(code));
        }
        analog.set_scale(scales[index] * gen_scale);
        analog.set_offset(offsets[index]);
    }

    if let Some(bits) = parameter_i32(group, "BITS") {
        match AnalogResolution::from_bits(bits.max(0) as u16) {
            Some(resolution) => acquisition.set_analog_resolution(resolution),
            None => tracing::warn!(bits, "Unknown analog resolution. Default resolution (12 bits) is used."),
        }
    }
    Ok(())
}

/// `ANALOG:GAIN` code of a gain.
pub(crate) fn gain_code(gain: AnalogGain) -> i16 {
    match gain {
        AnalogGain::Unknown => 0,
        AnalogGain::PlusMinus10 => 1,
        AnalogGain::PlusMinus5 => 2,
        AnalogGain::PlusMinus2Dot5 => 3,
        AnalogGain::PlusMinus1Dot25 => 4,
        AnalogGain::PlusMinus1 => 5,
    }
}

fn gain_from_code(code: i32) -> AnalogGain {
    match code {
        1 => AnalogGain::PlusMinus10,
        2 => AnalogGain::PlusMinus5,
        3 => AnalogGain::PlusMinus2Dot5,
        4 => AnalogGain::PlusMinus1Dot25,
        5 => AnalogGain::PlusMinus1,
        _ => AnalogGain::Unknown,
    }
}

/// Events of the `EVENT` group (or `EVENTS`), or `None` when the file has
/// no such group.
fn read_parameter_events(root: &MetaData) -> Option<Vec<Event>> {
    let group = match root.find_child("EVENT") {
        Some(group) => group,
        None => {
            let group = root.find_child("EVENTS")?;
            tracing::warn!("EVENTS group found instead of EVENT. The EVENTS group is used to extract events.");
            group
        }
    };
    let count = group.find_child("USED")?.info()?.i32_at(0)?.max(0) as usize;

    let labels: Vec<String> = collapse_children_values(
        Some(group),
        "LABELS",
        Some(count),
        Some(&GENERATED_LABEL_PREFIX.to_string()),
    );
    let mut times: Vec<f64> = collapse_children_values(Some(group), "TIMES", None, None);
    if times.len() < 2 * count {
        tracing::warn!("EVENT:TIMES does not contain the expected number of values. The extracted times could be corrupted.");
    }
    times.resize(2 * count, 0.0);
    let mut contexts: Vec<String> = collapse_children_values(Some(group), "CONTEXTS", Some(count), None);
    contexts.resize(count, String::new());
    let mut subjects: Vec<String> = collapse_children_values(Some(group), "SUBJECTS", Some(count), None);
    subjects.resize(count, String::new());
    let mut descriptions: Vec<String> =
        collapse_children_values(Some(group), "DESCRIPTIONS", Some(count), None);
    descriptions.resize(count, String::new());
    let mut ids: Vec<i32> = collapse_children_values(Some(group), "ICON_IDS", Some(count), None);
    ids.resize(count, 0);

    Some(
        (0..count)
            .map(|i| {
                let time = times[2 * i] * 60.0 + times[2 * i + 1];
                Event::new(labels[i].clone(), time)
                    .with_context(contexts[i].clone())
                    .with_subject(subjects[i].clone())
                    .with_description(descriptions[i].clone())
                    .with_id(ids[i])
            })
            .collect(),
    )
}
