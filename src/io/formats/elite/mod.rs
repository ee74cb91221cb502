// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Elite family of formats (BTS Elite gait analysis system).
//!
//! Every file of the family is IEEE little-endian and starts with the same
//! 512-byte header: frame and marker counts, optional gait events, the
//! trial date and the frame rate. Marker coordinates follow as four floats
//! per sample (the fourth one is unused), padded to a 512-byte block, then
//! an optional label section.
//!
//! The formats are read-only and are recognised by their extension:
//!
//! | Codec        | Extensions       | Content                            |
//! |--------------|------------------|------------------------------------|
//! | [`AngCodec`] | `.ang`           | joint angles                       |
//! | [`MomCodec`] | `.mom`           | six joint moments                  |
//! | [`PwrCodec`] | `.pwr`           | six joint powers                   |
//! | [`RaxCodec`] | `.rah`, `.raw`   | marker trajectories                |
//! | [`RicCodec`] | `.ric`           | marker trajectories and gait events |

pub mod ang;
pub mod mom;
pub mod pwr;
pub mod rax;
pub mod ric;

pub use ang::AngCodec;
pub use mom::MomCodec;
pub use pwr::PwrCodec;
pub use rax::RaxCodec;
pub use ric::RicCodec;

use std::path::Path;

use chrono::NaiveDate;

use crate::io::binary::{BinaryStream, FailureKind, SeekOrigin, StreamFailure};
use crate::io::traits::has_extension;
use crate::metadata::create_child;
use crate::model::{
    Acquisition, Event, CONTEXT_LEFT, CONTEXT_RIGHT, FOOT_OFF_ID, FOOT_STRIKE_ID,
};
use crate::Result;

/// Size of a block (and of the header).
pub(crate) const BLOCK_SIZE: u64 = 512;

/// Coordinate marking a missing sample.
pub(crate) const INVALID_VALUE: f32 = -9999.0;

/// Event slots per kind of event in the header.
const EVENT_SLOTS: usize = 12;

/// Frame number of an unused event slot.
const NO_EVENT: u16 = 0xFFFF;

/// Sample block that follows the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SampleLayout {
    /// One 16-byte sample per marker counted in the header.
    Markers,
    /// A fixed number of points, whatever the header counts.
    Fixed { points: usize, frame_bytes: u64 },
}

/// Check that `path` has one of `extensions` and names an existing file.
pub(crate) fn can_read_elite(path: &Path, extensions: &[&str]) -> bool {
    has_extension(path, extensions) && path.is_file()
}

pub(crate) fn is_invalid(value: f32) -> bool {
    (value - INVALID_VALUE).abs() < f32::EPSILON
}

/// Read the header and allocate the points of the acquisition.
///
/// Gait events are only stored in RIC files; other formats leave the slots
/// unused. The sample block described by `layout` must fit in the rest of
/// the stream.
pub(crate) fn read_header(
    stream: &mut BinaryStream,
    acquisition: &mut Acquisition,
    extract_events: bool,
    layout: SampleLayout,
) -> Result<()> {
    let _cameras = stream.read_u16()?;
    let frames = stream.read_u16()? as usize;
    let markers = stream.read_u16()? as usize;

    let mut events = Vec::new();
    if extract_events {
        stream.seek(2, SeekOrigin::Current)?;
        for (label, context, id) in [
            ("Foot Off", CONTEXT_LEFT, FOOT_OFF_ID),
            ("Foot Off", CONTEXT_RIGHT, FOOT_OFF_ID),
            ("Foot Strike", CONTEXT_LEFT, FOOT_STRIKE_ID),
            ("Foot Strike", CONTEXT_RIGHT, FOOT_STRIKE_ID),
        ] {
            for frame in stream.read_u16_vec(EVENT_SLOTS)? {
                if frame != NO_EVENT {
                    events.push(
                        Event::new(label, 0.0)
                            .with_context(context)
                            .with_frame(i32::from(frame))
                            .with_id(id),
                    );
                }
            }
        }
        stream.seek(136, SeekOrigin::Current)?;
    } else {
        stream.seek(234, SeekOrigin::Current)?;
    }

    let day = stream.read_u16()?;
    let month = stream.read_u16()?;
    let year = stream.read_u16()?;
    stream.seek(184, SeekOrigin::Current)?;
    let frame_rate = f64::from(stream.read_u16()?);
    stream.seek(80, SeekOrigin::Current)?;

    let (points, frame_bytes) = match layout {
        SampleLayout::Markers => (markers, markers as u64 * 16),
        SampleLayout::Fixed { points, frame_bytes } => (points, frame_bytes),
    };
    if frames as u64 * frame_bytes > stream.remaining()? {
        return Err(StreamFailure::new(FailureKind::EndOfFile, true).into());
    }
    acquisition.init(points, frames, 0, 1)?;
    acquisition.set_point_frequency(frame_rate);
    store_date(acquisition, year, month, day)?;

    for mut event in events {
        if frame_rate > 0.0 {
            event.set_time(f64::from(event.frame()) / frame_rate);
        }
        acquisition.append_event(event);
    }
    Ok(())
}

/// Store the trial date as `TRIAL:DATE` (year, month, day).
fn store_date(acquisition: &mut Acquisition, year: u16, month: u16, day: u16) -> Result<()> {
    if year == 0 || month == 0 || day == 0 {
        return Ok(());
    }
    if NaiveDate::from_ymd_opt(i32::from(year), u32::from(month), u32::from(day)).is_none() {
        tracing::warn!(year, month, day, "Invalid trial date. The date is not stored.");
        return Ok(());
    }
    let trial = acquisition.metadata_mut().child_or_insert("TRIAL");
    create_child(trial, "DATE", vec![year as i16, month as i16, day as i16])
}

/// Read the coordinates of every marker, then skip to the next block.
pub(crate) fn read_marker_values(stream: &mut BinaryStream, acquisition: &mut Acquisition) -> Result<()> {
    let frames = acquisition.point_frame_number();
    for frame in 0..frames {
        for point in acquisition.points_mut().iter_mut() {
            let x = stream.read_f32()?;
            let y = stream.read_f32()?;
            let z = stream.read_f32()?;
            stream.seek(4, SeekOrigin::Current)?;
            if is_invalid(x) && is_invalid(y) && is_invalid(z) {
                point.values_mut()[frame] = [0.0; 3];
                point.residuals_mut()[frame] = -1.0;
            } else {
                point.values_mut()[frame] = [f64::from(x), f64::from(y), f64::from(z)];
            }
        }
    }
    let written = (frames * acquisition.point_number() * 16) as u64;
    let padding = (BLOCK_SIZE - written % BLOCK_SIZE) % BLOCK_SIZE;
    stream.seek(padding as i64, SeekOrigin::Current)?;
    Ok(())
}

/// Trim the spaces and NUL bytes around a fixed-length label.
pub(crate) fn clean_label(raw: &str) -> String {
    raw.trim_matches(|c| c == ' ' || c == '\0').to_string()
}

/// Read the 8-byte label of every marker.
pub(crate) fn read_labels(stream: &mut BinaryStream, acquisition: &mut Acquisition) -> Result<()> {
    for point in acquisition.points_mut().iter_mut() {
        let label = stream.read_string(8)?;
        point.set_label(clean_label(&label));
    }
    Ok(())
}
