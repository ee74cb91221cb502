// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! TRC format support (tab-delimited marker trajectories).
//!
//! ```text
//! PathFileType  4  (X/Y/Z)  walk.trc
//! DataRate  CameraRate  NumFrames  NumMarkers  Units  OrigDataRate  OrigDataStartFrame  OrigNumFrames
//! 100.00    100.00      2          1           mm     100.00        1                   2
//! Frame#  Time  LASI
//!               X1  Y1  Z1
//!
//! 1  0.000  1.00000  2.00000  3.00000
//! 2  0.010
//! ```
//!
//! Columns are separated by tabs. Occluded samples are written as empty
//! fields.

use std::any::Any;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::Path;

use crate::config::TrcConfig;
use crate::io::binary::ByteOrderFormat;
use crate::io::traits::{open_for_read, persist, read_prefix, AcquisitionCodec};
use crate::model::{Acquisition, PointType, GENERATED_LABEL_PREFIX};
use crate::{MocapError, Result};

/// Name used in TRC error messages.
pub const TRC_FORMAT: &str = "TRC";

const MAGIC: &[u8] = b"PathFileType";

fn format_error(cause: impl Into<String>) -> MocapError {
    MocapError::format(TRC_FORMAT, cause)
}

/// Reader and writer of TRC files.
#[derive(Debug, Clone, Default)]
pub struct TrcCodec {
    config: TrcConfig,
}

impl TrcCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: TrcConfig) -> Self {
        Self { config }
    }

    /// Set the rate written when the acquisition has no point frequency.
    pub fn with_default_frequency(mut self, frequency: f64) -> Self {
        self.config.default_frequency = frequency;
        self
    }

    pub fn config(&self) -> &TrcConfig {
        &self.config
    }

    /// Decode the content of a TRC file.
    pub fn read_text(&self, text: &str) -> Result<Acquisition> {
        read(text).map_err(|e| e.into_format(TRC_FORMAT))
    }

    /// Encode the markers of an acquisition. `file_name` is stored in the
    /// first header line.
    pub fn write_text(&self, acquisition: &Acquisition, file_name: &str) -> Result<String> {
        write(acquisition, file_name, &self.config)
    }
}

impl AcquisitionCodec for TrcCodec {
    fn name(&self) -> &'static str {
        TRC_FORMAT
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["trc"]
    }

    /// The file starts with the keyword `PathFileType`.
    fn can_read(&self, path: &Path) -> bool {
        read_prefix(path, MAGIC.len()).is_some_and(|prefix| prefix == MAGIC)
    }

    fn supports_write(&self) -> bool {
        true
    }

    fn read(&self, path: &Path) -> Result<Acquisition> {
        let mut stream = open_for_read(path, ByteOrderFormat::Native, TRC_FORMAT)?;
        let len = stream.len().map_err(|f| MocapError::from(f).into_format(TRC_FORMAT))?;
        let bytes = stream
            .read_bytes(len as usize)
            .map_err(|f| MocapError::from(f).into_format(TRC_FORMAT))?;
        let acquisition = self.read_text(&String::from_utf8_lossy(&bytes))?;
        tracing::debug!(
            path = %path.display(),
            points = acquisition.point_number(),
            frames = acquisition.point_frame_number(),
            "decoded TRC file"
        );
        Ok(acquisition)
    }

    fn write(&self, path: &Path, acquisition: &Acquisition) -> Result<()> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let text = self.write_text(acquisition, &file_name)?;
        persist(path, text.as_bytes(), TRC_FORMAT)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn parse_number<T: std::str::FromStr>(keyword: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| format_error(format!("Invalid value '{value}' for the keyword '{keyword}'.")))
}

/// Pair the tab-separated keywords and values of the second and third
/// header lines.
fn parse_keywords<'a>(keywords: &'a str, values: &'a str) -> Result<HashMap<&'a str, &'a str>> {
    let keywords: Vec<&str> = keywords.split('\t').collect();
    let values: Vec<&str> = values.split('\t').collect();
    if keywords.len() != values.len() {
        return Err(format_error("Error between TRC header keywords and values."));
    }
    Ok(keywords
        .into_iter()
        .zip(values)
        .map(|(k, v)| (k.trim(), v.trim()))
        .filter(|(k, _)| !k.is_empty())
        .collect())
}

fn read(text: &str) -> Result<Acquisition> {
    let mut lines = text.lines().map(|line| line.trim_end_matches('\r'));
    let eof = || format_error("Unexpected end of file.");

    let first = lines.next().ok_or_else(eof)?;
    if !first.starts_with("PathFileType") {
        return Err(format_error("Invalid TRC file."));
    }
    let keyword_line = lines.next().ok_or_else(eof)?;
    let value_line = lines.next().ok_or_else(eof)?;
    let keywords = parse_keywords(keyword_line, value_line)?;
    let value = |key: &str| keywords.get(key).copied().filter(|v| !v.is_empty());

    let mut acquisition = Acquisition::new();
    let point_count: usize = match value("NumMarkers") {
        Some(v) => parse_number("NumMarkers", v)?,
        None => 0,
    };
    let frame_count: usize = match value("NumFrames") {
        Some(v) => parse_number("NumFrames", v)?,
        None => 0,
    };
    if let Some(v) = value("DataRate") {
        acquisition.set_point_frequency(parse_number("DataRate", v)?);
    }
    if let Some(v) = value("OrigDataStartFrame") {
        acquisition.set_first_frame(parse_number("OrigDataStartFrame", v)?, false);
    }
    match value("Units") {
        Some(unit) => acquisition.set_point_unit(PointType::Marker, unit),
        None => {
            tracing::warn!("No 'Units' keyword. Default unit is millimeter (mm)");
            acquisition.set_point_unit(PointType::Marker, "mm");
        }
    }

    if frame_count == 0 {
        return Ok(acquisition);
    }

    let label_line = lines.next().ok_or_else(eof)?;
    let labels = marker_labels(label_line, point_count);
    // Coordinate names (X1, Y1, Z1, ...)
    lines.next().ok_or_else(eof)?;

    let rows: Vec<&str> = lines.filter(|line| !line.trim().is_empty()).collect();
    if rows.len() < frame_count {
        return Err(eof());
    }
    acquisition.init(labels.len(), frame_count, 0, 1)?;
    for (point, label) in acquisition.points_mut().iter_mut().zip(labels) {
        point.set_label(label);
    }

    for (frame, row) in rows.into_iter().take(frame_count).enumerate() {
        let fields: Vec<&str> = row.split('\t').map(str::trim).collect();
        for (index, point) in acquisition.points_mut().iter_mut().enumerate() {
            let coordinates: Vec<&str> = (0..3)
                .map(|axis| fields.get(2 + 3 * index + axis).copied().unwrap_or(""))
                .collect();
            if coordinates.iter().any(|c| c.is_empty()) {
                point.values_mut()[frame] = [0.0; 3];
                point.residuals_mut()[frame] = -1.0;
                continue;
            }
            let mut xyz = [0.0; 3];
            for (axis, coordinate) in coordinates.iter().enumerate() {
                xyz[axis] = coordinate.parse().map_err(|_| {
                    format_error(format!(
                        "Invalid coordinate '{coordinate}' at frame {}.",
                        frame + 1
                    ))
                })?;
            }
            point.values_mut()[frame] = xyz;
            point.residuals_mut()[frame] = 0.0;
        }
    }
    Ok(acquisition)
}

/// Labels of the markers, one every three columns after `Frame#` and
/// `Time`. A blank cell keeps its column with a generated label.
fn marker_labels(line: &str, declared: usize) -> Vec<String> {
    let cells: Vec<&str> = line.split('\t').skip(2).step_by(3).map(str::trim).collect();
    let used = cells.iter().rposition(|c| !c.is_empty()).map_or(0, |i| i + 1);
    let count = used.max(declared.min(cells.len()));
    if count != declared {
        tracing::warn!(
            declared,
            extracted = count,
            "Mismatch between the number of points and the number of labels extracted. Final number of points corresponds to the number of labels extracted."
        );
    }
    cells[..count]
        .iter()
        .enumerate()
        .map(|(index, cell)| {
            if cell.is_empty() {
                format!("{GENERATED_LABEL_PREFIX}{}", index + 1)
            } else {
                cell.to_string()
            }
        })
        .collect()
}

fn write(acquisition: &Acquisition, file_name: &str, config: &TrcConfig) -> Result<String> {
    let markers: Vec<_> = acquisition
        .points()
        .iter()
        .filter(|p| p.point_type() == PointType::Marker)
        .collect();
    let frequency = if acquisition.point_frequency() != 0.0 {
        acquisition.point_frequency()
    } else {
        tracing::warn!(
            frequency = config.default_frequency,
            "Points' frequency is not set. The default frequency is written."
        );
        config.default_frequency
    };
    let frames = acquisition.point_frame_number();

    let mut out = String::new();
    let fmt_error = |_| format_error("Formatting error.");
    write!(out, "PathFileType\t4\t(X/Y/Z)\t{file_name}\t\n").map_err(fmt_error)?;
    out.push_str("DataRate\tCameraRate\tNumFrames\tNumMarkers\tUnits\tOrigDataRate\tOrigDataStartFrame\tOrigNumFrames\t\n");
    write!(
        out,
        "{frequency:.2}\t{frequency:.2}\t{frames}\t{}\t{}\t{frequency:.2}\t{}\t{frames}\t\n",
        markers.len(),
        acquisition.point_unit(PointType::Marker),
        acquisition.first_frame(),
    )
    .map_err(fmt_error)?;

    out.push_str("Frame#\tTime\t");
    for marker in &markers {
        write!(out, "{}\t\t\t", marker.label()).map_err(fmt_error)?;
    }
    out.push_str("\n\t\t");
    for index in 1..=markers.len() {
        write!(out, "X{index}\tY{index}\tZ{index}\t").map_err(fmt_error)?;
    }
    out.push('\n');

    for frame in 0..frames {
        write!(out, "\n{}\t{:.3}", frame + 1, frame as f64 / frequency).map_err(fmt_error)?;
        for marker in &markers {
            if marker.is_valid(frame) {
                let [x, y, z] = marker.values()[frame];
                write!(out, "\t{x:.5}\t{y:.5}\t{z:.5}").map_err(fmt_error)?;
            } else {
                out.push_str("\t\t\t");
            }
        }
        out.push(' ');
    }
    out.push('\n');
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Point;

    const SAMPLE: &str = "PathFileType\t4\t(X/Y/Z)\twalk.trc\t\n\
DataRate\tCameraRate\tNumFrames\tNumMarkers\tUnits\tOrigDataRate\tOrigDataStartFrame\tOrigNumFrames\t\n\
60.00\t60.00\t3\t2\tm\t60.00\t5\t3\t\n\
Frame#\tTime\tLASI\t\t\tRASI\t\t\t\n\
\t\tX1\tY1\tZ1\tX2\tY2\tZ2\t\n\
\n\
5\t0.000\t1.0\t2.0\t3.0\t4.0\t5.0\t6.0 \n\
6\t0.017\t1.5\t2.5\t3.5\t\t\t \n\
7\t0.033\t\t\t\t7.0\t8.0\t9.0 \n";

    #[test]
    fn test_read_sample() {
        let acq = TrcCodec::new().read_text(SAMPLE).unwrap();
        assert_eq!(acq.point_frequency(), 60.0);
        assert_eq!(acq.first_frame(), 5);
        assert_eq!(acq.point_frame_number(), 3);
        assert_eq!(acq.point_unit(PointType::Marker), "m");
        assert_eq!(acq.points().labels(), vec!["LASI", "RASI"]);

        let lasi = acq.point(0).unwrap();
        assert_eq!(lasi.values()[1], [1.5, 2.5, 3.5]);
        assert!(!lasi.is_valid(2));
        let rasi = acq.point(1).unwrap();
        assert!(!rasi.is_valid(1));
        assert_eq!(rasi.values()[1], [0.0; 3]);
        assert_eq!(rasi.values()[2], [7.0, 8.0, 9.0]);
    }

    #[test]
    fn test_keyword_value_mismatch() {
        let text = "PathFileType\t4\n\
DataRate\tNumFrames\tNumMarkers\n\
100\t3\n";
        let err = TrcCodec::new().read_text(text).unwrap_err();
        assert_eq!(err.cause(), "Error between TRC header keywords and values.");
    }

    #[test]
    fn test_missing_units_default_to_mm() {
        let text = "PathFileType\t4\n\
DataRate\tNumFrames\tNumMarkers\n\
100\t0\t0\n";
        let acq = TrcCodec::new().read_text(text).unwrap();
        assert_eq!(acq.point_unit(PointType::Marker), "mm");
        assert_eq!(acq.point_number(), 0);
    }

    #[test]
    fn test_missing_frames() {
        let truncated: String = SAMPLE.lines().take(7).collect::<Vec<_>>().join("\n");
        let err = TrcCodec::new().read_text(&truncated).unwrap_err();
        assert_eq!(err.cause(), "Unexpected end of file.");
    }

    #[test]
    fn test_oversized_frame_count() {
        let text = SAMPLE.replacen("60.00\t60.00\t3\t", "60.00\t60.00\t4000000000\t", 1);
        let err = TrcCodec::new().read_text(&text).unwrap_err();
        assert_eq!(err.to_string(), "TRC file error: Unexpected end of file.");
    }

    #[test]
    fn test_blank_label_keeps_column() {
        let text = SAMPLE
            .replacen("\t2\tm\t", "\t3\tm\t", 1)
            .replacen("LASI\t\t\tRASI\t\t\t", "LASI\t\t\t\t\t\tRASI\t\t\t", 1)
            .replacen("4.0\t5.0\t6.0", "\t\t\t4.0\t5.0\t6.0", 1);
        let acq = TrcCodec::new().read_text(&text).unwrap();
        assert_eq!(acq.points().labels(), vec!["LASI", "uname*2", "RASI"]);
        assert!(!acq.point(1).unwrap().is_valid(0));
        assert_eq!(acq.point(2).unwrap().values()[0], [4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_frames_without_markers() {
        let mut acq = Acquisition::new();
        acq.init(0, 4, 0, 1).unwrap();
        acq.set_point_frequency(100.0);
        let codec = TrcCodec::new();
        let back = codec.read_text(&codec.write_text(&acq, "empty.trc").unwrap()).unwrap();
        assert_eq!(back.point_number(), 0);
        assert_eq!(back.point_frame_number(), 4);
    }

    #[test]
    fn test_write_then_read() {
        let mut acq = Acquisition::new();
        acq.init(0, 3, 0, 1).unwrap();
        acq.set_point_frequency(100.0);
        acq.set_first_frame(20, false);
        let mut marker = Point::new("HEEL", 3);
        marker.set_frame(0, [10.5, -2.25, 300.0], 0.8).unwrap();
        marker.set_frame(2, [11.0, -2.0, 301.125], 0.8).unwrap();
        marker.residuals_mut()[1] = -1.0;
        acq.append_point(marker).unwrap();
        acq.append_point(Point::new("KNEE_ANGLE", 3).with_type(PointType::Angle)).unwrap();

        let codec = TrcCodec::new();
        let text = codec.write_text(&acq, "gait.trc").unwrap();
        assert!(text.starts_with("PathFileType\t4\t(X/Y/Z)\tgait.trc\t\n"));
        assert!(text.contains("100.00\t100.00\t3\t1\tmm\t100.00\t20\t3\t"));
        assert!(!text.contains("KNEE_ANGLE"));

        let back = codec.read_text(&text).unwrap();
        assert_eq!(back.first_frame(), 20);
        assert_eq!(back.point_number(), 1);
        let heel = back.find_point("HEEL").unwrap();
        assert_eq!(heel.values()[0], [10.5, -2.25, 300.0]);
        assert_eq!(heel.values()[2], [11.0, -2.0, 301.125]);
        assert!(!heel.is_valid(1));
    }

    #[test]
    fn test_write_default_frequency() {
        let mut acq = Acquisition::new();
        acq.init(1, 2, 0, 1).unwrap();
        let text = TrcCodec::new()
            .with_default_frequency(50.0)
            .write_text(&acq, "x.trc")
            .unwrap();
        let back = TrcCodec::new().read_text(&text).unwrap();
        assert_eq!(back.point_frequency(), 50.0);
        assert!(text.contains("\n2\t0.020\t"));
    }
}
