// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! ANC format support (Motion Analysis analog text).
//!
//! ```text
//! File_Type:  Analog R/C ASCII  Generation#:  2
//! Board_Type:  National Instruments  Polarity:  Bipolar
//! Trial_Name:  walk  Trial#:  1  Duration(Sec.):  0.020000  #Channels:  2
//! BitDepth:  12  PreciseRate:  100.000000
//! (four empty lines)
//! Name   FX     FY
//! Rate   100    100
//! Range  10000  5000
//! 0.000000  12  -4
//! 0.010000  13  -5
//! ```
//!
//! Generation 2 files store integer counts and the range of each channel in
//! millivolts. Generation 1 files store values in physical units and use
//! `2^bits` as range.

use std::any::Any;
use std::fmt::Write as _;
use std::path::Path;

use crate::config::AncConfig;
use crate::io::binary::ByteOrderFormat;
use crate::io::traits::{open_for_read, persist, read_prefix, AcquisitionCodec};
use crate::metadata::create_scalar_child;
use crate::model::{Acquisition, AnalogGain, AnalogResolution};
use crate::{MocapError, Result};

/// Name used in ANC error messages.
pub const ANC_FORMAT: &str = "ANC";

const MAGIC: &str = "File_Type:\tAnalog R/C ASCII\tGeneration#:\t";

fn format_error(cause: impl Into<String>) -> MocapError {
    MocapError::format(ANC_FORMAT, cause)
}

/// Reader and writer of ANC files.
#[derive(Debug, Clone, Default)]
pub struct AncCodec {
    config: AncConfig,
}

impl AncCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: AncConfig) -> Self {
        Self { config }
    }

    /// Set the board name written when the acquisition has no
    /// `ANALOG:BOARD` parameter.
    pub fn with_board(mut self, board: impl Into<String>) -> Self {
        self.config.board = board.into();
        self
    }

    pub fn config(&self) -> &AncConfig {
        &self.config
    }

    /// Decode the content of an ANC file.
    pub fn read_text(&self, text: &str) -> Result<Acquisition> {
        read(text).map_err(|e| e.into_format(ANC_FORMAT))
    }

    /// Encode the analog channels of an acquisition. `trial_name` is stored
    /// in the third header line.
    pub fn write_text(&self, acquisition: &Acquisition, trial_name: &str) -> Result<String> {
        write(acquisition, trial_name, &self.config).map_err(|e| e.into_format(ANC_FORMAT))
    }
}

impl AcquisitionCodec for AncCodec {
    fn name(&self) -> &'static str {
        ANC_FORMAT
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["anc"]
    }

    fn can_read(&self, path: &Path) -> bool {
        read_prefix(path, MAGIC.len()).is_some_and(|prefix| prefix == MAGIC.as_bytes())
    }

    fn supports_write(&self) -> bool {
        true
    }

    fn read(&self, path: &Path) -> Result<Acquisition> {
        let mut stream = open_for_read(path, ByteOrderFormat::Native, ANC_FORMAT)?;
        let len = stream.len().map_err(|f| MocapError::from(f).into_format(ANC_FORMAT))?;
        let bytes = stream
            .read_bytes(len as usize)
            .map_err(|f| MocapError::from(f).into_format(ANC_FORMAT))?;
        let acquisition = self.read_text(&String::from_utf8_lossy(&bytes))?;
        tracing::debug!(
            path = %path.display(),
            analogs = acquisition.analog_number(),
            frames = acquisition.analog_frame_number(),
            "decoded ANC file"
        );
        Ok(acquisition)
    }

    fn write(&self, path: &Path, acquisition: &Acquisition) -> Result<()> {
        let trial_name = path
            .file_stem()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let text = self.write_text(acquisition, &trial_name)?;
        persist(path, text.as_bytes(), ANC_FORMAT)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// =========================================================================
// Reading
// =========================================================================

/// Value following `keyword` on a header line, up to the next tab.
fn keyword_value<'a>(line: &'a str, keyword: &str) -> Result<&'a str> {
    let start = line
        .find(keyword)
        .map(|i| i + keyword.len())
        .ok_or_else(|| format_error(format!("Missing keyword '{}'.", keyword.trim_end())))?;
    let value = line[start..].split('\t').next().unwrap_or("").trim();
    if value.is_empty() {
        return Err(format_error(format!(
            "Missing value for keyword '{}'.",
            keyword.trim_end()
        )));
    }
    Ok(value)
}

fn parse_number<T: std::str::FromStr>(keyword: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| format_error(format!("Invalid value '{value}' for the keyword '{keyword}'.")))
}

/// Cells of a channel description line (`Name`, `Rate` or `Range`).
fn channel_cells<'a>(line: &'a str, keyword: &str) -> Result<Vec<&'a str>> {
    let rest = line.strip_prefix(keyword).ok_or_else(|| {
        format_error(format!("Waiting for keyword '{keyword}'."))
    })?;
    Ok(rest
        .split('\t')
        .map(str::trim)
        .filter(|cell| !cell.is_empty())
        .collect())
}

fn read(text: &str) -> Result<Acquisition> {
    let mut lines = text.lines().map(|line| line.trim_end_matches('\r'));
    let eof = || format_error("Unexpected end of file.");

    let first = lines.next().ok_or_else(eof)?;
    let generation = first
        .strip_prefix(MAGIC)
        .ok_or_else(|| format_error("Invalid ANC file."))?
        .trim();
    let generation: u8 = match generation {
        "1" => 1,
        "2" => 2,
        other => return Err(format_error(format!("Unknown ANC file generation: {other}."))),
    };

    let board_line = lines.next().ok_or_else(eof)?;
    let board = keyword_value(board_line, "Board_Type:\t")?.to_string();
    let polarity = keyword_value(board_line, "Polarity:\t")?;
    let trial_line = lines.next().ok_or_else(eof)?;
    let duration: f64 = parse_number("Duration(Sec.)", keyword_value(trial_line, "Duration(Sec.):\t")?)?;
    let declared: usize = parse_number("#Channels", keyword_value(trial_line, "#Channels:\t")?)?;
    let rate_line = lines.next().ok_or_else(eof)?;
    let bit_depth: u16 = parse_number("BitDepth", keyword_value(rate_line, "BitDepth:\t")?)?;
    let rate: f64 = parse_number("PreciseRate", keyword_value(rate_line, "PreciseRate:\t")?)?;
    for _ in 0..4 {
        lines.next().ok_or_else(eof)?;
    }

    if polarity != "Bipolar" {
        return Err(format_error("Only the Bipolar board type is supported."));
    }
    if declared == 0 {
        return Err(format_error("The file contains no analog channel."));
    }

    let labels = channel_cells(lines.next().ok_or_else(eof)?, "Name")?;
    if labels.len() != declared {
        tracing::warn!(
            declared,
            extracted = labels.len(),
            "Mismatch between the number of analog channels and the number of labels extracted. Final number of analog channels corresponds to the number of labels extracted."
        );
    }
    let channel_number = labels.len();
    if channel_number == 0 {
        return Err(format_error("The file contains no analog channel."));
    }
    let rates = channel_cells(lines.next().ok_or_else(eof)?, "Rate")?;
    if rates.len() != channel_number {
        return Err(format_error("Incorrect number of analog rates."));
    }
    let ranges = channel_cells(lines.next().ok_or_else(eof)?, "Range")?;
    if ranges.len() != channel_number {
        return Err(format_error("Incorrect number of analog ranges."));
    }
    for channel_rate in &rates {
        let channel_rate: f64 = parse_number("Rate", channel_rate)?;
        if (rate - channel_rate).abs() > 0.1 {
            return Err(format_error("Only analog channels with equal rates are supported."));
        }
    }
    let ranges = ranges
        .into_iter()
        .map(|range| parse_number::<u32>("Range", range))
        .collect::<Result<Vec<_>>>()?;

    let frames = (duration * rate).round().max(0.0) as usize;
    let rows: Vec<&str> = lines.filter(|line| !line.trim().is_empty()).collect();
    if rows.len() < frames {
        return Err(eof());
    }

    let mut acquisition = Acquisition::new();
    acquisition.init(0, frames, channel_number, 1)?;
    acquisition.set_point_frequency(rate);
    create_scalar_child(acquisition.metadata_mut().child_or_insert("ANALOG"), "BOARD", board)?;
    let resolution = match AnalogResolution::from_bits(bit_depth) {
        Some(resolution) => resolution,
        None => {
            tracing::warn!(bit_depth, "Unknown bit depth resolution. Default value used: 12 bits.");
            AnalogResolution::Bit12
        }
    };
    acquisition.set_analog_resolution(resolution);
    let counts = 2f64.powi(i32::from(resolution.bits()));

    for ((analog, label), range) in acquisition.analogs_mut().iter_mut().zip(labels).zip(ranges) {
        analog.set_label(label);
        if generation == 1 {
            analog.set_scale(counts / f64::from(range));
            continue;
        }
        let gain = match u16::try_from(range).ok().and_then(AnalogGain::from_range_mv) {
            Some(gain) => gain,
            None => {
                tracing::warn!(label, range, "Unknown range. Default value used: +/- 10 V");
                AnalogGain::PlusMinus10
            }
        };
        analog.set_gain(gain);
        analog.set_scale(2.0 * f64::from(range) / 1000.0 / counts);
    }

    for (frame, row) in rows.into_iter().take(frames).enumerate() {
        // The first column holds the time.
        let mut cells = row.split_whitespace().skip(1);
        for analog in acquisition.analogs_mut().iter_mut() {
            let cell = cells.next().ok_or_else(|| {
                format_error(format!("Missing analog values at frame {}.", frame + 1))
            })?;
            let value: f64 = cell.parse().map_err(|_| {
                format_error(format!("Invalid analog value '{cell}' at frame {}.", frame + 1))
            })?;
            analog.values_mut()[frame] = value * analog.scale();
        }
    }
    Ok(acquisition)
}

// =========================================================================
// Writing
// =========================================================================

fn write(acquisition: &Acquisition, trial_name: &str, config: &AncConfig) -> Result<String> {
    if acquisition.analog_number() == 0 {
        return Err(format_error("There is no analog channel to write."));
    }
    // Generation 2 needs the range of every channel.
    let generation = if acquisition.analogs().iter().all(|a| a.gain() != AnalogGain::Unknown) {
        2
    } else {
        1
    };
    let bits = acquisition.analog_resolution().bits();
    let frequency = if acquisition.analog_frequency() != 0.0 {
        acquisition.analog_frequency()
    } else {
        tracing::warn!(
            frequency = config.default_frequency,
            "Analog channels' frequency is not set. The default frequency is written."
        );
        config.default_frequency
    };
    let board = acquisition
        .metadata()
        .get("ANALOG:BOARD")
        .and_then(|b| b.info())
        .and_then(|i| i.string_at(0))
        .unwrap_or_else(|| config.board.clone());
    let frames = acquisition.analog_frame_number();
    let step = 1.0 / frequency;

    let mut out = String::new();
    let fmt_error = |_| format_error("Formatting error.");
    write!(out, "{MAGIC}{generation}\n").map_err(fmt_error)?;
    write!(out, "Board_Type:\t{board}\tPolarity:\tBipolar\n").map_err(fmt_error)?;
    write!(
        out,
        "Trial_Name:\t{trial_name}\tTrial#:\t1\tDuration(Sec.):\t{:.6}\t#Channels:\t{}\n",
        step * frames as f64,
        acquisition.analog_number()
    )
    .map_err(fmt_error)?;
    write!(out, "BitDepth:\t{bits}\tPreciseRate:\t{frequency:.6}\n\n\n\n\n").map_err(fmt_error)?;

    out.push_str("Name\t");
    for analog in acquisition.analogs() {
        write!(out, "{}\t", analog.label()).map_err(fmt_error)?;
    }
    out.push_str("\nRate\t");
    for _ in acquisition.analogs() {
        write!(out, "{}\t", frequency.round() as i64).map_err(fmt_error)?;
    }
    out.push_str("\nRange\t");
    for analog in acquisition.analogs() {
        let range = match generation {
            1 => 1u32 << bits,
            _ => u32::from(analog.gain().range_mv().unwrap_or(10000)),
        };
        write!(out, "{range}\t").map_err(fmt_error)?;
    }

    // Counts are relative to the scale implied by each range.
    let scales: Vec<f64> = acquisition
        .analogs()
        .iter()
        .map(|analog| acquisition.analog_resolution().full_scale_for(analog.gain()).unwrap_or(1.0))
        .collect();
    for frame in 0..frames {
        write!(out, "\n{:.6}\t", frame as f64 * step).map_err(fmt_error)?;
        for (analog, scale) in acquisition.analogs().iter().zip(&scales) {
            let value = analog.values()[frame];
            if generation == 1 {
                write!(out, "{value:.8}\t").map_err(fmt_error)?;
            } else {
                let count = (value / scale).round() as i64;
                write!(out, "{count}\t").map_err(fmt_error)?;
            }
        }
    }
    out.push('\n');
    Ok(out)
}
