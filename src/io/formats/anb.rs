// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! ANB format support (Motion Analysis analog binary).
//!
//! An ANB file is IEEE little-endian and made of two parts, each starting
//! with a zero word (4 bytes). Both parts are sequences of keyed values: a
//! 16-bit key, a 16-bit size counted in 4-byte words, then the value.
//!
//! | Key      | Value                                       |
//! |----------|---------------------------------------------|
//! | `0x8000` | number of words of the header               |
//! | `0x0101` | identifier                                  |
//! | `0x0108` | board name (64 bytes)                       |
//! | `0x0109` | bit depth                                   |
//! | `0x010A` | sampling rate (float)                       |
//! | `0x0102` | number of channels                          |
//! | `0x0103` | channel index bit mask (32 bytes)           |
//! | `0x0104` | rate of each channel (u16)                  |
//! | `0x0105` | time of the first sample (float)            |
//! | `0x0106` | range of each channel in mV (u16)           |
//! | `0x0107` | label of one channel, repeated per channel  |
//! | `0x8100` | number of words of the data part            |
//!
//! 32-bit values are stored as their high 16-bit word followed by their low
//! word. Samples are 16-bit integers interleaved by frame.

use std::any::Any;
use std::path::Path;

use crate::config::AnbConfig;
use crate::io::binary::{BinaryStream, ByteOrderFormat, SeekOrigin};
use crate::io::traits::{open_for_read, persist, read_prefix, AcquisitionCodec};
use crate::metadata::create_scalar_child;
use crate::model::{Acquisition, AnalogGain, AnalogResolution};
use crate::{MocapError, Result};

/// Name used in ANB error messages.
pub const ANB_FORMAT: &str = "ANB";

const KEY_HEADER_SIZE: u16 = 0x8000;
const KEY_ID: u16 = 0x0101;
const KEY_CHANNEL_NUMBER: u16 = 0x0102;
const KEY_CHANNEL_INDEX: u16 = 0x0103;
const KEY_CHANNEL_RATE: u16 = 0x0104;
const KEY_FIRST_TIME: u16 = 0x0105;
const KEY_CHANNEL_RANGE: u16 = 0x0106;
const KEY_CHANNEL_LABEL: u16 = 0x0107;
const KEY_BOARD: u16 = 0x0108;
const KEY_BIT_DEPTH: u16 = 0x0109;
const KEY_RATE: u16 = 0x010A;
const KEY_DATA_SIZE: u16 = 0x8100;

const BOARD_LEN: usize = 64;
const CHANNEL_INDEX_LEN: usize = 32;

fn format_error(cause: impl Into<String>) -> MocapError {
    MocapError::format(ANB_FORMAT, cause)
}

/// Reader and writer of ANB files.
#[derive(Debug, Clone, Default)]
pub struct AnbCodec {
    config: AnbConfig,
}

impl AnbCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: AnbConfig) -> Self {
        Self { config }
    }

    /// Set the board name written when the acquisition has no
    /// `ANALOG:BOARD` parameter.
    pub fn with_board(mut self, board: impl Into<String>) -> Self {
        self.config.board = board.into();
        self
    }

    pub fn config(&self) -> &AnbConfig {
        &self.config
    }

    /// Decode ANB content held in memory.
    pub fn read_bytes(&self, bytes: Vec<u8>) -> Result<Acquisition> {
        let mut stream = BinaryStream::from_bytes(bytes, ByteOrderFormat::IeeeLittleEndian);
        read(&mut stream).map_err(|e| e.into_format(ANB_FORMAT))
    }

    /// Encode the analog channels of an acquisition into ANB bytes.
    pub fn write_bytes(&self, acquisition: &Acquisition) -> Result<Vec<u8>> {
        write(acquisition, &self.config).map_err(|e| e.into_format(ANB_FORMAT))
    }
}

impl AcquisitionCodec for AnbCodec {
    fn name(&self) -> &'static str {
        ANB_FORMAT
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["anb"]
    }

    /// The file starts with the words `0x0000 0x0000 0x8000`.
    fn can_read(&self, path: &Path) -> bool {
        matches!(read_prefix(path, 6).as_deref(), Some([0, 0, 0, 0, 0x00, 0x80]))
    }

    fn supports_write(&self) -> bool {
        true
    }

    fn read(&self, path: &Path) -> Result<Acquisition> {
        let mut stream = open_for_read(path, ByteOrderFormat::IeeeLittleEndian, ANB_FORMAT)?;
        let acquisition = read(&mut stream).map_err(|e| e.into_format(ANB_FORMAT))?;
        tracing::debug!(
            path = %path.display(),
            analogs = acquisition.analog_number(),
            frames = acquisition.analog_frame_number(),
            "decoded ANB file"
        );
        Ok(acquisition)
    }

    fn write(&self, path: &Path, acquisition: &Acquisition) -> Result<()> {
        let bytes = self.write_bytes(acquisition)?;
        persist(path, &bytes, ANB_FORMAT)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// =========================================================================
// Keyed values
// =========================================================================

fn read_key(stream: &mut BinaryStream, key: u16) -> Result<u16> {
    let read = stream.read_u16()?;
    if read != key {
        return Err(format_error(format!("Keys mismatch: {read} vs {key}")));
    }
    Ok(stream.read_u16()?)
}

fn read_single_key(stream: &mut BinaryStream, key: u16) -> Result<()> {
    if read_key(stream, key)? != 1 {
        return Err(format_error("Wrong value size."));
    }
    Ok(())
}

/// Read a 32-bit word stored high half first. Returns the value and the
/// number of words consumed.
fn read_word(stream: &mut BinaryStream, key: u16) -> Result<(u32, usize)> {
    read_single_key(stream, key)?;
    let high = u32::from(stream.read_u16()?);
    let low = u32::from(stream.read_u16()?);
    Ok((high << 16 | low, 2))
}

fn read_u32_value(stream: &mut BinaryStream, key: u16) -> Result<(u32, usize)> {
    read_word(stream, key)
}

fn read_f32_value(stream: &mut BinaryStream, key: u16) -> Result<(f32, usize)> {
    let (bits, words) = read_word(stream, key)?;
    Ok((f32::from_bits(bits), words))
}

fn read_u8_values(stream: &mut BinaryStream, key: u16) -> Result<(Vec<u8>, usize)> {
    let size = read_key(stream, key)? as usize;
    Ok((stream.read_bytes(size * 4)?, 1 + size))
}

fn read_u16_values(stream: &mut BinaryStream, key: u16) -> Result<(Vec<u16>, usize)> {
    let size = read_key(stream, key)? as usize;
    Ok((stream.read_u16_vec(size * 2)?, 1 + size))
}

/// Read a string value, without its leading and trailing NUL bytes.
fn read_string_value(stream: &mut BinaryStream, key: u16) -> Result<(String, usize)> {
    let size = read_key(stream, key)? as usize;
    let value = stream.read_string(size * 4)?;
    Ok((value.trim_matches('\0').to_string(), 1 + size))
}

/// Write a keyed 32-bit word, high half first.
fn write_word(stream: &mut BinaryStream, key: u16, bits: u32) -> Result<usize> {
    stream.write_u16(key)?;
    stream.write_u16(1)?;
    stream.write_u16((bits >> 16) as u16)?;
    stream.write_u16((bits & 0xFFFF) as u16)?;
    Ok(8)
}

fn write_u32_value(stream: &mut BinaryStream, key: u16, value: u32) -> Result<usize> {
    write_word(stream, key, value)
}

fn write_f32_value(stream: &mut BinaryStream, key: u16, value: f32) -> Result<usize> {
    write_word(stream, key, value.to_bits())
}

fn write_u8_values(stream: &mut BinaryStream, key: u16, values: &[u8]) -> Result<usize> {
    let words = values.len().div_ceil(4);
    stream.write_u16(key)?;
    stream.write_u16(words as u16)?;
    stream.write_bytes(values)?;
    stream.fill(words * 4 - values.len())?;
    Ok(4 + words * 4)
}

fn write_u16_values(stream: &mut BinaryStream, key: u16, values: &[u16]) -> Result<usize> {
    let words = values.len().div_ceil(2);
    stream.write_u16(key)?;
    stream.write_u16(words as u16)?;
    for &value in values {
        stream.write_u16(value)?;
    }
    stream.fill((words * 2 - values.len()) * 2)?;
    Ok(4 + words * 4)
}

/// Write a string value padded with NUL bytes to a whole number of words.
///
/// With `spacing`, a string filling its last word exactly is followed by
/// an extra NUL word.
fn write_string_value(stream: &mut BinaryStream, key: u16, value: &str, spacing: bool) -> Result<usize> {
    let len = value.chars().count();
    let mut words = len.div_ceil(4);
    if spacing && len % 4 == 0 {
        words += 1;
    }
    stream.write_u16(key)?;
    stream.write_u16(words as u16)?;
    stream.write_padded_string(value, words * 4, 0)?;
    Ok(4 + words * 4)
}

// =========================================================================
// Reading
// =========================================================================

fn read_zero_word(stream: &mut BinaryStream, cause: &str) -> Result<()> {
    if stream.read_i16()? != 0 || stream.read_i16()? != 0 {
        return Err(format_error(cause));
    }
    Ok(())
}

fn read(stream: &mut BinaryStream) -> Result<Acquisition> {
    read_zero_word(stream, "Invalid ANB file.")?;
    let mut counter = 1usize;

    let (header_size, words) = read_u32_value(stream, KEY_HEADER_SIZE)?;
    counter += words;
    let (_id, words) = read_u32_value(stream, KEY_ID)?;
    counter += words;
    let (board, words) = read_string_value(stream, KEY_BOARD)?;
    counter += words;
    let (bit_depth, words) = read_u32_value(stream, KEY_BIT_DEPTH)?;
    counter += words;
    let (rate, words) = read_f32_value(stream, KEY_RATE)?;
    counter += words;
    let (channel_number, words) = read_u32_value(stream, KEY_CHANNEL_NUMBER)?;
    counter += words;
    // The channel index mask is not kept.
    let (_index, words) = read_u8_values(stream, KEY_CHANNEL_INDEX)?;
    counter += words;
    let (channel_rates, words) = read_u16_values(stream, KEY_CHANNEL_RATE)?;
    counter += words;
    let (first_time, words) = read_f32_value(stream, KEY_FIRST_TIME)?;
    counter += words;
    let (channel_ranges, words) = read_u16_values(stream, KEY_CHANNEL_RANGE)?;
    counter += words;
    let channel_number = channel_number as usize;
    if channel_number == 0 {
        return Err(format_error("The file contains no analog channel."));
    }
    check_header(f64::from(rate), channel_number, &channel_rates, &channel_ranges)?;
    let mut labels = Vec::new();
    for _ in 0..channel_number {
        let (label, words) = read_string_value(stream, KEY_CHANNEL_LABEL)?;
        counter += words;
        labels.push(label);
    }
    if counter != header_size as usize {
        return Err(format_error(
            "The size of the header is not equal to the number of words read.",
        ));
    }

    read_zero_word(stream, "Invalid data part.")?;
    let (data_size, _) = read_u32_value(stream, KEY_DATA_SIZE)?;
    let frames = (data_size as usize).saturating_sub(3) * 2 / channel_number;
    if (frames as u64) * (channel_number as u64) * 2 > stream.remaining()? {
        return Err(format_error("Unexpected end of file."));
    }

    let mut acquisition = Acquisition::new();
    acquisition.init(0, frames, channel_number, 1)?;
    acquisition.set_point_frequency(f64::from(rate));
    create_scalar_child(acquisition.metadata_mut().child_or_insert("ANALOG"), "BOARD", board)?;
    let resolution = match AnalogResolution::from_bits(bit_depth.min(u32::from(u16::MAX)) as u16) {
        Some(resolution) => resolution,
        None => {
            tracing::warn!(bit_depth, "Unknown bit depth resolution. Default value used: 12 bits.");
            AnalogResolution::Bit12
        }
    };
    acquisition.set_analog_resolution(resolution);

    for (index, analog) in acquisition.analogs_mut().iter_mut().enumerate() {
        let range = channel_ranges[index];
        let gain = match AnalogGain::from_range_mv(range) {
            Some(gain) => gain,
            None => {
                tracing::warn!(
                    label = %labels[index],
                    range,
                    "Unknown range. Default value used: +/- 10 V"
                );
                AnalogGain::PlusMinus10
            }
        };
        analog.set_label(labels[index].clone());
        analog.set_gain(gain);
        analog.set_scale(2.0 * f64::from(range) / 1000.0 / 2f64.powi(i32::from(resolution.bits())));
    }
    acquisition.set_first_frame((f64::from(first_time) * f64::from(rate)).round() as i32 + 1, false);

    for frame in 0..frames {
        for analog in acquisition.analogs_mut().iter_mut() {
            let scale = analog.scale();
            analog.values_mut()[frame] = f64::from(stream.read_i16()?) * scale;
        }
    }
    Ok(acquisition)
}

fn check_header(rate: f64, channel_number: usize, rates: &[u16], ranges: &[u16]) -> Result<()> {
    if channel_number > rates.len() {
        return Err(format_error("Incorrect number of analog rates."));
    }
    if channel_number > ranges.len() {
        return Err(format_error("Incorrect number of analog ranges."));
    }
    if rates[..channel_number]
        .iter()
        .any(|&r| (rate - f64::from(r)).abs() > 0.1)
    {
        return Err(format_error(
            "Only analog channels with equal rates are supported.",
        ));
    }
    Ok(())
}

// =========================================================================
// Writing
// =========================================================================

/// Bit mask of the used channels, 8 channels per byte.
fn channel_index(channel_number: usize) -> Vec<u8> {
    let mut index = vec![0u8; CHANNEL_INDEX_LEN];
    let mut remaining = channel_number.min(CHANNEL_INDEX_LEN * 8);
    for byte in index.iter_mut() {
        if remaining == 0 {
            break;
        }
        *byte = if remaining >= 8 { 0xFF } else { (1u8 << remaining) - 1 };
        remaining = remaining.saturating_sub(8);
    }
    index
}

fn write(acquisition: &Acquisition, config: &AnbConfig) -> Result<Vec<u8>> {
    let resolution = acquisition.analog_resolution();
    let rate = if acquisition.analog_frequency() > 0.0 {
        acquisition.analog_frequency()
    } else {
        config.default_frequency
    };
    let board = acquisition
        .metadata()
        .get("ANALOG:BOARD")
        .and_then(|b| b.info())
        .and_then(|i| i.string_at(0))
        .unwrap_or_else(|| config.board.clone());
    let channel_number = acquisition.analog_number();
    if channel_number == 0 {
        return Err(format_error("There is no analog channel to write."));
    }

    let mut ranges = Vec::with_capacity(channel_number);
    for (index, analog) in acquisition.analogs().iter().enumerate() {
        let gain = match analog.gain() {
            AnalogGain::Unknown => {
                let detected = AnalogGain::detect_from_scale(analog.scale(), resolution);
                tracing::warn!(
                    channel = index + 1,
                    range_mv = detected.range_mv().unwrap_or(10000),
                    "Unknown gain. Automatically replaced by the range detected from the scale."
                );
                detected
            }
            gain => gain,
        };
        ranges.push(gain.range_mv().unwrap_or(10000));
    }

    let mut stream = BinaryStream::from_bytes(Vec::new(), ByteOrderFormat::IeeeLittleEndian);
    stream.fill(4)?;
    let mut counter = 4usize;
    // Rewritten once the header size is known.
    counter += write_u32_value(&mut stream, KEY_HEADER_SIZE, 0)?;
    counter += write_u32_value(&mut stream, KEY_ID, 0)?;
    let board: String = board.chars().take(BOARD_LEN).collect();
    stream.write_u16(KEY_BOARD)?;
    stream.write_u16((BOARD_LEN / 4) as u16)?;
    stream.write_padded_string(&board, BOARD_LEN, 0)?;
    counter += 4 + BOARD_LEN;
    counter += write_u32_value(&mut stream, KEY_BIT_DEPTH, u32::from(resolution.bits()))?;
    counter += write_f32_value(&mut stream, KEY_RATE, rate as f32)?;
    counter += write_u32_value(&mut stream, KEY_CHANNEL_NUMBER, channel_number as u32)?;
    counter += write_u8_values(&mut stream, KEY_CHANNEL_INDEX, &channel_index(channel_number))?;
    let rate_word = rate.round().clamp(0.0, f64::from(u16::MAX)) as u16;
    counter += write_u16_values(&mut stream, KEY_CHANNEL_RATE, &vec![rate_word; channel_number])?;
    let first_time = if rate > 0.0 {
        f64::from(acquisition.first_frame() - 1) / rate
    } else {
        0.0
    };
    counter += write_f32_value(&mut stream, KEY_FIRST_TIME, first_time as f32)?;
    counter += write_u16_values(&mut stream, KEY_CHANNEL_RANGE, &ranges)?;
    for analog in acquisition.analogs() {
        counter += write_string_value(&mut stream, KEY_CHANNEL_LABEL, analog.label(), true)?;
    }
    stream.seek(4, SeekOrigin::Begin)?;
    write_u32_value(&mut stream, KEY_HEADER_SIZE, (counter / 4) as u32)?;
    stream.seek(counter as i64, SeekOrigin::Begin)?;

    // Data part
    let samples = acquisition.analog_frame_number() * channel_number;
    stream.fill(4)?;
    write_u32_value(&mut stream, KEY_DATA_SIZE, (samples.div_ceil(2) + 3) as u32)?;
    let scales: Vec<f64> = ranges
        .iter()
        .map(|&range| 2.0 * f64::from(range) / 1000.0 / 2f64.powi(i32::from(resolution.bits())))
        .collect();
    for frame in 0..acquisition.analog_frame_number() {
        for (channel, analog) in acquisition.analogs().iter().enumerate() {
            let raw = (analog.values()[frame] / scales[channel])
                .round()
                .clamp(f64::from(i16::MIN), f64::from(i16::MAX));
            stream.write_i16(raw as i16)?;
        }
    }
    if samples % 2 == 1 {
        stream.fill(2)?;
    }
    Ok(stream.into_bytes())
}
