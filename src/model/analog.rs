// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Analog channels (EMG, force plates, ...) and acquisition-board settings.

use serde::{Deserialize, Serialize};

use super::collection::Labelled;
use crate::{MocapError, Result};

/// Input range of an analog channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AnalogGain {
    #[default]
    Unknown,
    /// ±10 V
    PlusMinus10,
    /// ±5 V
    PlusMinus5,
    /// ±2.5 V
    PlusMinus2Dot5,
    /// ±1.25 V
    PlusMinus1Dot25,
    /// ±1 V
    PlusMinus1,
}

impl AnalogGain {
    /// Half range in millivolts.
    pub const fn range_mv(self) -> Option<u16> {
        match self {
            AnalogGain::Unknown => None,
            AnalogGain::PlusMinus10 => Some(10000),
            AnalogGain::PlusMinus5 => Some(5000),
            AnalogGain::PlusMinus2Dot5 => Some(2500),
            AnalogGain::PlusMinus1Dot25 => Some(1250),
            AnalogGain::PlusMinus1 => Some(1000),
        }
    }

    /// Gain with exactly this half range in millivolts.
    pub const fn from_range_mv(range: u16) -> Option<Self> {
        match range {
            10000 => Some(AnalogGain::PlusMinus10),
            5000 => Some(AnalogGain::PlusMinus5),
            2500 => Some(AnalogGain::PlusMinus2Dot5),
            1250 => Some(AnalogGain::PlusMinus1Dot25),
            1000 => Some(AnalogGain::PlusMinus1),
            _ => None,
        }
    }

    /// Smallest range able to hold the signal described by a scale factor.
    pub fn detect_from_scale(scale: f64, resolution: AnalogResolution) -> Self {
        let range = scale.abs() / 2.0 * 1000.0 * 2f64.powi(resolution.bits() as i32);
        // Tolerate the rounding of scales stored as f32.
        let range = range * (1.0 - 1e-6);
        if range <= 1000.0 {
            AnalogGain::PlusMinus1
        } else if range <= 1250.0 {
            AnalogGain::PlusMinus1Dot25
        } else if range <= 2500.0 {
            AnalogGain::PlusMinus2Dot5
        } else if range <= 5000.0 {
            AnalogGain::PlusMinus5
        } else {
            AnalogGain::PlusMinus10
        }
    }
}

/// Resolution of the analog-to-digital converter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AnalogResolution {
    Bit8,
    #[default]
    Bit12,
    Bit14,
    Bit16,
}

impl AnalogResolution {
    pub const fn bits(self) -> u8 {
        match self {
            AnalogResolution::Bit8 => 8,
            AnalogResolution::Bit12 => 12,
            AnalogResolution::Bit14 => 14,
            AnalogResolution::Bit16 => 16,
        }
    }

    pub const fn from_bits(bits: u16) -> Option<Self> {
        match bits {
            8 => Some(AnalogResolution::Bit8),
            12 => Some(AnalogResolution::Bit12),
            14 => Some(AnalogResolution::Bit14),
            16 => Some(AnalogResolution::Bit16),
            _ => None,
        }
    }

    /// Volts per count for a gain: `2 × range / 1000 / 2^bits`.
    pub fn full_scale_for(self, gain: AnalogGain) -> Option<f64> {
        let range = f64::from(gain.range_mv()?);
        Some(2.0 * range / 1000.0 / 2f64.powi(self.bits() as i32))
    }
}

/// A sampled analog channel.
///
/// Values are stored in physical units; `offset` and `scale` describe the
/// raw integer encoding used by binary formats.
#[derive(Debug, Clone, PartialEq)]
pub struct Analog {
    label: String,
    description: String,
    unit: String,
    gain: AnalogGain,
    offset: i32,
    scale: f64,
    values: Vec<f64>,
}

impl Analog {
    pub fn new(label: impl Into<String>, frames: usize) -> Self {
        Self {
            label: label.into(),
            description: String::new(),
            unit: "V".to_string(),
            gain: AnalogGain::Unknown,
            offset: 0,
            scale: 1.0,
            values: vec![0.0; frames],
        }
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    pub fn with_gain(mut self, gain: AnalogGain) -> Self {
        self.gain = gain;
        self
    }

    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn set_unit(&mut self, unit: impl Into<String>) {
        self.unit = unit.into();
    }

    pub fn gain(&self) -> AnalogGain {
        self.gain
    }

    pub fn set_gain(&mut self, gain: AnalogGain) {
        self.gain = gain;
    }

    pub fn offset(&self) -> i32 {
        self.offset
    }

    pub fn set_offset(&mut self, offset: i32) {
        self.offset = offset;
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn set_scale(&mut self, scale: f64) {
        self.scale = scale;
    }

    pub fn frame_number(&self) -> usize {
        self.values.len()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut [f64] {
        &mut self.values
    }

    pub fn set_value(&mut self, frame: usize, value: f64) -> Result<()> {
        let len = self.values.len();
        let slot = self
            .values
            .get_mut(frame)
            .ok_or_else(|| MocapError::index_out_of_range("analog frames", frame, len))?;
        *slot = value;
        Ok(())
    }

    /// Arithmetic mean of the samples (0 for an empty channel).
    pub fn mean(&self) -> f64 {
        if self.values.is_empty() {
            0.0
        } else {
            self.values.iter().sum::<f64>() / self.values.len() as f64
        }
    }

    pub(crate) fn resize(&mut self, frames: usize) {
        self.values.resize(frames, 0.0);
    }

    /// Keep the samples in `start..start + frames`, zero-padding outside.
    pub(crate) fn retain_window(&mut self, start: isize, frames: usize) {
        let values = &self.values;
        self.values = (0..frames)
            .map(|i| {
                let idx = start + i as isize;
                if idx >= 0 && (idx as usize) < values.len() {
                    values[idx as usize]
                } else {
                    0.0
                }
            })
            .collect();
    }
}

impl Labelled for Analog {
    fn label(&self) -> &str {
        &self.label
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_scale() {
        let scale = AnalogResolution::Bit12
            .full_scale_for(AnalogGain::PlusMinus10)
            .unwrap();
        assert!((scale - 20.0 / 4096.0).abs() < 1e-12);
        assert!(AnalogResolution::Bit12.full_scale_for(AnalogGain::Unknown).is_none());
    }

    #[test]
    fn test_detect_gain_from_scale() {
        let res = AnalogResolution::Bit12;
        for gain in [
            AnalogGain::PlusMinus10,
            AnalogGain::PlusMinus5,
            AnalogGain::PlusMinus2Dot5,
            AnalogGain::PlusMinus1Dot25,
            AnalogGain::PlusMinus1,
        ] {
            let scale = res.full_scale_for(gain).unwrap() as f32;
            assert_eq!(AnalogGain::detect_from_scale(f64::from(scale), res), gain);
        }
        assert_eq!(AnalogGain::detect_from_scale(1.0, res), AnalogGain::PlusMinus10);
        assert_eq!(AnalogGain::detect_from_scale(1e-6, res), AnalogGain::PlusMinus1);
    }

    #[test]
    fn test_range_round_trip() {
        assert_eq!(AnalogGain::from_range_mv(2500), Some(AnalogGain::PlusMinus2Dot5));
        assert_eq!(AnalogGain::from_range_mv(3000), None);
        assert_eq!(AnalogGain::PlusMinus1.range_mv(), Some(1000));
        assert_eq!(AnalogResolution::from_bits(14), Some(AnalogResolution::Bit14));
        assert_eq!(AnalogResolution::from_bits(10), None);
    }

    #[test]
    fn test_analog_defaults() {
        let a = Analog::new("EMG1", 4);
        assert_eq!(a.gain(), AnalogGain::Unknown);
        assert_eq!(a.scale(), 1.0);
        assert_eq!(a.offset(), 0);
        assert_eq!(a.frame_number(), 4);
        assert_eq!(a.mean(), 0.0);
    }
}
