// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! 3-D channels: marker trajectories and model outputs.

use serde::{Deserialize, Serialize};

use super::collection::Labelled;
use crate::{MocapError, Result};

/// Semantic type of a point channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PointType {
    #[default]
    Marker,
    Angle,
    Force,
    Moment,
    Power,
    Scalar,
    Reaction,
}

impl PointType {
    /// Every point type, in unit-table order.
    pub const ALL: [PointType; 7] = [
        PointType::Marker,
        PointType::Angle,
        PointType::Force,
        PointType::Moment,
        PointType::Power,
        PointType::Scalar,
        PointType::Reaction,
    ];

    pub(crate) const fn index(self) -> usize {
        match self {
            PointType::Marker => 0,
            PointType::Angle => 1,
            PointType::Force => 2,
            PointType::Moment => 3,
            PointType::Power => 4,
            PointType::Scalar => 5,
            PointType::Reaction => 6,
        }
    }

    /// Unit assigned to this type by a fresh acquisition.
    pub const fn default_unit(self) -> &'static str {
        match self {
            PointType::Marker => "mm",
            PointType::Angle => "deg",
            PointType::Force => "N",
            PointType::Moment => "Nmm",
            PointType::Power => "W",
            PointType::Scalar | PointType::Reaction => "",
        }
    }

    /// Name of the C3D `POINT` parameter listing the labels of this type.
    pub const fn group_parameter(self) -> Option<&'static str> {
        match self {
            PointType::Angle => Some("ANGLES"),
            PointType::Force => Some("FORCES"),
            PointType::Moment => Some("MOMENTS"),
            PointType::Power => Some("POWERS"),
            PointType::Scalar => Some("SCALARS"),
            PointType::Reaction => Some("REACTIONS"),
            PointType::Marker => None,
        }
    }
}

/// A 3-D channel with one residual per frame.
///
/// A negative residual marks an invalid (occluded) sample. The frame count
/// of a point always equals the point frame count of the acquisition that
/// owns it.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    label: String,
    description: String,
    point_type: PointType,
    values: Vec<[f64; 3]>,
    residuals: Vec<f64>,
    masks: Vec<u8>,
}

impl Point {
    /// Create a marker with `frames` zeroed, valid samples.
    pub fn new(label: impl Into<String>, frames: usize) -> Self {
        Self {
            label: label.into(),
            description: String::new(),
            point_type: PointType::Marker,
            values: vec![[0.0; 3]; frames],
            residuals: vec![0.0; frames],
            masks: vec![0; frames],
        }
    }

    pub fn with_type(mut self, point_type: PointType) -> Self {
        self.point_type = point_type;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
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

    pub fn point_type(&self) -> PointType {
        self.point_type
    }

    pub fn set_point_type(&mut self, point_type: PointType) {
        self.point_type = point_type;
    }

    pub fn frame_number(&self) -> usize {
        self.values.len()
    }

    pub fn values(&self) -> &[[f64; 3]] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut [[f64; 3]] {
        &mut self.values
    }

    pub fn residuals(&self) -> &[f64] {
        &self.residuals
    }

    pub fn residuals_mut(&mut self) -> &mut [f64] {
        &mut self.residuals
    }

    /// Camera masks (bit `i` set when camera `i` saw the marker).
    pub fn masks(&self) -> &[u8] {
        &self.masks
    }

    pub fn masks_mut(&mut self) -> &mut [u8] {
        &mut self.masks
    }

    /// Check whether the sample at `frame` is valid.
    pub fn is_valid(&self, frame: usize) -> bool {
        self.residuals.get(frame).is_some_and(|&r| r >= 0.0)
    }

    /// Set one sample.
    pub fn set_frame(&mut self, frame: usize, xyz: [f64; 3], residual: f64) -> Result<()> {
        let len = self.values.len();
        let (value, res) = self
            .values
            .get_mut(frame)
            .zip(self.residuals.get_mut(frame))
            .ok_or_else(|| MocapError::index_out_of_range("point frames", frame, len))?;
        *value = xyz;
        *res = residual;
        Ok(())
    }

    /// Keep the first `frames` samples, padding with zeroed valid samples.
    pub(crate) fn resize(&mut self, frames: usize) {
        self.values.resize(frames, [0.0; 3]);
        self.residuals.resize(frames, 0.0);
        self.masks.resize(frames, 0);
    }

    /// Keep the samples in `start..start + frames`, padding with invalid
    /// samples where the range runs past either end.
    pub(crate) fn retain_window(&mut self, start: isize, frames: usize) {
        let values = &self.values;
        let residuals = &self.residuals;
        let masks = &self.masks;
        let pick = |i: usize| -> Option<usize> {
            let idx = start + i as isize;
            (idx >= 0 && (idx as usize) < values.len()).then_some(idx as usize)
        };
        let new_values = (0..frames)
            .map(|i| pick(i).map_or([0.0; 3], |j| values[j]))
            .collect();
        let new_residuals = (0..frames)
            .map(|i| pick(i).map_or(-1.0, |j| residuals[j]))
            .collect();
        let new_masks = (0..frames)
            .map(|i| pick(i).map_or(0, |j| masks[j]))
            .collect();
        self.values = new_values;
        self.residuals = new_residuals;
        self.masks = new_masks;
    }
}

impl Labelled for Point {
    fn label(&self) -> &str {
        &self.label
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_units() {
        assert_eq!(PointType::Marker.default_unit(), "mm");
        assert_eq!(PointType::Moment.default_unit(), "Nmm");
        assert_eq!(PointType::Reaction.default_unit(), "");
        for (i, t) in PointType::ALL.iter().enumerate() {
            assert_eq!(t.index(), i);
        }
    }

    #[test]
    fn test_set_frame_bounds() {
        let mut p = Point::new("LASI", 3);
        p.set_frame(2, [1.0, 2.0, 3.0], 0.5).unwrap();
        assert_eq!(p.values()[2], [1.0, 2.0, 3.0]);
        assert!(p.is_valid(2));
        assert!(p.set_frame(3, [0.0; 3], 0.0).is_err());
    }

    #[test]
    fn test_retain_window_pads_invalid() {
        let mut p = Point::new("LASI", 3);
        for i in 0..3 {
            p.set_frame(i, [i as f64; 3], 0.0).unwrap();
        }
        p.retain_window(-1, 3);
        assert_eq!(p.values()[1], [0.0; 3]);
        assert_eq!(p.values()[2], [1.0; 3]);
        assert!(!p.is_valid(0));
        assert!(p.is_valid(1));
    }
}
