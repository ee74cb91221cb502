// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Typed, dimensioned value arrays stored in metadata nodes.

use std::fmt;

use crate::{MocapError, Result};

/// Storage format of a [`MetaDataInfo`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetaDataFormat {
    /// Fixed-length strings
    Char,
    /// Signed bytes
    Byte,
    /// Signed 16-bit integers
    Integer,
    /// 32-bit floats
    Real,
}

impl MetaDataFormat {
    /// Size in bytes of one element.
    pub const fn byte_size(self) -> usize {
        match self {
            MetaDataFormat::Char | MetaDataFormat::Byte => 1,
            MetaDataFormat::Integer => 2,
            MetaDataFormat::Real => 4,
        }
    }

    /// Parameter type code used by C3D files (-1, 1, 2, 4).
    pub const fn type_code(self) -> i8 {
        match self {
            MetaDataFormat::Char => -1,
            MetaDataFormat::Byte => 1,
            MetaDataFormat::Integer => 2,
            MetaDataFormat::Real => 4,
        }
    }

    /// Inverse of [`type_code`](Self::type_code).
    pub const fn from_type_code(code: i8) -> Option<Self> {
        match code {
            -1 => Some(MetaDataFormat::Char),
            1 => Some(MetaDataFormat::Byte),
            2 => Some(MetaDataFormat::Integer),
            4 => Some(MetaDataFormat::Real),
            _ => None,
        }
    }
}

/// Values of a [`MetaDataInfo`], one variant per format.
#[derive(Debug, Clone, PartialEq)]
pub enum MetaDataValues {
    Char(Vec<String>),
    Byte(Vec<i8>),
    Integer(Vec<i16>),
    Real(Vec<f32>),
}

impl MetaDataValues {
    pub fn format(&self) -> MetaDataFormat {
        match self {
            MetaDataValues::Char(_) => MetaDataFormat::Char,
            MetaDataValues::Byte(_) => MetaDataFormat::Byte,
            MetaDataValues::Integer(_) => MetaDataFormat::Integer,
            MetaDataValues::Real(_) => MetaDataFormat::Real,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            MetaDataValues::Char(v) => v.len(),
            MetaDataValues::Byte(v) => v.len(),
            MetaDataValues::Integer(v) => v.len(),
            MetaDataValues::Real(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A value type that can be stored in a [`MetaDataInfo`].
pub trait InfoValue: Clone + Sized {
    /// Wrap a vector of values.
    fn wrap(values: Vec<Self>) -> MetaDataValues;
}

impl InfoValue for String {
    fn wrap(values: Vec<Self>) -> MetaDataValues {
        MetaDataValues::Char(values)
    }
}

impl InfoValue for i8 {
    fn wrap(values: Vec<Self>) -> MetaDataValues {
        MetaDataValues::Byte(values)
    }
}

impl InfoValue for i16 {
    fn wrap(values: Vec<Self>) -> MetaDataValues {
        MetaDataValues::Integer(values)
    }
}

impl InfoValue for f32 {
    fn wrap(values: Vec<Self>) -> MetaDataValues {
        MetaDataValues::Real(values)
    }
}

/// A typed, dimensioned array of values.
///
/// For numeric formats the dimensions describe the array shape and the number
/// of values equals their product (an empty dimension list is a scalar).
/// For `Char`, the first dimension is the length of every string and the
/// remaining dimensions give the number of strings; strings are kept
/// right-padded with spaces to that length.
#[derive(Debug, Clone, PartialEq)]
pub struct MetaDataInfo {
    dims: Vec<u8>,
    values: MetaDataValues,
}

impl MetaDataInfo {
    /// Create an info from an array shape and its values.
    ///
    /// `shape` excludes the string length for `Char`, which is computed from
    /// the longest string.
    pub fn new<T: InfoValue>(shape: Vec<u8>, values: Vec<T>) -> Result<Self> {
        let expected: usize = shape.iter().map(|&d| d as usize).product();
        if expected != values.len() {
            return Err(MocapError::invariant_violation(format!(
                "metadata value count {} does not match dimensions {:?}",
                values.len(),
                shape
            )));
        }
        let mut info = Self {
            dims: shape,
            values: T::wrap(values),
        };
        info.normalize_strings()?;
        Ok(info)
    }

    /// Create a scalar (a single string keeps its length as only dimension).
    pub fn scalar<T: InfoValue>(value: T) -> Result<Self> {
        Self::new(Vec::new(), vec![value])
    }

    /// Create a one-dimensional array. At most 255 elements fit in one info.
    pub fn vector<T: InfoValue>(values: Vec<T>) -> Result<Self> {
        let len = u8::try_from(values.len()).map_err(|_| {
            MocapError::invariant_violation(format!(
                "metadata vector of {} elements exceeds 255",
                values.len()
            ))
        })?;
        Self::new(vec![len], values)
    }

    /// Pad every string to the common length and prepend it to the dims.
    fn normalize_strings(&mut self) -> Result<()> {
        if let MetaDataValues::Char(strings) = &mut self.values {
            let longest = strings.iter().map(|s| s.chars().count()).max().unwrap_or(0);
            let len = u8::try_from(longest).map_err(|_| {
                MocapError::invariant_violation(format!(
                    "metadata string of {longest} characters exceeds 255"
                ))
            })?;
            for s in strings.iter_mut() {
                pad_string(s, longest);
            }
            self.dims.insert(0, len);
        }
        Ok(())
    }

    pub fn format(&self) -> MetaDataFormat {
        self.values.format()
    }

    pub fn dimensions(&self) -> &[u8] {
        &self.dims
    }

    /// Product of all dimensions (including the string length for `Char`).
    pub fn dimensions_product(&self) -> usize {
        self.dims.iter().map(|&d| d as usize).product()
    }

    pub fn values(&self) -> &MetaDataValues {
        &self.values
    }

    /// Number of stored elements (strings for `Char`).
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Replace the values by a one-dimensional array.
    pub fn set_values<T: InfoValue>(&mut self, values: Vec<T>) -> Result<()> {
        *self = Self::vector(values)?;
        Ok(())
    }

    /// Replace the values and the shape.
    pub fn set_shaped_values<T: InfoValue>(&mut self, shape: Vec<u8>, values: Vec<T>) -> Result<()> {
        *self = Self::new(shape, values)?;
        Ok(())
    }

    /// Change the dimensions, keeping existing values and padding with
    /// zeros or blank strings.
    pub fn set_dimensions(&mut self, dims: Vec<u8>) {
        match &mut self.values {
            MetaDataValues::Char(strings) => {
                let len = dims.first().copied().unwrap_or(0) as usize;
                let count: usize = dims.iter().skip(1).map(|&d| d as usize).product();
                strings.resize(count, String::new());
                for s in strings.iter_mut() {
                    pad_string(s, len);
                }
            }
            MetaDataValues::Byte(v) => v.resize(product(&dims), 0),
            MetaDataValues::Integer(v) => v.resize(product(&dims), 0),
            MetaDataValues::Real(v) => v.resize(product(&dims), 0.0),
        }
        self.dims = dims;
    }

    // =========================================================================
    // Conversions
    // =========================================================================

    /// Values as strings. Numbers are formatted, strings are returned padded.
    pub fn to_strings(&self) -> Vec<String> {
        match &self.values {
            MetaDataValues::Char(v) => v.clone(),
            MetaDataValues::Byte(v) => v.iter().map(|x| x.to_string()).collect(),
            MetaDataValues::Integer(v) => v.iter().map(|x| x.to_string()).collect(),
            MetaDataValues::Real(v) => v.iter().map(|x| x.to_string()).collect(),
        }
    }

    /// Values as doubles. Unparsable strings give 0.
    pub fn to_f64s(&self) -> Vec<f64> {
        match &self.values {
            MetaDataValues::Char(v) => v.iter().map(|s| s.trim().parse().unwrap_or(0.0)).collect(),
            MetaDataValues::Byte(v) => v.iter().map(|&x| f64::from(x)).collect(),
            MetaDataValues::Integer(v) => v.iter().map(|&x| f64::from(x)).collect(),
            MetaDataValues::Real(v) => v.iter().map(|&x| f64::from(x)).collect(),
        }
    }

    pub fn to_f32s(&self) -> Vec<f32> {
        self.to_f64s().into_iter().map(|x| x as f32).collect()
    }

    /// Values as integers, truncating reals toward zero.
    pub fn to_i32s(&self) -> Vec<i32> {
        match &self.values {
            MetaDataValues::Char(v) => v
                .iter()
                .map(|s| {
                    let s = s.trim();
                    s.parse::<i32>()
                        .unwrap_or_else(|_| s.parse::<f64>().map(|f| f as i32).unwrap_or(0))
                })
                .collect(),
            MetaDataValues::Byte(v) => v.iter().map(|&x| i32::from(x)).collect(),
            MetaDataValues::Integer(v) => v.iter().map(|&x| i32::from(x)).collect(),
            MetaDataValues::Real(v) => v.iter().map(|&x| x as i32).collect(),
        }
    }

    pub fn to_i16s(&self) -> Vec<i16> {
        self.to_i32s().into_iter().map(|x| x as i16).collect()
    }

    /// String value at `index`, trimmed of surrounding spaces.
    pub fn string_at(&self, index: usize) -> Option<String> {
        match &self.values {
            MetaDataValues::Char(v) => v.get(index).map(|s| s.trim().to_string()),
            _ => self.to_strings().into_iter().nth(index),
        }
    }

    pub fn f64_at(&self, index: usize) -> Option<f64> {
        self.to_f64s().get(index).copied()
    }

    pub fn i32_at(&self, index: usize) -> Option<i32> {
        self.to_i32s().get(index).copied()
    }
}

impl fmt::Display for MetaDataInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}{:?} {:?}", self.format(), self.dims, self.to_strings())
    }
}

fn product(dims: &[u8]) -> usize {
    dims.iter().map(|&d| d as usize).product()
}

fn pad_string(s: &mut String, len: usize) {
    let count = s.chars().count();
    if count > len {
        *s = s.chars().take(len).collect();
    } else {
        s.extend(std::iter::repeat(' ').take(len - count));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_integer() {
        let info = MetaDataInfo::scalar(12i16).unwrap();
        assert_eq!(info.format(), MetaDataFormat::Integer);
        assert!(info.dimensions().is_empty());
        assert_eq!(info.to_i32s(), vec![12]);
        assert_eq!(info.dimensions_product(), 1);
    }

    #[test]
    fn test_strings_are_padded() {
        let info =
            MetaDataInfo::vector(vec!["LASI".to_string(), "RKNE2".to_string()]).unwrap();
        assert_eq!(info.dimensions(), &[5, 2]);
        assert_eq!(info.to_strings(), vec!["LASI ", "RKNE2"]);
        assert_eq!(info.string_at(0).unwrap(), "LASI");
    }

    #[test]
    fn test_scalar_string_dimension_is_length() {
        let info = MetaDataInfo::scalar("mm".to_string()).unwrap();
        assert_eq!(info.dimensions(), &[2]);
        assert_eq!(info.len(), 1);
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let err = MetaDataInfo::new(vec![2, 2], vec![1.0f32, 2.0, 3.0]).unwrap_err();
        assert!(matches!(err, MocapError::InvariantViolation { .. }));
    }

    #[test]
    fn test_vector_too_long() {
        assert!(MetaDataInfo::vector(vec![0i16; 256]).is_err());
        assert!(MetaDataInfo::vector(vec![0i16; 255]).is_ok());
    }

    #[test]
    fn test_char_to_numbers() {
        let info = MetaDataInfo::vector(vec!["12".to_string(), " 3.5".to_string()]).unwrap();
        assert_eq!(info.to_f64s(), vec![12.0, 3.5]);
        assert_eq!(info.to_i32s(), vec![12, 3]);
    }

    #[test]
    fn test_set_dimensions_pads() {
        let mut info = MetaDataInfo::vector(vec![1i16, 2]).unwrap();
        info.set_dimensions(vec![4]);
        assert_eq!(info.to_i16s(), vec![1, 2, 0, 0]);

        let mut strings = MetaDataInfo::vector(vec!["AB".to_string()]).unwrap();
        strings.set_dimensions(vec![4, 2]);
        assert_eq!(strings.to_strings(), vec!["AB  ", "    "]);
    }

    #[test]
    fn test_type_codes() {
        for format in [
            MetaDataFormat::Char,
            MetaDataFormat::Byte,
            MetaDataFormat::Integer,
            MetaDataFormat::Real,
        ] {
            assert_eq!(MetaDataFormat::from_type_code(format.type_code()), Some(format));
        }
        assert_eq!(MetaDataFormat::from_type_code(3), None);
    }
}
