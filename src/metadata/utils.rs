// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Split and rejoin helpers for arrays stored over several sibling nodes.
//!
//! A node stores at most 255 elements. Longer arrays are written as siblings
//! labelled `STEM`, `STEM2`, `STEM3`, ... and read back by concatenating
//! these siblings in order until one is missing.

use super::{InfoValue, MetaData, MetaDataInfo};
use crate::Result;

/// Maximum number of elements (or rows) stored in one node.
pub const MAX_NODE_ELEMENTS: usize = 255;

/// A value type that can be collapsed out of [`MetaDataInfo`] arrays.
pub trait CollapseValue: Sized + Clone {
    /// Extract the values of an info in this type.
    fn extract(info: &MetaDataInfo) -> Vec<Self>;

    /// Placeholder for the missing element at 1-based `index`.
    fn blank(pattern: &Self, index: usize) -> Self;
}

impl CollapseValue for String {
    fn extract(info: &MetaDataInfo) -> Vec<Self> {
        info.to_strings()
            .into_iter()
            .map(|s| s.trim_matches(' ').to_string())
            .collect()
    }

    fn blank(pattern: &Self, index: usize) -> Self {
        format!("{pattern}{index}")
    }
}

impl CollapseValue for f64 {
    fn extract(info: &MetaDataInfo) -> Vec<Self> {
        info.to_f64s()
    }

    fn blank(pattern: &Self, _index: usize) -> Self {
        *pattern
    }
}

impl CollapseValue for f32 {
    fn extract(info: &MetaDataInfo) -> Vec<Self> {
        info.to_f32s()
    }

    fn blank(pattern: &Self, _index: usize) -> Self {
        *pattern
    }
}

impl CollapseValue for i32 {
    fn extract(info: &MetaDataInfo) -> Vec<Self> {
        info.to_i32s()
    }

    fn blank(pattern: &Self, _index: usize) -> Self {
        *pattern
    }
}

impl CollapseValue for i16 {
    fn extract(info: &MetaDataInfo) -> Vec<Self> {
        info.to_i16s()
    }

    fn blank(pattern: &Self, _index: usize) -> Self {
        *pattern
    }
}

fn suffixed(stem: &str, index: usize) -> String {
    if index == 1 {
        stem.to_string()
    } else {
        format!("{stem}{index}")
    }
}

/// Concatenate the values of `stem`, `stem2`, `stem3`, ... children.
///
/// With `target_len`, the result is truncated to that length, and when
/// `blank` is also given, missing elements are filled with
/// `CollapseValue::blank(blank, i)` where `i` is the 1-based position
/// (`"uname*"` gives `"uname*7"` for the seventh element). Without `blank`
/// the result may be shorter than `target_len`.
pub fn collapse_children_values<T: CollapseValue>(
    parent: Option<&MetaData>,
    stem: &str,
    target_len: Option<usize>,
    blank: Option<&T>,
) -> Vec<T> {
    let mut out: Vec<T> = Vec::new();
    if let Some(parent) = parent {
        let mut index = 1;
        while let Some(child) = parent.find_child(&suffixed(stem, index)) {
            if let Some(info) = child.info() {
                out.extend(T::extract(info));
            }
            if let Some(target) = target_len {
                if out.len() >= target {
                    out.truncate(target);
                    break;
                }
            }
            index += 1;
        }
    }
    if let (Some(target), Some(pattern)) = (target_len, blank) {
        let start = out.len();
        out.extend((start..target).map(|i| T::blank(pattern, i + 1)));
    }
    out
}

/// Create or replace the child `label` with a one-dimensional array,
/// splitting it over `label`, `label2`, ... every 255 elements.
///
/// Existing children are updated in place, with their description cleared
/// and their unlock flag set. Suffixed siblings left over from a previous,
/// longer array are removed. An empty array still creates one empty node.
pub fn create_child<T: InfoValue>(parent: &mut MetaData, label: &str, values: Vec<T>) -> Result<()> {
    let mut chunks: Vec<Vec<T>> = values
        .chunks(MAX_NODE_ELEMENTS)
        .map(|c| c.to_vec())
        .collect();
    if chunks.is_empty() {
        chunks.push(Vec::new());
    }
    let count = chunks.len();
    for (i, chunk) in chunks.into_iter().enumerate() {
        replace_child(parent, &suffixed(label, i + 1), MetaDataInfo::vector(chunk)?);
    }
    remove_stale_siblings(parent, label, count + 1);
    Ok(())
}

/// Two-dimensional variant of [`create_child`]: `values` holds rows of
/// `columns` elements, split every 255 rows. The first dimension of each
/// node is the number of columns.
pub fn create_child_2d<T: InfoValue>(
    parent: &mut MetaData,
    label: &str,
    values: Vec<T>,
    columns: u8,
) -> Result<()> {
    let columns = usize::from(columns.max(1));
    let mut chunks: Vec<Vec<T>> = values
        .chunks(MAX_NODE_ELEMENTS * columns)
        .map(|c| c.to_vec())
        .collect();
    if chunks.is_empty() {
        chunks.push(Vec::new());
    }
    let count = chunks.len();
    for (i, chunk) in chunks.into_iter().enumerate() {
        let rows = chunk.len().div_ceil(columns);
        let mut chunk = chunk;
        if let Some(pad) = chunk.last().cloned() {
            chunk.resize(rows * columns, pad);
        }
        let info = MetaDataInfo::new(vec![columns as u8, rows as u8], chunk)?;
        replace_child(parent, &suffixed(label, i + 1), info);
    }
    remove_stale_siblings(parent, label, count + 1);
    Ok(())
}

/// Create or replace the child `label` with a single value.
pub fn create_scalar_child<T: InfoValue>(parent: &mut MetaData, label: &str, value: T) -> Result<()> {
    replace_child(parent, label, MetaDataInfo::scalar(value)?);
    Ok(())
}

fn replace_child(parent: &mut MetaData, label: &str, info: MetaDataInfo) {
    match parent.find_child_mut(label) {
        Some(child) => {
            child.set_description("");
            child.set_info(Some(info));
            child.set_unlocked(true);
        }
        None => parent.append_child(MetaData::new(label).with_info(info)),
    }
}

fn remove_stale_siblings(parent: &mut MetaData, label: &str, first_stale: usize) {
    let mut index = first_stale;
    while parent.take_child_by_label(&suffixed(label, index)).is_some() {
        index += 1;
    }
}
