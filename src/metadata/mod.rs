// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Schema-free, hierarchical parameter store.
//!
//! A [`MetaData`] node has a label, a description, an `unlocked` flag and
//! optionally a [`MetaDataInfo`] holding typed values. Children are kept in
//! insertion order; labels need not be unique and lookups return the first
//! match. Cloning a node deep-copies its whole subtree.
//!
//! # Example
//!
//! ```rust
//! use mocapcodec::metadata::MetaData;
//!
//! let mut root = MetaData::new("ROOT");
//! let mut point = MetaData::new("POINT");
//! point.append_child(MetaData::with_value("RATE", 100.0f32)?);
//! root.append_child(point);
//!
//! let rate = root.get("POINT:RATE").and_then(|m| m.info()).and_then(|i| i.f64_at(0));
//! assert_eq!(rate, Some(100.0));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod info;
pub mod utils;

pub use info::{InfoValue, MetaDataFormat, MetaDataInfo, MetaDataValues};
pub use utils::{
    collapse_children_values, create_child, create_child_2d, create_scalar_child, CollapseValue,
};

use crate::{MocapError, Result};

/// Label of the root node of every acquisition.
pub const ROOT_LABEL: &str = "ROOT";

/// A node of the metadata tree.
#[derive(Debug, Clone, PartialEq)]
pub struct MetaData {
    label: String,
    description: String,
    unlocked: bool,
    info: Option<MetaDataInfo>,
    children: Vec<MetaData>,
}

impl MetaData {
    /// Create an unlocked node without values.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            description: String::new(),
            unlocked: true,
            info: None,
            children: Vec::new(),
        }
    }

    /// Create an unlocked node holding a scalar or a vector.
    ///
    /// Vectors are limited to 255 elements; use [`create_child`] to split
    /// longer arrays over several nodes.
    pub fn with_value<V: IntoInfo>(label: impl Into<String>, value: V) -> Result<Self> {
        Ok(Self::new(label).with_info(value.into_info()?))
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_unlock(mut self, unlocked: bool) -> Self {
        self.unlocked = unlocked;
        self
    }

    pub fn with_info(mut self, info: MetaDataInfo) -> Self {
        self.info = Some(info);
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

    /// Whether format writers may overwrite this node.
    pub fn is_unlocked(&self) -> bool {
        self.unlocked
    }

    pub fn set_unlocked(&mut self, unlocked: bool) {
        self.unlocked = unlocked;
    }

    pub fn info(&self) -> Option<&MetaDataInfo> {
        self.info.as_ref()
    }

    pub fn info_mut(&mut self) -> Option<&mut MetaDataInfo> {
        self.info.as_mut()
    }

    pub fn has_info(&self) -> bool {
        self.info.is_some()
    }

    pub fn set_info(&mut self, info: Option<MetaDataInfo>) {
        self.info = info;
    }

    // =========================================================================
    // Children
    // =========================================================================

    pub fn children(&self) -> &[MetaData] {
        &self.children
    }

    pub fn children_mut(&mut self) -> impl Iterator<Item = &mut MetaData> {
        self.children.iter_mut()
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn child(&self, index: usize) -> Option<&MetaData> {
        self.children.get(index)
    }

    pub fn child_mut(&mut self, index: usize) -> Option<&mut MetaData> {
        self.children.get_mut(index)
    }

    pub fn append_child(&mut self, child: MetaData) {
        self.children.push(child);
    }

    /// Insert a child before `index`. `index == child_count()` appends.
    pub fn insert_child(&mut self, index: usize, child: MetaData) -> Result<()> {
        if index > self.children.len() {
            return Err(MocapError::index_out_of_range(
                "metadata children",
                index,
                self.children.len(),
            ));
        }
        self.children.insert(index, child);
        Ok(())
    }

    /// Replace the child at `index` and return the previous one.
    pub fn set_child(&mut self, index: usize, child: MetaData) -> Result<MetaData> {
        let len = self.children.len();
        let slot = self
            .children
            .get_mut(index)
            .ok_or_else(|| MocapError::index_out_of_range("metadata children", index, len))?;
        Ok(std::mem::replace(slot, child))
    }

    /// Detach the child at `index` and return it.
    pub fn take_child(&mut self, index: usize) -> Result<MetaData> {
        if index >= self.children.len() {
            return Err(MocapError::index_out_of_range(
                "metadata children",
                index,
                self.children.len(),
            ));
        }
        Ok(self.children.remove(index))
    }

    /// Detach the first child with this label.
    pub fn take_child_by_label(&mut self, label: &str) -> Option<MetaData> {
        let index = self.child_index(label)?;
        Some(self.children.remove(index))
    }

    pub fn clear_children(&mut self) {
        self.children.clear();
    }

    /// Position of the first child with this label.
    pub fn child_index(&self, label: &str) -> Option<usize> {
        self.children.iter().position(|c| c.label == label)
    }

    /// First child with this label (non-recursive).
    pub fn find_child(&self, label: &str) -> Option<&MetaData> {
        self.children.iter().find(|c| c.label == label)
    }

    pub fn find_child_mut(&mut self, label: &str) -> Option<&mut MetaData> {
        self.children.iter_mut().find(|c| c.label == label)
    }

    /// Follow a `:`-separated path of labels, e.g. `"POINT:LABELS"`.
    pub fn get(&self, path: &str) -> Option<&MetaData> {
        path.split(':')
            .try_fold(self, |node, label| node.find_child(label))
    }

    pub fn get_mut(&mut self, path: &str) -> Option<&mut MetaData> {
        path.split(':')
            .try_fold(self, |node, label| node.find_child_mut(label))
    }

    /// First child with this label, created empty when missing.
    pub fn child_or_insert(&mut self, label: &str) -> &mut MetaData {
        let index = match self.child_index(label) {
            Some(index) => index,
            None => {
                self.children.push(MetaData::new(label));
                self.children.len() - 1
            }
        };
        &mut self.children[index]
    }
}

/// Conversion of scalars and vectors into a [`MetaDataInfo`].
pub trait IntoInfo {
    fn into_info(self) -> Result<MetaDataInfo>;
}

impl IntoInfo for MetaDataInfo {
    fn into_info(self) -> Result<MetaDataInfo> {
        Ok(self)
    }
}

impl IntoInfo for &str {
    fn into_info(self) -> Result<MetaDataInfo> {
        MetaDataInfo::scalar(self.to_string())
    }
}

macro_rules! impl_into_info {
    ($($ty:ty),*) => {
        $(
            impl IntoInfo for $ty {
                fn into_info(self) -> Result<MetaDataInfo> {
                    MetaDataInfo::scalar(self)
                }
            }

            impl IntoInfo for Vec<$ty> {
                fn into_info(self) -> Result<MetaDataInfo> {
                    MetaDataInfo::vector(self)
                }
            }
        )*
    };
}

impl_into_info!(String, i8, i16, f32);
