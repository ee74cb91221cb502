// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Ordered, label-addressable collections of channels and events.

use crate::{MocapError, Result};

/// An item addressable by label.
pub trait Labelled {
    fn label(&self) -> &str;
}

/// Ordered collection with index and first-match label lookup.
///
/// Insertion and removal are crate-private: the owning acquisition checks
/// frame-count invariants before any channel enters a collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Collection<T> {
    items: Vec<T>,
    name: &'static str,
}

impl<T: Labelled> Collection<T> {
    pub(crate) fn new(name: &'static str) -> Self {
        Self {
            items: Vec::new(),
            name,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.items.iter_mut()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// Item at `index`.
    pub fn get(&self, index: usize) -> Result<&T> {
        self.items
            .get(index)
            .ok_or_else(|| MocapError::index_out_of_range(self.name, index, self.items.len()))
    }

    pub fn get_mut(&mut self, index: usize) -> Result<&mut T> {
        let len = self.items.len();
        let name = self.name;
        self.items
            .get_mut(index)
            .ok_or_else(|| MocapError::index_out_of_range(name, index, len))
    }

    /// Index of the first item with this label.
    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.items.iter().position(|item| item.label() == label)
    }

    pub fn find(&self, label: &str) -> Option<&T> {
        self.items.iter().find(|item| item.label() == label)
    }

    pub fn find_mut(&mut self, label: &str) -> Option<&mut T> {
        self.items.iter_mut().find(|item| item.label() == label)
    }

    /// Labels in order.
    pub fn labels(&self) -> Vec<&str> {
        self.items.iter().map(Labelled::label).collect()
    }

    pub(crate) fn push(&mut self, item: T) {
        self.items.push(item);
    }

    pub(crate) fn insert(&mut self, index: usize, item: T) -> Result<()> {
        if index > self.items.len() {
            return Err(MocapError::index_out_of_range(self.name, index, self.items.len()));
        }
        self.items.insert(index, item);
        Ok(())
    }

    pub(crate) fn remove(&mut self, index: usize) -> Result<T> {
        if index >= self.items.len() {
            return Err(MocapError::index_out_of_range(self.name, index, self.items.len()));
        }
        Ok(self.items.remove(index))
    }

    pub(crate) fn remove_by_label(&mut self, label: &str) -> Option<T> {
        let index = self.index_of(label)?;
        Some(self.items.remove(index))
    }

    pub(crate) fn truncate(&mut self, len: usize) {
        self.items.truncate(len);
    }

    pub(crate) fn retain<F: FnMut(&T) -> bool>(&mut self, f: F) {
        self.items.retain(f);
    }

    pub(crate) fn clear(&mut self) {
        self.items.clear();
    }
}

impl<'a, T: Labelled> IntoIterator for &'a Collection<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Event;

    #[test]
    fn test_lookup_and_removal_order() {
        let mut events = Collection::new("events");
        for label in ["A", "B", "A", "C"] {
            events.push(Event::new(label, 0.0));
        }
        assert_eq!(events.index_of("A"), Some(0));
        assert!(events.find("D").is_none());
        assert!(events.remove_by_label("D").is_none());

        events.remove_by_label("A").unwrap();
        assert_eq!(events.labels(), vec!["B", "A", "C"]);

        let err = events.get(3).unwrap_err();
        assert_eq!(err.to_string(), "Index 3 out of range for events (length: 3)");
    }

    #[test]
    fn test_insert_bounds() {
        let mut events = Collection::new("events");
        events.insert(0, Event::new("B", 0.0)).unwrap();
        events.insert(0, Event::new("A", 0.0)).unwrap();
        assert!(events.insert(5, Event::new("X", 0.0)).is_err());
        assert_eq!(events.labels(), vec!["A", "B"]);
    }
}
