// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Acquisition data model.
//!
//! An [`Acquisition`] owns ordered collections of [`Point`], [`Analog`] and
//! [`Event`] values, a [`MetaData`](crate::metadata::MetaData) root and the
//! global timing of the trial. Channels are plain values; the acquisition
//! checks frame-count invariants whenever one is added.

pub mod acquisition;
pub mod analog;
pub mod collection;
pub mod event;
pub mod point;

pub use acquisition::{Acquisition, GENERATED_LABEL_PREFIX};
pub use analog::{Analog, AnalogGain, AnalogResolution};
pub use collection::{Collection, Labelled};
pub use event::{
    Event, CONTEXT_GENERAL, CONTEXT_LEFT, CONTEXT_RIGHT, FOOT_OFF_ID, FOOT_STRIKE_ID,
};
pub use point::{Point, PointType};
