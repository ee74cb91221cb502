// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Discrete, time-stamped occurrences (foot strikes, foot offs, ...).

use super::collection::Labelled;

/// Event context for the left side.
pub const CONTEXT_LEFT: &str = "Left";
/// Event context for the right side.
pub const CONTEXT_RIGHT: &str = "Right";
/// Event context for side-independent events.
pub const CONTEXT_GENERAL: &str = "General";

/// Event id of a foot strike.
pub const FOOT_STRIKE_ID: i32 = 1;
/// Event id of a foot off.
pub const FOOT_OFF_ID: i32 = 2;

/// A labelled occurrence at a given time.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Event {
    label: String,
    description: String,
    context: String,
    subject: String,
    time: f64,
    frame: i32,
    id: i32,
}

impl Event {
    pub fn new(label: impl Into<String>, time: f64) -> Self {
        Self {
            label: label.into(),
            time,
            ..Self::default()
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_frame(mut self, frame: i32) -> Self {
        self.frame = frame;
        self
    }

    pub fn with_id(mut self, id: i32) -> Self {
        self.id = id;
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

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn set_context(&mut self, context: impl Into<String>) {
        self.context = context.into();
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn set_subject(&mut self, subject: impl Into<String>) {
        self.subject = subject.into();
    }

    /// Time in seconds.
    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn set_time(&mut self, time: f64) {
        self.time = time;
    }

    pub fn frame(&self) -> i32 {
        self.frame
    }

    pub fn set_frame(&mut self, frame: i32) {
        self.frame = frame;
    }

    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn set_id(&mut self, id: i32) {
        self.id = id;
    }
}

impl Labelled for Event {
    fn label(&self) -> &str {
        &self.label
    }
}
