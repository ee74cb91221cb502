// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! The acquisition aggregate and its invariants.

use super::analog::{Analog, AnalogResolution};
use super::collection::{Collection, Labelled};
use super::event::Event;
use super::point::{Point, PointType};
use crate::metadata::{MetaData, ROOT_LABEL};
use crate::{MocapError, Result};

/// Prefix of the labels generated for unnamed channels.
pub const GENERATED_LABEL_PREFIX: &str = "uname*";

/// A recorded trial: points, analogs, events, metadata and timing.
///
/// All points share one frame count, and all analogs hold exactly
/// `point_frame_number() × analog_samples_per_frame()` samples. Channels
/// added or relabelled through the acquisition keep labels unique within
/// their collection. The analog
/// frequency is never stored; it is always the point frequency times the
/// number of analog samples per point frame.
///
/// # Example
///
/// ```rust
/// use mocapcodec::model::Acquisition;
///
/// let mut acq = Acquisition::new();
/// acq.init(2, 100, 4, 10)?;
/// acq.set_point_frequency(100.0);
///
/// assert_eq!(acq.analog_frame_number(), 1000);
/// assert_eq!(acq.analog_frequency(), 1000.0);
/// assert_eq!(acq.point(1)?.label(), "uname*2");
/// # Ok::<(), mocapcodec::MocapError>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Acquisition {
    metadata: MetaData,
    points: Collection<Point>,
    analogs: Collection<Analog>,
    events: Collection<Event>,
    first_frame: i32,
    point_frequency: f64,
    analog_samples_per_frame: usize,
    point_frame_number: usize,
    analog_resolution: AnalogResolution,
    max_interpolation_gap: u16,
    units: [String; 7],
}

impl Default for Acquisition {
    fn default() -> Self {
        Self::new()
    }
}

impl Acquisition {
    /// Create an empty acquisition with default timing and units.
    pub fn new() -> Self {
        Self {
            metadata: MetaData::new(ROOT_LABEL),
            points: Collection::new("points"),
            analogs: Collection::new("analogs"),
            events: Collection::new("events"),
            first_frame: 1,
            point_frequency: 0.0,
            analog_samples_per_frame: 1,
            point_frame_number: 0,
            analog_resolution: AnalogResolution::default(),
            max_interpolation_gap: 10,
            units: PointType::ALL.map(|t| t.default_unit().to_string()),
        }
    }

    /// Allocate `points` points and `analogs` analog channels over `frames`
    /// point frames with `ratio` analog samples per point frame.
    ///
    /// Existing channels are resized keeping their leading samples; only the
    /// newly created channels receive generated labels.
    pub fn init(&mut self, points: usize, frames: usize, analogs: usize, ratio: usize) -> Result<()> {
        if frames == 0 {
            return Err(MocapError::invariant_violation(
                "the number of frames must be strictly positive",
            ));
        }
        if ratio == 0 {
            return Err(MocapError::invariant_violation(
                "the number of analog samples per point frame must be strictly positive",
            ));
        }
        self.point_frame_number = frames;
        self.analog_samples_per_frame = ratio;
        self.resize_channels(points, analogs);
        Ok(())
    }

    /// Change the number of points and frames, keeping analog channels and
    /// the analog sampling ratio.
    pub fn resize(&mut self, points: usize, frames: usize) -> Result<()> {
        let analogs = self.analogs.len();
        let ratio = self.analog_samples_per_frame;
        self.init(points, frames, analogs, ratio)
    }

    /// Change the number of analog channels, keeping the frame count.
    pub fn resize_analog_number(&mut self, analogs: usize) {
        let points = self.points.len();
        self.resize_channels(points, analogs);
    }

    /// Change the number of frames, keeping the leading frames.
    pub fn resize_frame_number(&mut self, frames: usize) -> Result<()> {
        let points = self.points.len();
        let analogs = self.analogs.len();
        let ratio = self.analog_samples_per_frame;
        self.init(points, frames, analogs, ratio)
    }

    /// Keep the last `frames` frames and move the first frame accordingly.
    ///
    /// Growing the acquisition prepends invalid samples.
    pub fn resize_frame_number_from_end(&mut self, frames: usize) -> Result<()> {
        if frames == 0 {
            return Err(MocapError::invariant_violation(
                "the number of frames must be strictly positive",
            ));
        }
        let start = self.point_frame_number as isize - frames as isize;
        self.crop(start, frames);
        self.first_frame += start as i32;
        Ok(())
    }

    /// Change the number of analog samples per point frame.
    pub fn set_analog_samples_per_frame(&mut self, ratio: usize) -> Result<()> {
        let points = self.points.len();
        let frames = self.point_frame_number.max(1);
        let analogs = self.analogs.len();
        self.init(points, frames, analogs, ratio)
    }

    fn resize_channels(&mut self, points: usize, analogs: usize) {
        let frames = self.point_frame_number;
        let analog_frames = self.analog_frame_number();

        self.points.truncate(points);
        for point in self.points.iter_mut() {
            point.resize(frames);
        }
        for i in self.points.len()..points {
            self.points
                .push(Point::new(format!("{GENERATED_LABEL_PREFIX}{}", i + 1), frames));
        }

        self.analogs.truncate(analogs);
        for analog in self.analogs.iter_mut() {
            analog.resize(analog_frames);
        }
        for i in self.analogs.len()..analogs {
            self.analogs
                .push(Analog::new(format!("{GENERATED_LABEL_PREFIX}{}", i + 1), analog_frames));
        }
    }

    /// Keep the point frames `start..start + frames` of every channel.
    ///
    /// Does not touch events nor the first frame.
    pub(crate) fn crop(&mut self, start: isize, frames: usize) {
        let ratio = self.analog_samples_per_frame;
        for point in self.points.iter_mut() {
            point.retain_window(start, frames);
        }
        for analog in self.analogs.iter_mut() {
            analog.retain_window(start * ratio as isize, frames * ratio);
        }
        self.point_frame_number = frames;
    }

    /// Discard every channel, event and metadata and restore defaults.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Empty the point, analog and event collections, keeping timing and
    /// metadata.
    pub fn clear(&mut self) {
        self.points.clear();
        self.analogs.clear();
        self.events.clear();
    }

    // =========================================================================
    // Timing
    // =========================================================================

    pub fn first_frame(&self) -> i32 {
        self.first_frame
    }

    /// Set the first frame, optionally moving every event by the same
    /// number of frames (and the matching duration).
    pub fn set_first_frame(&mut self, frame: i32, adjust_events: bool) {
        let delta = frame - self.first_frame;
        self.first_frame = frame;
        if adjust_events && delta != 0 {
            let shift = if self.point_frequency > 0.0 {
                f64::from(delta) / self.point_frequency
            } else {
                0.0
            };
            for event in self.events.iter_mut() {
                event.set_frame(event.frame() + delta);
                event.set_time(event.time() + shift);
            }
        }
    }

    /// Last point frame index (`first_frame + frames - 1`).
    pub fn last_frame(&self) -> i32 {
        self.first_frame + self.point_frame_number as i32 - 1
    }

    pub fn point_frequency(&self) -> f64 {
        self.point_frequency
    }

    /// Set the point frequency; the analog frequency follows through the
    /// unchanged sampling ratio.
    pub fn set_point_frequency(&mut self, frequency: f64) {
        self.point_frequency = frequency;
    }

    pub fn analog_frequency(&self) -> f64 {
        self.point_frequency * self.analog_samples_per_frame as f64
    }

    /// Number of analog samples per point frame.
    pub fn analog_samples_per_frame(&self) -> usize {
        self.analog_samples_per_frame
    }

    pub fn point_frame_number(&self) -> usize {
        self.point_frame_number
    }

    pub fn analog_frame_number(&self) -> usize {
        self.point_frame_number * self.analog_samples_per_frame
    }

    /// Duration in seconds (0 when the frequency is unknown).
    pub fn duration(&self) -> f64 {
        if self.point_frequency > 0.0 {
            self.point_frame_number as f64 / self.point_frequency
        } else {
            0.0
        }
    }

    /// Frame of an event known only by its time.
    pub fn frame_for_time(&self, time: f64) -> i32 {
        (time * self.point_frequency).round() as i32 + self.first_frame
    }

    pub fn analog_resolution(&self) -> AnalogResolution {
        self.analog_resolution
    }

    pub fn set_analog_resolution(&mut self, resolution: AnalogResolution) {
        self.analog_resolution = resolution;
    }

    /// Maximum gap, in frames, that may be interpolated by processing tools.
    pub fn max_interpolation_gap(&self) -> u16 {
        self.max_interpolation_gap
    }

    pub fn set_max_interpolation_gap(&mut self, gap: u16) {
        self.max_interpolation_gap = gap;
    }

    pub fn point_unit(&self, point_type: PointType) -> &str {
        &self.units[point_type.index()]
    }

    pub fn set_point_unit(&mut self, point_type: PointType, unit: impl Into<String>) {
        self.units[point_type.index()] = unit.into();
    }

    // =========================================================================
    // Metadata
    // =========================================================================

    pub fn metadata(&self) -> &MetaData {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut MetaData {
        &mut self.metadata
    }

    pub fn set_metadata(&mut self, metadata: MetaData) {
        self.metadata = metadata;
    }

    // =========================================================================
    // Points
    // =========================================================================

    pub fn points(&self) -> &Collection<Point> {
        &self.points
    }

    pub fn points_mut(&mut self) -> &mut Collection<Point> {
        &mut self.points
    }

    pub fn point_number(&self) -> usize {
        self.points.len()
    }

    pub fn point(&self, index: usize) -> Result<&Point> {
        self.points.get(index)
    }

    pub fn point_mut(&mut self, index: usize) -> Result<&mut Point> {
        self.points.get_mut(index)
    }

    pub fn find_point(&self, label: &str) -> Option<&Point> {
        self.points.find(label)
    }

    pub fn find_point_mut(&mut self, label: &str) -> Option<&mut Point> {
        self.points.find_mut(label)
    }

    fn check_point(&self, point: &Point) -> Result<()> {
        if point.frame_number() != self.point_frame_number {
            return Err(MocapError::invariant_violation(format!(
                "point '{}' has {} frames, the acquisition has {}",
                point.label(),
                point.frame_number(),
                self.point_frame_number
            )));
        }
        unique_label(&self.points, point.label(), None)
    }

    pub fn append_point(&mut self, point: Point) -> Result<()> {
        self.check_point(&point)?;
        self.points.push(point);
        Ok(())
    }

    pub fn insert_point(&mut self, index: usize, point: Point) -> Result<()> {
        self.check_point(&point)?;
        self.points.insert(index, point)
    }

    /// Relabel the point at `index`, refusing a label held by another point.
    pub fn set_point_label(&mut self, index: usize, label: impl Into<String>) -> Result<()> {
        let label = label.into();
        self.points.get(index)?;
        unique_label(&self.points, &label, Some(index))?;
        self.points.get_mut(index)?.set_label(label);
        Ok(())
    }

    /// Remove the first point with this label; no-op when absent.
    pub fn remove_point(&mut self, label: &str) -> Option<Point> {
        self.points.remove_by_label(label)
    }

    pub fn remove_point_at(&mut self, index: usize) -> Result<Point> {
        self.points.remove(index)
    }

    /// Keep only the points for which `keep` returns true.
    pub fn retain_points<F: FnMut(&Point) -> bool>(&mut self, keep: F) {
        self.points.retain(keep);
    }

    // =========================================================================
    // Analogs
    // =========================================================================

    pub fn analogs(&self) -> &Collection<Analog> {
        &self.analogs
    }

    pub fn analogs_mut(&mut self) -> &mut Collection<Analog> {
        &mut self.analogs
    }

    pub fn analog_number(&self) -> usize {
        self.analogs.len()
    }

    pub fn analog(&self, index: usize) -> Result<&Analog> {
        self.analogs.get(index)
    }

    pub fn analog_mut(&mut self, index: usize) -> Result<&mut Analog> {
        self.analogs.get_mut(index)
    }

    pub fn find_analog(&self, label: &str) -> Option<&Analog> {
        self.analogs.find(label)
    }

    pub fn find_analog_mut(&mut self, label: &str) -> Option<&mut Analog> {
        self.analogs.find_mut(label)
    }

    fn check_analog(&self, analog: &Analog) -> Result<()> {
        if analog.frame_number() != self.analog_frame_number() {
            return Err(MocapError::invariant_violation(format!(
                "analog '{}' has {} frames, the acquisition has {}",
                analog.label(),
                analog.frame_number(),
                self.analog_frame_number()
            )));
        }
        unique_label(&self.analogs, analog.label(), None)
    }

    pub fn append_analog(&mut self, analog: Analog) -> Result<()> {
        self.check_analog(&analog)?;
        self.analogs.push(analog);
        Ok(())
    }

    pub fn insert_analog(&mut self, index: usize, analog: Analog) -> Result<()> {
        self.check_analog(&analog)?;
        self.analogs.insert(index, analog)
    }

    /// Relabel the analog channel at `index`, refusing a label held by
    /// another channel.
    pub fn set_analog_label(&mut self, index: usize, label: impl Into<String>) -> Result<()> {
        let label = label.into();
        self.analogs.get(index)?;
        unique_label(&self.analogs, &label, Some(index))?;
        self.analogs.get_mut(index)?.set_label(label);
        Ok(())
    }

    /// Remove the first analog channel with this label; no-op when absent.
    pub fn remove_analog(&mut self, label: &str) -> Option<Analog> {
        self.analogs.remove_by_label(label)
    }

    pub fn remove_analog_at(&mut self, index: usize) -> Result<Analog> {
        self.analogs.remove(index)
    }

    pub fn retain_analogs<F: FnMut(&Analog) -> bool>(&mut self, keep: F) {
        self.analogs.retain(keep);
    }

    // =========================================================================
    // Events
    // =========================================================================

    pub fn events(&self) -> &Collection<Event> {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut Collection<Event> {
        &mut self.events
    }

    pub fn event_number(&self) -> usize {
        self.events.len()
    }

    pub fn event(&self, index: usize) -> Result<&Event> {
        self.events.get(index)
    }

    pub fn find_event(&self, label: &str) -> Option<&Event> {
        self.events.find(label)
    }

    pub fn append_event(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn insert_event(&mut self, index: usize, event: Event) -> Result<()> {
        self.events.insert(index, event)
    }

    pub fn remove_event(&mut self, label: &str) -> Option<Event> {
        self.events.remove_by_label(label)
    }

    pub fn remove_event_at(&mut self, index: usize) -> Result<Event> {
        self.events.remove(index)
    }

    pub fn retain_events<F: FnMut(&Event) -> bool>(&mut self, keep: F) {
        self.events.retain(keep);
    }

    pub fn clear_events(&mut self) {
        self.events.clear();
    }
}

/// Fail when `label` is already used in `items` by an entry other than
/// `skip`.
fn unique_label<T: Labelled>(items: &Collection<T>, label: &str, skip: Option<usize>) -> Result<()> {
    let taken = items
        .iter()
        .enumerate()
        .any(|(i, item)| Some(i) != skip && item.label() == label);
    if taken {
        return Err(MocapError::invariant_violation(format!(
            "the label '{label}' is already used by another channel"
        )));
    }
    Ok(())
}
