// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Extraction of a frame range and a subset of channels.

use std::any::Any;

use crate::model::Acquisition;
use crate::pipeline::node::{required_input, ProcessNode, SharedAcquisition};
use crate::Result;

/// Which part of the acquisition is extracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtractionOption {
    /// Points, analogs and events
    #[default]
    All,
    /// Points only, optionally selected by index
    PointsOnly,
    /// Analog channels only, optionally selected by index
    AnalogsOnly,
    /// Events only
    EventsOnly,
}

/// Extracts a frame range and a subset of the channels of its input.
///
/// The range `[lb, ub]` is made of 0-based point frame indices, both
/// included. Inverted bounds are swapped and out-of-range bounds are
/// clamped, each with a warning. Events outside the range are dropped and
/// the output starts at `first_frame + lb`.
#[derive(Debug, Clone, Default)]
pub struct SubAcquisitionFilter {
    frames: Option<(i64, i64)>,
    extraction: ExtractionOption,
    ids: Vec<usize>,
}

impl SubAcquisitionFilter {
    /// Create a filter keeping everything.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_frames_index(mut self, lb: i64, ub: i64) -> Self {
        self.set_frames_index(lb, ub);
        self
    }

    pub fn with_extraction(mut self, option: ExtractionOption, ids: Vec<usize>) -> Self {
        self.set_extraction_option(option, ids);
        self
    }

    /// Requested frame range, `None` for every frame.
    pub fn frames_index(&self) -> Option<(i64, i64)> {
        self.frames
    }

    pub fn set_frames_index(&mut self, lb: i64, ub: i64) {
        self.frames = Some((lb, ub));
    }

    /// Extract every frame again.
    pub fn reset_frames_index(&mut self) {
        self.frames = None;
    }

    pub fn extraction_option(&self) -> ExtractionOption {
        self.extraction
    }

    /// Channel indices selected with `PointsOnly` or `AnalogsOnly`.
    pub fn ids(&self) -> &[usize] {
        &self.ids
    }

    /// Set the extraction option. `ids` selects channels (in the given
    /// order) for `PointsOnly` and `AnalogsOnly`; an empty list keeps them
    /// all.
    pub fn set_extraction_option(&mut self, option: ExtractionOption, ids: Vec<usize>) {
        self.extraction = option;
        self.ids = ids;
    }

    /// Build the sub-acquisition of `input`.
    pub fn apply(&self, input: &Acquisition) -> Result<Acquisition> {
        let mut output = input.clone();
        self.select_channels(input, &mut output);

        let frames = input.point_frame_number();
        let Some(requested) = self.frames else {
            return Ok(output);
        };
        if frames == 0 {
            return Ok(output);
        }
        let (lb, ub) = clamp_bounds(requested, frames);

        output.crop(lb as isize, ub - lb + 1);
        let first = input.first_frame();
        let (lf, uf) = (first + lb as i32, first + ub as i32);
        output.retain_events(|event| (lf..=uf).contains(&event.frame()));
        output.set_first_frame(lf, false);
        Ok(output)
    }

    fn select_channels(&self, input: &Acquisition, output: &mut Acquisition) {
        match self.extraction {
            ExtractionOption::All => {}
            ExtractionOption::PointsOnly => {
                output.analogs_mut().clear();
                output.clear_events();
                if !self.ids.is_empty() {
                    output.points_mut().clear();
                    for &id in &self.ids {
                        match input.point(id) {
                            Ok(point) => output.points_mut().push(point.clone()),
                            Err(_) => tracing::warn!(id, "There is no point with this ID."),
                        }
                    }
                }
            }
            ExtractionOption::AnalogsOnly => {
                output.points_mut().clear();
                output.clear_events();
                if !self.ids.is_empty() {
                    output.analogs_mut().clear();
                    for &id in &self.ids {
                        match input.analog(id) {
                            Ok(analog) => output.analogs_mut().push(analog.clone()),
                            Err(_) => tracing::warn!(id, "There is no analog channel with this ID."),
                        }
                    }
                }
            }
            ExtractionOption::EventsOnly => {
                output.points_mut().clear();
                output.analogs_mut().clear();
            }
        }
    }
}

/// Swap and clamp a requested range to `0..frames`.
fn clamp_bounds((mut lb, mut ub): (i64, i64), frames: usize) -> (usize, usize) {
    let last = frames as i64 - 1;
    if lb > ub {
        tracing::warn!(lb, ub, "The boundaries are inverted and have been swapped.");
        std::mem::swap(&mut lb, &mut ub);
    }
    if ub > last {
        tracing::warn!(ub, last, "The upper boundary exceeds the last frame and is adapted.");
        ub = last;
    }
    if lb < 0 {
        tracing::warn!(lb, "The lower boundary is negative and reset to 0.");
        lb = 0;
    }
    if lb > ub {
        tracing::warn!(lb, last, "The lower boundary exceeds the last frame and is adapted.");
        lb = ub;
    }
    if ub < 0 {
        ub = 0;
        lb = 0;
    }
    (lb as usize, ub as usize)
}

impl ProcessNode for SubAcquisitionFilter {
    fn name(&self) -> &'static str {
        "SubAcquisitionFilter"
    }

    fn generate_data(&mut self, inputs: &[Option<SharedAcquisition>]) -> Result<Vec<Acquisition>> {
        let input = required_input(inputs, 0, self.name())?;
        Ok(vec![self.apply(input)?])
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Analog, Event};

    /// 3 points and 2 analogs over 10 frames, 2 analog samples per frame.
    fn sample() -> Acquisition {
        let mut acq = Acquisition::new();
        acq.init(3, 10, 2, 2).unwrap();
        acq.set_point_frequency(100.0);
        acq.set_first_frame(5, false);
        for point in acq.points_mut().iter_mut() {
            for (frame, xyz) in point.values_mut().iter_mut().enumerate() {
                *xyz = [frame as f64, 0.0, 0.0];
            }
        }
        for analog in acq.analogs_mut().iter_mut() {
            for (sample, value) in analog.values_mut().iter_mut().enumerate() {
                *value = sample as f64;
            }
        }
        acq.append_event(Event::new("Early", 0.05).with_frame(5));
        acq.append_event(Event::new("Inside", 0.1).with_frame(10));
        acq.append_event(Event::new("Late", 0.14).with_frame(14));
        acq
    }

    #[test]
    fn test_whole_acquisition_by_default() {
        let input = sample();
        let output = SubAcquisitionFilter::new().apply(&input).unwrap();
        assert_eq!(output, input);
    }

    #[test]
    fn test_frame_range() {
        let input = sample();
        let output = SubAcquisitionFilter::new()
            .with_frames_index(3, 6)
            .apply(&input)
            .unwrap();

        assert_eq!(output.point_frame_number(), 4);
        assert_eq!(output.analog_frame_number(), 8);
        assert_eq!(output.first_frame(), 8);
        assert_eq!(output.point(0).unwrap().values()[0], [3.0, 0.0, 0.0]);
        assert_eq!(output.analog(1).unwrap().values()[0], 6.0);
        assert_eq!(output.events().labels(), vec!["Inside"]);
        assert_eq!(output.point_frequency(), 100.0);
        // The input is left untouched.
        assert_eq!(input.point_frame_number(), 10);
    }

    #[test]
    fn test_bounds_are_swapped_and_clamped() {
        let input = sample();
        let swapped = SubAcquisitionFilter::new().with_frames_index(6, 3).apply(&input).unwrap();
        assert_eq!(swapped.point_frame_number(), 4);
        assert_eq!(swapped.first_frame(), 8);

        let clamped = SubAcquisitionFilter::new().with_frames_index(-2, 25).apply(&input).unwrap();
        assert_eq!(clamped.point_frame_number(), 10);
        assert_eq!(clamped.first_frame(), 5);
        assert_eq!(clamped.event_number(), 3);
    }

    #[test]
    fn test_clamp_bounds() {
        assert_eq!(clamp_bounds((2, 4), 10), (2, 4));
        assert_eq!(clamp_bounds((4, 2), 10), (2, 4));
        assert_eq!(clamp_bounds((-3, 20), 10), (0, 9));
        assert_eq!(clamp_bounds((12, 15), 10), (9, 9));
    }

    #[test]
    fn test_points_only_with_ids() {
        let mut input = sample();
        input.point_mut(2).unwrap().set_label("C");
        input.point_mut(0).unwrap().set_label("A");
        let output = SubAcquisitionFilter::new()
            .with_extraction(ExtractionOption::PointsOnly, vec![2, 7, 0])
            .apply(&input)
            .unwrap();
        assert_eq!(output.points().labels(), vec!["C", "A"]);
        assert_eq!(output.analog_number(), 0);
        assert_eq!(output.event_number(), 0);
    }

    #[test]
    fn test_analogs_only() {
        let mut input = sample();
        input
            .append_analog(Analog::new("EMG", 20).with_scale(0.5))
            .unwrap();
        let output = SubAcquisitionFilter::new()
            .with_frames_index(0, 1)
            .with_extraction(ExtractionOption::AnalogsOnly, vec![2])
            .apply(&input)
            .unwrap();
        assert_eq!(output.point_number(), 0);
        assert_eq!(output.analogs().labels(), vec!["EMG"]);
        assert_eq!(output.analog(0).unwrap().frame_number(), 4);
        assert_eq!(output.analog(0).unwrap().scale(), 0.5);
    }

    #[test]
    fn test_events_only() {
        let output = SubAcquisitionFilter::new()
            .with_frames_index(0, 5)
            .with_extraction(ExtractionOption::EventsOnly, Vec::new())
            .apply(&sample())
            .unwrap();
        assert_eq!(output.point_number(), 0);
        assert_eq!(output.analog_number(), 0);
        assert_eq!(output.events().labels(), vec!["Early", "Inside"]);
        assert_eq!(output.point_frame_number(), 6);
    }
}
