// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Common utilities for integration tests.

#![allow(dead_code)]

use mocapcodec::model::{Acquisition, Analog, AnalogGain, Event, PointType, CONTEXT_LEFT};

// ============================================================================
// Fixtures
// ============================================================================

/// Markers, analog channels and events over `frames` frames at 100 Hz with
/// 4 analog samples per frame, starting at frame 11. The event happens
/// 0.12 s after the first frame.
pub fn gait_acquisition(frames: usize) -> Acquisition {
    let mut acq = Acquisition::new();
    acq.init(3, frames, 0, 4).unwrap();
    acq.set_point_frequency(100.0);
    acq.set_first_frame(11, false);

    for (index, label) in ["LASI", "RASI", "LHEE"].into_iter().enumerate() {
        let point = acq.point_mut(index).unwrap();
        point.set_label(label);
        point.set_description(format!("{label} marker"));
        for (frame, xyz) in point.values_mut().iter_mut().enumerate() {
            let t = frame as f64;
            *xyz = [index as f64 * 100.0 + t, 2.5 * t, -t / 4.0];
        }
    }
    // One occluded sample.
    acq.point_mut(2).unwrap().residuals_mut()[1] = -1.0;

    let analog_frames = acq.analog_frame_number();
    for (index, label) in ["Fx", "Fy"].into_iter().enumerate() {
        let mut analog = Analog::new(label, analog_frames)
            .with_unit("N")
            .with_gain(AnalogGain::PlusMinus10)
            .with_scale(1.0);
        for (sample, value) in analog.values_mut().iter_mut().enumerate() {
            *value = ((sample + index) % 7) as f64;
        }
        acq.append_analog(analog).unwrap();
    }

    acq.append_event(
        Event::new("Foot Strike", 0.12)
            .with_context(CONTEXT_LEFT)
            .with_frame(23),
    );
    acq
}

/// Labels of the marker-type points.
pub fn marker_labels(acq: &Acquisition) -> Vec<String> {
    acq.points()
        .iter()
        .filter(|p| p.point_type() == PointType::Marker)
        .map(|p| p.label().to_string())
        .collect()
}

// ============================================================================
// Assertions
// ============================================================================

/// Assert that two acquisitions hold the same point coordinates.
pub fn assert_points_close(expected: &Acquisition, actual: &Acquisition, tolerance: f64) {
    assert_eq!(expected.point_number(), actual.point_number(), "point count");
    assert_eq!(expected.point_frame_number(), actual.point_frame_number(), "frame count");
    for (e, a) in expected.points().iter().zip(actual.points().iter()) {
        assert_eq!(e.label(), a.label());
        for frame in 0..e.frame_number() {
            assert_eq!(e.is_valid(frame), a.is_valid(frame), "{} validity at {frame}", e.label());
            if !e.is_valid(frame) {
                continue;
            }
            for axis in 0..3 {
                let (x, y) = (e.values()[frame][axis], a.values()[frame][axis]);
                assert!(
                    (x - y).abs() <= tolerance,
                    "{} frame {frame} axis {axis}: {x} vs {y}",
                    e.label()
                );
            }
        }
    }
}

/// Assert that two acquisitions hold the same analog samples.
pub fn assert_analogs_close(expected: &Acquisition, actual: &Acquisition, tolerance: f64) {
    assert_eq!(expected.analog_number(), actual.analog_number(), "analog count");
    for (e, a) in expected.analogs().iter().zip(actual.analogs().iter()) {
        assert_eq!(e.label(), a.label());
        assert_eq!(e.frame_number(), a.frame_number());
        for (x, y) in e.values().iter().zip(a.values()) {
            assert!((x - y).abs() <= tolerance, "{}: {x} vs {y}", e.label());
        }
    }
}
