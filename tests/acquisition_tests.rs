// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Acquisition model and metadata integration tests.
//!
//! Tests cover:
//! - Frame count and frequency invariants after `init`
//! - Unique channel labels
//! - First frame changes and event re-basing
//! - Resizing from the end
//! - Splitting and rejoining long metadata arrays

mod common;

use mocapcodec::metadata::{collapse_children_values, create_child, MetaData};
use mocapcodec::model::{Acquisition, Analog, Event, Point};
use mocapcodec::MocapError;

// ============================================================================
// Acquisition invariants
// ============================================================================

#[test]
fn test_init_invariants() {
    for (points, frames, analogs, ratio) in [(0, 1, 0, 1), (5, 120, 8, 10), (2, 7, 3, 3)] {
        let mut acq = Acquisition::new();
        acq.init(points, frames, analogs, ratio).unwrap();
        acq.set_point_frequency(50.0);

        assert_eq!(acq.point_number(), points);
        assert_eq!(acq.analog_number(), analogs);
        assert_eq!(acq.point_frame_number(), frames);
        assert_eq!(acq.analog_frame_number(), frames * ratio);
        assert_eq!(acq.analog_frequency(), 50.0 * ratio as f64);
        assert!(acq.points().iter().all(|p| p.frame_number() == frames));
        assert!(acq.analogs().iter().all(|a| a.frame_number() == frames * ratio));
    }
}

#[test]
fn test_generated_labels() {
    let mut acq = Acquisition::new();
    acq.init(3, 2, 2, 1).unwrap();
    assert_eq!(acq.points().labels(), vec!["uname*1", "uname*2", "uname*3"]);
    assert_eq!(acq.analogs().labels(), vec!["uname*1", "uname*2"]);
}

#[test]
fn test_mismatched_channel_is_rejected() {
    let mut acq = common::gait_acquisition(10);
    let before = acq.clone();
    assert!(acq.append_point(Point::new("Extra", 9)).is_err());
    assert_eq!(acq, before);
    assert!(acq.init(1, 0, 0, 1).is_err());
}

#[test]
fn test_duplicate_labels_are_rejected() {
    let mut acq = common::gait_acquisition(10);
    let before = acq.clone();

    let err = acq.append_point(Point::new("RASI", 10)).unwrap_err();
    assert!(matches!(err, MocapError::InvariantViolation { .. }));
    assert!(acq.insert_point(0, Point::new("LHEE", 10)).is_err());
    assert!(acq.append_analog(Analog::new("Fy", 40)).is_err());
    assert!(acq.set_point_label(0, "LHEE").is_err());
    assert!(acq.set_analog_label(1, "Fx").is_err());
    assert_eq!(acq, before);

    // Points and analog channels are labelled independently.
    acq.append_analog(Analog::new("LASI", 40)).unwrap();
    acq.set_point_label(2, "RHEE").unwrap();
    assert_eq!(common::marker_labels(&acq), vec!["LASI", "RASI", "RHEE"]);
}

#[test]
fn test_set_first_frame_is_idempotent() {
    let mut acq = common::gait_acquisition(10);
    acq.append_event(Event::new("Foot Off", 0.2).with_frame(31));

    acq.set_first_frame(51, true);
    let once = acq.clone();
    acq.set_first_frame(51, true);
    assert_eq!(acq, once);

    let frames: Vec<i32> = acq.events().iter().map(|e| e.frame()).collect();
    assert_eq!(frames, vec![63, 71]);
    let off = acq.find_event("Foot Off").unwrap();
    assert!((off.time() - 0.6).abs() < 1e-12);
    assert_eq!(acq.last_frame(), 60);
}

#[test]
fn test_resize_from_end() {
    let mut acq = common::gait_acquisition(10);
    acq.resize_frame_number_from_end(4).unwrap();
    assert_eq!(acq.point_frame_number(), 4);
    assert_eq!(acq.analog_frame_number(), 16);
    assert_eq!(acq.first_frame(), 17);
    assert_eq!(acq.point(0).unwrap().values()[0][0], 6.0);
    assert_eq!(acq.last_frame(), 20);
}

#[test]
fn test_reset_restores_defaults() {
    let mut acq = common::gait_acquisition(10);
    acq.reset();
    assert_eq!(acq, Acquisition::new());
}

// ============================================================================
// Metadata split and rejoin
// ============================================================================

fn split_node_count(parent: &MetaData, stem: &str) -> usize {
    let mut count = 0;
    while parent
        .find_child(&if count == 0 {
            stem.to_string()
        } else {
            format!("{stem}{}", count + 1)
        })
        .is_some()
    {
        count += 1;
    }
    count
}

#[test]
fn test_split_and_rejoin_around_node_capacity() {
    for k in [1usize, 254, 255, 256, 509, 510, 511, 800] {
        let labels: Vec<String> = (0..k).map(|i| format!("M{i}")).collect();
        let mut group = MetaData::new("POINT");
        create_child(&mut group, "LABELS", labels.clone()).unwrap();

        assert_eq!(split_node_count(&group, "LABELS"), k.div_ceil(255), "k = {k}");
        let rejoined: Vec<String> = collapse_children_values(Some(&group), "LABELS", None, None);
        assert_eq!(rejoined, labels, "k = {k}");
    }
}

#[test]
fn test_shorter_array_removes_stale_siblings() {
    let mut group = MetaData::new("POINT");
    let long: Vec<String> = (0..600).map(|i| format!("M{i}")).collect();
    create_child(&mut group, "LABELS", long).unwrap();
    assert_eq!(split_node_count(&group, "LABELS"), 3);

    create_child(&mut group, "LABELS", vec!["A".to_string()]).unwrap();
    assert_eq!(split_node_count(&group, "LABELS"), 1);
}

#[test]
fn test_collapse_pads_with_generated_labels() {
    let mut group = MetaData::new("POINT");
    create_child(&mut group, "LABELS", vec!["LASI ".to_string(), "RASI".to_string()]).unwrap();
    let labels: Vec<String> = collapse_children_values(
        Some(&group),
        "LABELS",
        Some(4),
        Some(&"uname*".to_string()),
    );
    assert_eq!(labels, vec!["LASI", "RASI", "uname*3", "uname*4"]);
}
