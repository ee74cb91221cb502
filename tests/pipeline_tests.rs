// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Pipeline integration tests.
//!
//! Tests cover:
//! - Memoization across reader, transform and writer nodes
//! - Re-computation after a configuration change
//! - Failure propagation
//! - Two-input transforms

mod common;

use std::any::Any;
use std::path::{Path, PathBuf};

use mocapcodec::model::Acquisition;
use mocapcodec::pipeline::{
    required_input, AcquisitionFileReader, AcquisitionFileWriter, AnalogOffsetRemover,
    OutputState, Pipeline, ProcessNode, SharedAcquisition, SubAcquisitionFilter,
};
use mocapcodec::Result;

/// Pass-through transform counting its runs.
#[derive(Debug, Default)]
struct Counter {
    runs: usize,
}

impl ProcessNode for Counter {
    fn name(&self) -> &'static str {
        "Counter"
    }

    fn generate_data(&mut self, inputs: &[Option<SharedAcquisition>]) -> Result<Vec<Acquisition>> {
        self.runs += 1;
        Ok(vec![required_input(inputs, 0, self.name())?.clone()])
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

fn write_c3d(dir: &Path, name: &str, frames: usize) -> PathBuf {
    let path = dir.join(name);
    AcquisitionFileWriter::new()
        .with_filename(&path)
        .write(&common::gait_acquisition(frames))
        .unwrap();
    path
}

#[test]
fn test_transform_runs_once_per_change() {
    let dir = tempfile::tempdir().unwrap();
    let first = write_c3d(dir.path(), "first.c3d", 10);
    let second = write_c3d(dir.path(), "second.c3d", 20);

    let mut pipeline = Pipeline::new();
    let source = pipeline.add_node(AcquisitionFileReader::new().with_filename(&first));
    let counter = pipeline.add_node(Counter::default());
    pipeline.connect(source.output(0), counter, 0).unwrap();
    let output = counter.output(0);

    assert_eq!(pipeline.update(output).unwrap().point_frame_number(), 10);
    assert_eq!(pipeline.update(output).unwrap().point_frame_number(), 10);
    assert_eq!(pipeline.node::<Counter>(counter).unwrap().runs, 1);

    pipeline
        .node_mut::<AcquisitionFileReader>(source)
        .unwrap()
        .set_filename(&second);
    assert_eq!(pipeline.state(output).unwrap(), OutputState::Stale);
    assert_eq!(pipeline.update(output).unwrap().point_frame_number(), 20);
    pipeline.update(output).unwrap();
    assert_eq!(pipeline.node::<Counter>(counter).unwrap().runs, 2);
}

#[test]
fn test_reader_filter_writer_chain() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_c3d(dir.path(), "gait.c3d", 30);
    let output = dir.path().join("crop.trc");

    let mut pipeline = Pipeline::new();
    let reader = pipeline.add_node(AcquisitionFileReader::new().with_filename(&input));
    let crop = pipeline.add_node(SubAcquisitionFilter::new().with_frames_index(5, 14));
    let writer = pipeline.add_node(AcquisitionFileWriter::new().with_filename(&output));
    pipeline.connect(reader.output(0), crop, 0).unwrap();
    pipeline.connect(crop.output(0), writer, 0).unwrap();

    pipeline.update_node(writer).unwrap();
    let stamp = pipeline.timestamp(crop.output(0)).unwrap();
    pipeline.update_node(writer).unwrap();
    assert_eq!(pipeline.timestamp(crop.output(0)).unwrap(), stamp);

    let back = AcquisitionFileReader::new().with_filename(&output).read().unwrap();
    assert_eq!(back.point_frame_number(), 10);
    assert_eq!(back.first_frame(), 16);
    assert_eq!(back.point(0).unwrap().values()[0][0], 5.0);

    // The reader output is shared, not modified.
    let original = pipeline.data(reader.output(0)).unwrap();
    assert_eq!(original.point_frame_number(), 30);
}

#[test]
fn test_reader_failure_is_surfaced() {
    let dir = tempfile::tempdir().unwrap();
    let mut pipeline = Pipeline::new();
    let reader = pipeline.add_node(
        AcquisitionFileReader::new().with_filename(dir.path().join("missing.c3d")),
    );
    let counter = pipeline.add_node(Counter::default());
    pipeline.connect(reader.output(0), counter, 0).unwrap();

    let err = pipeline.update(counter.output(0)).unwrap_err();
    assert_eq!(err.cause(), "File doesn't exist.");
    assert!(pipeline.data(counter.output(0)).is_none());
    assert_eq!(pipeline.node::<Counter>(counter).unwrap().runs, 0);
}

#[test]
fn test_offset_remover_with_two_readers() {
    let dir = tempfile::tempdir().unwrap();
    let raw_path = write_c3d(dir.path(), "raw.c3d", 10);
    let mut still = common::gait_acquisition(2);
    for analog in still.analogs_mut().iter_mut() {
        analog.values_mut().fill(2.0);
    }
    let offset_path = dir.path().join("still.c3d");
    AcquisitionFileWriter::new()
        .with_filename(&offset_path)
        .write(&still)
        .unwrap();

    let mut pipeline = Pipeline::new();
    let raw = pipeline.add_node(AcquisitionFileReader::new().with_filename(&raw_path));
    let offset = pipeline.add_node(AcquisitionFileReader::new().with_filename(&offset_path));
    let remover = pipeline.add_node(AnalogOffsetRemover::new());
    pipeline.connect(raw.output(0), remover, 0).unwrap();
    pipeline.connect(offset.output(0), remover, 1).unwrap();

    let corrected = pipeline.update(remover.output(0)).unwrap();
    let original = pipeline.data(raw.output(0)).unwrap();
    for (c, o) in corrected.analogs().iter().zip(original.analogs().iter()) {
        for (x, y) in c.values().iter().zip(o.values()) {
            assert!((x - (y - 2.0)).abs() < 1e-9);
        }
    }
}
