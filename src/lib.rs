// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! # Mocapcodec
//!
//! Biomechanics motion-capture acquisition library: reading, writing and
//! processing C3D, ANB, TRC and Elite files.
//!
//! The library is organized in layers:
//! - [`io::binary`]: endian-aware binary streams (IEEE little/big-endian, VAX)
//! - [`metadata`]: schema-free parameter tree used by the formats
//! - [`model`]: the [`Acquisition`] aggregate (points, analogs, events)
//! - [`io::formats`]: format codecs behind the [`AcquisitionCodec`] contract,
//!   with automatic detection through the [`Dispatcher`]
//! - [`pipeline`]: lazy, timestamp-memoized graph of readers, transforms
//!   and writers
//! - [`config`]: writer options, loadable from TOML
//!
//! ## Example: Converting a file
//!
//! ```rust,no_run
//! use mocapcodec::pipeline::{AcquisitionFileReader, AcquisitionFileWriter};
//!
//! let mut reader = AcquisitionFileReader::new().with_filename("walk.trc");
//! let acquisition = reader.read()?;
//! AcquisitionFileWriter::new()
//!     .with_filename("walk.c3d")
//!     .write(&acquisition)?;
//! # Ok::<(), mocapcodec::MocapError>(())
//! ```
//!
//! ## Example: Cropping through a pipeline
//!
//! ```rust,no_run
//! use mocapcodec::pipeline::{
//!     AcquisitionFileReader, AcquisitionFileWriter, Pipeline, SubAcquisitionFilter,
//! };
//!
//! let mut pipeline = Pipeline::new();
//! let reader = pipeline.add_node(AcquisitionFileReader::new().with_filename("gait.c3d"));
//! let crop = pipeline.add_node(SubAcquisitionFilter::new().with_frames_index(0, 99));
//! let writer = pipeline.add_node(AcquisitionFileWriter::new().with_filename("gait_crop.c3d"));
//! pipeline.connect(reader.output(0), crop, 0)?;
//! pipeline.connect(crop.output(0), writer, 0)?;
//! pipeline.update_node(writer)?;
//! # Ok::<(), mocapcodec::MocapError>(())
//! ```

// Core types
pub mod core;

pub use core::{MocapError, Result, Timestamp};

// Writer configuration
pub mod config;

pub use config::{CodecConfig, ConfigError};

// Parameter tree
pub mod metadata;

pub use metadata::{MetaData, MetaDataInfo};

// Acquisition model
pub mod model;

pub use model::{Acquisition, Analog, AnalogGain, AnalogResolution, Event, Point, PointType};

// Binary streams, codecs and detection
pub mod io;

pub use io::{AcquisitionCodec, Dispatcher};

// Processing graph
pub mod pipeline;

pub use pipeline::{Pipeline, ProcessNode};
