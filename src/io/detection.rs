// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Format detection.
//!
//! The [`Dispatcher`] holds a prioritized list of codecs. Readers are
//! detected from the file content (magic numbers, or the extension for the
//! Elite family which has none), writers from the file extension only. The
//! first codec that accepts the file wins.
//!
//! # Example
//!
//! ```rust,no_run
//! use mocapcodec::io::detection::Dispatcher;
//!
//! let dispatcher = Dispatcher::new();
//! match dispatcher.detect_reader("trial.c3d") {
//!     Some(codec) => println!("{} file detected", codec.name()),
//!     None => println!("Unknown format"),
//! }
//! ```

use std::path::Path;
use std::sync::Arc;

use crate::config::CodecConfig;

use super::formats::{
    AnbCodec, AncCodec, AngCodec, C3dCodec, GrxCodec, MomCodec, PwrCodec, RaxCodec, RicCodec,
    TrcCodec,
};
use super::traits::AcquisitionCodec;

/// A codec shared between the dispatcher and the pipeline nodes.
pub type SharedCodec = Arc<dyn AcquisitionCodec>;

/// Ordered registry of codecs used for automatic format detection.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    codecs: Vec<SharedCodec>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    /// Create a dispatcher with every built-in codec in default configuration.
    pub fn new() -> Self {
        Self::with_config(&CodecConfig::default())
    }

    /// Create a dispatcher whose writers use `config`.
    ///
    /// Codecs are tried in the order C3D, ANB, ANC, TRC, ANG, MOM, PWR,
    /// RAx, RIC, GRx.
    pub fn with_config(config: &CodecConfig) -> Self {
        let codecs: Vec<SharedCodec> = vec![
            Arc::new(C3dCodec::from_config(config.c3d.clone())),
            Arc::new(AnbCodec::from_config(config.anb.clone())),
            Arc::new(AncCodec::from_config(config.anc.clone())),
            Arc::new(TrcCodec::from_config(config.trc.clone())),
            Arc::new(AngCodec::new()),
            Arc::new(MomCodec::new()),
            Arc::new(PwrCodec::new()),
            Arc::new(RaxCodec::new()),
            Arc::new(RicCodec::new()),
            Arc::new(GrxCodec::new()),
        ];
        Self { codecs }
    }

    /// Create a dispatcher without any codec.
    pub fn empty() -> Self {
        Self { codecs: Vec::new() }
    }

    /// Append a codec, tried after the registered ones.
    pub fn register(&mut self, codec: SharedCodec) {
        self.codecs.push(codec);
    }

    /// Registered codecs in priority order.
    pub fn codecs(&self) -> &[SharedCodec] {
        &self.codecs
    }

    /// Find the first codec able to read `path`.
    pub fn detect_reader<P: AsRef<Path>>(&self, path: P) -> Option<SharedCodec> {
        let path = path.as_ref();
        let found = self.codecs.iter().find(|codec| codec.can_read(path)).cloned();
        match &found {
            Some(codec) => {
                tracing::debug!(path = %path.display(), format = codec.name(), "detected reader")
            }
            None => tracing::debug!(path = %path.display(), "no reader found"),
        }
        found
    }

    /// Find the first codec able to write `path`.
    pub fn detect_writer<P: AsRef<Path>>(&self, path: P) -> Option<SharedCodec> {
        let path = path.as_ref();
        self.codecs.iter().find(|codec| codec.can_write(path)).cloned()
    }
}
