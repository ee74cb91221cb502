// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Codec configuration.
//!
//! [`CodecConfig`] gathers the writer options of every format. It can be
//! built in code or loaded from a TOML document:
//!
//! ```toml
//! [c3d]
//! byte_order = "ieee_big_endian"
//! storage = "integer"
//! point_scale = 0.1
//!
//! [trc]
//! default_frequency = 120.0
//!
//! [anb]
//! board = "Generic"
//!
//! [anc]
//! default_frequency = 1000.0
//! ```
//!
//! Missing sections and keys keep their default values.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::io::binary::ByteOrderFormat;
use crate::MocapError;

/// Errors raised while loading a configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read configuration file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for '{key}': {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl From<ConfigError> for MocapError {
    fn from(err: ConfigError) -> Self {
        MocapError::configuration(err.to_string())
    }
}

/// Sample storage of C3D data sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum C3dStorage {
    /// 32-bit floats (negative scale factor in the header)
    #[default]
    Float,
    /// Scaled 16-bit integers (positive scale factor in the header)
    Integer,
}

/// Options of the C3D writer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct C3dConfig {
    /// Byte order of written files
    pub byte_order: ByteOrderFormat,
    /// Sample storage of written files
    pub storage: C3dStorage,
    /// Magnitude of the point scale factor; integer coordinates are
    /// multiplied by it
    pub point_scale: f32,
}

impl Default for C3dConfig {
    fn default() -> Self {
        Self {
            byte_order: ByteOrderFormat::IeeeLittleEndian,
            storage: C3dStorage::Float,
            point_scale: 0.1,
        }
    }
}

/// Options of the TRC writer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrcConfig {
    /// Rate written when the acquisition has no point frequency
    pub default_frequency: f64,
}

impl Default for TrcConfig {
    fn default() -> Self {
        Self {
            default_frequency: 100.0,
        }
    }
}

/// Options of the ANB writer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnbConfig {
    /// Board name written when the acquisition has no `ANALOG:BOARD`
    pub board: String,
    /// Rate written when the acquisition has no analog frequency
    pub default_frequency: f64,
}

impl Default for AnbConfig {
    fn default() -> Self {
        Self {
            board: "Unknown".to_string(),
            default_frequency: 0.0,
        }
    }
}

/// Options of the ANC writer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AncConfig {
    /// Board name written when the acquisition has no `ANALOG:BOARD`
    pub board: String,
    /// Rate written when the acquisition has no analog frequency
    pub default_frequency: f64,
}

impl Default for AncConfig {
    fn default() -> Self {
        Self {
            board: "Unknown".to_string(),
            default_frequency: 100.0,
        }
    }
}

/// Configuration of every codec.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    pub c3d: C3dConfig,
    pub trc: TrcConfig,
    pub anb: AnbConfig,
    pub anc: AncConfig,
}

impl CodecConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: CodecConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Check value ranges that the TOML types cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.c3d.point_scale.is_finite() && self.c3d.point_scale > 0.0) {
            return Err(ConfigError::Invalid {
                key: "c3d.point_scale",
                reason: format!("{} is not a positive number", self.c3d.point_scale),
            });
        }
        if !(self.trc.default_frequency.is_finite() && self.trc.default_frequency > 0.0) {
            return Err(ConfigError::Invalid {
                key: "trc.default_frequency",
                reason: format!("{} is not a positive number", self.trc.default_frequency),
            });
        }
        if !(self.anb.default_frequency.is_finite() && self.anb.default_frequency >= 0.0) {
            return Err(ConfigError::Invalid {
                key: "anb.default_frequency",
                reason: format!("{} is negative", self.anb.default_frequency),
            });
        }
        if !(self.anc.default_frequency.is_finite() && self.anc.default_frequency > 0.0) {
            return Err(ConfigError::Invalid {
                key: "anc.default_frequency",
                reason: format!("{} is not a positive number", self.anc.default_frequency),
            });
        }
        if self.anb.board.len() > 64 {
            return Err(ConfigError::Invalid {
                key: "anb.board",
                reason: "board names are limited to 64 bytes".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CodecConfig::default();
        assert_eq!(config.c3d.storage, C3dStorage::Float);
        assert_eq!(config.c3d.byte_order, ByteOrderFormat::IeeeLittleEndian);
        assert_eq!(config.trc.default_frequency, 100.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml() {
        let config = CodecConfig::from_toml_str(
            r#"
            [c3d]
            byte_order = "vax_little_endian"
            storage = "integer"

            [anb]
            board = "Board A"
            "#,
        )
        .unwrap();
        assert_eq!(config.c3d.byte_order, ByteOrderFormat::VaxLittleEndian);
        assert_eq!(config.c3d.storage, C3dStorage::Integer);
        assert_eq!(config.c3d.point_scale, 0.1);
        assert_eq!(config.anb.board, "Board A");
        assert_eq!(config.trc, TrcConfig::default());
        assert_eq!(config.anc.default_frequency, 100.0);
    }

    #[test]
    fn test_invalid_values() {
        let err = CodecConfig::from_toml_str("[trc]\ndefault_frequency = -1.0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "trc.default_frequency", .. }));

        let err = CodecConfig::from_toml_str("[anc]\ndefault_frequency = 0.0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "anc.default_frequency", .. }));

        let err = CodecConfig::from_toml_str("[c3d]\nstorage = \"double\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("codecs.toml");
        std::fs::write(&path, "[c3d]\npoint_scale = 0.5\n").unwrap();
        let config = CodecConfig::from_file(&path).unwrap();
        assert_eq!(config.c3d.point_scale, 0.5);

        let err = CodecConfig::from_file(dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        let mapped: MocapError = err.into();
        assert!(matches!(mapped, MocapError::Configuration { .. }));
    }
}
