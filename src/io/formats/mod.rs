// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! File format implementations for acquisitions.
//!
//! - [`c3d`]: C3D (read/write)
//! - [`anb`]: Motion Analysis analog binary (read/write)
//! - [`anc`]: Motion Analysis analog text (read/write)
//! - [`trc`]: Motion Analysis trajectories (read/write)
//! - [`elite`]: BTS Elite ANG, MOM, PWR, RAH/RAW and RIC files (read-only)
//! - [`grx`]: BTS force platform files (read-only)

pub mod anb;
pub mod anc;
pub mod c3d;
pub mod elite;
pub mod grx;
pub mod trc;

pub use anb::AnbCodec;
pub use anc::AncCodec;
pub use c3d::C3dCodec;
pub use elite::{AngCodec, MomCodec, PwrCodec, RaxCodec, RicCodec};
pub use grx::GrxCodec;
pub use trc::TrcCodec;
