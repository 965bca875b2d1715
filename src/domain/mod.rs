//! Domain logic and core data structures
//!
//! This module contains pure calibration logic that is independent
//! of display APIs and external tooling.

pub mod fit;
pub mod patches;
pub mod table;

pub use fit::{GammaEstimates, TableKind};
pub use patches::{ChannelSamples, MeasurementSet, PatchKind};
pub use table::{Channel, GammaRamp, GammaTable, TableError};
