//! Configuration module for gamma-calib
//!
//! Typed settings for calibration and apply runs. Values come from the
//! command line and interactive prompts and are validated on construction.

pub mod calibration;

pub use calibration::{ApplyConfig, CalibrationConfig, ConfigError, Hold, PatchCounts};
