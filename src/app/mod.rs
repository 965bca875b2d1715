//! Application orchestration layer
//!
//! Coordinates the config, display, measurement and platform layers for
//! each command.

pub mod apply;
pub mod calibrate;
pub mod controller;

pub use controller::{run, AppController, AppError};
