//! gamma-calib
//!
//! Measures a display's per-channel gamma with ArgyllCMS, builds correction
//! tables from the fit, and applies a table to a display's video output with
//! guaranteed restoration of the previous table.

pub mod app;
pub mod cli;
pub mod config;
pub mod display;
pub mod domain;
pub mod measurement;
pub mod platform;
pub mod ui;
