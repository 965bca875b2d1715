//! Platform integrations
//!
//! ArgyllCMS tooling works everywhere. The GDI gamma ramp backend and
//! monitor enumeration are only built on Windows.

pub mod argyll;
pub mod dispwin;
#[cfg(windows)]
pub mod gdi;
#[cfg(windows)]
pub mod monitors;
