//! Display gamma access
//!
//! [`GammaDevice`] abstracts over the ways a display's gamma table can be
//! read and replaced, and [`GammaSession`] scopes a change so the original
//! table always comes back.

pub mod device;
pub mod session;

use std::path::PathBuf;

pub use device::{DeviceError, GammaDevice, MemoryDevice};
pub use session::GammaSession;

use crate::platform::argyll::{Argyll, SystemRunner};
use crate::platform::dispwin::DispwinDevice;

/// Mechanism used to reach the display's gamma table
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Backend {
    /// Win32 GDI gamma ramps (Windows only)
    Gdi,
    /// ArgyllCMS `dispwin` with `.cal` files
    Dispwin,
    /// In-process table, for dry runs
    Memory,
}

impl Backend {
    pub fn platform_default() -> Self {
        if cfg!(windows) {
            Backend::Gdi
        } else {
            Backend::Dispwin
        }
    }
}

/// Opens the gamma device for a one-based display number
pub fn open_device(
    backend: Backend,
    display: usize,
    tool_dir: Option<PathBuf>,
) -> Result<Box<dyn GammaDevice>, DeviceError> {
    match backend {
        Backend::Gdi => open_gdi(display),
        Backend::Dispwin => Ok(Box::new(DispwinDevice::new(
            Argyll::new(SystemRunner::new(tool_dir)),
            display,
            std::env::temp_dir(),
        ))),
        Backend::Memory => Ok(Box::new(MemoryDevice::new(&format!("memory display {display}")))),
    }
}

#[cfg(windows)]
fn open_gdi(display: usize) -> Result<Box<dyn GammaDevice>, DeviceError> {
    use crate::platform::gdi::GdiDevice;
    use crate::platform::monitors::monitor_by_number;

    let monitor = monitor_by_number(display)
        .map_err(|err| DeviceError::Enumeration(err.to_string()))?
        .ok_or(DeviceError::DisplayNotFound(display))?;
    Ok(Box::new(GdiDevice::open(&monitor)?))
}

#[cfg(not(windows))]
fn open_gdi(_display: usize) -> Result<Box<dyn GammaDevice>, DeviceError> {
    Err(DeviceError::Unsupported("gdi"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_backend_opens_anywhere() {
        let device = open_device(Backend::Memory, 3, None).unwrap();
        assert_eq!(device.name(), "memory display 3");
    }

    #[test]
    fn dispwin_backend_is_named_by_display() {
        let device = open_device(Backend::Dispwin, 2, None).unwrap();
        assert_eq!(device.name(), "dispwin display 2");
    }

    #[cfg(not(windows))]
    #[test]
    fn gdi_is_unsupported_off_windows() {
        assert!(matches!(
            open_device(Backend::Gdi, 1, None),
            Err(DeviceError::Unsupported("gdi"))
        ));
        assert_eq!(Backend::platform_default(), Backend::Dispwin);
    }
}
