//! Monitor enumeration
//!
//! This module is responsible for:
//! - Enumerating all connected monitors
//! - Reporting the GDI device name used to open a device context
//! - Numbering monitors from 1 so they line up with `dispwin -d`

use windows::Win32::Foundation::*;
use windows::Win32::Graphics::Gdi::*;

/// A connected monitor and the information needed to open it
#[derive(Debug, Clone)]
pub struct Monitor {
    /// Windows handle to the monitor
    pub handle: HMONITOR,
    /// One-based display number in enumeration order
    pub number: usize,
    /// GDI device name such as `\\.\DISPLAY1`
    pub device_name: String,
    /// Top-left corner in virtual screen coordinates
    pub position: (i32, i32),
    /// Size in pixels
    pub size: (i32, i32),
    /// Whether this is the primary monitor
    pub is_primary: bool,
}

impl Monitor {
    /// Description in the same shape `dispwin` uses for its display list
    pub fn description(&self) -> String {
        format!(
            "{} at {}, {}, width {}, height {}{}",
            self.device_name,
            self.position.0,
            self.position.1,
            self.size.0,
            self.size.1,
            if self.is_primary { " (Primary)" } else { "" }
        )
    }
}

/// Error types for monitor operations
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("Failed to enumerate monitors")]
    EnumerationFailed,
    #[error("No monitors found during enumeration")]
    NoMonitors,
}

/// Context for monitor enumeration callback
struct EnumContext {
    monitors: Vec<Monitor>,
}

/// Callback function for monitor enumeration
///
/// Monitors whose information cannot be read are skipped and enumeration
/// continues with the rest.
unsafe extern "system" fn enum_monitor_proc(
    hmonitor: HMONITOR,
    _hdc: HDC,
    _rect: *mut RECT,
    lparam: LPARAM,
) -> BOOL {
    unsafe {
        let context = &mut *(lparam.0 as *mut EnumContext);

        let mut monitor_info = MONITORINFOEXW {
            monitorInfo: MONITORINFO {
                cbSize: std::mem::size_of::<MONITORINFOEXW>() as u32,
                ..Default::default()
            },
            ..Default::default()
        };

        if GetMonitorInfoW(hmonitor, &mut monitor_info.monitorInfo) == FALSE {
            tracing::warn!("Skipping monitor {:?}: GetMonitorInfoW failed", hmonitor);
            return TRUE;
        }

        let name_len = monitor_info
            .szDevice
            .iter()
            .position(|&c| c == 0)
            .unwrap_or(monitor_info.szDevice.len());
        let device_name = String::from_utf16_lossy(&monitor_info.szDevice[..name_len]);

        let bounds = monitor_info.monitorInfo.rcMonitor;
        let is_primary = (monitor_info.monitorInfo.dwFlags & 1) != 0; // MONITORINFOF_PRIMARY = 1

        context.monitors.push(Monitor {
            handle: hmonitor,
            number: context.monitors.len() + 1,
            device_name,
            position: (bounds.left, bounds.top),
            size: (bounds.right - bounds.left, bounds.bottom - bounds.top),
            is_primary,
        });

        TRUE
    }
}

/// Enumerates all monitors in system order
pub fn enumerate_monitors() -> Result<Vec<Monitor>, MonitorError> {
    let mut context = EnumContext {
        monitors: Vec::new(),
    };

    unsafe {
        if EnumDisplayMonitors(
            None,
            None,
            Some(enum_monitor_proc),
            LPARAM(&mut context as *mut _ as isize),
        ) == FALSE
        {
            return Err(MonitorError::EnumerationFailed);
        }
    }

    if context.monitors.is_empty() {
        return Err(MonitorError::NoMonitors);
    }

    Ok(context.monitors)
}

/// Finds a monitor by its one-based display number
pub fn monitor_by_number(number: usize) -> Result<Option<Monitor>, MonitorError> {
    Ok(enumerate_monitors()?
        .into_iter()
        .find(|m| m.number == number))
}
