//! Gamma device backed by the Win32 GDI gamma ramp API

use windows::Win32::Foundation::FALSE;
use windows::Win32::Graphics::Gdi::{CreateDCW, DeleteDC, HDC};
use windows::Win32::UI::ColorSystem::{GetDeviceGammaRamp, SetDeviceGammaRamp};
use windows::core::{PCWSTR, w};

use crate::display::device::{DeviceError, GammaDevice};
use crate::domain::table::{GammaRamp, GammaTable};
use crate::platform::monitors::Monitor;

/// Drivers commonly keep only 8 significant bits per ramp entry
const DRIVER_TOLERANCE: f64 = 1.0 / 255.0;

/// Device context for one monitor, deleted on drop
pub struct GdiDevice {
    hdc: HDC,
    name: String,
}

impl GdiDevice {
    pub fn open(monitor: &Monitor) -> Result<Self, DeviceError> {
        let device: Vec<u16> = monitor
            .device_name
            .encode_utf16()
            .chain(std::iter::once(0))
            .collect();

        let hdc = unsafe {
            CreateDCW(w!("DISPLAY"), PCWSTR(device.as_ptr()), PCWSTR::null(), None)
        };
        if hdc.is_invalid() {
            return Err(DeviceError::OpenFailed {
                name: monitor.device_name.clone(),
            });
        }

        tracing::debug!(device = %monitor.device_name, "Opened display device context");
        Ok(Self {
            hdc,
            name: monitor.device_name.clone(),
        })
    }
}

impl GammaDevice for GdiDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn read_table(&mut self) -> Result<GammaTable, DeviceError> {
        let mut ramp = GammaRamp::identity();
        let ok = unsafe { GetDeviceGammaRamp(self.hdc, ramp.as_mut_ptr().cast()) };
        if ok == FALSE {
            return Err(DeviceError::ReadFailed {
                name: self.name.clone(),
            });
        }
        Ok(GammaTable::from_ramp(&ramp))
    }

    fn load_table(&mut self, table: &GammaTable) -> Result<bool, DeviceError> {
        let ramp = table.to_ramp();
        let ok = unsafe { SetDeviceGammaRamp(self.hdc, ramp.as_ptr().cast()) };
        Ok(ok.as_bool())
    }

    fn tolerance(&self) -> f64 {
        DRIVER_TOLERANCE
    }
}

impl Drop for GdiDevice {
    fn drop(&mut self) {
        unsafe {
            let _ = DeleteDC(self.hdc);
        }
    }
}
