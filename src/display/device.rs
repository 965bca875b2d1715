//! Display gamma devices
//!
//! A device is anything whose active gamma table can be read and replaced:
//! a GDI device context, a `dispwin` target, or an in-memory stand-in.

use thiserror::Error;

use crate::domain::table::{GammaRamp, GammaTable, RAMP_MAX};
use crate::measurement::cal::CalError;
use crate::platform::argyll::ArgyllError;

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("Display {0} not found")]
    DisplayNotFound(usize),
    #[error("Failed to open display {name}")]
    OpenFailed { name: String },
    #[error("Failed to read the active gamma table of {name}")]
    ReadFailed { name: String },
    #[error("The {0} backend is not available on this platform")]
    Unsupported(&'static str),
    #[error("Calibration file error: {0}")]
    Calibration(#[from] CalError),
    #[error("I/O error on {name}: {source}")]
    Io {
        name: String,
        source: std::io::Error,
    },
    #[error(transparent)]
    Argyll(#[from] ArgyllError),
    #[error("Monitor enumeration failed: {0}")]
    Enumeration(String),
}

/// Read and replace the active gamma table of a display
pub trait GammaDevice {
    /// Human-readable device name for messages
    fn name(&self) -> &str;

    /// Reads the table currently active on the display
    fn read_table(&mut self) -> Result<GammaTable, DeviceError>;

    /// Loads `table` onto the display
    ///
    /// `Ok(false)` means the display refused the table. Errors are reserved
    /// for failures to talk to the display at all.
    fn load_table(&mut self, table: &GammaTable) -> Result<bool, DeviceError>;

    /// Largest read-back deviation still counted as a successful load
    fn tolerance(&self) -> f64 {
        1.0 / RAMP_MAX
    }
}

impl<D: GammaDevice + ?Sized> GammaDevice for &mut D {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn read_table(&mut self) -> Result<GammaTable, DeviceError> {
        (**self).read_table()
    }

    fn load_table(&mut self, table: &GammaTable) -> Result<bool, DeviceError> {
        (**self).load_table(table)
    }

    fn tolerance(&self) -> f64 {
        (**self).tolerance()
    }
}

impl<D: GammaDevice + ?Sized> GammaDevice for Box<D> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn read_table(&mut self) -> Result<GammaTable, DeviceError> {
        (**self).read_table()
    }

    fn load_table(&mut self, table: &GammaTable) -> Result<bool, DeviceError> {
        (**self).load_table(table)
    }

    fn tolerance(&self) -> f64 {
        (**self).tolerance()
    }
}

/// In-process device storing a hardware ramp
///
/// Loads are quantised exactly like a driver would store them, so read-back
/// behaves the same way as on real hardware.
#[derive(Debug, Clone)]
pub struct MemoryDevice {
    name: String,
    ramp: GammaRamp,
    reject_loads: bool,
    loads: usize,
}

impl MemoryDevice {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ramp: GammaRamp::identity(),
            reject_loads: false,
            loads: 0,
        }
    }

    pub fn with_table(name: &str, table: &GammaTable) -> Self {
        Self {
            ramp: table.to_ramp(),
            ..Self::new(name)
        }
    }

    /// Makes every subsequent load fail
    pub fn reject_loads(&mut self, reject: bool) {
        self.reject_loads = reject;
    }

    /// Number of accepted loads
    pub fn loads(&self) -> usize {
        self.loads
    }

    pub fn ramp(&self) -> &GammaRamp {
        &self.ramp
    }
}

impl GammaDevice for MemoryDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn read_table(&mut self) -> Result<GammaTable, DeviceError> {
        Ok(GammaTable::from_ramp(&self.ramp))
    }

    fn load_table(&mut self, table: &GammaTable) -> Result<bool, DeviceError> {
        if self.reject_loads {
            return Ok(false);
        }
        self.ramp = table.to_ramp();
        self.loads += 1;
        Ok(true)
    }
}
