//! Scoped gamma table changes
//!
//! A session remembers the table that was active when it opened and puts it
//! back when it ends, whether or not the new table loaded, and also when
//! the session is dropped on an error path.

use crate::display::device::{DeviceError, GammaDevice};
use crate::domain::table::{GammaTable, RAMP_SIZE};

/// RAII guard that restores the original gamma table
pub struct GammaSession<D: GammaDevice> {
    device: D,
    original: GammaTable,
    restored: bool,
}

impl<D: GammaDevice> GammaSession<D> {
    /// Opens a session, saving the table currently active on `device`
    pub fn open(mut device: D) -> Result<Self, DeviceError> {
        let original = device.read_table()?;
        tracing::debug!(device = device.name(), rows = original.len(), "Saved active gamma table");

        Ok(Self {
            device,
            original,
            restored: false,
        })
    }

    /// Loads `table` and checks it by reading it back
    ///
    /// Returns `false` when the display refused the table or reports a
    /// different table afterwards.
    pub fn apply(&mut self, table: &GammaTable) -> Result<bool, DeviceError> {
        if !self.device.load_table(table)? {
            tracing::warn!(device = self.device.name(), "Display refused gamma table");
            return Ok(false);
        }
        self.restored = false;

        let active = self.device.read_table()?;
        let deviation = active.max_deviation(&table.resample(RAMP_SIZE));
        let tolerance = self.device.tolerance();
        if deviation > tolerance {
            tracing::warn!(
                device = self.device.name(),
                deviation,
                tolerance,
                "Active gamma table differs from the loaded table"
            );
            return Ok(false);
        }

        tracing::info!(device = self.device.name(), rows = table.len(), "Gamma table applied");
        Ok(true)
    }

    /// Reloads the original table
    ///
    /// Only one attempt is made per applied table, even when it fails.
    pub fn restore(&mut self) -> Result<bool, DeviceError> {
        if self.restored {
            return Ok(true);
        }

        self.restored = true;
        let ok = self.device.load_table(&self.original)?;
        if ok {
            tracing::info!(device = self.device.name(), "Original gamma table restored");
        } else {
            tracing::error!(device = self.device.name(), "Failed to restore original gamma table");
        }
        Ok(ok)
    }

    /// Restores the original table and ends the session
    pub fn close(mut self) -> Result<bool, DeviceError> {
        self.restore()
    }
}

impl<D: GammaDevice> Drop for GammaSession<D> {
    fn drop(&mut self) {
        if !self.restored {
            if let Err(err) = self.restore() {
                tracing::error!("Failed to restore gamma table on drop: {}", err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::device::MemoryDevice;
    use crate::domain::fit::correction_table;

    fn calibrated() -> GammaTable {
        correction_table([2.2, 2.0, 2.4], 256).unwrap()
    }

    #[test]
    fn apply_then_restore_leaves_display_unchanged() {
        let start = correction_table([1.1, 1.2, 1.3], 256).unwrap();
        let mut device = MemoryDevice::with_table("memory", &start);
        let before = device.read_table().unwrap();

        {
            let mut session = GammaSession::open(&mut device).unwrap();
            assert!(session.apply(&calibrated()).unwrap());
            assert!(session.close().unwrap());
        }

        assert_eq!(device.read_table().unwrap(), before);
    }

    #[test]
    fn drop_restores_original() {
        let mut device = MemoryDevice::new("memory");
        let before = device.read_table().unwrap();

        {
            let mut session = GammaSession::open(&mut device).unwrap();
            assert!(session.apply(&calibrated()).unwrap());
            assert_ne!(session.device.ramp(), &before.to_ramp());
        }

        assert_eq!(device.read_table().unwrap(), before);
        assert_eq!(device.loads(), 2);
    }

    #[test]
    fn refused_load_still_restores() {
        let mut device = MemoryDevice::new("memory");
        device.reject_loads(true);

        let mut session = GammaSession::open(&mut device).unwrap();
        assert!(!session.apply(&calibrated()).unwrap());
        // The restore attempt is made even though the display keeps refusing
        assert!(!session.close().unwrap());
    }

    /// Accepts the first load and fails every load after it
    struct FailingRestore {
        inner: MemoryDevice,
        attempts: usize,
    }

    impl GammaDevice for FailingRestore {
        fn name(&self) -> &str {
            self.inner.name()
        }

        fn read_table(&mut self) -> Result<GammaTable, DeviceError> {
            self.inner.read_table()
        }

        fn load_table(&mut self, table: &GammaTable) -> Result<bool, DeviceError> {
            self.attempts += 1;
            if self.attempts > 1 {
                return Err(DeviceError::ReadFailed {
                    name: self.inner.name().to_string(),
                });
            }
            self.inner.load_table(table)
        }
    }

    #[test]
    fn failed_restore_is_not_retried_on_drop() {
        let mut device = FailingRestore {
            inner: MemoryDevice::new("memory"),
            attempts: 0,
        };

        {
            let mut session = GammaSession::open(&mut device).unwrap();
            assert!(session.apply(&calibrated()).unwrap());
            assert!(session.close().is_err());
        }

        // One apply and a single restore attempt
        assert_eq!(device.attempts, 2);
    }

    #[test]
    fn short_tables_are_verified_after_resampling() {
        let mut device = MemoryDevice::new("memory");
        let mut session = GammaSession::open(&mut device).unwrap();
        let table = correction_table([2.2, 2.2, 2.2], 16).unwrap();

        assert!(session.apply(&table).unwrap());
    }
}
