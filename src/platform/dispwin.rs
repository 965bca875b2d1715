//! Gamma device backed by ArgyllCMS `dispwin`
//!
//! Tables travel through `.cal` files in a scratch directory: loading writes
//! the table and runs `dispwin -d<n> <file>`, reading runs `dispwin -s`.

use std::path::PathBuf;

use crate::display::device::{DeviceError, GammaDevice};
use crate::domain::table::GammaTable;
use crate::measurement::cal::{CalError, table_from_cal, table_to_cal};
use crate::measurement::cgats::CgatsDocument;
use crate::platform::argyll::{Argyll, CommandRunner};

/// Video LUTs are often stored with 8 bits per entry
const LUT_TOLERANCE: f64 = 1.0 / 255.0;

pub struct DispwinDevice<R: CommandRunner> {
    argyll: Argyll<R>,
    display: usize,
    scratch_dir: PathBuf,
    name: String,
}

impl<R: CommandRunner> DispwinDevice<R> {
    pub fn new(argyll: Argyll<R>, display: usize, scratch_dir: PathBuf) -> Self {
        Self {
            argyll,
            display,
            scratch_dir,
            name: format!("dispwin display {display}"),
        }
    }

    pub fn argyll(&self) -> &Argyll<R> {
        &self.argyll
    }

    fn scratch_file(&self, purpose: &str) -> PathBuf {
        self.scratch_dir.join(format!(
            "gamma-calib-{}-d{}-{}.cal",
            purpose,
            self.display,
            std::process::id()
        ))
    }

    fn io_error(&self, source: std::io::Error) -> DeviceError {
        DeviceError::Io {
            name: self.name.clone(),
            source,
        }
    }
}

impl<R: CommandRunner> GammaDevice for DispwinDevice<R> {
    fn name(&self) -> &str {
        &self.name
    }

    fn read_table(&mut self) -> Result<GammaTable, DeviceError> {
        let path = self.scratch_file("saved");
        if !self.argyll.save_calibration(self.display, &path)? {
            return Err(DeviceError::ReadFailed {
                name: self.name.clone(),
            });
        }

        let text = std::fs::read_to_string(&path).map_err(|err| self.io_error(err));
        let _ = std::fs::remove_file(&path);
        let doc = CgatsDocument::parse(&text?).map_err(CalError::from)?;
        Ok(table_from_cal(&doc)?)
    }

    fn load_table(&mut self, table: &GammaTable) -> Result<bool, DeviceError> {
        let path = self.scratch_file("load");
        std::fs::write(&path, table_to_cal(table).to_text()).map_err(|err| self.io_error(err))?;

        let loaded = self.argyll.load_calibration(self.display, &path);
        let _ = std::fs::remove_file(&path);
        Ok(loaded?)
    }

    fn tolerance(&self) -> f64 {
        LUT_TOLERANCE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::session::GammaSession;
    use crate::domain::fit::correction_table;
    use crate::measurement::cal::tests::dispwin_cal_text;
    use crate::platform::argyll::tests::RecordingRunner;
    use crate::platform::argyll::{ArgyllError, CommandOutput};
    use std::path::Path;

    /// Acts like `dispwin` on a display whose video LUT holds `active`
    struct LutRunner {
        active: GammaTable,
        loaded: Vec<String>,
    }

    impl CommandRunner for LutRunner {
        fn output(&mut self, program: &str, args: &[String]) -> Result<CommandOutput, ArgyllError> {
            assert_eq!(program, "dispwin");
            let success = match args {
                [_, flag, path] if flag == "-s" => {
                    std::fs::write(path, dispwin_cal_text(&self.active)).is_ok()
                }
                [_, path] => {
                    let doc = CgatsDocument::load(Path::new(path)).unwrap();
                    self.active = table_from_cal(&doc).unwrap();
                    self.loaded.push(path.clone());
                    true
                }
                _ => false,
            };
            Ok(CommandOutput {
                success,
                code: Some(if success { 0 } else { 1 }),
                ..Default::default()
            })
        }

        fn status(&mut self, program: &str, args: &[String]) -> Result<CommandOutput, ArgyllError> {
            self.output(program, args)
        }

        fn set_current_dir(&mut self, _dir: &Path) {}
    }

    #[test]
    fn load_writes_cal_file_for_dispwin() {
        let scratch = std::env::temp_dir();
        let mut device = DispwinDevice::new(Argyll::new(RecordingRunner::succeeding()), 2, scratch);

        let table = correction_table([2.2, 2.2, 2.2], 256).unwrap();
        assert!(device.load_table(&table).unwrap());

        let calls = &device.argyll().runner().calls;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "dispwin");
        assert_eq!(calls[0].1[0], "-d2");
        assert!(calls[0].1[1].ends_with(".cal"));
        // Scratch files are removed once dispwin has run
        assert!(!std::path::Path::new(&calls[0].1[1]).exists());
    }

    #[test]
    fn refused_load_is_reported() {
        let mut runner = RecordingRunner::succeeding();
        runner.replies.push(CommandOutput {
            success: false,
            code: Some(1),
            ..Default::default()
        });
        let mut device = DispwinDevice::new(Argyll::new(runner), 1, std::env::temp_dir());

        assert!(!device.load_table(&GammaTable::identity(256)).unwrap());
    }

    #[test]
    fn failed_save_is_a_read_error() {
        let mut runner = RecordingRunner::succeeding();
        runner.replies.push(CommandOutput {
            success: false,
            code: Some(1),
            ..Default::default()
        });
        let mut device = DispwinDevice::new(Argyll::new(runner), 1, std::env::temp_dir());

        assert!(matches!(device.read_table(), Err(DeviceError::ReadFailed { .. })));
    }

    #[test]
    fn session_round_trip_through_dispwin_files() {
        let runner = LutRunner {
            active: GammaTable::identity(256),
            loaded: Vec::new(),
        };
        let mut device = DispwinDevice::new(Argyll::new(runner), 7, std::env::temp_dir());
        let before = device.read_table().unwrap();

        {
            let mut session = GammaSession::open(&mut device).unwrap();
            assert!(session.apply(&correction_table([2.2, 2.0, 2.4], 256).unwrap()).unwrap());
            assert!(session.close().unwrap());
        }

        let after = device.read_table().unwrap();
        assert_eq!(after.max_deviation(&before), 0.0);
        // The calibration and then the saved original were loaded
        assert_eq!(device.argyll().runner().loaded.len(), 2);
    }
}
