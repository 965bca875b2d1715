//! Application controller and coordination layer
//!
//! The controller turns a parsed command line into calls on the config,
//! display, measurement and platform layers.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use thiserror::Error;

use crate::app::apply::apply_table;
use crate::app::calibrate::{process_measurements, CalibrationReport, CalibrationRequest, CalibrationWorkflow};
use crate::cli::{Cli, Command};
use crate::config::{ApplyConfig, CalibrationConfig, ConfigError, Hold, PatchCounts};
use crate::display::{open_device, Backend, DeviceError};
use crate::domain::fit::FitError;
use crate::domain::table::{GammaTable, TableError};
use crate::measurement::CgatsError;
use crate::platform::argyll::{Argyll, ArgyllError, DisplayInfo, SystemRunner};
use crate::ui::plot::PlotError;
use crate::ui::prompt::{PromptError, Prompter};

/// Application errors that can occur during controller operations
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("Gamma table error: {0}")]
    Table(#[from] TableError),
    #[error("Measurement file error: {0}")]
    Measurement(#[from] CgatsError),
    #[error("Gamma fit error: {0}")]
    Fit(#[from] FitError),
    #[error(transparent)]
    Argyll(#[from] ArgyllError),
    #[error("Display error: {0}")]
    Device(#[from] DeviceError),
    #[error("Plot error: {0}")]
    Plot(#[from] PlotError),
    #[error(transparent)]
    Prompt(#[from] PromptError),
    #[error("Failed to create directory {}: {source}", .path.display())]
    CreateDir { path: PathBuf, source: io::Error },
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Main application controller
///
/// Holds the settings shared by every command and dispatches to the
/// workflows. Each command acquires and releases its own display resources.
pub struct AppController {
    /// Directory holding the ArgyllCMS executables, `PATH` when unset
    tool_dir: Option<PathBuf>,
}

impl AppController {
    pub fn new(tool_dir: Option<PathBuf>) -> Self {
        Self { tool_dir }
    }

    fn argyll(&self) -> Argyll<SystemRunner> {
        Argyll::new(SystemRunner::new(self.tool_dir.clone()))
    }

    /// Runs one command to completion
    pub fn run(&self, command: Command) -> Result<(), AppError> {
        match command {
            Command::Displays { backend } => {
                let displays = self.list_displays(backend.unwrap_or_else(Backend::platform_default))?;
                if displays.is_empty() {
                    return Err(PromptError::NoDisplays.into());
                }
                println!("\nAvailable Display Devices:");
                for display in &displays {
                    println!("Display {}: {}", display.number, display.description);
                }
                Ok(())
            }
            Command::Apply {
                table,
                display,
                backend,
                hold_secs,
            } => {
                let config = ApplyConfig::new(&table, display, hold_secs)?;
                self.apply(&config, backend.unwrap_or_else(Backend::platform_default))
                    .map(|_| ())
            }
            Command::Calibrate {
                base_name,
                display,
                gray,
                color,
                table_size,
                output_root,
                font,
            } => {
                let request = CalibrationRequest {
                    base_name,
                    display,
                    gray,
                    color,
                    table_size,
                    output_root,
                    font,
                };
                self.calibrate(&request).map(|report| summarize(&report))
            }
            Command::Fit {
                ti3,
                base_name,
                display,
                gray,
                color,
                table_size,
                output_root,
                font,
            } => {
                let config = CalibrationConfig::new(&base_name, display, fit_patches(gray, color)?)?
                    .with_table_size(table_size)
                    .with_output_root(output_root)
                    .with_font(font);
                process_measurements(&config, &ti3).map(|report| summarize(&report))
            }
        }
    }

    /// Lists the displays reachable through `backend`
    pub fn list_displays(&self, backend: Backend) -> Result<Vec<DisplayInfo>, AppError> {
        match backend {
            Backend::Dispwin => Ok(self.argyll().list_displays()?),
            Backend::Gdi => gdi_displays(),
            Backend::Memory => Ok(vec![DisplayInfo {
                number: ApplyConfig::DEFAULT_DISPLAY,
                description: "In-memory gamma table".to_string(),
            }]),
        }
    }

    /// Applies a table file to a display and restores the original afterwards
    ///
    /// # Returns
    /// Whether the table was applied and verified
    pub fn apply(&self, config: &ApplyConfig, backend: Backend) -> Result<bool, AppError> {
        let table = GammaTable::load(&config.table_path)?;
        tracing::info!(
            path = %config.table_path.display(),
            rows = table.len(),
            "Loaded gamma table"
        );

        let device = open_device(backend, config.display, self.tool_dir.clone())?;
        let hold = config.hold;
        let stdout = io::stdout();
        let mut out = stdout.lock();

        apply_table(device, &table, &mut out, |out| hold_table(hold, out))
    }

    /// Runs the interactive calibration workflow on the terminal
    pub fn calibrate(&self, request: &CalibrationRequest) -> Result<CalibrationReport, AppError> {
        let stdin = io::stdin();
        let mut prompter = Prompter::new(stdin.lock(), io::stdout());
        CalibrationWorkflow::new(self.argyll()).run(request, &mut prompter)
    }
}

/// Patch kinds to read from an existing measurement file
///
/// Counts are unknown after the fact, so only inclusion matters. Both kinds
/// are used when neither flag is set.
fn fit_patches(gray: bool, color: bool) -> Result<PatchCounts, ConfigError> {
    if !gray && !color {
        return PatchCounts::new(1, 1);
    }
    PatchCounts::new(u32::from(gray), u32::from(color))
}

fn hold_table<W: Write>(hold: Hold, out: &mut W) -> Result<(), AppError> {
    match hold {
        Hold::For(duration) => {
            writeln!(out, "Restoring the original gamma table in {} seconds...", duration.as_secs())?;
            out.flush()?;
            std::thread::sleep(duration);
            Ok(())
        }
        Hold::UntilEnter => {
            let stdin = io::stdin();
            wait_for_enter(stdin.lock(), out)
        }
    }
}

fn wait_for_enter<R: BufRead, W: Write>(input: R, out: &mut W) -> Result<(), AppError> {
    let mut prompter = Prompter::new(input, out);
    prompter.wait_for_enter("Press Enter to restore the original gamma table...")?;
    Ok(())
}

fn summarize(report: &CalibrationReport) {
    tracing::info!(
        samples = report.samples,
        tables = report.tables.len(),
        plot = report.plot.is_some(),
        "Calibration files written"
    );
    if report.tables.is_empty() {
        println!("No gamma tables were generated.");
    }
}

#[cfg(windows)]
fn gdi_displays() -> Result<Vec<DisplayInfo>, AppError> {
    use crate::platform::monitors::enumerate_monitors;

    let monitors = enumerate_monitors().map_err(|err| DeviceError::Enumeration(err.to_string()))?;
    Ok(monitors
        .iter()
        .map(|monitor| DisplayInfo {
            number: monitor.number,
            description: monitor.description(),
        })
        .collect())
}

#[cfg(not(windows))]
fn gdi_displays() -> Result<Vec<DisplayInfo>, AppError> {
    Err(DeviceError::Unsupported("gdi").into())
}

/// Entry point used by `main`
pub fn run(cli: Cli) -> Result<(), AppError> {
    AppController::new(cli.argyll_dir).run(cli.command)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::path::Path;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("gamma-calib-ctl-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn applies_table_on_memory_backend() {
        let dir = scratch("apply");
        let path = dir.join("table.txt");
        GammaTable::identity(16).save(&path).unwrap();

        let controller = AppController::new(None);
        let config = ApplyConfig::new(&path, 1, Some(0)).unwrap();
        assert!(controller.apply(&config, Backend::Memory).unwrap());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_table_is_an_error() {
        let controller = AppController::new(None);
        let config = ApplyConfig::new(Path::new("/nonexistent/table.txt"), 1, Some(0)).unwrap();
        assert!(matches!(
            controller.apply(&config, Backend::Memory),
            Err(AppError::Table(_))
        ));
    }

    #[test]
    fn memory_backend_lists_one_display() {
        let displays = AppController::new(None).list_displays(Backend::Memory).unwrap();
        assert_eq!(displays.len(), 1);
        assert_eq!(displays[0].number, 1);
    }

    #[test]
    fn fit_uses_both_kinds_by_default() {
        let both = fit_patches(false, false).unwrap();
        assert!(both.include_gray() && both.include_color());

        let gray = fit_patches(true, false).unwrap();
        assert!(gray.include_gray());
        assert!(!gray.include_color());
    }

    #[test]
    fn wait_for_enter_needs_input() {
        let mut out = Vec::new();
        assert!(wait_for_enter(Cursor::new(b"\n".to_vec()), &mut out).is_ok());
        assert!(String::from_utf8(out).unwrap().contains("Press Enter"));

        let mut out = Vec::new();
        assert!(matches!(
            wait_for_enter(Cursor::new(Vec::new()), &mut out),
            Err(AppError::Prompt(PromptError::EndOfInput))
        ));
    }

    #[test]
    fn errors_read_naturally() {
        let err = AppError::from(ConfigError::NoPatches);
        assert!(err.to_string().starts_with("Invalid configuration: "));

        let err = AppError::CreateDir {
            path: PathBuf::from("out"),
            source: io::Error::other("denied"),
        };
        assert_eq!(err.to_string(), "Failed to create directory out: denied");
    }
}
