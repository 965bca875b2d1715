use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::domain::fit::TableKind;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("At least one of grayscale or color patches must be greater than zero")]
    NoPatches,
    #[error("Invalid base name '{0}': must be non-empty and contain no path separators")]
    InvalidBaseName(String),
    #[error("Display numbers start at 1, got {0}")]
    InvalidDisplay(usize),
}

/// Number of test patches to generate and measure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchCounts {
    pub gray: u32,
    pub color: u32,
}

impl PatchCounts {
    pub fn new(gray: u32, color: u32) -> Result<Self, ConfigError> {
        if gray == 0 && color == 0 {
            return Err(ConfigError::NoPatches);
        }
        Ok(Self { gray, color })
    }

    pub fn include_gray(&self) -> bool {
        self.gray > 0
    }

    /// Single-channel patches are generated per channel
    pub fn include_color(&self) -> bool {
        self.color > 0
    }
}

/// Settings for one calibration run
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationConfig {
    pub base_name: String,
    /// Display number as reported by `dispwin` (starting at 1)
    pub display: usize,
    pub patches: PatchCounts,
    pub table_size: usize,
    /// Directory in which the run directory is created
    pub output_root: PathBuf,
    /// Font used for plot text; text is skipped without one
    pub font_path: Option<PathBuf>,
}

impl CalibrationConfig {
    pub const DEFAULT_TABLE_SIZE: usize = 256;
    pub const MIN_TABLE_SIZE: usize = 2;
    pub const MAX_TABLE_SIZE: usize = 65536;

    pub fn new(base_name: &str, display: usize, patches: PatchCounts) -> Result<Self, ConfigError> {
        Ok(Self {
            base_name: validate_base_name(base_name)?,
            display: validate_display(display)?,
            patches,
            table_size: Self::DEFAULT_TABLE_SIZE,
            output_root: PathBuf::from("."),
            font_path: None,
        })
    }

    pub fn sanitize_table_size(value: usize) -> usize {
        value.clamp(Self::MIN_TABLE_SIZE, Self::MAX_TABLE_SIZE)
    }

    pub fn with_table_size(mut self, size: usize) -> Self {
        self.table_size = Self::sanitize_table_size(size);
        self
    }

    pub fn with_output_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.output_root = root.into();
        self
    }

    pub fn with_font(mut self, font: Option<PathBuf>) -> Self {
        self.font_path = font;
        self
    }

    /// `<base>_monitor_<display>`, used for the directory and every file in it
    pub fn run_name(&self) -> String {
        format!("{}_monitor_{}", self.base_name, self.display)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.output_root.join(self.run_name())
    }

    pub fn ti3_path(&self) -> PathBuf {
        self.output_dir().join(format!("{}.ti3", self.run_name()))
    }

    pub fn table_path(&self, kind: TableKind) -> PathBuf {
        self.output_dir()
            .join(format!("{}_gamma_table_{}.txt", self.run_name(), kind.file_suffix()))
    }

    pub fn plot_path(&self) -> PathBuf {
        self.output_dir().join(format!("{}.png", self.run_name()))
    }
}

/// How long to keep an applied table active before restoring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hold {
    For(Duration),
    UntilEnter,
}

/// Settings for applying a table file to a display
#[derive(Debug, Clone, PartialEq)]
pub struct ApplyConfig {
    pub table_path: PathBuf,
    pub display: usize,
    pub hold: Hold,
}

impl ApplyConfig {
    pub const DEFAULT_DISPLAY: usize = 1;

    pub fn new(table_path: &Path, display: usize, hold_secs: Option<u64>) -> Result<Self, ConfigError> {
        Ok(Self {
            table_path: table_path.to_path_buf(),
            display: validate_display(display)?,
            hold: match hold_secs {
                Some(secs) => Hold::For(Duration::from_secs(secs)),
                None => Hold::UntilEnter,
            },
        })
    }
}

fn validate_base_name(name: &str) -> Result<String, ConfigError> {
    let trimmed = name.trim();
    if trimmed.is_empty() || trimmed.contains(['/', '\\']) || trimmed == "." || trimmed == ".." {
        return Err(ConfigError::InvalidBaseName(name.to_string()));
    }
    Ok(trimmed.to_string())
}

fn validate_display(display: usize) -> Result<usize, ConfigError> {
    if display == 0 {
        return Err(ConfigError::InvalidDisplay(display));
    }
    Ok(display)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_counts_need_one_kind() {
        assert_eq!(PatchCounts::new(0, 0), Err(ConfigError::NoPatches));

        let counts = PatchCounts::new(64, 0).unwrap();
        assert!(counts.include_gray());
        assert!(!counts.include_color());
    }

    #[test]
    fn derives_output_paths() {
        let config = CalibrationConfig::new(" calibration ", 2, PatchCounts::new(64, 64).unwrap())
            .unwrap()
            .with_output_root("/tmp/runs");

        assert_eq!(config.run_name(), "calibration_monitor_2");
        assert_eq!(config.output_dir(), PathBuf::from("/tmp/runs/calibration_monitor_2"));
        assert_eq!(
            config.ti3_path(),
            PathBuf::from("/tmp/runs/calibration_monitor_2/calibration_monitor_2.ti3")
        );
        assert_eq!(
            config.table_path(TableKind::Rgb),
            PathBuf::from("/tmp/runs/calibration_monitor_2/calibration_monitor_2_gamma_table_RGB.txt")
        );
        assert_eq!(
            config.plot_path().file_name().and_then(|n| n.to_str()),
            Some("calibration_monitor_2.png")
        );
    }

    #[test]
    fn rejects_bad_names_and_displays() {
        let counts = PatchCounts::new(1, 0).unwrap();
        assert!(CalibrationConfig::new("", 1, counts).is_err());
        assert!(CalibrationConfig::new("a/b", 1, counts).is_err());
        assert_eq!(
            CalibrationConfig::new("ok", 0, counts),
            Err(ConfigError::InvalidDisplay(0))
        );
    }

    #[test]
    fn table_size_is_clamped() {
        let config = CalibrationConfig::new("x", 1, PatchCounts::new(1, 0).unwrap())
            .unwrap()
            .with_table_size(1);
        assert_eq!(config.table_size, CalibrationConfig::MIN_TABLE_SIZE);
        assert_eq!(CalibrationConfig::sanitize_table_size(1024), 1024);
    }

    #[test]
    fn apply_hold_modes() {
        let timed = ApplyConfig::new(Path::new("t.txt"), 1, Some(5)).unwrap();
        assert_eq!(timed.hold, Hold::For(Duration::from_secs(5)));

        let manual = ApplyConfig::new(Path::new("t.txt"), 1, None).unwrap();
        assert_eq!(manual.hold, Hold::UntilEnter);
    }
}
