//! Command-line interface definition

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::CalibrationConfig;
use crate::display::Backend;

/// Measure, build and apply display gamma correction tables
#[derive(Parser, Debug)]
#[command(name = "gamma-calib")]
#[command(about = "Display gamma calibration with ArgyllCMS", version)]
pub struct Cli {
    /// Directory containing the ArgyllCMS executables (defaults to PATH)
    #[arg(long, global = true)]
    pub argyll_dir: Option<PathBuf>,

    /// Enable debug logging (RUST_LOG overrides this)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the displays available for calibration
    Displays {
        /// Where to enumerate displays from
        #[arg(long, value_enum)]
        backend: Option<Backend>,
    },

    /// Apply a gamma table, then restore the original table
    Apply {
        /// Gamma table text file (rows of R G B values in [0, 1])
        table: PathBuf,

        /// Display number (as listed by `displays`)
        #[arg(short, long, default_value_t = 1)]
        display: usize,

        /// How to reach the display's gamma table
        #[arg(long, value_enum)]
        backend: Option<Backend>,

        /// Keep the table active for this many seconds instead of waiting for Enter
        #[arg(long)]
        hold_secs: Option<u64>,
    },

    /// Run the interactive measurement and calibration workflow
    Calibrate {
        /// Base name for the calibration files
        #[arg(long)]
        base_name: Option<String>,

        /// Display number to measure
        #[arg(short, long)]
        display: Option<usize>,

        /// Number of grayscale patches
        #[arg(long)]
        gray: Option<u32>,

        /// Number of single-channel patches per channel
        #[arg(long)]
        color: Option<u32>,

        /// Rows in the generated gamma tables
        #[arg(long, default_value_t = CalibrationConfig::DEFAULT_TABLE_SIZE)]
        table_size: usize,

        /// Directory in which the run directory is created
        #[arg(long, default_value = ".")]
        output_root: PathBuf,

        /// TrueType/OpenType font used for plot text
        #[arg(long)]
        font: Option<PathBuf>,
    },

    /// Build gamma tables and a plot from an existing .ti3 measurement file
    Fit {
        /// Measurement file written by dispread
        ti3: PathBuf,

        /// Base name for the output files
        #[arg(long)]
        base_name: String,

        /// Display number used in output names
        #[arg(short, long, default_value_t = 1)]
        display: usize,

        /// Use grayscale patches (both kinds are used when neither flag is given)
        #[arg(long)]
        gray: bool,

        /// Use single-channel patches
        #[arg(long)]
        color: bool,

        /// Rows in the generated gamma tables
        #[arg(long, default_value_t = CalibrationConfig::DEFAULT_TABLE_SIZE)]
        table_size: usize,

        /// Directory in which the run directory is created
        #[arg(long, default_value = ".")]
        output_root: PathBuf,

        /// TrueType/OpenType font used for plot text
        #[arg(long)]
        font: Option<PathBuf>,
    },
}
