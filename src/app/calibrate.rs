//! Calibration workflow
//!
//! Drives ArgyllCMS through patch generation, linearisation and measurement,
//! then fits per-channel gamma and writes the correction tables and plot.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use crate::app::controller::AppError;
use crate::config::{CalibrationConfig, PatchCounts};
use crate::domain::fit::{GammaEstimates, TableKind};
use crate::domain::patches::MeasurementSet;
use crate::measurement::ti3::load_measurements;
use crate::platform::argyll::{Argyll, CommandRunner};
use crate::ui::plot::{PlotLayout, PlotRenderer, PlotStyle};
use crate::ui::prompt::{PromptError, Prompter};

/// Values supplied up front; anything missing is prompted for
#[derive(Debug, Clone, Default)]
pub struct CalibrationRequest {
    pub base_name: Option<String>,
    pub display: Option<usize>,
    pub gray: Option<u32>,
    pub color: Option<u32>,
    pub table_size: usize,
    pub output_root: PathBuf,
    pub font: Option<PathBuf>,
}

/// Files and estimates produced by a calibration
#[derive(Debug, Clone)]
pub struct CalibrationReport {
    pub estimates: GammaEstimates,
    pub tables: Vec<(TableKind, PathBuf)>,
    pub plot: Option<PathBuf>,
    pub samples: usize,
}

pub struct CalibrationWorkflow<R: CommandRunner> {
    argyll: Argyll<R>,
}

impl<R: CommandRunner> CalibrationWorkflow<R> {
    pub fn new(argyll: Argyll<R>) -> Self {
        Self { argyll }
    }

    pub fn argyll(&self) -> &Argyll<R> {
        &self.argyll
    }

    /// Resolves the configuration, prompting for anything not in `request`
    pub fn configure<I: BufRead, W: Write>(
        &mut self,
        request: &CalibrationRequest,
        prompter: &mut Prompter<I, W>,
    ) -> Result<CalibrationConfig, AppError> {
        let base_name = match &request.base_name {
            Some(name) => name.clone(),
            None => prompter.base_name()?,
        };

        let display = match request.display {
            Some(display) => display,
            None => {
                let displays = self.argyll.list_displays()?;
                if displays.is_empty() {
                    return Err(PromptError::NoDisplays.into());
                }
                prompter.select_display(&displays)?
            }
        };

        let patches = match (request.gray, request.color) {
            (Some(gray), Some(color)) => PatchCounts::new(gray, color)?,
            (gray, color) => prompter.patch_counts(gray, color)?,
        };

        Ok(CalibrationConfig::new(&base_name, display, patches)?
            .with_table_size(request.table_size)
            .with_output_root(&request.output_root)
            .with_font(request.font.clone()))
    }

    /// Runs the full measurement workflow
    pub fn run<I: BufRead, W: Write>(
        &mut self,
        request: &CalibrationRequest,
        prompter: &mut Prompter<I, W>,
    ) -> Result<CalibrationReport, AppError> {
        let config = self.configure(request, prompter)?;
        let output_dir = config.output_dir();
        create_dir(&output_dir)?;
        tracing::info!(dir = %output_dir.display(), "Writing calibration files");

        let run_name = config.run_name();
        self.argyll.work_in(&output_dir);
        self.argyll.generate_patches(&run_name, &config.patches)?;
        self.argyll.reset_display(config.display)?;
        self.argyll.measure_patches(config.display, &run_name)?;

        process_measurements(&config, &config.ti3_path())
    }
}

fn create_dir(path: &Path) -> Result<(), AppError> {
    std::fs::create_dir_all(path).map_err(|source| AppError::CreateDir {
        path: path.to_path_buf(),
        source,
    })
}

/// Fits gamma to a `.ti3` file and writes tables and plot into the run directory
pub fn process_measurements(
    config: &CalibrationConfig,
    ti3_path: &Path,
) -> Result<CalibrationReport, AppError> {
    let measurements = load_measurements(ti3_path, &config.patches)?;
    let estimates = GammaEstimates::from_measurements(&measurements);

    println!("\nCalculated gamma values:");
    for (label, gamma) in [
        ("Red channel", estimates.red),
        ("Green channel", estimates.green),
        ("Blue channel", estimates.blue),
        ("Grayscale", estimates.gray),
    ] {
        if let Some(gamma) = gamma {
            println!("{label} gamma: {gamma:.4}");
        }
    }
    if estimates.is_empty() {
        tracing::warn!(
            samples = measurements.total(),
            "Not enough usable measurements to estimate any gamma"
        );
    }

    let output_dir = config.output_dir();
    create_dir(&output_dir)?;

    println!("\n=== Generating Gamma Tables ===");
    let mut tables = Vec::new();
    for (kind, table) in estimates.correction_tables(config.table_size)? {
        let path = config.table_path(kind);
        table.save(&path)?;
        println!(
            "{} gamma table saved to {}",
            match kind {
                TableKind::Rgb => "RGB",
                TableKind::Gray => "Grayscale",
            },
            path.display()
        );
        tables.push((kind, path));
    }

    let plot = plot_curves(config, &measurements, &estimates)?;

    Ok(CalibrationReport {
        estimates,
        tables,
        plot,
        samples: measurements.total(),
    })
}

fn plot_curves(
    config: &CalibrationConfig,
    measurements: &MeasurementSet,
    estimates: &GammaEstimates,
) -> Result<Option<PathBuf>, AppError> {
    println!("\n=== Plotting Gamma Curves ===");
    let Some(layout) = PlotLayout::new(measurements, estimates, &PlotStyle::default()) else {
        return Ok(None);
    };
    if layout.series.is_empty() {
        tracing::warn!("No measured data to plot");
        return Ok(None);
    }

    let renderer = match &config.font_path {
        Some(font) => PlotRenderer::with_font_file(font).unwrap_or_else(|err| {
            tracing::warn!("Plot text disabled: {}", err);
            PlotRenderer::new()
        }),
        None => PlotRenderer::new(),
    };
    if !renderer.has_font() {
        tracing::info!("No font loaded; the plot is drawn without labels");
    }

    let path = config.plot_path();
    renderer.save_png(&layout, &path)?;
    println!("Gamma curve plot saved to {}", path.display());
    Ok(Some(path))
}
