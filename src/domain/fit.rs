//! Gamma estimation and correction table generation
//!
//! Display response is modelled as `L = V^γ`. The exponent is the slope of a
//! least-squares line through `(ln V, ln L)`, and the correction table applies
//! the inverse curve `V^(1/γ)`.

use thiserror::Error;

use crate::domain::patches::{ChannelSamples, MeasurementSet};
use crate::domain::table::{CHANNELS, Channel, GammaTable, TableError};

#[derive(Debug, Error)]
pub enum FitError {
    #[error("Gamma {gamma} for {label} is not a positive finite number")]
    InvalidGamma { label: &'static str, gamma: f64 },
    #[error(transparent)]
    Table(#[from] TableError),
}

/// Result of a simple linear regression
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Regression {
    pub slope: f64,
    pub intercept: f64,
    pub r_value: f64,
}

/// Ordinary least-squares fit of `ys` against `xs`
///
/// Returns `None` with fewer than two points or when all `xs` are equal.
pub fn linear_regression(xs: &[f64], ys: &[f64]) -> Option<Regression> {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return None;
    }

    let (xs, ys) = (&xs[..n], &ys[..n]);
    let mean_x = xs.iter().sum::<f64>() / n as f64;
    let mean_y = ys.iter().sum::<f64>() / n as f64;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    let mut syy = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxx += dx * dx;
        sxy += dx * dy;
        syy += dy * dy;
    }

    if sxx == 0.0 {
        return None;
    }

    let slope = sxy / sxx;
    let r_value = if syy == 0.0 { 0.0 } else { sxy / (sxx * syy).sqrt() };

    Some(Regression {
        slope,
        intercept: mean_y - slope * mean_x,
        r_value,
    })
}

/// Estimates the display gamma from input levels and measured luminance
///
/// Luminance is normalised by its maximum and points with a non-positive
/// level or luminance are dropped before fitting in log-log space.
pub fn estimate_gamma(levels: &[f64], luminance: &[f64]) -> Option<f64> {
    let samples = ChannelSamples {
        levels: levels.to_vec(),
        luminance: luminance.to_vec(),
    };
    let normalized = samples.normalized_luminance()?;

    let (log_levels, log_luminance): (Vec<f64>, Vec<f64>) = levels
        .iter()
        .zip(normalized)
        .filter(|(v, l)| **v > 0.0 && *l > 0.0)
        .map(|(v, l)| (v.ln(), l.ln()))
        .unzip();

    if log_levels.len() < 2 {
        return None;
    }

    linear_regression(&log_levels, &log_luminance).map(|fit| fit.slope)
}

/// `size` evenly spaced values on `[0, 1]`
pub fn linspace(size: usize) -> Vec<f64> {
    match size {
        0 => Vec::new(),
        1 => vec![0.0],
        _ => {
            let last = (size - 1) as f64;
            (0..size).map(|i| i as f64 / last).collect()
        }
    }
}

fn check_gamma(label: &'static str, gamma: f64) -> Result<f64, FitError> {
    if gamma.is_finite() && gamma > 0.0 {
        Ok(gamma)
    } else {
        Err(FitError::InvalidGamma { label, gamma })
    }
}

/// Builds a correction table applying `V^(1/γ)` per channel
pub fn correction_table(gammas: [f64; CHANNELS], size: usize) -> Result<GammaTable, FitError> {
    let mut exponents = [0.0; CHANNELS];
    for channel in Channel::ALL {
        exponents[channel.index()] = 1.0 / check_gamma(channel.name(), gammas[channel.index()])?;
    }

    let rows = linspace(size.max(GammaTable::MIN_ROWS))
        .into_iter()
        .map(|v| {
            let mut row = [0.0; CHANNELS];
            for (value, exponent) in row.iter_mut().zip(exponents) {
                *value = v.powf(exponent).clamp(0.0, 1.0);
            }
            row
        })
        .collect();

    Ok(GammaTable::from_rows(rows)?)
}

/// Which correction table a file holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Rgb,
    Gray,
}

impl TableKind {
    pub fn file_suffix(self) -> &'static str {
        match self {
            TableKind::Rgb => "RGB",
            TableKind::Gray => "Gray",
        }
    }
}

/// Gamma estimates for every channel that had usable data
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GammaEstimates {
    pub red: Option<f64>,
    pub green: Option<f64>,
    pub blue: Option<f64>,
    pub gray: Option<f64>,
}

impl GammaEstimates {
    /// Fits every channel of a measurement set
    ///
    /// Estimates that are not positive and finite are discarded.
    pub fn from_measurements(set: &MeasurementSet) -> Self {
        let fit = |label: &'static str, samples: &ChannelSamples| {
            if samples.is_empty() {
                return None;
            }
            let gamma = estimate_gamma(&samples.levels, &samples.luminance)?;
            match check_gamma(label, gamma) {
                Ok(gamma) => Some(gamma),
                Err(err) => {
                    tracing::warn!("Discarding {} fit: {}", label, err);
                    None
                }
            }
        };

        Self {
            red: fit("Red", &set.red),
            green: fit("Green", &set.green),
            blue: fit("Blue", &set.blue),
            gray: fit("Grayscale", &set.gray),
        }
    }

    pub fn channel(&self, channel: Channel) -> Option<f64> {
        match channel {
            Channel::Red => self.red,
            Channel::Green => self.green,
            Channel::Blue => self.blue,
        }
    }

    /// All three channel gammas, when every one of them was fitted
    pub fn rgb(&self) -> Option<[f64; CHANNELS]> {
        Some([self.red?, self.green?, self.blue?])
    }

    pub fn is_empty(&self) -> bool {
        self.red.is_none() && self.green.is_none() && self.blue.is_none() && self.gray.is_none()
    }

    /// Builds the RGB and grey correction tables that the estimates allow
    pub fn correction_tables(&self, size: usize) -> Result<Vec<(TableKind, GammaTable)>, FitError> {
        let mut tables = Vec::new();
        if let Some(gammas) = self.rgb() {
            tables.push((TableKind::Rgb, correction_table(gammas, size)?));
        }
        if let Some(gray) = self.gray {
            tables.push((TableKind::Gray, correction_table([gray; CHANNELS], size)?));
        }
        Ok(tables)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synthetic(gamma: f64, count: usize, peak: f64) -> (Vec<f64>, Vec<f64>) {
        let levels = linspace(count);
        let luminance = levels.iter().map(|v| peak * v.powf(gamma)).collect();
        (levels, luminance)
    }

    #[test]
    fn regression_recovers_line() {
        let xs = [1.0, 2.0, 3.0, 4.0];
        let ys = [3.0, 5.0, 7.0, 9.0];
        let fit = linear_regression(&xs, &ys).unwrap();

        assert!((fit.slope - 2.0).abs() < 1e-12);
        assert!((fit.intercept - 1.0).abs() < 1e-12);
        assert!((fit.r_value - 1.0).abs() < 1e-12);
    }

    #[test]
    fn regression_needs_spread() {
        assert!(linear_regression(&[1.0], &[2.0]).is_none());
        assert!(linear_regression(&[1.0, 1.0], &[2.0, 3.0]).is_none());
    }

    #[test]
    fn estimates_synthetic_gamma() {
        let (levels, luminance) = synthetic(2.2, 17, 140.0);
        let gamma = estimate_gamma(&levels, &luminance).unwrap();
        assert!((gamma - 2.2).abs() < 1e-9, "got {gamma}");
    }

    #[test]
    fn estimate_needs_two_usable_points() {
        // The zero level is dropped, leaving one point
        assert!(estimate_gamma(&[0.0, 1.0], &[0.0, 100.0]).is_none());
        assert!(estimate_gamma(&[], &[]).is_none());
        assert!(estimate_gamma(&[0.5, 1.0], &[0.0, 0.0]).is_none());
    }

    #[test]
    fn correction_table_inverts_gamma() {
        let table = correction_table([2.0, 2.0, 2.0], 256).unwrap();
        assert_eq!(table.len(), 256);
        assert_eq!(table.rows()[0], [0.0; 3]);
        assert_eq!(table.rows()[255], [1.0; 3]);
        assert!(table.is_monotonic());

        let mid = table.rows()[64][0];
        assert!((mid - (64.0f64 / 255.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn correction_table_rejects_bad_gamma() {
        assert!(matches!(
            correction_table([2.2, 0.0, 2.2], 16),
            Err(FitError::InvalidGamma { label: "Green", .. })
        ));
    }

    #[test]
    fn estimates_produce_expected_tables() {
        let mut set = MeasurementSet::default();
        for step in 1..=8 {
            let device = step as f64 * 12.5;
            let v = device / 100.0;
            set.record([device, device, device], 100.0 * v.powf(2.4), true, true);
            set.record([device, 0.0, 0.0], 30.0 * v.powf(2.0), true, true);
            set.record([0.0, device, 0.0], 60.0 * v.powf(2.2), true, true);
        }

        let estimates = GammaEstimates::from_measurements(&set);
        assert!((estimates.gray.unwrap() - 2.4).abs() < 1e-9);
        assert!(estimates.blue.is_none());
        assert!(estimates.rgb().is_none());

        let tables = estimates.correction_tables(256).unwrap();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].0, TableKind::Gray);
    }
}
