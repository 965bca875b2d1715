//! Applying a gamma table for a bounded time

use std::io::Write;

use crate::app::controller::AppError;
use crate::display::{GammaDevice, GammaSession};
use crate::domain::table::GammaTable;

/// Applies `table` to `device`, runs `hold`, then restores the original table
///
/// # Arguments
/// * `device` - Display whose gamma table is replaced
/// * `table` - Table to apply
/// * `out` - Where status messages are printed
/// * `hold` - Runs while the table is active
///
/// # Returns
/// Whether the table was applied and verified. A refused table is not an
/// error; the original table is restored either way, and an error from
/// `hold` is returned only after restoring.
pub fn apply_table<D, W, F>(
    device: D,
    table: &GammaTable,
    out: &mut W,
    hold: F,
) -> Result<bool, AppError>
where
    D: GammaDevice,
    W: Write,
    F: FnOnce(&mut W) -> Result<(), AppError>,
{
    if let Some((row, channel)) = table.first_decrease() {
        tracing::warn!(
            row,
            channel = channel.name(),
            "Gamma table is not monotonically non-decreasing"
        );
    }

    let mut session = GammaSession::open(device)?;

    let applied = match session.apply(table) {
        Ok(applied) => applied,
        Err(err) => {
            tracing::error!("Loading gamma table failed: {}", err);
            false
        }
    };
    if applied {
        writeln!(out, "Gamma table applied successfully.")?;
    } else {
        writeln!(out, "Failed to apply gamma table.")?;
    }

    let held = hold(out);

    match session.close() {
        Ok(true) => {}
        Ok(false) => writeln!(out, "Failed to restore the original gamma table.")?,
        Err(err) => writeln!(out, "Failed to restore the original gamma table: {err}")?,
    }

    held.map(|()| applied)
}
