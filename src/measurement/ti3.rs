//! Measurement extraction from `dispread` `.ti3` files

use std::path::Path;

use crate::config::PatchCounts;
use crate::domain::patches::MeasurementSet;
use crate::measurement::cgats::{CgatsDocument, CgatsError};

const RGB_FIELDS: [&str; 3] = ["RGB_R", "RGB_G", "RGB_B"];
const LUMINANCE_FIELD: &str = "XYZ_Y";

/// Classifies every complete row of a `.ti3` document into channel samples
///
/// Rows with fewer cells than the highest column needed are skipped, as are
/// mixed-colour patches and patch kinds that were not requested.
pub fn extract_measurements(
    doc: &CgatsDocument,
    patches: &PatchCounts,
) -> Result<MeasurementSet, CgatsError> {
    let rgb_columns = [
        doc.column(RGB_FIELDS[0])?,
        doc.column(RGB_FIELDS[1])?,
        doc.column(RGB_FIELDS[2])?,
    ];
    let luminance_column = doc.column(LUMINANCE_FIELD)?;
    let needed = rgb_columns
        .iter()
        .copied()
        .chain(std::iter::once(luminance_column))
        .max()
        .unwrap_or(0)
        + 1;

    let mut set = MeasurementSet::default();
    let mut skipped = 0usize;

    for (row, cells) in doc.rows.iter().enumerate() {
        if cells.len() < needed {
            skipped += 1;
            continue;
        }

        let rgb = [
            doc.number(row, rgb_columns[0])?,
            doc.number(row, rgb_columns[1])?,
            doc.number(row, rgb_columns[2])?,
        ];
        let luminance = doc.number(row, luminance_column)?;

        if set
            .record(rgb, luminance, patches.include_gray(), patches.include_color())
            .is_none()
        {
            skipped += 1;
        }
    }

    tracing::debug!(
        recorded = set.total(),
        skipped,
        "Extracted measurements from {} rows",
        doc.rows.len()
    );

    Ok(set)
}

/// Loads a `.ti3` file and extracts its measurements
pub fn load_measurements(path: &Path, patches: &PatchCounts) -> Result<MeasurementSet, CgatsError> {
    let doc = CgatsDocument::load(path)?;
    extract_measurements(&doc, patches)
}
