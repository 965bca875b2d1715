//! ArgyllCMS `.cal` calibration files
//!
//! `dispwin` loads and saves the display's video LUT in this format: one
//! row per input level with `RGB_I` followed by the three channel outputs.

use crate::domain::table::{CHANNELS, GammaTable, TableError};
use crate::measurement::cgats::{CgatsDocument, CgatsError};

const INPUT_FIELD: &str = "RGB_I";
const OUTPUT_FIELDS: [&str; CHANNELS] = ["RGB_R", "RGB_G", "RGB_B"];

#[derive(Debug, thiserror::Error)]
pub enum CalError {
    #[error("Not a calibration file (identifier '{0}')")]
    NotCalibration(String),
    #[error("Calibration is for a {0} device, not a display")]
    NotDisplay(String),
    #[error(transparent)]
    Cgats(#[from] CgatsError),
    #[error(transparent)]
    Table(#[from] TableError),
}

/// Converts a gamma table into a display `.cal` document
pub fn table_to_cal(table: &GammaTable) -> CgatsDocument {
    let mut doc = CgatsDocument::new("CAL");
    doc.keywords = vec![
        ("DESCRIPTOR".into(), "Argyll Device Calibration State".into()),
        ("ORIGINATOR".into(), "gamma-calib".into()),
        ("DEVICE_CLASS".into(), "DISPLAY".into()),
        ("COLOR_REP".into(), "RGB".into()),
    ];
    doc.fields = std::iter::once(INPUT_FIELD)
        .chain(OUTPUT_FIELDS)
        .map(str::to_string)
        .collect();

    let last = (table.len() - 1) as f64;
    doc.rows = table
        .rows()
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let mut cells = vec![format!("{:.6}", i as f64 / last)];
            cells.extend(row.iter().map(|v| format!("{v:.6}")));
            cells
        })
        .collect();
    doc
}

/// Reads the per-channel outputs of a `.cal` document into a gamma table
pub fn table_from_cal(doc: &CgatsDocument) -> Result<GammaTable, CalError> {
    if doc.identifier != "CAL" {
        return Err(CalError::NotCalibration(doc.identifier.clone()));
    }
    match doc.keyword("DEVICE_CLASS") {
        Some(class) if class != "DISPLAY" => return Err(CalError::NotDisplay(class.to_string())),
        _ => {}
    }

    let columns = [
        doc.column(OUTPUT_FIELDS[0])?,
        doc.column(OUTPUT_FIELDS[1])?,
        doc.column(OUTPUT_FIELDS[2])?,
    ];

    let mut rows = Vec::with_capacity(doc.rows.len());
    for row in 0..doc.rows.len() {
        rows.push([
            doc.number(row, columns[0])?,
            doc.number(row, columns[1])?,
            doc.number(row, columns[2])?,
        ]);
    }

    Ok(GammaTable::from_rows(rows)?)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Header of a calibration saved with `dispwin -d1 -s`, trailing spaces included
    pub(crate) const DISPWIN_HEADER: &str = "CAL    \n\
\n\
DESCRIPTOR \"Argyll Device Calibration State\"\n\
ORIGINATOR \"Argyll dispwin\"\n\
CREATED \"Mon Oct 19 09:41:27 2026\"\n\
KEYWORD \"DEVICE_CLASS\"\n\
DEVICE_CLASS \"DISPLAY\"\n\
KEYWORD \"COLOR_REP\"\n\
COLOR_REP \"RGB\"\n\
\n\
KEYWORD \"RGB_I\"\n\
NUMBER_OF_FIELDS 4\n\
BEGIN_DATA_FORMAT\n\
RGB_I RGB_R RGB_G RGB_B \n\
END_DATA_FORMAT\n\
\n";

    /// Writes `table` the way `dispwin -s` does
    pub(crate) fn dispwin_cal_text(table: &GammaTable) -> String {
        let mut text = String::from(DISPWIN_HEADER);
        text.push_str(&format!("NUMBER_OF_SETS {}\nBEGIN_DATA\n", table.len()));
        let last = (table.len() - 1) as f64;
        for (i, row) in table.rows().iter().enumerate() {
            text.push_str(&format!(
                "{:.5} {:.5} {:.5} {:.5} \n",
                i as f64 / last,
                row[0],
                row[1],
                row[2]
            ));
        }
        text.push_str("END_DATA\n");
        text
    }

    /// Layout lines up to the data block, ignoring who wrote the file and when
    fn header_lines(text: &str) -> Vec<&str> {
        text.lines()
            .map(str::trim_end)
            .take_while(|line| !line.starts_with("NUMBER_OF_SETS"))
            .filter(|line| !line.starts_with("ORIGINATOR") && !line.starts_with("CREATED"))
            .collect()
    }

    #[test]
    fn header_matches_dispwin_output() {
        let ours = table_to_cal(&GammaTable::identity(4)).to_text();
        assert_eq!(header_lines(&ours), header_lines(DISPWIN_HEADER));
    }

    #[test]
    fn reads_dispwin_saved_calibration() {
        let table = crate::domain::fit::correction_table([2.2, 2.2, 2.2], 256).unwrap();
        let doc = CgatsDocument::parse(&dispwin_cal_text(&table)).unwrap();

        assert_eq!(doc.keyword("COLOR_REP"), Some("RGB"));
        let back = table_from_cal(&doc).unwrap();
        assert_eq!(back.len(), 256);
        assert!(table.max_deviation(&back) < 1e-5);
    }

    #[test]
    fn rejects_other_device_classes() {
        let mut doc = table_to_cal(&GammaTable::identity(4));
        doc.keywords[2].1 = "OUTPUT".into();
        assert!(matches!(table_from_cal(&doc), Err(CalError::NotDisplay(class)) if class == "OUTPUT"));
    }

    #[test]
    fn calibration_document_layout() {
        let doc = table_to_cal(&GammaTable::identity(3));

        assert_eq!(doc.identifier, "CAL");
        assert_eq!(doc.keyword("DEVICE_CLASS"), Some("DISPLAY"));
        assert_eq!(doc.fields, vec!["RGB_I", "RGB_R", "RGB_G", "RGB_B"]);
        assert_eq!(doc.rows[1], vec!["0.500000", "0.500000", "0.500000", "0.500000"]);
    }

    #[test]
    fn table_survives_cal_file() {
        let table = crate::domain::fit::correction_table([2.2, 2.0, 1.8], 64).unwrap();
        let text = table_to_cal(&table).to_text();
        let back = table_from_cal(&CgatsDocument::parse(&text).unwrap()).unwrap();

        assert_eq!(back.len(), 64);
        assert!(table.max_deviation(&back) < 1e-6);
    }

    #[test]
    fn rejects_other_documents() {
        let doc = CgatsDocument::new("CTI3");
        assert!(matches!(table_from_cal(&doc), Err(CalError::NotCalibration(_))));
    }
}
