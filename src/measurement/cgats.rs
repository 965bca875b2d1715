//! CGATS text files as written by ArgyllCMS
//!
//! Only the first table of a file is read. Field names come from the
//! `BEGIN_DATA_FORMAT` block and rows from the `BEGIN_DATA` block.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CgatsError {
    #[error("Missing {0} section")]
    MissingSection(&'static str),
    #[error("Missing field {0}")]
    MissingField(String),
    #[error("Row {row}, field {field}: '{token}' is not a number")]
    InvalidNumber {
        row: usize,
        field: String,
        token: String,
    },
    #[error("Failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Header lines that describe the file layout rather than its content
const STRUCTURAL_KEYWORDS: [&str; 3] = ["KEYWORD", "NUMBER_OF_FIELDS", "NUMBER_OF_SETS"];

/// Header keywords defined by CGATS.17; any other keyword must be declared
const STANDARD_KEYWORDS: [&str; 12] = [
    "ORIGINATOR",
    "DESCRIPTOR",
    "CREATED",
    "MANUFACTURER",
    "MANUFACTURE",
    "PROD_DATE",
    "SERIAL",
    "MATERIAL",
    "INSTRUMENTATION",
    "MEASUREMENT_SOURCE",
    "PRINT_CONDITIONS",
    "SAMPLE_BACKING",
];

/// Data fields defined by CGATS.17
const STANDARD_FIELDS: [&str; 20] = [
    "SAMPLE_ID",
    "SAMPLE_NAME",
    "SAMPLE_LOC",
    "STRING",
    "RGB_R",
    "RGB_G",
    "RGB_B",
    "CMYK_C",
    "CMYK_M",
    "CMYK_Y",
    "CMYK_K",
    "XYZ_X",
    "XYZ_Y",
    "XYZ_Z",
    "XYY_X",
    "XYY_Y",
    "XYY_CAPY",
    "LAB_L",
    "LAB_A",
    "LAB_B",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Header,
    Format,
    BetweenBlocks,
    Data,
    Done,
}

/// One parsed CGATS table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CgatsDocument {
    /// File identifier on the first line (`CTI3`, `CAL`, ...)
    pub identifier: String,
    /// Keyword/value pairs preceding the data format block
    pub keywords: Vec<(String, String)>,
    pub fields: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl CgatsDocument {
    pub fn new(identifier: &str) -> Self {
        Self {
            identifier: identifier.to_string(),
            ..Default::default()
        }
    }

    pub fn parse(text: &str) -> Result<Self, CgatsError> {
        let mut doc = CgatsDocument::default();
        let mut section = Section::Header;
        let mut saw_format = false;
        let mut saw_data = false;

        for line in text.lines() {
            let line = line.trim();

            match (section, line) {
                (_, "BEGIN_DATA_FORMAT") if section != Section::Data => {
                    section = Section::Format;
                    saw_format = true;
                }
                (Section::Format, "END_DATA_FORMAT") => section = Section::BetweenBlocks,
                (Section::Format, fields) => {
                    doc.fields.extend(fields.split_whitespace().map(str::to_string));
                }
                (Section::BetweenBlocks, "BEGIN_DATA") => {
                    section = Section::Data;
                    saw_data = true;
                }
                (Section::Data, "END_DATA") => {
                    section = Section::Done;
                    break;
                }
                (Section::Data, row) => {
                    if !row.is_empty() {
                        doc.rows.push(row.split_whitespace().map(str::to_string).collect());
                    }
                }
                (Section::Header, "") | (Section::BetweenBlocks, "") => {}
                (Section::Header, header) => {
                    if doc.identifier.is_empty() {
                        doc.identifier = header.to_string();
                    } else if let Some((key, value)) = header.split_once(char::is_whitespace) {
                        if STRUCTURAL_KEYWORDS.contains(&key) {
                            continue;
                        }
                        doc.keywords
                            .push((key.to_string(), value.trim().trim_matches('"').to_string()));
                    }
                }
                _ => {}
            }
        }

        if !saw_format {
            return Err(CgatsError::MissingSection("BEGIN_DATA_FORMAT"));
        }
        if section == Section::Format {
            return Err(CgatsError::MissingSection("END_DATA_FORMAT"));
        }
        if !saw_data {
            return Err(CgatsError::MissingSection("BEGIN_DATA"));
        }
        if section != Section::Done {
            return Err(CgatsError::MissingSection("END_DATA"));
        }

        Ok(doc)
    }

    pub fn load(path: &Path) -> Result<Self, CgatsError> {
        let text = std::fs::read_to_string(path).map_err(|source| CgatsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    pub fn keyword(&self, key: &str) -> Option<&str> {
        self.keywords
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Index of a field in each data row
    pub fn column(&self, field: &str) -> Result<usize, CgatsError> {
        self.fields
            .iter()
            .position(|f| f == field)
            .ok_or_else(|| CgatsError::MissingField(field.to_string()))
    }

    /// Parses a numeric cell
    pub fn number(&self, row: usize, column: usize) -> Result<f64, CgatsError> {
        let token = self
            .rows
            .get(row)
            .and_then(|cells| cells.get(column))
            .map_or("", String::as_str);
        token.parse::<f64>().map_err(|_| CgatsError::InvalidNumber {
            row,
            field: self.fields.get(column).cloned().unwrap_or_default(),
            token: token.to_string(),
        })
    }

    /// Writes the document, declaring non-standard keywords and fields
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}\n", self.identifier);
        for (key, value) in &self.keywords {
            if !STANDARD_KEYWORDS.contains(&key.as_str()) {
                let _ = writeln!(out, "KEYWORD \"{key}\"");
            }
            let _ = writeln!(out, "{key} \"{value}\"");
        }
        let _ = writeln!(out);
        for field in &self.fields {
            if !STANDARD_FIELDS.contains(&field.as_str()) {
                let _ = writeln!(out, "KEYWORD \"{field}\"");
            }
        }
        let _ = writeln!(out, "NUMBER_OF_FIELDS {}", self.fields.len());
        let _ = writeln!(out, "BEGIN_DATA_FORMAT");
        let _ = writeln!(out, "{}", self.fields.join(" "));
        let _ = writeln!(out, "END_DATA_FORMAT\n");
        let _ = writeln!(out, "NUMBER_OF_SETS {}", self.rows.len());
        let _ = writeln!(out, "BEGIN_DATA");
        for row in &self.rows {
            let _ = writeln!(out, "{}", row.join(" "));
        }
        let _ = writeln!(out, "END_DATA");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "CTI3\n\
\n\
DESCRIPTOR \"Argyll Calibration Target chart information 3\"\n\
ORIGINATOR \"Argyll dispread\"\n\
\n\
NUMBER_OF_FIELDS 7\n\
BEGIN_DATA_FORMAT\n\
SAMPLE_ID RGB_R RGB_G RGB_B\n\
XYZ_X XYZ_Y XYZ_Z\n\
END_DATA_FORMAT\n\
\n\
NUMBER_OF_SETS 2\n\
BEGIN_DATA\n\
1 100.00 100.00 100.00 95.0 100.0 108.0\n\
2 0.0000 0.0000 0.0000 0.20 0.21 0.23\n\
END_DATA\n\
\n\
CAL\n\
BEGIN_DATA_FORMAT\n\
RGB_I RGB_R RGB_G RGB_B\n\
END_DATA_FORMAT\n\
BEGIN_DATA\n\
0 0 0 0\n\
END_DATA\n";

    #[test]
    fn parses_first_table() {
        let doc = CgatsDocument::parse(SAMPLE).unwrap();

        assert_eq!(doc.identifier, "CTI3");
        assert_eq!(doc.keyword("ORIGINATOR"), Some("Argyll dispread"));
        assert_eq!(doc.fields.len(), 7);
        assert_eq!(doc.column("XYZ_Y").unwrap(), 5);
        assert_eq!(doc.rows.len(), 2);
        assert_eq!(doc.number(0, 5).unwrap(), 100.0);
    }

    #[test]
    fn reports_missing_sections_and_fields() {
        assert!(matches!(
            CgatsDocument::parse("CTI3\n"),
            Err(CgatsError::MissingSection("BEGIN_DATA_FORMAT"))
        ));
        assert!(matches!(
            CgatsDocument::parse("CTI3\nBEGIN_DATA_FORMAT\nA\nEND_DATA_FORMAT\nBEGIN_DATA\n1\n"),
            Err(CgatsError::MissingSection("END_DATA"))
        ));

        let doc = CgatsDocument::parse(SAMPLE).unwrap();
        assert!(matches!(doc.column("LAB_L"), Err(CgatsError::MissingField(_))));
    }

    #[test]
    fn written_document_parses_back() {
        let mut doc = CgatsDocument::new("CAL");
        doc.keywords.push(("DEVICE_CLASS".into(), "DISPLAY".into()));
        doc.fields = vec!["RGB_I".into(), "RGB_R".into()];
        doc.rows = vec![vec!["0.0".into(), "0.0".into()], vec!["1.0".into(), "1.0".into()]];

        let parsed = CgatsDocument::parse(&doc.to_text()).unwrap();
        assert_eq!(parsed, doc);
    }

    #[test]
    fn declares_non_standard_keywords_and_fields() {
        let mut doc = CgatsDocument::new("CAL");
        doc.keywords.push(("DESCRIPTOR".into(), "test".into()));
        doc.keywords.push(("COLOR_REP".into(), "RGB".into()));
        doc.fields = vec!["RGB_I".into(), "RGB_R".into()];

        let text = doc.to_text();
        let lines: Vec<&str> = text.lines().collect();
        assert!(!text.contains("KEYWORD \"DESCRIPTOR\""));
        assert!(!text.contains("KEYWORD \"RGB_R\""));

        let color_rep = lines.iter().position(|l| *l == "COLOR_REP \"RGB\"").unwrap();
        assert_eq!(lines[color_rep - 1], "KEYWORD \"COLOR_REP\"");
        let fields = lines.iter().position(|l| l.starts_with("NUMBER_OF_FIELDS")).unwrap();
        assert_eq!(lines[fields - 1], "KEYWORD \"RGB_I\"");
    }
}
