use crate::error::{BatchError, BatchResult};
use crate::query_set::lowercase_extension;
use rust_xlsxwriter::Workbook;
use std::path::Path;
use tracing::{info, warn};

/// Header of the column holding completion text
pub const RESPONSE_COLUMN: &str = "response";

/// Excel refuses cells longer than this many characters
const MAX_XLSX_CELL_CHARS: usize = 32_767;

/// One query paired with the text the provider returned for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseRecord {
    pub query: String,
    pub response: String,
}

impl ResponseRecord {
    pub fn new(query: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            response: response.into(),
        }
    }
}

/// Ordered (query, response) pairs produced by one worker invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseSet {
    key_name: String,
    records: Vec<ResponseRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Xlsx,
    Csv,
}

impl ResponseSet {
    /// `key_name` becomes the header of the query column when stored
    pub fn new(key_name: impl Into<String>, records: Vec<ResponseRecord>) -> Self {
        Self {
            key_name: key_name.into(),
            records,
        }
    }

    #[must_use]
    pub fn key_name(&self) -> &str {
        &self.key_name
    }

    #[must_use]
    pub fn records(&self) -> &[ResponseRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResponseRecord> + '_ {
        self.records.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Write a header row plus one row per record, replacing any existing file
    ///
    /// The format follows the extension: `xlsx` or `csv`.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::Write`] if the extension is unsupported or the
    /// file cannot be written
    pub fn store_to(&self, path: impl AsRef<Path>) -> BatchResult<()> {
        let path = path.as_ref();
        let format = match lowercase_extension(path).as_deref() {
            Some("xlsx") => OutputFormat::Xlsx,
            Some("csv") => OutputFormat::Csv,
            _ => {
                return Err(BatchError::Write(format!(
                    "Unsupported output format for '{}': expected xlsx or csv",
                    path.display()
                )))
            }
        };

        match format {
            OutputFormat::Xlsx => self.write_xlsx(path)?,
            OutputFormat::Csv => self.write_csv(path)?,
        }

        info!("Wrote {} rows to {}", self.records.len(), path.display());
        Ok(())
    }

    fn write_xlsx(&self, path: &Path) -> BatchResult<()> {
        let write_err =
            |e: rust_xlsxwriter::XlsxError| BatchError::Write(format!("{}: {e}", path.display()));

        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, &self.key_name).map_err(write_err)?;
        sheet.write_string(0, 1, RESPONSE_COLUMN).map_err(write_err)?;

        for (index, record) in self.records.iter().enumerate() {
            let row = u32::try_from(index + 1).map_err(|_| {
                BatchError::Write(format!("Too many rows for {}", path.display()))
            })?;
            for (col, text) in [(0, &record.query), (1, &record.response)] {
                let cell = match clip_cell(text) {
                    Some(clipped) => {
                        warn!(
                            "Row {index} column {col} of {} cut to {MAX_XLSX_CELL_CHARS} characters",
                            path.display()
                        );
                        clipped
                    }
                    None => text.as_str(),
                };
                sheet.write_string(row, col, cell).map_err(write_err)?;
            }
        }

        workbook.save(path).map_err(write_err)
    }

    fn write_csv(&self, path: &Path) -> BatchResult<()> {
        let write_err = |e: csv::Error| BatchError::Write(format!("{}: {e}", path.display()));

        let mut writer = csv::Writer::from_path(path).map_err(write_err)?;
        writer
            .write_record([self.key_name.as_str(), RESPONSE_COLUMN])
            .map_err(write_err)?;
        for record in &self.records {
            writer
                .write_record([record.query.as_str(), record.response.as_str()])
                .map_err(write_err)?;
        }
        writer
            .flush()
            .map_err(|e| BatchError::Write(format!("{}: {e}", path.display())))
    }
}

/// `Some(prefix)` when `text` is too long for one xlsx cell
fn clip_cell(text: &str) -> Option<&str> {
    text.char_indices()
        .nth(MAX_XLSX_CELL_CHARS)
        .map(|(end, _)| &text[..end])
}

impl<'a> IntoIterator for &'a ResponseSet {
    type Item = &'a ResponseRecord;
    type IntoIter = std::slice::Iter<'a, ResponseRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
