use crate::error::{BatchError, BatchResult};
use calamine::{open_workbook_auto, Data, Reader};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Column read from input files when no other key name is given
pub const DEFAULT_KEY_NAME: &str = "query";

/// Input file layouts understood by [`QuerySet::from_path`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputFormat {
    Delimited(u8),
    Spreadsheet,
}

impl InputFormat {
    fn from_path(path: &Path) -> BatchResult<Self> {
        match lowercase_extension(path).as_deref() {
            Some("csv") => Ok(Self::Delimited(b',')),
            Some("tsv") => Ok(Self::Delimited(b'\t')),
            Some("xlsx" | "xlsm" | "xls" | "ods") => Ok(Self::Spreadsheet),
            _ => Err(BatchError::Load(format!(
                "Unsupported input format for '{}': expected csv, tsv, xlsx, xlsm, xls or ods",
                path.display()
            ))),
        }
    }
}

/// Ordered, read-only list of queries
///
/// Cloning is cheap: the queries live behind an `Arc`, so a single set can be
/// handed to several workers running at the same time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySet {
    queries: Arc<[String]>,
}

impl QuerySet {
    /// Build a query set from an in-memory list, keeping its order
    pub fn from_list<I, S>(queries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            queries: queries.into_iter().map(Into::into).collect(),
        }
    }

    /// Load the `key_name` column of a csv, tsv or spreadsheet file
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::Load`] if the extension is unsupported, the file
    /// cannot be read or parsed, or no header matches `key_name`
    pub fn from_path(path: impl AsRef<Path>, key_name: &str) -> BatchResult<Self> {
        let path = path.as_ref();
        let format = InputFormat::from_path(path)?;
        debug!("Loading queries from {} as {:?}", path.display(), format);

        let queries = match format {
            InputFormat::Delimited(delimiter) => read_delimited(path, delimiter, key_name)?,
            InputFormat::Spreadsheet => read_spreadsheet(path, key_name)?,
        };

        info!(
            "Loaded {} queries from {} (column '{}')",
            queries.len(),
            path.display(),
            key_name
        );

        Ok(Self::from_list(queries))
    }

    /// Iterate over the queries in order; can be called any number of times
    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.queries.iter().map(String::as_str)
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&str> {
        self.queries.get(index).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.queries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for QuerySet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::from_list(iter)
    }
}

/// Lower-cased file extension, if any
pub(crate) fn lowercase_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
}

fn find_column<'a>(
    headers: impl IntoIterator<Item = &'a str>,
    key_name: &str,
    path: &Path,
) -> BatchResult<usize> {
    headers
        .into_iter()
        .position(|header| header.trim() == key_name)
        .ok_or_else(|| {
            BatchError::Load(format!(
                "Column '{key_name}' not found in {}",
                path.display()
            ))
        })
}

fn read_delimited(path: &Path, delimiter: u8, key_name: &str) -> BatchResult<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_path(path)
        .map_err(|e| BatchError::Load(format!("Failed to open {}: {e}", path.display())))?;

    let headers = reader
        .headers()
        .map_err(|e| BatchError::Load(format!("Failed to read header of {}: {e}", path.display())))?
        .clone();
    let column = find_column(headers.iter(), key_name, path)?;

    let mut queries = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record.map_err(|e| {
            BatchError::Load(format!(
                "Failed to read row {} of {}: {e}",
                row + 1,
                path.display()
            ))
        })?;
        // Short rows keep their slot so positions stay aligned with the file
        queries.push(record.get(column).unwrap_or_default().to_string());
    }

    Ok(queries)
}

fn read_spreadsheet(path: &Path, key_name: &str) -> BatchResult<Vec<String>> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| BatchError::Load(format!("Failed to open {}: {e}", path.display())))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| BatchError::Load(format!("{} contains no worksheets", path.display())))?
        .map_err(|e| BatchError::Load(format!("Failed to read {}: {e}", path.display())))?;

    let mut rows = range.rows();
    let header: Vec<String> = rows
        .next()
        .ok_or_else(|| BatchError::Load(format!("{} is empty", path.display())))?
        .iter()
        .map(cell_text)
        .collect();
    let column = find_column(header.iter().map(String::as_str), key_name, path)?;

    // Blank rows are skipped, as the csv reader skips blank lines
    Ok(rows
        .filter(|row| !row.iter().all(|cell| cell_text(cell).is_empty()))
        .map(|row| row.get(column).map(cell_text).unwrap_or_default())
        .collect())
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_file(dir: &TempDir, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_from_list_preserves_order() {
        let set = QuerySet::from_list(["b", "a", "c"]);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["b", "a", "c"]);
        assert_eq!(set.len(), 3);
        assert_eq!(set.get(1), Some("a"));
        assert_eq!(set.get(3), None);
    }

    #[test]
    fn test_iteration_is_restartable() {
        let set: QuerySet = vec!["one".to_string(), "two".to_string()].into_iter().collect();
        let first: Vec<_> = set.iter().collect();
        let second: Vec<_> = set.iter().collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_load_csv_default_column() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            &dir,
            "queries.csv",
            "id,query\n1,What is the capital of France?\n2,\"Hello, world\"\n3,What is 2+2?\n",
        );

        let set = QuerySet::from_path(&path, DEFAULT_KEY_NAME).unwrap();
        assert_eq!(
            set.iter().collect::<Vec<_>>(),
            vec![
                "What is the capital of France?",
                "Hello, world",
                "What is 2+2?"
            ]
        );
    }

    #[test]
    fn test_load_csv_custom_column_and_uppercase_extension() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "QUERIES.CSV", "prompt , other\nfirst,x\nsecond,y\n");

        let set = QuerySet::from_path(&path, "prompt").unwrap();
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["first", "second"]);
    }

    #[test]
    fn test_load_tsv() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "queries.tsv", "query\tnote\na, b\tx\nc\ty\n");

        let set = QuerySet::from_path(&path, "query").unwrap();
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["a, b", "c"]);
    }

    #[test]
    fn test_short_rows_keep_position() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "queries.csv", "id,query\n1,first\n2\n3,third\n");

        let set = QuerySet::from_path(&path, "query").unwrap();
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["first", "", "third"]);
    }

    #[test]
    fn test_missing_column_is_load_error() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "queries.csv", "question\nwhy?\n");

        let err = QuerySet::from_path(&path, "query").unwrap_err();
        assert!(matches!(err, BatchError::Load(ref msg) if msg.contains("'query'")));
    }

    #[test]
    fn test_unsupported_extension_is_load_error() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "queries.json", "[\"a\"]");

        let err = QuerySet::from_path(&path, "query").unwrap_err();
        assert!(matches!(err, BatchError::Load(_)));
    }

    #[test]
    fn test_missing_file_is_load_error() {
        let dir = TempDir::new().unwrap();
        let err = QuerySet::from_path(dir.path().join("absent.csv"), "query").unwrap_err();
        assert!(matches!(err, BatchError::Load(_)));
    }

    #[test]
    fn test_load_xlsx() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("queries.xlsx");

        let mut workbook = rust_xlsxwriter::Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "n").unwrap();
        sheet.write_string(0, 1, "query").unwrap();
        sheet.write_number(1, 0, 1).unwrap();
        sheet.write_string(1, 1, "Who painted the Mona Lisa?").unwrap();
        sheet.write_number(2, 0, 2).unwrap();
        sheet.write_number(2, 1, 42).unwrap();
        sheet.write_number(3, 0, 3).unwrap();
        sheet.write_string(3, 1, "What is the largest ocean on Earth?").unwrap();
        workbook.save(&path).unwrap();

        let set = QuerySet::from_path(&path, "query").unwrap();
        assert_eq!(
            set.iter().collect::<Vec<_>>(),
            vec![
                "Who painted the Mona Lisa?",
                "42",
                "What is the largest ocean on Earth?"
            ]
        );
    }

    #[test]
    fn test_blank_rows_skipped_in_both_formats() {
        let dir = TempDir::new().unwrap();
        let csv_path = write_file(&dir, "queries.csv", "query\nfirst\n\nsecond\n");

        let xlsx_path = dir.path().join("queries.xlsx");
        let mut workbook = rust_xlsxwriter::Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "query").unwrap();
        sheet.write_string(1, 0, "first").unwrap();
        sheet.write_string(3, 0, "second").unwrap();
        workbook.save(&xlsx_path).unwrap();

        let from_csv = QuerySet::from_path(&csv_path, "query").unwrap();
        let from_xlsx = QuerySet::from_path(&xlsx_path, "query").unwrap();
        assert_eq!(from_csv.iter().collect::<Vec<_>>(), vec!["first", "second"]);
        assert_eq!(from_csv, from_xlsx);
    }

    #[test]
    fn test_corrupt_xlsx_is_load_error() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "queries.xlsx", "definitely not a zip archive");

        let err = QuerySet::from_path(&path, "query").unwrap_err();
        assert!(matches!(err, BatchError::Load(_)));
    }
}
