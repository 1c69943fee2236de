//! amner Parser - Input parsing for the extraction batch
//!
//! Supports:
//! - PDF papers, read page by page
//! - Spreadsheet workbooks (ODS, XLSX, XLS) holding the ontology catalog
//! - DOI discovery from a paper's file name and text
//!
//! PDF readers implement the `PageSource` trait and produce a `PdfDocument`
//! that the batch driver hands to the DOI finder and the recognizer.

use std::path::{Path, PathBuf};

use amner_core::AmnerError;
use thiserror::Error;
use tracing::debug;

pub mod doi;
pub mod pdf;
pub mod spreadsheet;

pub use doi::{find_doi_in_text, DoiExtractor, PdfDoiFinder};
pub use pdf::PdfParser;
pub use spreadsheet::SpreadsheetReader;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur while reading input files
#[derive(Error, Debug)]
pub enum ParserError {
    /// IO error while reading the file
    #[error("IO error reading file: {path}")]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// PDF parsing error
    #[error("PDF parsing error in {path}: {message}")]
    PdfError { path: String, message: String },

    /// Spreadsheet parsing error
    #[error("Spreadsheet parsing error: {0}")]
    SpreadsheetError(String),

    /// A workbook has no sheet to read
    #[error("Workbook has no sheets: {0}")]
    EmptyWorkbook(String),

    /// Input directory is missing
    #[error("Not a directory: {0}")]
    NotADirectory(String),
}

pub type Result<T> = std::result::Result<T, ParserError>;

impl From<ParserError> for AmnerError {
    fn from(err: ParserError) -> Self {
        match err {
            ParserError::IoError { path, source } => AmnerError::io(path, source),
            other => AmnerError::Parse(other.to_string()),
        }
    }
}

/// Whether `path` has a `.pdf` extension, in any case
pub fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

// ============================================================================
// Parsed Types
// ============================================================================

/// Text of a PDF paper, one string per page in page order
#[derive(Debug, Clone)]
pub struct PdfDocument {
    /// Original file path
    pub path: PathBuf,

    /// Page texts
    pub pages: Vec<String>,
}

impl PdfDocument {
    pub fn new(path: impl Into<PathBuf>, pages: Vec<String>) -> Self {
        Self {
            path: path.into(),
            pages,
        }
    }

    /// File name without directories, for log lines
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

/// A sheet read as a header row plus data rows
#[derive(Debug, Clone, Default)]
pub struct Table {
    /// Sheet name (if any)
    pub caption: Option<String>,

    /// Column headers
    pub headers: Vec<String>,

    /// Table rows
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Create a new table
    pub fn new() -> Self {
        Self::default()
    }

    /// Add headers
    pub fn with_headers<S: Into<String>>(mut self, headers: impl IntoIterator<Item = S>) -> Self {
        self.headers = headers.into_iter().map(Into::into).collect();
        self
    }

    /// Add a row
    pub fn add_row<S: Into<String>>(&mut self, row: impl IntoIterator<Item = S>) {
        self.rows.push(row.into_iter().map(Into::into).collect());
    }

    /// Index of a header, compared case-insensitively after trimming
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
    }

    /// Cell of a row; short rows read as empty
    pub fn cell<'a>(&'a self, row: &'a [String], column: Option<usize>) -> &'a str {
        column
            .and_then(|i| row.get(i))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Get number of rows
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }
}

// ============================================================================
// Page Source Trait
// ============================================================================

/// Yields the text of a paper page by page
pub trait PageSource: Send + Sync {
    /// Load all pages of the document at `path`
    fn load(&self, path: &Path) -> Result<PdfDocument>;
}

// ============================================================================
// Discovery
// ============================================================================

/// List the PDF files directly inside `dir`, sorted by file name
pub fn discover_pdfs(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(ParserError::NotADirectory(dir.display().to_string()));
    }

    let entries = std::fs::read_dir(dir).map_err(|e| ParserError::IoError {
        path: dir.display().to_string(),
        source: e,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ParserError::IoError {
            path: dir.display().to_string(),
            source: e,
        })?;
        let path = entry.path();
        if path.is_file() && is_pdf(&path) {
            files.push(path);
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    debug!(dir = %dir.display(), count = files.len(), "discovered PDF files");

    Ok(files)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pdf_extension() {
        assert!(is_pdf(Path::new("papers/a.pdf")));
        assert!(is_pdf(Path::new("A.PDF")));
        assert!(!is_pdf(Path::new("catalog.ods")));
        assert!(!is_pdf(Path::new("pdf")));
    }

    #[test]
    fn test_table_columns_case_insensitive() {
        let mut table = Table::new().with_headers(["Entity", " entity_type ", "Thing"]);
        table.add_row(["powder", "Material"]);

        assert_eq!(table.column("entity"), Some(0));
        assert_eq!(table.column("ENTITY_TYPE"), Some(1));
        assert_eq!(table.column("SubClass1"), None);

        let row = &table.rows[0];
        assert_eq!(table.cell(row, Some(1)), "Material");
        // Row shorter than the header
        assert_eq!(table.cell(row, Some(2)), "");
        assert_eq!(table.cell(row, None), "");
    }

    #[test]
    fn test_discover_pdfs_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.pdf", "a.PDF", "notes.txt", "c.pdf"] {
            std::fs::write(dir.path().join(name), b"%PDF-1.4").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.pdf")).unwrap();

        let files = discover_pdfs(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();

        assert_eq!(names, vec!["a.PDF", "b.pdf", "c.pdf"]);
    }

    #[test]
    fn test_discover_missing_dir() {
        let err = discover_pdfs(Path::new("/no/such/papers")).unwrap_err();
        assert!(matches!(err, ParserError::NotADirectory(_)));
    }

    #[test]
    fn test_parser_error_into_core() {
        let err: AmnerError = ParserError::SpreadsheetError("bad zip".to_string()).into();
        assert!(matches!(err, AmnerError::Parse(_)));
    }
}
