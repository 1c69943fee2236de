//! PDF document parser using pdf-extract
//!
//! Extracts the text of a paper page by page.

use std::path::Path;

use tracing::debug;

use crate::{PageSource, ParserError, PdfDocument, Result};

/// PDF document parser; blank pages are kept so page numbers stay aligned
#[derive(Debug, Default)]
pub struct PdfParser;

impl PdfParser {
    pub fn new() -> Self {
        Self
    }

    /// Extract per-page text from PDF bytes
    pub fn pages_from_bytes(&self, path: &Path, bytes: &[u8]) -> Result<Vec<String>> {
        let pages = pdf_extract::extract_text_from_mem_by_pages(bytes).map_err(|e| {
            ParserError::PdfError {
                path: path.display().to_string(),
                message: e.to_string(),
            }
        })?;

        Ok(self.clean_pages(pages))
    }

    /// Replace form feeds with line breaks
    fn clean_pages(&self, pages: Vec<String>) -> Vec<String> {
        pages
            .into_iter()
            .map(|page| page.replace('\x0C', "\n"))
            .collect()
    }
}

impl PageSource for PdfParser {
    fn load(&self, path: &Path) -> Result<PdfDocument> {
        let bytes = std::fs::read(path).map_err(|e| ParserError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        let pages = self.pages_from_bytes(path, &bytes)?;
        debug!(path = %path.display(), pages = pages.len(), "extracted PDF text");

        Ok(PdfDocument::new(path, pages))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_pages() {
        let pages = vec![
            "Laser powder\x0Cbed fusion".to_string(),
            "  \n ".to_string(),
            "Ti-6Al-4V".to_string(),
        ];

        let kept = PdfParser::new().clean_pages(pages);
        assert_eq!(kept, vec!["Laser powder\nbed fusion", "  \n ", "Ti-6Al-4V"]);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = PdfParser::new()
            .load(Path::new("/no/such/paper.pdf"))
            .unwrap_err();
        assert!(matches!(err, ParserError::IoError { .. }));
    }

    #[test]
    fn test_garbage_bytes_is_pdf_error() {
        let err = PdfParser::new()
            .pages_from_bytes(Path::new("junk.pdf"), b"definitely not a pdf")
            .unwrap_err();
        assert!(matches!(err, ParserError::PdfError { .. }));
    }
}
