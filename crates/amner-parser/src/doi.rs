//! DOI discovery for PDF papers
//!
//! Looks for a DOI first in the file name and then in the text of the
//! leading pages. The first candidate that survives cleaning wins.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, trace};

use crate::PdfDocument;

/// DOI with an optional `doi:` or `https://doi.org/` prefix; group 2 is the bare DOI.
/// `<` and `>` are allowed since SICI-style DOIs contain them.
/// Preceding-character checks for bare matches happen in code since the
/// `regex` crate has no lookbehind.
#[allow(clippy::expect_used)]
static DOI_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)(doi:\s*|https?://(?:dx\.)?doi\.org/)?(10\.\d{4,9}(?:\.\d+)*/[^\s"'\]\[{}]+)"#,
    )
    .expect("DOI regex is valid") // Static pattern, safe to panic
});

/// Finds the DOI of a paper
pub trait DoiExtractor: Send + Sync {
    /// Return the paper's DOI, or `None` when nothing is found
    fn find_doi(&self, document: &PdfDocument) -> Option<String>;

    /// DOI known from the path alone, before any text is read.
    ///
    /// When this returns `Some`, `find_doi` must return the same DOI.
    fn find_doi_in_path(&self, _path: &Path) -> Option<String> {
        None
    }
}

/// DOI finder looking at the file name, then the leading pages
pub struct PdfDoiFinder {
    /// Number of leading pages searched
    pub search_pages: usize,
}

impl PdfDoiFinder {
    pub fn new(search_pages: usize) -> Self {
        Self { search_pages }
    }
}

impl Default for PdfDoiFinder {
    fn default() -> Self {
        Self::new(3)
    }
}

impl DoiExtractor for PdfDoiFinder {
    fn find_doi(&self, document: &PdfDocument) -> Option<String> {
        if let Some(doi) = self.find_doi_in_path(&document.path) {
            debug!(file = %document.file_name(), doi = %doi, "DOI found in file name");
            return Some(doi);
        }

        let found = document
            .pages
            .iter()
            .take(self.search_pages)
            .find_map(|page| find_doi_in_text(page));

        if let Some(doi) = &found {
            debug!(file = %document.file_name(), doi = %doi, "DOI found in text");
        }
        found
    }

    /// DOI spelled in the file name, with `%2F` and `_` accepted for `/`
    fn find_doi_in_path(&self, path: &Path) -> Option<String> {
        let stem = path.file_stem()?.to_string_lossy();
        let decoded = stem.replace("%2F", "/").replace("%2f", "/");

        find_doi_in_text(&decoded).or_else(|| {
            // 10.1234_abc.pdf
            let slashed = decoded.replacen('_', "/", 1);
            find_doi_in_text(&slashed)
        })
    }
}

/// First well-formed DOI in `text`, cleaned of trailing punctuation
pub fn find_doi_in_text(text: &str) -> Option<String> {
    for cap in DOI_PATTERN.captures_iter(text) {
        let (Some(full), Some(doi)) = (cap.get(0), cap.get(2)) else {
            continue;
        };

        // Bare matches must not continue a number or word (IP-like or version strings)
        if cap.get(1).is_none() && full.start() > 0 {
            let prev_byte = text.as_bytes()[full.start() - 1];
            if prev_byte.is_ascii_alphanumeric() || prev_byte == b'.' {
                trace!(candidate = %doi.as_str(), "rejected DOI candidate");
                continue;
            }
        }

        let cleaned = clean_doi(doi.as_str());
        if let Some((_, suffix)) = cleaned.split_once('/') {
            if !suffix.is_empty() {
                return Some(cleaned);
            }
        }
    }

    None
}

/// Strip sentence punctuation and unbalanced closing brackets from the end
fn clean_doi(doi: &str) -> String {
    let mut result = doi.trim().to_string();

    loop {
        let Some(last) = result.chars().last() else {
            break;
        };
        let strip = match last {
            '.' | ',' | ';' | ':' | '!' | '?' => true,
            ')' => result.matches(')').count() > result.matches('(').count(),
            '>' => result.matches('>').count() > result.matches('<').count(),
            _ => false,
        };
        if !strip {
            break;
        }
        result.pop();
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document(name: &str, pages: &[&str]) -> PdfDocument {
        PdfDocument::new(name, pages.iter().map(|p| p.to_string()).collect())
    }

    #[test]
    fn test_find_prefixed_doi() {
        assert_eq!(
            find_doi_in_text("Additive Manufacturing 12 (2016). DOI: 10.1016/j.addma.2016.05.007."),
            Some("10.1016/j.addma.2016.05.007".to_string())
        );
    }

    #[test]
    fn test_find_doi_url() {
        assert_eq!(
            find_doi_in_text("see https://doi.org/10.1234/abc)"),
            Some("10.1234/abc".to_string())
        );
    }

    #[test]
    fn test_balanced_parentheses_kept() {
        assert_eq!(
            find_doi_in_text("doi:10.1002/(SICI)1097-4636(199709)."),
            Some("10.1002/(SICI)1097-4636(199709)".to_string())
        );
    }

    #[test]
    fn test_sici_doi_kept_whole() {
        assert_eq!(
            find_doi_in_text(
                "J Biomed Mater Res, doi:10.1002/(SICI)1097-4636(199709)36:3<269::AID-JBM1>3.0.CO;2-F."
            ),
            Some("10.1002/(SICI)1097-4636(199709)36:3<269::AID-JBM1>3.0.CO;2-F".to_string())
        );
    }

    #[test]
    fn test_angle_bracketed_doi() {
        assert_eq!(
            find_doi_in_text("<https://doi.org/10.1234/abc>"),
            Some("10.1234/abc".to_string())
        );
    }

    #[test]
    fn test_rejects_embedded_numbers() {
        assert_eq!(find_doi_in_text("host 192.10.1234/24 is down"), None);
        assert_eq!(find_doi_in_text("version v10.1234/rc1"), None);
        assert_eq!(find_doi_in_text("no identifier here"), None);
    }

    #[test]
    fn test_first_doi_wins() {
        assert_eq!(
            find_doi_in_text("doi 10.1111/first and later 10.2222/second"),
            Some("10.1111/first".to_string())
        );
    }

    #[test]
    fn test_file_name_preferred_over_text() {
        let doc = document("papers/10.1234%2Fabc.pdf", &["DOI: 10.9999/other"]);
        assert_eq!(
            PdfDoiFinder::default().find_doi(&doc),
            Some("10.1234/abc".to_string())
        );

        let doc = document("papers/10.1234_abc.pdf", &[]);
        assert_eq!(
            PdfDoiFinder::default().find_doi(&doc),
            Some("10.1234/abc".to_string())
        );
    }

    #[test]
    fn test_doi_from_path_alone() {
        let finder = PdfDoiFinder::default();
        assert_eq!(
            finder.find_doi_in_path(Path::new("papers/10.1234%2Fabc.pdf")),
            Some("10.1234/abc".to_string())
        );
        assert_eq!(finder.find_doi_in_path(Path::new("papers/paper.pdf")), None);
    }

    #[test]
    fn test_only_leading_pages_searched() {
        let doc = document(
            "paper.pdf",
            &["Title page", "Abstract", "References: doi:10.5555/cited"],
        );

        assert_eq!(PdfDoiFinder::new(2).find_doi(&doc), None);
        assert_eq!(
            PdfDoiFinder::new(3).find_doi(&doc),
            Some("10.5555/cited".to_string())
        );
    }
}
