//! amner Pipeline - Batch extraction over a directory of papers
//!
//! For every PDF in the input directory, in file-name order:
//!
//! 1. skip the paper early if its file name spells a DOI already handled
//! 2. load the page texts
//! 3. look for a DOI in the file name and leading pages
//! 4. resolve the DOI to an OpenAlex work ID
//! 5. skip the paper if its DOI was already handled
//! 6. recognize vocabulary terms page by page, sentence by sentence
//! 7. collapse them to unique canonical entities and emit one record
//!
//! The batch is rewritten to the output file after every record, so an
//! interrupted run can be resumed.
//!
//! Author: hephaex@gmail.com

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use amner_core::{
    BibliographicResolver, ConfigError, DocumentRecord, MissingDoiPolicy,
    PipelineConfig, ResolveFailurePolicy, Result, NONE_SENTINEL,
};
use amner_extractor::{EntityAggregator, EntityRecognizer, Vocabulary};
use amner_parser::{discover_pdfs, DoiExtractor, PageSource, PdfDoiFinder, PdfParser};
use serde::Serialize;
use tracing::{debug, info, warn};

pub mod writer;

pub use writer::{serialize_batch, ResultWriter};

// ============================================================================
// Seen identifiers
// ============================================================================

/// DOIs of papers already handled; only ever grows
#[derive(Debug, Clone, Default)]
pub struct SeenIdentifiers {
    ids: HashSet<String>,
}

impl SeenIdentifiers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from a previous batch
    pub fn from_records(records: &[DocumentRecord]) -> Self {
        let mut seen = Self::new();
        for record in records {
            seen.insert(record.doi().unwrap_or(NONE_SENTINEL));
        }
        seen
    }

    /// Returns false if the identifier was already present
    pub fn insert(&mut self, id: &str) -> bool {
        self.ids.insert(id.to_string())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

// ============================================================================
// Summary
// ============================================================================

/// Counters for one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    /// PDF files found in the input directory
    pub discovered: usize,
    /// Papers that produced a record
    pub processed: usize,
    /// Papers skipped as already handled
    pub skipped: usize,
    /// DOIs that could not be resolved
    pub unresolved: usize,
    /// Recognized spans with no vocabulary entry
    pub unmapped_spans: usize,
}

// ============================================================================
// Batch Driver
// ============================================================================

/// Runs the extraction over a directory
pub struct BatchDriver {
    vocabulary: Arc<Vocabulary>,
    recognizer: Arc<dyn EntityRecognizer>,
    resolver: Arc<dyn BibliographicResolver>,
    pages: Arc<dyn PageSource>,
    doi_finder: Arc<dyn DoiExtractor>,
    writer: ResultWriter,
    config: PipelineConfig,
}

impl BatchDriver {
    /// Create a driver reading PDFs from disk with the default DOI search
    pub fn new(
        vocabulary: Arc<Vocabulary>,
        recognizer: Arc<dyn EntityRecognizer>,
        resolver: Arc<dyn BibliographicResolver>,
        writer: ResultWriter,
    ) -> Self {
        Self {
            vocabulary,
            recognizer,
            resolver,
            pages: Arc::new(PdfParser::new()),
            doi_finder: Arc::new(PdfDoiFinder::default()),
            writer,
            config: PipelineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_page_source(mut self, pages: Arc<dyn PageSource>) -> Self {
        self.pages = pages;
        self
    }

    pub fn with_doi_extractor(mut self, doi_finder: Arc<dyn DoiExtractor>) -> Self {
        self.doi_finder = doi_finder;
        self
    }

    /// Process every PDF directly inside `input_dir`
    pub async fn run(&self, input_dir: &Path) -> Result<BatchSummary> {
        self.config.validate()?;
        if !input_dir.is_dir() {
            return Err(ConfigError::MissingRequired(format!(
                "input directory {}",
                input_dir.display()
            ))
            .into());
        }

        let files = discover_pdfs(input_dir)?;
        let mut summary = BatchSummary {
            discovered: files.len(),
            ..BatchSummary::default()
        };

        let mut batch = if self.config.resume {
            let previous = self.writer.load()?;
            info!(
                path = %self.writer.path().display(),
                records = previous.len(),
                "resuming from previous output"
            );
            previous
        } else {
            Vec::new()
        };
        let mut seen = SeenIdentifiers::from_records(&batch);

        info!(
            dir = %input_dir.display(),
            files = files.len(),
            resolver = self.resolver.name(),
            "starting batch"
        );

        for path in &files {
            // Duplicates named by DOI are skipped without reading them
            if let Some(doi) = self.doi_finder.find_doi_in_path(path) {
                if seen.contains(&doi) {
                    info!(file = %path.display(), id = %doi, "paper was handled before, skipping");
                    summary.skipped += 1;
                    continue;
                }
            }

            let document = self.pages.load(path)?;
            let file = document.file_name();
            info!(file = %file, pages = document.page_count(), "processing paper");

            let doi = self.doi_finder.find_doi(&document);
            let bibliographic_id = match &doi {
                Some(doi) => self.resolve(doi, &mut summary).await?,
                None => {
                    info!(file = %file, "no DOI found");
                    None
                }
            };

            let key = match (&doi, self.config.missing_doi) {
                (Some(doi), _) => Some(doi.as_str()),
                (None, MissingDoiPolicy::Collapse) => Some(NONE_SENTINEL),
                (None, MissingDoiPolicy::AlwaysProcess) => None,
            };
            if let Some(key) = key {
                if !seen.insert(key) {
                    info!(file = %file, id = key, "paper was handled before, skipping");
                    summary.skipped += 1;
                    continue;
                }
            }

            let mut aggregator = EntityAggregator::new(&self.vocabulary);
            for page in &document.pages {
                let sentences = self.recognizer.analyze(page)?;
                aggregator.observe_sentences(&sentences);
            }
            summary.unmapped_spans += aggregator.unmapped();
            debug!(file = %file, spans = aggregator.span_count(), "recognized spans");

            let record = DocumentRecord::new(doi, bibliographic_id, aggregator.finish());
            info!(file = %file, entities = ?record.entities(), "found entities");

            batch.push(record);
            self.writer.write(&batch)?;
            summary.processed += 1;
        }

        self.writer.write(&batch)?;
        info!(
            discovered = summary.discovered,
            processed = summary.processed,
            skipped = summary.skipped,
            unresolved = summary.unresolved,
            unmapped_spans = summary.unmapped_spans,
            output = %self.writer.path().display(),
            "batch finished"
        );

        Ok(summary)
    }

    async fn resolve(&self, doi: &str, summary: &mut BatchSummary) -> Result<Option<String>> {
        match self.resolver.resolve(doi).await {
            Ok(id) => {
                info!(doi, id = %id, "resolved DOI");
                Ok(Some(id))
            }
            Err(e) => match self.config.on_resolve_error {
                ResolveFailurePolicy::Sentinel => {
                    warn!(doi, error = %e, "could not resolve DOI, recording none");
                    summary.unresolved += 1;
                    Ok(None)
                }
                ResolveFailurePolicy::Abort => Err(e),
            },
        }
    }
}

impl std::fmt::Debug for BatchDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchDriver")
            .field("vocabulary", &self.vocabulary.len())
            .field("resolver", &self.resolver.name())
            .field("output", &self.writer.path())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use amner_core::CanonicalEntity;

    #[test]
    fn test_seen_identifiers() {
        let mut seen = SeenIdentifiers::new();
        assert!(seen.is_empty());
        assert!(seen.insert("10.1/a"));
        assert!(!seen.insert("10.1/a"));
        assert!(seen.insert(NONE_SENTINEL));
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn test_seen_from_records() {
        let records = vec![
            DocumentRecord::new(Some("10.1/a".to_string()), None, vec![]),
            DocumentRecord::new(None, None, vec![CanonicalEntity::new("x", "Y")]),
        ];
        let seen = SeenIdentifiers::from_records(&records);

        assert!(seen.contains("10.1/a"));
        assert!(seen.contains(NONE_SENTINEL));
        assert!(!seen.contains("10.1/b"));
    }
}
