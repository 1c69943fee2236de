//! Per-document entity aggregation
//!
//! Recognized spans are mapped back to the catalog by lookup key and
//! collected in encounter order. A span with no catalog entry is skipped.

use amner_core::{dedup_first_seen, CanonicalEntity};
use tracing::{trace, warn};

use crate::vocabulary::Vocabulary;
use crate::{EntitySpan, Sentence};

/// Collects the canonical entities of one document
pub struct EntityAggregator<'v> {
    vocabulary: &'v Vocabulary,
    found: Vec<CanonicalEntity>,
    spans: usize,
    unmapped: usize,
}

impl<'v> EntityAggregator<'v> {
    pub fn new(vocabulary: &'v Vocabulary) -> Self {
        Self {
            vocabulary,
            found: Vec::new(),
            spans: 0,
            unmapped: 0,
        }
    }

    /// Record one span; returns false when the span has no catalog entry
    pub fn observe(&mut self, span: &EntitySpan) -> bool {
        self.spans += 1;

        match self.vocabulary.get(&span.text) {
            Some(entry) => {
                trace!(span = %span.text, entity = %entry.canonical_term, "mapped span");
                self.found.push(CanonicalEntity::new(
                    entry.canonical_term.clone(),
                    entry.entity_type.clone(),
                ));
                true
            }
            None => {
                self.unmapped += 1;
                warn!(span = %span.text, label = %span.label, "recognized span not in vocabulary, skipping");
                false
            }
        }
    }

    /// Record every span of every sentence
    pub fn observe_sentences(&mut self, sentences: &[Sentence]) {
        for sentence in sentences {
            for span in &sentence.entities {
                self.observe(span);
            }
        }
    }

    /// Spans seen so far
    pub fn span_count(&self) -> usize {
        self.spans
    }

    /// Spans skipped because the vocabulary had no entry for them
    pub fn unmapped(&self) -> usize {
        self.unmapped
    }

    /// Unique entities in first-seen order, each with its first-seen type
    pub fn finish(self) -> Vec<CanonicalEntity> {
        dedup_first_seen(self.found)
    }
}
