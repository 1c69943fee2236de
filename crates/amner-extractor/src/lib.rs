//! amner Extractor - Ontology entity extraction
//!
//! Turns the controlled vocabulary of the additive-manufacturing ontology
//! into match rules and finds those terms in paper text:
//! - `normalize`: canonical (camel-case) names and lookup keys
//! - `vocabulary`: catalog and definition tables
//! - `patterns`: exact-token match rules compiled from the catalog
//! - `ner`: rule-based recognizer (tokenizer, sentencizer, entity ruler)
//! - `aggregate`: mapping recognized spans back to canonical entities

use amner_core::Result;
use serde::Serialize;

pub mod aggregate;
pub mod ner;
pub mod normalize;
pub mod patterns;
pub mod vocabulary;

pub use aggregate::EntityAggregator;
pub use ner::{RecognizerBuilder, RuleRecognizer};
pub use normalize::{to_canonical_form, to_lookup_key, to_title_case};
pub use patterns::{compile_patterns, MatchPattern, PatternSet};
pub use vocabulary::{DefinitionEntry, Definitions, Vocabulary, VocabularyEntry};

/// A labelled entity span inside a sentence
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntitySpan {
    pub text: String,
    pub label: String,
    /// Byte offsets into the analyzed text
    pub start: usize,
    pub end: usize,
}

/// A sentence and the entity spans recognized in it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sentence {
    pub text: String,
    pub start: usize,
    pub end: usize,
    pub entities: Vec<EntitySpan>,
}

/// Trait for entity recognizers
pub trait EntityRecognizer: Send + Sync {
    /// Split `text` into sentences and label the entity spans in each
    fn analyze(&self, text: &str) -> Result<Vec<Sentence>>;
}
