//! Pattern compilation
//!
//! Each catalog term becomes one exact-match rule on the lower-cased token
//! text, labelled with the term's canonical entity type. The rules are fixed
//! for the lifetime of a recognizer.

use serde::Serialize;

use crate::ner::{RecognizerBuilder, RuleRecognizer};
use crate::vocabulary::Vocabulary;

/// Match rule: a token whose lower-cased text equals `surface` gets `label`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchPattern {
    pub label: String,
    pub surface: String,
}

/// Everything the recognizer needs from the catalog
#[derive(Debug, Clone, Default, Serialize)]
pub struct PatternSet {
    pub patterns: Vec<MatchPattern>,
    /// Spellings kept as single tokens
    pub special_cases: Vec<String>,
}

impl PatternSet {
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Build the recognizer from these rules in one step
    pub fn into_recognizer(self) -> RuleRecognizer {
        RecognizerBuilder::new()
            .add_special_cases(self.special_cases)
            .add_patterns(self.patterns)
            .build()
    }
}

/// One pattern per catalog entry, in catalog order
pub fn compile_patterns(vocabulary: &Vocabulary) -> PatternSet {
    let patterns = vocabulary
        .iter()
        .map(|(_, entry)| MatchPattern {
            label: entry.entity_type.clone(),
            surface: entry.raw_term.to_lowercase(),
        })
        .collect();

    PatternSet {
        patterns,
        special_cases: vocabulary.special_cases().to_vec(),
    }
}
