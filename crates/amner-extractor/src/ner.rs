//! Rule-based Named Entity Recognition (NER)
//!
//! Three stages run over each text:
//! - Tokenizer: splits on whitespace and punctuation, except that registered
//!   special cases (catalog spellings, possibly multi-word) are kept whole
//! - Sentencizer: a sentence ends after a `.`, `!` or `?` token
//! - Entity ruler: a token whose lower-cased text equals a rule surface is
//!   labelled with that rule's label
//!
//! A [`RuleRecognizer`] is immutable once built; share it by reference.

use std::collections::HashMap;
use std::ops::Range;

use amner_core::Result;
use tracing::debug;

use crate::patterns::MatchPattern;
use crate::{EntityRecognizer, EntitySpan, Sentence};

/// Characters that always form a token of their own
const SPLIT_PUNCT: &[char] = &[
    ',', ';', ':', '!', '?', '(', ')', '[', ']', '{', '}', '"', '“', '”',
];

/// A token as byte offsets into the analyzed text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub start: usize,
    pub end: usize,
}

impl Token {
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start..self.end]
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Collects special cases and patterns, then freezes them into a recognizer
#[derive(Debug, Default)]
pub struct RecognizerBuilder {
    special_cases: Vec<String>,
    patterns: Vec<MatchPattern>,
}

impl RecognizerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep each spelling as one token wherever it appears between token boundaries
    pub fn add_special_cases<S: Into<String>>(mut self, spellings: impl IntoIterator<Item = S>) -> Self {
        self.special_cases
            .extend(spellings.into_iter().map(Into::into));
        self
    }

    pub fn add_pattern(mut self, pattern: MatchPattern) -> Self {
        self.patterns.push(pattern);
        self
    }

    pub fn add_patterns(mut self, patterns: impl IntoIterator<Item = MatchPattern>) -> Self {
        self.patterns.extend(patterns);
        self
    }

    /// Freeze the rules. For a surface registered twice the first label wins.
    pub fn build(self) -> RuleRecognizer {
        let mut special_cases: HashMap<char, Vec<String>> = HashMap::new();
        for spelling in self.special_cases {
            let Some(first) = spelling.chars().next() else {
                continue;
            };
            let bucket = special_cases.entry(first).or_default();
            if !bucket.contains(&spelling) {
                bucket.push(spelling);
            }
        }
        // Longest spelling first so multi-word terms beat their prefixes
        for bucket in special_cases.values_mut() {
            bucket.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        }

        let mut rules: HashMap<String, String> = HashMap::new();
        for pattern in self.patterns {
            if pattern.surface.is_empty() {
                continue;
            }
            if let Some(existing) = rules.get(&pattern.surface) {
                if *existing != pattern.label {
                    debug!(
                        surface = %pattern.surface,
                        kept = %existing,
                        ignored = %pattern.label,
                        "conflicting labels for surface"
                    );
                }
                continue;
            }
            rules.insert(pattern.surface, pattern.label);
        }

        debug!(
            rules = rules.len(),
            special_cases = special_cases.values().map(Vec::len).sum::<usize>(),
            "built rule recognizer"
        );

        RuleRecognizer {
            special_cases,
            rules,
        }
    }
}

// ============================================================================
// Recognizer
// ============================================================================

/// Rule-based recognizer over a closed vocabulary
#[derive(Debug, Clone)]
pub struct RuleRecognizer {
    /// Special cases grouped by first character, longest first
    special_cases: HashMap<char, Vec<String>>,
    /// Lower-cased surface -> label
    rules: HashMap<String, String>,
}

impl RuleRecognizer {
    /// Number of match rules
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Number of distinct special-case spellings
    pub fn special_case_count(&self) -> usize {
        self.special_cases.values().map(Vec::len).sum()
    }

    /// Split `text` into tokens
    pub fn tokenize(&self, text: &str) -> Vec<Token> {
        let mut tokens = Vec::new();
        let mut pos = 0;

        while let Some(ch) = text[pos..].chars().next() {
            if ch.is_whitespace() {
                pos += ch.len_utf8();
                continue;
            }

            let rest = &text[pos..];

            if let Some(len) = self.match_special(rest) {
                tokens.push(Token {
                    start: pos,
                    end: pos + len,
                });
                pos += len;
                continue;
            }

            if SPLIT_PUNCT.contains(&ch) {
                tokens.push(Token {
                    start: pos,
                    end: pos + ch.len_utf8(),
                });
                pos += ch.len_utf8();
                continue;
            }

            let len = rest
                .find(|c: char| c.is_whitespace() || SPLIT_PUNCT.contains(&c))
                .unwrap_or(rest.len());
            let word = &rest[..len];

            // "used." -> "used" "." but "e.g." and "3.5" stay whole
            if len > 1 && word.ends_with('.') && !word[..len - 1].contains('.') {
                tokens.push(Token {
                    start: pos,
                    end: pos + len - 1,
                });
                tokens.push(Token {
                    start: pos + len - 1,
                    end: pos + len,
                });
            } else {
                tokens.push(Token {
                    start: pos,
                    end: pos + len,
                });
            }
            pos += len;
        }

        tokens
    }

    /// Length of the longest special case starting `rest` and ending on a boundary
    fn match_special(&self, rest: &str) -> Option<usize> {
        let first = rest.chars().next()?;
        self.special_cases
            .get(&first)?
            .iter()
            .find(|spelling| rest.starts_with(spelling.as_str()) && ends_token(&rest[spelling.len()..]))
            .map(String::len)
    }

    /// Token index ranges of the sentences in `tokens`
    pub fn sentence_ranges(&self, text: &str, tokens: &[Token]) -> Vec<Range<usize>> {
        let mut ranges = Vec::new();
        let mut start = 0;

        for (i, token) in tokens.iter().enumerate() {
            if is_sentence_end(token.text(text)) {
                ranges.push(start..i + 1);
                start = i + 1;
            }
        }
        if start < tokens.len() {
            ranges.push(start..tokens.len());
        }

        ranges
    }

    /// Label of a token, if a rule matches it
    fn label(&self, token_text: &str) -> Option<&str> {
        self.rules.get(&token_text.to_lowercase()).map(String::as_str)
    }
}

impl EntityRecognizer for RuleRecognizer {
    fn analyze(&self, text: &str) -> Result<Vec<Sentence>> {
        let tokens = self.tokenize(text);
        let mut sentences = Vec::new();

        for range in self.sentence_ranges(text, &tokens) {
            let slice = &tokens[range];
            let (Some(first), Some(last)) = (slice.first(), slice.last()) else {
                continue;
            };

            let entities = slice
                .iter()
                .filter_map(|token| {
                    let surface = token.text(text);
                    self.label(surface).map(|label| EntitySpan {
                        text: surface.to_string(),
                        label: label.to_string(),
                        start: token.start,
                        end: token.end,
                    })
                })
                .collect();

            sentences.push(Sentence {
                text: text[first.start..last.end].to_string(),
                start: first.start,
                end: last.end,
                entities,
            });
        }

        Ok(sentences)
    }
}

fn ends_token(after: &str) -> bool {
    after
        .chars()
        .next()
        .map_or(true, |c| c.is_whitespace() || c == '.' || SPLIT_PUNCT.contains(&c))
}

fn is_sentence_end(token: &str) -> bool {
    !token.is_empty() && token.chars().all(|c| matches!(c, '.' | '!' | '?'))
}

// ============================================================================
// Tests
// ============================================================================
