//! amner Core - Domain models, traits, and shared types
//!
//! This crate defines the core abstractions used throughout amner:
//! - Extraction output models (canonical entities, per-paper records)
//! - Common error types
//! - The bibliographic resolver trait
//! - Configuration management

pub mod config;

pub use config::{
    AppConfig, ConfigError, ExtractionConfig, LoggingConfig, MissingDoiPolicy, OpenAlexConfig,
    PipelineConfig, ResolveFailurePolicy,
};

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use thiserror::Error;

/// Placeholder written for an identifier that was not found or not resolved
pub const NONE_SENTINEL: &str = "none";

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for amner operations
#[derive(Error, Debug)]
pub enum AmnerError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Vocabulary error: {0}")]
    Vocabulary(String),

    #[error("Could not resolve {doi}: {reason}")]
    Resolution { doi: String, reason: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Output error: {0}")]
    Output(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AmnerError {
    /// Wrap an IO error together with the path it happened on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this is a "no such work" answer rather than a transport failure
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, AmnerError>;

// ============================================================================
// Extraction Models
// ============================================================================

/// An ontology entity in its canonical (camel-case) spelling with its type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CanonicalEntity {
    pub name: String,
    pub entity_type: String,
}

impl CanonicalEntity {
    pub fn new(name: impl Into<String>, entity_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entity_type: entity_type.into(),
        }
    }
}

/// Reduce a list of entities to the first occurrence of each canonical name.
///
/// Encounter order is preserved and each kept name carries the type it had
/// at its first occurrence.
pub fn dedup_first_seen(entities: impl IntoIterator<Item = CanonicalEntity>) -> Vec<CanonicalEntity> {
    let mut seen = HashSet::new();
    entities
        .into_iter()
        .filter(|e| seen.insert(e.name.clone()))
        .collect()
}

/// Extraction result for one paper.
///
/// Serialized as `{"DOI", "OpenAlexID", "Entities", "Entity_types"}` with
/// `"none"` standing in for a missing identifier. `Entities` and
/// `Entity_types` are parallel arrays: index `i` of one belongs to index `i`
/// of the other, and entity names are unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawDocumentRecord")]
pub struct DocumentRecord {
    #[serde(rename = "DOI", with = "sentinel")]
    doi: Option<String>,

    #[serde(rename = "OpenAlexID", with = "sentinel")]
    bibliographic_id: Option<String>,

    #[serde(rename = "Entities")]
    entities: Vec<String>,

    #[serde(rename = "Entity_types")]
    entity_types: Vec<String>,
}

impl DocumentRecord {
    /// Build a record, dropping repeated entity names (first occurrence wins)
    pub fn new(
        doi: Option<String>,
        bibliographic_id: Option<String>,
        entities: Vec<CanonicalEntity>,
    ) -> Self {
        let (entities, entity_types) = dedup_first_seen(entities)
            .into_iter()
            .map(|e| (e.name, e.entity_type))
            .unzip();

        Self {
            doi,
            bibliographic_id,
            entities,
            entity_types,
        }
    }

    pub fn doi(&self) -> Option<&str> {
        self.doi.as_deref()
    }

    pub fn bibliographic_id(&self) -> Option<&str> {
        self.bibliographic_id.as_deref()
    }

    pub fn entities(&self) -> &[String] {
        &self.entities
    }

    pub fn entity_types(&self) -> &[String] {
        &self.entity_types
    }

    /// Iterate `(entity, entity_type)` pairs
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entities
            .iter()
            .zip(&self.entity_types)
            .map(|(e, t)| (e.as_str(), t.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

/// Wire shape of a record before its invariants are checked
#[derive(Deserialize)]
struct RawDocumentRecord {
    #[serde(rename = "DOI", with = "sentinel")]
    doi: Option<String>,
    #[serde(rename = "OpenAlexID", with = "sentinel")]
    bibliographic_id: Option<String>,
    #[serde(rename = "Entities")]
    entities: Vec<String>,
    #[serde(rename = "Entity_types")]
    entity_types: Vec<String>,
}

impl TryFrom<RawDocumentRecord> for DocumentRecord {
    type Error = String;

    fn try_from(raw: RawDocumentRecord) -> std::result::Result<Self, Self::Error> {
        if raw.entities.len() != raw.entity_types.len() {
            return Err(format!(
                "Entities has {} items but Entity_types has {}",
                raw.entities.len(),
                raw.entity_types.len()
            ));
        }

        let mut names = HashSet::new();
        if let Some(dup) = raw.entities.iter().find(|e| !names.insert(e.as_str())) {
            return Err(format!("duplicate entity {dup}"));
        }

        Ok(Self {
            doi: raw.doi,
            bibliographic_id: raw.bibliographic_id,
            entities: raw.entities,
            entity_types: raw.entity_types,
        })
    }
}

/// `Option<String>` <-> `"none"` sentinel
mod sentinel {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::NONE_SENTINEL;

    pub fn serialize<S: Serializer>(value: &Option<String>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(value.as_deref().unwrap_or(NONE_SENTINEL))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        let value = String::deserialize(d)?;
        Ok((value != NONE_SENTINEL).then_some(value))
    }
}

// ============================================================================
// Traits
// ============================================================================

/// Resolves a DOI to a stable bibliographic identifier
#[async_trait::async_trait]
pub trait BibliographicResolver: Send + Sync {
    /// Look up the identifier for `doi`.
    ///
    /// Returns `AmnerError::NotFound` when the service has no such work and
    /// `AmnerError::Resolution` for any other failure.
    async fn resolve(&self, doi: &str) -> Result<String>;

    /// Short name used in log lines
    fn name(&self) -> &str;
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(name: &str, entity_type: &str) -> CanonicalEntity {
        CanonicalEntity::new(name, entity_type)
    }

    #[test]
    fn test_dedup_keeps_first_occurrence() {
        let a = entity("A", "Process");
        let b = entity("B", "Material");
        let c = entity("C", "Machine");

        let deduped = dedup_first_seen(vec![
            a.clone(),
            b.clone(),
            entity("A", "Property"),
            c.clone(),
            b.clone(),
        ]);

        assert_eq!(deduped, vec![a, b, c]);
    }

    #[test]
    fn test_record_columns_stay_parallel() {
        let record = DocumentRecord::new(
            Some("10.1234/abc".to_string()),
            Some("W123".to_string()),
            vec![
                entity("A", "Process"),
                entity("B", "Material"),
                entity("A", "Property"),
            ],
        );

        assert_eq!(record.entities(), ["A", "B"]);
        assert_eq!(record.entity_types(), ["Process", "Material"]);
        assert_eq!(record.len(), 2);
        assert_eq!(
            record.pairs().collect::<Vec<_>>(),
            vec![("A", "Process"), ("B", "Material")]
        );
    }

    #[test]
    fn test_record_field_names_and_order() {
        let record = DocumentRecord::new(
            Some("10.1234/abc".to_string()),
            Some("W123".to_string()),
            vec![entity("LaserPowderBedFusion", "Process")],
        );

        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(
            json,
            r#"{"DOI":"10.1234/abc","OpenAlexID":"W123","Entities":["LaserPowderBedFusion"],"Entity_types":["Process"]}"#
        );
    }

    #[test]
    fn test_missing_identifiers_use_sentinel() {
        let record = DocumentRecord::new(None, None, Vec::new());
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["DOI"], "none");
        assert_eq!(json["OpenAlexID"], "none");

        let back: DocumentRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back.doi(), None);
        assert_eq!(back.bibliographic_id(), None);
    }

    #[test]
    fn test_round_trip_non_ascii() {
        let record = DocumentRecord::new(
            Some("10.5555/größe".to_string()),
            Some("W9".to_string()),
            vec![entity("WärmeBehandlung", "Prozess"), entity("µStructure", "Property")],
        );

        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("WärmeBehandlung"));
        assert!(json.contains("µStructure"));

        let back: DocumentRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_rejects_mismatched_columns() {
        let json = r#"{"DOI":"none","OpenAlexID":"none","Entities":["A","B"],"Entity_types":["X"]}"#;
        assert!(serde_json::from_str::<DocumentRecord>(json).is_err());
    }

    #[test]
    fn test_rejects_duplicate_entities() {
        let json = r#"{"DOI":"none","OpenAlexID":"none","Entities":["A","A"],"Entity_types":["X","Y"]}"#;
        assert!(serde_json::from_str::<DocumentRecord>(json).is_err());
    }

    #[test]
    fn test_error_helpers() {
        let err = AmnerError::NotFound("10.1/x".to_string());
        assert!(err.is_not_found());

        let err = AmnerError::io("a.pdf", std::io::Error::other("boom"));
        assert!(!err.is_not_found());
        assert!(err.to_string().contains("a.pdf"));
    }
}
