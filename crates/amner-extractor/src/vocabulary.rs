//! Ontology vocabulary tables
//!
//! The catalog sheet lists every ontology term with its entity type and its
//! place in the class hierarchy (`Thing`, `SubClass1`..`SubClass9`). The
//! definitions sheet carries free-text definitions for the same terms. Both
//! are keyed by [`to_lookup_key`] of the raw term.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use amner_core::{AmnerError, Result};
use amner_parser::{SpreadsheetReader, Table};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::normalize::{to_canonical_form, to_lookup_key, to_title_case};

/// Number of `SubClassN` columns in the catalog
pub const SUBCLASS_COLUMNS: usize = 9;

const TERM_COLUMNS: &[&str] = &["entity", "term"];
const TYPE_COLUMNS: &[&str] = &["entity_type", "entitytype", "type"];
const THING_COLUMN: &str = "Thing";
const DEFINITION_TERM_COLUMNS: &[&str] = &["entities", "entity", "term"];
const DEFINITION_COLUMN: &str = "Definition";

// ============================================================================
// Catalog
// ============================================================================

/// A catalog row in canonical form
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VocabularyEntry {
    /// Term as written in the sheet
    pub raw_term: String,

    /// Camel-case term used in output
    pub canonical_term: String,

    /// Camel-case entity type
    pub entity_type: String,

    /// Camel-case subclass labels; `None` where the sheet is empty
    pub subclasses: [Option<String>; SUBCLASS_COLUMNS],

    /// Camel-case top-level category
    pub thing: Option<String>,
}

impl VocabularyEntry {
    /// Build an entry from raw sheet values, canonicalizing every label
    pub fn from_raw(
        raw_term: &str,
        entity_type: &str,
        thing: Option<&str>,
        subclasses: &[Option<&str>],
    ) -> Self {
        let mut canonical_subclasses: [Option<String>; SUBCLASS_COLUMNS] = Default::default();
        for (slot, value) in canonical_subclasses.iter_mut().zip(subclasses) {
            *slot = canonical_optional(*value);
        }

        Self {
            raw_term: raw_term.to_string(),
            canonical_term: to_canonical_form(raw_term),
            entity_type: to_canonical_form(entity_type),
            subclasses: canonical_subclasses,
            thing: canonical_optional(thing),
        }
    }

    /// Subclass labels that are set, most general first, followed by `thing`
    pub fn hierarchy(&self) -> impl Iterator<Item = &str> {
        self.subclasses
            .iter()
            .flatten()
            .chain(self.thing.iter())
            .map(String::as_str)
    }
}

fn canonical_optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(to_canonical_form)
        .filter(|v| !v.is_empty())
}

/// Catalog of ontology terms keyed by lookup key
#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    entries: HashMap<String, VocabularyEntry>,
    /// Keys in first-insertion order
    order: Vec<String>,
    /// Spellings the tokenizer must keep as one token
    special_cases: Vec<String>,
    special_seen: HashSet<String>,
    overwritten: usize,
}

impl Vocabulary {
    /// Create an empty vocabulary
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the catalog from the first sheet of a workbook
    pub fn load(path: &Path) -> Result<Self> {
        let table = SpreadsheetReader::new().read_first_sheet(path)?;
        let vocabulary = Self::from_table(&table)?;
        info!(
            path = %path.display(),
            terms = vocabulary.len(),
            overwritten = vocabulary.overwritten(),
            "loaded ontology catalog"
        );
        Ok(vocabulary)
    }

    /// Build the catalog from a table with `entity`, `entity_type`, `Thing`
    /// and `SubClass1`..`SubClass9` columns.
    ///
    /// `entity` and `entity_type` are required; the others may be absent.
    pub fn from_table(table: &Table) -> Result<Self> {
        let term_col = required_column(table, TERM_COLUMNS)?;
        let type_col = required_column(table, TYPE_COLUMNS)?;
        let thing_col = table.column(THING_COLUMN);
        let subclass_cols: Vec<Option<usize>> = (1..=SUBCLASS_COLUMNS)
            .map(|i| table.column(&format!("SubClass{i}")))
            .collect();

        let mut vocabulary = Self::new();
        for (index, row) in table.rows.iter().enumerate() {
            let raw = table.cell(row, Some(term_col)).trim();
            if raw.is_empty() {
                debug!(row = index + 2, "skipping catalog row without a term");
                continue;
            }

            let subclasses: Vec<Option<&str>> = subclass_cols
                .iter()
                .map(|col| col.map(|c| table.cell(row, Some(c))))
                .collect();

            let entry = VocabularyEntry::from_raw(
                raw,
                table.cell(row, Some(type_col)),
                thing_col.map(|c| table.cell(row, Some(c))),
                &subclasses,
            );
            vocabulary.insert(entry);
        }

        Ok(vocabulary)
    }

    /// Add an entry; a previous entry with the same key is replaced and returned.
    ///
    /// The raw, lower-case and title-case spellings of the term are recorded
    /// as tokenizer special cases.
    pub fn insert(&mut self, entry: VocabularyEntry) -> Option<VocabularyEntry> {
        let key = to_lookup_key(&entry.raw_term);

        for spelling in [
            entry.raw_term.clone(),
            entry.raw_term.to_lowercase(),
            to_title_case(&entry.raw_term),
        ] {
            if self.special_seen.insert(spelling.clone()) {
                self.special_cases.push(spelling);
            }
        }

        let previous = self.entries.insert(key.clone(), entry);
        if previous.is_some() {
            self.overwritten += 1;
            warn!(key = %key, "duplicate catalog term, keeping the later row");
        } else {
            self.order.push(key);
        }
        previous
    }

    /// Entry for a surface form, looked up by its lookup key
    pub fn get(&self, text: &str) -> Option<&VocabularyEntry> {
        self.entries.get(&to_lookup_key(text))
    }

    /// Iterate `(key, entry)` in first-insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &VocabularyEntry)> {
        self.order
            .iter()
            .filter_map(|key| self.entries.get(key).map(|entry| (key.as_str(), entry)))
    }

    /// Spellings to register with the tokenizer as atomic tokens
    pub fn special_cases(&self) -> &[String] {
        &self.special_cases
    }

    /// Number of rows that replaced an earlier row with the same key
    pub fn overwritten(&self) -> usize {
        self.overwritten
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// Definitions
// ============================================================================

/// Definition of an ontology term
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DefinitionEntry {
    pub raw_term: String,
    pub definition: Option<String>,
}

/// Term definitions keyed by lookup key
#[derive(Debug, Clone, Default)]
pub struct Definitions {
    entries: HashMap<String, DefinitionEntry>,
}

impl Definitions {
    /// Read definitions from the first sheet of a workbook
    pub fn load(path: &Path) -> Result<Self> {
        let table = SpreadsheetReader::new().read_first_sheet(path)?;
        let definitions = Self::from_table(&table)?;
        info!(path = %path.display(), terms = definitions.len(), "loaded definitions");
        Ok(definitions)
    }

    /// Build from a table with `entities` and `Definition` columns; rows
    /// without a term are skipped
    pub fn from_table(table: &Table) -> Result<Self> {
        let term_col = required_column(table, DEFINITION_TERM_COLUMNS)?;
        let definition_col = required_column(table, &[DEFINITION_COLUMN])?;

        let entries = table
            .rows
            .iter()
            .filter_map(|row| {
                let raw = table.cell(row, Some(term_col)).trim();
                if raw.is_empty() {
                    return None;
                }
                let definition = table.cell(row, Some(definition_col)).trim();
                let entry = DefinitionEntry {
                    raw_term: raw.to_string(),
                    definition: (!definition.is_empty()).then(|| definition.to_string()),
                };
                Some((to_lookup_key(raw), entry))
            })
            .collect();

        Ok(Self { entries })
    }

    /// Definition for a surface form, looked up by its lookup key
    pub fn get(&self, text: &str) -> Option<&DefinitionEntry> {
        self.entries.get(&to_lookup_key(text))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn required_column(table: &Table, names: &[&str]) -> Result<usize> {
    names
        .iter()
        .find_map(|name| table.column(name))
        .ok_or_else(|| {
            AmnerError::Vocabulary(format!(
                "missing column {} in {}",
                names[0],
                table.caption.as_deref().unwrap_or("sheet")
            ))
        })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Table {
        let mut table = Table::new().with_headers([
            "entity",
            "entity_type",
            "Thing",
            "SubClass1",
            "SubClass2",
            "SubClass3",
        ]);
        table.add_row([
            "laser powder bed fusion",
            "process",
            "Process",
            "manufacturing process",
            "additive-manufacturing process",
            "",
        ]);
        table.add_row(["Ti-6Al-4V", "material", "", "titanium alloy", "", ""]);
        table.add_row(["", "material", "", "", "", ""]);
        table
    }

    #[test]
    fn test_catalog_entries_canonicalized() {
        let vocabulary = Vocabulary::from_table(&catalog()).unwrap();
        assert_eq!(vocabulary.len(), 2);

        let entry = vocabulary.get("  Laser  Powder Bed Fusion").unwrap();
        assert_eq!(entry.canonical_term, "laserPowderBedFusion");
        assert_eq!(entry.entity_type, "process");
        assert_eq!(entry.thing.as_deref(), Some("Process"));
        assert_eq!(entry.subclasses[0].as_deref(), Some("manufacturingProcess"));
        assert_eq!(
            entry.subclasses[1].as_deref(),
            Some("additiveManufacturingProcess")
        );
        assert_eq!(entry.subclasses[2], None);
        assert_eq!(entry.subclasses[8], None);

        let alloy = vocabulary.get("ti-6al-4v").unwrap();
        assert_eq!(alloy.canonical_term, "Ti6Al4V");
        assert_eq!(alloy.thing, None);
        assert_eq!(
            alloy.hierarchy().collect::<Vec<_>>(),
            vec!["titaniumAlloy"]
        );
    }

    #[test]
    fn test_every_row_recoverable_by_key() {
        let table = catalog();
        let vocabulary = Vocabulary::from_table(&table).unwrap();

        for row in table.rows.iter().filter(|r| !r[0].is_empty()) {
            let entry = vocabulary.get(&to_lookup_key(&row[0])).unwrap();
            assert_eq!(entry.canonical_term, to_canonical_form(&row[0]));
            assert_eq!(entry.entity_type, to_canonical_form(&row[1]));
        }
    }

    #[test]
    fn test_special_case_spellings() {
        let vocabulary = Vocabulary::from_table(&catalog()).unwrap();
        let specials = vocabulary.special_cases();

        assert!(specials.contains(&"laser powder bed fusion".to_string()));
        assert!(specials.contains(&"Laser Powder Bed Fusion".to_string()));
        assert!(specials.contains(&"Ti-6Al-4V".to_string()));
        assert!(specials.contains(&"ti-6al-4v".to_string()));
        // Raw and lower-case coincide for the first row, raw and title-case for the second
        assert_eq!(specials.len(), 4);
    }

    #[test]
    fn test_last_duplicate_wins() {
        let mut table = Table::new().with_headers(["entity", "entity_type"]);
        table.add_row(["powder", "material"]);
        table.add_row(["binder", "material"]);
        table.add_row(["Powder ", "feedstock"]);

        let vocabulary = Vocabulary::from_table(&table).unwrap();
        assert_eq!(vocabulary.len(), 2);
        assert_eq!(vocabulary.overwritten(), 1);
        assert_eq!(vocabulary.get("powder").unwrap().entity_type, "feedstock");

        let keys: Vec<_> = vocabulary.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["powder", "binder"]);
    }

    #[test]
    fn test_missing_required_column() {
        let table = Table::new().with_headers(["entity", "Thing"]);
        let err = Vocabulary::from_table(&table).unwrap_err();
        assert!(matches!(err, AmnerError::Vocabulary(_)));
        assert!(err.to_string().contains("entity_type"));
    }

    #[test]
    fn test_definitions() {
        let mut table =
            Table::new().with_headers(["entities", "entity_types", "Definition", "Thing"]);
        table.add_row([
            "Laser Powder Bed Fusion",
            "process",
            "Fuses powder layers with a laser.",
            "Process",
        ]);
        table.add_row(["", "process", "orphan definition", ""]);
        table.add_row(["binder jetting", "process", "", ""]);

        let definitions = Definitions::from_table(&table).unwrap();
        assert_eq!(definitions.len(), 2);

        let entry = definitions.get("laser powder bed fusion").unwrap();
        assert_eq!(entry.raw_term, "Laser Powder Bed Fusion");
        assert_eq!(
            entry.definition.as_deref(),
            Some("Fuses powder layers with a laser.")
        );
        assert_eq!(definitions.get("Binder Jetting").unwrap().definition, None);
    }

    #[test]
    fn test_definitions_require_definition_column() {
        let table = Table::new().with_headers(["entities"]);
        assert!(Definitions::from_table(&table).is_err());
    }
}
