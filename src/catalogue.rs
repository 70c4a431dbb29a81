use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use strum::EnumIter;

use crate::error::ExtractError;

/// Financial statement a concept belongs to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, EnumIter,
)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    BalanceSheet,
    IncomeStatement,
    CashFlow,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::BalanceSheet => write!(f, "balance_sheet"),
            Category::IncomeStatement => write!(f, "income_statement"),
            Category::CashFlow => write!(f, "cash_flow"),
        }
    }
}

/// Catalogue record as it appears in the JSON document, keyed by concept name.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConceptEntry {
    primary: String,
    #[serde(default)]
    aliases: Vec<String>,
    category: Category,
    #[serde(default)]
    description: String,
}

/// One abstract accounting concept and the tags filers use for it.
///
/// `primary` is the preferred taxonomy tag; `aliases` are tried in order when
/// the primary is absent from a filing. Earlier aliases win.
#[derive(Debug, Clone, PartialEq)]
pub struct ConceptDefinition {
    pub name: String,
    pub primary: String,
    pub aliases: Vec<String>,
    pub category: Category,
    pub description: String,
}

impl ConceptDefinition {
    /// Candidate tags in resolution order: primary first, then aliases.
    pub fn candidates(&self) -> impl Iterator<Item = &str> + '_ {
        std::iter::once(self.primary.as_str()).chain(self.aliases.iter().map(String::as_str))
    }
}

/// Immutable concept-to-tag table, loaded once per process.
#[derive(Debug, Clone)]
pub struct ConceptCatalogue {
    concepts: BTreeMap<String, ConceptDefinition>,
}

static BUILTIN: Lazy<ConceptCatalogue> = Lazy::new(|| {
    ConceptCatalogue::from_json(include_str!("builtin_catalogue.json"))
        .expect("built-in catalogue is valid")
});

impl ConceptCatalogue {
    /// Parses and validates a catalogue document. A structurally invalid
    /// document is a startup error, never deferred to resolution time.
    pub fn from_json(raw: &str) -> Result<Self, ExtractError> {
        let entries: BTreeMap<String, ConceptEntry> = serde_json::from_str(raw)
            .map_err(|e| ExtractError::InvalidCatalogue(e.to_string()))?;

        let mut concepts = BTreeMap::new();
        for (name, entry) in entries {
            if name.trim().is_empty() {
                return Err(ExtractError::InvalidCatalogue(
                    "empty concept name".to_string(),
                ));
            }
            if entry.primary.trim().is_empty() {
                return Err(ExtractError::InvalidCatalogue(format!(
                    "concept {} has an empty primary tag",
                    name
                )));
            }
            if entry.aliases.iter().any(|a| a.trim().is_empty()) {
                return Err(ExtractError::InvalidCatalogue(format!(
                    "concept {} has an empty alias",
                    name
                )));
            }
            concepts.insert(
                name.clone(),
                ConceptDefinition {
                    name,
                    primary: entry.primary,
                    aliases: entry.aliases,
                    category: entry.category,
                    description: entry.description,
                },
            );
        }

        if concepts.is_empty() {
            return Err(ExtractError::InvalidCatalogue(
                "catalogue defines no concepts".to_string(),
            ));
        }

        log::info!("catalogue loaded: {} concepts", concepts.len());
        Ok(Self { concepts })
    }

    pub fn from_file(path: &Path) -> Result<Self, ExtractError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ExtractError::InvalidCatalogue(format!("{}: {}", path.display(), e))
        })?;
        Self::from_json(&raw)
    }

    /// Default catalogue shipped with the crate: the standard us-gaap concept
    /// inventory across balance sheet, income statement and cash flow.
    pub fn builtin() -> &'static ConceptCatalogue {
        &BUILTIN
    }

    pub fn get(&self, name: &str) -> Option<&ConceptDefinition> {
        self.concepts.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.concepts.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.concepts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.concepts.keys().map(String::as_str)
    }

    pub fn concepts(&self) -> impl Iterator<Item = &ConceptDefinition> {
        self.concepts.values()
    }
}
