//! Drug catalog backing the editor's drug search.

use serde::{Deserialize, Serialize};

use crate::models::Drug;

const BUNDLED_DRUGS: &str = include_str!("../resources/catalog/drugs.json");

/// Shortest search term that returns results.
pub const MIN_SEARCH_LEN: usize = 2;

/// A catalog drug with its prescribing metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    #[serde(flatten)]
    pub drug: Drug,
    #[serde(default)]
    pub manufacturer: String,
    #[serde(default)]
    pub indication: String,
}

impl CatalogEntry {
    fn matches(&self, needle: &str) -> bool {
        self.drug.brand_name.to_lowercase().contains(needle)
            || self
                .drug
                .named_ingredients()
                .any(|i| i.to_lowercase().contains(needle))
            || self.drug.category.to_lowercase().contains(needle)
    }
}

#[derive(Debug, Clone, Default)]
pub struct DrugCatalog {
    entries: Vec<CatalogEntry>,
}

impl DrugCatalog {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    pub fn bundled() -> Result<Self, serde_json::Error> {
        Self::from_json(BUNDLED_DRUGS)
    }

    /// Case-insensitive substring search over brand, ingredients and
    /// category, in catalog order. Terms under `MIN_SEARCH_LEN` characters
    /// return nothing.
    pub fn search(&self, term: &str) -> Vec<&CatalogEntry> {
        let needle = term.trim().to_lowercase();
        if needle.chars().count() < MIN_SEARCH_LEN {
            return Vec::new();
        }
        self.entries.iter().filter(|e| e.matches(&needle)).collect()
    }

    /// Exact brand lookup, ignoring case.
    pub fn find_by_brand(&self, brand: &str) -> Option<&CatalogEntry> {
        let brand = brand.trim().to_lowercase();
        self.entries
            .iter()
            .find(|e| e.drug.brand_name.to_lowercase() == brand)
    }

    pub fn get(&self, drug_id: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|e| e.drug.id == drug_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
