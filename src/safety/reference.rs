use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::models::enums::Severity;

use super::helpers::{normalize_name, pair_key, resolve_alias};
use super::types::KnowledgeBaseError;

pub const INTERACTIONS_FILE: &str = "interactions.json";
pub const ALLERGIES_FILE: &str = "allergies.json";
pub const ALIASES_FILE: &str = "ingredient_aliases.json";

const BUNDLED_INTERACTIONS: &str = include_str!("../../resources/knowledge/interactions.json");
const BUNDLED_ALLERGIES: &str = include_str!("../../resources/knowledge/allergies.json");
const BUNDLED_ALIASES: &str = include_str!("../../resources/knowledge/ingredient_aliases.json");

// ---------------------------------------------------------------------------
// Raw input rows (as read from the reference tables)
// ---------------------------------------------------------------------------

/// One row of the interaction table. Fields default to empty so that
/// validation, not deserialization, reports what is missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawInteractionRecord {
    pub drug_a: String,
    pub drug_b: String,
    pub severity: String,
    pub description: String,
    pub mechanism: String,
    pub clinical_effect: String,
    pub management: String,
    pub references: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawAllergyRecord {
    pub allergen: String,
    pub related_ingredients: Vec<String>,
    pub severity: String,
    pub reaction: String,
}

/// Alternate name for a generic ingredient.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IngredientAlias {
    pub alias: String,
    pub generic_name: String,
}

// ---------------------------------------------------------------------------
// Validated rules
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionRule {
    /// Canonical ingredient names, sorted.
    pub ingredients: (String, String),
    pub severity: Severity,
    pub description: String,
    pub mechanism: String,
    pub clinical_effect: String,
    pub management: String,
    pub references: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllergyRule {
    pub allergen: String,
    /// Canonical ingredient names.
    pub related_ingredients: BTreeSet<String>,
    pub severity: Severity,
    pub reaction: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeBaseStats {
    pub interaction_rules: usize,
    pub allergy_rules: usize,
    pub aliases: usize,
}

// ---------------------------------------------------------------------------
// KnowledgeBase
// ---------------------------------------------------------------------------

/// Validated, indexed reference data. Built once at startup and shared
/// read-only (`Arc<KnowledgeBase>`) by every session.
#[derive(Debug)]
pub struct KnowledgeBase {
    pairs: HashMap<(String, String), InteractionRule>,
    allergens: HashMap<String, AllergyRule>,
    aliases: HashMap<String, String>,
}

impl KnowledgeBase {
    /// Validate raw tables and build lookup indices.
    /// The first invalid record aborts the load.
    pub fn load(
        interactions: Vec<RawInteractionRecord>,
        allergies: Vec<RawAllergyRecord>,
    ) -> Result<Self, KnowledgeBaseError> {
        Self::load_with_aliases(interactions, allergies, Vec::new())
    }

    pub fn load_with_aliases(
        interactions: Vec<RawInteractionRecord>,
        allergies: Vec<RawAllergyRecord>,
        aliases: Vec<IngredientAlias>,
    ) -> Result<Self, KnowledgeBaseError> {
        let mut kb = Self {
            pairs: HashMap::with_capacity(interactions.len()),
            allergens: HashMap::with_capacity(allergies.len()),
            aliases: HashMap::with_capacity(aliases.len()),
        };

        for (index, alias) in aliases.into_iter().enumerate() {
            let from = normalize_name(&alias.alias);
            let to = normalize_name(&alias.generic_name);
            if from.is_empty() || to.is_empty() {
                return Err(invalid("aliases", index, "alias and genericName are required"));
            }
            if kb.aliases.insert(from.clone(), to).is_some() {
                return Err(KnowledgeBaseError::DuplicateRule {
                    table: "aliases",
                    key: from,
                });
            }
        }

        for (index, raw) in interactions.into_iter().enumerate() {
            let rule = kb.validate_interaction(index, raw)?;
            let key = rule.ingredients.clone();
            if kb.pairs.contains_key(&key) {
                return Err(KnowledgeBaseError::DuplicateRule {
                    table: "interactions",
                    key: format!("{}+{}", key.0, key.1),
                });
            }
            kb.pairs.insert(key, rule);
        }

        for (index, raw) in allergies.into_iter().enumerate() {
            let (key, rule) = kb.validate_allergy(index, raw)?;
            if kb.allergens.contains_key(&key) {
                return Err(KnowledgeBaseError::DuplicateRule {
                    table: "allergies",
                    key,
                });
            }
            kb.allergens.insert(key, rule);
        }

        Ok(kb)
    }

    /// Load the three reference tables from a directory.
    /// The alias table is optional; the other two are required.
    pub fn load_from_dir(dir: &Path) -> Result<Self, KnowledgeBaseError> {
        let interactions = read_table(&dir.join(INTERACTIONS_FILE))?;
        let allergies = read_table(&dir.join(ALLERGIES_FILE))?;
        let aliases_path = dir.join(ALIASES_FILE);
        let aliases = if aliases_path.exists() {
            read_table(&aliases_path)?
        } else {
            Vec::new()
        };
        Self::load_with_aliases(interactions, allergies, aliases)
    }

    /// Reference tables compiled into the binary.
    pub fn bundled() -> Result<Self, KnowledgeBaseError> {
        let interactions = parse_table(INTERACTIONS_FILE, BUNDLED_INTERACTIONS)?;
        let allergies = parse_table(ALLERGIES_FILE, BUNDLED_ALLERGIES)?;
        let aliases = parse_table(ALIASES_FILE, BUNDLED_ALIASES)?;
        Self::load_with_aliases(interactions, allergies, aliases)
    }

    /// Canonical form of an ingredient or allergen name.
    pub fn canonicalize(&self, name: &str) -> String {
        resolve_alias(normalize_name(name), &self.aliases)
    }

    /// Pair index probe. Arguments must be canonical; order does not matter.
    pub fn interaction(&self, a: &str, b: &str) -> Option<&InteractionRule> {
        self.pairs.get(&pair_key(a, b))
    }

    /// Allergen index probe. Argument must be canonical.
    pub fn allergy_rule(&self, allergen_key: &str) -> Option<&AllergyRule> {
        self.allergens.get(allergen_key)
    }

    pub fn stats(&self) -> KnowledgeBaseStats {
        KnowledgeBaseStats {
            interaction_rules: self.pairs.len(),
            allergy_rules: self.allergens.len(),
            aliases: self.aliases.len(),
        }
    }

    fn validate_interaction(
        &self,
        index: usize,
        raw: RawInteractionRecord,
    ) -> Result<InteractionRule, KnowledgeBaseError> {
        let a = self.canonicalize(&raw.drug_a);
        let b = self.canonicalize(&raw.drug_b);
        if a.is_empty() || b.is_empty() {
            return Err(invalid("interactions", index, "drugA and drugB are required"));
        }
        if a == b {
            return Err(invalid(
                "interactions",
                index,
                "drugA and drugB resolve to the same ingredient",
            ));
        }
        let severity = parse_severity("interactions", index, &raw.severity)?;

        Ok(InteractionRule {
            ingredients: pair_key(&a, &b),
            severity,
            description: raw.description.trim().to_string(),
            mechanism: raw.mechanism.trim().to_string(),
            clinical_effect: raw.clinical_effect.trim().to_string(),
            management: raw.management.trim().to_string(),
            references: raw
                .references
                .into_iter()
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty())
                .collect(),
        })
    }

    fn validate_allergy(
        &self,
        index: usize,
        raw: RawAllergyRecord,
    ) -> Result<(String, AllergyRule), KnowledgeBaseError> {
        let key = self.canonicalize(&raw.allergen);
        if key.is_empty() {
            return Err(invalid("allergies", index, "allergen is required"));
        }
        if raw.related_ingredients.is_empty() {
            return Err(invalid("allergies", index, "relatedIngredients is empty"));
        }
        let mut related = BTreeSet::new();
        for ingredient in &raw.related_ingredients {
            let canonical = self.canonicalize(ingredient);
            if canonical.is_empty() {
                return Err(invalid(
                    "allergies",
                    index,
                    "relatedIngredients contains a blank name",
                ));
            }
            related.insert(canonical);
        }
        let severity = parse_severity("allergies", index, &raw.severity)?;

        Ok((
            key,
            AllergyRule {
                allergen: raw.allergen.trim().to_string(),
                related_ingredients: related,
                severity,
                reaction: raw.reaction.trim().to_string(),
            },
        ))
    }
}

fn invalid(table: &'static str, index: usize, reason: &str) -> KnowledgeBaseError {
    KnowledgeBaseError::InvalidRecord {
        table,
        index,
        reason: reason.to_string(),
    }
}

fn parse_severity(
    table: &'static str,
    index: usize,
    raw: &str,
) -> Result<Severity, KnowledgeBaseError> {
    raw.trim().to_lowercase().parse::<Severity>().map_err(|_| {
        KnowledgeBaseError::InvalidRecord {
            table,
            index,
            reason: format!("invalid severity {raw:?} (expected low, moderate or high)"),
        }
    })
}

fn read_table<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, KnowledgeBaseError> {
    let json = std::fs::read_to_string(path).map_err(|e| {
        KnowledgeBaseError::Io(path.display().to_string(), e.to_string())
    })?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    parse_table(&name, &json)
}

fn parse_table<T: DeserializeOwned>(name: &str, json: &str) -> Result<Vec<T>, KnowledgeBaseError> {
    serde_json::from_str(json)
        .map_err(|e| KnowledgeBaseError::Parse(name.to_string(), e.to_string()))
}
