//! Translation between collaborator data shapes and engine types.
//!
//! Inbound: prescription editor entries and patient allergy records become
//! `PrescriptionItem` / `Allergy`. Outbound: a `SafetyReport` becomes the
//! alert contract rendered by the dashboard.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::catalog::DrugCatalog;
use crate::models::enums::{AlertLevel, FindingKind, Severity};
use crate::models::{Allergy, Drug, PrescriptionItem};
use crate::safety::messages::MessageTemplates;
use crate::safety::types::{
    DataQualityIssue, FindingDetail, FindingId, ItemRef, OverrideRecord, ReviewedFinding,
    SafetyReport, SafetySummary,
};

/// Namespace for editor-assigned item ids ("prescription_1718", "quick_42").
const EDITOR_ID_NAMESPACE: Uuid = Uuid::from_u128(0x6d65_6473_6166_4500_8000_0000_0000_0001);

const DEFAULT_QUICK_FORM: &str = "Tablet";
const DEFAULT_QUICK_INSTRUCTIONS: &str = "As directed";

static STRENGTH_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d+(?:\.\d+)?)\s*(mg|mcg|g|ml|iu)\b").unwrap()
});

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("Prescription entry has no drug name")]
    MissingDrugName,

    #[error("Quick entry is empty")]
    EmptyQuickEntry,
}

// ---------------------------------------------------------------------------
// Inbound: prescription editor
// ---------------------------------------------------------------------------

/// A prescription line as the editor holds it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EditorPrescription {
    pub id: Option<String>,
    pub drug_id: Option<String>,
    pub brand_name: String,
    /// Combined display name, e.g. "Amoxicillin + Clavulanic Acid".
    pub generic_name: Option<String>,
    /// Explicit constituents; preferred over `generic_name` when present.
    pub ingredients: Option<Vec<String>>,
    pub strength: String,
    pub form: String,
    pub category: String,
    pub dosage: String,
    pub frequency: String,
    pub duration: String,
    pub route: String,
    pub instructions: String,
    pub created_at: Option<DateTime<Utc>>,
}

/// Engine id for an editor item. UUIDs pass through; other strings map to
/// a name-based UUID so the same editor id always yields the same item id.
pub fn engine_item_id(editor_id: Option<&str>) -> Uuid {
    match editor_id.map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => Uuid::parse_str(raw)
            .unwrap_or_else(|_| Uuid::new_v5(&EDITOR_ID_NAMESPACE, raw.as_bytes())),
        None => Uuid::new_v4(),
    }
}

/// Split a combined generic name into constituents on `+`, `/` and `,`.
pub fn split_generic_name(generic: &str) -> Vec<String> {
    generic
        .split(['+', '/', ','])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl EditorPrescription {
    fn ingredient_list(&self) -> Vec<String> {
        let explicit: Vec<String> = self
            .ingredients
            .iter()
            .flatten()
            .map(|i| i.trim())
            .filter(|i| !i.is_empty())
            .map(str::to_string)
            .collect();
        if !explicit.is_empty() {
            return explicit;
        }
        self.generic_name
            .as_deref()
            .map(split_generic_name)
            .unwrap_or_default()
    }

    /// Convert to an engine item. An entry without ingredient data is still
    /// accepted; detection reports it as unchecked.
    pub fn into_item(self, now: DateTime<Utc>) -> Result<PrescriptionItem, InputError> {
        let brand_name = self.brand_name.trim().to_string();
        let generic = self.generic_name.as_deref().map(str::trim).unwrap_or("");
        let brand_name = match (brand_name.is_empty(), generic.is_empty()) {
            (false, _) => brand_name,
            (true, false) => generic.to_string(),
            (true, true) => return Err(InputError::MissingDrugName),
        };

        let ingredients = self.ingredient_list();
        let id = engine_item_id(self.id.as_deref());

        Ok(PrescriptionItem {
            id,
            drug: Drug {
                id: self.drug_id.unwrap_or_else(|| id.to_string()),
                brand_name,
                ingredients,
                strength: self.strength,
                form: self.form,
                category: self.category,
            },
            dosage: self.dosage,
            frequency: self.frequency,
            duration: self.duration,
            route: self.route,
            instructions: self.instructions,
            created_at: self.created_at.unwrap_or(now),
        })
    }
}

// ---------------------------------------------------------------------------
// Inbound: quick entry
// ---------------------------------------------------------------------------

/// Free-text quick entry, e.g. "Amoxicillin 500mg".
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QuickPrescription {
    pub id: Option<String>,
    pub text: String,
    pub dosage: String,
    pub frequency: String,
    pub duration: String,
    pub instructions: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuickEntry {
    pub name: String,
    /// Empty when the text carries no strength.
    pub strength: String,
}

pub fn parse_quick_entry(text: &str) -> Result<QuickEntry, InputError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(InputError::EmptyQuickEntry);
    }

    let (name, strength) = match STRENGTH_PATTERN.find(text) {
        Some(m) => {
            let name = format!("{} {}", &text[..m.start()], &text[m.end()..]);
            let strength: String = m.as_str().split_whitespace().collect();
            (name, strength.to_lowercase())
        }
        None => (text.to_string(), String::new()),
    };

    let name = name.split_whitespace().collect::<Vec<_>>().join(" ");
    if name.is_empty() {
        return Err(InputError::MissingDrugName);
    }
    Ok(QuickEntry { name, strength })
}

impl QuickPrescription {
    /// Resolve through the catalog by brand; an unknown name is taken as its
    /// own generic ingredient.
    pub fn into_item(
        self,
        catalog: &DrugCatalog,
        now: DateTime<Utc>,
    ) -> Result<PrescriptionItem, InputError> {
        let entry = parse_quick_entry(&self.text)?;
        let id = engine_item_id(self.id.as_deref());

        let drug = match catalog.find_by_brand(&entry.name) {
            Some(found) => {
                let mut drug = found.drug.clone();
                if !entry.strength.is_empty() {
                    drug.strength = entry.strength;
                }
                drug
            }
            None => Drug {
                id: id.to_string(),
                brand_name: entry.name.clone(),
                ingredients: vec![entry.name],
                strength: entry.strength,
                form: DEFAULT_QUICK_FORM.to_string(),
                category: String::new(),
            },
        };

        let instructions = match self.instructions.trim() {
            "" => DEFAULT_QUICK_INSTRUCTIONS.to_string(),
            s => s.to_string(),
        };

        Ok(PrescriptionItem {
            id,
            drug,
            dosage: self.dosage,
            frequency: self.frequency,
            duration: self.duration,
            route: String::new(),
            instructions,
            created_at: now,
        })
    }
}

// ---------------------------------------------------------------------------
// Inbound: patient allergies
// ---------------------------------------------------------------------------

/// Patient record allergy: either a bare allergen name or a detailed entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PatientAllergyRecord {
    Name(String),
    Detailed {
        #[serde(alias = "allergen")]
        name: String,
        #[serde(default)]
        severity: Option<String>,
        #[serde(default)]
        reaction: Option<String>,
    },
}

impl PatientAllergyRecord {
    /// `None` for a blank allergen name. An unrecognised or missing severity
    /// is treated as high.
    pub fn to_allergy(&self) -> Option<Allergy> {
        let (name, severity, reaction) = match self {
            Self::Name(name) => (name.as_str(), None, None),
            Self::Detailed {
                name,
                severity,
                reaction,
            } => (name.as_str(), severity.as_deref(), reaction.as_deref()),
        };
        let allergen = name.trim();
        if allergen.is_empty() {
            return None;
        }
        Some(Allergy {
            allergen: allergen.to_string(),
            severity: severity
                .and_then(Severity::parse_lenient)
                .unwrap_or(Severity::High),
            reaction: reaction.unwrap_or_default().trim().to_string(),
        })
    }
}

pub fn to_allergies(records: &[PatientAllergyRecord]) -> Vec<Allergy> {
    records.iter().filter_map(PatientAllergyRecord::to_allergy).collect()
}

// ---------------------------------------------------------------------------
// Outbound: alert contract
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SafetyAlert {
    pub id: FindingId,
    pub kind: FindingKind,
    pub severity: Severity,
    pub level: AlertLevel,
    pub title: String,
    pub message: String,
    /// Management guidance from the interaction rule, if any.
    pub recommendation: Option<String>,
    pub items: Vec<ItemRef>,
    pub allergen: Option<String>,
    pub detail: FindingDetail,
    pub acknowledged: bool,
    #[serde(rename = "override")]
    pub override_record: Option<OverrideRecord>,
}

impl From<&ReviewedFinding> for SafetyAlert {
    fn from(reviewed: &ReviewedFinding) -> Self {
        let finding = &reviewed.finding;
        let (title, message, recommendation, items, allergen) = match &finding.detail {
            FindingDetail::Interaction(d) => (
                MessageTemplates::interaction_title(finding.severity),
                MessageTemplates::interaction(
                    &d.item_a.brand_name,
                    &d.ingredient_a,
                    &d.item_b.brand_name,
                    &d.ingredient_b,
                    &d.rule.description,
                ),
                Some(d.rule.management.clone()).filter(|m| !m.is_empty()),
                vec![d.item_a.clone(), d.item_b.clone()],
                None,
            ),
            FindingDetail::Allergy(d) => (
                MessageTemplates::allergy_title(&d.allergen),
                MessageTemplates::allergy(
                    &d.allergen,
                    &d.item.brand_name,
                    &d.matching_ingredients,
                    &d.reaction,
                ),
                None,
                vec![d.item.clone()],
                Some(d.allergen.clone()),
            ),
        };

        SafetyAlert {
            id: finding.id.clone(),
            kind: finding.kind,
            severity: finding.severity,
            level: finding.severity.alert_level(),
            title,
            message,
            recommendation,
            items,
            allergen,
            detail: finding.detail.clone(),
            acknowledged: !reviewed.is_active(),
            override_record: reviewed.override_record.clone(),
        }
    }
}

/// An item shown as "not checked".
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UncheckedItem {
    pub item_id: Uuid,
    pub brand_name: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertReport {
    /// Engine order: severity descending, then detection order.
    pub alerts: Vec<SafetyAlert>,
    pub summary: SafetySummary,
    pub unchecked: Vec<UncheckedItem>,
    pub processing_time_ms: u64,
}

impl From<&SafetyReport> for AlertReport {
    fn from(report: &SafetyReport) -> Self {
        let alerts = report.alerts.findings.iter().map(SafetyAlert::from).collect();
        let unchecked = report
            .warnings
            .iter()
            .filter(|w| w.issue == DataQualityIssue::MissingIngredients)
            .map(|w| UncheckedItem {
                item_id: w.item_id,
                brand_name: w.brand_name.clone(),
                message: MessageTemplates::unchecked_item(&w.brand_name),
            })
            .collect();

        AlertReport {
            alerts,
            summary: report.summary.clone(),
            unchecked,
            processing_time_ms: report.processing_time_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::TimeZone;

    use super::*;
    use crate::safety::{DefaultSafetyEngine, KnowledgeBase, OverrideLedger, SafetyEngine};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 9, 10, 9, 0, 0).unwrap()
    }

    fn make_editor(id: &str, brand: &str, generic: &str) -> EditorPrescription {
        EditorPrescription {
            id: Some(id.into()),
            brand_name: brand.into(),
            generic_name: Some(generic.into()),
            ..Default::default()
        }
    }

    #[test]
    fn editor_ids_map_deterministically() {
        let a = engine_item_id(Some("prescription_1718"));
        let b = engine_item_id(Some("prescription_1718"));
        let c = engine_item_id(Some("prescription_1719"));
        assert_eq!(a, b);
        assert_ne!(a, c);

        let raw = Uuid::new_v4();
        assert_eq!(engine_item_id(Some(&raw.to_string())), raw);
        assert_ne!(engine_item_id(None), engine_item_id(None));
    }

    #[test]
    fn generic_name_split_on_separators() {
        assert_eq!(
            split_generic_name("Amoxicillin + Clavulanic Acid"),
            vec!["Amoxicillin", "Clavulanic Acid"]
        );
        assert_eq!(
            split_generic_name("Trimethoprim/Sulfamethoxazole"),
            vec!["Trimethoprim", "Sulfamethoxazole"]
        );
        assert_eq!(split_generic_name("a, ,b"), vec!["a", "b"]);
        assert!(split_generic_name("  ").is_empty());
    }

    #[test]
    fn explicit_ingredients_win_over_generic_name() {
        let mut editor = make_editor("p1", "Augmentin", "Co-amoxiclav");
        editor.ingredients = Some(vec!["Amoxicillin".into(), " ".into(), "Clavulanic Acid".into()]);
        let item = editor.into_item(now()).unwrap();
        assert_eq!(item.drug.ingredients, vec!["Amoxicillin", "Clavulanic Acid"]);
    }

    #[test]
    fn editor_entry_needs_a_name() {
        let editor = EditorPrescription::default();
        assert_eq!(editor.into_item(now()).unwrap_err(), InputError::MissingDrugName);

        let generic_only = EditorPrescription {
            generic_name: Some("Metformin".into()),
            ..Default::default()
        };
        let item = generic_only.into_item(now()).unwrap();
        assert_eq!(item.drug.brand_name, "Metformin");
        assert_eq!(item.created_at, now());
    }

    #[test]
    fn quick_entry_parses_strength() {
        assert_eq!(
            parse_quick_entry("Amoxicillin 500mg").unwrap(),
            QuickEntry {
                name: "Amoxicillin".into(),
                strength: "500mg".into()
            }
        );
        assert_eq!(
            parse_quick_entry("  Paracetamol 2.5 ML syrup ").unwrap(),
            QuickEntry {
                name: "Paracetamol syrup".into(),
                strength: "2.5ml".into()
            }
        );
        assert_eq!(parse_quick_entry("Cetirizine").unwrap().strength, "");
    }

    #[test]
    fn quick_entry_rejects_blank_or_strength_only() {
        assert_eq!(parse_quick_entry("  ").unwrap_err(), InputError::EmptyQuickEntry);
        assert_eq!(parse_quick_entry("500mg").unwrap_err(), InputError::MissingDrugName);
    }

    #[test]
    fn quick_prescription_resolves_catalog_brand() {
        let catalog = DrugCatalog::bundled().unwrap();
        let quick = QuickPrescription {
            text: "augmentin 1000mg".into(),
            dosage: "1 tablet".into(),
            ..Default::default()
        };
        let item = quick.into_item(&catalog, now()).unwrap();
        assert_eq!(item.drug.id, "drug_002");
        assert_eq!(item.drug.strength, "1000mg");
        assert_eq!(item.drug.named_ingredients().count(), 2);
        assert_eq!(item.instructions, DEFAULT_QUICK_INSTRUCTIONS);
    }

    #[test]
    fn quick_prescription_unknown_name_is_its_own_ingredient() {
        let catalog = DrugCatalog::bundled().unwrap();
        let quick = QuickPrescription {
            text: "Warfarin 5mg".into(),
            ..Default::default()
        };
        let item = quick.into_item(&catalog, now()).unwrap();
        assert_eq!(item.drug.ingredients, vec!["Warfarin"]);
        assert_eq!(item.drug.form, DEFAULT_QUICK_FORM);
    }

    #[test]
    fn allergy_records_in_both_shapes() {
        let records: Vec<PatientAllergyRecord> = serde_json::from_str(
            r#"["Penicillin", {"name": "Sulfa", "severity": "Mild", "reaction": "Rash"},
                {"allergen": "Latex", "severity": "???"}, "  "]"#,
        )
        .unwrap();
        let allergies = to_allergies(&records);
        assert_eq!(allergies.len(), 3);
        assert_eq!(allergies[0].allergen, "Penicillin");
        assert_eq!(allergies[0].severity, Severity::High);
        assert_eq!(allergies[1].severity, Severity::Low);
        assert_eq!(allergies[1].reaction, "Rash");
        assert_eq!(allergies[2].severity, Severity::High);
    }

    #[test]
    fn report_maps_to_alert_contract() {
        let engine = DefaultSafetyEngine::new(Arc::new(KnowledgeBase::bundled().unwrap()));
        let items = vec![
            make_editor("p1", "Augmentin", "Amoxicillin + Clavulanic Acid")
                .into_item(now())
                .unwrap(),
            make_editor("p2", "Atorvastatin", "Atorvastatin Calcium")
                .into_item(now())
                .unwrap(),
            make_editor("p3", "Mystery Syrup", "").into_item(now()).unwrap(),
        ];
        let allergies = to_allergies(&[PatientAllergyRecord::Name("Penicillin".into())]);

        let report = engine.review(&items, &allergies, &OverrideLedger::new());
        let alerts = AlertReport::from(&report);

        assert_eq!(alerts.alerts.len(), 2);
        assert!(alerts.alerts.iter().all(|a| a.level == AlertLevel::Critical));
        let interaction = alerts
            .alerts
            .iter()
            .find(|a| a.kind == FindingKind::Interaction)
            .unwrap();
        assert_eq!(interaction.items.len(), 2);
        assert!(interaction.recommendation.is_some());
        let allergy = alerts
            .alerts
            .iter()
            .find(|a| a.kind == FindingKind::Allergy)
            .unwrap();
        assert_eq!(allergy.allergen.as_deref(), Some("Penicillin"));
        assert!(!allergy.acknowledged);

        assert_eq!(alerts.unchecked.len(), 1);
        assert_eq!(alerts.unchecked[0].brand_name, "Mystery Syrup");
        assert!(alerts.summary.blocking);
    }
}
