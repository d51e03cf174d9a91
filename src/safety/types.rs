use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::enums::{FindingKind, OverrideReason, Severity};

use super::reference::{AllergyRule, InteractionRule};

// ---------------------------------------------------------------------------
// FindingId
// ---------------------------------------------------------------------------

/// Stable, content-derived finding identity.
///
/// Built from the sorted participant key, never from list position:
/// `interaction:<item-uuid>:<item-uuid>` (uuids sorted) or
/// `allergy:<item-uuid>:<canonical allergen>`. The same participants always
/// produce the same id, whatever order the draft lists them in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FindingId(String);

const INTERACTION_PREFIX: &str = "interaction:";
const ALLERGY_PREFIX: &str = "allergy:";

impl FindingId {
    pub fn interaction(a: Uuid, b: Uuid) -> Self {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        Self(format!("{INTERACTION_PREFIX}{lo}:{hi}"))
    }

    /// `allergen_key` must already be canonical (see `KnowledgeBase::canonicalize`).
    pub fn allergy(item_id: Uuid, allergen_key: &str) -> Self {
        Self(format!("{ALLERGY_PREFIX}{item_id}:{allergen_key}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn kind(&self) -> FindingKind {
        if self.0.starts_with(INTERACTION_PREFIX) {
            FindingKind::Interaction
        } else {
            FindingKind::Allergy
        }
    }

    /// Prescription item ids this finding refers to.
    pub fn item_ids(&self) -> Vec<Uuid> {
        match Self::split(&self.0) {
            Some(Parts::Interaction(a, b)) => vec![a, b],
            Some(Parts::Allergy(item, _)) => vec![item],
            None => Vec::new(),
        }
    }

    /// Canonical allergen key for allergy findings.
    pub fn allergen_key(&self) -> Option<&str> {
        self.0
            .strip_prefix(ALLERGY_PREFIX)
            .and_then(|rest| rest.split_once(':'))
            .map(|(_, allergen)| allergen)
    }

    fn split(raw: &str) -> Option<Parts<'_>> {
        if let Some(rest) = raw.strip_prefix(INTERACTION_PREFIX) {
            let (a, b) = rest.split_once(':')?;
            let a = Uuid::parse_str(a).ok()?;
            let b = Uuid::parse_str(b).ok()?;
            return (a <= b).then_some(Parts::Interaction(a, b));
        }
        if let Some(rest) = raw.strip_prefix(ALLERGY_PREFIX) {
            let (item, allergen) = rest.split_once(':')?;
            let item = Uuid::parse_str(item).ok()?;
            return (!allergen.trim().is_empty()).then_some(Parts::Allergy(item, allergen));
        }
        None
    }
}

enum Parts<'a> {
    Interaction(Uuid, Uuid),
    Allergy(Uuid, &'a str),
}

impl fmt::Display for FindingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for FindingId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match Self::split(s) {
            Some(_) => Ok(Self(s.to_string())),
            None => Err(ValidationError::MalformedFindingId(s.to_string())),
        }
    }
}

impl TryFrom<String> for FindingId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FindingId> for String {
    fn from(id: FindingId) -> Self {
        id.0
    }
}

// ---------------------------------------------------------------------------
// Finding
// ---------------------------------------------------------------------------

/// Reference to a prescription item inside a finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRef {
    pub item_id: Uuid,
    pub brand_name: String,
}

/// A detected interaction or allergy conflict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    pub id: FindingId,
    pub kind: FindingKind,
    pub severity: Severity,
    pub detail: FindingDetail,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FindingDetail {
    Interaction(InteractionDetail),
    Allergy(AllergyDetail),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionDetail {
    /// First in draft order.
    pub item_a: ItemRef,
    pub item_b: ItemRef,
    /// Canonical ingredient of `item_a` that triggered the rule.
    pub ingredient_a: String,
    pub ingredient_b: String,
    pub rule: InteractionRule,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllergyDetail {
    pub item: ItemRef,
    /// Allergen as recorded on the patient record.
    pub allergen: String,
    pub matching_ingredients: Vec<String>,
    pub reaction: String,
    /// `None` when matched directly on the allergen name rather than a rule.
    pub rule: Option<AllergyRule>,
}

// ---------------------------------------------------------------------------
// Data quality
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataQualityIssue {
    MissingIngredients,
    DuplicateItemId,
}

/// Non-fatal: an item excluded from matching. Shown as "not checked".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataQualityWarning {
    pub item_id: Uuid,
    pub brand_name: String,
    pub issue: DataQualityIssue,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionReport {
    pub findings: Vec<Finding>,
    pub warnings: Vec<DataQualityWarning>,
}

// ---------------------------------------------------------------------------
// Overrides
// ---------------------------------------------------------------------------

/// A clinician's decision to proceed despite a finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideRecord {
    pub finding_id: FindingId,
    pub reason: OverrideReason,
    /// Required for `custom`; an optional note otherwise.
    pub custom_text: Option<String>,
    pub actor: String,
    pub recorded_at: DateTime<Utc>,
}

/// A finding annotated with its current override, if any.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewedFinding {
    pub finding: Finding,
    pub override_record: Option<OverrideRecord>,
}

impl ReviewedFinding {
    pub fn is_active(&self) -> bool {
        self.override_record.is_none()
    }
}

/// Ledger view over one detection pass, in detection order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewedFindings {
    pub findings: Vec<ReviewedFinding>,
    /// Findings with no current override.
    pub active_count: usize,
}

impl ReviewedFindings {
    pub fn active(&self) -> impl Iterator<Item = &Finding> {
        self.findings
            .iter()
            .filter(|r| r.is_active())
            .map(|r| &r.finding)
    }

    pub fn acknowledged(&self) -> impl Iterator<Item = &ReviewedFinding> {
        self.findings.iter().filter(|r| !r.is_active())
    }
}

// ---------------------------------------------------------------------------
// Engine output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafetySummary {
    pub active_count: usize,
    pub acknowledged_count: usize,
    /// Items excluded from matching for lack of ingredient data.
    pub unchecked_items: usize,
    /// Any active high-severity finding.
    pub blocking: bool,
}

/// One full review of a draft: findings annotated by the ledger.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafetyReport {
    pub alerts: ReviewedFindings,
    pub warnings: Vec<DataQualityWarning>,
    pub summary: SafetySummary,
    pub processing_time_ms: u64,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Fatal at startup: malformed or incomplete reference data.
#[derive(Error, Debug)]
pub enum KnowledgeBaseError {
    #[error("Knowledge base read failed ({0}): {1}")]
    Io(String, String),

    #[error("Knowledge base parse failed ({0}): {1}")]
    Parse(String, String),

    #[error("Invalid {table} record #{index}: {reason}")]
    InvalidRecord {
        table: &'static str,
        index: usize,
        reason: String,
    },

    #[error("Duplicate {table} rule for {key}")]
    DuplicateRule { table: &'static str, key: String },
}

/// Non-fatal: a rejected override request. Nothing was changed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Unknown override reason code: {0:?}")]
    UnknownReasonCode(String),

    #[error("A custom override reason requires explanatory text")]
    MissingCustomText,

    #[error("Override requires an identified clinician")]
    MissingActor,

    #[error("Malformed finding id: {0:?}")]
    MalformedFindingId(String),

    #[error("No current finding with id {0}")]
    UnknownFinding(String),
}

impl ValidationError {
    /// Stable code without the offending input, safe to log.
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownReasonCode(_) => "unknown_reason_code",
            Self::MissingCustomText => "missing_custom_text",
            Self::MissingActor => "missing_actor",
            Self::MalformedFindingId(_) => "malformed_finding_id",
            Self::UnknownFinding(_) => "unknown_finding",
        }
    }
}
