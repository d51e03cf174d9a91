use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::enums::{FindingKind, OverrideReason};

use super::types::{
    Finding, FindingId, OverrideRecord, ReviewedFinding, ReviewedFindings, ValidationError,
};

/// Session-scoped override state: the latest record per finding id.
///
/// Not shared between drafts. Mutation goes through `&mut self`; the owning
/// session serializes access.
#[derive(Debug, Default)]
pub struct OverrideLedger {
    records: HashMap<FindingId, OverrideRecord>,
}

impl OverrideLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record (or replace) the override for `finding_id`.
    /// A rejected request leaves the ledger untouched.
    pub fn record_override(
        &mut self,
        finding_id: &FindingId,
        reason_code: &str,
        custom_text: Option<&str>,
        actor: &str,
        recorded_at: DateTime<Utc>,
    ) -> Result<&OverrideRecord, ValidationError> {
        let reason: OverrideReason = reason_code
            .trim()
            .parse()
            .map_err(|_| ValidationError::UnknownReasonCode(reason_code.to_string()))?;

        let custom_text = custom_text
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string);

        if reason == OverrideReason::Custom && custom_text.is_none() {
            return Err(ValidationError::MissingCustomText);
        }

        let actor = actor.trim();
        if actor.is_empty() {
            return Err(ValidationError::MissingActor);
        }

        let record = OverrideRecord {
            finding_id: finding_id.clone(),
            reason,
            custom_text,
            actor: actor.to_string(),
            recorded_at,
        };

        tracing::info!(
            finding_kind = finding_id.kind().as_str(),
            reason = reason.as_str(),
            "Override recorded"
        );

        self.records.insert(finding_id.clone(), record);
        Ok(&self.records[finding_id])
    }

    /// Drop overrides that reference an item no longer in the draft.
    /// Returns the removed records, oldest first.
    pub fn purge_stale(&mut self, current_item_ids: &HashSet<Uuid>) -> Vec<OverrideRecord> {
        self.purge_where(|id| {
            id.item_ids()
                .iter()
                .any(|item| !current_item_ids.contains(item))
        })
    }

    /// Drop allergy overrides whose allergen is no longer on the patient record.
    /// `current_allergen_keys` holds canonical allergen names.
    pub fn purge_stale_allergens(
        &mut self,
        current_allergen_keys: &HashSet<String>,
    ) -> Vec<OverrideRecord> {
        self.purge_where(|id| {
            id.kind() == FindingKind::Allergy
                && id
                    .allergen_key()
                    .is_some_and(|key| !current_allergen_keys.contains(key))
        })
    }

    fn purge_where(&mut self, stale: impl Fn(&FindingId) -> bool) -> Vec<OverrideRecord> {
        let stale_ids: Vec<FindingId> = self
            .records
            .keys()
            .filter(|id| stale(*id))
            .cloned()
            .collect();

        let mut purged: Vec<OverrideRecord> = stale_ids
            .iter()
            .filter_map(|id| self.records.remove(id))
            .collect();
        purged.sort_by(|a, b| {
            a.recorded_at
                .cmp(&b.recorded_at)
                .then_with(|| a.finding_id.cmp(&b.finding_id))
        });

        if !purged.is_empty() {
            tracing::info!(purged = purged.len(), "Stale overrides purged");
        }
        purged
    }

    /// Annotate findings with their current override. Order is preserved.
    pub fn get_active_alerts(&self, findings: &[Finding]) -> ReviewedFindings {
        let findings: Vec<ReviewedFinding> = findings
            .iter()
            .map(|f| ReviewedFinding {
                finding: f.clone(),
                override_record: self.records.get(&f.id).cloned(),
            })
            .collect();
        let active_count = findings.iter().filter(|r| r.is_active()).count();

        ReviewedFindings {
            findings,
            active_count,
        }
    }

    pub fn get(&self, finding_id: &FindingId) -> Option<&OverrideRecord> {
        self.records.get(finding_id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
