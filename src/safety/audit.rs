use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::enums::OverrideReason;

use super::types::{FindingId, OverrideRecord};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum AuditAction {
    OverrideRecorded {
        reason: OverrideReason,
        custom_text: Option<String>,
    },
    OverrideRejected {
        /// Reason code exactly as submitted.
        reason_code: String,
        error: String,
    },
    OverridePurged {
        /// Reason of the override that was dropped.
        reason: OverrideReason,
        cause: PurgeCause,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurgeCause {
    ItemRemoved,
    AllergyRemoved,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    pub sequence: u64,
    pub at: DateTime<Utc>,
    pub actor: String,
    pub finding_id: String,
    #[serde(flatten)]
    pub action: AuditAction,
}

/// Append-only override history for one draft. Events are never edited or
/// removed; the ledger keeps only the latest state.
#[derive(Debug, Default)]
pub struct AuditTrail {
    events: Vec<AuditEvent>,
}

impl AuditTrail {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recorded(&mut self, record: &OverrideRecord) {
        self.push(
            record.recorded_at,
            &record.actor,
            record.finding_id.to_string(),
            AuditAction::OverrideRecorded {
                reason: record.reason,
                custom_text: record.custom_text.clone(),
            },
        );
    }

    /// `finding_id` is kept verbatim; rejected requests may carry malformed ids.
    pub fn rejected(
        &mut self,
        at: DateTime<Utc>,
        actor: &str,
        finding_id: &str,
        reason_code: &str,
        error: &str,
    ) {
        self.push(
            at,
            actor,
            finding_id.to_string(),
            AuditAction::OverrideRejected {
                reason_code: reason_code.to_string(),
                error: error.to_string(),
            },
        );
    }

    pub fn purged(
        &mut self,
        at: DateTime<Utc>,
        actor: &str,
        record: &OverrideRecord,
        cause: PurgeCause,
    ) {
        self.push(
            at,
            actor,
            record.finding_id.to_string(),
            AuditAction::OverridePurged {
                reason: record.reason,
                cause,
            },
        );
    }

    pub fn events(&self) -> &[AuditEvent] {
        &self.events
    }

    /// History for one finding, oldest first.
    pub fn for_finding<'a>(&'a self, finding_id: &'a FindingId) -> impl Iterator<Item = &'a AuditEvent> {
        self.events
            .iter()
            .filter(move |e| e.finding_id == finding_id.as_str())
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    fn push(&mut self, at: DateTime<Utc>, actor: &str, finding_id: String, action: AuditAction) {
        let sequence = self.events.len() as u64 + 1;
        self.events.push(AuditEvent {
            sequence,
            at,
            actor: actor.to_string(),
            finding_id,
            action,
        });
    }
}
