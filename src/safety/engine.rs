use std::sync::Arc;
use std::time::Instant;

use crate::models::enums::Severity;
use crate::models::{Allergy, PrescriptionItem};

use super::detection::{max_severity, run_detection};
use super::ledger::OverrideLedger;
use super::reference::KnowledgeBase;
use super::types::{DataQualityIssue, DetectionReport, SafetyReport, SafetySummary};

/// Safety check over one prescription draft.
///
/// Implementations are pure with respect to the draft: they read items,
/// allergies and the ledger, and never mutate any of them.
pub trait SafetyEngine: Send + Sync {
    fn knowledge_base(&self) -> &KnowledgeBase;

    /// Detect every finding for the draft, ordered severity-first.
    fn check(&self, items: &[PrescriptionItem], allergies: &[Allergy]) -> DetectionReport;

    /// `check`, then annotate each finding with its override from `ledger`.
    fn review(
        &self,
        items: &[PrescriptionItem],
        allergies: &[Allergy],
        ledger: &OverrideLedger,
    ) -> SafetyReport;
}

/// Default engine over a shared, read-only knowledge base.
pub struct DefaultSafetyEngine {
    pub(crate) reference: Arc<KnowledgeBase>,
}

impl DefaultSafetyEngine {
    pub fn new(reference: Arc<KnowledgeBase>) -> Self {
        Self { reference }
    }
}

impl SafetyEngine for DefaultSafetyEngine {
    fn knowledge_base(&self) -> &KnowledgeBase {
        &self.reference
    }

    fn check(&self, items: &[PrescriptionItem], allergies: &[Allergy]) -> DetectionReport {
        run_detection(items, allergies, &self.reference)
    }

    fn review(
        &self,
        items: &[PrescriptionItem],
        allergies: &[Allergy],
        ledger: &OverrideLedger,
    ) -> SafetyReport {
        let start = Instant::now();

        let report = self.check(items, allergies);
        let alerts = ledger.get_active_alerts(&report.findings);

        let summary = SafetySummary {
            active_count: alerts.active_count,
            acknowledged_count: alerts.findings.len() - alerts.active_count,
            unchecked_items: report
                .warnings
                .iter()
                .filter(|w| w.issue == DataQualityIssue::MissingIngredients)
                .count(),
            blocking: max_severity(alerts.active()) == Some(Severity::High),
        };

        let processing_time_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(
            items = items.len(),
            findings = alerts.findings.len(),
            active = summary.active_count,
            warnings = report.warnings.len(),
            processing_ms = processing_time_ms,
            "Safety review complete"
        );

        SafetyReport {
            alerts,
            warnings: report.warnings,
            summary,
            processing_time_ms,
        }
    }
}
