//! Shared types for the API layer.

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::boundary::AlertReport;
use crate::catalog::DrugCatalog;
use crate::models::PrescriptionItem;
use crate::safety::SafetyEngine;
use crate::sessions::{DraftSession, SessionRegistry};

// ═══════════════════════════════════════════════════════════
// API context — shared state for the router
// ═══════════════════════════════════════════════════════════

/// Shared context for all API routes and middleware.
#[derive(Clone)]
pub struct ApiContext {
    pub registry: Arc<SessionRegistry>,
    pub catalog: Arc<DrugCatalog>,
}

impl ApiContext {
    pub fn new(registry: Arc<SessionRegistry>, catalog: Arc<DrugCatalog>) -> Self {
        Self { registry, catalog }
    }
}

// ═══════════════════════════════════════════════════════════
// Draft view — returned by every mutating endpoint
// ═══════════════════════════════════════════════════════════

/// Current draft contents plus the alert report recomputed from them.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftView {
    pub session_id: Uuid,
    pub patient_id: String,
    pub items: Vec<PrescriptionItem>,
    pub report: AlertReport,
}

impl DraftView {
    pub fn of(session: &DraftSession, engine: &dyn SafetyEngine) -> Self {
        let report = AlertReport::from(&session.report(engine));
        Self {
            session_id: session.id,
            patient_id: session.patient_id.clone(),
            items: session.items().to_vec(),
            report,
        }
    }
}
