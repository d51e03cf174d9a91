//! Clinician overrides and the override audit trail.

use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, DraftView};
use crate::models::enums::OverrideReason;
use crate::safety::audit::AuditEvent;
use crate::safety::OverrideRecord;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideRequest {
    pub finding_id: String,
    pub reason_code: String,
    #[serde(default)]
    pub custom_text: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideResponse {
    #[serde(rename = "override")]
    pub record: OverrideRecord,
    pub draft: DraftView,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReasonOption {
    pub code: &'static str,
    pub label: &'static str,
    pub requires_text: bool,
}

#[derive(Serialize)]
pub struct AuditResponse {
    pub events: Vec<AuditEvent>,
}

/// `POST /api/sessions/:id/overrides` — override a current finding.
/// A rejected request returns 422 and leaves the finding active.
pub async fn record(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<OverrideRequest>,
) -> Result<Json<OverrideResponse>, ApiError> {
    let response = ctx.registry.with_session(id, |s, engine| {
        let record = s.override_finding(
            engine,
            &req.finding_id,
            &req.reason_code,
            req.custom_text.as_deref(),
            Utc::now(),
        )?;
        Ok(OverrideResponse {
            record,
            draft: DraftView::of(s, engine),
        })
    })?;
    Ok(Json(response))
}

/// `GET /api/overrides/reasons` — reason codes for the override dialog.
pub async fn reasons() -> Json<Vec<ReasonOption>> {
    Json(
        OverrideReason::all()
            .into_iter()
            .map(|r| ReasonOption {
                code: r.as_str(),
                label: r.label(),
                requires_text: r == OverrideReason::Custom,
            })
            .collect(),
    )
}

/// `GET /api/sessions/:id/audit` — override history, oldest first.
pub async fn audit(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<AuditResponse>, ApiError> {
    let events = ctx
        .registry
        .with_session(id, |s, _| Ok(s.audit().events().to_vec()))?;
    Ok(Json(AuditResponse { events }))
}
