//! Draft session lifecycle and patient allergies.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, DraftView};
use crate::boundary::{to_allergies, PatientAllergyRecord};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenSessionRequest {
    pub patient_id: String,
    pub clinician_id: String,
    #[serde(default)]
    pub allergies: Vec<PatientAllergyRecord>,
}

#[derive(Debug, Deserialize)]
pub struct AllergiesRequest {
    pub allergies: Vec<PatientAllergyRecord>,
}

/// `POST /api/sessions` — open a draft for a patient.
pub async fn open(
    State(ctx): State<ApiContext>,
    Json(req): Json<OpenSessionRequest>,
) -> Result<(StatusCode, Json<DraftView>), ApiError> {
    if req.patient_id.trim().is_empty() {
        return Err(ApiError::BadRequest("patientId is required".into()));
    }
    let id = ctx.registry.open(
        &req.patient_id,
        &req.clinician_id,
        to_allergies(&req.allergies),
        Utc::now(),
    )?;
    let view = ctx
        .registry
        .with_session(id, |s, engine| Ok(DraftView::of(s, engine)))?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// `DELETE /api/sessions/:id` — discard a draft with its ledger.
pub async fn close(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    ctx.registry.close(id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// `PUT /api/sessions/:id/allergies` — replace the patient's allergy list.
pub async fn set_allergies(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<AllergiesRequest>,
) -> Result<Json<DraftView>, ApiError> {
    let allergies = to_allergies(&req.allergies);
    let view = ctx.registry.with_session(id, |s, engine| {
        s.set_allergies(allergies, engine, Utc::now());
        Ok(DraftView::of(s, engine))
    })?;
    Ok(Json(view))
}
