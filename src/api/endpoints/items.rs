//! Prescription item edits. Each returns the recomputed draft view.

use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, DraftView};
use crate::boundary::{EditorPrescription, QuickPrescription};
use crate::models::PrescriptionItemUpdate;

/// `POST /api/sessions/:id/items` — add an editor prescription.
pub async fn add(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<EditorPrescription>,
) -> Result<Json<DraftView>, ApiError> {
    let now = Utc::now();
    let item = req.into_item(now)?;
    let view = ctx.registry.with_session(id, |s, engine| {
        s.add_item(item, now)?;
        Ok(DraftView::of(s, engine))
    })?;
    Ok(Json(view))
}

/// `POST /api/sessions/:id/items/quick` — add from a quick-entry line.
pub async fn add_quick(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<QuickPrescription>,
) -> Result<Json<DraftView>, ApiError> {
    let now = Utc::now();
    let item = req.into_item(&ctx.catalog, now)?;
    let view = ctx.registry.with_session(id, |s, engine| {
        s.add_item(item, now)?;
        Ok(DraftView::of(s, engine))
    })?;
    Ok(Json(view))
}

/// `PATCH /api/sessions/:id/items/:item_id` — edit administration fields.
pub async fn update(
    State(ctx): State<ApiContext>,
    Path((id, item_id)): Path<(Uuid, Uuid)>,
    Json(update): Json<PrescriptionItemUpdate>,
) -> Result<Json<DraftView>, ApiError> {
    let view = ctx.registry.with_session(id, |s, engine| {
        s.update_item(item_id, update, Utc::now())?;
        Ok(DraftView::of(s, engine))
    })?;
    Ok(Json(view))
}

/// `DELETE /api/sessions/:id/items/:item_id` — remove an item; overrides
/// referencing it are purged before the view is computed.
pub async fn remove(
    State(ctx): State<ApiContext>,
    Path((id, item_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<DraftView>, ApiError> {
    let view = ctx.registry.with_session(id, |s, engine| {
        s.remove_item(item_id, Utc::now())?;
        Ok(DraftView::of(s, engine))
    })?;
    Ok(Json(view))
}
