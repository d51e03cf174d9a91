//! Current alerts for a draft.
//!
//! `GET /api/sessions/:id/alerts` — alerts, summary and unchecked items.

use axum::extract::{Path, State};
use axum::Json;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::boundary::AlertReport;

pub async fn list(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<AlertReport>, ApiError> {
    let report = ctx
        .registry
        .with_session(id, |s, engine| Ok(AlertReport::from(&s.report(engine))))?;
    Ok(Json(report))
}
