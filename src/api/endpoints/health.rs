//! Health check endpoint.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::safety::reference::KnowledgeBaseStats;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub knowledge_base: KnowledgeBaseStats,
    pub catalog_drugs: usize,
    pub open_sessions: usize,
}

/// `GET /api/health` — liveness plus loaded reference data.
pub async fn check(State(ctx): State<ApiContext>) -> Result<Json<HealthResponse>, ApiError> {
    Ok(Json(HealthResponse {
        status: "ok",
        version: crate::config::APP_VERSION,
        knowledge_base: ctx.registry.engine().knowledge_base().stats(),
        catalog_drugs: ctx.catalog.len(),
        open_sessions: ctx.registry.session_count()?,
    }))
}
