//! Drug catalog search for the editor.

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::types::ApiContext;
use crate::catalog::CatalogEntry;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub results: Vec<CatalogEntry>,
}

/// `GET /api/catalog?q=` — empty for terms under two characters.
pub async fn search(
    State(ctx): State<ApiContext>,
    Query(query): Query<SearchQuery>,
) -> Json<SearchResponse> {
    let results = ctx.catalog.search(&query.q).into_iter().cloned().collect();
    Json(SearchResponse { results })
}
