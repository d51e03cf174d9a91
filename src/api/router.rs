//! HTTP router for the safety-check service.
//!
//! Returns a composable `Router` that can be mounted on any axum server.
//! Routes are nested under `/api/`.
//!
//! Middleware stack (outermost → innermost): CORS → access log → handler.

use std::sync::Arc;

use axum::routing::{delete, get, patch, post, put};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;
use crate::catalog::DrugCatalog;
use crate::sessions::SessionRegistry;

/// Build the API router over a session registry and drug catalog.
pub fn api_router(registry: Arc<SessionRegistry>, catalog: Arc<DrugCatalog>) -> Router {
    build_router(ApiContext::new(registry, catalog))
}

fn build_router(ctx: ApiContext) -> Router {
    // NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
    let routes = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/catalog", get(endpoints::catalog::search))
        .route("/overrides/reasons", get(endpoints::overrides::reasons))
        .route("/sessions", post(endpoints::sessions::open))
        .route("/sessions/:id", delete(endpoints::sessions::close))
        .route(
            "/sessions/:id/allergies",
            put(endpoints::sessions::set_allergies),
        )
        .route("/sessions/:id/items", post(endpoints::items::add))
        .route("/sessions/:id/items/quick", post(endpoints::items::add_quick))
        .route(
            "/sessions/:id/items/:item_id",
            patch(endpoints::items::update).delete(endpoints::items::remove),
        )
        .route("/sessions/:id/alerts", get(endpoints::alerts::list))
        .route("/sessions/:id/overrides", post(endpoints::overrides::record))
        .route("/sessions/:id/audit", get(endpoints::overrides::audit))
        .with_state(ctx)
        .layer(axum::middleware::from_fn(middleware::audit::log_access));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new().nest("/api", routes).layer(cors)
}
