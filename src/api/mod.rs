//! HTTP surface for the prescription editor and dashboard.
//!
//! Exposes draft sessions, alerts, overrides, the override audit trail and
//! catalog search as JSON endpoints under `/api/`.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use router::api_router;
pub use server::{start_api_server, ApiServer, ApiServerInfo};
pub use types::ApiContext;
