// HTTP surface: JSON over axum, one module per resource

mod approvals;
mod barcodes;
mod context;
mod extract;
mod labor;
mod reports;
mod travelers;
mod users;

pub use context::{CurrentActor, MaybeActor, ACTOR_HEADER};
pub use extract::{ApiJson, ApiPath, ApiQuery};

use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::observability::{service_metrics, ServiceStats};
use crate::service::{GateOutcome, TravelerService};

/// Shared application state.
pub type AppState = Arc<TravelerService>;

/// Build the complete router with the request-context layer applied.
pub fn router(service: AppState, body_limit_bytes: usize) -> Router {
    let api = Router::new()
        .route("/health", get(health))
        .merge(users::routes())
        .merge(travelers::routes())
        .merge(labor::routes())
        .merge(approvals::routes())
        .merge(barcodes::routes())
        .merge(reports::routes());

    api.layer(axum::middleware::from_fn_with_state(
        service.clone(),
        context::request_context,
    ))
    .layer(DefaultBodyLimit::max(body_limit_bytes))
    .with_state(service)
}

/// Gated mutations answer 200 with the result, or 202 with the filed approval.
impl<T: Serialize> IntoResponse for GateOutcome<T> {
    fn into_response(self) -> Response {
        match self {
            GateOutcome::Applied(value) => (StatusCode::OK, Json(value)).into_response(),
            GateOutcome::PendingApproval(approval) => {
                (StatusCode::ACCEPTED, Json(approval)).into_response()
            }
        }
    }
}

/// Optimistic-concurrency token accepted by every mutating route
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct VersionQuery {
    #[serde(default)]
    pub expected_version: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    metrics: ServiceStats,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        metrics: service_metrics().get_stats(),
    })
}
