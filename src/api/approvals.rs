use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use uuid::Uuid;

use super::{ApiJson, ApiPath, AppState, CurrentActor};
use crate::error::Result;
use crate::model::Approval;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/approvals", get(pending_approvals))
        .route("/approvals/", get(pending_approvals))
        .route("/approvals/my-requests", get(my_requests))
        .route("/approvals/{id}/approve", post(approve))
        .route("/approvals/{id}/reject", post(reject))
}

async fn pending_approvals(
    State(svc): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> Result<Json<Vec<Approval>>> {
    Ok(Json(svc.pending_approvals(&actor).await?))
}

async fn my_requests(
    State(svc): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> Result<Json<Vec<Approval>>> {
    Ok(Json(svc.my_requests(&actor).await?))
}

async fn approve(
    State(svc): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Approval>> {
    Ok(Json(svc.approve(&actor, id).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RejectBody {
    reason: String,
}

async fn reject(
    State(svc): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<RejectBody>,
) -> Result<Json<Approval>> {
    Ok(Json(svc.reject(&actor, id, body.reason).await?))
}
