use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use uuid::Uuid;

use super::{ApiJson, ApiPath, ApiQuery, AppState, CurrentActor};
use crate::error::Result;
use crate::labor::{LaborFilter, LaborSummary};
use crate::model::{LaborEntry, TravelerId, UserId};
use crate::service::{ActiveLabor, StartLabor};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/labor", post(start_labor))
        .route("/labor/", post(start_labor))
        .route("/labor/active", get(active_labor))
        .route("/labor/my-entries", get(my_entries))
        .route("/labor/summary", get(labor_summary))
        .route("/labor/traveler/{id}", get(labor_for_traveler))
        .route("/labor/{entry_id}/stop", post(stop_labor))
}

async fn start_labor(
    State(svc): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiJson(body): ApiJson<StartLabor>,
) -> Result<(StatusCode, Json<LaborEntry>)> {
    let entry = svc.start_labor(&actor, body).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

async fn stop_labor(
    State(svc): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiPath(entry_id): ApiPath<Uuid>,
) -> Result<Json<LaborEntry>> {
    Ok(Json(svc.stop_labor(&actor, entry_id).await?))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ActiveQuery {
    /// Defaults to the acting user
    employee_id: Option<UserId>,
}

async fn active_labor(
    State(svc): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiQuery(query): ApiQuery<ActiveQuery>,
) -> Result<Json<Option<ActiveLabor>>> {
    let employee_id = query.employee_id.unwrap_or(actor.user.id);
    Ok(Json(svc.active_labor(employee_id).await?))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DaysQuery {
    days: Option<i64>,
}

async fn my_entries(
    State(svc): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiQuery(query): ApiQuery<DaysQuery>,
) -> Result<Json<Vec<LaborEntry>>> {
    Ok(Json(svc.my_entries(actor.user.id, query.days).await?))
}

async fn labor_for_traveler(
    State(svc): State<AppState>,
    CurrentActor(_actor): CurrentActor,
    ApiPath(id): ApiPath<TravelerId>,
) -> Result<Json<Vec<LaborEntry>>> {
    Ok(Json(svc.labor_for_traveler(id).await?))
}

async fn labor_summary(
    State(svc): State<AppState>,
    CurrentActor(_actor): CurrentActor,
    ApiQuery(filter): ApiQuery<LaborFilter>,
) -> Result<Json<LaborSummary>> {
    Ok(Json(svc.labor_summary(filter).await?))
}
