use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use super::{ApiQuery, AppState, CurrentActor};
use crate::error::Result;
use crate::reports::{
    CoatingStatusReport, DashboardStats, DateRange, LaborEfficiencyReport, TravelerCompletionReport,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/reports/dashboard-stats", get(dashboard_stats))
        .route("/reports/traveler-completion", get(traveler_completion))
        .route("/reports/labor-efficiency", get(labor_efficiency))
        .route("/reports/coating-status", get(coating_status))
}

async fn dashboard_stats(
    State(svc): State<AppState>,
    CurrentActor(_actor): CurrentActor,
) -> Result<Json<DashboardStats>> {
    Ok(Json(svc.dashboard_stats().await?))
}

async fn traveler_completion(
    State(svc): State<AppState>,
    CurrentActor(_actor): CurrentActor,
    ApiQuery(range): ApiQuery<DateRange>,
) -> Result<Json<TravelerCompletionReport>> {
    Ok(Json(svc.traveler_completion(range).await?))
}

async fn labor_efficiency(
    State(svc): State<AppState>,
    CurrentActor(_actor): CurrentActor,
    ApiQuery(range): ApiQuery<DateRange>,
) -> Result<Json<LaborEfficiencyReport>> {
    Ok(Json(svc.labor_efficiency(range).await?))
}

async fn coating_status(
    State(svc): State<AppState>,
    CurrentActor(_actor): CurrentActor,
) -> Result<Json<CoatingStatusReport>> {
    Ok(Json(svc.coating_status().await?))
}
