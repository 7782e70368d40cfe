use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use uuid::Uuid;

use super::{ApiJson, ApiPath, ApiQuery, AppState, CurrentActor, VersionQuery};
use crate::error::Result;
use crate::model::{
    AuditEntry, BomItem, CoatingRecord, CoatingStatus, NewBomItem, NewCoating, NewStep,
    NewTraveler, StepOutcome, Traveler, TravelerId, TravelerPatch, TravelerSummary, TravelerType,
    WorkCenter, WORK_CENTERS,
};
use crate::routing::{template_for, traveler_types, StepTemplate, TravelerTypeInfo};
use crate::service::{GateOutcome, StepRecorded, TravelerFilter};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/travelers", get(list_travelers).post(create_traveler))
        .route("/travelers/", get(list_travelers).post(create_traveler))
        .route("/travelers/types", get(list_types))
        .route("/travelers/types/", get(list_types))
        .route("/travelers/work-centers", get(list_work_centers))
        .route("/travelers/work-centers/", get(list_work_centers))
        .route("/travelers/templates/{type}", get(get_template))
        .route(
            "/travelers/{id}",
            get(get_traveler).patch(update_traveler).delete(delete_traveler),
        )
        .route("/travelers/{id}/steps", post(add_step))
        .route("/travelers/{id}/steps/{step_id}", delete(remove_step))
        .route("/travelers/{id}/steps/{step_id}/reorder", post(reorder_step))
        .route("/travelers/{id}/steps/{step_id}/start", post(start_step))
        .route("/travelers/{id}/steps/{step_id}/outcome", post(record_outcome))
        .route("/travelers/{id}/hold", post(hold_traveler))
        .route("/travelers/{id}/release", post(release_traveler))
        .route("/travelers/{id}/complete", post(complete_traveler))
        .route("/travelers/{id}/cancel", post(cancel_traveler))
        .route("/travelers/{id}/audit", get(audit_log))
        .route("/travelers/{id}/coatings", get(list_coatings).post(add_coating))
        .route("/travelers/{id}/coatings/{coating_id}/advance", post(advance_coating))
        .route("/travelers/{id}/bom", get(list_bom).post(add_bom_item))
}

async fn list_travelers(
    State(svc): State<AppState>,
    CurrentActor(_actor): CurrentActor,
    ApiQuery(filter): ApiQuery<TravelerFilter>,
) -> Result<Json<Vec<TravelerSummary>>> {
    Ok(Json(svc.list_travelers(&filter).await?))
}

async fn create_traveler(
    State(svc): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiJson(body): ApiJson<NewTraveler>,
) -> Result<(StatusCode, Json<Traveler>)> {
    let traveler = svc.create_traveler(&actor, body).await?;
    Ok((StatusCode::CREATED, Json(traveler)))
}

async fn list_types() -> Json<Vec<TravelerTypeInfo>> {
    Json(traveler_types())
}

async fn list_work_centers() -> Json<&'static [WorkCenter]> {
    Json(WORK_CENTERS)
}

async fn get_template(ApiPath(traveler_type): ApiPath<String>) -> Result<Json<&'static [StepTemplate]>> {
    let traveler_type: TravelerType = traveler_type.parse()?;
    Ok(Json(template_for(traveler_type)))
}

async fn get_traveler(
    State(svc): State<AppState>,
    CurrentActor(_actor): CurrentActor,
    ApiPath(id): ApiPath<TravelerId>,
) -> Result<Json<Traveler>> {
    Ok(Json(svc.get_traveler(id).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateTravelerBody {
    #[serde(flatten)]
    patch: TravelerPatch,
    #[serde(default)]
    expected_version: Option<u64>,
    #[serde(default)]
    details: Option<String>,
}

async fn update_traveler(
    State(svc): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiPath(id): ApiPath<TravelerId>,
    ApiJson(body): ApiJson<UpdateTravelerBody>,
) -> Result<GateOutcome<Traveler>> {
    svc.update_traveler(&actor, id, body.patch, body.expected_version, body.details)
        .await
}

async fn delete_traveler(
    State(svc): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiPath(id): ApiPath<TravelerId>,
    ApiQuery(version): ApiQuery<VersionQuery>,
) -> Result<StatusCode> {
    svc.delete_traveler(&actor, id, version.expected_version).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddStepBody {
    #[serde(flatten)]
    step: NewStep,
    #[serde(default)]
    expected_version: Option<u64>,
}

async fn add_step(
    State(svc): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiPath(id): ApiPath<TravelerId>,
    ApiJson(body): ApiJson<AddStepBody>,
) -> Result<GateOutcome<Traveler>> {
    svc.add_step(&actor, id, body.step, body.expected_version).await
}

async fn remove_step(
    State(svc): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiPath((id, step_id)): ApiPath<(TravelerId, Uuid)>,
    ApiQuery(version): ApiQuery<VersionQuery>,
) -> Result<GateOutcome<Traveler>> {
    svc.remove_step(&actor, id, step_id, version.expected_version).await
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReorderBody {
    sequence: u32,
    #[serde(default)]
    expected_version: Option<u64>,
}

async fn reorder_step(
    State(svc): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiPath((id, step_id)): ApiPath<(TravelerId, Uuid)>,
    ApiJson(body): ApiJson<ReorderBody>,
) -> Result<GateOutcome<Traveler>> {
    svc.reorder_step(&actor, id, step_id, body.sequence, body.expected_version)
        .await
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct StartStepBody {
    assignee: Option<String>,
    expected_version: Option<u64>,
}

async fn start_step(
    State(svc): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiPath((id, step_id)): ApiPath<(TravelerId, Uuid)>,
    ApiJson(body): ApiJson<StartStepBody>,
) -> Result<Json<Traveler>> {
    let traveler = svc
        .start_step(&actor, id, step_id, body.assignee, body.expected_version)
        .await?;
    Ok(Json(traveler))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OutcomeBody {
    #[serde(flatten)]
    outcome: StepOutcome,
    #[serde(default)]
    expected_version: Option<u64>,
}

async fn record_outcome(
    State(svc): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiPath((id, step_id)): ApiPath<(TravelerId, Uuid)>,
    ApiJson(body): ApiJson<OutcomeBody>,
) -> Result<Json<StepRecorded>> {
    let recorded = svc
        .record_step_outcome(&actor, id, step_id, body.outcome, body.expected_version)
        .await?;
    Ok(Json(recorded))
}

/// Body shared by the lifecycle routes; every field is optional
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct LifecycleBody {
    reason: Option<String>,
    details: Option<String>,
    expected_version: Option<u64>,
}

async fn hold_traveler(
    State(svc): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiPath(id): ApiPath<TravelerId>,
    ApiJson(body): ApiJson<LifecycleBody>,
) -> Result<Json<Traveler>> {
    let traveler = svc
        .hold_traveler(&actor, id, body.reason, body.expected_version)
        .await?;
    Ok(Json(traveler))
}

async fn release_traveler(
    State(svc): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiPath(id): ApiPath<TravelerId>,
    ApiJson(body): ApiJson<LifecycleBody>,
) -> Result<Json<Traveler>> {
    let traveler = svc.release_traveler(&actor, id, body.expected_version).await?;
    Ok(Json(traveler))
}

async fn complete_traveler(
    State(svc): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiPath(id): ApiPath<TravelerId>,
    ApiJson(body): ApiJson<LifecycleBody>,
) -> Result<GateOutcome<Traveler>> {
    svc.complete_traveler(&actor, id, body.expected_version, body.details)
        .await
}

async fn cancel_traveler(
    State(svc): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiPath(id): ApiPath<TravelerId>,
    ApiJson(body): ApiJson<LifecycleBody>,
) -> Result<GateOutcome<Traveler>> {
    svc.cancel_traveler(&actor, id, body.reason, body.expected_version)
        .await
}

async fn audit_log(
    State(svc): State<AppState>,
    CurrentActor(_actor): CurrentActor,
    ApiPath(id): ApiPath<TravelerId>,
) -> Result<Json<Vec<AuditEntry>>> {
    Ok(Json(svc.audit_log(id).await?))
}

async fn list_coatings(
    State(svc): State<AppState>,
    CurrentActor(_actor): CurrentActor,
    ApiPath(id): ApiPath<TravelerId>,
) -> Result<Json<Vec<CoatingRecord>>> {
    Ok(Json(svc.list_coatings(id).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddCoatingBody {
    #[serde(flatten)]
    coating: NewCoating,
    #[serde(default)]
    expected_version: Option<u64>,
}

async fn add_coating(
    State(svc): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiPath(id): ApiPath<TravelerId>,
    ApiJson(body): ApiJson<AddCoatingBody>,
) -> Result<(StatusCode, Json<CoatingRecord>)> {
    let record = svc
        .add_coating(&actor, id, body.coating, body.expected_version)
        .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

async fn list_bom(
    State(svc): State<AppState>,
    CurrentActor(_actor): CurrentActor,
    ApiPath(id): ApiPath<TravelerId>,
) -> Result<Json<Vec<BomItem>>> {
    Ok(Json(svc.list_bom(id).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddBomItemBody {
    #[serde(flatten)]
    item: NewBomItem,
    #[serde(default)]
    expected_version: Option<u64>,
}

async fn add_bom_item(
    State(svc): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiPath(id): ApiPath<TravelerId>,
    ApiJson(body): ApiJson<AddBomItemBody>,
) -> Result<(StatusCode, Json<BomItem>)> {
    let item = svc
        .add_bom_item(&actor, id, body.item, body.expected_version)
        .await?;
    Ok((StatusCode::CREATED, Json(item)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AdvanceCoatingBody {
    status: CoatingStatus,
    /// Defaults to today
    #[serde(default)]
    date: Option<NaiveDate>,
    #[serde(default)]
    expected_version: Option<u64>,
}

async fn advance_coating(
    State(svc): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiPath((id, coating_id)): ApiPath<(TravelerId, Uuid)>,
    ApiJson(body): ApiJson<AdvanceCoatingBody>,
) -> Result<Json<CoatingRecord>> {
    let on = body.date.unwrap_or_else(|| Utc::now().date_naive());
    let record = svc
        .advance_coating(&actor, id, coating_id, body.status, on, body.expected_version)
        .await?;
    Ok(Json(record))
}
