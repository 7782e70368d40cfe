use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use super::{ApiJson, ApiPath, AppState, CurrentActor};
use crate::barcode::TravelerBarcodes;
use crate::error::Result;
use crate::model::TravelerId;
use crate::service::ScannedTraveler;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/barcodes/traveler/{id}", get(traveler_barcodes))
        .route("/barcodes/scan", post(scan))
}

async fn traveler_barcodes(
    State(svc): State<AppState>,
    CurrentActor(_actor): CurrentActor,
    ApiPath(id): ApiPath<TravelerId>,
) -> Result<Json<TravelerBarcodes>> {
    Ok(Json(svc.barcodes(id).await?))
}

#[derive(Debug, Deserialize)]
struct ScanBody {
    data: String,
}

async fn scan(
    State(svc): State<AppState>,
    CurrentActor(_actor): CurrentActor,
    ApiJson(body): ApiJson<ScanBody>,
) -> Result<Json<ScannedTraveler>> {
    Ok(Json(svc.lookup_by_barcode(&body.data).await?))
}
