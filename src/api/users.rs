use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};

use super::{ApiJson, AppState, CurrentActor, MaybeActor};
use crate::error::Result;
use crate::model::{NewUser, User};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/me", get(me))
        .route("/users", get(list_users).post(create_user))
        .route("/users/", get(list_users).post(create_user))
}

async fn me(CurrentActor(actor): CurrentActor) -> Json<User> {
    Json(actor.user)
}

async fn list_users(
    State(svc): State<AppState>,
    CurrentActor(_actor): CurrentActor,
) -> Result<Json<Vec<User>>> {
    Ok(Json(svc.list_users().await?))
}

/// Open without an actor while the directory is empty
async fn create_user(
    State(svc): State<AppState>,
    MaybeActor(actor): MaybeActor,
    ApiJson(body): ApiJson<NewUser>,
) -> Result<(StatusCode, Json<User>)> {
    let user = svc.create_user(actor.as_ref(), body).await?;
    Ok((StatusCode::CREATED, Json(user)))
}
