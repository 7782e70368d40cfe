use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::Instrument;

use super::AppState;
use crate::error::NexusError;
use crate::model::{Actor, RequestMeta};
use crate::telemetry::{create_request_span, generate_correlation_id};

/// Username of the acting user, set by the upstream auth layer
pub const ACTOR_HEADER: &str = "x-nexus-user";
const CORRELATION_HEADER: &str = "x-correlation-id";

/// Request middleware.
///
/// Opens a span with a correlation id and, when the actor header is present,
/// resolves it to a directory user stored in the request extensions.
/// An unknown username is rejected here with 401.
pub async fn request_context(State(service): State<AppState>, mut req: Request, next: Next) -> Response {
    let correlation_id = req
        .headers()
        .get(CORRELATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(generate_correlation_id);
    let span = create_request_span(req.method().as_str(), req.uri().path(), &correlation_id);

    let mut response = async {
        if let Some(username) = header_value(req.headers(), ACTOR_HEADER) {
            let meta = request_meta(req.headers());
            match service.resolve_actor(&username, meta).await {
                Ok(actor) => {
                    tracing::Span::current().record("actor", actor.user.username.as_str());
                    req.extensions_mut().insert(actor);
                }
                Err(e) => return e.into_response(),
            }
        }
        let response = next.run(req).await;
        tracing::debug!(status = response.status().as_u16(), "request finished");
        response
    }
    .instrument(span)
    .await;

    if let Ok(value) = HeaderValue::from_str(&correlation_id) {
        response.headers_mut().insert(CORRELATION_HEADER, value);
    }
    response
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Audit metadata. The first `x-forwarded-for` hop is the client.
fn request_meta(headers: &HeaderMap) -> RequestMeta {
    let mut meta = RequestMeta::default();
    if let Some(forwarded) = header_value(headers, "x-forwarded-for") {
        if let Some(client) = forwarded.split(',').map(str::trim).find(|ip| !ip.is_empty()) {
            meta.ip_address = client.to_string();
        }
    }
    if let Some(agent) = header_value(headers, "user-agent") {
        meta.user_agent = agent;
    }
    meta
}

/// The authenticated actor. Missing actor is a 401.
#[derive(Debug, Clone)]
pub struct CurrentActor(pub Actor);

impl<S: Send + Sync> FromRequestParts<S> for CurrentActor {
    type Rejection = NexusError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Actor>()
            .cloned()
            .map(CurrentActor)
            .ok_or_else(|| {
                NexusError::Unauthenticated(format!("missing {ACTOR_HEADER} header"))
            })
    }
}

/// The actor if one was supplied
#[derive(Debug, Clone)]
pub struct MaybeActor(pub Option<Actor>);

impl<S: Send + Sync> FromRequestParts<S> for MaybeActor {
    type Rejection = NexusError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeActor(parts.extensions.get::<Actor>().cloned()))
    }
}
