use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use crate::model::{ApprovalStatus, TravelerId, TravelerStatus, UserId};

/// Stable, machine-readable identifiers returned alongside every error message.
pub mod error_code {
    pub const VALIDATION_FAILED: &str = "VALIDATION_FAILED";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const TIMER_ALREADY_ACTIVE: &str = "TIMER_ALREADY_ACTIVE";
    pub const ENTRY_ALREADY_STOPPED: &str = "ENTRY_ALREADY_STOPPED";
    pub const INVALID_OUTCOME: &str = "INVALID_OUTCOME";
    pub const NOT_AN_APPROVER: &str = "NOT_AN_APPROVER";
    pub const ALREADY_RESOLVED: &str = "ALREADY_RESOLVED";
    pub const CONCURRENT_MODIFICATION: &str = "CONCURRENT_MODIFICATION";
    pub const UNRECOGNIZED_FORMAT: &str = "UNRECOGNIZED_FORMAT";
    pub const STEP_LOCKED: &str = "STEP_LOCKED";
    pub const TRAVELER_CLOSED: &str = "TRAVELER_CLOSED";
    pub const UNAUTHENTICATED: &str = "UNAUTHENTICATED";
    pub const FORBIDDEN: &str = "FORBIDDEN";
    pub const STORAGE_ERROR: &str = "STORAGE_ERROR";
}

/// Kinds of entity that can be looked up by id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Traveler,
    Step,
    LaborEntry,
    Approval,
    Coating,
    User,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Entity::Traveler => "traveler",
            Entity::Step => "process step",
            Entity::LaborEntry => "labor entry",
            Entity::Approval => "approval",
            Entity::Coating => "coating record",
            Entity::User => "user",
        };
        write!(f, "{label}")
    }
}

#[derive(Debug, Error)]
pub enum NexusError {
    #[error("{field}: {message}")]
    Validation { field: String, message: String },

    #[error("{entity} '{id}' not found")]
    NotFound { entity: Entity, id: String },

    #[error("an active labor entry is already running for this employee; stop it first")]
    TimerAlreadyActive { employee_id: UserId, entry_id: Uuid },

    #[error("the labor entry is already stopped")]
    EntryAlreadyStopped { entry_id: Uuid },

    #[error("accepted ({accepted}) + rejected ({rejected}) exceeds step quantity ({quantity})")]
    InvalidOutcome {
        accepted: u32,
        rejected: u32,
        quantity: u32,
    },

    #[error("user '{username}' is not an approver")]
    NotAnApprover { username: String },

    #[error("the approval was already {status}")]
    AlreadyResolved {
        approval_id: Uuid,
        status: ApprovalStatus,
    },

    #[error("traveler {traveler_id} changed since it was read (expected version {expected}, found {actual}); reload and retry")]
    ConcurrentModification {
        traveler_id: TravelerId,
        expected: u64,
        actual: u64,
    },

    #[error("unrecognized barcode format: {0}")]
    UnrecognizedFormat(String),

    #[error("the step is completed and cannot be {action}")]
    StepLocked { step_id: Uuid, action: &'static str },

    #[error("traveler {traveler_id} is {status} and its routing can no longer change")]
    TravelerClosed {
        traveler_id: TravelerId,
        status: TravelerStatus,
    },

    #[error("{0}")]
    Unauthenticated(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("storage error: {0}")]
    Storage(String),
}

pub type Result<T, E = NexusError> = std::result::Result<T, E>;

impl NexusError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        NexusError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn not_found(entity: Entity, id: impl ToString) -> Self {
        NexusError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            NexusError::Validation { .. } => error_code::VALIDATION_FAILED,
            NexusError::NotFound { .. } => error_code::NOT_FOUND,
            NexusError::TimerAlreadyActive { .. } => error_code::TIMER_ALREADY_ACTIVE,
            NexusError::EntryAlreadyStopped { .. } => error_code::ENTRY_ALREADY_STOPPED,
            NexusError::InvalidOutcome { .. } => error_code::INVALID_OUTCOME,
            NexusError::NotAnApprover { .. } => error_code::NOT_AN_APPROVER,
            NexusError::AlreadyResolved { .. } => error_code::ALREADY_RESOLVED,
            NexusError::ConcurrentModification { .. } => error_code::CONCURRENT_MODIFICATION,
            NexusError::UnrecognizedFormat(_) => error_code::UNRECOGNIZED_FORMAT,
            NexusError::StepLocked { .. } => error_code::STEP_LOCKED,
            NexusError::TravelerClosed { .. } => error_code::TRAVELER_CLOSED,
            NexusError::Unauthenticated(_) => error_code::UNAUTHENTICATED,
            NexusError::Forbidden(_) => error_code::FORBIDDEN,
            NexusError::Storage(_) => error_code::STORAGE_ERROR,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            NexusError::Validation { .. }
            | NexusError::InvalidOutcome { .. }
            | NexusError::UnrecognizedFormat(_) => StatusCode::BAD_REQUEST,
            NexusError::NotFound { .. } => StatusCode::NOT_FOUND,
            NexusError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            NexusError::NotAnApprover { .. } | NexusError::Forbidden(_) => StatusCode::FORBIDDEN,
            NexusError::TimerAlreadyActive { .. }
            | NexusError::EntryAlreadyStopped { .. }
            | NexusError::AlreadyResolved { .. }
            | NexusError::ConcurrentModification { .. }
            | NexusError::StepLocked { .. }
            | NexusError::TravelerClosed { .. } => StatusCode::CONFLICT,
            NexusError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to an operator. Storage details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            NexusError::Storage(_) => "the request could not be saved, please retry".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for NexusError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if matches!(self, NexusError::Validation { .. } | NexusError::InvalidOutcome { .. }) {
            crate::observability::service_metrics().record_validation_failure();
        }
        if status.is_server_error() {
            tracing::error!(error = %self, detail = ?self, "request failed");
        } else {
            tracing::debug!(error = %self, detail = ?self, code = self.error_code(), "request rejected");
        }
        let body = serde_json::json!({
            "code": self.error_code(),
            "message": self.public_message(),
        });
        (status, axum::Json(body)).into_response()
    }
}

impl From<JsonRejection> for NexusError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(rejection = %rejection.body_text(), "JSON body rejected");
        match rejection {
            JsonRejection::JsonDataError(err) => {
                let text = err.body_text();
                let detail = text
                    .strip_prefix("Failed to deserialize the JSON body into the target type: ")
                    .unwrap_or(&text);
                NexusError::validation("body", detail)
            }
            JsonRejection::JsonSyntaxError(_) => NexusError::validation("body", "is not valid JSON"),
            JsonRejection::MissingJsonContentType(_) => {
                NexusError::validation("content-type", "must be application/json")
            }
            other if other.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                NexusError::validation("body", "exceeds the request size limit")
            }
            _ => NexusError::validation("body", "could not be read"),
        }
    }
}

impl From<PathRejection> for NexusError {
    fn from(rejection: PathRejection) -> Self {
        tracing::debug!(rejection = %rejection.body_text(), "path rejected");
        NexusError::validation("path", "contains a malformed identifier")
    }
}

impl From<QueryRejection> for NexusError {
    fn from(rejection: QueryRejection) -> Self {
        let text = rejection.body_text();
        tracing::debug!(rejection = %text, "query string rejected");
        let detail = text
            .strip_prefix("Failed to deserialize query string: ")
            .unwrap_or(&text);
        NexusError::validation("query", detail)
    }
}

impl From<serde_json::Error> for NexusError {
    fn from(err: serde_json::Error) -> Self {
        NexusError::Storage(format!("document encoding failed: {err}"))
    }
}

#[cfg(feature = "database")]
impl From<sqlx::Error> for NexusError {
    fn from(err: sqlx::Error) -> Self {
        NexusError::Storage(err.to_string())
    }
}

#[cfg(feature = "database")]
impl From<sqlx::migrate::MigrateError> for NexusError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        NexusError::Storage(format!("migration failed: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_code_mapping() {
        assert_eq!(
            NexusError::validation("quantity", "must be positive").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            NexusError::not_found(Entity::Traveler, 7).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            NexusError::ConcurrentModification {
                traveler_id: 1,
                expected: 2,
                actual: 3
            }
            .status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            NexusError::NotAnApprover {
                username: "op".into()
            }
            .status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            NexusError::Unauthenticated("missing user".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn test_messages_name_the_offending_field() {
        let err = NexusError::validation("revision", "must not be empty");
        assert_eq!(err.to_string(), "revision: must not be empty");
        assert_eq!(err.error_code(), "VALIDATION_FAILED");

        let err = NexusError::not_found(Entity::LaborEntry, "abc");
        assert_eq!(err.to_string(), "labor entry 'abc' not found");
    }

    #[test]
    fn test_messages_do_not_expose_internal_ids() {
        let entry_id = Uuid::new_v4();
        let step_id = Uuid::new_v4();
        let approval_id = Uuid::new_v4();
        let errors = [
            NexusError::TimerAlreadyActive {
                employee_id: 42,
                entry_id,
            },
            NexusError::EntryAlreadyStopped { entry_id },
            NexusError::StepLocked {
                step_id,
                action: "removed",
            },
            NexusError::AlreadyResolved {
                approval_id,
                status: ApprovalStatus::Approved,
            },
        ];
        for err in &errors {
            let message = err.public_message();
            for id in [entry_id, step_id, approval_id] {
                assert!(!message.contains(&id.to_string()), "{message}");
            }
        }
        assert_eq!(errors[2].public_message(), "the step is completed and cannot be removed");
        assert_eq!(errors[3].public_message(), "the approval was already APPROVED");
    }

    #[test]
    fn test_storage_details_are_not_public() {
        let err = NexusError::Storage("disk I/O error at /var/lib/nexus.db".into());
        assert!(!err.public_message().contains("/var/lib"));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
