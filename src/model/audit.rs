use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::{TravelerId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Created,
    Updated,
    Completed,
    Approved,
    Rejected,
    Cancelled,
    ApprovalRequested,
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AuditAction::Created => "CREATED",
            AuditAction::Updated => "UPDATED",
            AuditAction::Completed => "COMPLETED",
            AuditAction::Approved => "APPROVED",
            AuditAction::Rejected => "REJECTED",
            AuditAction::Cancelled => "CANCELLED",
            AuditAction::ApprovalRequested => "APPROVAL_REQUESTED",
        };
        write!(f, "{s}")
    }
}

/// Immutable history record. Entries are appended, never edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub id: Uuid,
    pub traveler_id: TravelerId,
    pub user_id: UserId,
    pub user_name: String,
    pub action: AuditAction,
    pub field_changed: Option<String>,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub ip_address: String,
    pub user_agent: String,
}

/// A single field that moved from one value to another
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldChange {
    pub field: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

impl FieldChange {
    pub fn new(field: impl Into<String>, old_value: Option<String>, new_value: Option<String>) -> Self {
        Self {
            field: field.into(),
            old_value,
            new_value,
        }
    }
}

/// Where a request came from, as reported by the HTTP layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestMeta {
    pub ip_address: String,
    pub user_agent: String,
}

impl Default for RequestMeta {
    fn default() -> Self {
        Self {
            ip_address: "unknown".to_string(),
            user_agent: "unknown".to_string(),
        }
    }
}
