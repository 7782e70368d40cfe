use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::{NewStep, TravelerId, TravelerPatch, UserId};
use crate::error::{NexusError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ApprovalStatus::Pending => "PENDING",
            ApprovalStatus::Approved => "APPROVED",
            ApprovalStatus::Rejected => "REJECTED",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestType {
    Edit,
    Complete,
    Cancel,
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RequestType::Edit => "EDIT",
            RequestType::Complete => "COMPLETE",
            RequestType::Cancel => "CANCEL",
        };
        write!(f, "{s}")
    }
}

/// A mutation held back until an approver signs off
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PendingChange {
    Edit { patch: TravelerPatch },
    AddStep { step: NewStep },
    #[serde(rename_all = "camelCase")]
    RemoveStep { step_id: Uuid },
    #[serde(rename_all = "camelCase")]
    ReorderStep { step_id: Uuid, sequence: u32 },
    Complete,
    Cancel { reason: Option<String> },
}

impl PendingChange {
    pub fn request_type(&self) -> RequestType {
        match self {
            PendingChange::Edit { .. }
            | PendingChange::AddStep { .. }
            | PendingChange::RemoveStep { .. }
            | PendingChange::ReorderStep { .. } => RequestType::Edit,
            PendingChange::Complete => RequestType::Complete,
            PendingChange::Cancel { .. } => RequestType::Cancel,
        }
    }

    /// One-line description shown to approvers
    pub fn describe(&self) -> String {
        match self {
            PendingChange::Edit { patch } => {
                let fields = serde_json::to_value(patch)
                    .ok()
                    .and_then(|v| v.as_object().map(|o| o.keys().cloned().collect::<Vec<_>>()))
                    .unwrap_or_default();
                format!("Edit fields: {}", fields.join(", "))
            }
            PendingChange::AddStep { step } => {
                format!("Add step {} ({})", step.work_center, step.instruction)
            }
            PendingChange::RemoveStep { step_id } => format!("Remove step {step_id}"),
            PendingChange::ReorderStep { step_id, sequence } => {
                format!("Move step {step_id} to sequence {sequence}")
            }
            PendingChange::Complete => "Mark traveler completed".to_string(),
            PendingChange::Cancel { reason } => match reason {
                Some(reason) => format!("Cancel traveler: {reason}"),
                None => "Cancel traveler".to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Approval {
    pub id: Uuid,
    pub traveler_id: TravelerId,
    pub requested_by: UserId,
    pub requested_by_name: String,
    pub requested_at: DateTime<Utc>,
    pub approver_ids: Vec<UserId>,
    pub status: ApprovalStatus,
    pub request_type: RequestType,
    pub request_details: String,
    pub change: PendingChange,
    pub approved_by: Option<UserId>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejected_by: Option<UserId>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
}

impl Approval {
    pub fn request(
        traveler_id: TravelerId,
        requested_by: UserId,
        requested_by_name: &str,
        change: PendingChange,
        details: Option<String>,
        approver_ids: Vec<UserId>,
        now: DateTime<Utc>,
    ) -> Self {
        let request_details = details
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| change.describe());

        Self {
            id: Uuid::new_v4(),
            traveler_id,
            requested_by,
            requested_by_name: requested_by_name.to_string(),
            requested_at: now,
            approver_ids,
            status: ApprovalStatus::Pending,
            request_type: change.request_type(),
            request_details,
            change,
            approved_by: None,
            approved_at: None,
            rejected_by: None,
            rejected_at: None,
            rejection_reason: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == ApprovalStatus::Pending
    }

    pub fn ensure_pending(&self) -> Result<()> {
        if self.is_pending() {
            Ok(())
        } else {
            Err(NexusError::AlreadyResolved {
                approval_id: self.id,
                status: self.status,
            })
        }
    }

    pub fn approve(&mut self, approver: UserId, at: DateTime<Utc>) -> Result<()> {
        self.ensure_pending()?;
        self.status = ApprovalStatus::Approved;
        self.approved_by = Some(approver);
        self.approved_at = Some(at);
        Ok(())
    }

    pub fn reject(&mut self, approver: UserId, at: DateTime<Utc>, reason: &str) -> Result<()> {
        self.ensure_pending()?;
        super::require_non_empty("rejectionReason", reason)?;
        self.status = ApprovalStatus::Rejected;
        self.rejected_by = Some(approver);
        self.rejected_at = Some(at);
        self.rejection_reason = Some(reason.trim().to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approval(change: PendingChange) -> Approval {
        Approval::request(1, 5, "op", change, None, vec![9], Utc::now())
    }

    #[test]
    fn test_request_type_follows_change() {
        assert_eq!(approval(PendingChange::Complete).request_type, RequestType::Complete);
        assert_eq!(
            approval(PendingChange::Cancel { reason: None }).request_type,
            RequestType::Cancel
        );
        assert_eq!(
            approval(PendingChange::RemoveStep {
                step_id: Uuid::new_v4()
            })
            .request_type,
            RequestType::Edit
        );
    }

    #[test]
    fn test_terminal_status_is_final() {
        let mut a = approval(PendingChange::Complete);
        a.approve(9, Utc::now()).unwrap();

        let err = a.reject(9, Utc::now(), "late").unwrap_err();
        assert!(matches!(
            err,
            NexusError::AlreadyResolved {
                status: ApprovalStatus::Approved,
                ..
            }
        ));
        assert_eq!(a.rejection_reason, None);
    }

    #[test]
    fn test_reject_requires_reason() {
        let mut a = approval(PendingChange::Complete);
        assert!(a.reject(9, Utc::now(), "").is_err());
        assert!(a.is_pending());
    }

    #[test]
    fn test_change_serializes_with_kind_tag() {
        let change = PendingChange::ReorderStep {
            step_id: Uuid::nil(),
            sequence: 4,
        };
        let json = serde_json::to_value(&change).unwrap();
        assert_eq!(json["kind"], "REORDER_STEP");
        assert_eq!(json["sequence"], 4);
        assert!(json.get("stepId").is_some());

        let back: PendingChange = serde_json::from_value(json).unwrap();
        assert_eq!(back, change);
    }

    #[test]
    fn test_edit_description_lists_fields() {
        let change = PendingChange::Edit {
            patch: TravelerPatch {
                revision: Some("B".into()),
                ..Default::default()
            },
        };
        assert_eq!(change.describe(), "Edit fields: revision");
    }
}
