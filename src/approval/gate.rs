use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::audit;
use crate::error::{Entity, NexusError, Result};
use crate::model::{Actor, Approval, AuditAction, FieldChange, PendingChange, Traveler, User, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Approvers change travelers directly; the audit log is the only record
    ApplyDirectly,
    /// Everyone else files a request that an approver resolves later
    RequireApproval,
}

pub fn evaluate(user: &User) -> GateDecision {
    if user.is_approver {
        GateDecision::ApplyDirectly
    } else {
        GateDecision::RequireApproval
    }
}

pub fn ensure_approver(user: &User) -> Result<()> {
    match evaluate(user) {
        GateDecision::ApplyDirectly => Ok(()),
        GateDecision::RequireApproval => Err(NexusError::NotAnApprover {
            username: user.username.clone(),
        }),
    }
}

/// File a pending approval on the traveler carrying the deferred change.
pub fn open_request(
    traveler: &mut Traveler,
    actor: &Actor,
    change: PendingChange,
    details: Option<String>,
    approver_ids: Vec<UserId>,
    now: DateTime<Utc>,
) -> Approval {
    let approval = Approval::request(
        traveler.id,
        actor.user.id,
        &actor.user.display_name(),
        change,
        details,
        approver_ids,
        now,
    );
    traveler.approvals.push(approval.clone());
    audit::record(
        traveler,
        actor,
        AuditAction::ApprovalRequested,
        Some(FieldChange::new(
            approval.request_type.to_string(),
            None,
            Some(approval.request_details.clone()),
        )),
        now,
    );
    approval
}

pub fn find_approval(traveler: &Traveler, approval_id: Uuid) -> Result<&Approval> {
    traveler
        .approvals
        .iter()
        .find(|a| a.id == approval_id)
        .ok_or_else(|| NexusError::not_found(Entity::Approval, approval_id))
}

pub fn find_approval_mut(traveler: &mut Traveler, approval_id: Uuid) -> Result<&mut Approval> {
    traveler
        .approvals
        .iter_mut()
        .find(|a| a.id == approval_id)
        .ok_or_else(|| NexusError::not_found(Entity::Approval, approval_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ApprovalStatus, NewTraveler, RequestMeta, RequestType, UserRole};

    fn user(id: UserId, is_approver: bool) -> User {
        User {
            id,
            username: format!("user{id}"),
            first_name: String::new(),
            last_name: String::new(),
            email: String::new(),
            role: UserRole::Operator,
            is_approver,
        }
    }

    #[test]
    fn test_gate_follows_approver_flag() {
        assert_eq!(evaluate(&user(1, true)), GateDecision::ApplyDirectly);
        assert_eq!(evaluate(&user(2, false)), GateDecision::RequireApproval);
        assert!(matches!(
            ensure_approver(&user(2, false)),
            Err(NexusError::NotAnApprover { .. })
        ));
    }

    #[test]
    fn test_open_request_records_audit() {
        let mut t = Traveler::new(
            1,
            NewTraveler {
                job_number: "8414".into(),
                traveler_type: "PCB".into(),
                part_number: "P".into(),
                revision: "A".into(),
                quantity: 1,
                ..Default::default()
            },
            2,
            Utc::now(),
        )
        .unwrap();
        let actor = Actor::new(user(2, false), RequestMeta::default());

        let approval = open_request(&mut t, &actor, PendingChange::Complete, None, vec![1, 3], Utc::now());

        assert_eq!(approval.status, ApprovalStatus::Pending);
        assert_eq!(approval.request_type, RequestType::Complete);
        assert_eq!(approval.approver_ids, vec![1, 3]);
        assert_eq!(find_approval(&t, approval.id).unwrap(), &approval);
        assert_eq!(t.audit_log.len(), 1);
        assert_eq!(t.audit_log[0].action, AuditAction::ApprovalRequested);
        assert_eq!(t.audit_log[0].field_changed.as_deref(), Some("COMPLETE"));
    }
}
