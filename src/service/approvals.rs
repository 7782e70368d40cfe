use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use super::{apply_change, TravelerService};
use crate::approval::{audit, ensure_approver, gate};
use crate::error::{Entity, NexusError, Result};
use crate::model::{Actor, Approval, AuditAction, FieldChange};
use crate::observability::service_metrics;

enum Resolution {
    Approve,
    Reject { reason: String },
}

impl TravelerService {
    /// Open requests across all travelers, oldest first. Approvers only.
    pub async fn pending_approvals(&self, actor: &Actor) -> Result<Vec<Approval>> {
        ensure_approver(&actor.user)?;
        let mut pending: Vec<Approval> = self
            .store
            .list()
            .await?
            .into_iter()
            .flat_map(|t| t.approvals)
            .filter(Approval::is_pending)
            .collect();
        pending.sort_by(|a, b| a.requested_at.cmp(&b.requested_at));
        Ok(pending)
    }

    /// Requests the actor filed, newest first
    pub async fn my_requests(&self, actor: &Actor) -> Result<Vec<Approval>> {
        let mut mine: Vec<Approval> = self
            .store
            .list()
            .await?
            .into_iter()
            .flat_map(|t| t.approvals)
            .filter(|a| a.requested_by == actor.id())
            .collect();
        mine.sort_by(|a, b| b.requested_at.cmp(&a.requested_at));
        Ok(mine)
    }

    /// Approve a request and apply its change in the same commit.
    ///
    /// If the change no longer applies the error is returned and the approval stays pending.
    pub async fn approve(&self, actor: &Actor, approval_id: Uuid) -> Result<Approval> {
        self.resolve(actor, approval_id, Resolution::Approve).await
    }

    pub async fn reject(&self, actor: &Actor, approval_id: Uuid, reason: String) -> Result<Approval> {
        self.resolve(actor, approval_id, Resolution::Reject { reason }).await
    }

    async fn resolve(&self, actor: &Actor, approval_id: Uuid, resolution: Resolution) -> Result<Approval> {
        ensure_approver(&actor.user)?;
        let traveler_id = self
            .store
            .find_approval_owner(approval_id)
            .await?
            .ok_or_else(|| NexusError::not_found(Entity::Approval, approval_id))?;

        let mut traveler = self.load(traveler_id).await?;
        let read_version = traveler.version;
        let approval = gate::find_approval(&traveler, approval_id)?.clone();
        approval.ensure_pending()?;
        if approval.requested_by == actor.id() && !self.settings.allow_self_resolve {
            return Err(NexusError::Forbidden(
                "approvers may not resolve their own requests".to_string(),
            ));
        }

        let now = Utc::now();
        let (action, resolved) = match resolution {
            Resolution::Approve => {
                apply_change(&mut traveler, actor, &approval.change, now)?;
                let entry = gate::find_approval_mut(&mut traveler, approval_id)?;
                entry.approve(actor.id(), now)?;
                (AuditAction::Approved, entry.clone())
            }
            Resolution::Reject { reason } => {
                let entry = gate::find_approval_mut(&mut traveler, approval_id)?;
                entry.reject(actor.id(), now, &reason)?;
                (AuditAction::Rejected, entry.clone())
            }
        };

        audit::record(
            &mut traveler,
            actor,
            action,
            Some(FieldChange::new(
                resolved.request_type.to_string(),
                Some(resolved.request_details.clone()),
                Some(resolved.status.to_string()),
            )),
            now,
        );
        traveler.touch(now);
        self.commit(traveler, read_version).await?;

        service_metrics().record_approval_resolved();
        info!(
            traveler.id = traveler_id,
            approval.id = %approval_id,
            actor = %actor.user.username,
            status = %resolved.status,
            "Approval resolved"
        );
        Ok(resolved)
    }
}
