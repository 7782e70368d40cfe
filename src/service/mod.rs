// Traveler service: every request is one read-copy-commit of a traveler aggregate

mod approvals;
mod bom;
mod coatings;
mod labor;
mod reports;
mod steps;
mod travelers;
mod users;

pub use labor::{ActiveLabor, StartLabor};
pub use steps::StepRecorded;
pub use travelers::{ScannedTraveler, TravelerFilter};

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::approval::{audit, gate, GateDecision};
use crate::config::NexusConfig;
use crate::error::{NexusError, Result};
use crate::labor::EmployeeLocks;
use crate::model::{
    Actor, Approval, AuditAction, FieldChange, PendingChange, RequestMeta, Traveler, TravelerId,
    TravelerStatus, UserId,
};
use crate::observability::service_metrics;
use crate::routing::{self, StatusTransition, TransitionResult};
use crate::store::Store;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSettings {
    pub labor_write_retries: u32,
    pub my_entries_days: i64,
    pub allow_self_resolve: bool,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self::from(&NexusConfig::default())
    }
}

impl From<&NexusConfig> for ServiceSettings {
    fn from(config: &NexusConfig) -> Self {
        Self {
            labor_write_retries: config.labor.write_retries,
            my_entries_days: config.labor.my_entries_days,
            allow_self_resolve: config.approvals.allow_self_resolve,
        }
    }
}

/// Result of a gated mutation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum GateOutcome<T> {
    Applied(T),
    PendingApproval(Approval),
}

impl<T> GateOutcome<T> {
    pub fn applied(self) -> Option<T> {
        match self {
            GateOutcome::Applied(value) => Some(value),
            GateOutcome::PendingApproval(_) => None,
        }
    }

    pub fn pending(self) -> Option<Approval> {
        match self {
            GateOutcome::Applied(_) => None,
            GateOutcome::PendingApproval(approval) => Some(approval),
        }
    }
}

pub struct TravelerService {
    store: Arc<dyn Store>,
    employee_locks: EmployeeLocks,
    settings: ServiceSettings,
}

impl TravelerService {
    pub fn new(store: Arc<dyn Store>, settings: ServiceSettings) -> Self {
        Self {
            store,
            employee_locks: EmployeeLocks::new(),
            settings,
        }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    /// Look up the acting user by username. Unknown users are unauthenticated.
    pub async fn resolve_actor(&self, username: &str, meta: RequestMeta) -> Result<Actor> {
        if username.trim().is_empty() {
            return Err(NexusError::Unauthenticated("no acting user supplied".to_string()));
        }
        let user = self
            .store
            .user_by_username(username)
            .await?
            .ok_or_else(|| NexusError::Unauthenticated(format!("unknown user '{}'", username.trim())))?;
        Ok(Actor::new(user, meta))
    }

    async fn load(&self, id: TravelerId) -> Result<Traveler> {
        self.store.get(id).await
    }

    async fn commit(&self, traveler: Traveler, read_version: u64) -> Result<Traveler> {
        let traveler_id = traveler.id;
        match self.store.commit(traveler, read_version).await {
            Ok(committed) => {
                service_metrics().record_commit();
                debug!(traveler.id = traveler_id, version = committed.version, "Traveler committed");
                Ok(committed)
            }
            Err(e) => {
                if matches!(e, NexusError::ConcurrentModification { .. }) {
                    service_metrics().record_version_conflict();
                }
                Err(e)
            }
        }
    }

    async fn approver_ids(&self) -> Result<Vec<UserId>> {
        Ok(self.store.approvers().await?.into_iter().map(|u| u.id).collect())
    }

    /// Apply an ungated edit. Edits that change nothing are not written.
    async fn mutate<T, F>(&self, id: TravelerId, expected_version: Option<u64>, edit: F) -> Result<(Traveler, T)>
    where
        F: FnOnce(&mut Traveler, DateTime<Utc>) -> Result<T>,
    {
        let original = self.load(id).await?;
        check_version(&original, expected_version)?;

        let now = Utc::now();
        let mut traveler = original.clone();
        let value = edit(&mut traveler, now)?;
        if traveler == original {
            return Ok((original, value));
        }

        traveler.touch(now);
        let committed = self.commit(traveler, original.version).await?;
        Ok((committed, value))
    }

    /// Run a mutation through the approval gate.
    ///
    /// Approvers apply it immediately. Anyone else gets a pending approval carrying the
    /// change, after the change has been checked against the current traveler.
    async fn gated(
        &self,
        actor: &Actor,
        id: TravelerId,
        expected_version: Option<u64>,
        change: PendingChange,
        details: Option<String>,
    ) -> Result<GateOutcome<Traveler>> {
        actor.ensure_can_write()?;
        let mut traveler = self.load(id).await?;
        check_version(&traveler, expected_version)?;
        let read_version = traveler.version;
        let now = Utc::now();

        match gate::evaluate(&actor.user) {
            GateDecision::ApplyDirectly => {
                let original = traveler.clone();
                apply_change(&mut traveler, actor, &change, now)?;
                if traveler == original {
                    debug!(traveler.id = id, change = %change.request_type(), "Change is a no-op");
                    return Ok(GateOutcome::Applied(original));
                }
                traveler.touch(now);
                let committed = self.commit(traveler, read_version).await?;
                info!(traveler.id = id, actor = %actor.user.username, change = %change.request_type(), "Change applied");
                Ok(GateOutcome::Applied(committed))
            }
            GateDecision::RequireApproval => {
                let mut trial = traveler.clone();
                apply_change(&mut trial, actor, &change, now)?;
                if trial == traveler {
                    // Nothing to approve
                    return Ok(GateOutcome::Applied(traveler));
                }

                let approvers = self.approver_ids().await?;
                let approval = gate::open_request(&mut traveler, actor, change, details, approvers, now);
                traveler.touch(now);
                self.commit(traveler, read_version).await?;
                service_metrics().record_approval_requested();
                info!(
                    traveler.id = id,
                    actor = %actor.user.username,
                    approval.id = %approval.id,
                    request_type = %approval.request_type,
                    "Approval requested"
                );
                Ok(GateOutcome::PendingApproval(approval))
            }
        }
    }
}

/// A client that read an older version gets a conflict before anything changes.
fn check_version(traveler: &Traveler, expected_version: Option<u64>) -> Result<()> {
    match expected_version {
        Some(expected) if expected != traveler.version => {
            service_metrics().record_version_conflict();
            Err(NexusError::ConcurrentModification {
                traveler_id: traveler.id,
                expected,
                actual: traveler.version,
            })
        }
        _ => Ok(()),
    }
}

/// Apply a gateable change to a working copy, with its audit entries.
fn apply_change(
    traveler: &mut Traveler,
    actor: &Actor,
    change: &PendingChange,
    now: DateTime<Utc>,
) -> Result<()> {
    match change {
        PendingChange::Edit { patch } => {
            if patch.is_empty() {
                return Err(NexusError::validation("patch", "no fields to change"));
            }
            let changes = traveler.apply_patch(patch)?;
            audit::record_changes(traveler, actor, AuditAction::Updated, changes, now);
        }
        PendingChange::AddStep { step } => {
            let added = routing::add_step(traveler, step)?;
            audit::record(
                traveler,
                actor,
                AuditAction::Updated,
                Some(FieldChange::new(added.label(), None, Some(added.instruction.clone()))),
                now,
            );
        }
        PendingChange::RemoveStep { step_id } => {
            let removed = routing::remove_step(traveler, *step_id)?;
            audit::record(
                traveler,
                actor,
                AuditAction::Updated,
                Some(FieldChange::new(removed.label(), Some(removed.instruction.clone()), None)),
                now,
            );
        }
        PendingChange::ReorderStep { step_id, sequence } => {
            if let Some(moved) = routing::reorder_step(traveler, *step_id, *sequence)? {
                audit::record(traveler, actor, AuditAction::Updated, Some(moved), now);
            }
        }
        PendingChange::Complete => {
            routing::engine::ensure_open(traveler)?;
            let signed = routing::complete_open_steps(traveler, &actor.user.initials(), now.date_naive());
            audit::record_changes(traveler, actor, AuditAction::Updated, signed, now);
            let result = routing::apply_transition(traveler, StatusTransition::Complete, now)?;
            record_transition(traveler, actor, AuditAction::Completed, result, now);
            return Ok(());
        }
        PendingChange::Cancel { reason } => {
            let result = routing::apply_transition(
                traveler,
                StatusTransition::Cancel {
                    reason: reason.clone(),
                },
                now,
            )?;
            if result.is_changed() {
                record_transition(traveler, actor, AuditAction::Cancelled, result, now);
                if let Some(reason) = reason.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
                    audit::record(
                        traveler,
                        actor,
                        AuditAction::Cancelled,
                        Some(FieldChange::new("cancellationReason", None, Some(reason.to_string()))),
                        now,
                    );
                }
            }
            return Ok(());
        }
    }

    reevaluate_status(traveler, actor, now)
}

/// Re-derive status after routing or outcome changes and audit any move.
fn reevaluate_status(traveler: &mut Traveler, actor: &Actor, now: DateTime<Utc>) -> Result<()> {
    let result = routing::apply_transition(traveler, StatusTransition::Reevaluate, now)?;
    let action = match result.status() {
        TravelerStatus::Completed => AuditAction::Completed,
        _ => AuditAction::Updated,
    };
    record_transition(traveler, actor, action, result, now);
    Ok(())
}

fn record_transition(
    traveler: &mut Traveler,
    actor: &Actor,
    action: AuditAction,
    result: TransitionResult,
    now: DateTime<Utc>,
) {
    if let TransitionResult::Changed { previous, new } = result {
        audit::record(
            traveler,
            actor,
            action,
            Some(FieldChange::new("status", Some(previous.to_string()), Some(new.to_string()))),
            now,
        );
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::model::{NewTraveler, NewUser, UserRole};
    use crate::store::MemoryStore;

    pub struct Fixture {
        pub service: TravelerService,
        pub approver: Actor,
        pub operator: Actor,
    }

    pub async fn fixture() -> Fixture {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let approver = store
            .create_user(NewUser {
                username: "jsmith".into(),
                first_name: "Jo".into(),
                last_name: "Smith".into(),
                email: String::new(),
                role: UserRole::Supervisor,
                is_approver: true,
            })
            .await
            .unwrap();
        let operator = store
            .create_user(NewUser {
                username: "dortiz".into(),
                first_name: "Dana".into(),
                last_name: "Ortiz".into(),
                email: String::new(),
                role: UserRole::Operator,
                is_approver: false,
            })
            .await
            .unwrap();

        Fixture {
            service: TravelerService::new(store, ServiceSettings::default()),
            approver: Actor::new(approver, RequestMeta::default()),
            operator: Actor::new(operator, RequestMeta::default()),
        }
    }

    pub fn new_traveler(traveler_type: &str, quantity: u32) -> NewTraveler {
        NewTraveler {
            job_number: "8414".into(),
            traveler_type: traveler_type.into(),
            part_number: "PN-100".into(),
            part_description: "Controller".into(),
            revision: "A".into(),
            quantity,
            customer_code: "ACME".into(),
            customer_name: "Acme Corp".into(),
            ..Default::default()
        }
    }
}
