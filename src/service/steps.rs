use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use super::{reevaluate_status, GateOutcome, TravelerService};
use crate::approval::audit;
use crate::error::Result;
use crate::model::{
    Actor, AuditAction, NewStep, PendingChange, ProcessStep, StepOutcome, Traveler, TravelerId,
    TravelerStatus,
};
use crate::routing;

/// A recorded outcome plus where it left the traveler
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepRecorded {
    pub step: ProcessStep,
    pub traveler_status: TravelerStatus,
    pub version: u64,
}

impl TravelerService {
    pub async fn add_step(
        &self,
        actor: &Actor,
        id: TravelerId,
        step: NewStep,
        expected_version: Option<u64>,
    ) -> Result<GateOutcome<Traveler>> {
        self.gated(actor, id, expected_version, PendingChange::AddStep { step }, None)
            .await
    }

    pub async fn remove_step(
        &self,
        actor: &Actor,
        id: TravelerId,
        step_id: Uuid,
        expected_version: Option<u64>,
    ) -> Result<GateOutcome<Traveler>> {
        self.gated(actor, id, expected_version, PendingChange::RemoveStep { step_id }, None)
            .await
    }

    pub async fn reorder_step(
        &self,
        actor: &Actor,
        id: TravelerId,
        step_id: Uuid,
        sequence: u32,
        expected_version: Option<u64>,
    ) -> Result<GateOutcome<Traveler>> {
        self.gated(
            actor,
            id,
            expected_version,
            PendingChange::ReorderStep { step_id, sequence },
            None,
        )
        .await
    }

    pub async fn start_step(
        &self,
        actor: &Actor,
        id: TravelerId,
        step_id: Uuid,
        assignee: Option<String>,
        expected_version: Option<u64>,
    ) -> Result<Traveler> {
        actor.ensure_can_write()?;
        let assignee = assignee.unwrap_or_else(|| actor.user.username.clone());
        let (traveler, _) = self
            .mutate(id, expected_version, |traveler, now| {
                let changes = routing::start_step(traveler, step_id, Some(&assignee))?;
                audit::record_changes(traveler, actor, AuditAction::Updated, changes, now);
                reevaluate_status(traveler, actor, now)
            })
            .await?;
        Ok(traveler)
    }

    /// Record counts and sign-off on a step. Recording the same outcome twice writes nothing.
    pub async fn record_step_outcome(
        &self,
        actor: &Actor,
        id: TravelerId,
        step_id: Uuid,
        outcome: StepOutcome,
        expected_version: Option<u64>,
    ) -> Result<StepRecorded> {
        actor.ensure_can_write()?;
        let (traveler, step) = self
            .mutate(id, expected_version, |traveler, now| {
                let (step, changes) = routing::record_step_outcome(traveler, step_id, &outcome)?;
                if !changes.is_empty() {
                    info!(
                        traveler.id = traveler.id,
                        step = %step.label(),
                        accepted = step.accepted,
                        rejected = step.rejected,
                        status = %step.status,
                        "Step outcome recorded"
                    );
                }
                audit::record_changes(traveler, actor, AuditAction::Updated, changes, now);
                reevaluate_status(traveler, actor, now)?;
                Ok(step)
            })
            .await?;

        Ok(StepRecorded {
            step,
            traveler_status: traveler.status,
            version: traveler.version,
        })
    }
}
