// Routing Engine - step mutation and outcome recording
// Every function edits a working copy of the traveler; nothing here persists.

use chrono::NaiveDate;
use tracing::debug;
use uuid::Uuid;

use crate::error::{Entity, NexusError, Result};
use crate::model::{
    FieldChange, NewStep, ProcessStep, StepOutcome, StepStatus, Traveler, TravelerStatus,
};

/// Routing edits are refused once the traveler is completed or cancelled.
pub fn ensure_open(traveler: &Traveler) -> Result<()> {
    if traveler.status.is_closed() {
        return Err(NexusError::TravelerClosed {
            traveler_id: traveler.id,
            status: traveler.status,
        });
    }
    Ok(())
}

pub fn find_step(traveler: &Traveler, step_id: Uuid) -> Result<&ProcessStep> {
    traveler
        .steps
        .iter()
        .find(|s| s.id == step_id)
        .ok_or_else(|| NexusError::not_found(Entity::Step, step_id))
}

pub fn find_step_mut(traveler: &mut Traveler, step_id: Uuid) -> Result<&mut ProcessStep> {
    traveler
        .steps
        .iter_mut()
        .find(|s| s.id == step_id)
        .ok_or_else(|| NexusError::not_found(Entity::Step, step_id))
}

/// Sequence ascending; ties keep their current relative order.
pub fn sort_steps(steps: &mut [ProcessStep]) {
    steps.sort_by_key(|s| s.sequence);
}

pub fn next_sequence(steps: &[ProcessStep]) -> u32 {
    steps.iter().map(|s| s.sequence).max().map_or(1, |max| max + 1)
}

pub fn add_step(traveler: &mut Traveler, new_step: &NewStep) -> Result<ProcessStep> {
    ensure_open(traveler)?;
    let sequence = new_step
        .sequence
        .unwrap_or_else(|| next_sequence(&traveler.steps));
    let step = ProcessStep::new(
        sequence,
        &new_step.work_center,
        &new_step.instruction,
        traveler.quantity,
    )?;

    debug!(traveler.id = traveler.id, step.sequence = sequence, work_center = %step.work_center, "Adding step");
    traveler.steps.push(step.clone());
    sort_steps(&mut traveler.steps);
    Ok(step)
}

pub fn remove_step(traveler: &mut Traveler, step_id: Uuid) -> Result<ProcessStep> {
    ensure_open(traveler)?;
    let step = find_step(traveler, step_id)?;
    if step.is_completed() {
        return Err(NexusError::StepLocked {
            step_id,
            action: "removed",
        });
    }

    let position = traveler
        .steps
        .iter()
        .position(|s| s.id == step_id)
        .ok_or_else(|| NexusError::not_found(Entity::Step, step_id))?;
    Ok(traveler.steps.remove(position))
}

pub fn reorder_step(
    traveler: &mut Traveler,
    step_id: Uuid,
    sequence: u32,
) -> Result<Option<FieldChange>> {
    ensure_open(traveler)?;
    let step = find_step_mut(traveler, step_id)?;
    if step.is_completed() {
        return Err(NexusError::StepLocked {
            step_id,
            action: "reordered",
        });
    }
    if step.sequence == sequence {
        return Ok(None);
    }

    let change = FieldChange::new(
        format!("{}.sequence", step.label()),
        Some(step.sequence.to_string()),
        Some(sequence.to_string()),
    );
    step.sequence = sequence;
    sort_steps(&mut traveler.steps);
    Ok(Some(change))
}

/// Move a pending step into work. Starting an in-progress step only updates the assignee.
pub fn start_step(
    traveler: &mut Traveler,
    step_id: Uuid,
    assignee: Option<&str>,
) -> Result<Vec<FieldChange>> {
    ensure_open(traveler)?;
    let step = find_step_mut(traveler, step_id)?;
    if step.is_completed() {
        return Err(NexusError::StepLocked {
            step_id,
            action: "restarted",
        });
    }

    let mut changes = Vec::new();
    if step.status == StepStatus::Pending {
        changes.push(status_change(step, StepStatus::InProgress));
        step.status = StepStatus::InProgress;
    }
    if let Some(assignee) = assignee.map(str::trim).filter(|a| !a.is_empty()) {
        if step.assignee.as_deref() != Some(assignee) {
            changes.push(FieldChange::new(
                format!("{}.assignee", step.label()),
                step.assignee.clone(),
                Some(assignee.to_string()),
            ));
            step.assignee = Some(assignee.to_string());
        }
    }
    Ok(changes)
}

/// Record counts and sign-off for a step.
///
/// A completion date completes the step; counts alone move a pending step into work.
/// A completed step never reverts. Returns the updated step and the fields that changed.
pub fn record_step_outcome(
    traveler: &mut Traveler,
    step_id: Uuid,
    outcome: &StepOutcome,
) -> Result<(ProcessStep, Vec<FieldChange>)> {
    if traveler.status == TravelerStatus::Cancelled {
        return Err(NexusError::TravelerClosed {
            traveler_id: traveler.id,
            status: traveler.status,
        });
    }

    let closed = traveler.status.is_closed();
    let traveler_id = traveler.id;
    let traveler_status = traveler.status;
    let step = find_step_mut(traveler, step_id)?;

    let total = u64::from(outcome.accepted) + u64::from(outcome.rejected);
    if total > u64::from(step.quantity) {
        return Err(NexusError::InvalidOutcome {
            accepted: outcome.accepted,
            rejected: outcome.rejected,
            quantity: step.quantity,
        });
    }

    let mut updated = step.clone();
    let mut changes = Vec::new();
    let label = step.label();

    if updated.accepted != outcome.accepted {
        changes.push(FieldChange::new(
            format!("{label}.accepted"),
            Some(updated.accepted.to_string()),
            Some(outcome.accepted.to_string()),
        ));
        updated.accepted = outcome.accepted;
    }
    if updated.rejected != outcome.rejected {
        changes.push(FieldChange::new(
            format!("{label}.rejected"),
            Some(updated.rejected.to_string()),
            Some(outcome.rejected.to_string()),
        ));
        updated.rejected = outcome.rejected;
    }
    if let Some(sign) = outcome.sign.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        if updated.sign.as_deref() != Some(sign) {
            changes.push(FieldChange::new(
                format!("{label}.sign"),
                updated.sign.clone(),
                Some(sign.to_string()),
            ));
            updated.sign = Some(sign.to_string());
        }
    }
    if let Some(date) = outcome.completed_date {
        if updated.completed_date != Some(date) {
            changes.push(FieldChange::new(
                format!("{label}.completedDate"),
                updated.completed_date.map(|d| d.to_string()),
                Some(date.to_string()),
            ));
            updated.completed_date = Some(date);
        }
        if updated.status != StepStatus::Completed {
            changes.push(status_change(&updated, StepStatus::Completed));
            updated.status = StepStatus::Completed;
        }
    } else if updated.status == StepStatus::Pending && updated.has_counts() {
        changes.push(status_change(&updated, StepStatus::InProgress));
        updated.status = StepStatus::InProgress;
    }

    if closed && !changes.is_empty() {
        return Err(NexusError::TravelerClosed {
            traveler_id,
            status: traveler_status,
        });
    }

    *step = updated.clone();
    Ok((updated, changes))
}

/// Sign off every step that is still open. Used when a traveler is completed by hand.
pub fn complete_open_steps(
    traveler: &mut Traveler,
    sign: &str,
    date: NaiveDate,
) -> Vec<FieldChange> {
    let mut changes = Vec::new();
    for step in traveler.steps.iter_mut().filter(|s| !s.is_completed()) {
        changes.push(status_change(step, StepStatus::Completed));
        step.status = StepStatus::Completed;
        step.completed_date = Some(date);
        if step.sign.is_none() {
            step.sign = Some(sign.to_string());
        }
    }
    changes
}

fn status_change(step: &ProcessStep, to: StepStatus) -> FieldChange {
    FieldChange::new(
        format!("{}.status", step.label()),
        Some(step.status.to_string()),
        Some(to.to_string()),
    )
}
