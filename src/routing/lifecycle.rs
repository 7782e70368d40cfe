// Traveler lifecycle - derived status plus the manual overrides
// All status changes go through `apply_transition`.

use chrono::{DateTime, Utc};
use tracing::info;

use crate::error::{NexusError, Result};
use crate::model::{ProcessStep, StepStatus, Traveler, TravelerStatus};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusTransition {
    /// Re-derive status from the steps after a routing or outcome change
    Reevaluate,
    Hold { reason: Option<String> },
    Release,
    Complete,
    Cancel { reason: Option<String> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionResult {
    Changed {
        previous: TravelerStatus,
        new: TravelerStatus,
    },
    Unchanged {
        status: TravelerStatus,
    },
}

impl TransitionResult {
    pub fn is_changed(&self) -> bool {
        matches!(self, TransitionResult::Changed { .. })
    }

    pub fn status(&self) -> TravelerStatus {
        match self {
            TransitionResult::Changed { new, .. } => *new,
            TransitionResult::Unchanged { status } => *status,
        }
    }
}

/// Status implied by the steps alone.
pub fn derive_status(steps: &[ProcessStep]) -> TravelerStatus {
    if steps.is_empty() || steps.iter().all(|s| s.status == StepStatus::Pending) {
        TravelerStatus::Created
    } else if steps.iter().all(ProcessStep::is_completed) {
        TravelerStatus::Completed
    } else {
        TravelerStatus::InProgress
    }
}

pub fn apply_transition(
    traveler: &mut Traveler,
    transition: StatusTransition,
    now: DateTime<Utc>,
) -> Result<TransitionResult> {
    let previous = traveler.status;

    let target = match transition {
        StatusTransition::Reevaluate => match previous {
            TravelerStatus::OnHold | TravelerStatus::Cancelled | TravelerStatus::Completed => {
                previous
            }
            TravelerStatus::Created | TravelerStatus::InProgress => {
                derive_status(&traveler.steps)
            }
        },
        StatusTransition::Hold { reason } => {
            ensure_not_closed(traveler)?;
            traveler.hold_reason = reason.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());
            TravelerStatus::OnHold
        }
        StatusTransition::Release => {
            if previous != TravelerStatus::OnHold {
                return Ok(TransitionResult::Unchanged { status: previous });
            }
            traveler.hold_reason = None;
            derive_status(&traveler.steps)
        }
        StatusTransition::Complete => {
            ensure_not_closed(traveler)?;
            let open = traveler.steps.iter().filter(|s| !s.is_completed()).count();
            if open > 0 {
                return Err(NexusError::validation(
                    "steps",
                    format!("{open} step(s) are still open"),
                ));
            }
            traveler.hold_reason = None;
            TravelerStatus::Completed
        }
        StatusTransition::Cancel { .. } => {
            match previous {
                TravelerStatus::Cancelled => {
                    return Ok(TransitionResult::Unchanged { status: previous })
                }
                TravelerStatus::Completed => {
                    return Err(NexusError::TravelerClosed {
                        traveler_id: traveler.id,
                        status: previous,
                    })
                }
                _ => {}
            }
            traveler.hold_reason = None;
            TravelerStatus::Cancelled
        }
    };

    if target == previous {
        return Ok(TransitionResult::Unchanged { status: previous });
    }

    traveler.status = target;
    if target == TravelerStatus::Completed && traveler.completed_at.is_none() {
        traveler.completed_at = Some(now);
    }
    info!(
        traveler.id = traveler.id,
        from = %previous,
        to = %target,
        "Traveler status changed"
    );

    Ok(TransitionResult::Changed {
        previous,
        new: target,
    })
}

fn ensure_not_closed(traveler: &Traveler) -> Result<()> {
    if traveler.status.is_closed() {
        return Err(NexusError::TravelerClosed {
            traveler_id: traveler.id,
            status: traveler.status,
        });
    }
    Ok(())
}
