use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::{find_work_center, require_non_empty};
use crate::error::{NexusError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepStatus {
    Pending,
    InProgress,
    Completed,
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StepStatus::Pending => "PENDING",
            StepStatus::InProgress => "IN_PROGRESS",
            StepStatus::Completed => "COMPLETED",
        };
        write!(f, "{s}")
    }
}

/// One routed operation on a traveler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessStep {
    pub id: Uuid,
    pub sequence: u32,
    pub work_center: String,
    pub instruction: String,
    pub quantity: u32,
    pub accepted: u32,
    pub rejected: u32,
    pub assignee: Option<String>,
    pub sign: Option<String>,
    pub completed_date: Option<NaiveDate>,
    pub status: StepStatus,
}

impl ProcessStep {
    /// Build a pending step, normalizing the work center to its catalog code.
    pub fn new(sequence: u32, work_center: &str, instruction: &str, quantity: u32) -> Result<Self> {
        let center = find_work_center(work_center).ok_or_else(|| {
            NexusError::validation(
                "workCenter",
                format!("'{}' is not a known work center", work_center.trim()),
            )
        })?;
        require_non_empty("instruction", instruction)?;
        if quantity == 0 {
            return Err(NexusError::validation("quantity", "must be greater than zero"));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            sequence,
            work_center: center.code.to_string(),
            instruction: instruction.trim().to_string(),
            quantity,
            accepted: 0,
            rejected: 0,
            assignee: None,
            sign: None,
            completed_date: None,
            status: StepStatus::Pending,
        })
    }

    pub fn is_completed(&self) -> bool {
        self.status == StepStatus::Completed
    }

    pub fn has_started(&self) -> bool {
        self.status != StepStatus::Pending
    }

    pub fn has_counts(&self) -> bool {
        self.accepted > 0 || self.rejected > 0
    }

    /// Short human label used in audit field names, e.g. `step 30 WAVE SOLDER`
    pub fn label(&self) -> String {
        format!("step {} {}", self.sequence, self.work_center)
    }
}

/// Request to append a step to a routing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStep {
    pub work_center: String,
    pub instruction: String,
    #[serde(default)]
    pub sequence: Option<u32>,
}

/// Counts and sign-off recorded against a step
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepOutcome {
    pub accepted: u32,
    pub rejected: u32,
    #[serde(default)]
    pub sign: Option<String>,
    #[serde(default)]
    pub completed_date: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_step_normalizes_work_center() {
        let step = ProcessStep::new(30, "wave solder", "Wave soldering process", 10).unwrap();
        assert_eq!(step.work_center, "WAVE SOLDER");
        assert_eq!(step.status, StepStatus::Pending);
        assert_eq!(step.label(), "step 30 WAVE SOLDER");
    }

    #[test]
    fn test_unknown_work_center_is_rejected() {
        let err = ProcessStep::new(1, "PAINT BOOTH", "Paint", 1).unwrap_err();
        match err {
            NexusError::Validation { field, .. } => assert_eq!(field, "workCenter"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_status_serializes_screaming_snake() {
        let json = serde_json::to_string(&StepStatus::InProgress).unwrap();
        assert_eq!(json, "\"IN_PROGRESS\"");
    }
}
