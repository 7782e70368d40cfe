use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::require_non_empty;
use crate::error::{NexusError, Result};

/// Outside-coating round trip. Status only moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CoatingStatus {
    Sent,
    Received,
    Inspected,
    Completed,
}

impl fmt::Display for CoatingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CoatingStatus::Sent => "SENT",
            CoatingStatus::Received => "RECEIVED",
            CoatingStatus::Inspected => "INSPECTED",
            CoatingStatus::Completed => "COMPLETED",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoatingRecord {
    pub id: Uuid,
    pub coating_type: String,
    pub sent_date: NaiveDate,
    pub received_date: Option<NaiveDate>,
    pub inspected_date: Option<NaiveDate>,
    pub tracking_number: Option<String>,
    pub status: CoatingStatus,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCoating {
    pub coating_type: String,
    pub sent_date: NaiveDate,
    #[serde(default)]
    pub tracking_number: Option<String>,
    #[serde(default)]
    pub notes: String,
}

impl CoatingRecord {
    pub fn new(input: NewCoating) -> Result<Self> {
        require_non_empty("coatingType", &input.coating_type)?;
        Ok(Self {
            id: Uuid::new_v4(),
            coating_type: input.coating_type.trim().to_string(),
            sent_date: input.sent_date,
            received_date: None,
            inspected_date: None,
            tracking_number: input
                .tracking_number
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty()),
            status: CoatingStatus::Sent,
            notes: input.notes,
        })
    }

    pub fn advance(&mut self, to: CoatingStatus, on: NaiveDate) -> Result<()> {
        if to <= self.status {
            return Err(NexusError::validation(
                "status",
                format!("coating cannot move from {} to {}", self.status, to),
            ));
        }
        match to {
            CoatingStatus::Received => self.received_date = Some(on),
            CoatingStatus::Inspected => {
                self.received_date.get_or_insert(on);
                self.inspected_date = Some(on);
            }
            CoatingStatus::Completed => {
                self.received_date.get_or_insert(on);
                self.inspected_date.get_or_insert(on);
            }
            CoatingStatus::Sent => {}
        }
        self.status = to;
        Ok(())
    }
}
