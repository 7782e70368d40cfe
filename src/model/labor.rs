use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{require_non_empty, round_to, TravelerId, UserId};
use crate::error::{NexusError, Result};

/// Time an employee spent on a traveler, optionally against one step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaborEntry {
    pub id: Uuid,
    pub traveler_id: TravelerId,
    pub step_id: Option<Uuid>,
    pub employee_id: UserId,
    pub employee_name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub hours_worked: f64,
    pub description: String,
    pub is_completed: bool,
}

impl LaborEntry {
    pub fn open(
        traveler_id: TravelerId,
        step_id: Option<Uuid>,
        employee_id: UserId,
        employee_name: &str,
        description: &str,
        start_time: DateTime<Utc>,
    ) -> Result<Self> {
        require_non_empty("description", description)?;
        require_non_empty("employeeName", employee_name)?;

        Ok(Self {
            id: Uuid::new_v4(),
            traveler_id,
            step_id,
            employee_id,
            employee_name: employee_name.trim().to_string(),
            start_time,
            end_time: None,
            hours_worked: 0.0,
            description: description.trim().to_string(),
            is_completed: false,
        })
    }

    pub fn is_open(&self) -> bool {
        self.end_time.is_none()
    }

    pub fn close(&mut self, end_time: DateTime<Utc>) -> Result<()> {
        if !self.is_open() {
            return Err(NexusError::EntryAlreadyStopped { entry_id: self.id });
        }
        self.end_time = Some(end_time);
        self.hours_worked = hours_between(self.start_time, end_time);
        self.is_completed = true;
        Ok(())
    }

    /// Hours so far for an open entry, or the recorded hours once stopped
    pub fn elapsed_hours(&self, now: DateTime<Utc>) -> f64 {
        match self.end_time {
            Some(_) => self.hours_worked,
            None => hours_between(self.start_time, now),
        }
    }
}

/// Elapsed hours rounded to two decimals. Clock skew never yields negative time.
pub fn hours_between(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    let millis = (end - start).num_milliseconds().max(0);
    round_to(millis as f64 / 3_600_000.0, 2)
}
