use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{NexusError, Result};
use crate::model::{round_to, LaborEntry, TravelerId, UserId};

/// Which entries a summary covers. Every filter that is set must match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaborFilter {
    pub week_of: Option<NaiveDate>,
    pub employee_id: Option<UserId>,
    pub traveler_id: Option<TravelerId>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaborSummary {
    pub total_hours: f64,
    pub total_entries: usize,
    pub completed_entries: usize,
    pub active_entries: usize,
    pub completion_rate: f64,
}

/// Monday and Sunday of the week containing `date`, clamped to the calendar range
pub fn week_bounds(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let monday = date
        .checked_sub_signed(Duration::days(i64::from(date.weekday().num_days_from_monday())))
        .unwrap_or(NaiveDate::MIN);
    let sunday = monday
        .checked_add_signed(Duration::days(6))
        .unwrap_or(NaiveDate::MAX);
    (monday, sunday)
}

impl LaborFilter {
    pub fn matches(&self, entry: &LaborEntry) -> bool {
        if self.employee_id.is_some_and(|id| id != entry.employee_id) {
            return false;
        }
        if self.traveler_id.is_some_and(|id| id != entry.traveler_id) {
            return false;
        }
        if let Some(day) = self.week_of {
            let (monday, sunday) = week_bounds(day);
            let started = entry.start_time.date_naive();
            if started < monday || started > sunday {
                return false;
            }
        }
        true
    }
}

pub fn summarize<'a>(entries: impl IntoIterator<Item = &'a LaborEntry>, filter: &LaborFilter) -> LaborSummary {
    let mut summary = LaborSummary::default();
    let mut hours = 0.0;

    for entry in entries.into_iter().filter(|e| filter.matches(e)) {
        summary.total_entries += 1;
        if entry.is_completed {
            summary.completed_entries += 1;
            hours += entry.hours_worked;
        } else {
            summary.active_entries += 1;
        }
    }

    summary.total_hours = round_to(hours, 2);
    summary.completion_rate = if summary.total_entries == 0 {
        0.0
    } else {
        round_to(
            summary.completed_entries as f64 / summary.total_entries as f64 * 100.0,
            1,
        )
    };
    summary
}

/// Entries started within the last `days` days, newest first
pub fn recent_entries<'a>(
    entries: impl IntoIterator<Item = &'a LaborEntry>,
    employee_id: UserId,
    days: i64,
    now: DateTime<Utc>,
) -> Result<Vec<LaborEntry>> {
    let cutoff = Duration::try_days(days)
        .and_then(|window| now.checked_sub_signed(window))
        .ok_or_else(|| NexusError::validation("days", "window is out of range"))?;
    let mut recent: Vec<LaborEntry> = entries
        .into_iter()
        .filter(|e| e.employee_id == employee_id && e.start_time >= cutoff)
        .cloned()
        .collect();
    recent.sort_by(|a, b| b.start_time.cmp(&a.start_time));
    Ok(recent)
}
