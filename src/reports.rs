// Aggregate reports over the traveler set

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::model::{round_to, CoatingStatus, Traveler, TravelerStatus, TravelerType, User, UserId};

/// Inclusive date range on creation/start dates. Open ends are unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl DateRange {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        let day = at.date_naive();
        self.start_date.map_or(true, |start| day >= start)
            && self.end_date.map_or(true, |end| day <= end)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_travelers: usize,
    pub active_travelers: usize,
    pub on_hold_travelers: usize,
    pub completed_today: usize,
    pub pending_approvals: usize,
    pub active_timers: usize,
    pub total_users: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeCompletion {
    #[serde(rename = "type")]
    pub traveler_type: TravelerType,
    pub total: usize,
    pub completed: usize,
    pub completion_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelerCompletionReport {
    pub total_travelers: usize,
    pub completed_travelers: usize,
    pub in_progress_travelers: usize,
    pub completion_rate: f64,
    pub by_type: Vec<TypeCompletion>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserEfficiency {
    pub employee_id: UserId,
    pub username: Option<String>,
    pub name: String,
    pub total_hours: f64,
    pub travelers_worked: usize,
    pub avg_hours_per_traveler: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LaborEfficiencyReport {
    pub total_hours_logged: f64,
    pub average_hours_per_traveler: f64,
    pub efficiency_by_user: Vec<UserEfficiency>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoatingStatusCount {
    pub status: CoatingStatus,
    pub count: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoatingStatusReport {
    pub total_coating_jobs: usize,
    pub status_breakdown: Vec<CoatingStatusCount>,
}

fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        round_to(part as f64 / whole as f64 * 100.0, 1)
    }
}

pub fn dashboard_stats(travelers: &[Traveler], total_users: usize, today: NaiveDate) -> DashboardStats {
    let count = |status: TravelerStatus| travelers.iter().filter(|t| t.status == status).count();

    DashboardStats {
        total_travelers: travelers.len(),
        active_travelers: count(TravelerStatus::InProgress),
        on_hold_travelers: count(TravelerStatus::OnHold),
        completed_today: travelers
            .iter()
            .filter(|t| t.completed_at.is_some_and(|at| at.date_naive() == today))
            .count(),
        pending_approvals: travelers
            .iter()
            .flat_map(|t| &t.approvals)
            .filter(|a| a.is_pending())
            .count(),
        active_timers: travelers
            .iter()
            .flat_map(|t| &t.labor_entries)
            .filter(|e| e.is_open())
            .count(),
        total_users,
    }
}

pub fn traveler_completion(travelers: &[Traveler], range: DateRange) -> TravelerCompletionReport {
    let selected: Vec<&Traveler> = travelers.iter().filter(|t| range.contains(t.created_at)).collect();
    let completed = selected
        .iter()
        .filter(|t| t.status == TravelerStatus::Completed)
        .count();
    let in_progress = selected
        .iter()
        .filter(|t| t.status == TravelerStatus::InProgress)
        .count();

    let mut per_type: BTreeMap<TravelerType, (usize, usize)> = BTreeMap::new();
    for traveler in &selected {
        let entry = per_type.entry(traveler.traveler_type).or_default();
        entry.0 += 1;
        if traveler.status == TravelerStatus::Completed {
            entry.1 += 1;
        }
    }

    TravelerCompletionReport {
        total_travelers: selected.len(),
        completed_travelers: completed,
        in_progress_travelers: in_progress,
        completion_rate: percentage(completed, selected.len()),
        by_type: per_type
            .into_iter()
            .map(|(traveler_type, (total, completed))| TypeCompletion {
                traveler_type,
                total,
                completed,
                completion_rate: percentage(completed, total),
            })
            .collect(),
    }
}

/// Hours from stopped entries, grouped by employee
pub fn labor_efficiency(travelers: &[Traveler], users: &[User], range: DateRange) -> LaborEfficiencyReport {
    #[derive(Default)]
    struct Tally {
        name: String,
        hours: f64,
        travelers: BTreeSet<u64>,
    }

    let mut per_user: BTreeMap<UserId, Tally> = BTreeMap::new();
    let mut all_travelers = BTreeSet::new();
    let mut total_hours = 0.0;

    for entry in travelers
        .iter()
        .flat_map(|t| &t.labor_entries)
        .filter(|e| e.is_completed && range.contains(e.start_time))
    {
        total_hours += entry.hours_worked;
        all_travelers.insert(entry.traveler_id);
        let tally = per_user.entry(entry.employee_id).or_default();
        if tally.name.is_empty() {
            tally.name = entry.employee_name.clone();
        }
        tally.hours += entry.hours_worked;
        tally.travelers.insert(entry.traveler_id);
    }

    let usernames: HashMap<UserId, &str> = users.iter().map(|u| (u.id, u.username.as_str())).collect();
    let average = |hours: f64, count: usize| {
        if count == 0 {
            0.0
        } else {
            round_to(hours / count as f64, 2)
        }
    };

    LaborEfficiencyReport {
        total_hours_logged: round_to(total_hours, 2),
        average_hours_per_traveler: average(total_hours, all_travelers.len()),
        efficiency_by_user: per_user
            .into_iter()
            .map(|(employee_id, tally)| UserEfficiency {
                employee_id,
                username: usernames.get(&employee_id).map(|u| u.to_string()),
                name: tally.name,
                total_hours: round_to(tally.hours, 2),
                travelers_worked: tally.travelers.len(),
                avg_hours_per_traveler: average(tally.hours, tally.travelers.len()),
            })
            .collect(),
    }
}

pub fn coating_status(travelers: &[Traveler]) -> CoatingStatusReport {
    let mut counts: BTreeMap<CoatingStatus, usize> = BTreeMap::new();
    let mut total = 0;
    for record in travelers.iter().flat_map(|t| &t.coatings) {
        *counts.entry(record.status).or_default() += 1;
        total += 1;
    }

    CoatingStatusReport {
        total_coating_jobs: total,
        status_breakdown: counts
            .into_iter()
            .map(|(status, count)| CoatingStatusCount {
                status,
                count,
                percentage: percentage(count, total),
            })
            .collect(),
    }
}
