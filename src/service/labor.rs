use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use super::{reevaluate_status, TravelerService};
use crate::approval::audit;
use crate::error::{Entity, NexusError, Result};
use crate::labor::{self, LaborFilter, LaborSummary};
use crate::model::{Actor, AuditAction, LaborEntry, TravelerId, UserId};
use crate::observability::service_metrics;
use crate::routing::engine::ensure_open;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartLabor {
    pub traveler_id: TravelerId,
    #[serde(default)]
    pub step_id: Option<Uuid>,
    pub description: String,
}

/// An open entry with the time run so far
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveLabor {
    #[serde(flatten)]
    pub entry: LaborEntry,
    pub elapsed_hours: f64,
}

impl TravelerService {
    /// Clock an employee in. One open entry per employee across all travelers.
    pub async fn start_labor(&self, actor: &Actor, request: StartLabor) -> Result<LaborEntry> {
        actor.ensure_can_write()?;
        let employee = &actor.user;
        let _guard = self.employee_locks.acquire(employee.id).await;

        if let Some(open) = self.store.open_labor_entry(employee.id).await? {
            return Err(NexusError::TimerAlreadyActive {
                employee_id: employee.id,
                entry_id: open.id,
            });
        }

        let mut attempt = 0;
        let entry = loop {
            attempt += 1;
            let mut traveler = self.load(request.traveler_id).await?;
            ensure_open(&traveler)?;
            let read_version = traveler.version;
            let now = Utc::now();

            let (entry, changes) =
                labor::open_entry(&mut traveler, employee, request.step_id, &request.description, now)?;
            audit::record_changes(&mut traveler, actor, AuditAction::Updated, changes, now);
            reevaluate_status(&mut traveler, actor, now)?;
            traveler.touch(now);

            match self.commit(traveler, read_version).await {
                Ok(_) => break entry,
                Err(NexusError::ConcurrentModification { .. })
                    if attempt <= self.settings.labor_write_retries =>
                {
                    warn!(traveler.id = request.traveler_id, attempt, "Retrying labor start after version conflict");
                }
                Err(e) => return Err(e),
            }
        };

        service_metrics().record_timer_started();
        info!(
            traveler.id = entry.traveler_id,
            employee.id = employee.id,
            entry.id = %entry.id,
            "Labor timer started"
        );
        Ok(entry)
    }

    /// Clock out. Only the employee who owns the entry or a supervisor may stop it.
    pub async fn stop_labor(&self, actor: &Actor, entry_id: Uuid) -> Result<LaborEntry> {
        actor.ensure_can_write()?;
        let found = self
            .store
            .find_labor_entry(entry_id)
            .await?
            .ok_or_else(|| NexusError::not_found(Entity::LaborEntry, entry_id))?;
        if found.employee_id != actor.id() && !actor.user.is_supervisor() {
            return Err(NexusError::Forbidden(
                "only the employee or a supervisor can stop this timer".to_string(),
            ));
        }

        let _guard = self.employee_locks.acquire(found.employee_id).await;

        let mut attempt = 0;
        let entry = loop {
            attempt += 1;
            let mut traveler = self.load(found.traveler_id).await?;
            let read_version = traveler.version;
            let now = Utc::now();

            let entry = labor::close_entry(&mut traveler, entry_id, now)?;
            traveler.touch(now);

            match self.commit(traveler, read_version).await {
                Ok(_) => break entry,
                Err(NexusError::ConcurrentModification { .. })
                    if attempt <= self.settings.labor_write_retries =>
                {
                    warn!(traveler.id = found.traveler_id, attempt, "Retrying labor stop after version conflict");
                }
                Err(e) => return Err(e),
            }
        };

        service_metrics().record_timer_stopped();
        info!(
            traveler.id = entry.traveler_id,
            employee.id = entry.employee_id,
            entry.id = %entry.id,
            hours = entry.hours_worked,
            "Labor timer stopped"
        );
        Ok(entry)
    }

    pub async fn active_labor(&self, employee_id: UserId) -> Result<Option<ActiveLabor>> {
        let now = Utc::now();
        Ok(self
            .store
            .open_labor_entry(employee_id)
            .await?
            .map(|entry| ActiveLabor {
                elapsed_hours: entry.elapsed_hours(now),
                entry,
            }))
    }

    pub async fn labor_for_traveler(&self, id: TravelerId) -> Result<Vec<LaborEntry>> {
        let mut entries = self.load(id).await?.labor_entries;
        entries.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        Ok(entries)
    }

    /// Entries the employee started in the last `days` days, newest first
    pub async fn my_entries(&self, employee_id: UserId, days: Option<i64>) -> Result<Vec<LaborEntry>> {
        let days = days.unwrap_or(self.settings.my_entries_days);
        if days < 0 {
            return Err(NexusError::validation("days", "must not be negative"));
        }
        let travelers = self.store.list().await?;
        labor::recent_entries(
            travelers.iter().flat_map(|t| &t.labor_entries),
            employee_id,
            days,
            Utc::now(),
        )
    }

    pub async fn labor_summary(&self, filter: LaborFilter) -> Result<LaborSummary> {
        let travelers = self.store.list().await?;
        Ok(labor::summarize(
            travelers.iter().flat_map(|t| &t.labor_entries),
            &filter,
        ))
    }
}
