use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::error::{Entity, NexusError, Result};
use crate::model::{FieldChange, LaborEntry, StepStatus, Traveler, User, UserId};
use crate::routing::engine::find_step_mut;

/// Per-employee async locks. Start and stop for one employee run one at a time,
/// independent of which traveler they touch.
#[derive(Debug, Default)]
pub struct EmployeeLocks {
    locks: Mutex<HashMap<UserId, Arc<AsyncMutex<()>>>>,
}

impl EmployeeLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, employee_id: UserId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self
                .locks
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            locks.entry(employee_id).or_default().clone()
        };
        lock.lock_owned().await
    }
}

/// Open a labor entry on the traveler. A pending step it names moves into work.
///
/// The single-open-entry rule spans travelers, so the caller checks it under the
/// employee lock before calling this.
pub fn open_entry(
    traveler: &mut Traveler,
    employee: &User,
    step_id: Option<Uuid>,
    description: &str,
    now: DateTime<Utc>,
) -> Result<(LaborEntry, Vec<FieldChange>)> {
    let mut changes = Vec::new();
    if let Some(step_id) = step_id {
        let step = find_step_mut(traveler, step_id)?;
        if step.status == StepStatus::Pending {
            changes.push(FieldChange::new(
                format!("{}.status", step.label()),
                Some(step.status.to_string()),
                Some(StepStatus::InProgress.to_string()),
            ));
            step.status = StepStatus::InProgress;
        }
    }

    let entry = LaborEntry::open(
        traveler.id,
        step_id,
        employee.id,
        &employee.display_name(),
        description,
        now,
    )?;
    traveler.labor_entries.push(entry.clone());
    Ok((entry, changes))
}

pub fn close_entry(traveler: &mut Traveler, entry_id: Uuid, now: DateTime<Utc>) -> Result<LaborEntry> {
    let entry = traveler
        .labor_entries
        .iter_mut()
        .find(|e| e.id == entry_id)
        .ok_or_else(|| NexusError::not_found(Entity::LaborEntry, entry_id))?;
    entry.close(now)?;
    Ok(entry.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NewTraveler, TravelerType, UserRole};
    use crate::routing::instantiate_steps;
    use chrono::Duration;
    use std::time::Duration as StdDuration;

    fn employee() -> User {
        User {
            id: 42,
            username: "dortiz".into(),
            first_name: "Dana".into(),
            last_name: "Ortiz".into(),
            email: String::new(),
            role: UserRole::Operator,
            is_approver: false,
        }
    }

    fn traveler() -> Traveler {
        let mut t = Traveler::new(
            9,
            NewTraveler {
                job_number: "8414".into(),
                traveler_type: "CABLE".into(),
                part_number: "C-1".into(),
                revision: "A".into(),
                quantity: 5,
                ..Default::default()
            },
            1,
            Utc::now(),
        )
        .unwrap();
        t.steps = instantiate_steps(TravelerType::Cable, 5);
        t
    }

    #[test]
    fn test_open_on_pending_step_starts_it() {
        let mut t = traveler();
        let step_id = t.steps[0].id;
        let (entry, changes) =
            open_entry(&mut t, &employee(), Some(step_id), "Cut wires", Utc::now()).unwrap();

        assert_eq!(entry.employee_name, "Dana Ortiz");
        assert_eq!(entry.step_id, Some(step_id));
        assert_eq!(changes.len(), 1);
        assert_eq!(t.steps[0].status, StepStatus::InProgress);
        assert_eq!(t.labor_entries.len(), 1);
    }

    #[test]
    fn test_open_on_unknown_step() {
        let mut t = traveler();
        let err = open_entry(&mut t, &employee(), Some(Uuid::new_v4()), "x", Utc::now()).unwrap_err();
        assert!(matches!(err, NexusError::NotFound { entity: Entity::Step, .. }));
        assert!(t.labor_entries.is_empty());
    }

    #[test]
    fn test_close_entry() {
        let mut t = traveler();
        let start = Utc::now();
        let (entry, _) = open_entry(&mut t, &employee(), None, "Crimp", start).unwrap();

        let closed = close_entry(&mut t, entry.id, start + Duration::minutes(45)).unwrap();
        assert_eq!(closed.hours_worked, 0.75);
        assert!(matches!(
            close_entry(&mut t, entry.id, start + Duration::minutes(50)),
            Err(NexusError::EntryAlreadyStopped { .. })
        ));
        assert!(matches!(
            close_entry(&mut t, Uuid::new_v4(), start),
            Err(NexusError::NotFound { entity: Entity::LaborEntry, .. })
        ));
    }

    #[tokio::test]
    async fn test_employee_lock_serializes_holders() {
        let locks = Arc::new(EmployeeLocks::new());
        let guard = locks.acquire(42).await;

        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire(42).await;
            })
        };
        tokio::time::sleep(StdDuration::from_millis(20)).await;
        assert!(!contender.is_finished());

        // A different employee is not blocked
        let _other = locks.acquire(7).await;

        drop(guard);
        contender.await.unwrap();
    }
}
