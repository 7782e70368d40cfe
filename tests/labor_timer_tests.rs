//! Labor timer tests
//!
//! Concurrent clock-in/clock-out against shared travelers. The single-open-entry
//! rule must hold for every employee no matter how start and stop interleave.

use std::collections::HashMap;
use std::sync::Arc;

use nexus::model::{Actor, NewTraveler, NewUser, RequestMeta, UserRole};
use nexus::service::StartLabor;
use nexus::{MemoryStore, NexusError, ServiceSettings, Store, TravelerService};

async fn operator(store: &Arc<dyn Store>, username: &str) -> Actor {
    let user = store
        .create_user(NewUser {
            username: username.into(),
            first_name: username.into(),
            last_name: "Tech".into(),
            email: String::new(),
            role: UserRole::Operator,
            is_approver: false,
        })
        .await
        .expect("create user");
    Actor::new(user, RequestMeta::default())
}

fn traveler(job: &str) -> NewTraveler {
    NewTraveler {
        job_number: job.into(),
        traveler_type: "PCB_ASSEMBLY".into(),
        part_number: "PCB-7".into(),
        revision: "A".into(),
        quantity: 100,
        ..Default::default()
    }
}

fn start(traveler_id: u64, description: &str) -> StartLabor {
    StartLabor {
        traveler_id,
        step_id: None,
        description: description.into(),
    }
}

#[tokio::test]
async fn concurrent_starts_leave_one_open_entry() {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let actor = operator(&store, "tech42").await;
    let service = Arc::new(TravelerService::new(store, ServiceSettings::default()));

    let mut travelers = Vec::new();
    for job in ["8414", "8415", "8416", "8417"] {
        travelers.push(service.create_traveler(&actor, traveler(job)).await.unwrap());
    }

    let mut handles = Vec::new();
    for traveler in &travelers {
        let service = service.clone();
        let actor = actor.clone();
        let id = traveler.id;
        handles.push(tokio::spawn(async move {
            service.start_labor(&actor, start(id, "Hand solder")).await
        }));
    }

    let mut started = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => started += 1,
            Err(NexusError::TimerAlreadyActive { employee_id, .. }) => {
                assert_eq!(employee_id, actor.id())
            }
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }
    assert_eq!(started, 1);

    let open: usize = service
        .store()
        .list()
        .await
        .unwrap()
        .iter()
        .flat_map(|t| &t.labor_entries)
        .filter(|e| e.is_open())
        .count();
    assert_eq!(open, 1);
}

#[tokio::test]
async fn interleaved_start_stop_keeps_invariant() {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let mut actors = Vec::new();
    for name in ["ana", "ben", "cam"] {
        actors.push(operator(&store, name).await);
    }
    let service = Arc::new(TravelerService::new(store, ServiceSettings::default()));
    let shared = service.create_traveler(&actors[0], traveler("9001")).await.unwrap();

    let mut handles = Vec::new();
    for actor in actors.clone() {
        let service = service.clone();
        let traveler_id = shared.id;
        handles.push(tokio::spawn(async move {
            let mut completed = 0;
            for round in 0..5 {
                let entry = service
                    .start_labor(&actor, start(traveler_id, &format!("round {round}")))
                    .await?;
                tokio::task::yield_now().await;
                service.stop_labor(&actor, entry.id).await?;
                completed += 1;
            }
            Ok::<_, NexusError>(completed)
        }));
    }

    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), 5);
    }

    let stored = service.get_traveler(shared.id).await.unwrap();
    assert_eq!(stored.labor_entries.len(), 15);
    assert!(stored.labor_entries.iter().all(|e| e.is_completed));

    let mut per_employee: HashMap<u64, usize> = HashMap::new();
    for entry in &stored.labor_entries {
        *per_employee.entry(entry.employee_id).or_default() += 1;
    }
    assert!(per_employee.values().all(|&count| count == 5));
}

#[tokio::test]
async fn timer_on_unknown_traveler_is_not_found() {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let actor = operator(&store, "tech7").await;
    let service = TravelerService::new(store, ServiceSettings::default());

    let err = service.start_labor(&actor, start(404, "Prep")).await.unwrap_err();
    assert!(matches!(err, NexusError::NotFound { .. }));
    assert!(service.active_labor(actor.id()).await.unwrap().is_none());
}
