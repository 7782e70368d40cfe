// Persistence seam. The service only ever talks to these traits.

pub mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::model::{LaborEntry, NewUser, Traveler, TravelerId, User, UserId};

/// Traveler aggregates with optimistic concurrency.
///
/// `commit` succeeds only when the stored version still equals `expected_version`,
/// and returns the traveler with its version incremented.
#[async_trait]
pub trait TravelerStore: Send + Sync {
    /// Next id from a monotonic sequence. Ids are never reused.
    async fn next_traveler_id(&self) -> Result<TravelerId>;

    /// Store a new aggregate at version 1.
    async fn insert(&self, traveler: Traveler) -> Result<Traveler>;

    async fn get(&self, id: TravelerId) -> Result<Traveler>;

    async fn list(&self) -> Result<Vec<Traveler>>;

    async fn commit(&self, traveler: Traveler, expected_version: u64) -> Result<Traveler>;

    /// Remove the aggregate and everything it owns, only if it is still at `expected_version`.
    async fn delete(&self, id: TravelerId, expected_version: u64) -> Result<()>;

    /// Release connections. Called once at shutdown.
    async fn close(&self) {}

    async fn find_labor_entry(&self, entry_id: Uuid) -> Result<Option<LaborEntry>> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .flat_map(|t| t.labor_entries)
            .find(|e| e.id == entry_id))
    }

    async fn open_labor_entry(&self, employee_id: UserId) -> Result<Option<LaborEntry>> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .flat_map(|t| t.labor_entries)
            .find(|e| e.employee_id == employee_id && e.is_open()))
    }

    async fn find_approval_owner(&self, approval_id: Uuid) -> Result<Option<TravelerId>> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .find(|t| t.approvals.iter().any(|a| a.id == approval_id))
            .map(|t| t.id))
    }
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Usernames are unique; a duplicate fails validation.
    async fn create_user(&self, user: NewUser) -> Result<User>;

    async fn user(&self, id: UserId) -> Result<User>;

    async fn user_by_username(&self, username: &str) -> Result<Option<User>>;

    async fn users(&self) -> Result<Vec<User>>;

    async fn approvers(&self) -> Result<Vec<User>> {
        Ok(self
            .users()
            .await?
            .into_iter()
            .filter(|u| u.is_approver)
            .collect())
    }
}

/// Everything the service needs from persistence
pub trait Store: TravelerStore + UserDirectory {}

impl<T: TravelerStore + UserDirectory> Store for T {}
