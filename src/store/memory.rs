use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

use super::{TravelerStore, UserDirectory};
use crate::error::{Entity, NexusError, Result};
use crate::model::{NewUser, Traveler, TravelerId, User, UserId};

/// Process-local store used for development and tests
#[derive(Debug, Default)]
pub struct MemoryStore {
    travelers: RwLock<BTreeMap<TravelerId, Traveler>>,
    users: RwLock<BTreeMap<UserId, User>>,
    traveler_seq: AtomicU64,
    user_seq: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TravelerStore for MemoryStore {
    async fn next_traveler_id(&self) -> Result<TravelerId> {
        Ok(self.traveler_seq.fetch_add(1, Ordering::SeqCst) + 1)
    }

    async fn insert(&self, mut traveler: Traveler) -> Result<Traveler> {
        let mut travelers = self.travelers.write().await;
        if travelers.contains_key(&traveler.id) {
            return Err(NexusError::Storage(format!(
                "traveler {} already exists",
                traveler.id
            )));
        }
        traveler.version = 1;
        travelers.insert(traveler.id, traveler.clone());
        Ok(traveler)
    }

    async fn get(&self, id: TravelerId) -> Result<Traveler> {
        self.travelers
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| NexusError::not_found(Entity::Traveler, id))
    }

    async fn list(&self) -> Result<Vec<Traveler>> {
        Ok(self.travelers.read().await.values().cloned().collect())
    }

    async fn commit(&self, mut traveler: Traveler, expected_version: u64) -> Result<Traveler> {
        let mut travelers = self.travelers.write().await;
        let current = travelers
            .get(&traveler.id)
            .ok_or_else(|| NexusError::not_found(Entity::Traveler, traveler.id))?;

        if current.version != expected_version {
            debug!(
                traveler.id = traveler.id,
                expected = expected_version,
                actual = current.version,
                "Rejecting stale commit"
            );
            return Err(NexusError::ConcurrentModification {
                traveler_id: traveler.id,
                expected: expected_version,
                actual: current.version,
            });
        }

        traveler.version = expected_version + 1;
        travelers.insert(traveler.id, traveler.clone());
        Ok(traveler)
    }

    async fn delete(&self, id: TravelerId, expected_version: u64) -> Result<()> {
        let mut travelers = self.travelers.write().await;
        let current = travelers
            .get(&id)
            .ok_or_else(|| NexusError::not_found(Entity::Traveler, id))?;
        if current.version != expected_version {
            return Err(NexusError::ConcurrentModification {
                traveler_id: id,
                expected: expected_version,
                actual: current.version,
            });
        }
        travelers.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for MemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<User> {
        let mut users = self.users.write().await;
        let username = user.username.trim().to_string();
        if users.values().any(|u| u.username.eq_ignore_ascii_case(&username)) {
            return Err(NexusError::validation(
                "username",
                format!("'{username}' is already taken"),
            ));
        }

        let mut user = user.into_user(0)?;
        user.id = self.user_seq.fetch_add(1, Ordering::SeqCst) + 1;
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn user(&self, id: UserId) -> Result<User> {
        self.users
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| NexusError::not_found(Entity::User, id))
    }

    async fn user_by_username(&self, username: &str) -> Result<Option<User>> {
        let wanted = username.trim();
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.username.eq_ignore_ascii_case(wanted))
            .cloned())
    }

    async fn users(&self) -> Result<Vec<User>> {
        Ok(self.users.read().await.values().cloned().collect())
    }
}
