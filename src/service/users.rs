use tracing::info;

use super::TravelerService;
use crate::error::{NexusError, Result};
use crate::model::{Actor, NewUser, User, UserRole};

impl TravelerService {
    /// Add a user to the directory.
    ///
    /// The first user may be created without an actor so a fresh install can be
    /// bootstrapped. After that only administrators add users.
    pub async fn create_user(&self, actor: Option<&Actor>, input: NewUser) -> Result<User> {
        let bootstrap = self.store.users().await?.is_empty();
        if !bootstrap {
            match actor {
                Some(actor) if actor.user.role == UserRole::Admin => {}
                Some(actor) => {
                    return Err(NexusError::Forbidden(format!(
                        "user '{}' may not manage users",
                        actor.user.username
                    )))
                }
                None => {
                    return Err(NexusError::Unauthenticated(
                        "no acting user supplied".to_string(),
                    ))
                }
            }
        }

        let user = self.store.create_user(input).await?;
        info!(
            user.id = user.id,
            username = %user.username,
            role = %user.role,
            bootstrap,
            "User created"
        );
        Ok(user)
    }

    pub async fn list_users(&self) -> Result<Vec<User>> {
        self.store.users().await
    }
}
