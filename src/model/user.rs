use serde::{Deserialize, Serialize};
use std::fmt;

use super::{require_non_empty, RequestMeta, UserId};
use crate::error::{NexusError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Admin,
    Supervisor,
    Operator,
    Viewer,
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UserRole::Admin => "ADMIN",
            UserRole::Supervisor => "SUPERVISOR",
            UserRole::Operator => "OPERATOR",
            UserRole::Viewer => "VIEWER",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: UserRole,
    pub is_approver: bool,
}

impl User {
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }

    /// Initials used to sign off steps, falling back to the username
    pub fn initials(&self) -> String {
        let initials: String = [&self.first_name, &self.last_name]
            .iter()
            .filter_map(|n| n.trim().chars().next())
            .flat_map(char::to_uppercase)
            .collect();
        if initials.is_empty() {
            self.username.to_uppercase()
        } else {
            initials
        }
    }

    pub fn can_write(&self) -> bool {
        self.role != UserRole::Viewer
    }

    pub fn is_supervisor(&self) -> bool {
        matches!(self.role, UserRole::Admin | UserRole::Supervisor)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    pub role: UserRole,
    #[serde(default)]
    pub is_approver: bool,
}

impl NewUser {
    pub fn into_user(self, id: UserId) -> Result<User> {
        require_non_empty("username", &self.username)?;
        if self.username.trim().contains(char::is_whitespace) {
            return Err(NexusError::validation("username", "must not contain whitespace"));
        }
        Ok(User {
            id,
            username: self.username.trim().to_string(),
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            email: self.email.trim().to_string(),
            role: self.role,
            is_approver: self.is_approver,
        })
    }
}

/// The user performing a request, plus where the request came from
#[derive(Debug, Clone, PartialEq)]
pub struct Actor {
    pub user: User,
    pub meta: RequestMeta,
}

impl Actor {
    pub fn new(user: User, meta: RequestMeta) -> Self {
        Self { user, meta }
    }

    pub fn id(&self) -> UserId {
        self.user.id
    }

    pub fn ensure_can_write(&self) -> Result<()> {
        if self.user.can_write() {
            Ok(())
        } else {
            Err(NexusError::Forbidden(format!(
                "user '{}' has read-only access",
                self.user.username
            )))
        }
    }
}
