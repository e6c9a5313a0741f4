//! Registered users

use crate::errors::{AppError, Result};
use crate::records::{parse_choice, InvalidChoice, Owner};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Faculty,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Faculty => "faculty",
            Role::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = InvalidChoice;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        parse_choice(
            s,
            &[("faculty", Role::Faculty), ("admin", Role::Admin)],
            &["faculty", "admin"],
        )
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: u64,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub employee_id: String,
    pub department: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Owner metadata stamped onto records this user submits
    pub fn owner(&self) -> Owner {
        Owner {
            user_id: self.id,
            employee_id: self.employee_id.clone(),
            user_name: self.name.clone(),
            department: self.department.clone(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// A user about to be registered; the password is already hashed
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub employee_id: String,
    pub department: String,
    pub role: Role,
}

struct UserState {
    next_id: u64,
    users: Vec<User>,
}

pub struct UserStore {
    state: RwLock<UserState>,
}

impl Default for UserStore {
    fn default() -> Self {
        Self::new()
    }
}

impl UserStore {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(UserState {
                next_id: 1,
                users: Vec::new(),
            }),
        }
    }

    /// Register a user. Emails are unique, compared case-insensitively.
    pub async fn create(&self, new_user: NewUser) -> Result<User> {
        let mut state = self.state.write().await;
        let email = new_user.email.trim().to_lowercase();

        if state.users.iter().any(|u| u.email == email) {
            return Err(AppError::Duplicate {
                message: format!("A user with email {email} already exists"),
            });
        }

        let user = User {
            id: state.next_id,
            name: new_user.name,
            email,
            password_hash: new_user.password_hash,
            employee_id: new_user.employee_id,
            department: new_user.department,
            role: new_user.role,
            created_at: Utc::now(),
        };
        state.next_id += 1;
        state.users.push(user.clone());

        tracing::info!(user_id = user.id, role = user.role.as_str(), "User registered");
        Ok(user)
    }

    pub async fn find_by_id(&self, id: u64) -> Option<User> {
        let state = self.state.read().await;
        state.users.iter().find(|u| u.id == id).cloned()
    }

    pub async fn find_by_email(&self, email: &str) -> Option<User> {
        let email = email.trim().to_lowercase();
        let state = self.state.read().await;
        state.users.iter().find(|u| u.email == email).cloned()
    }
}
