use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::{UserError, UserResult};
use crate::models::UserRecord;

/// Repository trait for persisted user profiles
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Get a user by ID
    async fn get_by_id(&self, id: &str) -> UserResult<Option<UserRecord>>;

    /// Register a new user; fails with `Conflict` if the id is taken
    async fn insert(&self, user: UserRecord) -> UserResult<UserRecord>;

    /// Replace the whole record, creating it when missing
    async fn upsert(&self, user: UserRecord) -> UserResult<UserRecord>;

    /// All users flagged as team leads, ordered by name
    async fn list_team_leads(&self) -> UserResult<Vec<UserRecord>>;

    /// Users whose manager link points at `manager_id`, ordered by name
    async fn list_reports(&self, manager_id: &str) -> UserResult<Vec<UserRecord>>;
}

fn by_name(a: &UserRecord, b: &UserRecord) -> std::cmp::Ordering {
    a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id))
}

/// In-memory implementation of UserRepository (for development/testing)
#[derive(Debug, Default, Clone)]
pub struct InMemoryUserRepository {
    users: Arc<RwLock<HashMap<String, UserRecord>>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self {
            users: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Seed the repository with records
    pub fn with_users(users: impl IntoIterator<Item = UserRecord>) -> Self {
        let users = users.into_iter().map(|u| (u.id.clone(), u)).collect();
        Self {
            users: Arc::new(RwLock::new(users)),
        }
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn get_by_id(&self, id: &str) -> UserResult<Option<UserRecord>> {
        let users = self.users.read().await;
        Ok(users.get(id).cloned())
    }

    async fn insert(&self, user: UserRecord) -> UserResult<UserRecord> {
        let mut users = self.users.write().await;

        if users.contains_key(&user.id) {
            return Err(UserError::Conflict(user.id));
        }

        users.insert(user.id.clone(), user.clone());

        tracing::info!(user_id = %user.id, "Registered user");
        Ok(user)
    }

    async fn upsert(&self, user: UserRecord) -> UserResult<UserRecord> {
        let mut users = self.users.write().await;
        users.insert(user.id.clone(), user.clone());

        tracing::info!(user_id = %user.id, "Saved user");
        Ok(user)
    }

    async fn list_team_leads(&self) -> UserResult<Vec<UserRecord>> {
        let users = self.users.read().await;
        let mut leads: Vec<UserRecord> = users
            .values()
            .filter(|u| u.is_team_lead)
            .cloned()
            .collect();
        leads.sort_by(by_name);
        Ok(leads)
    }

    async fn list_reports(&self, manager_id: &str) -> UserResult<Vec<UserRecord>> {
        let users = self.users.read().await;
        let mut reports: Vec<UserRecord> = users
            .values()
            .filter(|u| u.team_lead.as_deref() == Some(manager_id))
            .cloned()
            .collect();
        reports.sort_by(by_name);
        Ok(reports)
    }
}
