use std::sync::Arc;
use tracing::{info, instrument};
use validator::Validate;

use crate::cache::IdentityCache;
use crate::directory::TeamDirectory;
use crate::error::UserResult;
use crate::models::{UpdateUser, User, UserRecord};
use crate::repository::UserRepository;

/// Service layer for profile and team operations
pub struct UserService<R: UserRepository> {
    repository: Arc<R>,
    directory: TeamDirectory<R>,
    cache: Arc<IdentityCache<R>>,
}

impl<R: UserRepository> Clone for UserService<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            directory: self.directory.clone(),
            cache: Arc::clone(&self.cache),
        }
    }
}

impl<R: UserRepository> UserService<R> {
    pub fn new(repository: Arc<R>, cache: Arc<IdentityCache<R>>) -> Self {
        Self {
            directory: TeamDirectory::new(Arc::clone(&repository)),
            repository,
            cache,
        }
    }

    pub fn directory(&self) -> &TeamDirectory<R> {
        &self.directory
    }

    /// Resolve the caller behind a bearer token
    pub async fn current_user(&self, token: &str) -> UserResult<User> {
        self.cache.resolve(token).await
    }

    /// Persist the caller's own profile on first sign-in
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn create_user(&self, user: &User) -> UserResult<User> {
        let stored = self.repository.insert(user.record()).await?;
        let created = self.directory.resolve(stored).await?;
        self.cache.refresh(&created).await;

        info!("User registered");
        Ok(created)
    }

    /// Apply a partial profile update made by the owner
    #[instrument(skip(self, user, update), fields(user_id = %user.id))]
    pub async fn update_user(&self, user: &User, update: UpdateUser) -> UserResult<User> {
        let mut record = user.record();
        update.validate()?;
        update.apply_names(&mut record);

        if let Some(is_team_lead) = update.is_team_lead {
            record.is_team_lead = is_team_lead;
        }

        if record.is_team_lead {
            record.team_lead = None;
        } else if let Some(link) = update.team_lead {
            record.team_lead = match link {
                Some(candidate) => {
                    self.directory
                        .validate_manager(&record.id, candidate.trim())
                        .await?
                }
                None => None,
            };
        }

        let stored = self.repository.upsert(record).await?;
        let updated = self.directory.resolve(stored).await?;
        self.cache.refresh(&updated).await;

        info!(is_team_lead = updated.is_team_lead, "User updated");
        Ok(updated)
    }

    pub async fn team_leads(&self) -> UserResult<Vec<UserRecord>> {
        self.directory.team_leads().await
    }

    pub async fn team(&self, user: &User) -> UserResult<Vec<UserRecord>> {
        self.directory.get_team(user).await
    }
}
