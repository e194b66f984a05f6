//! Team hierarchy: one lead, many reports, single level

use std::sync::Arc;
use tracing::{debug, instrument};

use crate::error::UserResult;
use crate::models::{User, UserRecord};
use crate::repository::UserRepository;

/// The lead whose team `user` belongs to: a lead manages itself
pub fn manager_of(user: &User) -> Option<&str> {
    if user.is_team_lead {
        Some(user.id.as_str())
    } else {
        user.team_lead_id()
    }
}

pub struct TeamDirectory<R: UserRepository> {
    repository: Arc<R>,
}

impl<R: UserRepository> Clone for TeamDirectory<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
        }
    }
}

impl<R: UserRepository> TeamDirectory<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    pub async fn get_record(&self, id: &str) -> UserResult<Option<UserRecord>> {
        self.repository.get_by_id(id).await
    }

    /// Resolve the manager link one level deep. A dangling link resolves to no manager.
    pub async fn resolve(&self, record: UserRecord) -> UserResult<User> {
        let team_lead = match (&record.team_lead, record.is_team_lead) {
            (Some(lead_id), false) => self.repository.get_by_id(lead_id).await?,
            _ => None,
        };
        Ok(User::from_parts(record, team_lead))
    }

    pub async fn get_user(&self, id: &str) -> UserResult<Option<User>> {
        match self.repository.get_by_id(id).await? {
            Some(record) => Ok(Some(self.resolve(record).await?)),
            None => Ok(None),
        }
    }

    /// The manager followed by every report; empty when `user` has no manager
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn get_team(&self, user: &User) -> UserResult<Vec<UserRecord>> {
        let manager = if user.is_team_lead {
            user.record()
        } else {
            match &user.team_lead {
                Some(lead) => lead.clone(),
                None => return Ok(Vec::new()),
            }
        };

        let reports = self.repository.list_reports(&manager.id).await?;

        let mut team = Vec::with_capacity(reports.len() + 1);
        let manager_id = manager.id.clone();
        team.push(manager);
        team.extend(reports.into_iter().filter(|r| r.id != manager_id));
        Ok(team)
    }

    /// True when `user_id` is the manager or reports directly to it
    #[instrument(skip(self))]
    pub async fn is_in_team(&self, manager_id: &str, user_id: &str) -> UserResult<bool> {
        if user_id == manager_id {
            return Ok(true);
        }
        let record = self.repository.get_by_id(user_id).await?;
        Ok(record.is_some_and(|r| r.team_lead.as_deref() == Some(manager_id)))
    }

    /// Validate a requested manager for `user_id`.
    ///
    /// Returns the id to store, or `None` when the candidate is unknown, not a
    /// lead, or the user itself.
    #[instrument(skip(self))]
    pub async fn validate_manager(
        &self,
        user_id: &str,
        candidate_id: &str,
    ) -> UserResult<Option<String>> {
        if candidate_id.is_empty() || candidate_id == user_id {
            debug!("Rejected self or empty manager link");
            return Ok(None);
        }

        match self.repository.get_by_id(candidate_id).await? {
            Some(candidate) if candidate.is_team_lead => Ok(Some(candidate.id)),
            _ => {
                debug!("Rejected manager link to non-lead or unknown user");
                Ok(None)
            }
        }
    }

    pub async fn team_leads(&self) -> UserResult<Vec<UserRecord>> {
        self.repository.list_team_leads().await
    }
}
