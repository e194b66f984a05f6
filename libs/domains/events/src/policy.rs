//! Who may act on whose events

use domain_users::{TeamDirectory, User, UserRepository, manager_of};
use tracing::debug;

use crate::error::{EventError, Result};

/// How a permitted create should be recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateMode {
    AutoApproved,
    Pending,
}

pub struct AuthorizationPolicy<U: UserRepository> {
    directory: TeamDirectory<U>,
}

impl<U: UserRepository> Clone for AuthorizationPolicy<U> {
    fn clone(&self) -> Self {
        Self {
            directory: self.directory.clone(),
        }
    }
}

impl<U: UserRepository> AuthorizationPolicy<U> {
    pub fn new(directory: TeamDirectory<U>) -> Self {
        Self { directory }
    }

    /// Owner, or a member of the same team (the lead included)
    pub async fn can_view(&self, caller: &User, owner_id: &str) -> Result<bool> {
        if caller.id == owner_id {
            return Ok(true);
        }
        match manager_of(caller) {
            Some(manager_id) => Ok(self.directory.is_in_team(manager_id, owner_id).await?),
            None => Ok(false),
        }
    }

    /// A lead acting on itself or a direct report
    pub async fn can_manage(&self, caller: &User, owner_id: &str) -> Result<bool> {
        if !caller.is_team_lead {
            return Ok(false);
        }
        Ok(self.directory.is_in_team(&caller.id, owner_id).await?)
    }

    /// Gate for reading, commenting and liking; failures read as not found
    pub async fn ensure_view(&self, caller: &User, owner_id: &str) -> Result<()> {
        if self.can_view(caller, owner_id).await? {
            Ok(())
        } else {
            debug!(caller = %caller.id, owner = %owner_id, "View denied");
            Err(EventError::event_not_found())
        }
    }

    pub async fn ensure_view_user(&self, caller: &User, user_id: &str) -> Result<()> {
        if self.can_view(caller, user_id).await? {
            Ok(())
        } else {
            Err(EventError::user_not_found())
        }
    }

    /// Decide whether `caller` may log an event for `owner_id`
    pub async fn authorize_create(&self, caller: &User, owner_id: &str) -> Result<CreateMode> {
        if caller.is_team_lead {
            if self.can_manage(caller, owner_id).await? {
                return Ok(CreateMode::AutoApproved);
            }
            return Err(EventError::user_not_found());
        }

        if caller.id != owner_id {
            return Err(EventError::Forbidden(
                "You do not have permission to publish events for other users".to_string(),
            ));
        }
        Ok(CreateMode::Pending)
    }

    /// Approval requires lead status first, then team membership
    pub async fn authorize_approve(&self, caller: &User, owner_id: &str) -> Result<()> {
        if !caller.is_team_lead {
            return Err(forbidden_approve());
        }
        if self.can_manage(caller, owner_id).await? {
            Ok(())
        } else {
            Err(EventError::event_not_found())
        }
    }
}

pub(crate) fn forbidden_approve() -> EventError {
    EventError::Forbidden("You do not have permission to approve events".to_string())
}
