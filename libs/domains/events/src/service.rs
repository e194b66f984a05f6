//! Event service layer

use crate::error::{EventError, Result};
use crate::models::{
    ApprovalState, ApproveResponse, Event, EventComment, EventDraft, EventView, NewComment,
    now_millis,
};
use crate::policy::{AuthorizationPolicy, CreateMode, forbidden_approve};
use crate::repository::EventRepository;
use domain_users::{TeamDirectory, User, UserRepository};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

/// Parse a caller-supplied event id
pub fn parse_event_id(raw: &str) -> Result<Uuid> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(EventError::BadRequest("'eventId' is required".to_string()));
    }
    Uuid::parse_str(raw).map_err(|_| EventError::BadRequest(format!("Invalid event id '{raw}'")))
}

/// Event lifecycle: create, approve, comment, like and list
pub struct EventService<E: EventRepository, U: UserRepository> {
    repository: Arc<E>,
    directory: TeamDirectory<U>,
    policy: AuthorizationPolicy<U>,
}

impl<E: EventRepository, U: UserRepository> Clone for EventService<E, U> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            directory: self.directory.clone(),
            policy: self.policy.clone(),
        }
    }
}

impl<E: EventRepository, U: UserRepository> EventService<E, U> {
    pub fn new(repository: Arc<E>, directory: TeamDirectory<U>) -> Self {
        Self {
            repository,
            policy: AuthorizationPolicy::new(directory.clone()),
            directory,
        }
    }

    pub async fn add_event(&self, caller: &User, draft: EventDraft) -> Result<Event> {
        self.add_event_at(caller, draft, now_millis()).await
    }

    /// Create an event as of `now` (epoch ms)
    #[instrument(skip(self, caller, draft), fields(caller = %caller.id))]
    pub async fn add_event_at(&self, caller: &User, draft: EventDraft, now: i64) -> Result<Event> {
        draft.validate()?;
        let event_type = draft.event_type.trim();

        let owner = draft.owner(&caller.id);
        let mode = self.policy.authorize_create(caller, owner).await?;
        let (approved, approved_by) = match mode {
            CreateMode::AutoApproved => (Some(now), Some(caller.id.clone())),
            CreateMode::Pending => (None, None),
        };

        let event = Event {
            id: Uuid::now_v7(),
            event_type: event_type.to_string(),
            time: draft.resolved_time(now),
            summary: draft.summary.trim().to_string(),
            user: owner.to_string(),
            author: caller.id.clone(),
            approved,
            approved_by,
            likes: Default::default(),
        };

        let event = self.repository.insert(event).await?;
        info!(
            event_id = %event.id,
            owner = %event.user,
            approved = event.is_approved(),
            "Event created"
        );
        Ok(event)
    }

    pub async fn approve_event(&self, caller: &User, event_id: &str) -> Result<ApproveResponse> {
        self.approve_event_at(caller, event_id, now_millis()).await
    }

    #[instrument(skip(self, caller), fields(caller = %caller.id))]
    pub async fn approve_event_at(
        &self,
        caller: &User,
        event_id: &str,
        now: i64,
    ) -> Result<ApproveResponse> {
        if !caller.is_team_lead {
            return Err(forbidden_approve());
        }
        let id = parse_event_id(event_id)?;

        let event = self
            .repository
            .get_by_id(id)
            .await?
            .ok_or_else(EventError::event_not_found)?;
        self.policy.authorize_approve(caller, &event.user).await?;

        if let Some(approved) = event.approved {
            return Ok(ApprovalState::AlreadyApproved(approved).into());
        }

        let state = self
            .repository
            .approve(id, now, &caller.id)
            .await?
            .ok_or_else(EventError::event_not_found)?;

        info!(event_id = %id, ?state, "Event approval processed");
        Ok(state.into())
    }

    /// Load an event the caller is allowed to see
    async fn visible_event(&self, caller: &User, id: Uuid) -> Result<Event> {
        let event = self
            .repository
            .get_by_id(id)
            .await?
            .ok_or_else(EventError::event_not_found)?;
        self.policy.ensure_view(caller, &event.user).await?;
        Ok(event)
    }

    #[instrument(skip(self, caller, text), fields(caller = %caller.id))]
    pub async fn add_event_comment(
        &self,
        caller: &User,
        event_id: &str,
        text: &str,
    ) -> Result<EventComment> {
        let id = parse_event_id(event_id)?;
        let input = NewComment {
            text: text.trim().to_string(),
        };
        input.validate()?;

        self.visible_event(caller, id).await?;

        let comment = EventComment {
            id: Uuid::now_v7(),
            event_id: id,
            time: now_millis(),
            text: input.text,
            user: caller.id.clone(),
        };
        let comment = self.repository.insert_comment(comment).await?;
        info!(event_id = %id, comment_id = %comment.id, "Comment added");
        Ok(comment)
    }

    #[instrument(skip(self, caller), fields(caller = %caller.id))]
    pub async fn get_event_comments(
        &self,
        caller: &User,
        event_id: &str,
    ) -> Result<Vec<EventComment>> {
        let id = parse_event_id(event_id)?;
        self.visible_event(caller, id).await?;
        self.repository.list_comments(id).await
    }

    /// Like or unlike; repeating either is a no-op
    #[instrument(skip(self, caller), fields(caller = %caller.id))]
    pub async fn set_like_event(&self, caller: &User, event_id: &str, like: bool) -> Result<Event> {
        let id = parse_event_id(event_id)?;
        self.visible_event(caller, id).await?;

        self.repository
            .set_like(id, &caller.id, like)
            .await?
            .ok_or_else(EventError::event_not_found)
    }

    /// Events of the caller's whole team, newest first
    #[instrument(skip(self, caller), fields(caller = %caller.id))]
    pub async fn get_events_for_team(&self, caller: &User) -> Result<Vec<EventView>> {
        let mut user_ids: Vec<String> = self
            .directory
            .get_team(caller)
            .await?
            .into_iter()
            .map(|u| u.id)
            .collect();
        if !user_ids.contains(&caller.id) {
            user_ids.push(caller.id.clone());
        }

        self.repository.list_views(user_ids, &caller.id).await
    }

    #[instrument(skip(self, caller), fields(caller = %caller.id))]
    pub async fn get_events_for_user(
        &self,
        caller: &User,
        user_id: &str,
    ) -> Result<Vec<EventView>> {
        let user_id = user_id.trim();
        if user_id.is_empty() {
            return Err(EventError::BadRequest("'userId' is required".to_string()));
        }
        self.policy.ensure_view_user(caller, user_id).await?;
        self.repository
            .list_views(vec![user_id.to_string()], &caller.id)
            .await
    }
}
