//! Event repository trait and in-memory implementation

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    ApprovalState, DailyTypeCount, Event, EventComment, EventView, TimeRange, day_bucket,
};

/// Repository trait for events and their comments
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventRepository: Send + Sync {
    async fn insert(&self, event: Event) -> Result<Event>;

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Event>>;

    /// Set the approval only if none is recorded yet. `None` when the event is missing.
    async fn approve(
        &self,
        id: Uuid,
        approved_at: i64,
        approved_by: &str,
    ) -> Result<Option<ApprovalState>>;

    /// Add or remove `user_id` from the likes; returns the updated event
    async fn set_like(&self, id: Uuid, user_id: &str, like: bool) -> Result<Option<Event>>;

    async fn insert_comment(&self, comment: EventComment) -> Result<EventComment>;

    /// Comments on an event, oldest first
    async fn list_comments(&self, event_id: Uuid) -> Result<Vec<EventComment>>;

    /// Events owned by any of `user_ids`, newest first, annotated for `caller_id`
    async fn list_views(&self, user_ids: Vec<String>, caller_id: &str) -> Result<Vec<EventView>>;

    /// Per (day, type) counts of one user's events within `range`
    async fn daily_counts(&self, user_id: &str, range: TimeRange) -> Result<Vec<DailyTypeCount>>;
}

#[derive(Debug, Default)]
struct Store {
    events: HashMap<Uuid, Event>,
    comments: Vec<EventComment>,
}

/// In-memory implementation of EventRepository (for development/testing)
#[derive(Debug, Default, Clone)]
pub struct InMemoryEventRepository {
    store: Arc<RwLock<Store>>,
}

impl InMemoryEventRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventRepository for InMemoryEventRepository {
    async fn insert(&self, event: Event) -> Result<Event> {
        let mut store = self.store.write().await;
        store.events.insert(event.id, event.clone());
        Ok(event)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Event>> {
        let store = self.store.read().await;
        Ok(store.events.get(&id).cloned())
    }

    async fn approve(
        &self,
        id: Uuid,
        approved_at: i64,
        approved_by: &str,
    ) -> Result<Option<ApprovalState>> {
        let mut store = self.store.write().await;
        let Some(event) = store.events.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(existing) = event.approved {
            return Ok(Some(ApprovalState::AlreadyApproved(existing)));
        }

        event.approved = Some(approved_at);
        event.approved_by = Some(approved_by.to_string());
        Ok(Some(ApprovalState::Approved(approved_at)))
    }

    async fn set_like(&self, id: Uuid, user_id: &str, like: bool) -> Result<Option<Event>> {
        let mut store = self.store.write().await;
        let Some(event) = store.events.get_mut(&id) else {
            return Ok(None);
        };

        if like {
            event.likes.insert(user_id.to_string());
        } else {
            event.likes.remove(user_id);
        }
        Ok(Some(event.clone()))
    }

    async fn insert_comment(&self, comment: EventComment) -> Result<EventComment> {
        let mut store = self.store.write().await;
        store.comments.push(comment.clone());
        Ok(comment)
    }

    async fn list_comments(&self, event_id: Uuid) -> Result<Vec<EventComment>> {
        let store = self.store.read().await;
        let mut comments: Vec<EventComment> = store
            .comments
            .iter()
            .filter(|c| c.event_id == event_id)
            .cloned()
            .collect();
        comments.sort_by_key(|c| (c.time, c.id));
        Ok(comments)
    }

    async fn list_views(&self, user_ids: Vec<String>, caller_id: &str) -> Result<Vec<EventView>> {
        let store = self.store.read().await;

        let mut views: Vec<EventView> = store
            .events
            .values()
            .filter(|e| user_ids.contains(&e.user))
            .map(|event| {
                let comments = store.comments.iter().filter(|c| c.event_id == event.id);
                let (count, mine) = comments.fold((0u64, false), |(count, mine), c| {
                    (count + 1, mine || c.user == caller_id)
                });
                EventView::new(event.clone(), caller_id, count, mine)
            })
            .collect();

        views.sort_by(|a, b| b.time.cmp(&a.time).then_with(|| b.id.cmp(&a.id)));
        Ok(views)
    }

    async fn daily_counts(&self, user_id: &str, range: TimeRange) -> Result<Vec<DailyTypeCount>> {
        let store = self.store.read().await;

        let mut buckets: BTreeMap<(i64, String), (u64, u64)> = BTreeMap::new();
        for event in store
            .events
            .values()
            .filter(|e| e.user == user_id && range.contains(e.time))
        {
            let bucket = buckets
                .entry((day_bucket(event.time), event.event_type.clone()))
                .or_default();
            bucket.0 += 1;
            if event.is_approved() {
                bucket.1 += 1;
            }
        }

        Ok(buckets
            .into_iter()
            .map(|((day, event_type), (count, approved_count))| DailyTypeCount {
                event_type,
                day,
                count,
                approved_count,
            })
            .collect())
    }
}
