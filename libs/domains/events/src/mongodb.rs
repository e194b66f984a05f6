//! MongoDB implementation of EventRepository

use crate::error::Result;
use crate::models::{
    ApprovalState, DailyTypeCount, Event, EventComment, EventView, MILLIS_PER_DAY, TimeRange,
};
use crate::repository::EventRepository;
use async_trait::async_trait;
use futures_util::TryStreamExt;
use mongodb::bson::{Document, doc, from_document};
use mongodb::options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument};
use mongodb::{Collection, Database, IndexModel};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::instrument;
use uuid::Uuid;

const EVENTS: &str = "events";
const COMMENTS: &str = "eventComments";

/// Ids are stored as canonical strings so filters and `$lookup` joins match
mod uuid_string {
    use serde::{Deserialize, Deserializer, Serializer};
    use uuid::Uuid;

    pub fn serialize<S: Serializer>(id: &Uuid, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(id)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Uuid, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Uuid::parse_str(&raw).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventDocument {
    #[serde(rename = "_id", with = "uuid_string")]
    id: Uuid,
    event_type: String,
    time: i64,
    #[serde(default)]
    summary: String,
    user: String,
    author: String,
    #[serde(default)]
    approved: Option<i64>,
    #[serde(default)]
    approved_by: Option<String>,
    #[serde(default)]
    likes: BTreeSet<String>,
}

impl From<Event> for EventDocument {
    fn from(e: Event) -> Self {
        Self {
            id: e.id,
            event_type: e.event_type,
            time: e.time,
            summary: e.summary,
            user: e.user,
            author: e.author,
            approved: e.approved,
            approved_by: e.approved_by,
            likes: e.likes,
        }
    }
}

impl From<EventDocument> for Event {
    fn from(d: EventDocument) -> Self {
        Self {
            id: d.id,
            event_type: d.event_type,
            time: d.time,
            summary: d.summary,
            user: d.user,
            author: d.author,
            approved: d.approved,
            approved_by: d.approved_by,
            likes: d.likes,
        }
    }
}

/// Event joined with its comment aggregates
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ViewDocument {
    #[serde(rename = "_id", with = "uuid_string")]
    id: Uuid,
    event_type: String,
    time: i64,
    #[serde(default)]
    summary: String,
    user: String,
    author: String,
    #[serde(default)]
    approved: Option<i64>,
    #[serde(default)]
    approved_by: Option<String>,
    #[serde(default)]
    likes: BTreeSet<String>,
    comment_count: i64,
    commented_by_caller: bool,
}

impl ViewDocument {
    fn into_view(self, caller_id: &str) -> EventView {
        let event = Event {
            id: self.id,
            event_type: self.event_type,
            time: self.time,
            summary: self.summary,
            user: self.user,
            author: self.author,
            approved: self.approved,
            approved_by: self.approved_by,
            likes: self.likes,
        };
        EventView::new(
            event,
            caller_id,
            self.comment_count.max(0) as u64,
            self.commented_by_caller,
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentDocument {
    #[serde(rename = "_id", with = "uuid_string")]
    id: Uuid,
    #[serde(with = "uuid_string")]
    event_id: Uuid,
    time: i64,
    text: String,
    user: String,
}

impl From<EventComment> for CommentDocument {
    fn from(c: EventComment) -> Self {
        Self {
            id: c.id,
            event_id: c.event_id,
            time: c.time,
            text: c.text,
            user: c.user,
        }
    }
}

impl From<CommentDocument> for EventComment {
    fn from(d: CommentDocument) -> Self {
        Self {
            id: d.id,
            event_id: d.event_id,
            time: d.time,
            text: d.text,
            user: d.user,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GroupKey {
    day: i64,
    #[serde(rename = "eventType")]
    event_type: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroupDocument {
    #[serde(rename = "_id")]
    key: GroupKey,
    count: i64,
    approved_count: i64,
}

/// MongoDB-based event repository
#[derive(Clone)]
pub struct MongoEventRepository {
    events: Collection<EventDocument>,
    comments: Collection<CommentDocument>,
}

impl MongoEventRepository {
    pub fn new(database: &Database) -> Self {
        Self {
            events: database.collection(EVENTS),
            comments: database.collection(COMMENTS),
        }
    }

    /// Create indexes for the listing, comment and analytics queries
    pub async fn create_indexes(&self) -> Result<()> {
        self.events
            .create_indexes(vec![
                IndexModel::builder()
                    .keys(doc! { "user": 1, "time": -1 })
                    .build(),
            ])
            .await?;
        self.comments
            .create_indexes(vec![
                IndexModel::builder()
                    .keys(doc! { "eventId": 1, "time": 1 })
                    .build(),
            ])
            .await?;
        Ok(())
    }

    fn id_filter(id: Uuid) -> Document {
        doc! { "_id": id.to_string() }
    }

    fn after_update() -> FindOneAndUpdateOptions {
        FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build()
    }

    fn views_pipeline(user_ids: Vec<String>, caller_id: &str) -> Vec<Document> {
        vec![
            doc! { "$match": { "user": { "$in": user_ids } } },
            doc! {
                "$lookup": {
                    "from": COMMENTS,
                    "localField": "_id",
                    "foreignField": "eventId",
                    "as": "comments",
                }
            },
            doc! {
                "$addFields": {
                    "commentCount": { "$size": "$comments" },
                    "commentedByCaller": { "$in": [caller_id, "$comments.user"] },
                }
            },
            doc! { "$project": { "comments": 0 } },
            doc! { "$sort": { "time": -1, "_id": -1 } },
        ]
    }

    fn daily_counts_pipeline(user_id: &str, range: TimeRange) -> Vec<Document> {
        let mut matcher = doc! { "user": user_id };
        let mut time = Document::new();
        if let Some(from) = range.from {
            time.insert("$gte", from);
        }
        if let Some(to) = range.to {
            time.insert("$lt", to);
        }
        if !time.is_empty() {
            matcher.insert("time", time);
        }

        vec![
            doc! { "$match": matcher },
            doc! {
                "$group": {
                    "_id": {
                        "day": {
                            "$toLong": {
                                "$multiply": [
                                    { "$floor": { "$divide": ["$time", MILLIS_PER_DAY] } },
                                    MILLIS_PER_DAY,
                                ]
                            }
                        },
                        "eventType": "$eventType",
                    },
                    "count": { "$sum": 1 },
                    "approvedCount": {
                        "$sum": {
                            "$cond": [{ "$eq": [{ "$ifNull": ["$approved", null] }, null] }, 0, 1]
                        }
                    },
                }
            },
            doc! { "$sort": { "_id.day": 1, "_id.eventType": 1 } },
        ]
    }
}

#[async_trait]
impl EventRepository for MongoEventRepository {
    #[instrument(skip(self, event), fields(event_id = %event.id))]
    async fn insert(&self, event: Event) -> Result<Event> {
        self.events
            .insert_one(EventDocument::from(event.clone()))
            .await?;
        Ok(event)
    }

    #[instrument(skip(self))]
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Event>> {
        let event = self.events.find_one(Self::id_filter(id)).await?;
        Ok(event.map(Event::from))
    }

    #[instrument(skip(self))]
    async fn approve(
        &self,
        id: Uuid,
        approved_at: i64,
        approved_by: &str,
    ) -> Result<Option<ApprovalState>> {
        // Matches only while unapproved, so concurrent approvals cannot both win
        let mut filter = Self::id_filter(id);
        filter.insert("approved", mongodb::bson::Bson::Null);
        let update = doc! { "$set": { "approved": approved_at, "approvedBy": approved_by } };

        let updated = self
            .events
            .find_one_and_update(filter, update)
            .with_options(Self::after_update())
            .await?;
        if updated.is_some() {
            return Ok(Some(ApprovalState::Approved(approved_at)));
        }

        let existing = self.events.find_one(Self::id_filter(id)).await?;
        Ok(existing.map(|e| ApprovalState::AlreadyApproved(e.approved.unwrap_or(approved_at))))
    }

    #[instrument(skip(self))]
    async fn set_like(&self, id: Uuid, user_id: &str, like: bool) -> Result<Option<Event>> {
        let update = if like {
            doc! { "$addToSet": { "likes": user_id } }
        } else {
            doc! { "$pull": { "likes": user_id } }
        };

        let event = self
            .events
            .find_one_and_update(Self::id_filter(id), update)
            .with_options(Self::after_update())
            .await?;
        Ok(event.map(Event::from))
    }

    #[instrument(skip(self, comment), fields(event_id = %comment.event_id))]
    async fn insert_comment(&self, comment: EventComment) -> Result<EventComment> {
        self.comments
            .insert_one(CommentDocument::from(comment.clone()))
            .await?;
        Ok(comment)
    }

    #[instrument(skip(self))]
    async fn list_comments(&self, event_id: Uuid) -> Result<Vec<EventComment>> {
        let options = FindOptions::builder()
            .sort(doc! { "time": 1, "_id": 1 })
            .build();
        let cursor = self
            .comments
            .find(doc! { "eventId": event_id.to_string() })
            .with_options(options)
            .await?;
        let comments: Vec<CommentDocument> = cursor.try_collect().await?;
        Ok(comments.into_iter().map(EventComment::from).collect())
    }

    #[instrument(skip(self))]
    async fn list_views(&self, user_ids: Vec<String>, caller_id: &str) -> Result<Vec<EventView>> {
        let cursor = self
            .events
            .aggregate(Self::views_pipeline(user_ids, caller_id))
            .await?;
        let documents: Vec<Document> = cursor.try_collect().await?;

        documents
            .into_iter()
            .map(|d| Ok(from_document::<ViewDocument>(d)?.into_view(caller_id)))
            .collect()
    }

    #[instrument(skip(self))]
    async fn daily_counts(&self, user_id: &str, range: TimeRange) -> Result<Vec<DailyTypeCount>> {
        let cursor = self
            .events
            .aggregate(Self::daily_counts_pipeline(user_id, range))
            .await?;
        let documents: Vec<Document> = cursor.try_collect().await?;

        documents
            .into_iter()
            .map(|d| {
                let group: GroupDocument = from_document(d)?;
                Ok(DailyTypeCount {
                    event_type: group.key.event_type,
                    day: group.key.day,
                    count: group.count.max(0) as u64,
                    approved_count: group.approved_count.max(0) as u64,
                })
            })
            .collect()
    }
}
