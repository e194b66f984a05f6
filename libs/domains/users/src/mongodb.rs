//! MongoDB implementation of UserRepository

use async_trait::async_trait;
use futures_util::TryStreamExt;
use mongodb::{
    Collection, Database, IndexModel,
    bson::doc,
    error::{ErrorKind, WriteFailure},
    options::{FindOptions, ReplaceOptions},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::{UserError, UserResult};
use crate::models::UserRecord;
use crate::repository::UserRepository;

const DUPLICATE_KEY: i32 = 11000;

/// Stored shape of a user: the provider id doubles as `_id`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserDocument {
    #[serde(rename = "_id")]
    id: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    last_name: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    is_team_lead: bool,
    #[serde(default)]
    team_lead: Option<String>,
}

impl From<UserRecord> for UserDocument {
    fn from(user: UserRecord) -> Self {
        Self {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            name: user.name,
            is_team_lead: user.is_team_lead,
            team_lead: user.team_lead,
        }
    }
}

impl From<UserDocument> for UserRecord {
    fn from(doc: UserDocument) -> Self {
        Self {
            id: doc.id,
            email: doc.email,
            first_name: doc.first_name,
            last_name: doc.last_name,
            name: doc.name,
            is_team_lead: doc.is_team_lead,
            team_lead: doc.team_lead,
        }
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write)) if write.code == DUPLICATE_KEY
    )
}

/// MongoDB implementation of the UserRepository
#[derive(Clone)]
pub struct MongoUserRepository {
    collection: Collection<UserDocument>,
}

impl MongoUserRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("users"),
        }
    }

    /// Create indexes backing the team-lead and team listings
    pub async fn create_indexes(&self) -> UserResult<()> {
        let indexes = vec![
            IndexModel::builder().keys(doc! { "isTeamLead": 1 }).build(),
            IndexModel::builder().keys(doc! { "teamLead": 1 }).build(),
        ];
        self.collection.create_indexes(indexes).await?;
        Ok(())
    }

    async fn find_sorted(&self, filter: mongodb::bson::Document) -> UserResult<Vec<UserRecord>> {
        let options = FindOptions::builder()
            .sort(doc! { "name": 1, "_id": 1 })
            .build();
        let cursor = self.collection.find(filter).with_options(options).await?;
        let users: Vec<UserDocument> = cursor.try_collect().await?;
        Ok(users.into_iter().map(UserRecord::from).collect())
    }
}

#[async_trait]
impl UserRepository for MongoUserRepository {
    #[instrument(skip(self))]
    async fn get_by_id(&self, id: &str) -> UserResult<Option<UserRecord>> {
        let user = self.collection.find_one(doc! { "_id": id }).await?;
        Ok(user.map(UserRecord::from))
    }

    #[instrument(skip(self, user), fields(user_id = %user.id))]
    async fn insert(&self, user: UserRecord) -> UserResult<UserRecord> {
        let document = UserDocument::from(user.clone());
        match self.collection.insert_one(&document).await {
            Ok(_) => {
                tracing::info!("Registered user");
                Ok(user)
            }
            Err(e) if is_duplicate_key(&e) => Err(UserError::Conflict(user.id)),
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self, user), fields(user_id = %user.id))]
    async fn upsert(&self, user: UserRecord) -> UserResult<UserRecord> {
        let document = UserDocument::from(user.clone());
        let options = ReplaceOptions::builder().upsert(true).build();
        self.collection
            .replace_one(doc! { "_id": user.id.as_str() }, &document)
            .with_options(options)
            .await?;

        tracing::info!("Saved user");
        Ok(user)
    }

    #[instrument(skip(self))]
    async fn list_team_leads(&self) -> UserResult<Vec<UserRecord>> {
        self.find_sorted(doc! { "isTeamLead": true }).await
    }

    #[instrument(skip(self))]
    async fn list_reports(&self, manager_id: &str) -> UserResult<Vec<UserRecord>> {
        self.find_sorted(doc! { "teamLead": manager_id }).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson;

    #[test]
    fn test_user_document_uses_id_field_and_camel_case() {
        let record = UserRecord {
            id: "u1".to_string(),
            email: "u1@example.com".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            name: "Ada Lovelace".to_string(),
            is_team_lead: false,
            team_lead: Some("lead-1".to_string()),
        };

        let document = bson::to_document(&UserDocument::from(record.clone())).unwrap();
        assert_eq!(document.get_str("_id").unwrap(), "u1");
        assert_eq!(document.get_str("teamLead").unwrap(), "lead-1");
        assert!(!document.get_bool("isTeamLead").unwrap());
        assert!(!document.contains_key("id"));

        let back: UserDocument = bson::from_document(document).unwrap();
        assert_eq!(UserRecord::from(back), record);
    }

    #[test]
    fn test_sparse_document_defaults() {
        let back: UserDocument = bson::from_document(doc! { "_id": "u2" }).unwrap();
        let record = UserRecord::from(back);
        assert_eq!(record.id, "u2");
        assert!(!record.is_team_lead);
        assert_eq!(record.team_lead, None);
    }
}
