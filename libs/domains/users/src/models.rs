//! User domain models

use serde::{Deserialize, Deserializer, Serialize};
use validator::{Validate, ValidationError};

/// A user as persisted: the manager link is a plain id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_team_lead: bool,
    #[serde(default)]
    pub team_lead: Option<String>,
}

/// A user with the manager link resolved one level deep
///
/// The resolved manager is a [`UserRecord`], so its own `teamLead` stays an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub name: String,
    pub is_team_lead: bool,
    pub team_lead: Option<UserRecord>,
}

impl User {
    pub fn from_parts(record: UserRecord, team_lead: Option<UserRecord>) -> Self {
        // A lead never carries a manager
        let team_lead = if record.is_team_lead { None } else { team_lead };
        Self {
            id: record.id,
            email: record.email,
            first_name: record.first_name,
            last_name: record.last_name,
            name: record.name,
            is_team_lead: record.is_team_lead,
            team_lead,
        }
    }

    pub fn team_lead_id(&self) -> Option<&str> {
        self.team_lead.as_ref().map(|lead| lead.id.as_str())
    }

    /// Flatten back into the persisted shape
    pub fn record(&self) -> UserRecord {
        UserRecord {
            id: self.id.clone(),
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            name: self.name.clone(),
            is_team_lead: self.is_team_lead,
            team_lead: if self.is_team_lead {
                None
            } else {
                self.team_lead_id().map(str::to_string)
            },
        }
    }
}

/// Profile as reported by the identity provider
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IdentityProfile {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub name: String,
    pub is_team_lead: bool,
}

impl IdentityProfile {
    /// Combine the provider profile with the locally stored record.
    ///
    /// The provider owns `id` and `email`. The local record wins for the
    /// names (when non-empty), the team-lead flag and the manager link.
    pub fn merge(self, local: Option<UserRecord>) -> UserRecord {
        let Some(local) = local else {
            return UserRecord {
                id: self.id,
                email: self.email,
                first_name: self.first_name,
                last_name: self.last_name,
                name: self.name,
                is_team_lead: self.is_team_lead,
                team_lead: None,
            };
        };

        let prefer = |local: String, remote: String| {
            if local.trim().is_empty() { remote } else { local }
        };

        UserRecord {
            id: self.id,
            email: self.email,
            first_name: prefer(local.first_name, self.first_name),
            last_name: prefer(local.last_name, self.last_name),
            name: prefer(local.name, self.name),
            is_team_lead: local.is_team_lead,
            team_lead: if local.is_team_lead {
                None
            } else {
                local.team_lead
            },
        }
    }
}

/// Partial profile update sent by the owner
///
/// `teamLead` is tri-state: absent leaves the link alone, `null` clears it,
/// an id asks for that lead to become the manager.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUser {
    #[validate(length(max = 100), custom(function = "not_blank"))]
    pub first_name: Option<String>,
    #[validate(length(max = 100), custom(function = "not_blank"))]
    pub last_name: Option<String>,
    #[validate(length(max = 200), custom(function = "not_blank"))]
    pub name: Option<String>,
    pub is_team_lead: Option<bool>,
    #[serde(default, deserialize_with = "nullable")]
    pub team_lead: Option<Option<String>>,
}

impl UpdateUser {
    /// Apply the name fields to `record`; call after `validate()`
    ///
    /// Explicit first/last names take precedence over a bare `name`, which is
    /// split on whitespace into first name and the remainder.
    pub fn apply_names(&self, record: &mut UserRecord) {
        if self.first_name.is_some() || self.last_name.is_some() {
            if let Some(first) = &self.first_name {
                record.first_name = first.trim().to_string();
            }
            if let Some(last) = &self.last_name {
                record.last_name = last.trim().to_string();
            }
            record.name = format!("{} {}", record.first_name, record.last_name)
                .trim()
                .to_string();
        } else if let Some(name) = &self.name {
            let name = name.trim();
            let mut parts = name.split_whitespace();
            record.first_name = parts.next().unwrap_or_default().to_string();
            record.last_name = parts.collect::<Vec<_>>().join(" ");
            record.name = name.to_string();
        }
    }
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank").with_message("must not be blank".into()));
    }
    Ok(())
}

/// Distinguish an explicit `null` from an absent field
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
