//! External identity provider lookup

use async_trait::async_trait;
use core_config::identity::IdentityConfig;
use serde::Deserialize;
use tracing::{instrument, warn};

use crate::error::{UserError, UserResult};
use crate::models::IdentityProfile;

/// Resolves a bearer token to the profile the identity provider holds for it
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Fails with `Unauthenticated` when the provider rejects the token
    async fn lookup(&self, token: &str) -> UserResult<IdentityProfile>;
}

/// GoTrue / Netlify Identity client (`GET {url}/user`)
#[derive(Clone)]
pub struct GoTrueIdentityProvider {
    user_url: String,
    http_client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct GoTrueUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    user_metadata: GoTrueMetadata,
}

#[derive(Debug, Default, Deserialize)]
struct GoTrueMetadata {
    #[serde(rename = "firstName")]
    first_name: Option<String>,
    #[serde(rename = "lastName")]
    last_name: Option<String>,
    full_name: Option<String>,
    #[serde(rename = "isTeamLead")]
    is_team_lead: Option<bool>,
}

impl From<GoTrueUser> for IdentityProfile {
    fn from(user: GoTrueUser) -> Self {
        let meta = user.user_metadata;
        let first_name = meta.first_name.unwrap_or_default();
        let last_name = meta.last_name.unwrap_or_default();
        let name = match meta.full_name {
            Some(full) if !full.trim().is_empty() => full,
            _ => format!("{first_name} {last_name}").trim().to_string(),
        };

        Self {
            id: user.id,
            email: user.email.unwrap_or_default(),
            first_name,
            last_name,
            name,
            is_team_lead: meta.is_team_lead.unwrap_or(false),
        }
    }
}

impl GoTrueIdentityProvider {
    pub fn new(config: &IdentityConfig) -> UserResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| UserError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            user_url: format!("{}/user", config.url.trim_end_matches('/')),
            http_client,
        })
    }
}

#[async_trait]
impl IdentityProvider for GoTrueIdentityProvider {
    #[instrument(skip(self, token))]
    async fn lookup(&self, token: &str) -> UserResult<IdentityProfile> {
        let response = self
            .http_client
            .get(&self.user_url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| UserError::Provider(format!("Failed to reach identity provider: {}", e)))?;

        if !response.status().is_success() {
            warn!(status = %response.status(), "Identity provider rejected token");
            return Err(UserError::unauthenticated());
        }

        let user: GoTrueUser = response
            .json()
            .await
            .map_err(|e| UserError::Provider(format!("Failed to parse identity profile: {}", e)))?;

        Ok(user.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> IdentityProfile {
        serde_json::from_str::<GoTrueUser>(body).unwrap().into()
    }

    #[test]
    fn test_profile_from_full_metadata() {
        let profile = parse(
            r#"{
                "id": "8c1f",
                "email": "ada@example.com",
                "user_metadata": {
                    "firstName": "Ada",
                    "lastName": "Lovelace",
                    "full_name": "Ada King Lovelace",
                    "isTeamLead": true
                }
            }"#,
        );

        assert_eq!(profile.id, "8c1f");
        assert_eq!(profile.email, "ada@example.com");
        assert_eq!(profile.first_name, "Ada");
        assert_eq!(profile.name, "Ada King Lovelace");
        assert!(profile.is_team_lead);
    }

    #[test]
    fn test_profile_without_metadata() {
        let profile = parse(r#"{"id": "8c1f", "email": "ada@example.com"}"#);
        assert_eq!(profile.name, "");
        assert!(!profile.is_team_lead);
    }

    #[test]
    fn test_profile_name_falls_back_to_parts() {
        let profile = parse(
            r#"{"id": "8c1f", "user_metadata": {"firstName": "Ada", "lastName": "Lovelace"}}"#,
        );
        assert_eq!(profile.name, "Ada Lovelace");
        assert_eq!(profile.email, "");
    }

    #[test]
    fn test_new_builds_user_endpoint() {
        let provider =
            GoTrueIdentityProvider::new(&IdentityConfig::new("http://identity.local/")).unwrap();
        assert_eq!(provider.user_url, "http://identity.local/user");
    }

    #[tokio::test]
    async fn test_unreachable_provider_is_provider_error() {
        let mut config = IdentityConfig::new("http://127.0.0.1:9");
        config.request_timeout_secs = 1;
        let provider = GoTrueIdentityProvider::new(&config).unwrap();

        let err = provider.lookup("token").await.unwrap_err();
        assert!(matches!(err, UserError::Provider(_)));
    }
}
