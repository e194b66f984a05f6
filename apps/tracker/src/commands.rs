//! Dispatch of the domain subcommands

use serde::Serialize;
use serde_json::Value;
use tracing::instrument;

use domain_events::{EventError, EventDraft, EventRepository, TimeRange};
use domain_users::{UpdateUser, User, UserError, UserRepository, parse_bearer};

use crate::cli::Commands;
use crate::state::Services;

/// What a failed command reports, shaped like an HTTP error response
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub status_code: u16,
    pub message: String,
}

impl From<UserError> for ErrorBody {
    fn from(err: UserError) -> Self {
        Self {
            status_code: err.status_code().as_u16(),
            message: err.public_message(),
        }
    }
}

impl From<EventError> for ErrorBody {
    fn from(err: EventError) -> Self {
        Self {
            status_code: err.status_code().as_u16(),
            message: err.public_message(),
        }
    }
}

impl ErrorBody {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status_code: 400,
            message: message.into(),
        }
    }

    fn internal() -> Self {
        Self {
            status_code: 500,
            message: "An internal error occurred".to_string(),
        }
    }
}

type CommandResult = Result<Value, ErrorBody>;

fn to_json<T: Serialize>(value: T) -> CommandResult {
    serde_json::to_value(value).map_err(|e| {
        tracing::error!(error = %e, "Failed to serialize command output");
        ErrorBody::internal()
    })
}

fn parse_json<T: serde::de::DeserializeOwned>(raw: &str) -> Result<T, ErrorBody> {
    serde_json::from_str(raw).map_err(|e| ErrorBody::bad_request(format!("Invalid JSON body: {e}")))
}

/// Run one domain subcommand as the holder of the `Bearer` credential in `authorization`
#[instrument(skip(services, authorization))]
pub async fn execute<U, E>(
    services: &Services<U, E>,
    authorization: Option<&str>,
    command: Commands,
) -> CommandResult
where
    U: UserRepository + 'static,
    E: EventRepository,
{
    let caller = authenticate(services, authorization).await?;

    match command {
        Commands::Whoami => to_json(caller),
        Commands::Register => to_json(services.users.create_user(&caller).await?),
        Commands::UpdateProfile { json } => {
            let update: UpdateUser = parse_json(&json)?;
            to_json(services.users.update_user(&caller, update).await?)
        }
        Commands::TeamLeads => to_json(services.users.team_leads().await?),
        Commands::Team => to_json(services.users.team(&caller).await?),
        Commands::TeamEvents => to_json(services.events.get_events_for_team(&caller).await?),
        Commands::UserEvents { user_id } => to_json(
            services
                .events
                .get_events_for_user(&caller, &user_id)
                .await?,
        ),
        Commands::CreateEvent { json } => {
            let draft: EventDraft = parse_json(&json)?;
            to_json(services.events.add_event(&caller, draft).await?)
        }
        Commands::Approve { event_id } => {
            to_json(services.events.approve_event(&caller, &event_id).await?)
        }
        Commands::Comment { event_id, text } => to_json(
            services
                .events
                .add_event_comment(&caller, &event_id, &text)
                .await?,
        ),
        Commands::Comments { event_id } => to_json(
            services
                .events
                .get_event_comments(&caller, &event_id)
                .await?,
        ),
        Commands::Like { event_id } => to_json(
            services
                .events
                .set_like_event(&caller, &event_id, true)
                .await?,
        ),
        Commands::Unlike { event_id } => to_json(
            services
                .events
                .set_like_event(&caller, &event_id, false)
                .await?,
        ),
        Commands::Counts { from, to } => to_json(
            services
                .analytics
                .get_event_count(&caller, TimeRange { from, to })
                .await?,
        ),
        Commands::Migrate | Commands::Health => Err(ErrorBody::bad_request(
            "This command does not act on behalf of a user",
        )),
    }
}

async fn authenticate<U, E>(
    services: &Services<U, E>,
    authorization: Option<&str>,
) -> Result<User, ErrorBody>
where
    U: UserRepository + 'static,
    E: EventRepository,
{
    let token = parse_bearer(authorization)?;
    Ok(services.users.current_user(token).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use domain_events::InMemoryEventRepository;
    use domain_users::{
        IdentityProfile, IdentityProvider, InMemoryUserRepository, UserRecord, UserResult,
    };
    use std::sync::Arc;
    use std::time::Duration;

    /// Accepts tokens of the form `token-<user id>`
    struct StaticProvider;

    #[async_trait]
    impl IdentityProvider for StaticProvider {
        async fn lookup(&self, token: &str) -> UserResult<IdentityProfile> {
            let id = token
                .strip_prefix("token-")
                .ok_or_else(UserError::unauthenticated)?;
            Ok(IdentityProfile {
                id: id.to_string(),
                email: format!("{id}@example.com"),
                first_name: id.to_string(),
                last_name: String::new(),
                name: id.to_string(),
                is_team_lead: false,
            })
        }
    }

    fn record(id: &str, is_team_lead: bool, team_lead: Option<&str>) -> UserRecord {
        UserRecord {
            id: id.to_string(),
            email: format!("{id}@example.com"),
            first_name: id.to_string(),
            last_name: String::new(),
            name: id.to_string(),
            is_team_lead,
            team_lead: team_lead.map(str::to_string),
        }
    }

    fn services() -> Services<InMemoryUserRepository, InMemoryEventRepository> {
        let users = InMemoryUserRepository::with_users([
            record("lead", true, None),
            record("dev", false, Some("lead")),
        ]);
        Services::new(
            Arc::new(users),
            Arc::new(InMemoryEventRepository::new()),
            Arc::new(StaticProvider),
            Duration::from_secs(60),
        )
    }

    #[tokio::test]
    async fn test_missing_token_is_unauthenticated() {
        let err = execute(&services(), None, Commands::Whoami).await.unwrap_err();
        assert_eq!(err.status_code, 401);
    }

    #[tokio::test]
    async fn test_malformed_authorization_is_unauthenticated() {
        let services = services();
        for header in ["token-dev", "Basic token-dev", "Bearer"] {
            let err = execute(&services, Some(header), Commands::Whoami)
                .await
                .unwrap_err();
            assert_eq!(err.status_code, 401, "{header}");
        }

        let me = execute(&services, Some("bearer token-dev"), Commands::Whoami)
            .await
            .unwrap();
        assert_eq!(me["id"], "dev");
    }

    #[tokio::test]
    async fn test_create_then_approve_flow() {
        let services = services();

        let created = execute(
            &services,
            Some("Bearer token-dev"),
            Commands::CreateEvent {
                json: r#"{"eventType": "talk", "summary": "Meetup talk"}"#.to_string(),
            },
        )
        .await
        .unwrap();
        assert!(created["approved"].is_null());
        let event_id = created["id"].as_str().unwrap().to_string();

        let denied = execute(
            &services,
            Some("Bearer token-dev"),
            Commands::Approve {
                event_id: event_id.clone(),
            },
        )
        .await
        .unwrap_err();
        assert_eq!(denied.status_code, 403);

        let approved = execute(&services, Some("Bearer token-lead"), Commands::Approve { event_id })
            .await
            .unwrap();
        assert_eq!(approved["message"], "Success");

        let listed = execute(&services, Some("Bearer token-lead"), Commands::TeamEvents)
            .await
            .unwrap();
        assert_eq!(listed.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_json_is_bad_request() {
        let err = execute(
            &services(),
            Some("Bearer token-dev"),
            Commands::CreateEvent {
                json: "{not json".to_string(),
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.status_code, 400);
    }

    #[tokio::test]
    async fn test_register_twice_conflicts() {
        let services = services();
        execute(&services, Some("Bearer token-newbie"), Commands::Register)
            .await
            .unwrap();
        let err = execute(&services, Some("Bearer token-newbie"), Commands::Register)
            .await
            .unwrap_err();
        assert_eq!(err.status_code, 409);
    }

    #[test]
    fn test_error_body_shape() {
        let body = ErrorBody::from(EventError::event_not_found());
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["statusCode"], 404);
        assert!(json["message"].as_str().unwrap().contains("could not be found"));
    }
}
