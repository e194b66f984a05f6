//! Tracker
//!
//! Command-line surface over the team achievement tracker. Each invocation
//! resolves the caller from the `--authorization` header value, runs one
//! command against MongoDB and prints the result as JSON.
//!
//! A single invocation resolves at most one token, so the identity cache and
//! its sweeper only save provider round-trips when the services are hosted by
//! a long-lived process; here they run for the lifetime of one command.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use core_config::tracing::{init_tracing, install_color_eyre};
use database::mongodb::{check_health_detailed, connect_from_config_with_retry};
use domain_events::MongoEventRepository;
use domain_users::{GoTrueIdentityProvider, MongoUserRepository};
use tokio::sync::watch;
use tracing::{error, info};

mod cli;
mod commands;
mod config;
mod state;

use cli::{Cli, Commands};
use config::Config;
use state::Services;

#[tokio::main]
async fn main() -> eyre::Result<ExitCode> {
    install_color_eyre();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    init_tracing(&config.environment);

    info!("Connecting to MongoDB at {}", config.mongodb.url());
    let client = connect_from_config_with_retry(&config.mongodb, None).await?;
    let db = client.database(config.mongodb.database());

    let user_repository = Arc::new(MongoUserRepository::new(&db));
    let event_repository = Arc::new(MongoEventRepository::new(&db));

    match cli.command {
        Commands::Migrate => {
            user_repository
                .create_indexes()
                .await
                .map_err(|e| eyre::eyre!("Failed to create user indexes: {}", e))?;
            event_repository
                .create_indexes()
                .await
                .map_err(|e| eyre::eyre!("Failed to create event indexes: {}", e))?;
            info!(database = %config.mongodb.database(), "Indexes created");
            return Ok(ExitCode::SUCCESS);
        }
        Commands::Health => {
            let status = check_health_detailed(&db).await;
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "healthy": status.healthy,
                    "message": status.message,
                    "responseTimeMs": status.response_time_ms,
                }))?
            );
            return Ok(if status.healthy {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            });
        }
        _ => {}
    }

    let provider = GoTrueIdentityProvider::new(&config.identity)
        .map_err(|e| eyre::eyre!("Failed to build identity client: {}", e))?;
    let services = Services::new(
        user_repository,
        event_repository,
        Arc::new(provider),
        config.identity.cache_ttl(),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper = Arc::clone(&services.cache)
        .spawn_sweeper(config.identity.sweep_interval(), shutdown_rx);

    let result = commands::execute(&services, cli.authorization.as_deref(), cli.command).await;

    let _ = shutdown_tx.send(true);
    if let Err(e) = sweeper.await {
        error!(error = %e, "Identity cache sweeper task failed");
    }

    match result {
        Ok(output) => {
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(body) => {
            println!("{}", serde_json::to_string_pretty(&body)?);
            Ok(ExitCode::FAILURE)
        }
    }
}
