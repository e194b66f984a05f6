//! Database library for the tracker services
//!
//! Provides the MongoDB connector, configuration and health checks that the
//! domain repositories are built on, plus the retry helper used when a
//! process first connects.
//!
//! # Features
//!
//! - `mongodb` (default) - MongoDB support
//! - `config` - `core_config::FromEnv` for [`mongodb::MongoConfig`]
//! - `all` - everything above
//!
//! # Example
//!
//! ```ignore
//! use database::mongodb::{MongoConfig, connect_from_config_with_retry};
//!
//! let config = MongoConfig::with_database("mongodb://localhost:27017", "team-achievements");
//! let client = connect_from_config_with_retry(&config, None).await?;
//! let db = client.database(config.database());
//! ```

pub mod common;

#[cfg(feature = "mongodb")]
pub mod mongodb;
