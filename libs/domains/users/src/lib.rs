//! Users Domain
//!
//! Caller identity, profiles and the single-level team hierarchy.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────┐
//! │  UserService  │  ← register, update profile, team listings
//! └───────┬───────┘
//!         │
//! ┌───────▼───────┐      ┌──────────────────┐
//! │ IdentityCache │ ───► │ IdentityProvider │  ← GoTrue over HTTP
//! └───────┬───────┘      └──────────────────┘
//!         │
//! ┌───────▼───────┐
//! │ TeamDirectory │  ← manager-of, membership, team listing
//! └───────┬───────┘
//!         │
//! ┌───────▼───────┐
//! │  Repository   │  ← in-memory or MongoDB `users` collection
//! └───────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::{sync::Arc, time::Duration};
//! use domain_users::{
//!     GoTrueIdentityProvider, IdentityCache, InMemoryUserRepository, TeamDirectory, UserService,
//! };
//! use core_config::identity::IdentityConfig;
//!
//! # fn main() -> Result<(), domain_users::UserError> {
//! let repository = Arc::new(InMemoryUserRepository::new());
//! let provider = Arc::new(GoTrueIdentityProvider::new(&IdentityConfig::default())?);
//! let cache = Arc::new(IdentityCache::new(
//!     provider,
//!     TeamDirectory::new(Arc::clone(&repository)),
//!     Duration::from_secs(300),
//! ));
//! let service = UserService::new(repository, cache);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod directory;
pub mod error;
pub mod identity;
pub mod models;
pub mod mongodb;
pub mod repository;
pub mod service;

// Re-export commonly used types
pub use cache::{IdentityCache, parse_bearer};
pub use directory::{TeamDirectory, manager_of};
pub use error::{UserError, UserResult};
pub use identity::{GoTrueIdentityProvider, IdentityProvider};
pub use models::{IdentityProfile, UpdateUser, User, UserRecord};
pub use crate::mongodb::MongoUserRepository;
pub use repository::{InMemoryUserRepository, UserRepository};
pub use service::UserService;
