//! Events Domain
//!
//! Achievements logged by users, approved by their team lead, and commented
//! on or liked by teammates.
//!
//! # Lifecycle
//!
//! ```text
//! created ──► pending ──approve──► approved
//!    │                                ▲
//!    └── lead for self or report ─────┘
//!
//! comments and likes are orthogonal to approval
//! ```
//!
//! # Components
//!
//! - [`EventService`]: create, approve, comment, like, team and user listings
//! - [`AuthorizationPolicy`]: who may act on whose events
//! - [`EventAnalytics`]: per-type daily counts
//! - [`EventRepository`]: in-memory or MongoDB (`events`, `eventComments`)

pub mod analytics;
pub mod error;
pub mod models;
pub mod mongodb;
pub mod policy;
pub mod repository;
pub mod service;

pub use analytics::EventAnalytics;
pub use error::{EventError, Result};
pub use models::{
    ApproveResponse, DayCount, Event, EventComment, EventDraft, EventTypeCounts, EventView,
    TimeRange,
};
pub use crate::mongodb::MongoEventRepository;
pub use policy::AuthorizationPolicy;
pub use repository::{EventRepository, InMemoryEventRepository};
pub use service::EventService;
