use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "tracker")]
#[command(about = "Log, approve and review team achievements")]
pub struct Cli {
    /// Authorization header value, e.g. 'Bearer <token>'
    #[arg(short, long, global = true)]
    pub authorization: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create the MongoDB indexes
    Migrate,

    /// Ping the database
    Health,

    /// Show the caller's profile
    Whoami,

    /// Store the caller's identity profile as a local user
    Register,

    /// Update the caller's profile from a JSON document
    UpdateProfile {
        /// e.g. '{"name": "Ada Lovelace", "teamLead": "lead-id"}'
        json: String,
    },

    /// List every team lead
    TeamLeads,

    /// List the caller's team, lead first
    Team,

    /// Events of the caller's team, newest first
    TeamEvents,

    /// Events of one user, newest first
    UserEvents { user_id: String },

    /// Log an event from a JSON draft
    CreateEvent {
        /// e.g. '{"eventType": "talk", "summary": "Spoke at RustConf"}'
        json: String,
    },

    /// Approve a report's event
    Approve { event_id: String },

    /// Comment on an event
    Comment { event_id: String, text: String },

    /// List comments on an event, oldest first
    Comments { event_id: String },

    Like { event_id: String },

    Unlike { event_id: String },

    /// Per-type daily counts of the caller's events
    Counts {
        /// Inclusive lower bound, epoch milliseconds
        #[arg(long, allow_hyphen_values = true)]
        from: Option<i64>,

        /// Exclusive upper bound, epoch milliseconds
        #[arg(long, allow_hyphen_values = true)]
        to: Option<i64>,
    },
}
