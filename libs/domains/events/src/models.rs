//! Event domain models

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use uuid::Uuid;
use validator::{Validate, ValidationError};

pub const MILLIS_PER_DAY: i64 = 86_400_000;

/// Earliest accepted event time (-100,000,000 days); its day bucket fits in `i64`
pub const MIN_EVENT_TIME: i64 = -100_000_000 * MILLIS_PER_DAY;

pub const APPROVED_MESSAGE: &str = "Success";
pub const ALREADY_APPROVED_MESSAGE: &str = "Event already approved";

/// Current wall-clock time in epoch milliseconds
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Start of the UTC day containing `time`
pub fn day_bucket(time: i64) -> i64 {
    time.div_euclid(MILLIS_PER_DAY)
        .saturating_mul(MILLIS_PER_DAY)
}

/// A logged achievement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: Uuid,
    pub event_type: String,
    /// Epoch milliseconds, never in the future at creation
    pub time: i64,
    pub summary: String,
    /// Owner of the achievement
    pub user: String,
    /// Who logged it; differs from `user` only for a lead acting for a report
    pub author: String,
    pub approved: Option<i64>,
    pub approved_by: Option<String>,
    #[serde(default)]
    pub likes: BTreeSet<String>,
}

impl Event {
    pub fn is_approved(&self) -> bool {
        self.approved.is_some()
    }
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank").with_message("must not be blank".into()));
    }
    Ok(())
}

/// Payload for creating an event
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EventDraft {
    #[serde(default)]
    #[validate(length(max = 100), custom(function = "not_blank"))]
    pub event_type: String,
    #[serde(default)]
    #[validate(length(max = 10000))]
    pub summary: String,
    /// Owner; defaults to the caller
    #[serde(default)]
    pub user: Option<String>,
    /// Loosely typed: numbers and numeric strings are accepted
    #[serde(default)]
    pub time: Option<Value>,
}

impl EventDraft {
    /// `supplied` clamped into `[MIN_EVENT_TIME, now]`; anything non-numeric means `now`
    pub fn resolved_time(&self, now: i64) -> i64 {
        let supplied = match &self.time {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
            _ => None,
        };

        match supplied {
            Some(t) if t.is_finite() => now.min((t as i64).max(MIN_EVENT_TIME)),
            _ => now,
        }
    }

    /// Owner id; blank means the caller
    pub fn owner<'a>(&'a self, caller_id: &'a str) -> &'a str {
        match self.user.as_deref().map(str::trim) {
            Some(user) if !user.is_empty() => user,
            _ => caller_id,
        }
    }
}

/// Text of a new comment
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewComment {
    #[validate(length(max = 5000), custom(function = "not_blank"))]
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventComment {
    pub id: Uuid,
    pub event_id: Uuid,
    pub time: i64,
    pub text: String,
    pub user: String,
}

/// An event annotated for a particular caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventView {
    pub id: Uuid,
    pub event_type: String,
    pub time: i64,
    pub summary: String,
    pub user: String,
    pub author: String,
    pub approved: Option<i64>,
    pub approved_by: Option<String>,
    pub likes: BTreeSet<String>,
    pub comment_count: u64,
    pub like_count: u64,
    pub liked_by_caller: bool,
    pub commented_by_caller: bool,
}

impl EventView {
    pub fn new(
        event: Event,
        caller_id: &str,
        comment_count: u64,
        commented_by_caller: bool,
    ) -> Self {
        Self {
            liked_by_caller: event.likes.contains(caller_id),
            like_count: event.likes.len() as u64,
            id: event.id,
            event_type: event.event_type,
            time: event.time,
            summary: event.summary,
            user: event.user,
            author: event.author,
            approved: event.approved,
            approved_by: event.approved_by,
            likes: event.likes,
            comment_count,
            commented_by_caller,
        }
    }
}

/// Outcome of an approval request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalState {
    /// This request set the approval timestamp
    Approved(i64),
    /// Someone got there first; carries the existing timestamp
    AlreadyApproved(i64),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproveResponse {
    pub message: String,
    pub approved: i64,
}

impl From<ApprovalState> for ApproveResponse {
    fn from(state: ApprovalState) -> Self {
        match state {
            ApprovalState::Approved(approved) => Self {
                message: APPROVED_MESSAGE.to_string(),
                approved,
            },
            ApprovalState::AlreadyApproved(approved) => Self {
                message: ALREADY_APPROVED_MESSAGE.to_string(),
                approved,
            },
        }
    }
}

/// Optional `[from, to)` window in epoch milliseconds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct TimeRange {
    pub from: Option<i64>,
    pub to: Option<i64>,
}

impl TimeRange {
    pub fn contains(&self, time: i64) -> bool {
        self.from.is_none_or(|from| time >= from) && self.to.is_none_or(|to| time < to)
    }
}

/// Count of one event type on one day, as produced by the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyTypeCount {
    pub event_type: String,
    pub day: i64,
    pub count: u64,
    pub approved_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayCount {
    pub day: i64,
    pub count: u64,
    pub approved_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTypeCounts {
    pub event_type: String,
    pub days: Vec<DayCount>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn draft(time: Option<Value>) -> EventDraft {
        EventDraft {
            event_type: "talk".to_string(),
            time,
            ..Default::default()
        }
    }

    #[test]
    fn test_resolved_time_clamps_future() {
        assert_eq!(draft(Some(json!(5_000))).resolved_time(1_000), 1_000);
        assert_eq!(draft(Some(json!(500))).resolved_time(1_000), 500);
    }

    #[test]
    fn test_resolved_time_fallbacks() {
        assert_eq!(draft(None).resolved_time(1_000), 1_000);
        assert_eq!(draft(Some(Value::Null)).resolved_time(1_000), 1_000);
        assert_eq!(draft(Some(json!("yesterday"))).resolved_time(1_000), 1_000);
        assert_eq!(draft(Some(json!(true))).resolved_time(1_000), 1_000);
    }

    #[test]
    fn test_resolved_time_parses_numeric_strings() {
        assert_eq!(draft(Some(json!(" 250 "))).resolved_time(1_000), 250);
        assert_eq!(draft(Some(json!("99999"))).resolved_time(1_000), 1_000);
    }

    #[test]
    fn test_owner_defaults_to_caller() {
        let mut d = draft(None);
        assert_eq!(d.owner("me"), "me");
        d.user = Some("  ".to_string());
        assert_eq!(d.owner("me"), "me");
        d.user = Some("report".to_string());
        assert_eq!(d.owner("me"), "report");
    }

    #[test]
    fn test_now_millis_is_wall_clock() {
        let before = Utc::now().timestamp_millis();
        let now = now_millis();
        assert!(now >= before);
        assert!(now > 1_600_000_000_000);
    }

    #[test]
    fn test_day_bucket() {
        assert_eq!(day_bucket(0), 0);
        assert_eq!(day_bucket(MILLIS_PER_DAY - 1), 0);
        assert_eq!(day_bucket(MILLIS_PER_DAY + 5), MILLIS_PER_DAY);
        assert_eq!(day_bucket(-1), -MILLIS_PER_DAY);
        assert_eq!(day_bucket(MIN_EVENT_TIME), MIN_EVENT_TIME);
        assert_eq!(day_bucket(i64::MIN), i64::MIN);
    }

    #[test]
    fn test_resolved_time_clamps_far_past() {
        assert_eq!(draft(Some(json!(-1e30))).resolved_time(1_000), MIN_EVENT_TIME);
        assert_eq!(
            draft(Some(json!("-9223372036854775808"))).resolved_time(1_000),
            MIN_EVENT_TIME
        );
        assert_eq!(draft(Some(json!(-5_000))).resolved_time(1_000), -5_000);
    }

    #[test]
    fn test_draft_validation() {
        assert!(draft(None).validate().is_ok());

        let blank = EventDraft {
            event_type: "  ".to_string(),
            ..Default::default()
        };
        let errors = blank.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("event_type"));

        let comment = NewComment {
            text: "\n\t".to_string(),
        };
        assert!(comment.validate().is_err());
    }

    #[test]
    fn test_time_range_is_half_open() {
        let range = TimeRange {
            from: Some(10),
            to: Some(20),
        };
        assert!(range.contains(10));
        assert!(!range.contains(20));
        assert!(TimeRange::default().contains(i64::MIN));
    }

    #[test]
    fn test_view_annotations() {
        let event = Event {
            id: Uuid::now_v7(),
            event_type: "talk".to_string(),
            time: 1,
            summary: String::new(),
            user: "u1".to_string(),
            author: "u1".to_string(),
            approved: None,
            approved_by: None,
            likes: ["u2".to_string(), "u3".to_string()].into(),
        };
        let view = EventView::new(event, "u2", 4, false);
        assert_eq!(view.like_count, 2);
        assert!(view.liked_by_caller);
        assert_eq!(view.comment_count, 4);

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["likeCount"], 2);
        assert_eq!(json["eventType"], "talk");
    }

    #[test]
    fn test_approve_response_messages() {
        let ok: ApproveResponse = ApprovalState::Approved(7).into();
        assert_eq!(ok.message, "Success");
        let again: ApproveResponse = ApprovalState::AlreadyApproved(3).into();
        assert_eq!(again.message, "Event already approved");
        assert_eq!(again.approved, 3);
    }
}
