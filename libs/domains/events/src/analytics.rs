//! Per-type daily event counts

use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::instrument;

use crate::error::{EventError, Result};
use crate::models::{DailyTypeCount, DayCount, EventTypeCounts, TimeRange};
use crate::repository::EventRepository;
use domain_users::User;

/// Regroup (day, type) counts by type. Types ascend, and so do days within each type.
pub fn group_by_type(counts: Vec<DailyTypeCount>) -> Vec<EventTypeCounts> {
    let mut by_type: BTreeMap<String, BTreeMap<i64, DayCount>> = BTreeMap::new();

    for c in counts {
        let day = by_type
            .entry(c.event_type)
            .or_default()
            .entry(c.day)
            .or_insert(DayCount {
                day: c.day,
                count: 0,
                approved_count: 0,
            });
        day.count += c.count;
        day.approved_count += c.approved_count;
    }

    by_type
        .into_iter()
        .map(|(event_type, days)| EventTypeCounts {
            event_type,
            days: days.into_values().collect(),
        })
        .collect()
}

pub struct EventAnalytics<E: EventRepository> {
    repository: Arc<E>,
}

impl<E: EventRepository> Clone for EventAnalytics<E> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
        }
    }
}

impl<E: EventRepository> EventAnalytics<E> {
    pub fn new(repository: Arc<E>) -> Self {
        Self { repository }
    }

    /// Daily counts of the caller's own events, optionally limited to `[from, to)`
    #[instrument(skip(self, caller), fields(caller = %caller.id))]
    pub async fn get_event_count(
        &self,
        caller: &User,
        range: TimeRange,
    ) -> Result<Vec<EventTypeCounts>> {
        if let (Some(from), Some(to)) = (range.from, range.to) {
            if from > to {
                return Err(EventError::BadRequest(
                    "'from' must not be after 'to'".to_string(),
                ));
            }
        }

        let counts = self.repository.daily_counts(&caller.id, range).await?;
        Ok(group_by_type(counts))
    }
}
