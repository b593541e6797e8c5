use crate::models::NotificationRecord;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Projection applied to the loaded notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationFilter {
    #[default]
    All,
    UnreadOnly,
}

impl NotificationFilter {
    pub fn from_unread_only(unread_only: bool) -> Self {
        if unread_only {
            NotificationFilter::UnreadOnly
        } else {
            NotificationFilter::All
        }
    }

    pub fn matches(&self, record: &NotificationRecord) -> bool {
        match self {
            NotificationFilter::All => true,
            NotificationFilter::UnreadOnly => !record.is_read,
        }
    }
}

/// Relative age group used to section the feed. Computed at render time,
/// never stored on a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum DateBucket {
    Today,
    Yesterday,
    ThisWeek,
    Earlier,
}

impl DateBucket {
    pub fn classify(created_at: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let days = (now.date_naive() - created_at.date_naive()).num_days();
        match days {
            d if d <= 0 => DateBucket::Today,
            1 => DateBucket::Yesterday,
            2..=6 => DateBucket::ThisWeek,
            _ => DateBucket::Earlier,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DateBucket::Today => "Today",
            DateBucket::Yesterday => "Yesterday",
            DateBucket::ThisWeek => "This week",
            DateBucket::Earlier => "Earlier",
        }
    }
}

/// What subscribers see after every state change
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NotificationView {
    pub notifications: Vec<NotificationRecord>,
    pub unread_count: usize,
    pub filter: NotificationFilter,
    pub has_more: bool,
    pub is_refreshing: bool,
    pub is_loading_more: bool,
}

impl NotificationView {
    /// Split the notifications into date sections, newest section first.
    /// Empty sections are omitted.
    pub fn grouped(&self, now: DateTime<Utc>) -> Vec<(DateBucket, Vec<&NotificationRecord>)> {
        let mut groups: Vec<(DateBucket, Vec<&NotificationRecord>)> = Vec::new();
        for record in &self.notifications {
            let bucket = DateBucket::classify(record.created_at, now);
            match groups.last_mut() {
                Some((last, items)) if *last == bucket => items.push(record),
                _ => groups.push((bucket, vec![record])),
            }
        }
        groups
    }
}
