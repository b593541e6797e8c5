use chrono::{DateTime, Duration, TimeZone, Utc};
use notisync::domain::ports::NotificationPage;
use notisync::{NotificationFilter, NotificationKind, NotificationRecord, SyncController};

/// Fixed reference instant; `minute` offsets are relative to it
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 13, 12, 0, 0).unwrap()
}

pub fn at_minute(minute: i64) -> DateTime<Utc> {
    base_time() + Duration::minutes(minute)
}

/// Unread bet-result record created `minute` minutes after the base time
pub fn record(id: &str, minute: i64) -> NotificationRecord {
    NotificationRecord::new(id, NotificationKind::BetResult, format!("Bet {} settled", id), at_minute(minute))
}

pub fn friend_request(id: &str, friendship_id: &str, minute: i64) -> NotificationRecord {
    NotificationRecord::new(id, NotificationKind::FriendRequest, "New friend request", at_minute(minute))
        .with_related_entity(friendship_id)
}

/// Page built from (id, minute) pairs
pub fn page(entries: &[(&str, i64)], next_token: Option<&str>, has_more: bool) -> NotificationPage {
    NotificationPage {
        records: entries.iter().map(|(id, minute)| record(id, *minute)).collect(),
        next_token: next_token.map(str::to_owned),
        has_more,
    }
}

pub fn ids(records: &[NotificationRecord]) -> Vec<String> {
    records.iter().map(|r| r.id.clone()).collect()
}

pub async fn loaded_ids(controller: &SyncController) -> Vec<String> {
    ids(&controller.snapshot(NotificationFilter::All).await)
}

/// Panics unless the records are strictly unique by id and newest first
pub fn assert_consistent(records: &[NotificationRecord]) {
    let mut seen = std::collections::HashSet::new();
    for record in records {
        assert!(seen.insert(record.id.clone()), "duplicate id {}", record.id);
    }
    for pair in records.windows(2) {
        assert!(
            pair[0].created_at >= pair[1].created_at,
            "{} ({}) sorted before newer {} ({})",
            pair[0].id,
            pair[0].created_at,
            pair[1].id,
            pair[1].created_at
        );
    }
}
