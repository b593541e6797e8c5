use crate::domain::{SyncError, SyncResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of event a notification reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    BetResult,
    BetCreated,
    BetDeadline,
    BetCancelled,
    FriendRequest,
    FriendRequestAccepted,
    GroupInvite,
    GroupMemberJoined,
    GroupMemberLeft,
    GroupRoleChanged,
    NewMessage,
    MessageMention,
    MessageReply,
    AchievementUnlocked,
    StreakMilestone,
    LevelUp,
    CreditsReceived,
    SystemAnnouncement,
    Maintenance,
    Welcome,
}

impl NotificationKind {
    pub const ALL: [NotificationKind; 20] = [
        NotificationKind::BetResult,
        NotificationKind::BetCreated,
        NotificationKind::BetDeadline,
        NotificationKind::BetCancelled,
        NotificationKind::FriendRequest,
        NotificationKind::FriendRequestAccepted,
        NotificationKind::GroupInvite,
        NotificationKind::GroupMemberJoined,
        NotificationKind::GroupMemberLeft,
        NotificationKind::GroupRoleChanged,
        NotificationKind::NewMessage,
        NotificationKind::MessageMention,
        NotificationKind::MessageReply,
        NotificationKind::AchievementUnlocked,
        NotificationKind::StreakMilestone,
        NotificationKind::LevelUp,
        NotificationKind::CreditsReceived,
        NotificationKind::SystemAnnouncement,
        NotificationKind::Maintenance,
        NotificationKind::Welcome,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::BetResult => "BET_RESULT",
            NotificationKind::BetCreated => "BET_CREATED",
            NotificationKind::BetDeadline => "BET_DEADLINE",
            NotificationKind::BetCancelled => "BET_CANCELLED",
            NotificationKind::FriendRequest => "FRIEND_REQUEST",
            NotificationKind::FriendRequestAccepted => "FRIEND_REQUEST_ACCEPTED",
            NotificationKind::GroupInvite => "GROUP_INVITE",
            NotificationKind::GroupMemberJoined => "GROUP_MEMBER_JOINED",
            NotificationKind::GroupMemberLeft => "GROUP_MEMBER_LEFT",
            NotificationKind::GroupRoleChanged => "GROUP_ROLE_CHANGED",
            NotificationKind::NewMessage => "NEW_MESSAGE",
            NotificationKind::MessageMention => "MESSAGE_MENTION",
            NotificationKind::MessageReply => "MESSAGE_REPLY",
            NotificationKind::AchievementUnlocked => "ACHIEVEMENT_UNLOCKED",
            NotificationKind::StreakMilestone => "STREAK_MILESTONE",
            NotificationKind::LevelUp => "LEVEL_UP",
            NotificationKind::CreditsReceived => "CREDITS_RECEIVED",
            NotificationKind::SystemAnnouncement => "SYSTEM_ANNOUNCEMENT",
            NotificationKind::Maintenance => "MAINTENANCE",
            NotificationKind::Welcome => "WELCOME",
        }
    }

    /// Case-insensitive lookup accepting `BET_RESULT` and `bet_result` alike
    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value.trim().to_ascii_uppercase();
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == normalized)
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Priority of a notification. High and Urgent override kind-based presentation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "LOW",
            Priority::Normal => "NORMAL",
            Priority::High => "HIGH",
            Priority::Urgent => "URGENT",
        }
    }
}

impl From<&str> for Priority {
    fn from(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Priority::Low,
            "high" => Priority::High,
            "urgent" => Priority::Urgent,
            _ => Priority::Normal, // Default fallback
        }
    }
}

/// A single server-originated notification as held by the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRecord {
    pub id: String,
    pub kind: NotificationKind,
    pub priority: Priority,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_entity_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_url: Option<String>,
}

impl NotificationRecord {
    /// Create an unread, normal-priority record with an empty message
    pub fn new(
        id: impl Into<String>,
        kind: NotificationKind,
        title: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            priority: Priority::Normal,
            title: title.into(),
            message: String::new(),
            is_read: false,
            created_at,
            related_entity_id: None,
            action_url: None,
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_related_entity(mut self, related_entity_id: impl Into<String>) -> Self {
        self.related_entity_id = Some(related_entity_id.into());
        self
    }

    pub fn with_action_url(mut self, action_url: impl Into<String>) -> Self {
        self.action_url = Some(action_url.into());
        self
    }

    pub fn read(mut self) -> Self {
        self.is_read = true;
        self
    }

    pub fn is_friend_request(&self) -> bool {
        self.kind == NotificationKind::FriendRequest
    }

    /// High and Urgent notifications are presented by priority, not by kind
    pub fn is_prominent(&self) -> bool {
        self.priority >= Priority::High
    }
}

/// Identifier as sent on the wire; some endpoints use numbers, others strings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawId {
    Text(String),
    Number(i64),
}

impl RawId {
    fn into_string(self) -> String {
        match self {
            RawId::Text(s) => s,
            RawId::Number(n) => n.to_string(),
        }
    }
}

/// Notification payload as delivered by the pull or push transport.
///
/// Both `type` and `notificationType` may be present. `type` wins when both
/// are set and non-empty; `notificationType` is the fallback.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawNotification {
    pub id: Option<RawId>,
    #[serde(rename = "type")]
    pub type_: Option<String>,
    pub notification_type: Option<String>,
    pub priority: Option<String>,
    pub title: Option<String>,
    pub message: Option<String>,
    pub is_read: Option<bool>,
    pub created_at: Option<String>,
    pub related_entity_id: Option<RawId>,
    pub action_url: Option<String>,
}

impl RawNotification {
    /// Resolve the payload into a record
    pub fn into_record(self) -> SyncResult<NotificationRecord> {
        let id = self
            .id
            .map(RawId::into_string)
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| SyncError::MalformedPayload("notification without id".to_string()))?;

        let type_name = non_empty(self.type_)
            .or_else(|| non_empty(self.notification_type))
            .ok_or_else(|| {
                SyncError::MalformedPayload(format!("notification {} has no type", id))
            })?;

        let kind = match NotificationKind::parse(&type_name) {
            Some(kind) => kind,
            None => {
                tracing::warn!(
                    "Unknown notification type '{}' on {}, treating as announcement",
                    type_name,
                    id
                );
                NotificationKind::SystemAnnouncement
            }
        };

        let created_at = self
            .created_at
            .as_deref()
            .ok_or_else(|| {
                SyncError::MalformedPayload(format!("notification {} has no createdAt", id))
            })
            .and_then(|raw| {
                DateTime::parse_from_rfc3339(raw).map_err(|e| {
                    SyncError::MalformedPayload(format!(
                        "notification {} has invalid createdAt '{}': {}",
                        id, raw, e
                    ))
                })
            })?
            .with_timezone(&Utc);

        Ok(NotificationRecord {
            id,
            kind,
            priority: self.priority.as_deref().map(Priority::from).unwrap_or_default(),
            title: self.title.unwrap_or_default(),
            message: self.message.unwrap_or_default(),
            is_read: self.is_read.unwrap_or(false),
            created_at,
            related_entity_id: self.related_entity_id.map(RawId::into_string),
            action_url: non_empty(self.action_url),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(json: serde_json::Value) -> RawNotification {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_kind_parse_accepts_both_casings() {
        assert_eq!(
            NotificationKind::parse("FRIEND_REQUEST"),
            Some(NotificationKind::FriendRequest)
        );
        assert_eq!(
            NotificationKind::parse("friend_request_accepted"),
            Some(NotificationKind::FriendRequestAccepted)
        );
        assert_eq!(NotificationKind::parse("poke"), None);
    }

    #[test]
    fn test_kind_display_matches_wire_name() {
        for kind in NotificationKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind));
        }
    }

    #[test]
    fn test_priority_ordering() {
        assert!(Priority::Low < Priority::Normal);
        assert!(Priority::High < Priority::Urgent);
        assert_eq!(Priority::from("whatever"), Priority::Normal);
        assert_eq!(Priority::from("Urgent"), Priority::Urgent);
    }

    #[test]
    fn test_type_field_takes_precedence() {
        let record = raw(serde_json::json!({
            "id": 7,
            "type": "FRIEND_REQUEST",
            "notificationType": "NEW_MESSAGE",
            "title": "Friend request",
            "createdAt": "2026-01-13T10:00:00Z",
            "relatedEntityId": 42
        }))
        .into_record()
        .unwrap();

        assert_eq!(record.id, "7");
        assert_eq!(record.kind, NotificationKind::FriendRequest);
        assert_eq!(record.related_entity_id.as_deref(), Some("42"));
        assert_eq!(record.message, "");
        assert_eq!(record.priority, Priority::Normal);
        assert!(!record.is_read);
    }

    #[test]
    fn test_notification_type_fallback() {
        let record = raw(serde_json::json!({
            "id": "n-1",
            "type": "",
            "notificationType": "level_up",
            "createdAt": "2026-01-13T10:00:00+02:00",
            "priority": "HIGH",
            "isRead": true
        }))
        .into_record()
        .unwrap();

        assert_eq!(record.kind, NotificationKind::LevelUp);
        assert!(record.is_prominent());
        assert!(record.is_read);
        assert_eq!(record.created_at.to_rfc3339(), "2026-01-13T08:00:00+00:00");
    }

    #[test]
    fn test_unknown_kind_becomes_announcement() {
        let record = raw(serde_json::json!({
            "id": "n-2",
            "type": "BRAND_NEW_THING",
            "createdAt": "2026-01-13T10:00:00Z"
        }))
        .into_record()
        .unwrap();

        assert_eq!(record.kind, NotificationKind::SystemAnnouncement);
    }

    #[test]
    fn test_missing_fields_are_rejected() {
        let no_id = raw(serde_json::json!({ "type": "WELCOME", "createdAt": "2026-01-13T10:00:00Z" }));
        assert!(matches!(no_id.into_record(), Err(SyncError::MalformedPayload(_))));

        let no_type = raw(serde_json::json!({ "id": 1, "createdAt": "2026-01-13T10:00:00Z" }));
        assert!(matches!(no_type.into_record(), Err(SyncError::MalformedPayload(_))));

        let bad_time = raw(serde_json::json!({ "id": 1, "type": "WELCOME", "createdAt": "yesterday" }));
        let err = bad_time.into_record().unwrap_err();
        assert!(err.to_string().contains("invalid createdAt"));
    }

    #[test]
    fn test_record_serializes_camel_case() {
        let record = NotificationRecord::new(
            "1",
            NotificationKind::Welcome,
            "Welcome!",
            "2026-01-13T10:00:00Z".parse().unwrap(),
        );
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["kind"], "WELCOME");
        assert_eq!(json["isRead"], false);
        assert!(json.get("relatedEntityId").is_none());
    }
}
