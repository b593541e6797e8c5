use crate::domain::ports::TransportError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Server reply to a friendship mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FriendshipResponse {
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

impl FriendshipResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Friendship mutations triggered from friend-request notifications
#[async_trait]
pub trait FriendshipService: Send + Sync {
    async fn accept_request(&self, friendship_id: &str) -> Result<FriendshipResponse, TransportError>;

    async fn reject_request(&self, friendship_id: &str) -> Result<FriendshipResponse, TransportError>;
}
