use crate::models::NotificationRecord;
use async_trait::async_trait;
use thiserror::Error;

/// Error returned by the transport collaborators. Timeouts are owned by the
/// transport and reported here like any other failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),
    #[error("request timed out")]
    Timeout,
    #[error("server returned {status}: {message}")]
    Server { status: u16, message: String },
    #[error("could not decode response: {0}")]
    Decode(String),
}

/// One page of the pull feed, newest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotificationPage {
    pub records: Vec<NotificationRecord>,
    pub next_token: Option<String>,
    pub has_more: bool,
}

/// Pull side of the notification backend
#[async_trait]
pub trait NotificationTransport: Send + Sync {
    /// Fetch a page of notifications. `None` requests the first page.
    async fn fetch_page(
        &self,
        cursor_token: Option<&str>,
        limit: u32,
    ) -> Result<NotificationPage, TransportError>;

    /// Mark a single notification as read on the server
    async fn mark_read(&self, notification_id: &str) -> Result<(), TransportError>;

    /// Mark every notification of the session user as read on the server
    async fn mark_all_read(&self) -> Result<(), TransportError>;
}
