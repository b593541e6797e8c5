use crate::domain::ports::{
    FriendshipResponse, FriendshipService, NotificationPage, NotificationTransport, TransportError,
};
use crate::models::NotificationRecord;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Notification backend held in memory. Pages are served newest first and
/// the cursor token is the offset of the next page.
pub struct InMemoryNotificationTransport {
    records: Arc<Mutex<Vec<NotificationRecord>>>,
    fetch_calls: Arc<Mutex<Vec<Option<String>>>>,
    mark_read_calls: Arc<Mutex<Vec<String>>>,
    mark_all_calls: Arc<Mutex<usize>>,
    fail_mutations: AtomicBool,
}

impl InMemoryNotificationTransport {
    pub fn new() -> Self {
        Self::with_records(Vec::new())
    }

    pub fn with_records(mut records: Vec<NotificationRecord>) -> Self {
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Self {
            records: Arc::new(Mutex::new(records)),
            fetch_calls: Arc::new(Mutex::new(Vec::new())),
            mark_read_calls: Arc::new(Mutex::new(Vec::new())),
            mark_all_calls: Arc::new(Mutex::new(0)),
            fail_mutations: AtomicBool::new(false),
        }
    }

    /// Add a record on the server side, as if it had just been created
    pub async fn insert(&self, record: NotificationRecord) {
        let mut records = self.records.lock().await;
        let position = records
            .iter()
            .position(|r| r.created_at <= record.created_at)
            .unwrap_or(records.len());
        records.insert(position, record);
    }

    /// Make mark-read and mark-all-read calls fail with a server error
    pub fn fail_mutations(&self, fail: bool) {
        self.fail_mutations.store(fail, Ordering::SeqCst);
    }

    /// Cursor tokens of every fetch, in call order
    pub async fn fetch_calls(&self) -> Vec<Option<String>> {
        self.fetch_calls.lock().await.clone()
    }

    pub async fn mark_read_calls(&self) -> Vec<String> {
        self.mark_read_calls.lock().await.clone()
    }

    pub async fn mark_all_calls(&self) -> usize {
        *self.mark_all_calls.lock().await
    }

    pub async fn is_read_on_server(&self, id: &str) -> Option<bool> {
        let records = self.records.lock().await;
        records.iter().find(|r| r.id == id).map(|r| r.is_read)
    }

    fn check_mutation(&self) -> Result<(), TransportError> {
        if self.fail_mutations.load(Ordering::SeqCst) {
            Err(TransportError::Server {
                status: 503,
                message: "Service unavailable".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

impl Default for InMemoryNotificationTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotificationTransport for InMemoryNotificationTransport {
    async fn fetch_page(
        &self,
        cursor_token: Option<&str>,
        limit: u32,
    ) -> Result<NotificationPage, TransportError> {
        self.fetch_calls
            .lock()
            .await
            .push(cursor_token.map(str::to_owned));

        let offset = match cursor_token {
            None => 0,
            Some(token) => token.parse::<usize>().map_err(|_| TransportError::Server {
                status: 400,
                message: format!("Invalid cursor token '{}'", token),
            })?,
        };

        let records = self.records.lock().await;
        let end = records.len().min(offset + limit as usize);
        let page: Vec<NotificationRecord> = records.get(offset..end).unwrap_or_default().to_vec();
        let has_more = end < records.len();

        Ok(NotificationPage {
            records: page,
            next_token: has_more.then(|| end.to_string()),
            has_more,
        })
    }

    async fn mark_read(&self, notification_id: &str) -> Result<(), TransportError> {
        self.mark_read_calls
            .lock()
            .await
            .push(notification_id.to_string());
        self.check_mutation()?;

        let mut records = self.records.lock().await;
        if let Some(record) = records.iter_mut().find(|r| r.id == notification_id) {
            record.is_read = true;
        }
        Ok(())
    }

    async fn mark_all_read(&self) -> Result<(), TransportError> {
        *self.mark_all_calls.lock().await += 1;
        self.check_mutation()?;

        let mut records = self.records.lock().await;
        for record in records.iter_mut() {
            record.is_read = true;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FriendshipStatus {
    Pending,
    Accepted,
    Rejected,
}

/// Friendship backend held in memory
pub struct InMemoryFriendshipService {
    friendships: Arc<Mutex<HashMap<String, FriendshipStatus>>>,
    calls: Arc<Mutex<Vec<(String, bool)>>>,
}

impl InMemoryFriendshipService {
    pub fn new() -> Self {
        Self {
            friendships: Arc::new(Mutex::new(HashMap::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Register a pending friend request
    pub async fn add_pending(&self, friendship_id: &str) {
        self.friendships
            .lock()
            .await
            .insert(friendship_id.to_string(), FriendshipStatus::Pending);
    }

    pub async fn status(&self, friendship_id: &str) -> Option<FriendshipStatus> {
        self.friendships.lock().await.get(friendship_id).copied()
    }

    /// Every mutation received as (friendship id, accepted)
    pub async fn calls(&self) -> Vec<(String, bool)> {
        self.calls.lock().await.clone()
    }

    async fn resolve(&self, friendship_id: &str, accept: bool) -> FriendshipResponse {
        self.calls
            .lock()
            .await
            .push((friendship_id.to_string(), accept));

        let mut friendships = self.friendships.lock().await;
        match friendships.get_mut(friendship_id) {
            Some(status) if *status == FriendshipStatus::Pending => {
                if accept {
                    *status = FriendshipStatus::Accepted;
                    FriendshipResponse::ok("Friend request accepted")
                } else {
                    *status = FriendshipStatus::Rejected;
                    FriendshipResponse::ok("Friend request rejected")
                }
            }
            Some(_) => FriendshipResponse::rejected("Friend request already handled"),
            None => FriendshipResponse::rejected("Friend request not found"),
        }
    }
}

impl Default for InMemoryFriendshipService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FriendshipService for InMemoryFriendshipService {
    async fn accept_request(&self, friendship_id: &str) -> Result<FriendshipResponse, TransportError> {
        Ok(self.resolve(friendship_id, true).await)
    }

    async fn reject_request(&self, friendship_id: &str) -> Result<FriendshipResponse, TransportError> {
        Ok(self.resolve(friendship_id, false).await)
    }
}
