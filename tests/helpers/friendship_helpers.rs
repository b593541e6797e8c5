use async_trait::async_trait;
use notisync::domain::ports::{FriendshipResponse, FriendshipService, TransportError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::Semaphore;

/// Friendship service that counts calls and holds every reply until
/// `open` is called
pub struct GatedFriendshipService {
    calls: AtomicUsize,
    gate: Semaphore,
    reply: Mutex<Result<FriendshipResponse, TransportError>>,
}

impl GatedFriendshipService {
    pub fn new(reply: Result<FriendshipResponse, TransportError>) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            gate: Semaphore::new(0),
            reply: Mutex::new(reply),
        }
    }

    pub fn succeeding() -> Self {
        Self::new(Ok(FriendshipResponse::ok("done")))
    }

    pub fn open(&self) {
        self.gate.add_permits(Semaphore::MAX_PERMITS / 2);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub async fn wait_for_calls(&self, count: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.call_count() < count {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("timed out waiting for friendship call");
    }

    async fn reply(&self) -> Result<FriendshipResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let _permit = self
            .gate
            .acquire()
            .await
            .map_err(|_| TransportError::Network("gate closed".to_string()))?;
        self.reply.lock().unwrap().clone()
    }
}

#[async_trait]
impl FriendshipService for GatedFriendshipService {
    async fn accept_request(&self, _friendship_id: &str) -> Result<FriendshipResponse, TransportError> {
        self.reply().await
    }

    async fn reject_request(&self, _friendship_id: &str) -> Result<FriendshipResponse, TransportError> {
        self.reply().await
    }
}
