use async_trait::async_trait;
use notisync::domain::ports::{NotificationPage, NotificationTransport, TransportError};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::oneshot;

type FetchResult = Result<NotificationPage, TransportError>;

struct PendingFetch {
    token: Option<String>,
    responder: Option<oneshot::Sender<FetchResult>>,
}

/// Transport whose fetches block until the test answers them, so the
/// completion order of concurrent fetches is under the test's control.
pub struct ScriptedTransport {
    fetches: Mutex<Vec<PendingFetch>>,
    mark_read_calls: Mutex<Vec<String>>,
    mark_all_calls: AtomicUsize,
    fail_mutations: AtomicBool,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self {
            fetches: Mutex::new(Vec::new()),
            mark_read_calls: Mutex::new(Vec::new()),
            mark_all_calls: AtomicUsize::new(0),
            fail_mutations: AtomicBool::new(false),
        }
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.lock().unwrap().len()
    }

    pub fn fetch_tokens(&self) -> Vec<Option<String>> {
        self.fetches.lock().unwrap().iter().map(|f| f.token.clone()).collect()
    }

    /// Yield until at least `count` fetches have been issued
    pub async fn wait_for_fetches(&self, count: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.fetch_count() < count {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("timed out waiting for fetch");
    }

    /// Complete the fetch issued at `index` (0-based, in issue order)
    pub fn respond(&self, index: usize, result: FetchResult) {
        let responder = self.fetches.lock().unwrap()[index]
            .responder
            .take()
            .expect("fetch already answered");
        let _ = responder.send(result);
    }

    pub fn fail_mutations(&self, fail: bool) {
        self.fail_mutations.store(fail, Ordering::SeqCst);
    }

    pub fn mark_read_calls(&self) -> Vec<String> {
        self.mark_read_calls.lock().unwrap().clone()
    }

    pub fn mark_all_calls(&self) -> usize {
        self.mark_all_calls.load(Ordering::SeqCst)
    }

    fn mutation_result(&self) -> Result<(), TransportError> {
        if self.fail_mutations.load(Ordering::SeqCst) {
            Err(TransportError::Network("connection reset".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl NotificationTransport for ScriptedTransport {
    async fn fetch_page(&self, cursor_token: Option<&str>, _limit: u32) -> FetchResult {
        let (tx, rx) = oneshot::channel();
        self.fetches.lock().unwrap().push(PendingFetch {
            token: cursor_token.map(str::to_owned),
            responder: Some(tx),
        });
        rx.await
            .unwrap_or_else(|_| Err(TransportError::Network("fetch abandoned".to_string())))
    }

    async fn mark_read(&self, notification_id: &str) -> Result<(), TransportError> {
        self.mark_read_calls.lock().unwrap().push(notification_id.to_string());
        self.mutation_result()
    }

    async fn mark_all_read(&self) -> Result<(), TransportError> {
        self.mark_all_calls.fetch_add(1, Ordering::SeqCst);
        self.mutation_result()
    }
}
