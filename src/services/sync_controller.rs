use crate::config::SyncConfig;
use crate::domain::ports::NotificationTransport;
use crate::domain::{SyncError, SyncResult};
use crate::events::{EventBus, SyncEvent};
use crate::models::{NotificationFilter, NotificationRecord, NotificationView};
use crate::services::{CursorState, NotificationStore, PaginationCursor, Placement, UnreadCounter};
use futures::Stream;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{broadcast, watch, Mutex};

/// Result of a pull fetch issued by `refresh` or `load_more`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The page was merged into the store
    Applied { inserted: usize, has_more: bool },
    /// Nothing was fetched: pagination exhausted or another fetch in flight
    Skipped,
    /// The page arrived after a newer refresh and was dropped
    Discarded,
}

struct SyncState {
    store: NotificationStore,
    cursor: PaginationCursor,
    filter: NotificationFilter,
    /// Bumped by every refresh and session teardown
    generation: u64,
    refreshing: bool,
    /// Generation the in-flight load_more was issued under
    load_more_in_flight: Option<u64>,
    /// Ids pushed while a refresh is in flight. Their current local copies
    /// are re-applied on top of the refreshed window so they are not lost.
    pushed_during_refresh: Vec<String>,
    /// Friend requests consumed this session; never re-inserted
    resolved: HashSet<String>,
}

impl SyncState {
    fn view(&self) -> NotificationView {
        NotificationView {
            notifications: self.store.snapshot(self.filter),
            unread_count: self.store.unread_count(),
            filter: self.filter,
            has_more: self.cursor.has_more(),
            is_refreshing: self.refreshing,
            is_loading_more: self.load_more_in_flight.is_some(),
        }
    }

    fn without_resolved(&self, records: Vec<NotificationRecord>) -> Vec<NotificationRecord> {
        if self.resolved.is_empty() {
            return records;
        }
        records
            .into_iter()
            .filter(|r| !self.resolved.contains(&r.id))
            .collect()
    }
}

#[derive(Debug, Clone, Copy)]
enum FetchKind {
    Refresh,
    LoadMore,
}

/// Releases a single-flight flag when the fetch holding it is dropped
/// before it gets to apply its result.
struct FetchGuard {
    controller: Option<SyncController>,
    kind: FetchKind,
    generation: u64,
}

impl FetchGuard {
    fn new(controller: &SyncController, kind: FetchKind, generation: u64) -> Self {
        Self {
            controller: Some(controller.clone()),
            kind,
            generation,
        }
    }

    /// The fetch reached its apply step and clears its own flag
    fn disarm(mut self) {
        self.controller = None;
    }
}

impl Drop for FetchGuard {
    fn drop(&mut self) {
        let Some(controller) = self.controller.take() else {
            return;
        };
        let (kind, generation) = (self.kind, self.generation);

        if let Ok(mut state) = controller.state.try_lock() {
            controller.release_abandoned(&mut state, kind, generation);
            return;
        }
        // Contended: finish on the runtime once the lock frees up
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                let mut state = controller.state.lock().await;
                controller.release_abandoned(&mut state, kind, generation);
            });
        } else {
            tracing::warn!("{:?} fetch dropped outside a runtime, flag left set", kind);
        }
    }
}

/// Orchestrates pull, push and user mutations over a single notification
/// store.
///
/// All state lives behind one mutex and every mutation goes through it, so
/// the store has a single writer. The lock is never held across a transport
/// call: each operation takes it to stage the request, releases it for the
/// network round trip and takes it again to apply the result.
#[derive(Clone)]
pub struct SyncController {
    state: Arc<Mutex<SyncState>>,
    transport: Arc<dyn NotificationTransport>,
    events: EventBus,
    view_tx: Arc<watch::Sender<NotificationView>>,
    unread: UnreadCounter,
    page_size: u32,
}

impl SyncController {
    pub fn new(transport: Arc<dyn NotificationTransport>, config: &SyncConfig) -> Self {
        let store = NotificationStore::new();
        let unread = store.unread_counter();
        let state = SyncState {
            store,
            cursor: PaginationCursor::new(),
            filter: NotificationFilter::All,
            generation: 0,
            refreshing: false,
            load_more_in_flight: None,
            pushed_during_refresh: Vec::new(),
            resolved: HashSet::new(),
        };
        let (view_tx, _) = watch::channel(state.view());

        Self {
            state: Arc::new(Mutex::new(state)),
            transport,
            events: EventBus::new(config.event_capacity),
            view_tx: Arc::new(view_tx),
            unread,
            page_size: config.page_size,
        }
    }

    fn publish_view(&self, state: &SyncState) {
        self.view_tx.send_replace(state.view());
    }

    /// Clear the flag of a fetch whose future was dropped mid-flight. A flag
    /// already taken over by a newer generation is left alone.
    fn release_abandoned(&self, state: &mut SyncState, kind: FetchKind, generation: u64) {
        let released = match kind {
            FetchKind::Refresh if state.refreshing && state.generation == generation => {
                state.refreshing = false;
                state.pushed_during_refresh.clear();
                true
            }
            FetchKind::LoadMore if state.load_more_in_flight == Some(generation) => {
                state.load_more_in_flight = None;
                true
            }
            _ => false,
        };
        if released {
            tracing::debug!("{:?} fetch for generation {} abandoned", kind, generation);
            self.publish_view(state);
        }
    }

    /// Reload the first page, replacing the loaded window.
    ///
    /// A later refresh supersedes an earlier one: when a result arrives
    /// whose generation is no longer current it is dropped and
    /// `FetchOutcome::Discarded` is returned. The cursor only moves back to
    /// the first page once the new page is in hand, so a failed refresh
    /// leaves pagination where it was.
    pub async fn refresh(&self) -> SyncResult<FetchOutcome> {
        let generation = {
            let mut state = self.state.lock().await;
            state.generation += 1;
            state.refreshing = true;
            state.pushed_during_refresh.clear();
            self.publish_view(&state);
            state.generation
        };
        let guard = FetchGuard::new(self, FetchKind::Refresh, generation);
        tracing::debug!("Refreshing notifications (generation {})", generation);

        let result = self.transport.fetch_page(None, self.page_size).await;

        let mut state = self.state.lock().await;
        guard.disarm();
        if state.generation != generation {
            tracing::debug!(
                "Discarding refresh generation {} (current {})",
                generation,
                state.generation
            );
            metrics::counter!("notisync_stale_results_discarded_total").increment(1);
            self.events.publish(SyncEvent::RefreshDiscarded { generation });
            return Ok(FetchOutcome::Discarded);
        }
        state.refreshing = false;

        let page = match result {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!("Refresh failed: {}", e);
                metrics::counter!("notisync_fetch_failures_total").increment(1);
                state.pushed_during_refresh.clear();
                self.publish_view(&state);
                return Err(SyncError::FetchFailed(e.to_string()));
            }
        };

        // Local copies carry any read transition made since the push arrived
        let pushed: Vec<NotificationRecord> = std::mem::take(&mut state.pushed_during_refresh)
            .iter()
            .filter_map(|id| state.store.get(id).cloned())
            .collect();
        let records = state.without_resolved(page.records);
        let outcome = state.store.replace_window(records);
        if !pushed.is_empty() {
            state.store.merge(pushed, Placement::Prepend);
        }
        state.cursor.reset();
        state.cursor.advance(page.next_token, page.has_more);

        let has_more = state.cursor.has_more();
        let count = state.store.len();
        tracing::info!(
            "Refreshed notifications: {} loaded, {} unread, more: {}",
            count,
            state.store.unread_count(),
            has_more
        );
        self.publish_view(&state);
        self.events.publish(SyncEvent::Refreshed {
            generation,
            count,
            has_more,
        });

        Ok(FetchOutcome::Applied {
            inserted: outcome.inserted.len(),
            has_more,
        })
    }

    /// Fetch the next older page. A no-op when pagination is exhausted or
    /// a refresh or another load is already in flight.
    pub async fn load_more(&self) -> SyncResult<FetchOutcome> {
        let (generation, token) = {
            let mut state = self.state.lock().await;
            if state.refreshing || state.load_more_in_flight.is_some() {
                tracing::debug!("load_more skipped, fetch already in flight");
                return Ok(FetchOutcome::Skipped);
            }
            if !state.cursor.has_more() {
                tracing::debug!("load_more skipped, no more pages");
                return Ok(FetchOutcome::Skipped);
            }
            state.load_more_in_flight = Some(state.generation);
            self.publish_view(&state);
            (
                state.generation,
                state.cursor.next_page_token().map(str::to_owned),
            )
        };
        let guard = FetchGuard::new(self, FetchKind::LoadMore, generation);

        let result = self
            .transport
            .fetch_page(token.as_deref(), self.page_size)
            .await;

        let mut state = self.state.lock().await;
        guard.disarm();
        if state.load_more_in_flight == Some(generation) {
            state.load_more_in_flight = None;
        }
        if state.generation != generation {
            tracing::debug!(
                "Discarding page for token {:?}, superseded by generation {}",
                token,
                state.generation
            );
            metrics::counter!("notisync_stale_results_discarded_total").increment(1);
            self.publish_view(&state);
            return Ok(FetchOutcome::Discarded);
        }

        let page = match result {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!("Loading more notifications failed: {}", e);
                metrics::counter!("notisync_fetch_failures_total").increment(1);
                self.publish_view(&state);
                return Err(SyncError::FetchFailed(e.to_string()));
            }
        };

        let records = state.without_resolved(page.records);
        let outcome = state.store.merge(records, Placement::AppendOlder);
        state.cursor.advance(page.next_token, page.has_more);

        let inserted = outcome.inserted.len();
        let has_more = state.cursor.has_more();
        tracing::info!(
            "Loaded page {}: {} new, {} duplicates, more: {}",
            state.cursor.pages_loaded(),
            inserted,
            outcome.duplicates,
            has_more
        );
        self.publish_view(&state);
        self.events.publish(SyncEvent::PageLoaded { inserted, has_more });

        Ok(FetchOutcome::Applied { inserted, has_more })
    }

    /// Mark one notification read.
    ///
    /// The local transition is applied first and kept even if the server
    /// call fails; read state is a best-effort preference, so the failure
    /// is only logged. Returns whether the record changed locally.
    pub async fn mark_as_read(&self, id: &str) -> bool {
        let changed = {
            let mut state = self.state.lock().await;
            let changed = state.store.apply_read_transition(id);
            if changed {
                self.publish_view(&state);
                self.events.publish(SyncEvent::NotificationRead { id: id.to_string() });
            }
            changed
        };

        if changed {
            if let Err(e) = self.transport.mark_read(id).await {
                tracing::warn!("Failed to mark notification {} read on server: {}", id, e);
                metrics::counter!("notisync_mark_read_failures_total").increment(1);
            }
        }
        changed
    }

    /// Mark every loaded notification read, then tell the server.
    ///
    /// The server call is made even when nothing loaded was unread, since
    /// unread records may exist beyond the loaded window. Failures are
    /// logged and the local state is kept. Returns how many loaded records
    /// changed.
    pub async fn mark_all_as_read(&self) -> usize {
        let count = {
            let mut state = self.state.lock().await;
            let count = state.store.apply_read_all_transition();
            self.publish_view(&state);
            self.events.publish(SyncEvent::AllRead { count });
            count
        };

        if let Err(e) = self.transport.mark_all_read().await {
            tracing::warn!("Failed to mark all notifications read on server: {}", e);
            metrics::counter!("notisync_mark_read_failures_total").increment(1);
        }
        count
    }

    /// Switch the view between all and unread-only. Does not refetch.
    pub async fn set_filter(&self, unread_only: bool) {
        let mut state = self.state.lock().await;
        let filter = NotificationFilter::from_unread_only(unread_only);
        if state.filter != filter {
            state.filter = filter;
            self.publish_view(&state);
        }
    }

    /// Insert a single notification at the front. Shared by push ingestion
    /// and any other live source. Returns whether it was new.
    pub async fn add_notification(&self, record: NotificationRecord) -> bool {
        let mut state = self.state.lock().await;
        if state.resolved.contains(&record.id) {
            tracing::debug!("Ignoring already resolved notification {}", record.id);
            return false;
        }

        let id = record.id.clone();
        let kind = record.kind;
        let priority = record.priority;
        let pending = state.refreshing.then(|| id.clone());

        let outcome = state.store.merge(vec![record], Placement::Prepend);
        if outcome.inserted.is_empty() {
            return false;
        }
        if let Some(id) = pending {
            state.pushed_during_refresh.push(id);
        }

        tracing::debug!("Notification {} ({}) added", id, kind);
        self.publish_view(&state);
        self.events.publish(SyncEvent::NotificationReceived { id, kind, priority });
        true
    }

    /// Consume a friend-request notification: mark it read, drop it from the
    /// store and keep it from coming back through later pages or pushes.
    pub(crate) async fn resolve_notification(&self, id: &str, accepted: bool) -> Option<NotificationRecord> {
        let mut state = self.state.lock().await;
        state.store.apply_read_transition(id);
        let removed = state.store.remove(id);
        state.resolved.insert(id.to_string());
        state.pushed_during_refresh.retain(|pushed| pushed != id);

        self.publish_view(&state);
        if removed.is_some() {
            self.events.publish(SyncEvent::NotificationRemoved { id: id.to_string() });
        }
        self.events.publish(SyncEvent::FriendRequestResolved {
            id: id.to_string(),
            accepted,
        });
        removed
    }

    /// Drop all session state. In-flight fetches are discarded on arrival.
    pub async fn clear_session(&self) {
        let mut state = self.state.lock().await;
        state.generation += 1;
        state.refreshing = false;
        state.load_more_in_flight = None;
        state.pushed_during_refresh.clear();
        state.resolved.clear();
        state.store.clear();
        state.cursor.reset();
        state.filter = NotificationFilter::All;
        tracing::info!("Notification session cleared");
        self.publish_view(&state);
        self.events.publish(SyncEvent::SessionCleared);
    }

    pub async fn snapshot(&self, filter: NotificationFilter) -> Vec<NotificationRecord> {
        self.state.lock().await.store.snapshot(filter)
    }

    /// Current view with the active filter applied
    pub async fn view(&self) -> NotificationView {
        self.state.lock().await.view()
    }

    pub async fn get(&self, id: &str) -> Option<NotificationRecord> {
        self.state.lock().await.store.get(id).cloned()
    }

    pub async fn cursor_state(&self) -> CursorState {
        self.state.lock().await.cursor.state()
    }

    pub fn unread_count(&self) -> usize {
        self.unread.value()
    }

    /// Read handle onto the shared unread count
    pub fn unread_counter(&self) -> UnreadCounter {
        self.unread.clone()
    }

    /// Receiver that always holds the latest view
    pub fn subscribe(&self) -> watch::Receiver<NotificationView> {
        self.view_tx.subscribe()
    }

    pub fn events(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    /// Sync events as a stream; lagging subscribers skip what they missed
    pub fn event_stream(&self) -> impl Stream<Item = SyncEvent> + Send + 'static {
        self.events.stream()
    }
}
