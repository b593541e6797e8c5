use crate::domain::{SyncError, SyncResult};
use crate::models::{NotificationRecord, RawNotification};
use crate::services::SyncController;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Applies notifications delivered by the live push channel.
///
/// Connection handling belongs to the transport; this only consumes
/// already-received payloads, in the order they arrive. Duplicates and
/// events for records already loaded through pagination are no-ops.
#[derive(Clone)]
pub struct PushIngestor {
    controller: SyncController,
}

impl PushIngestor {
    pub fn new(controller: SyncController) -> Self {
        Self { controller }
    }

    /// Apply one pushed record. Returns whether it was new.
    pub async fn on_event(&self, record: NotificationRecord) -> bool {
        self.controller.add_notification(record).await
    }

    /// Resolve a raw payload and apply it
    pub async fn on_payload(&self, payload: RawNotification) -> SyncResult<bool> {
        let record = payload.into_record()?;
        Ok(self.on_event(record).await)
    }

    /// Decode a JSON push frame and apply it
    pub async fn on_json(&self, frame: &str) -> SyncResult<bool> {
        let payload: RawNotification = serde_json::from_str(frame)
            .map_err(|e| SyncError::MalformedPayload(format!("invalid push frame: {}", e)))?;
        self.on_payload(payload).await
    }

    /// Consume payloads from the transport's channel on a background task
    /// until the sender side is dropped. Malformed payloads are logged and
    /// skipped.
    pub fn spawn(self, mut rx: mpsc::Receiver<RawNotification>) -> JoinHandle<usize> {
        tokio::spawn(async move {
            let mut applied = 0usize;
            while let Some(payload) = rx.recv().await {
                match self.on_payload(payload).await {
                    Ok(true) => applied += 1,
                    Ok(false) => {}
                    Err(e) => tracing::warn!("Dropping push event: {}", e),
                }
            }
            tracing::info!("Push channel closed after {} new notifications", applied);
            applied
        })
    }
}
