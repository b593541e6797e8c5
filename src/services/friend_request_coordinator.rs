use crate::domain::ports::{FriendshipResponse, FriendshipService};
use crate::domain::{SyncError, SyncResult};
use crate::models::{NotificationKind, NotificationRecord};
use crate::services::SyncController;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FriendRequestAction {
    Accept,
    Reject,
}

impl FriendRequestAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            FriendRequestAction::Accept => "accept",
            FriendRequestAction::Reject => "reject",
        }
    }
}

type InFlight = Arc<Mutex<HashSet<String>>>;

fn lock(in_flight: &InFlight) -> MutexGuard<'_, HashSet<String>> {
    // The set stays consistent even if a holder panicked
    in_flight.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Marks a notification id as in flight for as long as it lives
struct InFlightGuard {
    in_flight: InFlight,
    id: String,
}

impl InFlightGuard {
    fn acquire(in_flight: &InFlight, id: &str) -> SyncResult<Self> {
        if !lock(in_flight).insert(id.to_string()) {
            return Err(SyncError::AlreadyProcessing(id.to_string()));
        }
        Ok(Self {
            in_flight: in_flight.clone(),
            id: id.to_string(),
        })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        lock(&self.in_flight).remove(&self.id);
    }
}

/// Accepts or rejects the friend request behind a FriendRequest
/// notification and consumes the notification on success.
///
/// The notification's `related_entity_id` is taken to be the friendship id.
/// At most one action per notification id may be in flight.
#[derive(Clone)]
pub struct FriendRequestActionCoordinator {
    controller: SyncController,
    friendships: Arc<dyn FriendshipService>,
    in_flight: InFlight,
}

impl FriendRequestActionCoordinator {
    pub fn new(controller: SyncController, friendships: Arc<dyn FriendshipService>) -> Self {
        Self {
            controller,
            friendships,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub async fn accept(&self, notification: &NotificationRecord) -> SyncResult<FriendshipResponse> {
        self.resolve(notification, FriendRequestAction::Accept).await
    }

    pub async fn reject(&self, notification: &NotificationRecord) -> SyncResult<FriendshipResponse> {
        self.resolve(notification, FriendRequestAction::Reject).await
    }

    /// Whether an accept or reject is currently running for this id
    pub fn is_processing(&self, notification_id: &str) -> bool {
        lock(&self.in_flight).contains(notification_id)
    }

    async fn resolve(
        &self,
        notification: &NotificationRecord,
        action: FriendRequestAction,
    ) -> SyncResult<FriendshipResponse> {
        let friendship_id = friendship_id_of(notification)?;
        let _guard = InFlightGuard::acquire(&self.in_flight, &notification.id)?;

        tracing::debug!(
            "Sending {} for friendship {} (notification {})",
            action.as_str(),
            friendship_id,
            notification.id
        );

        let result = match action {
            FriendRequestAction::Accept => self.friendships.accept_request(friendship_id).await,
            FriendRequestAction::Reject => self.friendships.reject_request(friendship_id).await,
        };

        match result {
            Ok(response) if response.success => {
                self.controller
                    .resolve_notification(&notification.id, action == FriendRequestAction::Accept)
                    .await;
                tracing::info!(
                    "Friend request {} {}ed, notification {} consumed",
                    friendship_id,
                    action.as_str(),
                    notification.id
                );
                Ok(response)
            }
            Ok(response) => {
                let message = if response.message.is_empty() {
                    format!("server refused to {} friend request", action.as_str())
                } else {
                    response.message
                };
                tracing::warn!("Friend request {} not {}ed: {}", friendship_id, action.as_str(), message);
                Err(SyncError::RemoteMutationFailed(message))
            }
            Err(e) => {
                tracing::warn!(
                    "Friend request {} {} failed: {}",
                    friendship_id,
                    action.as_str(),
                    e
                );
                Err(SyncError::RemoteMutationFailed(e.to_string()))
            }
        }
    }
}

fn friendship_id_of(notification: &NotificationRecord) -> SyncResult<&str> {
    if notification.kind != NotificationKind::FriendRequest {
        return Err(SyncError::InvalidOperation(format!(
            "notification {} is {}, not a friend request",
            notification.id, notification.kind
        )));
    }
    notification
        .related_entity_id
        .as_deref()
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| {
            SyncError::InvalidOperation(format!(
                "friend request notification {} has no friendship id",
                notification.id
            ))
        })
}
