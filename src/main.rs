use chrono::{Duration, Utc};
use notisync::config::SyncConfig;
use notisync::infrastructure::in_memory::{InMemoryFriendshipService, InMemoryNotificationTransport};
use notisync::infrastructure::observability;
use notisync::{
    FriendRequestActionCoordinator, NotificationKind, NotificationRecord, Priority, PushIngestor,
    RawNotification, SyncController,
};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Replays a small notification session against the in-memory backends and
/// prints the resulting feed.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = SyncConfig::from_env()?;
    if let Err(e) = observability::init_tracing(&config) {
        eprintln!("tracing already initialised: {}", e);
    }
    tracing::info!("Configuration loaded (page size {})", config.page_size);

    let now = Utc::now();
    let mut seed: Vec<NotificationRecord> = (0..(config.page_size as i64 * 2 + 3))
        .map(|i| {
            NotificationRecord::new(
                uuid::Uuid::new_v4().to_string(),
                NotificationKind::BetResult,
                format!("Bet #{} settled", i),
                now - Duration::hours(i * 7),
            )
        })
        .collect();
    seed.push(
        NotificationRecord::new(
            "friend-request-1",
            NotificationKind::FriendRequest,
            "Sam wants to be your friend",
            now - Duration::minutes(5),
        )
        .with_related_entity("friendship-42"),
    );

    let transport = Arc::new(InMemoryNotificationTransport::with_records(seed));
    let friendships = Arc::new(InMemoryFriendshipService::new());
    friendships.add_pending("friendship-42").await;

    let controller = SyncController::new(transport.clone(), &config);
    let coordinator = FriendRequestActionCoordinator::new(controller.clone(), friendships);

    let (push_tx, push_rx) = mpsc::channel(config.push_buffer);
    let push_task = PushIngestor::new(controller.clone()).spawn(push_rx);

    controller.refresh().await?;
    while controller.view().await.has_more {
        controller.load_more().await?;
    }
    tracing::info!("Unread after full sync: {}", controller.unread_count());

    let payload: RawNotification = serde_json::from_value(serde_json::json!({
        "id": "push-1",
        "notificationType": "SYSTEM_ANNOUNCEMENT",
        "priority": Priority::Urgent.as_str(),
        "title": "Scheduled maintenance tonight",
        "createdAt": Utc::now().to_rfc3339(),
    }))?;
    push_tx.send(payload).await?;
    drop(push_tx);
    push_task.await?;

    if let Some(request) = controller.get("friend-request-1").await {
        let response = coordinator.accept(&request).await?;
        tracing::info!("{}", response.message);
    }

    controller.set_filter(true).await;
    let view = controller.view().await;
    for (bucket, records) in view.grouped(Utc::now()) {
        println!("== {} ==", bucket.label());
        for record in records {
            let marker = if record.is_prominent() { "!" } else { " " };
            println!("{} [{}] {}", marker, record.kind, record.title);
        }
    }
    println!("unread: {}", view.unread_count);

    controller.mark_all_as_read().await;
    println!("unread after mark all: {}", controller.unread_count());

    Ok(())
}
