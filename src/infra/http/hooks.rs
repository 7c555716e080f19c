use axum::{Extension, Json, http::StatusCode};
use serde::Serialize;
use uuid::Uuid;

use crate::cache::{CacheWorker, LifecycleEvent};

#[derive(Debug, Serialize)]
pub struct EventAccepted {
    pub id: Uuid,
    pub epoch: u64,
    pub event: &'static str,
}

/// Accept a lifecycle event from the host and dispatch it.
pub async fn publish_event(
    Extension(worker): Extension<CacheWorker>,
    Json(event): Json<LifecycleEvent>,
) -> (StatusCode, Json<EventAccepted>) {
    let delivered = worker.events.publish(event).await;
    (
        StatusCode::ACCEPTED,
        Json(EventAccepted {
            id: delivered.id,
            epoch: delivered.epoch,
            event: delivered.kind.label(),
        }),
    )
}
