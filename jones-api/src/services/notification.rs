use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use jones_shared::errors::{AppError, AppResult};

use crate::models::{Notification, Reaction};
use crate::repositories::NotificationRepository;

pub const MATCH_MESSAGE: &str = "Congratulations! You matched";

/// One recipient's match notification, queued for the background worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchNotice {
    pub recipient_id: Uuid,
    pub matched_user_id: Uuid,
}

#[derive(Debug, Serialize)]
struct MatchPayload<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    recipient_user_id: Uuid,
    matched_user_id: Uuid,
    message: &'a str,
}

/// Hands match notices to a worker task that outlives the request which
/// produced them. Enqueueing never blocks and never fails the caller.
#[derive(Clone)]
pub struct NotificationDispatcher {
    tx: mpsc::UnboundedSender<MatchNotice>,
}

impl NotificationDispatcher {
    /// Start the worker. It stops once every dispatcher clone is dropped.
    pub fn spawn(repo: Arc<dyn NotificationRepository>) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run_worker(repo, rx));
        (Self { tx }, worker)
    }

    /// Notify the owner of `reaction` that they matched its target.
    pub fn match_found(&self, reaction: &Reaction) {
        let notice = MatchNotice {
            recipient_id: reaction.user_id,
            matched_user_id: reaction.matched_user_id,
        };
        if let Err(e) = self.tx.send(notice) {
            tracing::error!(recipient_id = %e.0.recipient_id, "notification worker has stopped, dropping notice");
            metrics::counter!("notifications_failed_total").increment(1);
        }
    }
}

async fn run_worker(repo: Arc<dyn NotificationRepository>, mut rx: mpsc::UnboundedReceiver<MatchNotice>) {
    while let Some(notice) = rx.recv().await {
        let repo = repo.clone();
        let recipient_id = notice.recipient_id;
        let result = tokio::task::spawn_blocking(move || deliver(repo.as_ref(), &notice)).await;

        match result {
            Ok(Ok(())) => tracing::debug!(%recipient_id, "match notification stored"),
            Ok(Err(e)) => {
                tracing::error!(%recipient_id, error = %e, "failed to store match notification");
                metrics::counter!("notifications_failed_total").increment(1);
            }
            Err(e) => {
                tracing::error!(%recipient_id, error = %e, "notification task panicked");
                metrics::counter!("notifications_failed_total").increment(1);
            }
        }
    }
    tracing::info!("notification worker stopped");
}

/// Build the payload for one recipient and persist it.
pub fn deliver(repo: &dyn NotificationRepository, notice: &MatchNotice) -> AppResult<()> {
    let payload = MatchPayload {
        kind: "match",
        recipient_user_id: notice.recipient_id,
        matched_user_id: notice.matched_user_id,
        message: MATCH_MESSAGE,
    };
    let content = serde_json::to_string(&payload)
        .map_err(|e| AppError::internal(format!("failed to encode notification: {e}")))?;

    repo.create(&Notification::new(notice.recipient_id, content))
}
