//! User notifications (battle live, results, tips)

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    BattleLive,
    BattleResult,
    TipReceived,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub recipient_id: String,
    pub kind: NotificationKind,
    /// Battle or duet the notification refers to
    pub subject_id: Uuid,
    pub message: String,
}

#[async_trait]
pub trait NotificationService: Send + Sync {
    async fn notify(&self, notification: Notification) -> Result<()>;
}

/// Writes notifications to the log
#[derive(Debug, Default)]
pub struct TracingNotifier;

#[async_trait]
impl NotificationService for TracingNotifier {
    async fn notify(&self, notification: Notification) -> Result<()> {
        info!(
            recipient = %notification.recipient_id,
            kind = ?notification.kind,
            subject = %notification.subject_id,
            "{}",
            notification.message
        );
        Ok(())
    }
}

/// Keeps every notification for later inspection
#[derive(Debug, Default)]
pub struct CollectingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl CollectingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent(&self) -> Vec<Notification> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl NotificationService for CollectingNotifier {
    async fn notify(&self, notification: Notification) -> Result<()> {
        self.sent.lock().await.push(notification);
        Ok(())
    }
}
