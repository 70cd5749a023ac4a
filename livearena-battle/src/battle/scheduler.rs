//! Countdown driver
//!
//! Emits one tick per interval for a Live battle until the battle ends or its
//! cancellation token fires. The scheduler is only a producer of tick events;
//! `BattleService::tick` stays callable directly.

use super::service::BattleService;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy)]
pub struct TickScheduler {
    interval: Duration,
}

impl TickScheduler {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    /// Spawn the tick loop for `battle_id`
    pub fn spawn(self, service: Arc<BattleService>, battle_id: Uuid, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // First tick completes immediately
            interval.tick().await;

            debug!(battle_id = %battle_id, "Tick scheduler started");
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = interval.tick() => {}
                }

                match service.scheduled_tick(battle_id).await {
                    Ok(Some(_)) => {}
                    Ok(None) => break,
                    Err(e) => {
                        warn!(battle_id = %battle_id, "Tick scheduler stopping: {}", e);
                        break;
                    }
                }
            }
            debug!(battle_id = %battle_id, "Tick scheduler stopped");
        })
    }
}
