//! Event types for the LiveArena event system
//!
//! Provides shared event definitions and the EventBus used by every LiveArena
//! service.

mod battle_types;
mod shared_types;

pub use battle_types::{BattleStatus, EndReason, PayoutRole};
pub use shared_types::{CreatorScore, PrizeDistribution};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// LiveArena event types
///
/// Events are broadcast via EventBus and can be serialized for SSE transmission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ArenaEvent {
    /// Battle session created in Waiting
    ///
    /// Triggers:
    /// - SSE: Show battle lobby
    BattleCreated {
        battle_id: Uuid,
        title: String,
        creator_ids: Vec<String>,
        duration_secs: u32,
        timestamp: DateTime<Utc>,
    },

    /// Media acquired, battle is Live
    ///
    /// Triggers:
    /// - SSE: Start countdown display
    /// - Notifications: Tell followers the battle is live
    BattleStarted {
        battle_id: Uuid,
        duration_secs: u32,
        timestamp: DateTime<Utc>,
    },

    /// Media acquisition failed, battle remains in Waiting
    BattleStartFailed {
        battle_id: Uuid,
        /// Human readable resource failure
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// Gift applied to a creator's score
    ///
    /// Triggers:
    /// - SSE: Gift animation, escalated by combo count
    GiftReceived {
        battle_id: Uuid,
        sequence: u64,
        sender_id: String,
        recipient_id: String,
        gift_id: String,
        quantity: u32,
        total_value: u64,
        /// Cumulative quantity of this gift to this recipient in the battle
        combo_count: u64,
        has_special_effect: bool,
        timestamp: DateTime<Utc>,
    },

    /// Vote applied to a creator's score
    VoteCast {
        battle_id: Uuid,
        sequence: u64,
        voter_id: String,
        creator_id: String,
        timestamp: DateTime<Utc>,
    },

    /// Running totals changed
    ///
    /// Emitted after every accepted gift or vote.
    ///
    /// Triggers:
    /// - SSE: Update progress bar
    ScoreUpdated {
        battle_id: Uuid,
        scores: Vec<CreatorScore>,
        timestamp: DateTime<Utc>,
    },

    /// Chat message appended to the battle's event log
    ChatPosted {
        battle_id: Uuid,
        sequence: u64,
        sender_id: String,
        text: String,
        timestamp: DateTime<Utc>,
    },

    /// Countdown advanced by one tick
    TimerTick {
        battle_id: Uuid,
        time_remaining: u32,
        timestamp: DateTime<Utc>,
    },

    /// Countdown paused
    BattlePaused {
        battle_id: Uuid,
        time_remaining: u32,
        timestamp: DateTime<Utc>,
    },

    /// Countdown resumed
    BattleResumed {
        battle_id: Uuid,
        time_remaining: u32,
        timestamp: DateTime<Utc>,
    },

    /// Viewer telemetry changed (approximate, not part of the ledger)
    ViewerCountUpdated {
        battle_id: Uuid,
        viewer_count: u64,
        peak_viewers: u64,
        timestamp: DateTime<Utc>,
    },

    /// Battle reached Ended; this is the settlement event
    ///
    /// Emitted exactly once per battle.
    ///
    /// Triggers:
    /// - Settlement: Credit prize shares or refunds
    /// - SSE: Show result screen
    BattleEnded {
        battle_id: Uuid,
        reason: EndReason,
        /// None on a tie or abort
        winner_id: Option<String>,
        final_scores: Vec<CreatorScore>,
        /// None when the battle was aborted (entry fees refunded instead)
        distribution: Option<PrizeDistribution>,
        timestamp: DateTime<Utc>,
    },

    /// All ledger credits for a battle or tip were accepted
    SettlementCompleted {
        /// "battle:<uuid>" or "duet:<uuid>:<tip uuid>"
        source_ref: String,
        credits: usize,
        total_amount: u64,
        timestamp: DateTime<Utc>,
    },

    /// Ledger credits still failing after all retries
    ///
    /// Retrying later is safe: credits are idempotent per recipient and role.
    SettlementFailed {
        source_ref: String,
        error: String,
        timestamp: DateTime<Utc>,
    },

    /// Tip on duet content split and credited
    DuetTipSettled {
        duet_id: Uuid,
        tip_id: Uuid,
        tipper_id: String,
        amount: u64,
        platform_fee: u64,
        original_creator_share: u64,
        duet_creator_share: u64,
        timestamp: DateTime<Utc>,
    },
}

impl ArenaEvent {
    /// Get event type as string for filtering
    pub fn event_type(&self) -> &str {
        match self {
            ArenaEvent::BattleCreated { .. } => "BattleCreated",
            ArenaEvent::BattleStarted { .. } => "BattleStarted",
            ArenaEvent::BattleStartFailed { .. } => "BattleStartFailed",
            ArenaEvent::GiftReceived { .. } => "GiftReceived",
            ArenaEvent::VoteCast { .. } => "VoteCast",
            ArenaEvent::ScoreUpdated { .. } => "ScoreUpdated",
            ArenaEvent::ChatPosted { .. } => "ChatPosted",
            ArenaEvent::TimerTick { .. } => "TimerTick",
            ArenaEvent::BattlePaused { .. } => "BattlePaused",
            ArenaEvent::BattleResumed { .. } => "BattleResumed",
            ArenaEvent::ViewerCountUpdated { .. } => "ViewerCountUpdated",
            ArenaEvent::BattleEnded { .. } => "BattleEnded",
            ArenaEvent::SettlementCompleted { .. } => "SettlementCompleted",
            ArenaEvent::SettlementFailed { .. } => "SettlementFailed",
            ArenaEvent::DuetTipSettled { .. } => "DuetTipSettled",
        }
    }

    /// Battle the event belongs to, if any
    pub fn battle_id(&self) -> Option<Uuid> {
        match self {
            ArenaEvent::BattleCreated { battle_id, .. }
            | ArenaEvent::BattleStarted { battle_id, .. }
            | ArenaEvent::BattleStartFailed { battle_id, .. }
            | ArenaEvent::GiftReceived { battle_id, .. }
            | ArenaEvent::VoteCast { battle_id, .. }
            | ArenaEvent::ScoreUpdated { battle_id, .. }
            | ArenaEvent::ChatPosted { battle_id, .. }
            | ArenaEvent::TimerTick { battle_id, .. }
            | ArenaEvent::BattlePaused { battle_id, .. }
            | ArenaEvent::BattleResumed { battle_id, .. }
            | ArenaEvent::ViewerCountUpdated { battle_id, .. }
            | ArenaEvent::BattleEnded { battle_id, .. } => Some(*battle_id),
            ArenaEvent::SettlementCompleted { .. }
            | ArenaEvent::SettlementFailed { .. }
            | ArenaEvent::DuetTipSettled { .. } => None,
        }
    }
}

// ========================================
// EventBus Implementation
// ========================================

/// Central event distribution bus for application-wide events
///
/// The EventBus uses tokio::broadcast internally, providing:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use livearena_common::events::{ArenaEvent, EventBus};
/// use std::sync::Arc;
/// use uuid::Uuid;
///
/// let event_bus = Arc::new(EventBus::new(1000));
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(ArenaEvent::TimerTick {
///     battle_id: Uuid::new_v4(),
///     time_remaining: 299,
///     timestamp: chrono::Utc::now(),
/// });
///
/// assert_eq!(rx.try_recv().unwrap().event_type(), "TimerTick");
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ArenaEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// * `capacity` - Number of events to buffer before lagging subscribers
    ///   start losing the oldest events
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<ArenaEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: ArenaEvent,
    ) -> Result<usize, broadcast::error::SendError<ArenaEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: ArenaEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn tick(battle_id: Uuid, time_remaining: u32) -> ArenaEvent {
        ArenaEvent::TimerTick {
            battle_id,
            time_remaining,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_battle_ended_serialization() {
        let battle_id = Uuid::new_v4();
        let event = ArenaEvent::BattleEnded {
            battle_id,
            reason: EndReason::TimerExpired,
            winner_id: Some("creator-1".to_string()),
            final_scores: vec![CreatorScore::new("creator-1"), CreatorScore::new("creator-2")],
            distribution: Some(PrizeDistribution {
                prize_pot: 200,
                winner_share: 120,
                runner_up_share: 60,
                viewer_pool_share: 20,
                tie: false,
            }),
            timestamp: Utc::now(),
        };

        let json = serde_json::to_value(&event).expect("serialize");
        assert_eq!(json["type"], "BattleEnded");
        assert_eq!(json["reason"], "timer_expired");
        assert_eq!(json["distribution"]["winner_share"], 120);

        let back: ArenaEvent = serde_json::from_value(json).expect("deserialize");
        match back {
            ArenaEvent::BattleEnded { battle_id: id, distribution, .. } => {
                assert_eq!(id, battle_id);
                assert_eq!(distribution.map(|d| d.total()), Some(200));
            }
            _ => panic!("Wrong event type deserialized"),
        }
    }

    #[test]
    fn test_battle_id_accessor() {
        let battle_id = Uuid::new_v4();
        assert_eq!(tick(battle_id, 10).battle_id(), Some(battle_id));

        let settled = ArenaEvent::SettlementFailed {
            source_ref: "battle:x".to_string(),
            error: "ledger offline".to_string(),
            timestamp: Utc::now(),
        };
        assert_eq!(settled.battle_id(), None);
    }

    #[test]
    fn test_eventbus_new() {
        let bus = EventBus::new(100);
        assert_eq!(bus.capacity(), 100);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_eventbus_emit_without_subscribers_is_err() {
        let bus = EventBus::new(10);
        assert!(bus.emit(tick(Uuid::new_v4(), 1)).is_err());
    }

    #[test]
    fn test_eventbus_emit_lossy_does_not_panic_on_full_channel() {
        let bus = Arc::new(EventBus::new(2));
        let _rx = bus.subscribe();

        for i in 0..10 {
            bus.emit_lossy(tick(Uuid::new_v4(), i));
        }

        assert_eq!(bus.capacity(), 2);
    }

    #[test]
    fn test_eventbus_multiple_subscribers() {
        let bus = Arc::new(EventBus::new(10));
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        bus.emit(tick(Uuid::new_v4(), 5)).expect("emit should succeed");

        assert_eq!(rx1.try_recv().expect("rx1").event_type(), "TimerTick");
        assert_eq!(rx2.try_recv().expect("rx2").event_type(), "TimerTick");
    }
}
