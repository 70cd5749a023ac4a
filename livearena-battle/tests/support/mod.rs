//! Shared fixtures for livearena-battle integration tests

#![allow(dead_code)]

use livearena_battle::battle::{BattleCollaborators, BattleConfig, CreatorParticipant, ScoringMethod};
use livearena_battle::catalog::GiftCatalog;
use livearena_battle::config::{TimerConfig, TomlConfig};
use livearena_battle::services::{CollectingNotifier, EventBusChatTransport, InMemoryMediaCapture, InMemoryWalletLedger};
use livearena_battle::AppState;
use livearena_common::events::EventBus;
use std::sync::Arc;
use uuid::Uuid;

pub struct Harness {
    pub state: AppState,
    pub media: Arc<InMemoryMediaCapture>,
    pub ledger: Arc<InMemoryWalletLedger>,
    pub notifier: Arc<CollectingNotifier>,
}

/// Engine with in-memory collaborators and manual ticking
pub fn harness() -> Harness {
    harness_with_timer(TimerConfig {
        tick_interval_ms: 1000,
        auto_tick: false,
    })
}

pub fn harness_with_timer(timer: TimerConfig) -> Harness {
    harness_with(timer, InMemoryMediaCapture::new())
}

pub fn harness_with(timer: TimerConfig, media: InMemoryMediaCapture) -> Harness {
    let mut config = TomlConfig::default();
    config.timer = timer;
    config.settlement.retry_backoff_ms = 1;

    let event_bus = EventBus::new(1024);
    let media = Arc::new(media);
    let ledger = Arc::new(InMemoryWalletLedger::new());
    let notifier = Arc::new(CollectingNotifier::new());
    let collaborators = BattleCollaborators {
        media: media.clone(),
        notifier: notifier.clone(),
        chat: Arc::new(EventBusChatTransport::new(event_bus.clone())),
    };

    let state = AppState::new(
        &config,
        Arc::new(GiftCatalog::standard()),
        collaborators,
        ledger.clone(),
        event_bus,
    );

    Harness {
        state,
        media,
        ledger,
        notifier,
    }
}

/// alice (host) vs bob, hybrid scoring
pub fn battle_config(entry_fee: u64, duration_secs: u32) -> BattleConfig {
    BattleConfig {
        battle_id: Uuid::new_v4(),
        title: "Saturday Showdown".to_string(),
        duration_secs,
        creators: [
            CreatorParticipant::new("alice", "alice", "Alice").as_host(),
            CreatorParticipant::new("bob", "bob", "Bob"),
        ],
        scoring_method: ScoringMethod::Hybrid,
        allow_voting: true,
        allow_gifts: true,
        entry_fee,
    }
}
