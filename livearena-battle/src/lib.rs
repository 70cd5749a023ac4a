//! # LiveArena Battle Engine (livearena-battle)
//!
//! Timed two-creator battles with gift and vote scoring, prize pools, and
//! duet tip revenue splits.
//!
//! **Architecture:** `BattleService` keeps one serialized `BattleSession` per
//! battle; gifts, votes and ticks enter through it, are validated against the
//! lifecycle, scored by the `ScoringEngine` and recorded in the `EventLog`.
//! Ended battles are paid out by the `SettlementService` through the wallet
//! ledger. Tips on duets are split by the `DuetRevenueSplitter` and settled the
//! same way.

use axum::Router;
use livearena_common::events::EventBus;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod battle;
pub mod catalog;
pub mod config;
pub mod duet;
pub mod error;
pub mod event_log;
pub mod prize;
pub mod scoring;
pub mod services;
pub mod settlement;

pub use error::{Error, Result};

use battle::{BattleCollaborators, BattleService};
use catalog::GiftCatalog;
use config::TomlConfig;
use duet::{DuetRevenueSplitter, DuetService};
use services::{InMemoryWalletLedger, WalletLedgerService};
use settlement::SettlementService;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub battles: Arc<BattleService>,
    pub duets: Arc<DuetService>,
    pub event_bus: EventBus,
}

impl AppState {
    /// Wire the engine to the given collaborators
    pub fn new(
        config: &TomlConfig,
        catalog: Arc<GiftCatalog>,
        collaborators: BattleCollaborators,
        ledger: Arc<dyn WalletLedgerService>,
        event_bus: EventBus,
    ) -> Self {
        let settlement = Arc::new(SettlementService::new(
            ledger,
            event_bus.clone(),
            config.settlement.clone(),
        ));
        let duets = Arc::new(DuetService::new(
            DuetRevenueSplitter::new(config.rules.platform_fee_bps),
            Arc::clone(&settlement),
            Arc::clone(&collaborators.notifier),
            event_bus.clone(),
        ));
        let battles = Arc::new(BattleService::new(
            catalog,
            config.rules,
            config.timer.clone(),
            collaborators,
            settlement,
            event_bus.clone(),
        ));

        Self {
            battles,
            duets,
            event_bus,
        }
    }

    /// Standard catalog with in-process collaborators
    pub fn in_memory(config: &TomlConfig) -> Self {
        let event_bus = EventBus::new(config.event_bus_capacity);
        let collaborators = BattleCollaborators::in_memory(&event_bus);
        Self::new(
            config,
            Arc::new(GiftCatalog::standard()),
            collaborators,
            Arc::new(InMemoryWalletLedger::new()),
            event_bus,
        )
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::gift_routes())
        .merge(api::battle_routes())
        .merge(api::duet_routes())
        .merge(api::sse_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
