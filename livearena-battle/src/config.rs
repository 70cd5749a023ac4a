//! Configuration for the livearena-battle service
//!
//! Bootstrap settings come from a TOML file resolved by
//! `livearena_common::config`. Every field has a built-in default, so an empty
//! or missing file yields a working service.
//!
//! # Settings Sources Priority
//!
//! 1. Command-line arguments (--port, --config)
//! 2. Environment variables (LIVEARENA_CONFIG, LIVEARENA_BATTLE_PORT)
//! 3. TOML configuration file
//! 4. Built-in defaults (code constants)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Default multiple of the entry fee that forms the prize pot
pub const DEFAULT_PRIZE_MULTIPLIER: u64 = 20;

/// Default points added per vote
pub const DEFAULT_VOTE_POINTS: u64 = 10;

/// Default platform fee on tips, in basis points (5%)
pub const DEFAULT_PLATFORM_FEE_BPS: u32 = 500;

/// Upper bound on ledger attempts per credit
pub const MAX_SETTLEMENT_ATTEMPTS: u32 = 20;

/// Upper bound on the initial retry delay
pub const MAX_RETRY_BACKOFF_MS: u64 = 60_000;

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// HTTP bind host
    pub host: String,

    /// HTTP server port
    pub port: u16,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Economic rules shared by all battles and duets
    pub rules: GameRules,

    /// Countdown driver
    pub timer: TimerConfig,

    /// Ledger payout behavior
    pub settlement: SettlementConfig,

    /// EventBus channel capacity
    pub event_bus_capacity: usize,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5780,
            logging: LoggingConfig::default(),
            rules: GameRules::default(),
            timer: TimerConfig::default(),
            settlement: SettlementConfig::default(),
            event_bus_capacity: 1000,
        }
    }
}

impl TomlConfig {
    /// Resolve and load the config file, validating the result
    pub fn load(cli_path: Option<&Path>) -> Result<Self> {
        let resolver = livearena_common::config::ConfigFileResolver::new("battle");
        let config: TomlConfig = livearena_common::config::load_or_default(&resolver, cli_path)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would break economic invariants or the timer
    pub fn validate(&self) -> Result<()> {
        self.rules.validate()?;
        if self.timer.tick_interval_ms == 0 {
            return Err(Error::Config("timer.tick_interval_ms must be > 0".to_string()));
        }
        if self.settlement.max_attempts == 0 || self.settlement.max_attempts > MAX_SETTLEMENT_ATTEMPTS {
            return Err(Error::Config(format!(
                "settlement.max_attempts must be between 1 and {}, got {}",
                MAX_SETTLEMENT_ATTEMPTS, self.settlement.max_attempts
            )));
        }
        if self.settlement.retry_backoff_ms > MAX_RETRY_BACKOFF_MS {
            return Err(Error::Config(format!(
                "settlement.retry_backoff_ms must be <= {}, got {}",
                MAX_RETRY_BACKOFF_MS, self.settlement.retry_backoff_ms
            )));
        }
        if self.settlement.platform_account_id.trim().is_empty() {
            return Err(Error::Config(
                "settlement.platform_account_id must not be empty".to_string(),
            ));
        }
        if self.event_bus_capacity == 0 {
            return Err(Error::Config("event_bus_capacity must be > 0".to_string()));
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when RUST_LOG is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "livearena_battle=debug,tower_http=debug".to_string(),
        }
    }
}

/// Economic constants for scoring, prize pots and tip splits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GameRules {
    /// prize_pot = entry_fee * prize_multiplier
    pub prize_multiplier: u64,
    /// Points added to a creator per vote
    pub vote_points: u64,
    /// Platform fee on tips in basis points (500 = 5%)
    pub platform_fee_bps: u32,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            prize_multiplier: DEFAULT_PRIZE_MULTIPLIER,
            vote_points: DEFAULT_VOTE_POINTS,
            platform_fee_bps: DEFAULT_PLATFORM_FEE_BPS,
        }
    }
}

impl GameRules {
    pub fn validate(&self) -> Result<()> {
        if self.platform_fee_bps > 10_000 {
            return Err(Error::Config(format!(
                "rules.platform_fee_bps must be <= 10000, got {}",
                self.platform_fee_bps
            )));
        }
        if self.vote_points == 0 {
            return Err(Error::Config("rules.vote_points must be > 0".to_string()));
        }
        Ok(())
    }
}

/// Countdown driver settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimerConfig {
    /// Wall-clock length of one tick (one unit of time_remaining)
    pub tick_interval_ms: u64,
    /// Spawn a scheduler task for every battle that goes Live
    pub auto_tick: bool,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1000,
            auto_tick: true,
        }
    }
}

impl TimerConfig {
    pub fn tick_interval(&self) -> Duration {
        livearena_common::time::millis_to_duration(self.tick_interval_ms)
    }
}

/// Ledger payout settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SettlementConfig {
    /// Attempts per credit before reporting SettlementFailed
    pub max_attempts: u32,
    /// Delay before the first retry; doubles on each further retry
    pub retry_backoff_ms: u64,
    /// Account receiving platform fees and the viewer pool
    pub platform_account_id: String,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_backoff_ms: 200,
            platform_account_id: "platform".to_string(),
        }
    }
}
