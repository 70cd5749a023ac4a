//! Battle lifecycle type definitions
//!
//! Supporting types for battle status and termination reasons.

use serde::{Deserialize, Serialize};

/// Battle lifecycle status
///
/// Waiting → Live → Ended. Ended is terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BattleStatus {
    /// Both creators accepted, media not yet acquired
    Waiting,
    /// Accepting gifts, votes and timer ticks
    Live,
    /// Scores frozen, settlement triggered
    Ended,
}

impl BattleStatus {
    /// Whether the status is terminal
    pub fn is_terminal(&self) -> bool {
        matches!(self, BattleStatus::Ended)
    }
}

impl std::fmt::Display for BattleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BattleStatus::Waiting => write!(f, "waiting"),
            BattleStatus::Live => write!(f, "live"),
            BattleStatus::Ended => write!(f, "ended"),
        }
    }
}

/// Why a battle ended
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// Countdown reached zero
    TimerExpired,
    /// Host stopped the battle early; prizes still distributed
    Stopped,
    /// Cancelled before natural completion; entry fees refunded
    Aborted,
}

impl std::fmt::Display for EndReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EndReason::TimerExpired => write!(f, "timer_expired"),
            EndReason::Stopped => write!(f, "stopped"),
            EndReason::Aborted => write!(f, "aborted"),
        }
    }
}

/// Role a ledger credit is paid under
///
/// Part of the idempotency key for wallet credits, so a single recipient can
/// receive e.g. both a refund and a tip share without collision.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PayoutRole {
    Winner,
    RunnerUp,
    /// Tie: both creators are paid under this role
    TiedCreator,
    ViewerPool,
    EntryFeeRefund,
    Platform,
    OriginalCreator,
    DuetCreator,
}

impl std::fmt::Display for PayoutRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PayoutRole::Winner => "winner",
            PayoutRole::RunnerUp => "runner_up",
            PayoutRole::TiedCreator => "tied_creator",
            PayoutRole::ViewerPool => "viewer_pool",
            PayoutRole::EntryFeeRefund => "entry_fee_refund",
            PayoutRole::Platform => "platform",
            PayoutRole::OriginalCreator => "original_creator",
            PayoutRole::DuetCreator => "duet_creator",
        };
        write!(f, "{}", s)
    }
}
