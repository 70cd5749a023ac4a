//! Shared type definitions for event data
//!
//! Common structs used across multiple event types.

use serde::{Deserialize, Serialize};

/// Running totals for one creator in a battle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatorScore {
    /// Creator user id
    pub creator_id: String,
    /// Overall score (gift points + vote points)
    pub score: u64,
    /// Sum of gift point values received
    pub gift_total: u64,
    /// Number of votes received
    pub vote_count: u64,
}

impl CreatorScore {
    /// Zeroed totals for a creator
    pub fn new(creator_id: impl Into<String>) -> Self {
        Self {
            creator_id: creator_id.into(),
            score: 0,
            gift_total: 0,
            vote_count: 0,
        }
    }
}

/// Prize pool split at battle end
///
/// `winner_share + runner_up_share + viewer_pool_share == prize_pot` always.
/// On a tie, `winner_share` and `runner_up_share` are the equal creator halves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrizeDistribution {
    pub prize_pot: u64,
    pub winner_share: u64,
    pub runner_up_share: u64,
    pub viewer_pool_share: u64,
    /// True when scores were equal and the creator shares were split evenly
    pub tie: bool,
}

impl PrizeDistribution {
    /// Sum of the three shares
    pub fn total(&self) -> u64 {
        self.winner_share + self.runner_up_share + self.viewer_pool_share
    }
}
