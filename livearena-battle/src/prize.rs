//! Prize pool calculation
//!
//! Pot = entry_fee * multiplier. Non-tie split is 60/30/10 (winner, runner-up,
//! viewer pool) with the integer remainder going to the winner. A tie splits
//! 45/45/10 and any odd remainder from halving goes to the viewer pool. The
//! three shares always sum to the pot exactly.

use crate::error::{Error, Result};
use livearena_common::events::PrizeDistribution;

const RUNNER_UP_PERCENT: u128 = 30;
const VIEWER_POOL_PERCENT: u128 = 10;

/// Computes prize pots and their distribution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrizePoolCalculator {
    multiplier: u64,
}

impl PrizePoolCalculator {
    pub fn new(multiplier: u64) -> Self {
        Self { multiplier }
    }

    pub fn multiplier(&self) -> u64 {
        self.multiplier
    }

    pub fn prize_pot(&self, entry_fee: u64) -> Result<u64> {
        entry_fee.checked_mul(self.multiplier).ok_or_else(|| {
            Error::Validation(format!(
                "entry fee {} overflows the prize pot (multiplier {})",
                entry_fee, self.multiplier
            ))
        })
    }

    /// Split `pot` given both final scores
    ///
    /// Argument order does not matter; `winner_share` always belongs to the
    /// higher score.
    pub fn distribute(&self, pot: u64, score_a: u64, score_b: u64) -> PrizeDistribution {
        if score_a == score_b {
            Self::split_tie(pot)
        } else {
            Self::split_decided(pot)
        }
    }

    fn split_decided(pot: u64) -> PrizeDistribution {
        let runner_up_share = percent_of(pot, RUNNER_UP_PERCENT);
        let viewer_pool_share = percent_of(pot, VIEWER_POOL_PERCENT);
        PrizeDistribution {
            prize_pot: pot,
            winner_share: pot - runner_up_share - viewer_pool_share,
            runner_up_share,
            viewer_pool_share,
            tie: false,
        }
    }

    fn split_tie(pot: u64) -> PrizeDistribution {
        let viewer_base = percent_of(pot, VIEWER_POOL_PERCENT);
        let creators_total = pot - viewer_base;
        let half = creators_total / 2;
        PrizeDistribution {
            prize_pot: pot,
            winner_share: half,
            runner_up_share: half,
            viewer_pool_share: viewer_base + creators_total % 2,
            tie: true,
        }
    }
}

/// Floor of `value * percent / 100` without intermediate overflow
fn percent_of(value: u64, percent: u128) -> u64 {
    // percent <= 100, so the quotient fits back into u64
    (u128::from(value) * percent / 100) as u64
}
