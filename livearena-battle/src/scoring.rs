//! Scoring engine
//!
//! Applies validated gift and vote events to a battle's running totals. The
//! engine is owned by exactly one `BattleSession`, which checks lifecycle
//! state before delegating here; the engine checks everything else (allowed
//! actions, recipient, gift id, quantity, vote uniqueness).
//!
//! Gifts and votes are always tallied; the battle's `ScoringMethod` decides
//! which tallies count toward the score. Invariant maintained after every call:
//! `score(c) == gift_points(gift_total(c)) + vote_value * vote_count(c)`

use crate::battle::ScoringMethod;
use crate::catalog::GiftCatalog;
use crate::error::{ConflictError, Error, Result};
use crate::event_log::{EventLog, GiftEvent, VoteEvent};
use livearena_common::events::CreatorScore;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Cumulative quantity per (gift_id, recipient_id) within one battle
#[derive(Debug, Clone, Default)]
pub struct ComboTracker {
    counts: HashMap<(String, String), u64>,
}

impl ComboTracker {
    /// Add `quantity` and return the new cumulative count
    pub fn increment(&mut self, gift_id: &str, recipient_id: &str, quantity: u32) -> u64 {
        let count = self
            .counts
            .entry((gift_id.to_string(), recipient_id.to_string()))
            .or_insert(0);
        *count += u64::from(quantity);
        *count
    }

    pub fn get(&self, gift_id: &str, recipient_id: &str) -> u64 {
        self.counts
            .get(&(gift_id.to_string(), recipient_id.to_string()))
            .copied()
            .unwrap_or(0)
    }

    pub fn as_map(&self) -> &HashMap<(String, String), u64> {
        &self.counts
    }
}

/// Result of an accepted gift
#[derive(Debug, Clone)]
pub struct GiftOutcome {
    pub event: GiftEvent,
    pub combo_count: u64,
    pub has_special_effect: bool,
    pub scores: [CreatorScore; 2],
}

/// Result of an accepted vote
#[derive(Debug, Clone)]
pub struct VoteOutcome {
    pub event: VoteEvent,
    pub scores: [CreatorScore; 2],
}

/// Progress-bar share of `score` out of `total`; 50 when nothing has been scored
pub fn score_percentage(score: u64, total: u64) -> f64 {
    if total == 0 {
        50.0
    } else {
        score as f64 / total as f64 * 100.0
    }
}

/// Score contribution of a gift worth `total_value` points
pub fn gift_points(method: ScoringMethod, total_value: u64) -> u64 {
    if method.counts_gifts() {
        total_value
    } else {
        0
    }
}

/// Score contribution of one vote
pub fn vote_value(method: ScoringMethod, vote_points: u64) -> u64 {
    if method.counts_votes() {
        vote_points
    } else {
        0
    }
}

/// Per-battle scoring state
#[derive(Debug)]
pub struct ScoringEngine {
    catalog: Arc<GiftCatalog>,
    vote_points: u64,
    method: ScoringMethod,
    allow_gifts: bool,
    allow_voting: bool,
    scores: [CreatorScore; 2],
    voters: HashSet<String>,
    combos: ComboTracker,
    log: EventLog,
}

impl ScoringEngine {
    pub fn new(
        log: EventLog,
        catalog: Arc<GiftCatalog>,
        creator_ids: [String; 2],
        vote_points: u64,
        method: ScoringMethod,
        allow_gifts: bool,
        allow_voting: bool,
    ) -> Self {
        let [first, second] = creator_ids;
        Self {
            catalog,
            vote_points,
            method,
            allow_gifts,
            allow_voting,
            scores: [CreatorScore::new(first), CreatorScore::new(second)],
            voters: HashSet::new(),
            combos: ComboTracker::default(),
            log,
        }
    }

    fn creator_index(&self, creator_id: &str) -> Result<usize> {
        self.scores
            .iter()
            .position(|s| s.creator_id == creator_id)
            .ok_or_else(|| {
                Error::Validation(format!("{} is not a creator in this battle", creator_id))
            })
    }

    /// Apply a gift from `sender_id` to `recipient_id`
    pub fn apply_gift(
        &mut self,
        sender_id: &str,
        recipient_id: &str,
        gift_id: &str,
        quantity: u32,
    ) -> Result<GiftOutcome> {
        if !self.allow_gifts {
            return Err(Error::Validation(
                "gifts are not enabled for this battle".to_string(),
            ));
        }
        if quantity == 0 {
            return Err(Error::Validation("gift quantity must be at least 1".to_string()));
        }
        let index = self.creator_index(recipient_id)?;
        let gift = self.catalog.lookup(gift_id)?;
        let has_special_effect = gift.has_special_effect();

        let total_value = gift
            .point_value
            .checked_mul(u64::from(quantity))
            .ok_or_else(|| Error::Validation("gift value out of range".to_string()))?;
        let new_score = self.scores[index]
            .score
            .checked_add(gift_points(self.method, total_value))
            .ok_or_else(|| Error::Validation("score out of range".to_string()))?;

        let target = &mut self.scores[index];
        target.gift_total += total_value;
        target.score = new_score;

        let combo_count = self.combos.increment(gift_id, recipient_id, quantity);
        let event = self
            .log
            .record_gift(sender_id, recipient_id, gift_id, quantity, total_value);

        Ok(GiftOutcome {
            event,
            combo_count,
            has_special_effect,
            scores: self.scores.clone(),
        })
    }

    /// Apply `voter_id`'s single vote for `creator_id`
    pub fn apply_vote(&mut self, voter_id: &str, creator_id: &str) -> Result<VoteOutcome> {
        if !self.allow_voting {
            return Err(Error::Validation(
                "voting is not enabled for this battle".to_string(),
            ));
        }
        let index = self.creator_index(creator_id)?;
        if self.voters.contains(voter_id) {
            return Err(ConflictError::AlreadyVoted {
                voter_id: voter_id.to_string(),
            }
            .into());
        }

        self.voters.insert(voter_id.to_string());
        let target = &mut self.scores[index];
        target.vote_count += 1;
        target.score += vote_value(self.method, self.vote_points);

        let event = self.log.record_vote(voter_id, creator_id);

        Ok(VoteOutcome {
            event,
            scores: self.scores.clone(),
        })
    }

    /// Progress-bar share of `score` relative to both creators' totals
    pub fn score_percentage(&self, score: u64) -> f64 {
        score_percentage(score, self.total_score())
    }

    pub fn percentages(&self) -> [f64; 2] {
        [
            self.score_percentage(self.scores[0].score),
            self.score_percentage(self.scores[1].score),
        ]
    }

    pub fn total_score(&self) -> u64 {
        self.scores[0].score + self.scores[1].score
    }

    pub fn scores(&self) -> &[CreatorScore; 2] {
        &self.scores
    }

    pub fn has_voted(&self, voter_id: &str) -> bool {
        self.voters.contains(voter_id)
    }

    pub fn combos(&self) -> &ComboTracker {
        &self.combos
    }

    pub fn vote_points(&self) -> u64 {
        self.vote_points
    }

    pub fn method(&self) -> ScoringMethod {
        self.method
    }

    pub fn catalog(&self) -> &GiftCatalog {
        &self.catalog
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    pub fn log_mut(&mut self) -> &mut EventLog {
        &mut self.log
    }
}
