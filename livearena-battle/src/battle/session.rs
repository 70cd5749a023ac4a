//! Battle session state machine
//!
//! Waiting → Live → Ended, with Ended reachable exactly once and terminal.
//! The session validates lifecycle state for every inbound event and then
//! delegates scoring to its `ScoringEngine`. It performs no I/O; the owning
//! `BattleService` serializes access and talks to collaborators.

use super::types::{BattleConfig, BattleState};
use crate::catalog::GiftCatalog;
use crate::config::GameRules;
use crate::error::{Error, Result};
use crate::event_log::{ChatMessage, EventLog};
use crate::prize::PrizePoolCalculator;
use crate::scoring::{GiftOutcome, ScoringEngine, VoteOutcome};
use crate::services::{MediaConstraints, ParticipantRole};
use chrono::{DateTime, Utc};
use livearena_common::events::{BattleStatus, CreatorScore, EndReason, PrizeDistribution};
use livearena_common::time::format_countdown;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Longest chat message accepted, in characters
pub const MAX_CHAT_LENGTH: usize = 500;

/// Entry fee returned to a creator when a battle is aborted
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Refund {
    pub creator_id: String,
    pub amount: u64,
}

/// Frozen result of an ended battle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BattleOutcome {
    pub battle_id: Uuid,
    pub reason: EndReason,
    /// None on a tie or an abort
    pub winner_id: Option<String>,
    pub final_scores: [CreatorScore; 2],
    /// None when aborted
    pub distribution: Option<PrizeDistribution>,
    /// Entry fees returned on abort
    pub refunds: Vec<Refund>,
    pub ended_at: DateTime<Utc>,
}

/// Result of one countdown tick
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Countdown still running with this many ticks left
    Running(u32),
    /// This tick reached zero and ended the battle
    Ended(BattleOutcome),
}

/// Recorded totals compared with totals rebuilt from the event log
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoreAudit {
    pub recorded: [CreatorScore; 2],
    pub reconstructed: [CreatorScore; 2],
    pub consistent: bool,
}

/// One battle between two creators
#[derive(Debug)]
pub struct BattleSession {
    config: BattleConfig,
    status: BattleStatus,
    is_paused: bool,
    time_remaining: u32,
    scoring: ScoringEngine,
    prize: PrizePoolCalculator,
    prize_pot: u64,
    viewer_count: u64,
    peak_viewers: u64,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    outcome: Option<BattleOutcome>,
}

impl BattleSession {
    /// Create a session in Waiting
    pub fn new(config: BattleConfig, catalog: Arc<GiftCatalog>, rules: &GameRules) -> Result<Self> {
        config.validate()?;
        let prize = PrizePoolCalculator::new(rules.prize_multiplier);
        let prize_pot = prize.prize_pot(config.entry_fee)?;

        let scoring = ScoringEngine::new(
            EventLog::new(config.battle_id),
            catalog,
            config.creator_ids(),
            rules.vote_points,
            config.scoring_method,
            config.allow_gifts,
            config.allow_voting,
        );

        Ok(Self {
            time_remaining: config.duration_secs,
            config,
            status: BattleStatus::Waiting,
            is_paused: false,
            scoring,
            prize,
            prize_pot,
            viewer_count: 0,
            peak_viewers: 0,
            created_at: livearena_common::time::now(),
            started_at: None,
            outcome: None,
        })
    }

    pub fn id(&self) -> Uuid {
        self.config.battle_id
    }

    pub fn config(&self) -> &BattleConfig {
        &self.config
    }

    pub fn status(&self) -> BattleStatus {
        self.status
    }

    pub fn is_paused(&self) -> bool {
        self.is_paused
    }

    pub fn time_remaining(&self) -> u32 {
        self.time_remaining
    }

    pub fn prize_pot(&self) -> u64 {
        self.prize_pot
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn outcome(&self) -> Option<&BattleOutcome> {
        self.outcome.as_ref()
    }

    pub fn event_log(&self) -> &EventLog {
        self.scoring.log()
    }

    pub fn scores(&self) -> &[CreatorScore; 2] {
        self.scoring.scores()
    }

    /// Capture requirements for every participant, host first
    pub fn media_constraints(&self) -> Vec<MediaConstraints> {
        self.config
            .creators
            .iter()
            .map(|c| {
                let role = if c.is_host {
                    ParticipantRole::Host
                } else {
                    ParticipantRole::Guest
                };
                MediaConstraints::audio_video(&c.id, role)
            })
            .collect()
    }

    /// Waiting → Live, once media has been acquired for every participant
    pub fn go_live(&mut self) -> Result<()> {
        if self.status != BattleStatus::Waiting {
            return Err(Error::invalid_state("start", self.status));
        }
        self.status = BattleStatus::Live;
        self.started_at = Some(livearena_common::time::now());
        for creator in &mut self.config.creators {
            creator.is_live = true;
        }
        info!(battle_id = %self.id(), countdown = %format_countdown(self.time_remaining), "Battle is live");
        Ok(())
    }

    /// Advance the countdown by one; reaching zero ends the battle
    pub fn tick(&mut self) -> Result<TickOutcome> {
        if self.status != BattleStatus::Live {
            return Err(Error::invalid_state("tick", self.status));
        }
        if self.is_paused {
            return Err(Error::State("cannot tick while battle is paused".to_string()));
        }

        self.time_remaining = self.time_remaining.saturating_sub(1);
        if self.time_remaining == 0 {
            return self.end(EndReason::TimerExpired).map(TickOutcome::Ended);
        }
        Ok(TickOutcome::Running(self.time_remaining))
    }

    pub fn pause(&mut self) -> Result<()> {
        if self.status != BattleStatus::Live {
            return Err(Error::invalid_state("pause", self.status));
        }
        if self.is_paused {
            return Err(Error::State("battle is already paused".to_string()));
        }
        self.is_paused = true;
        debug!(battle_id = %self.id(), remaining = %format_countdown(self.time_remaining), "Battle paused");
        Ok(())
    }

    pub fn resume(&mut self) -> Result<()> {
        if self.status != BattleStatus::Live {
            return Err(Error::invalid_state("resume", self.status));
        }
        if !self.is_paused {
            return Err(Error::State("battle is not paused".to_string()));
        }
        self.is_paused = false;
        debug!(battle_id = %self.id(), remaining = %format_countdown(self.time_remaining), "Battle resumed");
        Ok(())
    }

    /// Finalize the battle
    ///
    /// `Aborted` is accepted from Waiting or Live and refunds the entry fees.
    /// `TimerExpired` and `Stopped` require Live and distribute the prize pot.
    pub fn end(&mut self, reason: EndReason) -> Result<BattleOutcome> {
        match (self.status, reason) {
            (BattleStatus::Live, _) | (BattleStatus::Waiting, EndReason::Aborted) => {}
            (status, _) => return Err(Error::invalid_state("end", status)),
        }

        let final_scores = self.scoring.scores().clone();
        let (winner_id, distribution, refunds) = if reason == EndReason::Aborted {
            let refunds = self
                .config
                .creators
                .iter()
                .map(|c| Refund {
                    creator_id: c.id.clone(),
                    amount: self.config.entry_fee,
                })
                .collect();
            (None, None, refunds)
        } else {
            let [first, second] = &final_scores;
            let distribution = self.prize.distribute(self.prize_pot, first.score, second.score);
            let winner_index = match first.score.cmp(&second.score) {
                std::cmp::Ordering::Greater => Some(0),
                std::cmp::Ordering::Less => Some(1),
                std::cmp::Ordering::Equal => None,
            };
            if let Some(w) = winner_index {
                self.config.creators[w].record_win();
                self.config.creators[1 - w].record_loss();
            }
            let winner_id = winner_index.map(|w| final_scores[w].creator_id.clone());
            (winner_id, Some(distribution), Vec::new())
        };

        self.status = BattleStatus::Ended;
        self.is_paused = false;
        for creator in &mut self.config.creators {
            creator.is_live = false;
        }

        let outcome = BattleOutcome {
            battle_id: self.id(),
            reason,
            winner_id,
            final_scores,
            distribution,
            refunds,
            ended_at: livearena_common::time::now(),
        };
        info!(
            battle_id = %self.id(),
            reason = %reason,
            winner = outcome.winner_id.as_deref().unwrap_or("none"),
            "Battle ended"
        );
        self.outcome = Some(outcome.clone());
        Ok(outcome)
    }

    pub fn apply_gift(&mut self, sender_id: &str, recipient_id: &str, gift_id: &str, quantity: u32) -> Result<GiftOutcome> {
        if self.status != BattleStatus::Live {
            return Err(Error::invalid_state("send gifts", self.status));
        }
        self.scoring.apply_gift(sender_id, recipient_id, gift_id, quantity)
    }

    pub fn apply_vote(&mut self, voter_id: &str, creator_id: &str) -> Result<VoteOutcome> {
        if self.status != BattleStatus::Live {
            return Err(Error::invalid_state("vote", self.status));
        }
        self.scoring.apply_vote(voter_id, creator_id)
    }

    /// Append a chat line; allowed in the lobby and while Live
    pub fn post_chat(&mut self, sender_id: &str, text: &str) -> Result<ChatMessage> {
        if self.status.is_terminal() {
            return Err(Error::invalid_state("chat", self.status));
        }
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::Validation("chat message must not be empty".to_string()));
        }
        if text.chars().count() > MAX_CHAT_LENGTH {
            return Err(Error::Validation(format!(
                "chat message exceeds {} characters",
                MAX_CHAT_LENGTH
            )));
        }
        Ok(self.scoring.log_mut().record_chat(sender_id, text))
    }

    /// Update viewer telemetry; returns (viewer_count, peak_viewers)
    pub fn record_viewer_count(&mut self, viewer_count: u64) -> Result<(u64, u64)> {
        if self.status.is_terminal() {
            return Err(Error::invalid_state("update viewers", self.status));
        }
        self.viewer_count = viewer_count;
        self.peak_viewers = self.peak_viewers.max(viewer_count);
        Ok((self.viewer_count, self.peak_viewers))
    }

    /// Rebuild totals from the event log and compare with the live totals
    pub fn audit_scores(&self) -> Result<ScoreAudit> {
        let recorded = self.scoring.scores().clone();
        let reconstructed = self.scoring.log().reconstruct_scores(
            self.scoring.catalog(),
            &self.config.creator_ids(),
            self.scoring.vote_points(),
            self.scoring.method(),
        )?;
        Ok(ScoreAudit {
            consistent: recorded == reconstructed,
            recorded,
            reconstructed,
        })
    }

    pub fn state(&self) -> BattleState {
        BattleState {
            battle_id: self.id(),
            title: self.config.title.clone(),
            status: self.status,
            is_paused: self.is_paused,
            time_remaining: self.time_remaining,
            duration_secs: self.config.duration_secs,
            creators: self.scoring.scores().clone(),
            percentages: self.scoring.percentages(),
            viewer_count: self.viewer_count,
            peak_viewers: self.peak_viewers,
            prize_pot: self.prize_pot,
            last_sequence: self.scoring.log().last_sequence(),
            winner_id: self.outcome.as_ref().and_then(|o| o.winner_id.clone()),
            end_reason: self.outcome.as_ref().map(|o| o.reason),
        }
    }
}
