//! Battle configuration, participants and state snapshots

use crate::error::{Error, Result};
use livearena_common::events::{BattleStatus, CreatorScore, EndReason};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Upper bound on a battle's countdown (one hour)
pub const MAX_DURATION_SECS: u32 = 3600;

/// Which viewer actions count toward the score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoringMethod {
    Gifts,
    Votes,
    Hybrid,
}

impl ScoringMethod {
    /// Whether gift point values add to the score
    pub fn counts_gifts(self) -> bool {
        matches!(self, ScoringMethod::Gifts | ScoringMethod::Hybrid)
    }

    /// Whether votes add to the score
    pub fn counts_votes(self) -> bool {
        matches!(self, ScoringMethod::Votes | ScoringMethod::Hybrid)
    }
}

/// A creator taking part in a battle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatorParticipant {
    pub id: String,
    pub username: String,
    pub display_name: String,
    #[serde(default)]
    pub level: u32,
    #[serde(default)]
    pub battles_won: u32,
    #[serde(default)]
    pub battles_lost: u32,
    /// Percentage of decided battles won (0-100)
    #[serde(default)]
    pub win_rate: f64,
    #[serde(default)]
    pub is_live: bool,
    #[serde(default)]
    pub is_host: bool,
}

impl CreatorParticipant {
    pub fn new(id: &str, username: &str, display_name: &str) -> Self {
        Self {
            id: id.to_string(),
            username: username.to_string(),
            display_name: display_name.to_string(),
            level: 1,
            battles_won: 0,
            battles_lost: 0,
            win_rate: 0.0,
            is_live: false,
            is_host: false,
        }
    }

    pub fn as_host(mut self) -> Self {
        self.is_host = true;
        self
    }

    pub fn record_win(&mut self) {
        self.battles_won += 1;
        self.recompute_win_rate();
    }

    pub fn record_loss(&mut self) {
        self.battles_lost += 1;
        self.recompute_win_rate();
    }

    fn recompute_win_rate(&mut self) {
        let decided = self.battles_won + self.battles_lost;
        self.win_rate = if decided == 0 {
            0.0
        } else {
            f64::from(self.battles_won) / f64::from(decided) * 100.0
        };
    }
}

/// Immutable description of a battle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleConfig {
    #[serde(default = "Uuid::new_v4")]
    pub battle_id: Uuid,
    pub title: String,
    /// Countdown length in ticks (seconds at the default tick interval)
    pub duration_secs: u32,
    pub creators: [CreatorParticipant; 2],
    pub scoring_method: ScoringMethod,
    pub allow_voting: bool,
    pub allow_gifts: bool,
    /// Entry fee paid by each creator, in SoftPoints
    pub entry_fee: u64,
}

impl BattleConfig {
    /// Reject malformed configuration before a session is created
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::Validation("battle title must not be empty".to_string()));
        }
        if self.duration_secs == 0 || self.duration_secs > MAX_DURATION_SECS {
            return Err(Error::Validation(format!(
                "battle duration must be between 1 and {} seconds, got {}",
                MAX_DURATION_SECS, self.duration_secs
            )));
        }
        let [first, second] = &self.creators;
        if first.id.trim().is_empty() || second.id.trim().is_empty() {
            return Err(Error::Validation("creator ids must not be empty".to_string()));
        }
        if first.id == second.id {
            return Err(Error::Validation(
                "a creator cannot battle themselves".to_string(),
            ));
        }
        if self.creators.iter().filter(|c| c.is_host).count() != 1 {
            return Err(Error::Validation(
                "exactly one creator must be the host".to_string(),
            ));
        }
        match self.scoring_method {
            ScoringMethod::Gifts if !self.allow_gifts => Err(Error::Validation(
                "gift scoring requires gifts to be allowed".to_string(),
            )),
            ScoringMethod::Votes if !self.allow_voting => Err(Error::Validation(
                "vote scoring requires voting to be allowed".to_string(),
            )),
            ScoringMethod::Hybrid if !(self.allow_gifts && self.allow_voting) => {
                Err(Error::Validation(
                    "hybrid scoring requires both gifts and voting".to_string(),
                ))
            }
            _ => Ok(()),
        }
    }

    pub fn creator_ids(&self) -> [String; 2] {
        [self.creators[0].id.clone(), self.creators[1].id.clone()]
    }
}

/// Snapshot of a battle, canonical for every UI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleState {
    pub battle_id: Uuid,
    pub title: String,
    pub status: BattleStatus,
    pub is_paused: bool,
    pub time_remaining: u32,
    pub duration_secs: u32,
    pub creators: [CreatorScore; 2],
    /// Progress-bar share of each creator (sums to 100)
    pub percentages: [f64; 2],
    pub viewer_count: u64,
    pub peak_viewers: u64,
    pub prize_pot: u64,
    /// Sequence of the latest event log entry
    pub last_sequence: u64,
    pub winner_id: Option<String>,
    pub end_reason: Option<EndReason>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::test_support::sample_config;

    #[test]
    fn test_valid_config() {
        assert!(sample_config().validate().is_ok());
    }

    #[test]
    fn test_self_battle_rejected() {
        let mut config = sample_config();
        config.creators[1].id = "alice".to_string();
        assert!(matches!(config.validate(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_exactly_one_host_required() {
        let mut config = sample_config();
        config.creators[1].is_host = true;
        assert!(config.validate().is_err());

        config.creators[0].is_host = false;
        config.creators[1].is_host = false;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duration_bounds() {
        let mut config = sample_config();
        config.duration_secs = 0;
        assert!(config.validate().is_err());
        config.duration_secs = MAX_DURATION_SECS + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_scoring_method_must_match_allowed_actions() {
        let mut config = sample_config();
        config.scoring_method = ScoringMethod::Gifts;
        config.allow_gifts = false;
        assert!(config.validate().is_err());

        let mut config = sample_config();
        config.scoring_method = ScoringMethod::Hybrid;
        config.allow_voting = false;
        assert!(config.validate().is_err());

        let mut config = sample_config();
        config.scoring_method = ScoringMethod::Votes;
        config.allow_gifts = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_win_rate_recomputed() {
        let mut creator = CreatorParticipant::new("c", "c", "C");
        creator.record_win();
        creator.record_win();
        creator.record_loss();
        creator.record_win();
        assert_eq!(creator.battles_won, 3);
        assert_eq!(creator.battles_lost, 1);
        assert!((creator.win_rate - 75.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_config_deserializes_with_generated_id() {
        let json = serde_json::json!({
            "title": "t",
            "duration_secs": 60,
            "creators": [
                {"id": "a", "username": "a", "display_name": "A", "is_host": true},
                {"id": "b", "username": "b", "display_name": "B"}
            ],
            "scoring_method": "gifts",
            "allow_voting": false,
            "allow_gifts": true,
            "entry_fee": 5
        });
        let config: BattleConfig = serde_json::from_value(json).expect("deserialize");
        assert!(config.validate().is_ok());
        assert!(config.creators[0].is_host);
        assert_eq!(config.creators[1].level, 0);
    }
}
