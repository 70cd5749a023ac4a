//! Battle lifecycle
//!
//! `BattleSession` is the per-battle state machine (Waiting → Live → Ended).
//! `BattleService` is the registry of sessions, serializing writes per battle
//! and wiring the external collaborators. `TickScheduler` drives countdowns.

pub mod scheduler;
pub mod service;
pub mod session;
pub mod types;

pub use scheduler::TickScheduler;
pub use service::{BattleCollaborators, BattleService};
pub use session::{BattleOutcome, BattleSession, Refund, ScoreAudit, TickOutcome};
pub use types::{BattleConfig, BattleState, CreatorParticipant, ScoringMethod, MAX_DURATION_SECS};

#[cfg(test)]
pub(crate) mod test_support {
    use super::types::{BattleConfig, CreatorParticipant, ScoringMethod};
    use uuid::Uuid;

    /// Hybrid 5-minute battle, alice (host) vs bob, entry fee 10
    pub fn sample_config() -> BattleConfig {
        BattleConfig {
            battle_id: Uuid::new_v4(),
            title: "Friday Night Showdown".to_string(),
            duration_secs: 300,
            creators: [
                CreatorParticipant::new("alice", "alice", "Alice").as_host(),
                CreatorParticipant::new("bob", "bob", "Bob"),
            ],
            scoring_method: ScoringMethod::Hybrid,
            allow_voting: true,
            allow_gifts: true,
            entry_fee: 10,
        }
    }
}
