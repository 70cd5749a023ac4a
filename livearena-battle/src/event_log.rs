//! Per-battle append-only event log
//!
//! Every accepted gift, vote and chat message is recorded with a sequence
//! number that starts at 1 and increases by exactly one per entry. The log is
//! the audit trail: scores and combo counters can be rebuilt from it, and
//! downstream consumers can resume from the last sequence they processed.

use crate::battle::ScoringMethod;
use crate::catalog::GiftCatalog;
use crate::error::Result;
use crate::scoring::{gift_points, vote_value};
use chrono::{DateTime, Utc};
use livearena_common::events::CreatorScore;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Accepted gift
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GiftEvent {
    pub id: Uuid,
    pub sender_id: String,
    pub recipient_creator_id: String,
    pub gift_id: String,
    pub quantity: u32,
    /// point_value * quantity at the time the gift was applied
    pub total_value: u64,
    pub timestamp: DateTime<Utc>,
    pub sequence: u64,
}

/// Accepted vote
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteEvent {
    pub voter_id: String,
    pub creator_id: String,
    pub timestamp: DateTime<Utc>,
    pub sequence: u64,
}

/// Chat line delivered to viewers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub sender_id: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub sequence: u64,
}

/// One log entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LogEntry {
    Gift(GiftEvent),
    Vote(VoteEvent),
    Chat(ChatMessage),
}

impl LogEntry {
    pub fn sequence(&self) -> u64 {
        match self {
            LogEntry::Gift(e) => e.sequence,
            LogEntry::Vote(e) => e.sequence,
            LogEntry::Chat(e) => e.sequence,
        }
    }
}

/// Append-only log for one battle
#[derive(Debug, Clone)]
pub struct EventLog {
    battle_id: Uuid,
    entries: Vec<LogEntry>,
}

impl EventLog {
    pub fn new(battle_id: Uuid) -> Self {
        Self {
            battle_id,
            entries: Vec::new(),
        }
    }

    pub fn battle_id(&self) -> Uuid {
        self.battle_id
    }

    /// Sequence of the most recent entry (0 when empty)
    pub fn last_sequence(&self) -> u64 {
        self.entries.len() as u64
    }

    fn next_sequence(&self) -> u64 {
        self.last_sequence() + 1
    }

    pub fn record_gift(
        &mut self,
        sender_id: &str,
        recipient_creator_id: &str,
        gift_id: &str,
        quantity: u32,
        total_value: u64,
    ) -> GiftEvent {
        let event = GiftEvent {
            id: Uuid::new_v4(),
            sender_id: sender_id.to_string(),
            recipient_creator_id: recipient_creator_id.to_string(),
            gift_id: gift_id.to_string(),
            quantity,
            total_value,
            timestamp: livearena_common::time::now(),
            sequence: self.next_sequence(),
        };
        self.entries.push(LogEntry::Gift(event.clone()));
        event
    }

    pub fn record_vote(&mut self, voter_id: &str, creator_id: &str) -> VoteEvent {
        let event = VoteEvent {
            voter_id: voter_id.to_string(),
            creator_id: creator_id.to_string(),
            timestamp: livearena_common::time::now(),
            sequence: self.next_sequence(),
        };
        self.entries.push(LogEntry::Vote(event.clone()));
        event
    }

    pub fn record_chat(&mut self, sender_id: &str, text: &str) -> ChatMessage {
        let message = ChatMessage {
            id: Uuid::new_v4(),
            sender_id: sender_id.to_string(),
            text: text.to_string(),
            timestamp: livearena_common::time::now(),
            sequence: self.next_sequence(),
        };
        self.entries.push(LogEntry::Chat(message.clone()));
        message
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Entries with sequence strictly greater than `sequence`
    ///
    /// Used by consumers replaying after a failure: pass the last sequence
    /// successfully processed.
    pub fn since(&self, sequence: u64) -> &[LogEntry] {
        let start = usize::try_from(sequence)
            .unwrap_or(usize::MAX)
            .min(self.entries.len());
        &self.entries[start..]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rebuild per-creator totals from the log using catalog point values
    ///
    /// Entries for recipients outside `creator_ids` are ignored; the scoring
    /// engine never records such entries.
    pub fn reconstruct_scores(
        &self,
        catalog: &GiftCatalog,
        creator_ids: &[String; 2],
        vote_points: u64,
        method: ScoringMethod,
    ) -> Result<[CreatorScore; 2]> {
        let mut scores = [
            CreatorScore::new(creator_ids[0].clone()),
            CreatorScore::new(creator_ids[1].clone()),
        ];

        for entry in &self.entries {
            match entry {
                LogEntry::Gift(gift) => {
                    let value = catalog.lookup(&gift.gift_id)?.point_value * u64::from(gift.quantity);
                    if let Some(s) = scores.iter_mut().find(|s| s.creator_id == gift.recipient_creator_id) {
                        s.gift_total += value;
                        s.score += gift_points(method, value);
                    }
                }
                LogEntry::Vote(vote) => {
                    if let Some(s) = scores.iter_mut().find(|s| s.creator_id == vote.creator_id) {
                        s.vote_count += 1;
                        s.score += vote_value(method, vote_points);
                    }
                }
                LogEntry::Chat(_) => {}
            }
        }

        Ok(scores)
    }

    /// Rebuild combo counters: (gift_id, recipient_id) -> cumulative quantity
    pub fn combo_counts(&self) -> HashMap<(String, String), u64> {
        let mut combos = HashMap::new();
        for entry in &self.entries {
            if let LogEntry::Gift(gift) = entry {
                *combos
                    .entry((gift.gift_id.clone(), gift.recipient_creator_id.clone()))
                    .or_insert(0) += u64::from(gift.quantity);
            }
        }
        combos
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creators() -> [String; 2] {
        ["alice".to_string(), "bob".to_string()]
    }

    #[test]
    fn test_sequences_start_at_one_and_are_contiguous() {
        let mut log = EventLog::new(Uuid::new_v4());
        assert_eq!(log.last_sequence(), 0);

        let g = log.record_gift("v1", "alice", "rose", 3, 3);
        let v = log.record_vote("v2", "bob");
        let c = log.record_chat("v3", "gg");

        assert_eq!((g.sequence, v.sequence, c.sequence), (1, 2, 3));
        let seqs: Vec<u64> = log.entries().iter().map(LogEntry::sequence).collect();
        assert_eq!(seqs, vec![1, 2, 3]);
    }

    #[test]
    fn test_since_returns_tail_after_sequence() {
        let mut log = EventLog::new(Uuid::new_v4());
        for i in 0..5 {
            log.record_chat("v", &format!("msg {}", i));
        }

        assert_eq!(log.since(0).len(), 5);
        assert_eq!(log.since(3).len(), 2);
        assert_eq!(log.since(3)[0].sequence(), 4);
        assert!(log.since(5).is_empty());
        assert!(log.since(u64::MAX).is_empty());
    }

    #[test]
    fn test_reconstruct_scores_from_catalog() {
        let catalog = GiftCatalog::standard();
        let mut log = EventLog::new(Uuid::new_v4());
        log.record_gift("v1", "bob", "dragon", 2, 1000);
        log.record_gift("v2", "alice", "heart", 4, 20);
        log.record_vote("v3", "alice");
        log.record_chat("v4", "hi");

        let scores = log
            .reconstruct_scores(&catalog, &creators(), 10, ScoringMethod::Hybrid)
            .expect("known gifts");
        assert_eq!(scores[0].score, 30);
        assert_eq!(scores[0].gift_total, 20);
        assert_eq!(scores[0].vote_count, 1);
        assert_eq!(scores[1].score, 1000);
        assert_eq!(scores[1].gift_total, 1000);
    }

    #[test]
    fn test_combo_counts_accumulate_per_gift_and_recipient() {
        let mut log = EventLog::new(Uuid::new_v4());
        log.record_gift("v1", "alice", "rose", 3, 3);
        log.record_gift("v2", "alice", "rose", 2, 2);
        log.record_gift("v2", "bob", "rose", 1, 1);

        let combos = log.combo_counts();
        assert_eq!(combos[&("rose".to_string(), "alice".to_string())], 5);
        assert_eq!(combos[&("rose".to_string(), "bob".to_string())], 1);
    }

    #[test]
    fn test_entry_serialization_is_tagged() {
        let mut log = EventLog::new(Uuid::new_v4());
        log.record_vote("v1", "alice");
        let json = serde_json::to_value(&log.entries()[0]).expect("serialize");
        assert_eq!(json["kind"], "vote");
        assert_eq!(json["sequence"], 1);
    }
}
