//! Prize, refund and tip payouts
//!
//! Turns a battle outcome or a tip split into ledger credits and submits them
//! with bounded retries. Every credit carries an idempotency key, so a failed
//! settlement can be retried from the start without double-paying anyone.

use crate::battle::BattleOutcome;
use crate::config::SettlementConfig;
use crate::error::{Error, Result};
use crate::services::{CreditReceipt, CreditRequest, WalletLedgerService};
use livearena_common::events::{ArenaEvent, EventBus, PayoutRole, PrizeDistribution};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Ceiling for the delay between ledger attempts
pub const MAX_RETRY_BACKOFF: Duration = Duration::from_secs(30);

/// Double `current`, capped at `MAX_RETRY_BACKOFF`
fn next_backoff(current: Duration) -> Duration {
    current.saturating_mul(2).min(MAX_RETRY_BACKOFF)
}

/// Ledger source reference for a battle's payouts
pub fn battle_source_ref(battle_id: Uuid) -> String {
    format!("battle:{}", battle_id)
}

/// Ledger source reference for one tip on a duet
pub fn duet_source_ref(duet_id: Uuid, tip_id: Uuid) -> String {
    format!("duet:{}:{}", duet_id, tip_id)
}

/// Result of submitting a set of credits
#[derive(Debug, Clone, Serialize)]
pub struct Settlement {
    pub source_ref: String,
    /// Prize split, absent for aborted battles and tips
    pub distribution: Option<PrizeDistribution>,
    pub credits: Vec<CreditRequest>,
    pub receipts: Vec<CreditReceipt>,
    /// Last ledger error when not every credit was applied
    pub error: Option<String>,
}

impl Settlement {
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }

    pub fn total_amount(&self) -> u64 {
        self.credits.iter().map(|c| c.amount).sum()
    }
}

pub struct SettlementService {
    ledger: Arc<dyn WalletLedgerService>,
    event_bus: EventBus,
    config: SettlementConfig,
}

impl SettlementService {
    pub fn new(ledger: Arc<dyn WalletLedgerService>, event_bus: EventBus, config: SettlementConfig) -> Self {
        Self {
            ledger,
            event_bus,
            config,
        }
    }

    pub fn platform_account_id(&self) -> &str {
        &self.config.platform_account_id
    }

    /// Credits owed for an ended battle
    ///
    /// Zero-amount shares are skipped.
    pub fn plan_battle(&self, outcome: &BattleOutcome) -> Vec<CreditRequest> {
        let source_ref = battle_source_ref(outcome.battle_id);
        let mut credits = Vec::new();

        if let Some(d) = &outcome.distribution {
            let [first, second] = &outcome.final_scores;
            if d.tie {
                credits.push(CreditRequest::new(&first.creator_id, d.winner_share, &source_ref, PayoutRole::TiedCreator));
                credits.push(CreditRequest::new(&second.creator_id, d.runner_up_share, &source_ref, PayoutRole::TiedCreator));
            } else if let Some(winner_id) = &outcome.winner_id {
                let runner_up_id = if &first.creator_id == winner_id {
                    &second.creator_id
                } else {
                    &first.creator_id
                };
                credits.push(CreditRequest::new(winner_id, d.winner_share, &source_ref, PayoutRole::Winner));
                credits.push(CreditRequest::new(runner_up_id, d.runner_up_share, &source_ref, PayoutRole::RunnerUp));
            }
            credits.push(CreditRequest::new(
                &self.config.platform_account_id,
                d.viewer_pool_share,
                &source_ref,
                PayoutRole::ViewerPool,
            ));
        }

        for refund in &outcome.refunds {
            credits.push(CreditRequest::new(&refund.creator_id, refund.amount, &source_ref, PayoutRole::EntryFeeRefund));
        }

        credits.retain(|c| c.amount > 0);
        credits
    }

    /// Pay out an ended battle
    pub async fn settle_battle(&self, outcome: &BattleOutcome) -> Settlement {
        let credits = self.plan_battle(outcome);
        let mut settlement = self.settle(battle_source_ref(outcome.battle_id), credits).await;
        settlement.distribution = outcome.distribution;
        settlement
    }

    /// Submit `credits` in order, stopping at the first credit that still
    /// fails after all attempts
    pub async fn settle(&self, source_ref: String, credits: Vec<CreditRequest>) -> Settlement {
        let mut receipts = Vec::with_capacity(credits.len());
        let mut error = None;

        for credit in &credits {
            match self.credit_with_retry(credit).await {
                Ok(receipt) => receipts.push(receipt),
                Err(e) => {
                    error = Some(e.to_string());
                    break;
                }
            }
        }

        let settlement = Settlement {
            source_ref,
            distribution: None,
            credits,
            receipts,
            error,
        };

        let timestamp = livearena_common::time::now();
        match &settlement.error {
            None => {
                info!(
                    source_ref = %settlement.source_ref,
                    credits = settlement.receipts.len(),
                    total = settlement.total_amount(),
                    "Settlement completed"
                );
                self.event_bus.emit_lossy(ArenaEvent::SettlementCompleted {
                    source_ref: settlement.source_ref.clone(),
                    credits: settlement.receipts.len(),
                    total_amount: settlement.total_amount(),
                    timestamp,
                });
            }
            Some(e) => {
                warn!(source_ref = %settlement.source_ref, error = %e, "Settlement failed");
                self.event_bus.emit_lossy(ArenaEvent::SettlementFailed {
                    source_ref: settlement.source_ref.clone(),
                    error: e.clone(),
                    timestamp,
                });
            }
        }

        settlement
    }

    async fn credit_with_retry(&self, credit: &CreditRequest) -> Result<CreditReceipt> {
        let mut backoff = Duration::from_millis(self.config.retry_backoff_ms).min(MAX_RETRY_BACKOFF);
        let mut attempt = 1;

        loop {
            match self.ledger.credit(credit).await {
                Ok(receipt) => {
                    if receipt.duplicate {
                        debug!(key = %receipt.idempotency_key, "Credit already applied");
                    }
                    return Ok(receipt);
                }
                Err(e) if attempt < self.config.max_attempts => {
                    warn!(
                        key = %credit.idempotency_key(),
                        attempt,
                        "Ledger credit failed, retrying in {:?}: {}",
                        backoff,
                        e
                    );
                    tokio::time::sleep(backoff).await;
                    backoff = next_backoff(backoff);
                    attempt += 1;
                }
                Err(e) => {
                    return Err(Error::ExternalService(format!(
                        "credit {} failed after {} attempts: {}",
                        credit.idempotency_key(),
                        attempt,
                        e
                    )))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::session::Refund;
    use crate::services::InMemoryWalletLedger;
    use livearena_common::events::{CreatorScore, EndReason};

    fn service(ledger: Arc<InMemoryWalletLedger>, max_attempts: u32) -> SettlementService {
        SettlementService::new(
            ledger,
            EventBus::new(16),
            SettlementConfig {
                max_attempts,
                retry_backoff_ms: 10,
                platform_account_id: "platform".to_string(),
            },
        )
    }

    fn outcome(winner: Option<&str>, distribution: Option<PrizeDistribution>, refunds: Vec<Refund>) -> BattleOutcome {
        BattleOutcome {
            battle_id: Uuid::new_v4(),
            reason: EndReason::TimerExpired,
            winner_id: winner.map(str::to_string),
            final_scores: [CreatorScore::new("alice"), CreatorScore::new("bob")],
            distribution,
            refunds,
            ended_at: livearena_common::time::now(),
        }
    }

    #[test]
    fn test_plan_for_decided_battle() {
        let svc = service(Arc::new(InMemoryWalletLedger::new()), 1);
        let d = PrizeDistribution {
            prize_pot: 200,
            winner_share: 120,
            runner_up_share: 60,
            viewer_pool_share: 20,
            tie: false,
        };
        let credits = svc.plan_battle(&outcome(Some("bob"), Some(d), vec![]));

        let summary: Vec<(&str, u64, PayoutRole)> =
            credits.iter().map(|c| (c.user_id.as_str(), c.amount, c.role)).collect();
        assert_eq!(
            summary,
            vec![
                ("bob", 120, PayoutRole::Winner),
                ("alice", 60, PayoutRole::RunnerUp),
                ("platform", 20, PayoutRole::ViewerPool),
            ]
        );
    }

    #[test]
    fn test_plan_for_abort_refunds_and_skips_zero() {
        let svc = service(Arc::new(InMemoryWalletLedger::new()), 1);
        let refunds = vec![
            Refund {
                creator_id: "alice".to_string(),
                amount: 10,
            },
            Refund {
                creator_id: "bob".to_string(),
                amount: 0,
            },
        ];
        let credits = svc.plan_battle(&outcome(None, None, refunds));
        assert_eq!(credits.len(), 1);
        assert_eq!(credits[0].role, PayoutRole::EntryFeeRefund);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failure_is_retried() {
        let ledger = Arc::new(InMemoryWalletLedger::new());
        ledger.fail_next(2).await;
        let svc = service(ledger.clone(), 3);

        let credits = vec![CreditRequest::new("alice", 50, "battle:x", PayoutRole::Winner)];
        let settlement = svc.settle("battle:x".to_string(), credits).await;

        assert!(settlement.is_complete());
        assert_eq!(ledger.balance("alice").await, 50);
    }

    #[test]
    fn test_backoff_doubles_up_to_cap() {
        assert_eq!(next_backoff(Duration::from_millis(200)), Duration::from_millis(400));
        assert_eq!(next_backoff(Duration::from_secs(20)), MAX_RETRY_BACKOFF);
        assert_eq!(next_backoff(MAX_RETRY_BACKOFF), MAX_RETRY_BACKOFF);
    }

    #[tokio::test(start_paused = true)]
    async fn test_long_outage_with_many_attempts_keeps_waiting_at_cap() {
        let ledger = Arc::new(InMemoryWalletLedger::new());
        ledger.fail_next(99).await;
        let svc = service(ledger.clone(), 100);

        let started = tokio::time::Instant::now();
        let credits = vec![CreditRequest::new("alice", 50, "battle:z", PayoutRole::Winner)];
        let settlement = svc.settle("battle:z".to_string(), credits).await;

        assert!(settlement.is_complete());
        assert_eq!(ledger.balance("alice").await, 50);
        // 99 waits, none longer than the cap
        assert!(started.elapsed() <= MAX_RETRY_BACKOFF * 99);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_report_failure_and_replay_is_safe() {
        let ledger = Arc::new(InMemoryWalletLedger::new());
        let svc = service(ledger.clone(), 2);
        let credits = vec![
            CreditRequest::new("alice", 50, "battle:y", PayoutRole::Winner),
            CreditRequest::new("bob", 25, "battle:y", PayoutRole::RunnerUp),
        ];

        ledger.credit(&credits[0]).await.expect("pre-applied");
        // Outage outlasts the retry budget
        ledger.fail_next(2).await;
        let failed = svc.settle("battle:y".to_string(), credits.clone()).await;
        assert!(!failed.is_complete());

        let retried = svc.settle("battle:y".to_string(), credits).await;
        assert!(retried.is_complete());
        assert!(retried.receipts[0].duplicate);
        assert_eq!(ledger.balance("alice").await, 50);
        assert_eq!(ledger.balance("bob").await, 25);
    }
}
