//! Wallet ledger
//!
//! Credits are idempotent on (source_ref, user_id, role): resubmitting a credit
//! that was already applied returns the original receipt and moves no money.

use crate::error::{Error, Result};
use async_trait::async_trait;
use livearena_common::events::PayoutRole;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

/// One payout to one account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditRequest {
    pub user_id: String,
    pub amount: u64,
    /// "battle:<uuid>" or "duet:<duet uuid>:<tip uuid>"
    pub source_ref: String,
    pub role: PayoutRole,
}

impl CreditRequest {
    pub fn new(user_id: &str, amount: u64, source_ref: &str, role: PayoutRole) -> Self {
        Self {
            user_id: user_id.to_string(),
            amount,
            source_ref: source_ref.to_string(),
            role,
        }
    }

    pub fn idempotency_key(&self) -> String {
        format!("{}|{}|{}", self.source_ref, self.user_id, self.role)
    }
}

/// Ledger acknowledgement of a credit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditReceipt {
    pub transaction_id: Uuid,
    pub idempotency_key: String,
    pub user_id: String,
    pub amount: u64,
    /// True when this request replayed an already-applied credit
    pub duplicate: bool,
}

#[async_trait]
pub trait WalletLedgerService: Send + Sync {
    /// Apply a credit; failures are `Error::ExternalService` and safe to retry
    async fn credit(&self, request: &CreditRequest) -> Result<CreditReceipt>;
}

#[derive(Debug, Default)]
struct LedgerState {
    receipts: HashMap<String, CreditReceipt>,
    balances: HashMap<String, u64>,
    pending_failures: u32,
}

/// Ledger kept in process memory
#[derive(Debug, Default)]
pub struct InMemoryWalletLedger {
    state: Mutex<LedgerState>,
}

impl InMemoryWalletLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `count` credit calls with an external service error
    pub async fn fail_next(&self, count: u32) {
        self.state.lock().await.pending_failures = count;
    }

    pub async fn balance(&self, user_id: &str) -> u64 {
        self.state
            .lock()
            .await
            .balances
            .get(user_id)
            .copied()
            .unwrap_or(0)
    }

    /// Distinct credits applied
    pub async fn credit_count(&self) -> usize {
        self.state.lock().await.receipts.len()
    }

    pub async fn total_credited(&self) -> u64 {
        self.state.lock().await.balances.values().sum()
    }
}

#[async_trait]
impl WalletLedgerService for InMemoryWalletLedger {
    async fn credit(&self, request: &CreditRequest) -> Result<CreditReceipt> {
        let mut state = self.state.lock().await;

        if state.pending_failures > 0 {
            state.pending_failures -= 1;
            return Err(Error::ExternalService(format!(
                "wallet ledger unavailable while crediting {}",
                request.user_id
            )));
        }

        let key = request.idempotency_key();
        if let Some(existing) = state.receipts.get(&key) {
            return Ok(CreditReceipt {
                duplicate: true,
                ..existing.clone()
            });
        }

        let receipt = CreditReceipt {
            transaction_id: Uuid::new_v4(),
            idempotency_key: key.clone(),
            user_id: request.user_id.clone(),
            amount: request.amount,
            duplicate: false,
        };
        *state.balances.entry(request.user_id.clone()).or_insert(0) += request.amount;
        state.receipts.insert(key, receipt.clone());
        Ok(receipt)
    }
}
