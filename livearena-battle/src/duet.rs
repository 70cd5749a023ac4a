//! Duet tips
//!
//! A duet pairs an original creator's footage with a second creator's
//! recording. Tips on a duet are split three ways: a platform fee, the
//! original creator's revenue share, and the remainder to the duet creator.
//! The split is independent of any battle.

use crate::error::{Error, Result};
use crate::services::{CreditRequest, Notification, NotificationKind, NotificationService};
use crate::settlement::{duet_source_ref, Settlement, SettlementService};
use livearena_common::events::{ArenaEvent, EventBus, PayoutRole};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuetType {
    SideBySide,
    React,
    GreenScreen,
    Stitch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutPosition {
    Left,
    Right,
    Top,
    Bottom,
    PictureInPicture,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioMix {
    OriginalOnly,
    DuetOnly,
    Mixed,
}

/// Presentation and monetization settings for one duet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuetConfig {
    pub duet_type: DuetType,
    pub layout_position: LayoutPosition,
    pub audio_mix: AudioMix,
    /// Share of the post-fee tip paid to the original creator (0-100)
    pub revenue_share_percentage: u8,
    pub allow_tips: bool,
    pub allow_comments: bool,
}

impl DuetConfig {
    pub fn validate(&self) -> Result<()> {
        if self.revenue_share_percentage > 100 {
            return Err(Error::Validation(format!(
                "revenue share must be between 0 and 100, got {}",
                self.revenue_share_percentage
            )));
        }
        Ok(())
    }
}

/// The three shares of a tip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TipSplit {
    pub platform_fee: u64,
    pub original_creator_share: u64,
    pub duet_creator_share: u64,
}

impl TipSplit {
    pub fn total(&self) -> u64 {
        self.platform_fee + self.original_creator_share + self.duet_creator_share
    }
}

/// Computes tip splits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DuetRevenueSplitter {
    platform_fee_bps: u32,
}

impl DuetRevenueSplitter {
    /// `platform_fee_bps` must not exceed 10000
    pub fn new(platform_fee_bps: u32) -> Self {
        Self { platform_fee_bps }
    }

    pub fn platform_fee_bps(&self) -> u32 {
        self.platform_fee_bps
    }

    /// Split `amount` given the original creator's percentage
    ///
    /// The platform fee and the original creator's share are rounded half
    /// away from zero; the duet creator receives whatever remains, so the
    /// three shares always sum to `amount`.
    pub fn compute_split(&self, amount: u64, revenue_share_percentage: u8) -> Result<TipSplit> {
        if revenue_share_percentage > 100 {
            return Err(Error::Validation(format!(
                "revenue share must be between 0 and 100, got {}",
                revenue_share_percentage
            )));
        }
        if self.platform_fee_bps > 10_000 {
            return Err(Error::Config(format!(
                "platform fee must be <= 10000 bps, got {}",
                self.platform_fee_bps
            )));
        }

        let platform_fee = round_ratio(amount, u128::from(self.platform_fee_bps), 10_000);
        let remaining = amount - platform_fee;
        let original_creator_share = round_ratio(remaining, u128::from(revenue_share_percentage), 100);

        Ok(TipSplit {
            platform_fee,
            original_creator_share,
            duet_creator_share: remaining - original_creator_share,
        })
    }

    /// Tip to a single creator: everything after the fee goes to them
    pub fn direct_tip(&self, amount: u64) -> Result<TipSplit> {
        self.compute_split(amount, 100)
    }
}

/// `value * numerator / denominator` rounded half up, for numerator <= denominator
fn round_ratio(value: u64, numerator: u128, denominator: u128) -> u64 {
    let scaled = u128::from(value) * numerator;
    // numerator <= denominator keeps the result <= value
    ((scaled + denominator / 2) / denominator) as u64
}

/// A registered duet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Duet {
    pub id: Uuid,
    pub original_creator_id: String,
    pub duet_creator_id: String,
    pub config: DuetConfig,
}

/// One settled (or pending) tip on a duet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuetTipTransaction {
    pub id: Uuid,
    pub duet_id: Uuid,
    pub tipper_id: String,
    pub amount: u64,
    pub platform_fee: u64,
    pub original_creator_share: u64,
    pub duet_creator_share: u64,
    pub settled: bool,
}

struct DuetEntry {
    duet: Duet,
    tips: Vec<DuetTipTransaction>,
}

/// Registry of duets and their tips
pub struct DuetService {
    duets: RwLock<HashMap<Uuid, DuetEntry>>,
    splitter: DuetRevenueSplitter,
    settlement: Arc<SettlementService>,
    notifier: Arc<dyn NotificationService>,
    event_bus: EventBus,
}

impl DuetService {
    pub fn new(
        splitter: DuetRevenueSplitter,
        settlement: Arc<SettlementService>,
        notifier: Arc<dyn NotificationService>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            duets: RwLock::new(HashMap::new()),
            splitter,
            settlement,
            notifier,
            event_bus,
        }
    }

    pub fn splitter(&self) -> &DuetRevenueSplitter {
        &self.splitter
    }

    pub async fn register_duet(
        &self,
        original_creator_id: &str,
        duet_creator_id: &str,
        config: DuetConfig,
    ) -> Result<Duet> {
        config.validate()?;
        if original_creator_id.trim().is_empty() || duet_creator_id.trim().is_empty() {
            return Err(Error::Validation("duet creator ids must not be empty".to_string()));
        }

        let duet = Duet {
            id: Uuid::new_v4(),
            original_creator_id: original_creator_id.to_string(),
            duet_creator_id: duet_creator_id.to_string(),
            config,
        };
        self.duets.write().await.insert(
            duet.id,
            DuetEntry {
                duet: duet.clone(),
                tips: Vec::new(),
            },
        );
        info!(duet_id = %duet.id, original = %original_creator_id, "Duet registered");
        Ok(duet)
    }

    pub async fn get(&self, duet_id: Uuid) -> Result<Duet> {
        self.duets
            .read()
            .await
            .get(&duet_id)
            .map(|e| e.duet.clone())
            .ok_or_else(|| Error::NotFound(format!("duet {}", duet_id)))
    }

    pub async fn tips(&self, duet_id: Uuid) -> Result<Vec<DuetTipTransaction>> {
        self.duets
            .read()
            .await
            .get(&duet_id)
            .map(|e| e.tips.clone())
            .ok_or_else(|| Error::NotFound(format!("duet {}", duet_id)))
    }

    /// Split a tip and credit all three parties
    ///
    /// The transaction is recorded before any credit is attempted. When the
    /// ledger keeps failing the tip stays unsettled and
    /// `retry_tip_settlement` can finish it.
    pub async fn tip(&self, duet_id: Uuid, tipper_id: &str, amount: u64) -> Result<(DuetTipTransaction, Settlement)> {
        if amount == 0 {
            return Err(Error::Validation("tip amount must be positive".to_string()));
        }

        let transaction = {
            let mut duets = self.duets.write().await;
            let entry = duets
                .get_mut(&duet_id)
                .ok_or_else(|| Error::NotFound(format!("duet {}", duet_id)))?;
            if !entry.duet.config.allow_tips {
                return Err(Error::Validation("tips are disabled for this duet".to_string()));
            }

            let split = self
                .splitter
                .compute_split(amount, entry.duet.config.revenue_share_percentage)?;
            let transaction = DuetTipTransaction {
                id: Uuid::new_v4(),
                duet_id,
                tipper_id: tipper_id.to_string(),
                amount,
                platform_fee: split.platform_fee,
                original_creator_share: split.original_creator_share,
                duet_creator_share: split.duet_creator_share,
                settled: false,
            };
            entry.tips.push(transaction.clone());
            transaction
        };

        self.settle_tip(transaction).await
    }

    /// Resubmit the credits of an unsettled tip
    pub async fn retry_tip_settlement(&self, duet_id: Uuid, tip_id: Uuid) -> Result<(DuetTipTransaction, Settlement)> {
        let transaction = {
            let duets = self.duets.read().await;
            let entry = duets
                .get(&duet_id)
                .ok_or_else(|| Error::NotFound(format!("duet {}", duet_id)))?;
            entry
                .tips
                .iter()
                .find(|t| t.id == tip_id)
                .cloned()
                .ok_or_else(|| Error::NotFound(format!("tip {} on duet {}", tip_id, duet_id)))?
        };
        if transaction.settled {
            return Err(Error::State(format!("tip {} is already settled", tip_id)));
        }
        self.settle_tip(transaction).await
    }

    async fn settle_tip(&self, mut transaction: DuetTipTransaction) -> Result<(DuetTipTransaction, Settlement)> {
        let duet = self.get(transaction.duet_id).await?;
        let source_ref = duet_source_ref(duet.id, transaction.id);

        let mut credits = vec![
            CreditRequest::new(
                self.settlement.platform_account_id(),
                transaction.platform_fee,
                &source_ref,
                PayoutRole::Platform,
            ),
            CreditRequest::new(
                &duet.original_creator_id,
                transaction.original_creator_share,
                &source_ref,
                PayoutRole::OriginalCreator,
            ),
            CreditRequest::new(
                &duet.duet_creator_id,
                transaction.duet_creator_share,
                &source_ref,
                PayoutRole::DuetCreator,
            ),
        ];
        credits.retain(|c| c.amount > 0);

        let settlement = self.settlement.settle(source_ref, credits).await;
        if !settlement.is_complete() {
            return Err(Error::ExternalService(format!(
                "tip {} recorded but not settled: {}",
                transaction.id,
                settlement.error.as_deref().unwrap_or("unknown ledger error")
            )));
        }

        transaction.settled = true;
        if let Some(entry) = self.duets.write().await.get_mut(&duet.id) {
            if let Some(stored) = entry.tips.iter_mut().find(|t| t.id == transaction.id) {
                stored.settled = true;
            }
        }

        self.event_bus.emit_lossy(ArenaEvent::DuetTipSettled {
            duet_id: duet.id,
            tip_id: transaction.id,
            tipper_id: transaction.tipper_id.clone(),
            amount: transaction.amount,
            platform_fee: transaction.platform_fee,
            original_creator_share: transaction.original_creator_share,
            duet_creator_share: transaction.duet_creator_share,
            timestamp: livearena_common::time::now(),
        });

        for recipient in [&duet.original_creator_id, &duet.duet_creator_id] {
            let notification = Notification {
                recipient_id: recipient.clone(),
                kind: NotificationKind::TipReceived,
                subject_id: duet.id,
                message: format!("{} tipped {} SoftPoints on your duet", transaction.tipper_id, transaction.amount),
            };
            if let Err(e) = self.notifier.notify(notification).await {
                warn!(duet_id = %duet.id, "Tip notification failed: {}", e);
            }
        }

        Ok((transaction, settlement))
    }
}
