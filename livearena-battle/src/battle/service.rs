//! Battle registry and orchestration
//!
//! **Concurrency model:**
//! - The registry map sits behind an `RwLock` and is write-locked only to
//!   insert a new battle.
//! - Each battle owns one `Mutex<BattleSession>`; every mutation of that
//!   battle goes through it, so events are applied in arrival order and
//!   battles proceed independently of each other.
//! - Bus events describing a mutation are emitted while the battle lock is
//!   held, so subscribers see them in the same order they were applied.
//! - Media acquisition and settlement run without the battle lock held.

use super::scheduler::TickScheduler;
use super::session::{BattleOutcome, BattleSession, ScoreAudit, TickOutcome};
use super::types::{BattleConfig, BattleState};
use crate::catalog::GiftCatalog;
use crate::config::{GameRules, TimerConfig};
use crate::error::{ConflictError, Error, ResourceError, Result};
use crate::event_log::{ChatMessage, GiftEvent, LogEntry, VoteEvent};
use crate::services::{
    ChatTransport, EventBusChatTransport, InMemoryMediaCapture, MediaCaptureService, MediaStream, Notification,
    NotificationKind, NotificationService, TracingNotifier,
};
use crate::settlement::{Settlement, SettlementService};
use livearena_common::events::{ArenaEvent, BattleStatus, EndReason, EventBus};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Collaborators a battle needs besides the ledger
#[derive(Clone)]
pub struct BattleCollaborators {
    pub media: Arc<dyn MediaCaptureService>,
    pub notifier: Arc<dyn NotificationService>,
    pub chat: Arc<dyn ChatTransport>,
}

impl BattleCollaborators {
    /// In-process media, log-only notifications, chat over the EventBus
    pub fn in_memory(event_bus: &EventBus) -> Self {
        Self {
            media: Arc::new(InMemoryMediaCapture::new()),
            notifier: Arc::new(TracingNotifier),
            chat: Arc::new(EventBusChatTransport::new(event_bus.clone())),
        }
    }
}

struct BattleHandle {
    session: Mutex<BattleSession>,
    /// Cancelled when the battle ends; stops an in-flight start and the scheduler
    cancel: CancellationToken,
    starting: AtomicBool,
    streams: Mutex<Vec<MediaStream>>,
    settlement: Mutex<Option<Settlement>>,
}

/// Clears the in-progress start flag on every exit path
struct StartGuard<'a>(&'a AtomicBool);

impl Drop for StartGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Keyed repository of battle sessions
pub struct BattleService {
    battles: RwLock<HashMap<Uuid, Arc<BattleHandle>>>,
    catalog: Arc<GiftCatalog>,
    rules: GameRules,
    timer: TimerConfig,
    collaborators: BattleCollaborators,
    settlement: Arc<SettlementService>,
    event_bus: EventBus,
}

impl BattleService {
    pub fn new(
        catalog: Arc<GiftCatalog>,
        rules: GameRules,
        timer: TimerConfig,
        collaborators: BattleCollaborators,
        settlement: Arc<SettlementService>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            battles: RwLock::new(HashMap::new()),
            catalog,
            rules,
            timer,
            collaborators,
            settlement,
            event_bus,
        }
    }

    pub fn catalog(&self) -> &GiftCatalog {
        &self.catalog
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    async fn handle(&self, battle_id: Uuid) -> Result<Arc<BattleHandle>> {
        self.battles
            .read()
            .await
            .get(&battle_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("battle {}", battle_id)))
    }

    /// Register a battle in Waiting
    pub async fn create_battle(&self, config: BattleConfig) -> Result<BattleState> {
        let session = BattleSession::new(config, Arc::clone(&self.catalog), &self.rules)?;
        let battle_id = session.id();
        let state = session.state();
        let creator_ids = session.config().creator_ids().to_vec();

        {
            let mut battles = self.battles.write().await;
            if battles.contains_key(&battle_id) {
                return Err(ConflictError::BattleExists(battle_id.to_string()).into());
            }
            battles.insert(
                battle_id,
                Arc::new(BattleHandle {
                    session: Mutex::new(session),
                    cancel: CancellationToken::new(),
                    starting: AtomicBool::new(false),
                    streams: Mutex::new(Vec::new()),
                    settlement: Mutex::new(None),
                }),
            );
        }

        info!(battle_id = %battle_id, title = %state.title, "Battle created");
        self.event_bus.emit_lossy(ArenaEvent::BattleCreated {
            battle_id,
            title: state.title.clone(),
            creator_ids,
            duration_secs: state.duration_secs,
            timestamp: livearena_common::time::now(),
        });
        Ok(state)
    }

    /// Create a battle and take it Live
    ///
    /// When media acquisition fails the battle stays registered in Waiting
    /// and `start` can be retried with the same id.
    pub async fn start_battle(self: &Arc<Self>, config: BattleConfig) -> Result<BattleState> {
        let state = self.create_battle(config).await?;
        self.start(state.battle_id).await
    }

    /// Acquire media for every participant and take a Waiting battle Live
    pub async fn start(self: &Arc<Self>, battle_id: Uuid) -> Result<BattleState> {
        let handle = self.handle(battle_id).await?;

        if handle
            .starting
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(Error::State("battle start already in progress".to_string()));
        }
        let _guard = StartGuard(&handle.starting);

        let constraints = {
            let session = handle.session.lock().await;
            if session.status() != BattleStatus::Waiting {
                return Err(Error::invalid_state("start", session.status()));
            }
            session.media_constraints()
        };

        let mut streams = Vec::with_capacity(constraints.len());
        for constraint in &constraints {
            let acquired = tokio::select! {
                _ = handle.cancel.cancelled() => Err(ResourceError::Cancelled {
                    participant_id: constraint.participant_id.clone(),
                }),
                result = self.collaborators.media.acquire(constraint) => result,
            };

            match acquired {
                Ok(stream) => streams.push(stream),
                Err(e) => {
                    self.release_streams(&streams).await;
                    warn!(battle_id = %battle_id, "Battle start failed: {}", e);
                    self.event_bus.emit_lossy(ArenaEvent::BattleStartFailed {
                        battle_id,
                        reason: e.to_string(),
                        timestamp: livearena_common::time::now(),
                    });
                    return Err(e.into());
                }
            }
        }

        let state = {
            let mut session = handle.session.lock().await;
            if let Err(e) = session.go_live() {
                // Aborted while media was being acquired
                drop(session);
                self.release_streams(&streams).await;
                return Err(e);
            }
            self.event_bus.emit_lossy(ArenaEvent::BattleStarted {
                battle_id,
                duration_secs: session.config().duration_secs,
                timestamp: livearena_common::time::now(),
            });
            session.state()
        };
        *handle.streams.lock().await = streams;

        for score in &state.creators {
            self.notify(Notification {
                recipient_id: score.creator_id.clone(),
                kind: NotificationKind::BattleLive,
                subject_id: battle_id,
                message: format!("Your battle \"{}\" is live", state.title),
            })
            .await;
        }

        if self.timer.auto_tick {
            TickScheduler::new(self.timer.tick_interval()).spawn(Arc::clone(self), battle_id, handle.cancel.clone());
        }

        Ok(state)
    }

    pub async fn send_gift(
        &self,
        battle_id: Uuid,
        sender_id: &str,
        recipient_id: &str,
        gift_id: &str,
        quantity: u32,
    ) -> Result<GiftEvent> {
        let handle = self.handle(battle_id).await?;
        let mut session = handle.session.lock().await;
        let outcome = session.apply_gift(sender_id, recipient_id, gift_id, quantity)?;

        debug!(
            battle_id = %battle_id,
            sequence = outcome.event.sequence,
            recipient = %recipient_id,
            gift = %gift_id,
            quantity,
            combo = outcome.combo_count,
            "Gift applied"
        );
        let event = outcome.event;
        self.event_bus.emit_lossy(ArenaEvent::GiftReceived {
            battle_id,
            sequence: event.sequence,
            sender_id: event.sender_id.clone(),
            recipient_id: event.recipient_creator_id.clone(),
            gift_id: event.gift_id.clone(),
            quantity: event.quantity,
            total_value: event.total_value,
            combo_count: outcome.combo_count,
            has_special_effect: outcome.has_special_effect,
            timestamp: event.timestamp,
        });
        self.event_bus.emit_lossy(ArenaEvent::ScoreUpdated {
            battle_id,
            scores: outcome.scores.to_vec(),
            timestamp: event.timestamp,
        });
        Ok(event)
    }

    pub async fn cast_vote(&self, battle_id: Uuid, voter_id: &str, creator_id: &str) -> Result<VoteEvent> {
        let handle = self.handle(battle_id).await?;
        let mut session = handle.session.lock().await;
        let outcome = session.apply_vote(voter_id, creator_id)?;

        debug!(battle_id = %battle_id, sequence = outcome.event.sequence, creator = %creator_id, "Vote applied");
        let event = outcome.event;
        self.event_bus.emit_lossy(ArenaEvent::VoteCast {
            battle_id,
            sequence: event.sequence,
            voter_id: event.voter_id.clone(),
            creator_id: event.creator_id.clone(),
            timestamp: event.timestamp,
        });
        self.event_bus.emit_lossy(ArenaEvent::ScoreUpdated {
            battle_id,
            scores: outcome.scores.to_vec(),
            timestamp: event.timestamp,
        });
        Ok(event)
    }

    /// Advance the countdown by one tick
    pub async fn tick(&self, battle_id: Uuid) -> Result<BattleState> {
        let handle = self.handle(battle_id).await?;
        let (state, ended) = {
            let mut session = handle.session.lock().await;
            self.tick_locked(&mut session, battle_id)?
        };

        if let Some(outcome) = ended {
            self.finalize(&handle, &outcome).await;
        }
        Ok(state)
    }

    /// Tick driven by the scheduler
    ///
    /// Paused battles are skipped. Returns `None` once the battle is no
    /// longer Live, telling the scheduler to stop. The paused check and the
    /// tick share one lock acquisition.
    pub async fn scheduled_tick(&self, battle_id: Uuid) -> Result<Option<BattleState>> {
        let handle = self.handle(battle_id).await?;
        let (state, ended) = {
            let mut session = handle.session.lock().await;
            if session.status() != BattleStatus::Live {
                return Ok(None);
            }
            if session.is_paused() {
                return Ok(Some(session.state()));
            }
            self.tick_locked(&mut session, battle_id)?
        };

        if let Some(outcome) = ended {
            self.finalize(&handle, &outcome).await;
        }
        Ok((state.status == BattleStatus::Live).then_some(state))
    }

    /// Tick a session whose lock the caller holds
    ///
    /// Returns the outcome when this tick ended the battle; the caller
    /// finalizes it after releasing the lock.
    fn tick_locked(
        &self,
        session: &mut BattleSession,
        battle_id: Uuid,
    ) -> Result<(BattleState, Option<BattleOutcome>)> {
        let outcome = session.tick()?;
        self.event_bus.emit_lossy(ArenaEvent::TimerTick {
            battle_id,
            time_remaining: session.time_remaining(),
            timestamp: livearena_common::time::now(),
        });
        let ended = match outcome {
            TickOutcome::Running(_) => None,
            TickOutcome::Ended(outcome) => {
                self.emit_ended(&outcome);
                Some(outcome)
            }
        };
        Ok((session.state(), ended))
    }

    pub async fn pause(&self, battle_id: Uuid) -> Result<BattleState> {
        let handle = self.handle(battle_id).await?;
        let mut session = handle.session.lock().await;
        session.pause()?;
        self.event_bus.emit_lossy(ArenaEvent::BattlePaused {
            battle_id,
            time_remaining: session.time_remaining(),
            timestamp: livearena_common::time::now(),
        });
        Ok(session.state())
    }

    pub async fn resume(&self, battle_id: Uuid) -> Result<BattleState> {
        let handle = self.handle(battle_id).await?;
        let mut session = handle.session.lock().await;
        session.resume()?;
        self.event_bus.emit_lossy(ArenaEvent::BattleResumed {
            battle_id,
            time_remaining: session.time_remaining(),
            timestamp: livearena_common::time::now(),
        });
        Ok(session.state())
    }

    /// End a battle and pay out
    ///
    /// The battle is Ended once this returns, even when the ledger is down;
    /// in that case the returned settlement carries the error and
    /// `retry_settlement` finishes the payout later.
    pub async fn end_battle(&self, battle_id: Uuid, reason: EndReason) -> Result<Settlement> {
        let handle = self.handle(battle_id).await?;
        let outcome = {
            let mut session = handle.session.lock().await;
            let outcome = session.end(reason)?;
            self.emit_ended(&outcome);
            outcome
        };
        Ok(self.finalize(&handle, &outcome).await)
    }

    /// Resubmit the payouts of an ended battle
    pub async fn retry_settlement(&self, battle_id: Uuid) -> Result<Settlement> {
        let handle = self.handle(battle_id).await?;
        let outcome = {
            let session = handle.session.lock().await;
            session
                .outcome()
                .cloned()
                .ok_or_else(|| Error::invalid_state("settle", session.status()))?
        };

        if let Some(existing) = handle.settlement.lock().await.as_ref() {
            if existing.is_complete() {
                return Ok(existing.clone());
            }
        }

        let settlement = self.settlement.settle_battle(&outcome).await;
        *handle.settlement.lock().await = Some(settlement.clone());
        Ok(settlement)
    }

    /// Latest settlement attempt, if the battle has ended
    pub async fn settlement(&self, battle_id: Uuid) -> Result<Option<Settlement>> {
        let handle = self.handle(battle_id).await?;
        let settlement = handle.settlement.lock().await.clone();
        Ok(settlement)
    }

    pub async fn outcome(&self, battle_id: Uuid) -> Result<Option<BattleOutcome>> {
        let handle = self.handle(battle_id).await?;
        let session = handle.session.lock().await;
        Ok(session.outcome().cloned())
    }

    pub async fn post_chat(&self, battle_id: Uuid, sender_id: &str, text: &str) -> Result<ChatMessage> {
        let handle = self.handle(battle_id).await?;
        let message = handle.session.lock().await.post_chat(sender_id, text)?;

        if let Err(e) = self.collaborators.chat.deliver(battle_id, &message).await {
            // Already in the log; viewers catch up by replaying it
            warn!(battle_id = %battle_id, sequence = message.sequence, "Chat delivery failed: {}", e);
        }
        Ok(message)
    }

    pub async fn record_viewer_count(&self, battle_id: Uuid, viewer_count: u64) -> Result<BattleState> {
        let handle = self.handle(battle_id).await?;
        let mut session = handle.session.lock().await;
        let (viewer_count, peak_viewers) = session.record_viewer_count(viewer_count)?;
        self.event_bus.emit_lossy(ArenaEvent::ViewerCountUpdated {
            battle_id,
            viewer_count,
            peak_viewers,
            timestamp: livearena_common::time::now(),
        });
        Ok(session.state())
    }

    pub async fn state(&self, battle_id: Uuid) -> Result<BattleState> {
        let handle = self.handle(battle_id).await?;
        let state = handle.session.lock().await.state();
        Ok(state)
    }

    pub async fn config(&self, battle_id: Uuid) -> Result<BattleConfig> {
        let handle = self.handle(battle_id).await?;
        let config = handle.session.lock().await.config().clone();
        Ok(config)
    }

    /// Snapshots of every battle, oldest first
    pub async fn list_battles(&self) -> Vec<BattleState> {
        let handles: Vec<Arc<BattleHandle>> = self.battles.read().await.values().cloned().collect();
        let mut battles = Vec::with_capacity(handles.len());
        for handle in handles {
            let session = handle.session.lock().await;
            battles.push((session.created_at(), session.state()));
        }
        battles.sort_by_key(|(created_at, _)| *created_at);
        battles.into_iter().map(|(_, state)| state).collect()
    }

    /// Log entries with sequence greater than `since`
    pub async fn event_log(&self, battle_id: Uuid, since: u64) -> Result<Vec<LogEntry>> {
        let handle = self.handle(battle_id).await?;
        let entries = handle.session.lock().await.event_log().since(since).to_vec();
        Ok(entries)
    }

    pub async fn audit_scores(&self, battle_id: Uuid) -> Result<ScoreAudit> {
        let handle = self.handle(battle_id).await?;
        let audit = handle.session.lock().await.audit_scores()?;
        if !audit.consistent {
            warn!(battle_id = %battle_id, "Score audit mismatch: {:?}", audit);
        }
        Ok(audit)
    }

    fn emit_ended(&self, outcome: &BattleOutcome) {
        self.event_bus.emit_lossy(ArenaEvent::BattleEnded {
            battle_id: outcome.battle_id,
            reason: outcome.reason,
            winner_id: outcome.winner_id.clone(),
            final_scores: outcome.final_scores.to_vec(),
            distribution: outcome.distribution,
            timestamp: outcome.ended_at,
        });
    }

    /// Post-Ended work: stop the timer, free media, pay out, notify
    async fn finalize(&self, handle: &BattleHandle, outcome: &BattleOutcome) -> Settlement {
        handle.cancel.cancel();
        let streams = std::mem::take(&mut *handle.streams.lock().await);
        self.release_streams(&streams).await;

        let settlement = self.settlement.settle_battle(outcome).await;
        *handle.settlement.lock().await = Some(settlement.clone());

        let message = match &outcome.winner_id {
            Some(winner) => format!("Battle over: {} wins", winner),
            None if outcome.distribution.is_some() => "Battle over: it's a tie".to_string(),
            None => "Battle cancelled: entry fees refunded".to_string(),
        };
        for score in &outcome.final_scores {
            self.notify(Notification {
                recipient_id: score.creator_id.clone(),
                kind: NotificationKind::BattleResult,
                subject_id: outcome.battle_id,
                message: message.clone(),
            })
            .await;
        }

        settlement
    }

    async fn release_streams(&self, streams: &[MediaStream]) {
        for stream in streams {
            self.collaborators.media.release(stream).await;
        }
    }

    async fn notify(&self, notification: Notification) {
        if let Err(e) = self.collaborators.notifier.notify(notification).await {
            warn!("Notification failed: {}", e);
        }
    }
}
