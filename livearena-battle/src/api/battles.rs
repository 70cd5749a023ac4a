//! Battle endpoints
//!
//! Every handler goes through `BattleService`; rejections are returned as
//! `{"error": {"code", "message"}}` with the status mapped from the error.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use livearena_common::events::EndReason;
use serde::Deserialize;
use uuid::Uuid;

use crate::battle::{BattleConfig, BattleState, ScoreAudit};
use crate::error::Result;
use crate::event_log::{ChatMessage, GiftEvent, LogEntry, VoteEvent};
use crate::settlement::Settlement;
use crate::AppState;

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateBattleRequest {
    #[serde(flatten)]
    pub config: BattleConfig,
    /// Acquire media and go Live immediately (default) or stay in the lobby
    #[serde(default = "default_start")]
    pub start: bool,
}

fn default_start() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct GiftRequest {
    pub sender_id: String,
    pub recipient_id: String,
    pub gift_id: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    pub voter_id: String,
    pub creator_id: String,
}

#[derive(Debug, Deserialize)]
pub struct EndRequest {
    pub reason: EndReason,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub sender_id: String,
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct ViewerCountRequest {
    pub viewer_count: u64,
}

#[derive(Debug, Deserialize)]
pub struct LogQuery {
    #[serde(default)]
    pub since: u64,
}

// ============================================================================
// Lifecycle
// ============================================================================

/// POST /battles
pub async fn create_battle(
    State(state): State<AppState>,
    Json(request): Json<CreateBattleRequest>,
) -> Result<(StatusCode, Json<BattleState>)> {
    let battle = if request.start {
        state.battles.start_battle(request.config).await?
    } else {
        state.battles.create_battle(request.config).await?
    };
    Ok((StatusCode::CREATED, Json(battle)))
}

/// GET /battles
pub async fn list_battles(State(state): State<AppState>) -> Json<Vec<BattleState>> {
    Json(state.battles.list_battles().await)
}

/// GET /battles/:id
pub async fn get_battle(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<BattleState>> {
    Ok(Json(state.battles.state(id).await?))
}

/// GET /battles/:id/config
pub async fn get_battle_config(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<BattleConfig>> {
    Ok(Json(state.battles.config(id).await?))
}

/// POST /battles/:id/start
///
/// Also used to retry after a media failure.
pub async fn start_battle(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<BattleState>> {
    Ok(Json(state.battles.start(id).await?))
}

/// POST /battles/:id/tick
pub async fn tick(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<BattleState>> {
    Ok(Json(state.battles.tick(id).await?))
}

/// POST /battles/:id/pause
pub async fn pause(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<BattleState>> {
    Ok(Json(state.battles.pause(id).await?))
}

/// POST /battles/:id/resume
pub async fn resume(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<BattleState>> {
    Ok(Json(state.battles.resume(id).await?))
}

/// POST /battles/:id/end
pub async fn end_battle(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<EndRequest>,
) -> Result<Json<Settlement>> {
    Ok(Json(state.battles.end_battle(id, request.reason).await?))
}

// ============================================================================
// Viewer Actions
// ============================================================================

/// POST /battles/:id/gifts
pub async fn send_gift(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<GiftRequest>,
) -> Result<Json<GiftEvent>> {
    let event = state
        .battles
        .send_gift(id, &request.sender_id, &request.recipient_id, &request.gift_id, request.quantity)
        .await?;
    Ok(Json(event))
}

/// POST /battles/:id/votes
pub async fn cast_vote(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<VoteRequest>,
) -> Result<Json<VoteEvent>> {
    let event = state.battles.cast_vote(id, &request.voter_id, &request.creator_id).await?;
    Ok(Json(event))
}

/// POST /battles/:id/chat
pub async fn post_chat(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatMessage>> {
    Ok(Json(state.battles.post_chat(id, &request.sender_id, &request.text).await?))
}

/// POST /battles/:id/viewers
pub async fn record_viewers(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ViewerCountRequest>,
) -> Result<Json<BattleState>> {
    Ok(Json(state.battles.record_viewer_count(id, request.viewer_count).await?))
}

// ============================================================================
// Audit & Settlement
// ============================================================================

/// GET /battles/:id/log?since=N
pub async fn get_event_log(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<LogQuery>,
) -> Result<Json<Vec<LogEntry>>> {
    Ok(Json(state.battles.event_log(id, query.since).await?))
}

/// GET /battles/:id/audit
pub async fn audit_scores(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<ScoreAudit>> {
    Ok(Json(state.battles.audit_scores(id).await?))
}

/// GET /battles/:id/settlement
pub async fn get_settlement(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Option<Settlement>>> {
    Ok(Json(state.battles.settlement(id).await?))
}

/// POST /battles/:id/settlement/retry
pub async fn retry_settlement(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Settlement>> {
    Ok(Json(state.battles.retry_settlement(id).await?))
}

pub fn battle_routes() -> Router<AppState> {
    Router::new()
        .route("/battles", get(list_battles).post(create_battle))
        .route("/battles/:id", get(get_battle))
        .route("/battles/:id/config", get(get_battle_config))
        .route("/battles/:id/start", post(start_battle))
        .route("/battles/:id/tick", post(tick))
        .route("/battles/:id/pause", post(pause))
        .route("/battles/:id/resume", post(resume))
        .route("/battles/:id/end", post(end_battle))
        .route("/battles/:id/gifts", post(send_gift))
        .route("/battles/:id/votes", post(cast_vote))
        .route("/battles/:id/chat", post(post_chat))
        .route("/battles/:id/viewers", post(record_viewers))
        .route("/battles/:id/log", get(get_event_log))
        .route("/battles/:id/audit", get(audit_scores))
        .route("/battles/:id/settlement", get(get_settlement))
        .route("/battles/:id/settlement/retry", post(retry_settlement))
}
