//! Duet and tip endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::duet::{Duet, DuetConfig, DuetTipTransaction, TipSplit};
use crate::error::Result;
use crate::settlement::Settlement;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterDuetRequest {
    pub original_creator_id: String,
    pub duet_creator_id: String,
    pub config: DuetConfig,
}

#[derive(Debug, Deserialize)]
pub struct TipRequest {
    pub tipper_id: String,
    pub amount: u64,
}

#[derive(Debug, Serialize)]
pub struct TipResponse {
    pub tip: DuetTipTransaction,
    pub settlement: Settlement,
}

#[derive(Debug, Deserialize)]
pub struct SplitRequest {
    pub amount: u64,
    /// Omit for a direct (non-duet) tip
    #[serde(default = "default_share")]
    pub revenue_share_percentage: u8,
}

fn default_share() -> u8 {
    100
}

/// POST /duets
pub async fn register_duet(
    State(state): State<AppState>,
    Json(request): Json<RegisterDuetRequest>,
) -> Result<(StatusCode, Json<Duet>)> {
    let duet = state
        .duets
        .register_duet(&request.original_creator_id, &request.duet_creator_id, request.config)
        .await?;
    Ok((StatusCode::CREATED, Json(duet)))
}

/// GET /duets/:id
pub async fn get_duet(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Duet>> {
    Ok(Json(state.duets.get(id).await?))
}

/// GET /duets/:id/tips
pub async fn list_tips(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Vec<DuetTipTransaction>>> {
    Ok(Json(state.duets.tips(id).await?))
}

/// POST /duets/:id/tips
pub async fn tip_duet(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<TipRequest>,
) -> Result<Json<TipResponse>> {
    let (tip, settlement) = state.duets.tip(id, &request.tipper_id, request.amount).await?;
    Ok(Json(TipResponse { tip, settlement }))
}

/// POST /duets/:id/tips/:tip_id/retry
pub async fn retry_tip(
    State(state): State<AppState>,
    Path((id, tip_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<TipResponse>> {
    let (tip, settlement) = state.duets.retry_tip_settlement(id, tip_id).await?;
    Ok(Json(TipResponse { tip, settlement }))
}

/// POST /duets/split
///
/// Pure computation; nothing is credited.
pub async fn compute_split(State(state): State<AppState>, Json(request): Json<SplitRequest>) -> Result<Json<TipSplit>> {
    let split = state
        .duets
        .splitter()
        .compute_split(request.amount, request.revenue_share_percentage)?;
    Ok(Json(split))
}

pub fn duet_routes() -> Router<AppState> {
    Router::new()
        .route("/duets", post(register_duet))
        .route("/duets/split", post(compute_split))
        .route("/duets/:id", get(get_duet))
        .route("/duets/:id/tips", get(list_tips).post(tip_duet))
        .route("/duets/:id/tips/:tip_id/retry", post(retry_tip))
}
