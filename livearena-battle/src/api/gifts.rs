//! Gift catalog listing

use axum::{extract::State, routing::get, Json, Router};

use crate::catalog::GiftDefinition;
use crate::AppState;

/// GET /gifts
///
/// All gifts in catalog order.
pub async fn list_gifts(State(state): State<AppState>) -> Json<Vec<GiftDefinition>> {
    Json(state.battles.catalog().gifts().to_vec())
}

pub fn gift_routes() -> Router<AppState> {
    Router::new().route("/gifts", get(list_gifts))
}
