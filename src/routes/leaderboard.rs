use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Duration;
use serde::Deserialize;

use crate::error::AppResult;
use crate::forum::leaderboard::{self, LeaderboardEntry, DEFAULT_LIMIT, DEFAULT_WINDOW_HOURS};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct LeaderboardParams {
    /// Trailing window in hours (default 24).
    pub hours: Option<i64>,
    /// Maximum number of users returned (default 5).
    pub limit: Option<usize>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/api/leaderboard", get(get_leaderboard))
}

async fn get_leaderboard(
    State(state): State<AppState>,
    Query(params): Query<LeaderboardParams>,
) -> AppResult<Json<Vec<LeaderboardEntry>>> {
    let window = Duration::hours(params.hours.unwrap_or(DEFAULT_WINDOW_HOURS));
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT);
    let entries = leaderboard::top_karma_earners(&state.db, window, limit)?;
    Ok(Json(entries))
}
