use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::forum::leaderboard::{self, DEFAULT_WINDOW_HOURS};
use crate::forum::users;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct GetOrCreateUserRequest {
    pub username: String,
}

#[derive(Serialize)]
pub struct GetOrCreateUserResponse {
    pub id: String,
    pub username: String,
    pub created: bool,
}

#[derive(Serialize)]
pub struct UserProfileResponse {
    pub id: String,
    pub username: String,
    pub total_karma: i64,
    pub karma_24h: i64,
    pub created_at: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/users", post(get_or_create_user))
        .route("/api/users/{id}", get(get_user))
}

async fn get_or_create_user(
    State(state): State<AppState>,
    Json(req): Json<GetOrCreateUserRequest>,
) -> AppResult<(StatusCode, Json<GetOrCreateUserResponse>)> {
    let (user, created) = users::get_or_create_user(&state.db, &req.username)?;
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((
        status,
        Json(GetOrCreateUserResponse {
            id: user.id,
            username: user.username,
            created,
        }),
    ))
}

async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<UserProfileResponse>> {
    let user = users::get_user(&state.db, &id)?;
    let profile = users::get_profile(&state.db, &id)?;
    let karma_24h =
        leaderboard::karma_in_window(&state.db, &id, Duration::hours(DEFAULT_WINDOW_HOURS))?;
    Ok(Json(UserProfileResponse {
        id: user.id,
        username: user.username,
        total_karma: profile.total_karma,
        karma_24h,
        created_at: user.created_at,
    }))
}
