// Like/unlike endpoints. Repeats are not errors: the response carries the
// created/removed flag and the request is otherwise a no-op.
use axum::extract::{Path, State};
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::forum::domain::{LikeOutcome, Subject, UnlikeOutcome};
use crate::forum::reactions;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct LikeRequest {
    pub user_id: String,
}

#[derive(Serialize)]
pub struct LikeResponse {
    pub created: bool,
}

#[derive(Serialize)]
pub struct UnlikeResponse {
    pub removed: bool,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/posts/{id}/like", post(like_post).delete(unlike_post))
        .route(
            "/api/comments/{id}/like",
            post(like_comment).delete(unlike_comment),
        )
}

async fn like_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<LikeRequest>,
) -> AppResult<Json<LikeResponse>> {
    let LikeOutcome { created } = reactions::like(&state.db, &req.user_id, &Subject::Post(id))?;
    Ok(Json(LikeResponse { created }))
}

async fn unlike_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<LikeRequest>,
) -> AppResult<Json<UnlikeResponse>> {
    let UnlikeOutcome { removed } = reactions::unlike(&state.db, &req.user_id, &Subject::Post(id))?;
    Ok(Json(UnlikeResponse { removed }))
}

async fn like_comment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<LikeRequest>,
) -> AppResult<Json<LikeResponse>> {
    let LikeOutcome { created } = reactions::like(&state.db, &req.user_id, &Subject::Comment(id))?;
    Ok(Json(LikeResponse { created }))
}

async fn unlike_comment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<LikeRequest>,
) -> AppResult<Json<UnlikeResponse>> {
    let UnlikeOutcome { removed } =
        reactions::unlike(&state.db, &req.user_id, &Subject::Comment(id))?;
    Ok(Json(UnlikeResponse { removed }))
}
