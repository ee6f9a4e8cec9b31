use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::forum::{comments, posts, users};
use crate::routes::comments::{nest_comments, CommentNode};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CreatePostRequest {
    pub user_id: String,
    pub content: String,
}

#[derive(Serialize)]
pub struct PostSummary {
    pub id: String,
    pub author_id: String,
    pub author: String,
    pub content: String,
    pub like_count: i64,
    pub comment_count: i64,
    pub created_at: String,
}

#[derive(Serialize)]
pub struct PostDetail {
    pub id: String,
    pub author_id: String,
    pub author: String,
    pub content: String,
    pub like_count: i64,
    pub created_at: String,
    pub updated_at: String,
    pub comments: Vec<CommentNode>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/posts", get(list_posts).post(create_post))
        .route("/api/posts/{id}", get(get_post).delete(delete_post))
}

async fn create_post(
    State(state): State<AppState>,
    Json(req): Json<CreatePostRequest>,
) -> AppResult<(StatusCode, Json<PostDetail>)> {
    let post = posts::create_post(&state.db, &req.user_id, &req.content)?;
    let author = users::get_user(&state.db, &post.author_id)?;
    Ok((
        StatusCode::CREATED,
        Json(PostDetail {
            id: post.id,
            author_id: post.author_id,
            author: author.username,
            content: post.content,
            like_count: post.like_count,
            created_at: post.created_at,
            updated_at: post.updated_at,
            comments: Vec::new(),
        }),
    ))
}

async fn list_posts(State(state): State<AppState>) -> AppResult<Json<Vec<PostSummary>>> {
    let rows = posts::list_posts(&state.db)?;
    let out = rows
        .into_iter()
        .map(|(post, author, comment_count)| PostSummary {
            id: post.id,
            author_id: post.author_id,
            author,
            content: post.content,
            like_count: post.like_count,
            comment_count,
            created_at: post.created_at,
        })
        .collect();
    Ok(Json(out))
}

/// A post with its full comment tree, nested in document order.
async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<PostDetail>> {
    let post = posts::get_post(&state.db, &id)?;
    let author = users::get_user(&state.db, &post.author_id)?;
    let flat = comments::post_comments(&state.db, &id)?;
    let usernames = users::comment_author_usernames(&state.db, &id)?;
    Ok(Json(PostDetail {
        id: post.id,
        author_id: post.author_id,
        author: author.username,
        content: post.content,
        like_count: post.like_count,
        created_at: post.created_at,
        updated_at: post.updated_at,
        comments: nest_comments(&flat, &usernames),
    }))
}

async fn delete_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    posts::delete_post(&state.db, &id)?;
    Ok(StatusCode::NO_CONTENT)
}
