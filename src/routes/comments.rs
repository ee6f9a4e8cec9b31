use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::AppResult;
use crate::forum::domain::Comment;
use crate::forum::{comments, users};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CreateCommentRequest {
    pub post_id: String,
    pub user_id: String,
    pub parent_id: Option<String>,
    pub content: String,
}

/// One comment with its replies nested, as the frontend renders it.
#[derive(Serialize)]
pub struct CommentNode {
    pub id: String,
    pub author_id: String,
    pub author: String,
    pub content: String,
    pub like_count: i64,
    pub depth: i64,
    pub created_at: String,
    pub replies: Vec<CommentNode>,
}

#[derive(Serialize)]
pub struct CommentResponse {
    pub id: String,
    pub post_id: String,
    pub author_id: String,
    pub parent_id: Option<String>,
    pub content: String,
    pub like_count: i64,
    pub depth: i64,
    pub created_at: String,
}

impl From<Comment> for CommentResponse {
    fn from(c: Comment) -> Self {
        Self {
            id: c.id,
            post_id: c.post_id,
            author_id: c.author_id,
            parent_id: c.parent_id,
            content: c.content,
            like_count: c.like_count,
            depth: c.depth,
            created_at: c.created_at,
        }
    }
}

/// Fold a pre-order comment slice (depths relative to the first node's
/// depth) into nested `CommentNode`s. Works because every node appears
/// directly after its ancestors and before any later sibling's subtree.
pub fn nest_comments(flat: &[Comment], usernames: &HashMap<String, String>) -> Vec<CommentNode> {
    let base_depth = flat.first().map(|c| c.depth).unwrap_or(0);
    let mut roots = Vec::new();
    let mut stack: Vec<CommentNode> = Vec::new();

    fn attach(done: CommentNode, stack: &mut [CommentNode], roots: &mut Vec<CommentNode>) {
        match stack.last_mut() {
            Some(parent) => parent.replies.push(done),
            None => roots.push(done),
        }
    }

    for c in flat {
        let rel_depth = (c.depth - base_depth) as usize;
        while stack.len() > rel_depth {
            let done = stack.pop().unwrap();
            attach(done, &mut stack, &mut roots);
        }
        stack.push(CommentNode {
            id: c.id.clone(),
            author_id: c.author_id.clone(),
            author: usernames.get(&c.author_id).cloned().unwrap_or_default(),
            content: c.content.clone(),
            like_count: c.like_count,
            depth: c.depth,
            created_at: c.created_at.clone(),
            replies: Vec::new(),
        });
    }
    while let Some(done) = stack.pop() {
        attach(done, &mut stack, &mut roots);
    }
    roots
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/comments", post(create_comment))
        .route("/api/comments/{id}/subtree", get(get_subtree))
        .route("/api/comments/{id}", delete(delete_comment))
}

async fn create_comment(
    State(state): State<AppState>,
    Json(req): Json<CreateCommentRequest>,
) -> AppResult<(StatusCode, Json<CommentResponse>)> {
    let comment = comments::create_comment(
        &state.db,
        &req.post_id,
        &req.user_id,
        req.parent_id.as_deref(),
        &req.content,
    )?;
    Ok((StatusCode::CREATED, Json(comment.into())))
}

async fn get_subtree(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Vec<CommentNode>>> {
    let flat = comments::subtree(&state.db, &id)?;
    let usernames = users::comment_author_usernames(&state.db, &flat[0].post_id)?;
    Ok(Json(nest_comments(&flat, &usernames)))
}

async fn delete_comment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    comments::delete_comment(&state.db, &id)?;
    Ok(StatusCode::NO_CONTENT)
}
