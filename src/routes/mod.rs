pub mod comments;
pub mod leaderboard;
pub mod likes;
pub mod posts;
pub mod users;

use axum::Router;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(posts::router())
        .merge(comments::router())
        .merge(likes::router())
        .merge(leaderboard::router())
        .merge(users::router())
}
