pub mod comments;
pub mod domain;
pub mod leaderboard;
pub mod posts;
pub mod reactions;
pub mod users;
