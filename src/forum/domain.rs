// Domain types shared by the forum engine. Plain row structs; timestamps
// are stored as fixed-width UTC RFC 3339 text so string comparison is
// chronological.
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Karma credited to a post's author per like.
pub const POST_LIKE_KARMA: i64 = 5;
/// Karma credited to a comment's author per like.
pub const COMMENT_LIKE_KARMA: i64 = 1;

pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn new_id() -> String {
    uuid::Uuid::now_v7().to_string()
}

/// The likeable entity a like or karma transaction points at.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Subject {
    Post(String),
    Comment(String),
}

impl Subject {
    pub fn kind(&self) -> &'static str {
        match self {
            Subject::Post(_) => "post",
            Subject::Comment(_) => "comment",
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Subject::Post(id) | Subject::Comment(id) => id,
        }
    }

    /// Fixed reward credited to the subject's author per like.
    pub fn karma_reward(&self) -> i64 {
        match self {
            Subject::Post(_) => POST_LIKE_KARMA,
            Subject::Comment(_) => COMMENT_LIKE_KARMA,
        }
    }

    pub fn transaction_type(&self) -> &'static str {
        match self {
            Subject::Post(_) => "post_like",
            Subject::Comment(_) => "comment_like",
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.id())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    pub total_karma: i64,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub author_id: String,
    pub content: String,
    pub like_count: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub post_id: String,
    pub author_id: String,
    pub parent_id: Option<String>,
    pub content: String,
    pub like_count: i64,
    pub lft: i64,
    pub rgt: i64,
    pub depth: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KarmaTransaction {
    pub id: String,
    pub user_id: String,
    pub amount: i64,
    pub transaction_type: String,
    pub subject_kind: String,
    pub subject_id: String,
    pub created_at: String,
}

/// Result of a like attempt. `created = false` means the like already
/// existed; that is a normal outcome, not an error.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct LikeOutcome {
    pub created: bool,
}

/// Result of an unlike attempt. `removed = false` means there was nothing
/// to remove.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct UnlikeOutcome {
    pub removed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subject_kind_and_id() {
        let s = Subject::Post("p1".into());
        assert_eq!(s.kind(), "post");
        assert_eq!(s.id(), "p1");
        let s = Subject::Comment("c1".into());
        assert_eq!(s.kind(), "comment");
        assert_eq!(s.id(), "c1");
    }

    #[test]
    fn rewards_match_subject_kind() {
        assert_eq!(Subject::Post("p".into()).karma_reward(), 5);
        assert_eq!(Subject::Comment("c".into()).karma_reward(), 1);
        assert_eq!(Subject::Post("p".into()).transaction_type(), "post_like");
        assert_eq!(
            Subject::Comment("c".into()).transaction_type(),
            "comment_like"
        );
    }

    #[test]
    fn timestamps_are_fixed_width_utc() {
        let a = now_timestamp();
        assert!(a.ends_with('Z'));
        // date (10) + 'T' + time (8) + '.' + micros (6) + 'Z'
        assert_eq!(a.len(), 27);
    }

    #[test]
    fn timestamps_sort_chronologically() {
        let a = now_timestamp();
        let b = now_timestamp();
        assert!(a <= b);
    }
}
