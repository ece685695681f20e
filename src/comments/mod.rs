use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

pub mod handler;

/// Database model for a comment
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub id: Uuid,
    pub tweet_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Request payload for creating a comment
#[derive(Debug, Deserialize, Validate)]
pub struct CreateComment {
    #[validate(length(
        min = 1,
        max = 1000,
        message = "Comment must be between 1 and 1000 characters"
    ))]
    pub content: String,
}

/// Response structure for a comment with author info
#[derive(Debug, Serialize)]
pub struct CommentResponse {
    pub id: Uuid,
    pub tweet_id: Uuid,
    pub author: CommentAuthor,
    pub content: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Author info embedded in comment response
#[derive(Debug, Serialize)]
pub struct CommentAuthor {
    pub id: Uuid,
    pub username: String,
    pub avatar: Option<String>,
}

/// Query parameters for fetching comments
#[derive(Debug, Deserialize)]
pub struct CommentFilter {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Response for paginated comments list
#[derive(Debug, Serialize)]
pub struct CommentsListResponse {
    pub comments: Vec<CommentResponse>,
    pub total: i64,
    pub has_more: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_comment_is_rejected() {
        let payload = CreateComment {
            content: String::new(),
        };
        assert!(payload.validate().is_err());
    }

    #[test]
    fn comment_over_limit_is_rejected() {
        let payload = CreateComment {
            content: "a".repeat(1001),
        };
        assert!(payload.validate().is_err());
    }
}
