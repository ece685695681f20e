use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

pub mod handler;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Tweet {
    pub id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub image: Option<String>,
    pub location: Option<String>,
    pub parent_id: Option<Uuid>,
    pub likes: i32,
    pub retweets: i32,
    pub replies: i32,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTweet {
    #[validate(length(
        min = 1,
        max = 280,
        message = "Tweet must be between 1 and 280 characters"
    ))]
    pub content: String,
    pub image: Option<String>,
    pub location: Option<String>,
    pub parent_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct TweetResponse {
    pub id: Uuid,
    pub author: AuthorResponse,
    pub content: String,
    pub image: Option<String>,
    pub location: Option<String>,
    pub parent_id: Option<Uuid>,
    pub likes: i32,
    pub retweets: i32,
    pub replies: i32,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize)]
pub struct AuthorResponse {
    pub id: Uuid,
    pub username: String,
    pub bio: Option<String>,
    pub avatar: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TweetFilter {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Response for like/retweet actions; `created` is false when the edge
/// already existed and nothing was mutated.
#[derive(Debug, Serialize)]
pub struct EngageActionResponse {
    pub created: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(content: &str) -> CreateTweet {
        CreateTweet {
            content: content.to_string(),
            image: None,
            location: None,
            parent_id: None,
        }
    }

    #[test]
    fn empty_content_is_rejected() {
        assert!(payload("").validate().is_err());
    }

    #[test]
    fn content_at_limit_passes() {
        assert!(payload(&"a".repeat(280)).validate().is_ok());
    }

    #[test]
    fn content_over_limit_is_rejected() {
        assert!(payload(&"a".repeat(281)).validate().is_err());
    }
}
