use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod handler;

/// Response for a user in followers/following lists
#[derive(Debug, Serialize)]
pub struct FollowUserResponse {
    pub id: Uuid,
    pub username: String,
    pub bio: Option<String>,
    pub avatar: Option<String>,
    pub followed_at: chrono::DateTime<chrono::Utc>,
}

/// Query parameters for paginated follow lists
#[derive(Debug, Deserialize)]
pub struct FollowListFilter {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Response for paginated followers/following lists
#[derive(Debug, Serialize)]
pub struct FollowListResponse {
    pub users: Vec<FollowUserResponse>,
    pub total: i64,
    pub has_more: bool,
}

/// Response for follow/unfollow actions
#[derive(Debug, Serialize)]
pub struct FollowActionResponse {
    pub following: bool,
    pub followers_count: i64,
}

/// Aggregate counts for a user
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct UserStatsResponse {
    pub tweets_count: i64,
    pub following_count: i64,
    pub followers_count: i64,
}
