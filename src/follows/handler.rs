use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};
use sqlx::{FromRow, PgPool, Row};
use uuid::Uuid;

use crate::{
    auth::jwt,
    error::AppError,
    follows::{
        FollowActionResponse, FollowListFilter, FollowListResponse, FollowUserResponse,
        UserStatsResponse,
    },
    response::ApiResponse,
};

/// Helper struct for fetching user with follow info
#[derive(FromRow)]
struct UserFollowRow {
    id: Uuid,
    username: String,
    bio: Option<String>,
    avatar: Option<String>,
    followed_at: chrono::DateTime<chrono::Utc>,
}

impl From<UserFollowRow> for FollowUserResponse {
    fn from(u: UserFollowRow) -> Self {
        FollowUserResponse {
            id: u.id,
            username: u.username,
            bio: u.bio,
            avatar: u.avatar,
            followed_at: u.followed_at,
        }
    }
}

async fn live_followers_count(pool: &PgPool, user_id: Uuid) -> Result<i64, AppError> {
    let row = sqlx::query("SELECT COUNT(*) AS count FROM follows WHERE following_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await
        .map_err(|_| AppError::InternalServerError)?;
    Ok(row.get("count"))
}

/// Follow a user
/// POST /api/users/:id/follow
pub async fn follow_user(
    State(pool): State<PgPool>,
    claims: jwt::Claims,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    // Can't follow yourself
    if claims.sub == user_id {
        return Err(AppError::BadRequest(
            "You cannot follow yourself".to_string(),
        ));
    }

    // Verify target user exists
    sqlx::query("SELECT id FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(&pool)
        .await
        .map_err(|_| AppError::InternalServerError)?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    // Insert follow; re-following an existing edge is a no-op
    sqlx::query(
        r#"
        INSERT INTO follows (follower_id, following_id)
        VALUES ($1, $2)
        ON CONFLICT (follower_id, following_id) DO NOTHING
        "#,
    )
    .bind(claims.sub)
    .bind(user_id)
    .execute(&pool)
    .await
    .map_err(|_| AppError::InternalServerError)?;

    let followers_count = live_followers_count(&pool, user_id).await?;

    Ok(ApiResponse::success(FollowActionResponse {
        following: true,
        followers_count,
    }))
}

/// Unfollow a user
/// DELETE /api/users/:id/follow
pub async fn unfollow_user(
    State(pool): State<PgPool>,
    claims: jwt::Claims,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    // Verify target user exists
    sqlx::query("SELECT id FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(&pool)
        .await
        .map_err(|_| AppError::InternalServerError)?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    // Idempotent: deleting an absent edge is a no-op
    sqlx::query("DELETE FROM follows WHERE follower_id = $1 AND following_id = $2")
        .bind(claims.sub)
        .bind(user_id)
        .execute(&pool)
        .await
        .map_err(|_| AppError::InternalServerError)?;

    let followers_count = live_followers_count(&pool, user_id).await?;

    Ok(ApiResponse::success(FollowActionResponse {
        following: false,
        followers_count,
    }))
}

/// Get a user's followers
/// GET /api/users/:id/followers
pub async fn get_followers(
    State(pool): State<PgPool>,
    Path(user_id): Path<Uuid>,
    Query(filter): Query<FollowListFilter>,
) -> Result<impl IntoResponse, AppError> {
    sqlx::query("SELECT id FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(&pool)
        .await
        .map_err(|_| AppError::InternalServerError)?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    let total = live_followers_count(&pool, user_id).await?;

    let limit = filter.limit.unwrap_or(20).min(100);
    let offset = filter.offset.unwrap_or(0);

    // Get followers with user info
    let followers = sqlx::query_as::<_, UserFollowRow>(
        r#"
        SELECT u.id, u.username, u.bio, u.avatar, f.created_at as followed_at
        FROM follows f
        JOIN users u ON f.follower_id = u.id
        WHERE f.following_id = $1
        ORDER BY f.created_at DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(&pool)
    .await
    .map_err(|_| AppError::InternalServerError)?;

    let users: Vec<FollowUserResponse> = followers
        .into_iter()
        .map(FollowUserResponse::from)
        .collect();
    let has_more = (offset + limit) < total;

    Ok(ApiResponse::success(FollowListResponse {
        users,
        total,
        has_more,
    }))
}

/// Get users that a user is following
/// GET /api/users/:id/following
pub async fn get_following(
    State(pool): State<PgPool>,
    Path(user_id): Path<Uuid>,
    Query(filter): Query<FollowListFilter>,
) -> Result<impl IntoResponse, AppError> {
    sqlx::query("SELECT id FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(&pool)
        .await
        .map_err(|_| AppError::InternalServerError)?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    let total_row = sqlx::query("SELECT COUNT(*) AS count FROM follows WHERE follower_id = $1")
        .bind(user_id)
        .fetch_one(&pool)
        .await
        .map_err(|_| AppError::InternalServerError)?;
    let total: i64 = total_row.get("count");

    let limit = filter.limit.unwrap_or(20).min(100);
    let offset = filter.offset.unwrap_or(0);

    // Get following with user info
    let following = sqlx::query_as::<_, UserFollowRow>(
        r#"
        SELECT u.id, u.username, u.bio, u.avatar, f.created_at as followed_at
        FROM follows f
        JOIN users u ON f.following_id = u.id
        WHERE f.follower_id = $1
        ORDER BY f.created_at DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(&pool)
    .await
    .map_err(|_| AppError::InternalServerError)?;

    let users: Vec<FollowUserResponse> = following
        .into_iter()
        .map(FollowUserResponse::from)
        .collect();
    let has_more = (offset + limit) < total;

    Ok(ApiResponse::success(FollowListResponse {
        users,
        total,
        has_more,
    }))
}

/// Get a user's tweet/follow counts
/// GET /api/users/:id/stats
pub async fn get_user_stats(
    State(pool): State<PgPool>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    sqlx::query("SELECT id FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(&pool)
        .await
        .map_err(|_| AppError::InternalServerError)?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    let stats = sqlx::query_as::<_, UserStatsResponse>(
        r#"
        SELECT
            (SELECT COUNT(*) FROM tweets WHERE author_id = $1) AS tweets_count,
            (SELECT COUNT(*) FROM follows WHERE follower_id = $1) AS following_count,
            (SELECT COUNT(*) FROM follows WHERE following_id = $1) AS followers_count
        "#,
    )
    .bind(user_id)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Stats query error: {:?}", e);
        AppError::InternalServerError
    })?;

    Ok(ApiResponse::success(stats))
}
