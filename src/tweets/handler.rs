use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use sqlx::{FromRow, PgPool, Row};
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::jwt,
    error::AppError,
    response::ApiResponse,
    tweets::{AuthorResponse, CreateTweet, EngageActionResponse, Tweet, TweetFilter, TweetResponse},
};

// Helper struct and function
#[derive(FromRow)]
struct TweetFromDb {
    id: Uuid,
    content: String,
    image: Option<String>,
    location: Option<String>,
    parent_id: Option<Uuid>,
    likes: i32,
    retweets: i32,
    replies: i32,
    created_at: chrono::DateTime<chrono::Utc>,
    // author fields
    author_id: Uuid,
    username: String,
    bio: Option<String>,
    avatar: Option<String>,
}

impl From<TweetFromDb> for TweetResponse {
    fn from(t: TweetFromDb) -> Self {
        TweetResponse {
            id: t.id,
            author: AuthorResponse {
                id: t.author_id,
                username: t.username,
                bio: t.bio,
                avatar: t.avatar,
            },
            content: t.content,
            image: t.image,
            location: t.location,
            parent_id: t.parent_id,
            likes: t.likes,
            retweets: t.retweets,
            replies: t.replies,
            created_at: t.created_at,
        }
    }
}

const TWEET_WITH_AUTHOR: &str = r#"
    SELECT
        t.id, t.content, t.image, t.location, t.parent_id,
        t.likes, t.retweets, t.replies, t.created_at,
        t.author_id, u.username, u.bio, u.avatar
    FROM tweets t
    JOIN users u ON t.author_id = u.id
"#;

async fn get_tweet_response(
    pool: &PgPool,
    tweet_id: Uuid,
) -> Result<ApiResponse<TweetResponse>, AppError> {
    let query_str = format!("{} WHERE t.id = $1", TWEET_WITH_AUTHOR);

    let row = sqlx::query_as::<_, TweetFromDb>(&query_str)
        .bind(tweet_id)
        .fetch_optional(pool)
        .await
        .map_err(|e| {
            tracing::error!("Fetch tweet error: {:?}", e);
            AppError::InternalServerError
        })?
        .ok_or(AppError::NotFound("Tweet not found".to_string()))?;

    Ok(ApiResponse::success(TweetResponse::from(row)))
}

/// Post a tweet, optionally as a reply to a parent tweet. A reply only
/// references its parent; the parent's replies counter tracks comments,
/// not reply tweets.
/// POST /api/tweets
pub async fn create_tweet(
    State(pool): State<PgPool>,
    claims: jwt::Claims,
    Json(payload): Json<CreateTweet>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    if let Some(parent_id) = payload.parent_id {
        sqlx::query("SELECT id FROM tweets WHERE id = $1")
            .bind(parent_id)
            .fetch_optional(&pool)
            .await
            .map_err(|_| AppError::InternalServerError)?
            .ok_or(AppError::NotFound("Parent tweet not found".to_string()))?;
    }

    let tweet = sqlx::query_as::<_, Tweet>(
        r#"
        INSERT INTO tweets (id, author_id, content, image, location, parent_id)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(claims.sub)
    .bind(&payload.content)
    .bind(&payload.image)
    .bind(&payload.location)
    .bind(payload.parent_id)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create tweet: {:?}", e);
        AppError::InternalServerError
    })?;

    Ok(get_tweet_response(&pool, tweet.id).await?.created())
}

/// List all tweets, newest first.
/// GET /api/tweets
pub async fn get_tweets(
    State(pool): State<PgPool>,
    Query(filter): Query<TweetFilter>,
) -> Result<impl IntoResponse, AppError> {
    let limit = filter.limit.unwrap_or(20).min(100);
    let offset = filter.offset.unwrap_or(0);

    let query_str = format!(
        "{} ORDER BY t.created_at DESC, t.id ASC LIMIT $1 OFFSET $2",
        TWEET_WITH_AUTHOR
    );

    let rows = sqlx::query_as::<_, TweetFromDb>(&query_str)
        .bind(limit)
        .bind(offset)
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("List tweets error: {:?}", e);
            AppError::InternalServerError
        })?;

    let response: Vec<TweetResponse> = rows.into_iter().map(TweetResponse::from).collect();

    Ok(ApiResponse::success(response))
}

/// Home timeline: the caller's own tweets plus tweets from everyone they
/// follow, newest first. Ties on created_at break by id ascending so the
/// order is deterministic.
/// GET /api/tweets/feed
pub async fn get_feed(
    State(pool): State<PgPool>,
    claims: jwt::Claims,
) -> Result<impl IntoResponse, AppError> {
    let query_str = format!(
        r#"
        {}
        WHERE t.author_id = $1
           OR t.author_id IN (SELECT following_id FROM follows WHERE follower_id = $1)
        ORDER BY t.created_at DESC, t.id ASC
        "#,
        TWEET_WITH_AUTHOR
    );

    let rows = sqlx::query_as::<_, TweetFromDb>(&query_str)
        .bind(claims.sub)
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Feed error: {:?}", e);
            AppError::InternalServerError
        })?;

    let response: Vec<TweetResponse> = rows.into_iter().map(TweetResponse::from).collect();

    Ok(ApiResponse::success(response))
}

/// GET /api/tweets/:id
pub async fn get_tweet(
    State(pool): State<PgPool>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    get_tweet_response(&pool, id).await
}

/// Delete an owned tweet. Likes, retweets, comments and reply tweets cascade.
/// DELETE /api/tweets/:id
pub async fn delete_tweet(
    State(pool): State<PgPool>,
    claims: jwt::Claims,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let row = sqlx::query("SELECT author_id FROM tweets WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await
        .map_err(|_| AppError::InternalServerError)?
        .ok_or(AppError::NotFound("Tweet not found".to_string()))?;

    let author_id: Uuid = row.get("author_id");

    if author_id != claims.sub {
        return Err(AppError::Unauthorized);
    }

    sqlx::query("DELETE FROM tweets WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|_| AppError::InternalServerError)?;

    Ok(ApiResponse::ok("Tweet deleted".to_string()))
}

/// A user's own tweets, newest first.
/// GET /api/users/:id/tweets
pub async fn get_user_tweets(
    State(pool): State<PgPool>,
    Path(user_id): Path<Uuid>,
    Query(filter): Query<TweetFilter>,
) -> Result<impl IntoResponse, AppError> {
    sqlx::query("SELECT id FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(&pool)
        .await
        .map_err(|_| AppError::InternalServerError)?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    let limit = filter.limit.unwrap_or(20).min(100);
    let offset = filter.offset.unwrap_or(0);

    let query_str = format!(
        r#"
        {}
        WHERE t.author_id = $1
        ORDER BY t.created_at DESC, t.id ASC
        LIMIT $2 OFFSET $3
        "#,
        TWEET_WITH_AUTHOR
    );

    let rows = sqlx::query_as::<_, TweetFromDb>(&query_str)
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("User tweets error: {:?}", e);
            AppError::InternalServerError
        })?;

    let response: Vec<TweetResponse> = rows.into_iter().map(TweetResponse::from).collect();

    Ok(ApiResponse::success(response))
}

/// Inserts an engagement edge and bumps the matching counter in one
/// transaction. The conditional insert decides whether anything was created,
/// so the edge and the counter can never diverge and a concurrent duplicate
/// resolves to a no-op instead of an error.
async fn engage(
    pool: &PgPool,
    user_id: Uuid,
    tweet_id: Uuid,
    edge_table: &str,
    counter: &str,
) -> Result<bool, AppError> {
    let mut tx = pool
        .begin()
        .await
        .map_err(|_| AppError::InternalServerError)?;

    sqlx::query("SELECT id FROM tweets WHERE id = $1")
        .bind(tweet_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|_| AppError::InternalServerError)?
        .ok_or(AppError::NotFound("Tweet not found".to_string()))?;

    let insert_str = format!(
        "INSERT INTO {} (user_id, tweet_id) VALUES ($1, $2) ON CONFLICT (user_id, tweet_id) DO NOTHING",
        edge_table
    );

    let inserted = sqlx::query(&insert_str)
        .bind(user_id)
        .bind(tweet_id)
        .execute(&mut *tx)
        .await
        .map_err(|_| AppError::InternalServerError)?
        .rows_affected();

    if inserted == 1 {
        let update_str = format!("UPDATE tweets SET {c} = {c} + 1 WHERE id = $1", c = counter);
        sqlx::query(&update_str)
            .bind(tweet_id)
            .execute(&mut *tx)
            .await
            .map_err(|_| AppError::InternalServerError)?;
    }

    tx.commit()
        .await
        .map_err(|_| AppError::InternalServerError)?;

    Ok(inserted == 1)
}

/// Removes an engagement edge and decrements the matching counter in one
/// transaction. Returns false when no edge existed (nothing is mutated).
async fn disengage(
    pool: &PgPool,
    user_id: Uuid,
    tweet_id: Uuid,
    edge_table: &str,
    counter: &str,
) -> Result<bool, AppError> {
    let mut tx = pool
        .begin()
        .await
        .map_err(|_| AppError::InternalServerError)?;

    sqlx::query("SELECT id FROM tweets WHERE id = $1")
        .bind(tweet_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|_| AppError::InternalServerError)?
        .ok_or(AppError::NotFound("Tweet not found".to_string()))?;

    let delete_str = format!(
        "DELETE FROM {} WHERE user_id = $1 AND tweet_id = $2",
        edge_table
    );

    let deleted = sqlx::query(&delete_str)
        .bind(user_id)
        .bind(tweet_id)
        .execute(&mut *tx)
        .await
        .map_err(|_| AppError::InternalServerError)?
        .rows_affected();

    if deleted == 0 {
        return Ok(false);
    }

    let update_str = format!("UPDATE tweets SET {c} = {c} - 1 WHERE id = $1", c = counter);
    sqlx::query(&update_str)
        .bind(tweet_id)
        .execute(&mut *tx)
        .await
        .map_err(|_| AppError::InternalServerError)?;

    tx.commit()
        .await
        .map_err(|_| AppError::InternalServerError)?;

    Ok(true)
}

/// POST /api/tweets/:id/like
pub async fn like_tweet(
    State(pool): State<PgPool>,
    claims: jwt::Claims,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let created = engage(&pool, claims.sub, id, "tweet_likes", "likes").await?;

    let message = if created {
        "Tweet liked"
    } else {
        "Tweet already liked"
    };

    Ok(ApiResponse::success_with_message(
        message.to_string(),
        EngageActionResponse { created },
    ))
}

/// DELETE /api/tweets/:id/like
pub async fn unlike_tweet(
    State(pool): State<PgPool>,
    claims: jwt::Claims,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let removed = disengage(&pool, claims.sub, id, "tweet_likes", "likes").await?;

    if !removed {
        return Err(AppError::BadRequest("Tweet not liked".to_string()));
    }

    Ok(ApiResponse::ok("Tweet unliked".to_string()))
}

/// POST /api/tweets/:id/retweet
pub async fn retweet_tweet(
    State(pool): State<PgPool>,
    claims: jwt::Claims,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let created = engage(&pool, claims.sub, id, "tweet_retweets", "retweets").await?;

    let message = if created {
        "Tweet retweeted"
    } else {
        "Tweet already retweeted"
    };

    Ok(ApiResponse::success_with_message(
        message.to_string(),
        EngageActionResponse { created },
    ))
}

/// DELETE /api/tweets/:id/retweet
pub async fn unretweet_tweet(
    State(pool): State<PgPool>,
    claims: jwt::Claims,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let removed = disengage(&pool, claims.sub, id, "tweet_retweets", "retweets").await?;

    if !removed {
        return Err(AppError::BadRequest("Tweet not retweeted".to_string()));
    }

    Ok(ApiResponse::ok("Retweet removed".to_string()))
}
