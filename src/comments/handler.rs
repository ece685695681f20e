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
    comments::{
        Comment, CommentAuthor, CommentFilter, CommentResponse, CommentsListResponse,
        CreateComment,
    },
    error::AppError,
    response::ApiResponse,
};

/// Helper struct for fetching comments with author info from database
#[derive(FromRow)]
struct CommentFromDb {
    id: Uuid,
    tweet_id: Uuid,
    author_id: Uuid,
    content: String,
    created_at: chrono::DateTime<chrono::Utc>,
    // Author fields
    username: String,
    avatar: Option<String>,
}

impl From<CommentFromDb> for CommentResponse {
    fn from(c: CommentFromDb) -> Self {
        CommentResponse {
            id: c.id,
            tweet_id: c.tweet_id,
            author: CommentAuthor {
                id: c.author_id,
                username: c.username,
                avatar: c.avatar,
            },
            content: c.content,
            created_at: c.created_at,
        }
    }
}

/// Comment on a tweet. The insert and the parent tweet's replies counter
/// move in one transaction.
/// POST /api/tweets/:id/comment
pub async fn create_comment(
    State(pool): State<PgPool>,
    claims: jwt::Claims,
    Path(tweet_id): Path<Uuid>,
    Json(payload): Json<CreateComment>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let mut tx = pool
        .begin()
        .await
        .map_err(|_| AppError::InternalServerError)?;

    let updated = sqlx::query("UPDATE tweets SET replies = replies + 1 WHERE id = $1")
        .bind(tweet_id)
        .execute(&mut *tx)
        .await
        .map_err(|_| AppError::InternalServerError)?
        .rows_affected();

    if updated == 0 {
        return Err(AppError::NotFound("Tweet not found".to_string()));
    }

    let comment = sqlx::query_as::<_, Comment>(
        r#"
        INSERT INTO comments (id, tweet_id, author_id, content)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(tweet_id)
    .bind(claims.sub)
    .bind(&payload.content)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create comment: {:?}", e);
        AppError::InternalServerError
    })?;

    tx.commit()
        .await
        .map_err(|_| AppError::InternalServerError)?;

    Ok(get_comment_response(&pool, comment.id).await?.created())
}

/// Get all comments on a tweet, newest first
/// GET /api/tweets/:id/comments
pub async fn get_tweet_comments(
    State(pool): State<PgPool>,
    Path(tweet_id): Path<Uuid>,
    Query(filter): Query<CommentFilter>,
) -> Result<impl IntoResponse, AppError> {
    // Verify tweet exists
    sqlx::query("SELECT id FROM tweets WHERE id = $1")
        .bind(tweet_id)
        .fetch_optional(&pool)
        .await
        .map_err(|_| AppError::InternalServerError)?
        .ok_or(AppError::NotFound("Tweet not found".to_string()))?;

    let limit = filter.limit.unwrap_or(20).min(100);
    let offset = filter.offset.unwrap_or(0);

    let total_row = sqlx::query("SELECT COUNT(*) as count FROM comments WHERE tweet_id = $1")
        .bind(tweet_id)
        .fetch_one(&pool)
        .await
        .map_err(|_| AppError::InternalServerError)?;

    let total: i64 = total_row.get("count");

    let comments = sqlx::query_as::<_, CommentFromDb>(
        r#"
        SELECT
            c.id, c.tweet_id, c.author_id, c.content, c.created_at,
            u.username, u.avatar
        FROM comments c
        JOIN users u ON c.author_id = u.id
        WHERE c.tweet_id = $1
        ORDER BY c.created_at DESC, c.id ASC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(tweet_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch comments: {:?}", e);
        AppError::InternalServerError
    })?;

    let comments_response: Vec<CommentResponse> =
        comments.into_iter().map(CommentResponse::from).collect();

    let has_more = (offset + limit) < total;

    Ok(ApiResponse::success(CommentsListResponse {
        comments: comments_response,
        total,
        has_more,
    }))
}

async fn get_comment_response(
    pool: &PgPool,
    comment_id: Uuid,
) -> Result<ApiResponse<CommentResponse>, AppError> {
    let row = sqlx::query_as::<_, CommentFromDb>(
        r#"
        SELECT
            c.id, c.tweet_id, c.author_id, c.content, c.created_at,
            u.username, u.avatar
        FROM comments c
        JOIN users u ON c.author_id = u.id
        WHERE c.id = $1
        "#,
    )
    .bind(comment_id)
    .fetch_optional(pool)
    .await
    .map_err(|e| {
        tracing::error!("Fetch comment error: {:?}", e);
        AppError::InternalServerError
    })?
    .ok_or(AppError::NotFound("Comment not found".to_string()))?;

    Ok(ApiResponse::success(CommentResponse::from(row)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{claims_for, seed_tweet, seed_user, tweet_counter};

    #[sqlx::test]
    async fn commenting_keeps_replies_equal_to_comment_count(pool: PgPool) {
        let alice = seed_user(&pool, "alice").await;
        let bob = seed_user(&pool, "bob").await;
        let tweet = seed_tweet(&pool, alice, "hello").await;

        for content in ["first", "second"] {
            let payload = CreateComment {
                content: content.to_string(),
            };
            assert!(create_comment(
                State(pool.clone()),
                claims_for(bob),
                Path(tweet),
                Json(payload)
            )
            .await
            .is_ok());
        }

        let comment_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE tweet_id = $1")
                .bind(tweet)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(comment_count, 2);
        assert_eq!(tweet_counter(&pool, tweet, "replies").await, 2);
    }

    #[sqlx::test]
    async fn commenting_on_missing_tweet_is_not_found(pool: PgPool) {
        let bob = seed_user(&pool, "bob").await;

        let payload = CreateComment {
            content: "hello".to_string(),
        };
        let res = create_comment(
            State(pool.clone()),
            claims_for(bob),
            Path(Uuid::new_v4()),
            Json(payload),
        )
        .await;
        assert!(matches!(res, Err(AppError::NotFound(_))));
    }
}
