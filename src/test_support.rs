//! Seed helpers shared by the database-backed handler tests.

use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::jwt::{Claims, TokenKind};

pub fn claims_for(user_id: Uuid) -> Claims {
    Claims {
        sub: user_id,
        exp: 0,
        iat: 0,
        kind: TokenKind::Access,
    }
}

pub async fn seed_user(pool: &PgPool, username: &str) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO users (id, username, email, password_hash) VALUES ($1, $2, $3, 'test-hash')",
    )
    .bind(id)
    .bind(username)
    .bind(format!("{}@example.com", username))
    .execute(pool)
    .await
    .unwrap();
    id
}

pub async fn seed_tweet(pool: &PgPool, author_id: Uuid, content: &str) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO tweets (id, author_id, content) VALUES ($1, $2, $3)")
        .bind(id)
        .bind(author_id)
        .bind(content)
        .execute(pool)
        .await
        .unwrap();
    id
}

/// Seeds a tweet with an explicit timestamp so ordering assertions are
/// deterministic.
pub async fn seed_tweet_at(pool: &PgPool, author_id: Uuid, content: &str, created_at: &str) -> Uuid {
    let id = Uuid::new_v4();
    let ts: chrono::DateTime<chrono::Utc> = created_at.parse().unwrap();
    sqlx::query("INSERT INTO tweets (id, author_id, content, created_at) VALUES ($1, $2, $3, $4)")
        .bind(id)
        .bind(author_id)
        .bind(content)
        .bind(ts)
        .execute(pool)
        .await
        .unwrap();
    id
}

pub async fn follow(pool: &PgPool, follower_id: Uuid, following_id: Uuid) {
    sqlx::query("INSERT INTO follows (follower_id, following_id) VALUES ($1, $2)")
        .bind(follower_id)
        .bind(following_id)
        .execute(pool)
        .await
        .unwrap();
}

pub async fn tweet_counter(pool: &PgPool, tweet_id: Uuid, counter: &str) -> i32 {
    let query_str = format!("SELECT {} FROM tweets WHERE id = $1", counter);
    sqlx::query_scalar(&query_str)
        .bind(tweet_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

pub async fn edge_count(pool: &PgPool, table: &str, tweet_id: Uuid) -> i64 {
    let query_str = format!("SELECT COUNT(*) FROM {} WHERE tweet_id = $1", table);
    sqlx::query_scalar(&query_str)
        .bind(tweet_id)
        .fetch_one(pool)
        .await
        .unwrap()
}
