use axum::{extract::State, response::IntoResponse, Json};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::{
        jwt, utils, AuthResponse, ChangePassword, LoginUser, RefreshRequest, RegisterUser,
        UpdateProfile, User, UserProfileResponse, UserResponse,
    },
    config::settings::Settings,
    error::AppError,
    response::ApiResponse,
};

pub async fn register(
    State(pool): State<PgPool>,
    State(settings): State<Settings>,
    Json(payload): Json<RegisterUser>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let password_hash =
        utils::hash_password(&payload.password).map_err(|_| AppError::InternalServerError)?;

    let user_id = Uuid::new_v4();

    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (id, username, email, bio, avatar, password_hash) VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
    )
    .bind(user_id)
    .bind(&payload.username)
    .bind(&payload.email)
    .bind(&payload.bio)
    .bind(&payload.avatar)
    .bind(&password_hash)
    .fetch_one(&pool)
    .await
    .map_err(|e: sqlx::Error| {
        if e.to_string().contains("duplicate key value") {
            AppError::Conflict("Username or Email already exists".to_string())
        } else {
            tracing::error!("Database error: {:?}", e);
            AppError::InternalServerError
        }
    })?;

    let tokens = jwt::create_token_pair(user.id, &settings.jwt_secret)
        .map_err(|_| AppError::InternalServerError)?;

    Ok(ApiResponse::success(AuthResponse {
        access: tokens.access,
        refresh: tokens.refresh,
        user: UserResponse::from(user),
    })
    .created())
}

pub async fn login(
    State(pool): State<PgPool>,
    State(settings): State<Settings>,
    Json(payload): Json<LoginUser>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(&payload.email)
        .fetch_optional(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Database error: {:?}", e);
            AppError::InternalServerError
        })?
        .ok_or(AppError::Unauthorized)?;

    utils::verify_password(&user.password_hash, &payload.password)
        .map_err(|_| AppError::Unauthorized)?;

    let tokens = jwt::create_token_pair(user.id, &settings.jwt_secret)
        .map_err(|_| AppError::InternalServerError)?;

    Ok(ApiResponse::success(AuthResponse {
        access: tokens.access,
        refresh: tokens.refresh,
        user: UserResponse::from(user),
    }))
}

pub async fn refresh(
    State(pool): State<PgPool>,
    State(settings): State<Settings>,
    Json(payload): Json<RefreshRequest>,
) -> Result<impl IntoResponse, AppError> {
    let claims = jwt::decode_token(&payload.refresh, &settings.jwt_secret, jwt::TokenKind::Refresh)
        .map_err(|_| AppError::Unauthorized)?;

    // The user may have been removed since the token was issued
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(claims.sub)
        .fetch_optional(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Database error: {:?}", e);
            AppError::InternalServerError
        })?
        .ok_or(AppError::Unauthorized)?;

    let tokens = jwt::create_token_pair(user.id, &settings.jwt_secret)
        .map_err(|_| AppError::InternalServerError)?;

    Ok(ApiResponse::success(AuthResponse {
        access: tokens.access,
        refresh: tokens.refresh,
        user: UserResponse::from(user),
    }))
}

pub async fn get_me(
    State(pool): State<PgPool>,
    claims: jwt::Claims,
) -> Result<impl IntoResponse, AppError> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(claims.sub)
        .fetch_optional(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Database error: {:?}", e);
            AppError::InternalServerError
        })?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    Ok(ApiResponse::success(UserResponse::from(user)))
}

/// Helper struct for the profile query with live counts
#[derive(FromRow)]
struct ProfileRow {
    id: Uuid,
    username: String,
    bio: Option<String>,
    avatar: Option<String>,
    followers_count: i64,
    following_count: i64,
    tweets_count: i64,
    created_at: chrono::DateTime<chrono::Utc>,
}

/// Get a user's public profile
/// GET /api/users/:id
pub async fn get_user_by_id(
    State(pool): State<PgPool>,
    axum::extract::Path(id): axum::extract::Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let row = sqlx::query_as::<_, ProfileRow>(
        r#"
        SELECT
            u.id, u.username, u.bio, u.avatar, u.created_at,
            (SELECT COUNT(*) FROM follows WHERE following_id = u.id) AS followers_count,
            (SELECT COUNT(*) FROM follows WHERE follower_id = u.id) AS following_count,
            (SELECT COUNT(*) FROM tweets WHERE author_id = u.id) AS tweets_count
        FROM users u
        WHERE u.id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Database error: {:?}", e);
        AppError::InternalServerError
    })?
    .ok_or(AppError::NotFound("User not found".to_string()))?;

    Ok(ApiResponse::success(UserProfileResponse {
        id: row.id,
        username: row.username,
        bio: row.bio,
        avatar: row.avatar,
        followers_count: row.followers_count,
        following_count: row.following_count,
        tweets_count: row.tweets_count,
        created_at: row.created_at,
    }))
}

/// Partial profile update
/// PUT/PATCH /api/users/me
pub async fn update_profile(
    State(pool): State<PgPool>,
    claims: jwt::Claims,
    Json(payload): Json<UpdateProfile>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let mut tx = pool
        .begin()
        .await
        .map_err(|_| AppError::InternalServerError)?;

    if let Some(email) = &payload.email {
        sqlx::query("UPDATE users SET email = $1, updated_at = NOW() WHERE id = $2")
            .bind(email)
            .bind(claims.sub)
            .execute(&mut *tx)
            .await
            .map_err(|e: sqlx::Error| {
                if e.to_string().contains("duplicate key value") {
                    AppError::Conflict("Email already exists".to_string())
                } else {
                    tracing::error!("Database error: {:?}", e);
                    AppError::InternalServerError
                }
            })?;
    }

    if let Some(bio) = &payload.bio {
        sqlx::query("UPDATE users SET bio = $1, updated_at = NOW() WHERE id = $2")
            .bind(bio)
            .bind(claims.sub)
            .execute(&mut *tx)
            .await
            .map_err(|_| AppError::InternalServerError)?;
    }

    if let Some(avatar) = &payload.avatar {
        sqlx::query("UPDATE users SET avatar = $1, updated_at = NOW() WHERE id = $2")
            .bind(avatar)
            .bind(claims.sub)
            .execute(&mut *tx)
            .await
            .map_err(|_| AppError::InternalServerError)?;
    }

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(claims.sub)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|_| AppError::InternalServerError)?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    tx.commit()
        .await
        .map_err(|_| AppError::InternalServerError)?;

    Ok(ApiResponse::success(UserResponse::from(user)))
}

/// POST /api/users/change-password
pub async fn change_password(
    State(pool): State<PgPool>,
    claims: jwt::Claims,
    Json(payload): Json<ChangePassword>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(claims.sub)
        .fetch_optional(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Database error: {:?}", e);
            AppError::InternalServerError
        })?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    utils::verify_password(&user.password_hash, &payload.old_password)
        .map_err(|_| AppError::BadRequest("Old password is incorrect".to_string()))?;

    let password_hash =
        utils::hash_password(&payload.new_password).map_err(|_| AppError::InternalServerError)?;

    sqlx::query("UPDATE users SET password_hash = $1, updated_at = NOW() WHERE id = $2")
        .bind(&password_hash)
        .bind(claims.sub)
        .execute(&pool)
        .await
        .map_err(|_| AppError::InternalServerError)?;

    Ok(ApiResponse::ok("Password changed successfully".to_string()))
}
