use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

pub mod handler;
pub mod jwt;
pub mod utils;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub bio: Option<String>,
    pub avatar: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterUser {
    #[validate(length(
        min = 3,
        max = 50,
        message = "Username must be between 3 and 50 characters"
    ))]
    pub username: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    pub bio: Option<String>,
    pub avatar: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginUser {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfile {
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    pub bio: Option<String>,
    pub avatar: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ChangePassword {
    pub old_password: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub new_password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access: String,
    pub refresh: String,
    pub user: UserResponse,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub bio: Option<String>,
    pub avatar: Option<String>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        UserResponse {
            id: user.id,
            username: user.username,
            email: user.email,
            bio: user.bio,
            avatar: user.avatar,
        }
    }
}

/// Public profile with live follow/tweet counts.
#[derive(Debug, Serialize)]
pub struct UserProfileResponse {
    pub id: Uuid,
    pub username: String,
    pub bio: Option<String>,
    pub avatar: Option<String>,
    pub followers_count: i64,
    pub following_count: i64,
    pub tweets_count: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_payload_rejects_short_username() {
        let payload = RegisterUser {
            username: "ab".to_string(),
            email: "a@example.com".to_string(),
            password: "password123".to_string(),
            bio: None,
            avatar: None,
        };
        assert!(payload.validate().is_err());
    }

    #[test]
    fn register_payload_rejects_bad_email() {
        let payload = RegisterUser {
            username: "alice".to_string(),
            email: "not-an-email".to_string(),
            password: "password123".to_string(),
            bio: None,
            avatar: None,
        };
        assert!(payload.validate().is_err());
    }

    #[test]
    fn register_payload_rejects_short_password() {
        let payload = RegisterUser {
            username: "alice".to_string(),
            email: "a@example.com".to_string(),
            password: "short".to_string(),
            bio: None,
            avatar: None,
        };
        assert!(payload.validate().is_err());
    }

    #[test]
    fn valid_register_payload_passes() {
        let payload = RegisterUser {
            username: "alice".to_string(),
            email: "a@example.com".to_string(),
            password: "password123".to_string(),
            bio: Some("hi".to_string()),
            avatar: None,
        };
        assert!(payload.validate().is_ok());
    }

    #[test]
    fn user_response_never_exposes_password_hash() {
        let user = User {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
            email: "a@example.com".to_string(),
            bio: None,
            avatar: None,
            password_hash: "secret-hash".to_string(),
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret-hash"));
    }
}
