use anyhow::Result;
use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
    RequestPartsExt,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::settings::Settings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub exp: i64,
    pub iat: i64,
    pub kind: TokenKind,
}

/// Access/refresh token pair issued on register, login and refresh.
#[derive(Debug, Serialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

fn create_token(user_id: Uuid, secret: &str, kind: TokenKind, ttl: Duration) -> Result<String> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id,
        exp: (now + ttl).timestamp(),
        iat: now.timestamp(),
        kind,
    };
    Ok(encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )?)
}

pub fn create_token_pair(user_id: Uuid, secret: &str) -> Result<TokenPair> {
    Ok(TokenPair {
        access: create_token(user_id, secret, TokenKind::Access, Duration::hours(1))?,
        refresh: create_token(user_id, secret, TokenKind::Refresh, Duration::days(7))?,
    })
}

/// Decodes a token and checks it carries the expected kind, so a refresh
/// token can never authenticate a request and vice versa.
pub fn decode_token(token: &str, secret: &str, expected: TokenKind) -> Result<Claims> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )?;
    if data.claims.kind != expected {
        anyhow::bail!("unexpected token kind");
    }
    Ok(data.claims)
}

#[async_trait]
impl<S> FromRequestParts<S> for Claims
where
    S: Send + Sync,
    Settings: FromRef<S>,
{
    type Rejection = axum::http::StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| axum::http::StatusCode::UNAUTHORIZED)?;

        let settings = Settings::from_ref(state);

        decode_token(bearer.token(), &settings.jwt_secret, TokenKind::Access)
            .map_err(|_| axum::http::StatusCode::UNAUTHORIZED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn access_token_round_trips() {
        let user_id = Uuid::new_v4();
        let pair = create_token_pair(user_id, SECRET).unwrap();

        let claims = decode_token(&pair.access, SECRET, TokenKind::Access).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.kind, TokenKind::Access);
    }

    #[test]
    fn refresh_token_round_trips() {
        let user_id = Uuid::new_v4();
        let pair = create_token_pair(user_id, SECRET).unwrap();

        let claims = decode_token(&pair.refresh, SECRET, TokenKind::Refresh).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.kind, TokenKind::Refresh);
    }

    #[test]
    fn refresh_token_is_rejected_as_access() {
        let pair = create_token_pair(Uuid::new_v4(), SECRET).unwrap();
        assert!(decode_token(&pair.refresh, SECRET, TokenKind::Access).is_err());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let pair = create_token_pair(Uuid::new_v4(), SECRET).unwrap();
        assert!(decode_token(&pair.access, "other-secret", TokenKind::Access).is_err());
    }
}
