use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use thiserror::Error;

use folio_db::Database;
use folio_types::api::{AuthResponse, Claims, LoginRequest, RegisterRequest};

use crate::error::{ApiError, blocking};
use crate::storage::Storage;
use crate::users::user_response;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub storage: Storage,
    pub jwt_secret: String,
    pub dev_mode: bool,
    pub max_upload_bytes: usize,
}

// -- Credential service --

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,
    #[error("invalid token")]
    Invalid,
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => ApiError::ExpiredCredential,
            TokenError::Invalid => ApiError::InvalidCredential,
        }
    }
}

/// Encode identity claims into a signed, time-bound token.
/// Development mode gets a long-lived token (30 days), otherwise 24 hours.
pub fn issue_token(
    secret: &str,
    dev_mode: bool,
    user_id: i64,
    username: &str,
) -> anyhow::Result<String> {
    let ttl = if dev_mode {
        chrono::Duration::days(30)
    } else {
        chrono::Duration::hours(24)
    };

    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        exp: (chrono::Utc::now() + ttl).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

/// Pure function of token + secret + current time. An elapsed validity
/// window is reported distinctly from every other verification failure.
pub fn verify_token(secret: &str, token: &str) -> Result<Claims, TokenError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
        _ => TokenError::Invalid,
    })
}

// -- Password digests --

pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let digest = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?
        .to_string();
    Ok(digest)
}

pub fn verify_password(password: &str, digest: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(digest)
        .map_err(|e| anyhow::anyhow!("corrupt password digest: {}", e))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

// -- Handlers --

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.username.len() < 3 || req.username.len() > 32 {
        return Err(ApiError::Validation(
            "Username must be 3-32 characters".into(),
        ));
    }
    if !req.email.contains('@') {
        return Err(ApiError::Validation("A valid email is required".into()));
    }
    if req.password.len() < 8 {
        return Err(ApiError::Validation(
            "Password must be at least 8 characters".into(),
        ));
    }

    let st = state.clone();
    let (username, email) = (req.username.clone(), req.email.clone());
    if blocking(move || st.db.duplicate_user_exists(&username, &email, -1)).await? {
        return Err(ApiError::Validation(
            "Username or email already exists".into(),
        ));
    }

    // Argon2 is CPU-bound; keep it off the async runtime
    let password = req.password.clone();
    let digest = blocking(move || hash_password(&password)).await?;

    let st = state.clone();
    let (username, email) = (req.username.clone(), req.email.clone());
    let user_id = blocking(move || st.db.create_user(&username, &email, &digest)).await?;

    let token = issue_token(&state.jwt_secret, state.dev_mode, user_id, &req.username)?;

    let st = state.clone();
    let row = blocking(move || st.db.get_user_by_id(user_id))
        .await?
        .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("user row missing after insert")))?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user: user_response(row),
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let st = state.clone();
    let username = req.username.clone();
    let user = blocking(move || st.db.get_user_by_username(&username))
        .await?
        .ok_or(ApiError::BadLogin)?;

    let digest = user.password_hash.clone();
    let password = req.password;
    if !blocking(move || verify_password(&password, &digest)).await? {
        return Err(ApiError::BadLogin);
    }

    let token = issue_token(&state.jwt_secret, state.dev_mode, user.id, &user.username)?;

    Ok(Json(AuthResponse {
        token,
        user: user_response(user),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn issue_then_verify_round_trips_claims() {
        let token = issue_token(SECRET, false, 7, "alice").unwrap();
        let claims = verify_token(SECRET, &token).unwrap();
        assert_eq!(claims.sub, 7);
        assert_eq!(claims.username, "alice");
    }

    #[test]
    fn expired_token_is_reported_as_expired_never_invalid() {
        // Past the default 60s validation leeway
        let claims = Claims {
            sub: 7,
            username: "alice".into(),
            exp: (chrono::Utc::now() - chrono::Duration::hours(1)).timestamp() as usize,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        assert!(matches!(
            verify_token(SECRET, &token),
            Err(TokenError::Expired)
        ));
    }

    #[test]
    fn tampered_token_is_invalid() {
        let token = issue_token(SECRET, false, 7, "alice").unwrap();
        assert!(matches!(
            verify_token("other-secret", &token),
            Err(TokenError::Invalid)
        ));
        assert!(matches!(
            verify_token(SECRET, "not-a-token"),
            Err(TokenError::Invalid)
        ));
    }

    #[test]
    fn development_tokens_outlive_production_tokens() {
        let dev = verify_token(SECRET, &issue_token(SECRET, true, 1, "a").unwrap()).unwrap();
        let prod = verify_token(SECRET, &issue_token(SECRET, false, 1, "a").unwrap()).unwrap();
        assert!(dev.exp > prod.exp);
    }

    #[test]
    fn password_digest_round_trip() {
        let digest = hash_password("hunter2hunter2").unwrap();
        assert_ne!(digest, "hunter2hunter2");
        assert!(verify_password("hunter2hunter2", &digest).unwrap());
        assert!(!verify_password("wrong-password", &digest).unwrap());
    }
}
