//! Bearer-token gate in front of the directory API.
//!
//! Credential storage is behind `UserRepository` so the demo in-memory store
//! can be swapped for a real one without touching any handler.

use argon2::password_hash::{rand_core::OsRng, PasswordHash, SaltString};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use axum::routing::post;
use axum::{Json, Router};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use crate::shared::error::ApiError;
use crate::shared::state::AppState;
use crate::shared::utils::AppJson;

const TOKEN_LIFETIME_HOURS: i64 = 8;

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: i32,
    pub username: String,
    pub password_hash: String,
    pub role: String,
    pub full_name: String,
}

pub trait UserRepository: Send + Sync {
    fn find_by_username(&self, username: &str) -> Option<AuthUser>;
    fn verify_password(&self, user: &AuthUser, password: &str) -> bool;
}

pub struct InMemoryUserRepository {
    users: Vec<AuthUser>,
}

impl InMemoryUserRepository {
    /// Demo credential store: admin/admin123 and hr_manager/admin123.
    pub fn demo() -> Self {
        let hash = hash_password("admin123");
        Self {
            users: vec![
                AuthUser {
                    id: 1,
                    username: "admin".to_string(),
                    password_hash: hash.clone(),
                    role: "admin".to_string(),
                    full_name: "System Administrator".to_string(),
                },
                AuthUser {
                    id: 2,
                    username: "hr_manager".to_string(),
                    password_hash: hash,
                    role: "hr".to_string(),
                    full_name: "HR Manager".to_string(),
                },
            ],
        }
    }

    pub fn with_users(users: Vec<AuthUser>) -> Self {
        Self { users }
    }
}

impl UserRepository for InMemoryUserRepository {
    fn find_by_username(&self, username: &str) -> Option<AuthUser> {
        self.users.iter().find(|u| u.username == username).cloned()
    }

    fn verify_password(&self, user: &AuthUser, password: &str) -> bool {
        PasswordHash::new(&user.password_hash)
            .map(|parsed| {
                Argon2::default()
                    .verify_password(password.as_bytes(), &parsed)
                    .is_ok()
            })
            .unwrap_or(false)
    }
}

pub fn hash_password(password: &str) -> String {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .unwrap_or_default()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub username: String,
    pub role: String,
    pub exp: i64,
}

pub fn issue_token(secret: &str, user: &AuthUser) -> Result<String, jsonwebtoken::errors::Error> {
    let exp = (Utc::now() + Duration::hours(TOKEN_LIFETIME_HOURS)).timestamp();
    issue_token_at(secret, user, exp)
}

fn issue_token_at(
    secret: &str,
    user: &AuthUser,
    exp: i64,
) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = Claims {
        sub: user.id.to_string(),
        username: user.username.clone(),
        role: user.role.clone(),
        exp,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

pub fn decode_token(secret: &str, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginUser {
    pub id: i32,
    pub username: String,
    pub role: String,
    pub full_name: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: LoginUser,
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let username = req.username.trim();
    if username.is_empty() || req.password.is_empty() {
        return Err(ApiError::Validation(
            "username and password are required".to_string(),
        ));
    }

    let user = state
        .users
        .find_by_username(username)
        .ok_or_else(|| ApiError::Auth("Invalid credentials".to_string()))?;

    if !state.users.verify_password(&user, &req.password) {
        warn!("failed login attempt for '{}'", user.username);
        return Err(ApiError::Auth("Invalid credentials".to_string()));
    }

    let token = issue_token(&state.config.jwt_secret, &user)
        .map_err(|e| ApiError::Internal(anyhow::Error::new(e)))?;

    info!("user '{}' logged in", user.username);
    Ok(Json(LoginResponse {
        token,
        user: LoginUser {
            id: user.id,
            username: user.username,
            role: user.role,
            full_name: user.full_name,
        },
    }))
}

#[derive(Debug, Deserialize)]
pub struct ValidateTokenRequest {
    pub token: Option<String>,
}

pub async fn validate_token(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<ValidateTokenRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let Some(token) = req.token.filter(|t| !t.is_empty()) else {
        return Ok((StatusCode::BAD_REQUEST, Json(json!({ "valid": false }))));
    };

    let invalid = Ok((StatusCode::OK, Json(json!({ "valid": false }))));
    match decode_token(&state.config.jwt_secret, &token) {
        Ok(claims) => match state.users.find_by_username(&claims.username) {
            Some(user) => Ok((
                StatusCode::OK,
                Json(json!({
                    "valid": true,
                    "user": {
                        "id": user.id,
                        "username": user.username,
                        "role": user.role,
                        "full_name": user.full_name,
                    }
                })),
            )),
            None => invalid,
        },
        Err(_) => invalid,
    }
}

/// Middleware guarding every directory route. Validated claims are stored in
/// request extensions for handlers that care about the principal.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| ApiError::Auth("Missing bearer token".to_string()))?;

    let claims = decode_token(&state.config.jwt_secret, token)
        .map_err(|_| ApiError::Auth("Invalid or expired token".to_string()))?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

pub fn configure_auth_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/validate-token", post(validate_token))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_user() -> AuthUser {
        AuthUser {
            id: 7,
            username: "tester".to_string(),
            password_hash: hash_password("s3cret"),
            role: "hr".to_string(),
            full_name: "Test User".to_string(),
        }
    }

    #[test]
    fn verifies_correct_password_only() {
        let repo = InMemoryUserRepository::with_users(vec![test_user()]);
        let user = repo.find_by_username("tester").unwrap();
        assert!(repo.verify_password(&user, "s3cret"));
        assert!(!repo.verify_password(&user, "wrong"));
    }

    #[test]
    fn unknown_user_is_none() {
        let repo = InMemoryUserRepository::with_users(vec![test_user()]);
        assert!(repo.find_by_username("ghost").is_none());
    }

    #[test]
    fn token_round_trip_preserves_claims() {
        let user = test_user();
        let token = issue_token("secret", &user).unwrap();
        let claims = decode_token("secret", &token).unwrap();
        assert_eq!(claims.sub, "7");
        assert_eq!(claims.username, "tester");
        assert_eq!(claims.role, "hr");
    }

    #[test]
    fn rejects_wrong_secret() {
        let token = issue_token("secret", &test_user()).unwrap();
        assert!(decode_token("other-secret", &token).is_err());
    }

    #[test]
    fn rejects_expired_token() {
        let exp = (Utc::now() - Duration::hours(1)).timestamp();
        let token = issue_token_at("secret", &test_user(), exp).unwrap();
        assert!(decode_token("secret", &token).is_err());
    }
}
