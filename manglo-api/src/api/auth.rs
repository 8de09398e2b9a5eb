//! Account routes and session authentication
//!
//! Bearer-token sessions backed by the `sessions` table: login mints an
//! opaque token, the middleware resolves it to a user id and injects
//! `CurrentUser` for protected handlers.

use argon2::password_hash::{rand_core::OsRng, PasswordHash, SaltString};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::db::{sessions, users};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Authenticated user id, injected by `auth_middleware`
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser(pub i64);

#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Extract the bearer token from the Authorization header
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Authentication middleware for protected routes
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(request.headers())
        .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))?
        .to_string();

    let user_id = sessions::user_for_token(&state.db, &token)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid or expired session".to_string()))?;

    request.extensions_mut().insert(CurrentUser(user_id));
    Ok(next.run(request).await)
}

/// POST /api/register
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<Credentials>,
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    if body.email.trim().is_empty() || body.password.is_empty() {
        return Err(ApiError::BadRequest(
            "Email and password are required".to_string(),
        ));
    }

    if users::find_by_email(&state.db, &body.email).await?.is_some() {
        return Err(ApiError::Conflict("User already exists".to_string()));
    }

    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(body.password.as_bytes(), &salt)
        .map_err(|e| ApiError::Internal(format!("Password hashing failed: {}", e)))?
        .to_string();

    users::create_user(&state.db, &body.email, &password_hash).await?;
    info!("Registered new user: {}", body.email);

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "User registered successfully" })),
    ))
}

/// POST /api/login
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<Credentials>,
) -> ApiResult<Json<serde_json::Value>> {
    if body.email.trim().is_empty() || body.password.is_empty() {
        return Err(ApiError::BadRequest(
            "Email and password are required".to_string(),
        ));
    }

    let user = users::find_by_email(&state.db, &body.email)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid credentials".to_string()))?;

    let parsed = PasswordHash::new(&user.password_hash)
        .map_err(|e| ApiError::Internal(format!("Stored hash invalid: {}", e)))?;

    if Argon2::default()
        .verify_password(body.password.as_bytes(), &parsed)
        .is_err()
    {
        return Err(ApiError::Unauthorized("Invalid credentials".to_string()));
    }

    let token = sessions::create_session(&state.db, user.id).await?;

    Ok(Json(json!({
        "message": "Login successful",
        "token": token,
        "user": { "id": user.id, "email": user.email },
    })))
}

/// POST /api/logout
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<serde_json::Value>> {
    if let Some(token) = bearer_token(&headers) {
        sessions::delete_session(&state.db, token).await?;
    }

    Ok(Json(json!({ "message": "Logout successful" })))
}

/// GET /api/check-auth
///
/// Reports session validity without ever returning 401.
pub async fn check_auth(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<serde_json::Value>> {
    let authenticated = match bearer_token(&headers) {
        Some(token) => sessions::user_for_token(&state.db, token).await?.is_some(),
        None => false,
    };

    Ok(Json(json!({ "authenticated": authenticated })))
}
