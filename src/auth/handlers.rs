use axum::{
    extract::{FromRef, State},
    routing::{get, post},
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, MeResponse, PublicUser, RefreshRequest, RegisterRequest},
        jwt::{AuthUser, JwtKeys},
    },
    state::AppState,
    store::StoreError,
};

fn is_valid_username(username: &str) -> bool {
    lazy_static! {
        static ref USERNAME_RE: Regex = Regex::new(r"^[A-Za-z0-9_.-]{4,32}$").unwrap();
    }
    USERNAME_RE.is_match(username)
}

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

fn sign_pair(
    keys: &JwtKeys,
    username: &str,
) -> Result<(String, String), (axum::http::StatusCode, String)> {
    let access_token = keys.sign_access(username).map_err(|e| {
        error!(error = %e, "jwt sign access failed");
        (axum::http::StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;
    let refresh_token = keys.sign_refresh(username).map_err(|e| {
        error!(error = %e, "jwt sign refresh failed");
        (axum::http::StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;
    Ok((access_token, refresh_token))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, (axum::http::StatusCode, String)> {
    // Usernames are case-sensitive; only surrounding whitespace is stripped.
    payload.username = payload.username.trim().to_string();

    if !is_valid_username(&payload.username) {
        warn!(username = %payload.username, "invalid username");
        return Err((
            axum::http::StatusCode::BAD_REQUEST,
            "Username must be 4-32 letters, digits, '_', '.' or '-'".into(),
        ));
    }

    if payload.password.len() < 4 {
        warn!("password too short");
        return Err((
            axum::http::StatusCode::BAD_REQUEST,
            "Password must be at least 4 characters".into(),
        ));
    }

    let user = match state
        .store
        .create_user(&payload.username, &payload.password)
        .await
    {
        Ok(u) => u,
        Err(StoreError::AlreadyExists) => {
            warn!(username = %payload.username, "username already taken");
            return Err((
                axum::http::StatusCode::CONFLICT,
                "Username already taken".into(),
            ));
        }
        Err(StoreError::InvalidInput(msg)) => {
            return Err((axum::http::StatusCode::BAD_REQUEST, msg.to_string()));
        }
        Err(e) => {
            error!(error = %e, "create user failed");
            return Err((
                axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                "Signup failed".into(),
            ));
        }
    };

    let keys = JwtKeys::from_ref(&state);
    let (access_token, refresh_token) = sign_pair(&keys, &user.username)?;

    info!(username = %user.username, "user registered");
    Ok(Json(AuthResponse {
        access_token,
        refresh_token,
        user: PublicUser {
            username: user.username,
        },
    }))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, (axum::http::StatusCode, String)> {
    payload.username = payload.username.trim().to_string();

    match state
        .store
        .verify_credentials(&payload.username, &payload.password)
        .await
    {
        Ok(()) => {}
        Err(StoreError::InvalidCredentials) => {
            warn!(username = %payload.username, "login rejected");
            return Err((
                axum::http::StatusCode::UNAUTHORIZED,
                "Invalid username or password".into(),
            ));
        }
        Err(e) => {
            error!(error = %e, "verify_credentials failed");
            return Err((
                axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                "Login failed".into(),
            ));
        }
    }

    let keys = JwtKeys::from_ref(&state);
    let (access_token, refresh_token) = sign_pair(&keys, &payload.username)?;

    info!(username = %payload.username, "user logged in");
    Ok(Json(AuthResponse {
        access_token,
        refresh_token,
        user: PublicUser {
            username: payload.username,
        },
    }))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<AuthResponse>, (axum::http::StatusCode, String)> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&payload.refresh_token)
        .map_err(|e| (axum::http::StatusCode::UNAUTHORIZED, format!("{}", e)))?;

    // The account may have gone away since the token was issued.
    match state.store.user_exists(&claims.sub).await {
        Ok(true) => {}
        Ok(false) => {
            return Err((axum::http::StatusCode::UNAUTHORIZED, "User not found".into()));
        }
        Err(e) => {
            error!(error = %e, "user_exists failed");
            return Err((
                axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                "Refresh failed".into(),
            ));
        }
    }

    let (access_token, refresh_token) = sign_pair(&keys, &claims.sub)?;

    Ok(Json(AuthResponse {
        access_token,
        refresh_token,
        user: PublicUser {
            username: claims.sub,
        },
    }))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(username): AuthUser,
) -> Result<Json<MeResponse>, (axum::http::StatusCode, String)> {
    match state.store.get_user(&username).await {
        Ok(user) => Ok(Json(MeResponse {
            username: user.username,
            created_at: user.created_at,
        })),
        Err(StoreError::UserNotFound) => {
            warn!(username = %username, "token for missing user");
            Err((axum::http::StatusCode::UNAUTHORIZED, "User not found".into()))
        }
        Err(e) => {
            error!(error = %e, username = %username, "get_user failed");
            Err((
                axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                "Lookup failed".into(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_policy() {
        assert!(is_valid_username("alice"));
        assert!(is_valid_username("bob_2024"));
        assert!(is_valid_username("a.b-c"));
        assert!(!is_valid_username("abc"));
        assert!(!is_valid_username(""));
        assert!(!is_valid_username("has space"));
        assert!(!is_valid_username(&"x".repeat(33)));
    }
}
