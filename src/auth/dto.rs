use serde::{Deserialize, Serialize};

/// Request body for signup.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Request body for token refresh.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Response returned after register, login or refresh.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: PublicUser,
}

/// Public part of the account returned to the client.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub username: String,
}

/// Account details for `GET /me`.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub username: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: time::OffsetDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_user_serialization() {
        let user = PublicUser {
            username: "alice".to_string(),
        };

        let json = serde_json::to_string(&user).unwrap();
        assert!(json.contains("alice"));
        assert!(json.contains("username"));
    }

    #[test]
    fn me_response_serialization() {
        let response = MeResponse {
            username: "alice".to_string(),
            created_at: time::macros::datetime!(2026-01-15 12:00 UTC),
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("alice"));
        assert!(json.contains("2026-01-15T12:00:00Z"));
    }
}
