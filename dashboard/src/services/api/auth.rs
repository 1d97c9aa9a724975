//! # Authentication Endpoints
//!
//! Handles session lifecycle (login, register, logout, validate).

use serde_json::Value;
use shared::{AuthResponse, LoginRequest, RegisterRequest, User, ValidateResponse};

use super::client::ApiClient;
use super::envelope;
use crate::core::error::Result;

/// Login with username and password.
#[tracing::instrument(skip(client, password), fields(username = %username))]
pub async fn login(client: &ApiClient, username: String, password: String) -> Result<AuthResponse> {
    tracing::info!("Attempting login");
    let start = std::time::Instant::now();

    let request = LoginRequest { username, password };
    let body = client.post("/auth/login", Some(&request)).await?;
    let response: AuthResponse = envelope::entity(body, &[])?;

    tracing::info!(
        user_id = response.user.user_id,
        duration_ms = start.elapsed().as_millis(),
        "Login successful"
    );
    Ok(response)
}

/// Register a new user. The backend logs the new user in on success.
#[tracing::instrument(skip(client, request), fields(username = %request.username))]
pub async fn register(client: &ApiClient, request: RegisterRequest) -> Result<AuthResponse> {
    let body = client.post("/auth/register", Some(&request)).await?;
    let response: AuthResponse = envelope::entity(body, &[])?;
    tracing::info!(user_id = response.user.user_id, "Registration successful");
    Ok(response)
}

/// Invalidate the token server-side.
pub async fn logout(client: &ApiClient) -> Result<()> {
    client.post::<Value>("/auth/logout", None).await?;
    Ok(())
}

/// Check the stored token with the backend.
///
/// Accepts both `{"valid": true, "user": {...}}` and a bare user object.
pub async fn validate(client: &ApiClient) -> Result<ValidateResponse> {
    let value = client.get("/auth/validate").await?.into_json();

    if value.get("valid").is_some() {
        return Ok(serde_json::from_value(value)?);
    }

    let user = value
        .get("user")
        .cloned()
        .or_else(|| value.get("user_id").map(|_| value.clone()))
        .and_then(|user| serde_json::from_value::<User>(user).ok());

    Ok(ValidateResponse {
        valid: user.is_some(),
        user,
    })
}
