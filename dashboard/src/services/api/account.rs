//! # Account Endpoints

use shared::{Account, Profile};

use super::client::ApiClient;
use super::envelope;
use crate::core::error::Result;

/// Account overview of the authenticated user.
pub async fn get_account(client: &ApiClient) -> Result<Account> {
    let body = client.get("/users/account").await?;
    envelope::entity(body, &["account"])
}

/// Public profile of any user.
pub async fn get_profile(client: &ApiClient, user_id: i64) -> Result<Profile> {
    let body = client.get(&format!("/users/{}/profile", user_id)).await?;
    envelope::entity(body, &["profile"])
}
