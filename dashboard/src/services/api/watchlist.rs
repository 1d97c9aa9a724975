//! # Watchlist Endpoints
//!
//! Every mutation returns the full updated watchlist; the server is
//! authoritative for membership.

use serde_json::Value;
use shared::{CreateWatchlistRequest, UpdateWatchlistRequest, Watchlist, WatchlistSecurityRequest, WatchlistStats};

use super::client::ApiClient;
use super::envelope;
use crate::core::error::Result;

/// Watchlists of the authenticated user. 404 → empty.
#[tracing::instrument(skip(client))]
pub async fn get_watchlists(client: &ApiClient) -> Result<Vec<Watchlist>> {
    let result = match client.get("/watchlists").await {
        Ok(body) => envelope::list(body, &["watchlists"]),
        Err(e) => Err(e),
    };
    envelope::empty_on_404(result)
}

pub async fn get_watchlist(client: &ApiClient, watchlist_id: i64) -> Result<Option<Watchlist>> {
    let result = match client.get(&format!("/watchlists/{}", watchlist_id)).await {
        Ok(body) => envelope::entity(body, &["watchlist"]),
        Err(e) => Err(e),
    };
    envelope::absent_on_404(result)
}

#[tracing::instrument(skip(client, request), fields(name = %request.name))]
pub async fn create_watchlist(client: &ApiClient, request: &CreateWatchlistRequest) -> Result<Watchlist> {
    let body = client.post("/watchlists", Some(request)).await?;
    envelope::entity(body, &["watchlist"])
}

#[tracing::instrument(skip(client, request))]
pub async fn update_watchlist(
    client: &ApiClient,
    watchlist_id: i64,
    request: &UpdateWatchlistRequest,
) -> Result<Watchlist> {
    let body = client.put(&format!("/watchlists/{}", watchlist_id), request).await?;
    envelope::entity(body, &["watchlist"])
}

#[tracing::instrument(skip(client))]
pub async fn delete_watchlist(client: &ApiClient, watchlist_id: i64) -> Result<()> {
    client.delete::<Value>(&format!("/watchlists/{}", watchlist_id), None).await?;
    Ok(())
}

#[tracing::instrument(skip(client))]
pub async fn add_security(client: &ApiClient, watchlist_id: i64, symbol: &str) -> Result<Watchlist> {
    let request = WatchlistSecurityRequest {
        symbol: symbol.to_uppercase(),
    };
    let body = client
        .post(&format!("/watchlists/{}/securities", watchlist_id), Some(&request))
        .await?;
    envelope::entity(body, &["watchlist"])
}

#[tracing::instrument(skip(client))]
pub async fn remove_security(client: &ApiClient, watchlist_id: i64, symbol: &str) -> Result<Watchlist> {
    let request = WatchlistSecurityRequest {
        symbol: symbol.to_uppercase(),
    };
    let body = client
        .delete(&format!("/watchlists/{}/securities", watchlist_id), Some(&request))
        .await?;
    envelope::entity(body, &["watchlist"])
}

/// Remove every security. A `DELETE` without a body clears the list.
#[tracing::instrument(skip(client))]
pub async fn clear_securities(client: &ApiClient, watchlist_id: i64) -> Result<Watchlist> {
    let body = client
        .delete::<Value>(&format!("/watchlists/{}/securities", watchlist_id), None)
        .await?;
    envelope::entity(body, &["watchlist"])
}

/// Aggregate counts computed from the watchlist list. A user without
/// watchlists gets all-zero stats.
pub async fn get_watchlist_stats(client: &ApiClient) -> Result<WatchlistStats> {
    let watchlists = get_watchlists(client).await?;
    Ok(WatchlistStats::from_watchlists(&watchlists))
}
