//! # Market Data Endpoints
//!
//! Securities browsing lives under `/api/v1/securities`; exchange status and
//! aggregate statistics come from `/api/market-data`.

use serde_json::Value;
use shared::{
    MarketContext, MarketStats, MarketStatus, PriceAlert, SectorOverview, Security, SecurityFilters,
    SecuritySearch,
};

use super::client::ApiClient;
use super::envelope;
use crate::core::error::Result;

/// All actively traded securities.
#[tracing::instrument(skip(client))]
pub async fn get_active_securities(client: &ApiClient) -> Result<Vec<Security>> {
    let start = std::time::Instant::now();
    let body = client.get("/securities/active").await?;
    let securities: Vec<Security> = envelope::list(body, &["securities"])?;
    tracing::debug!(
        count = securities.len(),
        duration_ms = start.elapsed().as_millis(),
        "Active securities fetched"
    );
    Ok(securities)
}

#[tracing::instrument(skip(client))]
pub async fn search_securities(client: &ApiClient, search: &SecuritySearch) -> Result<Vec<Security>> {
    let body = client.get_with_query("/securities/search", &search.to_query()).await?;
    envelope::list(body, &["securities", "results"])
}

pub async fn get_trending(client: &ApiClient, limit: u32) -> Result<Vec<Security>> {
    let body = client
        .get_with_query("/securities/trending", &[("limit", limit.to_string())])
        .await?;
    envelope::list(body, &["securities", "trending"])
}

pub async fn get_sector_overview(client: &ApiClient) -> Result<Vec<SectorOverview>> {
    let body = client.get("/securities/sector-overview").await?;
    envelope::list(body, &["sectors"])
}

pub async fn get_filters(client: &ApiClient) -> Result<SecurityFilters> {
    let body = client.get("/securities/filters").await?;
    envelope::entity(body, &["filters"])
}

pub async fn get_price_alerts(client: &ApiClient) -> Result<Vec<PriceAlert>> {
    let body = client.get("/securities/price-alerts").await?;
    envelope::list(body, &["alerts"])
}

/// Refresh one quote from the upstream provider, creating the security if the
/// backend does not know it yet.
#[tracing::instrument(skip(client))]
pub async fn update_price(client: &ApiClient, symbol: &str) -> Result<Security> {
    let path = format!("/securities/create-or-update/{}", symbol.to_uppercase());
    let body = client.post::<Value>(&path, None).await?;
    envelope::entity(body, &["security"])
}

pub async fn get_market_status(client: &ApiClient) -> Result<MarketStatus> {
    let body = client.get_market_data("/market-data/status").await?;
    envelope::entity(body, &["status"])
}

pub async fn get_market_stats(client: &ApiClient) -> Result<MarketStats> {
    let body = client.get_market_data("/market-data/stats").await?;
    envelope::entity(body, &["stats"])
}

pub async fn get_market_context(client: &ApiClient) -> Result<MarketContext> {
    let body = client.get_market_data("/market-data/context").await?;
    envelope::entity(body, &["context"])
}
