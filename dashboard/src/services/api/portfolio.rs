//! # Portfolio and Position Endpoints
//!
//! "Not created yet" is the common case for new users, so the read endpoints
//! resolve a 404 to `None`/empty instead of an error.

use shared::{
    CashOperation, CashOperationRequest, CreatePortfolioRequest, HasActivePortfolio, Portfolio,
    PortfolioSummary, Position,
};

use super::client::ApiClient;
use super::envelope;
use crate::core::error::Result;

/// All portfolios owned by a user. 404 → empty.
#[tracing::instrument(skip(client))]
pub async fn get_user_portfolios(client: &ApiClient, user_id: i64) -> Result<Vec<Portfolio>> {
    let result = match client.get(&format!("/portfolios/user/{}", user_id)).await {
        Ok(body) => envelope::list(body, &["portfolios"]),
        Err(e) => Err(e),
    };
    envelope::empty_on_404(result)
}

/// The user's active portfolio. 404 → `None`.
pub async fn get_active_portfolio(client: &ApiClient, user_id: i64) -> Result<Option<Portfolio>> {
    let result = match client.get(&format!("/portfolios/user/{}/active", user_id)).await {
        Ok(body) => envelope::entity(body, &["portfolio"]),
        Err(e) => Err(e),
    };
    envelope::absent_on_404(result)
}

/// Whether the user has an active portfolio. 404 → `false`.
#[tracing::instrument(skip(client))]
pub async fn has_active_portfolio(client: &ApiClient, user_id: i64) -> Result<bool> {
    let result = match client.get(&format!("/portfolios/user/{}/has-active", user_id)).await {
        Ok(body) => body.into_typed::<HasActivePortfolio>().map(|flag| flag.value()),
        Err(e) => Err(e),
    };
    Ok(envelope::absent_on_404(result)?.unwrap_or(false))
}

#[tracing::instrument(skip(client, request), fields(user_id = request.user_id, name = %request.name))]
pub async fn create_portfolio(client: &ApiClient, request: &CreatePortfolioRequest) -> Result<Portfolio> {
    let body = client.post("/portfolios", Some(request)).await?;
    let portfolio: Portfolio = envelope::entity(body, &["portfolio"])?;
    tracing::info!(portfolio_id = portfolio.portfolio_id, "Portfolio created");
    Ok(portfolio)
}

/// Deposit or withdraw simulated cash. Returns the updated portfolio.
#[tracing::instrument(skip(client))]
pub async fn cash_operation(
    client: &ApiClient,
    portfolio_id: i64,
    operation: CashOperation,
    amount: f64,
) -> Result<Portfolio> {
    let path = format!("/portfolios/{}/cash/{}", portfolio_id, operation.as_path());
    let body = client.post(&path, Some(&CashOperationRequest { amount })).await?;
    envelope::entity(body, &["portfolio"])
}

/// 404 → `None`.
pub async fn get_portfolio_summary(client: &ApiClient, portfolio_id: i64) -> Result<Option<PortfolioSummary>> {
    let result = match client.get(&format!("/portfolios/{}/summary", portfolio_id)).await {
        Ok(body) => envelope::entity(body, &["summary"]),
        Err(e) => Err(e),
    };
    envelope::absent_on_404(result)
}

/// Positions of a portfolio. 404 → empty.
#[tracing::instrument(skip(client))]
pub async fn get_positions(client: &ApiClient, portfolio_id: i64) -> Result<Vec<Position>> {
    let result = match client.get(&format!("/positions/portfolio/{}", portfolio_id)).await {
        Ok(body) => envelope::list(body, &["positions"]),
        Err(e) => Err(e),
    };
    envelope::empty_on_404(result)
}

/// Ask the backend to revalue positions at current prices. The response
/// shape varies, so callers re-fetch with [`get_positions`].
#[tracing::instrument(skip(client))]
pub async fn refresh_positions(client: &ApiClient, portfolio_id: i64) -> Result<()> {
    let path = format!("/positions/portfolio/{}/refresh", portfolio_id);
    client.post::<serde_json::Value>(&path, None).await?;
    Ok(())
}
