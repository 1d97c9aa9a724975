//! # Order and Transaction Endpoints
//!
//! The client only requests create/cancel/execute; status transitions are
//! the backend's business. Callers re-fetch to observe the new status.

use serde_json::Value;
use shared::{CostBasis, CreateOrderRequest, Order, OrderValidation, Transaction, TransactionAnalytics};

use super::client::ApiClient;
use super::envelope;
use crate::core::error::Result;

#[tracing::instrument(
    skip(client, request),
    fields(portfolio_id = request.portfolio_id, symbol = %request.symbol, side = ?request.side, order_type = ?request.order_type)
)]
pub async fn create_order(client: &ApiClient, request: &CreateOrderRequest) -> Result<Order> {
    let start = std::time::Instant::now();
    let body = client.post("/orders", Some(request)).await?;
    let order: Order = envelope::entity(body, &["order"])?;

    tracing::info!(
        order_id = order.order_id,
        status = %order.status,
        duration_ms = start.elapsed().as_millis(),
        "Order created"
    );
    Ok(order)
}

/// Server-side pre-trade check. Does not place the order.
pub async fn validate_order(client: &ApiClient, request: &CreateOrderRequest) -> Result<OrderValidation> {
    let body = client.post("/orders/validate", Some(request)).await?;
    envelope::entity(body, &["validation"])
}

/// All orders of a portfolio. 404 → empty.
#[tracing::instrument(skip(client))]
pub async fn get_orders_by_portfolio(client: &ApiClient, portfolio_id: i64) -> Result<Vec<Order>> {
    let result = match client.get(&format!("/orders/portfolio/{}", portfolio_id)).await {
        Ok(body) => envelope::list(body, &["orders"]),
        Err(e) => Err(e),
    };
    envelope::empty_on_404(result)
}

/// Open (pending or partially filled) orders of a portfolio. 404 → empty.
pub async fn get_active_orders(client: &ApiClient, portfolio_id: i64) -> Result<Vec<Order>> {
    let result = match client.get(&format!("/orders/portfolio/{}/active", portfolio_id)).await {
        Ok(body) => envelope::list(body, &["orders"]),
        Err(e) => Err(e),
    };
    envelope::empty_on_404(result)
}

/// Returns the updated order when the backend echoes it.
#[tracing::instrument(skip(client))]
pub async fn cancel_order(client: &ApiClient, order_id: i64) -> Result<Option<Order>> {
    let body = client.post::<Value>(&format!("/orders/{}/cancel", order_id), None).await?;
    Ok(envelope::entity(body, &["order"]).ok())
}

/// Force execution of a pending order at the current price.
#[tracing::instrument(skip(client))]
pub async fn execute_order(client: &ApiClient, order_id: i64) -> Result<Option<Order>> {
    let body = client.post::<Value>(&format!("/orders/{}/execute", order_id), None).await?;
    Ok(envelope::entity(body, &["order"]).ok())
}

/// Transaction history of a portfolio. 404 → empty.
#[tracing::instrument(skip(client))]
pub async fn get_transactions_by_portfolio(client: &ApiClient, portfolio_id: i64) -> Result<Vec<Transaction>> {
    let result = match client.get(&format!("/transactions/portfolio/{}", portfolio_id)).await {
        Ok(body) => envelope::list(body, &["transactions"]),
        Err(e) => Err(e),
    };
    envelope::empty_on_404(result)
}

pub async fn get_recent_transactions(
    client: &ApiClient,
    portfolio_id: i64,
    limit: u32,
) -> Result<Vec<Transaction>> {
    let path = format!("/transactions/portfolio/{}/recent", portfolio_id);
    let result = match client.get_with_query(&path, &[("limit", limit.to_string())]).await {
        Ok(body) => envelope::list(body, &["transactions"]),
        Err(e) => Err(e),
    };
    envelope::empty_on_404(result)
}

pub async fn get_transaction_analytics(client: &ApiClient, portfolio_id: i64) -> Result<TransactionAnalytics> {
    let body = client
        .get(&format!("/transactions/portfolio/{}/analytics", portfolio_id))
        .await?;
    envelope::entity(body, &["analytics"])
}

pub async fn get_transactions_by_order(client: &ApiClient, order_id: i64) -> Result<Vec<Transaction>> {
    let result = match client.get(&format!("/transactions/order/{}", order_id)).await {
        Ok(body) => envelope::list(body, &["transactions"]),
        Err(e) => Err(e),
    };
    envelope::empty_on_404(result)
}

/// Cost basis of one holding. 404 → `None` (never held).
pub async fn get_cost_basis(client: &ApiClient, portfolio_id: i64, symbol: &str) -> Result<Option<CostBasis>> {
    let path = format!(
        "/transactions/portfolio/{}/security/{}/cost-basis",
        portfolio_id,
        symbol.to_uppercase()
    );
    let result = match client.get(&path).await {
        Ok(body) => envelope::entity(body, &["cost_basis"]),
        Err(e) => Err(e),
    };
    envelope::absent_on_404(result)
}
