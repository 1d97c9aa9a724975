//! # Orders Store
//!
//! Orders and transactions of the active portfolio. Both collections are
//! reloaded together after every order action, since a market order may
//! fill immediately and produce a transaction.

use async_trait::async_trait;
use parking_lot::RwLock;
use shared::{
    CostBasis, CreateOrderRequest, Order, OrderSide, OrderType, OrderValidation, Transaction,
    TransactionAnalytics,
};
use std::sync::Arc;

use super::portfolio::resolve_active;
use super::{Epoch, SessionBound, StoreContext, StoreEvent};
use crate::core::error::{AppError, Result};
use crate::services::api::orders as api;
use crate::utils::validation;

const STORE: &str = "orders";

/// Order form contents. The store fills in the portfolio.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderDraft {
    pub symbol: String,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub quantity: f64,
    pub price: Option<f64>,
    pub stop_price: Option<f64>,
}

impl OrderDraft {
    pub fn market(side: OrderSide, symbol: &str, quantity: f64) -> Self {
        Self {
            symbol: symbol.to_string(),
            side,
            order_type: OrderType::Market,
            quantity,
            price: None,
            stop_price: None,
        }
    }

    pub fn limit(side: OrderSide, symbol: &str, quantity: f64, price: f64) -> Self {
        Self {
            order_type: OrderType::Limit,
            price: Some(price),
            ..Self::market(side, symbol, quantity)
        }
    }

    fn into_request(self, portfolio_id: i64) -> CreateOrderRequest {
        CreateOrderRequest {
            portfolio_id,
            symbol: self.symbol.trim().to_uppercase(),
            side: self.side,
            order_type: self.order_type,
            quantity: self.quantity,
            price: self.price,
            stop_price: self.stop_price,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrdersState {
    pub portfolio_id: Option<i64>,
    pub orders: Vec<Order>,
    pub transactions: Vec<Transaction>,
    pub is_loading: bool,
    pub is_submitting: bool,
    pub error: Option<String>,
}

impl OrdersState {
    /// Pending and partially filled orders.
    pub fn open_orders(&self) -> Vec<&Order> {
        self.orders.iter().filter(|order| order.status.is_open()).collect()
    }
}

pub struct OrdersStore {
    ctx: StoreContext,
    state: Arc<RwLock<OrdersState>>,
    epoch: Epoch,
}

impl OrdersStore {
    pub fn new(ctx: StoreContext) -> Self {
        Self {
            ctx,
            state: Arc::new(RwLock::new(OrdersState::default())),
            epoch: Epoch::default(),
        }
    }

    pub fn snapshot(&self) -> OrdersState {
        self.state.read().clone()
    }

    pub fn clear_error(&self) {
        self.state.write().error = None;
    }

    /// Pin the portfolio, usually from [`super::PortfolioStore`]. `None`
    /// resolves the active portfolio on the next load. Responses still in
    /// flight for the previous portfolio are dropped.
    pub fn set_portfolio(&self, portfolio_id: Option<i64>) {
        let mut state = self.state.write();
        if state.portfolio_id != portfolio_id {
            self.epoch.bump();
            state.portfolio_id = portfolio_id;
            state.orders.clear();
            state.transactions.clear();
        }
    }

    async fn resolve_portfolio(&self, user_id: i64) -> Result<Option<i64>> {
        let pinned = self.state.read().portfolio_id;
        if pinned.is_some() {
            return Ok(pinned);
        }

        let epoch = self.epoch.current();
        let active = resolve_active(&self.ctx.client, user_id).await?;
        let id = active.map(|p| p.portfolio_id);
        if self.epoch.is_current(epoch) {
            self.state.write().portfolio_id = id;
        }
        Ok(id)
    }

    /// Reload orders and transactions together, fail-fast.
    #[tracing::instrument(skip(self))]
    pub async fn load(&self) -> Result<()> {
        let Some(user_id) = self.ctx.session.ready_user_id() else {
            self.clear();
            return Ok(());
        };

        let epoch = self.epoch.current();
        {
            let mut state = self.state.write();
            state.is_loading = true;
            state.error = None;
        }

        let client = &self.ctx.client;
        let result = match self.resolve_portfolio(user_id).await {
            Ok(Some(id)) => futures::try_join!(
                api::get_orders_by_portfolio(client, id),
                api::get_transactions_by_portfolio(client, id)
            )
            .map(Some),
            Ok(None) => Ok(None),
            Err(e) => Err(e),
        };

        if !self.epoch.is_current(epoch) {
            tracing::debug!("Discarding stale orders response");
            return Ok(());
        }

        match result {
            Ok(loaded) => {
                {
                    let mut state = self.state.write();
                    let (orders, transactions) = loaded.unwrap_or_default();
                    state.orders = orders;
                    state.transactions = transactions;
                    state.is_loading = false;
                }
                self.ctx.events.publish(StoreEvent::OrdersUpdated);
                Ok(())
            }
            Err(e) => {
                let message = self.ctx.failure(STORE, &e);
                let mut state = self.state.write();
                state.is_loading = false;
                state.error = Some(message);
                Err(e)
            }
        }
    }

    /// Validate locally, place the order, then reload orders and
    /// transactions once each.
    #[tracing::instrument(skip(self, draft), fields(symbol = %draft.symbol, side = ?draft.side, order_type = ?draft.order_type))]
    pub async fn create_order(&self, draft: OrderDraft) -> Result<Order> {
        let request = self.prepare(draft).await?;
        let order = self.submitting(api::create_order(&self.ctx.client, &request)).await?;
        self.reload_after_action().await;
        Ok(order)
    }

    /// Server-side pre-trade check; nothing is placed.
    pub async fn validate_order(&self, draft: OrderDraft) -> Result<OrderValidation> {
        let request = self.prepare(draft).await?;
        api::validate_order(&self.ctx.client, &request).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn cancel_order(&self, order_id: i64) -> Result<Option<Order>> {
        let order = self.submitting(api::cancel_order(&self.ctx.client, order_id)).await?;
        self.reload_after_action().await;
        Ok(order)
    }

    #[tracing::instrument(skip(self))]
    pub async fn execute_order(&self, order_id: i64) -> Result<Option<Order>> {
        let order = self.submitting(api::execute_order(&self.ctx.client, order_id)).await?;
        self.reload_after_action().await;
        Ok(order)
    }

    pub async fn active_orders(&self) -> Result<Vec<Order>> {
        let portfolio_id = self.require_portfolio().await?;
        api::get_active_orders(&self.ctx.client, portfolio_id).await
    }

    pub async fn recent_transactions(&self, limit: u32) -> Result<Vec<Transaction>> {
        let portfolio_id = self.require_portfolio().await?;
        api::get_recent_transactions(&self.ctx.client, portfolio_id, limit).await
    }

    pub async fn analytics(&self) -> Result<TransactionAnalytics> {
        let portfolio_id = self.require_portfolio().await?;
        api::get_transaction_analytics(&self.ctx.client, portfolio_id).await
    }

    pub async fn transactions_for_order(&self, order_id: i64) -> Result<Vec<Transaction>> {
        api::get_transactions_by_order(&self.ctx.client, order_id).await
    }

    pub async fn cost_basis(&self, symbol: &str) -> Result<Option<CostBasis>> {
        let portfolio_id = self.require_portfolio().await?;
        api::get_cost_basis(&self.ctx.client, portfolio_id, symbol).await
    }

    async fn require_portfolio(&self) -> Result<i64> {
        let user_id = self.ctx.require_user()?;
        self.resolve_portfolio(user_id)
            .await?
            .ok_or_else(|| AppError::State("No active portfolio".to_string()))
    }

    async fn prepare(&self, draft: OrderDraft) -> Result<CreateOrderRequest> {
        let portfolio_id = self.require_portfolio().await?;
        let request = draft.into_request(portfolio_id);
        validation::validate_order(&request).into_result().map_err(|e| {
            self.state.write().error = Some(e.user_message());
            e
        })?;
        Ok(request)
    }

    /// The action already succeeded; a failed reload only shows up in `error`.
    async fn reload_after_action(&self) {
        if let Err(e) = self.load().await {
            tracing::debug!(error = %e, "Reload after order action failed");
        }
    }

    async fn submitting<T>(&self, action: impl std::future::Future<Output = Result<T>>) -> Result<T> {
        {
            let mut state = self.state.write();
            state.is_submitting = true;
            state.error = None;
        }

        let result = action.await;
        self.state.write().is_submitting = false;

        result.map_err(|e| {
            let message = self.ctx.failure(STORE, &e);
            self.state.write().error = Some(message);
            e
        })
    }
}

#[async_trait]
impl SessionBound for OrdersStore {
    fn name(&self) -> &'static str {
        STORE
    }

    async fn sync(&self) -> Result<()> {
        self.load().await
    }

    fn clear(&self) {
        self.epoch.bump();
        *self.state.write() = OrdersState::default();
        self.ctx.events.publish(StoreEvent::Cleared(STORE));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::service::Method;
    use crate::services::mock::{MockResponse, MockTransport};
    use crate::store::testing;
    use serde_json::json;
    use shared::OrderStatus;
    use std::time::Duration;

    fn filled_order() -> serde_json::Value {
        json!({
            "order_id": 99, "portfolio_id": 12, "symbol": "AAPL", "side": "BUY",
            "order_type": "MARKET", "quantity": 10, "status": "FILLED", "filled_quantity": 10
        })
    }

    fn backend() -> Arc<MockTransport> {
        let transport = Arc::new(MockTransport::new());
        transport.on(Method::Post, "/orders", MockResponse::json(201, json!({ "order": filled_order() })));
        transport.on(Method::Get, "/orders/portfolio/12", MockResponse::json(200, json!({ "orders": [filled_order()] })));
        transport.on(
            Method::Get,
            "/transactions/portfolio/12",
            MockResponse::json(200, json!([{
                "transaction_id": 5, "portfolio_id": 12, "order_id": 99, "symbol": "AAPL",
                "transaction_type": "BUY", "quantity": 10, "price": 190.0, "total_amount": 1900.0
            }])),
        );
        transport
    }

    #[tokio::test]
    async fn test_market_buy_refetches_orders_and_transactions_once() {
        let transport = backend();
        let (ctx, _) = testing::context(transport.clone(), Some(7));
        let store = OrdersStore::new(ctx);
        store.set_portfolio(Some(12));

        let order = store
            .create_order(OrderDraft::market(OrderSide::Buy, "AAPL", 10.0))
            .await
            .unwrap();
        assert_eq!(order.status, OrderStatus::Filled);

        assert_eq!(transport.call_count(Method::Post, "/orders"), 1);
        assert_eq!(transport.call_count(Method::Get, "/orders/portfolio/12"), 1);
        assert_eq!(transport.call_count(Method::Get, "/transactions/portfolio/12"), 1);

        let state = store.snapshot();
        assert_eq!(state.orders.len(), 1);
        assert_eq!(state.transactions.len(), 1);
        assert!(!state.is_submitting);
    }

    #[tokio::test]
    async fn test_invalid_limit_order_never_reaches_network() {
        let transport = backend();
        let (ctx, _) = testing::context(transport.clone(), Some(7));
        let store = OrdersStore::new(ctx);
        store.set_portfolio(Some(12));

        let mut draft = OrderDraft::market(OrderSide::Buy, "AAPL", 10.0);
        draft.order_type = OrderType::Limit;
        let err = store.create_order(draft).await.unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        assert!(transport.calls().is_empty());
        assert!(store.snapshot().error.is_some());
    }

    #[tokio::test]
    async fn test_rejected_order_surfaces_message() {
        let transport = backend();
        transport.on(
            Method::Post,
            "/orders",
            MockResponse::json(400, json!({ "error": "Insufficient cash balance" })),
        );
        let (ctx, _) = testing::context(transport.clone(), Some(7));
        let store = OrdersStore::new(ctx);
        store.set_portfolio(Some(12));

        let draft = OrderDraft::limit(OrderSide::Buy, "aapl", 1000.0, 190.0);
        assert!(store.create_order(draft).await.is_err());
        assert_eq!(store.snapshot().error.as_deref(), Some("Insufficient cash balance"));
        assert_eq!(transport.call_count(Method::Get, "/orders/portfolio/12"), 0);

        let sent = transport.last_call(Method::Post, "/orders").unwrap().body.unwrap();
        assert_eq!(sent["symbol"], "AAPL");
        assert_eq!(sent["price"], 190.0);
    }

    fn with_active_portfolio(transport: &MockTransport) {
        transport.on(Method::Get, "/portfolios/user/7/has-active", MockResponse::json(200, json!(true)));
        transport.on(
            Method::Get,
            "/portfolios/user/7",
            MockResponse::json(200, json!([
                { "portfolio_id": 11, "user_id": 7, "is_active": false },
                { "portfolio_id": 12, "user_id": 7, "is_active": true }
            ])),
        );
    }

    #[tokio::test]
    async fn test_resolves_active_portfolio_when_unpinned() {
        let transport = backend();
        with_active_portfolio(&transport);
        let (ctx, _) = testing::context(transport.clone(), Some(7));
        let store = OrdersStore::new(ctx);

        store.load().await.unwrap();
        assert_eq!(store.snapshot().portfolio_id, Some(12));
        assert_eq!(store.snapshot().orders.len(), 1);

        store.load().await.unwrap();
        assert_eq!(transport.call_count(Method::Get, "/portfolios/user/7"), 1);
        assert_eq!(transport.call_count(Method::Get, "/portfolios/user/7/active"), 0);
    }

    #[tokio::test]
    async fn test_no_portfolio_means_empty_lists() {
        let transport = Arc::new(MockTransport::new());
        transport.on(Method::Get, "/portfolios/user/7/has-active", MockResponse::json(200, json!(false)));
        let (ctx, _) = testing::context(transport.clone(), Some(7));
        let store = OrdersStore::new(ctx);

        store.load().await.unwrap();
        let state = store.snapshot();
        assert!(state.orders.is_empty());
        assert!(state.portfolio_id.is_none());
        assert!(state.error.is_none());
        assert_eq!(transport.call_count(Method::Get, "/portfolios/user/7"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_during_resolution_leaves_portfolio_unpinned() {
        let transport = backend();
        with_active_portfolio(&transport);
        transport.with_delay(Method::Get, "/portfolios/user/7", Duration::from_secs(2));
        let (ctx, _) = testing::context(transport, Some(7));
        let store = Arc::new(OrdersStore::new(ctx));

        let load = tokio::spawn({
            let store = store.clone();
            async move { store.load().await }
        });
        tokio::time::sleep(Duration::from_secs(1)).await;
        store.clear();

        load.await.unwrap().unwrap();
        assert_eq!(store.snapshot(), OrdersState::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_switching_portfolio_drops_previous_orders() {
        let transport = backend();
        transport.with_delay(Method::Get, "/orders/portfolio/12", Duration::from_secs(2));
        let (ctx, _) = testing::context(transport, Some(7));
        let store = Arc::new(OrdersStore::new(ctx));
        store.set_portfolio(Some(12));

        let load = tokio::spawn({
            let store = store.clone();
            async move { store.load().await }
        });
        tokio::time::sleep(Duration::from_secs(1)).await;
        store.set_portfolio(Some(13));

        load.await.unwrap().unwrap();
        let state = store.snapshot();
        assert_eq!(state.portfolio_id, Some(13));
        assert!(state.orders.is_empty());
        assert!(state.transactions.is_empty());
    }

    #[tokio::test]
    async fn test_cancel_reloads_both_collections() {
        let transport = backend();
        transport.on(Method::Post, "/orders/99/cancel", MockResponse::json(200, json!({ "message": "Order cancelled" })));
        let (ctx, _) = testing::context(transport.clone(), Some(7));
        let store = OrdersStore::new(ctx);
        store.set_portfolio(Some(12));

        assert!(store.cancel_order(99).await.unwrap().is_none());
        assert_eq!(transport.call_count(Method::Get, "/orders/portfolio/12"), 1);
        assert_eq!(transport.call_count(Method::Get, "/transactions/portfolio/12"), 1);
    }
}
