//! # Portfolio Store
//!
//! Tracks the signed-in user's active portfolio with its summary and
//! positions.
//!
//! ## Single active portfolio
//!
//! A user may own several portfolios but at most one is active, and this
//! store only ever holds that one. The active portfolio is picked from the
//! user's list by its `is_active` flag (first one if the backend flags more
//! than one, with a warning; first one if none is flagged). The orders store
//! resolves its portfolio through the same [`resolve_active`].
//!
//! ## Load sequence
//!
//! 1. `GET /portfolios/user/{id}/has-active`, exactly once. `false` ends the
//!    load with `has_portfolio = false`.
//! 2. `GET /portfolios/user/{id}`. A `404` or an empty list also means
//!    `has_portfolio = false`, not an error.
//! 3. Summary and positions together, fail-fast.

use async_trait::async_trait;
use parking_lot::RwLock;
use shared::{CashOperation, CreatePortfolioRequest, Portfolio, PortfolioSummary, Position};
use std::sync::Arc;

use super::{Epoch, SessionBound, StoreContext, StoreEvent};
use crate::core::error::{AppError, Result};
use crate::services::api::{portfolio as api, ApiClient};
use crate::utils::validation;

const STORE: &str = "portfolio";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PortfolioState {
    /// The user's one active portfolio
    pub portfolio: Option<Portfolio>,
    pub has_portfolio: bool,
    pub summary: Option<PortfolioSummary>,
    pub positions: Vec<Position>,
    pub is_loading: bool,
    /// A create or cash operation is in flight
    pub is_submitting: bool,
    pub is_refreshing_positions: bool,
    pub error: Option<String>,
}

struct Loaded {
    portfolio: Option<Portfolio>,
    summary: Option<PortfolioSummary>,
    positions: Vec<Position>,
}

impl Loaded {
    fn none() -> Self {
        Self {
            portfolio: None,
            summary: None,
            positions: Vec::new(),
        }
    }
}

pub struct PortfolioStore {
    ctx: StoreContext,
    state: Arc<RwLock<PortfolioState>>,
    epoch: Epoch,
}

impl PortfolioStore {
    pub fn new(ctx: StoreContext) -> Self {
        Self {
            ctx,
            state: Arc::new(RwLock::new(PortfolioState::default())),
            epoch: Epoch::default(),
        }
    }

    pub fn snapshot(&self) -> PortfolioState {
        self.state.read().clone()
    }

    pub fn active_portfolio_id(&self) -> Option<i64> {
        self.state.read().portfolio.as_ref().map(|p| p.portfolio_id)
    }

    pub fn clear_error(&self) {
        self.state.write().error = None;
    }

    /// Full reload of portfolio, summary and positions.
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

        let result = self.fetch(user_id).await;
        if !self.epoch.is_current(epoch) {
            tracing::debug!("Discarding stale portfolio response");
            return Ok(());
        }

        match result {
            Ok(loaded) => {
                {
                    let mut state = self.state.write();
                    state.has_portfolio = loaded.portfolio.is_some();
                    state.portfolio = loaded.portfolio;
                    state.summary = loaded.summary;
                    state.positions = loaded.positions;
                    state.is_loading = false;
                }
                tracing::debug!(
                    user_id,
                    portfolio_id = ?self.active_portfolio_id(),
                    "Portfolio loaded"
                );
                self.ctx.events.publish(StoreEvent::PortfolioUpdated);
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

    async fn fetch(&self, user_id: i64) -> Result<Loaded> {
        let client = &self.ctx.client;
        let Some(portfolio) = resolve_active(client, user_id).await? else {
            return Ok(Loaded::none());
        };

        let id = portfolio.portfolio_id;
        let (summary, positions) =
            futures::try_join!(api::get_portfolio_summary(client, id), api::get_positions(client, id))?;

        Ok(Loaded {
            portfolio: Some(portfolio),
            summary,
            positions,
        })
    }

    /// Create the user's portfolio, then reload.
    #[tracing::instrument(skip(self))]
    pub async fn create_portfolio(&self, name: &str, initial_cash: Option<f64>) -> Result<Portfolio> {
        let user_id = self.ctx.require_user()?;
        let name = name.trim();
        let mut check = vec![required_name(name)];
        if let Some(cash) = initial_cash {
            check.push(validation::validate_cash_amount(cash));
        }
        self.validated(validation::ValidationResult::first_failure(check))?;

        let request = CreatePortfolioRequest {
            user_id,
            name: name.to_string(),
            initial_cash,
        };
        let result = self
            .submitting(api::create_portfolio(&self.ctx.client, &request))
            .await?;
        self.load().await?;
        Ok(result)
    }

    pub async fn add_cash(&self, amount: f64) -> Result<Portfolio> {
        self.cash_operation(CashOperation::Add, amount).await
    }

    pub async fn withdraw_cash(&self, amount: f64) -> Result<Portfolio> {
        self.cash_operation(CashOperation::Withdraw, amount).await
    }

    #[tracing::instrument(skip(self))]
    async fn cash_operation(&self, operation: CashOperation, amount: f64) -> Result<Portfolio> {
        self.validated(validation::validate_cash_amount(amount))?;
        let portfolio_id = self.require_portfolio()?;

        let updated = self
            .submitting(api::cash_operation(&self.ctx.client, portfolio_id, operation, amount))
            .await?;
        self.load().await?;
        Ok(updated)
    }

    /// Revalue positions server-side, then re-fetch them.
    #[tracing::instrument(skip(self))]
    pub async fn refresh_positions(&self) -> Result<()> {
        let portfolio_id = self.require_portfolio()?;
        let epoch = self.epoch.current();
        self.state.write().is_refreshing_positions = true;

        let client = &self.ctx.client;
        let result = match api::refresh_positions(client, portfolio_id).await {
            Ok(()) => api::get_positions(client, portfolio_id).await,
            Err(e) => Err(e),
        };

        if !self.epoch.is_current(epoch) {
            return Ok(());
        }

        let mut state = self.state.write();
        state.is_refreshing_positions = false;
        match result {
            Ok(positions) => {
                state.positions = positions;
                drop(state);
                self.ctx.events.publish(StoreEvent::PortfolioUpdated);
                Ok(())
            }
            Err(e) => {
                drop(state);
                let message = self.ctx.failure(STORE, &e);
                self.state.write().error = Some(message);
                Err(e)
            }
        }
    }

    fn require_portfolio(&self) -> Result<i64> {
        self.active_portfolio_id()
            .ok_or_else(|| AppError::State("No active portfolio".to_string()))
    }

    fn validated(&self, check: validation::ValidationResult) -> Result<()> {
        check.into_result().map_err(|e| {
            self.state.write().error = Some(e.user_message());
            e
        })
    }

    /// Run `action` with `is_submitting` set; failures land in `error`.
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

fn required_name(name: &str) -> validation::ValidationResult {
    if name.is_empty() {
        validation::ValidationResult::err("Portfolio name is required")
    } else {
        validation::ValidationResult::ok()
    }
}

/// The user's active portfolio, as every store sees it: `has-active` first,
/// then the flagged entry of the user's list. `None` when there is none.
pub(crate) async fn resolve_active(client: &ApiClient, user_id: i64) -> Result<Option<Portfolio>> {
    if !api::has_active_portfolio(client, user_id).await? {
        return Ok(None);
    }
    let portfolios = api::get_user_portfolios(client, user_id).await?;
    Ok(select_active(portfolios))
}

/// Pick the active portfolio from a user's list.
fn select_active(portfolios: Vec<Portfolio>) -> Option<Portfolio> {
    let active_count = portfolios.iter().filter(|p| p.is_active).count();
    if active_count > 1 {
        tracing::warn!(active_count, "More than one active portfolio, using the first");
    }

    let index = portfolios.iter().position(|p| p.is_active).unwrap_or(0);
    portfolios.into_iter().nth(index)
}

#[async_trait]
impl SessionBound for PortfolioStore {
    fn name(&self) -> &'static str {
        STORE
    }

    async fn sync(&self) -> Result<()> {
        self.load().await
    }

    fn clear(&self) {
        self.epoch.bump();
        *self.state.write() = PortfolioState::default();
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
    use std::time::Duration;

    fn portfolio_json(id: i64, active: bool) -> serde_json::Value {
        json!({ "portfolio_id": id, "user_id": 7, "name": format!("P{id}"), "cash_balance": 5000.0, "is_active": active })
    }

    fn with_portfolio(transport: &MockTransport) {
        transport.on(Method::Get, "/portfolios/user/7/has-active", MockResponse::json(200, json!(true)));
        transport.on(
            Method::Get,
            "/portfolios/user/7",
            MockResponse::json(200, json!({ "portfolios": [portfolio_json(11, false), portfolio_json(12, true)] })),
        );
        transport.on(Method::Get, "/portfolios/12/summary", MockResponse::json(200, json!({ "total_value": 6200.0 })));
        transport.on(
            Method::Get,
            "/positions/portfolio/12",
            MockResponse::json(200, json!([{ "position_id": 1, "portfolio_id": 12, "symbol": "AAPL", "quantity": 10 }])),
        );
    }

    #[tokio::test]
    async fn test_has_active_checked_once_before_portfolio_fetch() {
        let transport = Arc::new(MockTransport::new());
        with_portfolio(&transport);
        let (ctx, _) = testing::context(transport.clone(), Some(7));
        let store = PortfolioStore::new(ctx);

        store.load().await.unwrap();

        let log = transport.call_log();
        assert_eq!(log[0], "GET /portfolios/user/7/has-active");
        assert_eq!(transport.call_count(Method::Get, "/portfolios/user/7/has-active"), 1);
        let state = store.snapshot();
        assert_eq!(state.portfolio.map(|p| p.portfolio_id), Some(12));
        assert!(state.has_portfolio);
        assert_eq!(state.summary.map(|s| s.total_value), Some(6200.0));
        assert_eq!(state.positions.len(), 1);
    }

    #[tokio::test]
    async fn test_without_active_portfolio_stops_early() {
        let transport = Arc::new(MockTransport::new());
        transport.on(
            Method::Get,
            "/portfolios/user/7/has-active",
            MockResponse::json(200, json!({ "has_active_portfolio": false })),
        );
        let (ctx, _) = testing::context(transport.clone(), Some(7));
        let store = PortfolioStore::new(ctx);

        store.load().await.unwrap();
        assert_eq!(transport.calls().len(), 1);
        let state = store.snapshot();
        assert!(!state.has_portfolio);
        assert!(state.portfolio.is_none());
    }

    #[tokio::test]
    async fn test_portfolio_404_is_not_an_error() {
        let transport = Arc::new(MockTransport::new());
        transport.on(Method::Get, "/portfolios/user/7/has-active", MockResponse::json(200, json!(true)));
        transport.on(Method::Get, "/portfolios/user/7", MockResponse::not_found());
        let (ctx, _) = testing::context(transport, Some(7));
        let store = PortfolioStore::new(ctx);

        store.load().await.unwrap();
        let state = store.snapshot();
        assert!(!state.has_portfolio);
        assert!(state.portfolio.is_none());
        assert!(state.error.is_none());
    }

    #[tokio::test]
    async fn test_anonymous_session_fetches_nothing() {
        let transport = Arc::new(MockTransport::new());
        let (ctx, _) = testing::context(transport.clone(), None);
        let store = PortfolioStore::new(ctx);

        store.load().await.unwrap();
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_failed_reload_keeps_displayed_data() {
        let transport = Arc::new(MockTransport::new());
        with_portfolio(&transport);
        let (ctx, _) = testing::context(transport.clone(), Some(7));
        let store = PortfolioStore::new(ctx);
        store.load().await.unwrap();

        transport.on(
            Method::Get,
            "/positions/portfolio/12",
            MockResponse::json(503, json!({ "error": "pricing offline" })),
        );
        assert!(store.load().await.is_err());

        let state = store.snapshot();
        assert_eq!(state.positions.len(), 1);
        assert_eq!(state.error.as_deref(), Some("pricing offline"));
        assert!(!state.is_loading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_positions_visible_while_reloading() {
        let transport = Arc::new(MockTransport::new());
        with_portfolio(&transport);
        let (ctx, _) = testing::context(transport.clone(), Some(7));
        let store = Arc::new(PortfolioStore::new(ctx));
        store.load().await.unwrap();

        transport.with_delay(Method::Get, "/positions/portfolio/12", Duration::from_secs(2));
        let reload = tokio::spawn({
            let store = store.clone();
            async move { store.load().await }
        });

        tokio::time::sleep(Duration::from_secs(1)).await;
        let mid = store.snapshot();
        assert!(mid.is_loading);
        assert_eq!(mid.positions.len(), 1);

        reload.await.unwrap().unwrap();
        assert!(!store.snapshot().is_loading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_discards_in_flight_response() {
        let transport = Arc::new(MockTransport::new());
        with_portfolio(&transport);
        transport.with_delay(Method::Get, "/positions/portfolio/12", Duration::from_secs(2));
        let (ctx, _) = testing::context(transport, Some(7));
        let store = Arc::new(PortfolioStore::new(ctx));

        let load = tokio::spawn({
            let store = store.clone();
            async move { store.load().await }
        });
        tokio::time::sleep(Duration::from_secs(1)).await;
        store.clear();

        load.await.unwrap().unwrap();
        assert_eq!(store.snapshot(), PortfolioState::default());
    }

    #[tokio::test]
    async fn test_cash_withdraw_validates_then_reloads() {
        let transport = Arc::new(MockTransport::new());
        with_portfolio(&transport);
        transport.on(
            Method::Post,
            "/portfolios/12/cash/withdraw",
            MockResponse::json(200, json!({ "portfolio": portfolio_json(12, true) })),
        );
        let (ctx, _) = testing::context(transport.clone(), Some(7));
        let store = PortfolioStore::new(ctx);
        store.load().await.unwrap();

        let err = store.withdraw_cash(-10.0).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(transport.call_count(Method::Post, "/portfolios/12/cash/withdraw"), 0);

        transport.reset_calls();
        store.withdraw_cash(250.0).await.unwrap();
        assert_eq!(transport.call_count(Method::Post, "/portfolios/12/cash/withdraw"), 1);
        assert_eq!(transport.call_count(Method::Get, "/portfolios/user/7/has-active"), 1);
        assert!(store.snapshot().error.is_none());
    }

    #[test]
    fn test_select_active_prefers_flagged() {
        let portfolios: Vec<Portfolio> = serde_json::from_value(json!([
            portfolio_json(1, false),
            portfolio_json(2, true),
        ]))
        .unwrap();
        assert_eq!(select_active(portfolios).map(|p| p.portfolio_id), Some(2));
        assert!(select_active(Vec::new()).is_none());
    }
}
