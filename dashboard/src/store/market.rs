//! # Market Store
//!
//! Securities, trending list, sector overview and market-wide statistics.
//!
//! Refreshes here are partial-tolerant: every section is fetched
//! independently and a failing section keeps its previous data. Background
//! polling runs on the store's own [`Scheduler`]:
//!
//! | task              | interval | work                              |
//! |-------------------|----------|-----------------------------------|
//! | `market.prices`   | 30s      | quotes for the first 10 visible   |
//! | `market.status`   | 60s      | open/closed, drives price pausing |
//! | `market.trending` | 60s      | trending securities               |
//! | `market.overview` | 5min     | stats, context, alerts            |
//!
//! The price task only runs while the market is open.

use async_trait::async_trait;
use futures::future::join_all;
use parking_lot::RwLock;
use shared::{
    MarketContext, MarketStats, MarketStatus, PriceAlert, SectorOverview, Security, SecurityFilters,
    SecuritySearch,
};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Weak};
use std::time::Duration;

use super::{Epoch, MarketSection, SessionBound, StoreContext, StoreEvent};
use crate::core::error::{AppError, Result};
use crate::scheduler::{PollSpec, Scheduler};
use crate::services::api::market as api;
use crate::utils::validation;

const STORE: &str = "market";

pub const PRICE_TASK: &str = "market.prices";
pub const STATUS_TASK: &str = "market.status";
pub const TRENDING_TASK: &str = "market.trending";
pub const OVERVIEW_TASK: &str = "market.overview";

pub const PRICE_INTERVAL: Duration = Duration::from_secs(30);
pub const STATUS_INTERVAL: Duration = Duration::from_secs(60);
pub const TRENDING_INTERVAL: Duration = Duration::from_secs(60);
pub const OVERVIEW_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Quotes refreshed per price tick.
pub const MAX_PRICE_SYMBOLS: usize = 10;
const TRENDING_LIMIT: u32 = 10;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarketState {
    pub securities: Vec<Security>,
    pub trending: Vec<Security>,
    pub sectors: Vec<SectorOverview>,
    pub alerts: Vec<PriceAlert>,
    pub stats: Option<MarketStats>,
    pub context: Option<MarketContext>,
    pub status: Option<MarketStatus>,
    pub filters: Option<SecurityFilters>,
    pub search_results: Vec<Security>,
    /// Latest quote per symbol, from price refreshes
    pub quotes: HashMap<String, Security>,
    /// Symbols on screen, in display order
    pub visible_symbols: Vec<String>,
    pub is_loading: bool,
    pub is_searching: bool,
    pub error: Option<String>,
}

impl MarketState {
    pub fn is_open(&self) -> bool {
        self.status.as_ref().is_some_and(|s| s.is_open)
    }

    pub fn quote(&self, symbol: &str) -> Option<&Security> {
        self.quotes.get(&symbol.to_uppercase())
    }
}

pub struct MarketStore {
    ctx: StoreContext,
    state: Arc<RwLock<MarketState>>,
    epoch: Epoch,
    scheduler: Scheduler,
    poll_jitter: Duration,
}

impl MarketStore {
    pub fn new(ctx: StoreContext) -> Self {
        Self {
            ctx,
            state: Arc::new(RwLock::new(MarketState::default())),
            epoch: Epoch::default(),
            scheduler: Scheduler::new(),
            poll_jitter: Duration::ZERO,
        }
    }

    pub fn with_poll_jitter(mut self, jitter: Duration) -> Self {
        self.poll_jitter = jitter;
        self
    }

    pub fn snapshot(&self) -> MarketState {
        self.state.read().clone()
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn clear_error(&self) {
        self.state.write().error = None;
    }

    /// Full refresh of every section.
    #[tracing::instrument(skip(self))]
    pub async fn load(&self) -> Result<()> {
        if self.ctx.session.ready_user_id().is_none() {
            self.clear();
            return Ok(());
        }
        let epoch = self.epoch.current();
        {
            let mut state = self.state.write();
            state.is_loading = true;
            state.error = None;
        }

        let client = &self.ctx.client;
        let (securities, trending, sectors, alerts, stats, context, status) = futures::join!(
            api::get_active_securities(client),
            api::get_trending(client, TRENDING_LIMIT),
            api::get_sector_overview(client),
            api::get_price_alerts(client),
            api::get_market_stats(client),
            api::get_market_context(client),
            api::get_market_status(client),
        );

        if !self.epoch.is_current(epoch) {
            tracing::debug!("Discarding stale market response");
            return Ok(());
        }

        let mut failures = Vec::new();
        self.apply(securities, &mut failures, MarketSection::Securities, |s, v| s.securities = v);
        self.apply(trending, &mut failures, MarketSection::Trending, |s, v| s.trending = v);
        self.apply(sectors, &mut failures, MarketSection::Overview, |s, v| s.sectors = v);
        self.apply(alerts, &mut failures, MarketSection::Overview, |s, v| s.alerts = v);
        self.apply(stats, &mut failures, MarketSection::Overview, |s, v| s.stats = Some(v));
        self.apply(context, &mut failures, MarketSection::Overview, |s, v| s.context = Some(v));
        let status_ok = status.as_ref().ok().map(|s| s.is_open);
        self.apply(status, &mut failures, MarketSection::Status, |s, v| s.status = Some(v));
        if let Some(is_open) = status_ok {
            self.set_market_open(is_open);
        }

        tracing::info!(
            failed_sections = failures.len(),
            securities = self.state.read().securities.len(),
            "Market data refreshed"
        );

        let mut state = self.state.write();
        state.is_loading = false;
        match failures.into_iter().next() {
            Some(e) => {
                // First failure becomes the banner; the other sections stay.
                state.error = Some(e.user_message());
                Err(e)
            }
            None => Ok(()),
        }
    }

    /// Store `result` in its section or record the failure. Previous data
    /// of a failed section is kept.
    fn apply<T>(
        &self,
        result: Result<T>,
        failures: &mut Vec<AppError>,
        section: MarketSection,
        set: impl FnOnce(&mut MarketState, T),
    ) {
        match result {
            Ok(value) => {
                set(&mut *self.state.write(), value);
                self.ctx.events.publish(StoreEvent::MarketUpdated(section));
            }
            Err(e) => {
                self.ctx.failure(STORE, &e);
                failures.push(e);
            }
        }
    }

    pub async fn refresh_trending(&self) -> Result<()> {
        let Some(trending) = self.section(api::get_trending(&self.ctx.client, TRENDING_LIMIT)).await? else {
            return Ok(());
        };
        self.state.write().trending = trending;
        self.ctx.events.publish(StoreEvent::MarketUpdated(MarketSection::Trending));
        Ok(())
    }

    /// Stats, context and alerts. Partial-tolerant like [`Self::load`].
    pub async fn refresh_overview(&self) -> Result<()> {
        let epoch = self.epoch.current();
        let client = &self.ctx.client;
        let (stats, context, alerts) = futures::join!(
            api::get_market_stats(client),
            api::get_market_context(client),
            api::get_price_alerts(client),
        );
        if !self.epoch.is_current(epoch) {
            return Ok(());
        }

        let mut failures = Vec::new();
        self.apply(stats, &mut failures, MarketSection::Overview, |s, v| s.stats = Some(v));
        self.apply(context, &mut failures, MarketSection::Overview, |s, v| s.context = Some(v));
        self.apply(alerts, &mut failures, MarketSection::Overview, |s, v| s.alerts = v);
        failures.into_iter().next().map_or(Ok(()), Err)
    }

    /// Fetch the exchange status and pause or resume price polling to match.
    pub async fn refresh_status(&self) -> Result<bool> {
        let Some(status) = self.section(api::get_market_status(&self.ctx.client)).await? else {
            return Ok(self.state.read().is_open());
        };
        let is_open = status.is_open;
        self.state.write().status = Some(status);
        self.set_market_open(is_open);
        self.ctx.events.publish(StoreEvent::MarketUpdated(MarketSection::Status));
        Ok(is_open)
    }

    /// Refresh quotes for the first [`MAX_PRICE_SYMBOLS`] visible symbols.
    /// Does nothing while the market is closed. Returns the number of quotes
    /// updated; individual failures are logged and skipped.
    #[tracing::instrument(skip(self))]
    pub async fn refresh_prices(&self) -> usize {
        let symbols: Vec<String> = {
            let state = self.state.read();
            if !state.is_open() {
                return 0;
            }
            state.visible_symbols.iter().take(MAX_PRICE_SYMBOLS).cloned().collect()
        };
        if symbols.is_empty() {
            return 0;
        }

        let epoch = self.epoch.current();
        let start = std::time::Instant::now();
        let client = &self.ctx.client;
        let results = join_all(symbols.iter().map(|symbol| api::update_price(client, symbol))).await;
        if !self.epoch.is_current(epoch) {
            return 0;
        }

        let mut updated = 0;
        for (symbol, result) in symbols.iter().zip(results) {
            match result {
                Ok(security) => {
                    self.merge_quote(security);
                    updated += 1;
                }
                Err(e) => tracing::warn!(symbol = %symbol, error = %e, "Price refresh failed"),
            }
        }
        tracing::debug!(
            requested = symbols.len(),
            updated,
            duration_ms = start.elapsed().as_millis(),
            "Prices refreshed"
        );
        if updated > 0 {
            self.ctx.events.publish(StoreEvent::MarketUpdated(MarketSection::Prices));
        }
        updated
    }

    /// Manual quote refresh for one symbol, regardless of market hours.
    /// `None` when the store was cleared before the quote arrived.
    pub async fn update_price(&self, symbol: &str) -> Result<Option<Security>> {
        validation::validate_symbol(symbol).into_result()?;
        let Some(security) = self.section(api::update_price(&self.ctx.client, symbol.trim())).await? else {
            return Ok(None);
        };
        self.merge_quote(security.clone());
        self.ctx.events.publish(StoreEvent::MarketUpdated(MarketSection::Prices));
        Ok(Some(security))
    }

    /// An empty search clears the results without a request.
    pub async fn search(&self, search: &SecuritySearch) -> Result<Vec<Security>> {
        if search.is_empty() {
            self.state.write().search_results.clear();
            return Ok(Vec::new());
        }

        self.state.write().is_searching = true;
        let result = self.section(api::search_securities(&self.ctx.client, search)).await;
        let mut state = self.state.write();
        state.is_searching = false;
        let Some(results) = result? else {
            return Ok(Vec::new());
        };
        state.search_results = results.clone();
        drop(state);
        self.ctx.events.publish(StoreEvent::MarketUpdated(MarketSection::Search));
        Ok(results)
    }

    pub async fn load_filters(&self) -> Result<Option<SecurityFilters>> {
        let Some(filters) = self.section(api::get_filters(&self.ctx.client)).await? else {
            return Ok(None);
        };
        self.state.write().filters = Some(filters.clone());
        Ok(Some(filters))
    }

    /// Replace the on-screen symbol list used by price polling.
    pub fn set_visible_symbols<I, S>(&self, symbols: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut visible: Vec<String> = Vec::new();
        for symbol in symbols {
            let symbol = symbol.as_ref().trim().to_uppercase();
            if !symbol.is_empty() && !visible.contains(&symbol) {
                visible.push(symbol);
            }
        }
        self.state.write().visible_symbols = visible;
    }

    /// Record the exchange state and pause or resume the price task.
    pub fn set_market_open(&self, is_open: bool) {
        {
            let mut state = self.state.write();
            match state.status.as_mut() {
                Some(status) => status.is_open = is_open,
                None => {
                    state.status = Some(MarketStatus {
                        is_open,
                        ..Default::default()
                    })
                }
            }
        }

        let changed = if is_open {
            self.scheduler.is_paused(PRICE_TASK) == Some(true) && self.scheduler.resume(PRICE_TASK)
        } else {
            self.scheduler.is_paused(PRICE_TASK) == Some(false) && self.scheduler.pause(PRICE_TASK)
        };
        if changed {
            tracing::info!(is_open, "Market state changed, price polling toggled");
        }
    }

    /// Spawn the polling tasks. Tasks hold a weak reference and end with the
    /// store. Polling skips work while no user is signed in.
    pub fn start_polling(self: &Arc<Self>) {
        let open = self.state.read().is_open();

        self.poll(PollSpec::new(PRICE_TASK, PRICE_INTERVAL).paused(!open), |store| async move {
            store.refresh_prices().await;
        });
        self.poll(PollSpec::new(STATUS_TASK, STATUS_INTERVAL), |store| async move {
            if let Err(e) = store.refresh_status().await {
                tracing::debug!(error = %e, "Status poll failed");
            }
        });
        self.poll(PollSpec::new(TRENDING_TASK, TRENDING_INTERVAL), |store| async move {
            if let Err(e) = store.refresh_trending().await {
                tracing::debug!(error = %e, "Trending poll failed");
            }
        });
        self.poll(PollSpec::new(OVERVIEW_TASK, OVERVIEW_INTERVAL), |store| async move {
            if let Err(e) = store.refresh_overview().await {
                tracing::debug!(error = %e, "Overview poll failed");
            }
        });
    }

    pub fn stop_polling(&self) {
        self.scheduler.shutdown();
    }

    fn poll<F, Fut>(self: &Arc<Self>, spec: PollSpec, job: F)
    where
        F: Fn(Arc<Self>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let weak: Weak<Self> = Arc::downgrade(self);
        let job = Arc::new(job);
        self.scheduler.spawn(spec.with_jitter(self.poll_jitter), move || {
            let weak = weak.clone();
            let job = job.clone();
            async move {
                let Some(store) = weak.upgrade() else { return };
                if store.ctx.session.ready_user_id().is_none() {
                    return;
                }
                job(store).await;
            }
        });
    }

    /// Run a single-section request, recording a failure as the banner.
    /// `Ok(None)` when the store was cleared while the request was in flight;
    /// that response, failed or not, is dropped.
    async fn section<T>(&self, request: impl Future<Output = Result<T>>) -> Result<Option<T>> {
        let epoch = self.epoch.current();
        let result = request.await;
        if !self.epoch.is_current(epoch) {
            tracing::debug!("Discarding stale market response");
            return Ok(None);
        }

        result.map(Some).map_err(|e| {
            let message = self.ctx.failure(STORE, &e);
            self.state.write().error = Some(message);
            e
        })
    }

    fn merge_quote(&self, security: Security) {
        let mut guard = self.state.write();
        let state = &mut *guard;
        for listed in state
            .securities
            .iter_mut()
            .chain(state.trending.iter_mut())
            .filter(|s| s.symbol.eq_ignore_ascii_case(&security.symbol))
        {
            *listed = security.clone();
        }
        state.quotes.insert(security.symbol.to_uppercase(), security);
    }
}

#[async_trait]
impl SessionBound for MarketStore {
    fn name(&self) -> &'static str {
        STORE
    }

    async fn sync(&self) -> Result<()> {
        self.load().await
    }

    /// Keeps the polling tasks; they idle until the next sign-in.
    fn clear(&self) {
        self.epoch.bump();
        let visible = std::mem::take(&mut self.state.write().visible_symbols);
        *self.state.write() = MarketState {
            visible_symbols: visible,
            ..Default::default()
        };
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

    fn market(transport: &MockTransport, open: bool) {
        transport.on(
            Method::Get,
            "/securities/active",
            MockResponse::json(200, json!([{ "symbol": "AAPL", "price": 190.0 }, { "symbol": "MSFT", "price": 410.0 }])),
        );
        transport.on(Method::Get, "/securities/trending", MockResponse::json(200, json!({ "securities": [{ "symbol": "NVDA" }] })));
        transport.on(Method::Get, "/securities/sector-overview", MockResponse::json(200, json!([{ "sector": "Technology" }])));
        transport.on(Method::Get, "/securities/price-alerts", MockResponse::json(200, json!([])));
        transport.on(Method::Get, "/market-data/stats", MockResponse::json(200, json!({ "advancers": 5 })));
        transport.on(Method::Get, "/market-data/context", MockResponse::json(200, json!({ "sentiment": "bullish" })));
        transport.on(Method::Get, "/market-data/status", MockResponse::json(200, json!({ "is_open": open })));
    }

    fn quote(transport: &MockTransport, symbol: &str, price: f64) {
        transport.on(
            Method::Post,
            &format!("/securities/create-or-update/{}", symbol),
            MockResponse::json(200, json!({ "symbol": symbol, "price": price })),
        );
    }

    #[tokio::test]
    async fn test_load_tolerates_failed_sections() {
        let transport = Arc::new(MockTransport::new());
        market(&transport, true);
        transport.on(Method::Get, "/market-data/context", MockResponse::json(500, json!({ "error": "upstream" })));
        let (ctx, _) = testing::context(transport, Some(7));
        let store = MarketStore::new(ctx);

        assert!(store.load().await.is_err());
        let state = store.snapshot();
        assert_eq!(state.securities.len(), 2);
        assert_eq!(state.trending[0].symbol, "NVDA");
        assert_eq!(state.stats.as_ref().map(|s| s.advancers), Some(5));
        assert!(state.context.is_none());
        assert!(state.is_open());
        assert!(state.error.is_some());
        assert!(!state.is_loading);
    }

    #[tokio::test]
    async fn test_failed_section_keeps_previous_data() {
        let transport = Arc::new(MockTransport::new());
        market(&transport, true);
        let (ctx, _) = testing::context(transport.clone(), Some(7));
        let store = MarketStore::new(ctx);
        store.load().await.unwrap();

        transport.on(Method::Get, "/securities/active", MockResponse::network_error("reset"));
        assert!(store.load().await.is_err());
        assert_eq!(store.snapshot().securities.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_market_makes_no_price_calls() {
        let transport = Arc::new(MockTransport::new());
        market(&transport, false);
        quote(&transport, "AAPL", 191.0);
        let (ctx, _) = testing::context(transport.clone(), Some(7));
        let store = Arc::new(MarketStore::new(ctx));
        store.load().await.unwrap();
        store.set_visible_symbols(["aapl"]);

        store.start_polling();
        assert_eq!(store.scheduler().is_paused(PRICE_TASK), Some(true));
        tokio::time::sleep(Duration::from_secs(90)).await;

        assert_eq!(transport.call_count(Method::Post, "/securities/create-or-update/AAPL"), 0);
        // Status still polled at 60s.
        assert_eq!(transport.call_count(Method::Get, "/market-data/status"), 2);
        store.stop_polling();
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_market_polls_first_ten_visible_symbols() {
        let transport = Arc::new(MockTransport::new());
        market(&transport, true);
        let symbols: Vec<String> = (0..12).map(|i| format!("SYM{}", i)).collect();
        for symbol in &symbols {
            quote(&transport, symbol, 10.0);
        }
        let (ctx, _) = testing::context(transport.clone(), Some(7));
        let store = Arc::new(MarketStore::new(ctx));
        store.load().await.unwrap();
        store.set_visible_symbols(&symbols);

        store.start_polling();
        tokio::time::sleep(Duration::from_secs(65)).await;

        assert_eq!(transport.call_count(Method::Post, "/securities/create-or-update/SYM0"), 2);
        assert_eq!(transport.call_count(Method::Post, "/securities/create-or-update/SYM9"), 2);
        assert_eq!(transport.call_count(Method::Post, "/securities/create-or-update/SYM10"), 0);
        assert_eq!(store.snapshot().quote("sym3").map(|s| s.price), Some(10.0));
        store.stop_polling();
    }

    #[tokio::test(start_paused = true)]
    async fn test_market_close_pauses_price_task() {
        let transport = Arc::new(MockTransport::new());
        market(&transport, true);
        let (ctx, _) = testing::context(transport, Some(7));
        let store = Arc::new(MarketStore::new(ctx));
        store.load().await.unwrap();
        store.start_polling();
        assert_eq!(store.scheduler().is_paused(PRICE_TASK), Some(false));

        store.set_market_open(false);
        assert_eq!(store.scheduler().is_paused(PRICE_TASK), Some(true));
        store.set_market_open(true);
        assert_eq!(store.scheduler().is_paused(PRICE_TASK), Some(false));
        store.stop_polling();
        assert!(store.scheduler().task_names().is_empty());
    }

    #[tokio::test]
    async fn test_manual_update_price_merges_quote() {
        let transport = Arc::new(MockTransport::new());
        market(&transport, false);
        quote(&transport, "AAPL", 195.5);
        let (ctx, _) = testing::context(transport.clone(), Some(7));
        let store = MarketStore::new(ctx);
        store.load().await.unwrap();

        let security = store.update_price("aapl").await.unwrap().unwrap();
        assert_eq!(security.price, 195.5);
        let state = store.snapshot();
        assert_eq!(state.securities[0].price, 195.5);
        assert_eq!(state.quote("AAPL").map(|s| s.price), Some(195.5));
    }

    #[tokio::test]
    async fn test_quote_merges_into_trending_too() {
        let transport = Arc::new(MockTransport::new());
        market(&transport, false);
        quote(&transport, "NVDA", 880.0);
        let (ctx, _) = testing::context(transport, Some(7));
        let store = MarketStore::new(ctx);
        store.load().await.unwrap();

        store.update_price("nvda").await.unwrap();
        assert_eq!(store.snapshot().trending[0].price, 880.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_drops_in_flight_trending() {
        let transport = Arc::new(MockTransport::new());
        market(&transport, true);
        transport.with_delay(Method::Get, "/securities/trending", Duration::from_secs(2));
        let (ctx, _) = testing::context(transport, Some(7));
        let store = Arc::new(MarketStore::new(ctx));

        let refresh = tokio::spawn({
            let store = store.clone();
            async move { store.refresh_trending().await }
        });
        tokio::time::sleep(Duration::from_secs(1)).await;
        store.clear();

        refresh.await.unwrap().unwrap();
        assert!(store.snapshot().trending.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_drops_in_flight_quote_and_status() {
        let transport = Arc::new(MockTransport::new());
        market(&transport, true);
        quote(&transport, "AAPL", 191.0);
        transport.with_delay(Method::Post, "/securities/create-or-update/AAPL", Duration::from_secs(2));
        transport.with_delay(Method::Get, "/market-data/status", Duration::from_secs(2));
        let (ctx, _) = testing::context(transport, Some(7));
        let store = Arc::new(MarketStore::new(ctx));

        let quote = tokio::spawn({
            let store = store.clone();
            async move { store.update_price("AAPL").await }
        });
        let status = tokio::spawn({
            let store = store.clone();
            async move { store.refresh_status().await }
        });
        tokio::time::sleep(Duration::from_secs(1)).await;
        store.clear();

        assert!(quote.await.unwrap().unwrap().is_none());
        assert!(!status.await.unwrap().unwrap());
        let state = store.snapshot();
        assert!(state.quotes.is_empty());
        assert!(state.status.is_none());
    }

    #[tokio::test]
    async fn test_blank_search_sends_nothing() {
        let transport = Arc::new(MockTransport::new());
        let (ctx, _) = testing::context(transport.clone(), Some(7));
        let store = MarketStore::new(ctx);

        let results = store.search(&SecuritySearch::default()).await.unwrap();
        assert!(results.is_empty());
        assert!(transport.calls().is_empty());
    }

    #[test]
    fn test_visible_symbols_normalized() {
        let transport = Arc::new(MockTransport::new());
        let (ctx, _) = testing::context(transport, None);
        let store = MarketStore::new(ctx);
        store.set_visible_symbols(["aapl", " AAPL ", "", "msft"]);
        assert_eq!(store.snapshot().visible_symbols, vec!["AAPL", "MSFT"]);
    }
}
