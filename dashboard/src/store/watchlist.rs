//! # Watchlist Store
//!
//! Stale-while-revalidate over a 5 minute per-user cache: a fresh cache entry
//! is shown immediately, then the network call is always issued and its
//! result rewrites the cache. Every mutation drops the cache entry and
//! reloads from the network.

use async_trait::async_trait;
use parking_lot::RwLock;
use shared::{CreateWatchlistRequest, UpdateWatchlistRequest, Watchlist, WatchlistStats};
use std::sync::Arc;
use std::time::Duration;

use super::{Epoch, SessionBound, StoreContext, StoreEvent};
use crate::core::error::Result;
use crate::core::service::Clock;
use crate::services::api::watchlist as api;
use crate::services::storage::{watchlist_cache_key, TtlCache};
use crate::utils::validation;

const STORE: &str = "watchlist";

pub const WATCHLIST_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WatchlistState {
    pub watchlists: Vec<Watchlist>,
    pub stats: WatchlistStats,
    /// Displayed data came from the cache and is being revalidated
    pub from_cache: bool,
    pub is_loading: bool,
    pub is_submitting: bool,
    pub error: Option<String>,
}

pub struct WatchlistStore {
    ctx: StoreContext,
    cache: TtlCache,
    state: Arc<RwLock<WatchlistState>>,
    epoch: Epoch,
}

impl WatchlistStore {
    pub fn new(ctx: StoreContext, clock: Arc<dyn Clock>) -> Self {
        let cache = TtlCache::new(ctx.client.storage().clone(), clock, WATCHLIST_CACHE_TTL);
        Self {
            ctx,
            cache,
            state: Arc::new(RwLock::new(WatchlistState::default())),
            epoch: Epoch::default(),
        }
    }

    pub fn snapshot(&self) -> WatchlistState {
        self.state.read().clone()
    }

    pub fn clear_error(&self) {
        self.state.write().error = None;
    }

    pub fn find(&self, watchlist_id: i64) -> Option<Watchlist> {
        self.state
            .read()
            .watchlists
            .iter()
            .find(|w| w.watchlist_id == watchlist_id)
            .cloned()
    }

    #[tracing::instrument(skip(self))]
    pub async fn load(&self) -> Result<()> {
        let Some(user_id) = self.ctx.session.ready_user_id() else {
            self.clear();
            return Ok(());
        };
        let key = watchlist_cache_key(user_id);
        let epoch = self.epoch.current();

        if let Some(cached) = self.cache.get::<Vec<Watchlist>>(&key) {
            self.replace(cached, true);
            self.ctx.events.publish(StoreEvent::WatchlistsUpdated { from_cache: true });
        }

        {
            let mut state = self.state.write();
            state.is_loading = true;
            state.error = None;
        }

        let result = api::get_watchlists(&self.ctx.client).await;
        if !self.epoch.is_current(epoch) {
            tracing::debug!("Discarding stale watchlist response");
            return Ok(());
        }

        match result {
            Ok(watchlists) => {
                if let Err(e) = self.cache.put(&key, &watchlists) {
                    tracing::warn!(error = %e, "Failed to cache watchlists");
                }
                self.replace(watchlists, false);
                self.state.write().is_loading = false;
                self.ctx.events.publish(StoreEvent::WatchlistsUpdated { from_cache: false });
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

    /// Fetch aggregate counts. A user without watchlists gets all-zero stats
    /// and no error.
    pub async fn load_stats(&self) -> Result<WatchlistStats> {
        self.ctx.require_user()?;
        let epoch = self.epoch.current();
        let result = api::get_watchlist_stats(&self.ctx.client).await;
        if !self.epoch.is_current(epoch) {
            // Cleared meanwhile: hand the result back, keep the store empty.
            return result;
        }
        match result {
            Ok(stats) => {
                self.state.write().stats = stats;
                Ok(stats)
            }
            Err(e) => {
                let message = self.ctx.failure(STORE, &e);
                self.state.write().error = Some(message);
                Err(e)
            }
        }
    }

    pub async fn create_watchlist(&self, name: &str, description: Option<String>) -> Result<Watchlist> {
        self.validated(validation::validate_watchlist_name(name))?;
        let request = CreateWatchlistRequest {
            name: name.trim().to_string(),
            description,
        };
        self.mutate(api::create_watchlist(&self.ctx.client, &request)).await
    }

    pub async fn update_watchlist(&self, watchlist_id: i64, request: UpdateWatchlistRequest) -> Result<Watchlist> {
        if let Some(name) = &request.name {
            self.validated(validation::validate_watchlist_name(name))?;
        }
        self.mutate(api::update_watchlist(&self.ctx.client, watchlist_id, &request))
            .await
    }

    pub async fn delete_watchlist(&self, watchlist_id: i64) -> Result<()> {
        self.mutate(api::delete_watchlist(&self.ctx.client, watchlist_id)).await
    }

    pub async fn add_security(&self, watchlist_id: i64, symbol: &str) -> Result<Watchlist> {
        self.validated(validation::validate_symbol(symbol))?;
        self.mutate(api::add_security(&self.ctx.client, watchlist_id, symbol.trim()))
            .await
    }

    pub async fn remove_security(&self, watchlist_id: i64, symbol: &str) -> Result<Watchlist> {
        self.mutate(api::remove_security(&self.ctx.client, watchlist_id, symbol.trim()))
            .await
    }

    pub async fn clear_securities(&self, watchlist_id: i64) -> Result<Watchlist> {
        self.mutate(api::clear_securities(&self.ctx.client, watchlist_id)).await
    }

    /// Drop the cache entry, run the mutation, then reload the list.
    async fn mutate<T>(&self, action: impl std::future::Future<Output = Result<T>>) -> Result<T> {
        let user_id = self.ctx.require_user()?;
        self.cache.invalidate(&watchlist_cache_key(user_id));
        {
            let mut state = self.state.write();
            state.is_submitting = true;
            state.error = None;
        }

        let result = action.await;
        self.state.write().is_submitting = false;

        match result {
            Ok(value) => {
                if let Err(e) = self.load().await {
                    tracing::debug!(error = %e, "Reload after watchlist mutation failed");
                }
                Ok(value)
            }
            Err(e) => {
                let message = self.ctx.failure(STORE, &e);
                self.state.write().error = Some(message);
                Err(e)
            }
        }
    }

    fn replace(&self, watchlists: Vec<Watchlist>, from_cache: bool) {
        let mut state = self.state.write();
        state.stats = WatchlistStats::from_watchlists(&watchlists);
        state.watchlists = watchlists;
        state.from_cache = from_cache;
    }

    fn validated(&self, check: validation::ValidationResult) -> Result<()> {
        check.into_result().map_err(|e| {
            self.state.write().error = Some(e.user_message());
            e
        })
    }
}

#[async_trait]
impl SessionBound for WatchlistStore {
    fn name(&self) -> &'static str {
        STORE
    }

    async fn sync(&self) -> Result<()> {
        self.load().await
    }

    fn clear(&self) {
        self.epoch.bump();
        *self.state.write() = WatchlistState::default();
        self.ctx.events.publish(StoreEvent::Cleared(STORE));
    }
}
