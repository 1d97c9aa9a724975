//! # Dashboard Orchestrator
//!
//! [`Dashboard`] owns one instance of every store and keeps them in step with
//! the session:
//!
//! ```text
//!   SessionStore ──watch──► bind_session ──► sync() / clear()
//!        │                                      │
//!        │                    PortfolioStore, OrdersStore, WatchlistStore,
//!        │                    MarketStore, EducationStore
//!        │                                      │
//!        └──────────────── EventBus ◄───────────┘ (StoreEvent)
//! ```
//!
//! Market polling starts with [`Dashboard::start`] and ends with
//! [`Dashboard::shutdown`].

use parking_lot::Mutex;
use shared::User;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::ClientConfig;
use crate::core::service::{KeyValueStore, SystemClock};
use crate::services::api::ApiClient;
use crate::session::SessionStore;
use crate::store::{
    bind_session, EducationStore, EventBus, MarketStore, OrdersStore, PortfolioStore, StoreContext,
    WatchlistStore,
};

pub struct Dashboard {
    pub session: Arc<SessionStore>,
    pub events: EventBus,
    pub portfolio: Arc<PortfolioStore>,
    pub orders: Arc<OrdersStore>,
    pub watchlists: Arc<WatchlistStore>,
    pub market: Arc<MarketStore>,
    pub education: Arc<EducationStore>,
    cancel: CancellationToken,
    bindings: Mutex<Vec<JoinHandle<()>>>,
}

impl Dashboard {
    /// Build a reqwest-backed dashboard over `storage`.
    pub fn new(config: &ClientConfig, storage: Arc<dyn KeyValueStore>) -> Self {
        let client = Arc::new(ApiClient::new(config, storage));
        Self::with_client(client, config)
    }

    pub fn with_client(client: Arc<ApiClient>, config: &ClientConfig) -> Self {
        let session = Arc::new(SessionStore::new(client));
        let events = EventBus::new();
        let ctx = StoreContext::new(session.clone(), events.clone());

        Self {
            portfolio: Arc::new(PortfolioStore::new(ctx.clone())),
            orders: Arc::new(OrdersStore::new(ctx.clone())),
            watchlists: Arc::new(WatchlistStore::new(ctx.clone(), Arc::new(SystemClock))),
            market: Arc::new(MarketStore::new(ctx.clone()).with_poll_jitter(config.poll_jitter)),
            education: Arc::new(EducationStore::new(ctx)),
            session,
            events,
            cancel: CancellationToken::new(),
            bindings: Mutex::new(Vec::new()),
        }
    }

    /// Bind every store to the session, restore a persisted login and start
    /// market polling. Returns the restored user.
    ///
    /// Stores are bound before the restore so the first resolved session
    /// triggers exactly one sync per store.
    pub async fn start(&self) -> Option<User> {
        {
            let mut bindings = self.bindings.lock();
            bindings.push(bind_session(self.portfolio.clone(), &self.session, self.cancel.clone()));
            bindings.push(bind_session(self.orders.clone(), &self.session, self.cancel.clone()));
            bindings.push(bind_session(self.watchlists.clone(), &self.session, self.cancel.clone()));
            bindings.push(bind_session(self.market.clone(), &self.session, self.cancel.clone()));
            bindings.push(bind_session(self.education.clone(), &self.session, self.cancel.clone()));
        }

        let user = self.session.restore().await;
        self.market.start_polling();

        tracing::info!(
            restored = user.is_some(),
            stores = self.bindings.lock().len(),
            "Dashboard started"
        );
        user
    }

    /// Stop polling and session bindings, then wait for the binding tasks.
    pub async fn shutdown(&self) {
        self.market.stop_polling();
        self.cancel.cancel();

        let handles: Vec<JoinHandle<()>> = std::mem::take(&mut *self.bindings.lock());
        for handle in handles {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "Session binding task ended abnormally");
            }
        }
        tracing::info!("Dashboard stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::service::Method;
    use crate::services::mock::{MockResponse, MockTransport};
    use crate::services::storage::{MemoryStore, TOKEN_KEY, USER_KEY};
    use crate::store::StoreEvent;
    use serde_json::json;

    #[tokio::test]
    async fn test_start_restores_session_and_syncs_stores() {
        let transport = Arc::new(MockTransport::new());
        let user = json!({ "user_id": 7, "username": "alice", "email": "alice@example.com" });
        transport.on(Method::Get, "/auth/validate", MockResponse::json(200, json!({ "valid": true, "user": user })));
        transport.on(Method::Get, "/portfolios/user/7/has-active", MockResponse::json(200, json!(false)));
        transport.on(Method::Get, "/watchlists", MockResponse::json(200, json!([])));
        transport.on(Method::Get, "/educational-content", MockResponse::json(200, json!([])));
        transport.on(Method::Get, "/market-data/status", MockResponse::json(200, json!({ "is_open": false })));

        let storage = Arc::new(MemoryStore::new());
        storage.set(TOKEN_KEY, "tok-1").unwrap();
        storage.set(USER_KEY, &user.to_string()).unwrap();
        let client = Arc::new(ApiClient::with_transport(
            transport.clone(),
            storage,
            "http://api/v1",
            "http://api",
        ));
        let dashboard = Dashboard::with_client(client, &ClientConfig::default());

        let restored = dashboard.start().await;
        assert_eq!(restored.map(|u| u.user_id), Some(7));

        let rx = dashboard.events.receiver();
        let mut watchlists_synced = false;
        while !watchlists_synced {
            watchlists_synced = matches!(
                rx.recv().await.unwrap(),
                StoreEvent::WatchlistsUpdated { from_cache: false }
            );
        }
        assert!(dashboard.session.is_authenticated());
        assert!(!dashboard.portfolio.snapshot().has_portfolio);
        assert_eq!(transport.call_count(Method::Get, "/auth/validate"), 1);

        dashboard.shutdown().await;
        assert!(dashboard.market.scheduler().task_names().is_empty());
    }
}
