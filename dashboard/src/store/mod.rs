//! # Resource Stores
//!
//! Stateful units that own fetch/mutate logic and UI-facing state for one
//! domain area each. They all follow one state machine:
//!
//! ```text
//!   idle ──fetch──► loading ──► success | error      (re-entered on every fetch)
//! ```
//!
//! - **Gate**: nothing is fetched until the session is resolved and
//!   authenticated; `sync()` on an anonymous session clears the store.
//! - **Actions**: set a scoped flag, call the service, re-fetch the affected
//!   collections on success, store a banner message on failure and return
//!   the error.
//! - **No flicker**: data is replaced only by fetched data. It is emptied
//!   only by [`SessionBound::clear`].
//! - **Stale responses**: each store carries an [`Epoch`]. `clear()` bumps
//!   it, and a response that started under an older epoch is dropped.
//!
//! State changes are announced as [`StoreEvent`]s on an [`EventBus`] so a UI
//! can re-render.

pub mod education;
pub mod market;
pub mod orders;
pub mod portfolio;
pub mod watchlist;

use async_channel::{Receiver, Sender, TrySendError};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::core::error::{AppError, Result};
use crate::services::api::ApiClient;
use crate::session::{SessionState, SessionStore};

pub use education::{EducationState, EducationStore};
pub use market::{MarketState, MarketStore};
pub use orders::{OrderDraft, OrdersState, OrdersStore};
pub use portfolio::{PortfolioState, PortfolioStore};
pub use watchlist::{WatchlistState, WatchlistStore};

const EVENT_CAPACITY: usize = 256;

/// Market sections refreshed independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketSection {
    Securities,
    Prices,
    Trending,
    Overview,
    Status,
    Search,
}

/// State-change notifications for the UI layer.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    PortfolioUpdated,
    OrdersUpdated,
    WatchlistsUpdated { from_cache: bool },
    MarketUpdated(MarketSection),
    EducationUpdated,
    /// A store dropped its data (logout)
    Cleared(&'static str),
    Failed { store: &'static str, message: String },
}

/// Bounded fan-in channel of [`StoreEvent`]s.
///
/// Every store publishes into the same bus. Events are dropped (and logged)
/// when the bus is full, so a UI that stops draining never blocks a store.
#[derive(Clone)]
pub struct EventBus {
    tx: Sender<StoreEvent>,
    rx: Receiver<StoreEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, rx) = async_channel::bounded(EVENT_CAPACITY);
        Self { tx, rx }
    }

    pub fn publish(&self, event: StoreEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                tracing::trace!(event = ?event, "Event bus full, dropping event");
            }
            Err(TrySendError::Closed(_)) => {}
        }
    }

    /// Receiver end. Receivers compete: each event is delivered once.
    pub fn receiver(&self) -> Receiver<StoreEvent> {
        self.rx.clone()
    }

    pub fn pending(&self) -> usize {
        self.tx.len()
    }
}

/// Monotonic generation counter used to discard stale responses.
#[derive(Debug, Default)]
pub struct Epoch(AtomicU64);

impl Epoch {
    pub fn current(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }

    /// Invalidate every in-flight request.
    pub fn bump(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn is_current(&self, epoch: u64) -> bool {
        self.current() == epoch
    }
}

/// Dependencies shared by every store.
#[derive(Clone)]
pub struct StoreContext {
    pub client: Arc<ApiClient>,
    pub session: Arc<SessionStore>,
    pub events: EventBus,
}

impl StoreContext {
    pub fn new(session: Arc<SessionStore>, events: EventBus) -> Self {
        Self {
            client: session.client().clone(),
            session,
            events,
        }
    }

    /// Convert a failed call into the banner message. A `401` also ends the
    /// session.
    pub(crate) fn failure(&self, store: &'static str, error: &AppError) -> String {
        let message = error.user_message();
        tracing::warn!(store, error = %error, "Store request failed");
        self.session.handle_auth_error(error);
        self.events.publish(StoreEvent::Failed {
            store,
            message: message.clone(),
        });
        message
    }

    pub(crate) fn require_user(&self) -> Result<i64> {
        self.session.ready_user_id().ok_or(AppError::Unauthenticated)
    }
}

/// A store whose data belongs to the signed-in user.
#[async_trait]
pub trait SessionBound: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    /// Fetch when the session is ready, clear otherwise.
    async fn sync(&self) -> Result<()>;

    /// Drop all data and errors and invalidate in-flight requests.
    fn clear(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Gate {
    Pending,
    Anonymous,
    User(i64),
}

fn gate(state: &SessionState) -> Gate {
    if state.is_loading {
        return Gate::Pending;
    }
    match state.user() {
        Some(user) => Gate::User(user.user_id),
        None => Gate::Anonymous,
    }
}

/// Keep `store` in step with the session: a new user triggers `sync()`,
/// logout triggers `clear()`. In-flight logins (`Pending`) change nothing.
pub fn bind_session<S: SessionBound>(
    store: Arc<S>,
    session: &SessionStore,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    let mut rx = session.subscribe();

    tokio::spawn(async move {
        let mut last = Gate::Pending;
        loop {
            let current = gate(&rx.borrow_and_update());
            if current != last && current != Gate::Pending {
                match current {
                    Gate::User(user_id) => {
                        tracing::debug!(store = store.name(), user_id, "Session ready, syncing");
                        if let Err(e) = store.sync().await {
                            tracing::debug!(store = store.name(), error = %e, "Initial sync failed");
                        }
                    }
                    Gate::Anonymous => store.clear(),
                    Gate::Pending => {}
                }
                last = current;
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                changed = rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
    })
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::services::mock::MockTransport;
    use crate::services::storage::MemoryStore;

    /// Context over a mock transport and memory storage. The session is
    /// already resolved to user 7 when `user_id` is given.
    pub(crate) fn context(transport: Arc<MockTransport>, user_id: Option<i64>) -> (StoreContext, Arc<MemoryStore>) {
        let storage = Arc::new(MemoryStore::new());
        let client = Arc::new(ApiClient::with_transport(
            transport,
            storage.clone(),
            "http://api/v1",
            "http://api",
        ));
        let session = Arc::new(SessionStore::new(client));
        match user_id {
            Some(user_id) => session.dispatch(crate::session::SessionAction::LoginSuccess {
                user: shared::User {
                    user_id,
                    username: "alice".to_string(),
                    email: "alice@example.com".to_string(),
                    first_name: None,
                    last_name: None,
                    created_at: None,
                },
                token: "tok-1".to_string(),
            }),
            None => session.dispatch(crate::session::SessionAction::Logout),
        }
        (StoreContext::new(session, EventBus::new()), storage)
    }
}
