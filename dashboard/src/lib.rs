//! # Investment Dashboard - Client Data Layer
//!
//! Client-side data synchronization for an investment-simulation dashboard.
//! This library crate contains all modules used by the binary crate (`main.rs`).
//!
//! ## Features
//!
//! - **REST client**: bearer-token auth, response-shape normalization,
//!   structured error classification
//! - **Session**: login, registration, silent restore and logout with
//!   persisted token and user
//! - **Resource stores**: portfolio, orders and transactions, watchlists,
//!   market data and educational content, each with loading/error state
//! - **Polling**: named background tasks with pause/resume and jitter
//! - **Persistence**: pluggable key/value storage with a TTL cache
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │              dashboard (this crate)                    │
//! ├────────────────────────────────────────────────────────┤
//! │  app        - Dashboard orchestrator                   │
//! │  store      - Resource stores + EventBus               │
//! │  session    - Auth state machine (watch channel)       │
//! │  scheduler  - Poll tasks (CancellationToken)           │
//! │  services   - ApiClient, domain endpoints, storage     │
//! └────────────────────────────────────────────────────────┘
//!          │                              │
//!          │ HTTP /api/v1                 │ HTTP /api/market-data
//!          ▼                              ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │                    Backend API                          │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Dependency Graph
//!
//! ```text
//! main.rs
//!   │
//!   └── app::Dashboard
//!       ├── session (SessionStore)
//!       │   └── services::api (auth, account)
//!       ├── store::* (portfolio, orders, watchlist, market, education)
//!       │   ├── services::api::* (domain endpoints)
//!       │   ├── services::storage (TtlCache)
//!       │   └── scheduler (market polling)
//!       └── core (AppError, Transport, KeyValueStore, Clock)
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use dashboard::{ClientConfig, Dashboard, MemoryStore};
//!
//! # async fn demo() -> dashboard::Result<()> {
//! let config = ClientConfig::from_env().map_err(dashboard::AppError::Validation)?;
//! let dashboard = Dashboard::new(&config, Arc::new(MemoryStore::new()));
//!
//! if dashboard.start().await.is_none() {
//!     dashboard.session.login("alice", "Secret123").await?;
//! }
//! println!("{:?}", dashboard.portfolio.snapshot().summary);
//! dashboard.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod app;
pub mod config;
pub mod core;
pub mod debug;
pub mod scheduler;
pub mod services;
pub mod session;
pub mod store;
pub mod utils;

pub use app::Dashboard;
pub use config::ClientConfig;
pub use core::{AppError, Result};
pub use services::{ApiClient, FileStore, MemoryStore};
pub use session::{SessionState, SessionStore};
pub use store::{EventBus, StoreEvent};
