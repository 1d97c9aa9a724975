//! # Data Transfer Objects (DTOs)
//!
//! This module contains all data structures exchanged with the simulation
//! backend over its REST API.
//!
//! ## Module Organization
//!
//! - [`auth`] - Login, registration, session validation and account DTOs
//! - [`portfolio`] - Portfolios, summaries, cash operations and positions
//! - [`order`] - Orders, order validation and transactions
//! - [`watchlist`] - Watchlists and watchlist statistics
//! - [`market`] - Securities, sector overview, alerts and market status
//! - [`news`] - News articles and categories
//! - [`education`] - Educational content and its filter predicate
//!
//! ## Serialization Format
//!
//! - **Field naming**: snake_case (default serde behavior)
//! - **Optional fields**: Omitted when `None` using `#[serde(skip_serializing_if = "Option::is_none")]`
//! - **Enums**: Serialize to SCREAMING_SNAKE_CASE (`"PARTIALLY_FILLED"`, `"STOP_LIMIT"`)
//! - **Missing numbers**: Default to zero so partial payloads still deserialize
//!
//! ## Example JSON Communication
//!
//! ```text
//! POST /api/v1/orders
//! Content-Type: application/json
//! Authorization: Bearer eyJhbGciOi...
//!
//! {
//!   "portfolio_id": 12,
//!   "symbol": "AAPL",
//!   "side": "BUY",
//!   "order_type": "MARKET",
//!   "quantity": 10
//! }
//! ```

pub mod auth;
pub mod education;
pub mod market;
pub mod news;
pub mod order;
pub mod portfolio;
pub mod watchlist;

pub use auth::*;
pub use education::*;
pub use market::*;
pub use news::*;
pub use order::*;
pub use portfolio::*;
pub use watchlist::*;
