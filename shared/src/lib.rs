//! # Shared Data Transfer Objects Library
//!
//! This library defines the contract between the dashboard client and the
//! simulation backend. All DTOs use JSON serialization via `serde`.
//!
//! ## Structure
//!
//! - **[`dto`]**: Data Transfer Objects for API communication
//!   - **[`dto::auth`]**: Authentication and account DTOs
//!   - **[`dto::portfolio`]**: Portfolio and position DTOs
//!   - **[`dto::order`]**: Order and transaction DTOs
//!   - **[`dto::watchlist`]**: Watchlist DTOs
//!   - **[`dto::market`]**: Securities and market-data DTOs
//!   - **[`dto::news`]**: News DTOs
//!   - **[`dto::education`]**: Educational content DTOs
//! - **[`utils`]**: Display formatting helpers
//!
//! ## Usage
//!
//! ```rust
//! use shared::dto::order::{CreateOrderRequest, OrderSide, OrderType};
//! use shared::utils::format_currency;
//!
//! let request = CreateOrderRequest {
//!     portfolio_id: 12,
//!     symbol: "AAPL".to_string(),
//!     side: OrderSide::Buy,
//!     order_type: OrderType::Market,
//!     quantity: 10.0,
//!     price: None,
//!     stop_price: None,
//! };
//! let body = serde_json::to_string(&request).unwrap();
//! assert!(body.contains("\"side\":\"BUY\""));
//! assert_eq!(format_currency(1234.5), "$1,234.50");
//! ```

pub mod dto;
pub mod utils;

// Re-export commonly used types for convenience
// Note: Wildcard re-exports are used here since shared is a DTO library
// where all exports are meant to be public API
pub use dto::*;
pub use utils::*;
