//! # Logging
//!
//! File-based structured logging for the dashboard client.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use dashboard::debug::{self, DebugConfig};
//!
//! let _guards = debug::init_logger(&DebugConfig::from_env());
//!
//! tracing::info!(
//!     endpoint = "/portfolios/user/7/has-active",
//!     duration_ms = 42,
//!     "API call completed"
//! );
//! ```
//!
//! ## Configuration
//!
//! Environment variables:
//! - `RUST_LOG`: Log level filter (e.g., `dashboard=debug,info`)
//! - `DASHBOARD_LOG_DIR`: Directory of the rotating log (default: `logs`)
//! - `DASHBOARD_LOG_STDOUT`: Mirror logs to stdout (1=on, 0=off)

pub mod config;
pub mod logger;

pub use config::DebugConfig;
pub use logger::init as init_logger;
