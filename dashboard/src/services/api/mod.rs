//! # Backend API
//!
//! HTTP client plus one module of free functions per backend domain.
//!
//! ## Modules
//!
//! - **[`client`]**: [`ApiClient`], bearer auth and error normalization
//! - **[`envelope`]**: unwrapping of `{"order": ...}` / `{"data": ...}` shapes
//! - **[`auth`]**, **[`account`]**: session lifecycle and account reads
//! - **[`portfolio`]**: portfolios, cash operations and positions
//! - **[`orders`]**: orders and transactions
//! - **[`market`]**: securities and market-data
//! - **[`watchlist`]**, **[`news`]**, **[`education`]**
//!
//! Every function returns [`crate::core::error::Result`]. Reads for which a
//! `404` means "not created yet" resolve to `None` or an empty `Vec`.

pub mod account;
pub mod auth;
pub mod client;
pub mod education;
pub mod envelope;
pub mod market;
pub mod news;
pub mod orders;
pub mod portfolio;
pub mod watchlist;

pub use client::{ApiBase, ApiBody, ApiClient, ReqwestTransport};
