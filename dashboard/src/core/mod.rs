//! # Core Abstractions
//!
//! Core traits and error types for dependency injection and better testability.
//!
//! ## Modules
//!
//! - **[`error`]**: Application error types (`AppError`, `Result<T>`)
//! - **[`service`]**: Injection seams (`Transport`, `KeyValueStore`, `Clock`)
//!
//! ## Dependency Injection
//!
//! Nothing in the client reaches for global state. The HTTP transport, the
//! persisted storage and the clock are passed in at construction:
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use dashboard::core::service::{KeyValueStore, SystemClock};
//! use dashboard::services::mock::MockTransport;
//! use dashboard::services::storage::MemoryStore;
//! use dashboard::services::api::ApiClient;
//!
//! let storage: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
//! let transport = Arc::new(MockTransport::new());
//! let client = ApiClient::with_transport(
//!     transport,
//!     storage,
//!     "http://localhost:8080/api/v1",
//!     "http://localhost:8080/api",
//! );
//! ```

pub mod error;
pub mod service;

pub use error::{AppError, Result};
pub use service::{Clock, HttpRequest, HttpResponse, KeyValueStore, Method, SystemClock, Transport};
