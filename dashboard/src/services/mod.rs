//! # Services
//!
//! I/O boundary of the client.
//!
//! - **[`api`]**: REST client and domain services
//! - **[`storage`]**: persisted key/value state and the TTL cache
//! - **[`mock`]**: scripted in-memory transport

pub mod api;
pub mod mock;
pub mod storage;

pub use api::ApiClient;
pub use storage::{FileStore, MemoryStore, TtlCache};
