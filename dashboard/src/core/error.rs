//! # Common Error Types
//!
//! Consolidated error handling for the dashboard client.
//!
//! Every domain service returns [`Result<T>`]; stores are the final catch
//! boundary and turn an [`AppError`] into the string shown in an error banner
//! via [`AppError::user_message`].
//!
//! ## Error Categories
//!
//! - **Network**: transport failure, the request never produced a response
//! - **Http**: non-2xx response, with the best-effort message from the body
//! - **Parse**: a 2xx response whose body did not match the expected shape
//! - **Validation**: client-side form validation, never reaches the network
//! - **Storage**: persisted client state could not be read or written
//! - **State**: invalid state transition inside a store
//! - **Unauthenticated**: an action required a session that is not there
//!
//! ## Usage Pattern
//!
//! ```rust
//! use dashboard::core::error::AppError;
//!
//! fn validate_quantity(quantity: f64) -> Result<f64, AppError> {
//!     if quantity <= 0.0 {
//!         return Err(AppError::Validation("Quantity must be positive".to_string()));
//!     }
//!     Ok(quantity)
//! }
//! ```

use thiserror::Error;

/// Application-wide error type for the dashboard client.
///
/// # Example
///
/// ```rust
/// use dashboard::core::error::AppError;
///
/// let err = AppError::Http {
///     status: 400,
///     message: "Insufficient funds".to_string(),
///     body: None,
/// };
/// assert_eq!(err.to_string(), "HTTP 400: Insufficient funds");
/// assert_eq!(err.user_message(), "Insufficient funds");
/// ```
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AppError {
    /// Transport failure (connection refused, DNS, timeout).
    #[error("Network error: {0}")]
    Network(String),

    /// Non-2xx response. `body` keeps the raw payload for upstream inspection.
    #[error("HTTP {status}: {message}")]
    Http {
        status: u16,
        message: String,
        body: Option<serde_json::Value>,
    },

    /// Response body did not match the expected shape.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Client-side validation failure.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Persisted client state could not be read or written.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Invalid store state (missing portfolio, unknown watchlist, ...).
    #[error("State error: {0}")]
    State(String),

    /// The action requires an authenticated session.
    #[error("Not authenticated")]
    Unauthenticated,
}

/// Convenience type alias for `Result<T, AppError>`.
pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    /// HTTP status code, when the error came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            AppError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self.status(), Some(401) | Some(403)) || matches!(self, AppError::Unauthenticated)
    }

    /// Human-readable message for an error banner.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Network(_) => {
                "Unable to reach the server. Check your connection and retry.".to_string()
            }
            AppError::Http { message, .. } => message.clone(),
            AppError::Parse(_) => "The server returned an unexpected response.".to_string(),
            AppError::Validation(msg) | AppError::Storage(msg) | AppError::State(msg) => {
                msg.clone()
            }
            AppError::Unauthenticated => "Please log in to continue.".to_string(),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Parse(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}
