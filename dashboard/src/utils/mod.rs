//! # Utility Functions
//!
//! ## Modules
//!
//! - **[`validation`]**: form validation run before any network call
//!
//! ## Related Modules
//!
//! - [`shared::utils`]: currency and percentage formatting
//! - [`crate::core`]: Core abstractions and error types

pub mod validation;

pub use validation::ValidationResult;
