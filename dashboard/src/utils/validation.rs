//! Validation utilities for user input
//!
//! Form-level checks that block submission before anything reaches the
//! backend. The backend repeats every check; these exist for fast feedback.

use shared::{CreateOrderRequest, RegisterRequest};

use crate::core::error::AppError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub error: Option<String>,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self {
            is_valid: true,
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            error: Some(message.into()),
        }
    }

    /// Convert into a `Result` so callers can bail out with `?`.
    pub fn into_result(self) -> Result<(), AppError> {
        match self.error {
            Some(message) if !self.is_valid => Err(AppError::Validation(message)),
            _ => Ok(()),
        }
    }

    /// First failure of a sequence of checks, or `ok`.
    pub fn first_failure(results: impl IntoIterator<Item = ValidationResult>) -> Self {
        results
            .into_iter()
            .find(|result| !result.is_valid)
            .unwrap_or_else(Self::ok)
    }
}

/// `local@domain.tld`, trimmed. Only the shape is checked.
pub fn validate_email(email: &str) -> ValidationResult {
    let email = email.trim();
    let Some((local, domain)) = email.split_once('@') else {
        return if email.is_empty() {
            ValidationResult::err("Email is required")
        } else {
            ValidationResult::err("Enter a valid email address")
        };
    };

    let domain_ok = !domain.contains('@')
        && domain
            .split('.')
            .filter(|label| !label.is_empty())
            .count()
            >= 2
        && !domain.starts_with('.')
        && !domain.ends_with('.');

    if local.is_empty() || !domain_ok || email.chars().any(char::is_whitespace) {
        return ValidationResult::err("Enter a valid email address");
    }
    ValidationResult::ok()
}

const USERNAME_LEN: std::ops::RangeInclusive<usize> = 3..=50;

pub fn validate_username(username: &str) -> ValidationResult {
    let username = username.trim();
    let length = username.chars().count();
    if length == 0 {
        ValidationResult::err("Username is required")
    } else if !USERNAME_LEN.contains(&length) {
        ValidationResult::err(format!(
            "Username must be {} to {} characters",
            USERNAME_LEN.start(),
            USERNAME_LEN.end()
        ))
    } else if let Some(bad) = username
        .chars()
        .find(|c| !(c.is_alphanumeric() || matches!(c, '_' | '-' | '.')))
    {
        ValidationResult::err(format!("Username cannot contain '{}'", bad))
    } else {
        ValidationResult::ok()
    }
}

const PASSWORD_MIN_LEN: usize = 8;

/// At least 8 characters with an upper-case letter, a lower-case letter and
/// a digit. Reports every missing class at once.
pub fn validate_password(password: &str) -> ValidationResult {
    if password.is_empty() {
        return ValidationResult::err("Password is required");
    }

    let mut missing = Vec::new();
    if password.chars().count() < PASSWORD_MIN_LEN {
        missing.push("8 or more characters");
    }
    if !password.chars().any(char::is_uppercase) {
        missing.push("an upper-case letter");
    }
    if !password.chars().any(char::is_lowercase) {
        missing.push("a lower-case letter");
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        missing.push("a digit");
    }

    if missing.is_empty() {
        ValidationResult::ok()
    } else {
        ValidationResult::err(format!("Password needs {}", missing.join(", ")))
    }
}

pub fn validate_registration(request: &RegisterRequest) -> ValidationResult {
    ValidationResult::first_failure([
        validate_username(&request.username),
        validate_email(&request.email),
        validate_password(&request.password),
    ])
}

/// Ticker symbols: 1 to 10 characters, letters, digits, `.` or `-`.
pub fn validate_symbol(symbol: &str) -> ValidationResult {
    let symbol = symbol.trim();
    if symbol.is_empty() {
        return ValidationResult::err("Symbol is required");
    }

    if symbol.len() > 10 {
        return ValidationResult::err("Symbol must be at most 10 characters");
    }

    if !symbol.chars().all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-') {
        return ValidationResult::err("Symbol can only contain letters, numbers, . and -");
    }

    ValidationResult::ok()
}

/// Validate an order form. Limit prices are required for `LIMIT` and
/// `STOP_LIMIT`, stop prices for `STOP` and `STOP_LIMIT`.
pub fn validate_order(request: &CreateOrderRequest) -> ValidationResult {
    let symbol = validate_symbol(&request.symbol);
    if !symbol.is_valid {
        return symbol;
    }

    if !request.quantity.is_finite() || request.quantity <= 0.0 {
        return ValidationResult::err("Quantity must be greater than zero");
    }

    if request.order_type.requires_price() {
        match request.price {
            Some(price) if price.is_finite() && price > 0.0 => {}
            Some(_) => return ValidationResult::err("Limit price must be greater than zero"),
            None => return ValidationResult::err("Limit price is required for this order type"),
        }
    }

    if request.order_type.requires_stop_price() {
        match request.stop_price {
            Some(price) if price.is_finite() && price > 0.0 => {}
            Some(_) => return ValidationResult::err("Stop price must be greater than zero"),
            None => return ValidationResult::err("Stop price is required for this order type"),
        }
    }

    ValidationResult::ok()
}

/// Deposit or withdrawal amount
pub fn validate_cash_amount(amount: f64) -> ValidationResult {
    if !amount.is_finite() {
        return ValidationResult::err("Invalid amount");
    }

    if amount <= 0.0 {
        return ValidationResult::err("Amount must be greater than zero");
    }

    ValidationResult::ok()
}

pub fn validate_watchlist_name(name: &str) -> ValidationResult {
    let name = name.trim();
    if name.is_empty() {
        return ValidationResult::err("Watchlist name is required");
    }

    if name.chars().count() > 100 {
        return ValidationResult::err("Watchlist name must be at most 100 characters");
    }

    ValidationResult::ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{OrderSide, OrderType};

    fn order(order_type: OrderType, price: Option<f64>, stop_price: Option<f64>) -> CreateOrderRequest {
        CreateOrderRequest {
            portfolio_id: 1,
            symbol: "AAPL".to_string(),
            side: OrderSide::Buy,
            order_type,
            quantity: 10.0,
            price,
            stop_price,
        }
    }

    #[test]
    fn test_email_shapes() {
        for good in ["jo@example.com", " jo.smith@mail.example.org "] {
            assert!(validate_email(good).is_valid, "{good}");
        }
        for bad in ["", "jo", "@example.com", "jo@", "jo@localhost", "jo@@example.com", "jo @example.com", "jo@.com"] {
            assert!(!validate_email(bad).is_valid, "{bad}");
        }
        assert_eq!(validate_email("  ").error.as_deref(), Some("Email is required"));
    }

    #[test]
    fn test_username_rules() {
        assert!(validate_username("alice").is_valid);
        assert!(validate_username("j.doe-99_x").is_valid);
        assert_eq!(
            validate_username("al").error.as_deref(),
            Some("Username must be 3 to 50 characters")
        );
        assert_eq!(
            validate_username("al ice").error.as_deref(),
            Some("Username cannot contain ' '")
        );
        assert!(!validate_username(&"a".repeat(51)).is_valid);
    }

    #[test]
    fn test_password_lists_every_missing_class() {
        assert!(validate_password("Secret123").is_valid);
        assert_eq!(
            validate_password("abc").error.as_deref(),
            Some("Password needs 8 or more characters, an upper-case letter, a digit")
        );
        assert!(!validate_password("SECRET123").is_valid);
        assert!(!validate_password("Secretttt").is_valid);
    }

    #[test]
    fn test_registration_reports_first_bad_field() {
        let request = RegisterRequest {
            username: "alice".to_string(),
            email: "not-an-email".to_string(),
            password: "weak".to_string(),
            first_name: None,
            last_name: None,
        };
        assert_eq!(
            validate_registration(&request).error.as_deref(),
            Some("Enter a valid email address")
        );
    }

    #[test]
    fn test_order_price_requirements() {
        assert!(validate_order(&order(OrderType::Market, None, None)).is_valid);
        assert!(!validate_order(&order(OrderType::Limit, None, None)).is_valid);
        assert!(validate_order(&order(OrderType::Limit, Some(150.0), None)).is_valid);
        assert!(!validate_order(&order(OrderType::Stop, Some(150.0), None)).is_valid);
        assert!(validate_order(&order(OrderType::Stop, None, Some(140.0))).is_valid);
        assert!(!validate_order(&order(OrderType::StopLimit, None, Some(140.0))).is_valid);
        assert!(validate_order(&order(OrderType::StopLimit, Some(150.0), Some(140.0))).is_valid);
    }

    #[test]
    fn test_order_quantity_and_symbol() {
        let mut request = order(OrderType::Market, None, None);
        request.quantity = 0.0;
        assert_eq!(
            validate_order(&request).error.as_deref(),
            Some("Quantity must be greater than zero")
        );

        let mut request = order(OrderType::Market, None, None);
        request.symbol = "  ".to_string();
        assert!(!validate_order(&request).is_valid);
    }

    #[test]
    fn test_into_result() {
        assert!(validate_cash_amount(100.0).into_result().is_ok());
        assert!(matches!(
            validate_cash_amount(-5.0).into_result(),
            Err(AppError::Validation(_))
        ));
        assert!(!validate_watchlist_name("   ").is_valid);
    }
}
