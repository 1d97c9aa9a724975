//! Order and transaction DTOs.
//!
//! Order status transitions are entirely server-driven; the client only asks
//! for create/cancel/execute and re-fetches to observe the new status.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    Market,
    Limit,
    Stop,
    StopLimit,
}

impl OrderType {
    /// Whether a limit price must accompany this order type.
    pub fn requires_price(&self) -> bool {
        matches!(self, OrderType::Limit | OrderType::StopLimit)
    }

    /// Whether a stop trigger price must accompany this order type.
    pub fn requires_stop_price(&self) -> bool {
        matches!(self, OrderType::Stop | OrderType::StopLimit)
    }
}

/// Closed set of order states reported by the backend.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Filled,
    PartiallyFilled,
    Cancelled,
    Failed,
    Rejected,
    Expired,
}

impl OrderStatus {
    /// Orders in these states can still be cancelled or executed.
    pub fn is_open(&self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::PartiallyFilled)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_open()
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Filled => "FILLED",
            OrderStatus::PartiallyFilled => "PARTIALLY_FILLED",
            OrderStatus::Cancelled => "CANCELLED",
            OrderStatus::Failed => "FAILED",
            OrderStatus::Rejected => "REJECTED",
            OrderStatus::Expired => "EXPIRED",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    pub order_id: i64,
    pub portfolio_id: i64,
    pub symbol: String,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub quantity: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_price: Option<f64>,
    pub status: OrderStatus,
    #[serde(default)]
    pub filled_quantity: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_fill_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl Order {
    pub fn remaining_quantity(&self) -> f64 {
        (self.quantity - self.filled_quantity).max(0.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateOrderRequest {
    pub portfolio_id: i64,
    pub symbol: String,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub quantity: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_price: Option<f64>,
}

/// Server-side pre-trade check (`POST /orders/validate`)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OrderValidation {
    #[serde(default)]
    pub valid: bool,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_cost: Option<f64>,
}

/// Immutable historical record of a fill, fee or cash movement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    pub transaction_id: i64,
    pub portfolio_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<i64>,
    #[serde(default)]
    pub symbol: String,
    pub transaction_type: String,
    #[serde(default)]
    pub quantity: f64,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub total_amount: f64,
    #[serde(default)]
    pub fees: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executed_at: Option<String>,
}

/// `GET /transactions/portfolio/{id}/analytics`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TransactionAnalytics {
    #[serde(default)]
    pub total_transactions: u32,
    #[serde(default)]
    pub total_buy_volume: f64,
    #[serde(default)]
    pub total_sell_volume: f64,
    #[serde(default)]
    pub total_fees: f64,
    #[serde(default)]
    pub most_traded_symbol: Option<String>,
}

/// `GET /transactions/portfolio/{id}/security/{symbol}/cost-basis`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CostBasis {
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub quantity: f64,
    #[serde(default)]
    pub total_cost: f64,
    #[serde(default)]
    pub average_cost: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_format() {
        let status: OrderStatus = serde_json::from_str("\"PARTIALLY_FILLED\"").unwrap();
        assert_eq!(status, OrderStatus::PartiallyFilled);
        assert_eq!(status.to_string(), "PARTIALLY_FILLED");
        assert_eq!(
            serde_json::to_string(&OrderType::StopLimit).unwrap(),
            "\"STOP_LIMIT\""
        );
    }

    #[test]
    fn test_open_states() {
        assert!(OrderStatus::Pending.is_open());
        assert!(OrderStatus::PartiallyFilled.is_open());
        for status in [
            OrderStatus::Filled,
            OrderStatus::Cancelled,
            OrderStatus::Failed,
            OrderStatus::Rejected,
            OrderStatus::Expired,
        ] {
            assert!(status.is_terminal(), "{status} should be terminal");
        }
    }

    #[test]
    fn test_unknown_status_is_rejected() {
        assert!(serde_json::from_str::<OrderStatus>("\"ON_HOLD\"").is_err());
    }

    #[test]
    fn test_price_requirements() {
        assert!(!OrderType::Market.requires_price());
        assert!(OrderType::Limit.requires_price());
        assert!(OrderType::StopLimit.requires_price());
        assert!(OrderType::Stop.requires_stop_price());
        assert!(!OrderType::Limit.requires_stop_price());
    }
}
