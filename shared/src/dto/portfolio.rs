//! Portfolio and position DTOs.

use serde::{Deserialize, Serialize};

/// A simulated portfolio.
///
/// The backend allows a user to own several portfolios but only one of them is
/// flagged `is_active`; the dashboard only ever tracks that one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Portfolio {
    pub portfolio_id: i64,
    pub user_id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub cash_balance: f64,
    #[serde(default)]
    pub total_value: f64,
    #[serde(default)]
    pub total_gain_loss: f64,
    #[serde(default)]
    pub total_gain_loss_percent: f64,
    #[serde(default)]
    pub position_count: u32,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// Aggregated figures for a portfolio (`GET /portfolios/{id}/summary`)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PortfolioSummary {
    #[serde(default)]
    pub portfolio_id: i64,
    #[serde(default)]
    pub cash_balance: f64,
    #[serde(default)]
    pub invested_value: f64,
    #[serde(default)]
    pub total_value: f64,
    #[serde(default)]
    pub day_gain_loss: f64,
    #[serde(default)]
    pub total_gain_loss: f64,
    #[serde(default)]
    pub total_gain_loss_percent: f64,
    #[serde(default)]
    pub position_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreatePortfolioRequest {
    pub user_id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_cash: Option<f64>,
}

/// Body for `POST /portfolios/{id}/cash/{add|withdraw}`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CashOperationRequest {
    pub amount: f64,
}

/// Direction of a cash operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CashOperation {
    Add,
    Withdraw,
}

impl CashOperation {
    /// Path segment used by the backend.
    pub fn as_path(&self) -> &'static str {
        match self {
            CashOperation::Add => "add",
            CashOperation::Withdraw => "withdraw",
        }
    }
}

/// A holding inside a portfolio. Read-only from the client's perspective.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Position {
    pub position_id: i64,
    pub portfolio_id: i64,
    pub symbol: String,
    #[serde(default)]
    pub quantity: f64,
    #[serde(default)]
    pub average_cost: f64,
    #[serde(default)]
    pub cost_basis: f64,
    #[serde(default)]
    pub current_price: f64,
    #[serde(default)]
    pub current_value: f64,
    #[serde(default)]
    pub unrealized_gain_loss: f64,
    #[serde(default)]
    pub unrealized_gain_loss_percent: f64,
    #[serde(default)]
    pub realized_gain_loss: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// Result of `GET /portfolios/user/{id}/has-active`.
///
/// Some deployments answer with a bare boolean, others with an object.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum HasActivePortfolio {
    Flag(bool),
    Object {
        #[serde(alias = "has_active", alias = "hasActivePortfolio")]
        has_active_portfolio: bool,
    },
}

impl HasActivePortfolio {
    pub fn value(&self) -> bool {
        match self {
            HasActivePortfolio::Flag(flag) => *flag,
            HasActivePortfolio::Object { has_active_portfolio } => *has_active_portfolio,
        }
    }
}
