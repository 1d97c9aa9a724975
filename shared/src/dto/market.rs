//! Securities and market-data DTOs.
//!
//! Quotes are inherently stale: `last_updated` is whatever the backend last
//! recorded, refreshed by polling or a manual "update price" call.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Security {
    pub symbol: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_percent: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exchange: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_cap: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
}

impl Security {
    pub fn with_symbol(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            ..Default::default()
        }
    }
}

/// Query for `GET /securities/search`. Empty fields are not sent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SecuritySearch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exchange: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl SecuritySearch {
    pub fn is_empty(&self) -> bool {
        self.query.as_deref().map_or(true, |q| q.trim().is_empty())
            && self.sector.is_none()
            && self.exchange.is_none()
            && self.min_price.is_none()
            && self.max_price.is_none()
    }

    /// Query-string pairs in a stable order.
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(query) = self.query.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            params.push(("q", query.to_string()));
        }
        if let Some(sector) = &self.sector {
            params.push(("sector", sector.clone()));
        }
        if let Some(exchange) = &self.exchange {
            params.push(("exchange", exchange.clone()));
        }
        if let Some(min) = self.min_price {
            params.push(("min_price", min.to_string()));
        }
        if let Some(max) = self.max_price {
            params.push(("max_price", max.to_string()));
        }
        if let Some(limit) = self.limit {
            params.push(("limit", limit.to_string()));
        }
        params
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SectorOverview {
    pub sector: String,
    #[serde(default)]
    pub security_count: u32,
    #[serde(default)]
    pub average_change_percent: f64,
    #[serde(default)]
    pub total_market_cap: f64,
}

/// Available filter values (`GET /securities/filters`)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SecurityFilters {
    #[serde(default)]
    pub sectors: Vec<String>,
    #[serde(default)]
    pub exchanges: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_price: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceAlert {
    pub symbol: String,
    #[serde(default)]
    pub alert_type: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_percent: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub triggered_at: Option<String>,
}

/// `GET /market-data/status`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MarketStatus {
    #[serde(default, alias = "isOpen", alias = "market_open")]
    pub is_open: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_open: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_close: Option<String>,
}

/// `GET /market-data/stats`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MarketStats {
    #[serde(default)]
    pub total_securities: u32,
    #[serde(default)]
    pub advancers: u32,
    #[serde(default)]
    pub decliners: u32,
    #[serde(default)]
    pub unchanged: u32,
    #[serde(default)]
    pub total_volume: f64,
}

/// `GET /market-data/context`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MarketContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volatility_index: Option<f64>,
    #[serde(default)]
    pub top_sectors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_query_skips_blank_text() {
        let search = SecuritySearch {
            query: Some("  ".to_string()),
            sector: Some("Technology".to_string()),
            ..Default::default()
        };
        assert!(!search.is_empty());
        assert_eq!(search.to_query(), vec![("sector", "Technology".to_string())]);
        assert!(SecuritySearch::default().is_empty());
    }

    #[test]
    fn test_market_status_aliases() {
        let status: MarketStatus = serde_json::from_str(r#"{"isOpen": true}"#).unwrap();
        assert!(status.is_open);
        let status: MarketStatus = serde_json::from_str(r#"{}"#).unwrap();
        assert!(!status.is_open);
    }
}
