use serde::{Deserialize, Serialize};

use super::market::Security;

/// A user's watchlist. The server is authoritative for membership; every
/// mutating call answers with the full updated watchlist.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Watchlist {
    pub watchlist_id: i64,
    pub user_id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub securities: Vec<Security>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl Watchlist {
    pub fn contains(&self, symbol: &str) -> bool {
        self.securities
            .iter()
            .any(|security| security.symbol.eq_ignore_ascii_case(symbol))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateWatchlistRequest {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpdateWatchlistRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Body for `POST|DELETE /watchlists/{id}/securities`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WatchlistSecurityRequest {
    pub symbol: String,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct WatchlistStats {
    pub total_watchlists: usize,
    pub total_securities: usize,
    pub average_securities_per_watchlist: f64,
}

impl WatchlistStats {
    /// Aggregate counts over a set of watchlists. An empty set yields all zeros.
    pub fn from_watchlists(watchlists: &[Watchlist]) -> Self {
        let total_watchlists = watchlists.len();
        let total_securities: usize = watchlists.iter().map(|w| w.securities.len()).sum();
        let average_securities_per_watchlist = if total_watchlists == 0 {
            0.0
        } else {
            total_securities as f64 / total_watchlists as f64
        };

        Self {
            total_watchlists,
            total_securities,
            average_securities_per_watchlist,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn watchlist(id: i64, symbols: &[&str]) -> Watchlist {
        Watchlist {
            watchlist_id: id,
            user_id: 1,
            name: format!("List {}", id),
            description: None,
            securities: symbols.iter().map(|s| Security::with_symbol(s)).collect(),
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_stats_empty() {
        let stats = WatchlistStats::from_watchlists(&[]);
        assert_eq!(stats.total_watchlists, 0);
        assert_eq!(stats.total_securities, 0);
        assert_eq!(stats.average_securities_per_watchlist, 0.0);
    }

    #[test]
    fn test_stats_average() {
        let lists = vec![watchlist(1, &["AAPL", "MSFT", "NVDA"]), watchlist(2, &["TSLA"])];
        let stats = WatchlistStats::from_watchlists(&lists);
        assert_eq!(stats.total_watchlists, 2);
        assert_eq!(stats.total_securities, 4);
        assert_eq!(stats.average_securities_per_watchlist, 2.0);
    }

    #[test]
    fn test_contains_is_case_insensitive() {
        let list = watchlist(1, &["AAPL"]);
        assert!(list.contains("aapl"));
        assert!(!list.contains("MSFT"));
    }
}
