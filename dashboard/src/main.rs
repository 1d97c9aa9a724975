//! # Dashboard Client
//!
//! Headless entry point: restores (or opens) a session, prints a portfolio
//! and watchlist summary, then keeps market polling alive until Ctrl-C.

use std::sync::Arc;
use std::time::Duration;

use dashboard::core::service::KeyValueStore;
use dashboard::debug::{self, DebugConfig};
use dashboard::services::api::news;
use dashboard::{AppError, ClientConfig, Dashboard, FileStore, MemoryStore, StoreEvent};
use shared::{format_currency, format_percent};

/// How long the first sync may take before the summary is printed anyway.
const INITIAL_SYNC_TIMEOUT: Duration = Duration::from_secs(15);
const HEADLINE_COUNT: u32 = 3;

#[tokio::main]
async fn main() -> dashboard::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let _log_guards = debug::init_logger(&DebugConfig::from_env());

    let config = ClientConfig::from_env().map_err(AppError::Validation)?;
    config.validate().map_err(AppError::Validation)?;
    tracing::info!(
        api = %config.api_base_url,
        market_data = %config.market_data_base_url,
        "Dashboard client starting"
    );

    let storage: Arc<dyn KeyValueStore> = match &config.storage_path {
        Some(path) => Arc::new(FileStore::open(path)?),
        None => Arc::new(MemoryStore::new()),
    };

    let dashboard = Dashboard::new(&config, storage);
    let events = dashboard.events.receiver();

    if dashboard.start().await.is_none() {
        login_from_env(&dashboard).await?;
    }

    wait_for_initial_sync(&events).await;
    print_summary(&dashboard);
    print_headlines(&dashboard).await;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Ok(StoreEvent::Failed { store, message }) => {
                    tracing::warn!(store, message = %message, "Store refresh failed");
                }
                Ok(event) => tracing::debug!(event = ?event, "Store event"),
                Err(_) => break,
            }
        }
    }

    dashboard.shutdown().await;
    Ok(())
}

async fn login_from_env(dashboard: &Dashboard) -> dashboard::Result<()> {
    let (Ok(username), Ok(password)) = (
        std::env::var("DASHBOARD_USERNAME"),
        std::env::var("DASHBOARD_PASSWORD"),
    ) else {
        return Err(AppError::Unauthenticated);
    };

    let user = dashboard.session.login(&username, &password).await?;
    println!("Signed in as {}", user.username);
    Ok(())
}

/// Wait until the portfolio and the watchlists have each reported once.
async fn wait_for_initial_sync(events: &async_channel::Receiver<StoreEvent>) {
    let mut portfolio = false;
    let mut watchlists = false;

    let wait = async {
        while !(portfolio && watchlists) {
            match events.recv().await {
                Ok(StoreEvent::PortfolioUpdated) => portfolio = true,
                Ok(StoreEvent::WatchlistsUpdated { from_cache: false }) => watchlists = true,
                Ok(StoreEvent::Failed { store: "portfolio", .. }) => portfolio = true,
                Ok(StoreEvent::Failed { store: "watchlist", .. }) => watchlists = true,
                Ok(_) => {}
                Err(_) => break,
            }
        }
    };

    if tokio::time::timeout(INITIAL_SYNC_TIMEOUT, wait).await.is_err() {
        tracing::warn!("Initial sync timed out, printing partial summary");
    }
}

fn print_summary(dashboard: &Dashboard) {
    let portfolio = dashboard.portfolio.snapshot();
    match (&portfolio.portfolio, &portfolio.summary) {
        (Some(active), Some(summary)) => {
            println!("Portfolio: {}", active.name);
            println!("  Total value: {}", format_currency(summary.total_value));
            println!("  Cash:        {}", format_currency(summary.cash_balance));
            println!(
                "  Gain/loss:   {} ({})",
                format_currency(summary.total_gain_loss),
                format_percent(summary.total_gain_loss_percent)
            );
            println!("  Positions:   {}", portfolio.positions.len());
        }
        (Some(active), None) => println!("Portfolio: {} (summary unavailable)", active.name),
        (None, _) => println!("No active portfolio"),
    }
    if let Some(error) = &portfolio.error {
        println!("  ! {}", error);
    }

    let watchlists = dashboard.watchlists.snapshot();
    println!(
        "Watchlists: {} ({} securities)",
        watchlists.stats.total_watchlists, watchlists.stats.total_securities
    );
    for watchlist in &watchlists.watchlists {
        let symbols: Vec<&str> = watchlist.securities.iter().map(|s| s.symbol.as_str()).collect();
        println!("  {}: {}", watchlist.name, symbols.join(", "));
    }
}

async fn print_headlines(dashboard: &Dashboard) {
    match news::get_headlines(dashboard.session.client(), HEADLINE_COUNT).await {
        Ok(articles) if !articles.is_empty() => {
            println!("Headlines:");
            for article in articles {
                println!("  - {}", article.title);
            }
        }
        Ok(_) => {}
        Err(e) => tracing::debug!(error = %e, "Headlines unavailable"),
    }
}
