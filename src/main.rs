mod browser;
mod config;
mod coordinator;
mod model;
mod normalizer;
mod parser;
mod reconciler;
mod scraper;
mod storage;
mod utils;

use browser::{BrowserLauncher, ChromeLauncher};
use config::{load_config, AppConfig, RetailerConfig};
use coordinator::{Pacer, ScrapeCoordinator};
use reconciler::process_scrape_results;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use storage::SqliteStorage;
use tokio::sync::Mutex;
use tokio::time::{sleep, Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config.json".to_string());
    let config: Arc<AppConfig> = match load_config(&config_path) {
        Ok(cfg) => Arc::new(cfg),
        Err(e) => {
            error!("Config load error ({}): {}", config_path, e);
            return;
        }
    };
    info!(
        "Delays: click {} ms, settle {} ms",
        config.delays.click_delay_ms, config.delays.scrape_delay_ms
    );

    let storage = match SqliteStorage::new(&config.database_path) {
        Ok(s) => Arc::new(Mutex::new(s)),
        Err(e) => {
            error!("Failed to initialize storage: {}", e);
            return;
        }
    };

    // Ctrl-C stops every pending wait and ends the loop after this pass
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, stopping after the current pass...");
                cancel.cancel();
            }
        });
    }

    let pacer = Pacer::new(config.delays, config.pacing, cancel.clone());
    let coordinator = ScrapeCoordinator::new(
        ChromeLauncher::new(config.browser.clone()),
        pacer,
        config.timeouts,
        config.pagination,
    )
    .with_debug_html_dir(config.debug_html_dir.as_ref().map(PathBuf::from));

    loop {
        run_pass(&config, &coordinator, storage.clone(), &cancel).await;

        let Some(interval) = config.run_interval_seconds else {
            break;
        };
        if cancel.is_cancelled() {
            break;
        }
        info!("Waiting {}s for the next pass...", interval);
        tokio::select! {
            _ = sleep(Duration::from_secs(interval)) => {}
            _ = cancel.cancelled() => break,
        }
    }
    info!("Shutting down.");
}

/// One full scrape pass: every configured retailer, one at a time, each
/// reconciled into the catalog as soon as its batch is in. Retailers not yet
/// started when `cancel` fires are skipped.
async fn run_pass<L: BrowserLauncher>(
    config: &AppConfig,
    coordinator: &ScrapeCoordinator<L>,
    storage: Arc<Mutex<SqliteStorage>>,
    cancel: &CancellationToken,
) {
    let started = Instant::now();
    info!("Scrape pass started ({} retailers)", config.retailers.len());

    for retailer_cfg in &config.retailers {
        if cancel.is_cancelled() {
            warn!("Pass cancelled; skipping {} and the remaining retailers", retailer_cfg.retailer);
            break;
        }
        process_retailer(retailer_cfg, config.recursive, coordinator, storage.clone()).await;
    }

    if let Some(path) = &config.catalog_export_path {
        export_catalog(path, &storage).await;
    }

    info!("Scrape pass finished in {}s", started.elapsed().as_secs());
}

async fn process_retailer<L: BrowserLauncher>(
    retailer_cfg: &RetailerConfig,
    recursive: bool,
    coordinator: &ScrapeCoordinator<L>,
    storage: Arc<Mutex<SqliteStorage>>,
) {
    let retailer = retailer_cfg.retailer;
    let scraper = match retailer.scraper() {
        Ok(s) => s,
        Err(e) => {
            error!("Cannot build scraper for {}: {}", retailer, e);
            return;
        }
    };

    let urls = retailer_cfg.category_urls();
    let batch = coordinator
        .scrape_multiple_urls(&urls, recursive, scraper.as_ref())
        .await;

    let mut guard = storage.lock().await;
    match process_scrape_results(&batch, &mut *guard) {
        Ok(report) => match guard.product_count() {
            Ok(total) => info!("{}: catalog now holds {} products ({:?})", retailer, total, report),
            Err(e) => warn!("{}: reconciled but could not count catalog: {}", retailer, e),
        },
        Err(e) => warn!("{}: catalog update failed: {}", retailer, e),
    }
}

/// Writes the whole catalog as JSON for the front-end.
async fn export_catalog(path: &str, storage: &Arc<Mutex<SqliteStorage>>) {
    let products = match storage.lock().await.get_all_products() {
        Ok(p) => p,
        Err(e) => {
            warn!("Catalog export skipped: {}", e);
            return;
        }
    };
    match serde_json::to_string_pretty(&products) {
        Ok(json) => match fs::write(path, json) {
            Ok(()) => info!("Exported {} products to {}", products.len(), path),
            Err(e) => warn!("Failed to write catalog export: {}", e),
        },
        Err(e) => warn!("Failed to serialize catalog: {}", e),
    }
}
