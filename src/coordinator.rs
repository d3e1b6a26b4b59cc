// Fans a category -> URL set out over one shared browser and gathers the
// per-category outcomes into a ScrapeBatch.
use crate::browser::BrowserLauncher;
use crate::config::{PacingConfig, PaginationPolicy, ScrapeDelays, ScrapeTimeouts};
use crate::model::{ProductRecord, ScrapeBatch, ScraperError};
use crate::scraper::{ScrapeContext, SiteScraper};
use futures::future::join_all;
use rand::Rng;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::{sleep, timeout, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Delay primitive shared by every scrape of a run. All waits observe the
/// run's cancellation token.
#[derive(Debug, Clone)]
pub struct Pacer {
    delays: ScrapeDelays,
    pacing: PacingConfig,
    cancel: CancellationToken,
}

impl Pacer {
    pub fn new(delays: ScrapeDelays, pacing: PacingConfig, cancel: CancellationToken) -> Self {
        Self {
            delays,
            pacing,
            cancel,
        }
    }

    pub fn delays(&self) -> ScrapeDelays {
        self.delays
    }

    pub async fn sleep_before_operation(&self, ms: u64) -> Result<(), ScraperError> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(ScraperError::Cancelled),
            _ = sleep(Duration::from_millis(ms)) => Ok(()),
        }
    }

    /// Start offset for the `index`-th category: a fixed stagger plus random
    /// jitter, so requests don't leave in lockstep.
    pub fn stagger_delay(&self, index: usize) -> u64 {
        if index == 0 {
            return 0;
        }
        let jitter = if self.pacing.jitter_ms == 0 {
            0
        } else {
            rand::rng().random_range(0..=self.pacing.jitter_ms)
        };
        self.pacing.stagger_ms.saturating_mul(index as u64) + jitter
    }
}

pub struct ScrapeCoordinator<L> {
    launcher: L,
    pacer: Pacer,
    timeouts: ScrapeTimeouts,
    pagination: PaginationPolicy,
    debug_html_dir: Option<PathBuf>,
}

impl<L: BrowserLauncher> ScrapeCoordinator<L> {
    pub fn new(launcher: L, pacer: Pacer, timeouts: ScrapeTimeouts, pagination: PaginationPolicy) -> Self {
        Self {
            launcher,
            pacer,
            timeouts,
            pagination,
            debug_html_dir: None,
        }
    }

    pub fn with_debug_html_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.debug_html_dir = dir;
        self
    }

    /// Scrapes every category concurrently on one browser.
    ///
    /// The returned batch has exactly the keys of `urls_by_category`; any
    /// category that failed, timed out or missed its page maps to `None`.
    pub async fn scrape_multiple_urls(
        &self,
        urls_by_category: &BTreeMap<String, String>,
        recursive: bool,
        scraper: &dyn SiteScraper,
    ) -> ScrapeBatch {
        let store = scraper.store_name();
        let started = Instant::now();
        info!(store, categories = urls_by_category.len(), recursive, "Scrape job started");

        let mut browser = match self.launcher.launch().await {
            Ok(browser) => browser,
            Err(e) => {
                error!(store, error = %e, "Browser launch failed; every category is missing");
                return urls_by_category.keys().map(|k| (k.clone(), None)).collect();
            }
        };

        let batch: ScrapeBatch = {
            let ctx = ScrapeContext {
                browser: &*browser,
                pacer: &self.pacer,
                timeouts: self.timeouts,
                pagination: self.pagination,
                debug_html_dir: self.debug_html_dir.clone(),
            };
            let ctx = &ctx;

            let tasks = urls_by_category.iter().enumerate().map(|(index, (category, url))| {
                let offset = self.pacer.stagger_delay(index);
                async move {
                    let outcome = match self.pacer.sleep_before_operation(offset).await {
                        Ok(()) => scraper.scrape_site(url, ctx, recursive).await,
                        Err(e) => Err(e),
                    };
                    (category.clone(), settle(store, category, url, outcome))
                }
            });
            join_all(tasks).await.into_iter().collect()
        };

        let close_budget = self.timeouts.browser_close();
        match timeout(close_budget, browser.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(store, error = %e, "Browser shutdown error"),
            Err(_) => warn!(
                store,
                secs = close_budget.as_secs(),
                "Browser shutdown did not finish; abandoning the process"
            ),
        }

        let missing = batch.values().filter(|v| v.is_none()).count();
        let products: usize = batch.values().flatten().map(Vec::len).sum();
        info!(
            store,
            products,
            missing_categories = missing,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Scrape job finished"
        );
        batch
    }
}

fn settle(
    store: &str,
    category: &str,
    url: &str,
    outcome: Result<Option<Vec<ProductRecord>>, ScraperError>,
) -> Option<Vec<ProductRecord>> {
    match outcome {
        Ok(Some(products)) => {
            info!(store, category, count = products.len(), "Category scraped");
            Some(products)
        }
        Ok(None) => {
            warn!(store, category, url, "Category page-miss: listing container never appeared");
            None
        }
        Err(e) => {
            warn!(store, category, url, error = %e, "Category scrape failed");
            None
        }
    }
}
