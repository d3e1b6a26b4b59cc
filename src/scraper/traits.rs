use super::fetcher::fetch_listing;
use super::layout::SiteLayout;
use crate::browser::BrowserHandle;
use crate::config::{PaginationPolicy, ScrapeTimeouts};
use crate::coordinator::Pacer;
use crate::model::{ProductRecord, ScraperError};
use crate::parser::parse_product_grid;
use async_trait::async_trait;
use std::path::PathBuf;

/// Everything a scraper call borrows from the run that owns it.
pub struct ScrapeContext<'a> {
    pub browser: &'a dyn BrowserHandle,
    pub pacer: &'a Pacer,
    pub timeouts: ScrapeTimeouts,
    pub pagination: PaginationPolicy,
    pub debug_html_dir: Option<PathBuf>,
}

#[async_trait]
pub trait SiteScraper: Send + Sync {
    fn layout(&self) -> &SiteLayout;

    fn store_name(&self) -> &str {
        &self.layout().store_name
    }

    /// Extracts products from one rendered snapshot. `None` on page-miss.
    fn scrape_page(&self, html: &str) -> Option<Vec<ProductRecord>> {
        parse_product_grid(html, self.layout())
    }

    /// Scrapes one category URL, following "load more" when `recursive`.
    ///
    /// `Ok(None)` means the listing container never appeared.
    async fn scrape_site(
        &self,
        url: &str,
        ctx: &ScrapeContext<'_>,
        recursive: bool,
    ) -> Result<Option<Vec<ProductRecord>>, ScraperError> {
        let html = fetch_listing(self.layout(), url, ctx, recursive).await?;
        Ok(html.and_then(|html| self.scrape_page(&html)))
    }
}
