use super::layout::SiteLayout;
use super::pagination::paginate;
use super::traits::ScrapeContext;
use crate::browser::{wait_for_selector, BrowserPage};
use crate::model::{BrowserError, ScraperError};
use crate::utils::to_kebab_case;
use std::fs;
use std::path::Path;
use tokio::time::{timeout, timeout_at, Instant};
use tracing::{debug, info, warn};

/// Opens a private page for `url`, loads the whole listing and returns its
/// rendered HTML. `Ok(None)` when the grid container never shows up.
///
/// The category budget covers opening the page as well as loading it. A page
/// that was opened is closed on every path, including errors and the category
/// timeout.
pub async fn fetch_listing(
    layout: &SiteLayout,
    url: &str,
    ctx: &ScrapeContext<'_>,
    recursive: bool,
) -> Result<Option<String>, ScraperError> {
    let budget = ctx.timeouts.category();
    let deadline = Instant::now() + budget;
    let over_budget = || ScraperError::CategoryTimeout {
        url: url.to_string(),
        secs: budget.as_secs(),
    };

    let mut page = match timeout_at(deadline, ctx.browser.new_page()).await {
        Ok(opened) => opened?,
        Err(_) => {
            warn!("{}: opening a page for {} never completed", layout.store_name, url);
            return Err(over_budget());
        }
    };

    let outcome = match timeout_at(deadline, load_listing(page.as_mut(), layout, url, ctx, recursive)).await {
        Ok(outcome) => outcome,
        Err(_) => Err(over_budget()),
    };

    match timeout(ctx.timeouts.navigation(), page.close()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => debug!("Page close error for {} (tab leak): {}", url, e),
        Err(_) => debug!("Page close for {} timed out (tab leak)", url),
    }
    outcome
}

async fn load_listing(
    page: &mut dyn BrowserPage,
    layout: &SiteLayout,
    url: &str,
    ctx: &ScrapeContext<'_>,
    recursive: bool,
) -> Result<Option<String>, ScraperError> {
    let nav_timeout = ctx.timeouts.navigation();
    match timeout(nav_timeout, page.goto(url)).await {
        Ok(navigated) => navigated?,
        Err(_) => {
            return Err(BrowserError::NavigationTimeout {
                url: url.to_string(),
                secs: nav_timeout.as_secs(),
            }
            .into());
        }
    }

    let found = wait_for_selector(
        page,
        &layout.container_css,
        ctx.timeouts.container_wait(),
        ctx.timeouts.container_poll(),
        ctx.pacer,
    )
    .await?;
    if !found {
        warn!("{}: listing container not found on {}", layout.store_name, url);
        if let Some(dir) = &ctx.debug_html_dir {
            match page.content().await {
                Ok(html) => log_and_save_html(&html, dir, &layout.store_name, url),
                Err(e) => debug!("Could not read page for debug snapshot: {}", e),
            }
        }
        return Ok(None);
    }

    if recursive {
        let summary = paginate(page, &layout.load_more_css, ctx.pacer, &ctx.pagination).await?;
        info!(
            "{}: {} load-more clicks on {} ({:?})",
            layout.store_name, summary.clicks, url, summary.end
        );
    }

    Ok(Some(page.content().await?))
}

/// Saves the provided HTML for debugging page-misses.
fn log_and_save_html(html: &str, folder: &Path, store: &str, url: &str) {
    if let Err(e) = fs::create_dir_all(folder) {
        warn!("Failed to create debug folder: {}", e);
        return;
    }
    let filename = folder.join(format!("debug-{}-{}.html", to_kebab_case(store), to_kebab_case(url)));
    if let Err(e) = fs::write(&filename, html) {
        warn!("Failed to write debug HTML: {}", e);
    } else {
        info!("Saved debug HTML: {}", filename.display());
    }
}
