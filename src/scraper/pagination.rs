// "Load more" pagination: wait, probe, click, repeat
use crate::browser::BrowserPage;
use crate::config::PaginationPolicy;
use crate::coordinator::Pacer;
use crate::model::ScraperError;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginationEnd {
    /// Probe answered "not present": every page is loaded.
    ControlGone,
    /// Probe kept erroring; results may be truncated.
    ProbeFailed,
    /// Control vanished between probe and click.
    ClickFailed,
    ClickLimit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationSummary {
    pub clicks: usize,
    pub end: PaginationEnd,
}

/// Clicks the control at `selector` until it disappears, then waits the
/// settle delay so the last page can render.
///
/// Only a definite "absent" answer is a normal end. A probe error is retried
/// up to `policy.probe_retries` times before giving up.
pub async fn paginate(
    page: &mut dyn BrowserPage,
    selector: &str,
    pacer: &Pacer,
    policy: &PaginationPolicy,
) -> Result<PaginationSummary, ScraperError> {
    let mut clicks = 0;

    let end = loop {
        pacer.sleep_before_operation(pacer.delays().click_delay_ms).await?;

        match probe(page, selector, pacer, policy.probe_retries).await? {
            Probe::Absent => break PaginationEnd::ControlGone,
            Probe::Unreadable => break PaginationEnd::ProbeFailed,
            Probe::Present => {}
        }

        if clicks >= policy.max_clicks {
            break PaginationEnd::ClickLimit;
        }

        if let Err(e) = page.click(selector).await {
            debug!("Load-more click failed after {} clicks: {}", clicks, e);
            break PaginationEnd::ClickFailed;
        }
        clicks += 1;
        debug!("Clicked load-more ({})", clicks);
    };

    match end {
        PaginationEnd::ControlGone => debug!("Pagination complete after {} clicks", clicks),
        PaginationEnd::ClickFailed => debug!("Pagination ended on click failure after {} clicks", clicks),
        PaginationEnd::ProbeFailed => warn!(
            "Load-more probe kept failing after {} clicks; listing may be truncated",
            clicks
        ),
        PaginationEnd::ClickLimit => warn!(
            "Stopped paginating at the {}-click ceiling; listing may be truncated",
            policy.max_clicks
        ),
    }

    pacer.sleep_before_operation(pacer.delays().scrape_delay_ms).await?;
    Ok(PaginationSummary { clicks, end })
}

enum Probe {
    Present,
    Absent,
    Unreadable,
}

async fn probe(
    page: &mut dyn BrowserPage,
    selector: &str,
    pacer: &Pacer,
    retries: u32,
) -> Result<Probe, ScraperError> {
    let mut attempt = 0;
    loop {
        match page.exists(selector).await {
            Ok(true) => return Ok(Probe::Present),
            Ok(false) => return Ok(Probe::Absent),
            Err(e) if attempt < retries => {
                attempt += 1;
                debug!("Load-more probe error (attempt {}): {}", attempt, e);
                pacer.sleep_before_operation(pacer.delays().click_delay_ms).await?;
            }
            Err(e) => {
                warn!("Load-more probe failed {} times: {}", attempt + 1, e);
                return Ok(Probe::Unreadable);
            }
        }
    }
}
