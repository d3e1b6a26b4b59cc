// Browser automation seam: launcher -> shared browser -> per-call pages
pub mod chrome;
#[cfg(test)]
pub mod mock;

use crate::coordinator::Pacer;
use crate::model::{BrowserError, ScraperError};
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::Instant;

pub use chrome::ChromeLauncher;

#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn BrowserHandle>, BrowserError>;
}

/// One browser process shared by every category of a run.
#[async_trait]
pub trait BrowserHandle: Send + Sync {
    async fn new_page(&self) -> Result<Box<dyn BrowserPage>, BrowserError>;
    async fn close(&mut self) -> Result<(), BrowserError>;
}

#[async_trait]
pub trait BrowserPage: Send {
    async fn goto(&mut self, url: &str) -> Result<(), BrowserError>;
    /// `Ok(false)` means the selector matched nothing; `Err` means the probe
    /// itself could not be evaluated.
    async fn exists(&mut self, selector: &str) -> Result<bool, BrowserError>;
    async fn click(&mut self, selector: &str) -> Result<(), BrowserError>;
    async fn content(&mut self) -> Result<String, BrowserError>;
    async fn close(&mut self) -> Result<(), BrowserError>;
}

/// Polls until `selector` is present or `timeout` elapses. Probe errors count
/// as "not yet". Poll sleeps go through `pacer`, so cancellation ends the wait
/// with `ScraperError::Cancelled`.
pub async fn wait_for_selector(
    page: &mut dyn BrowserPage,
    selector: &str,
    timeout: Duration,
    poll: Duration,
    pacer: &Pacer,
) -> Result<bool, ScraperError> {
    let deadline = Instant::now() + timeout;
    let poll_ms = poll.as_millis().max(1) as u64;
    loop {
        if let Ok(true) = page.exists(selector).await {
            return Ok(true);
        }
        if Instant::now() >= deadline {
            return Ok(false);
        }
        pacer.sleep_before_operation(poll_ms).await?;
    }
}
