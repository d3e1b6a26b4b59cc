// Scripted in-memory browser for tests. Each site is a list of HTML
// snapshots; a successful click on a present selector advances to the next.
use super::{BrowserHandle, BrowserLauncher, BrowserPage};
use crate::model::BrowserError;
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const LOADING_HTML: &str = "<html><body><div class=\"spinner\"></div></body></html>";

#[derive(Clone, Default)]
pub struct MockSite {
    snapshots: Vec<String>,
    container_after: usize,
    fail_navigation: bool,
    navigation_delay: Option<Duration>,
    /// (snapshot index, number of probes that error while on it)
    flaky_probes: Option<(usize, usize)>,
    broken_probes_from: Option<usize>,
}

impl MockSite {
    pub fn grid(snapshots: Vec<String>) -> Self {
        Self {
            snapshots,
            ..Self::default()
        }
    }

    pub fn missing_container() -> Self {
        Self::grid(vec!["<html><body><h1>Store closed</h1></body></html>".into()])
    }

    pub fn failing_navigation() -> Self {
        Self {
            fail_navigation: true,
            ..Self::default()
        }
    }

    /// Document stays in a loading state for the first `probes` probes.
    pub fn container_after(mut self, probes: usize) -> Self {
        self.container_after = probes;
        self
    }

    pub fn navigation_delay(mut self, delay: Duration) -> Self {
        self.navigation_delay = Some(delay);
        self
    }

    pub fn flaky_probes(mut self, at_snapshot: usize, failures: usize) -> Self {
        self.flaky_probes = Some((at_snapshot, failures));
        self
    }

    /// Every probe errors once the page reaches `at_snapshot`.
    pub fn broken_probes_from(mut self, at_snapshot: usize) -> Self {
        self.broken_probes_from = Some(at_snapshot);
        self
    }
}

#[derive(Clone, Default)]
pub struct MockBrowser {
    sites: Arc<HashMap<String, MockSite>>,
    /// `new_page` call (0-based) that never resolves.
    stalled_page: Option<usize>,
    hang_on_close: bool,
    pub open_pages: Arc<AtomicUsize>,
    pub pages_created: Arc<AtomicUsize>,
    pub clicks: Arc<AtomicUsize>,
    pub closed: Arc<AtomicBool>,
}

impl MockBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_site(mut self, url: &str, site: MockSite) -> Self {
        Arc::make_mut(&mut self.sites).insert(url.to_string(), site);
        self
    }

    pub fn stall_new_page(mut self, call: usize) -> Self {
        self.stalled_page = Some(call);
        self
    }

    /// `close` never resolves, like a browser process that ignores shutdown.
    pub fn hanging_close(mut self) -> Self {
        self.hang_on_close = true;
        self
    }
}

#[async_trait]
impl BrowserHandle for MockBrowser {
    async fn new_page(&self) -> Result<Box<dyn BrowserPage>, BrowserError> {
        let call = self.pages_created.fetch_add(1, Ordering::SeqCst);
        if self.stalled_page == Some(call) {
            std::future::pending::<()>().await;
        }
        self.open_pages.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockPage {
            sites: Arc::clone(&self.sites),
            open_pages: Arc::clone(&self.open_pages),
            clicks: Arc::clone(&self.clicks),
            site: None,
            index: 0,
            probes: 0,
            flaky_failed: 0,
            closed: false,
        }))
    }

    async fn close(&mut self) -> Result<(), BrowserError> {
        if self.hang_on_close {
            std::future::pending::<()>().await;
        }
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

pub struct MockPage {
    sites: Arc<HashMap<String, MockSite>>,
    open_pages: Arc<AtomicUsize>,
    clicks: Arc<AtomicUsize>,
    site: Option<MockSite>,
    index: usize,
    probes: usize,
    flaky_failed: usize,
    closed: bool,
}

impl MockPage {
    fn current_html(&self) -> &str {
        match &self.site {
            Some(site) if self.probes >= site.container_after => site
                .snapshots
                .get(self.index)
                .map(String::as_str)
                .unwrap_or(LOADING_HTML),
            _ => LOADING_HTML,
        }
    }

    fn matches(&self, selector: &str) -> Result<bool, BrowserError> {
        let parsed = Selector::parse(selector)
            .map_err(|e| BrowserError::Protocol(format!("bad selector {}: {:?}", selector, e)))?;
        let doc = Html::parse_document(self.current_html());
        Ok(doc.select(&parsed).next().is_some())
    }
}

#[async_trait]
impl BrowserPage for MockPage {
    async fn goto(&mut self, url: &str) -> Result<(), BrowserError> {
        let site = self.sites.get(url).cloned().ok_or_else(|| BrowserError::Navigation {
            url: url.to_string(),
            reason: "net::ERR_NAME_NOT_RESOLVED".into(),
        })?;
        if let Some(delay) = site.navigation_delay {
            tokio::time::sleep(delay).await;
        }
        if site.fail_navigation {
            return Err(BrowserError::Navigation {
                url: url.to_string(),
                reason: "net::ERR_CONNECTION_RESET".into(),
            });
        }
        self.site = Some(site);
        Ok(())
    }

    async fn exists(&mut self, selector: &str) -> Result<bool, BrowserError> {
        self.probes += 1;
        if let Some(site) = &self.site {
            if site.broken_probes_from.is_some_and(|from| self.index >= from) {
                return Err(BrowserError::Protocol("Execution context was destroyed".into()));
            }
            if let Some((at, failures)) = site.flaky_probes {
                if self.index == at && self.flaky_failed < failures {
                    self.flaky_failed += 1;
                    return Err(BrowserError::Protocol("Execution context was destroyed".into()));
                }
            }
        }
        self.matches(selector)
    }

    async fn click(&mut self, selector: &str) -> Result<(), BrowserError> {
        if !self.matches(selector)? {
            return Err(BrowserError::Protocol(format!("no node for {}", selector)));
        }
        self.clicks.fetch_add(1, Ordering::SeqCst);
        let last = self.site.as_ref().map_or(0, |s| s.snapshots.len().saturating_sub(1));
        self.index = (self.index + 1).min(last);
        Ok(())
    }

    async fn content(&mut self) -> Result<String, BrowserError> {
        Ok(self.current_html().to_string())
    }

    async fn close(&mut self) -> Result<(), BrowserError> {
        if !self.closed {
            self.closed = true;
            self.open_pages.fetch_sub(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct MockLauncher {
    pub browser: MockBrowser,
    pub fail: bool,
    pub launches: Arc<AtomicUsize>,
}

impl MockLauncher {
    pub fn new(browser: MockBrowser) -> Self {
        Self {
            browser,
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl BrowserLauncher for MockLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserHandle>, BrowserError> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(BrowserError::Launch("chrome executable not found".into()));
        }
        Ok(Box::new(self.browser.clone()))
    }
}
