// Chromium over CDP (chromiumoxide)
use super::{BrowserHandle, BrowserLauncher, BrowserPage};
use crate::config::BrowserConfig;
use crate::model::BrowserError;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig as CdpConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                                  (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// How long a cleanly closed browser gets to exit before it is killed.
const EXIT_GRACE: Duration = Duration::from_secs(10);

pub struct ChromeLauncher {
    config: BrowserConfig,
}

impl ChromeLauncher {
    pub fn new(config: BrowserConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl BrowserLauncher for ChromeLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserHandle>, BrowserError> {
        let user_agent = self.config.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT);
        let mut builder = CdpConfig::builder()
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-blink-features=AutomationControlled")
            .arg(format!("--user-agent={}", user_agent));
        if !self.config.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &self.config.executable {
            builder = builder.chrome_executable(path);
        }
        let cdp_config = builder.build().map_err(BrowserError::Launch)?;

        let (browser, mut handler) = Browser::launch(cdp_config)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;
        let handler_task = tokio::spawn(async move { while handler.next().await.is_some() {} });

        info!("Browser launched (headless: {})", self.config.headless);
        Ok(Box::new(ChromeBrowser {
            browser,
            handler_task,
        }))
    }
}

pub struct ChromeBrowser {
    browser: Browser,
    handler_task: JoinHandle<()>,
}

#[async_trait]
impl BrowserHandle for ChromeBrowser {
    async fn new_page(&self) -> Result<Box<dyn BrowserPage>, BrowserError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::Protocol(format!("failed to open page: {}", e)))?;
        Ok(Box::new(ChromePage { page: Some(page) }))
    }

    async fn close(&mut self) -> Result<(), BrowserError> {
        let failure = self.browser.close().await.err().map(|e| e.to_string());
        match &failure {
            None => match timeout(EXIT_GRACE, self.browser.wait()).await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => debug!("Browser process wait failed: {}", e),
                Err(_) => {
                    warn!("Browser still running {}s after close; killing it", EXIT_GRACE.as_secs());
                    self.kill().await;
                }
            },
            Some(reason) => {
                warn!("Browser close command failed ({}); killing the process", reason);
                self.kill().await;
            }
        }
        self.handler_task.abort();
        match failure {
            None => Ok(()),
            Some(reason) => Err(BrowserError::Protocol(format!("browser close failed: {}", reason))),
        }
    }
}

impl ChromeBrowser {
    async fn kill(&mut self) {
        if let Some(Err(e)) = self.browser.kill().await {
            warn!("Failed to kill browser process: {}", e);
        }
    }
}

impl Drop for ChromeBrowser {
    fn drop(&mut self) {
        self.handler_task.abort();
    }
}

pub struct ChromePage {
    page: Option<Page>,
}

impl ChromePage {
    fn page(&self) -> Result<&Page, BrowserError> {
        self.page
            .as_ref()
            .ok_or_else(|| BrowserError::Protocol("page already closed".into()))
    }
}

#[async_trait]
impl BrowserPage for ChromePage {
    async fn goto(&mut self, url: &str) -> Result<(), BrowserError> {
        self.page()?
            .goto(url)
            .await
            .map(|_| ())
            .map_err(|e| BrowserError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            })
    }

    async fn exists(&mut self, selector: &str) -> Result<bool, BrowserError> {
        let literal = serde_json::to_string(selector)
            .map_err(|e| BrowserError::Protocol(e.to_string()))?;
        let expression = format!("document.querySelector({}) !== null", literal);
        self.page()?
            .evaluate(expression)
            .await
            .map_err(|e| BrowserError::Protocol(e.to_string()))?
            .into_value::<bool>()
            .map_err(|e| BrowserError::Protocol(e.to_string()))
    }

    async fn click(&mut self, selector: &str) -> Result<(), BrowserError> {
        let element = self
            .page()?
            .find_element(selector)
            .await
            .map_err(|e| BrowserError::Protocol(format!("{}: {}", selector, e)))?;
        element
            .click()
            .await
            .map(|_| ())
            .map_err(|e| BrowserError::Protocol(format!("click {}: {}", selector, e)))
    }

    async fn content(&mut self) -> Result<String, BrowserError> {
        self.page()?
            .content()
            .await
            .map_err(|e| BrowserError::Protocol(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), BrowserError> {
        match self.page.take() {
            Some(page) => page
                .close()
                .await
                .map_err(|e| BrowserError::Protocol(format!("page close failed: {}", e))),
            None => Ok(()),
        }
    }
}
