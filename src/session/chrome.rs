//! Headless Chrome engine
//!
//! Launches one Chrome process per run and opens one page per session.
//! A load counts as settled once navigation has completed and the page's
//! resource timeline has not grown for the configured quiet window.

use crate::config::{IdentityConfig, PipelineConfig};
use crate::extract::Locale;
use crate::session::{Engine, FetchError, PageState, Session};
use crate::SweepError;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::SetUserAgentOverrideParams;
use chromiumoxide::Page;
use futures::StreamExt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

const RESOURCE_COUNT_SCRIPT: &str = "performance.getEntriesByType('resource').length";
const SETTLE_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Engine backed by a headless Chrome process
pub struct ChromeEngine {
    browser: Mutex<Option<Browser>>,
    handler: std::sync::Mutex<Option<JoinHandle<()>>>,
    identity: Arc<IdentityConfig>,
    settle_grace: Duration,
    settle_quiet: Duration,
}

impl ChromeEngine {
    /// Launches Chrome and spawns its CDP event handler
    ///
    /// Uses the executable from `CHROMIUM_PATH` when set, otherwise lets
    /// chromiumoxide locate an installed Chrome/Chromium.
    pub async fn launch(identity: &IdentityConfig, pipeline: &PipelineConfig) -> Result<Self, SweepError> {
        let mut builder = BrowserConfig::builder();
        if let Ok(path) = std::env::var("CHROMIUM_PATH") {
            builder = builder.chrome_executable(path);
        }
        let config = builder.build().map_err(SweepError::EngineSetup)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| SweepError::EngineSetup(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        tracing::info!("Launched headless Chrome");

        Ok(Self {
            browser: Mutex::new(Some(browser)),
            handler: std::sync::Mutex::new(Some(handler_task)),
            identity: Arc::new(identity.clone()),
            settle_grace: pipeline.settle_grace(),
            settle_quiet: pipeline.settle_quiet(),
        })
    }
}

#[async_trait]
impl Engine for ChromeEngine {
    async fn acquire(&self) -> Result<Box<dyn Session>, FetchError> {
        let guard = self.browser.lock().await;
        let browser = guard
            .as_ref()
            .ok_or_else(|| FetchError::Acquire("Chrome has been shut down".to_string()))?;

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| FetchError::Acquire(e.to_string()))?;

        Ok(Box::new(ChromeSession {
            page,
            identity: self.identity.clone(),
            settle_grace: self.settle_grace,
            settle_quiet: self.settle_quiet,
        }))
    }

    async fn shutdown(&self) {
        if let Some(mut browser) = self.browser.lock().await.take() {
            if let Err(e) = browser.close().await {
                tracing::warn!("Failed to close Chrome cleanly: {}", e);
            }
            if let Err(e) = browser.wait().await {
                tracing::warn!("Failed waiting for Chrome to exit: {}", e);
            }
        }

        let handler = match self.handler.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(handler) = handler {
            handler.abort();
        }

        tracing::info!("Chrome shut down");
    }
}

/// One Chrome page
struct ChromeSession {
    page: Page,
    identity: Arc<IdentityConfig>,
    settle_grace: Duration,
    settle_quiet: Duration,
}

impl ChromeSession {
    fn navigation_error(location: &str, error: impl std::fmt::Display) -> FetchError {
        FetchError::Navigation {
            url: location.to_string(),
            message: error.to_string(),
        }
    }

    /// Applies the identity headers for one locale
    async fn apply_identity(&self, location: &str, language: &str) -> Result<(), FetchError> {
        let params = SetUserAgentOverrideParams::builder()
            .user_agent(self.identity.user_agent.clone())
            .accept_language(language.to_string())
            .build()
            .map_err(|e| Self::navigation_error(location, e))?;

        self.page
            .execute(params)
            .await
            .map_err(|e| Self::navigation_error(location, e))?;
        Ok(())
    }

    /// Navigates and waits until no new resources load for the quiet window
    async fn navigate_and_settle(&self, location: &str) -> Result<(), FetchError> {
        self.page
            .goto(location)
            .await
            .map_err(|e| Self::navigation_error(location, e))?;
        self.page
            .wait_for_navigation()
            .await
            .map_err(|e| Self::navigation_error(location, e))?;

        let mut last_count = self.resource_count().await;
        let mut quiet_since = Instant::now();
        while quiet_since.elapsed() < self.settle_quiet {
            tokio::time::sleep(SETTLE_POLL_INTERVAL).await;
            let count = self.resource_count().await;
            if count != last_count {
                last_count = count;
                quiet_since = Instant::now();
            }
        }

        Ok(())
    }

    async fn resource_count(&self) -> u64 {
        match self.page.evaluate(RESOURCE_COUNT_SCRIPT).await {
            Ok(result) => result.into_value::<u64>().unwrap_or(0),
            Err(e) => {
                tracing::trace!("Resource count unavailable: {}", e);
                0
            }
        }
    }
}

#[async_trait]
impl Session for ChromeSession {
    async fn fetch(&mut self, location: &str, timeout: Duration) -> Result<PageState, FetchError> {
        let mut final_url = location.to_string();
        let mut en_html = String::new();
        let mut ar_html = String::new();

        for locale in Locale::ALL {
            let language = match locale {
                Locale::En => self.identity.default_language.clone(),
                Locale::Ar => self.identity.alternate_language.clone(),
            };
            self.apply_identity(location, &language).await?;

            tokio::time::timeout(timeout, self.navigate_and_settle(location))
                .await
                .map_err(|_| FetchError::Timeout {
                    url: location.to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                })??;

            tokio::time::sleep(self.settle_grace).await;

            let html = self
                .page
                .content()
                .await
                .map_err(|e| Self::navigation_error(location, e))?;

            match locale {
                Locale::En => {
                    if let Ok(Some(url)) = self.page.url().await {
                        final_url = url;
                    }
                    en_html = html;
                }
                Locale::Ar => ar_html = html,
            }
        }

        Ok(PageState {
            location: location.to_string(),
            final_url,
            en_html,
            ar_html,
        })
    }

    async fn release(self: Box<Self>) {
        if let Err(e) = self.page.close().await {
            tracing::warn!("Failed to close Chrome page: {}", e);
        }
    }
}
