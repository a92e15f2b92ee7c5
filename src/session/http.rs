//! HTTP-backed engine
//!
//! This engine handles:
//! - Building one shared HTTP client with the crawler identity
//! - Opening lightweight sessions over that client
//! - Loading each location once per locale with its `Accept-Language`
//! - Classifying transport errors into timeout and navigation faults
//!
//! A load counts as settled once the full body has been received. The grace
//! pause is still applied afterward so timings match the browser engine.
//! The settle timeout and the grace pause apply to each locale's load on its
//! own, and the connect timeout is the configured settle timeout.

use crate::config::{IdentityConfig, PipelineConfig};
use crate::extract::Locale;
use crate::session::{Engine, FetchError, PageState, Session};
use crate::SweepError;
use async_trait::async_trait;
use reqwest::header::ACCEPT_LANGUAGE;
use reqwest::{redirect::Policy, Client};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Maximum redirect hops before a navigation is reported as a redirect fault
const MAX_REDIRECTS: usize = 10;

/// Engine backed by a shared `reqwest` client
pub struct HttpEngine {
    client: Client,
    identity: Arc<IdentityConfig>,
    settle_grace: Duration,
    connect_timeout: Duration,
    open_sessions: Arc<AtomicUsize>,
    shut_down: AtomicBool,
}

impl HttpEngine {
    /// Builds the shared client
    ///
    /// # Returns
    ///
    /// * `Ok(HttpEngine)` - Engine ready to hand out sessions
    /// * `Err(SweepError::EngineSetup)` - The client could not be built
    ///   (for example an invalid user agent header value)
    pub fn launch(identity: &IdentityConfig, pipeline: &PipelineConfig) -> Result<Self, SweepError> {
        let client = Client::builder()
            .user_agent(identity.user_agent.clone())
            .connect_timeout(pipeline.timeout())
            .redirect(Policy::limited(MAX_REDIRECTS))
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(|e| SweepError::EngineSetup(e.to_string()))?;

        tracing::debug!("HTTP engine launched with user agent '{}'", identity.user_agent);

        Ok(Self {
            client,
            identity: Arc::new(identity.clone()),
            settle_grace: pipeline.settle_grace(),
            connect_timeout: pipeline.timeout(),
            open_sessions: Arc::new(AtomicUsize::new(0)),
            shut_down: AtomicBool::new(false),
        })
    }

    /// Connect timeout applied by the shared client
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Number of sessions acquired and not yet released
    pub fn open_sessions(&self) -> usize {
        self.open_sessions.load(Ordering::SeqCst)
    }

    /// True once [`Engine::shutdown`] has run
    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Engine for HttpEngine {
    async fn acquire(&self) -> Result<Box<dyn Session>, FetchError> {
        if self.is_shut_down() {
            return Err(FetchError::Acquire("HTTP engine has been shut down".to_string()));
        }

        self.open_sessions.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(HttpSession {
            client: self.client.clone(),
            identity: self.identity.clone(),
            settle_grace: self.settle_grace,
            connect_timeout: self.connect_timeout,
            open_sessions: self.open_sessions.clone(),
        }))
    }

    async fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            tracing::warn!("HTTP engine shutdown requested twice");
            return;
        }

        let still_open = self.open_sessions();
        if still_open > 0 {
            tracing::warn!("HTTP engine shutting down with {} sessions still open", still_open);
        } else {
            tracing::debug!("HTTP engine shut down");
        }
    }
}

/// One tab-equivalent over the shared client
struct HttpSession {
    client: Client,
    identity: Arc<IdentityConfig>,
    settle_grace: Duration,
    connect_timeout: Duration,
    open_sessions: Arc<AtomicUsize>,
}

impl HttpSession {
    fn language(&self, locale: Locale) -> &str {
        match locale {
            Locale::En => &self.identity.default_language,
            Locale::Ar => &self.identity.alternate_language,
        }
    }

    /// Loads one locale variant and returns `(final_url, body)`
    async fn load(&self, location: &str, language: &str) -> Result<(String, String), FetchError> {
        let response = self
            .client
            .get(location)
            .header(ACCEPT_LANGUAGE, language)
            .send()
            .await
            .map_err(|e| classify_error(location, e, self.connect_timeout))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Navigation {
                url: location.to_string(),
                message: format!("HTTP {}", status.as_u16()),
            });
        }

        let final_url = response.url().to_string();
        let body = response
            .text()
            .await
            .map_err(|e| classify_error(location, e, self.connect_timeout))?;

        Ok((final_url, body))
    }
}

#[async_trait]
impl Session for HttpSession {
    async fn fetch(&mut self, location: &str, timeout: Duration) -> Result<PageState, FetchError> {
        let mut final_url = location.to_string();
        let mut en_html = String::new();
        let mut ar_html = String::new();

        for locale in Locale::ALL {
            let language = self.language(locale);
            let (url, body) = tokio::time::timeout(timeout, self.load(location, language))
                .await
                .map_err(|_| FetchError::Timeout {
                    url: location.to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                })??;

            // Let client-side content populate before anything reads the page
            tokio::time::sleep(self.settle_grace).await;

            match locale {
                Locale::En => {
                    final_url = url;
                    en_html = body;
                }
                Locale::Ar => ar_html = body,
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
        self.open_sessions.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Maps a transport error onto the fetch error taxonomy
fn classify_error(location: &str, error: reqwest::Error, connect_timeout: Duration) -> FetchError {
    let url = location.to_string();

    if error.is_timeout() {
        // The client has no overall timeout, so this is the connect timeout
        return FetchError::Timeout {
            url,
            timeout_ms: connect_timeout.as_millis() as u64,
        };
    }

    let message = if error.is_redirect() {
        format!("redirect loop or more than {} redirects", MAX_REDIRECTS)
    } else if error.is_connect() {
        format!("connection failed: {}", error)
    } else {
        error.to_string()
    };

    FetchError::Navigation { url, message }
}
