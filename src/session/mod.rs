//! Browser-like sessions for loading pages
//!
//! This module contains:
//! - The [`Engine`] trait: the shared, run-wide resource that produces sessions
//! - The [`Session`] trait: one tab-equivalent used for exactly one fetch attempt
//! - [`SessionGuard`]: scoped acquisition that releases a session exactly once
//! - [`HttpEngine`]: the default engine, backed by a shared `reqwest` client
//! - `ChromeEngine`: a headless Chrome engine (cargo feature `chrome`)

#[cfg(feature = "chrome")]
mod chrome;
mod http;

#[cfg(feature = "chrome")]
pub use chrome::ChromeEngine;
pub use http::HttpEngine;

use crate::config::{Config, EngineKind};
use crate::extract::Locale;
use crate::SweepError;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Launches the engine selected in the configuration
///
/// This is the only place a run can fail as a whole: if the engine cannot
/// be created, no session can ever be produced.
pub async fn launch_engine(config: &Config) -> Result<Arc<dyn Engine>, SweepError> {
    match config.pipeline.engine {
        EngineKind::Http => Ok(Arc::new(HttpEngine::launch(
            &config.identity,
            &config.pipeline,
        )?)),
        #[cfg(feature = "chrome")]
        EngineKind::Chrome => Ok(Arc::new(
            ChromeEngine::launch(&config.identity, &config.pipeline).await?,
        )),
        #[cfg(not(feature = "chrome"))]
        EngineKind::Chrome => Err(SweepError::EngineSetup(
            "this build does not include the `chrome` feature".to_string(),
        )),
    }
}

/// Fetch-level errors raised by a session
///
/// Both navigation kinds are retried identically by the retry wrapper.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("Timed out after {timeout_ms}ms waiting for {url} to settle")]
    Timeout { url: String, timeout_ms: u64 },

    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("Could not open a session: {0}")]
    Acquire(String),
}

impl FetchError {
    /// Short label used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "timeout",
            Self::Navigation { .. } => "navigation",
            Self::Acquire(_) => "acquire",
        }
    }
}

/// A fully loaded page, one document per locale
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageState {
    /// The location that was requested
    pub location: String,

    /// Final URL after redirects (of the default-locale load)
    pub final_url: String,

    /// HTML as loaded with the default-locale language preference
    pub en_html: String,

    /// HTML as loaded with the alternate-locale language preference
    pub ar_html: String,
}

impl PageState {
    pub fn new(
        location: impl Into<String>,
        final_url: impl Into<String>,
        en_html: impl Into<String>,
        ar_html: impl Into<String>,
    ) -> Self {
        Self {
            location: location.into(),
            final_url: final_url.into(),
            en_html: en_html.into(),
            ar_html: ar_html.into(),
        }
    }

    pub fn html(&self, locale: Locale) -> &str {
        match locale {
            Locale::En => &self.en_html,
            Locale::Ar => &self.ar_html,
        }
    }
}

/// One tab-equivalent execution context
///
/// A session is owned by a single fetch attempt and must be released exactly
/// once, which [`SessionGuard`] takes care of.
#[async_trait]
pub trait Session: Send {
    /// Loads `location` once per locale and waits for each load to settle
    ///
    /// `timeout` bounds each navigation separately, and each is followed by
    /// the grace pause, so a full fetch can take up to twice
    /// `timeout + grace`. Fails with [`FetchError::Timeout`] when a load does
    /// not settle within `timeout`, and with [`FetchError::Navigation`] for
    /// any other fault.
    async fn fetch(&mut self, location: &str, timeout: Duration) -> Result<PageState, FetchError>;

    /// Releases the underlying tab/handle
    async fn release(self: Box<Self>);
}

/// The shared browser-level resource that produces sessions
///
/// One engine is created per run and shut down once after the last window.
#[async_trait]
pub trait Engine: Send + Sync {
    /// Opens a fresh session
    async fn acquire(&self) -> Result<Box<dyn Session>, FetchError>;

    /// Tears down the engine and anything it still holds
    async fn shutdown(&self);
}

/// Scoped session acquisition
///
/// Provides two release paths:
/// 1. Explicit async [`SessionGuard::close`] - the normal path
/// 2. Drop fallback - spawns the release on the runtime captured at
///    acquisition, so panics and aborted tasks still free the session
pub struct SessionGuard {
    session: Option<Box<dyn Session>>,
    location: String,
    runtime_handle: tokio::runtime::Handle,
}

impl SessionGuard {
    /// Acquires a session from `engine` for fetching `location`
    ///
    /// Must be called from within a tokio runtime.
    pub async fn acquire(engine: &dyn Engine, location: &str) -> Result<Self, FetchError> {
        let session = engine.acquire().await?;
        Ok(Self {
            session: Some(session),
            location: location.to_string(),
            runtime_handle: tokio::runtime::Handle::current(),
        })
    }

    /// Fetches the guarded location
    pub async fn fetch(&mut self, timeout: Duration) -> Result<PageState, FetchError> {
        match self.session.as_mut() {
            Some(session) => session.fetch(&self.location, timeout).await,
            None => Err(FetchError::Acquire(format!(
                "session for {} was already released",
                self.location
            ))),
        }
    }

    /// Explicitly releases the session, consuming the guard
    pub async fn close(mut self) {
        if let Some(session) = self.session.take() {
            session.release().await;
            tracing::trace!("Session released for {}", self.location);
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            let location = std::mem::take(&mut self.location);
            tracing::debug!("Session for {} dropped without close, releasing in background", location);
            self.runtime_handle.spawn(async move {
                session.release().await;
            });
        }
    }
}
