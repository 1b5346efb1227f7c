//! Headless browser session for JavaScript-rendered listing and detail pages.
//!
//! Each source run owns exactly one session. Launch tries a cascade of
//! Chrome locations; if every strategy fails the owning run is aborted as a
//! source-scoped failure, never a process-wide one. `close()` is the primary
//! cleanup path and is idempotent; `Drop` only logs a leak warning, it is a
//! backstop and never the sole cleanup mechanism.

use async_trait::async_trait;

use super::{PageSource, ScrapeError};
use crate::config::BrowserSettings;

#[cfg(feature = "browser")]
use std::path::PathBuf;
#[cfg(feature = "browser")]
use std::time::Duration;

#[cfg(feature = "browser")]
use chromiumoxide::{Browser, BrowserConfig};
#[cfg(feature = "browser")]
use futures::StreamExt;
#[cfg(feature = "browser")]
use tracing::{info, warn};

/// Owned headless-browser handle. Not thread-safe; never shared.
#[cfg(feature = "browser")]
pub struct BrowserSession {
    browser: Option<Browser>,
    handler_task: Option<tokio::task::JoinHandle<()>>,
    page_timeout: Duration,
}

#[cfg(feature = "browser")]
impl BrowserSession {
    /// Common Chrome executable locations, checked in order.
    const CHROME_PATHS: &'static [&'static str] = &[
        // Linux
        "/usr/bin/google-chrome",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/snap/bin/chromium",
        // macOS
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
        "/opt/google/chrome/google-chrome",
    ];

    /// Launch a browser, trying each discovery strategy in turn: the
    /// configured executable, then well-known install paths, then `$PATH`.
    pub async fn launch(settings: &BrowserSettings) -> Result<Self, ScrapeError> {
        let mut last_error = String::from("no launch strategy attempted");

        for executable in Self::candidate_executables(settings) {
            info!("attempting browser launch with {}", executable.display());
            match Self::try_launch(&executable, settings).await {
                Ok(session) => {
                    info!("browser launched ({})", executable.display());
                    return Ok(session);
                }
                Err(e) => {
                    warn!("launch with {} failed: {}", executable.display(), e);
                    last_error = e;
                }
            }
        }

        Err(ScrapeError::Browser(format!(
            "no usable Chrome/Chromium found: {last_error}"
        )))
    }

    fn candidate_executables(settings: &BrowserSettings) -> Vec<PathBuf> {
        let mut candidates = Vec::new();

        if let Some(exe) = &settings.executable {
            candidates.push(exe.clone());
        }

        for path in Self::CHROME_PATHS {
            let p = PathBuf::from(path);
            if p.exists() {
                candidates.push(p);
            }
        }

        for cmd in &[
            "google-chrome",
            "google-chrome-stable",
            "chromium",
            "chromium-browser",
        ] {
            if let Ok(p) = which::which(cmd) {
                candidates.push(p);
            }
        }

        candidates.dedup();
        candidates
    }

    async fn try_launch(
        executable: &PathBuf,
        settings: &BrowserSettings,
    ) -> Result<Self, String> {
        let mut builder = BrowserConfig::builder().chrome_executable(executable.clone());

        // with_head means NOT headless
        if !settings.headless {
            builder = builder.with_head();
        }

        builder = builder
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-dev-shm-usage")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-background-networking")
            .arg("--no-sandbox")
            .arg("--disable-gpu");

        let config = builder.build().map_err(|e| e.to_string())?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| e.to_string())?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        Ok(Self {
            browser: Some(browser),
            handler_task: Some(handler_task),
            page_timeout: Duration::from_secs(settings.timeout_secs),
        })
    }

    /// Navigate to a URL and return the rendered HTML.
    pub async fn page_html(&mut self, url: &str) -> Result<String, ScrapeError> {
        let browser = self
            .browser
            .as_mut()
            .ok_or_else(|| ScrapeError::Browser("session already closed".to_string()))?;

        let load = async {
            let page = browser
                .new_page(url)
                .await
                .map_err(|e| ScrapeError::Browser(e.to_string()))?;
            page.wait_for_navigation()
                .await
                .map_err(|e| ScrapeError::Browser(e.to_string()))?;
            let html = page
                .content()
                .await
                .map_err(|e| ScrapeError::Browser(e.to_string()))?;
            let _ = page.close().await;
            Ok::<String, ScrapeError>(html)
        };

        tokio::time::timeout(self.page_timeout, load)
            .await
            .map_err(|_| ScrapeError::Browser(format!("page load of {url} timed out")))?
    }

    /// Shut the browser process down. Safe to call more than once.
    pub async fn shutdown(&mut self) {
        if let Some(mut browser) = self.browser.take() {
            if let Err(e) = browser.close().await {
                warn!("error closing browser: {}", e);
            }
            let _ = browser.wait().await;
        }
        if let Some(task) = self.handler_task.take() {
            task.abort();
        }
    }
}

#[cfg(feature = "browser")]
impl Drop for BrowserSession {
    fn drop(&mut self) {
        // Backstop only: the owning run must call close()/shutdown() on every
        // exit path. chromiumoxide kills the child process in its own Drop.
        if self.browser.is_some() {
            warn!("BrowserSession dropped without explicit close");
        }
    }
}

#[cfg(feature = "browser")]
#[async_trait]
impl PageSource for BrowserSession {
    async fn fetch_page(&mut self, url: &str) -> Result<String, ScrapeError> {
        self.page_html(url).await
    }

    async fn close(&mut self) {
        self.shutdown().await;
    }
}

/// Stub used when the crate is built without the browser feature.
#[cfg(not(feature = "browser"))]
pub struct BrowserSession;

#[cfg(not(feature = "browser"))]
impl BrowserSession {
    pub async fn launch(_settings: &BrowserSettings) -> Result<Self, ScrapeError> {
        Err(ScrapeError::Browser(
            "browser support not compiled; rebuild with --features browser".to_string(),
        ))
    }
}

#[cfg(not(feature = "browser"))]
#[async_trait]
impl PageSource for BrowserSession {
    async fn fetch_page(&mut self, _url: &str) -> Result<String, ScrapeError> {
        Err(ScrapeError::Browser(
            "browser support not compiled; rebuild with --features browser".to_string(),
        ))
    }

    async fn close(&mut self) {}
}
