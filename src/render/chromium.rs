//! Chromium render backend using chromiumoxide.
//!
//! Each session is a separately launched browser process with its own
//! profile directory, so cookies, fingerprint and proxy never leak between
//! fetches.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig as LaunchConfig};
use chromiumoxide::cdp::browser_protocol::emulation::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::page::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;

use super::{RenderBackend, RenderSession};
use crate::error::{AppError, Result};
use crate::models::BrowserConfig;
use crate::services::{EgressHandle, Fingerprint, STEALTH_SCRIPT};

/// Poll interval while waiting for a selector.
const SELECTOR_POLL: Duration = Duration::from_millis(250);

static PROFILE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Launches one headless Chromium per session.
pub struct ChromiumBackend {
    config: BrowserConfig,
}

impl ChromiumBackend {
    pub fn new(config: BrowserConfig) -> Self {
        Self { config }
    }

    fn profile_dir() -> PathBuf {
        let n = PROFILE_COUNTER.fetch_add(1, Ordering::Relaxed);
        std::env::temp_dir().join(format!("fxcal-profile-{}-{n}", std::process::id()))
    }

    fn launch_config(
        &self,
        fingerprint: &Fingerprint,
        egress: Option<&EgressHandle>,
        profile_dir: &Path,
    ) -> Result<LaunchConfig> {
        let mut builder = LaunchConfig::builder()
            .user_data_dir(profile_dir)
            .window_size(fingerprint.viewport_width, fingerprint.viewport_height)
            .viewport(Viewport {
                width: fingerprint.viewport_width,
                height: fingerprint.viewport_height,
                device_scale_factor: Some(1.0),
                emulating_mobile: false,
                is_landscape: fingerprint.landscape,
                has_touch: fingerprint.touch_enabled,
            })
            .args(self.config.args.iter().map(String::as_str));

        if !self.config.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &self.config.executable {
            builder = builder.chrome_executable(path);
        }
        if let Some(handle) = egress {
            builder = builder.arg(format!("--proxy-server={}", handle.endpoint()));
        }

        builder
            .build()
            .map_err(|e| AppError::render("launch", format!("invalid browser config: {e}")))
    }
}

#[async_trait]
impl RenderBackend for ChromiumBackend {
    async fn open(
        &self,
        fingerprint: &Fingerprint,
        egress: Option<&EgressHandle>,
    ) -> Result<Box<dyn RenderSession>> {
        let profile_dir = Self::profile_dir();
        let config = self.launch_config(fingerprint, egress, &profile_dir)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| AppError::render("launch", e))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let mut session = ChromiumSession {
            browser,
            page: None,
            handler_task,
            profile_dir,
        };

        // A half-initialised browser must not outlive a failed open.
        match session.prepare_page(fingerprint).await {
            Ok(()) => Ok(Box::new(session)),
            Err(e) => {
                let _ = Box::new(session).close().await;
                Err(e)
            }
        }
    }
}

/// A launched browser with its single page.
pub struct ChromiumSession {
    browser: Browser,
    page: Option<Page>,
    handler_task: JoinHandle<()>,
    profile_dir: PathBuf,
}

impl ChromiumSession {
    async fn prepare_page(&mut self, fingerprint: &Fingerprint) -> Result<()> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| AppError::render("open page", e))?;

        page.execute(SetUserAgentOverrideParams::new(fingerprint.user_agent.clone()))
            .await
            .map_err(|e| AppError::render("set user agent", e))?;
        page.execute(AddScriptToEvaluateOnNewDocumentParams::new(STEALTH_SCRIPT))
            .await
            .map_err(|e| AppError::render("install stealth script", e))?;

        self.page = Some(page);
        Ok(())
    }

    fn page(&self) -> Result<&Page> {
        self.page
            .as_ref()
            .ok_or_else(|| AppError::render("session", "page not open"))
    }
}

#[async_trait]
impl RenderSession for ChromiumSession {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<()> {
        let page = self.page()?;
        let start = Instant::now();

        let navigation = async {
            page.goto(url).await?;
            page.wait_for_navigation().await?;
            Ok::<_, chromiumoxide::error::CdpError>(())
        };

        match tokio::time::timeout(timeout, navigation).await {
            Ok(Ok(())) => {
                log::debug!("Loaded {} in {}ms", url, start.elapsed().as_millis());
                Ok(())
            }
            Ok(Err(e)) => Err(AppError::render("navigate", e)),
            Err(_) => Err(AppError::render(
                "navigate",
                format!("no load within {}ms", timeout.as_millis()),
            )),
        }
    }

    async fn evaluate(&mut self, script: &str) -> Result<serde_json::Value> {
        let result = self
            .page()?
            .evaluate(script)
            .await
            .map_err(|e| AppError::render("evaluate", e))?;

        result
            .into_value()
            .map_err(|e| AppError::render("evaluate", format!("{e:?}")))
    }

    async fn wait_for_selector(&mut self, selector: &str, timeout: Duration) -> Result<()> {
        let page = self.page()?;
        let deadline = Instant::now() + timeout;
        loop {
            if page.find_element(selector).await.is_ok() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(AppError::render(
                    "wait for rows",
                    format!("'{selector}' absent after {}ms", timeout.as_millis()),
                ));
            }
            tokio::time::sleep(SELECTOR_POLL).await;
        }
    }

    async fn content(&mut self) -> Result<String> {
        self.page()?
            .content()
            .await
            .map_err(|e| AppError::render("read content", e))
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let mut this = *self;
        if let Some(page) = this.page.take() {
            let _ = page.close().await;
        }
        let closed = this.browser.close().await;
        let _ = this.browser.wait().await;
        this.handler_task.abort();
        if let Err(e) = tokio::fs::remove_dir_all(&this.profile_dir).await {
            log::debug!("Profile dir {} not removed: {}", this.profile_dir.display(), e);
        }
        closed
            .map(|_| ())
            .map_err(|e| AppError::render("close", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FingerprintConfig;
    use crate::services::FingerprintProvider;

    #[tokio::test]
    #[ignore] // Requires Chromium to be installed
    async fn test_chromium_session_reads_rendered_dom() {
        let backend = ChromiumBackend::new(BrowserConfig::default());
        let fingerprint = FingerprintProvider::new(FingerprintConfig::default()).sample();
        let mut session = backend
            .open(&fingerprint, None)
            .await
            .expect("failed to open session");

        session
            .navigate(
                "data:text/html,<table><tr class='calendar__row' data-event-id='1'></tr></table>",
                Duration::from_secs(10),
            )
            .await
            .expect("navigation failed");

        session
            .wait_for_selector("tr.calendar__row[data-event-id]", Duration::from_secs(5))
            .await
            .expect("row not found");

        let webdriver = session
            .evaluate("navigator.webdriver")
            .await
            .expect("evaluate failed");
        assert_eq!(webdriver, serde_json::Value::Bool(false));

        let html = session.content().await.expect("content failed");
        assert!(html.contains("calendar__row"));

        session.close().await.expect("close failed");
    }
}
