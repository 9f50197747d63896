// src/services/fetcher.rs

//! Calendar fetch orchestration.
//!
//! One fetch is a sequential pipeline: fingerprint, egress, render session,
//! pacing, navigation, pagination, extraction and filtering. The session and
//! egress handle live in slots owned outside the timed future, so they are
//! cleaned up on every exit path, timeouts included.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::conversation::Selection;
use crate::error::{AppError, Result};
use crate::models::{Config, FetchResult, FilterCriteria, PeriodKey};
use crate::render::{RenderBackend, RenderSession};
use crate::services::egress::{EgressHandle, EgressProvider};
use crate::services::extractor::RowExtractor;
use crate::services::filter::filter_events;
use crate::services::fingerprint::{Fingerprint, FingerprintProvider};
use crate::services::pager::Pager;

/// Upper bound on closing a session after the fetch itself finished.
const CLOSE_GRACE: Duration = Duration::from_secs(10);

/// Fetches and filters calendar events for one selection at a time.
///
/// Cheap to share behind an `Arc`; concurrent fetches never share a session
/// or an egress handle.
pub struct CalendarFetcher {
    config: Arc<Config>,
    backend: Arc<dyn RenderBackend>,
    egress: Arc<dyn EgressProvider>,
    fingerprints: FingerprintProvider,
    extractor: RowExtractor,
    pager: Pager,
}

impl CalendarFetcher {
    /// Create a fetcher over the given render backend and egress provider.
    pub fn new(
        config: Arc<Config>,
        backend: Arc<dyn RenderBackend>,
        egress: Arc<dyn EgressProvider>,
    ) -> Result<Self> {
        let extractor = RowExtractor::new(&config.selectors)?;
        let pager = Pager::from_config(&config.pager, &config.pacing);
        let fingerprints = FingerprintProvider::new(config.fingerprint.clone());

        Ok(Self {
            config,
            backend,
            egress,
            fingerprints,
            extractor,
            pager,
        })
    }

    /// Create a fetcher backed by Chromium and the configured proxy pool.
    #[cfg(feature = "browser")]
    pub fn with_chromium(config: Arc<Config>) -> Result<Self> {
        let backend = Arc::new(crate::render::ChromiumBackend::new(config.browser.clone()));
        let egress = Arc::new(crate::services::egress::ProxyPool::new(&config.egress));
        Self::new(config, backend, egress)
    }

    /// Overall budget from `calendar.fetch_timeout_ms`.
    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.config.calendar.fetch_timeout_ms)
    }

    /// Fetch a completed conversation selection with the default budget.
    pub async fn fetch_selection(&self, selection: &Selection) -> Result<FetchResult> {
        self.fetch(&selection.criteria, selection.period, self.default_timeout())
            .await
    }

    /// Fetch the calendar for `period` and keep events matching `criteria`.
    ///
    /// Never retries. On any error, including a timeout, the render session is
    /// closed and the egress handle released before returning.
    pub async fn fetch(
        &self,
        criteria: &FilterCriteria,
        period: PeriodKey,
        timeout: Duration,
    ) -> Result<FetchResult> {
        let start = Instant::now();
        let url = self.config.period_url(period);
        let fingerprint = self.fingerprints.sample();
        log::info!(
            "Fetching {} for {} / {} ({}x{})",
            url,
            criteria.currency,
            criteria.impact_label,
            fingerprint.viewport_width,
            fingerprint.viewport_height
        );

        let mut session: Option<Box<dyn RenderSession>> = None;
        let mut egress: Option<EgressHandle> = None;
        let mut stage: &'static str = "acquire egress";

        let outcome = tokio::time::timeout(
            timeout,
            self.run(&url, &fingerprint, criteria, &mut session, &mut egress, &mut stage),
        )
        .await;

        self.cleanup(session, egress).await;

        match outcome {
            Ok(Ok(result)) => {
                log::info!(
                    "Fetched {} matching events in {}ms",
                    result.count,
                    start.elapsed().as_millis()
                );
                Ok(result)
            }
            Ok(Err(e)) => {
                log::warn!("Fetch failed during {}: {}", stage, e);
                Err(e)
            }
            Err(_) => {
                log::warn!("Fetch timed out during {}", stage);
                Err(AppError::timeout(stage, timeout.as_millis() as u64))
            }
        }
    }

    async fn run(
        &self,
        url: &str,
        fingerprint: &Fingerprint,
        criteria: &FilterCriteria,
        session_slot: &mut Option<Box<dyn RenderSession>>,
        egress_slot: &mut Option<EgressHandle>,
        stage: &mut &'static str,
    ) -> Result<FetchResult> {
        let calendar = &self.config.calendar;
        let pacing = &self.config.pacing;

        *egress_slot = self.egress.acquire().await?;

        *stage = "open session";
        let opened = self.backend.open(fingerprint, egress_slot.as_ref()).await?;
        let session = &mut **session_slot.insert(opened);

        *stage = "pre-navigation delay";
        tokio::time::sleep(pacing.pre_navigation.sample()).await;

        *stage = "navigate";
        session
            .navigate(url, Duration::from_millis(calendar.navigation_timeout_ms))
            .await?;

        *stage = "post-navigation delay";
        tokio::time::sleep(pacing.post_navigation.sample()).await;

        *stage = "paginate";
        let report = self.pager.drain_content(&mut *session).await?;
        log::debug!(
            "Pager: {} steps, {} growth events",
            report.iterations,
            report.growth_events
        );

        *stage = "wait for rows";
        session
            .wait_for_selector(
                &self.config.selectors.row_with_id(),
                Duration::from_millis(calendar.selector_timeout_ms),
            )
            .await?;

        *stage = "extract";
        let html = session.content().await?;
        let extraction = self.extractor.extract(&html)?;
        let events = filter_events(&extraction.events, criteria);
        log::debug!(
            "Kept {} of {} rows for '{}'",
            events.len(),
            extraction.events.len(),
            extraction.week_label
        );

        Ok(FetchResult::new(
            calendar.source_name.as_str(),
            extraction.week_label,
            events,
        ))
    }

    async fn cleanup(&self, session: Option<Box<dyn RenderSession>>, egress: Option<EgressHandle>) {
        if let Some(session) = session {
            match tokio::time::timeout(CLOSE_GRACE, session.close()).await {
                Ok(Ok(())) => log::debug!("Render session closed"),
                Ok(Err(e)) => log::warn!("Render session close failed: {}", e),
                Err(_) => log::warn!("Render session close timed out"),
            }
        }
        if let Some(handle) = egress {
            self.egress.release(handle).await;
        }
    }
}
