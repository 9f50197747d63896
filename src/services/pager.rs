//! Scroll-until-stable pagination.
//!
//! The calendar loads rows lazily as the page is scrolled. The pager keeps
//! scrolling to the bottom until the document height stops growing.

use crate::error::{AppError, Result};
use crate::models::{DelayRange, PagerConfig, PacingConfig};
use crate::render::RenderSession;

const MEASURE_SCRIPT: &str = "document.body.scrollHeight";
const SCROLL_SCRIPT: &str = "window.scrollTo(0, document.body.scrollHeight)";

/// Summary of one pagination run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PagerReport {
    /// Scroll steps performed
    pub iterations: u32,
    /// Steps after which the height grew
    pub growth_events: u32,
    /// Last measured height
    pub final_height: u64,
}

/// Drives a session's scroll position until its content is fully loaded.
///
/// Termination uses a count of consecutive unchanged measurements rather
/// than a fixed number of scrolls. Any change in height, up or down, resets
/// the count.
#[derive(Debug, Clone)]
pub struct Pager {
    stability_threshold: u32,
    step_delay: DelayRange,
}

impl Pager {
    pub fn new(stability_threshold: u32, step_delay: DelayRange) -> Self {
        Self {
            stability_threshold: stability_threshold.max(1),
            step_delay,
        }
    }

    pub fn from_config(pager: &PagerConfig, pacing: &PacingConfig) -> Self {
        Self::new(pager.stability_threshold, pacing.scroll_step)
    }

    /// Scroll until `stability_threshold` consecutive measurements show no change.
    pub async fn drain_content(&self, session: &mut dyn RenderSession) -> Result<PagerReport> {
        let mut previous = measure(session).await?;
        let mut report = PagerReport {
            final_height: previous,
            ..PagerReport::default()
        };
        let mut unchanged = 0;

        while unchanged < self.stability_threshold {
            session.evaluate(SCROLL_SCRIPT).await?;
            tokio::time::sleep(self.step_delay.sample()).await;

            let height = measure(session).await?;
            report.iterations += 1;

            if height == previous {
                unchanged += 1;
            } else {
                if height > previous {
                    report.growth_events += 1;
                }
                unchanged = 0;
            }
            previous = height;
            report.final_height = height;
        }

        log::debug!(
            "Pagination settled after {} steps ({} growth events, height {})",
            report.iterations,
            report.growth_events,
            report.final_height
        );
        Ok(report)
    }
}

async fn measure(session: &mut dyn RenderSession) -> Result<u64> {
    let value = session.evaluate(MEASURE_SCRIPT).await?;
    value
        .as_u64()
        .or_else(|| value.as_f64().map(|h| h.max(0.0) as u64))
        .ok_or_else(|| AppError::render("paginate", format!("unexpected scroll height {value}")))
}
