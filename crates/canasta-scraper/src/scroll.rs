//! Scroll-until-stable loop for lazy-loaded product grids.
//!
//! The page is scrolled to the bottom repeatedly; each time the document
//! height fails to grow the stall counter goes up and the page is bounced
//! up and back down, which re-triggers intersection observers that only fire
//! on downward scrolls. Any growth resets the counter. The loop ends once the
//! counter reaches the configured threshold, or at the optional round cap.

use std::time::Duration;

use canasta_core::ScrollSettings;

use crate::driver::{document_height, scroll_to_bottom, scroll_up, PageDriver};
use crate::error::ScraperError;

/// Outcome of one [`ScrollMonitor::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScrollReport {
    /// Scroll-to-bottom iterations performed.
    pub rounds: u32,
    /// Total stalled readings, across all stall streaks.
    pub stalls: u32,
    pub final_height: u64,
    /// `true` when `max_rounds` ended the loop before the page settled.
    pub capped: bool,
}

pub struct ScrollMonitor<'a> {
    settings: &'a ScrollSettings,
}

impl<'a> ScrollMonitor<'a> {
    #[must_use]
    pub fn new(settings: &'a ScrollSettings) -> Self {
        Self { settings }
    }

    /// Scrolls until the document height has been unchanged for
    /// `stall_threshold` consecutive readings.
    ///
    /// Without `max_rounds` there is no other exit: a page whose height keeps
    /// changing keeps this loop running.
    ///
    /// # Errors
    ///
    /// Propagates driver failures from scrolling or reading the height. A
    /// failing load-more click is not an error.
    pub async fn run<D: PageDriver>(&self, driver: &D) -> Result<ScrollReport, ScraperError> {
        let settings = self.settings;
        let threshold = settings.stall_threshold.max(1);
        let mut previous_height = document_height(driver).await?;
        let mut streak = 0_u32;
        let mut report = ScrollReport {
            final_height: previous_height,
            ..ScrollReport::default()
        };

        loop {
            if settings.max_rounds.is_some_and(|cap| report.rounds >= cap) {
                report.capped = true;
                tracing::warn!(
                    rounds = report.rounds,
                    height = previous_height,
                    "scroll round cap reached before height settled"
                );
                break;
            }
            report.rounds += 1;

            scroll_to_bottom(driver).await?;
            sleep_ms(settings.settle_ms).await;
            self.click_load_more(driver).await;

            let new_height = document_height(driver).await?;
            report.final_height = new_height;

            if new_height != previous_height {
                tracing::debug!(
                    round = report.rounds,
                    from = previous_height,
                    to = new_height,
                    "page grew"
                );
                streak = 0;
                previous_height = new_height;
                continue;
            }

            streak += 1;
            report.stalls += 1;
            tracing::debug!(
                round = report.rounds,
                streak,
                threshold,
                height = new_height,
                "height unchanged"
            );

            scroll_up(driver, settings.bounce_offset).await?;
            sleep_ms(settings.bounce_settle_ms).await;
            scroll_to_bottom(driver).await?;

            if streak >= threshold {
                break;
            }
        }

        tracing::info!(
            rounds = report.rounds,
            stalls = report.stalls,
            height = report.final_height,
            "scroll finished"
        );
        Ok(report)
    }

    async fn click_load_more<D: PageDriver>(&self, driver: &D) {
        let Some(selector) = &self.settings.load_more else {
            return;
        };

        let clicked = match driver.is_visible(selector).await {
            Ok(true) => driver.click(selector).await,
            Ok(false) => return,
            Err(e) => Err(e),
        };
        match clicked {
            Ok(()) => {
                tracing::debug!(%selector, "clicked load-more");
                sleep_ms(self.settings.load_more_settle_ms).await;
            }
            Err(e) => tracing::debug!(%selector, error = %e, "load-more click failed"),
        }
    }
}

pub(crate) async fn sleep_ms(ms: u64) {
    if ms > 0 {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}
