//! One store, one page, start to finish.
//!
//! `scrape_store` never returns an error: navigation, catalog and scroll
//! failures are recorded on the [`RunReport`] (ending the run early unless
//! the store's policy says to carry on), and per-container failures become
//! [`SkipReason`]s.

use std::collections::{BTreeMap, HashSet};
use std::time::{Duration, Instant};

use canasta_core::{FailurePolicy, ProductRecord, SetupStep, StoreConfig};
use url::Url;

use crate::dedup::dedup_records;
use crate::driver::PageDriver;
use crate::error::ScraperError;
use crate::extract::{ExtractOutcome, Extractor, SkipReason};
use crate::scroll::{sleep_ms, ScrollMonitor, ScrollReport};

const DEFAULT_NAV_TIMEOUT: Duration = Duration::from_secs(90);

#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Replaces the store's configured `target_url`.
    pub target_url: Option<Url>,
    pub nav_timeout: Duration,
    /// Ignore the store's price digit limit.
    pub full_prices: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            target_url: None,
            nav_timeout: DEFAULT_NAV_TIMEOUT,
            full_prices: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub store_slug: String,
    pub page_url: Url,
    /// Deduplicated, in page order.
    pub records: Vec<ProductRecord>,
    pub containers_seen: usize,
    /// Containers passed over because their key attribute repeated one
    /// already seen in this run.
    pub repeated_containers: usize,
    pub skipped: Vec<SkipReason>,
    pub scroll: Option<ScrollReport>,
    /// Set when a stage failed; `records` holds what was gathered.
    pub failure: Option<String>,
    pub elapsed: Duration,
}

impl RunReport {
    fn new(store: &StoreConfig, page_url: Url) -> Self {
        Self {
            store_slug: store.slug.clone(),
            page_url,
            records: Vec::new(),
            containers_seen: 0,
            repeated_containers: 0,
            skipped: Vec::new(),
            scroll: None,
            failure: None,
            elapsed: Duration::ZERO,
        }
    }

    /// Skipped containers grouped by [`SkipReason::label`].
    #[must_use]
    pub fn skip_counts(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for reason in &self.skipped {
            *counts.entry(reason.label()).or_insert(0) += 1;
        }
        counts
    }

    fn fail(&mut self, stage: &str, err: &ScraperError) {
        tracing::error!(store = %self.store_slug, stage, error = %err, "scrape run stopped");
        self.failure = Some(format!("{stage}: {err}"));
    }
}

/// Navigates to the store's listing page, prepares it, scrolls it and
/// extracts every product container.
pub async fn scrape_store<D: PageDriver>(
    driver: &D,
    store: &StoreConfig,
    options: &RunOptions,
) -> RunReport {
    let started = Instant::now();
    let page_url = options
        .target_url
        .clone()
        .unwrap_or_else(|| store.target_url.clone());
    let mut report = RunReport::new(store, page_url.clone());

    if let Err(e) = scrape_into(driver, store, options, page_url, &mut report).await {
        report.fail(e.0, &e.1);
    }

    report.elapsed = started.elapsed();
    tracing::info!(
        store = %store.slug,
        containers = report.containers_seen,
        repeated = report.repeated_containers,
        records = report.records.len(),
        skipped = report.skipped.len(),
        elapsed_ms = u64::try_from(report.elapsed.as_millis()).unwrap_or(u64::MAX),
        "scrape run finished"
    );
    report
}

/// Runs [`scrape_store`] and then ends the browser session, whatever the
/// outcome.
pub async fn run_store<D: PageDriver>(
    driver: D,
    store: &StoreConfig,
    options: &RunOptions,
) -> RunReport {
    let report = scrape_store(&driver, store, options).await;
    if let Err(e) = driver.close().await {
        tracing::warn!(store = %store.slug, error = %e, "failed to close browser session");
    }
    report
}

type StageError = (&'static str, ScraperError);

async fn scrape_into<D: PageDriver>(
    driver: &D,
    store: &StoreConfig,
    options: &RunOptions,
    page_url: Url,
    report: &mut RunReport,
) -> Result<(), StageError> {
    let extractor = Extractor::new(store, page_url.clone()).map_err(|e| ("extractor", e))?;
    let extractor = if options.full_prices {
        extractor.with_full_prices()
    } else {
        extractor
    };

    tracing::info!(store = %store.slug, url = %page_url, "navigating");
    driver
        .goto(page_url.as_str(), options.nav_timeout)
        .await
        .map_err(|e| ("navigation", e))?;
    sleep_ms(store.settle_ms).await;

    for step in &store.setup {
        if let Err(e) = run_setup_step(driver, step).await {
            tracing::warn!(store = %store.slug, error = %e, "page setup step failed, continuing");
        }
    }

    let catalog_timeout = Duration::from_millis(store.catalog_timeout_ms);
    if let Err(e) = driver.wait_for(&store.container, catalog_timeout).await {
        match store.on_missing_catalog {
            FailurePolicy::Abort => return Err(("catalog wait", e)),
            FailurePolicy::Continue => {
                tracing::warn!(store = %store.slug, error = %e, "catalog not visible, continuing");
            }
        }
    }
    sleep_ms(store.catalog_settle_ms).await;

    if let Some(settings) = &store.scroll {
        match ScrollMonitor::new(settings).run(driver).await {
            Ok(scroll) => report.scroll = Some(scroll),
            Err(e) => match store.on_scroll_failure {
                FailurePolicy::Abort => return Err(("scroll", e)),
                FailurePolicy::Continue => {
                    tracing::warn!(
                        store = %store.slug,
                        error = %e,
                        "scroll failed, extracting what loaded"
                    );
                    report.failure = Some(format!("scroll: {e}"));
                }
            },
        }
    }

    let containers = driver
        .find_all(&store.container)
        .await
        .map_err(|e| ("container lookup", e))?;
    report.containers_seen = containers.len();
    tracing::info!(store = %store.slug, containers = containers.len(), "extracting");

    let mut seen_keys = HashSet::new();
    let mut records = Vec::with_capacity(containers.len());
    for container in &containers {
        if let Some(name) = &store.container_key_attribute {
            if let Ok(Some(key)) = driver.attribute(container, name).await {
                if !seen_keys.insert(key) {
                    report.repeated_containers += 1;
                    continue;
                }
            }
        }
        match extractor.extract(driver, container).await {
            ExtractOutcome::Record(record) => records.push(record),
            ExtractOutcome::Skipped(reason) => report.skipped.push(reason),
        }
    }
    report.records = dedup_records(records, store.dedup);
    Ok(())
}

async fn run_setup_step<D: PageDriver>(driver: &D, step: &SetupStep) -> Result<(), ScraperError> {
    match step {
        SetupStep::Dismiss {
            selector,
            timeout_ms,
            settle_ms,
        } => {
            if driver
                .wait_for(selector, Duration::from_millis(*timeout_ms))
                .await
                .is_err()
            {
                tracing::debug!(%selector, "no banner to dismiss");
                return Ok(());
            }
            driver.click(selector).await?;
            tracing::debug!(%selector, "banner dismissed");
            sleep_ms(*settle_ms).await;
        }
        SetupStep::Pause { ms } => sleep_ms(*ms).await,
        SetupStep::SelectLocation {
            ready,
            ready_timeout_ms,
            opener,
            opener_timeout_ms,
            input,
            comuna,
            result,
            settle_ms,
        } => {
            if driver
                .wait_for(ready, Duration::from_millis(*ready_timeout_ms))
                .await
                .is_ok()
            {
                tracing::debug!("prices already visible, location selection skipped");
                return Ok(());
            }
            let timeout = Duration::from_millis(*opener_timeout_ms);
            driver.wait_for(opener, timeout).await?;
            driver.click(opener).await?;
            driver.wait_for(input, timeout).await?;
            driver.fill(input, comuna).await?;
            driver.wait_for(result, timeout).await?;
            driver.click(result).await?;
            tracing::info!(comuna = %comuna, "delivery location selected");
            sleep_ms(*settle_ms).await;
        }
    }
    Ok(())
}
