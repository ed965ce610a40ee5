//! `scrape` and `stores` command handlers.
//!
//! Stores run one after another, each in its own browser session. A run
//! that stops early still writes whatever it gathered; only a browser
//! session that cannot start or an output file that cannot be written
//! counts as a failed store.

use std::path::{Path, PathBuf};
use std::time::Duration;

use canasta_core::{AppConfig, StoreConfig, StoresFile};
use canasta_scraper::{
    format_fixtures, render_fixtures, run_store, write_fixtures, BrowserOptions, FixtureContext,
    RunOptions, RunReport, WebDriverPage,
};
use chrono::Utc;
use url::Url;

/// Records shown in the per-store summary.
const SAMPLE_SIZE: usize = 3;

#[derive(Debug, Clone, Default)]
pub(crate) struct ScrapeRequest {
    pub slugs: Vec<String>,
    pub all: bool,
    pub url: Option<Url>,
    pub output: Option<PathBuf>,
    pub full_prices: bool,
    pub dry_run: bool,
}

pub(crate) fn list_stores(stores: &StoresFile) {
    for store in &stores.stores {
        println!(
            "{:<14} {:<20} id={:<3} {} -> {}",
            store.slug, store.name, store.store_id, store.target_url, store.output_file
        );
    }
}

/// Resolves the requested slugs against the catalog, keeping request order.
///
/// # Errors
///
/// Fails on an unknown slug, or when `--url`/`--output` is combined with
/// more than one store.
pub(crate) fn select_stores<'a>(
    stores: &'a StoresFile,
    request: &ScrapeRequest,
) -> anyhow::Result<Vec<&'a StoreConfig>> {
    let selected: Vec<&StoreConfig> = if request.all {
        stores.stores.iter().collect()
    } else {
        request
            .slugs
            .iter()
            .map(|slug| {
                stores.find(slug).ok_or_else(|| {
                    let known: Vec<&str> = stores.stores.iter().map(|s| s.slug.as_str()).collect();
                    anyhow::anyhow!("store '{slug}' not found (known: {})", known.join(", "))
                })
            })
            .collect::<anyhow::Result<_>>()?
    };

    if selected.is_empty() {
        anyhow::bail!("no stores selected");
    }
    if selected.len() > 1 && (request.url.is_some() || request.output.is_some()) {
        anyhow::bail!("--url and --output apply to a single store");
    }
    if let Some(url) = &request.url {
        if !matches!(url.scheme(), "http" | "https") {
            anyhow::bail!("--url must be http(s), got '{url}'");
        }
    }
    Ok(selected)
}

/// Where the fixtures for `store` are written.
pub(crate) fn output_path(config: &AppConfig, store: &StoreConfig, request: &ScrapeRequest) -> PathBuf {
    request
        .output
        .clone()
        .unwrap_or_else(|| config.output_dir.join(&store.output_file))
}

/// Scrapes every selected store and writes (or prints) its fixtures.
///
/// # Errors
///
/// Returns an error for an invalid selection, or after all stores ran if
/// any of them could not start a browser or write its output.
pub(crate) async fn run_scrape(
    config: &AppConfig,
    stores: &StoresFile,
    request: &ScrapeRequest,
) -> anyhow::Result<()> {
    let selected = select_stores(stores, request)?;
    let browser = BrowserOptions::from(config);
    let options = RunOptions {
        target_url: request.url.clone(),
        nav_timeout: Duration::from_secs(config.nav_timeout_secs),
        full_prices: request.full_prices,
    };

    let mut failed: Vec<&str> = Vec::new();
    for store in selected {
        if let Err(e) = scrape_one(config, store, &browser, &options, request).await {
            tracing::error!(store = %store.slug, error = %e, "store failed");
            eprintln!("error: {}: {e:#}", store.slug);
            failed.push(&store.slug);
        }
    }

    if !failed.is_empty() {
        anyhow::bail!("{} store(s) failed: {}", failed.len(), failed.join(", "));
    }
    Ok(())
}

async fn scrape_one(
    config: &AppConfig,
    store: &StoreConfig,
    browser: &BrowserOptions,
    options: &RunOptions,
    request: &ScrapeRequest,
) -> anyhow::Result<()> {
    tracing::info!(store = %store.slug, "starting browser session");
    let page = WebDriverPage::connect(browser).await?;
    let report = run_store(page, store, options).await;

    let ctx = FixtureContext {
        model: config.model_name.clone(),
        store_id: store.store_id,
        category: store.category.clone(),
        currency: config.currency.clone(),
        exported_at: Utc::now(),
    };
    let fixtures = format_fixtures(&report.records, &ctx);

    if request.dry_run {
        println!("{}", render_fixtures(&fixtures)?);
        print_summary(store, &report, None);
        return Ok(());
    }

    let path = output_path(config, store, request);
    write_fixtures(&path, &fixtures).await?;
    print_summary(store, &report, Some(&path));
    Ok(())
}

fn print_summary(store: &StoreConfig, report: &RunReport, path: Option<&Path>) {
    let destination = path.map_or_else(|| "stdout".to_string(), |p| p.display().to_string());
    println!(
        "{}: {} products in {:.1}s -> {destination}",
        store.name,
        report.records.len(),
        report.elapsed.as_secs_f64()
    );
    if let Some(failure) = &report.failure {
        println!("  warning: {failure}");
    }
    if report.repeated_containers > 0 {
        println!("  passed over {} repeated listings", report.repeated_containers);
    }
    for (reason, count) in report.skip_counts() {
        println!("  skipped {count} ({reason})");
    }
    for record in report.records.iter().take(SAMPLE_SIZE) {
        println!("  - {} | {} | ${}", record.name, record.brand, record.price);
    }
}

#[cfg(test)]
#[path = "scrape_test.rs"]
mod tests;
