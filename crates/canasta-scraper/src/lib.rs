//! Browser-driven scraping of supermarket listing pages.
//!
//! A run navigates a [`PageDriver`] to a store's listing, scrolls until the
//! grid stops growing, extracts one [`canasta_core::ProductRecord`] per
//! product container, deduplicates, and formats the result as fixtures.

pub mod dedup;
pub mod driver;
pub mod error;
pub mod extract;
pub mod format;
pub mod output;
pub mod price;
pub mod run;
pub mod scroll;
pub mod webdriver;

pub use dedup::dedup_records;
pub use driver::PageDriver;
pub use error::ScraperError;
pub use extract::{ExtractOutcome, Extractor, SkipReason};
pub use format::{format_fixtures, FixtureContext, BRAND_MAX_CHARS, NAME_MAX_CHARS};
pub use output::{render_fixtures, write_fixtures};
pub use price::normalize_price;
pub use run::{run_store, scrape_store, RunOptions, RunReport};
pub use scroll::{ScrollMonitor, ScrollReport};
pub use webdriver::{BrowserOptions, WebDriverPage};
