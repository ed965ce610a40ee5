//! Per-supermarket scrape configuration.
//!
//! Every site-specific detail (URLs, selectors, timings, field resolution,
//! inclusion and dedup rules) lives in a [`StoreConfig`] loaded from
//! `config/stores.yaml`, so targeting another category is a config edit.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::products::DedupStrategy;
use crate::ConfigError;

const XPATH_PREFIX: &str = "xpath=";

/// A DOM query: CSS by default, XPath when written as `xpath=<expr>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Selector(String);

/// Borrowed view of a [`Selector`] split by query language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorKind<'a> {
    Css(&'a str),
    XPath(&'a str),
}

impl Selector {
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn kind(&self) -> SelectorKind<'_> {
        match self.0.strip_prefix(XPATH_PREFIX) {
            Some(expr) => SelectorKind::XPath(expr.trim()),
            None => SelectorKind::Css(self.0.trim()),
        }
    }

    fn is_blank(&self) -> bool {
        match self.kind() {
            SelectorKind::Css(s) | SelectorKind::XPath(s) => s.is_empty(),
        }
    }
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a single field value is read from, relative to a scope element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "from", rename_all = "snake_case")]
pub enum FieldSource {
    /// An attribute of the scope element itself.
    Attribute { name: String },
    /// Rendered text of the first descendant matching `selector`.
    ChildText { selector: Selector },
    /// An attribute of the first descendant matching `selector`.
    ChildAttribute { selector: Selector, name: String },
    /// First match of `pattern` (a regex) in the scope's rendered text.
    TextPattern { pattern: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "use", rename_all = "snake_case")]
pub enum BrandFallback {
    /// First whitespace-delimited token of the product name.
    #[default]
    FirstToken,
    Placeholder { value: String },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceFormat {
    /// Rendered price text such as `"$ 1.990"`: every non-digit is dropped.
    #[default]
    Digits,
    /// Machine decimal such as `"1990.0"`: the integer part is kept.
    Decimal,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DescriptionStyle {
    #[default]
    Name,
    /// `"<brand> - <name>"`.
    BrandAndName,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InclusionRule {
    /// Keep items with a name and a price above zero.
    PositivePrice,
    /// Keep every named item, even at price zero.
    Named,
}

/// What a run does when a page-preparation stage (catalog wait, scroll)
/// fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Log and keep going, extracting whatever is already in the DOM.
    #[default]
    Continue,
    /// End the run with no records.
    Abort,
}

/// How each [`ProductRecord`](crate::ProductRecord) field is
/// located inside a product container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldStrategy {
    pub name: Vec<FieldSource>,
    #[serde(default)]
    pub brand: Vec<FieldSource>,
    #[serde(default)]
    pub brand_fallback: BrandFallback,
    #[serde(default)]
    pub price: Vec<FieldSource>,
    /// Nearest enclosing element to search for the price in. XPath
    /// expressions are evaluated relative to the container.
    #[serde(default)]
    pub price_scope: Option<Selector>,
    #[serde(default)]
    pub price_format: PriceFormat,
    /// Keep only the first N digits before parsing.
    #[serde(default)]
    pub price_digit_limit: Option<usize>,
    pub url: Vec<FieldSource>,
    /// Use the listing page URL when no product link resolves.
    #[serde(default)]
    pub url_fallback_to_page: bool,
    #[serde(default)]
    pub image: Vec<FieldSource>,
    /// Attribute read from the same image element when the primary one is
    /// missing or an inline `data:` URI, e.g. `data-src`.
    #[serde(default)]
    pub image_lazy_attribute: Option<String>,
    /// Text that marks a listing as out of stock, e.g. `"Agotado"`.
    #[serde(default)]
    pub unavailable_marker: Option<String>,
    #[serde(default)]
    pub description: DescriptionStyle,
}

/// Best-effort page preparation performed after navigation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum SetupStep {
    /// Click a banner button (cookies, promos) if it shows up in time.
    Dismiss {
        selector: Selector,
        timeout_ms: u64,
        #[serde(default)]
        settle_ms: u64,
    },
    Pause { ms: u64 },
    /// Pick a delivery comuna through the location modal, unless `ready`
    /// shows up first (prices already visible).
    SelectLocation {
        ready: Selector,
        ready_timeout_ms: u64,
        opener: Selector,
        opener_timeout_ms: u64,
        input: Selector,
        comuna: String,
        result: Selector,
        #[serde(default)]
        settle_ms: u64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrollSettings {
    /// Pause after each scroll to the bottom.
    pub settle_ms: u64,
    /// Consecutive unchanged height readings that end the loop.
    pub stall_threshold: u32,
    /// Pixels scrolled back up on a stall before returning to the bottom.
    pub bounce_offset: u32,
    pub bounce_settle_ms: u64,
    #[serde(default)]
    pub load_more: Option<Selector>,
    #[serde(default)]
    pub load_more_settle_ms: u64,
    /// Hard cap on scroll rounds. Unset means the stall counter is the only
    /// exit.
    #[serde(default)]
    pub max_rounds: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    pub slug: String,
    /// Display name, e.g. `"Santa Isabel"`.
    pub name: String,
    /// Integer id of the supermarket in the downstream import.
    pub store_id: u32,
    /// Prefix for relative hrefs.
    pub base_url: Url,
    pub target_url: Url,
    /// Written into the fixture's `tipo`.
    #[serde(default = "default_category")]
    pub category: String,
    pub output_file: String,
    /// One match per product listing.
    pub container: Selector,
    /// Pause right after navigation.
    #[serde(default)]
    pub settle_ms: u64,
    #[serde(default)]
    pub setup: Vec<SetupStep>,
    #[serde(default = "default_catalog_timeout_ms")]
    pub catalog_timeout_ms: u64,
    #[serde(default)]
    pub on_missing_catalog: FailurePolicy,
    /// Pause once the catalog is visible.
    #[serde(default)]
    pub catalog_settle_ms: u64,
    #[serde(default)]
    pub scroll: Option<ScrollSettings>,
    #[serde(default = "default_on_scroll_failure")]
    pub on_scroll_failure: FailurePolicy,
    /// Container attribute (e.g. `href`) identifying a listing; containers
    /// repeating a value already seen in this run are passed over before
    /// extraction.
    #[serde(default)]
    pub container_key_attribute: Option<String>,
    pub fields: FieldStrategy,
    pub inclusion: InclusionRule,
    pub dedup: DedupStrategy,
}

fn default_category() -> String {
    "Despensa".to_string()
}

fn default_catalog_timeout_ms() -> u64 {
    20_000
}

fn default_on_scroll_failure() -> FailurePolicy {
    FailurePolicy::Abort
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoresFile {
    pub stores: Vec<StoreConfig>,
}

impl StoresFile {
    #[must_use]
    pub fn find(&self, slug: &str) -> Option<&StoreConfig> {
        self.stores.iter().find(|s| s.slug.eq_ignore_ascii_case(slug))
    }
}

/// Load and validate the stores configuration from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_stores(path: &Path) -> Result<StoresFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::StoresFileIo {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_stores(&content)
}

/// Parse and validate a stores YAML document.
///
/// # Errors
///
/// Returns `ConfigError` if the YAML is malformed or fails validation.
pub fn parse_stores(content: &str) -> Result<StoresFile, ConfigError> {
    let stores_file: StoresFile = serde_yaml::from_str(content)?;
    validate_stores(&stores_file)?;
    Ok(stores_file)
}

fn validate_stores(stores_file: &StoresFile) -> Result<(), ConfigError> {
    let mut seen_slugs = HashSet::new();

    for store in &stores_file.stores {
        let slug = store.slug.trim();
        if slug.is_empty() {
            return Err(ConfigError::Validation(
                "store slug must be non-empty".to_string(),
            ));
        }
        if !slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(ConfigError::Validation(format!(
                "store slug '{slug}' may only contain lowercase letters, digits and '-'"
            )));
        }
        if !seen_slugs.insert(slug.to_string()) {
            return Err(ConfigError::Validation(format!(
                "duplicate store slug: '{slug}'"
            )));
        }

        for (label, url) in [("base_url", &store.base_url), ("target_url", &store.target_url)] {
            if !matches!(url.scheme(), "http" | "https") {
                return Err(ConfigError::Validation(format!(
                    "store '{slug}' {label} must be http(s), got '{url}'"
                )));
            }
        }

        if store.output_file.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "store '{slug}' output_file must be non-empty"
            )));
        }
        if store.container.is_blank() {
            return Err(ConfigError::Validation(format!(
                "store '{slug}' container selector must be non-empty"
            )));
        }
        if store
            .container_key_attribute
            .as_deref()
            .is_some_and(|name| name.trim().is_empty())
        {
            return Err(ConfigError::Validation(format!(
                "store '{slug}' container_key_attribute must be non-empty"
            )));
        }
        if store.fields.name.is_empty() {
            return Err(ConfigError::Validation(format!(
                "store '{slug}' needs at least one name source"
            )));
        }
        if store.fields.url.is_empty() && !store.fields.url_fallback_to_page {
            return Err(ConfigError::Validation(format!(
                "store '{slug}' needs a url source or url_fallback_to_page"
            )));
        }
        if store.inclusion == InclusionRule::PositivePrice && store.fields.price.is_empty() {
            return Err(ConfigError::Validation(format!(
                "store '{slug}' keeps only positive prices but has no price source"
            )));
        }
        if store.fields.price_digit_limit == Some(0) {
            return Err(ConfigError::Validation(format!(
                "store '{slug}' price_digit_limit must be at least 1"
            )));
        }
        if let Some(scroll) = &store.scroll {
            if scroll.stall_threshold == 0 {
                return Err(ConfigError::Validation(format!(
                    "store '{slug}' scroll.stall_threshold must be at least 1"
                )));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "stores_test.rs"]
mod tests;
