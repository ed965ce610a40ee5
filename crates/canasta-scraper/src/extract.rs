//! Turns one product container into a [`ProductRecord`] or a skip reason.
//!
//! Fields are read through the store's [`FieldStrategy`]: each field lists
//! its sources in priority order and the first non-empty, trimmed value
//! wins. A driver error anywhere in a container skips that container as a
//! whole; partial records are never produced.

use std::collections::HashMap;

use canasta_core::{
    BrandFallback, DescriptionStyle, FieldSource, FieldStrategy, InclusionRule, ProductRecord,
    StoreConfig,
};
use chrono::Utc;
use regex::Regex;
use url::Url;

use crate::driver::PageDriver;
use crate::error::ScraperError;
use crate::price::normalize_price;

/// Why a container produced no record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    MissingName,
    MissingUrl,
    /// Price normalized to zero under [`InclusionRule::PositivePrice`].
    NonPositivePrice,
    /// The browser failed while reading this container.
    Driver(String),
}

impl SkipReason {
    /// Short label for log fields and summaries.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::MissingName => "missing_name",
            Self::MissingUrl => "missing_url",
            Self::NonPositivePrice => "non_positive_price",
            Self::Driver(_) => "driver",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractOutcome {
    Record(ProductRecord),
    Skipped(SkipReason),
}

pub struct Extractor<'a> {
    store: &'a StoreConfig,
    page_url: Url,
    digit_limit: Option<usize>,
    patterns: HashMap<String, Regex>,
}

impl<'a> Extractor<'a> {
    /// Builds an extractor for `store`, with `page_url` as the URL fallback
    /// for stores that allow it.
    ///
    /// # Errors
    ///
    /// [`ScraperError::InvalidPattern`] if a `text_pattern` source is not a
    /// valid regex.
    pub fn new(store: &'a StoreConfig, page_url: Url) -> Result<Self, ScraperError> {
        Ok(Self {
            store,
            page_url,
            digit_limit: store.fields.price_digit_limit,
            patterns: compile_patterns(&store.fields)?,
        })
    }

    /// Parses every price digit, ignoring the store's digit limit.
    #[must_use]
    pub fn with_full_prices(mut self) -> Self {
        self.digit_limit = None;
        self
    }

    pub async fn extract<D: PageDriver>(&self, driver: &D, container: &D::Element) -> ExtractOutcome {
        match self.try_extract(driver, container).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::debug!(store = %self.store.slug, error = %e, "container skipped");
                ExtractOutcome::Skipped(SkipReason::Driver(e.to_string()))
            }
        }
    }

    async fn try_extract<D: PageDriver>(
        &self,
        driver: &D,
        container: &D::Element,
    ) -> Result<ExtractOutcome, ScraperError> {
        let fields = &self.store.fields;

        let Some(name) = self.resolve(driver, container, &fields.name).await? else {
            return Ok(ExtractOutcome::Skipped(SkipReason::MissingName));
        };

        let brand = match self.resolve(driver, container, &fields.brand).await? {
            Some(brand) => brand,
            None => fallback_brand(&fields.brand_fallback, &name),
        };

        let scoped = match &fields.price_scope {
            Some(scope) => driver.closest(container, scope).await?,
            None => None,
        };
        let price_scope = scoped.as_ref().unwrap_or(container);
        let price = self
            .resolve(driver, price_scope, &fields.price)
            .await?
            .map_or(0, |raw| normalize_price(&raw, fields.price_format, self.digit_limit));

        if self.store.inclusion == InclusionRule::PositivePrice && price == 0 {
            return Ok(ExtractOutcome::Skipped(SkipReason::NonPositivePrice));
        }

        let href = self.resolve(driver, container, &fields.url).await?;
        let source_url = match href.as_deref().and_then(|h| self.absolute_url(h)) {
            Some(url) => url,
            None if fields.url_fallback_to_page => self.page_url.to_string(),
            None => return Ok(ExtractOutcome::Skipped(SkipReason::MissingUrl)),
        };

        let image_url = self.resolve_image(driver, container).await?;

        let available = match fields.unavailable_marker.as_deref() {
            Some(marker) if !marker.is_empty() => !driver.text(container).await?.contains(marker),
            _ => true,
        };

        let description = match fields.description {
            DescriptionStyle::Name => name.clone(),
            DescriptionStyle::BrandAndName => format!("{brand} - {name}"),
        };

        Ok(ExtractOutcome::Record(ProductRecord {
            store_name: self.store.name.clone(),
            name,
            brand,
            description,
            price,
            source_url,
            image_url,
            available,
            captured_at: Utc::now(),
        }))
    }

    async fn resolve<D: PageDriver>(
        &self,
        driver: &D,
        scope: &D::Element,
        sources: &[FieldSource],
    ) -> Result<Option<String>, ScraperError> {
        for source in sources {
            if let Some(value) = non_empty(self.read_source(driver, scope, source).await?) {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    async fn read_source<D: PageDriver>(
        &self,
        driver: &D,
        scope: &D::Element,
        source: &FieldSource,
    ) -> Result<Option<String>, ScraperError> {
        match source {
            FieldSource::Attribute { name } => driver.attribute(scope, name).await,
            FieldSource::ChildText { selector } => match driver.find_within(scope, selector).await? {
                Some(child) => driver.text(&child).await.map(Some),
                None => Ok(None),
            },
            FieldSource::ChildAttribute { selector, name } => {
                match driver.find_within(scope, selector).await? {
                    Some(child) => driver.attribute(&child, name).await,
                    None => Ok(None),
                }
            }
            FieldSource::TextPattern { pattern } => {
                let Some(re) = self.patterns.get(pattern) else {
                    return Ok(None);
                };
                let text = driver.text(scope).await?;
                Ok(re.find(&text).map(|m| m.as_str().to_string()))
            }
        }
    }

    /// Image sources read the lazy-load attribute from the same element when
    /// the primary attribute is missing or an inline `data:` URI.
    async fn resolve_image<D: PageDriver>(
        &self,
        driver: &D,
        container: &D::Element,
    ) -> Result<Option<String>, ScraperError> {
        let fields = &self.store.fields;
        for source in &fields.image {
            let raw = match source {
                FieldSource::Attribute { name } => {
                    self.read_image_attr(driver, container, name).await?
                }
                FieldSource::ChildAttribute { selector, name } => {
                    match driver.find_within(container, selector).await? {
                        Some(img) => self.read_image_attr(driver, &img, name).await?,
                        None => None,
                    }
                }
                other => non_empty(self.read_source(driver, container, other).await?),
            };
            if let Some(url) = raw.as_deref().and_then(|r| self.absolute_url(r)) {
                return Ok(Some(url));
            }
        }
        Ok(None)
    }

    async fn read_image_attr<D: PageDriver>(
        &self,
        driver: &D,
        element: &D::Element,
        name: &str,
    ) -> Result<Option<String>, ScraperError> {
        let primary = non_empty(driver.attribute(element, name).await?);
        if primary.as_deref().is_some_and(|src| !is_data_uri(src)) {
            return Ok(primary);
        }
        match self.store.fields.image_lazy_attribute.as_deref() {
            Some(lazy) => Ok(non_empty(driver.attribute(element, lazy).await?)),
            None => Ok(primary),
        }
    }

    /// Resolves `href` against the store's base URL; only http(s) results
    /// are kept.
    fn absolute_url(&self, href: &str) -> Option<String> {
        if is_data_uri(href) {
            return None;
        }
        let url = self.store.base_url.join(href).ok()?;
        matches!(url.scheme(), "http" | "https").then(|| url.to_string())
    }
}

fn compile_patterns(fields: &FieldStrategy) -> Result<HashMap<String, Regex>, ScraperError> {
    let mut patterns = HashMap::new();
    let all_sources = fields
        .name
        .iter()
        .chain(&fields.brand)
        .chain(&fields.price)
        .chain(&fields.url)
        .chain(&fields.image);
    for source in all_sources {
        if let FieldSource::TextPattern { pattern } = source {
            if patterns.contains_key(pattern) {
                continue;
            }
            let re = Regex::new(pattern).map_err(|source| ScraperError::InvalidPattern {
                pattern: pattern.clone(),
                source,
            })?;
            patterns.insert(pattern.clone(), re);
        }
    }
    Ok(patterns)
}

fn fallback_brand(fallback: &BrandFallback, name: &str) -> String {
    match fallback {
        BrandFallback::FirstToken => name
            .split_whitespace()
            .next()
            .unwrap_or(name)
            .to_string(),
        BrandFallback::Placeholder { value } => value.clone(),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn is_data_uri(value: &str) -> bool {
    value.trim_start().get(..5).is_some_and(|p| p.eq_ignore_ascii_case("data:"))
}
