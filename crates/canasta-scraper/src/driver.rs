//! Browser automation seam.
//!
//! Everything the scraper needs from a browser goes through [`PageDriver`],
//! so the scroll monitor, extractor and run orchestration can be exercised
//! against a scripted page in tests and against a real WebDriver session
//! ([`crate::webdriver::WebDriverPage`]) in production.

use std::time::Duration;

use canasta_core::Selector;

use crate::error::ScraperError;

/// A single open page in a browser session.
///
/// Element handles are opaque to callers; they are only valid for the page
/// that produced them.
#[allow(async_fn_in_trait)]
pub trait PageDriver {
    type Element;

    /// Navigate and wait for the document to load, up to `timeout`.
    async fn goto(&self, url: &str, timeout: Duration) -> Result<(), ScraperError>;

    /// Wait until at least one element matches `selector`.
    ///
    /// # Errors
    ///
    /// [`ScraperError::Timeout`] when nothing matches within `timeout`.
    async fn wait_for(&self, selector: &Selector, timeout: Duration) -> Result<(), ScraperError>;

    /// Click the first element matching `selector`.
    async fn click(&self, selector: &Selector) -> Result<(), ScraperError>;

    /// Type `text` into the first input matching `selector`.
    async fn fill(&self, selector: &Selector, text: &str) -> Result<(), ScraperError>;

    /// `true` when the first match of `selector` exists and is displayed.
    async fn is_visible(&self, selector: &Selector) -> Result<bool, ScraperError>;

    /// Run a script in the page and return its JSON result.
    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, ScraperError>;

    async fn find_all(&self, selector: &Selector) -> Result<Vec<Self::Element>, ScraperError>;

    /// First descendant of `element` matching `selector`, if any.
    async fn find_within(
        &self,
        element: &Self::Element,
        selector: &Selector,
    ) -> Result<Option<Self::Element>, ScraperError>;

    /// Rendered text of `element` including its descendants.
    async fn text(&self, element: &Self::Element) -> Result<String, ScraperError>;

    async fn attribute(
        &self,
        element: &Self::Element,
        name: &str,
    ) -> Result<Option<String>, ScraperError>;

    /// Nearest enclosing element of `element` matching `selector`.
    ///
    /// XPath selectors are evaluated relative to `element` and should use
    /// the `ancestor::` axis.
    async fn closest(
        &self,
        element: &Self::Element,
        selector: &Selector,
    ) -> Result<Option<Self::Element>, ScraperError>;

    /// End the browser session.
    async fn close(self) -> Result<(), ScraperError>
    where
        Self: Sized;
}

pub(crate) const HEIGHT_SCRIPT: &str = "return document.body.scrollHeight;";
pub(crate) const SCROLL_BOTTOM_SCRIPT: &str = "window.scrollTo(0, document.body.scrollHeight);";

/// Reads the document's scrollable height.
///
/// # Errors
///
/// [`ScraperError::Script`] when the page returns something other than a
/// non-negative number.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub async fn document_height<D: PageDriver>(driver: &D) -> Result<u64, ScraperError> {
    let value = driver.evaluate(HEIGHT_SCRIPT).await?;
    value
        .as_u64()
        .or_else(|| {
            value
                .as_f64()
                .filter(|h| h.is_finite() && *h >= 0.0)
                // Heights are whole pixels; fractional zoom values round down.
                .map(|h| h.floor() as u64)
        })
        .ok_or_else(|| ScraperError::Script {
            script: HEIGHT_SCRIPT.to_string(),
            reason: format!("expected a non-negative number, got {value}"),
        })
}

pub async fn scroll_to_bottom<D: PageDriver>(driver: &D) -> Result<(), ScraperError> {
    driver.evaluate(SCROLL_BOTTOM_SCRIPT).await.map(|_| ())
}

/// Scrolls up by `offset` pixels.
pub async fn scroll_up<D: PageDriver>(driver: &D, offset: u32) -> Result<(), ScraperError> {
    driver
        .evaluate(&format!("window.scrollBy(0, -{offset});"))
        .await
        .map(|_| ())
}
