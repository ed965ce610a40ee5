//! [`PageDriver`] over a W3C WebDriver session (chromedriver by default).

use std::time::Duration;

use canasta_core::{Selector, SelectorKind};
use fantoccini::elements::{Element, ElementRef};
use fantoccini::error::CmdError;
use fantoccini::wd::TimeoutConfiguration;
use fantoccini::{Client, ClientBuilder, Locator};
use serde_json::json;

use crate::driver::PageDriver;
use crate::error::ScraperError;

/// W3C key under which a script result carries an element reference.
const WEB_ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

const CLOSEST_SCRIPT: &str = "return arguments[0].closest(arguments[1]);";

/// Browser session settings, usually built from [`canasta_core::AppConfig`].
#[derive(Debug, Clone)]
pub struct BrowserOptions {
    pub webdriver_url: String,
    pub headless: bool,
    pub user_agent: String,
    pub window_width: u32,
    pub window_height: u32,
    /// Session page-load timeout, so the browser itself abandons a slow
    /// navigation instead of leaving it in flight.
    pub page_load_timeout: Duration,
}

impl From<&canasta_core::AppConfig> for BrowserOptions {
    fn from(config: &canasta_core::AppConfig) -> Self {
        Self {
            webdriver_url: config.webdriver_url.clone(),
            headless: config.headless,
            user_agent: config.user_agent.clone(),
            window_width: config.window_width,
            window_height: config.window_height,
            page_load_timeout: Duration::from_secs(config.nav_timeout_secs),
        }
    }
}

impl BrowserOptions {
    /// Chrome capabilities carrying the user agent, window size and
    /// headless flag.
    #[must_use]
    pub fn capabilities(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut args = vec![
            format!("--user-agent={}", self.user_agent),
            format!("--window-size={},{}", self.window_width, self.window_height),
            "--lang=es-CL".to_string(),
        ];
        if self.headless {
            args.push("--headless=new".to_string());
        }

        let mut caps = serde_json::Map::new();
        caps.insert("browserName".to_string(), json!("chrome"));
        caps.insert("goog:chromeOptions".to_string(), json!({ "args": args }));
        caps
    }
}

/// One page in a fresh WebDriver session. Dropping it without calling
/// [`PageDriver::close`] leaves the browser running.
pub struct WebDriverPage {
    client: Client,
}

impl WebDriverPage {
    /// Starts a new browser session.
    ///
    /// # Errors
    ///
    /// [`ScraperError::Session`] if the WebDriver endpoint is unreachable or
    /// rejects the capabilities.
    pub async fn connect(options: &BrowserOptions) -> Result<Self, ScraperError> {
        let client = ClientBuilder::native()
            .capabilities(options.capabilities())
            .connect(&options.webdriver_url)
            .await?;
        if let Err(e) = client
            .set_window_size(options.window_width, options.window_height)
            .await
        {
            tracing::debug!(error = %e, "window resize not supported by driver");
        }
        let timeouts = TimeoutConfiguration::new(None, Some(options.page_load_timeout), None);
        if let Err(e) = client.update_timeouts(timeouts).await {
            tracing::warn!(error = %e, "could not set page-load timeout");
        }
        tracing::debug!(webdriver_url = %options.webdriver_url, "browser session started");
        Ok(Self { client })
    }
}

fn locator(selector: &Selector) -> Locator<'_> {
    match selector.kind() {
        SelectorKind::Css(css) => Locator::Css(css),
        SelectorKind::XPath(xpath) => Locator::XPath(xpath),
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Maps "no such element" to `None`, everything else to an error.
fn optional(result: Result<Element, CmdError>) -> Result<Option<Element>, ScraperError> {
    match result {
        Ok(element) => Ok(Some(element)),
        Err(e) if e.is_no_such_element() => Ok(None),
        Err(e) => Err(e.into()),
    }
}

impl PageDriver for WebDriverPage {
    type Element = Element;

    async fn goto(&self, url: &str, timeout: Duration) -> Result<(), ScraperError> {
        match tokio::time::timeout(timeout, self.client.goto(url)).await {
            Ok(result) => result.map_err(ScraperError::from),
            Err(_) => Err(ScraperError::Timeout {
                target: url.to_string(),
                timeout_ms: millis(timeout),
            }),
        }
    }

    async fn wait_for(&self, selector: &Selector, timeout: Duration) -> Result<(), ScraperError> {
        match self
            .client
            .wait()
            .at_most(timeout)
            .for_element(locator(selector))
            .await
        {
            Ok(_) => Ok(()),
            Err(CmdError::WaitTimeout) => Err(ScraperError::Timeout {
                target: selector.to_string(),
                timeout_ms: millis(timeout),
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn click(&self, selector: &Selector) -> Result<(), ScraperError> {
        let element = optional(self.client.find(locator(selector)).await)?.ok_or_else(|| {
            ScraperError::NotFound {
                selector: selector.to_string(),
            }
        })?;
        element.click().await?;
        Ok(())
    }

    async fn fill(&self, selector: &Selector, text: &str) -> Result<(), ScraperError> {
        let element = optional(self.client.find(locator(selector)).await)?.ok_or_else(|| {
            ScraperError::NotFound {
                selector: selector.to_string(),
            }
        })?;
        element.clear().await?;
        element.send_keys(text).await?;
        Ok(())
    }

    async fn is_visible(&self, selector: &Selector) -> Result<bool, ScraperError> {
        match optional(self.client.find(locator(selector)).await)? {
            Some(element) => Ok(element.is_displayed().await?),
            None => Ok(false),
        }
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, ScraperError> {
        Ok(self.client.execute(script, Vec::new()).await?)
    }

    async fn find_all(&self, selector: &Selector) -> Result<Vec<Element>, ScraperError> {
        Ok(self.client.find_all(locator(selector)).await?)
    }

    async fn find_within(
        &self,
        element: &Element,
        selector: &Selector,
    ) -> Result<Option<Element>, ScraperError> {
        optional(element.find(locator(selector)).await)
    }

    async fn text(&self, element: &Element) -> Result<String, ScraperError> {
        Ok(element.text().await?)
    }

    async fn attribute(&self, element: &Element, name: &str) -> Result<Option<String>, ScraperError> {
        Ok(element.attr(name).await?)
    }

    async fn closest(
        &self,
        element: &Element,
        selector: &Selector,
    ) -> Result<Option<Element>, ScraperError> {
        let css = match selector.kind() {
            SelectorKind::XPath(_) => return self.find_within(element, selector).await,
            SelectorKind::Css(css) => css,
        };

        let args = vec![serde_json::to_value(element)?, json!(css)];
        let value = self.client.execute(CLOSEST_SCRIPT, args).await?;
        if value.is_null() {
            return Ok(None);
        }

        let id = value
            .get(WEB_ELEMENT_KEY)
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| ScraperError::Script {
                script: CLOSEST_SCRIPT.to_string(),
                reason: format!("expected an element reference, got {value}"),
            })?;
        Ok(Some(Element::from_element_id(
            self.client.clone(),
            ElementRef::from(id.to_string()),
        )))
    }

    async fn close(self) -> Result<(), ScraperError> {
        self.client.close().await?;
        tracing::debug!("browser session closed");
        Ok(())
    }
}
