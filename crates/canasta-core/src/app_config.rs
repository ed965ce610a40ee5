use std::path::PathBuf;

/// Process-wide settings shared by every store run.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// W3C WebDriver endpoint (chromedriver, geckodriver, selenium).
    pub webdriver_url: String,
    pub log_level: String,
    pub stores_path: PathBuf,
    /// Directory the per-store fixture files are written into.
    pub output_dir: PathBuf,
    pub headless: bool,
    pub user_agent: String,
    pub window_width: u32,
    pub window_height: u32,
    pub nav_timeout_secs: u64,
    /// Model label written into every fixture, e.g. `"tucanasta.producto"`.
    pub model_name: String,
    /// ISO 4217 code written into every fixture's `moneda` field.
    pub currency: String,
}
