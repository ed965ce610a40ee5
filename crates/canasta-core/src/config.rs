use crate::app_config::AppConfig;
use crate::ConfigError;

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but cannot be parsed.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but cannot be parsed.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let webdriver_url = or_default("CANASTA_WEBDRIVER_URL", "http://localhost:4444");
    if url::Url::parse(&webdriver_url).is_err() {
        return Err(ConfigError::InvalidEnvVar {
            var: "CANASTA_WEBDRIVER_URL".to_string(),
            reason: format!("\"{webdriver_url}\" is not an absolute URL"),
        });
    }

    let log_level = or_default("CANASTA_LOG_LEVEL", "info");
    let stores_path = PathBuf::from(or_default("CANASTA_STORES_PATH", "./config/stores.yaml"));
    let output_dir = PathBuf::from(or_default("CANASTA_OUTPUT_DIR", "."));
    let headless = parse_bool("CANASTA_HEADLESS", &or_default("CANASTA_HEADLESS", "true"))?;
    let user_agent = or_default("CANASTA_USER_AGENT", DEFAULT_USER_AGENT);
    let window_width = parse_u32("CANASTA_WINDOW_WIDTH", "1366")?;
    let window_height = parse_u32("CANASTA_WINDOW_HEIGHT", "800")?;
    let nav_timeout_secs = parse_u64("CANASTA_NAV_TIMEOUT_SECS", "90")?;
    let model_name = or_default("CANASTA_MODEL_NAME", "tucanasta.producto");
    let currency = or_default("CANASTA_CURRENCY", "CLP");

    Ok(AppConfig {
        webdriver_url,
        log_level,
        stores_path,
        output_dir,
        headless,
        user_agent,
        window_width,
        window_height,
        nav_timeout_secs,
        model_name,
        currency,
    })
}

/// Parse a boolean flag. Accepts `true/false`, `1/0`, `yes/no` (case-insensitive).
fn parse_bool(var: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: format!("expected a boolean, got \"{other}\""),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
