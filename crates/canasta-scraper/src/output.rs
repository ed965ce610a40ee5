use std::path::Path;

use canasta_core::FixtureRecord;

use crate::error::ScraperError;

/// Renders fixtures as a 2-space indented JSON array. Non-ASCII text is
/// written as-is.
///
/// # Errors
///
/// Returns [`ScraperError::Serialize`] if serialization fails.
pub fn render_fixtures(records: &[FixtureRecord]) -> Result<String, ScraperError> {
    Ok(serde_json::to_string_pretty(records)?)
}

/// Writes `records` to `path`, replacing any previous file and creating the
/// parent directory if needed.
///
/// # Errors
///
/// [`ScraperError::Output`] on any filesystem failure.
pub async fn write_fixtures(path: &Path, records: &[FixtureRecord]) -> Result<(), ScraperError> {
    let body = render_fixtures(records)?;
    let io_err = |source| ScraperError::Output {
        path: path.display().to_string(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
    }
    tokio::fs::write(path, body).await.map_err(io_err)?;

    tracing::info!(path = %path.display(), count = records.len(), "fixtures written");
    Ok(())
}
