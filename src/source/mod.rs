//! Location list loading
//!
//! Reads a newline-delimited list of URLs. Blank lines and `#` comments are
//! skipped; lines that are not absolute http(s) URLs are skipped with a
//! warning, so the pipeline only ever sees well-formed locations.

use std::path::Path;
use thiserror::Error;
use url::Url;

/// Errors raised while loading a location list
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Failed to read location list {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
}

/// Loads locations from a file, preserving their order
///
/// Duplicate lines are kept: each occurrence is fetched independently.
///
/// # Example
///
/// ```no_run
/// use seo_sweep::source::load_locations;
/// use std::path::Path;
///
/// let locations = load_locations(Path::new("urls.txt")).unwrap();
/// println!("{} locations to sweep", locations.len());
/// ```
pub fn load_locations(path: &Path) -> Result<Vec<String>, SourceError> {
    let content = std::fs::read_to_string(path).map_err(|source| SourceError::Read {
        path: path.display().to_string(),
        source,
    })?;

    let locations = parse_locations(&content);
    tracing::info!("Loaded {} locations from {}", locations.len(), path.display());
    Ok(locations)
}

/// Parses location lines from text
pub fn parse_locations(content: &str) -> Vec<String> {
    content
        .lines()
        .enumerate()
        .filter_map(|(index, line)| {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                return None;
            }
            match Url::parse(line) {
                Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {
                    Some(line.to_string())
                }
                Ok(url) => {
                    tracing::warn!("Line {}: unsupported scheme '{}' in {}", index + 1, url.scheme(), line);
                    None
                }
                Err(e) => {
                    tracing::warn!("Line {}: skipping '{}': {}", index + 1, line, e);
                    None
                }
            }
        })
        .collect()
}
