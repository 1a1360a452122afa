//! Repository star count for the header button.
//!
//! The count is decoration: a build must never fail or wait on it. It comes
//! from a [`StarSource`]; any error is logged and replaced by the configured
//! fallback. The stock source reads a JSON file in the shape of the GitHub
//! repository API response, which a CI step can refresh before building:
//!
//! ```json
//! { "stargazers_count": 1234 }
//! ```
//!
//! No network access happens here.

use crate::config::BadgeConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BadgeError {
    #[error("no star source configured")]
    NotConfigured,
    #[error("could not read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not parse {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Something that knows the repository's star count.
pub trait StarSource {
    fn stars(&self) -> Result<u64, BadgeError>;
}

/// The fields we read from a repository API response.
#[derive(Debug, Deserialize)]
struct RepositoryInfo {
    stargazers_count: u64,
}

/// Star count read from a JSON file.
#[derive(Debug, Clone)]
pub struct FileStarSource {
    path: PathBuf,
}

impl FileStarSource {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }
}

impl StarSource for FileStarSource {
    fn stars(&self) -> Result<u64, BadgeError> {
        let content = std::fs::read_to_string(&self.path).map_err(|source| BadgeError::Io {
            path: self.path.clone(),
            source,
        })?;
        let info: RepositoryInfo =
            serde_json::from_str(&content).map_err(|source| BadgeError::Json {
                path: self.path.clone(),
                source,
            })?;
        Ok(info.stargazers_count)
    }
}

/// Source used when `badge.stars_file` is unset.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoStarSource;

impl StarSource for NoStarSource {
    fn stars(&self) -> Result<u64, BadgeError> {
        Err(BadgeError::NotConfigured)
    }
}

/// Star source for a content root and its badge settings.
pub fn source_for(root: &Path, config: &BadgeConfig) -> Box<dyn StarSource> {
    match &config.stars_file {
        Some(file) => Box::new(FileStarSource::new(&root.join(file))),
        None => Box::new(NoStarSource),
    }
}

/// The star count, or `fallback` when the source fails.
pub fn stars_or_fallback(source: &dyn StarSource, fallback: u64) -> u64 {
    match source.stars() {
        Ok(stars) => stars,
        Err(BadgeError::NotConfigured) => fallback,
        Err(e) => {
            tracing::warn!(error = %e, fallback, "star count unavailable");
            fallback
        }
    }
}
