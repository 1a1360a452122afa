//! Site configuration module.
//!
//! Handles loading, validating, and merging `config.toml`. Stock defaults are
//! serialized to a TOML value, the user's `config.toml` in the content root is
//! merged on top of them, and the result is deserialized and validated once.
//! The resulting [`SiteConfig`] is immutable for the whole build and is passed
//! by reference into every stage; nothing reads configuration from ambient
//! state.
//!
//! ## Config File Location
//!
//! ```text
//! content/
//! ├── config.toml      # Site config (optional)
//! ├── catalog.toml     # The entry catalog
//! └── posts/
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [site]
//! title = "this vs that"
//! tagline = "What is the difference between ___ and ___ in the front-end development?"
//! # url = "https://thisthat.dev"          # enables sitemap.xml and feed.xml
//! # repository = "https://github.com/..." # enables "Edit this page" + star button
//! # author = "..."
//!
//! [catalog]
//! layout = "grouped"                # "grouped" or "flat"
//! uncategorized_label = "Uncategorized"
//! nav_label = "title"               # "title" or "slug"
//! related_count = 3
//!
//! [markdown]
//! raw_html = true
//! hard_breaks = true
//! autolink = true
//! highlight = true
//!
//! [minify]
//! enabled = true
//! remove_optional_tags = true
//! sort_attributes = true
//! sort_class_names = true
//!
//! [passthrough]
//! paths = ["assets", "css", "robots.txt"]
//!
//! [badge]
//! # stars_file = "stars.json"
//! fallback = 0
//!
//! [processing]
//! max_processes = 4         # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::slug::is_reserved;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Component, Path};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Site configuration loaded from `config.toml`.
///
/// All fields have sensible defaults. User config files need only specify
/// the values they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Site identity: title, tagline, canonical URL, source repository.
    pub site: SiteInfo,
    /// Catalog shape and navigation settings.
    pub catalog: CatalogConfig,
    /// Markdown rendering options.
    pub markdown: MarkdownConfig,
    /// HTML minification settings.
    pub minify: MinifyConfig,
    /// Static paths copied verbatim into the output.
    pub passthrough: PassthroughConfig,
    /// Star-count badge settings.
    pub badge: BadgeConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl SiteConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.site.title.trim().is_empty() {
            return Err(ConfigError::Validation(
                "site.title must not be empty".into(),
            ));
        }
        if let Some(url) = &self.site.url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::Validation(format!(
                    "site.url must start with http:// or https://, got {url:?}"
                )));
            }
        }
        if self.catalog.uncategorized_label.trim().is_empty() {
            return Err(ConfigError::Validation(
                "catalog.uncategorized_label must not be empty".into(),
            ));
        }
        if self.catalog.related_count > MAX_RELATED {
            return Err(ConfigError::Validation(format!(
                "catalog.related_count must be at most {MAX_RELATED}"
            )));
        }
        for path in &self.passthrough.paths {
            let p = Path::new(path);
            let escapes = p.is_absolute()
                || p.components()
                    .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
            if path.is_empty() || escapes {
                return Err(ConfigError::Validation(format!(
                    "passthrough.paths entries must be relative paths inside the content root, got {path:?}"
                )));
            }
            let top = p.components().find_map(|c| match c {
                Component::Normal(name) => name.to_str(),
                _ => None,
            });
            if top.is_some_and(is_reserved) {
                return Err(ConfigError::Validation(format!(
                    "passthrough.paths entry {path:?} would overwrite a generated site page"
                )));
            }
        }
        Ok(())
    }
}

const MAX_RELATED: usize = 20;

/// Site identity shown in page metadata and chrome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteInfo {
    /// Site name, used as the `<title>` prefix.
    pub title: String,
    /// One-line description used on the home page and as its meta description.
    pub tagline: String,
    /// Canonical base URL. When set, `sitemap.xml` is generated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Source repository URL. Enables "Edit this page" links and the star button.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    /// Author name for the `author` meta tag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

impl Default for SiteInfo {
    fn default() -> Self {
        Self {
            title: "this vs that".to_string(),
            tagline: "What is the difference between ___ and ___ in the front-end development?"
                .to_string(),
            url: None,
            repository: None,
            author: None,
        }
    }
}

/// How the home page presents the catalog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogLayout {
    /// One section per category, sorted by category label.
    #[default]
    Grouped,
    /// A single list in catalog order; categories are ignored.
    Flat,
}

/// Which text labels prev/next navigation links.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NavLabel {
    /// The entry's title.
    #[default]
    Title,
    /// The entry's slug, unslugified.
    Slug,
}

/// Catalog shape and navigation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CatalogConfig {
    /// Grouped-by-category or flat home page.
    pub layout: CatalogLayout,
    /// Bucket label for entries without a category (grouped layout only).
    pub uncategorized_label: String,
    /// Label source for prev/next links.
    pub nav_label: NavLabel,
    /// Number of "more comparisons" suggestions per entry page (0 disables).
    pub related_count: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            layout: CatalogLayout::Grouped,
            uncategorized_label: "Uncategorized".to_string(),
            nav_label: NavLabel::Title,
            related_count: 3,
        }
    }
}

/// Markdown rendering options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MarkdownConfig {
    /// Pass raw inline/block HTML through. When false, it is escaped as text.
    pub raw_html: bool,
    /// Treat single newlines as `<br>` line breaks.
    pub hard_breaks: bool,
    /// Turn bare `http(s)://` URLs into links.
    pub autolink: bool,
    /// Syntax-highlight fenced code blocks that name a known language.
    pub highlight: bool,
}

impl Default for MarkdownConfig {
    fn default() -> Self {
        Self {
            raw_html: true,
            hard_breaks: true,
            autolink: true,
            highlight: true,
        }
    }
}

/// HTML minification settings.
///
/// Whitespace collapsing and comment removal always apply when enabled; the
/// remaining switches exist for debugging output diffs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MinifyConfig {
    /// Minify `.html` outputs at all.
    pub enabled: bool,
    /// Drop closing tags the HTML grammar allows to be omitted.
    pub remove_optional_tags: bool,
    /// Emit attributes sorted by name.
    pub sort_attributes: bool,
    /// Emit `class` tokens sorted.
    pub sort_class_names: bool,
}

impl Default for MinifyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            remove_optional_tags: true,
            sort_attributes: true,
            sort_class_names: true,
        }
    }
}

/// Static paths (relative to the content root) mirrored into the output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PassthroughConfig {
    pub paths: Vec<String>,
}

impl Default for PassthroughConfig {
    fn default() -> Self {
        Self {
            paths: vec![
                "assets".to_string(),
                "css".to_string(),
                "robots.txt".to_string(),
            ],
        }
    }
}

/// Star-count badge settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BadgeConfig {
    /// JSON file (relative to the content root) in the shape of the GitHub
    /// repository API response. Read best-effort.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stars_file: Option<String>,
    /// Value shown when the star count is unavailable.
    pub fallback: u64,
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel page workers.
    /// When absent or null, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(SiteConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a `config.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if no `config.toml` exists in the directory.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = path.join("config.toml");
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<SiteConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: SiteConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `config.toml` in the given directory.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(root: &Path) -> Result<SiteConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(root)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# thisthat Configuration
# ======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Place this file at content/config.toml, next to catalog.toml.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Site identity
# ---------------------------------------------------------------------------
[site]
# Site name, used as the prefix of every page <title>.
title = "this vs that"

# Home page heading and meta description.
tagline = "What is the difference between ___ and ___ in the front-end development?"

# Canonical base URL. When set, sitemap.xml and an RSS feed.xml are generated.
# url = "https://thisthat.dev"

# Source repository. When set, entry pages get an "Edit this page" link
# and the header shows a star button.
# repository = "https://github.com/phuoc-ng/this-vs-that"

# Author name for the author meta tag.
# author = "Nguyen Huu Phuoc"

# ---------------------------------------------------------------------------
# Catalog
# ---------------------------------------------------------------------------
[catalog]
# "grouped": one home page section per category, sorted by label.
# "flat": a single list in catalog order.
layout = "grouped"

# Section label for entries that have no category (grouped layout only).
uncategorized_label = "Uncategorized"

# Label of prev/next links: "title" or "slug" (unslugified).
nav_label = "title"

# Number of "more comparisons" suggestions on each entry page (0 disables).
related_count = 3

# ---------------------------------------------------------------------------
# Markdown
# ---------------------------------------------------------------------------
[markdown]
# Pass raw HTML in post bodies through to the page.
raw_html = true

# Treat single newlines as line breaks.
hard_breaks = true

# Turn bare http(s):// URLs into links.
autolink = true

# Highlight fenced code blocks that name a language (```js, ```css, ...).
# Tokens become <span> elements with scope classes; style them in CSS.
highlight = true

# ---------------------------------------------------------------------------
# HTML minification
# ---------------------------------------------------------------------------
[minify]
enabled = true
remove_optional_tags = true
sort_attributes = true
sort_class_names = true

# ---------------------------------------------------------------------------
# Static files copied verbatim (relative to the content root)
# ---------------------------------------------------------------------------
[passthrough]
paths = ["assets", "css", "robots.txt"]

# ---------------------------------------------------------------------------
# Star button
# ---------------------------------------------------------------------------
[badge]
# JSON file shaped like the GitHub repository API response
# ({"stargazers_count": 123}). Read best-effort; never fails the build.
# stars_file = "stars.json"

# Count shown when the file is missing or unreadable.
fallback = 0

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel page workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
