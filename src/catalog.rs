//! Catalog loading.
//!
//! The catalog is the single source of truth for a build: an ordered list of
//! entries, each a flat `{slug?, title?, category?}` record. It is read from
//! `catalog.toml` in the content root:
//!
//! ```toml
//! [[entries]]
//! slug = "element-vs-node"
//! title = "Element vs Node"
//! category = "DOM"
//!
//! [[entries]]
//! title = "class vs id"       # slug derived: "class-vs-id"
//! category = "HTML"
//! ```
//!
//! ## Rules
//!
//! - Order is significant: it defines prev/next navigation.
//! - A missing `slug` is derived from `title` with [`slugify`]; a missing
//!   `title` is derived from `slug` with [`unslugify`]. An entry with neither
//!   is rejected.
//! - Slugs must be unique. A duplicate is a data defect and fails the load
//!   before anything is rendered.
//! - Explicit slugs must be URL-safe. Derived slugs only need to be usable as a
//!   directory name and a link (see the limitations documented in
//!   [`crate::slug`]).
//! - No slug may take a site page's name (`index.html`, `404.html`, ...).
//! - Titles are stored trimmed, so a derived slug is always `slugify(title)`.
//! - A blank `category` is the same as no category.
//!
//! Loading is deterministic and performs no I/O besides reading the catalog.

use crate::slug::{is_path_safe, is_reserved, is_url_safe, slugify, unslugify};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Catalog file name inside the content root.
pub const CATALOG_FILE: &str = "catalog.toml";

/// Errors that make a catalog unusable. Positions are 1-based.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("IO error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Catalog parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Duplicate slug {slug:?} at entries {first} and {second}")]
    DuplicateSlug {
        slug: String,
        first: usize,
        second: usize,
    },
    #[error("Entry {position} has neither a title nor a slug")]
    MissingTitle { position: usize },
    #[error("Entry {position} has an invalid slug {slug:?}")]
    InvalidSlug { position: usize, slug: String },
    #[error("Entry {position} uses the reserved name {slug:?} as its slug")]
    ReservedSlug { position: usize, slug: String },
}

/// One catalog record as written by the author.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl RawEntry {
    pub fn new(slug: &str, title: &str, category: Option<&str>) -> Self {
        Self {
            slug: Some(slug.to_string()),
            title: Some(title.to_string()),
            category: category.map(str::to_string),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CatalogFile {
    #[serde(default)]
    entries: Vec<RawEntry>,
}

/// A validated article record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    pub slug: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl Entry {
    pub fn has_category(&self) -> bool {
        self.category.is_some()
    }
}

/// The ordered, slug-unique collection of entries for one build.
///
/// Immutable once loaded; derived views borrow from it.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: Vec<Entry>,
    positions: HashMap<String, usize>,
}

impl Catalog {
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Entry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up an entry by slug.
    pub fn get(&self, slug: &str) -> Option<&Entry> {
        self.position(slug).map(|i| &self.entries[i])
    }

    /// Zero-based position of `slug` in catalog order.
    pub fn position(&self, slug: &str) -> Option<usize> {
        self.positions.get(slug).copied()
    }

    /// Whether any entry carries a category.
    pub fn has_categories(&self) -> bool {
        self.entries.iter().any(Entry::has_category)
    }
}

impl<'a> IntoIterator for &'a Catalog {
    type Item = &'a Entry;
    type IntoIter = std::slice::Iter<'a, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Build a catalog from raw records, preserving their order.
pub fn load(raw: Vec<RawEntry>) -> Result<Catalog, LoadError> {
    let mut entries = Vec::with_capacity(raw.len());
    let mut positions: HashMap<String, usize> = HashMap::with_capacity(raw.len());

    for (i, record) in raw.into_iter().enumerate() {
        let position = i + 1;
        let entry = resolve_entry(record, position)?;
        if let Some(&first) = positions.get(&entry.slug) {
            return Err(LoadError::DuplicateSlug {
                slug: entry.slug,
                first: first + 1,
                second: position,
            });
        }
        positions.insert(entry.slug.clone(), i);
        entries.push(entry);
    }

    Ok(Catalog { entries, positions })
}

/// Parse `catalog.toml` content into a catalog.
pub fn parse_catalog(content: &str) -> Result<Catalog, LoadError> {
    let file: CatalogFile = toml::from_str(content)?;
    load(file.entries)
}

/// Read and parse `catalog.toml` from the content root.
pub fn load_catalog_file(root: &Path) -> Result<Catalog, LoadError> {
    let path = root.join(CATALOG_FILE);
    let content = fs::read_to_string(&path).map_err(|source| LoadError::Io {
        path: path.clone(),
        source,
    })?;
    parse_catalog(&content)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn resolve_entry(record: RawEntry, position: usize) -> Result<Entry, LoadError> {
    let explicit_slug = non_blank(record.slug);
    let title = non_blank(record.title).map(|t| t.trim().to_string());
    let category = non_blank(record.category).map(|c| c.trim().to_string());

    let (slug, title) = match (explicit_slug, title) {
        (Some(slug), Some(title)) => {
            check_explicit(&slug, position)?;
            (slug, title)
        }
        (Some(slug), None) => {
            check_explicit(&slug, position)?;
            let title = unslugify(&slug);
            (slug, title)
        }
        (None, Some(title)) => {
            let slug = slugify(&title);
            if !is_path_safe(&slug) {
                return Err(LoadError::InvalidSlug { position, slug });
            }
            (slug, title)
        }
        (None, None) => return Err(LoadError::MissingTitle { position }),
    };
    if is_reserved(&slug) {
        return Err(LoadError::ReservedSlug { position, slug });
    }

    Ok(Entry {
        slug,
        title,
        category,
    })
}

fn check_explicit(slug: &str, position: usize) -> Result<(), LoadError> {
    if is_url_safe(slug) {
        Ok(())
    } else {
        Err(LoadError::InvalidSlug {
            position,
            slug: slug.to_string(),
        })
    }
}
