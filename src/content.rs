//! Content collaborators: where entry bodies and interactive fragments come
//! from.
//!
//! The build core never reads post files directly. It asks a
//! [`ContentSource`] for an entry's raw body and a [`FragmentRegistry`] for the
//! markup of a named fragment, both addressed by slug. [`FsContent`]
//! implements both over the content directory:
//!
//! ```text
//! content/
//! ├── catalog.toml
//! ├── posts/
//! │   ├── element-vs-node.md                    # body of "element-vs-node"
//! │   └── mouseenter-vs-mouseover.md
//! └── fragments/
//!     └── mouseenter-vs-mouseover/
//!         └── MouseOverDemo.html                # {% fragment "MouseOverDemo" %}
//! ```
//!
//! [`MemoryContent`] holds the same data in maps, for tests and for callers
//! that assemble content programmatically.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Directory holding `<slug>.md` bodies.
pub const POSTS_DIR: &str = "posts";
/// Directory holding `<slug>/<Name>.html` fragments.
pub const FRAGMENTS_DIR: &str = "fragments";

/// Supplies each entry's raw markdown body.
pub trait ContentSource: Sync {
    fn body(&self, slug: &str) -> io::Result<String>;
}

/// Resolves named interactive fragments bound to an entry.
pub trait FragmentRegistry: Sync {
    /// Markup for fragment `name` of entry `slug`, if one exists.
    fn resolve(&self, slug: &str, name: &str) -> Option<String>;
}

/// Filesystem-backed content rooted at the content directory.
#[derive(Debug, Clone)]
pub struct FsContent {
    root: PathBuf,
}

impl FsContent {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    pub fn body_path(&self, slug: &str) -> PathBuf {
        self.root.join(POSTS_DIR).join(format!("{slug}.md"))
    }

    pub fn fragment_path(&self, slug: &str, name: &str) -> PathBuf {
        self.root
            .join(FRAGMENTS_DIR)
            .join(slug)
            .join(format!("{name}.html"))
    }
}

impl ContentSource for FsContent {
    fn body(&self, slug: &str) -> io::Result<String> {
        fs::read_to_string(self.body_path(slug))
    }
}

impl FragmentRegistry for FsContent {
    fn resolve(&self, slug: &str, name: &str) -> Option<String> {
        if !is_fragment_name(name) {
            return None;
        }
        fs::read_to_string(self.fragment_path(slug, name)).ok()
    }
}

/// Fragment names are identifiers: ASCII alphanumerics, `_` and `-`.
pub fn is_fragment_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// In-memory content.
#[derive(Debug, Clone, Default)]
pub struct MemoryContent {
    bodies: HashMap<String, String>,
    fragments: HashMap<(String, String), String>,
}

impl MemoryContent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_body(mut self, slug: &str, body: &str) -> Self {
        self.bodies.insert(slug.to_string(), body.to_string());
        self
    }

    pub fn with_fragment(mut self, slug: &str, name: &str, markup: &str) -> Self {
        self.fragments
            .insert((slug.to_string(), name.to_string()), markup.to_string());
        self
    }
}

impl ContentSource for MemoryContent {
    fn body(&self, slug: &str) -> io::Result<String> {
        self.bodies.get(slug).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("no body for {slug}"))
        })
    }
}

impl FragmentRegistry for MemoryContent {
    fn resolve(&self, slug: &str, name: &str) -> Option<String> {
        self.fragments
            .get(&(slug.to_string(), name.to_string()))
            .cloned()
    }
}
