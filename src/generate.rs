//! Site build.
//!
//! Runs the whole pipeline for a loaded [`BuildInput`]:
//!
//! ```text
//! catalog ──► views (links, index) ──► per entry, in parallel:
//!                                        body → render → assemble → minify → write
//!          ──► index.html, 404.html, sitemap.xml, feed.xml ──► passthrough copy
//! ```
//!
//! ## Output Structure
//!
//! ```text
//! dist/
//! ├── index.html                     # Home page
//! ├── 404.html                       # Not found
//! ├── sitemap.xml                    # Only when site.url is set
//! ├── feed.xml                       # RSS, only when site.url is set
//! ├── element-vs-node/
//! │   └── index.html                 # One page per entry
//! ├── assets/                        # Passthrough, copied verbatim
//! ├── css/
//! └── robots.txt
//! ```
//!
//! ## Failure Policy
//!
//! Loading and configuration errors abort before anything is rendered. Entry
//! errors (missing body, bad tags, unknown fragments, malformed markup) do
//! not stop the other entries: every entry is attempted, successful ones are
//! written, and the build then fails with one [`EntryFailure`] per broken
//! entry. Site-level pages and passthrough files are only written when every
//! entry succeeded.
//!
//! ## Parallel Processing
//!
//! Entries are built in parallel with [rayon](https://docs.rs/rayon). The
//! catalog and derived views are computed once and shared read-only; each
//! entry writes its own path. Every file is written to a temporary sibling
//! and renamed into place, so a reader never sees a partial page.

use crate::assemble::{Assembler, FEED_FILE, PageDocument, SITEMAP_FILE};
use crate::badge;
use crate::catalog::{self, Catalog, Entry, LoadError};
use crate::config::{self, ConfigError, SiteConfig};
use crate::content::{ContentSource, FragmentRegistry, FsContent, MemoryContent};
use crate::minify::{Minifier, TransformError};
use crate::render::{RenderError, Renderer};
use crate::views::{SequentialLinks, compute_sequential_links, index_view};
use rayon::prelude::*;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use tempfile::NamedTempFile;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("Catalog error: {0}")]
    Load(#[from] LoadError),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("could not write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Transform(#[from] TransformError),
    #[error("entry {slug:?} would share its output directory with passthrough path {path:?}")]
    OutputCollision { slug: String, path: String },
    #[error("{} entries failed", .0.len())]
    EntriesFailed(Vec<EntryFailure>),
}

/// Why a single entry was not written.
#[derive(Error, Debug)]
pub enum EntryError {
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Transform(#[from] TransformError),
    #[error("could not write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("build cancelled before this entry started")]
    Cancelled,
}

#[derive(Debug)]
pub struct EntryFailure {
    pub slug: String,
    pub error: EntryError,
}

/// Everything a build reads. Immutable once constructed.
pub struct BuildInput {
    pub config: SiteConfig,
    pub catalog: Catalog,
    pub content: Box<dyn ContentSource>,
    pub fragments: Box<dyn FragmentRegistry>,
    pub stars: u64,
    /// Content root for passthrough copies. `None` skips them.
    pub root: Option<PathBuf>,
}

impl BuildInput {
    /// Load config, catalog, content and star count from a content directory.
    pub fn load(root: &Path) -> Result<Self, BuildError> {
        let config = config::load_config(root)?;
        let catalog = catalog::load_catalog_file(root)?;
        let source = badge::source_for(root, &config.badge);
        let stars = badge::stars_or_fallback(source.as_ref(), config.badge.fallback);
        let content = FsContent::new(root);

        tracing::debug!(
            root = %root.display(),
            entries = catalog.len(),
            stars,
            "loaded build input"
        );

        Ok(Self {
            config,
            catalog,
            content: Box::new(content.clone()),
            fragments: Box::new(content),
            stars,
            root: Some(root.to_path_buf()),
        })
    }

    /// Input backed by in-memory content, without passthrough copies.
    pub fn in_memory(config: SiteConfig, catalog: Catalog, content: MemoryContent) -> Self {
        let stars = config.badge.fallback;
        Self {
            config,
            catalog,
            content: Box::new(content.clone()),
            fragments: Box::new(content),
            stars,
            root: None,
        }
    }
}

/// Knobs that change how a build runs, not what it produces.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Entries not yet started when this flips to `true` are skipped and
    /// reported as cancelled.
    pub cancel: Option<Arc<AtomicBool>>,
    /// Render and transform everything, write nothing.
    pub dry_run: bool,
    /// Progress events for the CLI printer.
    pub events: Option<Sender<BuildEvent>>,
}

impl BuildOptions {
    fn cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    fn emit(&self, event: BuildEvent) {
        if let Some(tx) = &self.events {
            tx.send(event).ok();
        }
    }
}

/// Progress reported while a build runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildEvent {
    Started { entries: usize },
    PageBuilt {
        /// 1-based catalog position.
        position: usize,
        title: String,
        path: PathBuf,
    },
    PageFailed { slug: String, error: String },
    SitePage { path: PathBuf },
    Copied { path: PathBuf },
}

/// A document produced by the build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltPage {
    /// Path relative to the output directory.
    pub path: PathBuf,
    /// SHA-256 of the bytes written, as hex.
    pub digest: String,
    pub bytes: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    /// Entry pages in catalog order, then site pages.
    pub pages: Vec<BuiltPage>,
    /// Passthrough files, relative to the output directory, sorted.
    pub copied: Vec<PathBuf>,
    pub dry_run: bool,
}

impl BuildReport {
    pub fn entry_count(&self) -> usize {
        self.pages
            .iter()
            .filter(|p| p.path.components().count() > 1)
            .count()
    }
}

/// Shared per-build stages.
struct Pipeline<'a> {
    input: &'a BuildInput,
    links: SequentialLinks<'a>,
    renderer: Renderer,
    assembler: Assembler<'a>,
    minifier: Minifier,
    output_dir: &'a Path,
    options: &'a BuildOptions,
}

impl Pipeline<'_> {
    fn build_entry(&self, position: usize, entry: &Entry) -> Result<BuiltPage, EntryError> {
        if self.options.cancelled() {
            return Err(EntryError::Cancelled);
        }

        let body = self
            .input
            .content
            .body(&entry.slug)
            .map_err(|source| RenderError::Body {
                slug: entry.slug.clone(),
                source,
            })?;
        let tree = self.renderer.render(entry, &body)?;
        let doc = self
            .assembler
            .assemble(entry, &self.input.catalog, &self.links, &tree)?;
        let page = self.emit_document(&doc)?;

        tracing::debug!(slug = %entry.slug, bytes = page.bytes, "built entry");
        self.options.emit(BuildEvent::PageBuilt {
            position,
            title: entry.title.clone(),
            path: page.path.clone(),
        });
        Ok(page)
    }

    fn emit_document(&self, doc: &PageDocument) -> Result<BuiltPage, EntryError> {
        self.emit_bytes(&doc.output_path, doc.html.as_bytes())
    }

    /// Transform and (unless dry-running) atomically write one output file.
    fn emit_bytes(&self, relative: &Path, bytes: &[u8]) -> Result<BuiltPage, EntryError> {
        let out = self.minifier.transform(bytes, relative)?;
        if !self.options.dry_run {
            let path = self.output_dir.join(relative);
            write_atomic(&path, &out, None).map_err(|source| EntryError::Write { path, source })?;
        }
        Ok(BuiltPage {
            path: relative.to_path_buf(),
            digest: format!("{:x}", Sha256::digest(&out)),
            bytes: out.len(),
        })
    }
}

/// Build the site for `input` into `output_dir`.
pub fn generate(
    input: &BuildInput,
    output_dir: &Path,
    options: &BuildOptions,
) -> Result<BuildReport, BuildError> {
    let catalog = &input.catalog;
    let config = &input.config;
    check_output_paths(catalog, config)?;

    let pipeline = Pipeline {
        input,
        links: compute_sequential_links(catalog),
        renderer: Renderer::new(config.markdown),
        assembler: Assembler::new(config, input.fragments.as_ref(), input.stars),
        minifier: Minifier::new(config.minify),
        output_dir,
        options,
    };

    if !options.dry_run {
        fs::create_dir_all(output_dir)?;
    }
    options.emit(BuildEvent::Started {
        entries: catalog.len(),
    });

    let results: Vec<Result<BuiltPage, EntryFailure>> = catalog
        .entries()
        .par_iter()
        .enumerate()
        .map(|(i, entry)| {
            pipeline
                .build_entry(i + 1, entry)
                .map_err(|error| EntryFailure {
                    slug: entry.slug.clone(),
                    error,
                })
        })
        .collect();

    let mut pages = Vec::with_capacity(results.len() + 4);
    let mut failures = Vec::new();
    for result in results {
        match result {
            Ok(page) => pages.push(page),
            Err(failure) => {
                tracing::warn!(slug = %failure.slug, error = %failure.error, "entry failed");
                options.emit(BuildEvent::PageFailed {
                    slug: failure.slug.clone(),
                    error: failure.error.to_string(),
                });
                failures.push(failure);
            }
        }
    }
    if !failures.is_empty() {
        return Err(BuildError::EntriesFailed(failures));
    }

    let view = index_view(catalog, &config.catalog);
    let site_pages = [
        pipeline.assembler.assemble_index(catalog, &view),
        pipeline.assembler.assemble_not_found(),
    ];
    for doc in &site_pages {
        pages.push(site_page(&pipeline, &doc.output_path, doc.html.as_bytes())?);
    }
    if let Some(xml) = pipeline.assembler.sitemap(catalog) {
        pages.push(site_page(&pipeline, Path::new(SITEMAP_FILE), xml.as_bytes())?);
    }
    if let Some(xml) = pipeline.assembler.feed(catalog) {
        pages.push(site_page(&pipeline, Path::new(FEED_FILE), xml.as_bytes())?);
    }

    let copied = match &input.root {
        Some(root) if !options.dry_run => copy_passthrough(root, output_dir, config, options)?,
        _ => Vec::new(),
    };

    Ok(BuildReport {
        pages,
        copied,
        dry_run: options.dry_run,
    })
}

/// Entry directories and passthrough roots share the top of the output tree;
/// reject any overlap before anything is written.
fn check_output_paths(catalog: &Catalog, config: &SiteConfig) -> Result<(), BuildError> {
    for item in &config.passthrough.paths {
        let top = Path::new(item).components().find_map(|c| match c {
            Component::Normal(name) => name.to_str(),
            _ => None,
        });
        if let Some(entry) = top.and_then(|name| catalog.get(name)) {
            return Err(BuildError::OutputCollision {
                slug: entry.slug.clone(),
                path: item.clone(),
            });
        }
    }
    Ok(())
}

fn site_page(
    pipeline: &Pipeline<'_>,
    relative: &Path,
    bytes: &[u8],
) -> Result<BuiltPage, BuildError> {
    let page = pipeline.emit_bytes(relative, bytes).map_err(|e| match e {
        EntryError::Transform(e) => BuildError::Transform(e),
        EntryError::Write { path, source } => BuildError::Write { path, source },
        other => BuildError::Io(io::Error::other(other.to_string())),
    })?;
    pipeline.options.emit(BuildEvent::SitePage {
        path: page.path.clone(),
    });
    Ok(page)
}

/// Mode of every generated page: world-readable, owner-writable.
pub const PAGE_MODE: u32 = 0o644;

/// Write `bytes` to `path` through a temporary file in the same directory.
///
/// The temp file is created owner-only; it gets `permissions` before it is
/// renamed into place, or [`PAGE_MODE`] when none are given.
pub fn write_atomic(
    path: &Path,
    bytes: &[u8],
    permissions: Option<fs::Permissions>,
) -> io::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    let permissions = match permissions {
        Some(permissions) => permissions,
        None => page_permissions(tmp.as_file())?,
    };
    tmp.as_file().set_permissions(permissions)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(unix)]
fn page_permissions(_file: &fs::File) -> io::Result<fs::Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Ok(fs::Permissions::from_mode(PAGE_MODE))
}

#[cfg(not(unix))]
fn page_permissions(file: &fs::File) -> io::Result<fs::Permissions> {
    Ok(file.metadata()?.permissions())
}

/// Copy each configured passthrough path from the content root verbatim.
/// Missing paths are skipped.
fn copy_passthrough(
    root: &Path,
    output_dir: &Path,
    config: &SiteConfig,
    options: &BuildOptions,
) -> Result<Vec<PathBuf>, BuildError> {
    let mut copied = Vec::new();
    for item in &config.passthrough.paths {
        let src = root.join(item);
        if !src.exists() {
            tracing::debug!(path = %src.display(), "passthrough path missing, skipped");
            continue;
        }
        for entry in WalkDir::new(&src).sort_by_file_name() {
            let entry = entry.map_err(io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(root)
                .map_err(|e| BuildError::Io(io::Error::other(e.to_string())))?
                .to_path_buf();
            let bytes = fs::read(entry.path())?;
            let permissions = fs::metadata(entry.path())?.permissions();
            let dest = output_dir.join(&relative);
            write_atomic(&dest, &bytes, Some(permissions)).map_err(|source| BuildError::Write {
                path: dest.clone(),
                source,
            })?;
            options.emit(BuildEvent::Copied {
                path: relative.clone(),
            });
            copied.push(relative);
        }
    }
    copied.sort();
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{RawEntry, load};
    use tempfile::TempDir;

    fn scenario() -> (Catalog, MemoryContent) {
        let catalog = load(vec![
            RawEntry::new("a", "A", Some("X")),
            RawEntry::new("b", "B", Some("X")),
            RawEntry::new("c", "C", Some("Y")),
        ])
        .unwrap();
        let content = MemoryContent::new()
            .with_body("a", "## A\n\nAbout a.")
            .with_body("b", "## B\n\n{% fragment \"Demo\" %}")
            .with_body("c", "## C\n\n{% callout %}\nNote\n{% endcallout %}")
            .with_fragment("b", "Demo", "<button>try</button>");
        (catalog, content)
    }

    fn read(dir: &Path, path: &str) -> String {
        fs::read_to_string(dir.join(path)).unwrap()
    }

    #[test]
    fn writes_entry_and_site_pages() {
        let (catalog, content) = scenario();
        let input = BuildInput::in_memory(SiteConfig::default(), catalog, content);
        let tmp = TempDir::new().unwrap();

        let report = generate(&input, tmp.path(), &BuildOptions::default()).unwrap();

        assert_eq!(report.entry_count(), 3);
        for path in ["a/index.html", "b/index.html", "c/index.html", "index.html", "404.html"] {
            assert!(tmp.path().join(path).exists(), "{path}");
        }
        assert!(!tmp.path().join("sitemap.xml").exists());
        assert!(!tmp.path().join("feed.xml").exists());

        let b = read(tmp.path(), "b/index.html");
        assert!(b.contains("<title>this vs that - B</title>"));
        assert!(b.contains("<button>try</button>"));
        assert!(b.contains("href=/a/"));
        assert!(b.contains("href=/c/"));
    }

    #[test]
    fn report_digests_match_written_bytes() {
        let (catalog, content) = scenario();
        let input = BuildInput::in_memory(SiteConfig::default(), catalog, content);
        let tmp = TempDir::new().unwrap();

        let report = generate(&input, tmp.path(), &BuildOptions::default()).unwrap();
        for page in &report.pages {
            let bytes = fs::read(tmp.path().join(&page.path)).unwrap();
            assert_eq!(page.bytes, bytes.len());
            assert_eq!(page.digest, format!("{:x}", Sha256::digest(&bytes)));
        }
    }

    #[test]
    fn failed_entries_are_reported_and_others_written() {
        let (catalog, _) = scenario();
        let content = MemoryContent::new()
            .with_body("a", "fine")
            .with_body("b", "{% callout %}\nnever closed")
            .with_body("c", "{% fragment \"Missing\" %}");
        let input = BuildInput::in_memory(SiteConfig::default(), catalog, content);
        let tmp = TempDir::new().unwrap();

        let err = generate(&input, tmp.path(), &BuildOptions::default()).unwrap_err();
        let BuildError::EntriesFailed(failures) = err else {
            panic!("expected EntriesFailed");
        };
        let slugs: Vec<&str> = failures.iter().map(|f| f.slug.as_str()).collect();
        assert_eq!(slugs, vec!["b", "c"]);
        assert!(matches!(
            failures[0].error,
            EntryError::Render(RenderError::UnterminatedBlock { .. })
        ));
        assert!(matches!(
            failures[1].error,
            EntryError::Render(RenderError::UnknownFragment { .. })
        ));

        assert!(tmp.path().join("a/index.html").exists());
        assert!(!tmp.path().join("b/index.html").exists());
        assert!(!tmp.path().join("index.html").exists());
    }

    #[test]
    fn missing_body_is_entry_failure() {
        let (catalog, _) = scenario();
        let content = MemoryContent::new().with_body("a", "x").with_body("b", "y");
        let input = BuildInput::in_memory(SiteConfig::default(), catalog, content);
        let tmp = TempDir::new().unwrap();

        let err = generate(&input, tmp.path(), &BuildOptions::default()).unwrap_err();
        let BuildError::EntriesFailed(failures) = err else {
            panic!("expected EntriesFailed");
        };
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].slug, "c");
        assert!(matches!(
            failures[0].error,
            EntryError::Render(RenderError::Body { .. })
        ));
    }

    #[test]
    fn cancelled_build_skips_entries() {
        let (catalog, content) = scenario();
        let input = BuildInput::in_memory(SiteConfig::default(), catalog, content);
        let tmp = TempDir::new().unwrap();
        let options = BuildOptions {
            cancel: Some(Arc::new(AtomicBool::new(true))),
            ..BuildOptions::default()
        };

        let err = generate(&input, tmp.path(), &options).unwrap_err();
        let BuildError::EntriesFailed(failures) = err else {
            panic!("expected EntriesFailed");
        };
        assert_eq!(failures.len(), 3);
        assert!(failures.iter().all(|f| matches!(f.error, EntryError::Cancelled)));
        assert!(!tmp.path().join("a").exists());
    }

    /// Content that raises the cancel flag the first time a body is read,
    /// standing in for a Ctrl-C that lands mid-build.
    struct InterruptAfterFirst {
        inner: MemoryContent,
        cancel: Arc<AtomicBool>,
    }

    impl ContentSource for InterruptAfterFirst {
        fn body(&self, slug: &str) -> io::Result<String> {
            self.cancel.store(true, Ordering::SeqCst);
            self.inner.body(slug)
        }
    }

    #[test]
    fn interrupt_mid_build_skips_remaining_entries() {
        let (catalog, content) = scenario();
        let cancel = Arc::new(AtomicBool::new(false));
        let input = BuildInput {
            content: Box::new(InterruptAfterFirst {
                inner: content.clone(),
                cancel: cancel.clone(),
            }),
            ..BuildInput::in_memory(SiteConfig::default(), catalog, content)
        };
        let options = BuildOptions {
            cancel: Some(cancel),
            ..BuildOptions::default()
        };
        let tmp = TempDir::new().unwrap();

        let pool = rayon::ThreadPoolBuilder::new().num_threads(1).build().unwrap();
        let err = pool
            .install(|| generate(&input, tmp.path(), &options))
            .unwrap_err();
        let BuildError::EntriesFailed(failures) = err else {
            panic!("expected EntriesFailed");
        };
        let slugs: Vec<&str> = failures.iter().map(|f| f.slug.as_str()).collect();
        assert_eq!(slugs, vec!["b", "c"]);
        assert!(failures.iter().all(|f| matches!(f.error, EntryError::Cancelled)));
        assert!(tmp.path().join("a/index.html").exists());
        assert!(!tmp.path().join("index.html").exists());
    }

    #[test]
    fn slug_matching_passthrough_root_fails_before_writing() {
        let catalog = load(vec![
            RawEntry::new("a", "A", None),
            RawEntry::new("css", "CSS", None),
        ])
        .unwrap();
        let content = MemoryContent::new().with_body("a", "x").with_body("css", "y");
        let input = BuildInput::in_memory(SiteConfig::default(), catalog, content);
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("dist");

        let err = generate(&input, &out, &BuildOptions::default()).unwrap_err();
        match err {
            BuildError::OutputCollision { slug, path } => {
                assert_eq!(slug, "css");
                assert_eq!(path, "css");
            }
            other => panic!("expected OutputCollision, got {other}"),
        }
        assert!(!out.exists());
    }

    #[test]
    fn nested_passthrough_path_collides_on_its_root() {
        let catalog = load(vec![RawEntry::new("assets", "Assets", None)]).unwrap();
        let mut config = SiteConfig::default();
        config.passthrough.paths = vec!["./assets/img".to_string()];
        assert!(matches!(
            check_output_paths(&catalog, &config),
            Err(BuildError::OutputCollision { .. })
        ));

        config.passthrough.paths = vec!["static/assets".to_string()];
        assert!(check_output_paths(&catalog, &config).is_ok());
    }

    #[test]
    fn dry_run_writes_nothing() {
        let (catalog, content) = scenario();
        let input = BuildInput::in_memory(SiteConfig::default(), catalog, content);
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("dist");
        let options = BuildOptions {
            dry_run: true,
            ..BuildOptions::default()
        };

        let report = generate(&input, &out, &options).unwrap();
        assert!(report.dry_run);
        assert_eq!(report.pages.len(), 5);
        assert!(!out.exists());
    }

    #[test]
    fn sitemap_and_feed_written_when_url_set() {
        let (catalog, content) = scenario();
        let mut config = SiteConfig::default();
        config.site.url = Some("https://example.com".to_string());
        let input = BuildInput::in_memory(config, catalog, content);
        let tmp = TempDir::new().unwrap();

        let report = generate(&input, tmp.path(), &BuildOptions::default()).unwrap();
        let xml = read(tmp.path(), "sitemap.xml");
        assert!(xml.contains("<loc>https://example.com/b/</loc>"));
        let feed = read(tmp.path(), "feed.xml");
        assert!(feed.contains("<link>https://example.com/b/</link>"));

        let site: Vec<&Path> = report.pages[3..].iter().map(|p| p.path.as_path()).collect();
        assert_eq!(
            site,
            vec![
                Path::new("index.html"),
                Path::new("404.html"),
                Path::new("sitemap.xml"),
                Path::new("feed.xml"),
            ]
        );
        assert_eq!(report.entry_count(), 3);
    }

    #[test]
    fn events_cover_every_page() {
        let (catalog, content) = scenario();
        let input = BuildInput::in_memory(SiteConfig::default(), catalog, content);
        let tmp = TempDir::new().unwrap();
        let (tx, rx) = std::sync::mpsc::channel();
        let options = BuildOptions {
            events: Some(tx),
            ..BuildOptions::default()
        };

        generate(&input, tmp.path(), &options).unwrap();
        drop(options);
        let events: Vec<BuildEvent> = rx.iter().collect();

        assert_eq!(events[0], BuildEvent::Started { entries: 3 });
        let built = events
            .iter()
            .filter(|e| matches!(e, BuildEvent::PageBuilt { .. }))
            .count();
        assert_eq!(built, 3);
        let site = events
            .iter()
            .filter(|e| matches!(e, BuildEvent::SitePage { .. }))
            .count();
        assert_eq!(site, 2);
    }

    #[test]
    fn write_atomic_replaces_existing_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested/page.html");
        write_atomic(&path, b"first", None).unwrap();
        write_atomic(&path, b"second", None).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
        let leftovers = fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn passthrough_copies_configured_paths() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("content");
        fs::create_dir_all(root.join("css")).unwrap();
        fs::create_dir_all(root.join("assets/img")).unwrap();
        fs::write(root.join("css/style.css"), "body{}").unwrap();
        fs::write(root.join("assets/img/logo.svg"), "<svg/>").unwrap();
        fs::write(root.join("robots.txt"), "User-agent: *").unwrap();
        let out = tmp.path().join("dist");

        let copied =
            copy_passthrough(&root, &out, &SiteConfig::default(), &BuildOptions::default())
                .unwrap();
        assert_eq!(
            copied,
            vec![
                PathBuf::from("assets/img/logo.svg"),
                PathBuf::from("css/style.css"),
                PathBuf::from("robots.txt"),
            ]
        );
        assert_eq!(read(&out, "assets/img/logo.svg"), "<svg/>");
    }

    #[cfg(unix)]
    #[test]
    fn pages_are_world_readable() {
        use std::os::unix::fs::PermissionsExt;

        let (catalog, content) = scenario();
        let input = BuildInput::in_memory(SiteConfig::default(), catalog, content);
        let tmp = TempDir::new().unwrap();
        let report = generate(&input, tmp.path(), &BuildOptions::default()).unwrap();

        for page in &report.pages {
            let mode = fs::metadata(tmp.path().join(&page.path))
                .unwrap()
                .permissions()
                .mode();
            assert_eq!(mode & 0o777, PAGE_MODE, "{}", page.path.display());
        }
    }

    #[cfg(unix)]
    #[test]
    fn passthrough_keeps_source_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("content");
        fs::create_dir_all(root.join("assets")).unwrap();
        fs::write(root.join("assets/run.sh"), "#!/bin/sh\n").unwrap();
        fs::write(root.join("robots.txt"), "User-agent: *").unwrap();
        fs::set_permissions(root.join("assets/run.sh"), fs::Permissions::from_mode(0o755)).unwrap();
        fs::set_permissions(root.join("robots.txt"), fs::Permissions::from_mode(0o644)).unwrap();
        let out = tmp.path().join("dist");

        copy_passthrough(&root, &out, &SiteConfig::default(), &BuildOptions::default()).unwrap();
        let mode = |path: &str| fs::metadata(out.join(path)).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode("assets/run.sh"), 0o755);
        assert_eq!(mode("robots.txt"), 0o644);
    }

    // =========================================================================
    // Fixture site
    // =========================================================================

    mod fixtures {
        use super::*;
        use crate::test_helpers::*;

        #[test]
        fn builds_every_fixture_entry() {
            let content = setup_fixtures();
            let (out, report) = build_fixtures(&content);

            let input = BuildInput::load(content.path()).unwrap();
            assert_eq!(
                entry_slugs(&input.catalog),
                vec![
                    "element-vs-node",
                    "mouseenter-vs-mouseover",
                    "b-vs-strong",
                    "apply-vs-call",
                ]
            );
            assert_eq!(report.entry_count(), 4);
            for slug in entry_slugs(&input.catalog) {
                let page = find_page(&report, &format!("{slug}/index.html"));
                assert_eq!(page.bytes, read_page(&out, &format!("{slug}/index.html")).len());
            }
            find_page(&report, "sitemap.xml");
        }

        #[test]
        fn fixture_pages_carry_fragment_callout_and_badge() {
            let content = setup_fixtures();
            let (out, _) = build_fixtures(&content);

            let demo = read_page(&out, "mouseenter-vs-mouseover/index.html");
            assert!(demo.contains("data-fragment=MouseOverDemo"));
            assert!(demo.contains("data-demo=mouseover"));
            assert!(demo.contains("GitHub ★ 4321"));

            let strong = read_page(&out, "b-vs-strong/index.html");
            assert!(strong.contains("class=post__callout"));
            assert!(strong.contains("<title>this vs that - b vs strong</title>"));
        }

        #[test]
        fn fixture_neighbors_follow_catalog_order() {
            let content = setup_fixtures();
            let input = BuildInput::load(content.path()).unwrap();
            let links = compute_sequential_links(&input.catalog);

            let middle = find_entry(&input.catalog, "mouseenter-vs-mouseover");
            let neighbors = links.get(&middle.slug).unwrap();
            assert_eq!(neighbors.previous.unwrap().slug, "element-vs-node");
            assert_eq!(neighbors.next.unwrap().slug, "b-vs-strong");
        }

        #[test]
        fn fixture_passthrough_is_copied() {
            let content = setup_fixtures();
            let (out, report) = build_fixtures(&content);
            assert_eq!(
                report.copied,
                vec![
                    PathBuf::from("assets/favicon.svg"),
                    PathBuf::from("css/style.css"),
                    PathBuf::from("robots.txt"),
                ]
            );
            assert!(read_page(&out, "robots.txt").starts_with("User-agent"));
        }
    }
}
