//! Shared test utilities for the thisthat test suite.
//!
//! Provides fixture setup and lookup helpers that work with loaded catalogs
//! and build reports.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = setup_fixtures();
//! let (out, report) = build_fixtures(&tmp);
//!
//! let page = find_page(&report, "element-vs-node/index.html");
//! assert!(page.bytes > 0);
//! assert!(read_page(&out, "index.html").contains("Element vs Node"));
//! ```

use std::path::Path;
use tempfile::TempDir;

use crate::catalog::{Catalog, Entry};
use crate::generate::{BuildInput, BuildOptions, BuildReport, BuiltPage, generate};

// =========================================================================
// Fixture setup
// =========================================================================

/// Copy `fixtures/content/` to a temp directory and return it.
///
/// Tests get an isolated copy they can mutate without affecting other tests
/// or the source fixtures.
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/content");
    copy_dir_recursive(&fixtures, tmp.path()).unwrap();
    tmp
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            std::fs::create_dir_all(&dst_path)?;
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            std::fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

/// Build a content root into a fresh output directory. Panics on failure.
pub fn build_fixtures(content: &TempDir) -> (TempDir, BuildReport) {
    let out = TempDir::new().unwrap();
    let input = BuildInput::load(content.path()).unwrap();
    let report = generate(&input, out.path(), &BuildOptions::default())
        .unwrap_or_else(|e| panic!("fixture build failed: {e}"));
    (out, report)
}

// =========================================================================
// Lookups: panics with a clear message on miss
// =========================================================================

/// Find an entry by slug. Panics if not found.
pub fn find_entry<'a>(catalog: &'a Catalog, slug: &str) -> &'a Entry {
    catalog.get(slug).unwrap_or_else(|| {
        let slugs: Vec<&str> = catalog.iter().map(|e| e.slug.as_str()).collect();
        panic!("entry '{slug}' not found. Available: {slugs:?}")
    })
}

/// Find a built page by output path. Panics if not found.
pub fn find_page<'a>(report: &'a BuildReport, path: &str) -> &'a BuiltPage {
    report
        .pages
        .iter()
        .find(|p| p.path == Path::new(path))
        .unwrap_or_else(|| {
            let paths: Vec<String> = report
                .pages
                .iter()
                .map(|p| p.path.display().to_string())
                .collect();
            panic!("page '{path}' not built. Available: {paths:?}")
        })
}

/// Read a generated file as text. Panics if missing.
pub fn read_page(out: &TempDir, path: &str) -> String {
    std::fs::read_to_string(out.path().join(path))
        .unwrap_or_else(|e| panic!("could not read '{path}' from output: {e}"))
}

// =========================================================================
// Bulk extractors
// =========================================================================

/// All entry slugs in catalog order.
pub fn entry_slugs(catalog: &Catalog) -> Vec<&str> {
    catalog.iter().map(|e| e.slug.as_str()).collect()
}
