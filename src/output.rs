//! CLI output formatting.
//!
//! # Information-First Display
//!
//! Output names entries by catalog position and title; the generated path
//! follows as secondary context. Read top to bottom, a build log doubles as
//! an inventory of the catalog.
//!
//! # Output Format
//!
//! ## Build
//!
//! ```text
//! Building 3 comparisons
//! 001 Element vs Node → element-vs-node/index.html
//! 003 apply() vs call() → apply-vs-call/index.html
//! 002 b vs i → b-vs-i/index.html
//! Home → index.html
//! Not found → 404.html
//! Copied 4 files
//! Built 3 pages, 2 site pages
//! ```
//!
//! Entry lines arrive in completion order, which varies between runs.
//!
//! ## Failures
//!
//! ```text
//! 2 of 3 entries failed:
//!     b-vs-i
//!         b-vs-i: line 4: {% callout %} is never closed
//!     key-vs-code
//!         key-vs-code: no fragment named "Demo"
//! ```
//!
//! # Architecture
//!
//! Each output has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout or stderr.
//! Format functions are pure: no I/O, no side effects.

use crate::catalog::Catalog;
use crate::generate::{BuildEvent, BuildReport, EntryFailure};
use std::path::Path;

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn site_page_label(path: &Path) -> &'static str {
    match path.to_str() {
        Some("index.html") => "Home",
        Some("404.html") => "Not found",
        Some("sitemap.xml") => "Sitemap",
        Some("feed.xml") => "Feed",
        _ => "Page",
    }
}

// ============================================================================
// Build progress
// ============================================================================

/// Format a single build progress event as display lines.
pub fn format_build_event(event: &BuildEvent) -> Vec<String> {
    match event {
        BuildEvent::Started { entries } => vec![format!("Building {} comparisons", entries)],
        BuildEvent::PageBuilt {
            position,
            title,
            path,
        } => vec![format!(
            "{} {} \u{2192} {}",
            format_index(*position),
            title,
            path.display()
        )],
        BuildEvent::PageFailed { slug, error } => {
            vec![format!("{} FAILED", slug), format!("{}{}", indent(1), error)]
        }
        BuildEvent::SitePage { path } => vec![format!(
            "{} \u{2192} {}",
            site_page_label(path),
            path.display()
        )],
        // Copies are summarized once at the end.
        BuildEvent::Copied { .. } => Vec::new(),
    }
}

/// Format the closing summary of a successful build.
pub fn format_build_summary(report: &BuildReport) -> Vec<String> {
    let entries = report.entry_count();
    let site_pages = report.pages.len() - entries;
    let mut lines = Vec::new();
    if !report.copied.is_empty() {
        lines.push(format!("Copied {} files", report.copied.len()));
    }
    let verb = if report.dry_run { "Checked" } else { "Built" };
    lines.push(format!(
        "{} {} pages, {} site pages",
        verb, entries, site_pages
    ));
    lines
}

/// Print the build summary to stdout.
pub fn print_build_summary(report: &BuildReport) {
    for line in format_build_summary(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Failures
// ============================================================================

/// Format every failed entry with its error.
pub fn format_failures(failures: &[EntryFailure], total: usize) -> Vec<String> {
    let mut lines = vec![format!("{} of {} entries failed:", failures.len(), total)];
    for failure in failures {
        lines.push(format!("{}{}", indent(1), failure.slug));
        lines.push(format!("{}{}", indent(2), failure.error));
    }
    lines
}

/// Print failed entries to stderr.
pub fn print_failures(failures: &[EntryFailure], total: usize) {
    for line in format_failures(failures, total) {
        eprintln!("{}", line);
    }
}

// ============================================================================
// Check
// ============================================================================

/// Format the catalog inventory shown by `check`.
///
/// ```text
/// 001 Element vs Node (DOM)
///     Source: posts/element-vs-node.md
/// 002 b vs i
///     Source: posts/b-vs-i.md
/// ```
pub fn format_catalog(catalog: &Catalog) -> Vec<String> {
    let mut lines = Vec::new();
    for (i, entry) in catalog.iter().enumerate() {
        let header = match &entry.category {
            Some(category) => format!("{} {} ({})", format_index(i + 1), entry.title, category),
            None => format!("{} {}", format_index(i + 1), entry.title),
        };
        lines.push(header);
        lines.push(format!(
            "{}Source: {}/{}.md",
            indent(1),
            crate::content::POSTS_DIR,
            entry.slug
        ));
    }
    lines
}

/// Print the catalog inventory to stdout.
pub fn print_catalog(catalog: &Catalog) {
    for line in format_catalog(catalog) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================
