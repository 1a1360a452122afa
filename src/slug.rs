//! Title ↔ slug conversion shared by every stage.
//!
//! A slug is the permanent URL key of an entry: `Element vs Node` lives at
//! `/element-vs-node/`. The two functions here are the only place that
//! conversion happens, so the catalog loader, link generation, and the page
//! assembler always agree on it.
//!
//! ## Conversion Rules
//!
//! - `slugify`: lower-case, each space becomes one hyphen
//!   (`"Element vs Node"` → `"element-vs-node"`)
//! - `unslugify`: lower-case, each hyphen becomes one space
//!   (`"element-vs-node"` → `"element vs node"`)
//!
//! ## Known Limitations
//!
//! The pair is lossy in both directions. Capitalization never survives a
//! round trip, and punctuation is passed through untouched rather than
//! transliterated: `":active vs :focus"` slugifies to `":active-vs-:focus"`,
//! and `"a  b"` (two spaces) produces a double hyphen. Catalogs that care about
//! clean URLs store an explicit `slug` for such titles.
//!
//! Characters that change what a URL points at (`#`, `?`, `%`) and whitespace
//! are never accepted, since the slug is used unencoded in every link. A title
//! like `"What is #id?"` needs an explicit slug.
//!
//! ## Reserved Names
//!
//! Site pages share the top level of the output tree with entry directories,
//! so [`RESERVED_SLUGS`] can never be used as a slug.

/// Top-level output names written by the build itself.
pub const RESERVED_SLUGS: [&str; 4] = ["index.html", "404.html", "sitemap.xml", "feed.xml"];

/// Convert a display title to its URL slug.
pub fn slugify(title: &str) -> String {
    title.to_lowercase().replace(' ', "-")
}

/// Convert a slug back to a (lower-case) display label.
pub fn unslugify(slug: &str) -> String {
    slug.to_lowercase().replace('-', " ")
}

/// Whether an explicitly stored slug is safe to use as a path segment.
///
/// Allows lowercase ASCII alphanumerics plus `-`, `_`, `.`, `[` and `]`
/// (the last two appear in slugs like `array-length-0-vs-array-[]`).
/// `.` and `..` alone are rejected since they would escape the output tree.
pub fn is_url_safe(slug: &str) -> bool {
    !slug.is_empty()
        && slug != "."
        && slug != ".."
        && slug.chars().all(|c| {
            c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '_' | '.' | '[' | ']')
        })
}

/// Whether any slug, explicit or derived, can name a directory in the
/// output tree without escaping it, and appear verbatim in a link to it.
pub fn is_path_safe(slug: &str) -> bool {
    !slug.is_empty()
        && slug != "."
        && slug != ".."
        && !slug.chars().any(|c| {
            matches!(c, '/' | '\\' | '#' | '?' | '%') || c.is_control() || c.is_whitespace()
        })
}

/// Whether `slug` would collide with a site page.
pub fn is_reserved(slug: &str) -> bool {
    RESERVED_SLUGS.contains(&slug)
}
