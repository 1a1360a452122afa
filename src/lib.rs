//! # thisthat
//!
//! A static site builder for "this vs that" comparison articles. A catalog
//! lists the comparisons in reading order; each entry has a markdown body
//! that may embed callout blocks and interactive demo fragments. The build
//! turns that into one page per entry, a home page, a not-found page, and
//! an optional sitemap and RSS feed, all minified.
//!
//! # Architecture: Load, Render, Emit
//!
//! ```text
//! 1. Load     content/catalog.toml  →  Catalog        (validated, ordered)
//! 2. Render   posts/{slug}.md       →  RenderTree     (markdown + tags)
//! 3. Emit     RenderTree + views    →  dist/          (assembled, minified)
//! ```
//!
//! Loading is all-or-nothing: a malformed catalog fails before anything is
//! rendered. Rendering and emitting happen per entry, in parallel, and an
//! entry that fails never stops its siblings. The build only reports success
//! once every entry has produced a page.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`catalog`] | Reads `catalog.toml`, derives missing slugs and titles, rejects duplicates |
//! | [`slug`] | Title ↔ slug conversion and slug validity checks |
//! | [`views`] | Derived views: category groups, prev/next links, random and related picks |
//! | [`content`] | Where bodies and fragments come from: the filesystem or memory |
//! | [`render`] | Splits a body into markdown, callout and fragment nodes |
//! | [`highlight`] | Syntax highlighting for fenced code blocks |
//! | [`assemble`] | Builds complete HTML documents with Maud |
//! | [`minify`] | Deterministic, idempotent HTML minification |
//! | [`badge`] | Best-effort repository star count for the header |
//! | [`generate`] | The build: parallel per-entry pipeline, site pages, atomic writes |
//! | [`config`] | `config.toml` loading, validation and merging over stock defaults |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Errors Stay Local to an Entry
//!
//! A missing body, an unclosed callout or an unknown fragment is attached to
//! the entry that caused it. The build keeps going, then reports every
//! failure at once, so one broken post never hides another.
//!
//! ## Reproducible Output
//!
//! Building the same content twice produces byte-identical files. Related
//! suggestions are drawn from an RNG seeded by the entry slug, and the
//! minifier sorts attributes and class names, so nothing depends on thread
//! scheduling or hash order.
//!
//! ## Maud Over Template Engines
//!
//! HTML is generated with [Maud](https://maud.lambda.xyz/): templates are
//! checked at compile time, and every interpolated title or category is
//! escaped. Rendered markdown and fragment markup are inserted as-is.

pub mod assemble;
pub mod badge;
pub mod catalog;
pub mod config;
pub mod content;
pub mod generate;
pub mod highlight;
pub mod minify;
pub mod output;
pub mod render;
pub mod slug;
pub mod views;

#[cfg(test)]
pub(crate) mod test_helpers;
