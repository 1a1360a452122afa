//! Page assembly.
//!
//! Combines an entry, its rendered body, and the derived views into complete
//! HTML documents. Everything here is a pure function of its inputs; writing
//! the documents out is the build's job.
//!
//! ## Generated Documents
//!
//! - **Entry pages** (`/{slug}/index.html`): title, position, body with
//!   fragments resolved, previous/next links, more comparisons
//! - **Home page** (`/index.html`): one section per category, or a flat list
//! - **Not found** (`/404.html`)
//! - **Sitemap** (`/sitemap.xml`): only when `site.url` is configured
//! - **Feed** (`/feed.xml`): RSS 2.0, one item per entry in catalog order, only
//!   when `site.url` is configured. Entries carry no dates, so the feed has
//!   none either and rebuilds stay byte-identical.
//!
//! ## Page Metadata
//!
//! Entry pages are titled `"{site title} - {entry title}"` and use the entry
//! title as their meta description. Navigation links point at `/{slug}/` and
//! are labelled by `catalog.nav_label`.
//!
//! Uses [maud](https://maud.lambda.xyz/) for compile-time HTML templating;
//! entry titles and categories are escaped, rendered markdown and fragment
//! markup are inserted as-is.

use crate::catalog::{Catalog, Entry};
use crate::config::{NavLabel, SiteConfig};
use crate::content::{FragmentRegistry, POSTS_DIR};
use crate::render::{RenderError, RenderNode, RenderTree};
use crate::slug::unslugify;
use crate::views::{self, IndexView, SequentialLinks};
use maud::{DOCTYPE, Markup, PreEscaped, html};
use std::path::PathBuf;

/// Stylesheet every page links. Shipped by the `css` passthrough directory.
pub const STYLESHEET: &str = "/css/style.css";

pub const SITEMAP_FILE: &str = "sitemap.xml";
pub const FEED_FILE: &str = "feed.xml";

/// A link to a neighboring entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavLink {
    pub href: String,
    pub label: String,
    /// Full entry title, used as the link's tooltip.
    pub title: String,
}

/// A complete document ready for the output transform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageDocument {
    /// Path relative to the output directory.
    pub output_path: PathBuf,
    pub title: String,
    pub description: String,
    pub previous: Option<NavLink>,
    pub next: Option<NavLink>,
    pub html: String,
}

/// Assembles documents for one build.
pub struct Assembler<'a> {
    config: &'a SiteConfig,
    fragments: &'a dyn FragmentRegistry,
    stars: u64,
}

impl<'a> Assembler<'a> {
    pub fn new(config: &'a SiteConfig, fragments: &'a dyn FragmentRegistry, stars: u64) -> Self {
        Self {
            config,
            fragments,
            stars,
        }
    }

    /// Assemble the page for one entry.
    pub fn assemble(
        &self,
        entry: &Entry,
        catalog: &Catalog,
        links: &SequentialLinks,
        tree: &RenderTree,
    ) -> Result<PageDocument, RenderError> {
        let body = self.resolve_body(entry, tree)?;

        let neighbors = links.get(&entry.slug).unwrap_or_default();
        let previous = neighbors.previous.map(|e| self.nav_link(e));
        let next = neighbors.next.map(|e| self.nav_link(e));
        let related = views::related(catalog, entry, self.config.catalog.related_count);

        let total = catalog.len();
        let position = catalog.position(&entry.slug).map_or(0, |i| i + 1);
        let title = format!("{} - {}", self.config.site.title, entry.title);
        let edit = self.edit_url(&entry.slug);

        let content = html! {
            article.post {
                h1.post__title { (entry.title) }
                @if total > 0 {
                    p.post__position {
                        (prefix_zeros(position, total)) " / " (total)
                    }
                }
                @if let Some(edit) = &edit {
                    div.post__edit {
                        a href=(edit) rel="noopener noreferrer" target="_blank" { "Edit this page" }
                    }
                }
                div.post__content { (body) }
            }
            @if previous.is_some() || next.is_some() {
                nav.post__nav {
                    @if let Some(prev) = &previous {
                        a.post__prev href=(prev.href) title=(prev.title) { "← " (prev.label) }
                    }
                    @if let Some(next) = &next {
                        a.post__next href=(next.href) title=(next.title) { (next.label) " →" }
                    }
                }
            }
            @if !related.is_empty() {
                section.post__related {
                    h2 { "More comparisons" }
                    ul {
                        @for other in &related {
                            li { a href=(entry_href(other)) { (other.title) } }
                        }
                    }
                }
            }
        };

        let canonical = self.absolute_url(&entry_href(entry));
        let html = self.base_document(
            &title,
            &entry.title,
            canonical.as_deref(),
            Some("post-page"),
            content,
        );

        Ok(PageDocument {
            output_path: entry_output_path(&entry.slug),
            title,
            description: entry.title.clone(),
            previous,
            next,
            html: html.into_string(),
        })
    }

    /// Assemble the home page for a grouped or flat view.
    pub fn assemble_index(&self, catalog: &Catalog, view: &IndexView) -> PageDocument {
        let site = &self.config.site;

        let content = html! {
            section.home__hero {
                h1 { (site.tagline) }
                p.home__count { (catalog.len()) " comparisons" }
            }
            @match view {
                IndexView::Grouped(groups) => {
                    @for (category, entries) in groups {
                        section.home__category {
                            h2 { (category) }
                            ul.home__posts {
                                @for entry in entries {
                                    (index_card(entry))
                                }
                            }
                        }
                    }
                }
                IndexView::Flat(entries) => {
                    ul.home__posts {
                        @for entry in entries {
                            (index_card(entry))
                        }
                    }
                }
            }
        };

        let canonical = self.absolute_url("/");
        let html = self.base_document(
            &site.title,
            &site.tagline,
            canonical.as_deref(),
            Some("home-page"),
            content,
        );

        PageDocument {
            output_path: PathBuf::from("index.html"),
            title: site.title.clone(),
            description: site.tagline.clone(),
            previous: None,
            next: None,
            html: html.into_string(),
        }
    }

    /// Assemble the not-found page.
    pub fn assemble_not_found(&self) -> PageDocument {
        let title = format!("{} - Not found 404", self.config.site.title);
        let content = html! {
            section.not-found {
                h1 { "Not found" }
                p { a href="/" { "Back to all comparisons" } }
            }
        };
        let html = self.base_document(&title, "Not found", None, Some("not-found-page"), content);

        PageDocument {
            output_path: PathBuf::from("404.html"),
            title,
            description: "Not found".to_string(),
            previous: None,
            next: None,
            html: html.into_string(),
        }
    }

    /// `sitemap.xml` listing the home page and every entry, in catalog order.
    /// `None` when no site URL is configured.
    pub fn sitemap(&self, catalog: &Catalog) -> Option<String> {
        let home = self.absolute_url("/")?;
        let mut xml = String::from(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
        );
        let urls = std::iter::once(home).chain(
            catalog
                .iter()
                .filter_map(|entry| self.absolute_url(&entry_href(entry))),
        );
        for url in urls {
            xml.push_str("  <url><loc>");
            xml.push_str(&escape_xml(&url));
            xml.push_str("</loc></url>\n");
        }
        xml.push_str("</urlset>\n");
        Some(xml)
    }

    /// RSS 2.0 `feed.xml` with one item per entry, in catalog order.
    /// `None` when no site URL is configured.
    pub fn feed(&self, catalog: &Catalog) -> Option<String> {
        let home = self.absolute_url("/")?;
        let site = &self.config.site;
        let mut xml = String::from(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <rss version=\"2.0\" xmlns:atom=\"http://www.w3.org/2005/Atom\">\n\
             <channel>\n",
        );
        push_element(&mut xml, 1, "title", &site.title);
        push_element(&mut xml, 1, "link", &home);
        push_element(&mut xml, 1, "description", &site.tagline);
        if let Some(feed) = self.absolute_url(&format!("/{FEED_FILE}")) {
            xml.push_str(&format!(
                "  <atom:link href=\"{}\" rel=\"self\" type=\"application/rss+xml\"/>\n",
                escape_xml(&feed)
            ));
        }
        for entry in catalog {
            let Some(url) = self.absolute_url(&entry_href(entry)) else {
                continue;
            };
            xml.push_str("  <item>\n");
            push_element(&mut xml, 2, "title", &entry.title);
            push_element(&mut xml, 2, "link", &url);
            xml.push_str(&format!(
                "    <guid isPermaLink=\"true\">{}</guid>\n",
                escape_xml(&url)
            ));
            if let Some(category) = &entry.category {
                push_element(&mut xml, 2, "category", category);
            }
            xml.push_str("  </item>\n");
        }
        xml.push_str("</channel>\n</rss>\n");
        Some(xml)
    }

    fn resolve_body(&self, entry: &Entry, tree: &RenderTree) -> Result<Markup, RenderError> {
        let mut parts = Vec::with_capacity(tree.nodes.len());
        for node in &tree.nodes {
            let part = match node {
                RenderNode::Markup(markup) => html! { (PreEscaped(markup)) },
                RenderNode::Callout(markup) => html! {
                    div.post__callout { (PreEscaped(markup)) }
                },
                RenderNode::Fragment(name) => {
                    let markup = self.fragments.resolve(&entry.slug, name).ok_or_else(|| {
                        RenderError::UnknownFragment {
                            slug: entry.slug.clone(),
                            name: name.clone(),
                        }
                    })?;
                    html! {
                        div.post__demo data-fragment=(name) { (PreEscaped(markup)) }
                    }
                }
            };
            parts.push(part);
        }
        Ok(html! { @for part in parts { (part) } })
    }

    fn nav_link(&self, entry: &Entry) -> NavLink {
        let label = match self.config.catalog.nav_label {
            NavLabel::Title => entry.title.clone(),
            NavLabel::Slug => unslugify(&entry.slug),
        };
        NavLink {
            href: entry_href(entry),
            label,
            title: entry.title.clone(),
        }
    }

    fn edit_url(&self, slug: &str) -> Option<String> {
        self.config
            .site
            .repository
            .as_deref()
            .map(|repo| format!("{}/blob/HEAD/{POSTS_DIR}/{slug}.md", repo.trim_end_matches('/')))
    }

    fn absolute_url(&self, path: &str) -> Option<String> {
        self.config
            .site
            .url
            .as_deref()
            .map(|base| format!("{}{path}", base.trim_end_matches('/')))
    }

    // ========================================================================
    // HTML Components
    // ========================================================================

    fn base_document(
        &self,
        title: &str,
        description: &str,
        canonical: Option<&str>,
        body_class: Option<&str>,
        content: Markup,
    ) -> Markup {
        let site = &self.config.site;
        let feed = self.absolute_url(&format!("/{FEED_FILE}"));
        html! {
            (DOCTYPE)
            html lang="en" {
                head {
                    meta charset="UTF-8";
                    meta name="viewport" content="width=device-width, initial-scale=1.0";
                    title { (title) }
                    meta name="description" content=(description);
                    @if let Some(author) = &site.author {
                        meta name="author" content=(author);
                    }
                    @if let Some(url) = canonical {
                        link rel="canonical" href=(url);
                    }
                    @if let Some(feed) = &feed {
                        link rel="alternate" type="application/rss+xml" title=(site.title) href=(feed);
                    }
                    link rel="stylesheet" href=(STYLESHEET);
                }
                body class=[body_class] {
                    (self.site_header())
                    main { (content) }
                }
            }
        }
    }

    fn site_header(&self) -> Markup {
        let site = &self.config.site;
        html! {
            header.site-header {
                a.site-logo href="/" { (vs_title(&site.title)) }
                @if let Some(repo) = &site.repository {
                    a.github-button href=(repo) rel="noopener noreferrer" target="_blank" {
                        "GitHub ★ " (self.stars)
                    }
                }
            }
        }
    }
}

/// Site-relative URL of an entry page.
pub fn entry_href(entry: &Entry) -> String {
    format!("/{}/", entry.slug)
}

/// Output path of an entry page, relative to the output directory.
pub fn entry_output_path(slug: &str) -> PathBuf {
    PathBuf::from(slug).join("index.html")
}

/// Left-pad `number` with zeros to the digit count of `max`.
pub fn prefix_zeros(number: usize, max: usize) -> String {
    let width = max.to_string().len();
    format!("{number:0width$}")
}

fn index_card(entry: &Entry) -> Markup {
    html! {
        li {
            a.home__post href=(entry_href(entry)) {
                h3.home__title { (vs_title(&entry.title)) }
            }
        }
    }
}

/// `"a vs b"` → subject spans separated by a `vs` marker.
fn vs_title(title: &str) -> Markup {
    let subjects: Vec<&str> = title.split(" vs ").collect();
    let last = subjects.len() - 1;
    html! {
        @for (i, subject) in subjects.iter().enumerate() {
            span.subject { (subject) }
            @if i < last {
                " " span.vs { "vs" } " "
            }
        }
    }
}

/// `<name>text</name>` on its own line, indented two spaces per level.
fn push_element(xml: &mut String, depth: usize, name: &str, text: &str) {
    xml.push_str(&"  ".repeat(depth));
    xml.push_str(&format!("<{name}>{}</{name}>\n", escape_xml(text)));
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

// ============================================================================
// Tests
// ============================================================================
