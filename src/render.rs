//! Entry body rendering.
//!
//! Turns an entry's raw body into a [`RenderTree`]: a flat list of rendered
//! markdown chunks, callout blocks, and named fragment placeholders.
//!
//! ## Body Syntax
//!
//! Bodies are markdown with two block-level tags. A tag must sit alone on its
//! line and is ignored inside fenced code blocks.
//!
//! ```text
//! ## Difference
//!
//! The `mouseenter` event only fires when the mouse enters the element.
//!
//! {% callout %}
//! Prefer **mouseenter** over mouseover.
//! {% endcallout %}
//!
//! {% fragment "MouseOverDemo" %}
//! ```
//!
//! - `{% callout %}` … `{% endcallout %}` renders its (trimmed) content as
//!   markdown inside a callout container. Callouts do not nest and cannot hold
//!   fragments.
//! - `{% fragment "Name" %}` leaves a placeholder that the page assembler
//!   resolves against the entry's fragment registry. The renderer never
//!   inlines fragment markup.
//!
//! ## Markdown Options
//!
//! Rendering uses pulldown-cmark with tables and strikethrough, plus three
//! switches from [`MarkdownConfig`]:
//!
//! - `raw_html`: raw HTML passes through (when off it is escaped as text)
//! - `hard_breaks`: a single newline is a `<br>`
//! - `autolink`: bare `http://` / `https://` URLs become links, except inside
//!   code, existing links, image alt text, or an inline `<a>` element
//! - `highlight`: fenced code blocks in a known language are syntax
//!   highlighted (see [`crate::highlight`])
//!
//! Tags split the body into separately rendered pieces, but reference-style
//! link definitions are shared: `[docs][mdn]` above a callout resolves
//! against an `[mdn]: …` line below it.
//!
//! Rendering is pure: it reads the entry and its body and returns a new tree.

use crate::catalog::Entry;
use crate::config::MarkdownConfig;
use crate::content::is_fragment_name;
use crate::highlight::Highlighter;
use pulldown_cmark::{
    BrokenLink, CowStr, Event, LinkType, Options, Parser, RefDefs, Tag, TagEnd, html,
};
use thiserror::Error;

/// Per-entry rendering failures. Every variant names the entry.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("{slug}: could not read body: {source}")]
    Body {
        slug: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{slug}: line {line}: {{% {tag} %}} is never closed")]
    UnterminatedBlock {
        slug: String,
        tag: String,
        line: usize,
    },
    #[error("{slug}: line {line}: unexpected {{% {tag} %}}")]
    UnexpectedTag {
        slug: String,
        tag: String,
        line: usize,
    },
    #[error("{slug}: line {line}: unknown tag {{% {tag} %}}")]
    UnknownTag {
        slug: String,
        tag: String,
        line: usize,
    },
    #[error("{slug}: line {line}: fragment tag needs one quoted identifier, e.g. {{% fragment \"Demo\" %}}")]
    MalformedFragment { slug: String, line: usize },
    #[error("{slug}: no fragment named {name:?}")]
    UnknownFragment { slug: String, name: String },
}

impl RenderError {
    /// Slug of the entry that failed.
    pub fn slug(&self) -> &str {
        match self {
            RenderError::Body { slug, .. }
            | RenderError::UnterminatedBlock { slug, .. }
            | RenderError::UnexpectedTag { slug, .. }
            | RenderError::UnknownTag { slug, .. }
            | RenderError::MalformedFragment { slug, .. }
            | RenderError::UnknownFragment { slug, .. } => slug,
        }
    }
}

/// One piece of a rendered body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderNode {
    /// Rendered markdown HTML.
    Markup(String),
    /// Rendered markdown HTML that belongs inside a callout container.
    Callout(String),
    /// Placeholder for a named interactive fragment.
    Fragment(String),
}

/// The rendered body of one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderTree {
    pub slug: String,
    pub nodes: Vec<RenderNode>,
}

impl RenderTree {
    /// Names of all fragment placeholders, in body order.
    pub fn fragments(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().filter_map(|node| match node {
            RenderNode::Fragment(name) => Some(name.as_str()),
            _ => None,
        })
    }
}

/// Markdown renderer configured once per build.
#[derive(Debug, Clone, Copy, Default)]
pub struct Renderer {
    options: MarkdownConfig,
}

impl Renderer {
    pub fn new(options: MarkdownConfig) -> Self {
        Self { options }
    }

    /// Render an entry body into a tree.
    pub fn render(&self, entry: &Entry, body: &str) -> Result<RenderTree, RenderError> {
        let slug = || entry.slug.clone();
        // Markup and callout nodes hold markdown source until every reference
        // definition in the body is known.
        let mut nodes = Vec::new();
        let mut segment = String::new();
        // (line of the opening tag, collected content)
        let mut callout: Option<(usize, String)> = None;
        let mut fence: Option<(char, usize)> = None;
        // The body with tag lines blanked, for reference definitions.
        let mut scaffold = String::with_capacity(body.len());

        for (i, line) in body.lines().enumerate() {
            let line_no = i + 1;

            if let Some((marker, len)) = fence {
                if closes_fence(line, marker, len) {
                    fence = None;
                }
                push_line(&mut scaffold, line);
                push_line(callout_or(&mut callout, &mut segment), line);
                continue;
            }
            if let Some(opened) = fence_marker(line) {
                fence = Some(opened);
                push_line(&mut scaffold, line);
                push_line(callout_or(&mut callout, &mut segment), line);
                continue;
            }

            let Some((tag, args)) = parse_tag(line) else {
                push_line(&mut scaffold, line);
                push_line(callout_or(&mut callout, &mut segment), line);
                continue;
            };
            scaffold.push('\n');

            match tag {
                "callout" => {
                    if callout.is_some() {
                        return Err(RenderError::UnexpectedTag {
                            slug: slug(),
                            tag: tag.to_string(),
                            line: line_no,
                        });
                    }
                    flush(&mut segment, &mut nodes);
                    callout = Some((line_no, String::new()));
                }
                "endcallout" => {
                    let Some((_, content)) = callout.take() else {
                        return Err(RenderError::UnexpectedTag {
                            slug: slug(),
                            tag: tag.to_string(),
                            line: line_no,
                        });
                    };
                    nodes.push(RenderNode::Callout(content.trim().to_string()));
                }
                "fragment" => {
                    if callout.is_some() {
                        return Err(RenderError::UnexpectedTag {
                            slug: slug(),
                            tag: tag.to_string(),
                            line: line_no,
                        });
                    }
                    let name = parse_quoted(args)
                        .filter(|name| is_fragment_name(name))
                        .ok_or_else(|| RenderError::MalformedFragment {
                            slug: slug(),
                            line: line_no,
                        })?;
                    flush(&mut segment, &mut nodes);
                    nodes.push(RenderNode::Fragment(name.to_string()));
                }
                other => {
                    return Err(RenderError::UnknownTag {
                        slug: slug(),
                        tag: other.to_string(),
                        line: line_no,
                    });
                }
            }
        }

        if let Some((line, _)) = callout {
            return Err(RenderError::UnterminatedBlock {
                slug: slug(),
                tag: "callout".to_string(),
                line,
            });
        }
        flush(&mut segment, &mut nodes);

        let definitions = Parser::new_ext(&scaffold, markdown_options());
        let shared = definitions.reference_definitions();
        let nodes = nodes
            .into_iter()
            .filter_map(|node| match node {
                // A segment of nothing but definitions renders to nothing.
                RenderNode::Markup(source) => {
                    let html = self.render_markdown(&source, shared);
                    (!html.is_empty()).then_some(RenderNode::Markup(html))
                }
                RenderNode::Callout(source) => {
                    Some(RenderNode::Callout(self.render_markdown(&source, shared)))
                }
                fragment => Some(fragment),
            })
            .collect();

        Ok(RenderTree {
            slug: entry.slug.clone(),
            nodes,
        })
    }

    /// Render a markdown string to HTML with the configured options.
    pub fn markdown(&self, text: &str) -> String {
        self.render_markdown(text, &RefDefs::default())
    }

    /// Render `text`, resolving references it does not define itself against
    /// `shared`.
    fn render_markdown(&self, text: &str, shared: &RefDefs<'_>) -> String {
        let callback = |link: BrokenLink| {
            let def = shared.get(&link.reference)?;
            let title = def.title.as_deref().unwrap_or_default();
            Some((CowStr::from(def.dest.to_string()), CowStr::from(title.to_string())))
        };
        let parser = Parser::new_with_broken_link_callback(text, markdown_options(), Some(callback));

        let events = self.adjust(parser);
        let mut out = String::with_capacity(text.len() * 3 / 2);
        if self.options.highlight {
            html::push_html(&mut out, Highlighter::new(events.into_iter()));
        } else {
            html::push_html(&mut out, events.into_iter());
        }
        out
    }

    /// Apply the line-break, raw-HTML and autolink options to the event stream.
    fn adjust<'a>(&self, events: impl Iterator<Item = Event<'a>>) -> Vec<Event<'a>> {
        let mut out: Vec<Event<'a>> = Vec::new();
        let mut code_depth = 0usize;
        let mut link_depth = 0usize;

        for event in coalesce_text(events) {
            match event {
                Event::Start(Tag::CodeBlock(kind)) => {
                    code_depth += 1;
                    out.push(Event::Start(Tag::CodeBlock(kind)));
                }
                Event::End(TagEnd::CodeBlock) => {
                    code_depth = code_depth.saturating_sub(1);
                    out.push(Event::End(TagEnd::CodeBlock));
                }
                Event::Start(tag @ (Tag::Link { .. } | Tag::Image { .. })) => {
                    link_depth += 1;
                    out.push(Event::Start(tag));
                }
                Event::End(end @ (TagEnd::Link | TagEnd::Image)) => {
                    link_depth = link_depth.saturating_sub(1);
                    out.push(Event::End(end));
                }
                Event::SoftBreak if self.options.hard_breaks => out.push(Event::HardBreak),
                Event::Html(raw) | Event::InlineHtml(raw) if !self.options.raw_html => {
                    out.push(Event::Text(raw));
                }
                Event::InlineHtml(raw) => {
                    if opens_anchor(&raw) {
                        link_depth += 1;
                    } else if closes_anchor(&raw) {
                        link_depth = link_depth.saturating_sub(1);
                    }
                    out.push(Event::InlineHtml(raw));
                }
                Event::Text(text)
                    if self.options.autolink && code_depth == 0 && link_depth == 0 =>
                {
                    linkify(text, &mut out);
                }
                other => out.push(other),
            }
        }
        out
    }
}

fn markdown_options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options
}

/// Move a non-blank markdown segment into `nodes`.
fn flush(segment: &mut String, nodes: &mut Vec<RenderNode>) {
    if !segment.trim().is_empty() {
        nodes.push(RenderNode::Markup(std::mem::take(segment)));
    }
    segment.clear();
}

fn callout_or<'s>(callout: &'s mut Option<(usize, String)>, segment: &'s mut String) -> &'s mut String {
    match callout {
        Some((_, content)) => content,
        None => segment,
    }
}

fn push_line(buf: &mut String, line: &str) {
    buf.push_str(line);
    buf.push('\n');
}

/// Fence opener/closer: a run of at least three backticks or tildes.
fn fence_marker(line: &str) -> Option<(char, usize)> {
    let trimmed = line.trim_start();
    let marker = trimmed.chars().next().filter(|c| *c == '`' || *c == '~')?;
    let len = trimmed.chars().take_while(|c| *c == marker).count();
    (len >= 3).then_some((marker, len))
}

/// A closing fence: at least `len` of `marker` and nothing else but spaces.
fn closes_fence(line: &str, marker: char, len: usize) -> bool {
    let rest = line.trim_start();
    let run = rest.chars().take_while(|c| *c == marker).count();
    run >= len && rest[run * marker.len_utf8()..].trim().is_empty()
}

/// `{% name args %}` on a line of its own → `(name, args)`.
fn parse_tag(line: &str) -> Option<(&str, &str)> {
    let inner = line
        .trim()
        .strip_prefix("{%")?
        .strip_suffix("%}")?
        .trim();
    let (name, args) = inner
        .split_once(char::is_whitespace)
        .unwrap_or((inner, ""));
    Some((name, args.trim()))
}

/// A single `"…"` or `'…'` argument.
fn parse_quoted(args: &str) -> Option<&str> {
    let quote = args.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let rest = &args[1..];
    let end = rest.find(quote)?;
    rest[end + 1..].trim().is_empty().then(|| &rest[..end])
}

fn opens_anchor(raw: &str) -> bool {
    let lower = raw.trim_start().to_ascii_lowercase();
    lower.starts_with("<a ") || lower.starts_with("<a>") || lower.starts_with("<a\n")
}

fn closes_anchor(raw: &str) -> bool {
    raw.trim_start().to_ascii_lowercase().starts_with("</a")
}

/// pulldown-cmark may split one run of text into several events; merge them
/// so a URL is never cut in half.
fn coalesce_text<'a>(events: impl Iterator<Item = Event<'a>>) -> Vec<Event<'a>> {
    let mut out: Vec<Event<'a>> = Vec::new();
    for event in events {
        match event {
            Event::Text(next) => {
                if let Some(Event::Text(prev)) = out.last_mut() {
                    *prev = CowStr::from(format!("{prev}{next}"));
                } else {
                    out.push(Event::Text(next));
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Split `text` into plain text and autolink events.
fn linkify<'a>(text: CowStr<'a>, out: &mut Vec<Event<'a>>) {
    let spans = find_urls(&text);
    if spans.is_empty() {
        out.push(Event::Text(text));
        return;
    }

    let mut cursor = 0;
    for (start, end) in spans {
        if start > cursor {
            out.push(Event::Text(CowStr::from(text[cursor..start].to_string())));
        }
        let url = text[start..end].to_string();
        out.push(Event::Start(Tag::Link {
            link_type: LinkType::Autolink,
            dest_url: CowStr::from(url.clone()),
            title: CowStr::from(""),
            id: CowStr::from(""),
        }));
        out.push(Event::Text(CowStr::from(url)));
        out.push(Event::End(TagEnd::Link));
        cursor = end;
    }
    if cursor < text.len() {
        out.push(Event::Text(CowStr::from(text[cursor..].to_string())));
    }
}

/// Byte ranges of bare `http://` / `https://` URLs in `text`.
fn find_urls(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut from = 0;

    while let Some(offset) = text[from..].find("http") {
        let start = from + offset;
        let rest = &text[start..];
        let scheme_len = if rest.starts_with("https://") {
            8
        } else if rest.starts_with("http://") {
            7
        } else {
            from = start + 4;
            continue;
        };

        let boundary_ok = text[..start]
            .chars()
            .next_back()
            .is_none_or(|c| !c.is_alphanumeric());
        let raw_end = rest
            .find(|c: char| c.is_whitespace() || matches!(c, '<' | '>' | '"' | '`'))
            .unwrap_or(rest.len());
        let end = start + trim_url_tail(&rest[..raw_end]);

        if boundary_ok && end > start + scheme_len {
            spans.push((start, end));
            from = end;
        } else {
            from = start + scheme_len;
        }
    }
    spans
}

/// Length of `candidate` after dropping trailing punctuation and unbalanced
/// closing parentheses.
fn trim_url_tail(candidate: &str) -> usize {
    let mut url = candidate;
    loop {
        let Some(last) = url.chars().next_back() else {
            break;
        };
        let drop = match last {
            '.' | ',' | ':' | ';' | '!' | '?' | '\'' | '*' | '_' => true,
            ')' => url.matches(')').count() > url.matches('(').count(),
            _ => false,
        };
        if !drop {
            break;
        }
        url = &url[..url.len() - last.len_utf8()];
    }
    url.len()
}
