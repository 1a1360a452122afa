//! HTML output transform.
//!
//! Applied to every generated document just before it is written. Only paths
//! ending in `.html` (any case) are minified; everything else passes through
//! byte for byte.
//!
//! ## Rules
//!
//! - Comments are dropped.
//! - Whitespace runs in text collapse to a single space. Whitespace touching
//!   a block-level tag (or the document edge) is removed. Text inside `<pre>`
//!   and the contents of `<script>`, `<style>` and `<textarea>` are kept
//!   verbatim.
//! - Optional end tags (`</li>`, `</p>`, `</dt>`, `</dd>`, `</option>`,
//!   `</tr>`, `</td>`, `</th>`, `</thead>`, `</tbody>`, `</tfoot>`) are
//!   dropped when the next token allows it.
//! - Attribute values are unquoted when safe, otherwise double-quoted with
//!   `"` written as `&quot;`. Boolean attributes lose their value. Class
//!   tokens and attributes are sorted by name.
//!
//! The transform is deterministic and idempotent: minifying its own output
//! returns the same bytes. Entities are never decoded.

use crate::config::MinifyConfig;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransformError {
    #[error("{}: output is not valid UTF-8", path.display())]
    Encoding { path: PathBuf },
    #[error("{}: unterminated {what} at byte {offset}", path.display())]
    Malformed {
        path: PathBuf,
        what: &'static str,
        offset: usize,
    },
}

/// Where the tokenizer gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Unterminated {
    what: &'static str,
    offset: usize,
}

const VOID: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

const RAW_TEXT: &[&str] = &["script", "style", "textarea"];

const BOOLEAN: &[&str] = &[
    "allowfullscreen",
    "async",
    "autofocus",
    "autoplay",
    "checked",
    "controls",
    "default",
    "defer",
    "disabled",
    "formnovalidate",
    "hidden",
    "inert",
    "ismap",
    "itemscope",
    "loop",
    "multiple",
    "muted",
    "nomodule",
    "novalidate",
    "open",
    "playsinline",
    "readonly",
    "required",
    "reversed",
    "selected",
];

/// Tags whose boundaries swallow surrounding whitespace.
const BLOCK: &[&str] = &[
    "address", "article", "aside", "base", "blockquote", "body", "caption", "col", "colgroup",
    "dd", "details", "dialog", "div", "dl", "dt", "fieldset", "figcaption", "figure", "footer",
    "form", "h1", "h2", "h3", "h4", "h5", "h6", "head", "header", "hgroup", "hr", "html",
    "legend", "li", "link", "main", "menu", "meta", "nav", "ol", "p", "pre", "section",
    "summary", "table", "tbody", "td", "tfoot", "th", "thead", "title", "tr", "ul",
];

/// Start tags that implicitly close an open `<p>`.
const CLOSES_P: &[&str] = &[
    "address", "article", "aside", "blockquote", "details", "div", "dl", "fieldset",
    "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header",
    "hgroup", "hr", "main", "menu", "nav", "ol", "p", "pre", "section", "table", "ul",
];

#[derive(Debug, Clone, PartialEq, Eq)]
struct Attr<'a> {
    name: &'a str,
    value: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct StartTag<'a> {
    name: &'a str,
    attrs: Vec<Attr<'a>>,
    self_closing: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token<'a> {
    Text(String),
    /// Contents of a raw text element, emitted unchanged.
    Raw(&'a str),
    Start(StartTag<'a>),
    End(&'a str),
    /// `<!doctype …>`, `<![CDATA[…]]>`, `<?…>`: emitted unchanged.
    Decl(&'a str),
}

impl Token<'_> {
    fn is_block_boundary(&self) -> bool {
        match self {
            Token::Start(tag) => is_one_of(tag.name, BLOCK),
            Token::End(name) => is_one_of(name, BLOCK),
            Token::Decl(_) => true,
            Token::Text(_) | Token::Raw(_) => false,
        }
    }

    fn is_start(&self, names: &[&str]) -> bool {
        matches!(self, Token::Start(tag) if is_one_of(tag.name, names))
    }

    fn is_end(&self, names: &[&str]) -> bool {
        matches!(self, Token::End(name) if is_one_of(name, names))
    }
}

/// The HTML output transform, configured once per build.
#[derive(Debug, Clone, Copy, Default)]
pub struct Minifier {
    options: MinifyConfig,
}

impl Minifier {
    pub fn new(options: MinifyConfig) -> Self {
        Self { options }
    }

    /// Transform one output document. Non-HTML paths pass through unchanged.
    pub fn transform(&self, bytes: &[u8], output_path: &Path) -> Result<Vec<u8>, TransformError> {
        if !self.options.enabled || !is_html_path(output_path) {
            return Ok(bytes.to_vec());
        }
        let html = std::str::from_utf8(bytes).map_err(|_| TransformError::Encoding {
            path: output_path.to_path_buf(),
        })?;
        self.minify(html)
            .map(String::into_bytes)
            .map_err(|e| TransformError::Malformed {
                path: output_path.to_path_buf(),
                what: e.what,
                offset: e.offset,
            })
    }

    fn minify(&self, html: &str) -> Result<String, Unterminated> {
        let tokens = collapse_whitespace(tokenize(html)?);

        let mut out = String::with_capacity(html.len());
        for (i, token) in tokens.iter().enumerate() {
            match token {
                Token::Text(text) => out.push_str(text),
                Token::Raw(raw) | Token::Decl(raw) => out.push_str(raw),
                Token::Start(tag) => self.write_start(tag, &mut out),
                Token::End(name) => {
                    if self.options.remove_optional_tags && can_omit_end(name, tokens.get(i + 1)) {
                        continue;
                    }
                    out.push_str("</");
                    out.push_str(name);
                    out.push('>');
                }
            }
        }
        Ok(out)
    }

    fn write_start(&self, tag: &StartTag, out: &mut String) {
        let mut attrs = tag.attrs.clone();
        if self.options.sort_attributes {
            attrs.sort_by_key(|a| a.name.to_ascii_lowercase());
        }

        out.push('<');
        out.push_str(tag.name);
        let mut last_unquoted = false;
        for attr in &attrs {
            out.push(' ');
            out.push_str(attr.name);
            last_unquoted = false;

            let Some(value) = attr.value else { continue };
            if is_one_of(attr.name, BOOLEAN) {
                continue;
            }
            let value = if self.options.sort_class_names && attr.name.eq_ignore_ascii_case("class")
            {
                sort_classes(value)
            } else {
                value.to_string()
            };
            let escaped = value.replace('"', "&quot;");
            out.push('=');
            if is_safe_unquoted(&escaped) {
                out.push_str(&escaped);
                last_unquoted = true;
            } else {
                out.push('"');
                out.push_str(&escaped);
                out.push('"');
            }
        }

        if tag.self_closing && !is_one_of(tag.name, VOID) {
            if last_unquoted {
                out.push(' ');
            }
            out.push_str("/>");
        } else {
            out.push('>');
        }
    }
}

/// Whether `path` names an HTML document.
pub fn is_html_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("html"))
}

fn is_one_of(name: &str, set: &[&str]) -> bool {
    set.iter().any(|candidate| name.eq_ignore_ascii_case(candidate))
}

fn is_safe_unquoted(value: &str) -> bool {
    !value.is_empty()
        && !value
            .chars()
            .any(|c| c.is_ascii_whitespace() || matches!(c, '"' | '\'' | '=' | '<' | '>' | '`'))
}

fn sort_classes(value: &str) -> String {
    let mut classes: Vec<&str> = value.split_ascii_whitespace().collect();
    classes.sort_unstable();
    classes.dedup();
    classes.join(" ")
}

/// Whether end tag `name` may be dropped given the token after it.
fn can_omit_end(name: &str, next: Option<&Token>) -> bool {
    // Document end: block-level tags only.
    let Some(next) = next else {
        return is_one_of(
            name,
            &["li", "p", "dt", "dd", "tr", "td", "th", "thead", "tbody", "tfoot"],
        );
    };
    match name.to_ascii_lowercase().as_str() {
        "li" => next.is_start(&["li"]) || next.is_end(&["ul", "ol", "menu"]),
        "p" => next.is_start(CLOSES_P) || matches!(next, Token::End(n) if is_one_of(n, BLOCK)),
        "dt" => next.is_start(&["dt", "dd"]),
        "dd" => next.is_start(&["dt", "dd"]) || next.is_end(&["dl"]),
        "option" => {
            next.is_start(&["option", "optgroup"])
                || next.is_end(&["select", "datalist", "optgroup"])
        }
        "td" | "th" => next.is_start(&["td", "th"]) || next.is_end(&["tr"]),
        "tr" => next.is_start(&["tr"]) || next.is_end(&["thead", "tbody", "tfoot", "table"]),
        "thead" => next.is_start(&["tbody", "tfoot"]),
        "tbody" => next.is_start(&["tbody", "tfoot"]) || next.is_end(&["table"]),
        "tfoot" => next.is_end(&["table"]),
        _ => false,
    }
}

/// Collapse and trim text tokens, dropping those left empty.
fn collapse_whitespace(tokens: Vec<Token<'_>>) -> Vec<Token<'_>> {
    let mut pre_depth = 0usize;
    let mut keep = Vec::with_capacity(tokens.len());

    for (i, token) in tokens.iter().enumerate() {
        match token {
            Token::Start(tag) if tag.name.eq_ignore_ascii_case("pre") => pre_depth += 1,
            Token::End(name) if name.eq_ignore_ascii_case("pre") => {
                pre_depth = pre_depth.saturating_sub(1)
            }
            Token::Text(text) if pre_depth == 0 => {
                let mut collapsed = collapse_runs(text);
                let at_block_before = i == 0 || tokens[i - 1].is_block_boundary();
                let at_block_after = tokens.get(i + 1).is_none_or(Token::is_block_boundary);
                if at_block_after && collapsed.ends_with(' ') {
                    collapsed.pop();
                }
                if at_block_before && collapsed.starts_with(' ') {
                    collapsed.remove(0);
                }
                if !collapsed.is_empty() {
                    keep.push(Token::Text(collapsed));
                }
                continue;
            }
            _ => {}
        }
        keep.push(token.clone());
    }
    keep
}

fn collapse_runs(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for c in text.chars() {
        if c.is_ascii_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}

// ============================================================================
// Tokenizer
// ============================================================================

fn tokenize(src: &str) -> Result<Vec<Token<'_>>, Unterminated> {
    let bytes = src.as_bytes();
    let mut tokens: Vec<Token> = Vec::new();
    let mut pos = 0;
    let mut text_start = 0;

    while pos < bytes.len() {
        if bytes[pos] != b'<' {
            pos += 1;
            continue;
        }
        let rest = &src[pos..];
        let next = rest.as_bytes().get(1).copied().unwrap_or(b' ');

        if rest.starts_with("<!--") {
            push_text(&mut tokens, &src[text_start..pos]);
            let end = rest[4..].find("-->").ok_or(Unterminated {
                what: "comment",
                offset: pos,
            })?;
            pos += 4 + end + 3;
            text_start = pos;
        } else if next == b'!' || next == b'?' {
            push_text(&mut tokens, &src[text_start..pos]);
            let end = rest.find('>').ok_or(Unterminated {
                what: "declaration",
                offset: pos,
            })?;
            tokens.push(Token::Decl(&rest[..=end]));
            pos += end + 1;
            text_start = pos;
        } else if next == b'/' && rest.as_bytes().get(2).is_some_and(u8::is_ascii_alphabetic) {
            push_text(&mut tokens, &src[text_start..pos]);
            let end = rest.find('>').ok_or(Unterminated {
                what: "tag",
                offset: pos,
            })?;
            let inner = &rest[2..end];
            let name = inner
                .split(|c: char| c.is_ascii_whitespace() || c == '/')
                .next()
                .unwrap_or(inner);
            tokens.push(Token::End(name));
            pos += end + 1;
            text_start = pos;
        } else if next.is_ascii_alphabetic() {
            push_text(&mut tokens, &src[text_start..pos]);
            let (tag, len) = parse_start_tag(rest).map_err(|what| Unterminated {
                what,
                offset: pos,
            })?;
            pos += len;
            text_start = pos;

            let raw = is_one_of(tag.name, RAW_TEXT) && !tag.self_closing;
            let closing = format!("</{}", tag.name.to_ascii_lowercase());
            tokens.push(Token::Start(tag));
            if raw {
                let len = src[pos..]
                    .to_ascii_lowercase()
                    .find(&closing)
                    .ok_or(Unterminated {
                        what: "raw text element",
                        offset: pos,
                    })?;
                if len > 0 {
                    tokens.push(Token::Raw(&src[pos..pos + len]));
                }
                pos += len;
                text_start = pos;
            }
        } else {
            // A bare `<` in text.
            pos += 1;
        }
    }
    push_text(&mut tokens, &src[text_start..]);
    Ok(tokens)
}

/// Append text, merging with a preceding text token (left behind when a
/// comment between them was dropped).
fn push_text(tokens: &mut Vec<Token>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(Token::Text(prev)) = tokens.last_mut() {
        prev.push_str(text);
    } else {
        tokens.push(Token::Text(text.to_string()));
    }
}

/// Parse `<name attr=value …>` at the start of `src`. Returns the tag and the
/// number of bytes consumed.
fn parse_start_tag(src: &str) -> Result<(StartTag<'_>, usize), &'static str> {
    let b = src.as_bytes();
    let len = b.len();
    let mut i = 1;
    while i < len && !b[i].is_ascii_whitespace() && b[i] != b'>' && b[i] != b'/' {
        i += 1;
    }
    let name = &src[1..i];
    let mut attrs = Vec::new();
    let mut self_closing = false;

    loop {
        while i < len && b[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= len {
            return Err("tag");
        }
        match b[i] {
            b'>' => {
                let tag = StartTag {
                    name,
                    attrs,
                    self_closing,
                };
                return Ok((tag, i + 1));
            }
            b'/' => {
                i += 1;
                self_closing = b.get(i) == Some(&b'>');
                continue;
            }
            _ => self_closing = false,
        }

        let start = i;
        while i < len && !b[i].is_ascii_whitespace() && !matches!(b[i], b'=' | b'>' | b'/') {
            i += 1;
        }
        if i == start {
            i += 1;
        }
        let attr_name = &src[start..i];

        while i < len && b[i].is_ascii_whitespace() {
            i += 1;
        }
        if b.get(i) != Some(&b'=') {
            attrs.push(Attr {
                name: attr_name,
                value: None,
            });
            continue;
        }
        i += 1;
        while i < len && b[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= len {
            return Err("tag");
        }

        let value = if b[i] == b'"' || b[i] == b'\'' {
            let quote = b[i] as char;
            let close = src[i + 1..].find(quote).ok_or("attribute value")?;
            let value = &src[i + 1..i + 1 + close];
            i += close + 2;
            value
        } else {
            let start = i;
            while i < len && !b[i].is_ascii_whitespace() && b[i] != b'>' {
                i += 1;
            }
            &src[start..i]
        };
        attrs.push(Attr {
            name: attr_name,
            value: Some(value),
        });
    }
}
