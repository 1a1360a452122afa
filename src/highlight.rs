//! Syntax highlighting for fenced code blocks.
//!
//! [`Highlighter`] wraps a pulldown-cmark event stream and replaces every
//! fenced code block whose info string names a known language with one HTML
//! event:
//!
//! ```text
//! ```js                       <pre class="code" data-lang="js"><code>
//! const a = 1;          →       <span class="source js">…</span>
//! ```                         </code></pre>
//! ```
//!
//! Tokens are emitted as space-separated scope classes (syntect's
//! `ClassStyle::Spaced`), so colors live in the stylesheet. Blocks without a
//! language, in an unknown language, or that fail to parse pass through
//! unchanged and render as plain `<pre><code>`.

use maud::{PreEscaped, html};
use pulldown_cmark::{CodeBlockKind, Event, Tag, TagEnd};
use std::collections::VecDeque;
use std::sync::LazyLock;
use syntect::html::{ClassStyle, ClassedHTMLGenerator};
use syntect::parsing::{SyntaxReference, SyntaxSet};

static SYNTAX_SET: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);

/// Event adapter that highlights fenced code blocks.
pub struct Highlighter<'a, I> {
    inner: I,
    /// Events of a block that could not be highlighted, replayed verbatim.
    replay: VecDeque<Event<'a>>,
}

impl<'a, I: Iterator<Item = Event<'a>>> Highlighter<'a, I> {
    pub fn new(inner: I) -> Self {
        Self {
            inner,
            replay: VecDeque::new(),
        }
    }

    /// Consume the rest of a code block, returning its text and its events.
    fn take_block(&mut self, start: Event<'a>) -> (String, Vec<Event<'a>>) {
        let mut code = String::new();
        let mut events = vec![start];
        for event in self.inner.by_ref() {
            let end = matches!(event, Event::End(TagEnd::CodeBlock));
            if let Event::Text(text) = &event {
                code.push_str(text);
            }
            events.push(event);
            if end {
                break;
            }
        }
        (code, events)
    }
}

impl<'a, I: Iterator<Item = Event<'a>>> Iterator for Highlighter<'a, I> {
    type Item = Event<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(event) = self.replay.pop_front() {
            return Some(event);
        }

        let event = self.inner.next()?;
        let found = match &event {
            Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(info))) => language(info)
                .and_then(|lang| find_syntax(lang).map(|syntax| (lang.to_string(), syntax))),
            _ => None,
        };
        let (lang, syntax) = match found {
            Some(found) => found,
            None => return Some(event),
        };

        let (code, events) = self.take_block(event);
        match highlight_block(&code, &lang, syntax) {
            Ok(markup) => Some(Event::Html(markup.into())),
            Err(e) => {
                tracing::warn!(lang = %lang, error = %e, "could not highlight code block");
                self.replay.extend(events);
                self.replay.pop_front()
            }
        }
    }
}

/// First word of a fence info string: "js" for "```js", "rust" for
/// "```rust,ignore".
fn language(info: &str) -> Option<&str> {
    info.split(|c: char| c == ',' || c.is_whitespace())
        .next()
        .filter(|lang| !lang.is_empty())
}

fn find_syntax(lang: &str) -> Option<&'static SyntaxReference> {
    SYNTAX_SET.find_syntax_by_token(lang)
}

fn highlight_block(
    code: &str,
    lang: &str,
    syntax: &'static SyntaxReference,
) -> Result<String, syntect::Error> {
    let mut generator =
        ClassedHTMLGenerator::new_with_class_style(syntax, &SYNTAX_SET, ClassStyle::Spaced);
    for line in code.split_inclusive('\n') {
        generator.parse_html_for_line_which_includes_newline(line)?;
    }
    let spans = generator.finalize();
    let markup = html! {
        pre.code data-lang=(lang) { code { (PreEscaped(spans)) } }
    };
    Ok(markup.into_string() + "\n")
}
