//! Property tests for the HTML output transform.

use proptest::prelude::*;
use std::path::Path;

use thisthat::config::MinifyConfig;
use thisthat::minify::Minifier;

fn whitespace() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just(""), Just(" "), Just("  "), Just("\n"), Just(" \n\t")]
}

fn word() -> impl Strategy<Value = String> {
    "[a-z]{1,8}"
}

fn classes() -> impl Strategy<Value = String> {
    proptest::collection::vec("[a-c]{1,2}", 1..4).prop_map(|c| c.join(" "))
}

/// Inline content: words, spans and bold runs with uneven whitespace.
fn inline() -> impl Strategy<Value = String> {
    let piece = prop_oneof![
        (whitespace(), word(), whitespace()).prop_map(|(a, w, b)| format!("{a}{w}{b}")),
        (classes(), word()).prop_map(|(c, w)| format!("<span class=\"{c}\">{w}</span>")),
        (word(), whitespace()).prop_map(|(w, s)| format!("<b>{w}</b>{s}")),
        word().prop_map(|h| format!("<a href=\"/{h}/\" title=\"{h} page\">{h}</a>")),
    ];
    proptest::collection::vec(piece, 1..5).prop_map(|pieces| pieces.concat())
}

/// Block-level content, including elements whose end tags are optional.
fn block() -> impl Strategy<Value = String> {
    prop_oneof![
        inline().prop_map(|text| format!("<p>{text}</p>")),
        (classes(), inline()).prop_map(|(c, text)| format!("<div class=\"{c}\">{text}</div>")),
        proptest::collection::vec(inline(), 1..4).prop_map(|items| {
            let items: String = items.iter().map(|i| format!("<li>{i}</li>\n")).collect();
            format!("<ul>\n{items}</ul>")
        }),
        "[a-z ]{1,20}".prop_map(|code| format!("<pre><code>  {code}\n  end</code></pre>")),
        Just("<input type=\"checkbox\" checked=\"checked\">".to_string()),
        Just("<!-- note -->".to_string()),
    ]
}

fn documents() -> impl Strategy<Value = String> {
    (proptest::collection::vec((block(), whitespace()), 0..8), word()).prop_map(|(blocks, title)| {
        let body: String = blocks.iter().map(|(b, ws)| format!("{b}{ws}")).collect();
        format!(
            "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<title>{title}</title>\n</head>\n\
             <body class=\"page\">\n<main>\n{body}\n</main>\n</body>\n</html>\n"
        )
    })
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        .. ProptestConfig::default()
    })]

    /// PROPERTY: minifying minified output changes nothing.
    #[test]
    fn property_minify_is_idempotent(doc in documents()) {
        let minifier = Minifier::new(MinifyConfig::default());
        let path = Path::new("page/index.html");

        let once = minifier.transform(doc.as_bytes(), path).unwrap();
        let twice = minifier.transform(&once, path).unwrap();
        prop_assert_eq!(
            String::from_utf8(twice).unwrap(),
            String::from_utf8(once).unwrap()
        );
    }

    /// PROPERTY: output is never longer than the input.
    #[test]
    fn property_minify_never_grows(doc in documents()) {
        let minifier = Minifier::new(MinifyConfig::default());
        let out = minifier.transform(doc.as_bytes(), Path::new("index.html")).unwrap();
        prop_assert!(out.len() <= doc.len());
    }

    /// PROPERTY: non-HTML outputs pass through byte for byte.
    #[test]
    fn property_non_html_passes_through(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
        let minifier = Minifier::new(MinifyConfig::default());
        let out = minifier.transform(&bytes, Path::new("sitemap.xml")).unwrap();
        prop_assert_eq!(out, bytes);
    }
}
