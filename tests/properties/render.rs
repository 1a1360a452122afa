//! Property tests for body rendering.

use proptest::prelude::*;

use thisthat::catalog::{RawEntry, load};
use thisthat::config::MarkdownConfig;
use thisthat::render::{RenderNode, Renderer};

fn prose_line() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-zA-Z ,.]{0,40}",
        "## [a-z ]{1,20}",
        "- [a-z ]{1,20}",
        Just(String::new()),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        .. ProptestConfig::default()
    })]

    /// PROPERTY: arbitrary text never panics; any error names the entry.
    #[test]
    fn property_render_never_panics(body in "\\PC{0,200}") {
        let catalog = load(vec![RawEntry::new("a-vs-b", "a vs b", None)]).unwrap();
        let entry = &catalog.entries()[0];
        if let Err(e) = Renderer::new(MarkdownConfig::default()).render(entry, &body) {
            prop_assert_eq!(e.slug(), "a-vs-b");
        }
    }

    /// PROPERTY: balanced callouts around plain prose always render, one
    /// callout node per block, in order.
    #[test]
    fn property_balanced_callouts_render(
        blocks in proptest::collection::vec(
            (proptest::collection::vec(prose_line(), 0..4), any::<bool>()),
            0..6,
        )
    ) {
        let catalog = load(vec![RawEntry::new("a-vs-b", "a vs b", None)]).unwrap();
        let entry = &catalog.entries()[0];

        let mut body = String::new();
        let mut callouts = 0;
        for (lines, is_callout) in &blocks {
            if *is_callout {
                callouts += 1;
                body.push_str("{% callout %}\n");
            }
            for line in lines {
                body.push_str(line);
                body.push('\n');
            }
            if *is_callout {
                body.push_str("{% endcallout %}\n");
            }
            body.push('\n');
        }

        let tree = Renderer::new(MarkdownConfig::default()).render(entry, &body).unwrap();
        let rendered = tree
            .nodes
            .iter()
            .filter(|n| matches!(n, RenderNode::Callout(_)))
            .count();
        prop_assert_eq!(rendered, callouts);
        prop_assert_eq!(tree.fragments().count(), 0);
    }
}
