//! Property tests for catalog loading.

use proptest::prelude::*;

use thisthat::catalog::{LoadError, RawEntry, load};
use thisthat::slug::{RESERVED_SLUGS, slugify};

fn slugs() -> impl Strategy<Value = Vec<String>> {
    proptest::collection::hash_set("[a-z]{1,6}(-vs-[a-z]{1,6})?", 0..16)
        .prop_map(|set| set.into_iter().collect())
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        .. ProptestConfig::default()
    })]

    /// PROPERTY: loading keeps entries in catalog order.
    #[test]
    fn property_load_preserves_order(slugs in slugs()) {
        let raw = slugs.iter().map(|s| RawEntry::new(s, &s.to_uppercase(), None)).collect();
        let catalog = load(raw).unwrap();
        let loaded: Vec<&str> = catalog.iter().map(|e| e.slug.as_str()).collect();
        prop_assert_eq!(loaded, slugs.iter().map(String::as_str).collect::<Vec<_>>());
        for (i, slug) in slugs.iter().enumerate() {
            prop_assert_eq!(catalog.position(slug), Some(i));
        }
    }

    /// PROPERTY: a repeated slug anywhere in the list fails the whole load.
    #[test]
    fn property_duplicate_slug_rejected(
        slugs in slugs().prop_filter("needs an entry", |s| !s.is_empty()),
        pick in any::<prop::sample::Index>(),
        at in any::<prop::sample::Index>(),
    ) {
        let duplicate = slugs[pick.index(slugs.len())].clone();
        let mut raw: Vec<RawEntry> =
            slugs.iter().map(|s| RawEntry::new(s, s, None)).collect();
        raw.insert(at.index(raw.len() + 1), RawEntry::new(&duplicate, "again", None));

        let is_duplicate = matches!(load(raw), Err(LoadError::DuplicateSlug { .. }));
        prop_assert!(is_duplicate);
    }

    /// PROPERTY: a title-only entry gets the slug derived from its title.
    #[test]
    fn property_missing_slug_is_derived(words in proptest::collection::vec("[a-z]{1,5}", 1..4)) {
        let title = words.join(" ");
        let raw = RawEntry {
            slug: None,
            title: Some(title.clone()),
            category: None,
        };
        let catalog = load(vec![raw]).unwrap();
        let entry = &catalog.entries()[0];
        prop_assert_eq!(&entry.slug, &words.join("-"));
        prop_assert_eq!(&entry.title, &title);
    }

    /// PROPERTY: whatever the title, a loaded entry's slug is its stored
    /// title slugified, links to itself, and never takes a site page's name.
    #[test]
    fn property_derived_slug_is_linkable(title in "[ a-zA-Z0-9#?%.:-]{1,24}") {
        let raw = RawEntry {
            slug: None,
            title: Some(title),
            category: None,
        };
        if let Ok(catalog) = load(vec![raw]) {
            let entry = &catalog.entries()[0];
            prop_assert_eq!(&slugify(&entry.title), &entry.slug);
            prop_assert!(!entry.slug.contains(['#', '?', '%', ' ']));
            prop_assert!(!RESERVED_SLUGS.contains(&entry.slug.as_str()));
        }
    }
}
