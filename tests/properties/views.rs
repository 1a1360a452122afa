//! Property tests for derived catalog views.

use proptest::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::HashSet;

use thisthat::catalog::{Catalog, RawEntry, load};
use thisthat::views::{compute_sequential_links, group_by_category, related, sample_with_rng};

/// Catalogs with unique slugs and a mix of categorized and bare entries.
fn catalogs() -> impl Strategy<Value = Catalog> {
    proptest::collection::hash_set("[a-z]{1,8}", 0..20)
        .prop_flat_map(|set| {
            let slugs: Vec<String> = set.into_iter().collect();
            let len = slugs.len();
            (
                Just(slugs),
                proptest::collection::vec(proptest::option::of("[A-D]"), len),
            )
        })
        .prop_map(|(slugs, categories)| {
            let raw = slugs
                .iter()
                .zip(&categories)
                .map(|(slug, category)| RawEntry::new(slug, slug, category.as_deref()))
                .collect();
            load(raw).unwrap()
        })
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        .. ProptestConfig::default()
    })]

    /// PROPERTY: neighbors are exactly the adjacent catalog entries.
    #[test]
    fn property_sequential_links_follow_order(catalog in catalogs()) {
        let links = compute_sequential_links(&catalog);
        prop_assert_eq!(links.len(), catalog.len());

        let entries = catalog.entries();
        for (i, entry) in entries.iter().enumerate() {
            let neighbors = links.get(&entry.slug).unwrap();
            let previous = neighbors.previous.map(|e| e.slug.as_str());
            let next = neighbors.next.map(|e| e.slug.as_str());
            let expected_previous = i.checked_sub(1).map(|j| entries[j].slug.as_str());
            let expected_next = entries.get(i + 1).map(|e| e.slug.as_str());
            prop_assert_eq!(previous, expected_previous);
            prop_assert_eq!(next, expected_next);
        }
    }

    /// PROPERTY: grouping places every entry exactly once, in catalog order
    /// within its group.
    #[test]
    fn property_grouping_covers_catalog(catalog in catalogs()) {
        let groups = group_by_category(&catalog, "Uncategorized");

        let total: usize = groups.values().map(Vec::len).sum();
        prop_assert_eq!(total, catalog.len());

        for (label, entries) in &groups {
            let mut last = None;
            for entry in entries {
                let expected = entry.category.as_deref().unwrap_or("Uncategorized");
                prop_assert_eq!(expected, label.as_str());
                let position = catalog.position(&entry.slug);
                prop_assert!(position > last, "group {label} out of catalog order");
                last = position;
            }
        }
    }

    /// PROPERTY: a sample has min(count, len) distinct entries.
    #[test]
    fn property_sample_is_bounded_and_distinct(
        catalog in catalogs(),
        count in 0usize..30,
        seed in any::<u64>(),
    ) {
        let mut rng = StdRng::seed_from_u64(seed);
        let picked = sample_with_rng(&catalog, count, &mut rng);
        prop_assert_eq!(picked.len(), count.min(catalog.len()));

        let distinct: HashSet<&str> = picked.iter().map(|e| e.slug.as_str()).collect();
        prop_assert_eq!(distinct.len(), picked.len());
    }

    /// PROPERTY: related picks never include the entry itself and repeat
    /// across calls.
    #[test]
    fn property_related_is_stable_and_excludes_self(
        catalog in catalogs().prop_filter("needs an entry", |c| !c.is_empty()),
        pick in any::<prop::sample::Index>(),
        count in 0usize..6,
    ) {
        let entry = &catalog.entries()[pick.index(catalog.len())];
        let first = related(&catalog, entry, count);
        let second = related(&catalog, entry, count);

        prop_assert_eq!(first.len(), count.min(catalog.len() - 1));
        prop_assert!(first.iter().all(|e| e.slug != entry.slug));
        prop_assert_eq!(first, second);
    }
}
