//! Derived views over a loaded [`Catalog`].
//!
//! Every view here is a pure function of the catalog and borrows its entries,
//! so a view can never outlive, or drift from, the catalog it was built from.
//! Views are computed once on the main thread before any per-entry work starts
//! and are then shared read-only with the page workers.
//!
//! - [`group_by_category`]: category label → entries, labels sorted
//! - [`index_view`]: the home page shape (grouped or flat) chosen by config
//! - [`compute_sequential_links`]: previous/next neighbors in catalog order
//! - [`sample`] / [`related`]: random picks without replacement

use crate::catalog::{Catalog, Entry};
use crate::config::{CatalogConfig, CatalogLayout};
use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};

/// Category label → entries in catalog order. Labels iterate in ascending
/// byte order (lexicographic, case-sensitive).
pub type CategoryGrouping<'a> = BTreeMap<String, Vec<&'a Entry>>;

/// Group entries by category. Entries without one go under `uncategorized`.
pub fn group_by_category<'a>(catalog: &'a Catalog, uncategorized: &str) -> CategoryGrouping<'a> {
    let mut groups: CategoryGrouping<'a> = BTreeMap::new();
    for entry in catalog {
        let label = entry.category.as_deref().unwrap_or(uncategorized);
        groups.entry(label.to_string()).or_default().push(entry);
    }
    groups
}

/// Shape of the home page listing.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexView<'a> {
    Grouped(CategoryGrouping<'a>),
    Flat(Vec<&'a Entry>),
}

impl<'a> IndexView<'a> {
    /// All entries in display order.
    pub fn entries(&self) -> Vec<&'a Entry> {
        match self {
            IndexView::Grouped(groups) => groups.values().flatten().copied().collect(),
            IndexView::Flat(entries) => entries.clone(),
        }
    }
}

/// Build the home page view for the configured catalog layout.
pub fn index_view<'a>(catalog: &'a Catalog, config: &CatalogConfig) -> IndexView<'a> {
    match config.layout {
        CatalogLayout::Grouped => {
            IndexView::Grouped(group_by_category(catalog, &config.uncategorized_label))
        }
        CatalogLayout::Flat => IndexView::Flat(catalog.iter().collect()),
    }
}

/// An entry's neighbors in catalog order.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Neighbors<'a> {
    pub previous: Option<&'a Entry>,
    pub next: Option<&'a Entry>,
}

/// Slug → neighbors for every entry of a catalog.
#[derive(Debug, Clone, Default)]
pub struct SequentialLinks<'a> {
    by_slug: HashMap<&'a str, Neighbors<'a>>,
}

impl<'a> SequentialLinks<'a> {
    pub fn get(&self, slug: &str) -> Option<Neighbors<'a>> {
        self.by_slug.get(slug).copied()
    }

    pub fn len(&self) -> usize {
        self.by_slug.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_slug.is_empty()
    }
}

/// Compute previous/next links in a single pass over catalog order.
pub fn compute_sequential_links(catalog: &Catalog) -> SequentialLinks<'_> {
    let entries = catalog.entries();
    let by_slug = entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let neighbors = Neighbors {
                previous: i.checked_sub(1).map(|p| &entries[p]),
                next: entries.get(i + 1),
            };
            (entry.slug.as_str(), neighbors)
        })
        .collect();
    SequentialLinks { by_slug }
}

/// Pick `count` distinct entries uniformly at random.
///
/// `count` is clamped to the catalog size.
pub fn sample(catalog: &Catalog, count: usize) -> Vec<&Entry> {
    sample_with_rng(catalog, count, &mut rand::thread_rng())
}

/// [`sample`] with a caller-provided random source.
pub fn sample_with_rng<'a, R: Rng + ?Sized>(
    catalog: &'a Catalog,
    count: usize,
    rng: &mut R,
) -> Vec<&'a Entry> {
    let pool: Vec<&Entry> = catalog.iter().collect();
    pick(&pool, count, rng)
}

/// Reproducible suggestions for `entry`: up to `count` other entries, seeded
/// by the entry slug so repeated builds choose the same ones.
pub fn related<'a>(catalog: &'a Catalog, entry: &Entry, count: usize) -> Vec<&'a Entry> {
    let pool: Vec<&Entry> = catalog.iter().filter(|e| e.slug != entry.slug).collect();
    pick(&pool, count, &mut seeded_rng(&entry.slug))
}

/// Deterministic RNG derived from the SHA-256 of `key`.
pub fn seeded_rng(key: &str) -> StdRng {
    let digest = Sha256::digest(key.as_bytes());
    let mut seed = [0u8; 32];
    seed.copy_from_slice(&digest);
    StdRng::from_seed(seed)
}

fn pick<'a, R: Rng + ?Sized>(pool: &[&'a Entry], count: usize, rng: &mut R) -> Vec<&'a Entry> {
    let amount = count.min(pool.len());
    index::sample(rng, pool.len(), amount)
        .into_iter()
        .map(|i| pool[i])
        .collect()
}
