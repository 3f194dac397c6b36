use feruca::Collator;
use std::cmp::Ordering;
use std::path::Path;
use tracing::info;

use crate::collection::{read_collection, write_json, WaypointCollection};
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortReport {
    pub count: usize,
    /// Whether any feature moved.
    pub changed: bool,
}

/// Compares waypoint ids with the Unicode Collation Algorithm using the CLDR
/// root collation, independent of the host locale.
///
/// Distinct strings never compare equal (ties fall back to code points), so
/// only identical ids are treated as equal keys.
pub struct IdCollator {
    collator: Collator,
}

impl Default for IdCollator {
    fn default() -> Self {
        IdCollator {
            collator: Collator::default(),
        }
    }
}

impl IdCollator {
    pub fn compare(&mut self, a: &str, b: &str) -> Ordering {
        if a == b {
            return Ordering::Equal;
        }
        self.collator.collate(a, b)
    }
}

/// Stable sort of `collection.features` by id. Returns whether the order changed.
pub fn sort_features(collection: &mut WaypointCollection, path: &Path) -> Result<bool> {
    let original: Vec<String> = collection
        .ids(path)?
        .into_iter()
        .map(str::to_owned)
        .collect();

    let mut keyed: Vec<_> = original
        .iter()
        .cloned()
        .zip(std::mem::take(&mut collection.features))
        .collect();

    let mut collator = IdCollator::default();
    keyed.sort_by(|(a, _), (b, _)| collator.compare(a, b));

    let mut changed = false;
    for ((id, _), before) in keyed.iter().zip(&original) {
        if id != before {
            changed = true;
            break;
        }
    }

    collection.features = keyed.into_iter().map(|(_, feature)| feature).collect();
    Ok(changed)
}

/// Sort the shard at `path` by waypoint id and write it back in place.
///
/// Nothing is written unless the read and the sort both succeed.
pub fn sort_shard(path: &Path) -> Result<SortReport> {
    info!("Reading {}", path.display());
    let mut collection = read_collection(path)?;

    let changed = sort_features(&mut collection, path)?;
    write_json(path, &collection)?;

    let count = collection.features.len();
    info!("Sorted {} waypoints by id", count);
    if changed {
        info!("Order changed");
    } else {
        info!("Order was already sorted");
    }

    Ok(SortReport { count, changed })
}

/// Check that every adjacent pair of ids is in collation order.
pub fn is_sorted(collection: &WaypointCollection, path: &Path) -> Result<bool> {
    let ids = collection.ids(path)?;
    let mut collator = IdCollator::default();
    Ok(ids
        .windows(2)
        .all(|pair| collator.compare(pair[0], pair[1]) != Ordering::Greater))
}
