use indexmap::IndexMap;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::collection::{
    ensure_dir, read_collection, waypoint_id_at, write_json, ShardIndex, WaypointCollection,
    FEATURE_COLLECTION,
};
use crate::error::{Error, Result};

pub const INDEX_FILE: &str = "index.json";

/// One shard written by [`partition_by_letter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardGroup {
    pub letter: char,
    pub file_name: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionSummary {
    /// Shards in first-seen order, matching the index's `sources`.
    pub groups: Vec<ShardGroup>,
    pub index_path: PathBuf,
    pub total_features: usize,
}

pub fn shard_file_name(letter: char) -> String {
    format!("waypoints_{}.json", letter)
}

pub fn shard_path(dir: &Path, letter: char) -> PathBuf {
    dir.join(shard_file_name(letter))
}

/// The letter of a conventional `waypoints_<c>.json` shard path.
pub fn shard_letter(path: &Path) -> Option<char> {
    let name = path.file_name()?.to_str()?;
    let letter = name.strip_prefix("waypoints_")?.strip_suffix(".json")?;
    let mut chars = letter.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

/// Pairs of letters whose shard file names differ only by case, in
/// first-seen order.
pub fn case_collisions<'a>(letters: impl IntoIterator<Item = &'a char>) -> Vec<(char, char)> {
    let mut folded: HashMap<String, char> = HashMap::new();
    let mut collisions = Vec::new();
    for &letter in letters {
        let key = shard_file_name(letter).to_lowercase();
        match folded.get(&key) {
            Some(&first) if first != letter => collisions.push((first, letter)),
            Some(_) => {}
            None => {
                folded.insert(key, letter);
            }
        }
    }
    collisions
}

/// Whether `dir` resolves file names without regard to case.
pub fn is_case_insensitive(dir: &Path) -> Result<bool> {
    let upper = dir.join(".WAYPOINTS_CASE_CHECK");
    let lower = dir.join(".waypoints_case_check");
    fs::write(&upper, b"").map_err(|source| Error::Write {
        path: upper.clone(),
        source,
    })?;
    let insensitive = lower.exists();
    let _ = fs::remove_file(&upper);
    Ok(insensitive)
}

// Characters that cannot appear in a file name on at least one platform.
fn usable_in_file_name(letter: char) -> bool {
    !letter.is_control()
        && !matches!(letter, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|')
}

/// Group features by the first character of `properties.id`.
///
/// Groups appear in the order their letter is first seen and keep the
/// relative order of their features. Every group carries the source's `crs`.
pub fn group_by_letter(
    collection: WaypointCollection,
    path: &Path,
) -> Result<IndexMap<char, WaypointCollection>> {
    let mut groups: IndexMap<char, WaypointCollection> = IndexMap::new();
    let crs = collection.crs().cloned();

    for (index, feature) in collection.features.into_iter().enumerate() {
        let letter = match waypoint_id_at(&feature, index, path)?.chars().next() {
            Some(letter) => letter,
            None => return Err(Error::schema(path, None, "properties.id is empty")),
        };
        if !usable_in_file_name(letter) {
            let id = waypoint_id_at(&feature, index, path)?.to_string();
            return Err(Error::schema(
                path,
                Some(id.as_str()),
                format!("first character {:?} cannot be used in a shard file name", letter),
            ));
        }

        groups
            .entry(letter)
            .or_insert_with(|| WaypointCollection::with_crs(crs.as_ref()))
            .features
            .push(feature);
    }

    Ok(groups)
}

/// Split `source` into one `waypoints_<c>.json` per leading character, plus
/// an `index.json` listing the shard files, all under `output_dir`.
pub fn partition_by_letter(source: &Path, output_dir: &Path) -> Result<PartitionSummary> {
    info!("Loading waypoints from {}", source.display());
    let collection = read_collection(source)?;
    let total_features = collection.features.len();
    let crs = collection.crs().cloned();

    let groups = group_by_letter(collection, source)?;

    ensure_dir(output_dir)?;

    // waypoints_B.json and waypoints_b.json would be one file here.
    let collisions = case_collisions(groups.keys());
    if let Some(&(first, second)) = collisions.first() {
        if is_case_insensitive(output_dir)? {
            return Err(Error::schema(
                source,
                None,
                format!(
                    "shards for '{}' and '{}' map to the same file in {}, which ignores case",
                    first,
                    second,
                    output_dir.display()
                ),
            ));
        }
        debug!("{} shard names differ only by case", collisions.len());
    }

    let mut summary = Vec::with_capacity(groups.len());
    for (letter, group) in &groups {
        let file_name = shard_file_name(*letter);
        write_json(&output_dir.join(&file_name), group)?;
        info!("Waypoints starting with {}: {}", letter, group.features.len());
        summary.push(ShardGroup {
            letter: *letter,
            file_name,
            count: group.features.len(),
        });
    }

    let index = ShardIndex {
        kind: FEATURE_COLLECTION.to_string(),
        crs,
        sources: summary.iter().map(|g| g.file_name.clone()).collect(),
    };
    let index_path = output_dir.join(INDEX_FILE);
    write_json(&index_path, &index)?;

    info!("Split {} waypoints into {} files", total_features, summary.len());

    Ok(PartitionSummary {
        groups: summary,
        index_path,
        total_features,
    })
}
