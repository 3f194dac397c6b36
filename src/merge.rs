use std::path::{Path, PathBuf};
use tracing::info;

use crate::collection::{read_collection, read_json, write_json, ShardIndex, WaypointCollection};
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeReport {
    /// `(source, feature count)` in index order.
    pub sources: Vec<(String, usize)>,
    pub total_features: usize,
}

/// Rebuild the full collection from `index.json` and the shards it lists.
///
/// Sources are resolved relative to the index's directory and concatenated
/// in index order. The output takes the index's `crs`. Any unreadable shard
/// fails the whole merge.
pub fn merge_shards(index_path: &Path, output: &Path) -> Result<MergeReport> {
    let index: ShardIndex = read_json(index_path)?;
    let base = index_path.parent().map(Path::to_path_buf).unwrap_or_default();

    info!("Merging {} waypoint files", index.sources.len());

    let mut merged = WaypointCollection::with_crs(index.crs.as_ref());
    let mut sources = Vec::with_capacity(index.sources.len());

    for source in &index.sources {
        let shard_path = resolve_source(&base, source, index_path)?;
        let shard = read_collection(&shard_path)?;
        info!("{}: {} waypoints", source, shard.features.len());
        sources.push((source.clone(), shard.features.len()));
        merged.features.extend(shard.features);
    }

    write_json(output, &merged)?;
    info!(
        "Merged {} waypoints into {}",
        merged.features.len(),
        output.display()
    );

    Ok(MergeReport {
        sources,
        total_features: merged.features.len(),
    })
}

// Index entries are plain file names next to the index.
fn resolve_source(base: &Path, source: &str, index_path: &Path) -> Result<PathBuf> {
    let relative = Path::new(source);
    if source.is_empty() || relative.is_absolute() || relative.components().count() != 1 {
        return Err(Error::parse(
            index_path,
            format!("source '{}' is not a file name", source),
        ));
    }
    Ok(base.join(relative))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_resolve_source_rejects_paths() {
        let index = Path::new("w/index.json");
        assert_eq!(
            resolve_source(Path::new("w"), "waypoints_A.json", index).unwrap(),
            Path::new("w").join("waypoints_A.json")
        );
        assert!(resolve_source(Path::new("w"), "../Waypoints.json", index).is_err());
        assert!(resolve_source(Path::new("w"), "/etc/passwd", index).is_err());
        assert!(resolve_source(Path::new("w"), "", index).is_err());
    }

    #[test]
    fn test_missing_shard_fails_merge() {
        let dir = tempfile::tempdir().unwrap();
        let index_path = dir.path().join("index.json");
        fs::write(
            &index_path,
            r#"{"type":"FeatureCollection","sources":["waypoints_A.json"]}"#,
        )
        .unwrap();

        let output = dir.path().join("Waypoints.json");
        let err = merge_shards(&index_path, &output).unwrap_err();
        assert!(matches!(err, Error::Read { .. }));
        assert!(!output.exists());
    }
}
