use std::path::Path;
use tracing::debug;

use crate::collection::{point, read_collection, waypoint_id_at};
use crate::coords::{format_dms, Axis};
use crate::error::Result;
use crate::partitioner::shard_path;

#[derive(Debug, Clone, PartialEq)]
pub struct WaypointDetails {
    pub id: String,
    pub name1: Option<String>,
    pub kind: Option<String>,
    pub lon: f64,
    pub lat: f64,
}

impl WaypointDetails {
    /// `DD°MM'SS"N DDD°MM'SS"E`
    pub fn dms(&self) -> String {
        format!(
            "{} {}",
            format_dms(self.lat, Axis::Latitude),
            format_dms(self.lon, Axis::Longitude)
        )
    }
}

/// Look up `id` in the shard for its first character under `shard_dir`.
///
/// A missing shard file means no waypoint starts with that character and
/// yields `Ok(None)`.
pub fn find_waypoint(shard_dir: &Path, id: &str) -> Result<Option<WaypointDetails>> {
    let Some(letter) = id.chars().next() else {
        return Ok(None);
    };
    let path = shard_path(shard_dir, letter);
    if !path.exists() {
        debug!("No shard at {}", path.display());
        return Ok(None);
    }

    let collection = read_collection(&path)?;
    for (index, feature) in collection.features.iter().enumerate() {
        if waypoint_id_at(feature, index, &path)? != id {
            continue;
        }
        let (lon, lat) = point(feature, &path)?;
        let text = |key: &str| {
            feature
                .property(key)
                .and_then(|v| v.as_str())
                .map(str::to_owned)
        };
        return Ok(Some(WaypointDetails {
            id: id.to_string(),
            name1: text("name1"),
            kind: text("type"),
            lon,
            lat,
        }));
    }

    debug!("{} not found among {} waypoints", id, collection.features.len());
    Ok(None)
}
