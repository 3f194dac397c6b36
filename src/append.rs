use geojson::{Feature, Geometry as GeoJsonGeometry, JsonObject, JsonValue};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use tracing::{info, warn};

use crate::collection::{read_collection, write_json};
use crate::coords::{parse_latitude, parse_longitude};
use crate::error::{Error, Result};
use crate::partitioner::{shard_file_name, shard_letter};
use crate::sorter::sort_features;

/// `type` given to waypoints added from a table.
pub const DEFAULT_WAYPOINT_TYPE: &str = "Non-Compulsory";

/// One row of the input table: `id,name1,lat,lon` with DMS coordinates.
#[derive(Debug, Clone, Deserialize)]
pub struct NewWaypoint {
    pub id: String,
    pub name1: String,
    pub lat: String,
    pub lon: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendReport {
    pub added: Vec<String>,
    pub skipped: Vec<String>,
    pub total: usize,
}

pub fn read_new_waypoints(path: &Path) -> Result<Vec<NewWaypoint>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|source| Error::Csv {
            path: path.to_path_buf(),
            source,
        })?;

    reader
        .deserialize::<NewWaypoint>()
        .map(|row| {
            row.map_err(|source| Error::Csv {
                path: path.to_path_buf(),
                source,
            })
        })
        .collect()
}

/// Build a point feature from a table row.
pub fn waypoint_feature(waypoint: &NewWaypoint) -> Result<Feature> {
    let lat = parse_latitude(&waypoint.lat)?;
    let lon = parse_longitude(&waypoint.lon)?;

    let mut properties = JsonObject::new();
    properties.insert("id".to_string(), JsonValue::from(waypoint.id.clone()));
    properties.insert("type".to_string(), JsonValue::from(DEFAULT_WAYPOINT_TYPE));
    properties.insert("name1".to_string(), JsonValue::from(waypoint.name1.clone()));

    Ok(Feature {
        bbox: None,
        geometry: Some(GeoJsonGeometry::new(geojson::Value::Point(vec![lon, lat]))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    })
}

/// Add the rows of `table` to the shard at `shard`, skipping ids it already
/// contains, then sort the shard by id and write it back.
///
/// When `shard` is named `waypoints_<c>.json`, every new id must start with `c`.
pub fn append_waypoints(shard: &Path, table: &Path) -> Result<AppendReport> {
    let letter = shard_letter(shard);
    let mut collection = read_collection(shard)?;
    let rows = read_new_waypoints(table)?;

    let mut existing: HashSet<String> = collection
        .ids(shard)?
        .into_iter()
        .map(str::to_owned)
        .collect();

    let mut added = Vec::new();
    let mut skipped = Vec::new();
    for row in &rows {
        if row.id.is_empty() {
            return Err(Error::schema(table, None, "row has an empty id"));
        }
        if let Some(letter) = letter {
            if !row.id.starts_with(letter) {
                return Err(Error::schema(
                    table,
                    Some(row.id.as_str()),
                    format!("does not belong in {}", shard_file_name(letter)),
                ));
            }
        }
        if existing.contains(&row.id) {
            warn!("Skipping {}: already present", row.id);
            skipped.push(row.id.clone());
            continue;
        }

        let feature = waypoint_feature(row).map_err(|e| match e {
            Error::Coordinate { value, message } => {
                Error::schema(table, Some(row.id.as_str()), format!("{}: {}", value, message))
            }
            other => other,
        })?;
        info!("Adding {} - {}", row.id, row.name1);
        collection.features.push(feature);
        existing.insert(row.id.clone());
        added.push(row.id.clone());
    }

    sort_features(&mut collection, shard)?;
    write_json(shard, &collection)?;

    info!(
        "Added {} waypoints, {} in total",
        added.len(),
        collection.features.len()
    );
    Ok(AppendReport {
        added,
        skipped,
        total: collection.features.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::point;

    #[test]
    fn test_waypoint_feature_layout() {
        let feature = waypoint_feature(&NewWaypoint {
            id: "ABASA".into(),
            name1: "アバサ".into(),
            lat: "242621N".into(),
            lon: "1231508E".into(),
        })
        .unwrap();

        let keys: Vec<_> = feature.properties.as_ref().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["id", "type", "name1"]);
        assert_eq!(feature.property("type"), Some(&JsonValue::from("Non-Compulsory")));
        assert_eq!(
            point(&feature, Path::new("")).unwrap(),
            (123.2522, 24.4392)
        );
    }

    #[test]
    fn test_bad_dms_is_rejected() {
        let err = waypoint_feature(&NewWaypoint {
            id: "ABASA".into(),
            name1: "アバサ".into(),
            lat: "2426N".into(),
            lon: "1231508E".into(),
        })
        .unwrap_err();
        assert!(matches!(err, Error::Coordinate { .. }));
    }
}
