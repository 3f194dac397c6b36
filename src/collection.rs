use geojson::{Feature, JsonObject, JsonValue, Value as GeoJsonValue};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{self, create_dir_all};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{Error, Result};

pub const FEATURE_COLLECTION: &str = "FeatureCollection";

/// A GeoJSON FeatureCollection of waypoints.
///
/// Top-level members other than `type` and `features` (notably `crs`) are
/// kept verbatim and in their original order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaypointCollection {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub members: JsonObject,
    pub features: Vec<Feature>,
}

impl WaypointCollection {
    /// An empty collection carrying `crs` when the source had one.
    pub fn with_crs(crs: Option<&JsonValue>) -> Self {
        let mut members = JsonObject::new();
        if let Some(crs) = crs {
            members.insert("crs".to_string(), crs.clone());
        }
        WaypointCollection {
            kind: FEATURE_COLLECTION.to_string(),
            members,
            features: Vec::new(),
        }
    }

    pub fn crs(&self) -> Option<&JsonValue> {
        self.members.get("crs")
    }

    /// Ids of all features, in order.
    pub fn ids<'a>(&'a self, path: &Path) -> Result<Vec<&'a str>> {
        self.features
            .iter()
            .enumerate()
            .map(|(index, feature)| waypoint_id_at(feature, index, path))
            .collect()
    }
}

/// `index.json`: the shard files produced by a letter partition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShardIndex {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crs: Option<JsonValue>,
    #[serde(default)]
    pub sources: Vec<String>,
}

/// Returns `properties.id`, which must be a non-empty string.
pub fn waypoint_id<'a>(feature: &'a Feature, path: &Path) -> Result<&'a str> {
    match feature.property("id") {
        Some(JsonValue::String(id)) if !id.is_empty() => Ok(id.as_str()),
        Some(JsonValue::String(_)) => Err(Error::schema(path, None, "properties.id is empty")),
        Some(_) => Err(Error::schema(path, None, "properties.id is not a string")),
        None => Err(Error::schema(path, None, "missing properties.id")),
    }
}

/// [`waypoint_id`] for the feature at `index`, naming its position when it
/// has no usable id.
pub fn waypoint_id_at<'a>(feature: &'a Feature, index: usize, path: &Path) -> Result<&'a str> {
    waypoint_id(feature, path).map_err(|e| match e {
        Error::Schema {
            path,
            id: None,
            message,
        } => Error::Schema {
            path,
            id: None,
            message: format!("feature #{}: {}", index, message),
        },
        other => other,
    })
}

/// Mutable access to a feature's `[longitude, latitude]` pair.
pub fn point_mut<'a>(feature: &'a mut Feature, path: &Path) -> Result<&'a mut Vec<f64>> {
    let id = waypoint_id(feature, path)?.to_string();
    let geometry = feature
        .geometry
        .as_mut()
        .ok_or_else(|| Error::schema(path, Some(id.as_str()), "missing geometry"))?;

    match &mut geometry.value {
        GeoJsonValue::Point(position) => {
            if position.len() != 2 {
                return Err(Error::schema(
                    path,
                    Some(id.as_str()),
                    format!("expected 2 coordinates, found {}", position.len()),
                ));
            }
            if position.iter().any(|c| !c.is_finite()) {
                return Err(Error::schema(path, Some(id.as_str()), "coordinate is not finite"));
            }
            Ok(position)
        }
        _ => Err(Error::schema(path, Some(id.as_str()), "geometry is not a Point")),
    }
}

/// A feature's `(longitude, latitude)`.
pub fn point(feature: &Feature, path: &Path) -> Result<(f64, f64)> {
    let id = waypoint_id(feature, path)?;
    match feature.geometry.as_ref().map(|g| &g.value) {
        Some(GeoJsonValue::Point(position)) if position.len() == 2 => {
            let (lon, lat) = (position[0], position[1]);
            if !lon.is_finite() || !lat.is_finite() {
                return Err(Error::schema(path, Some(id), "coordinate is not finite"));
            }
            Ok((lon, lat))
        }
        Some(GeoJsonValue::Point(_)) => {
            Err(Error::schema(path, Some(id), "expected 2 coordinates"))
        }
        Some(_) => Err(Error::schema(path, Some(id), "geometry is not a Point")),
        None => Err(Error::schema(path, Some(id), "missing geometry")),
    }
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    debug!("Loading file: {}", path.display());
    let contents = fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|e| Error::parse(path, e.to_string()))
}

/// Load a waypoint collection, rejecting anything that is not a FeatureCollection.
pub fn read_collection(path: &Path) -> Result<WaypointCollection> {
    let collection: WaypointCollection = read_json(path)?;
    if collection.kind != FEATURE_COLLECTION {
        return Err(Error::parse(
            path,
            format!("expected type FeatureCollection, found {}", collection.kind),
        ));
    }
    debug!("Found {} features in {}", collection.features.len(), path.display());
    Ok(collection)
}

/// Pretty-print `value` to `path` with two-space indentation.
///
/// The JSON is written to a sibling temporary file first and renamed over
/// `path`, so a failed write leaves the previous contents in place.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(|e| Error::Write {
        path: path.to_path_buf(),
        source: e.into(),
    })?;

    let tmp_path = temp_path(path);
    let result = fs::write(&tmp_path, json).and_then(|_| fs::rename(&tmp_path, path));
    if let Err(source) = result {
        let _ = fs::remove_file(&tmp_path);
        return Err(Error::Write {
            path: path.to_path_buf(),
            source,
        });
    }
    debug!("Wrote {}", path.display());
    Ok(())
}

pub fn ensure_dir(dir: &Path) -> Result<()> {
    create_dir_all(dir).map_err(|source| Error::Write {
        path: dir.to_path_buf(),
        source,
    })
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("waypoints");
    path.with_file_name(format!(".{}.tmp", name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn feature(value: JsonValue) -> Feature {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_members_keep_order_and_crs() {
        let raw = r#"{"type":"FeatureCollection","crs":{"type":"name","properties":{"name":"EPSG:4326"}},"name":"Waypoints","features":[]}"#;
        let collection: WaypointCollection = serde_json::from_str(raw).unwrap();
        assert_eq!(
            collection.crs(),
            Some(&json!({"type":"name","properties":{"name":"EPSG:4326"}}))
        );
        assert_eq!(serde_json::to_string(&collection).unwrap(), raw);
    }

    #[test]
    fn test_null_crs_is_preserved() {
        let collection = WaypointCollection::with_crs(Some(&JsonValue::Null));
        let out = serde_json::to_string(&collection).unwrap();
        assert_eq!(out, r#"{"type":"FeatureCollection","crs":null,"features":[]}"#);
    }

    #[test]
    fn test_waypoint_id_rules() {
        let path = Path::new("t.json");
        let ok = feature(json!({"type":"Feature","geometry":null,"properties":{"id":"ABASA"}}));
        assert_eq!(waypoint_id(&ok, path).unwrap(), "ABASA");

        let empty = feature(json!({"type":"Feature","geometry":null,"properties":{"id":""}}));
        assert!(matches!(waypoint_id(&empty, path), Err(Error::Schema { .. })));

        let missing = feature(json!({"type":"Feature","geometry":null,"properties":{"name1":"x"}}));
        assert!(matches!(waypoint_id(&missing, path), Err(Error::Schema { .. })));

        let numeric = feature(json!({"type":"Feature","geometry":null,"properties":{"id":7}}));
        assert!(matches!(waypoint_id(&numeric, path), Err(Error::Schema { .. })));
    }

    #[test]
    fn test_id_errors_name_the_feature_position() {
        let path = Path::new("Waypoints.json");
        let collection: WaypointCollection = serde_json::from_value(json!({
            "type": "FeatureCollection",
            "features": [
                {"type":"Feature","geometry":null,"properties":{"id":"ABASA"}},
                {"type":"Feature","geometry":null,"properties":{"id":"ABIRA"}},
                {"type":"Feature","geometry":null,"properties":{"name1":"?"}}
            ]
        }))
        .unwrap();

        let err = collection.ids(path).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid feature in Waypoints.json: feature #2: missing properties.id"
        );
    }

    #[test]
    fn test_point_requires_two_coordinates() {
        let path = Path::new("t.json");
        let three = feature(json!({
            "type":"Feature",
            "geometry":{"type":"Point","coordinates":[1.0,2.0,3.0]},
            "properties":{"id":"X"}
        }));
        match point(&three, path) {
            Err(Error::Schema { id, .. }) => assert_eq!(id.as_deref(), Some("X")),
            other => panic!("unexpected {:?}", other),
        }

        let mut ok = feature(json!({
            "type":"Feature",
            "geometry":{"type":"Point","coordinates":[139.5,35.25]},
            "properties":{"id":"X"}
        }));
        assert_eq!(point(&ok, path).unwrap(), (139.5, 35.25));
        point_mut(&mut ok, path).unwrap()[0] = 140.0;
        assert_eq!(point(&ok, path).unwrap(), (140.0, 35.25));
    }

    #[test]
    fn test_non_finite_coordinate_is_schema_error() {
        let path = Path::new("t.json");
        let mut f = feature(json!({
            "type":"Feature",
            "geometry":{"type":"Point","coordinates":[1.0,2.0]},
            "properties":{"id":"X"}
        }));
        if let Some(geometry) = f.geometry.as_mut() {
            geometry.value = GeoJsonValue::Point(vec![f64::NAN, 2.0]);
        }
        assert!(matches!(point_mut(&mut f, path), Err(Error::Schema { .. })));
    }

    #[test]
    fn test_read_collection_rejects_other_types() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.json");
        fs::write(&path, r#"{"type":"Feature","features":[]}"#).unwrap();
        assert!(matches!(read_collection(&path), Err(Error::Parse { .. })));

        fs::write(&path, "{not json").unwrap();
        assert!(matches!(read_collection(&path), Err(Error::Parse { .. })));

        let missing = dir.path().join("missing.json");
        assert!(matches!(read_collection(&missing), Err(Error::Read { .. })));
    }

    #[test]
    fn test_write_json_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        write_json(&path, &WaypointCollection::with_crs(None)).unwrap();
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("out.json")]);
        assert!(fs::read_to_string(&path).unwrap().contains("\n  \"type\""));
    }
}
