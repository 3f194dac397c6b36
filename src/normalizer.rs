use std::path::Path;
use tracing::info;

use crate::collection::{
    point_mut, read_collection, waypoint_id_at, write_json, WaypointCollection,
};
use crate::error::Result;

/// Decimal digits kept for longitude and latitude.
pub const COORDINATE_PRECISION: i32 = 4;

/// A feature whose coordinates were rewritten.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinateChange {
    pub id: String,
    pub original_lon: f64,
    pub normalized_lon: f64,
    pub original_lat: f64,
    pub normalized_lat: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizeReport {
    pub total: usize,
    pub changes: Vec<CoordinateChange>,
}

/// Round `value` to [`COORDINATE_PRECISION`] decimal digits, halves away
/// from zero (139.69175 -> 139.6918, -0.00005 -> -0.0001).
///
/// The midpoint test is made on `value * 10^4` as computed in `f64`, not on
/// the exact decimal expansion of `value`. The division is correctly rounded,
/// so the result is the closest `f64` to the rounded decimal and rounding it
/// again returns it unchanged.
///
/// Values whose scaled form reaches 2^52 have no fractional digits left at
/// this precision and are returned as is.
pub fn round_coordinate(value: f64) -> f64 {
    let scale = 10f64.powi(COORDINATE_PRECISION);
    let scaled = value * scale;
    if !scaled.is_finite() || scaled.abs() >= 2f64.powi(52) {
        return value;
    }
    scaled.round() / scale
}

/// Round every feature's coordinates in place and report the ones that changed.
pub fn normalize_features(
    collection: &mut WaypointCollection,
    path: &Path,
) -> Result<Vec<CoordinateChange>> {
    let mut changes = Vec::new();

    for (index, feature) in collection.features.iter_mut().enumerate() {
        let id = waypoint_id_at(feature, index, path)?.to_string();
        let position = point_mut(feature, path)?;

        let (original_lon, original_lat) = (position[0], position[1]);
        let normalized_lon = round_coordinate(original_lon);
        let normalized_lat = round_coordinate(original_lat);

        if normalized_lon != original_lon || normalized_lat != original_lat {
            position[0] = normalized_lon;
            position[1] = normalized_lat;
            info!(
                "Normalized {} [{} -> {}, {} -> {}]",
                id, original_lon, normalized_lon, original_lat, normalized_lat
            );
            changes.push(CoordinateChange {
                id,
                original_lon,
                normalized_lon,
                original_lat,
                normalized_lat,
            });
        }
    }

    Ok(changes)
}

/// Normalize the shard at `path` and write it back in place.
pub fn normalize_shard(path: &Path) -> Result<NormalizeReport> {
    info!("Reading {}", path.display());
    let mut collection = read_collection(path)?;

    let changes = normalize_features(&mut collection, path)?;
    write_json(path, &collection)?;

    info!("Normalized {} coordinates in total", changes.len());
    Ok(NormalizeReport {
        total: collection.features.len(),
        changes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::point;
    use crate::error::Error;
    use serde_json::json;

    fn shard(coords: &[(&str, f64, f64)]) -> WaypointCollection {
        let features: Vec<_> = coords
            .iter()
            .map(|(id, lon, lat)| {
                json!({
                    "type": "Feature",
                    "properties": {"id": id, "type": "Compulsory", "name1": "x"},
                    "geometry": {"type": "Point", "coordinates": [lon, lat]}
                })
            })
            .collect();
        serde_json::from_value(json!({"type": "FeatureCollection", "features": features}))
            .unwrap()
    }

    #[test]
    fn test_round_half_away_from_zero() {
        assert_eq!(round_coordinate(139.69175049), 139.6918);
        assert_eq!(round_coordinate(35.68949012), 35.6895);
        assert_eq!(round_coordinate(0.00005), 0.0001);
        assert_eq!(round_coordinate(-0.00005), -0.0001);
        assert_eq!(round_coordinate(-122.41941), -122.4194);
        assert_eq!(round_coordinate(12.5), 12.5);
    }

    #[test]
    fn test_huge_values_are_left_alone() {
        assert_eq!(round_coordinate(1e305), 1e305);
        assert_eq!(round_coordinate(-f64::MAX), -f64::MAX);
        assert_eq!(round_coordinate(4.5e15), 4.5e15);
    }

    #[test]
    fn test_rounding_is_idempotent() {
        for value in [139.69175049, 35.68949012, -33.86785, 0.1, 179.99995, 1e-9] {
            let once = round_coordinate(value);
            assert_eq!(round_coordinate(once), once);
        }
    }

    #[test]
    fn test_reports_only_changed_features() {
        let path = Path::new("waypoints_A.json");
        let mut collection = shard(&[
            ("ABASA", 123.2522, 24.4392),
            ("TOKYO", 139.69175049, 35.68949012),
        ]);
        let before = collection.features[0].clone();

        let changes = normalize_features(&mut collection, path).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].id, "TOKYO");
        assert_eq!(changes[0].original_lon, 139.69175049);
        assert_eq!(changes[0].normalized_lat, 35.6895);

        assert_eq!(collection.features[0], before);
        assert_eq!(point(&collection.features[1], path).unwrap(), (139.6918, 35.6895));
        assert_eq!(
            collection.features[1].property("type"),
            Some(&json!("Compulsory"))
        );

        let again = normalize_features(&mut collection, path).unwrap();
        assert!(again.is_empty());
    }

    #[test]
    fn test_non_point_geometry_is_schema_error() {
        let path = Path::new("waypoints_A.json");
        let mut collection: WaypointCollection = serde_json::from_value(json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": {"id": "ALPHA"},
                "geometry": {"type": "LineString", "coordinates": [[0.0, 0.0], [1.0, 1.0]]}
            }]
        }))
        .unwrap();

        match normalize_features(&mut collection, path) {
            Err(Error::Schema { id, .. }) => assert_eq!(id.as_deref(), Some("ALPHA")),
            other => panic!("unexpected {:?}", other),
        }
    }
}
