use geo::algorithm::intersects::Intersects;
use geo::{coord, Rect};
use geojson::JsonValue;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::collection::{
    ensure_dir, point, read_collection, write_json, WaypointCollection, FEATURE_COLLECTION,
};
use crate::error::Result;

pub const REGIONS_INDEX_FILE: &str = "regions_index.json";
pub const OTHERS_ID: &str = "others";
const OTHERS_NAME: &str = "その他";

/// A named bounding box. Points on the boundary belong to the region.
pub struct Region {
    pub id: &'static str,
    pub name: &'static str,
    pub boundary: Rect<f64>,
}

impl Region {
    fn new(
        id: &'static str,
        name: &'static str,
        (min_lat, max_lat): (f64, f64),
        (min_lon, max_lon): (f64, f64),
    ) -> Self {
        Region {
            id,
            name,
            boundary: Rect::new(
                coord! { x: min_lon, y: min_lat },
                coord! { x: max_lon, y: max_lat },
            ),
        }
    }

    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        self.boundary.intersects(&coord! { x: lon, y: lat })
    }
}

/// Japanese regions, checked in order. The boxes overlap; the first match wins.
pub fn japan_regions() -> Vec<Region> {
    vec![
        Region::new("hokkaido", "北海道", (41.0, 46.0), (139.0, 146.0)),
        Region::new("tohoku", "東北", (37.0, 41.5), (138.0, 142.0)),
        Region::new("kanto", "関東", (34.5, 37.0), (138.0, 141.0)),
        Region::new("chubu", "中部", (34.0, 37.5), (135.0, 139.0)),
        Region::new("kinki", "近畿", (33.0, 36.0), (134.0, 137.0)),
        Region::new("chugoku", "中国", (33.5, 36.0), (130.5, 134.5)),
        Region::new("shikoku", "四国", (32.5, 34.5), (132.0, 135.0)),
        Region::new("kyushu", "九州", (31.0, 34.0), (129.0, 132.0)),
        Region::new("okinawa", "沖縄", (24.0, 28.0), (122.0, 129.0)),
    ]
}

pub fn region_file_name(id: &str) -> String {
    format!("waypoints_region_{}.json", id)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionEntry {
    pub id: String,
    pub name: String,
    pub source: String,
}

/// `regions_index.json`: every region file, including `others`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionIndex {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crs: Option<JsonValue>,
    pub regions: Vec<RegionEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionCount {
    pub id: String,
    pub count: usize,
}

/// Assign each feature to the first region containing it, or to `others`.
///
/// Returns one `(id, name, collection)` per region in table order, followed
/// by `others`. Every collection carries the source `crs` and a `region`
/// member with the display name.
pub fn group_by_region(
    collection: WaypointCollection,
    regions: &[Region],
    path: &Path,
) -> Result<Vec<(String, String, WaypointCollection)>> {
    let crs = collection.crs().cloned();
    let new_group = |name: &str| {
        let mut group = WaypointCollection::with_crs(crs.as_ref());
        group
            .members
            .insert("region".to_string(), JsonValue::String(name.to_string()));
        group
    };

    let mut groups: Vec<(String, String, WaypointCollection)> = regions
        .iter()
        .map(|r| (r.id.to_string(), r.name.to_string(), new_group(r.name)))
        .collect();
    groups.push((OTHERS_ID.to_string(), OTHERS_NAME.to_string(), new_group(OTHERS_NAME)));
    let others = groups.len() - 1;

    for feature in collection.features {
        let (lon, lat) = point(&feature, path)?;
        let slot = regions
            .iter()
            .position(|r| r.contains(lon, lat))
            .unwrap_or(others);
        groups[slot].2.features.push(feature);
    }

    Ok(groups)
}

/// Split `source` into one file per region plus `regions_index.json`.
pub fn partition_by_region(source: &Path, output_dir: &Path) -> Result<Vec<RegionCount>> {
    info!("Loading waypoints from {}", source.display());
    let collection = read_collection(source)?;
    let crs = collection.crs().cloned();

    let groups = group_by_region(collection, &japan_regions(), source)?;

    ensure_dir(output_dir)?;

    let mut counts = Vec::with_capacity(groups.len());
    let mut entries = Vec::with_capacity(groups.len());
    for (id, name, group) in &groups {
        let file_name = region_file_name(id);
        write_json(&output_dir.join(&file_name), group)?;
        info!("{} ({}): {} waypoints", name, id, group.features.len());

        counts.push(RegionCount {
            id: id.clone(),
            count: group.features.len(),
        });
        entries.push(RegionEntry {
            id: id.clone(),
            name: name.clone(),
            source: file_name,
        });
    }

    let index = RegionIndex {
        kind: FEATURE_COLLECTION.to_string(),
        crs,
        regions: entries,
    };
    write_json(&output_dir.join(REGIONS_INDEX_FILE), &index)?;

    info!("Split waypoints into {} regions", counts.len());
    Ok(counts)
}
