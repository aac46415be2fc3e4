//! Loading of uploaded geometry files.
//!
//! Any GeoJSON object (geometry, feature or collection) is normalised to a
//! `FeatureCollection`, since that is what map sources take.

pub mod demo;
mod split;

pub use split::{split_by_square, MAX_SPLIT_CELLS};

use crate::error::DataError;
use geojson::{Feature, FeatureCollection, GeoJson, Geometry, Value};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Read and normalise a GeoJSON file. With `filter` set, only features of
/// the predominant geometry type are kept.
pub fn load_feature_collection(path: &Path, filter: bool) -> Result<FeatureCollection, DataError> {
    let mut bytes = fs::read(path)?;
    let collection = parse_feature_collection(&mut bytes, filter)?;
    debug!(path = %path.display(), features = collection.features.len(), "loaded geometry");
    Ok(collection)
}

/// Parse GeoJSON in place; the buffer is used as scratch space by the parser
pub fn parse_feature_collection(bytes: &mut [u8], filter: bool) -> Result<FeatureCollection, DataError> {
    let value: serde_json::Value = simd_json::serde::from_slice(bytes).map_err(|e| DataError::Parse(e.to_string()))?;
    let geojson = GeoJson::from_json_value(value).map_err(|e| DataError::Parse(e.to_string()))?;
    normalize(geojson, filter)
}

pub fn normalize(geojson: GeoJson, filter: bool) -> Result<FeatureCollection, DataError> {
    let mut collection = match geojson {
        GeoJson::FeatureCollection(fc) => fc,
        GeoJson::Feature(feature) => collection_of(vec![feature]),
        GeoJson::Geometry(geometry) => collection_of(vec![Feature::from(geometry)]),
    };
    if collection.features.is_empty() {
        return Err(DataError::Empty);
    }

    for feature in &mut collection.features {
        if let Some(geometry) = feature.geometry.as_mut() {
            unwrap_single_collection(geometry);
        }
    }

    if filter {
        if let Some(kind) = main_geometry_kind(&collection) {
            collection
                .features
                .retain(|f| f.geometry.as_ref().and_then(|g| GeometryKind::of(&g.value)) == Some(kind));
        }
    }
    Ok(collection)
}

fn collection_of(features: Vec<Feature>) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

/// Replace a `GeometryCollection` holding exactly one geometry by that geometry
fn unwrap_single_collection(geometry: &mut Geometry) {
    if let Value::GeometryCollection(members) = &mut geometry.value {
        if members.len() == 1 {
            if let Some(inner) = members.pop() {
                *geometry = inner;
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GeometryKind {
    Polygon,
    Point,
    LineString,
}

impl GeometryKind {
    fn of(value: &Value) -> Option<Self> {
        match value {
            Value::Polygon(_) => Some(Self::Polygon),
            Value::Point(_) => Some(Self::Point),
            Value::LineString(_) => Some(Self::LineString),
            _ => None,
        }
    }
}

/// Most frequent of polygon, point and line features. Ties go to the
/// earlier kind in that order.
pub fn main_geometry_kind(collection: &FeatureCollection) -> Option<GeometryKind> {
    let kinds = [GeometryKind::Polygon, GeometryKind::Point, GeometryKind::LineString];
    let mut counts = [0usize; 3];
    for feature in &collection.features {
        if let Some(kind) = feature.geometry.as_ref().and_then(|g| GeometryKind::of(&g.value)) {
            counts[kinds.iter().position(|k| *k == kind).unwrap_or(0)] += 1;
        }
    }
    let (best, count) = counts
        .iter()
        .enumerate()
        .fold((0, 0), |best, (i, &c)| if c > best.1 { (i, c) } else { best });
    (count > 0).then_some(kinds[best])
}
