use crate::error::DataError;
use crate::geo::{geometry_contains, Bounds, LngLat};
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};
use rayon::prelude::*;
use tracing::info;

/// Upper bound on cells per split; beyond this the size is almost
/// certainly a typo
pub const MAX_SPLIT_CELLS: usize = 20_000;

const METERS_PER_DEGREE: f64 = 111_320.0;

/// Split a project boundary into square task cells of `meters` on a side.
///
/// Cells are laid on a grid anchored at the boundary's south-west corner and
/// kept when their centre falls inside the boundary. Each cell carries its
/// 1-based `task_index`.
pub fn split_by_square(boundary: &FeatureCollection, meters: f64) -> Result<FeatureCollection, DataError> {
    if meters.is_nan() || meters <= 0.0 {
        return Err(DataError::InvalidSplitSize(meters));
    }
    let bounds = Bounds::of_collection(boundary).ok_or(DataError::Empty)?;

    let lat_step = meters / METERS_PER_DEGREE;
    let lon_step = meters / (METERS_PER_DEGREE * bounds.center().lat.to_radians().cos().max(1e-6));
    let cols = ((bounds.max_lon - bounds.min_lon) / lon_step).ceil().max(1.0) as usize;
    let rows = ((bounds.max_lat - bounds.min_lat) / lat_step).ceil().max(1.0) as usize;
    let cells = cols.saturating_mul(rows);
    if cells > MAX_SPLIT_CELLS {
        return Err(DataError::TooManyCells {
            cells,
            limit: MAX_SPLIT_CELLS,
        });
    }

    let geometries: Vec<&Geometry> = boundary.features.iter().filter_map(|f| f.geometry.as_ref()).collect();
    let kept: Vec<(f64, f64)> = (0..cells)
        .into_par_iter()
        .filter_map(|i| {
            let west = bounds.min_lon + (i % cols) as f64 * lon_step;
            let south = bounds.min_lat + (i / cols) as f64 * lat_step;
            let centre = LngLat::new(west + lon_step / 2.0, south + lat_step / 2.0);
            geometries
                .iter()
                .any(|g| geometry_contains(g, centre))
                .then_some((west, south))
        })
        .collect();

    let features = kept
        .into_iter()
        .enumerate()
        .map(|(i, (west, south))| {
            let (east, north) = (west + lon_step, south + lat_step);
            let ring = vec![
                vec![west, south],
                vec![east, south],
                vec![east, north],
                vec![west, north],
                vec![west, south],
            ];
            let mut properties = JsonObject::new();
            properties.insert("task_index".to_string(), (i + 1).into());
            Feature {
                bbox: None,
                geometry: Some(Geometry::new(Value::Polygon(vec![ring]))),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect::<Vec<_>>();

    info!(meters, grid = cells, tasks = features.len(), "split project area");
    Ok(FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    })
}
