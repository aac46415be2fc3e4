//! Deterministic sample geometry used when no files are given

use crate::geo::LngLat;
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};
use std::f64::consts::TAU;

pub const DEMO_CENTER: LngLat = LngLat::new(85.324, 27.708);

/// Deterministic random in [0, 1) using splitmix64
#[inline(always)]
fn rand_simple(seed: u64) -> f64 {
    let mut x = seed.wrapping_mul(0x9e3779b97f4a7c15);
    x ^= x >> 30;
    x = x.wrapping_mul(0xbf58476d1ce4e5b9);
    x ^= x >> 27;
    x = x.wrapping_mul(0x94d049bb133111eb);
    x ^= x >> 31;
    (x >> 11) as f64 / 9007199254740992.0
}

fn collection(features: Vec<Feature>) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

/// An irregular project boundary about two kilometres across
pub fn project_area() -> FeatureCollection {
    const VERTICES: usize = 14;
    let mut ring: Vec<Vec<f64>> = (0..VERTICES)
        .map(|i| {
            let angle = i as f64 / VERTICES as f64 * TAU;
            let wobble = 0.75 + 0.25 * rand_simple(i as u64 + 1);
            let lon = DEMO_CENTER.lon + 0.012 * wobble * angle.cos();
            let lat = DEMO_CENTER.lat + 0.010 * wobble * angle.sin();
            vec![lon, lat]
        })
        .collect();
    ring.push(ring[0].clone());

    let mut properties = JsonObject::new();
    properties.insert("name".to_string(), "Demo project area".into());
    let mut feature = Feature::from(Geometry::new(Value::Polygon(vec![ring])));
    feature.properties = Some(properties);
    collection(vec![feature])
}

/// `count` points scattered around a handful of hotspots
pub fn points(count: usize) -> FeatureCollection {
    const HOTSPOTS: [(f64, f64, f64); 4] = [
        (85.318, 27.711, 0.003),
        (85.330, 27.703, 0.002),
        (85.328, 27.714, 0.004),
        (85.319, 27.702, 0.0015),
    ];

    let features = (0..count)
        .map(|i| {
            let seed = i as u64;
            let (lon, lat, spread) = HOTSPOTS[i % HOTSPOTS.len()];
            let angle = rand_simple(seed.wrapping_mul(7919)) * TAU;
            let distance = rand_simple(seed.wrapping_mul(6547)).sqrt() * spread;

            let mut properties = JsonObject::new();
            properties.insert("id".to_string(), (i + 1).into());
            properties.insert("status".to_string(), if i % 3 == 0 { "mapped" } else { "ready" }.into());
            let mut feature = Feature::from(Geometry::new(Value::Point(vec![
                lon + distance * angle.cos(),
                lat + distance * angle.sin(),
            ])));
            feature.properties = Some(properties);
            feature
        })
        .collect();
    collection(features)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::Bounds;

    #[test]
    fn test_rand_is_deterministic_and_in_range() {
        for seed in 0..1000 {
            let r = rand_simple(seed);
            assert!((0.0..1.0).contains(&r));
            assert_eq!(r, rand_simple(seed));
        }
    }

    #[test]
    fn test_area_is_a_closed_ring_around_center() {
        let area = project_area();
        let Some(Value::Polygon(rings)) = area.features[0].geometry.as_ref().map(|g| &g.value) else {
            panic!("expected polygon");
        };
        assert_eq!(rings[0].first(), rings[0].last());
        assert!(Bounds::of_collection(&area).unwrap().contains(DEMO_CENTER));
    }

    #[test]
    fn test_points_are_stable() {
        let a = points(50);
        let b = points(50);
        assert_eq!(a.features.len(), 50);
        assert_eq!(a, b);
    }
}
