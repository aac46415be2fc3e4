use geojson::{FeatureCollection, Geometry, Value};
use glam::DVec2;
use std::f64::consts::PI;

/// Latitude limit of the Web Mercator square
pub const MAX_MERCATOR_LAT: f64 = 85.051_128_78;

/// A geographic position in degrees
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LngLat {
    pub lon: f64,
    pub lat: f64,
}

impl LngLat {
    pub const fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Read the first two ordinates of a GeoJSON position
    pub fn from_position(position: &[f64]) -> Option<Self> {
        match position {
            [lon, lat, ..] => Some(Self::new(*lon, *lat)),
            _ => None,
        }
    }

    pub fn to_position(self) -> Vec<f64> {
        vec![self.lon, self.lat]
    }
}

/// Axis-aligned extent in lon/lat, the same shape as a GeoJSON bbox
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl Bounds {
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        }
    }

    fn point(p: LngLat) -> Self {
        Self::new(p.lon, p.lat, p.lon, p.lat)
    }

    pub fn extend(&mut self, p: LngLat) {
        self.min_lon = self.min_lon.min(p.lon);
        self.min_lat = self.min_lat.min(p.lat);
        self.max_lon = self.max_lon.max(p.lon);
        self.max_lat = self.max_lat.max(p.lat);
    }

    /// Extent of every coordinate in the collection, `None` when it has none
    pub fn of_collection(fc: &FeatureCollection) -> Option<Self> {
        let mut bounds: Option<Self> = None;
        for geometry in fc.features.iter().filter_map(|f| f.geometry.as_ref()) {
            for_each_position(geometry, &mut |p| match bounds.as_mut() {
                Some(b) => b.extend(p),
                None => bounds = Some(Self::point(p)),
            });
        }
        bounds
    }

    pub fn center(&self) -> LngLat {
        LngLat::new(
            (self.min_lon + self.max_lon) / 2.0,
            (self.min_lat + self.max_lat) / 2.0,
        )
    }

    pub fn contains(&self, p: LngLat) -> bool {
        p.lon >= self.min_lon && p.lon <= self.max_lon && p.lat >= self.min_lat && p.lat <= self.max_lat
    }

    /// Projected corners: (north-west, south-east) in mercator units
    pub fn to_mercator(&self) -> (DVec2, DVec2) {
        (
            project_mercator(LngLat::new(self.min_lon, self.max_lat)),
            project_mercator(LngLat::new(self.max_lon, self.min_lat)),
        )
    }
}

/// Visit every position of a geometry, recursing into collections
pub fn for_each_position<F>(geometry: &Geometry, f: &mut F)
where
    F: FnMut(LngLat),
{
    let mut visit = |coords: &Vec<f64>| {
        if let Some(p) = LngLat::from_position(coords) {
            f(p);
        }
    };
    match &geometry.value {
        Value::Point(c) => visit(c),
        Value::MultiPoint(cs) | Value::LineString(cs) => cs.iter().for_each(visit),
        Value::MultiLineString(lines) | Value::Polygon(lines) => {
            lines.iter().flatten().for_each(visit)
        }
        Value::MultiPolygon(polygons) => polygons.iter().flatten().flatten().for_each(visit),
        Value::GeometryCollection(geometries) => {
            for g in geometries {
                for_each_position(g, f);
            }
        }
    }
}

/// Project lon/lat to Web Mercator units where the world is the [0, 1] square
#[inline(always)]
pub fn project_mercator(p: LngLat) -> DVec2 {
    let x = p.lon / 360.0 + 0.5;
    let sin = p.lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT).to_radians().sin();
    let y = 0.5 - 0.25 * ((1.0 + sin) / (1.0 - sin)).ln() / PI;
    DVec2::new(x, y.clamp(0.0, 1.0))
}

/// Inverse of [`project_mercator`]
#[inline(always)]
pub fn unproject_mercator(m: DVec2) -> LngLat {
    let lon = (m.x - 0.5) * 360.0;
    let lat = (PI * (1.0 - 2.0 * m.y)).sinh().atan().to_degrees();
    LngLat::new(lon, lat)
}

/// Even-odd point in polygon test; the first ring is the shell, the rest holes
pub fn point_in_polygon(p: LngLat, rings: &[Vec<Vec<f64>>]) -> bool {
    let mut inside = false;
    for ring in rings {
        let n = ring.len();
        if n < 3 {
            continue;
        }
        let mut j = n - 1;
        for i in 0..n {
            let (xi, yi) = (ring[i][0], ring[i][1]);
            let (xj, yj) = (ring[j][0], ring[j][1]);
            if (yi > p.lat) != (yj > p.lat) && p.lon < (xj - xi) * (p.lat - yi) / (yj - yi) + xi {
                inside = !inside;
            }
            j = i;
        }
    }
    inside
}

/// True if the point lies inside any polygon of the geometry
pub fn geometry_contains(geometry: &Geometry, p: LngLat) -> bool {
    match &geometry.value {
        Value::Polygon(rings) => point_in_polygon(p, rings),
        Value::MultiPolygon(polygons) => polygons.iter().any(|rings| point_in_polygon(p, rings)),
        Value::GeometryCollection(geometries) => geometries.iter().any(|g| geometry_contains(g, p)),
        _ => false,
    }
}
