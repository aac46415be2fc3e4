use crate::geo::{project_mercator, unproject_mercator, Bounds, LngLat, MAX_MERCATOR_LAT};
use glam::DVec2;

/// Width of the whole world, in Braille dots, at zoom 0
pub const WORLD_DOTS: f64 = 64.0;

pub const MIN_ZOOM: f64 = 0.0;
pub const MAX_ZOOM: f64 = 19.0;

/// Camera over a Web Mercator world. Zoom is logarithmic: each step
/// doubles the scale, matching slippy map zoom levels.
#[derive(Clone, Debug, PartialEq)]
pub struct Viewport {
    /// Center longitude (-180 to 180)
    pub center_lon: f64,
    /// Center latitude (clamped to the mercator limit)
    pub center_lat: f64,
    pub zoom: f64,
    /// Canvas width in dots
    pub width: usize,
    /// Canvas height in dots
    pub height: usize,
}

impl Viewport {
    pub fn new(center: LngLat, zoom: f64, width: usize, height: usize) -> Self {
        let mut vp = Self {
            center_lon: center.lon,
            center_lat: center.lat,
            zoom: zoom.clamp(MIN_ZOOM, MAX_ZOOM),
            width,
            height,
        };
        vp.normalize();
        vp
    }

    pub fn center(&self) -> LngLat {
        LngLat::new(self.center_lon, self.center_lat)
    }

    /// World width in dots at the current zoom
    #[inline(always)]
    fn scale(&self) -> f64 {
        WORLD_DOTS * self.zoom.exp2()
    }

    fn normalize(&mut self) {
        if self.center_lon > 180.0 {
            self.center_lon -= 360.0;
        } else if self.center_lon < -180.0 {
            self.center_lon += 360.0;
        }
        self.center_lat = self.center_lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT);
    }

    /// Move the camera to a center and zoom
    pub fn jump_to(&mut self, center: LngLat, zoom: f64) {
        self.center_lon = center.lon;
        self.center_lat = center.lat;
        self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        self.normalize();
    }

    /// Pan the viewport by a dot delta
    pub fn pan(&mut self, dx: f64, dy: f64) {
        let c = project_mercator(self.center()) + DVec2::new(dx, dy) / self.scale();
        let center = unproject_mercator(DVec2::new(c.x, c.y.clamp(0.0, 1.0)));
        self.center_lon = center.lon;
        self.center_lat = center.lat;
        self.normalize();
    }

    /// Change zoom by `delta` levels keeping the geographic point under
    /// the given dot position fixed
    pub fn zoom_at(&mut self, point: DVec2, delta: f64) {
        let anchor = self.unproject(point);
        self.zoom = (self.zoom + delta).clamp(MIN_ZOOM, MAX_ZOOM);
        let moved = self.project(anchor);
        self.pan(moved.x - point.x, moved.y - point.y);
    }

    /// Project a geographic coordinate to dot coordinates
    pub fn project(&self, p: LngLat) -> DVec2 {
        let offset = project_mercator(p) - project_mercator(self.center());
        offset * self.scale() + self.half_size()
    }

    /// Unproject dot coordinates back to a geographic coordinate
    pub fn unproject(&self, point: DVec2) -> LngLat {
        let m = (point - self.half_size()) / self.scale() + project_mercator(self.center());
        unproject_mercator(m)
    }

    fn half_size(&self) -> DVec2 {
        DVec2::new(self.width as f64 / 2.0, self.height as f64 / 2.0)
    }

    /// Geographic extent currently on screen
    pub fn visible_bounds(&self) -> Bounds {
        let nw = self.unproject(DVec2::ZERO);
        let se = self.unproject(DVec2::new(self.width as f64, self.height as f64));
        Bounds::new(nw.lon, se.lat, se.lon, nw.lat)
    }

    /// Camera (center, zoom) that frames `bounds` with `padding` dots on each side
    pub fn fit(&self, bounds: &Bounds, padding: f64) -> (LngLat, f64) {
        let (nw, se) = bounds.to_mercator();
        let span = se - nw;
        let avail_w = (self.width as f64 - 2.0 * padding).max(1.0);
        let avail_h = (self.height as f64 - 2.0 * padding).max(1.0);

        let zoom = if span.x <= f64::EPSILON && span.y <= f64::EPSILON {
            MAX_ZOOM
        } else {
            let scale_x = if span.x > 0.0 { avail_w / span.x } else { f64::INFINITY };
            let scale_y = if span.y > 0.0 { avail_h / span.y } else { f64::INFINITY };
            (scale_x.min(scale_y) / WORLD_DOTS).log2()
        };

        let center = unproject_mercator((nw + se) / 2.0);
        (center, zoom.clamp(MIN_ZOOM, MAX_ZOOM))
    }

    /// Check if a projected point is near enough to the canvas to matter
    pub fn is_visible(&self, p: DVec2) -> bool {
        p.x >= -10.0 && p.x < self.width as f64 + 10.0 && p.y >= -10.0 && p.y < self.height as f64 + 10.0
    }

    /// Check if a segment might be visible (rough bounding box check)
    pub fn line_might_be_visible(&self, a: DVec2, b: DVec2) -> bool {
        let min = a.min(b);
        let max = a.max(b);
        max.x >= 0.0 && min.x < self.width as f64 && max.y >= 0.0 && min.y < self.height as f64
    }
}
