use crate::components::{ClusterOverlay, ClusterOverlayProps, MapView, MapViewProps, FIT_PADDING};
use crate::data::split_by_square;
use crate::engine::{FitBoundsOptions, MapHandle, TerminalMap};
use crate::geo::{Bounds, LngLat};
use crate::registry::MapRegistry;
use geojson::{FeatureCollection, JsonObject};
use glam::DVec2;
use std::sync::Arc;
use tracing::{info, warn};

/// Source id of the clustered point overlay
pub const POINTS_SOURCE: &str = "project-points";

const PAN_STEP_DOTS: f64 = 12.0;
const ZOOM_STEP: f64 = 0.5;
const SPLIT_STEP_METERS: f64 = 25.0;
const MIN_SPLIT_METERS: f64 = 10.0;

/// Geometry the app starts with
pub struct AppData {
    pub area: Option<FeatureCollection>,
    /// Precomputed split; derived from the area when absent
    pub split: Option<FeatureCollection>,
    pub points: FeatureCollection,
    pub split_meters: f64,
}

/// Parent view: owns the map (through its registry) and the geometry, and
/// re-syncs both components after every change.
pub struct App {
    pub registry: MapRegistry<TerminalMap>,
    map_view: MapView,
    clusters: ClusterOverlay,
    area: Option<Arc<FeatureCollection>>,
    split: Option<Arc<FeatureCollection>>,
    points: Arc<FeatureCollection>,
    pub split_meters: f64,
    split_is_derived: bool,
    pub show_area: bool,
    pub show_split: bool,
    pub show_clusters: bool,
    pub should_quit: bool,
    /// Last mouse position for drag tracking
    pub last_mouse: Option<(u16, u16)>,
    /// Terminal cell under the pointer, for the cursor marker
    pub last_hover: Option<(u16, u16)>,
    /// Properties of the feature under the pointer
    pub hovered: Option<JsonObject>,
    /// Last message for the status bar
    pub notice: Option<String>,
}

/// Braille dots of a terminal cell inside the one-cell border
pub fn cell_to_dots(col: u16, row: u16) -> DVec2 {
    DVec2::new(col.saturating_sub(1) as f64 * 2.0 + 1.0, row.saturating_sub(1) as f64 * 4.0 + 2.0)
}

/// Canvas size in dots for a terminal of `width` x `height` cells, leaving
/// room for the border and status bar
pub fn canvas_dots(width: usize, height: usize) -> (usize, usize) {
    (width.saturating_sub(2) * 2, height.saturating_sub(3) * 4)
}

impl App {
    pub fn new(width: usize, height: usize, data: AppData) -> Self {
        let (dots_w, dots_h) = canvas_dots(width, height);
        let center = data
            .area
            .as_ref()
            .and_then(Bounds::of_collection)
            .or_else(|| Bounds::of_collection(&data.points))
            .map_or(LngLat::new(0.0, 0.0), |b| b.center());
        let map = TerminalMap::new(center, 2.0, dots_w, dots_h);

        let mut app = Self {
            registry: MapRegistry::new(map),
            map_view: MapView::new(),
            clusters: ClusterOverlay::new(),
            area: data.area.map(Arc::new),
            split_is_derived: data.split.is_none(),
            split: data.split.map(Arc::new),
            points: Arc::new(data.points),
            split_meters: data.split_meters,
            show_area: true,
            show_split: true,
            show_clusters: true,
            should_quit: false,
            last_mouse: None,
            last_hover: None,
            hovered: None,
            notice: None,
        };
        if app.split_is_derived {
            app.recompute_split();
        }
        app.sync();
        app
    }

    /// Push current state to the components
    pub fn sync(&mut self) {
        let map_ready = self.registry.map().is_loaded();
        let view_props = MapViewProps {
            map_ready,
            uploaded_area: self.area.clone().filter(|_| self.show_area),
            split: self.split.clone().filter(|_| self.show_split),
        };
        self.map_view.sync(Some(&mut self.registry), &view_props);

        let overlay_props = ClusterOverlayProps {
            map_ready,
            visible: self.show_clusters,
            source_id: Some(POINTS_SOURCE.to_string()),
            geojson: self.points.clone(),
        };
        self.clusters.sync(Some(&mut self.registry), &overlay_props);
    }

    pub fn map(&self) -> &TerminalMap {
        self.registry.map()
    }

    pub fn point_count(&self) -> usize {
        self.points.features.len()
    }

    pub fn split_cells(&self) -> usize {
        self.split.as_ref().map_or(0, |s| s.features.len())
    }

    fn recompute_split(&mut self) {
        let Some(area) = &self.area else {
            return;
        };
        match split_by_square(area, self.split_meters) {
            Ok(split) => {
                self.notice = Some(format!("{} tasks of {} m", split.features.len(), self.split_meters));
                self.split = Some(Arc::new(split));
            }
            Err(err) => {
                warn!(%err, meters = self.split_meters, "could not split project area");
                self.notice = Some(err.to_string());
            }
        }
    }

    /// Grow or shrink the task squares; only for splits derived here
    pub fn adjust_split(&mut self, steps: i32) {
        if !self.split_is_derived || self.area.is_none() {
            return;
        }
        self.split_meters = (self.split_meters + steps as f64 * SPLIT_STEP_METERS).max(MIN_SPLIT_METERS);
        self.recompute_split();
        self.sync();
    }

    pub fn toggle_area(&mut self) {
        self.show_area = !self.show_area;
        self.sync();
    }

    pub fn toggle_split(&mut self) {
        self.show_split = !self.show_split;
        self.sync();
    }

    pub fn toggle_clusters(&mut self) {
        self.show_clusters = !self.show_clusters;
        info!(visible = self.show_clusters, "cluster overlay toggled");
        self.sync();
    }

    /// Frame the project area again
    pub fn refit(&mut self) {
        if let Some(bounds) = self.area.as_deref().and_then(Bounds::of_collection) {
            self.registry
                .map_mut()
                .fit_bounds(bounds, FitBoundsOptions { padding: FIT_PADDING });
        }
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        let (w, h) = canvas_dots(width, height);
        self.registry.map_mut().resize(w, h);
        self.sync();
    }

    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.registry.map_mut().pan(dx * PAN_STEP_DOTS, dy * PAN_STEP_DOTS);
    }

    pub fn zoom(&mut self, steps: f64) {
        let viewport = self.registry.map().viewport();
        let center = DVec2::new(viewport.width as f64 / 2.0, viewport.height as f64 / 2.0);
        self.registry.map_mut().zoom_at(center, steps * ZOOM_STEP);
    }

    pub fn zoom_at(&mut self, col: u16, row: u16, steps: f64) {
        self.registry.map_mut().zoom_at(cell_to_dots(col, row), steps * ZOOM_STEP);
    }

    pub fn click(&mut self, col: u16, row: u16) {
        self.registry.map_mut().click(cell_to_dots(col, row));
    }

    pub fn pointer_move(&mut self, col: u16, row: u16) {
        self.last_hover = Some((col, row));
        let point = cell_to_dots(col, row);
        let map = self.registry.map_mut();
        map.pointer_move(point);
        self.hovered = map
            .query_rendered_features(point, &[])
            .into_iter()
            .find_map(|f| f.properties);
    }

    /// Drag with the left button held; the map follows the pointer
    pub fn drag(&mut self, col: u16, row: u16) {
        if let Some((last_col, last_row)) = self.last_mouse {
            let dx = (last_col as f64 - col as f64) * 2.0;
            let dy = (last_row as f64 - row as f64) * 4.0;
            self.registry.map_mut().pan(dx, dy);
        }
        self.last_mouse = Some((col, row));
    }

    pub fn end_drag(&mut self) {
        self.last_mouse = None;
    }

    /// Advance animations and pending lookups; true if a redraw is needed
    pub fn tick(&mut self) -> bool {
        self.registry.map_mut().tick()
    }

    pub fn zoom_level(&self) -> String {
        format!("z{:.1}", self.map().viewport().zoom)
    }

    pub fn center_coords(&self) -> String {
        let center = self.map().viewport().center();
        format!(
            "{:.4}°{}, {:.4}°{}",
            center.lat.abs(),
            if center.lat >= 0.0 { "N" } else { "S" },
            center.lon.abs(),
            if center.lon >= 0.0 { "E" } else { "W" }
        )
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    /// Remove everything the components registered
    pub fn shutdown(&mut self) {
        self.clusters.teardown(&mut self.registry);
        self.map_view.teardown(&mut self.registry);
    }
}
