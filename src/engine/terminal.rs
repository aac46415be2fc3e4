use crate::braille::BrailleCanvas;
use crate::engine::cluster::{abbreviate_count, ClusterIndex, NodeKind};
use crate::engine::draw::{draw_circle, draw_line, draw_ring, fill_polygon, segment_distance};
use crate::engine::handle::{
    CameraOptions, Cursor, EventKind, ExpansionZoomCallback, FitBoundsOptions, Listener, ListenerId, MapEvent,
    MapHandle, RenderedFeature,
};
use crate::engine::style::{
    GeoJsonSource, LayerPaint, LayerSpec, Rgb, Visibility, CLUSTER, CLUSTER_ID, POINT_COUNT,
    POINT_COUNT_ABBREVIATED,
};
use crate::engine::viewport::{Viewport, MAX_ZOOM, MIN_ZOOM};
use crate::error::MapError;
use crate::geo::{geometry_contains, project_mercator, unproject_mercator, Bounds, LngLat};
use geojson::{FeatureCollection, Geometry, JsonObject, Value};
use glam::DVec2;
use serde_json::json;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tracing::{debug, trace};

/// Style pixels per Braille dot when sizing circles
const STYLE_PX_PER_DOT: f64 = 3.0;

/// Frames a camera animation lasts
const EASE_FRAMES: u32 = 15;

/// A colored layer of dots
pub struct Stroke {
    pub layer_id: String,
    pub color: Rgb,
    pub canvas: BrailleCanvas,
}

/// Text placed at a character cell
#[derive(Clone, Debug, PartialEq)]
pub struct Label {
    pub col: u16,
    pub row: u16,
    pub text: String,
    pub color: Rgb,
}

/// One rendered frame, back to front
pub struct RenderedMap {
    pub strokes: Vec<Stroke>,
    pub labels: Vec<Label>,
}

struct SourceState {
    source: GeoJsonSource,
    index: Option<ClusterIndex>,
}

impl SourceState {
    fn new(source: GeoJsonSource) -> Self {
        let index = source.cluster.map(|options| ClusterIndex::build(&source.data, options));
        Self { source, index }
    }
}

struct ListenerEntry {
    id: ListenerId,
    kind: EventKind,
    layer_id: String,
    /// Taken out while the listener runs
    callback: Option<Listener>,
}

struct PendingLookup {
    source_id: String,
    cluster_id: u64,
    callback: ExpansionZoomCallback,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Camera {
    center: LngLat,
    zoom: f64,
}

struct CameraAnimation {
    from: Camera,
    to: Camera,
    frame: u32,
}

/// In-process map engine drawing to Braille canvases.
///
/// Holds the sources, layers and listeners registered through
/// [`MapHandle`], answers feature queries against what it would draw at
/// the current camera, and resolves cluster lookups on [`tick`](Self::tick).
pub struct TerminalMap {
    viewport: Viewport,
    sources: HashMap<String, SourceState>,
    /// Draw order, bottom first
    layers: Vec<LayerSpec>,
    glyphs: Option<String>,
    listeners: Vec<ListenerEntry>,
    next_listener: ListenerId,
    hovered: HashSet<String>,
    pending: VecDeque<PendingLookup>,
    animation: Option<CameraAnimation>,
    cursor: Cursor,
}

impl TerminalMap {
    /// Create a map with the camera at `center`/`zoom` over a canvas of
    /// `width` x `height` dots
    pub fn new(center: LngLat, zoom: f64, width: usize, height: usize) -> Self {
        Self {
            viewport: Viewport::new(center, zoom, width, height),
            sources: HashMap::new(),
            layers: Vec::new(),
            glyphs: None,
            listeners: Vec::new(),
            next_listener: 1,
            hovered: HashSet::new(),
            pending: VecDeque::new(),
            animation: None,
            cursor: Cursor::Default,
        }
    }

    /// The map can draw once it has a non-empty canvas
    pub fn is_loaded(&self) -> bool {
        self.viewport.width > 0 && self.viewport.height > 0
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn glyphs(&self) -> Option<&str> {
        self.glyphs.as_deref()
    }

    pub fn layer_ids(&self) -> impl Iterator<Item = &str> {
        self.layers.iter().map(|l| l.id.as_str())
    }

    pub fn layer(&self, id: &str) -> Option<&LayerSpec> {
        self.layers.iter().find(|l| l.id == id)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn pending_lookups(&self) -> usize {
        self.pending.len()
    }

    pub fn is_animating(&self) -> bool {
        self.animation.is_some()
    }

    /// Update canvas size in dots
    pub fn resize(&mut self, width: usize, height: usize) {
        self.viewport.width = width;
        self.viewport.height = height;
    }

    /// User pan; cancels any camera animation
    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.animation = None;
        self.viewport.pan(dx, dy);
    }

    /// User zoom around a screen point; cancels any camera animation
    pub fn zoom_at(&mut self, point: DVec2, delta: f64) {
        self.animation = None;
        self.viewport.zoom_at(point, delta);
    }

    /// Jump straight to the end of the running animation
    pub fn finish_animation(&mut self) {
        if let Some(animation) = self.animation.take() {
            self.viewport.jump_to(animation.to.center, animation.to.zoom);
        }
    }

    /// Resolve queued cluster lookups and advance the camera animation.
    /// Returns true if anything changed.
    pub fn tick(&mut self) -> bool {
        let lookups = std::mem::take(&mut self.pending);
        let mut changed = !lookups.is_empty();
        for lookup in lookups {
            let result = self.expansion_zoom(&lookup.source_id, lookup.cluster_id);
            (lookup.callback)(result, self);
        }

        if let Some(animation) = self.animation.as_mut() {
            animation.frame += 1;
            let t = animation.frame as f64 / EASE_FRAMES as f64;
            let eased = 1.0 - (1.0 - t).powi(3);
            let from = project_mercator(animation.from.center);
            let to = project_mercator(animation.to.center);
            let center = unproject_mercator(from.lerp(to, eased));
            let zoom = animation.from.zoom + (animation.to.zoom - animation.from.zoom) * eased;
            let done = animation.frame >= EASE_FRAMES;
            if done {
                self.finish_animation();
            } else {
                self.viewport.jump_to(center, zoom);
            }
            changed = true;
        }
        changed
    }

    fn expansion_zoom(&self, source_id: &str, cluster_id: u64) -> Result<f64, MapError> {
        let state = self
            .sources
            .get(source_id)
            .ok_or_else(|| MapError::UnknownSource(source_id.to_string()))?;
        let index = state
            .index
            .as_ref()
            .ok_or_else(|| MapError::NotClustered(source_id.to_string()))?;
        index.expansion_zoom(cluster_id).map(f64::from)
    }

    fn animate_to(&mut self, to: Camera) {
        let from = Camera {
            center: self.viewport.center(),
            zoom: self.viewport.zoom,
        };
        let to = Camera {
            zoom: to.zoom.clamp(MIN_ZOOM, MAX_ZOOM),
            ..to
        };
        debug!(lon = to.center.lon, lat = to.center.lat, zoom = to.zoom, "easing camera");
        self.animation = Some(CameraAnimation { from, to, frame: 0 });
    }

    /// Visit the features a layer draws at the current camera
    fn for_each_feature<F>(&self, layer: &LayerSpec, mut f: F)
    where
        F: FnMut(&Geometry, Option<&JsonObject>),
    {
        let Some(state) = self.sources.get(&layer.source) else {
            return;
        };

        match &state.index {
            Some(index) => {
                let bounds = self.viewport.visible_bounds();
                for cluster in index.clusters(&bounds, self.viewport.zoom) {
                    match cluster.kind {
                        NodeKind::Cluster { id } => {
                            let geometry = Geometry::new(Value::Point(cluster.lng_lat.to_position()));
                            let properties = cluster_properties(id, cluster.num_points);
                            if layer.accepts(Some(&properties)) {
                                f(&geometry, Some(&properties));
                            }
                        }
                        NodeKind::Point { feature } => {
                            let feature = &state.source.data.features[feature];
                            if let Some(geometry) = &feature.geometry {
                                if layer.accepts(feature.properties.as_ref()) {
                                    f(geometry, feature.properties.as_ref());
                                }
                            }
                        }
                    }
                }
            }
            None => {
                for feature in &state.source.data.features {
                    if let Some(geometry) = &feature.geometry {
                        if layer.accepts(feature.properties.as_ref()) {
                            f(geometry, feature.properties.as_ref());
                        }
                    }
                }
            }
        }
    }

    fn hit(&self, layer: &LayerSpec, geometry: &Geometry, point: DVec2) -> bool {
        match &layer.paint {
            LayerPaint::Fill(_) => geometry_contains(geometry, self.viewport.unproject(point)),
            LayerPaint::Line(paint) => {
                let tolerance = paint.width.max(1.0) + 1.0;
                self.project_lines(geometry)
                    .iter()
                    .any(|line| line.windows(2).any(|s| segment_distance(point, s[0], s[1]) <= tolerance))
            }
            LayerPaint::Circle(paint) => {
                let radius = dots(paint.radius + paint.stroke_width) as f64 + 1.0;
                self.project_points(geometry)
                    .iter()
                    .any(|p| p.distance(point) <= radius)
            }
            LayerPaint::Symbol(_) => self.project_points(geometry).iter().any(|p| p.distance(point) <= 2.0),
        }
    }

    fn project_points(&self, geometry: &Geometry) -> Vec<DVec2> {
        let project = |c: &Vec<f64>| LngLat::from_position(c).map(|p| self.viewport.project(p));
        match &geometry.value {
            Value::Point(c) => project(c).into_iter().collect(),
            Value::MultiPoint(cs) => cs.iter().filter_map(project).collect(),
            _ => Vec::new(),
        }
    }

    /// Every line and ring of a geometry, projected
    fn project_lines(&self, geometry: &Geometry) -> Vec<Vec<DVec2>> {
        let project = |line: &Vec<Vec<f64>>| -> Vec<DVec2> {
            line.iter()
                .filter_map(|c| LngLat::from_position(c))
                .map(|p| self.viewport.project(p))
                .collect()
        };
        match &geometry.value {
            Value::LineString(line) => vec![project(line)],
            Value::MultiLineString(lines) | Value::Polygon(lines) => lines.iter().map(project).collect(),
            Value::MultiPolygon(polygons) => polygons.iter().flatten().map(project).collect(),
            Value::GeometryCollection(geometries) => {
                geometries.iter().flat_map(|g| self.project_lines(g)).collect()
            }
            _ => Vec::new(),
        }
    }

    /// Polygons of a geometry as projected ring sets
    fn project_polygons(&self, geometry: &Geometry) -> Vec<Vec<Vec<DVec2>>> {
        match &geometry.value {
            Value::Polygon(_) => vec![self.project_lines(geometry)],
            Value::MultiPolygon(polygons) => polygons
                .iter()
                .map(|rings| self.project_lines(&Geometry::new(Value::Polygon(rings.clone()))))
                .collect(),
            Value::GeometryCollection(geometries) => {
                geometries.iter().flat_map(|g| self.project_polygons(g)).collect()
            }
            _ => Vec::new(),
        }
    }

    fn draw_lines(&self, canvas: &mut BrailleCanvas, geometry: &Geometry) {
        for line in self.project_lines(geometry) {
            for segment in line.windows(2) {
                if self.viewport.line_might_be_visible(segment[0], segment[1]) {
                    draw_line(canvas, segment[0], segment[1]);
                }
            }
        }
    }

    /// Draw every visible layer at the current camera
    pub fn render(&self) -> RenderedMap {
        let (cols, rows) = (self.viewport.width / 2, self.viewport.height / 4);
        let mut strokes = Vec::new();
        let mut labels = Vec::new();

        for layer in self.layers.iter().filter(|l| l.visibility == Visibility::Visible) {
            let mut canvas = BrailleCanvas::new(cols, rows);
            match &layer.paint {
                LayerPaint::Fill(paint) => {
                    let mut outline = BrailleCanvas::new(cols, rows);
                    let stride = if paint.opacity < 0.5 { 2 } else { 1 };
                    self.for_each_feature(layer, |geometry, _| {
                        for rings in self.project_polygons(geometry) {
                            fill_polygon(&mut canvas, &rings, stride);
                        }
                        if paint.outline_color.is_some() {
                            self.draw_lines(&mut outline, geometry);
                        }
                    });
                    strokes.push(Stroke {
                        layer_id: layer.id.clone(),
                        color: paint.color,
                        canvas,
                    });
                    if let Some(color) = paint.outline_color {
                        strokes.push(Stroke {
                            layer_id: layer.id.clone(),
                            color,
                            canvas: outline,
                        });
                    }
                }
                LayerPaint::Line(paint) => {
                    self.for_each_feature(layer, |geometry, _| self.draw_lines(&mut canvas, geometry));
                    strokes.push(Stroke {
                        layer_id: layer.id.clone(),
                        color: paint.color,
                        canvas,
                    });
                }
                LayerPaint::Circle(paint) => {
                    let mut ring = BrailleCanvas::new(cols, rows);
                    let radius = dots(paint.radius);
                    self.for_each_feature(layer, |geometry, _| {
                        for p in self.project_points(geometry) {
                            if self.viewport.is_visible(p) {
                                draw_circle(&mut canvas, p, radius);
                                if paint.stroke_width > 0.0 {
                                    draw_ring(&mut ring, p, radius + 1);
                                }
                            }
                        }
                    });
                    if let Some(color) = paint.stroke_color.filter(|_| paint.stroke_width > 0.0) {
                        strokes.push(Stroke {
                            layer_id: layer.id.clone(),
                            color,
                            canvas: ring,
                        });
                    }
                    strokes.push(Stroke {
                        layer_id: layer.id.clone(),
                        color: paint.color,
                        canvas,
                    });
                }
                LayerPaint::Symbol(paint) => {
                    self.for_each_feature(layer, |geometry, properties| {
                        let text = paint.label(properties);
                        if text.is_empty() {
                            return;
                        }
                        for p in self.project_points(geometry) {
                            // Center the text on the point's character cell
                            let col = (p.x / 2.0).floor() as i64 - (text.chars().count() as i64 - 1) / 2;
                            let row = (p.y / 4.0).floor() as i64;
                            if col >= 0 && row >= 0 && (col as usize) < cols && (row as usize) < rows {
                                labels.push(Label {
                                    col: col as u16,
                                    row: row as u16,
                                    text: text.clone(),
                                    color: paint.text_color,
                                });
                            }
                        }
                    });
                }
            }
        }

        RenderedMap { strokes, labels }
    }

    /// Dispatch a click at a screen point to listeners whose layer is hit
    pub fn click(&mut self, point: DVec2) {
        let targets: Vec<(ListenerId, String)> = self
            .listeners
            .iter()
            .filter(|l| l.kind == EventKind::Click)
            .map(|l| (l.id, l.layer_id.clone()))
            .collect();

        for (id, layer_id) in targets {
            let features = self.query_rendered_features(point, &[layer_id.as_str()]);
            if features.is_empty() {
                continue;
            }
            let event = self.event(EventKind::Click, point, features);
            self.invoke(id, &event);
        }
    }

    /// Track the pointer and fire enter/leave for layers with hover listeners
    pub fn pointer_move(&mut self, point: DVec2) {
        let mut layer_ids: Vec<String> = self
            .listeners
            .iter()
            .filter(|l| matches!(l.kind, EventKind::MouseEnter | EventKind::MouseLeave))
            .map(|l| l.layer_id.clone())
            .collect();
        layer_ids.sort();
        layer_ids.dedup();

        for layer_id in layer_ids {
            let features = self.query_rendered_features(point, &[layer_id.as_str()]);
            let was_hovered = self.hovered.contains(&layer_id);
            if !features.is_empty() && !was_hovered {
                self.hovered.insert(layer_id.clone());
                let event = self.event(EventKind::MouseEnter, point, features);
                self.fire(&layer_id, &event);
            } else if features.is_empty() && was_hovered {
                self.hovered.remove(&layer_id);
                let event = self.event(EventKind::MouseLeave, point, features);
                self.fire(&layer_id, &event);
            }
        }
    }

    fn event(&self, kind: EventKind, point: DVec2, features: Vec<RenderedFeature>) -> MapEvent {
        MapEvent {
            kind,
            point,
            lng_lat: self.viewport.unproject(point),
            features,
        }
    }

    fn fire(&mut self, layer_id: &str, event: &MapEvent) {
        let ids: Vec<ListenerId> = self
            .listeners
            .iter()
            .filter(|l| l.kind == event.kind && l.layer_id == layer_id)
            .map(|l| l.id)
            .collect();
        for id in ids {
            self.invoke(id, event);
        }
    }

    fn invoke(&mut self, id: ListenerId, event: &MapEvent) {
        let Some(mut callback) = self
            .listeners
            .iter_mut()
            .find(|l| l.id == id)
            .and_then(|l| l.callback.take())
        else {
            return;
        };
        callback(event, self);
        // The listener may have unregistered itself while running
        if let Some(entry) = self.listeners.iter_mut().find(|l| l.id == id) {
            entry.callback = Some(callback);
        }
    }
}

fn dots(style_px: f64) -> i32 {
    (style_px / STYLE_PX_PER_DOT).round().max(1.0) as i32
}

fn cluster_properties(id: u64, count: usize) -> JsonObject {
    let mut properties = JsonObject::new();
    properties.insert(CLUSTER.to_string(), json!(true));
    properties.insert(CLUSTER_ID.to_string(), json!(id));
    properties.insert(POINT_COUNT.to_string(), json!(count));
    properties.insert(POINT_COUNT_ABBREVIATED.to_string(), json!(abbreviate_count(count)));
    properties
}

impl MapHandle for TerminalMap {
    fn add_source(&mut self, id: &str, source: GeoJsonSource) -> Result<(), MapError> {
        if self.sources.contains_key(id) {
            return Err(MapError::SourceExists(id.to_string()));
        }
        debug!(source = id, features = source.data.features.len(), clustered = source.cluster.is_some(), "adding source");
        self.sources.insert(id.to_string(), SourceState::new(source));
        Ok(())
    }

    fn has_source(&self, id: &str) -> bool {
        self.sources.contains_key(id)
    }

    fn remove_source(&mut self, id: &str) -> Result<(), MapError> {
        if let Some(layer) = self.layers.iter().find(|l| l.source == id) {
            return Err(MapError::SourceInUse {
                source_id: id.to_string(),
                layer_id: layer.id.clone(),
            });
        }
        self.sources
            .remove(id)
            .map(|_| debug!(source = id, "removed source"))
            .ok_or_else(|| MapError::UnknownSource(id.to_string()))
    }

    fn set_source_data(&mut self, id: &str, data: Arc<FeatureCollection>) -> Result<(), MapError> {
        let state = self
            .sources
            .get_mut(id)
            .ok_or_else(|| MapError::UnknownSource(id.to_string()))?;
        let source = GeoJsonSource {
            data,
            cluster: state.source.cluster,
        };
        *state = SourceState::new(source);
        debug!(source = id, "replaced source data");
        Ok(())
    }

    fn add_layer(&mut self, layer: LayerSpec) -> Result<(), MapError> {
        if self.has_layer(&layer.id) {
            return Err(MapError::LayerExists(layer.id));
        }
        if !self.sources.contains_key(&layer.source) {
            return Err(MapError::UnknownSource(layer.source));
        }
        debug!(layer = %layer.id, kind = layer.paint.kind(), source = %layer.source, "adding layer");
        self.layers.push(layer);
        Ok(())
    }

    fn has_layer(&self, id: &str) -> bool {
        self.layers.iter().any(|l| l.id == id)
    }

    fn remove_layer(&mut self, id: &str) -> Result<(), MapError> {
        let pos = self
            .layers
            .iter()
            .position(|l| l.id == id)
            .ok_or_else(|| MapError::UnknownLayer(id.to_string()))?;
        self.layers.remove(pos);
        self.hovered.remove(id);
        debug!(layer = id, "removed layer");
        Ok(())
    }

    fn set_layer_visibility(&mut self, id: &str, visibility: Visibility) -> Result<(), MapError> {
        let layer = self
            .layers
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or_else(|| MapError::UnknownLayer(id.to_string()))?;
        layer.visibility = visibility;
        Ok(())
    }

    fn set_glyphs(&mut self, url_template: &str) {
        // Labels are drawn with terminal text; the template is only recorded
        self.glyphs = Some(url_template.to_string());
    }

    fn query_rendered_features(&self, point: DVec2, layers: &[&str]) -> Vec<RenderedFeature> {
        let mut found = Vec::new();
        for layer in self.layers.iter().rev() {
            if layer.visibility != Visibility::Visible || !(layers.is_empty() || layers.contains(&layer.id.as_str())) {
                continue;
            }
            self.for_each_feature(layer, |geometry, properties| {
                if self.hit(layer, geometry, point) {
                    found.push(RenderedFeature {
                        layer_id: layer.id.clone(),
                        source_id: layer.source.clone(),
                        geometry: geometry.clone(),
                        properties: properties.cloned(),
                    });
                }
            });
        }
        trace!(x = point.x, y = point.y, hits = found.len(), "queried rendered features");
        found
    }

    fn cluster_expansion_zoom(&mut self, source_id: &str, cluster_id: u64, callback: ExpansionZoomCallback) {
        self.pending.push_back(PendingLookup {
            source_id: source_id.to_string(),
            cluster_id,
            callback,
        });
    }

    fn ease_to(&mut self, camera: CameraOptions) {
        let to = Camera {
            center: camera.center.unwrap_or_else(|| self.viewport.center()),
            zoom: camera.zoom.unwrap_or(self.viewport.zoom),
        };
        self.animate_to(to);
    }

    fn fit_bounds(&mut self, bounds: Bounds, options: FitBoundsOptions) {
        let (center, zoom) = self.viewport.fit(&bounds, options.padding);
        self.animate_to(Camera { center, zoom });
    }

    fn on(&mut self, kind: EventKind, layer_id: &str, listener: Listener) -> ListenerId {
        let id = self.next_listener;
        self.next_listener += 1;
        self.listeners.push(ListenerEntry {
            id,
            kind,
            layer_id: layer_id.to_string(),
            callback: Some(listener),
        });
        id
    }

    fn off(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|l| l.id != id);
        self.listeners.len() != before
    }

    fn cursor(&self) -> Cursor {
        self.cursor
    }

    fn set_cursor(&mut self, cursor: Cursor) {
        self.cursor = cursor;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::style::{CirclePaint, ClusterOptions, FillPaint, Filter};
    use geojson::Feature;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn collection(geometries: Vec<Value>) -> Arc<FeatureCollection> {
        Arc::new(FeatureCollection {
            bbox: None,
            features: geometries.into_iter().map(|v| Feature::from(Geometry::new(v))).collect(),
            foreign_members: None,
        })
    }

    fn map() -> TerminalMap {
        TerminalMap::new(LngLat::new(0.0, 0.0), 2.0, 200, 120)
    }

    fn circle(id: &str, source: &str) -> LayerSpec {
        LayerSpec::new(
            id,
            source,
            LayerPaint::Circle(CirclePaint {
                color: Rgb::WHITE,
                radius: 15.0,
                stroke_width: 0.0,
                stroke_color: None,
            }),
        )
    }

    #[test]
    fn test_duplicate_ids_are_rejected() {
        let mut map = map();
        let data = collection(vec![Value::Point(vec![0.0, 0.0])]);
        map.add_source("pts", GeoJsonSource::new(data.clone())).unwrap();
        assert_eq!(
            map.add_source("pts", GeoJsonSource::new(data)),
            Err(MapError::SourceExists("pts".into()))
        );
        map.add_layer(circle("dots", "pts")).unwrap();
        assert_eq!(map.add_layer(circle("dots", "pts")), Err(MapError::LayerExists("dots".into())));
        assert_eq!(
            map.add_layer(circle("other", "missing")),
            Err(MapError::UnknownSource("missing".into()))
        );
    }

    #[test]
    fn test_source_in_use_cannot_be_removed() {
        let mut map = map();
        map.add_source("pts", GeoJsonSource::new(collection(vec![]))).unwrap();
        map.add_layer(circle("dots", "pts")).unwrap();
        assert!(matches!(map.remove_source("pts"), Err(MapError::SourceInUse { .. })));
        map.remove_layer("dots").unwrap();
        map.remove_source("pts").unwrap();
        assert!(!map.has_source("pts"));
    }

    #[test]
    fn test_query_hits_point_under_cursor() {
        let mut map = map();
        map.add_source("pts", GeoJsonSource::new(collection(vec![Value::Point(vec![0.0, 0.0])])))
            .unwrap();
        map.add_layer(circle("dots", "pts")).unwrap();

        let hits = map.query_rendered_features(DVec2::new(101.0, 60.0), &["dots"]);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].lng_lat(), Some(LngLat::new(0.0, 0.0)));
        assert!(map.query_rendered_features(DVec2::new(10.0, 10.0), &[]).is_empty());
    }

    #[test]
    fn test_hidden_layers_are_not_queried_or_drawn() {
        let mut map = map();
        map.add_source("pts", GeoJsonSource::new(collection(vec![Value::Point(vec![0.0, 0.0])])))
            .unwrap();
        map.add_layer(circle("dots", "pts")).unwrap();
        map.set_layer_visibility("dots", Visibility::None).unwrap();
        assert!(map.query_rendered_features(DVec2::new(100.0, 60.0), &[]).is_empty());
        assert!(map.render().strokes.is_empty());
    }

    #[test]
    fn test_fill_layer_hit_and_render() {
        let mut map = map();
        let square = Value::Polygon(vec![vec![
            vec![-20.0, -20.0],
            vec![20.0, -20.0],
            vec![20.0, 20.0],
            vec![-20.0, 20.0],
            vec![-20.0, -20.0],
        ]]);
        map.add_source("area", GeoJsonSource::new(collection(vec![square]))).unwrap();
        map.add_layer(LayerSpec::new(
            "area",
            "area",
            LayerPaint::Fill(FillPaint {
                color: Rgb::hex(0x328ffd),
                outline_color: Some(Rgb::hex(0xd33a38)),
                opacity: 0.2,
            }),
        ))
        .unwrap();

        assert_eq!(map.query_rendered_features(DVec2::new(100.0, 60.0), &["area"]).len(), 1);
        let frame = map.render();
        assert_eq!(frame.strokes.len(), 2);
        assert!(frame.strokes.iter().all(|s| !s.canvas.is_blank()));
    }

    #[test]
    fn test_clustered_source_exposes_cluster_properties() {
        let mut map = map();
        let data = collection(vec![Value::Point(vec![0.0, 0.0]), Value::Point(vec![0.01, 0.01])]);
        map.add_source("pts", GeoJsonSource::clustered(data, ClusterOptions::default()))
            .unwrap();
        map.add_layer(circle("clusters", "pts").with_filter(Filter::has(POINT_COUNT)))
            .unwrap();

        let hits = map.query_rendered_features(DVec2::new(100.0, 60.0), &["clusters"]);
        assert_eq!(hits.len(), 1);
        let props = hits[0].properties.as_ref().unwrap();
        assert_eq!(props[POINT_COUNT], json!(2));
        assert!(hits[0].cluster_id().is_some());
    }

    #[test]
    fn test_cluster_lookup_resolves_on_tick() {
        let mut map = map();
        let data = collection(vec![Value::Point(vec![0.0, 0.0]), Value::Point(vec![0.01, 0.01])]);
        map.add_source("pts", GeoJsonSource::clustered(data, ClusterOptions::default()))
            .unwrap();
        map.add_layer(circle("clusters", "pts").with_filter(Filter::has(POINT_COUNT)))
            .unwrap();
        let id = map.query_rendered_features(DVec2::new(100.0, 60.0), &["clusters"])[0]
            .cluster_id()
            .unwrap();

        let result = Rc::new(RefCell::new(None::<Result<f64, MapError>>));
        let sink = result.clone();
        map.cluster_expansion_zoom("pts", id, Box::new(move |r, _: &mut dyn MapHandle| *sink.borrow_mut() = Some(r)));
        assert!(result.borrow().is_none());
        map.tick();
        assert!(matches!(*result.borrow(), Some(Ok(z)) if z >= 1.0));

        let sink = result.clone();
        map.cluster_expansion_zoom("nope", id, Box::new(move |r, _: &mut dyn MapHandle| *sink.borrow_mut() = Some(r)));
        map.tick();
        assert_eq!(*result.borrow(), Some(Err(MapError::UnknownSource("nope".into()))));
    }

    #[test]
    fn test_ease_animates_to_target() {
        let mut map = map();
        map.ease_to(CameraOptions {
            center: Some(LngLat::new(10.0, 10.0)),
            zoom: Some(6.0),
        });
        assert!(map.is_animating());
        for _ in 0..EASE_FRAMES {
            map.tick();
        }
        assert!(!map.is_animating());
        assert!((map.viewport().zoom - 6.0).abs() < 1e-9);
        assert!((map.viewport().center_lon - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_hover_fires_enter_then_leave_once() {
        let mut map = map();
        map.add_source("pts", GeoJsonSource::new(collection(vec![Value::Point(vec![0.0, 0.0])])))
            .unwrap();
        map.add_layer(circle("dots", "pts")).unwrap();
        let log = Rc::new(RefCell::new(Vec::new()));
        for kind in [EventKind::MouseEnter, EventKind::MouseLeave] {
            let log = log.clone();
            map.on(kind, "dots", Box::new(move |e: &MapEvent, _: &mut dyn MapHandle| log.borrow_mut().push(e.kind)));
        }

        map.pointer_move(DVec2::new(100.0, 60.0));
        map.pointer_move(DVec2::new(101.0, 60.0));
        map.pointer_move(DVec2::new(10.0, 10.0));
        assert_eq!(*log.borrow(), vec![EventKind::MouseEnter, EventKind::MouseLeave]);
    }

    #[test]
    fn test_listener_can_remove_itself() {
        let mut map = map();
        map.add_source("pts", GeoJsonSource::new(collection(vec![Value::Point(vec![0.0, 0.0])])))
            .unwrap();
        map.add_layer(circle("dots", "pts")).unwrap();
        let own_id = Rc::new(RefCell::new(0));
        let id_ref = own_id.clone();
        let id = map.on(
            EventKind::Click,
            "dots",
            Box::new(move |_: &MapEvent, map: &mut dyn MapHandle| {
                map.off(*id_ref.borrow());
            }),
        );
        *own_id.borrow_mut() = id;
        map.click(DVec2::new(100.0, 60.0));
        assert_eq!(map.listener_count(), 0);
    }
}
