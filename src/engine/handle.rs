use crate::engine::style::{GeoJsonSource, LayerSpec, Visibility, CLUSTER_ID};
use crate::error::MapError;
use crate::geo::{Bounds, LngLat};
use geojson::{FeatureCollection, Geometry, JsonObject, Value};
use glam::DVec2;
use std::sync::Arc;

pub type ListenerId = u64;

/// Pointer listener; receives the event and the map that dispatched it
pub type Listener = Box<dyn FnMut(&MapEvent, &mut dyn MapHandle)>;

/// Continuation for [`MapHandle::cluster_expansion_zoom`]
pub type ExpansionZoomCallback = Box<dyn FnOnce(Result<f64, MapError>, &mut dyn MapHandle)>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    Click,
    MouseEnter,
    MouseLeave,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Cursor {
    #[default]
    Default,
    Pointer,
}

/// A feature as drawn by a layer, with its screen-independent geometry
#[derive(Clone, Debug, PartialEq)]
pub struct RenderedFeature {
    pub layer_id: String,
    pub source_id: String,
    pub geometry: Geometry,
    pub properties: Option<JsonObject>,
}

impl RenderedFeature {
    pub fn cluster_id(&self) -> Option<u64> {
        self.properties.as_ref()?.get(CLUSTER_ID)?.as_u64()
    }

    /// Coordinates of a point feature
    pub fn lng_lat(&self) -> Option<LngLat> {
        match &self.geometry.value {
            Value::Point(coords) => LngLat::from_position(coords),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MapEvent {
    pub kind: EventKind,
    /// Screen position in dots
    pub point: DVec2,
    pub lng_lat: LngLat,
    /// Features of the listener's layer under the pointer
    pub features: Vec<RenderedFeature>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CameraOptions {
    pub center: Option<LngLat>,
    pub zoom: Option<f64>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FitBoundsOptions {
    /// Space kept free on every side, in screen units
    pub padding: f64,
}

/// Capability surface of a live map. Components borrow it through a
/// [`MapRegistry`](crate::registry::MapRegistry); they never own it.
pub trait MapHandle {
    fn add_source(&mut self, id: &str, source: GeoJsonSource) -> Result<(), MapError>;
    fn has_source(&self, id: &str) -> bool;
    /// Fails while a layer still draws from the source
    fn remove_source(&mut self, id: &str) -> Result<(), MapError>;
    fn set_source_data(&mut self, id: &str, data: Arc<FeatureCollection>) -> Result<(), MapError>;

    /// Fails if the id is taken or the layer's source is missing
    fn add_layer(&mut self, layer: LayerSpec) -> Result<(), MapError>;
    fn has_layer(&self, id: &str) -> bool;
    fn remove_layer(&mut self, id: &str) -> Result<(), MapError>;
    fn set_layer_visibility(&mut self, id: &str, visibility: Visibility) -> Result<(), MapError>;

    /// URL template used to fetch label glyphs
    fn set_glyphs(&mut self, url_template: &str);

    /// Features drawn at a screen point by the given layers, topmost first.
    /// An empty layer list queries every layer.
    fn query_rendered_features(&self, point: DVec2, layers: &[&str]) -> Vec<RenderedFeature>;

    /// Look up the zoom at which a cluster breaks apart. The callback may
    /// run later, after the engine's next tick.
    fn cluster_expansion_zoom(&mut self, source_id: &str, cluster_id: u64, callback: ExpansionZoomCallback);

    /// Animate the camera to a new center and/or zoom
    fn ease_to(&mut self, camera: CameraOptions);
    /// Animate the camera to frame `bounds`
    fn fit_bounds(&mut self, bounds: Bounds, options: FitBoundsOptions);

    fn on(&mut self, kind: EventKind, layer_id: &str, listener: Listener) -> ListenerId;
    /// Returns false if the listener was not registered
    fn off(&mut self, id: ListenerId) -> bool;

    fn cursor(&self) -> Cursor;
    fn set_cursor(&mut self, cursor: Cursor);
}
