//! A scripted [`MapHandle`] that records every call, for component tests.

use crate::engine::handle::{
    CameraOptions, Cursor, EventKind, ExpansionZoomCallback, FitBoundsOptions, Listener, ListenerId, MapEvent,
    MapHandle, RenderedFeature,
};
use crate::engine::style::{GeoJsonSource, LayerSpec, Visibility};
use crate::error::MapError;
use crate::geo::{Bounds, LngLat};
use geojson::FeatureCollection;
use glam::DVec2;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    AddSource(String),
    RemoveSource(String),
    SetSourceData(String),
    AddLayer(String),
    RemoveLayer(String),
    SetVisibility(String, Visibility),
    SetGlyphs(String),
    ExpansionLookup(String, u64),
    EaseTo(CameraOptions),
    FitBounds(Bounds, FitBoundsOptions),
    On(EventKind, String),
    Off(ListenerId),
    SetCursor(Cursor),
}

#[derive(Default)]
pub struct RecordingMap {
    pub calls: Vec<Call>,
    sources: HashMap<String, GeoJsonSource>,
    layers: Vec<LayerSpec>,
    listeners: Vec<(ListenerId, EventKind, String, Option<Listener>)>,
    next_listener: ListenerId,
    /// Features returned by `query_rendered_features`, per layer
    pub features: HashMap<String, Vec<RenderedFeature>>,
    /// Results handed to expansion zoom callbacks, per cluster id
    pub expansion: HashMap<u64, Result<f64, MapError>>,
    pending: Vec<(u64, ExpansionZoomCallback)>,
    cursor: Cursor,
}

impl RecordingMap {
    pub fn count(&self, call: &Call) -> usize {
        self.calls.iter().filter(|c| *c == call).count()
    }

    pub fn layer_ids(&self) -> HashSet<String> {
        self.layers.iter().map(|l| l.id.clone()).collect()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn source_data(&self, id: &str) -> Option<&Arc<FeatureCollection>> {
        self.sources.get(id).map(|s| &s.data)
    }

    pub fn pending_lookups(&self) -> usize {
        self.pending.len()
    }

    /// Fire listeners of `kind` registered on `layer_id`
    pub fn dispatch(&mut self, kind: EventKind, layer_id: &str, point: DVec2) {
        let features = self.query_rendered_features(point, &[layer_id]);
        let event = MapEvent {
            kind,
            point,
            lng_lat: LngLat::new(0.0, 0.0),
            features,
        };
        let ids: Vec<ListenerId> = self
            .listeners
            .iter()
            .filter(|(_, k, layer, _)| *k == kind && layer == layer_id)
            .map(|(id, ..)| *id)
            .collect();
        for id in ids {
            let Some(mut callback) = self.listeners.iter_mut().find(|l| l.0 == id).and_then(|l| l.3.take()) else {
                continue;
            };
            callback(&event, self);
            if let Some(entry) = self.listeners.iter_mut().find(|l| l.0 == id) {
                entry.3 = Some(callback);
            }
        }
    }

    /// Run queued expansion lookups against the scripted results
    pub fn resolve_lookups(&mut self) {
        for (cluster_id, callback) in std::mem::take(&mut self.pending) {
            let result = self
                .expansion
                .get(&cluster_id)
                .cloned()
                .unwrap_or(Err(MapError::UnknownCluster(cluster_id)));
            callback(result, self);
        }
    }
}

impl MapHandle for RecordingMap {
    fn add_source(&mut self, id: &str, source: GeoJsonSource) -> Result<(), MapError> {
        self.calls.push(Call::AddSource(id.to_string()));
        if self.sources.contains_key(id) {
            return Err(MapError::SourceExists(id.to_string()));
        }
        self.sources.insert(id.to_string(), source);
        Ok(())
    }

    fn has_source(&self, id: &str) -> bool {
        self.sources.contains_key(id)
    }

    fn remove_source(&mut self, id: &str) -> Result<(), MapError> {
        self.calls.push(Call::RemoveSource(id.to_string()));
        if let Some(layer) = self.layers.iter().find(|l| l.source == id) {
            return Err(MapError::SourceInUse {
                source_id: id.to_string(),
                layer_id: layer.id.clone(),
            });
        }
        self.sources
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| MapError::UnknownSource(id.to_string()))
    }

    fn set_source_data(&mut self, id: &str, data: Arc<FeatureCollection>) -> Result<(), MapError> {
        self.calls.push(Call::SetSourceData(id.to_string()));
        let source = self
            .sources
            .get_mut(id)
            .ok_or_else(|| MapError::UnknownSource(id.to_string()))?;
        source.data = data;
        Ok(())
    }

    fn add_layer(&mut self, layer: LayerSpec) -> Result<(), MapError> {
        self.calls.push(Call::AddLayer(layer.id.clone()));
        if self.has_layer(&layer.id) {
            return Err(MapError::LayerExists(layer.id));
        }
        if !self.sources.contains_key(&layer.source) {
            return Err(MapError::UnknownSource(layer.source));
        }
        self.layers.push(layer);
        Ok(())
    }

    fn has_layer(&self, id: &str) -> bool {
        self.layers.iter().any(|l| l.id == id)
    }

    fn remove_layer(&mut self, id: &str) -> Result<(), MapError> {
        self.calls.push(Call::RemoveLayer(id.to_string()));
        let before = self.layers.len();
        self.layers.retain(|l| l.id != id);
        if self.layers.len() == before {
            return Err(MapError::UnknownLayer(id.to_string()));
        }
        Ok(())
    }

    fn set_layer_visibility(&mut self, id: &str, visibility: Visibility) -> Result<(), MapError> {
        self.calls.push(Call::SetVisibility(id.to_string(), visibility));
        let layer = self
            .layers
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or_else(|| MapError::UnknownLayer(id.to_string()))?;
        layer.visibility = visibility;
        Ok(())
    }

    fn set_glyphs(&mut self, url_template: &str) {
        self.calls.push(Call::SetGlyphs(url_template.to_string()));
    }

    fn query_rendered_features(&self, _point: DVec2, layers: &[&str]) -> Vec<RenderedFeature> {
        layers
            .iter()
            .filter(|id| self.has_layer(id))
            .flat_map(|id| self.features.get(*id).cloned().unwrap_or_default())
            .collect()
    }

    fn cluster_expansion_zoom(&mut self, source_id: &str, cluster_id: u64, callback: ExpansionZoomCallback) {
        self.calls.push(Call::ExpansionLookup(source_id.to_string(), cluster_id));
        self.pending.push((cluster_id, callback));
    }

    fn ease_to(&mut self, camera: CameraOptions) {
        self.calls.push(Call::EaseTo(camera));
    }

    fn fit_bounds(&mut self, bounds: Bounds, options: FitBoundsOptions) {
        self.calls.push(Call::FitBounds(bounds, options));
    }

    fn on(&mut self, kind: EventKind, layer_id: &str, listener: Listener) -> ListenerId {
        self.calls.push(Call::On(kind, layer_id.to_string()));
        self.next_listener += 1;
        self.listeners
            .push((self.next_listener, kind, layer_id.to_string(), Some(listener)));
        self.next_listener
    }

    fn off(&mut self, id: ListenerId) -> bool {
        self.calls.push(Call::Off(id));
        let before = self.listeners.len();
        self.listeners.retain(|l| l.0 != id);
        self.listeners.len() != before
    }

    fn cursor(&self) -> Cursor {
        self.cursor
    }

    fn set_cursor(&mut self, cursor: Cursor) {
        self.calls.push(Call::SetCursor(cursor));
        self.cursor = cursor;
    }
}
