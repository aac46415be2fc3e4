use crate::components::{Generation, GenerationToken};
use crate::engine::style::{
    CirclePaint, ClusterOptions, Filter, GeoJsonSource, LayerPaint, LayerSpec, Rgb, SymbolPaint, POINT_COUNT,
};
use crate::engine::{CameraOptions, Cursor, EventKind, Listener, MapEvent, MapHandle};
use crate::error::MapError;
use crate::registry::{MapRegistry, OwnerId};
use geojson::FeatureCollection;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const CLUSTERS_LAYER: &str = "clusters";
pub const CLUSTER_COUNT_LAYER: &str = "cluster-count";
pub const UNCLUSTERED_LAYER: &str = "unclustered-point";

pub const GLYPHS_URL: &str = "https://demotiles.maplibre.org/font/{fontstack}/{range}.pbf";

const CLUSTER_OPTIONS: ClusterOptions = ClusterOptions {
    max_zoom: 14,
    radius: 40.0,
    min_points: 2,
};

#[derive(Clone)]
pub struct ClusterOverlayProps {
    pub map_ready: bool,
    pub visible: bool,
    pub source_id: Option<String>,
    pub geojson: Arc<FeatureCollection>,
}

struct Active {
    source_id: String,
    data: Arc<FeatureCollection>,
}

/// Clustered point overlay.
///
/// Registers a clustered source with three layers: cluster circles, their
/// abbreviated counts and the remaining single points. Clicking a cluster
/// eases the camera to the zoom where it breaks apart; hovering either
/// circle layer shows a pointer cursor.
///
/// Everything is removed when the overlay is hidden, the map stops being
/// ready or the source id changes. Expansion lookups still in flight at
/// that point are dropped.
pub struct ClusterOverlay {
    owner: Option<OwnerId>,
    generation: Generation,
    active: Option<Active>,
}

impl ClusterOverlay {
    pub fn new() -> Self {
        Self {
            owner: None,
            generation: Generation::default(),
            active: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn sync<M: MapHandle>(&mut self, map: Option<&mut MapRegistry<M>>, props: &ClusterOverlayProps) {
        let Some(registry) = map else {
            return;
        };
        let wanted = props
            .source_id
            .as_deref()
            .filter(|_| props.map_ready && props.visible);

        if let Some(active) = &self.active {
            if wanted == Some(active.source_id.as_str()) {
                if !Arc::ptr_eq(&active.data, &props.geojson) {
                    self.replace_data(registry, &props.geojson);
                }
                return;
            }
            self.teardown(registry);
        }

        let Some(source_id) = wanted else {
            return;
        };
        match self.setup(registry, source_id, &props.geojson) {
            Ok(()) => {
                info!(source = source_id, points = props.geojson.features.len(), "cluster overlay ready");
                self.active = Some(Active {
                    source_id: source_id.to_string(),
                    data: props.geojson.clone(),
                });
            }
            Err(err) => {
                warn!(source = source_id, %err, "could not set up cluster overlay");
                self.teardown(registry);
            }
        }
    }

    fn setup<M: MapHandle>(
        &mut self,
        registry: &mut MapRegistry<M>,
        source_id: &str,
        data: &Arc<FeatureCollection>,
    ) -> Result<(), MapError> {
        let owner = *self
            .owner
            .get_or_insert_with(|| registry.register_owner("cluster overlay"));

        registry.ensure_source(owner, source_id, GeoJsonSource::clustered(data.clone(), CLUSTER_OPTIONS))?;
        registry.ensure_layer(owner, clusters_layer(source_id))?;
        registry.set_glyphs(GLYPHS_URL);
        registry.ensure_layer(owner, cluster_count_layer(source_id))?;
        registry.ensure_layer(owner, unclustered_layer(source_id))?;

        let token = self.generation.token();
        registry.listen(owner, EventKind::Click, CLUSTERS_LAYER, zoom_into_cluster(source_id, token.clone()));
        for layer in [CLUSTERS_LAYER, UNCLUSTERED_LAYER] {
            registry.listen(owner, EventKind::MouseEnter, layer, set_cursor(Cursor::Pointer, token.clone()));
            registry.listen(owner, EventKind::MouseLeave, layer, set_cursor(Cursor::Default, token.clone()));
        }
        Ok(())
    }

    fn replace_data<M: MapHandle>(&mut self, registry: &mut MapRegistry<M>, data: &Arc<FeatureCollection>) {
        let (Some(owner), Some(active)) = (self.owner, self.active.as_mut()) else {
            return;
        };
        match registry.set_source_data(owner, &active.source_id, data.clone()) {
            Ok(()) => {
                debug!(source = %active.source_id, points = data.features.len(), "cluster data replaced");
                active.data = data.clone();
            }
            Err(err) => warn!(source = %active.source_id, %err, "could not replace cluster data"),
        }
    }

    /// Remove the overlay's listeners, layers and source, and drop any
    /// expansion lookup still in flight
    pub fn teardown<M: MapHandle>(&mut self, registry: &mut MapRegistry<M>) {
        self.generation.advance();
        if let Some(owner) = self.owner {
            registry.release(owner);
        }
        if let Some(active) = self.active.take() {
            debug!(source = %active.source_id, "cluster overlay removed");
        }
    }
}

impl Default for ClusterOverlay {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ClusterOverlay {
    fn drop(&mut self) {
        // Listeners left behind in a map we can no longer reach go inert
        self.generation.advance();
    }
}

fn clusters_layer(source_id: &str) -> LayerSpec {
    LayerSpec::new(
        CLUSTERS_LAYER,
        source_id,
        LayerPaint::Circle(CirclePaint {
            color: Rgb::hex(0xd73f3f),
            radius: 15.0,
            stroke_width: 0.0,
            stroke_color: None,
        }),
    )
    .with_filter(Filter::has(POINT_COUNT))
}

fn cluster_count_layer(source_id: &str) -> LayerSpec {
    LayerSpec::new(
        CLUSTER_COUNT_LAYER,
        source_id,
        LayerPaint::Symbol(SymbolPaint {
            text_field: "{point_count_abbreviated}".to_string(),
            text_size: 12.0,
            text_color: Rgb::WHITE,
        }),
    )
    .with_filter(Filter::has(POINT_COUNT))
}

fn unclustered_layer(source_id: &str) -> LayerSpec {
    LayerSpec::new(
        UNCLUSTERED_LAYER,
        source_id,
        LayerPaint::Circle(CirclePaint {
            color: Rgb::hex(0x11b4da),
            radius: 6.0,
            stroke_width: 1.0,
            stroke_color: Some(Rgb::WHITE),
        }),
    )
    .with_filter(Filter::not(Filter::has(POINT_COUNT)))
}

fn zoom_into_cluster(source_id: &str, token: GenerationToken) -> Listener {
    let source_id = source_id.to_string();
    Box::new(move |event: &MapEvent, map: &mut dyn MapHandle| {
        if !token.is_current() {
            return;
        }
        let features = map.query_rendered_features(event.point, &[CLUSTERS_LAYER]);
        let Some(feature) = features.first() else {
            return;
        };
        let (Some(cluster_id), Some(center)) = (feature.cluster_id(), feature.lng_lat()) else {
            debug!("clicked cluster has no id or point geometry");
            return;
        };

        let token = token.clone();
        map.cluster_expansion_zoom(
            &source_id,
            cluster_id,
            Box::new(move |result: Result<f64, MapError>, map: &mut dyn MapHandle| {
                if !token.is_current() {
                    debug!(cluster_id, "overlay removed before expansion zoom resolved");
                    return;
                }
                match result {
                    Ok(zoom) => map.ease_to(CameraOptions {
                        center: Some(center),
                        zoom: Some(zoom),
                    }),
                    Err(err) => debug!(cluster_id, %err, "cluster expansion zoom lookup failed"),
                }
            }),
        );
    })
}

fn set_cursor(cursor: Cursor, token: GenerationToken) -> Listener {
    Box::new(move |_: &MapEvent, map: &mut dyn MapHandle| {
        if token.is_current() {
            map.set_cursor(cursor);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::recording::{Call, RecordingMap};
    use crate::engine::style::CLUSTER_ID;
    use crate::engine::RenderedFeature;
    use crate::geo::LngLat;
    use geojson::{Feature, Geometry, JsonObject, Value};
    use glam::DVec2;
    use serde_json::json;

    const SOURCE: &str = "points";

    fn points(n: usize) -> Arc<FeatureCollection> {
        let features = (0..n)
            .map(|i| Feature::from(Geometry::new(Value::Point(vec![85.3 + i as f64 * 0.001, 27.7]))))
            .collect();
        Arc::new(FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        })
    }

    fn props(data: &Arc<FeatureCollection>) -> ClusterOverlayProps {
        ClusterOverlayProps {
            map_ready: true,
            visible: true,
            source_id: Some(SOURCE.to_string()),
            geojson: data.clone(),
        }
    }

    fn cluster_feature(id: u64, lon: f64, lat: f64) -> RenderedFeature {
        let mut properties = JsonObject::new();
        properties.insert(CLUSTER_ID.to_string(), json!(id));
        properties.insert(POINT_COUNT.to_string(), json!(3));
        RenderedFeature {
            layer_id: CLUSTERS_LAYER.to_string(),
            source_id: SOURCE.to_string(),
            geometry: Geometry::new(Value::Point(vec![lon, lat])),
            properties: Some(properties),
        }
    }

    fn ready_overlay() -> (ClusterOverlay, MapRegistry<RecordingMap>) {
        let mut registry = MapRegistry::new(RecordingMap::default());
        let mut overlay = ClusterOverlay::new();
        overlay.sync(Some(&mut registry), &props(&points(3)));
        (overlay, registry)
    }

    fn eases(map: &RecordingMap) -> Vec<&Call> {
        map.calls.iter().filter(|c| matches!(c, Call::EaseTo(_))).collect()
    }

    #[test]
    fn test_nothing_registered_until_all_preconditions_hold() {
        let mut registry = MapRegistry::new(RecordingMap::default());
        let mut overlay = ClusterOverlay::new();
        let data = points(3);

        for p in [
            ClusterOverlayProps { map_ready: false, ..props(&data) },
            ClusterOverlayProps { visible: false, ..props(&data) },
            ClusterOverlayProps { source_id: None, ..props(&data) },
        ] {
            overlay.sync(Some(&mut registry), &p);
        }
        overlay.sync::<RecordingMap>(None, &props(&data));

        assert!(registry.map().calls.is_empty());
        assert!(!overlay.is_active());
    }

    #[test]
    fn test_setup_is_idempotent() {
        let (mut overlay, mut registry) = ready_overlay();
        let data = registry.map().source_data(SOURCE).cloned().unwrap();
        overlay.sync(Some(&mut registry), &props(&data));
        overlay.sync(Some(&mut registry), &props(&data));

        let map = registry.map();
        for layer in [CLUSTERS_LAYER, CLUSTER_COUNT_LAYER, UNCLUSTERED_LAYER] {
            assert_eq!(map.count(&Call::AddLayer(layer.into())), 1, "{layer}");
        }
        assert_eq!(map.count(&Call::AddSource(SOURCE.into())), 1);
        assert_eq!(map.count(&Call::SetGlyphs(GLYPHS_URL.into())), 1);
        assert_eq!(map.listener_count(), 5);
        assert_eq!(map.count(&Call::SetSourceData(SOURCE.into())), 0);
    }

    #[test]
    fn test_click_eases_to_expansion_zoom() {
        let (_overlay, mut registry) = ready_overlay();
        let map = registry.map_mut();
        map.features
            .insert(CLUSTERS_LAYER.to_string(), vec![cluster_feature(7, 85.32, 27.71)]);
        map.expansion.insert(7, Ok(10.0));

        map.dispatch(EventKind::Click, CLUSTERS_LAYER, DVec2::new(40.0, 40.0));
        assert_eq!(map.count(&Call::ExpansionLookup(SOURCE.into(), 7)), 1);
        map.resolve_lookups();

        assert_eq!(
            eases(map),
            vec![&Call::EaseTo(CameraOptions {
                center: Some(LngLat::new(85.32, 27.71)),
                zoom: Some(10.0),
            })]
        );
    }

    #[test]
    fn test_failed_lookup_leaves_camera_alone() {
        let (_overlay, mut registry) = ready_overlay();
        let map = registry.map_mut();
        map.features
            .insert(CLUSTERS_LAYER.to_string(), vec![cluster_feature(9, 85.32, 27.71)]);

        map.dispatch(EventKind::Click, CLUSTERS_LAYER, DVec2::ZERO);
        map.resolve_lookups();

        assert!(eases(map).is_empty());
    }

    #[test]
    fn test_click_without_cluster_feature_does_nothing() {
        let (_overlay, mut registry) = ready_overlay();
        let map = registry.map_mut();
        map.dispatch(EventKind::Click, CLUSTERS_LAYER, DVec2::ZERO);
        assert_eq!(map.pending_lookups(), 0);
    }

    #[test]
    fn test_lookup_resolving_after_teardown_is_ignored() {
        let (mut overlay, mut registry) = ready_overlay();
        let map = registry.map_mut();
        map.features
            .insert(CLUSTERS_LAYER.to_string(), vec![cluster_feature(7, 85.32, 27.71)]);
        map.expansion.insert(7, Ok(10.0));
        map.dispatch(EventKind::Click, CLUSTERS_LAYER, DVec2::ZERO);

        overlay.teardown(&mut registry);
        registry.map_mut().resolve_lookups();

        assert!(eases(registry.map()).is_empty());
    }

    #[test]
    fn test_lookup_resolving_after_drop_is_ignored() {
        let (overlay, mut registry) = ready_overlay();
        let map = registry.map_mut();
        map.features
            .insert(CLUSTERS_LAYER.to_string(), vec![cluster_feature(7, 85.32, 27.71)]);
        map.expansion.insert(7, Ok(10.0));
        map.dispatch(EventKind::Click, CLUSTERS_LAYER, DVec2::ZERO);

        drop(overlay);
        registry.map_mut().resolve_lookups();

        assert!(eases(registry.map()).is_empty());
    }

    #[test]
    fn test_hover_toggles_cursor() {
        let (_overlay, mut registry) = ready_overlay();
        let map = registry.map_mut();

        map.dispatch(EventKind::MouseEnter, CLUSTERS_LAYER, DVec2::ZERO);
        assert_eq!(map.cursor(), Cursor::Pointer);
        map.dispatch(EventKind::MouseLeave, CLUSTERS_LAYER, DVec2::ZERO);
        assert_eq!(map.cursor(), Cursor::Default);
        map.dispatch(EventKind::MouseEnter, UNCLUSTERED_LAYER, DVec2::ZERO);
        assert_eq!(map.cursor(), Cursor::Pointer);
    }

    #[test]
    fn test_hiding_removes_everything() {
        let (mut overlay, mut registry) = ready_overlay();
        let data = points(3);
        overlay.sync(Some(&mut registry), &ClusterOverlayProps { visible: false, ..props(&data) });

        let map = registry.map();
        assert!(map.layer_ids().is_empty());
        assert!(!map.has_source(SOURCE));
        assert_eq!(map.listener_count(), 0);
        assert!(!overlay.is_active());
    }

    #[test]
    fn test_new_data_replaces_source_contents() {
        let (mut overlay, mut registry) = ready_overlay();
        let update = points(8);
        overlay.sync(Some(&mut registry), &props(&update));

        let map = registry.map();
        assert_eq!(map.count(&Call::SetSourceData(SOURCE.into())), 1);
        assert_eq!(map.count(&Call::AddLayer(CLUSTERS_LAYER.into())), 1);
        assert!(Arc::ptr_eq(map.source_data(SOURCE).unwrap(), &update));
    }

    #[test]
    fn test_source_id_change_moves_overlay() {
        let (mut overlay, mut registry) = ready_overlay();
        let data = points(3);
        overlay.sync(
            Some(&mut registry),
            &ClusterOverlayProps {
                source_id: Some("other".to_string()),
                ..props(&data)
            },
        );

        let map = registry.map();
        assert!(!map.has_source(SOURCE));
        assert!(map.has_source("other"));
        assert_eq!(map.count(&Call::AddLayer(CLUSTERS_LAYER.into())), 2);
        assert_eq!(map.listener_count(), 5);
    }

    #[test]
    fn test_layer_id_claimed_by_another_owner_fails_cleanly() {
        let mut registry = MapRegistry::new(RecordingMap::default());
        let squatter = registry.register_owner("squatter");
        registry
            .ensure_source(squatter, "s", GeoJsonSource::new(points(1)))
            .unwrap();
        registry
            .ensure_layer(squatter, LayerSpec::new(CLUSTER_COUNT_LAYER, "s", LayerPaint::default()))
            .unwrap();

        let mut overlay = ClusterOverlay::new();
        overlay.sync(Some(&mut registry), &props(&points(3)));

        assert!(!overlay.is_active());
        let map = registry.map();
        assert!(!map.has_source(SOURCE));
        assert!(!map.has_layer(CLUSTERS_LAYER));
        assert!(map.has_layer(CLUSTER_COUNT_LAYER));
    }
}
