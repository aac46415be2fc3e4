use crate::components::{same_data, VectorLayer, VectorLayerProps};
use crate::engine::style::{FillPaint, LayerPaint, Rgb};
use crate::engine::{FitBoundsOptions, MapHandle};
use crate::geo::Bounds;
use crate::registry::{MapRegistry, OwnerId};
use geojson::FeatureCollection;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const UPLOADED_AREA_LAYER: &str = "uploaded-project-area";
pub const SPLIT_AREA_LAYER: &str = "split-area";

/// Padding kept around the uploaded area when the camera frames it
pub const FIT_PADDING: f64 = 25.0;

#[derive(Clone, Default)]
pub struct MapViewProps {
    pub map_ready: bool,
    pub uploaded_area: Option<Arc<FeatureCollection>>,
    pub split: Option<Arc<FeatureCollection>>,
}

/// Project area display: the uploaded boundary as a translucent fill, the
/// task split as lines, and the camera framed on the boundary each time a
/// new one arrives.
pub struct MapView {
    owner: Option<OwnerId>,
    uploaded: VectorLayer,
    split: VectorLayer,
    /// Upload the camera was last fitted to
    fitted: Option<Arc<FeatureCollection>>,
}

impl MapView {
    pub fn new() -> Self {
        Self {
            owner: None,
            uploaded: VectorLayer::new(
                UPLOADED_AREA_LAYER,
                LayerPaint::Fill(FillPaint {
                    color: Rgb::hex(0x328ffd),
                    outline_color: Some(Rgb::hex(0xd33a38)),
                    opacity: 0.2,
                }),
            ),
            split: VectorLayer::new(SPLIT_AREA_LAYER, LayerPaint::default()),
            fitted: None,
        }
    }

    pub fn sync<M: MapHandle>(&mut self, map: Option<&mut MapRegistry<M>>, props: &MapViewProps) {
        let Some(registry) = map else {
            return;
        };
        let owner = *self.owner.get_or_insert_with(|| registry.register_owner("map view"));

        for (layer, geojson) in [
            (&mut self.uploaded, props.uploaded_area.as_ref()),
            (&mut self.split, props.split.as_ref()),
        ] {
            let layer_props = VectorLayerProps {
                map_ready: props.map_ready,
                geojson,
                visible: geojson.is_some(),
            };
            if let Err(err) = layer.sync(registry, owner, layer_props) {
                warn!(layer = layer.id(), %err, "could not update vector layer");
            }
        }

        self.fit_to_upload(registry, props);
    }

    fn fit_to_upload<M: MapHandle>(&mut self, registry: &mut MapRegistry<M>, props: &MapViewProps) {
        let Some(area) = props.uploaded_area.as_ref() else {
            self.fitted = None;
            return;
        };
        if !props.map_ready || same_data(self.fitted.as_ref(), Some(area)) {
            return;
        }

        match Bounds::of_collection(area) {
            Some(bounds) => {
                info!(?bounds, "framing uploaded project area");
                registry
                    .map_mut()
                    .fit_bounds(bounds, FitBoundsOptions { padding: FIT_PADDING });
            }
            None => debug!("uploaded project area has no coordinates"),
        }
        self.fitted = Some(area.clone());
    }

    /// Remove everything this view registered
    pub fn teardown<M: MapHandle>(&mut self, registry: &mut MapRegistry<M>) {
        if let Some(owner) = self.owner {
            registry.release(owner);
        }
        self.uploaded.forget();
        self.split.forget();
        self.fitted = None;
    }
}

impl Default for MapView {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::recording::{Call, RecordingMap};
    use crate::engine::style::Visibility;
    use geojson::{Feature, Geometry, Value};

    fn polygon() -> Arc<FeatureCollection> {
        let ring = vec![
            vec![85.30, 27.68],
            vec![85.36, 27.68],
            vec![85.36, 27.73],
            vec![85.30, 27.73],
            vec![85.30, 27.68],
        ];
        Arc::new(FeatureCollection {
            bbox: None,
            features: vec![Feature::from(Geometry::new(Value::Polygon(vec![ring])))],
            foreign_members: None,
        })
    }

    fn fits(map: &RecordingMap) -> Vec<&Call> {
        map.calls.iter().filter(|c| matches!(c, Call::FitBounds(..))).collect()
    }

    #[test]
    fn test_no_upload_means_no_layer_and_no_fit() {
        let mut registry = MapRegistry::new(RecordingMap::default());
        let mut view = MapView::new();
        view.sync(
            Some(&mut registry),
            &MapViewProps {
                map_ready: true,
                ..Default::default()
            },
        );
        assert!(fits(registry.map()).is_empty());
        assert!(registry.map().layer_ids().is_empty());
    }

    #[test]
    fn test_upload_fits_bbox_with_padding_once_per_reference() {
        let mut registry = MapRegistry::new(RecordingMap::default());
        let mut view = MapView::new();
        let area = polygon();
        let props = MapViewProps {
            map_ready: true,
            uploaded_area: Some(area.clone()),
            split: None,
        };

        view.sync(Some(&mut registry), &props);
        view.sync(Some(&mut registry), &props);

        assert_eq!(
            fits(registry.map()),
            vec![&Call::FitBounds(
                Bounds::new(85.30, 27.68, 85.36, 27.73),
                FitBoundsOptions { padding: 25.0 }
            )]
        );
        assert!(registry.map().layer_ids().contains(UPLOADED_AREA_LAYER));

        // Structurally equal but a new upload
        let again = MapViewProps {
            uploaded_area: Some(polygon()),
            ..props
        };
        view.sync(Some(&mut registry), &again);
        assert_eq!(fits(registry.map()).len(), 2);
    }

    #[test]
    fn test_fit_waits_for_map_ready() {
        let mut registry = MapRegistry::new(RecordingMap::default());
        let mut view = MapView::new();
        let mut props = MapViewProps {
            map_ready: false,
            uploaded_area: Some(polygon()),
            split: None,
        };

        view.sync(Some(&mut registry), &props);
        assert!(fits(registry.map()).is_empty());

        props.map_ready = true;
        view.sync(Some(&mut registry), &props);
        assert_eq!(fits(registry.map()).len(), 1);
    }

    #[test]
    fn test_missing_map_is_a_no_op() {
        let mut view = MapView::new();
        view.sync::<RecordingMap>(
            None,
            &MapViewProps {
                map_ready: true,
                uploaded_area: Some(polygon()),
                split: None,
            },
        );
        assert!(view.fitted.is_none());
    }

    #[test]
    fn test_removed_upload_hides_layer_and_split_draws_lines() {
        let mut registry = MapRegistry::new(RecordingMap::default());
        let mut view = MapView::new();
        view.sync(
            Some(&mut registry),
            &MapViewProps {
                map_ready: true,
                uploaded_area: Some(polygon()),
                split: Some(polygon()),
            },
        );
        view.sync(
            Some(&mut registry),
            &MapViewProps {
                map_ready: true,
                uploaded_area: None,
                split: Some(polygon()),
            },
        );

        let map = registry.map();
        assert!(map.layer_ids().contains(SPLIT_AREA_LAYER));
        assert!(map.layer_ids().contains(UPLOADED_AREA_LAYER));
        assert_eq!(
            map.count(&Call::SetVisibility(UPLOADED_AREA_LAYER.into(), Visibility::None)),
            1
        );
        // The new split reference replaced the data instead of re-adding
        assert_eq!(map.count(&Call::AddLayer(SPLIT_AREA_LAYER.into())), 1);
        assert_eq!(map.count(&Call::SetSourceData(SPLIT_AREA_LAYER.into())), 1);
    }

    #[test]
    fn test_teardown_releases_layers() {
        let mut registry = MapRegistry::new(RecordingMap::default());
        let mut view = MapView::new();
        view.sync(
            Some(&mut registry),
            &MapViewProps {
                map_ready: true,
                uploaded_area: Some(polygon()),
                split: Some(polygon()),
            },
        );
        view.teardown(&mut registry);
        assert!(registry.map().layer_ids().is_empty());
        assert!(!registry.map().has_source(UPLOADED_AREA_LAYER));
    }
}
