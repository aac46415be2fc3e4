use crate::engine::style::{GeoJsonSource, LayerPaint, LayerSpec, Visibility};
use crate::engine::MapHandle;
use crate::error::MapError;
use crate::registry::{MapRegistry, OwnerId};
use geojson::FeatureCollection;
use std::sync::Arc;

pub struct VectorLayerProps<'a> {
    pub map_ready: bool,
    pub geojson: Option<&'a Arc<FeatureCollection>>,
    pub visible: bool,
}

struct Registered {
    data: Arc<FeatureCollection>,
    visibility: Visibility,
}

/// A GeoJSON source drawn by a single layer of the same id.
///
/// Registered the first time data is shown; afterwards only the data and
/// visibility change. Hiding never removes the layer.
pub struct VectorLayer {
    id: String,
    paint: LayerPaint,
    registered: Option<Registered>,
}

impl VectorLayer {
    pub fn new(id: &str, paint: LayerPaint) -> Self {
        Self {
            id: id.to_string(),
            paint,
            registered: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn sync<M: MapHandle>(
        &mut self,
        registry: &mut MapRegistry<M>,
        owner: OwnerId,
        props: VectorLayerProps<'_>,
    ) -> Result<(), MapError> {
        if !props.map_ready {
            return Ok(());
        }

        let shown = props.geojson.filter(|_| props.visible);
        let Some(state) = self.registered.as_mut() else {
            if let Some(data) = shown {
                registry.ensure_source(owner, &self.id, GeoJsonSource::new(data.clone()))?;
                registry.ensure_layer(owner, LayerSpec::new(&self.id, &self.id, self.paint.clone()))?;
                self.registered = Some(Registered {
                    data: data.clone(),
                    visibility: Visibility::Visible,
                });
            }
            return Ok(());
        };

        match shown {
            Some(data) => {
                if !Arc::ptr_eq(&state.data, data) {
                    registry.set_source_data(owner, &self.id, data.clone())?;
                    state.data = data.clone();
                }
                if state.visibility != Visibility::Visible {
                    registry.set_layer_visibility(owner, &self.id, Visibility::Visible)?;
                    state.visibility = Visibility::Visible;
                }
            }
            None if state.visibility == Visibility::Visible => {
                registry.set_layer_visibility(owner, &self.id, Visibility::None)?;
                state.visibility = Visibility::None;
            }
            None => {}
        }
        Ok(())
    }

    /// Drop local state after the owner's resources were released
    pub fn forget(&mut self) {
        self.registered = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::recording::{Call, RecordingMap};

    fn data() -> Arc<FeatureCollection> {
        Arc::new(FeatureCollection {
            bbox: None,
            features: vec![],
            foreign_members: None,
        })
    }

    fn props(geojson: Option<&Arc<FeatureCollection>>) -> VectorLayerProps<'_> {
        VectorLayerProps {
            map_ready: true,
            geojson,
            visible: geojson.is_some(),
        }
    }

    #[test]
    fn test_registers_once_and_replaces_data() {
        let mut registry = MapRegistry::new(RecordingMap::default());
        let owner = registry.register_owner("test");
        let mut layer = VectorLayer::new("area", LayerPaint::default());

        let first = data();
        layer.sync(&mut registry, owner, props(Some(&first))).unwrap();
        layer.sync(&mut registry, owner, props(Some(&first))).unwrap();
        let second = data();
        layer.sync(&mut registry, owner, props(Some(&second))).unwrap();

        let map = registry.map();
        assert_eq!(map.count(&Call::AddLayer("area".into())), 1);
        assert_eq!(map.count(&Call::SetSourceData("area".into())), 1);
        assert!(Arc::ptr_eq(map.source_data("area").unwrap(), &second));
    }

    #[test]
    fn test_absent_data_hides_without_removing() {
        let mut registry = MapRegistry::new(RecordingMap::default());
        let owner = registry.register_owner("test");
        let mut layer = VectorLayer::new("area", LayerPaint::default());

        let d = data();
        layer.sync(&mut registry, owner, props(Some(&d))).unwrap();
        layer.sync(&mut registry, owner, props(None)).unwrap();
        layer.sync(&mut registry, owner, props(None)).unwrap();
        layer.sync(&mut registry, owner, props(Some(&d))).unwrap();

        let map = registry.map();
        assert_eq!(map.count(&Call::RemoveLayer("area".into())), 0);
        assert_eq!(map.count(&Call::SetVisibility("area".into(), Visibility::None)), 1);
        assert_eq!(map.count(&Call::SetVisibility("area".into(), Visibility::Visible)), 1);
    }

    #[test]
    fn test_nothing_happens_before_map_is_ready() {
        let mut registry = MapRegistry::new(RecordingMap::default());
        let owner = registry.register_owner("test");
        let mut layer = VectorLayer::new("area", LayerPaint::default());
        let d = data();
        let not_ready = VectorLayerProps {
            map_ready: false,
            geojson: Some(&d),
            visible: true,
        };
        layer.sync(&mut registry, owner, not_ready).unwrap();
        assert!(registry.map().calls.is_empty());
    }
}
