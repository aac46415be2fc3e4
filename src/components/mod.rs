//! Map components driven by the parent view.
//!
//! Each component is synced with fresh props after every state change and
//! turns the difference into registry calls, the way an effect hook reacts
//! to its dependencies.

mod cluster_overlay;
mod map_view;
mod vector_layer;

pub use cluster_overlay::{
    ClusterOverlay, ClusterOverlayProps, CLUSTERS_LAYER, CLUSTER_COUNT_LAYER, GLYPHS_URL, UNCLUSTERED_LAYER,
};
pub use map_view::{MapView, MapViewProps, FIT_PADDING, SPLIT_AREA_LAYER, UPLOADED_AREA_LAYER};
pub use vector_layer::{VectorLayer, VectorLayerProps};

use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;

/// Counter bumped on every teardown so callbacks created before it can
/// tell they are stale
#[derive(Clone, Debug, Default)]
pub struct Generation(Rc<Cell<u64>>);

impl Generation {
    pub fn token(&self) -> GenerationToken {
        GenerationToken {
            current: self.0.clone(),
            issued: self.0.get(),
        }
    }

    pub fn advance(&self) {
        self.0.set(self.0.get() + 1);
    }
}

#[derive(Clone, Debug)]
pub struct GenerationToken {
    current: Rc<Cell<u64>>,
    issued: u64,
}

impl GenerationToken {
    pub fn is_current(&self) -> bool {
        self.current.get() == self.issued
    }
}

/// Pointer equality on optional shared geometry
pub(crate) fn same_data<T>(a: Option<&Arc<T>>, b: Option<&Arc<T>>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => Arc::ptr_eq(a, b),
        (None, None) => true,
        _ => false,
    }
}
