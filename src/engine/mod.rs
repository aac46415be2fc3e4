mod cluster;
mod draw;
mod handle;
mod spatial;
pub mod style;
mod terminal;
mod viewport;

#[cfg(test)]
pub(crate) mod recording;

pub use cluster::{abbreviate_count, ClusterFeature, ClusterIndex, NodeKind};
pub use handle::{
    CameraOptions, Cursor, EventKind, ExpansionZoomCallback, FitBoundsOptions, Listener, ListenerId, MapEvent,
    MapHandle, RenderedFeature,
};
pub use terminal::{Label, RenderedMap, Stroke, TerminalMap};
pub use viewport::{Viewport, MAX_ZOOM, MIN_ZOOM};
