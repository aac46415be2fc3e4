use thiserror::Error;

/// Errors raised by a map engine or by the resource registry in front of it
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MapError {
    #[error("source `{0}` already exists")]
    SourceExists(String),

    #[error("layer `{0}` already exists")]
    LayerExists(String),

    #[error("source `{0}` does not exist")]
    UnknownSource(String),

    #[error("layer `{0}` does not exist")]
    UnknownLayer(String),

    #[error("source `{source_id}` is still used by layer `{layer_id}`")]
    SourceInUse { source_id: String, layer_id: String },

    #[error("source `{0}` is not clustered")]
    NotClustered(String),

    #[error("no cluster with id {0}")]
    UnknownCluster(u64),

    #[error("`{id}` is already registered by {owner}")]
    OwnedElsewhere { id: String, owner: String },
}

/// Errors returned by the API client. Nothing is retried.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("request failed: {0}")]
    Transport(String),

    #[error("server responded with {status}: {body}")]
    Status { status: u16, body: String },

    #[error("could not decode response: {0}")]
    Decode(String),
}

/// Errors from loading or deriving geometry files
#[derive(Debug, Error)]
pub enum DataError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("invalid GeoJSON: {0}")]
    Parse(String),

    #[error("GeoJSON contains no features")]
    Empty,

    #[error("split size must be positive, got {0} m")]
    InvalidSplitSize(f64),

    #[error("split would produce {cells} cells (limit {limit})")]
    TooManyCells { cells: usize, limit: usize },
}
