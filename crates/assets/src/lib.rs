#![warn(missing_docs)]
//! Map documents, the on-disk map store, and the geometry the client derives
//! from them.

mod map;
mod store;

pub use map::{wave_map, GridSpec, MapDocument, Portal, Walls, WaveParams, LOBBY_MAP_ID};
pub use store::MapStore;

use thiserror::Error;

/// Errors emitted while loading maps.
#[derive(Debug, Error)]
pub enum AssetError {
    /// Wrap IO errors when reading map files.
    #[error("failed to read map: {0}")]
    Io(#[from] std::io::Error),
    /// Wrap serde parsing issues.
    #[error("failed to parse map: {0}")]
    Parse(#[from] serde_json::Error),
    /// No map with this id exists.
    #[error("unknown map '{0}'")]
    UnknownMap(String),
}
