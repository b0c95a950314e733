use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{AssetError, MapDocument};

/// Loads map documents from a directory and caches them by id.
#[derive(Debug, Clone)]
pub struct MapStore {
    dir: PathBuf,
    cache: HashMap<String, MapDocument>,
}

impl MapStore {
    /// Store reading `<dir>/<id>.json`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            cache: HashMap::new(),
        }
    }

    /// Directory maps are read from.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Put a document into the cache (embedded maps, tests).
    pub fn insert(&mut self, map: MapDocument) {
        self.cache.insert(map.id.clone(), map);
    }

    /// Cached document, without touching the filesystem.
    pub fn cached(&self, id: &str) -> Option<&MapDocument> {
        self.cache.get(id)
    }

    /// Load a map, reading it from disk on first use.
    pub fn load(&mut self, id: &str) -> Result<&MapDocument, AssetError> {
        if !self.cache.contains_key(id) {
            let map = self.read(id)?;
            self.cache.insert(id.to_string(), map);
        }
        self.cache
            .get(id)
            .ok_or_else(|| AssetError::UnknownMap(id.to_string()))
    }

    fn read(&self, id: &str) -> Result<MapDocument, AssetError> {
        let valid_id = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid_id {
            return Err(AssetError::UnknownMap(id.to_string()));
        }
        let path = self.dir.join(format!("{id}.json"));
        debug!(path = %path.display(), "Loading map");
        let data = fs::read_to_string(&path).map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => AssetError::UnknownMap(id.to_string()),
            _ => AssetError::Io(err),
        })?;
        MapDocument::from_json(&data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Walls;
    use tempfile::tempdir;

    #[test]
    fn loads_and_caches_from_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("lobby.json");
        fs::write(
            &path,
            r#"{ "id": "lobby", "walls": { "kind": "box", "halfSize": 500 } }"#,
        )
        .unwrap();

        let mut store = MapStore::new(dir.path());
        assert!(store.cached("lobby").is_none());
        assert_eq!(
            store.load("lobby").unwrap().walls,
            Some(Walls::Box { half_size: 500.0 })
        );

        // Served from the cache even after the file disappears.
        fs::remove_file(&path).unwrap();
        assert!(store.load("lobby").is_ok());
        assert!(store.cached("lobby").is_some());
    }

    #[test]
    fn missing_map_is_unknown() {
        let dir = tempdir().unwrap();
        let mut store = MapStore::new(dir.path());
        assert!(matches!(
            store.load("nowhere"),
            Err(AssetError::UnknownMap(id)) if id == "nowhere"
        ));
    }

    #[test]
    fn path_like_ids_are_rejected() {
        let dir = tempdir().unwrap();
        let mut store = MapStore::new(dir.path());
        assert!(matches!(
            store.load("../secret"),
            Err(AssetError::UnknownMap(_))
        ));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("bad.json"), "{ not json").unwrap();
        let mut store = MapStore::new(dir.path());
        assert!(matches!(store.load("bad"), Err(AssetError::Parse(_))));
    }

    #[test]
    fn inserted_maps_need_no_file() {
        let mut store = MapStore::new("/nonexistent");
        store.insert(MapDocument::from_json(r#"{ "id": "lobby" }"#).unwrap());
        assert_eq!(store.load("lobby").unwrap().id, "lobby");
    }
}
