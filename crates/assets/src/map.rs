use arena_core::{Room, CENTRAL_PILLAR_RADIUS};
use arena_net::WaveDef;
use arena_physics::{ArenaGeometry, Obstacle, Rect};
use serde::{Deserialize, Serialize};

/// Map id the lobby room is loaded from.
pub const LOBBY_MAP_ID: &str = "lobby";

/// Grid spacing of generated wave maps, in world units.
const WAVE_GRID_SIZE: f32 = 25.0;

/// One map as stored on disk (`<maps_dir>/<id>.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapDocument {
    /// Map identifier (e.g. "lobby", "wave3").
    pub id: String,
    /// Room tag the map belongs to.
    #[serde(default)]
    pub room: Option<u8>,
    /// Background grid.
    #[serde(default)]
    pub grid: Option<GridSpec>,
    /// Outer walls; absent means the arena is unbounded.
    #[serde(default)]
    pub walls: Option<Walls>,
    /// Lobby portals.
    #[serde(default)]
    pub portals: Vec<Portal>,
    /// Combat tuning carried by generated wave maps.
    #[serde(default)]
    pub wave: Option<WaveParams>,
}

/// Background grid description.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    /// Cell size in world units.
    pub size: f32,
}

/// Wall shape of a map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Walls {
    /// Axis-aligned square.
    Box {
        /// Half of the side length.
        #[serde(rename = "halfSize", default)]
        half_size: f32,
    },
    /// Closed polygon; only four-point axis diamonds constrain movement.
    Polygon {
        /// Vertices in world units.
        #[serde(default)]
        points: Vec<[f32; 2]>,
    },
    /// Wall kind this client does not understand.
    #[serde(other)]
    Unsupported,
}

/// Lobby portal leading to another room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Portal {
    /// Id sent in the EnterPortal message.
    pub id: u8,
    /// `[x, y, w, h]` in world units.
    pub rect: [f32; 4],
    /// Display tint (opaque to the client core).
    #[serde(default)]
    pub tint: Option<serde_json::Value>,
    /// Room the portal leads to.
    #[serde(default)]
    pub target_room: Option<u8>,
}

impl Portal {
    /// Portal area as a rectangle.
    pub fn rect(&self) -> Rect {
        let [x, y, w, h] = self.rect;
        Rect::new(x, y, w, h)
    }
}

/// Combat tuning for a wave map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaveParams {
    /// Radius of hostile entities.
    pub entity_radius: f32,
    /// Margin kept clear of walls when spawning.
    pub spawn_margin: f32,
    /// Scale applied to wall-hugging enemies.
    pub wall_enemy_radius_scale: f32,
}

impl MapDocument {
    /// Parse a map from JSON.
    pub fn from_json(input: &str) -> Result<Self, crate::AssetError> {
        Ok(serde_json::from_str(input)?)
    }

    /// Movement bounds for this map when played in `room`.
    ///
    /// The central pillar only exists in the combat room.
    pub fn arena_geometry(&self, room: Room) -> ArenaGeometry {
        let geometry = match &self.walls {
            Some(Walls::Box { half_size }) => ArenaGeometry::square(*half_size),
            Some(Walls::Polygon { points }) => {
                ArenaGeometry::diamond_from_points(points).unwrap_or_default()
            }
            Some(Walls::Unsupported) | None => ArenaGeometry::Unbounded,
        };
        if room == Room::Wave {
            geometry.with_obstacle(Obstacle::from_world(CENTRAL_PILLAR_RADIUS))
        } else {
            geometry
        }
    }

    /// First portal whose rectangle touches the circle at `(x, y)`.
    pub fn portal_at(&self, x: f32, y: f32, radius: f32) -> Option<&Portal> {
        self.portals
            .iter()
            .find(|portal| portal.rect().overlaps_circle(x, y, radius))
    }
}

/// Map derived from a wave definition; wave rooms have no file on disk.
pub fn wave_map(def: &WaveDef) -> MapDocument {
    MapDocument {
        id: format!("wave{}", def.wave_number),
        room: Some(Room::WAVE_TAG),
        grid: Some(GridSpec {
            size: WAVE_GRID_SIZE,
        }),
        walls: Some(Walls::Box {
            half_size: def.half_size,
        }),
        portals: Vec::new(),
        wave: Some(WaveParams {
            entity_radius: def.entity_radius,
            spawn_margin: def.spawn_margin,
            wall_enemy_radius_scale: 2.0,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arena_core::Fixed;

    const LOBBY_JSON: &str = r#"{
        "id": "lobby",
        "room": 0,
        "grid": { "size": 25 },
        "walls": { "kind": "box", "strokeWidth": 4, "halfSize": 600 },
        "portals": [
            { "id": 1, "rect": [100, -40, 80, 80], "tint": "0x44ccff", "targetRoom": 1 },
            { "id": 2, "rect": [-180, -40, 80, 80] }
        ]
    }"#;

    #[test]
    fn parses_lobby_document() {
        let map = MapDocument::from_json(LOBBY_JSON).unwrap();
        assert_eq!(map.id, "lobby");
        assert_eq!(map.walls, Some(Walls::Box { half_size: 600.0 }));
        assert_eq!(map.portals.len(), 2);
        assert_eq!(map.portals[0].target_room, Some(1));
        assert_eq!(map.portals[1].tint, None);
    }

    #[test]
    fn lobby_geometry_has_no_pillar() {
        let map = MapDocument::from_json(LOBBY_JSON).unwrap();
        let geometry = map.arena_geometry(Room::Lobby);
        assert_eq!(geometry.limit(), Some(Fixed(585_000)));
        assert_eq!(geometry.obstacle(), None);
    }

    #[test]
    fn diamond_polygon_resolves() {
        let map = MapDocument::from_json(
            r#"{ "id": "d", "walls": { "kind": "polygon",
                 "points": [[0, 100], [100, 0], [0, -100], [-100, 0]] } }"#,
        )
        .unwrap();
        assert!(matches!(
            map.arena_geometry(Room::Lobby),
            ArenaGeometry::Diamond { .. }
        ));
    }

    #[test]
    fn irregular_polygon_and_unknown_walls_are_unbounded() {
        let map = MapDocument::from_json(
            r#"{ "id": "p", "walls": { "kind": "polygon", "points": [[0, 1], [1, 1], [1, 0]] } }"#,
        )
        .unwrap();
        assert_eq!(map.arena_geometry(Room::Lobby), ArenaGeometry::Unbounded);

        let map =
            MapDocument::from_json(r#"{ "id": "c", "walls": { "kind": "circle" } }"#).unwrap();
        assert_eq!(map.walls, Some(Walls::Unsupported));
        assert_eq!(map.arena_geometry(Room::Lobby), ArenaGeometry::Unbounded);
    }

    #[test]
    fn portal_lookup_uses_player_circle() {
        let map = MapDocument::from_json(LOBBY_JSON).unwrap();
        assert_eq!(map.portal_at(90.0, 0.0, 15.0).map(|p| p.id), Some(1));
        assert_eq!(map.portal_at(0.0, 0.0, 15.0), None);
    }

    #[test]
    fn wave_map_is_a_box_with_pillar() {
        let map = wave_map(&WaveDef {
            wave_number: 4,
            half_size: 350.0,
            entity_radius: 11.0,
            spawn_margin: 40.0,
        });
        assert_eq!(map.id, "wave4");
        let geometry = map.arena_geometry(Room::Wave);
        assert_eq!(geometry.limit(), Some(Fixed(335_000)));
        assert_eq!(
            geometry.obstacle(),
            Some(Obstacle::from_world(CENTRAL_PILLAR_RADIUS))
        );
        assert_eq!(map.wave.map(|w| w.entity_radius), Some(11.0));
    }
}
