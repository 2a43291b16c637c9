//! Live game-grid collaborator.

use serde::{Deserialize, Serialize};

/// A cell coordinate on the farming grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridPosition {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
}

impl GridPosition {
    /// Creates a position.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Crop state of a grid cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileState {
    /// Lifecycle status reported by the game, e.g. `"growing"` or `"ready"`.
    pub status: String,
    /// Whether the crop has finished growing.
    #[serde(default)]
    pub is_grown: bool,
    /// The planted crop, if any.
    #[serde(default)]
    pub plant_type: Option<String>,
}

/// A snapshot of one grid cell as reported by the game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridTile {
    /// Terrain type, e.g. `"farmland"` or `"grass"`.
    #[serde(rename = "type")]
    pub tile_type: String,
    /// Crop state, absent on cells that cannot hold crops.
    #[serde(default)]
    pub state: Option<TileState>,
}

/// Terrain type of cells that can hold crops.
pub const FARMLAND: &str = "farmland";

/// Crop status of a cell ready for harvest.
pub const READY: &str = "ready";

impl GridTile {
    /// Returns whether this cell is farmland holding a grown, ready crop of
    /// `plant_type`.
    #[must_use]
    pub fn has_ready_crop(&self, plant_type: &str) -> bool {
        self.tile_type == FARMLAND
            && self.state.as_ref().is_some_and(|state| {
                state.status == READY
                    && state.is_grown
                    && state.plant_type.as_deref() == Some(plant_type)
            })
    }
}

/// Read access to the live grid plus challenge-grid highlighting.
///
/// Implementations live in the game layer and use interior mutability for
/// the activation calls.
pub trait GridStateProvider: Send + Sync {
    /// Returns the cell at `position`, or `None` outside the map.
    fn grid_at(&self, position: GridPosition) -> Option<GridTile>;

    /// Marks `positions` as the active challenge grid.
    fn activate_challenge_grids(&self, positions: &[GridPosition]);

    /// Clears every active challenge-grid marker.
    fn deactivate_all_challenge_grids(&self);

    /// Returns the positions currently marked as challenge grid.
    fn challenge_grid_positions(&self) -> Vec<GridPosition>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tile(tile_type: &str, status: &str, is_grown: bool, plant: Option<&str>) -> GridTile {
        GridTile {
            tile_type: tile_type.to_owned(),
            state: Some(TileState {
                status: status.to_owned(),
                is_grown,
                plant_type: plant.map(str::to_owned),
            }),
        }
    }

    #[test]
    fn test_has_ready_crop_requires_every_condition() {
        assert!(tile("farmland", "ready", true, Some("wheat")).has_ready_crop("wheat"));
        assert!(!tile("grass", "ready", true, Some("wheat")).has_ready_crop("wheat"));
        assert!(!tile("farmland", "growing", true, Some("wheat")).has_ready_crop("wheat"));
        assert!(!tile("farmland", "ready", false, Some("wheat")).has_ready_crop("wheat"));
        assert!(!tile("farmland", "ready", true, Some("carrot")).has_ready_crop("wheat"));
        assert!(!tile("farmland", "ready", true, None).has_ready_crop("wheat"));
    }

    #[test]
    fn test_grid_tile_deserializes_game_shape() {
        let json = r#"{"type":"farmland","state":{"status":"ready","isGrown":true,"plantType":"wheat"}}"#;
        let tile: GridTile = serde_json::from_str(json).unwrap();
        assert!(tile.has_ready_crop("wheat"));
    }
}
