//! Grid state loaded from a JSON file.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, PoisonError};

use coven_core::grid::{FARMLAND, GridPosition, GridStateProvider, GridTile, READY, TileState};
use serde::Deserialize;

use crate::error::AppError;

#[derive(Debug, Deserialize)]
struct GridFile {
    #[serde(default)]
    tiles: Vec<PlacedTile>,
}

#[derive(Debug, Deserialize)]
struct PlacedTile {
    x: i32,
    y: i32,
    #[serde(flatten)]
    tile: GridTile,
}

/// An in-process grid seeded from a file and updated by script steps.
#[derive(Debug, Default)]
pub struct FileGrid {
    tiles: Mutex<HashMap<GridPosition, GridTile>>,
    challenge: Mutex<BTreeSet<GridPosition>>,
}

impl FileGrid {
    /// Creates an empty grid.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a grid file: `{"tiles": [{"x": 0, "y": 0, "type": "farmland", "state": {...}}]}`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Parse` if the document does not match.
    pub fn from_json(raw: &str, location: &str) -> Result<Self, AppError> {
        let file: GridFile = serde_json::from_str(raw).map_err(|source| AppError::Parse {
            location: location.to_owned(),
            source,
        })?;
        let tiles = file
            .tiles
            .into_iter()
            .map(|placed| (GridPosition::new(placed.x, placed.y), placed.tile))
            .collect();
        Ok(Self {
            tiles: Mutex::new(tiles),
            challenge: Mutex::new(BTreeSet::new()),
        })
    }

    /// Replaces the tile at `position`.
    pub fn set_tile(&self, position: GridPosition, tile: GridTile) {
        self.tiles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(position, tile);
    }

    /// Puts a grown, harvestable `plant_type` crop on farmland at `position`.
    pub fn plant_ready(&self, position: GridPosition, plant_type: &str) {
        self.set_tile(
            position,
            GridTile {
                tile_type: FARMLAND.to_owned(),
                state: Some(TileState {
                    status: READY.to_owned(),
                    is_grown: true,
                    plant_type: Some(plant_type.to_owned()),
                }),
            },
        );
    }
}

impl GridStateProvider for FileGrid {
    fn grid_at(&self, position: GridPosition) -> Option<GridTile> {
        self.tiles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&position)
            .cloned()
    }

    fn activate_challenge_grids(&self, positions: &[GridPosition]) {
        self.challenge
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(positions.iter().copied());
    }

    fn deactivate_all_challenge_grids(&self) {
        self.challenge
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn challenge_grid_positions(&self) -> Vec<GridPosition> {
        self.challenge
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .copied()
            .collect()
    }
}
