//! In-memory grid state.

use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;

use coven_core::grid::{FARMLAND, GridPosition, GridStateProvider, GridTile, READY, TileState};

/// A grid whose cells are set directly by tests.
#[derive(Debug, Default)]
pub struct InMemoryGrid {
    tiles: Mutex<HashMap<GridPosition, GridTile>>,
    challenge: Mutex<BTreeSet<GridPosition>>,
}

impl InMemoryGrid {
    /// Creates an empty grid.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the cell at `position`.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn set_tile(&self, position: GridPosition, tile: GridTile) {
        self.tiles.lock().unwrap().insert(position, tile);
    }

    /// Places a grown, ready crop of `plant_type` on farmland at `position`.
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

impl GridStateProvider for InMemoryGrid {
    fn grid_at(&self, position: GridPosition) -> Option<GridTile> {
        self.tiles.lock().unwrap().get(&position).cloned()
    }

    fn activate_challenge_grids(&self, positions: &[GridPosition]) {
        self.challenge
            .lock()
            .unwrap()
            .extend(positions.iter().copied());
    }

    fn deactivate_all_challenge_grids(&self) {
        self.challenge.lock().unwrap().clear();
    }

    fn challenge_grid_positions(&self) -> Vec<GridPosition> {
        self.challenge.lock().unwrap().iter().copied().collect()
    }
}
