use serde::{Deserialize, Serialize};

use crate::grid::GridEngine;
use crate::rng::Rng;

pub const DEFAULT_FOUR_CHANCE: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Spawn {
    pub row: usize,
    pub col: usize,
    pub value: u32,
}

/// Drops a 2 (or, less often, a 4) into a uniformly chosen empty cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileSpawner {
    rng: Rng,
    four_chance: f64,
}

impl TileSpawner {
    pub fn new(seed: u64) -> Self {
        Self::with_four_chance(seed, DEFAULT_FOUR_CHANCE)
    }

    pub fn with_four_chance(seed: u64, four_chance: f64) -> Self {
        Self {
            rng: Rng::new(seed),
            four_chance: four_chance.clamp(0.0, 1.0),
        }
    }

    /// Returns `None`, leaving the board alone, when no cell is empty.
    pub fn spawn(&mut self, engine: &mut GridEngine) -> Option<Spawn> {
        let empty = engine.grid().empty_cells();
        if empty.is_empty() {
            log::error!("tile spawn requested on a full board");
            return None;
        }
        let (row, col) = empty[self.rng.below(empty.len())];
        let value = if self.rng.next_f64() < self.four_chance {
            4
        } else {
            2
        };
        engine.place_tile(row, col, value);
        Some(Spawn { row, col, value })
    }
}
