use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{ParseError, StoreError};
use crate::grid::Grid;
use crate::mode::{GameMode, ModeRules};
use crate::rng::Rng;
use crate::store::{KeyValueStore, load_json, save_json};

pub const DAILY_KEY: &str = "daily";
pub const DAILY_SIZE: usize = 4;
pub const DAILY_TILES: usize = 6;
pub const BASE_TARGET: u32 = 1024;
pub const TARGET_STEP: u32 = 128;
pub const THEMES: [&str; 4] = ["Aurora Frost", "Neon Drift", "Azure Pulse", "Crystal Bloom"];

/// One day's fixed board and goal. Every player gets the same one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyChallenge {
    pub date: String,
    pub seed: u64,
    pub board: Grid,
    pub target_score: u32,
    pub theme_name: String,
    pub description: String,
}

impl DailyChallenge {
    /// Build the challenge for a `YYYY-MM-DD` key.
    ///
    /// The key's digits form the seed. A single xorshift stream then picks six
    /// cells uniformly among those still empty and a value for each (4 when
    /// the unit draw exceeds 0.75, else 2).
    pub fn for_date(date_key: &str) -> Result<Self, ParseError> {
        let date = NaiveDate::parse_from_str(date_key.trim(), "%Y-%m-%d")
            .map_err(|_| ParseError::DateKey(date_key.to_string()))?;
        let date = date.format("%Y-%m-%d").to_string();
        let seed: u64 = date
            .replace('-', "")
            .parse()
            .map_err(|_| ParseError::DateKey(date_key.to_string()))?;

        let board = build_board(seed);
        let slot = (seed % 4) as usize;
        let target_score = BASE_TARGET + slot as u32 * TARGET_STEP;
        let theme_name = THEMES[slot].to_string();
        let description = format!("Score {target_score}+ in {theme_name} mode");

        Ok(Self {
            date,
            seed,
            board,
            target_score,
            theme_name,
            description,
        })
    }

    pub fn rules(&self) -> ModeRules {
        ModeRules {
            target_score: Some(self.target_score),
            ..GameMode::Daily.rules()
        }
    }
}

fn build_board(seed: u64) -> Grid {
    let mut grid = Grid::new(DAILY_SIZE);
    let mut rng = Rng::new(seed);
    for _ in 0..DAILY_TILES {
        let empty = grid.empty_cells();
        let (row, col) = empty[rng.below(empty.len())];
        let value = if rng.next_f64() > 0.75 { 4 } else { 2 };
        grid.set(row, col, value);
    }
    grid
}

/// Dates whose challenge has been beaten, in completion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyProgress {
    #[serde(default)]
    completed: Vec<String>,
}

impl DailyProgress {
    pub fn load(store: &dyn KeyValueStore) -> Self {
        load_json(store, DAILY_KEY)
    }

    pub fn save(&self, store: &mut dyn KeyValueStore) -> Result<(), StoreError> {
        save_json(store, DAILY_KEY, self)
    }

    pub fn is_completed(&self, date_key: &str) -> bool {
        self.completed.iter().any(|d| d == date_key)
    }

    /// Returns how many distinct days are completed.
    pub fn mark_completed(&mut self, date_key: &str) -> usize {
        if !self.is_completed(date_key) {
            self.completed.push(date_key.to_string());
        }
        self.completed.len()
    }

    pub fn completed_count(&self) -> usize {
        self.completed.len()
    }

    /// Most recent first.
    pub fn history(&self, limit: usize) -> Vec<&str> {
        self.completed
            .iter()
            .rev()
            .take(limit)
            .map(String::as_str)
            .collect()
    }
}
