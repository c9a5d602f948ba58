use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::mode::GameMode;
use crate::store::{KeyValueStore, load_json, save_json};

pub const LEADERBOARD_KEY: &str = "leaderboard";
pub const BEST_KEY: &str = "best";
pub const MAX_ENTRIES: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub score: u32,
    /// Unix milliseconds.
    pub timestamp: i64,
}

/// Top scores per mode, best first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Leaderboard {
    modes: BTreeMap<GameMode, Vec<LeaderboardEntry>>,
}

impl Leaderboard {
    pub fn load(store: &dyn KeyValueStore) -> Self {
        load_json(store, LEADERBOARD_KEY)
    }

    pub fn save(&self, store: &mut dyn KeyValueStore) -> Result<(), StoreError> {
        save_json(store, LEADERBOARD_KEY, self)
    }

    pub fn entries(&self, mode: GameMode) -> &[LeaderboardEntry] {
        self.modes.get(&mode).map(Vec::as_slice).unwrap_or_default()
    }

    /// Insert a score; zero scores are ignored. Returns the mode's list.
    pub fn add_entry(&mut self, mode: GameMode, score: u32, timestamp: i64) -> &[LeaderboardEntry] {
        if score == 0 {
            return self.entries(mode);
        }
        let list = self.modes.entry(mode).or_default();
        list.push(LeaderboardEntry { score, timestamp });
        // Stable sort: on ties the earlier entry keeps its place.
        list.sort_by(|a, b| b.score.cmp(&a.score));
        list.truncate(MAX_ENTRIES);
        list
    }

    /// Rank (0-based) of a score that would make the list, if any.
    pub fn qualifying_rank(&self, mode: GameMode, score: u32) -> Option<usize> {
        if score == 0 {
            return None;
        }
        let list = self.entries(mode);
        let rank = list.iter().position(|e| score > e.score).unwrap_or(list.len());
        (rank < MAX_ENTRIES).then_some(rank)
    }
}

/// Best score per board size.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BestScores {
    by_size: BTreeMap<usize, u32>,
}

impl BestScores {
    pub fn load(store: &dyn KeyValueStore) -> Self {
        load_json(store, BEST_KEY)
    }

    pub fn save(&self, store: &mut dyn KeyValueStore) -> Result<(), StoreError> {
        save_json(store, BEST_KEY, self)
    }

    pub fn best(&self, size: usize) -> u32 {
        self.by_size.get(&size).copied().unwrap_or(0)
    }

    /// Returns true when `score` beat the stored best.
    pub fn record(&mut self, size: usize, score: u32) -> bool {
        let best = self.by_size.entry(size).or_insert(0);
        if score > *best {
            *best = score;
            true
        } else {
            false
        }
    }
}
