use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::store::{KeyValueStore, load_json, save_json};

pub const ACHIEVEMENTS_KEY: &str = "achievements";

/// Numbers an achievement can be unlocked by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AchievementStats {
    pub highest_tile: u32,
    pub score: u32,
    pub daily_completed: usize,
    pub win_streak: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct Achievement {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    check: fn(&AchievementStats) -> bool,
}

impl Achievement {
    pub fn is_met(&self, stats: &AchievementStats) -> bool {
        (self.check)(stats)
    }
}

pub static ACHIEVEMENTS: [Achievement; 6] = [
    Achievement {
        id: "first_merge",
        title: "First Pulse",
        description: "Merge any two tiles.",
        check: |s| s.highest_tile >= 4,
    },
    Achievement {
        id: "tile_512",
        title: "Crystal Bloom",
        description: "Create a 512 tile.",
        check: |s| s.highest_tile >= 512,
    },
    Achievement {
        id: "tile_2048",
        title: "Aurora Sage",
        description: "Reach the legendary 2048 tile.",
        check: |s| s.highest_tile >= 2048,
    },
    Achievement {
        id: "score_8000",
        title: "Flux Maestro",
        description: "Score 8,000 points in a single game.",
        check: |s| s.score >= 8000,
    },
    Achievement {
        id: "daily_5",
        title: "Chrono Voyager",
        description: "Complete 5 daily challenges.",
        check: |s| s.daily_completed >= 5,
    },
    Achievement {
        id: "streak_3",
        title: "Streak Weaver",
        description: "Win 3 games in a row.",
        check: |s| s.win_streak >= 3,
    },
];

pub fn find(id: &str) -> Option<&'static Achievement> {
    ACHIEVEMENTS.iter().find(|a| a.id == id)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AchievementProgress {
    #[serde(default)]
    unlocked: BTreeSet<String>,
    #[serde(default)]
    win_streak: u32,
}

impl AchievementProgress {
    pub fn load(store: &dyn KeyValueStore) -> Self {
        load_json(store, ACHIEVEMENTS_KEY)
    }

    pub fn save(&self, store: &mut dyn KeyValueStore) -> Result<(), StoreError> {
        save_json(store, ACHIEVEMENTS_KEY, self)
    }

    pub fn is_unlocked(&self, id: &str) -> bool {
        self.unlocked.contains(id)
    }

    pub fn unlocked_count(&self) -> usize {
        self.unlocked.len()
    }

    pub fn win_streak(&self) -> u32 {
        self.win_streak
    }

    pub fn record_win(&mut self) -> u32 {
        self.win_streak += 1;
        self.win_streak
    }

    pub fn record_loss(&mut self) {
        self.win_streak = 0;
    }

    /// Unlock whatever `stats` now satisfies; returns only the new ones.
    pub fn evaluate(&mut self, stats: &AchievementStats) -> Vec<&'static Achievement> {
        let mut fresh = Vec::new();
        for achievement in ACHIEVEMENTS.iter() {
            if !self.unlocked.contains(achievement.id) && achievement.is_met(stats) {
                self.unlocked.insert(achievement.id.to_string());
                fresh.push(achievement);
            }
        }
        fresh
    }
}
