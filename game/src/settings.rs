use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::grid::DEFAULT_SIZE;
use crate::store::{KeyValueStore, load_json, save_json};

pub const SETTINGS_KEY: &str = "settings";
pub const MIN_BOARD_SIZE: usize = 3;
pub const MAX_BOARD_SIZE: usize = 8;
pub const DEFAULT_THEME: &str = "cold";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnimationSpeed {
    Slow,
    #[default]
    Normal,
    Fast,
}

impl AnimationSpeed {
    /// Tile slide duration in seconds.
    pub fn seconds(self) -> f32 {
        match self {
            AnimationSpeed::Slow => 0.48,
            AnimationSpeed::Normal => 0.32,
            AnimationSpeed::Fast => 0.18,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerUps {
    pub cleanse: bool,
    pub double: bool,
    pub undo: bool,
}

impl Default for PowerUps {
    fn default() -> Self {
        Self {
            cleanse: true,
            double: false,
            undo: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub animation_speed: AnimationSpeed,
    pub sound_effects: bool,
    pub grid_lines: bool,
    pub theme: String,
    pub board_size: usize,
    pub powerups: PowerUps,
    pub ambient_volume: f32,
    pub percussion_volume: f32,
    pub fx_volume: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            animation_speed: AnimationSpeed::Normal,
            sound_effects: true,
            grid_lines: true,
            theme: DEFAULT_THEME.to_string(),
            board_size: DEFAULT_SIZE,
            powerups: PowerUps::default(),
            ambient_volume: 0.45,
            percussion_volume: 0.35,
            fx_volume: 0.4,
        }
    }
}

impl Settings {
    pub fn sanitized(mut self) -> Self {
        self.board_size = self.board_size.clamp(MIN_BOARD_SIZE, MAX_BOARD_SIZE);
        if self.theme.trim().is_empty() {
            self.theme = DEFAULT_THEME.to_string();
        }
        self.ambient_volume = clamp_volume(self.ambient_volume);
        self.percussion_volume = clamp_volume(self.percussion_volume);
        self.fx_volume = clamp_volume(self.fx_volume);
        self
    }

    pub fn load(store: &dyn KeyValueStore) -> Self {
        load_json::<Settings>(store, SETTINGS_KEY).sanitized()
    }

    /// Sanitize, persist, and hand back what was actually stored.
    pub fn save(self, store: &mut dyn KeyValueStore) -> Result<Self, StoreError> {
        let settings = self.sanitized();
        save_json(store, SETTINGS_KEY, &settings)?;
        Ok(settings)
    }
}

fn clamp_volume(v: f32) -> f32 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn sanitized_clamps_expected_fields() {
        let settings = Settings {
            board_size: 40,
            theme: "  ".to_string(),
            ambient_volume: 3.0,
            percussion_volume: -2.0,
            fx_volume: f32::NAN,
            ..Settings::default()
        }
        .sanitized();

        assert_eq!(settings.board_size, MAX_BOARD_SIZE);
        assert_eq!(settings.theme, DEFAULT_THEME);
        assert_eq!(settings.ambient_volume, 1.0);
        assert_eq!(settings.percussion_volume, 0.0);
        assert_eq!(settings.fx_volume, 0.0);
    }

    #[test]
    fn serde_defaults_fill_missing_fields() {
        let parsed: Settings =
            serde_json::from_str(r#"{"theme":"neon","boardSize":5,"powerups":{"double":true}}"#)
                .expect("settings JSON should parse");
        assert_eq!(parsed.theme, "neon");
        assert_eq!(parsed.board_size, 5);
        assert_eq!(parsed.animation_speed, AnimationSpeed::Normal);
        assert_eq!(
            parsed.powerups,
            PowerUps {
                cleanse: true,
                double: true,
                undo: true
            }
        );
        assert_eq!(parsed.fx_volume, 0.4);
    }

    #[test]
    fn corrupt_settings_load_as_defaults() {
        let mut store = MemoryStore::new();
        store.set(SETTINGS_KEY, r#"{"boardSize":"huge"}"#).expect("set");
        assert_eq!(Settings::load(&store), Settings::default());
    }

    #[test]
    fn save_persists_sanitized_copy() {
        let mut store = MemoryStore::new();
        let saved = Settings {
            board_size: 1,
            animation_speed: AnimationSpeed::Fast,
            ..Settings::default()
        }
        .save(&mut store)
        .expect("save settings");

        assert_eq!(saved.board_size, MIN_BOARD_SIZE);
        assert_eq!(Settings::load(&store), saved);
        let raw = store.get(SETTINGS_KEY).expect("stored");
        assert!(raw.contains("\"animationSpeed\": \"fast\""));
    }

    #[test]
    fn animation_speeds_match_durations() {
        assert_eq!(AnimationSpeed::Slow.seconds(), 0.48);
        assert_eq!(AnimationSpeed::Normal.seconds(), 0.32);
        assert_eq!(AnimationSpeed::Fast.seconds(), 0.18);
    }
}
