use std::{fmt, str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};

use crate::error::ParseError;

pub const TIMED_LIMIT: Duration = Duration::from_secs(300);
pub const LIMITED_MOVES: u32 = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    #[default]
    Classic,
    Timed,
    Limited,
    Endless,
    Daily,
}

impl GameMode {
    pub const ALL: [GameMode; 5] = [
        GameMode::Classic,
        GameMode::Timed,
        GameMode::Limited,
        GameMode::Endless,
        GameMode::Daily,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            GameMode::Classic => "classic",
            GameMode::Timed => "timed",
            GameMode::Limited => "limited",
            GameMode::Endless => "endless",
            GameMode::Daily => "daily",
        }
    }

    /// Daily rules also carry the day's target score; see `DailyChallenge::rules`.
    pub fn rules(self) -> ModeRules {
        match self {
            GameMode::Classic | GameMode::Daily => ModeRules::default(),
            GameMode::Timed => ModeRules {
                time_limit: Some(TIMED_LIMIT),
                ..ModeRules::default()
            },
            GameMode::Limited => ModeRules {
                max_moves: Some(LIMITED_MOVES),
                ..ModeRules::default()
            },
            GameMode::Endless => ModeRules {
                win_enabled: false,
                ..ModeRules::default()
            },
        }
    }
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GameMode {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GameMode::ALL
            .into_iter()
            .find(|mode| mode.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseError::Mode(s.to_string()))
    }
}

/// What a mode changes about a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeRules {
    pub max_moves: Option<u32>,
    #[serde(default, with = "crate::serde_duration::option")]
    pub time_limit: Option<Duration>,
    pub win_enabled: bool,
    pub target_score: Option<u32>,
}

impl Default for ModeRules {
    fn default() -> Self {
        Self {
            max_moves: None,
            time_limit: None,
            win_enabled: true,
            target_score: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rules_per_mode() {
        assert_eq!(GameMode::Classic.rules(), ModeRules::default());
        assert_eq!(GameMode::Timed.rules().time_limit, Some(Duration::from_secs(300)));
        assert_eq!(GameMode::Limited.rules().max_moves, Some(100));
        assert!(!GameMode::Endless.rules().win_enabled);
        assert!(GameMode::Daily.rules().win_enabled);
    }

    #[test]
    fn parse_and_display_agree() {
        for mode in GameMode::ALL {
            assert_eq!(mode.to_string().parse::<GameMode>(), Ok(mode));
        }
        assert_eq!(" Timed ".parse::<GameMode>(), Ok(GameMode::Timed));
        assert_eq!(
            "arcade".parse::<GameMode>(),
            Err(ParseError::Mode("arcade".to_string()))
        );
    }

    #[test]
    fn rules_serialize_limit_as_millis() {
        let json = serde_json::to_value(GameMode::Timed.rules()).expect("serialize rules");
        assert_eq!(json["time_limit"], serde_json::json!(300_000));
        let back: ModeRules = serde_json::from_value(json).expect("deserialize rules");
        assert_eq!(back, GameMode::Timed.rules());
    }
}
