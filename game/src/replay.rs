use std::{fs, io, path::Path, time::Duration};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::grid::{Direction, Grid};
use crate::mode::GameMode;
use crate::settings::Settings;

pub const REPLAY_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplayAction {
    Start,
    Up,
    Down,
    Left,
    Right,
    Undo,
    Cleanse,
    Double,
}

impl From<Direction> for ReplayAction {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Up => ReplayAction::Up,
            Direction::Down => ReplayAction::Down,
            Direction::Left => ReplayAction::Left,
            Direction::Right => ReplayAction::Right,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayMove {
    pub direction: ReplayAction,
    pub before: Option<Grid>,
    pub after: Grid,
    pub score: u32,
    /// Milliseconds since the session started.
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayPayload {
    pub version: u32,
    pub generated_at: String,
    pub settings: Settings,
    pub mode: GameMode,
    #[serde(with = "crate::serde_duration")]
    pub duration_ms: Duration,
    pub moves: Vec<ReplayMove>,
}

impl ReplayPayload {
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn write_json_file(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let text = self
            .to_json_pretty()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(path, text)
    }

    /// `2048-replay-<mode>-<millis>.json`
    pub fn default_file_name(&self, now: DateTime<Utc>) -> String {
        format!("2048-replay-{}-{}.json", self.mode, now.timestamp_millis())
    }
}

/// Sequential log of one session's moves.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReplayRecorder {
    started_at: i64,
    moves: Vec<ReplayMove>,
}

impl ReplayRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget everything and log the opening board.
    pub fn reset(&mut self, now_millis: i64, grid: &Grid, score: u32) {
        self.started_at = now_millis;
        self.moves.clear();
        self.moves.push(ReplayMove {
            direction: ReplayAction::Start,
            before: None,
            after: grid.clone(),
            score,
            timestamp: 0,
        });
    }

    pub fn capture(
        &mut self,
        action: ReplayAction,
        before: &Grid,
        after: &Grid,
        score: u32,
        now_millis: i64,
    ) {
        self.moves.push(ReplayMove {
            direction: action,
            before: Some(before.clone()),
            after: after.clone(),
            score,
            timestamp: now_millis - self.started_at,
        });
    }

    pub fn moves(&self) -> &[ReplayMove] {
        &self.moves
    }

    pub fn payload(&self, settings: &Settings, mode: GameMode, now: DateTime<Utc>) -> ReplayPayload {
        let elapsed = (now.timestamp_millis() - self.started_at).max(0) as u64;
        ReplayPayload {
            version: REPLAY_VERSION,
            generated_at: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            settings: settings.clone(),
            mode,
            duration_ms: Duration::from_millis(elapsed),
            moves: self.moves.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn grid(rows: Vec<Vec<u32>>) -> Grid {
        Grid::from_rows(rows).expect("valid grid")
    }

    #[test]
    fn payload_uses_the_documented_field_names() {
        let start = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let mut recorder = ReplayRecorder::new();
        let before = grid(vec![vec![2, 2], vec![0, 0]]);
        let after = grid(vec![vec![4, 0], vec![0, 2]]);
        recorder.reset(start.timestamp_millis(), &before, 0);
        recorder.capture(
            Direction::Left.into(),
            &before,
            &after,
            4,
            start.timestamp_millis() + 1500,
        );

        let now = start + chrono::TimeDelta::seconds(3);
        let payload = recorder.payload(&Settings::default(), GameMode::Limited, now);
        let json = serde_json::to_value(&payload).expect("serialize payload");

        assert_eq!(json["version"], 1);
        assert_eq!(json["generatedAt"], "2024-06-01T12:00:03.000Z");
        assert_eq!(json["mode"], "limited");
        assert_eq!(json["durationMs"], 3000);
        assert_eq!(json["settings"]["boardSize"], 4);
        assert_eq!(json["moves"][0]["direction"], "start");
        assert!(json["moves"][0]["before"].is_null());
        assert_eq!(json["moves"][1]["direction"], "left");
        assert_eq!(json["moves"][1]["before"], serde_json::json!([[2, 2], [0, 0]]));
        assert_eq!(json["moves"][1]["after"], serde_json::json!([[4, 0], [0, 2]]));
        assert_eq!(json["moves"][1]["score"], 4);
        assert_eq!(json["moves"][1]["timestamp"], 1500);

        assert_eq!(
            payload.default_file_name(now),
            format!("2048-replay-limited-{}.json", now.timestamp_millis())
        );
    }

    #[test]
    fn reset_discards_previous_session() {
        let g = grid(vec![vec![0, 2], vec![0, 0]]);
        let mut recorder = ReplayRecorder::new();
        recorder.reset(0, &g, 0);
        recorder.capture(ReplayAction::Right, &g, &g, 0, 10);
        recorder.reset(100, &g, 0);
        assert_eq!(recorder.moves().len(), 1);
        assert_eq!(recorder.moves()[0].direction, ReplayAction::Start);
    }
}
