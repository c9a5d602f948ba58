use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};
use twofold_engine::TimeMachine;

use crate::achievements::{AchievementProgress, AchievementStats};
use crate::clock::Clock;
use crate::daily::{DailyChallenge, DailyProgress};
use crate::grid::{DEFAULT_WIN_TILE, Direction, Grid, GridEngine, MoveResult, Terminal};
use crate::leaderboard::{BestScores, Leaderboard};
use crate::mode::{GameMode, ModeRules};
use crate::replay::{ReplayAction, ReplayPayload, ReplayRecorder};
use crate::round_timer::RoundTimer;
use crate::settings::{MAX_BOARD_SIZE, MIN_BOARD_SIZE, Settings};
use crate::spawner::{DEFAULT_FOUR_CHANCE, Spawn, TileSpawner};
use crate::store::KeyValueStore;

pub const INITIAL_TILES: usize = 2;
pub const POWER_UP_CHARGES: u32 = 1;
/// Checkpoints kept for undo.
pub const UNDO_DEPTH: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Active,
    Won,
    Over,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverReason {
    NoMoves,
    OutOfMoves,
    OutOfTime,
}

impl fmt::Display for OverReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OverReason::NoMoves => "Game over!",
            OverReason::OutOfMoves => "No moves left!",
            OverReason::OutOfTime => "Time's up!",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerUp {
    Undo,
    Cleanse,
    Double,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Move(Direction),
    Restart,
    SelectMode(GameMode),
    Tick,
    UsePowerUp(PowerUp),
    KeepPlaying,
}

impl Command {
    /// Parse one line of player input. Anything unrecognised is `None`.
    pub fn parse(input: &str) -> Option<Command> {
        let input = input.trim();
        if let Ok(direction) = input.parse::<Direction>() {
            return Some(Command::Move(direction));
        }
        let mut words = input.split_whitespace();
        let head = words.next()?.to_ascii_lowercase();
        match head.as_str() {
            "r" | "restart" | "new" => Some(Command::Restart),
            "m" | "mode" => words.next()?.parse().ok().map(Command::SelectMode),
            "u" | "undo" => Some(Command::UsePowerUp(PowerUp::Undo)),
            "c" | "cleanse" => Some(Command::UsePowerUp(PowerUp::Cleanse)),
            "x" | "double" => Some(Command::UsePowerUp(PowerUp::Double)),
            "k" | "keep" => Some(Command::KeepPlaying),
            _ => None,
        }
    }
}

/// What a command changed, in order. Empty means the command was ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Started { mode: GameMode, size: usize },
    Moved(MoveResult),
    Spawned(Spawn),
    NewBest(u32),
    Ticked { remaining: Duration },
    PowerUpUsed(PowerUp),
    AchievementUnlocked(&'static str),
    /// 0-based leaderboard position the finished score took.
    Ranked(usize),
    Won,
    Over(OverReason),
    Continued,
}

/// Snapshot handed to whoever draws the game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub mode: GameMode,
    pub phase: Phase,
    pub score: u32,
    pub best: u32,
    pub moves_remaining: Option<u32>,
    #[serde(with = "crate::serde_duration::option")]
    pub time_remaining: Option<Duration>,
    pub won: bool,
    pub over: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionConfig {
    /// Overrides the board size from settings.
    pub size: Option<usize>,
    pub win_tile: u32,
    /// Spawner seed; taken from the clock when unset.
    pub seed: Option<u64>,
    pub four_chance: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            size: None,
            win_tile: DEFAULT_WIN_TILE,
            seed: None,
            four_chance: DEFAULT_FOUR_CHANCE,
        }
    }
}

/// Persistence and time, injected so tests can swap in fakes.
pub struct Services {
    pub store: Box<dyn KeyValueStore>,
    pub clock: Box<dyn Clock>,
}

impl fmt::Debug for Services {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Services").finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Checkpoint {
    grid: Grid,
    score: u32,
    moves_remaining: Option<u32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Charges {
    undo: u32,
    cleanse: u32,
    double: u32,
}

impl Charges {
    fn from_settings(settings: &Settings) -> Self {
        let charge = |enabled: bool| if enabled { POWER_UP_CHARGES } else { 0 };
        Self {
            undo: charge(settings.powerups.undo),
            cleanse: charge(settings.powerups.cleanse),
            double: charge(settings.powerups.double),
        }
    }

    fn slot(&mut self, power_up: PowerUp) -> &mut u32 {
        match power_up {
            PowerUp::Undo => &mut self.undo,
            PowerUp::Cleanse => &mut self.cleanse,
            PowerUp::Double => &mut self.double,
        }
    }
}

/// Runs one game at a time: mode rules, counters, countdown, terminal
/// transitions, and the bookkeeping that follows them.
///
/// Every command goes through [`SessionController::handle`], so moves and
/// countdown ticks are applied one at a time in arrival order.
#[derive(Debug)]
pub struct SessionController {
    config: SessionConfig,
    services: Services,
    settings: Settings,
    mode: GameMode,
    rules: ModeRules,
    daily: Option<DailyChallenge>,
    engine: GridEngine,
    spawner: TileSpawner,
    phase: Phase,
    best: u32,
    best_scores: BestScores,
    achievements: AchievementProgress,
    daily_completed: usize,
    moves_remaining: Option<u32>,
    timer: Option<RoundTimer>,
    history: TimeMachine<Checkpoint>,
    charges: Charges,
    replay: ReplayRecorder,
    target_reached: bool,
    continued: bool,
    leaderboard_logged: bool,
}

impl SessionController {
    /// Build a controller and start a session in `mode`.
    pub fn new(mode: GameMode, config: SessionConfig, services: Services) -> Self {
        let seed = config
            .seed
            .unwrap_or_else(|| services.clock.now_millis() as u64);
        let settings = Settings::load(services.store.as_ref());
        let engine = GridEngine::new(settings.board_size, None);
        let checkpoint = Checkpoint {
            grid: engine.grid().clone(),
            score: 0,
            moves_remaining: None,
        };

        let mut controller = Self {
            config,
            spawner: TileSpawner::with_four_chance(seed, config.four_chance),
            services,
            settings,
            mode,
            rules: mode.rules(),
            daily: None,
            engine,
            phase: Phase::Active,
            best: 0,
            best_scores: BestScores::default(),
            achievements: AchievementProgress::default(),
            daily_completed: 0,
            moves_remaining: None,
            timer: None,
            history: TimeMachine::with_limit(checkpoint, UNDO_DEPTH),
            charges: Charges::default(),
            replay: ReplayRecorder::new(),
            target_reached: false,
            continued: false,
            leaderboard_logged: false,
        };
        controller.start(mode);
        controller
    }

    pub fn handle(&mut self, command: Command) -> Vec<SessionEvent> {
        match command {
            Command::Move(direction) => self.apply_move(direction),
            Command::Restart => {
                self.abandon();
                self.start(self.mode)
            }
            Command::SelectMode(mode) => {
                self.abandon();
                self.start(mode)
            }
            Command::Tick => self.tick(),
            Command::UsePowerUp(power_up) => self.use_power_up(power_up),
            Command::KeepPlaying => self.keep_playing(),
        }
    }

    /// Parse and handle one line of player input; unknown input is ignored.
    pub fn handle_input(&mut self, input: &str) -> Vec<SessionEvent> {
        match Command::parse(input) {
            Some(command) => self.handle(command),
            None => {
                log::debug!("ignoring input [{input}]");
                Vec::new()
            }
        }
    }

    pub fn state(&self) -> SessionState {
        SessionState {
            mode: self.mode,
            phase: self.phase,
            score: self.engine.score(),
            best: self.best,
            moves_remaining: self.moves_remaining,
            time_remaining: self.timer.map(|t| t.remaining()),
            won: self.phase == Phase::Won,
            over: self.phase == Phase::Over,
        }
    }

    pub fn grid(&self) -> &Grid {
        self.engine.grid()
    }

    pub fn score(&self) -> u32 {
        self.engine.score()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn mode(&self) -> GameMode {
        self.mode
    }

    pub fn rules(&self) -> ModeRules {
        self.rules
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn daily(&self) -> Option<&DailyChallenge> {
        self.daily.as_ref()
    }

    pub fn charges(&self, power_up: PowerUp) -> u32 {
        let mut charges = self.charges;
        *charges.slot(power_up)
    }

    pub fn has_timer(&self) -> bool {
        self.timer.is_some_and(|t| t.is_running())
    }

    pub fn store(&self) -> &dyn KeyValueStore {
        self.services.store.as_ref()
    }

    pub fn replay_payload(&self) -> ReplayPayload {
        self.replay
            .payload(&self.settings, self.mode, self.services.clock.now())
    }

    /// Resume a won session with the win check switched off.
    pub fn keep_playing(&mut self) -> Vec<SessionEvent> {
        if self.phase != Phase::Won {
            return Vec::new();
        }
        self.engine.disable_win();
        self.target_reached = true;
        self.continued = true;
        self.phase = Phase::Active;
        if let Some(timer) = self.timer.as_mut() {
            timer.resume();
        }
        log::info!("continuing {} session after win", self.mode);

        let mut events = vec![SessionEvent::Continued];
        if self.engine.is_game_over() {
            self.finish(Terminal::Over, Some(OverReason::NoMoves), &mut events);
        } else if self.moves_remaining == Some(0) {
            self.finish(Terminal::Over, Some(OverReason::OutOfMoves), &mut events);
        } else if self.timer.is_some_and(|t| t.is_up()) {
            self.finish(Terminal::Over, Some(OverReason::OutOfTime), &mut events);
        }
        events
    }

    /// Restart the current mode from a prepared board instead of random tiles.
    pub fn start_from(&mut self, board: Grid) -> Vec<SessionEvent> {
        self.abandon();
        self.begin(self.mode, Some(board))
    }

    fn start(&mut self, mode: GameMode) -> Vec<SessionEvent> {
        self.begin(mode, None)
    }

    fn begin(&mut self, mode: GameMode, board: Option<Grid>) -> Vec<SessionEvent> {
        self.settings = Settings::load(self.services.store.as_ref());
        self.mode = mode;
        self.daily = None;
        self.rules = mode.rules();

        if mode == GameMode::Daily {
            let today = self.services.clock.today_key();
            match DailyChallenge::for_date(&today) {
                Ok(challenge) => {
                    self.rules = challenge.rules();
                    self.daily = Some(challenge);
                }
                Err(err) => log::error!("daily challenge unavailable, playing plain rules: {err}"),
            }
        }

        let win_tile = self.rules.win_enabled.then_some(self.config.win_tile);
        self.engine = match (board, &self.daily) {
            (Some(board), _) => GridEngine::from_grid(board, win_tile),
            (None, Some(challenge)) => GridEngine::from_grid(challenge.board.clone(), win_tile),
            (None, None) => {
                let size = self.config.size.unwrap_or(self.settings.board_size);
                let mut engine = GridEngine::new(size.clamp(MIN_BOARD_SIZE, MAX_BOARD_SIZE), win_tile);
                for _ in 0..INITIAL_TILES {
                    self.spawner.spawn(&mut engine);
                }
                engine
            }
        };

        let store = self.services.store.as_ref();
        self.best_scores = BestScores::load(store);
        self.best = self.best_scores.best(self.engine.size());
        self.achievements = AchievementProgress::load(store);
        self.daily_completed = DailyProgress::load(store).completed_count();

        self.phase = Phase::Active;
        self.moves_remaining = self.rules.max_moves;
        self.timer = self.rules.time_limit.map(RoundTimer::new);
        self.charges = Charges::from_settings(&self.settings);
        self.target_reached = false;
        self.continued = false;
        self.leaderboard_logged = false;
        self.history.reset(self.checkpoint());
        self.replay
            .reset(self.services.clock.now_millis(), self.engine.grid(), 0);

        let size = self.engine.size();
        log::info!("started {mode} session on a {size}x{size} board");
        vec![SessionEvent::Started { mode, size }]
    }

    fn apply_move(&mut self, direction: Direction) -> Vec<SessionEvent> {
        if self.phase != Phase::Active {
            return Vec::new();
        }
        let before = self.engine.grid().clone();
        let result = self.engine.apply_move(direction);
        if !result.moved {
            return Vec::new();
        }
        log::debug!(
            "{direction}: +{} (score {})",
            result.score_gain,
            self.engine.score()
        );

        let mut events = vec![SessionEvent::Moved(result)];
        debug_assert!(self.engine.grid().has_empty(), "moved board must have room");
        if let Some(spawn) = self.spawner.spawn(&mut self.engine) {
            events.push(SessionEvent::Spawned(spawn));
        }
        if let Some(left) = self.moves_remaining.as_mut() {
            *left = left.saturating_sub(1);
        }

        self.history.record(self.checkpoint());
        self.replay.capture(
            direction.into(),
            &before,
            self.engine.grid(),
            self.engine.score(),
            self.services.clock.now_millis(),
        );
        self.after_change(&mut events);
        events
    }

    fn tick(&mut self) -> Vec<SessionEvent> {
        if self.phase != Phase::Active {
            return Vec::new();
        }
        let Some(timer) = self.timer.as_mut() else {
            return Vec::new();
        };
        let expired = timer.tick();
        let mut events = vec![SessionEvent::Ticked {
            remaining: timer.remaining(),
        }];
        if expired {
            self.finish(Terminal::Over, Some(OverReason::OutOfTime), &mut events);
        }
        events
    }

    fn use_power_up(&mut self, power_up: PowerUp) -> Vec<SessionEvent> {
        if self.phase != Phase::Active || *self.charges.slot(power_up) == 0 {
            return Vec::new();
        }
        let before = self.engine.grid().clone();
        let applied = match power_up {
            PowerUp::Undo => self.undo(),
            PowerUp::Cleanse => self.engine.grid_mut().clear_smallest() > 0,
            PowerUp::Double => self.engine.grid_mut().double_highest().is_some(),
        };
        if !applied {
            return Vec::new();
        }
        *self.charges.slot(power_up) -= 1;
        if power_up != PowerUp::Undo {
            self.history.record(self.checkpoint());
        }

        let action = match power_up {
            PowerUp::Undo => ReplayAction::Undo,
            PowerUp::Cleanse => ReplayAction::Cleanse,
            PowerUp::Double => ReplayAction::Double,
        };
        self.replay.capture(
            action,
            &before,
            self.engine.grid(),
            self.engine.score(),
            self.services.clock.now_millis(),
        );
        log::info!("used {power_up:?} power-up");

        let mut events = vec![SessionEvent::PowerUpUsed(power_up)];
        if power_up == PowerUp::Double {
            self.after_change(&mut events);
        }
        events
    }

    fn undo(&mut self) -> bool {
        if !self.history.can_rewind() {
            return false;
        }
        self.history.rewind(1);
        let checkpoint = self.history.state().clone();
        self.engine.restore(checkpoint.grid, checkpoint.score);
        self.moves_remaining = checkpoint.moves_remaining;
        true
    }

    /// Score, achievements, then terminal checks; win takes precedence.
    fn after_change(&mut self, events: &mut Vec<SessionEvent>) {
        let score = self.engine.score();
        if score > self.best {
            self.best = score;
            self.best_scores.record(self.engine.size(), score);
            if let Err(err) = self.best_scores.save(self.services.store.as_mut()) {
                log::error!("could not save best score: {err}");
            }
            events.push(SessionEvent::NewBest(score));
        }
        self.unlock_achievements(events);

        let terminal = self.engine.check_terminal();
        let target_hit = !self.target_reached
            && self.rules.target_score.is_some_and(|target| score >= target);
        if terminal == Some(Terminal::Won) || target_hit {
            self.target_reached = true;
            self.finish(Terminal::Won, None, events);
        } else if terminal == Some(Terminal::Over) {
            self.finish(Terminal::Over, Some(OverReason::NoMoves), events);
        } else if self.moves_remaining == Some(0) {
            self.finish(Terminal::Over, Some(OverReason::OutOfMoves), events);
        }
    }

    fn finish(
        &mut self,
        terminal: Terminal,
        reason: Option<OverReason>,
        events: &mut Vec<SessionEvent>,
    ) {
        if let Some(timer) = self.timer.as_mut() {
            timer.stop();
        }
        if let Some(rank) = self.log_leaderboard() {
            events.push(SessionEvent::Ranked(rank));
        }

        let event = match terminal {
            Terminal::Won => {
                self.phase = Phase::Won;
                self.achievements.record_win();
                if let Some(challenge) = &self.daily {
                    let mut progress = DailyProgress::load(self.services.store.as_ref());
                    self.daily_completed = progress.mark_completed(&challenge.date);
                    if let Err(err) = progress.save(self.services.store.as_mut()) {
                        log::error!("could not save daily progress: {err}");
                    }
                }
                log::info!("{} session won with {}", self.mode, self.engine.score());
                SessionEvent::Won
            }
            Terminal::Over => {
                self.phase = Phase::Over;
                if !self.continued {
                    self.achievements.record_loss();
                }
                let reason = reason.unwrap_or(OverReason::NoMoves);
                log::info!(
                    "{} session over ({reason}) with {}",
                    self.mode,
                    self.engine.score()
                );
                SessionEvent::Over(reason)
            }
        };
        self.unlock_achievements(events);
        events.push(event);
    }

    fn unlock_achievements(&mut self, events: &mut Vec<SessionEvent>) {
        let stats = AchievementStats {
            highest_tile: self.engine.grid().highest_tile(),
            score: self.engine.score(),
            daily_completed: self.daily_completed,
            win_streak: self.achievements.win_streak(),
        };
        let fresh = self.achievements.evaluate(&stats);
        for achievement in &fresh {
            log::info!("achievement unlocked: {}", achievement.title);
            events.push(SessionEvent::AchievementUnlocked(achievement.id));
        }
        // Streak changes need saving even when nothing new unlocked.
        if let Err(err) = self.achievements.save(self.services.store.as_mut()) {
            log::error!("could not save achievements: {err}");
        }
    }

    /// Log a scored, unfinished session before it is thrown away.
    fn abandon(&mut self) {
        if self.phase == Phase::Active && self.engine.score() > 0 {
            self.log_leaderboard();
        }
    }

    /// Record the score once per session; returns the rank it took, if any.
    fn log_leaderboard(&mut self) -> Option<usize> {
        if self.leaderboard_logged {
            return None;
        }
        self.leaderboard_logged = true;
        let score = self.engine.score();
        let mut board = Leaderboard::load(self.services.store.as_ref());
        let rank = board.qualifying_rank(self.mode, score)?;
        board.add_entry(self.mode, score, self.services.clock.now_millis());
        if let Err(err) = board.save(self.services.store.as_mut()) {
            log::error!("could not save leaderboard: {err}");
        }
        log::debug!("{} leaderboard rank {} for {score}", self.mode, rank + 1);
        Some(rank)
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            grid: self.engine.grid().clone(),
            score: self.engine.score(),
            moves_remaining: self.moves_remaining,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use test_log::test;

    use super::*;
    use crate::clock::ManualClock;
    use crate::store::MemoryStore;

    fn controller(mode: GameMode) -> (SessionController, MemoryStore) {
        let store = MemoryStore::new();
        let clock = ManualClock::at(Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap());
        let services = Services {
            store: Box::new(store.clone()),
            clock: Box::new(clock),
        };
        let config = SessionConfig {
            seed: Some(11),
            ..SessionConfig::default()
        };
        (SessionController::new(mode, config, services), store)
    }

    #[test]
    fn command_parsing() {
        assert_eq!(Command::parse("a"), Some(Command::Move(Direction::Left)));
        assert_eq!(Command::parse(" Up "), Some(Command::Move(Direction::Up)));
        assert_eq!(Command::parse("r"), Some(Command::Restart));
        assert_eq!(
            Command::parse("m timed"),
            Some(Command::SelectMode(GameMode::Timed))
        );
        assert_eq!(Command::parse("m nowhere"), None);
        assert_eq!(
            Command::parse("undo"),
            Some(Command::UsePowerUp(PowerUp::Undo))
        );
        assert_eq!(Command::parse("k"), Some(Command::KeepPlaying));
        assert_eq!(Command::parse("jump"), None);
        assert_eq!(Command::parse(""), None);
    }

    #[test]
    fn new_session_has_two_tiles() {
        let (session, _) = controller(GameMode::Classic);
        let tiles = session
            .grid()
            .rows()
            .iter()
            .flatten()
            .filter(|&&v| v != 0)
            .count();
        assert_eq!(tiles, INITIAL_TILES);
        assert_eq!(session.phase(), Phase::Active);
        assert_eq!(session.state().moves_remaining, None);
        assert_eq!(session.state().time_remaining, None);
    }

    #[test]
    fn limited_and_timed_modes_set_counters() {
        let (limited, _) = controller(GameMode::Limited);
        assert_eq!(limited.state().moves_remaining, Some(100));
        let (timed, _) = controller(GameMode::Timed);
        assert_eq!(timed.state().time_remaining, Some(Duration::from_secs(300)));
        assert!(timed.has_timer());
    }

    #[test]
    fn tick_is_ignored_without_a_timer() {
        let (mut session, _) = controller(GameMode::Classic);
        assert!(session.handle(Command::Tick).is_empty());
    }

    #[test]
    fn unknown_input_changes_nothing() {
        let (mut session, _) = controller(GameMode::Classic);
        let before = session.state();
        let grid = session.grid().clone();
        assert!(session.handle_input("sideways").is_empty());
        assert_eq!(session.state(), before);
        assert_eq!(session.grid(), &grid);
    }

    fn board(rows: &[&[u32]]) -> Grid {
        Grid::from_rows(rows.iter().map(|r| r.to_vec()).collect()).expect("valid grid")
    }

    #[test]
    fn last_limited_move_ends_the_session() {
        let (mut session, store) = controller(GameMode::Limited);
        session.start_from(board(&[&[2, 2, 0], &[0, 0, 0], &[0, 0, 0]]));
        session.moves_remaining = Some(1);

        let events = session.handle(Command::Move(Direction::Left));
        assert_eq!(events.last(), Some(&SessionEvent::Over(OverReason::OutOfMoves)));
        assert_eq!(session.state().moves_remaining, Some(0));
        assert!(session.state().over);
        assert!(session.handle(Command::Move(Direction::Right)).is_empty());

        let logged = Leaderboard::load(&store);
        assert_eq!(logged.entries(GameMode::Limited)[0].score, 4);
    }

    #[test]
    fn daily_target_score_wins_and_marks_the_day() {
        let (mut session, store) = controller(GameMode::Daily);
        assert_eq!(session.daily().map(|d| d.target_score), Some(1152));
        session.start_from(board(&[
            &[512, 512, 0, 0],
            &[0, 0, 0, 0],
            &[0, 0, 0, 0],
            &[0, 0, 0, 0],
        ]));
        let opening = session.grid().clone();
        session.engine.restore(opening, 1000);

        let events = session.handle(Command::Move(Direction::Left));
        assert!(events.contains(&SessionEvent::Won));
        assert_eq!(session.phase(), Phase::Won);
        assert!(DailyProgress::load(&store).is_completed("2024-06-01"));
    }

    #[test]
    fn cleanse_removes_smallest_tiles_once() {
        let (mut session, _) = controller(GameMode::Classic);
        session.start_from(board(&[&[2, 4, 0], &[2, 8, 0], &[0, 0, 0]]));

        let events = session.handle(Command::UsePowerUp(PowerUp::Cleanse));
        assert_eq!(events, vec![SessionEvent::PowerUpUsed(PowerUp::Cleanse)]);
        assert_eq!(
            session.grid(),
            &board(&[&[0, 4, 0], &[0, 8, 0], &[0, 0, 0]])
        );
        assert_eq!(session.charges(PowerUp::Cleanse), 0);
        assert!(session.handle(Command::UsePowerUp(PowerUp::Cleanse)).is_empty());
    }

    #[test]
    fn failed_power_up_keeps_its_charge() {
        let (mut session, _) = controller(GameMode::Classic);
        session.start_from(board(&[&[2, 0, 0], &[2, 0, 0], &[0, 0, 0]]));
        assert!(session.handle(Command::UsePowerUp(PowerUp::Cleanse)).is_empty());
        assert!(session.handle(Command::UsePowerUp(PowerUp::Undo)).is_empty());
        assert_eq!(session.charges(PowerUp::Cleanse), 1);
        assert_eq!(session.charges(PowerUp::Undo), 1);
    }

    #[test]
    fn double_can_win_the_game() {
        let (mut session, _) = controller(GameMode::Classic);
        session.start_from(board(&[&[1024, 2, 0], &[0, 0, 0], &[0, 0, 0]]));
        // Starting a session hands out charges from settings again.
        session.charges.double = 1;

        let events = session.handle(Command::UsePowerUp(PowerUp::Double));
        assert_eq!(events.first(), Some(&SessionEvent::PowerUpUsed(PowerUp::Double)));
        assert!(events.contains(&SessionEvent::Won));
        assert_eq!(session.grid().get(0, 0), 2048);
    }

    #[test]
    fn keep_playing_resumes_a_won_session() {
        let (mut session, _) = controller(GameMode::Classic);
        session.start_from(board(&[&[1024, 1024, 4], &[4, 8, 2], &[2, 4, 8]]));
        let events = session.handle(Command::Move(Direction::Left));
        assert!(events.contains(&SessionEvent::Won));

        let events = session.keep_playing();
        assert_eq!(events.first(), Some(&SessionEvent::Continued));
        if session.engine.is_game_over() {
            assert_eq!(events.last(), Some(&SessionEvent::Over(OverReason::NoMoves)));
        } else {
            assert_eq!(session.phase(), Phase::Active);
        }
    }
}
