use serde::{Deserialize, Serialize};
use twofold_engine::GameLogic;

use crate::error::ParseError;
use crate::grid::{DEFAULT_SIZE, DEFAULT_WIN_TILE, Direction, GridEngine};
use crate::session::INITIAL_TILES;
use crate::settings::{MAX_BOARD_SIZE, MIN_BOARD_SIZE};
use crate::spawner::TileSpawner;

/// Board plus the spawner stream that feeds it, so a state alone is enough
/// to continue a game deterministically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardState {
    pub engine: GridEngine,
    pub spawner: TileSpawner,
    pub moves: u32,
}

impl BoardState {
    pub fn score(&self) -> u32 {
        self.engine.score()
    }

    pub fn is_over(&self) -> bool {
        self.engine.is_game_over()
    }
}

/// Classic rules without a controller around them: move, spawn, repeat.
/// Used for scripted runs and reproducible games.
#[derive(Debug, Clone)]
pub struct HeadlessGame {
    seed: u64,
    size: usize,
}

impl HeadlessGame {
    /// `size` is clamped to the playable board range.
    pub fn new(seed: u64, size: usize) -> Self {
        Self {
            seed,
            size: size.clamp(MIN_BOARD_SIZE, MAX_BOARD_SIZE),
        }
    }

    pub fn standard(seed: u64) -> Self {
        Self::new(seed, DEFAULT_SIZE)
    }
}

impl GameLogic for HeadlessGame {
    type State = BoardState;
    type Input = Direction;

    fn initial_state(&self) -> Self::State {
        let mut engine = GridEngine::new(self.size, Some(DEFAULT_WIN_TILE));
        let mut spawner = TileSpawner::new(self.seed);
        for _ in 0..INITIAL_TILES {
            spawner.spawn(&mut engine);
        }
        BoardState {
            engine,
            spawner,
            moves: 0,
        }
    }

    fn step(&self, state: &Self::State, input: Self::Input) -> Self::State {
        let mut next = state.clone();
        if next.engine.apply_move(input).moved {
            next.spawner.spawn(&mut next.engine);
            next.moves += 1;
        }
        next
    }
}

/// Parse a move script such as `"wasd"`, `"left,up"` or `"w a down"`.
///
/// Tokens are split on commas and whitespace; a token that is not a
/// direction word is read one key per character.
pub fn parse_moves(script: &str) -> Result<Vec<Direction>, ParseError> {
    let mut moves = Vec::new();
    for token in script.split(|c: char| c == ',' || c.is_whitespace()) {
        if token.is_empty() {
            continue;
        }
        if let Ok(direction) = token.parse() {
            moves.push(direction);
            continue;
        }
        for key in token.chars() {
            moves.push(key.to_string().parse()?);
        }
    }
    Ok(moves)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid;

    #[test]
    fn scripts_mix_words_and_keys() {
        assert_eq!(
            parse_moves("wasd").expect("valid script"),
            vec![
                Direction::Up,
                Direction::Left,
                Direction::Down,
                Direction::Right
            ]
        );
        assert_eq!(
            parse_moves("left, up  s").expect("valid script"),
            vec![Direction::Left, Direction::Up, Direction::Down]
        );
        assert_eq!(parse_moves("").expect("empty script"), vec![]);
        assert_eq!(
            parse_moves("wq"),
            Err(ParseError::Direction("q".to_string()))
        );
    }

    #[test]
    fn board_size_stays_in_playable_range() {
        let huge = HeadlessGame::new(1, 100_000).initial_state();
        assert_eq!(huge.engine.size(), MAX_BOARD_SIZE);
        let tiny = HeadlessGame::new(1, 0).initial_state();
        assert_eq!(tiny.engine.size(), MIN_BOARD_SIZE);
    }

    #[test]
    fn blocked_step_keeps_state() {
        let grid = Grid::from_rows(vec![vec![2, 4], vec![8, 0]]).expect("valid grid");
        let state = BoardState {
            engine: GridEngine::from_grid(grid, None),
            spawner: TileSpawner::new(5),
            moves: 3,
        };
        let game = HeadlessGame::new(5, 2);
        assert_eq!(game.step(&state, Direction::Left), state);

        let moved = game.step(&state, Direction::Right);
        assert_eq!(moved.moves, 4);
        assert_eq!(moved.engine.grid().empty_cells().len(), 0);
    }

    #[test]
    fn same_seed_same_game() {
        let game = HeadlessGame::standard(77);
        let script = parse_moves("wasdwasdaadd").expect("valid script");
        let run = |game: &HeadlessGame| {
            script
                .iter()
                .fold(game.initial_state(), |state, &dir| game.step(&state, dir))
        };
        assert_eq!(run(&game), run(&HeadlessGame::standard(77)));
    }
}
