use std::{collections::BTreeSet, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::{GridError, ParseError};
use crate::line::{collapse, merged_value};

pub const DEFAULT_SIZE: usize = 4;
pub const DEFAULT_WIN_TILE: u32 = 2048;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// Tiles slide toward the high index for right and down.
    fn reversed(self) -> bool {
        matches!(self, Direction::Right | Direction::Down)
    }

    fn horizontal(self) -> bool {
        matches!(self, Direction::Left | Direction::Right)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" | "w" => Ok(Direction::Up),
            "down" | "s" => Ok(Direction::Down),
            "left" | "a" => Ok(Direction::Left),
            "right" | "d" => Ok(Direction::Right),
            _ => Err(ParseError::Direction(s.to_string())),
        }
    }
}

/// Square board of tile values; 0 is an empty cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<u32>>", into = "Vec<Vec<u32>>")]
pub struct Grid {
    rows: Vec<Vec<u32>>,
}

impl Grid {
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            rows: vec![vec![0; size]; size],
        }
    }

    pub fn from_rows(rows: Vec<Vec<u32>>) -> Result<Self, GridError> {
        let size = rows.len();
        if size == 0 {
            return Err(GridError::Empty);
        }
        for (r, row) in rows.iter().enumerate() {
            if row.len() != size {
                return Err(GridError::NotSquare {
                    row: r,
                    len: row.len(),
                    size,
                });
            }
            for (c, &value) in row.iter().enumerate() {
                if value != 0 && (value < 2 || !value.is_power_of_two()) {
                    return Err(GridError::InvalidTile {
                        row: r,
                        col: c,
                        value,
                    });
                }
            }
        }
        Ok(Self { rows })
    }

    pub fn size(&self) -> usize {
        self.rows.len()
    }

    pub fn rows(&self) -> &[Vec<u32>] {
        &self.rows
    }

    pub fn get(&self, row: usize, col: usize) -> u32 {
        self.rows[row][col]
    }

    pub(crate) fn set(&mut self, row: usize, col: usize, value: u32) {
        debug_assert!(value == 0 || (value >= 2 && value.is_power_of_two()));
        self.rows[row][col] = value;
    }

    pub fn empty_cells(&self) -> Vec<(usize, usize)> {
        let mut cells = Vec::new();
        for (r, row) in self.rows.iter().enumerate() {
            for (c, &value) in row.iter().enumerate() {
                if value == 0 {
                    cells.push((r, c));
                }
            }
        }
        cells
    }

    pub fn has_empty(&self) -> bool {
        self.rows.iter().any(|row| row.contains(&0))
    }

    pub fn highest_tile(&self) -> u32 {
        self.rows.iter().flatten().copied().max().unwrap_or(0)
    }

    pub fn contains(&self, value: u32) -> bool {
        self.rows.iter().any(|row| row.contains(&value))
    }

    pub fn tile_sum(&self) -> u64 {
        self.rows.iter().flatten().map(|&v| u64::from(v)).sum()
    }

    /// True when some horizontally or vertically adjacent pair can merge.
    pub fn has_adjacent_pair(&self) -> bool {
        let n = self.size();
        for r in 0..n {
            for c in 0..n {
                let v = self.rows[r][c];
                if v == 0 || merged_value(v).is_none() {
                    continue;
                }
                if c + 1 < n && self.rows[r][c + 1] == v {
                    return true;
                }
                if r + 1 < n && self.rows[r + 1][c] == v {
                    return true;
                }
            }
        }
        false
    }

    /// Remove every tile holding the smallest value, if another value would remain.
    pub(crate) fn clear_smallest(&mut self) -> usize {
        let Some(smallest) = self.rows.iter().flatten().copied().filter(|&v| v != 0).min()
        else {
            return 0;
        };
        if !self.rows.iter().flatten().any(|&v| v != 0 && v != smallest) {
            return 0;
        }
        let mut cleared = 0;
        for value in self.rows.iter_mut().flatten() {
            if *value == smallest {
                *value = 0;
                cleared += 1;
            }
        }
        cleared
    }

    /// Double the highest tile, first in row-major order.
    pub(crate) fn double_highest(&mut self) -> Option<(usize, usize)> {
        let highest = self.highest_tile();
        if highest == 0 {
            return None;
        }
        let doubled = merged_value(highest)?;
        for (r, row) in self.rows.iter_mut().enumerate() {
            if let Some(c) = row.iter().position(|&v| v == highest) {
                row[c] = doubled;
                return Some((r, c));
            }
        }
        None
    }

    fn line(&self, index: usize, horizontal: bool) -> Vec<u32> {
        if horizontal {
            self.rows[index].clone()
        } else {
            self.rows.iter().map(|row| row[index]).collect()
        }
    }

    fn set_line(&mut self, index: usize, horizontal: bool, line: &[u32]) {
        if horizontal {
            self.rows[index].copy_from_slice(line);
        } else {
            for (row, &value) in self.rows.iter_mut().zip(line) {
                row[index] = value;
            }
        }
    }
}

impl TryFrom<Vec<Vec<u32>>> for Grid {
    type Error = GridError;

    fn try_from(rows: Vec<Vec<u32>>) -> Result<Self, Self::Error> {
        Grid::from_rows(rows)
    }
}

impl From<Grid> for Vec<Vec<u32>> {
    fn from(grid: Grid) -> Self {
        grid.rows
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self.highest_tile().max(1).to_string().len().max(4);
        for row in &self.rows {
            let cells: Vec<String> = row
                .iter()
                .map(|&v| {
                    if v == 0 {
                        format!("{:>width$}", ".")
                    } else {
                        format!("{v:>width$}")
                    }
                })
                .collect();
            writeln!(f, "{}", cells.join(" "))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveResult {
    pub moved: bool,
    pub score_gain: u32,
    /// `(row, col)` of every tile produced by a merge.
    pub merged: BTreeSet<(usize, usize)>,
    pub grid: Grid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Terminal {
    Won,
    Over,
}

/// Owns the board and score; the only place the board changes through a move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridEngine {
    grid: Grid,
    score: u32,
    win_tile: Option<u32>,
    win_signaled: bool,
}

impl GridEngine {
    pub fn new(size: usize, win_tile: Option<u32>) -> Self {
        Self::from_grid(Grid::new(size), win_tile)
    }

    pub fn from_grid(grid: Grid, win_tile: Option<u32>) -> Self {
        Self {
            grid,
            score: 0,
            win_tile,
            win_signaled: false,
        }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn size(&self) -> usize {
        self.grid.size()
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn win_tile(&self) -> Option<u32> {
        self.win_tile
    }

    /// Turn the win check off for the rest of this engine's life.
    pub fn disable_win(&mut self) {
        self.win_tile = None;
    }

    /// Compute a move without touching the engine.
    pub fn preview_move(&self, direction: Direction) -> MoveResult {
        let horizontal = direction.horizontal();
        let reversed = direction.reversed();
        let mut next = self.grid.clone();
        let mut moved = false;
        let mut score_gain: u32 = 0;
        let mut merged = BTreeSet::new();

        for i in 0..self.grid.size() {
            let line = self.grid.line(i, horizontal);
            let collapsed = collapse(&line, reversed);
            score_gain = score_gain.saturating_add(collapsed.gain);
            for idx in &collapsed.merged {
                merged.insert(if horizontal { (i, *idx) } else { (*idx, i) });
            }
            if collapsed.changed(&line) {
                moved = true;
                next.set_line(i, horizontal, &collapsed.line);
            }
        }

        MoveResult {
            moved,
            score_gain,
            merged,
            grid: next,
        }
    }

    /// Apply a move. The board and score are untouched unless `moved`.
    pub fn apply_move(&mut self, direction: Direction) -> MoveResult {
        let result = self.preview_move(direction);
        if result.moved {
            self.grid = result.grid.clone();
            self.score = self.score.saturating_add(result.score_gain);
        }
        result
    }

    pub fn can_move(&self) -> bool {
        self.grid.has_empty() || self.grid.has_adjacent_pair()
    }

    pub fn is_game_over(&self) -> bool {
        !self.can_move()
    }

    pub fn has_win_tile(&self) -> bool {
        self.win_tile.is_some_and(|tile| self.grid.contains(tile))
    }

    /// Win is checked first and reported once; game over is reported every call.
    pub fn check_terminal(&mut self) -> Option<Terminal> {
        if !self.win_signaled && self.has_win_tile() {
            self.win_signaled = true;
            return Some(Terminal::Won);
        }
        if self.is_game_over() {
            return Some(Terminal::Over);
        }
        None
    }

    pub(crate) fn place_tile(&mut self, row: usize, col: usize, value: u32) {
        debug_assert_eq!(self.grid.get(row, col), 0);
        self.grid.set(row, col, value);
    }

    pub(crate) fn grid_mut(&mut self) -> &mut Grid {
        &mut self.grid
    }

    pub(crate) fn restore(&mut self, grid: Grid, score: u32) {
        self.grid = grid;
        self.score = score;
    }
}
