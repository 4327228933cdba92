//! Board state computation behind a pluggable engine.
//!
//! Callers hand an engine a batch of stone placements and get back the final
//! grid plus a per-step legality report. Illegal steps do not abort the batch:
//! they are reported and leave the grid as it was.

pub mod native;
pub mod node;

use crate::coord::{Color, Move, BOARD_SIZE, LETTERS};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub use native::NativeEngine;
pub use node::NodeEngine;

#[derive(Debug, Error)]
pub enum BoardError {
    #[error("board engine unavailable: {0}")]
    Unavailable(String),
    #[error("board engine timed out after {0:?}")]
    Timeout(Duration),
    #[error("malformed board engine response: {0}")]
    Malformed(String),
    #[error("board engine error: {0}")]
    Engine(String),
}

/// One stone to place: sign 1 is black, -1 white; vertex is `[x, y]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub sign: i8,
    pub vertex: [usize; 2],
}

impl Placement {
    pub fn new(color: Color, mv: Move) -> Self {
        let (x, y) = mv.vertex();
        Self { sign: color.sign(), vertex: [x, y] }
    }
}

/// Placements for a game record, black first and alternating.
pub fn placements_for(moves: &[Move]) -> Vec<Placement> {
    moves
        .iter()
        .enumerate()
        .map(|(i, &mv)| Placement::new(Color::for_move_number(i + 1), mv))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepOutcome {
    pub step: usize,
    pub sign: i8,
    pub vertex: [usize; 2],
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardOutcome {
    /// True when every step succeeded.
    pub success: bool,
    pub board: BoardState,
    pub steps: Vec<StepOutcome>,
    #[serde(default)]
    pub message: Option<String>,
}

/// 19x19 grid indexed `[y][x]`: 1 black, -1 white, 0 empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BoardState {
    grid: [[i8; BOARD_SIZE]; BOARD_SIZE],
}

impl Default for BoardState {
    fn default() -> Self { Self::empty() }
}

impl BoardState {
    pub fn empty() -> Self { Self { grid: [[0; BOARD_SIZE]; BOARD_SIZE] } }

    pub fn get(&self, x: usize, y: usize) -> i8 { self.grid[y][x] }

    pub fn set(&mut self, x: usize, y: usize, sign: i8) { self.grid[y][x] = sign; }

    pub fn stone_count(&self, sign: i8) -> usize {
        self.grid.iter().flatten().filter(|&&s| s == sign).count()
    }

    /// Reject cells other than -1, 0 and 1.
    pub fn validate(&self) -> Result<(), BoardError> {
        for (y, row) in self.grid.iter().enumerate() {
            for (x, &s) in row.iter().enumerate() {
                if !(-1..=1).contains(&s) {
                    return Err(BoardError::Malformed(format!("cell ({x}, {y}) holds {s}")));
                }
            }
        }
        Ok(())
    }

    /// Nested-list text (`[[0, 1, ...], ...]`) as embedded in prompts.
    pub fn to_list_string(&self) -> String {
        let rows: Vec<String> = self
            .grid
            .iter()
            .map(|row| {
                let cells: Vec<String> = row.iter().map(|s| s.to_string()).collect();
                format!("[{}]", cells.join(", "))
            })
            .collect();
        format!("[{}]", rows.join(", "))
    }
}

impl fmt::Display for BoardState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "   ")?;
        for &l in LETTERS.iter() { write!(f, " {} ", l as char)?; }
        writeln!(f)?;
        for (y, row) in self.grid.iter().enumerate() {
            write!(f, "{:2} ", BOARD_SIZE - y)?;
            for &s in row {
                let c = match s { 1 => '●', -1 => '○', _ => '·' };
                write!(f, " {c} ")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Computes board states for batches of placements.
pub trait BoardEngine: Send + Sync {
    fn name(&self) -> &str;

    fn apply(&self, moves: &[Placement]) -> Result<BoardOutcome, BoardError>;
}

/// Which engine backs a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum EngineKind {
    /// In-process rules
    Native,
    /// `@sabaki/go-board` through a Node.js subprocess
    Node,
}

#[derive(Debug, Clone)]
pub struct EngineParams {
    pub kind: EngineKind,
    /// Directory holding `package.json` and `node_modules` for the Node engine.
    pub node_dir: PathBuf,
    pub node_timeout: Duration,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self { kind: EngineKind::Native, node_dir: PathBuf::from("."), node_timeout: node::DEFAULT_TIMEOUT }
    }
}

pub fn build_engine(params: &EngineParams) -> Result<Box<dyn BoardEngine>, BoardError> {
    Ok(match params.kind {
        EngineKind::Native => Box::new(NativeEngine),
        EngineKind::Node => Box::new(NodeEngine::new(&params.node_dir, params.node_timeout)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_string_matches_nested_list_text() {
        let mut b = BoardState::empty();
        b.set(0, 0, 1);
        b.set(1, 0, -1);
        let s = b.to_list_string();
        assert!(s.starts_with("[[1, -1, 0, "));
        assert!(s.ends_with(", 0]]"));
        assert_eq!(s.matches('[').count(), BOARD_SIZE + 1);
    }

    #[test]
    fn display_labels_rows_and_columns() {
        let mut b = BoardState::empty();
        b.set(3, 15, 1);
        let text = b.to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), BOARD_SIZE + 1);
        assert!(lines[0].contains('T') && !lines[0].contains('I'));
        assert!(lines[16].starts_with(" 4 "));
        assert!(lines[16].contains('●'));
    }

    #[test]
    fn placements_alternate_from_black() {
        let moves: Vec<Move> = ["Q16", "D4", "C3"].iter().map(|m| m.parse().unwrap()).collect();
        let p = placements_for(&moves);
        assert_eq!(p.iter().map(|p| p.sign).collect::<Vec<_>>(), vec![1, -1, 1]);
        assert_eq!(p[1].vertex, [3, 15]);
    }

    #[test]
    fn outcome_json_shape() {
        let json = serde_json::to_value(Placement { sign: -1, vertex: [3, 3] }).unwrap();
        assert_eq!(json, serde_json::json!({"sign": -1, "vertex": [3, 3]}));
        let board = serde_json::to_value(BoardState::empty()).unwrap();
        assert_eq!(board.as_array().map(|r| r.len()), Some(BOARD_SIZE));
    }
}
