//! In-process Go rules: captures, suicide and simple ko.

use super::{BoardEngine, BoardError, BoardOutcome, BoardState, Placement, StepOutcome};
use crate::coord::BOARD_SIZE;

#[derive(Debug, Clone, Copy, Default)]
pub struct NativeEngine;

fn neighbors(x: usize, y: usize) -> impl Iterator<Item = (usize, usize)> {
    let cand = [
        (x.wrapping_sub(1), y),
        (x + 1, y),
        (x, y.wrapping_sub(1)),
        (x, y + 1),
    ];
    cand.into_iter().filter(|&(nx, ny)| nx < BOARD_SIZE && ny < BOARD_SIZE)
}

/// Stones of the group at `(x, y)` and whether it has any liberty.
fn group(board: &BoardState, x: usize, y: usize) -> (Vec<(usize, usize)>, bool) {
    let sign = board.get(x, y);
    let mut seen = [[false; BOARD_SIZE]; BOARD_SIZE];
    let mut stack = vec![(x, y)];
    let mut stones = Vec::new();
    let mut has_liberty = false;
    seen[y][x] = true;
    while let Some((cx, cy)) = stack.pop() {
        stones.push((cx, cy));
        for (nx, ny) in neighbors(cx, cy) {
            let s = board.get(nx, ny);
            if s == 0 {
                has_liberty = true;
            } else if s == sign && !seen[ny][nx] {
                seen[ny][nx] = true;
                stack.push((nx, ny));
            }
        }
    }
    (stones, has_liberty)
}

impl NativeEngine {
    /// Board after playing `p` on `board`, or the reason it is illegal.
    /// `previous` is the position before the last successful move, for ko.
    pub fn play(board: &BoardState, previous: Option<&BoardState>, p: &Placement) -> Result<BoardState, String> {
        if p.sign != 1 && p.sign != -1 {
            return Err(format!("invalid sign {}", p.sign));
        }
        let [x, y] = p.vertex;
        if x >= BOARD_SIZE || y >= BOARD_SIZE {
            return Err(format!("vertex ({x}, {y}) is off the board"));
        }
        if board.get(x, y) != 0 {
            return Err("vertex is occupied".to_string());
        }

        let mut next = *board;
        next.set(x, y, p.sign);
        for (nx, ny) in neighbors(x, y) {
            if next.get(nx, ny) == -p.sign {
                let (stones, alive) = group(&next, nx, ny);
                if !alive {
                    for (sx, sy) in stones { next.set(sx, sy, 0); }
                }
            }
        }
        if !group(&next, x, y).1 {
            return Err("suicide is not allowed".to_string());
        }
        if previous == Some(&next) {
            return Err("ko".to_string());
        }
        Ok(next)
    }
}

impl BoardEngine for NativeEngine {
    fn name(&self) -> &str { "native" }

    fn apply(&self, moves: &[Placement]) -> Result<BoardOutcome, BoardError> {
        let mut board = BoardState::empty();
        let mut previous: Option<BoardState> = None;
        let mut steps = Vec::with_capacity(moves.len());
        for (i, p) in moves.iter().enumerate() {
            let (success, message) = match Self::play(&board, previous.as_ref(), p) {
                Ok(next) => {
                    previous = Some(board);
                    board = next;
                    (true, None)
                }
                Err(reason) => (false, Some(reason)),
            };
            steps.push(StepOutcome { step: i + 1, sign: p.sign, vertex: p.vertex, success, message });
        }
        let success = steps.iter().all(|s| s.success);
        let message = steps
            .iter()
            .find(|s| !s.success)
            .map(|s| format!("step {} failed: {}", s.step, s.message.as_deref().unwrap_or("illegal move")));
        Ok(BoardOutcome { success, board, steps, message })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(sign: i8, x: usize, y: usize) -> Placement { Placement { sign, vertex: [x, y] } }

    #[test]
    fn captures_single_stone() {
        // White stone at (1,1) surrounded by black.
        let moves = [at(1, 1, 0), at(-1, 1, 1), at(1, 0, 1), at(-1, 10, 10), at(1, 2, 1), at(-1, 11, 11), at(1, 1, 2)];
        let out = NativeEngine.apply(&moves).unwrap();
        assert!(out.success);
        assert_eq!(out.board.get(1, 1), 0);
        assert_eq!(out.board.stone_count(1), 4);
    }

    #[test]
    fn suicide_rejected() {
        let moves = [at(1, 1, 0), at(-1, 10, 10), at(1, 0, 1), at(-1, 0, 0)];
        let out = NativeEngine.apply(&moves).unwrap();
        assert!(!out.success);
        assert!(!out.steps[3].success);
        assert_eq!(out.board.get(0, 0), 0);
    }

    #[test]
    fn simple_ko_rejected() {
        // Ko shape around (1,1)/(2,1): black captures at (2,1), white may not retake at (1,1) at once.
        let moves = [
            at(1, 1, 0), at(-1, 2, 0),
            at(1, 0, 1), at(-1, 3, 1),
            at(1, 1, 2), at(-1, 2, 2),
            at(1, 10, 10), at(-1, 1, 1),
            at(1, 2, 1),  // captures (1,1)
            at(-1, 1, 1), // immediate retake
        ];
        let out = NativeEngine.apply(&moves).unwrap();
        assert!(out.steps[8].success);
        assert!(!out.steps[9].success);
        assert_eq!(out.steps[9].message.as_deref(), Some("ko"));
        assert_eq!(out.board.get(1, 1), 0);
    }

    #[test]
    fn off_board_and_bad_sign_rejected() {
        let out = NativeEngine.apply(&[at(1, 19, 0), at(0, 3, 3)]).unwrap();
        assert!(out.steps.iter().all(|s| !s.success));
        assert_eq!(out.board, BoardState::empty());
    }
}
