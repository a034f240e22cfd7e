use std::fmt;

use crate::board::{Board, Direction};

/// Error raised by the data-gen driver when a solver result fails replay.
/// The offending record must never reach the output file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerificationFailed {
    pub seed: u64,
}

impl fmt::Display for VerificationFailed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "seed {}: move list does not reach the goal board", self.seed)
    }
}

impl std::error::Error for VerificationFailed {}

/// Replays `moves` on a copy of `initial` and checks the result against the
/// goal. A move that would push the blank off the grid fails the replay.
pub fn is_solution(initial: &Board, moves: &[Direction]) -> bool {
    let mut board = *initial;
    let mut blank = board.locate(0);

    for &direction in moves {
        let Some(next) = blank.step(direction) else {
            return false;
        };
        board.cells[blank.row][blank.col] = board.cells[next.row][next.col];
        board.cells[next.row][next.col] = 0;
        blank = next;
    }

    board.is_goal()
}

/// Token-level verifier for externally supplied move lists. Any token that
/// is not a known direction fails the check instead of raising.
pub fn is_solution_tokens(initial: &Board, tokens: &str) -> bool {
    let Ok(moves) = tokens
        .split_whitespace()
        .map(str::parse)
        .collect::<Result<Vec<Direction>, _>>()
    else {
        return false;
    };
    is_solution(initial, &moves)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Direction::*;

    #[test]
    fn test_goal_needs_no_moves() {
        assert!(is_solution(&Board::GOAL, &[]));
    }

    #[test]
    fn test_simple_replay() {
        // Undo UP with DOWN.
        let mut scrambled = Board::GOAL;
        scrambled.slide(Up).unwrap();
        assert!(is_solution(&scrambled, &[Down]));
        assert!(!is_solution(&scrambled, &[Up]));
    }

    #[test]
    fn test_out_of_bounds_move_fails() {
        assert!(!is_solution(&Board::GOAL, &[Down]));
        assert!(!is_solution(&Board::GOAL, &[Right]));
    }

    #[test]
    fn test_wrong_final_board_fails() {
        assert!(!is_solution(&Board::GOAL, &[Up, Up]));
    }

    #[test]
    fn test_token_verifier() {
        let mut scrambled = Board::GOAL;
        scrambled.slide(Up).unwrap();
        scrambled.slide(Left).unwrap();
        assert!(is_solution_tokens(&scrambled, "RIGHT DOWN"));
        assert!(!is_solution_tokens(&scrambled, "RIGHT SIDEWAYS"));
        assert!(is_solution_tokens(&Board::GOAL, ""));
    }
}
