use std::collections::VecDeque;
use std::fmt;

use crate::board::{Direction, Pos, N};

/// Per-step traversability grid: true cells may be entered, false cells hold
/// tiles that must not be disturbed.
pub type Mask = [[bool; N]; N];

pub const OPEN_MASK: Mask = [[true; N]; N];

/// Fixed expansion order. Ties in BFS depth are broken by this order, which
/// pins the emitted routes down to the byte.
const NEIGHBOR_ORDER: [Direction; 4] = [
    Direction::Right,
    Direction::Left,
    Direction::Down,
    Direction::Up,
];

/// Error when no route exists between two cells under a mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoPath {
    pub start: Pos,
    pub end: Pos,
}

impl fmt::Display for NoPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no path from {} to {} under mask", self.start, self.end)
    }
}

impl std::error::Error for NoPath {}

/// Breadth-first shortest path from `start` to `end` over unmasked cells.
///
/// Returns the directions traversed and the visited cells including both
/// endpoints; `start == end` yields an empty direction list. Fails if either
/// endpoint is masked out or the endpoints are disconnected.
pub fn shortest_path(
    start: Pos,
    end: Pos,
    mask: &Mask,
) -> Result<(Vec<Direction>, Vec<Pos>), NoPath> {
    if !mask[start.row][start.col] || !mask[end.row][end.col] {
        return Err(NoPath { start, end });
    }

    let mut queue = VecDeque::new();
    let mut visited = [[false; N]; N];
    queue.push_back((start, Vec::new(), vec![start]));
    visited[start.row][start.col] = true;

    while let Some((current, directions, coords)) = queue.pop_front() {
        if current == end {
            return Ok((directions, coords));
        }

        for direction in NEIGHBOR_ORDER {
            let Some(next) = current.step(direction) else {
                continue;
            };
            if !mask[next.row][next.col] || visited[next.row][next.col] {
                continue;
            }
            visited[next.row][next.col] = true;
            let mut directions = directions.clone();
            directions.push(direction);
            let mut coords = coords.clone();
            coords.push(next);
            queue.push_back((next, directions, coords));
        }
    }

    Err(NoPath { start, end })
}

/// A copy of `mask` with one extra cell forbidden. Used to pin the tile being
/// routed in place while the blank travels around it.
pub fn mask_without(mask: &Mask, banned: Pos) -> Mask {
    let mut masked = *mask;
    masked[banned.row][banned.col] = false;
    masked
}
