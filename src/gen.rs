use rand::rngs::StdRng;
use rand::seq::{IndexedRandom, SliceRandom};
use rand::{Rng, SeedableRng};

use crate::board::{Board, Direction, N};

pub const DEFAULT_REVERSE_RATE: f64 = 0.2;
pub const DEFAULT_REVERSE_STEPS: u32 = 15;

/// Produces a solvable starting board from a seed.
///
/// With probability `reverse_rate` the board is scrambled by walking the
/// blank backwards from the goal for `reverse_steps` legal moves, which is
/// solvable by construction. Otherwise a uniform shuffle is laid out and, if
/// it lands on the wrong side of the parity rule, the first two non-blank
/// cells in row-major order are swapped to flip one inversion pair.
pub fn generate(seed: u64, reverse_rate: f64, reverse_steps: u32) -> Board {
    let mut rng = StdRng::seed_from_u64(seed);

    if rng.random::<f64>() < reverse_rate {
        return reverse_walk(&mut rng, reverse_steps);
    }

    let mut numbers: Vec<u8> = (0..16).collect();
    numbers.shuffle(&mut rng);
    let mut cells = [[0u8; N]; N];
    for (i, &number) in numbers.iter().enumerate() {
        cells[i / N][i % N] = number;
    }
    let mut board = Board::new(cells);

    if !is_solvable(&board) {
        swap_first_tile_pair(&mut board);
    }
    board
}

fn reverse_walk(rng: &mut StdRng, steps: u32) -> Board {
    use crate::board::Direction::*;

    let mut board = Board::GOAL;
    for _ in 0..steps {
        let blank = board.locate(0);
        // Legal moves by blank position: corners, edges, interior. Edge and
        // interior cells do not exclude backtracking.
        let legal: &[Direction] = match (blank.row, blank.col) {
            (0, 0) => &[Down, Right],
            (0, 3) => &[Down, Left],
            (3, 0) => &[Up, Right],
            (3, 3) => &[Up, Left],
            (0, _) => &[Down, Left, Right],
            (3, _) => &[Up, Left, Right],
            (_, 0) => &[Up, Down, Right],
            (_, 3) => &[Up, Down, Left],
            _ => &[Up, Down, Left, Right],
        };
        let direction = *legal.choose(rng).expect("legal move set is never empty");
        board.slide(direction).expect("move stays in bounds");
    }
    board
}

fn swap_first_tile_pair(board: &mut Board) {
    let mut first = None;
    for row in 0..N {
        for col in 0..N {
            if board.cells[row][col] == 0 {
                continue;
            }
            match first {
                None => first = Some((row, col)),
                Some((frow, fcol)) => {
                    let tmp = board.cells[frow][fcol];
                    board.cells[frow][fcol] = board.cells[row][col];
                    board.cells[row][col] = tmp;
                    return;
                }
            }
        }
    }
}

/// Inversion count over the non-blank tiles of a row-major layout.
pub fn count_inversions(tiles: &[u8]) -> usize {
    let mut inversions = 0;
    for i in 0..tiles.len() {
        for j in (i + 1)..tiles.len() {
            if tiles[i] != 0 && tiles[j] != 0 && tiles[i] > tiles[j] {
                inversions += 1;
            }
        }
    }
    inversions
}

/// Parity rule for 4x4 boards: counting the blank's row from the bottom
/// (1-based), the board is solvable iff that count being even coincides with
/// the inversion count being odd.
pub fn is_solvable(board: &Board) -> bool {
    let tiles: Vec<u8> = board.cells.iter().flatten().copied().collect();
    let blank_row_from_bottom = N - board.locate(0).row;
    (blank_row_from_bottom % 2 == 0) == (count_inversions(&tiles) % 2 == 1)
}
