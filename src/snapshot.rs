//! The raw board snapshot contract and its glue around the solver
//!
//! Callers that hold a plain grid rather than a move history use this module
//! to hand positions to the engine (by reconstructing an equivalent history)
//! or to pick a fallback move without any search at all.

use rand::Rng;

use std::collections::HashSet;

use crate::bitboard::BitBoard;
use crate::error::SolveError;
use crate::{HEIGHT, WIDTH};

/// A plain grid view of a board
///
/// Seven columns of six cells each, where index 0 of a column is its
/// *topmost* cell; 0 is an empty cell, 1 and 2 are the players' stones. A
/// column is full exactly when its index-0 cell is non-zero.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Snapshot {
    columns: [[u8; HEIGHT]; WIDTH],
}

impl Snapshot {
    pub fn new(columns: [[u8; HEIGHT]; WIDTH]) -> Self {
        Self { columns }
    }

    pub fn empty() -> Self {
        Self {
            columns: [[0; HEIGHT]; WIDTH],
        }
    }

    pub fn columns(&self) -> &[[u8; HEIGHT]; WIDTH] {
        &self.columns
    }

    pub fn is_column_open(&self, column: usize) -> bool {
        self.columns[column][0] == 0
    }

    /// Selects a uniformly random non-full column, 0-indexed
    ///
    /// The randomness source is injected so callers (and tests) control the
    /// sequence. Fails with [`SolveError::BoardFull`] when every column is
    /// full.
    pub fn random_column<R: Rng>(&self, rng: &mut R) -> Result<usize, SolveError> {
        let open: Vec<usize> = (0..WIDTH).filter(|&c| self.is_column_open(c)).collect();
        if open.is_empty() {
            return Err(SolveError::BoardFull);
        }
        Ok(open[rng.gen_range(0..open.len())])
    }

    /// Reconstructs a move history that replays to exactly this snapshot
    ///
    /// Searches the legal drop orders (player 1 on even plies, dead ends
    /// memoised) until one recreates every stone with its owner, so replaying
    /// the returned history yields a position with the same
    /// `current`/`occupied` masks as the snapshot. Fails with
    /// [`SolveError::InvalidMoveSequence`] if the snapshot is not a reachable
    /// position (bad cell values, floating stones, impossible stone counts,
    /// or no drop order that avoids deciding the game before the last stone).
    pub fn to_move_string(&self) -> Result<String, SolveError> {
        let mut owners = [[0u8; HEIGHT]; WIDTH];
        let mut heights = [0usize; WIDTH];
        let mut stones = [0usize; 2];
        for column in 0..WIDTH {
            for row in 0..HEIGHT {
                match self.columns[column][row] {
                    0 => {
                        // a stone may not sit above an empty cell
                        if row > 0 && self.columns[column][row - 1] != 0 {
                            return Err(SolveError::InvalidMoveSequence(format!(
                                "column {} has a floating stone",
                                column + 1
                            )));
                        }
                    }
                    cell @ 1 | cell @ 2 => {
                        stones[cell as usize - 1] += 1;
                        owners[column][HEIGHT - 1 - row] = cell;
                        heights[column] += 1;
                    }
                    other => {
                        return Err(SolveError::InvalidMoveSequence(format!(
                            "unknown cell value {}",
                            other
                        )))
                    }
                }
            }
        }

        if stones[0] != stones[1] && stones[0] != stones[1] + 1 {
            return Err(SolveError::InvalidMoveSequence(format!(
                "impossible stone counts: {} vs {}",
                stones[0], stones[1]
            )));
        }

        let total = stones[0] + stones[1];
        let mut ordering = MoveOrdering {
            owners: &owners,
            heights: &heights,
            total,
            dead: HashSet::new(),
        };
        let mut moves = String::with_capacity(total);
        if !ordering.search(BitBoard::new(), &mut [0; WIDTH], &mut moves) {
            return Err(SolveError::InvalidMoveSequence(
                "no legal move order reaches this position".into(),
            ));
        }
        Ok(moves)
    }
}

// depth-first search for a drop order recreating each stone with its owner
struct MoveOrdering<'a> {
    // per column, bottom-up owners and target heights
    owners: &'a [[u8; HEIGHT]; WIDTH],
    heights: &'a [usize; WIDTH],
    total: usize,
    // positions from which no completing order exists
    dead: HashSet<u64>,
}

impl MoveOrdering<'_> {
    fn search(
        &mut self,
        board: BitBoard,
        placed: &mut [usize; WIDTH],
        moves: &mut String,
    ) -> bool {
        if board.plies() == self.total {
            return true;
        }
        if !self.dead.insert(board.key()) {
            return false;
        }
        let mover = if board.plies() % 2 == 0 { 1 } else { 2 };
        for column in 0..WIDTH {
            if placed[column] == self.heights[column]
                || self.owners[column][placed[column]] != mover
            {
                continue;
            }
            let mut next = board;
            next.play_column(column);
            // the game may not be decided before the final stone
            if next.last_mover_won() && next.plies() != self.total {
                continue;
            }
            placed[column] += 1;
            moves.push((b'1' + column as u8) as char);
            if self.search(next, placed, moves) {
                return true;
            }
            moves.pop();
            placed[column] -= 1;
        }
        false
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn random_column_only_picks_open_columns() {
        let mut columns = [[0; HEIGHT]; WIDTH];
        // fill columns 0, 2 and 5 to the top
        for &full in &[0usize, 2, 5] {
            columns[full] = [1, 2, 1, 2, 1, 2];
        }
        let snapshot = Snapshot::new(columns);

        let mut rng = StdRng::from_seed([7; 32]);
        for _ in 0..100 {
            let picked = snapshot.random_column(&mut rng).unwrap();
            assert!([1usize, 3, 4, 6].contains(&picked));
        }
    }

    #[test]
    fn single_open_column_is_forced() {
        let mut columns = [[0; HEIGHT]; WIDTH];
        for c in 0..WIDTH {
            if c != 4 {
                columns[c] = [1, 2, 1, 2, 1, 2];
            }
        }
        let snapshot = Snapshot::new(columns);

        let mut rng = StdRng::from_seed([0; 32]);
        assert_eq!(snapshot.random_column(&mut rng).unwrap(), 4);
    }

    #[test]
    fn full_board_has_no_fallback() {
        let columns = [[1; HEIGHT]; WIDTH];
        let snapshot = Snapshot::new(columns);

        let mut rng = StdRng::from_seed([0; 32]);
        assert_eq!(
            snapshot.random_column(&mut rng),
            Err(SolveError::BoardFull)
        );
    }

    #[test]
    fn round_trips_through_a_move_string() {
        // the position after "17273": P1 on the bottom of columns 1-3,
        // P2 stacked twice in column 7
        let mut columns = [[0; HEIGHT]; WIDTH];
        columns[0] = [0, 0, 0, 0, 0, 1];
        columns[1] = [0, 0, 0, 0, 0, 1];
        columns[2] = [0, 0, 0, 0, 0, 1];
        columns[6] = [0, 0, 0, 0, 2, 2];
        let snapshot = Snapshot::new(columns);

        let moves = snapshot.to_move_string().unwrap();
        assert_eq!(moves, "17273");

        let replayed = BitBoard::from_moves(&moves).unwrap();
        let reference = BitBoard::from_moves("17273").unwrap();
        assert_eq!(replayed.current(), reference.current());
        assert_eq!(replayed.occupied(), reference.occupied());
    }

    #[test]
    fn reorders_stones_the_row_scan_cannot_interleave() {
        // reachable via "1151253": column 1 holds P1,P2,P2 bottom-up while
        // column 5 holds P1 below P2, so no strict 1-2-1-2 pairing of the
        // players' row-scan lists keeps every stone with its owner
        let mut columns = [[0; HEIGHT]; WIDTH];
        columns[0] = [0, 0, 0, 2, 2, 1];
        columns[1] = [0, 0, 0, 0, 0, 1];
        columns[2] = [0, 0, 0, 0, 0, 1];
        columns[4] = [0, 0, 0, 0, 2, 1];
        let snapshot = Snapshot::new(columns);

        let moves = snapshot.to_move_string().unwrap();
        let replayed = BitBoard::from_moves(&moves).unwrap();
        let reference = BitBoard::from_moves("1151253").unwrap();
        assert_eq!(replayed.current(), reference.current());
        assert_eq!(replayed.occupied(), reference.occupied());
    }

    #[test]
    fn rejects_unreachable_owner_orders() {
        // one stone each, but the only available first move belongs to
        // player 2
        let mut columns = [[0; HEIGHT]; WIDTH];
        columns[0] = [0, 0, 0, 0, 1, 2];
        let snapshot = Snapshot::new(columns);
        assert!(matches!(
            snapshot.to_move_string(),
            Err(SolveError::InvalidMoveSequence(_))
        ));
    }

    #[test]
    fn places_a_winning_stone_last() {
        // four P1 stones over three P2 stones: every legal drop order ends
        // exactly when the vertical four completes
        let mut columns = [[0; HEIGHT]; WIDTH];
        columns[0] = [0, 0, 1, 1, 1, 1];
        columns[1] = [0, 0, 0, 2, 2, 2];
        let snapshot = Snapshot::new(columns);

        let moves = snapshot.to_move_string().unwrap();
        let board = BitBoard::from_moves(&moves).unwrap();
        assert!(board.last_mover_won());
    }

    #[test]
    fn rejects_floating_stones() {
        let mut columns = [[0; HEIGHT]; WIDTH];
        // a stone in the air: occupied above an empty cell
        columns[3] = [0, 0, 0, 0, 1, 0];
        let snapshot = Snapshot::new(columns);
        assert!(matches!(
            snapshot.to_move_string(),
            Err(SolveError::InvalidMoveSequence(_))
        ));
    }

    #[test]
    fn rejects_impossible_counts() {
        let mut columns = [[0; HEIGHT]; WIDTH];
        // two P1 stones and none for P2
        columns[3] = [0, 0, 0, 0, 1, 1];
        let snapshot = Snapshot::new(columns);
        assert!(matches!(
            snapshot.to_move_string(),
            Err(SolveError::InvalidMoveSequence(_))
        ));
    }
}
