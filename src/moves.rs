//! Legal move enumeration and ordering

use crate::bitboard::BitBoard;
use crate::WIDTH;

/// Returns the columns ordered from the middle outwards, as the middle
/// columns are better moves on average and searching them first maximises
/// alpha-beta cutoffs
pub const fn column_order() -> [usize; WIDTH] {
    let mut order = [0; WIDTH];
    let mut i = 0;
    while i < WIDTH {
        order[i] = (WIDTH / 2) + (i % 2) * (i / 2 + 1) - (1 - i % 2) * (i / 2);
        i += 1;
    }
    order
}

/// Iterates the columns with fewer than six stones, centre columns first
///
/// The order is a fixed function of the position, which keeps search results
/// and tie-breaks reproducible.
pub fn legal_columns(board: &BitBoard) -> impl Iterator<Item = usize> + '_ {
    let order = column_order();
    (0..WIDTH)
        .map(move |i| order[i])
        .filter(move |&column| board.playable(column))
}

/// Insertion-sorted move list for one node of the search
///
/// Moves are ranked by the number of winning cells they would create
/// ([`BitBoard::move_score`]); pushing in reverse static order means equally
/// scored moves come back out centre-first.
pub struct MoveSorter {
    size: usize,
    // move bitmap, column and score
    moves: [(u64, usize, i32); WIDTH],
}

impl MoveSorter {
    pub fn new() -> Self {
        Self {
            size: 0,
            moves: [(0, 0, 0); WIDTH],
        }
    }

    pub fn push(&mut self, new_move: u64, column: usize, score: i32) {
        let mut pos = self.size;
        self.size += 1;
        while pos != 0 && self.moves[pos - 1].2 > score {
            self.moves[pos] = self.moves[pos - 1];
            pos -= 1;
        }
        self.moves[pos] = (new_move, column, score);
    }

    /// Fills the sorter with every non-losing move of `board`
    pub fn from_non_losing_moves(board: &BitBoard, non_losing_moves: u64) -> Self {
        let mut moves = Self::new();
        // reversing the static order puts edge columns first, which reduces
        // the amount of shifting as these moves score worse on average
        for i in (0..WIDTH).rev() {
            let column = column_order()[i];
            let candidate = non_losing_moves & BitBoard::column_mask(column);
            if candidate != 0 && board.playable(column) {
                moves.push(candidate, column, board.move_score(candidate));
            }
        }
        moves
    }
}

impl Iterator for MoveSorter {
    type Item = (u64, usize);

    fn next(&mut self) -> Option<Self::Item> {
        match self.size {
            0 => None,
            _ => {
                self.size -= 1;
                Some((self.moves[self.size].0, self.moves[self.size].1))
            }
        }
    }
}

impl Default for MoveSorter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_is_centre_first() {
        assert_eq!(column_order(), [3, 2, 4, 1, 5, 0, 6]);
    }

    #[test]
    fn legal_columns_on_empty_board() {
        let board = BitBoard::new();
        let columns: Vec<usize> = legal_columns(&board).collect();
        assert_eq!(columns, vec![3, 2, 4, 1, 5, 0, 6]);
    }

    #[test]
    fn full_column_is_excluded() {
        let board = BitBoard::from_moves("444444").unwrap();
        let columns: Vec<usize> = legal_columns(&board).collect();
        assert_eq!(columns, vec![2, 4, 1, 5, 0, 6]);
        assert!(!columns.contains(&3));
    }

    #[test]
    fn generator_is_deterministic() {
        let board = BitBoard::from_moves("4455").unwrap();
        let first: Vec<usize> = legal_columns(&board).collect();
        let second: Vec<usize> = legal_columns(&board).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn sorter_returns_highest_score_first() {
        let mut sorter = MoveSorter::new();
        sorter.push(0b001, 0, 1);
        sorter.push(0b010, 1, 3);
        sorter.push(0b100, 2, 2);

        let columns: Vec<usize> = sorter.map(|(_, column)| column).collect();
        assert_eq!(columns, vec![1, 2, 0]);
    }

    #[test]
    fn sorter_breaks_ties_by_push_order() {
        // pushed later wins the tie, matching the reversed centre-out fill
        let mut sorter = MoveSorter::new();
        sorter.push(0b001, 0, 1);
        sorter.push(0b010, 6, 1);
        sorter.push(0b100, 3, 1);

        let columns: Vec<usize> = sorter.map(|(_, column)| column).collect();
        assert_eq!(columns, vec![3, 6, 0]);
    }
}
