use crate::error::SolveError;
use crate::{HEIGHT, SIZE, WIDTH};

mod static_masks {
    use crate::{HEIGHT, WIDTH};

    pub const fn bottom_row() -> u64 {
        let mut mask = 0;
        let mut column = 0;
        while column < WIDTH {
            mask |= 1 << (column * (HEIGHT + 1));
            column += 1;
        }
        mask
    }
    pub const fn full_board() -> u64 {
        bottom_row() * ((1 << HEIGHT as u64) - 1)
    }
}

/// A compact Connect 4 position
///
/// Two bitfields cover the 7x6 grid with one guard bit on top of each column,
/// bit `column * 7 + row` addressing the cell at `(column, row)` from the
/// bottom left. `current` holds the stones of the side to move (negamax
/// convention, so ownership of `current` flips every ply), `occupied` holds
/// the stones of both players.
#[derive(Copy, Clone)]
pub struct BitBoard {
    // stones of the player to move
    current: u64,
    // stones of both players
    occupied: u64,
    plies: usize,
}

impl BitBoard {
    pub fn new() -> Self {
        Self {
            current: 0,
            occupied: 0,
            plies: 0,
        }
    }

    /// Replays a history of 1-indexed column digits from the empty board
    ///
    /// Fails with [`SolveError::InvalidMoveSequence`] if a character is not a
    /// digit in `1..=7`, a move lands in a full column, or the history keeps
    /// going after a win. A history whose final move wins is accepted; the
    /// resulting position is terminal and [`last_mover_won`](Self::last_mover_won)
    /// reports it.
    pub fn from_moves<S: AsRef<str>>(moves: S) -> Result<Self, SolveError> {
        let mut board = Self::new();

        for column_char in moves.as_ref().chars() {
            if board.last_mover_won() {
                return Err(SolveError::InvalidMoveSequence(format!(
                    "game was already decided before move '{}'",
                    column_char
                )));
            }
            match column_char.to_digit(10).map(|c| c as usize) {
                Some(column @ 1..=WIDTH) => {
                    let column = column - 1;
                    if !board.playable(column) {
                        return Err(SolveError::InvalidMoveSequence(format!(
                            "column {} is full",
                            column + 1
                        )));
                    }
                    board.play_column(column);
                }
                _ => {
                    return Err(SolveError::InvalidMoveSequence(format!(
                        "could not parse '{}' as a column",
                        column_char
                    )))
                }
            }
        }
        Ok(board)
    }

    pub fn current(&self) -> u64 {
        self.current
    }

    pub fn occupied(&self) -> u64 {
        self.occupied
    }

    pub fn plies(&self) -> usize {
        self.plies
    }

    pub fn top_mask(column: usize) -> u64 {
        1 << (column * (HEIGHT + 1) + (HEIGHT - 1))
    }

    pub fn bottom_mask(column: usize) -> u64 {
        1 << (column * (HEIGHT + 1))
    }

    pub fn column_mask(column: usize) -> u64 {
        ((1 << HEIGHT) - 1) << (column * (HEIGHT + 1))
    }

    pub fn playable(&self, column: usize) -> bool {
        Self::top_mask(column) & self.occupied == 0
    }

    /// Drops a stone for the side to move and flips ownership of `current`
    pub fn play(&mut self, move_bitmap: u64) {
        // switch the current player
        self.current ^= self.occupied;
        // add a cell of the previous player to the correct column
        self.occupied |= move_bitmap;
        self.plies += 1;
    }

    /// Drops a stone in the lowest open cell of `column`
    pub fn play_column(&mut self, column: usize) {
        let move_bitmap = (self.occupied + Self::bottom_mask(column)) & Self::column_mask(column);
        self.play(move_bitmap);
    }

    /// Tests a stone set for four in a row in any of the four directions
    ///
    /// Runs a fixed number of shift-and-mask steps regardless of board fill.
    pub fn alignment(stones: u64) -> bool {
        // pair off horizontal neighbours, then pairs of pairs
        let mut m = stones & (stones >> (HEIGHT + 1));
        if m & (m >> (2 * (HEIGHT + 1))) != 0 {
            return true;
        }

        // diagonal /
        m = stones & (stones >> HEIGHT);
        if m & (m >> (2 * HEIGHT)) != 0 {
            return true;
        }

        // diagonal \
        m = stones & (stones >> (HEIGHT + 2));
        if m & (m >> (2 * (HEIGHT + 2))) != 0 {
            return true;
        }

        // vertical
        m = stones & (stones >> 1);
        m & (m >> 2) != 0
    }

    /// Would a stone in `column` win on the spot for the side to move?
    pub fn check_winning_move(&self, column: usize) -> bool {
        let candidate = (self.occupied + Self::bottom_mask(column)) & Self::column_mask(column);
        Self::alignment(self.current | candidate)
    }

    /// Did the player who made the last move complete four in a row?
    ///
    /// `current` holds the side to move, so the stones of the player who just
    /// moved are `occupied ^ current`.
    pub fn last_mover_won(&self) -> bool {
        Self::alignment(self.occupied ^ self.current)
    }

    /// All 42 cells occupied with no winner means the game is drawn
    pub fn is_full(&self) -> bool {
        self.plies == SIZE
    }

    /// Bitmap of the lowest open cell of every non-full column
    pub fn possible_moves(&self) -> u64 {
        (self.occupied + static_masks::bottom_row()) & static_masks::full_board()
    }

    /// Playable cells that don't hand the opponent an immediate win
    ///
    /// Returns 0 when every move loses on the next ply.
    pub fn non_losing_moves(&self) -> u64 {
        let mut possible = self.possible_moves();
        let opponent_wins = self.winning_positions(self.current ^ self.occupied);
        let forced = possible & opponent_wins;

        if forced != 0 {
            // two or more simultaneous threats can't both be answered
            if forced & (forced - 1) != 0 {
                return 0;
            } else {
                possible = forced;
            }
        }
        // avoid playing directly below an opponent's winning cell
        possible & !(opponent_wins >> 1)
    }

    // open cells that would complete an alignment for the given stone set
    fn winning_positions(&self, stones: u64) -> u64 {
        // vertical: top ends of 3-alignments
        let mut r = (stones << 1) & (stones << 2) & (stones << 3);

        // horizontal
        let mut p = (stones << (HEIGHT + 1)) & (stones << (2 * (HEIGHT + 1)));
        // right ends of 3-alignments
        r |= p & (stones << (3 * (HEIGHT + 1)));
        // holes of the type O O _ O
        r |= p & (stones >> (HEIGHT + 1));

        p = (stones >> (HEIGHT + 1)) & (stones >> (2 * (HEIGHT + 1)));
        // left ends of 3-alignments
        r |= p & (stones >> (3 * (HEIGHT + 1)));
        // holes of the type O _ O O
        r |= p & (stones << (HEIGHT + 1));

        // diagonal /
        p = (stones << HEIGHT) & (stones << (2 * HEIGHT));
        r |= p & (stones << (3 * HEIGHT));
        r |= p & (stones >> HEIGHT);

        p = (stones >> HEIGHT) & (stones >> (2 * HEIGHT));
        r |= p & (stones >> (3 * HEIGHT));
        r |= p & (stones << HEIGHT);

        // diagonal \
        p = (stones << (HEIGHT + 2)) & (stones << (2 * (HEIGHT + 2)));
        r |= p & (stones << (3 * (HEIGHT + 2)));
        r |= p & (stones >> (HEIGHT + 2));

        p = (stones >> (HEIGHT + 2)) & (stones >> (2 * (HEIGHT + 2)));
        r |= p & (stones >> (3 * (HEIGHT + 2)));
        r |= p & (stones << (HEIGHT + 2));

        r & (static_masks::full_board() ^ self.occupied)
    }

    /// Move ordering heuristic: open ends of 3-alignments the move creates
    pub fn move_score(&self, candidate: u64) -> i32 {
        self.winning_positions(self.current | candidate).count_ones() as i32
    }

    /// Canonical transposition key
    ///
    /// `current + occupied` is a bijection over reachable positions thanks to
    /// the guard bit on every column.
    pub fn key(&self) -> u64 {
        self.current + self.occupied
    }
}

impl Default for BitBoard {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SolveError;

    #[test]
    fn empty_board() {
        let board = BitBoard::new();
        assert_eq!(board.current(), 0);
        assert_eq!(board.occupied(), 0);
        assert_eq!(board.plies(), 0);
        assert!(!board.last_mover_won());
        assert!(!board.is_full());
    }

    #[test]
    fn replay_tracks_masks() {
        // P1 in column 1, P2 in column 2, P1 stacked on column 1
        let board = BitBoard::from_moves("121").unwrap();
        assert_eq!(board.plies(), 3);
        assert_eq!(board.occupied().count_ones(), 3);
        // P2 to move, so `current` holds only the single P2 stone
        assert_eq!(board.current(), 1 << 7);
        // P1 owns the two stones of column 1
        assert_eq!(board.occupied() ^ board.current(), 0b11);
    }

    #[test]
    fn current_is_subset_of_occupied() {
        let board = BitBoard::from_moves("4455662371").unwrap();
        assert_eq!(board.current() & board.occupied(), board.current());
        assert_eq!(board.occupied().count_ones() as usize, board.plies());
    }

    #[test]
    fn rejects_bad_digits() {
        assert!(matches!(
            BitBoard::from_moves("12x"),
            Err(SolveError::InvalidMoveSequence(_))
        ));
        assert!(matches!(
            BitBoard::from_moves("108"),
            Err(SolveError::InvalidMoveSequence(_))
        ));
    }

    #[test]
    fn rejects_overfull_column() {
        assert!(BitBoard::from_moves("444444").is_ok());
        assert!(matches!(
            BitBoard::from_moves("4444444"),
            Err(SolveError::InvalidMoveSequence(_))
        ));
    }

    #[test]
    fn accepts_final_move_win_only() {
        // P1 completes a vertical four on the last character
        let board = BitBoard::from_moves("1212121").unwrap();
        assert!(board.last_mover_won());

        // the same win followed by another move is not a valid history
        assert!(matches!(
            BitBoard::from_moves("12121212"),
            Err(SolveError::InvalidMoveSequence(_))
        ));
    }

    #[test]
    fn detects_each_direction() {
        // horizontal on the bottom row
        assert!(BitBoard::from_moves("1727374").unwrap().last_mover_won());
        // vertical in column 2
        assert!(BitBoard::from_moves("2121212").unwrap().last_mover_won());
        // diagonal / rising from column 1
        assert!(BitBoard::from_moves("12243344374")
            .unwrap()
            .last_mover_won());
        // diagonal \ falling from column 4
        assert!(BitBoard::from_moves("76645544514")
            .unwrap()
            .last_mover_won());
    }

    #[test]
    fn winning_move_check_matches_replay() {
        let board = BitBoard::from_moves("112233").unwrap();
        assert!(board.check_winning_move(3));
        assert!(!board.check_winning_move(4));
    }

    #[test]
    fn key_is_order_independent() {
        // transpositions reach the same cells through different orders
        let a = BitBoard::from_moves("1234").unwrap();
        let b = BitBoard::from_moves("3214").unwrap();
        assert_eq!(a.key(), b.key());
    }
}
