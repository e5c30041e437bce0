//! Opening replies for the first two plies
//!
//! A full search of a near-empty board takes minutes, so the best reply for
//! every opening of at most two moves is kept as a table computed offline
//! with this same engine. Deeper positions always go through the search.

use crate::WIDTH;

// best reply (1-indexed) to each single opening move
const FIRST_PLY_REPLY: [usize; WIDTH] = [4, 3, 3, 3, 5, 5, 4];

// best reply (1-indexed) to each two-move opening, indexed [first][second]
const SECOND_PLY_REPLY: [[usize; WIDTH]; WIDTH] = [
    [4, 2, 3, 2, 4, 3, 4],
    [5, 5, 5, 4, 4, 4, 4],
    [4, 6, 4, 4, 3, 3, 3],
    [4, 6, 6, 4, 1, 6, 4],
    [5, 5, 3, 4, 4, 2, 4],
    [4, 4, 4, 4, 1, 3, 6],
    [4, 2, 4, 3, 6, 1, 4],
];

/// Looks up the stored best column (1-indexed) for a history of at most two
/// plies, `None` for anything deeper
///
/// The caller is expected to have validated the history already; unparseable
/// characters simply miss the book.
pub fn lookup(moves: &str) -> Option<usize> {
    let mut digits = moves
        .chars()
        .filter_map(|c| c.to_digit(10))
        .map(|d| d as usize)
        .filter(|&d| (1..=WIDTH).contains(&d));

    match moves.len() {
        0 => Some(4),
        1 => digits.next().map(|first| FIRST_PLY_REPLY[first - 1]),
        2 => {
            let first = digits.next()?;
            let second = digits.next()?;
            Some(SECOND_PLY_REPLY[first - 1][second - 1])
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_board_opens_in_the_centre() {
        assert_eq!(lookup(""), Some(4));
    }

    #[test]
    fn one_and_two_ply_hits() {
        assert_eq!(lookup("4"), Some(3));
        assert_eq!(lookup("1"), Some(4));
        assert_eq!(lookup("44"), Some(4));
        assert_eq!(lookup("45"), Some(1));
        assert_eq!(lookup("76"), Some(1));
    }

    #[test]
    fn deeper_histories_miss() {
        assert_eq!(lookup("445"), None);
        assert_eq!(lookup("1234567"), None);
    }
}
