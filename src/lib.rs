//! A perfect-play solving engine for the board game 'Connect 4'
//!
//! Given the full move history of a game, the engine computes the
//! mathematically optimal next column (and the exact outcome score under
//! perfect play by both sides) using an optimised game tree search.
//!
//! # Basic Usage
//!
//! ```
//! use connect4_solver::{evaluate, SearchLimits};
//!
//!# use std::error::Error;
//!# fn main() -> Result<(), Box<dyn Error>> {
//! let solution = evaluate("112233", SearchLimits::default())?;
//!
//! assert_eq!((solution.score, solution.column), (18, 4));
//!# Ok(())
//!# }
//! ```

use static_assertions::*;

pub mod error;

pub mod bitboard;

pub mod moves;

pub mod transposition_table;

pub mod book;

pub mod solver;

pub mod snapshot;


pub use crate::bitboard::BitBoard;
pub use crate::error::SolveError;
pub use crate::snapshot::Snapshot;
pub use crate::solver::{
    best_column, evaluate, evaluate_parallel, Evaluation, SearchLimits, Solution, Solver,
};
pub use crate::transposition_table::{SharedTranspositionTable, TranspositionTable};

/// The width of the game board in tiles
pub const WIDTH: usize = 7;

/// The height of the game board in tiles
pub const HEIGHT: usize = 6;

/// The number of playable cells on the board
pub const SIZE: usize = WIDTH * HEIGHT;

// ensure that the given dimensions fit in a u64 for the bitboard representation
const_assert!(WIDTH * (HEIGHT + 1) < 64);
