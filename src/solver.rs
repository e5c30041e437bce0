//! The exact game tree search and the public solve entry points

use crate::bitboard::BitBoard;
use crate::book;
use crate::error::SolveError;
use crate::moves::{legal_columns, MoveSorter};
use crate::transposition_table::*;
use crate::{SIZE, WIDTH};

use rayon::prelude::*;

use std::cmp::Ordering;

/// The minimum possible score of a position
pub const MIN_SCORE: i32 = -(SIZE as i32) / 2 + 3;
/// The maximum possible score of a position
pub const MAX_SCORE: i32 = (SIZE as i32 + 1) / 2 - 3;

/// Caller-supplied limits for one solve call
///
/// `max_plies` bounds the total number of plies the engine will ever
/// consider, history included; it does not cut the search short of the
/// game's natural end. `max_nodes`, when set, aborts the search with
/// [`SolveError::ResourceExhausted`] instead of ever returning an unproven
/// score.
#[derive(Copy, Clone, Debug)]
pub struct SearchLimits {
    pub max_plies: usize,
    pub max_nodes: Option<usize>,
}

impl SearchLimits {
    pub fn new(max_plies: usize) -> Self {
        Self {
            max_plies,
            max_nodes: None,
        }
    }

    pub fn with_max_nodes(mut self, max_nodes: usize) -> Self {
        self.max_nodes = Some(max_nodes);
        self
    }
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self::new(SIZE)
    }
}

/// A solved position's outcome, counted in remaining plies under perfect play
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Evaluation {
    /// The side to move forces a win with its N-th ply from here
    WinIn(usize),
    /// The side to move loses on the opponent's N-th ply from here
    LossIn(usize),
    Draw,
}

impl Evaluation {
    /// Converts a search score into an outcome with its distance
    ///
    /// A score of s > 0 means the winner places their final stone as their
    /// (SIZE / 2 + 1 - s)-th of the game; the distance falls out of the number
    /// of stones they have already placed.
    pub fn from_score(score: i32, plies: usize) -> Self {
        match score.cmp(&0) {
            Ordering::Equal => Evaluation::Draw,
            Ordering::Greater => {
                let winner_moves = (SIZE / 2 + 1 - score as usize) - plies / 2;
                // the winner moves last
                Evaluation::WinIn(2 * winner_moves - 1)
            }
            Ordering::Less => {
                // the opponent has placed ceil(plies / 2) stones so far
                let winner_moves = (SIZE / 2 + 1) - (-score) as usize - (plies + 1) / 2;
                Evaluation::LossIn(2 * winner_moves)
            }
        }
    }
}

/// The result of a full-strength solve
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Solution {
    /// The optimal column, 1-indexed
    pub column: usize,
    /// Exact score of the position for the side to move
    pub score: i32,
    pub evaluation: Evaluation,
    /// Number of nodes searched to prove the result
    pub nodes: usize,
}

/// An agent to solve Connect 4 positions
///
/// # Notes
/// This agent uses a classical game tree search with various optimisations to
/// find the mathematically best move(s) in any position, thus 'solving' the
/// game.
///
/// # Position Scoring
/// A position is scored by how far a forced win is from the start of the game
/// for either player. If the first player wins with their final placed tile
/// (their 21st tile on a 7x6 board) the score is 1, or -1 if the second
/// player wins with their final tile. Earlier wins have scores further from
/// 0, up to 18/-18 where a player wins with their 4th tile. A drawn position
/// has a score of 0.
pub struct Solver<T: PositionTable = TranspositionTable> {
    board: BitBoard,

    /// The number of nodes searched by this `Solver` so far
    pub node_count: usize,
    table: T,
    table_enabled: bool,
    max_nodes: Option<usize>,
    aborted: bool,
}

impl Solver {
    /// Creates a new `Solver` for a position, with a fresh single-threaded
    /// transposition table
    pub fn new(board: BitBoard) -> Self {
        Self::with_table(board, TranspositionTable::new())
    }
}

impl<T: PositionTable> Solver<T> {
    /// Creates a new `Solver` with a caller-supplied transposition table
    ///
    /// The table is purely advisory, so reusing one across positions only
    /// saves recomputation; it never changes a result.
    pub fn with_table(board: BitBoard, table: T) -> Self {
        Self {
            board,
            node_count: 0,
            table,
            table_enabled: true,
            max_nodes: None,
            aborted: false,
        }
    }

    /// Disables the transposition table for this solver
    ///
    /// Search results are identical either way, only slower.
    pub fn without_table(mut self) -> Self {
        self.table_enabled = false;
        self
    }

    /// Aborts any search that visits more than `max_nodes` nodes
    pub fn with_node_limit(mut self, max_nodes: usize) -> Self {
        self.max_nodes = Some(max_nodes);
        self
    }

    pub fn board(&self) -> &BitBoard {
        &self.board
    }

    /// Performs game tree search
    ///
    /// Returns the score of the position (see [Position Scoring]) for the
    /// side to move. The position is threaded down by value, so sibling
    /// subtrees never observe each other's moves.
    ///
    /// [Position Scoring]: #position-scoring
    fn negamax(&mut self, board: BitBoard, mut alpha: i32, mut beta: i32) -> i32 {
        self.node_count += 1;
        if let Some(max_nodes) = self.max_nodes {
            if self.node_count > max_nodes {
                self.aborted = true;
                return alpha;
            }
        }

        // check for a next-move win for the current player before recursing
        for column in 0..WIDTH {
            if board.playable(column) && board.check_winning_move(column) {
                return ((SIZE + 1 - board.plies()) / 2) as i32;
            }
        }

        // look for moves that don't give the opponent a next turn win
        let non_losing_moves = board.non_losing_moves();
        if non_losing_moves == 0 {
            return -((SIZE - board.plies()) as i32) / 2;
        }

        // check for draw
        if board.plies() == SIZE {
            return 0;
        }

        let original_alpha = alpha;
        let key = board.key();

        // upper bound of the score given how many stones are already placed
        let mut max = ((SIZE - 1 - board.plies()) / 2) as i32;

        if self.table_enabled {
            let packed = self.table.get(key);
            if packed != 0 {
                let (score, bound) = unpack_entry(packed);
                match bound {
                    Bound::Exact => return score,
                    Bound::Lower => {
                        if alpha < score {
                            alpha = score;
                            if alpha >= beta {
                                // prune the exploration
                                return alpha;
                            }
                        }
                    }
                    Bound::Upper => {
                        if score < max {
                            max = score;
                        }
                    }
                }
            }
        }
        if beta > max {
            // clamp beta to the proven upper bound
            beta = max;
            if alpha >= beta {
                return beta;
            }
        }

        let moves = MoveSorter::from_non_losing_moves(&board, non_losing_moves);

        // search the next level of the tree
        for (move_bitmap, _column) in moves {
            let mut next = board;
            next.play(move_bitmap);
            // the search window is flipped for the other player
            let score = -self.negamax(next, -beta, -alpha);
            if self.aborted {
                return alpha;
            }
            // if a child node's score is better than beta, a perfect opponent
            // will not pick this branch; prune and save the lower bound
            if score >= beta {
                if self.table_enabled {
                    self.table.set(key, pack_entry(score, Bound::Lower));
                }
                return score;
            }
            if score > alpha {
                alpha = score;
            }
        }

        if self.table_enabled {
            let bound = if alpha > original_alpha {
                Bound::Exact
            } else {
                Bound::Upper
            };
            self.table.set(key, pack_entry(alpha, bound));
        }
        alpha
    }

    /// Performs a top-level search, keeping track of the best root move
    ///
    /// Returns the score of the position and the calculated best column.
    fn top_level_search(&mut self, mut alpha: i32, beta: i32) -> (i32, usize) {
        self.node_count += 1;

        // check for a win for the current player on this move
        for column in 0..WIDTH {
            if self.board.playable(column) && self.board.check_winning_move(column) {
                return (((SIZE + 1 - self.board.plies()) / 2) as i32, column);
            }
        }

        // look for moves that don't give the opponent a next turn win
        let non_losing_moves = self.board.non_losing_moves();
        if non_losing_moves == 0 {
            // all moves lose, return the first legal column
            let first = legal_columns(&self.board).next().unwrap_or(WIDTH);
            return (-((SIZE - self.board.plies()) as i32) / 2, first);
        }

        // check for draw
        if self.board.plies() == SIZE {
            return (0, WIDTH);
        }

        let moves = MoveSorter::from_non_losing_moves(&self.board, non_losing_moves);

        // search the next level of the tree and keep track of the best move
        let mut best_score = MIN_SCORE - 1;
        let mut best_move = WIDTH;
        for (move_bitmap, column) in moves {
            let mut next = self.board;
            next.play(move_bitmap);
            // the search window is flipped for the other player
            let score = -self.negamax(next, -beta, -alpha);
            if self.aborted {
                return (alpha, best_move);
            }
            if score > best_score {
                best_score = score;
                best_move = column;
            }
            // if the actual score is better than beta, the other player will
            // not pick this branch
            if score >= beta {
                return (score, column);
            }
            if score > alpha {
                alpha = score;
            }
        }

        (alpha, best_move)
    }

    /// Calculates the exact score and best column of the current position
    ///
    /// The search always runs to the game's natural end; the deepening is in
    /// the score window, not the depth. Each iteration runs a null-window
    /// search `[mid, mid + 1]` that only answers "is the true score above
    /// mid?", binary-searching the score without re-exploring pruned
    /// subtrees.
    pub fn solve(&mut self) -> Result<(i32, usize), SolveError> {
        self.aborted = false;

        let mut min = -((SIZE - self.board.plies()) as i32) / 2;
        let mut max = (SIZE + 1 - self.board.plies()) as i32 / 2;

        let mut next_move = legal_columns(&self.board).next().unwrap_or(WIDTH);
        // iteratively narrow the window around the true score
        while min < max {
            let mut mid = min + (max - min) / 2;
            // probe near zero first, so decided games resolve on the cheap side
            if mid <= 0 && min / 2 < mid {
                mid = min / 2
            } else if mid >= 0 && max / 2 > mid {
                mid = max / 2
            }

            // null-window test: is the actual score greater than mid?
            let (r, best_move) = self.top_level_search(mid, mid + 1);
            if self.aborted {
                return Err(SolveError::ResourceExhausted {
                    nodes: self.node_count,
                });
            }
            next_move = best_move;

            // r is not necessarily the exact true score, but its value
            // indicates which side of the probe the true score lies on
            if r <= mid {
                max = r;
            } else {
                min = r;
            }
        }
        // min and max have met at the true score
        Ok((min, next_move))
    }
}

// validation shared by every solve entry point
fn prepare(moves: &str, limits: &SearchLimits) -> Result<BitBoard, SolveError> {
    let board = BitBoard::from_moves(moves)?;
    if board.plies() > limits.max_plies {
        return Err(SolveError::BudgetExceeded {
            budget: limits.max_plies,
            played: board.plies(),
        });
    }
    if board.last_mover_won() {
        return Err(SolveError::InvalidMoveSequence(
            "the game is already decided".into(),
        ));
    }
    if board.is_full() {
        return Err(SolveError::BoardFull);
    }
    Ok(board)
}

fn build_solution(score: i32, column: usize, plies: usize, nodes: usize) -> Solution {
    Solution {
        column: column + 1,
        score,
        evaluation: Evaluation::from_score(score, plies),
        nodes,
    }
}

/// Solves a move history exactly, returning the best column and score
///
/// The history is a string of 1-indexed column digits from the empty board.
/// Fails with [`SolveError::InvalidMoveSequence`] on a malformed or decided
/// history, [`SolveError::BudgetExceeded`] when the history is already longer
/// than `limits.max_plies`, [`SolveError::BoardFull`] on a drawn full board
/// and [`SolveError::ResourceExhausted`] when a node limit ran out.
pub fn evaluate(moves: &str, limits: SearchLimits) -> Result<Solution, SolveError> {
    let board = prepare(moves, &limits)?;

    let mut solver = Solver::new(board);
    if let Some(max_nodes) = limits.max_nodes {
        solver = solver.with_node_limit(max_nodes);
    }
    let (score, column) = solver.solve()?;
    Ok(build_solution(score, column, board.plies(), solver.node_count))
}

/// Picks the best column (1-indexed) for a move history
///
/// Same validation as [`evaluate`], plus three shortcuts that skip the
/// search: the opening book for histories of at most two plies, a forced
/// move when only one column remains open, and any move that wins on the
/// spot.
pub fn best_column(moves: &str, limits: SearchLimits) -> Result<usize, SolveError> {
    let board = prepare(moves, &limits)?;

    if let Some(column) = book::lookup(moves) {
        return Ok(column);
    }

    // forced move: exactly one open column left
    let mut open = legal_columns(&board);
    if let (Some(only), None) = (open.next(), open.next()) {
        return Ok(only + 1);
    }

    // a one-ply win never needs the full search
    for column in 0..WIDTH {
        if board.playable(column) && board.check_winning_move(column) {
            return Ok(column + 1);
        }
    }

    let mut solver = Solver::new(board);
    if let Some(max_nodes) = limits.max_nodes {
        solver = solver.with_node_limit(max_nodes);
    }
    let (_score, column) = solver.solve()?;
    Ok(column + 1)
}

/// Solves a history with the root's children searched in parallel
///
/// Each legal root move is scored by an independent solver on its own
/// snapshot of the position; the workers share one atomic transposition
/// table as an advisory cache. The chosen column is deterministic, the
/// first of the maximal scores in centre-out candidate order, which can
/// differ from the sequential [`evaluate`] pick when several moves share
/// the best score.
pub fn evaluate_parallel(moves: &str, limits: SearchLimits) -> Result<Solution, SolveError> {
    let board = prepare(moves, &limits)?;

    // a one-ply win short-circuits before any child search starts
    for column in 0..WIDTH {
        if board.playable(column) && board.check_winning_move(column) {
            let score = ((SIZE + 1 - board.plies()) / 2) as i32;
            return Ok(build_solution(score, column, board.plies(), 1));
        }
    }

    let table = SharedTranspositionTable::new();
    let candidates: Vec<usize> = legal_columns(&board).collect();

    let scored: Result<Vec<(i32, usize, usize)>, SolveError> = candidates
        .par_iter()
        .map(|&column| {
            let mut child = board;
            child.play_column(column);

            let mut solver = Solver::with_table(child, table.clone());
            if let Some(max_nodes) = limits.max_nodes {
                solver = solver.with_node_limit(max_nodes);
            }
            let (child_score, _) = solver.solve()?;
            Ok((-child_score, column, solver.node_count))
        })
        .collect();
    let scored = scored?;

    // candidates are centre-out, so the strict comparison keeps the
    // heuristic tie-break deterministic
    let mut best = scored[0];
    for &entry in &scored[1..] {
        if entry.0 > best.0 {
            best = entry;
        }
    }
    let nodes = scored.iter().map(|&(_, _, n)| n).sum();
    Ok(build_solution(best.0, best.1, board.plies(), nodes))
}
