use thiserror::Error;

/// Failures surfaced by the solving engine
///
/// All of these are deterministic functions of their inputs, so retrying a
/// failed call with the same arguments will fail again. Only
/// [`ResourceExhausted`](SolveError::ResourceExhausted) can succeed on a
/// retry with a larger budget.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SolveError {
    /// The move history is malformed, plays into a full column, or continues
    /// after the game was already decided
    #[error("invalid move sequence: {0}")]
    InvalidMoveSequence(String),

    /// The supplied history already contains more plies than the caller's
    /// budget allows
    #[error("ply budget of {budget} exceeded, history already has {played} moves")]
    BudgetExceeded { budget: usize, played: usize },

    /// The node budget ran out before an exact result was proven
    #[error("search budget exhausted after {nodes} nodes")]
    ResourceExhausted { nodes: usize },

    /// No playable column remains
    #[error("no playable column remains")]
    BoardFull,
}
