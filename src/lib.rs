//! A* solver for N×N sliding-tile puzzles.
//!
//! Build a [`Problem`] from a start and goal [`Board`] and hand it to
//! [`solve`] (or a configured [`Solver`]). The result says whether a
//! solution was found and, if so, which cells to click in order.

pub mod board;
pub mod pqueue;
pub mod search;

pub use board::{neighbors_of, Board, BoardError, BoardKey, Coord, EMPTY};
pub use pqueue::{PQueue, QueueItem};
pub use search::{
    format_moves, replay, solve, GoalPositions, Outcome, Problem, ProblemError, SearchStats,
    SolveResult, Solver, DEFAULT_MAX_ITERATIONS,
};
