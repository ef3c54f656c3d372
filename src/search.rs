use std::{fmt::Display, ops::ControlFlow};

use itertools::Itertools;
use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

use crate::{
    board::{neighbors_of, Board, BoardError, BoardKey, Coord, EMPTY},
    pqueue::PQueue,
};

pub const DEFAULT_MAX_ITERATIONS: usize = 10_000;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProblemError {
    #[error("start board is {start}×{start} but goal is {goal}×{goal}")]
    SideMismatch { start: usize, goal: usize },
    #[error("invalid start board: {0}")]
    InvalidStart(#[source] BoardError),
    #[error("invalid goal board: {0}")]
    InvalidGoal(#[source] BoardError),
    #[error("search reached a malformed board: {0}")]
    Malformed(#[from] BoardError),
}

/// A puzzle to solve: get from `start` to `goal`.
#[derive(Debug, Clone)]
pub struct Problem {
    start: Board,
    goal: Board,
    side: usize,
}

impl Problem {
    pub fn new(start: Board, goal: Board) -> Problem {
        let side = start.side();
        Problem { start, goal, side }
    }

    /// A problem whose goal is [`Board::solved`] for the start's size.
    pub fn to_solved(start: Board) -> Problem {
        let goal = match Board::solved(start.side()) {
            Ok(goal) => goal,
            // start already passed the same size checks
            Err(_) => start.clone(),
        };
        Problem::new(start, goal)
    }

    pub fn start(&self) -> &Board {
        &self.start
    }

    pub fn goal(&self) -> &Board {
        &self.goal
    }

    pub fn side(&self) -> usize {
        self.side
    }

    pub fn is_goal(&self, state: &Board) -> bool {
        state.key() == self.goal.key()
    }

    /// Both boards well-formed, the same size, and holding the same tiles.
    pub fn validate(&self) -> Result<(), ProblemError> {
        if self.goal.side() != self.side {
            return Err(ProblemError::SideMismatch {
                start: self.side,
                goal: self.goal.side(),
            });
        }
        self.start.validate().map_err(ProblemError::InvalidStart)?;
        self.goal.validate().map_err(ProblemError::InvalidGoal)?;
        Ok(())
    }
}

/// Where each tile sits on the goal board, indexed by tile value.
///
/// Built once per search from a validated goal, so every tile of a
/// validated start has an entry.
#[derive(Debug, Clone)]
pub struct GoalPositions {
    positions: Vec<Coord>,
}

impl GoalPositions {
    pub fn new(goal: &Board) -> GoalPositions {
        let side = goal.side();
        let mut positions = vec![Coord::new(0, 0); side * side];
        for (i, row) in goal.rows().enumerate() {
            for (j, &tile) in row.iter().enumerate() {
                if let Some(p) = positions.get_mut(tile as usize) {
                    *p = Coord::new(i, j);
                }
            }
        }
        GoalPositions { positions }
    }

    /// Sum of Manhattan distances of every tile from its goal cell.
    ///
    /// Never overestimates the number of moves left, and changes by at most
    /// one per move, which is what keeps A* optimal.
    ///
    /// # Panics
    ///
    /// If `board` holds a tile larger than any on the goal. Boards that pass
    /// [`Board::validate`] at the goal's size never do.
    pub fn manhattan(&self, board: &Board) -> u32 {
        board
            .rows()
            .enumerate()
            .flat_map(|(i, row)| {
                row.iter()
                    .enumerate()
                    .filter(|&(_, &tile)| tile != EMPTY)
                    .map(move |(j, &tile)| (Coord::new(i, j), tile))
            })
            .map(|(at, tile)| at.manhattan(self.positions[tile as usize]) as u32)
            .sum()
    }
}

/// Counters reported to the progress hook and returned with every result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchStats {
    /// Boards taken off the frontier and expanded.
    pub iterations: usize,
    /// Successor boards produced.
    pub generated: usize,
    pub peak_frontier: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Start already equals goal; nothing to do.
    Trivial,
    Solved { moves: usize },
    /// Every reachable board was expanded without meeting the goal.
    Exhausted,
    IterationLimit { limit: usize },
    Cancelled,
    Malformed(ProblemError),
}

impl Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Trivial => write!(f, "start already matches goal, not a real puzzle"),
            Outcome::Solved { moves: 1 } => write!(f, "solved in 1 move"),
            Outcome::Solved { moves } => write!(f, "solved in {} moves", moves),
            Outcome::Exhausted => write!(f, "no solution found: every reachable board explored"),
            Outcome::IterationLimit { limit } => {
                write!(f, "max iterations reached ({}) without a solution", limit)
            }
            Outcome::Cancelled => write!(f, "search cancelled"),
            Outcome::Malformed(e) => write!(f, "malformed problem: {}", e),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolveResult {
    pub outcome: Outcome,
    /// Cells to click, first to last: each is swapped with the empty cell.
    pub solution: Vec<Coord>,
    pub stats: SearchStats,
}

impl SolveResult {
    fn new(outcome: Outcome, stats: SearchStats) -> SolveResult {
        SolveResult {
            outcome,
            solution: Vec::new(),
            stats,
        }
    }

    pub fn success(&self) -> bool {
        matches!(self.outcome, Outcome::Trivial | Outcome::Solved { .. })
    }

    pub fn message(&self) -> String {
        self.outcome.to_string()
    }

    pub fn solution(&self) -> &[Coord] {
        &self.solution
    }
}

/// A* search over sliding-tile boards.
///
/// Holds configuration only; every call to [`Solver::solve`] gets fresh
/// bookkeeping.
#[derive(Debug, Clone, Copy)]
pub struct Solver {
    max_iterations: usize,
}

impl Default for Solver {
    fn default() -> Self {
        Solver {
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

impl Solver {
    pub fn new() -> Solver {
        Self::default()
    }

    pub fn with_max_iterations(self, max_iterations: usize) -> Solver {
        Solver { max_iterations }
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub fn solve(&self, problem: &Problem) -> SolveResult {
        self.solve_with(problem, |_| ControlFlow::Continue(()))
    }

    /// Like [`Solver::solve`], calling `on_iteration` after every expansion.
    /// Returning `ControlFlow::Break` stops the search with
    /// [`Outcome::Cancelled`].
    pub fn solve_with<F>(&self, problem: &Problem, on_iteration: F) -> SolveResult
    where
        F: FnMut(&SearchStats) -> ControlFlow<()>,
    {
        if let Err(e) = problem.validate() {
            return SolveResult::new(Outcome::Malformed(e), SearchStats::default());
        }

        if problem.is_goal(problem.start()) {
            return SolveResult::new(Outcome::Trivial, SearchStats::default());
        }

        Search::new(problem).run(self.max_iterations, on_iteration)
    }
}

/// Solves `problem` with the default [`Solver`].
pub fn solve(problem: &Problem) -> SolveResult {
    Solver::default().solve(problem)
}

fn same_board(a: &Board, b: &Board) -> bool {
    a.key() == b.key()
}

// Per-call bookkeeping; dropped when the call returns.
struct Search<'a> {
    problem: &'a Problem,
    goal_positions: GoalPositions,
    g_score: FxHashMap<BoardKey, u32>,
    parents: FxHashMap<BoardKey, Board>,
    closed: FxHashSet<BoardKey>,
    open: PQueue<Board>,
    stats: SearchStats,
}

impl<'a> Search<'a> {
    fn new(problem: &'a Problem) -> Search<'a> {
        Search {
            problem,
            goal_positions: GoalPositions::new(problem.goal()),
            g_score: FxHashMap::default(),
            parents: FxHashMap::default(),
            closed: FxHashSet::default(),
            open: PQueue::new(),
            stats: SearchStats::default(),
        }
    }

    fn run<F>(mut self, max_iterations: usize, mut on_iteration: F) -> SolveResult
    where
        F: FnMut(&SearchStats) -> ControlFlow<()>,
    {
        let start = self.problem.start().clone();
        let h = self.goal_positions.manhattan(&start);
        self.g_score.insert(start.key(), 0);
        self.open.enqueue(start, h, None);

        while self.stats.iterations < max_iterations {
            let Some(current) = self.open.dequeue() else {
                break;
            };

            if self.problem.is_goal(&current) {
                return self.finish(&current);
            }

            let current_key = current.key();
            self.closed.insert(current_key.clone());

            if let Ok(empty) = current.locate_empty() {
                let g = self.g_score.get(&current_key).copied().unwrap_or(0) + 1;

                for target in neighbors_of(empty, self.problem.side()) {
                    let next = current.apply_move(empty, target);
                    self.stats.generated += 1;

                    let next_key = next.key();
                    if self.closed.contains(&next_key) {
                        continue;
                    }

                    if self.problem.is_goal(&next) {
                        self.g_score.insert(next_key.clone(), g);
                        self.parents.insert(next_key, current.clone());
                        return self.finish(&next);
                    }

                    if self.g_score.get(&next_key).map_or(false, |&known| known <= g) {
                        continue;
                    }

                    self.g_score.insert(next_key.clone(), g);
                    self.parents.insert(next_key, current.clone());

                    let f = g + self.goal_positions.manhattan(&next);
                    match self.open.cost_of(&next, same_board) {
                        None => self.open.enqueue(next, f, Some(current.clone())),
                        Some(queued) if queued > f => {
                            let parent = Some(current.clone());
                            self.open.update_priority(&next, f, parent, same_board);
                        }
                        Some(_) => {}
                    }
                }

                self.stats.peak_frontier = self.stats.peak_frontier.max(self.open.len());
            }

            self.stats.iterations += 1;
            if on_iteration(&self.stats).is_break() {
                return SolveResult::new(Outcome::Cancelled, self.stats);
            }
        }

        let outcome = if self.open.is_empty() {
            Outcome::Exhausted
        } else {
            Outcome::IterationLimit {
                limit: max_iterations,
            }
        };
        SolveResult::new(outcome, self.stats)
    }

    fn finish(mut self, reached: &Board) -> SolveResult {
        match self.backtrack(reached) {
            Ok(solution) if solution.is_empty() => SolveResult::new(Outcome::Trivial, self.stats),
            Ok(solution) => SolveResult {
                outcome: Outcome::Solved {
                    moves: solution.len(),
                },
                solution,
                stats: self.stats,
            },
            Err(e) => SolveResult::new(Outcome::Malformed(e.into()), self.stats),
        }
    }

    /// Follows parent links from `reached` back to the start, collecting
    /// where the empty cell went at each step.
    fn backtrack(&mut self, reached: &Board) -> Result<Vec<Coord>, BoardError> {
        let start_key = self.problem.start().key();
        self.parents.remove(&start_key);

        let mut path = Vec::new();
        let mut board = reached;
        // a chain can't be longer than the number of links
        for _ in 0..=self.parents.len() {
            if board.key() == start_key {
                break;
            }
            let Some(parent) = self.parents.get(&board.key()) else {
                break;
            };
            path.push(board.locate_empty()?);
            board = parent;
        }

        path.reverse();
        Ok(path)
    }
}

/// Replays `moves` from `start`, swapping the empty cell with each
/// coordinate in turn. Fails if a move is not adjacent to the empty cell.
pub fn replay(start: &Board, moves: &[Coord]) -> Result<Board, BoardError> {
    moves.iter().try_fold(start.clone(), |board, &target| {
        let empty = board.locate_empty()?;
        if !neighbors_of(empty, board.side()).contains(&target) {
            return Err(BoardError::IllegalMove { target, empty });
        }
        Ok(board.apply_move(empty, target))
    })
}

/// Formats a move list as `(r, c) -> (r, c) -> ...`.
pub fn format_moves(moves: &[Coord]) -> String {
    moves.iter().join(" -> ")
}

#[cfg(test)]
mod test {
    use super::*;

    fn board(s: &str) -> Board {
        s.parse().unwrap()
    }

    fn to_solved(s: &str) -> Problem {
        Problem::to_solved(board(s))
    }

    #[test]
    fn heuristic_is_zero_at_goal() {
        let goal = Board::solved(4).unwrap();
        assert_eq!(GoalPositions::new(&goal).manhattan(&goal), 0);
    }

    #[test]
    fn heuristic_sums_tile_distances() {
        let goal = Board::solved(3).unwrap();
        let positions = GoalPositions::new(&goal);

        assert_eq!(positions.manhattan(&board("1 2 3\n5 0 6\n4 7 8")), 4);
        // the empty cell does not count
        assert_eq!(positions.manhattan(&board("1 2 3\n4 5 6\n7 0 8")), 1);
        assert_eq!(positions.manhattan(&board("8 6 7\n2 5 4\n3 0 1")), 21);
    }

    #[test]
    #[should_panic]
    fn heuristic_panics_on_tiles_the_goal_lacks() {
        let positions = GoalPositions::new(&Board::solved(2).unwrap());
        positions.manhattan(&board("9 1\n2 0"));
    }

    #[test]
    fn trivial_problem_does_no_work() {
        let result = solve(&to_solved("1 2\n3 0"));

        assert!(result.success());
        assert_eq!(result.outcome, Outcome::Trivial);
        assert!(result.message().contains("not a real puzzle"));
        assert!(result.solution().is_empty());
        assert_eq!(result.stats, SearchStats::default());
    }

    #[test]
    fn two_moves_in_exact_order() {
        let result = solve(&to_solved("1 2 3\n4 5 6\n0 7 8"));

        assert_eq!(result.outcome, Outcome::Solved { moves: 2 });
        assert_eq!(result.solution(), &[Coord::new(2, 1), Coord::new(2, 2)]);
        assert_eq!(result.message(), "solved in 2 moves");
    }

    #[test]
    fn one_move_found_on_first_expansion_is_not_trivial() {
        let result = solve(&to_solved("1 2 3\n4 5 6\n7 0 8"));

        assert_eq!(result.outcome, Outcome::Solved { moves: 1 });
        assert_eq!(result.solution(), &[Coord::new(2, 2)]);
        assert_eq!(result.stats.iterations, 0);
    }

    #[test]
    fn four_move_problem_matches_heuristic_bound() {
        let problem = to_solved("1 2 3\n5 0 6\n4 7 8");
        let result = solve(&problem);

        assert_eq!(result.outcome, Outcome::Solved { moves: 4 });
        assert_eq!(
            replay(problem.start(), result.solution()),
            Ok(problem.goal().clone())
        );
    }

    #[test]
    fn non_standard_goal() {
        let start = board("1 2 3\n4 5 6\n7 8 0");
        let goal = board("0 1 2\n3 4 5\n6 7 8");
        let problem = Problem::new(start.clone(), goal.clone());
        let result = solve(&problem);

        assert!(result.success());
        assert_eq!(replay(&start, result.solution()), Ok(goal));
    }

    #[test]
    fn unreachable_goal_exhausts_frontier() {
        let result = solve(&to_solved("2 1\n3 0"));

        assert!(!result.success());
        assert_eq!(result.outcome, Outcome::Exhausted);
        assert!(result.message().starts_with("no solution found"));
        assert!(result.stats.iterations < DEFAULT_MAX_ITERATIONS);
        assert!(result.solution().is_empty());
    }

    #[test]
    fn tiny_iteration_cap_gives_up() {
        let result = Solver::new()
            .with_max_iterations(1)
            .solve(&to_solved("1 2 3\n5 0 6\n4 7 8"));

        assert!(!result.success());
        assert_eq!(result.outcome, Outcome::IterationLimit { limit: 1 });
        assert!(result.message().contains("max iterations reached"));
        assert_eq!(result.stats.iterations, 1);
    }

    #[test]
    fn hook_can_cancel() {
        let mut calls = 0;
        let result = Solver::new().solve_with(&to_solved("1 2 3\n5 0 6\n4 7 8"), |stats| {
            calls += 1;
            assert_eq!(stats.iterations, calls);
            if calls == 2 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });

        assert_eq!(result.outcome, Outcome::Cancelled);
        assert_eq!(calls, 2);
        assert!(!result.success());
    }

    #[test]
    fn malformed_boards_fail_without_searching() {
        let no_empty = Problem::new(board("1 2\n3 4"), Board::solved(2).unwrap());
        let result = solve(&no_empty);
        assert!(!result.success());
        assert!(matches!(
            result.outcome,
            Outcome::Malformed(ProblemError::InvalidStart(BoardError::TileOutOfRange { .. }))
        ));

        let mismatch = Problem::new(Board::solved(2).unwrap(), Board::solved(3).unwrap());
        assert_eq!(
            solve(&mismatch).outcome,
            Outcome::Malformed(ProblemError::SideMismatch { start: 2, goal: 3 })
        );

        let bad_goal = Problem::new(board("1 2\n3 0"), board("1 1\n3 0"));
        let result = solve(&bad_goal);
        assert!(result.message().starts_with("malformed problem"));
        assert_eq!(result.stats.iterations, 0);
    }

    #[test]
    fn replay_rejects_non_adjacent_moves() {
        let start = Board::solved(3).unwrap();
        assert_eq!(
            replay(&start, &[Coord::new(0, 0)]),
            Err(BoardError::IllegalMove {
                target: Coord::new(0, 0),
                empty: Coord::new(2, 2)
            })
        );
        assert_eq!(
            replay(&start, &[Coord::new(2, 1)]),
            Ok(board("1 2 3\n4 5 6\n7 0 8"))
        );
    }

    #[test]
    fn format_moves_joins_coordinates() {
        assert_eq!(
            format_moves(&[Coord::new(2, 1), Coord::new(2, 2)]),
            "(2, 1) -> (2, 2)"
        );
    }
}
