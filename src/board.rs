use std::{
    fmt::{Display, Write},
    hash::{Hash, Hasher},
    ops::Index,
    str::FromStr,
};

use itertools::Itertools;
use smallvec::SmallVec;
use thiserror::Error;

/// The value stored in the empty cell.
pub const EMPTY: u8 = 0;

/// Largest supported side; every tile of a 15×15 board still fits in a `u8`.
pub const MAX_SIDE: usize = 15;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BoardError {
    #[error("board has no rows")]
    Empty,
    #[error("board is not square: row {row} has {len} cells, expected {side}")]
    NotSquare { row: usize, len: usize, side: usize },
    #[error("board side {0} exceeds the maximum of 15")]
    TooLarge(usize),
    #[error("invalid tile {0:?}")]
    InvalidTile(String),
    #[error("malformed board: no empty cell")]
    MissingEmpty,
    #[error("malformed board: {0} empty cells")]
    ExtraEmpty(usize),
    #[error("malformed board: tile {0} appears more than once")]
    DuplicateTile(u8),
    #[error("malformed board: tile {tile} out of range 1..={max}")]
    TileOutOfRange { tile: u8, max: usize },
    #[error("illegal move: {target} is not next to the empty cell at {empty}")]
    IllegalMove { target: Coord, empty: Coord },
}

/// A cell position on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Coord {
    pub row: usize,
    pub col: usize,
}

impl Coord {
    pub const fn new(row: usize, col: usize) -> Coord {
        Coord { row, col }
    }

    pub fn manhattan(self, other: Coord) -> usize {
        self.row.abs_diff(other.row) + self.col.abs_diff(other.col)
    }
}

impl From<(usize, usize)> for Coord {
    fn from((row, col): (usize, usize)) -> Coord {
        Coord { row, col }
    }
}

impl Display for Coord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Canonical comparison key of a board: the side followed by the cells in
/// row-major order. Stays inline for boards up to 4×4.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BoardKey(SmallVec<[u8; 17]>);

/// An immutable N×N puzzle state. Moves produce new boards.
///
/// Equality and hashing go through [`Board::key`], so two boards built
/// independently from the same tiles are the same state.
#[derive(Debug, Clone)]
pub struct Board {
    side: usize,
    cells: Vec<u8>,
}

impl Board {
    /// Builds a board from rows. Only the shape is checked; use
    /// [`Board::validate`] to check the tiles.
    pub fn from_rows(rows: Vec<Vec<u8>>) -> Result<Board, BoardError> {
        let side = rows.len();
        if side == 0 {
            return Err(BoardError::Empty);
        }
        if side > MAX_SIDE {
            return Err(BoardError::TooLarge(side));
        }

        for (row, r) in rows.iter().enumerate() {
            if r.len() != side {
                return Err(BoardError::NotSquare {
                    row,
                    len: r.len(),
                    side,
                });
            }
        }

        Ok(Board {
            side,
            cells: rows.into_iter().flatten().collect(),
        })
    }

    /// The conventional goal: tiles in order with the empty cell last.
    pub fn solved(side: usize) -> Result<Board, BoardError> {
        if side == 0 {
            return Err(BoardError::Empty);
        }
        if side > MAX_SIDE {
            return Err(BoardError::TooLarge(side));
        }

        let n = side * side;
        let cells = (1..n).map(|v| v as u8).chain([EMPTY]).collect();
        Ok(Board { side, cells })
    }

    pub fn side(&self) -> usize {
        self.side
    }

    pub fn rows(&self) -> impl Iterator<Item = &[u8]> {
        self.cells.chunks(self.side)
    }

    /// Checks there is exactly one empty cell and the other cells hold
    /// `1..N²-1` exactly once each.
    pub fn validate(&self) -> Result<(), BoardError> {
        let max = self.cells.len() - 1;
        let mut seen = vec![false; self.cells.len()];
        let mut empties = 0;

        for &c in &self.cells {
            if c == EMPTY {
                empties += 1;
                continue;
            }

            let v = c as usize;
            if v > max {
                return Err(BoardError::TileOutOfRange { tile: c, max });
            }
            if seen[v] {
                return Err(BoardError::DuplicateTile(c));
            }
            seen[v] = true;
        }

        match empties {
            0 => Err(BoardError::MissingEmpty),
            1 => Ok(()),
            n => Err(BoardError::ExtraEmpty(n)),
        }
    }

    pub fn key(&self) -> BoardKey {
        let mut key = SmallVec::with_capacity(self.cells.len() + 1);
        key.push(self.side as u8);
        key.extend_from_slice(&self.cells);
        BoardKey(key)
    }

    /// Row-major text form, e.g. `1,2,3/4,5,6/7,8,0`. Parses back with
    /// [`FromStr`].
    pub fn serialize(&self) -> String {
        self.rows().map(|row| row.iter().join(",")).join("/")
    }

    pub fn locate_empty(&self) -> Result<Coord, BoardError> {
        self.cells
            .iter()
            .position(|&c| c == EMPTY)
            .map(|ix| Coord::new(ix / self.side, ix % self.side))
            .ok_or(BoardError::MissingEmpty)
    }

    /// Returns a new board with the cells at `empty` and `target` swapped.
    ///
    /// # Panics
    ///
    /// If either coordinate is off the board. [`crate::replay`] is the
    /// checked way to apply untrusted moves.
    pub fn apply_move(&self, empty: Coord, target: Coord) -> Board {
        assert!(
            self.contains(empty) && self.contains(target),
            "move {} -> {} is off a {}×{} board",
            empty,
            target,
            self.side,
            self.side
        );
        let mut next = self.clone();
        next.cells.swap(self.offset(empty), self.offset(target));
        next
    }

    /// Whether `goal` can be reached from this board by sliding tiles.
    ///
    /// A move is a transposition of the empty cell with a neighbour, so the
    /// parity of the cell permutation must match the parity of the empty
    /// cell's taxicab distance.
    pub fn can_reach(&self, goal: &Board) -> bool {
        if self.side != goal.side {
            return false;
        }

        let mut goal_ix = vec![usize::MAX; 256];
        for (ix, &c) in goal.cells.iter().enumerate() {
            goal_ix[c as usize] = ix;
        }

        let perm: Option<Vec<usize>> = self
            .cells
            .iter()
            .map(|&c| Some(goal_ix[c as usize]).filter(|&ix| ix != usize::MAX))
            .collect();
        let Some(perm) = perm else {
            return false;
        };

        let mut visited = vec![false; perm.len()];
        let mut transpositions = 0;
        for start in 0..perm.len() {
            let mut ix = start;
            let mut len: usize = 0;
            while !visited[ix] {
                visited[ix] = true;
                ix = perm[ix];
                len += 1;
            }
            transpositions += len.saturating_sub(1);
        }

        match (self.locate_empty(), goal.locate_empty()) {
            (Ok(a), Ok(b)) => transpositions % 2 == a.manhattan(b) % 2,
            _ => false,
        }
    }

    pub fn contains(&self, c: Coord) -> bool {
        c.row < self.side && c.col < self.side
    }

    fn offset(&self, c: Coord) -> usize {
        c.row * self.side + c.col
    }
}

/// The in-bounds orthogonal neighbours of `c`, always in the order
/// right, left, down, up.
pub fn neighbors_of(c: Coord, side: usize) -> SmallVec<[Coord; 4]> {
    let mut out = SmallVec::new();
    for &(di, dj) in DELTAS {
        let row = c.row as isize + di;
        let col = c.col as isize + dj;
        if (0..side as isize).contains(&row) && (0..side as isize).contains(&col) {
            out.push(Coord::new(row as usize, col as usize));
        }
    }
    out
}

const DELTAS: &[(isize, isize)] = &[(0, 1), (0, -1), (1, 0), (-1, 0)];

impl PartialEq for Board {
    fn eq(&self, other: &Board) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Board {}

impl Hash for Board {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state)
    }
}

impl Index<Coord> for Board {
    type Output = u8;
    fn index(&self, index: Coord) -> &Self::Output {
        &self.cells[self.offset(index)]
    }
}

impl Display for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let width = (self.cells.len() - 1).to_string().len();
        let mut first = true;
        for row in self.rows() {
            if !first {
                f.write_char('\n')?;
            } else {
                first = false;
            }

            for (j, &c) in row.iter().enumerate() {
                if j > 0 {
                    f.write_char(' ')?;
                }
                if c == EMPTY {
                    write!(f, "{:>width$}", "_")?;
                } else {
                    write!(f, "{:>width$}", c)?;
                }
            }
        }

        Ok(())
    }
}

#[auto_enums::auto_enum(Iterator)]
fn split_rows(text: &str) -> impl Iterator<Item = &str> {
    if text.contains('/') {
        text.split('/')
    } else {
        text.lines()
    }
}

impl FromStr for Board {
    type Err = BoardError;

    fn from_str(s: &str) -> Result<Board, BoardError> {
        let rows = split_rows(s.trim())
            .map(str::trim)
            .filter(|row| !row.is_empty())
            .map(|row| {
                row.split(|c: char| c == ',' || c.is_whitespace())
                    .filter(|cell| !cell.is_empty())
                    .map(|cell| match cell {
                        "_" | "." => Ok(EMPTY),
                        _ => cell
                            .parse::<u8>()
                            .map_err(|_| BoardError::InvalidTile(cell.to_string())),
                    })
                    .collect::<Result<Vec<u8>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;

        Board::from_rows(rows)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn board(s: &str) -> Board {
        s.parse().unwrap()
    }

    #[test]
    fn independently_built_boards_are_equal() {
        let a = board("1 2 3\n4 5 6\n7 8 0");
        let b = Board::from_rows(vec![vec![1, 2, 3], vec![4, 5, 6], vec![7, 8, 0]]).unwrap();
        let c = Board::solved(3).unwrap();

        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(a.key(), c.key());
        assert_eq!(a.serialize(), c.serialize());
    }

    #[test]
    fn one_cell_difference_is_unequal() {
        let a = board("1 2 3\n4 5 6\n7 8 0");
        let b = board("1 2 3\n4 5 6\n7 0 8");

        assert_ne!(a, b);
        assert_ne!(a.key(), b.key());
    }

    #[test]
    fn serialize_round_trips_through_parse() {
        let a = board("8 6 7\n2 5 4\n3 0 1");
        assert_eq!(a.serialize(), "8,6,7/2,5,4/3,0,1");
        assert_eq!(board(&a.serialize()), a);
        assert_eq!(board(&a.to_string()), a);
    }

    #[test]
    fn parse_accepts_placeholders_for_empty() {
        assert_eq!(board("1 2\n3 _"), board("1,2/3,0"));
        assert_eq!(board("1 2\n3 ."), Board::solved(2).unwrap());
    }

    #[test]
    fn parse_rejects_bad_shapes_and_tiles() {
        assert_eq!("".parse::<Board>(), Err(BoardError::Empty));
        assert_eq!(
            "1 2 3\n4 0".parse::<Board>(),
            Err(BoardError::NotSquare {
                row: 0,
                len: 3,
                side: 2
            })
        );
        assert_eq!(
            "1 x\n3 0".parse::<Board>(),
            Err(BoardError::InvalidTile("x".to_string()))
        );
    }

    #[test]
    fn validate_catches_malformed_tiles() {
        assert_eq!(board("1 2\n3 0").validate(), Ok(()));
        assert_eq!(
            board("1 2\n3 4").validate(),
            Err(BoardError::TileOutOfRange { tile: 4, max: 3 })
        );
        assert_eq!(board("1 2\n2 0").validate(), Err(BoardError::DuplicateTile(2)));
        assert_eq!(board("1 0\n3 0").validate(), Err(BoardError::ExtraEmpty(2)));
        assert_eq!(board("1 2\n3 1").validate(), Err(BoardError::DuplicateTile(1)));
    }

    #[test]
    fn locate_empty_finds_sentinel() {
        assert_eq!(board("1 2 3\n4 0 6\n7 8 5").locate_empty(), Ok(Coord::new(1, 1)));
        assert_eq!(board("1 2\n3 4").locate_empty(), Err(BoardError::MissingEmpty));
    }

    #[test]
    fn neighbors_stay_in_bounds_in_fixed_order() {
        let corner = neighbors_of(Coord::new(0, 0), 3);
        assert_eq!(corner.as_slice(), &[Coord::new(0, 1), Coord::new(1, 0)]);

        let centre = neighbors_of(Coord::new(1, 1), 3);
        assert_eq!(
            centre.as_slice(),
            &[
                Coord::new(1, 2),
                Coord::new(1, 0),
                Coord::new(2, 1),
                Coord::new(0, 1)
            ]
        );

        assert!(neighbors_of(Coord::new(0, 0), 1).is_empty());
    }

    #[test]
    fn apply_move_leaves_original_untouched() {
        let before = board("1 2 3\n4 5 6\n7 8 0");
        let after = before.apply_move(Coord::new(2, 2), Coord::new(2, 1));

        assert_eq!(before, Board::solved(3).unwrap());
        assert_eq!(after, board("1 2 3\n4 5 6\n7 0 8"));
        assert_eq!(after[Coord::new(2, 2)], 8);
    }

    #[test]
    #[should_panic(expected = "off a 3×3 board")]
    fn apply_move_rejects_columns_past_the_edge() {
        // (0, 5) would otherwise alias cell (1, 2)
        Board::solved(3)
            .unwrap()
            .apply_move(Coord::new(2, 2), Coord::new(0, 5));
    }

    #[test]
    fn contains_checks_both_axes() {
        let b = Board::solved(3).unwrap();
        assert!(b.contains(Coord::new(2, 2)));
        assert!(!b.contains(Coord::new(0, 3)));
        assert!(!b.contains(Coord::new(3, 0)));
    }

    #[test]
    fn reachability_parity() {
        let goal = Board::solved(3).unwrap();
        assert!(board("1 2 3\n4 5 6\n7 0 8").can_reach(&goal));
        assert!(board("8 6 7\n2 5 4\n3 0 1").can_reach(&goal));
        assert!(!board("2 1 3\n4 5 6\n7 8 0").can_reach(&goal));

        let goal = Board::solved(4).unwrap();
        assert!(!board("1 2 3 4\n5 6 7 8\n9 10 11 12\n13 15 14 0").can_reach(&goal));
        assert!(board("1 2 3 4\n5 6 7 8\n9 10 11 12\n13 14 0 15").can_reach(&goal));
    }
}
