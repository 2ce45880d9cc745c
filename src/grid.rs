use std::str::FromStr;

use ndarray::Array2;
use strum::{FromRepr, VariantArray};
use thiserror::Error;

pub(crate) type Coord = usize;

/// A position `(row, col)` on the grid. The top left corner is `Location(0, 0)`.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Location(pub Coord, pub Coord);

impl Location {
    pub(crate) fn as_index(&self) -> (Coord, Coord) {
        (self.0, self.1)
    }

    pub(crate) fn offset_by(self, rhs: (isize, isize)) -> Self {
        Self(self.0.wrapping_add_signed(rhs.0), self.1.wrapping_add_signed(rhs.1))
    }

    pub(crate) fn in_bounds(&self, n: usize) -> bool {
        // underflow wraps to a huge coordinate and fails here
        self.0 < n && self.1 < n
    }

    pub(crate) fn distance_squared(&self, other: Location) -> i64 {
        let dr = self.0 as i64 - other.0 as i64;
        let dc = self.1 as i64 - other.1 as i64;
        dr * dr + dc * dc
    }
}

/// One step in the 4-neighborhood of a cell.
#[derive(Copy, Clone, VariantArray, Eq, PartialEq, Hash, Debug, Ord, PartialOrd)]
pub(crate) enum Step {
    Up,
    Down,
    Left,
    Right,
}

impl Step {
    /// The two steps along a row; a "horizontal" pipe has its live neighbors here.
    pub(crate) const ALONG_ROW: [Self; 2] = [Self::Left, Self::Right];
    /// The two steps along a column.
    pub(crate) const ALONG_COLUMN: [Self; 2] = [Self::Up, Self::Down];

    /// Attempt the step from `location` in the direction specified by `self`.
    /// The result may be out of bounds; check with [`Location::in_bounds`].
    pub(crate) fn attempt_from(&self, location: Location) -> Location {
        match self {
            Self::Up => location.offset_by((-1, 0)),
            Self::Down => location.offset_by((1, 0)),
            Self::Left => location.offset_by((0, -1)),
            Self::Right => location.offset_by((0, 1)),
        }
    }
}

/// The fixed contents of one grid cell, as encoded in instance text.
#[derive(Copy, Clone, Debug, Default, Eq, FromRepr, Hash, PartialEq)]
#[repr(u8)]
pub enum CellKind {
    /// Nothing here yet; the cell may carry a pipe segment.
    #[default]
    Empty = 0,
    /// A water origin. Always flowing, never costed.
    Source = 1,
    /// A fixed consumer, dry unless a connected sprinkler covers it.
    Plant = 2,
}

/// Reasons an instance is rejected before any network construction happens.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ValidationError {
    /// The instance text ended before the header and grid were complete.
    #[error("instance text ended early")]
    Truncated,
    /// A token in the instance text is not an integer.
    #[error("expected an integer, found {0:?}")]
    BadToken(String),
    /// A cell code other than 0 (empty), 1 (source), or 2 (plant).
    #[error("unrecognized cell code {code} at ({row}, {col})")]
    BadCellCode {
        /// The offending code, as read.
        code: i64,
        /// Row of the offending cell.
        row: usize,
        /// Column of the offending cell.
        col: usize,
    },
    /// The cell grid does not have the `n`×`n` shape the header promises.
    #[error("grid is {rows}x{cols}, expected {n}x{n}")]
    BadDimensions {
        /// Rows actually present.
        rows: usize,
        /// Columns actually present.
        cols: usize,
        /// Grid size from the header.
        n: usize,
    },
}

/// One problem instance: the grid and the pricing of hardware placed on it.
///
/// Parse one from text with [`FromStr`], or assemble one from typed cells with
/// [`Instance::new`] / raw codes with [`Instance::from_codes`]. Solve it with
/// [`Instance::solve`](crate::Instance::solve).
#[derive(Clone, Debug, PartialEq)]
pub struct Instance {
    pub(crate) n: usize,
    pub(crate) connector_cost: i64,
    pub(crate) pipe_cost: i64,
    pub(crate) sprinkler_cost: i64,
    pub(crate) radius: i64,
    pub(crate) cells: Array2<CellKind>,
}

impl Instance {
    /// Assemble an instance from an already-typed cell grid.
    ///
    /// Fails with [`ValidationError::BadDimensions`] if `cells` is not `n`×`n`.
    pub fn new(
        n: usize,
        connector_cost: i64,
        pipe_cost: i64,
        sprinkler_cost: i64,
        radius: i64,
        cells: Array2<CellKind>,
    ) -> Result<Self, ValidationError> {
        if cells.dim() != (n, n) {
            return Err(ValidationError::BadDimensions {
                rows: cells.nrows(),
                cols: cells.ncols(),
                n,
            });
        }

        Ok(Self {
            n,
            connector_cost,
            pipe_cost,
            sprinkler_cost,
            radius,
            cells,
        })
    }

    /// Assemble an instance from raw cell codes in row-major order.
    pub fn from_codes(
        n: usize,
        connector_cost: i64,
        pipe_cost: i64,
        sprinkler_cost: i64,
        radius: i64,
        codes: &[u8],
    ) -> Result<Self, ValidationError> {
        let typed = codes
            .iter()
            .enumerate()
            .map(|(i, &code)| {
                CellKind::from_repr(code).ok_or(ValidationError::BadCellCode {
                    code: code as i64,
                    row: i / n,
                    col: i % n,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let cells = Array2::from_shape_vec((n, n), typed).map_err(|_| {
            ValidationError::BadDimensions {
                rows: codes.len() / n.max(1),
                cols: n,
                n,
            }
        })?;

        Self::new(n, connector_cost, pipe_cost, sprinkler_cost, radius, cells)
    }

    /// Grid size `N`.
    pub fn n(&self) -> usize {
        self.n
    }

    /// The typed cell grid.
    pub fn cells(&self) -> &Array2<CellKind> {
        &self.cells
    }

    pub(crate) fn kind_at(&self, location: Location) -> Option<CellKind> {
        if !location.in_bounds(self.n) {
            return None;
        }
        self.cells.get(location.as_index()).copied()
    }

    /// A sprinkler at `pipe` reaches `plant` within the squared spray radius.
    pub(crate) fn covers(&self, pipe: Location, plant: Location) -> bool {
        pipe.distance_squared(plant) <= self.radius * self.radius
    }

    /// Penalty per dry plant; dominates any feasible hardware cost.
    pub(crate) fn dry_penalty(&self) -> i64 {
        (self.n * self.n) as i64
    }
}

impl FromStr for Instance {
    type Err = ValidationError;

    /// Reads the five-integer header `N C P T Z` followed by `N`×`N` cell
    /// codes in row-major order, all whitespace-separated.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut tokens = s.split_whitespace();
        let mut next_int = || -> Result<i64, ValidationError> {
            let token = tokens.next().ok_or(ValidationError::Truncated)?;
            token
                .parse()
                .map_err(|_| ValidationError::BadToken(token.to_owned()))
        };

        let n = next_int()?;
        if n < 0 {
            return Err(ValidationError::BadToken(n.to_string()));
        }
        let n = n as usize;

        let connector_cost = next_int()?;
        let pipe_cost = next_int()?;
        let sprinkler_cost = next_int()?;
        let radius = next_int()?;

        let mut cells = Array2::from_elem((n, n), CellKind::Empty);
        for row in 0..n {
            for col in 0..n {
                let code = next_int()?;
                let kind = u8::try_from(code)
                    .ok()
                    .and_then(CellKind::from_repr)
                    .ok_or(ValidationError::BadCellCode { code, row, col })?;
                cells[(row, col)] = kind;
            }
        }

        Self::new(n, connector_cost, pipe_cost, sprinkler_cost, radius, cells)
    }
}
