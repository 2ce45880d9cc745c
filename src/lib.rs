#![warn(missing_docs)]

//! # `rill`
//!
//! A designer for minimum-cost irrigation networks on an N×N grid of water
//! sources, plants, and empty cells. Parse or assemble an [`Instance`], then
//! call [`Instance::solve`] to obtain a [`Solved`] design: which empty cells
//! carry a pipe segment, which pipe cells host a sprinkler, and the certified
//! minimal cost (pipe + sprinkler + connector hardware, plus an N² penalty
//! per plant left dry).
//!
//! # Internals
//! This crate works by expressing the problem as an integer linear program,
//! solving it to proven optimality, and reading the variable values back into
//! a grid. There are no heuristics and no partial results: the answer is a
//! global optimum or an error.
//!
//! A high level overview is as follows:
//!
//! Given input, express the grid as a directed flow network. Sources feed
//! 4-adjacent empty cells, empty cells feed each other across 4-adjacency
//! (one arc per direction, paired as mutual reverses), and an empty cell
//! feeds a plant when a sprinkler there would reach it within the spray
//! radius.
//!
//! Each arc carries a bounded integer flow, negative when water runs against
//! the arc's direction. We then assert, per pipe cell: flows balance to zero;
//! at most one incident arc points upstream (which, with conservation, keeps
//! the water-carrying cells a forest rooted at the sources); the cell is
//! active exactly when water moves through it; and a cell that is not a
//! straight through-run pays for one connector per live neighbor. Plant-side
//! arcs only flow out of mounted sprinklers, and a plant is dry exactly when
//! no arc delivers to it. Minimizing the priced sum of these decisions yields
//! the cheapest network that waters every plant worth watering.

pub use grid::{CellKind, Instance, Location, ValidationError};
pub use solution::{score, Solved};
pub use solver::SolveError;

pub(crate) mod grid;
pub(crate) mod model;
pub(crate) mod network;
pub(crate) mod solution;
pub(crate) mod solver;
mod tests;
pub(crate) mod viz;
