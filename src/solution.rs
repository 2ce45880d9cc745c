use std::collections::HashMap;
use std::io::{self, Write};

use log::info;
use ndarray::Array2;
use petgraph::graph::{EdgeIndex, NodeIndex};
use strum::VariantArray;

use crate::grid::{CellKind, Instance, Location, Step};
use crate::model::Assignment;
use crate::network::Network;

/// A proven-optimal irrigation design: which cells carry pipe, which host
/// sprinklers, and the cost the solver certified.
///
/// The solved network and its flows are kept alongside for diagnostics; see
/// [`write_dot`](Solved::write_dot).
pub struct Solved {
    pub(crate) network: Network,
    pub(crate) flow: HashMap<EdgeIndex, i64>,
    pub(crate) dry: HashMap<NodeIndex, bool>,
    pipes: Array2<bool>,
    sprinklers: Array2<bool>,
    cost: i64,
}

impl Solved {
    pub(crate) fn assemble(instance: &Instance, network: Network, assignment: Assignment) -> Self {
        let n = instance.n;
        let mut pipes = Array2::from_elem((n, n), false);
        let mut sprinklers = Array2::from_elem((n, n), false);

        for (&pipe, &on) in &assignment.active {
            pipes[network.graph[pipe].location().as_index()] = on;
        }
        for (&pipe, &on) in &assignment.sprinkler {
            sprinklers[network.graph[pipe].location().as_index()] = on;
        }

        let connectors: i64 = assignment.connectors.values().sum();
        let dry_plants = assignment.dry.values().filter(|&&dry| dry).count() as i64;
        let cost = instance.pipe_cost * pipes.iter().filter(|&&on| on).count() as i64
            + instance.sprinkler_cost * sprinklers.iter().filter(|&&on| on).count() as i64
            + instance.connector_cost * connectors
            + instance.dry_penalty() * dry_plants;
        info!("optimal cost {cost} ({dry_plants} plants left dry)");

        Self {
            network,
            flow: assignment.flow,
            dry: assignment.dry,
            pipes,
            sprinklers,
            cost,
        }
    }

    /// Cells carrying a pipe segment.
    pub fn pipes(&self) -> &Array2<bool> {
        &self.pipes
    }

    /// Cells hosting a sprinkler. A sprinkler cell always carries pipe.
    pub fn sprinklers(&self) -> &Array2<bool> {
        &self.sprinklers
    }

    /// The certified minimal cost.
    pub fn cost(&self) -> i64 {
        self.cost
    }

    /// Write the design as a command list: a count `K`, then one
    /// `P r c r c` line per pipe cell (a degenerate unit segment; downstream
    /// reconstructs adjacency from cell activity alone) and one `S r c` line
    /// per sprinkler.
    pub fn write_commands<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let pipes = self.pipes.iter().filter(|&&on| on).count();
        let sprinklers = self.sprinklers.iter().filter(|&&on| on).count();
        writeln!(writer, "{}", pipes + sprinklers)?;

        for ((row, col), _) in self.pipes.indexed_iter().filter(|(_, &on)| on) {
            writeln!(writer, "P {row} {col} {row} {col}")?;
        }
        for ((row, col), _) in self.sprinklers.indexed_iter().filter(|(_, &on)| on) {
            writeln!(writer, "S {row} {col}")?;
        }
        Ok(())
    }
}

/// Re-score a design the way the external harness does, with no reference to
/// the solver: flood-fill source-fed pipe cells, water every plant a fed
/// sprinkler covers, then price the hardware and the dry plants.
///
/// For any [`Solved`] design this reproduces [`Solved::cost`] exactly.
pub fn score(instance: &Instance, pipes: &Array2<bool>, sprinklers: &Array2<bool>) -> i64 {
    let n = instance.n;

    // connectivity, with an explicit stack: recursion depth would otherwise
    // scale with grid area
    let mut fed = Array2::from_elem((n, n), false);
    let mut stack: Vec<Location> = Vec::new();
    for (index, &kind) in instance.cells.indexed_iter() {
        if kind == CellKind::Source {
            stack.push(Location(index.0, index.1));
        }
    }
    while let Some(location) = stack.pop() {
        for step in Step::VARIANTS {
            let neighbor = step.attempt_from(location);
            if instance.kind_at(neighbor) == Some(CellKind::Empty)
                && pipes[neighbor.as_index()]
                && !fed[neighbor.as_index()]
            {
                fed[neighbor.as_index()] = true;
                stack.push(neighbor);
            }
        }
    }

    let mut watered = Array2::from_elem((n, n), false);
    for (index, &on) in sprinklers.indexed_iter() {
        let sprinkler = Location(index.0, index.1);
        if !on || !fed[index] {
            continue;
        }
        for (plant_index, &kind) in instance.cells.indexed_iter() {
            let plant = Location(plant_index.0, plant_index.1);
            if kind == CellKind::Plant && instance.covers(sprinkler, plant) {
                watered[plant_index] = true;
            }
        }
    }

    let mut cost = 0;
    for (index, &kind) in instance.cells.indexed_iter() {
        let location = Location(index.0, index.1);
        match kind {
            CellKind::Empty if pipes[index] => {
                cost += instance.pipe_cost;
                if sprinklers[index] {
                    cost += instance.sprinkler_cost;
                }
                cost += instance.connector_cost * connectors_at(instance, pipes, location);
            }
            CellKind::Plant if !watered[index] => cost += instance.dry_penalty(),
            _ => {}
        }
    }
    cost
}

/// Connector hardware at one active pipe cell: zero for a straight
/// through-segment, else one per adjacent active pipe.
fn connectors_at(instance: &Instance, pipes: &Array2<bool>, location: Location) -> i64 {
    let live = |step: Step| {
        let neighbor = step.attempt_from(location);
        match instance.kind_at(neighbor) {
            Some(CellKind::Source) => true,
            Some(CellKind::Empty) => pipes[neighbor.as_index()],
            Some(CellKind::Plant) | None => false,
        }
    };

    let row = Step::ALONG_ROW.map(&live);
    let column = Step::ALONG_COLUMN.map(&live);
    let straight = (row == [true, true] && column == [false, false])
        || (column == [true, true] && row == [false, false]);
    if straight {
        return 0;
    }

    Step::VARIANTS
        .iter()
        .filter(|step| {
            let neighbor = step.attempt_from(location);
            instance.kind_at(neighbor) == Some(CellKind::Empty) && pipes[neighbor.as_index()]
        })
        .count() as i64
}
