use itertools::Itertools;
use ndarray::Array2;
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use strum::VariantArray;

use crate::grid::{CellKind, Instance, Location, Step};

/// A typed vertex of the flow network. Identity is the grid position.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Cell {
    Source(Location),
    Pipe(Location),
    Plant(Location),
}

impl Cell {
    pub(crate) fn location(&self) -> Location {
        match self {
            Self::Source(location) | Self::Pipe(location) | Self::Plant(location) => *location,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum ArcKind {
    /// Source to a 4-adjacent pipe cell.
    SourceToPipe,
    /// Pipe to a 4-adjacent pipe cell; always created in both directions.
    PipeToPipe,
    /// Pipe to a plant within the squared spray radius.
    PipeToPlant,
}

/// A directed arc. Pipe-pipe arcs record their mutual reverse as soon as both
/// directions exist, so constraint construction never searches for it.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Arc {
    pub(crate) kind: ArcKind,
    pub(crate) reverse: Option<EdgeIndex>,
}

/// The directed flow network over the grid: one vertex per cell, arcs only
/// where flow is physically possible. Built once per instance, then read-only.
pub(crate) struct Network {
    pub(crate) graph: DiGraph<Cell, Arc>,
    /// Grid position to vertex, for O(1) neighbor lookup.
    pub(crate) nodes: Array2<NodeIndex>,
    pub(crate) sources: Vec<NodeIndex>,
    pub(crate) pipes: Vec<NodeIndex>,
    pub(crate) plants: Vec<NodeIndex>,
}

impl Network {
    pub(crate) fn build(instance: &Instance) -> Self {
        let n = instance.n;
        let mut graph = DiGraph::with_capacity(n * n, 4 * n * n);

        let nodes = Array2::from_shape_fn((n, n), |(row, col)| {
            let location = Location(row, col);
            graph.add_node(match instance.cells[(row, col)] {
                CellKind::Empty => Cell::Pipe(location),
                CellKind::Source => Cell::Source(location),
                CellKind::Plant => Cell::Plant(location),
            })
        });

        let mut sources = Vec::new();
        let mut pipes = Vec::new();
        let mut plants = Vec::new();
        for (index, &node) in nodes.indexed_iter() {
            match instance.cells[index] {
                CellKind::Empty => pipes.push(node),
                CellKind::Source => sources.push(node),
                CellKind::Plant => plants.push(node),
            }
        }

        // adjacency arcs: source -> pipe and pipe -> pipe
        for (index, &kind) in instance.cells.indexed_iter() {
            if kind == CellKind::Plant {
                continue;
            }
            let location = Location(index.0, index.1);

            for step in Step::VARIANTS {
                let neighbor = step.attempt_from(location);
                if instance.kind_at(neighbor) != Some(CellKind::Empty) {
                    continue;
                }

                let from = nodes[location.as_index()];
                let to = nodes[neighbor.as_index()];
                let arc_kind = match kind {
                    CellKind::Source => ArcKind::SourceToPipe,
                    _ => ArcKind::PipeToPipe,
                };

                let arc = graph.add_edge(from, to, Arc { kind: arc_kind, reverse: None });
                if arc_kind == ArcKind::PipeToPipe {
                    // the opposite direction exists once both endpoints have
                    // been scanned; pair the two the moment it does
                    if let Some(back) = graph.find_edge(to, from) {
                        graph[arc].reverse = Some(back);
                        graph[back].reverse = Some(arc);
                    }
                }
            }
        }

        // coverage arcs: pipe -> plant
        for &plant in &plants {
            let plant_location = graph[plant].location();
            for &pipe in &pipes {
                let pipe_location = graph[pipe].location();
                if instance.covers(pipe_location, plant_location) {
                    graph.add_edge(
                        pipe,
                        plant,
                        Arc { kind: ArcKind::PipeToPlant, reverse: None },
                    );
                }
            }
        }

        Self { graph, nodes, sources, pipes, plants }
    }

    /// Arcs entering a pipe's conservation sum: its own outgoing pipe and
    /// plant arcs, plus the source arcs feeding it.
    pub(crate) fn incident_arcs(&self, pipe: NodeIndex) -> Vec<EdgeIndex> {
        self.graph
            .edges_directed(pipe, Direction::Outgoing)
            .map(|arc| arc.id())
            .chain(
                self.graph
                    .edges_directed(pipe, Direction::Incoming)
                    .filter(|arc| matches!(arc.weight().kind, ArcKind::SourceToPipe))
                    .map(|arc| arc.id()),
            )
            .collect_vec()
    }

    pub(crate) fn plant_count(&self) -> usize {
        self.plants.len()
    }
}
