use std::io::{self, Write};

use petgraph::visit::EdgeRef;

use crate::grid::Location;
use crate::network::{ArcKind, Cell};
use crate::solution::Solved;

impl Solved {
    /// Serialize the solved network in `.dot` format for Graphviz.
    ///
    /// Node shape encodes the role a cell ended up with (source = diamond,
    /// plant = circle, unused pipe cell = point, pipe = square, pipe with
    /// sprinkler = box); edges carrying no flow are invisible, the rest are
    /// solid and labeled with the delivered amount. Purely diagnostic.
    pub fn write_dot<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writeln!(writer, "digraph G {{")?;

        for node in self.network.graph.node_indices() {
            let cell = &self.network.graph[node];
            let location = cell.location();
            let (shape, color) = match cell {
                Cell::Source(_) => ("diamond", "deepskyblue3"),
                Cell::Pipe(_) => (self.pipe_shape(location), "deepskyblue2"),
                Cell::Plant(_) => ("circle", "deepskyblue1"),
            };
            writeln!(
                writer,
                "  \"{id}\" [label=\"{id}\" shape=\"{shape}\" pos=\"{row},{col}!\" style=\"filled\" fillcolor=\"{color}\"];",
                id = format_args!("{}_{}", location.0, location.1),
                row = location.0,
                col = location.1,
            )?;
        }

        for arc in self.network.graph.edge_references() {
            let start = self.network.graph[arc.source()].location();
            let end = self.network.graph[arc.target()].location();
            // source arcs are negative when drawn on; show the magnitude
            let flow = match arc.weight().kind {
                ArcKind::SourceToPipe => -self.flow[&arc.id()],
                _ => self.flow[&arc.id()],
            };
            let style = if flow <= 0 { "invis" } else { "solid" };
            writeln!(
                writer,
                "  \"{}_{}\" -> \"{}_{}\" [label=\"{flow}\" style=\"{style}\" arrowsize=\"0.5\"];",
                start.0, start.1, end.0, end.1,
            )?;
        }

        writeln!(writer, "}}")
    }

    fn pipe_shape(&self, location: Location) -> &'static str {
        if !self.pipes()[location.as_index()] {
            "point"
        } else if self.sprinklers()[location.as_index()] {
            "box"
        } else {
            "square"
        }
    }
}
