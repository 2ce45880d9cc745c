use log::debug;
use thiserror::Error;

use crate::grid::Instance;
use crate::model::NetworkModel;
use crate::network::Network;
use crate::solution::Solved;

/// Reasons a solve may fail. Both are terminal: the caller gets a proven
/// optimum or nothing.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum SolveError {
    /// The backend proved no feasible assignment exists. The all-dry baseline
    /// should keep this unreachable, but it remains a possible outcome.
    #[error("no feasible irrigation design exists")]
    Infeasible,
    /// The backend stopped without a proof of optimality.
    #[error("solver stopped without proving optimality: {0}")]
    NonOptimal(String),
}

impl Instance {
    /// Design the cost-optimal irrigation network for this instance.
    ///
    /// Builds the flow network and the decision model over it, then blocks on
    /// the backend until it proves a global optimum. When several optima
    /// exist (symmetric paths of equal cost), which one is returned is
    /// backend-defined; the cost is not.
    pub fn solve(&self) -> Result<Solved, SolveError> {
        let network = Network::build(self);
        debug!(
            "network: {} cells, {} arcs",
            network.graph.node_count(),
            network.graph.edge_count(),
        );

        let assignment = NetworkModel::build(self, &network).solve()?;
        Ok(Solved::assemble(self, network, assignment))
    }
}
