use std::collections::HashMap;

use good_lp::{constraint, default_solver, variable, variables, Constraint, Expression,
              ProblemVariables, ResolutionError, Solution, SolverModel, Variable};
use itertools::Itertools;
use log::{debug, info};
use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use crate::grid::{CellKind, Instance, Location, Step};
use crate::network::{ArcKind, Network};
use crate::solver::SolveError;

/// Decision variables attached to one pipe cell.
pub(crate) struct PipeVars {
    /// The cell carries a pipe segment.
    pub(crate) active: Variable,
    /// The cell hosts a sprinkler (implies `active`).
    pub(crate) sprinkler: Variable,
    /// Both row neighbors are live pipe/source, neither column neighbor is.
    horizontal: Variable,
    vertical: Variable,
    /// The pipe is a straight through-segment, exempt from connector hardware.
    no_connector: Variable,
    /// Connector hardware count, `0..=4`.
    pub(crate) connectors: Variable,
}

/// Signed flow on one arc, plus the marker that keeps it nonnegative.
///
/// Each pipe frees at most one incident marker, so at most one incident arc
/// may point upstream; together with conservation this keeps the active
/// pipes a forest rooted at the sources.
pub(crate) struct ArcVars {
    pub(crate) flow: Variable,
    nonnegative: Variable,
}

/// Whether a neighboring grid position can count as pipe-or-source when
/// classifying a pipe cell as a straight run.
enum Neighbor {
    /// Out of the grid, or a plant: never pipe-or-source.
    Never,
    /// A source: always live.
    Always,
    /// A pipe cell: live exactly when its `active` variable is.
    Pipe(Variable),
}

/// Raw solved values, keyed by network element.
pub(crate) struct Assignment {
    pub(crate) active: HashMap<NodeIndex, bool>,
    pub(crate) sprinkler: HashMap<NodeIndex, bool>,
    pub(crate) connectors: HashMap<NodeIndex, i64>,
    pub(crate) dry: HashMap<NodeIndex, bool>,
    pub(crate) flow: HashMap<EdgeIndex, i64>,
}

/// The decision-variable model over a [`Network`]: variables, feasibility
/// constraints, and the scalar cost. Build once, then [`solve`](Self::solve).
///
/// The backend is a linear integer-programming solver, so the conditional
/// constraints of the formulation are encoded as big-M inequalities; the
/// bounded flows keep every M small (the plant count for flow signs, 4 for
/// connector counting, 1 elsewhere).
pub(crate) struct NetworkModel<'a> {
    instance: &'a Instance,
    network: &'a Network,
    vars: ProblemVariables,
    constraints: Vec<Constraint>,
    pipe_vars: HashMap<NodeIndex, PipeVars>,
    arc_vars: HashMap<EdgeIndex, ArcVars>,
    dry: HashMap<NodeIndex, Variable>,
}

impl<'a> NetworkModel<'a> {
    /// Allocate one variable set per pipe, plant, and arc, then encode every
    /// feasibility rule over them.
    pub(crate) fn build(instance: &'a Instance, network: &'a Network) -> Self {
        let mut vars = variables!();
        let supply = network.plant_count() as f64;

        let pipe_vars = network
            .pipes
            .iter()
            .map(|&pipe| {
                (
                    pipe,
                    PipeVars {
                        active: vars.add(variable().binary()),
                        sprinkler: vars.add(variable().binary()),
                        horizontal: vars.add(variable().binary()),
                        vertical: vars.add(variable().binary()),
                        no_connector: vars.add(variable().binary()),
                        connectors: vars.add(variable().integer().min(0.0).max(4.0)),
                    },
                )
            })
            .collect();

        let arc_vars = network
            .graph
            .edge_indices()
            .map(|arc| {
                let (lo, hi) = match network.graph[arc].kind {
                    ArcKind::SourceToPipe => (-supply, 0.0),
                    ArcKind::PipeToPipe => (-supply, supply),
                    ArcKind::PipeToPlant => (0.0, 1.0),
                };
                (
                    arc,
                    ArcVars {
                        flow: vars.add(variable().integer().min(lo).max(hi)),
                        nonnegative: vars.add(variable().binary()),
                    },
                )
            })
            .collect();

        let dry = network
            .plants
            .iter()
            .map(|&plant| (plant, vars.add(variable().binary())))
            .collect();

        let mut model = Self {
            instance,
            network,
            vars,
            constraints: Vec::new(),
            pipe_vars,
            arc_vars,
            dry,
        };
        model.encode();
        model
    }

    fn encode(&mut self) {
        self.encode_sign_markers();
        self.encode_antisymmetry();

        for pipe in self.network.pipes.clone() {
            self.encode_conservation(pipe);
            self.encode_parenthood(pipe);
            self.encode_sprinkler_mount(pipe);
            self.encode_orientation(pipe);
            self.encode_connectors(pipe);
        }

        for plant in self.network.plants.clone() {
            self.encode_watering(plant);
        }

        self.encode_source_balance();

        debug!(
            "encoded {} constraints over {} pipes, {} arcs, {} plants",
            self.constraints.len(),
            self.pipe_vars.len(),
            self.arc_vars.len(),
            self.dry.len(),
        );
    }

    fn supply(&self) -> f64 {
        self.network.plant_count() as f64
    }

    /// `nonnegative = 1` pins the flow to `[0, hi]`, `nonnegative = 0` to
    /// `[lo, -1]`: the marker is the sign of the flow, strictly. Encoded as
    /// `flow >= lo * (1 - nonnegative)` and `flow <= -1 + (hi + 1) * nonnegative`.
    fn encode_sign_markers(&mut self) {
        let supply = self.supply();
        for (&arc, arc_vars) in &self.arc_vars {
            let (lo, hi) = match self.network.graph[arc].kind {
                ArcKind::SourceToPipe => (-supply, 0.0),
                ArcKind::PipeToPipe => (-supply, supply),
                // plant arcs are nonnegative by bounds already
                ArcKind::PipeToPlant => continue,
            };
            let lower = Expression::from(arc_vars.flow) + lo * arc_vars.nonnegative;
            self.constraints.push(constraint!(lower >= lo));
            let upper = Expression::from(arc_vars.flow) - (hi + 1.0) * arc_vars.nonnegative;
            self.constraints.push(constraint!(upper <= -1.0));
        }
    }

    /// Each pipe-pipe arc carries the exact negation of its mutual reverse.
    fn encode_antisymmetry(&mut self) {
        for arc in self.network.graph.edge_indices() {
            let Some(reverse) = self.network.graph[arc].reverse else {
                continue;
            };
            if arc.index() > reverse.index() {
                continue; // once per pair
            }
            let total = Expression::from(self.arc_vars[&arc].flow) + self.arc_vars[&reverse].flow;
            self.constraints.push(constraint!(total == 0.0));
        }
    }

    /// Net flow through a pipe is balanced.
    fn encode_conservation(&mut self, pipe: NodeIndex) {
        let total = self
            .network
            .incident_arcs(pipe)
            .iter()
            .fold(Expression::default(), |sum, arc| {
                sum + self.arc_vars[arc].flow
            });
        self.constraints.push(constraint!(total == 0.0));
    }

    /// An active pipe frees exactly one incident marker (its unique upstream
    /// direction); an absent pipe frees none, which pins all its flows to
    /// zero through the markers and antisymmetry.
    fn encode_parenthood(&mut self, pipe: NodeIndex) {
        let arcs = self.network.incident_arcs(pipe);
        let degree = arcs.len() as f64;
        let marked = arcs.iter().fold(Expression::default(), |sum, arc| {
            sum + self.arc_vars[arc].nonnegative
        });
        let lhs = marked + self.pipe_vars[&pipe].active;
        self.constraints.push(constraint!(lhs == degree));
    }

    /// A sprinkler needs a live pipe under it.
    fn encode_sprinkler_mount(&mut self, pipe: NodeIndex) {
        let pipe_vars = &self.pipe_vars[&pipe];
        let lhs = Expression::from(pipe_vars.sprinkler);
        let active = pipe_vars.active;
        self.constraints.push(constraint!(lhs <= active));
    }

    fn neighbor(&self, location: Location, step: Step) -> Neighbor {
        let at = step.attempt_from(location);
        match self.instance.kind_at(at) {
            Some(CellKind::Source) => Neighbor::Always,
            Some(CellKind::Empty) => {
                Neighbor::Pipe(self.pipe_vars[&self.network.nodes[at.as_index()]].active)
            }
            Some(CellKind::Plant) | None => Neighbor::Never,
        }
    }

    /// `horizontal` only if both row neighbors are live pipe/source and
    /// neither column neighbor is; `vertical` symmetrically. A straight run
    /// in either orientation is what exempts the pipe from connectors.
    fn encode_orientation(&mut self, pipe: NodeIndex) {
        let location = self.network.graph[pipe].location();
        let pipe_vars = &self.pipe_vars[&pipe];
        let (horizontal, vertical, no_connector) =
            (pipe_vars.horizontal, pipe_vars.vertical, pipe_vars.no_connector);

        self.encode_straight_run(horizontal, location, Step::ALONG_ROW, Step::ALONG_COLUMN);
        self.encode_straight_run(vertical, location, Step::ALONG_COLUMN, Step::ALONG_ROW);

        let lhs = Expression::from(horizontal) + vertical;
        self.constraints.push(constraint!(lhs >= no_connector));
    }

    fn encode_straight_run(
        &mut self,
        flag: Variable,
        location: Location,
        along: [Step; 2],
        across: [Step; 2],
    ) {
        for step in along {
            match self.neighbor(location, step) {
                Neighbor::Always => {}
                Neighbor::Never => self.forbid(flag),
                Neighbor::Pipe(active) => {
                    let lhs = Expression::from(flag);
                    self.constraints.push(constraint!(lhs <= active));
                }
            }
        }
        for step in across {
            match self.neighbor(location, step) {
                Neighbor::Never => {}
                Neighbor::Always => self.forbid(flag),
                Neighbor::Pipe(active) => {
                    let lhs = Expression::from(flag) + active;
                    self.constraints.push(constraint!(lhs <= 1.0));
                }
            }
        }
    }

    fn forbid(&mut self, flag: Variable) {
        let lhs = Expression::from(flag);
        self.constraints.push(constraint!(lhs <= 0.0));
    }

    /// An active pipe that is not a straight through-segment needs one
    /// connector per live pipe neighbor; straight or absent pipes need none.
    fn encode_connectors(&mut self, pipe: NodeIndex) {
        let pipe_vars = &self.pipe_vars[&pipe];
        let (active, no_connector, connectors) =
            (pipe_vars.active, pipe_vars.no_connector, pipe_vars.connectors);

        let neighbors = self
            .network
            .graph
            .edges_directed(pipe, Direction::Outgoing)
            .filter(|arc| matches!(arc.weight().kind, ArcKind::PipeToPipe))
            .map(|arc| self.pipe_vars[&arc.target()].active)
            .fold(Expression::default(), |sum, active| sum + active);

        // connectors == neighbor count when active and bent, relaxed by M = 4
        // when straight or absent
        let lower_lhs = Expression::from(connectors) + 4.0 * no_connector + 4.0;
        let lower_rhs = neighbors.clone() + 4.0 * active;
        self.constraints.push(constraint!(lower_lhs >= lower_rhs));

        let upper_lhs = Expression::from(connectors) + 4.0 * active;
        let upper_rhs = neighbors + 4.0 * no_connector + 4.0;
        self.constraints.push(constraint!(upper_lhs <= upper_rhs));

        let straight = Expression::from(connectors) + 4.0 * no_connector;
        self.constraints.push(constraint!(straight <= 4.0));

        let absent_lhs = Expression::from(connectors);
        let absent_rhs = 4.0 * active;
        self.constraints.push(constraint!(absent_lhs <= absent_rhs));
    }

    /// Plant-arc flow only runs out of a mounted sprinkler, and a plant is
    /// dry exactly when no incident arc delivers.
    fn encode_watering(&mut self, plant: NodeIndex) {
        let arcs = self
            .network
            .graph
            .edges_directed(plant, Direction::Incoming)
            .map(|arc| (arc.id(), arc.source()))
            .collect_vec();

        for &(arc, pipe) in &arcs {
            let sprinkler = self.pipe_vars[&pipe].sprinkler;
            let lhs = Expression::from(self.arc_vars[&arc].flow);
            self.constraints.push(constraint!(lhs <= sprinkler));
        }

        let inflow = arcs.iter().fold(Expression::default(), |sum, (arc, _)| {
            sum + self.arc_vars[arc].flow
        });
        let degree = arcs.len() as f64;
        let dry = self.dry[&plant];

        let watered = inflow.clone() + dry;
        self.constraints.push(constraint!(watered >= 1.0));
        let capped = inflow + degree * dry;
        self.constraints.push(constraint!(capped <= degree));
    }

    /// Total draw across all sources is bounded by the plant count.
    fn encode_source_balance(&mut self) {
        let supply = self.supply();
        let total = self
            .network
            .sources
            .iter()
            .flat_map(|&source| self.network.graph.edges_directed(source, Direction::Outgoing))
            .fold(Expression::default(), |sum, arc| {
                sum + self.arc_vars[&arc.id()].flow
            });
        self.constraints.push(constraint!(total >= -supply));
    }

    /// Pipe, sprinkler, and connector hardware at list price, plus the
    /// dominating N² penalty per dry plant.
    fn objective(&self) -> Expression {
        let mut cost = Expression::default();
        for pipe_vars in self.pipe_vars.values() {
            cost += self.instance.pipe_cost as f64 * pipe_vars.active;
            cost += self.instance.sprinkler_cost as f64 * pipe_vars.sprinkler;
            cost += self.instance.connector_cost as f64 * pipe_vars.connectors;
        }
        for &dry in self.dry.values() {
            cost += self.instance.dry_penalty() as f64 * dry;
        }
        cost
    }

    /// Minimize cost through the backend, blocking until it proves an
    /// optimum. Anything short of that proof is a terminal failure; there is
    /// no retry and no partial result.
    pub(crate) fn solve(self) -> Result<Assignment, SolveError> {
        let objective = self.objective();
        let Self {
            vars,
            constraints,
            pipe_vars,
            arc_vars,
            dry,
            ..
        } = self;

        let mut problem = vars.minimise(objective).using(default_solver);
        for constraint in constraints {
            problem.add_constraint(constraint);
        }

        let solution = problem.solve().map_err(|failure| match failure {
            ResolutionError::Infeasible => SolveError::Infeasible,
            other => SolveError::NonOptimal(format!("{other:?}")),
        })?;
        info!("solved to proven optimality");

        Ok(Assignment {
            active: pipe_vars
                .iter()
                .map(|(&pipe, pipe_vars)| (pipe, solution.value(pipe_vars.active) > 0.5))
                .collect(),
            sprinkler: pipe_vars
                .iter()
                .map(|(&pipe, pipe_vars)| (pipe, solution.value(pipe_vars.sprinkler) > 0.5))
                .collect(),
            connectors: pipe_vars
                .iter()
                .map(|(&pipe, pipe_vars)| {
                    (pipe, solution.value(pipe_vars.connectors).round() as i64)
                })
                .collect(),
            dry: dry
                .iter()
                .map(|(&plant, &dry)| (plant, solution.value(dry) > 0.5))
                .collect(),
            flow: arc_vars
                .iter()
                .map(|(&arc, arc_vars)| (arc, solution.value(arc_vars.flow).round() as i64))
                .collect(),
        })
    }
}
