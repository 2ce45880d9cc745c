#[cfg(test)]
mod tests {
    use petgraph::visit::EdgeRef;
    use petgraph::Direction;

    use crate::grid::Location;
    use crate::network::{ArcKind, Network};
    use crate::solution::score;
    use crate::{CellKind, Instance, Solved, ValidationError};

    fn unit_cost_instance(n: usize, radius: i64, codes: &[u8]) -> Instance {
        Instance::from_codes(n, 1, 1, 1, radius, codes).unwrap()
    }

    /// Every invariant a feasible, optimal design must show, checked from the
    /// solved flows: balanced pipes, a unique upstream direction tracing back
    /// to a source, sprinklers only on live pipes, dryness matching delivery,
    /// and a cost the independent scorer reproduces.
    fn assert_design_invariants(instance: &Instance, solved: &Solved) {
        let graph = &solved.network.graph;

        for &pipe in &solved.network.pipes {
            let location = graph[pipe].location();
            let active = solved.pipes()[location.as_index()];
            let arcs = solved.network.incident_arcs(pipe);

            let total: i64 = arcs.iter().map(|arc| solved.flow[arc]).sum();
            assert_eq!(total, 0, "pipe at {location:?} is unbalanced");

            let upstream = arcs.iter().filter(|&&arc| solved.flow[&arc] < 0).count();
            assert!(upstream <= 1, "pipe at {location:?} has several parents");
            if active {
                assert_eq!(upstream, 1, "active pipe at {location:?} carries no water");
            } else {
                assert!(
                    arcs.iter().all(|arc| solved.flow[arc] == 0),
                    "absent pipe at {location:?} carries flow",
                );
            }

            assert!(
                active || !solved.sprinklers()[location.as_index()],
                "sprinkler on absent pipe at {location:?}",
            );
        }

        // walking upstream from any live pipe reaches a source without
        // revisiting anything
        for &pipe in &solved.network.pipes {
            if !solved.pipes()[graph[pipe].location().as_index()] {
                continue;
            }
            let mut current = pipe;
            let mut steps = 0;
            loop {
                steps += 1;
                assert!(steps <= solved.network.pipes.len() + 1, "upstream walk cycles");

                let arcs = solved.network.incident_arcs(current);
                let upstream = *arcs.iter().find(|&&arc| solved.flow[&arc] < 0).unwrap();
                let (from, to) = graph.edge_endpoints(upstream).unwrap();
                match graph[upstream].kind {
                    ArcKind::SourceToPipe => break,
                    ArcKind::PipeToPipe => {
                        assert_eq!(from, current);
                        current = to;
                    }
                    ArcKind::PipeToPlant => unreachable!("delivery arcs never run upstream"),
                }
            }
        }

        for &plant in &solved.network.plants {
            let mut delivered = false;
            for arc in graph.edges_directed(plant, Direction::Incoming) {
                let flow = solved.flow[&arc.id()];
                assert!(flow >= 0);
                if flow > 0 {
                    delivered = true;
                    let sprinkler = graph[arc.source()].location();
                    assert!(
                        solved.sprinklers()[sprinkler.as_index()],
                        "delivery without a sprinkler at {sprinkler:?}",
                    );
                }
            }
            assert_eq!(solved.dry[&plant], !delivered);
        }

        assert_eq!(
            score(instance, solved.pipes(), solved.sprinklers()),
            solved.cost(),
            "independent re-score disagrees with the solver",
        );
    }

    fn count(grid: &ndarray::Array2<bool>) -> usize {
        grid.iter().filter(|&&on| on).count()
    }

    #[test]
    fn parse_header_and_grid() {
        let text = "3 1 2 3 1\n1 0 0\n0 0 0\n0 0 2\n";
        let instance: Instance = text.parse().unwrap();
        assert_eq!(instance.n(), 3);
        assert_eq!(instance.cells()[(0, 0)], CellKind::Source);
        assert_eq!(instance.cells()[(2, 2)], CellKind::Plant);
        assert_eq!(instance.cells()[(1, 1)], CellKind::Empty);
        assert_eq!(
            instance,
            Instance::from_codes(3, 1, 2, 3, 1, &[1, 0, 0, 0, 0, 0, 0, 0, 2]).unwrap(),
        );
    }

    #[test]
    fn parse_rejects_bad_cell_code() {
        let outcome = "2 1 1 1 1\n1 0\n0 7\n".parse::<Instance>();
        assert_eq!(
            outcome.unwrap_err(),
            ValidationError::BadCellCode { code: 7, row: 1, col: 1 },
        );
    }

    #[test]
    fn parse_rejects_truncated_text() {
        assert_eq!(
            "3 1 1 1 1\n1 0 0\n".parse::<Instance>().unwrap_err(),
            ValidationError::Truncated,
        );
        assert_eq!(
            "2 1 1 x 1\n1 0\n0 0\n".parse::<Instance>().unwrap_err(),
            ValidationError::BadToken("x".to_owned()),
        );
    }

    #[test]
    fn network_arcs_respect_adjacency_and_coverage() {
        let instance = unit_cost_instance(3, 1, &[1, 0, 0, 0, 0, 0, 0, 0, 2]);
        let network = Network::build(&instance);

        assert_eq!(network.graph.node_count(), 9);
        assert_eq!(network.sources.len(), 1);
        assert_eq!(network.pipes.len(), 7);
        assert_eq!(network.plants.len(), 1);
        // 2 source arcs, 8 adjacent pipe pairs both ways, 2 delivery arcs
        assert_eq!(network.graph.edge_count(), 2 + 16 + 2);

        for arc in network.graph.edge_references() {
            match arc.weight().kind {
                ArcKind::PipeToPipe => {
                    let reverse = arc.weight().reverse.expect("unpaired pipe arc");
                    let (back_from, back_to) = network.graph.edge_endpoints(reverse).unwrap();
                    assert_eq!((back_from, back_to), (arc.target(), arc.source()));
                }
                _ => assert!(arc.weight().reverse.is_none()),
            }
        }
    }

    #[test]
    fn waters_single_plant_through_center_path() {
        let instance = unit_cost_instance(3, 1, &[1, 0, 0, 0, 0, 0, 0, 0, 2]);
        let solved = instance.solve().unwrap();
        assert_design_invariants(&instance, &solved);

        // three pipes, one sprinkler, connectors at both run ends
        assert_eq!(solved.cost(), 6);
        assert_eq!(count(solved.pipes()), 3);
        assert_eq!(count(solved.sprinklers()), 1);
        assert!(solved.dry.values().all(|&dry| !dry));

        // one of the two symmetric straight runs through the center
        let pipes = solved.pipes();
        assert!(pipes[(1, 1)]);
        let down_column = pipes[(0, 1)] && pipes[(2, 1)];
        let along_row = pipes[(1, 0)] && pipes[(1, 2)];
        assert!(down_column ^ along_row);
    }

    #[test]
    fn repeated_solves_agree_on_cost() {
        let instance = unit_cost_instance(3, 1, &[1, 0, 0, 0, 0, 0, 0, 0, 2]);
        let first = instance.solve().unwrap();
        let second = instance.solve().unwrap();
        assert_eq!(first.cost(), second.cost());
    }

    #[test]
    fn zero_plants_means_zero_cost() {
        let instance = unit_cost_instance(2, 1, &[1, 0, 0, 0]);
        let solved = instance.solve().unwrap();
        assert_design_invariants(&instance, &solved);

        assert_eq!(solved.cost(), 0);
        assert_eq!(count(solved.pipes()), 0);
        assert_eq!(count(solved.sprinklers()), 0);
    }

    #[test]
    fn sealed_source_leaves_plants_dry() {
        // the source's only neighbors are plants, so nothing can ever flow
        let instance = unit_cost_instance(3, 1, &[1, 2, 0, 2, 2, 0, 0, 0, 0]);
        let solved = instance.solve().unwrap();
        assert_design_invariants(&instance, &solved);

        assert_eq!(count(solved.pipes()), 0);
        assert_eq!(count(solved.sprinklers()), 0);
        assert!(solved.dry.values().all(|&dry| dry));
        assert_eq!(solved.cost(), 3 * 9);
    }

    #[test]
    fn one_sprinkler_serves_both_plants() {
        let instance = unit_cost_instance(3, 1, &[1, 0, 0, 2, 0, 2, 0, 0, 0]);
        let solved = instance.solve().unwrap();
        assert_design_invariants(&instance, &solved);

        // the center cell is the only spot covering both plants
        assert_eq!(count(solved.sprinklers()), 1);
        assert!(solved.sprinklers()[(1, 1)]);
        assert!(solved.dry.values().all(|&dry| !dry));
        assert_eq!(solved.cost(), 5);
    }

    #[test]
    fn branches_to_two_distant_plants() {
        let instance = unit_cost_instance(
            4,
            1,
            &[
                1, 0, 0, 2, //
                0, 0, 0, 0, //
                0, 0, 0, 0, //
                2, 0, 0, 0,
            ],
        );
        let solved = instance.solve().unwrap();
        assert_design_invariants(&instance, &solved);

        assert!(solved.dry.values().all(|&dry| !dry));
        assert_eq!(count(solved.sprinklers()), 2);
        // two straight two-pipe runs, each ending in one connector
        assert_eq!(solved.cost(), 8);
    }

    #[test]
    fn scores_designs_without_the_solver() {
        let instance = unit_cost_instance(3, 1, &[1, 0, 0, 0, 0, 0, 0, 0, 2]);
        let n = instance.n();

        // doing nothing costs one dry plant
        let empty = ndarray::Array2::from_elem((n, n), false);
        assert_eq!(score(&instance, &empty, &empty), 9);

        // the straight center column with a sprinkler at its end
        let mut pipes = empty.clone();
        for row in 0..3 {
            pipes[(row, 1)] = true;
        }
        let mut sprinklers = empty.clone();
        sprinklers[(2, 1)] = true;
        assert_eq!(score(&instance, &pipes, &sprinklers), 6);

        // a disconnected sprinkler waters nothing
        let mut stranded = empty.clone();
        stranded[(2, 1)] = true;
        assert_eq!(score(&instance, &stranded, &sprinklers), 1 + 1 + 9);
    }

    #[test]
    fn command_list_covers_the_design() {
        let instance = unit_cost_instance(3, 1, &[1, 0, 0, 0, 0, 0, 0, 0, 2]);
        let solved = instance.solve().unwrap();

        let mut out = Vec::new();
        solved.write_commands(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();

        assert_eq!(lines.next(), Some("4"));
        let commands: Vec<&str> = lines.collect();
        assert_eq!(commands.len(), 4);
        assert_eq!(commands.iter().filter(|line| line.starts_with("P ")).count(), 3);
        assert_eq!(commands.iter().filter(|line| line.starts_with("S ")).count(), 1);

        for ((row, col), _) in solved.pipes().indexed_iter().filter(|(_, &on)| on) {
            assert!(commands.contains(&format!("P {row} {col} {row} {col}").as_str()));
        }
    }

    #[test]
    fn dot_export_describes_the_network() {
        let instance = unit_cost_instance(3, 1, &[1, 0, 0, 0, 0, 0, 0, 0, 2]);
        let solved = instance.solve().unwrap();

        let mut out = Vec::new();
        solved.write_dot(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.starts_with("digraph G {"));
        assert!(text.trim_end().ends_with('}'));
        assert!(text.contains("\"0_0\" [label=\"0_0\" shape=\"diamond\""));
        assert!(text.contains("shape=\"circle\""));
        // the watered plant has a visible delivery edge
        assert!(text.contains("-> \"2_2\" [label=\"1\" style=\"solid\""));
    }

    #[test]
    fn location_coverage_uses_squared_distance() {
        let instance = unit_cost_instance(3, 2, &[1, 0, 0, 0, 0, 0, 0, 0, 2]);
        assert!(instance.covers(Location(2, 0), Location(2, 2)));
        assert!(instance.covers(Location(1, 1), Location(2, 2)));
        assert!(!instance.covers(Location(0, 0), Location(2, 2)));
    }
}
