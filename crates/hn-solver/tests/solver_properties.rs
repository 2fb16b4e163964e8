//! Property tests over randomly sized looped networks.

use hn_network::{LinkStatus, NetworkBuilder, PumpCurve, WaterNetwork};
use hn_solver::{LinkState, PatternMultipliers, SolverOptions, solve_network};
use proptest::prelude::*;

/// Reservoir feeding a four-junction loop with a cross pipe.
fn looped(demands: [f64; 4], diameters: [f64; 6]) -> NetworkBuilder {
    let mut b = NetworkBuilder::new("loop");
    b.reservoir("R", 60.0)
        .junction("A", 10.0, demands[0])
        .junction("B", 12.0, demands[1])
        .junction("C", 15.0, demands[2])
        .junction("D", 11.0, demands[3])
        .pipe("RA", "R", "A", 500.0, diameters[0], 120.0)
        .pipe("AB", "A", "B", 400.0, diameters[1], 110.0)
        .pipe("BC", "B", "C", 400.0, diameters[2], 130.0)
        .pipe("CD", "C", "D", 400.0, diameters[3], 100.0)
        .pipe("DA", "D", "A", 400.0, diameters[4], 120.0)
        .pipe("AC", "A", "C", 600.0, diameters[5], 120.0);
    b
}

fn solve(net: &WaterNetwork) -> hn_solver::HydraulicSolution {
    solve_network(net, &SolverOptions::default(), &PatternMultipliers::new()).unwrap()
}

fn demands() -> impl Strategy<Value = [f64; 4]> {
    prop::array::uniform4(0.0f64..15.0)
}

fn diameters() -> impl Strategy<Value = [f64; 6]> {
    prop::array::uniform6(150.0f64..300.0)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn flow_is_conserved(d in demands(), dia in diameters()) {
        let net = looped(d, dia).build().unwrap();
        let sol = solve(&net);
        prop_assert!(sol.converged);

        for j in ["A", "B", "C", "D"] {
            let node = sol.node(j).unwrap();
            let inflow = sol.net_inflow(&net, j);
            prop_assert!((inflow - node.demand).abs() < 1e-3, "{j}: {inflow} vs {}", node.demand);
        }
        prop_assert!((sol.total_supply - sol.total_demand).abs() < 1e-3);
    }

    #[test]
    fn more_demand_never_raises_pressure(base in 1.0f64..40.0, extra in 0.1f64..40.0) {
        let low = solve(&single(base));
        let high = solve(&single(base + extra));
        let p_low = low.node("J").unwrap().pressure;
        let p_high = high.node("J").unwrap().pressure;
        prop_assert!(p_high <= p_low + 1e-6);
    }

    #[test]
    fn repeated_solves_are_identical(d in demands(), dia in diameters()) {
        let net = looped(d, dia).build().unwrap();
        prop_assert_eq!(solve(&net), solve(&net));
    }

    #[test]
    fn closed_pipe_carries_nothing(d in demands(), dia in diameters(), which in 0usize..5) {
        // every loop pipe can close without isolating a junction
        let id = ["AB", "BC", "CD", "DA", "AC"][which];
        let mut b = looped(d, dia);
        b.status(id, LinkStatus::Closed);
        let net = b.build().unwrap();
        let sol = solve(&net);

        let link = sol.link(id).unwrap();
        prop_assert_eq!(link.status, LinkState::Closed);
        prop_assert_eq!(link.flow, 0.0);
        prop_assert_eq!(link.head_loss, 0.0);
        prop_assert!(sol.nodes.iter().all(|n| n.supplied));
    }

    #[test]
    fn check_valve_never_passes_reverse_flow(h1 in 60.0f64..120.0, h2 in 60.0f64..120.0, demand in 0.0f64..30.0) {
        let mut b = NetworkBuilder::new("cv");
        b.reservoir("R1", h1)
            .reservoir("R2", h2)
            .junction("J", 40.0, demand)
            .pipe("CV", "R1", "J", 500.0, 200.0, 120.0)
            .pipe("P", "R2", "J", 500.0, 200.0, 120.0)
            .status("CV", LinkStatus::CheckValve);
        let sol = solve(&b.build().unwrap());
        prop_assert!(sol.converged);

        let cv = sol.link("CV").unwrap();
        prop_assert!(cv.flow >= -1e-9, "check valve flow {}", cv.flow);
        if cv.status == LinkState::Blocked {
            prop_assert_eq!(cv.flow, 0.0);
        }
    }

    #[test]
    fn parallel_pumps_never_run_backwards(
        lift in (1.0f64..20.0, 30.0f64..80.0, 0.002f64..0.02, 30.0f64..80.0, 0.002f64..0.02),
        third in prop::option::of(30.0f64..80.0),
        tank_head in 20.0f64..90.0,
        demand in 0.0f64..50.0,
        elevation in 0.0f64..15.0,
        diameter in 150.0f64..300.0,
        one_way in any::<bool>(),
    ) {
        let (source, a1, b1, a2, b2) = lift;
        let mut b = NetworkBuilder::new("pumps");
        b.reservoir("R", source)
            .reservoir("T", tank_head)
            .junction("J0", 0.0, 0.0)
            .junction("J", elevation, demand)
            .pump("P1", "R", "J0", PumpCurve::PowerFunction { a: a1, b: b1, c: 2.0 })
            .pump("P2", "R", "J0", PumpCurve::PowerFunction { a: a2, b: b2, c: 2.0 })
            .pipe("M", "J0", "J", 800.0, diameter, 120.0)
            .pipe("TJ", "T", "J", 600.0, diameter, 120.0);
        if let Some(a3) = third {
            b.pump("P3", "R", "J0", PumpCurve::PowerFunction { a: a3, b: 0.01, c: 2.0 });
        }
        if one_way {
            b.status("TJ", LinkStatus::CheckValve);
        }
        let net = b.build().unwrap();
        let sol = solve(&net);
        prop_assert!(sol.converged, "{:?}", sol.warnings);

        let mut guarded: Vec<&str> = vec!["P1", "P2"];
        if third.is_some() {
            guarded.push("P3");
        }
        if one_way {
            guarded.push("TJ");
        }
        for id in guarded {
            let link = sol.link(id).unwrap();
            prop_assert!(link.flow >= -1e-9, "{id}: {} ({:?})", link.flow, link.status);
            if link.status == LinkState::Blocked {
                prop_assert_eq!(link.flow, 0.0);
            }
        }
        // the full demand at J is served
        let inflow = sol.net_inflow(&net, "J");
        prop_assert!((inflow - demand).abs() < 1e-3, "{inflow} vs {demand}");
    }
}

fn single(demand: f64) -> WaterNetwork {
    let mut b = NetworkBuilder::new("single");
    b.reservoir("R", 100.0)
        .junction("J", 80.0, demand)
        .pipe("P", "R", "J", 1000.0, 300.0, 120.0);
    b.build().unwrap()
}
