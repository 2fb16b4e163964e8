//! Fire-flow capacity searches.

use hn_network::{NetworkBuilder, WaterNetwork};
use hn_sim::{
    FireFlowOptions, FireFlowRequest, SimError, analyze_fire_flow, analyze_fire_flow_many,
};
use hn_solver::SolverOptions;

/// Reservoir at 120 m feeding a junction at 80 m through 500 m of 300 mm pipe.
fn hydrant() -> WaterNetwork {
    let mut b = NetworkBuilder::new("hydrant");
    b.reservoir("R", 120.0)
        .junction("J", 80.0, 10.0)
        .pipe("P", "R", "J", 500.0, 300.0, 130.0);
    b.build().unwrap()
}

/// Total pipe flow (L/s) at which the loss reaches `loss` m.
fn flow_for_loss(loss: f64) -> f64 {
    let r = 10.67 * 500.0 / (130.0_f64.powf(1.852) * 0.3_f64.powf(4.87));
    (loss / r).powf(1.0 / 1.852) * 1000.0
}

#[test]
fn ample_supply_meets_requirement() {
    let result = analyze_fire_flow(&hydrant(), "J", 30.0, 7.0, &SolverOptions::default()).unwrap();

    assert!(result.available_fire_flow >= 30.0);
    assert_eq!(result.deficiency, None);
    assert!(result.all_probes_converged);
    assert!((result.static_pressure - 39.955).abs() < 0.01);
    assert!(result.residual_pressure_at_required < result.static_pressure);

    // 40 m static head less 7 m residual is spent in the pipe
    let available = flow_for_loss(33.0) - 10.0;
    assert!(
        (result.available_fire_flow - available).abs() < 0.5,
        "available {} vs {available}",
        result.available_fire_flow
    );

    let maximum = flow_for_loss(40.0) - 10.0;
    assert!((result.maximum_fire_flow - maximum).abs() < 0.5);
    assert!(!result.maximum_limited_by_search);
    assert!(result.maximum_fire_flow > result.available_fire_flow);
}

#[test]
fn thin_main_reports_deficiency() {
    let mut b = NetworkBuilder::new("thin");
    b.reservoir("R", 100.0)
        .junction("J", 80.0, 2.0)
        .pipe("P", "R", "J", 2000.0, 80.0, 100.0);
    let result = analyze_fire_flow(&b.build().unwrap(), "J", 30.0, 7.0, &SolverOptions::default())
        .unwrap();

    assert!(result.available_fire_flow < 30.0);
    let deficiency = result.deficiency.unwrap();
    assert!((deficiency - (30.0 - result.available_fire_flow)).abs() < 1e-12);
}

#[test]
fn small_ceiling_limits_search() {
    let net = hydrant();
    let search = FireFlowOptions {
        search_max: 50.0,
        iterations: 10,
    };
    let results = analyze_fire_flow_many(
        &net,
        &[FireFlowRequest::new("J")],
        &SolverOptions::default(),
        &search,
    )
    .unwrap();
    let r = &results[0];
    assert_eq!(r.available_fire_flow, 50.0);
    assert_eq!(r.maximum_fire_flow, 50.0);
    assert!(r.maximum_limited_by_search);
    // static, required and ceiling probes only
    assert_eq!(r.probes, 3);
}

#[test]
fn many_nodes_keep_request_order() {
    let mut b = NetworkBuilder::new("street");
    b.reservoir("R", 90.0)
        .junction("A", 40.0, 5.0)
        .junction("B", 45.0, 5.0)
        .junction("C", 50.0, 5.0)
        .pipe("RA", "R", "A", 400.0, 300.0, 120.0)
        .pipe("AB", "A", "B", 400.0, 200.0, 120.0)
        .pipe("BC", "B", "C", 400.0, 150.0, 120.0);
    let net = b.build().unwrap();

    let requests: Vec<_> = ["C", "A", "B"].into_iter().map(FireFlowRequest::new).collect();
    let results = analyze_fire_flow_many(
        &net,
        &requests,
        &SolverOptions::default(),
        &FireFlowOptions::default(),
    )
    .unwrap();

    let ids: Vec<&str> = results.iter().map(|r| r.node_id.as_str()).collect();
    assert_eq!(ids, ["C", "A", "B"]);
    // capacity shrinks toward the end of the street
    assert!(results[1].available_fire_flow > results[2].available_fire_flow);
    assert!(results[2].available_fire_flow > results[0].available_fire_flow);
}

#[test]
fn non_junction_targets_are_errors() {
    let net = hydrant();
    let options = SolverOptions::default();
    assert!(matches!(
        analyze_fire_flow(&net, "R", 16.0, 7.0, &options),
        Err(SimError::NotAJunction { .. })
    ));
    assert!(matches!(
        analyze_fire_flow(&net, "X", 16.0, 7.0, &options),
        Err(SimError::UnknownNode { .. })
    ));
}
