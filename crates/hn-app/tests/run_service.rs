//! Runs over the demo project through the service layer.

use std::path::PathBuf;

use hn_app::{
    AppError, Project, RunMode, RunOptions, RunOutcome, RunProgressEvent, RunRequest, RunStage,
    execute_run, execute_run_with_progress, load_project, render_outcome, run_project_file,
    save_outcome, summarize_project,
};
use hn_network::NetworkBuilder;
use hn_sim::CancelToken;

fn demo_path() -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.pop(); // crates
    path.pop(); // repo root
    path.push("demos");
    path.push("town.yaml");
    path
}

fn small_project() -> Project {
    let mut b = NetworkBuilder::new("small");
    b.reservoir("R", 100.0)
        .junction("J", 80.0, 50.0)
        .pipe("P", "R", "J", 1000.0, 300.0, 120.0);
    Project::new(b.build().unwrap())
}

#[test]
fn demo_project_loads() {
    let project = load_project(&demo_path()).expect("demo project should load");
    let summary = summarize_project(&project);
    assert_eq!(summary.name, "town");
    assert_eq!(summary.junctions, 5);
    assert_eq!(summary.tanks, 1);
    assert_eq!(summary.pumps, 1);
    assert_eq!(summary.valves, 1);
    assert_eq!(summary.controls, 2);
    assert_eq!(summary.fire_flow_requests, 2);
    assert_eq!(project.solver.max_iterations, 60);
}

#[test]
fn steady_run_matches_hand_calculation() {
    let project = small_project();
    let response = execute_run(&RunRequest {
        project: &project,
        mode: RunMode::Steady,
        options: RunOptions::default(),
    })
    .unwrap();

    let RunOutcome::Steady(solution) = &response.outcome else {
        panic!("expected a steady outcome");
    };
    assert!(solution.converged);
    assert!((solution.node("J").unwrap().pressure - 17.937).abs() < 0.01);
    assert_eq!(response.timing.iterations, solution.iterations);
    assert!(render_outcome(&response.outcome).contains("Solution converged"));
}

#[test]
fn extended_period_reports_progress_per_step() {
    let mut events: Vec<RunProgressEvent> = Vec::new();
    let response = run_project_file(
        &demo_path(),
        RunMode::ExtendedPeriod,
        RunOptions::default(),
        Some(&mut |event| events.push(event)),
    )
    .unwrap();

    let RunOutcome::ExtendedPeriod(result) = &response.outcome else {
        panic!("expected an extended-period outcome");
    };
    assert_eq!(result.steps.len(), 25);
    assert_eq!(response.timing.steps, 25);

    assert!(matches!(events[0].stage, RunStage::LoadingProject));
    let sim: Vec<_> = events
        .iter()
        .filter_map(|e| e.simulation.as_ref())
        .collect();
    assert_eq!(sim.len(), 25);
    assert_eq!(sim.last().unwrap().fraction_complete, 1.0);
    assert!(matches!(events.last().unwrap().stage, RunStage::Completed));

    let series = result.tank_series("T1");
    assert!(series.iter().all(|(_, level)| (1.0..=6.0).contains(level)));
}

#[test]
fn cancelled_run_is_an_error() {
    let project = load_project(&demo_path()).unwrap();
    let token = CancelToken::new();
    token.cancel();
    let err = execute_run(&RunRequest {
        project: &project,
        mode: RunMode::ExtendedPeriod,
        options: RunOptions {
            cancel: Some(token),
        },
    })
    .unwrap_err();
    assert!(matches!(err, AppError::Simulation(_)));
}

#[test]
fn fire_flow_uses_project_requests() {
    let project = load_project(&demo_path()).unwrap();
    let mut events = Vec::new();
    let response = execute_run_with_progress(
        &RunRequest {
            project: &project,
            mode: RunMode::FireFlow { nodes: Vec::new() },
            options: RunOptions::default(),
        },
        Some(&mut |event: RunProgressEvent| events.push(event.stage)),
    )
    .unwrap();

    let RunOutcome::FireFlow(results) = &response.outcome else {
        panic!("expected a fire-flow outcome");
    };
    let ids: Vec<&str> = results.iter().map(|r| r.node_id.as_str()).collect();
    assert_eq!(ids, ["J3", "J4"]);
    assert_eq!(results[1].min_residual_pressure, 10.0);
    assert!(results.iter().all(|r| r.available_fire_flow <= 300.0));
    assert!(events.contains(&RunStage::AnalyzingFireFlow));
}

#[test]
fn fire_flow_named_nodes_fall_back_to_defaults() {
    let project = small_project();
    let response = execute_run(&RunRequest {
        project: &project,
        mode: RunMode::FireFlow {
            nodes: vec!["J".to_string()],
        },
        options: RunOptions::default(),
    })
    .unwrap();
    let RunOutcome::FireFlow(results) = response.outcome else {
        panic!("expected a fire-flow outcome");
    };
    assert_eq!(results[0].required_fire_flow, 16.0);
    assert_eq!(results[0].min_residual_pressure, 7.0);
}

#[test]
fn invalid_project_is_rejected_before_solving() {
    let mut project = small_project();
    project.solver.accuracy = -1.0;
    let err = execute_run(&RunRequest {
        project: &project,
        mode: RunMode::Steady,
        options: RunOptions::default(),
    })
    .unwrap_err();
    assert!(matches!(err, AppError::Solver(_)));
}

#[test]
fn outcome_saves_as_json() {
    let project = small_project();
    let response = execute_run(&RunRequest {
        project: &project,
        mode: RunMode::Steady,
        options: RunOptions::default(),
    })
    .unwrap();

    let path = std::env::temp_dir().join(format!("hn-app-outcome-{}.json", std::process::id()));
    save_outcome(&path, &response.outcome).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    std::fs::remove_file(&path).ok();
    assert!(text.contains("\"mode\": \"steady\""));

    let back: RunOutcome = serde_json::from_str(&text).unwrap();
    let (RunOutcome::Steady(before), RunOutcome::Steady(after)) = (&response.outcome, &back) else {
        panic!("expected steady outcomes");
    };
    assert_eq!(after.iterations, before.iterations);
    let p = |s: &hn_solver::HydraulicSolution| s.node("J").unwrap().pressure;
    assert!((p(after) - p(before)).abs() < 1e-9);
}
