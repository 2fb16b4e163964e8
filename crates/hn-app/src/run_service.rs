//! Run execution service: steady solves, extended-period simulations and
//! fire-flow sweeps over a loaded project.

use std::path::Path;
use std::time::Instant;

use hn_network::WaterNetwork;
use hn_sim::{
    CancelToken, FireFlowRequest, FireFlowResult, RunControl, SimProgress, SimulationResult,
    analyze_fire_flow_many, multipliers_at, run_simulation_with,
};
use hn_solver::{HydraulicSolution, solve_network};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::progress::{RunProgressEvent, RunStage, SimulationProgress};
use crate::project_service::{self, Project};

/// What kind of analysis a run performs.
#[derive(Debug, Clone, PartialEq)]
pub enum RunMode {
    /// One snapshot at the start of the period.
    Steady,
    ExtendedPeriod,
    /// Fire flow at the given junctions. Empty means the project's requests,
    /// or every junction when the project has none.
    FireFlow { nodes: Vec<String> },
}

impl RunMode {
    pub fn label(&self) -> &'static str {
        match self {
            RunMode::Steady => "steady",
            RunMode::ExtendedPeriod => "extended-period",
            RunMode::FireFlow { .. } => "fire-flow",
        }
    }
}

/// Options for running simulations.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Checked between extended-period timesteps
    pub cancel: Option<CancelToken>,
}

/// Request to execute a run.
pub struct RunRequest<'a> {
    pub project: &'a Project,
    pub mode: RunMode,
    pub options: RunOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "result", rename_all = "kebab-case")]
pub enum RunOutcome {
    Steady(HydraulicSolution),
    ExtendedPeriod(SimulationResult),
    FireFlow(Vec<FireFlowResult>),
}

impl RunOutcome {
    pub fn converged(&self) -> bool {
        match self {
            RunOutcome::Steady(s) => s.converged,
            RunOutcome::ExtendedPeriod(r) => r.all_converged,
            RunOutcome::FireFlow(results) => results.iter().all(|r| r.all_probes_converged),
        }
    }
}

/// Concise timing and execution summary for a run.
#[derive(Debug, Clone, Default)]
pub struct RunTimingSummary {
    pub validate_time_s: f64,
    pub solve_time_s: f64,
    pub total_time_s: f64,
    /// Gradient iterations of a steady solve
    pub iterations: usize,
    /// Timesteps of an extended-period run
    pub steps: usize,
    /// Network solves across a fire-flow sweep
    pub probes: usize,
}

/// Response from a run execution.
#[derive(Debug, Clone)]
pub struct RunResponse {
    pub outcome: RunOutcome,
    pub timing: RunTimingSummary,
}

fn emit_progress(
    progress_cb: &mut Option<&mut dyn FnMut(RunProgressEvent)>,
    mode: &RunMode,
    stage: RunStage,
    started: Instant,
    message: Option<String>,
    simulation: Option<SimulationProgress>,
) {
    if let Some(cb) = progress_cb.as_deref_mut() {
        cb(RunProgressEvent {
            mode: mode.clone(),
            stage,
            elapsed_wall_s: started.elapsed().as_secs_f64(),
            message,
            simulation,
        });
    }
}

/// Execute a run.
pub fn execute_run(request: &RunRequest) -> AppResult<RunResponse> {
    execute_run_with_progress(request, None)
}

/// Load a project file and execute a run on it.
pub fn run_project_file(
    path: &Path,
    mode: RunMode,
    options: RunOptions,
    mut progress_cb: Option<&mut dyn FnMut(RunProgressEvent)>,
) -> AppResult<RunResponse> {
    emit_progress(
        &mut progress_cb,
        &mode,
        RunStage::LoadingProject,
        Instant::now(),
        Some(format!("Loading {}", path.display())),
        None,
    );
    let project = project_service::load_project(path)?;
    let request = RunRequest {
        project: &project,
        mode,
        options,
    };
    execute_run_with_progress(&request, progress_cb)
}

/// Execute a run and stream progress events.
pub fn execute_run_with_progress(
    request: &RunRequest,
    mut progress_cb: Option<&mut dyn FnMut(RunProgressEvent)>,
) -> AppResult<RunResponse> {
    let started = Instant::now();
    let mode = &request.mode;
    let project = request.project;
    let mut timing = RunTimingSummary::default();

    emit_progress(
        &mut progress_cb,
        mode,
        RunStage::Validating,
        started,
        Some("Validating project".to_string()),
        None,
    );
    project_service::validate_project(project)?;
    timing.validate_time_s = started.elapsed().as_secs_f64();
    info!(
        network = %project.network.name,
        mode = mode.label(),
        "run started"
    );

    let solve_started = Instant::now();
    let outcome = match mode {
        RunMode::Steady => {
            emit_progress(&mut progress_cb, mode, RunStage::Solving, started, None, None);
            let network = &project.network;
            let solution = solve_network(network, &project.solver, &multipliers_at(network, 0.0))?;
            timing.iterations = solution.iterations;
            RunOutcome::Steady(solution)
        }
        RunMode::ExtendedPeriod => {
            let network = project.simulation_network();
            let mut on_step = |p: SimProgress| {
                let fraction_complete = (p.step + 1) as f64 / p.total_steps as f64;
                emit_progress(
                    &mut progress_cb,
                    mode,
                    RunStage::Simulating,
                    started,
                    None,
                    Some(SimulationProgress {
                        sim_time_h: p.time_h,
                        duration_h: p.duration_h,
                        fraction_complete,
                        step: p.step,
                        total_steps: p.total_steps,
                    }),
                );
            };
            let control = RunControl {
                cancel: request.options.cancel.as_ref(),
                progress: Some(&mut on_step),
            };
            let result = run_simulation_with(&network, &project.solver, control)?;
            timing.steps = result.steps.len();
            RunOutcome::ExtendedPeriod(result)
        }
        RunMode::FireFlow { nodes } => {
            let requests = fire_flow_requests(project, nodes);
            emit_progress(
                &mut progress_cb,
                mode,
                RunStage::AnalyzingFireFlow,
                started,
                Some(format!("{} nodes", requests.len())),
                None,
            );
            let results = analyze_fire_flow_many(
                &project.network,
                &requests,
                &project.solver,
                &project.fire_flow.search,
            )?;
            timing.probes = results.iter().map(|r| r.probes).sum();
            RunOutcome::FireFlow(results)
        }
    };
    timing.solve_time_s = solve_started.elapsed().as_secs_f64();
    timing.total_time_s = started.elapsed().as_secs_f64();

    emit_progress(
        &mut progress_cb,
        mode,
        RunStage::Completed,
        started,
        None,
        None,
    );
    info!(
        network = %project.network.name,
        mode = mode.label(),
        converged = outcome.converged(),
        total_time_s = timing.total_time_s,
        "run finished"
    );

    Ok(RunResponse { outcome, timing })
}

fn all_junctions(network: &WaterNetwork) -> Vec<FireFlowRequest> {
    network
        .junctions()
        .map(|(node, _)| FireFlowRequest::new(node.id.clone()))
        .collect()
}

/// Requests for the named nodes, taking per-node settings from the project
/// where it has them.
pub fn fire_flow_requests(project: &Project, nodes: &[String]) -> Vec<FireFlowRequest> {
    let configured = &project.fire_flow.requests;
    if nodes.is_empty() {
        if configured.is_empty() {
            return all_junctions(&project.network);
        }
        return configured.clone();
    }
    nodes
        .iter()
        .map(|id| {
            configured
                .iter()
                .find(|r| &r.node_id == id)
                .cloned()
                .unwrap_or_else(|| FireFlowRequest::new(id.clone()))
        })
        .collect()
}

/// Write a run outcome as JSON or YAML, by file extension.
pub fn save_outcome(path: &Path, outcome: &RunOutcome) -> AppResult<()> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    let content = match ext.as_deref() {
        Some("json") => serde_json::to_string_pretty(outcome)
            .map_err(|e| AppError::InvalidInput(format!("Failed to serialize results: {}", e)))?,
        Some("yaml" | "yml") => serde_yaml::to_string(outcome)
            .map_err(|e| AppError::InvalidInput(format!("Failed to serialize results: {}", e)))?,
        _ => {
            return Err(AppError::InvalidInput(format!(
                "Unsupported results file extension: {}",
                path.display()
            )));
        }
    };
    std::fs::write(path, content)?;
    Ok(())
}
