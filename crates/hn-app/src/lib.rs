//! Shared application service layer for hydronet.
//!
//! Project files, run execution and report rendering used by the CLI.

pub mod error;
pub mod progress;
pub mod project_service;
pub mod report;
pub mod run_service;

pub use error::{AppError, AppResult};
pub use progress::{RunProgressEvent, RunStage, SimulationProgress};
pub use project_service::{
    FireFlowSettings, Project, ProjectSummary, SimulationSettings, load_project, save_project,
    summarize_project, validate_project,
};
pub use report::{render_fire_flow, render_outcome, render_simulation, render_solution};
pub use run_service::{
    RunMode, RunOptions, RunOutcome, RunRequest, RunResponse, RunTimingSummary, execute_run,
    execute_run_with_progress, fire_flow_requests, run_project_file, save_outcome,
};
