//! Project loading, saving, validation, and introspection.
//!
//! A project bundles a network with the options for each kind of run. The
//! file format follows the extension: `.yaml`/`.yml` or `.json`.

use std::path::Path;

use hn_network::{LinkKind, NodeKind, TimeOptions, WaterNetwork, validate_network};
use hn_sim::{FireFlowOptions, FireFlowRequest};
use hn_solver::SolverOptions;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Overrides for the network's own time settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    pub duration_h: Option<f64>,
    pub hydraulic_step_h: Option<f64>,
}

impl SimulationSettings {
    pub fn apply(&self, times: &TimeOptions) -> TimeOptions {
        TimeOptions {
            duration_h: self.duration_h.unwrap_or(times.duration_h),
            hydraulic_step_h: self.hydraulic_step_h.unwrap_or(times.hydraulic_step_h),
            ..times.clone()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FireFlowSettings {
    pub search: FireFlowOptions,
    pub requests: Vec<FireFlowRequest>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub network: WaterNetwork,
    #[serde(default)]
    pub solver: SolverOptions,
    #[serde(default)]
    pub simulation: SimulationSettings,
    #[serde(default)]
    pub fire_flow: FireFlowSettings,
}

impl Project {
    pub fn new(network: WaterNetwork) -> Self {
        Self {
            network,
            solver: SolverOptions::default(),
            simulation: SimulationSettings::default(),
            fire_flow: FireFlowSettings::default(),
        }
    }

    /// The network with the simulation overrides applied.
    pub fn simulation_network(&self) -> WaterNetwork {
        let mut network = self.network.clone();
        network.times = self.simulation.apply(&self.network.times);
        network
    }
}

/// Counts for listing a project.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectSummary {
    pub name: String,
    pub junctions: usize,
    pub tanks: usize,
    pub reservoirs: usize,
    pub pipes: usize,
    pub pumps: usize,
    pub valves: usize,
    pub patterns: usize,
    pub controls: usize,
    pub duration_h: f64,
    pub fire_flow_requests: usize,
}

#[derive(Clone, Copy)]
enum Format {
    Yaml,
    Json,
}

fn format_of(path: &Path) -> AppResult<Format> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("yaml" | "yml") => Ok(Format::Yaml),
        Some("json") => Ok(Format::Json),
        _ => Err(AppError::Project(format!(
            "Unsupported project file extension: {}",
            path.display()
        ))),
    }
}

/// Parse a project from YAML text.
pub fn project_from_yaml(content: &str) -> AppResult<Project> {
    serde_yaml::from_str(content)
        .map_err(|e| AppError::Project(format!("Failed to parse project YAML: {}", e)))
}

/// Parse a project from JSON text.
pub fn project_from_json(content: &str) -> AppResult<Project> {
    serde_json::from_str(content)
        .map_err(|e| AppError::Project(format!("Failed to parse project JSON: {}", e)))
}

/// Load a project file.
pub fn load_project(path: &Path) -> AppResult<Project> {
    let format = format_of(path)?;
    let content = std::fs::read_to_string(path).map_err(|e| AppError::ProjectFileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    match format {
        Format::Yaml => project_from_yaml(&content),
        Format::Json => project_from_json(&content),
    }
}

/// Save a project file.
pub fn save_project(path: &Path, project: &Project) -> AppResult<()> {
    let content = match format_of(path)? {
        Format::Yaml => serde_yaml::to_string(project)
            .map_err(|e| AppError::Project(format!("Failed to serialize project: {}", e)))?,
        Format::Json => serde_json::to_string_pretty(project)
            .map_err(|e| AppError::Project(format!("Failed to serialize project: {}", e)))?,
    };

    std::fs::write(path, content).map_err(|e| AppError::ProjectFileWrite {
        path: path.to_path_buf(),
        source: e,
    })?;

    Ok(())
}

/// Validate the network, the option blocks and the fire-flow requests.
pub fn validate_project(project: &Project) -> AppResult<()> {
    validate_network(&project.network)?;
    project.solver.validate()?;

    let times = project.simulation.apply(&project.network.times);
    if !(times.hydraulic_step_h > 0.0) {
        return Err(AppError::Validation(
            "Hydraulic timestep must be positive".to_string(),
        ));
    }
    if !(times.duration_h >= 0.0) {
        return Err(AppError::Validation(
            "Simulation duration must be non-negative".to_string(),
        ));
    }

    for request in &project.fire_flow.requests {
        match project.network.node(&request.node_id) {
            None => {
                return Err(AppError::Validation(format!(
                    "Fire flow request names unknown node '{}'",
                    request.node_id
                )));
            }
            Some(node) if !node.is_junction() => {
                return Err(AppError::Validation(format!(
                    "Fire flow node '{}' is not a junction",
                    request.node_id
                )));
            }
            Some(_) => {}
        }
    }

    Ok(())
}

pub fn summarize_project(project: &Project) -> ProjectSummary {
    let network = &project.network;
    let mut summary = ProjectSummary {
        name: network.name.clone(),
        patterns: network.patterns.len(),
        controls: network.controls.len(),
        duration_h: project.simulation.apply(&network.times).duration_h,
        fire_flow_requests: project.fire_flow.requests.len(),
        ..ProjectSummary::default()
    };
    for node in &network.nodes {
        match node.kind {
            NodeKind::Junction(_) => summary.junctions += 1,
            NodeKind::Tank(_) => summary.tanks += 1,
            NodeKind::Reservoir(_) => summary.reservoirs += 1,
        }
    }
    for link in &network.links {
        match link.kind {
            LinkKind::Pipe(_) => summary.pipes += 1,
            LinkKind::Pump(_) => summary.pumps += 1,
            LinkKind::Valve(_) => summary.valves += 1,
        }
    }
    summary
}
