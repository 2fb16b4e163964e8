//! Fire-flow capacity by bisection over an added junction demand.
//!
//! Each probe solves the network with extra demand at the hydrant node and
//! reads the node's residual pressure. Two searches run over
//! `[0, search_max]`: one for the flow holding the minimum residual
//! pressure, one for the flow at which pressure reaches zero.

use hn_core::timing::Timer;
use hn_network::WaterNetwork;
use hn_solver::{Conditions, GradientSolver, SolverOptions};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{SimError, SimResult};
use crate::patterns::multipliers_at;

/// Default required fire flow (L/s).
pub const DEFAULT_REQUIRED_FIRE_FLOW: f64 = 16.0;

/// Default minimum residual pressure (m).
pub const DEFAULT_MIN_RESIDUAL_PRESSURE: f64 = 7.0;

/// One node to analyze.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FireFlowRequest {
    pub node_id: String,
    /// L/s
    #[serde(default = "default_required")]
    pub required_fire_flow: f64,
    /// m
    #[serde(default = "default_residual")]
    pub min_residual_pressure: f64,
}

fn default_required() -> f64 {
    DEFAULT_REQUIRED_FIRE_FLOW
}

fn default_residual() -> f64 {
    DEFAULT_MIN_RESIDUAL_PRESSURE
}

impl FireFlowRequest {
    pub fn new(node_id: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            required_fire_flow: DEFAULT_REQUIRED_FIRE_FLOW,
            min_residual_pressure: DEFAULT_MIN_RESIDUAL_PRESSURE,
        }
    }
}

/// Search window and bisection depth.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FireFlowOptions {
    /// Upper end of the search (L/s)
    pub search_max: f64,
    /// Bisection steps per search
    pub iterations: usize,
}

impl Default for FireFlowOptions {
    fn default() -> Self {
        Self {
            search_max: 500.0,
            iterations: 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FireFlowResult {
    pub node_id: String,
    pub required_fire_flow: f64,
    pub min_residual_pressure: f64,
    /// Pressure with no added demand (m)
    pub static_pressure: f64,
    /// Pressure with the required flow added (m)
    pub residual_pressure_at_required: f64,
    /// Largest added flow holding the minimum residual pressure (L/s)
    pub available_fire_flow: f64,
    /// Added flow at which pressure reaches zero (L/s)
    pub maximum_fire_flow: f64,
    /// True when pressure stayed non-negative up to the search ceiling
    pub maximum_limited_by_search: bool,
    /// Shortfall below the required flow (L/s), when there is one
    pub deficiency: Option<f64>,
    pub probes: usize,
    pub all_probes_converged: bool,
}

/// Analyze one junction with default search settings.
pub fn analyze_fire_flow(
    network: &WaterNetwork,
    node_id: &str,
    required_fire_flow: f64,
    min_residual_pressure: f64,
    options: &SolverOptions,
) -> SimResult<FireFlowResult> {
    let solver = GradientSolver::new(network)?;
    let request = FireFlowRequest {
        node_id: node_id.to_string(),
        required_fire_flow,
        min_residual_pressure,
    };
    analyze_fire_flow_with(&solver, &request, options, &FireFlowOptions::default())
}

/// Analyze many junctions in parallel, sharing one solver.
///
/// Results come back in request order; the first failing request fails the
/// whole batch.
pub fn analyze_fire_flow_many(
    network: &WaterNetwork,
    requests: &[FireFlowRequest],
    options: &SolverOptions,
    search: &FireFlowOptions,
) -> SimResult<Vec<FireFlowResult>> {
    let solver = GradientSolver::new(network)?;
    let timer = Timer::start("fire flow sweep");
    let results = requests
        .par_iter()
        .map(|request| analyze_fire_flow_with(&solver, request, options, search))
        .collect::<SimResult<Vec<_>>>()?;
    let elapsed_s = timer.stop_and_log();
    info!(nodes = results.len(), elapsed_s, "fire flow sweep finished");
    Ok(results)
}

struct Prober<'s, 'n> {
    solver: &'s GradientSolver<'n>,
    options: &'s SolverOptions,
    base: Conditions,
    node_id: &'s str,
    probes: usize,
    all_converged: bool,
}

impl Prober<'_, '_> {
    /// Residual pressure at the node with `flow` L/s added.
    fn pressure(&mut self, flow: f64) -> SimResult<f64> {
        let mut conditions = self.base.clone();
        conditions.set_extra_demand(self.node_id, flow);
        let solution = self.solver.solve(self.options, &conditions)?;
        self.probes += 1;
        self.all_converged &= solution.converged;
        let pressure = solution
            .node(self.node_id)
            .map(|n| n.pressure)
            .ok_or_else(|| SimError::UnknownNode {
                id: self.node_id.to_string(),
            })?;
        debug!(node = self.node_id, flow, pressure, "fire flow probe");
        Ok(pressure)
    }

    /// Largest flow in `[lo, hi]` with pressure at least `target`, given
    /// that `lo` passes and `hi` fails.
    fn bisect(&mut self, mut lo: f64, mut hi: f64, target: f64, iterations: usize) -> SimResult<f64> {
        for _ in 0..iterations {
            let mid = 0.5 * (lo + hi);
            if self.pressure(mid)? >= target {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        Ok(lo)
    }
}

/// Analyze one junction with a prepared solver.
///
/// Patterns are evaluated at the start of the simulation period.
pub fn analyze_fire_flow_with(
    solver: &GradientSolver<'_>,
    request: &FireFlowRequest,
    options: &SolverOptions,
    search: &FireFlowOptions,
) -> SimResult<FireFlowResult> {
    let network = solver.network();
    let node_id = request.node_id.as_str();
    let node = network.node(node_id).ok_or_else(|| SimError::UnknownNode {
        id: node_id.to_string(),
    })?;
    if !node.is_junction() {
        return Err(SimError::NotAJunction {
            id: node_id.to_string(),
        });
    }
    if !(request.required_fire_flow >= 0.0) || !request.min_residual_pressure.is_finite() {
        return Err(SimError::InvalidArg {
            what: "required fire flow must be non-negative and residual pressure finite",
        });
    }
    if !(search.search_max > 0.0 && search.search_max.is_finite()) {
        return Err(SimError::InvalidArg {
            what: "fire flow search ceiling must be positive",
        });
    }

    let mut prober = Prober {
        solver,
        options,
        base: Conditions::with_multipliers(multipliers_at(network, 0.0)),
        node_id,
        probes: 0,
        all_converged: true,
    };
    let target = request.min_residual_pressure;
    let ceiling = search.search_max;

    let static_pressure = prober.pressure(0.0)?;
    let residual_pressure_at_required = prober.pressure(request.required_fire_flow)?;
    let ceiling_pressure = prober.pressure(ceiling)?;

    let available_fire_flow = if static_pressure < target {
        0.0
    } else if ceiling_pressure >= target {
        ceiling
    } else {
        prober.bisect(0.0, ceiling, target, search.iterations)?
    };

    let (maximum_fire_flow, maximum_limited_by_search) = if ceiling_pressure >= 0.0 {
        (ceiling, true)
    } else if static_pressure < 0.0 {
        (0.0, false)
    } else {
        let lo = if target >= 0.0 { available_fire_flow } else { 0.0 };
        (prober.bisect(lo, ceiling, 0.0, search.iterations)?, false)
    };

    let deficiency = (available_fire_flow < request.required_fire_flow)
        .then(|| request.required_fire_flow - available_fire_flow);

    info!(
        node = node_id,
        static_pressure,
        available_fire_flow,
        maximum_fire_flow,
        probes = prober.probes,
        "fire flow analysis finished"
    );

    Ok(FireFlowResult {
        node_id: node_id.to_string(),
        required_fire_flow: request.required_fire_flow,
        min_residual_pressure: target,
        static_pressure,
        residual_pressure_at_required,
        available_fire_flow,
        maximum_fire_flow,
        maximum_limited_by_search,
        deficiency,
        probes: prober.probes,
        all_probes_converged: prober.all_converged,
    })
}
