//! Solver configuration.

use serde::{Deserialize, Serialize};

use crate::error::{SolverError, SolverResult};

/// How junction demands respond to pressure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DemandModel {
    /// Demand-driven: full demand regardless of pressure.
    #[default]
    Dda,
    /// Pressure-driven: demands are still delivered in full; shortfalls
    /// below `required_pressure` are reported as warnings.
    Pda,
}

/// How the head correction of each iteration is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HeadUpdate {
    /// Solve the assembled nodal gradient system.
    #[default]
    Gradient,
    /// One Jacobi sweep of the same system per iteration: each junction
    /// head moves by its row residual over the row diagonal. Converges on
    /// trees and small networks; it can diverge on looped networks.
    NodalRelaxation,
}

/// Iterative method used for the nodal head system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LinearSolver {
    /// Jacobi-preconditioned conjugate gradient.
    #[default]
    ConjugateGradient,
    /// Bounded Gauss-Seidel sweeps.
    GaussSeidel,
}

/// Solver options. Every field has a default, so partial option blocks in
/// project files deserialize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverOptions {
    pub max_iterations: usize,
    /// Head convergence tolerance (m); flows use ten times this in L/s
    pub accuracy: f64,
    /// Relaxation applied to every head and flow correction
    pub damping_factor: f64,
    /// Model check-valve links as one-way
    pub check_valves: bool,
    pub demand_model: DemandModel,
    /// PDA: pressure (m) below which no demand can be delivered
    pub min_pressure: f64,
    /// PDA: pressure (m) at which full demand is delivered
    pub required_pressure: f64,
    /// Pipe velocity (m/s) above which a warning is issued
    pub max_velocity: f64,
    /// Junction pressure (m) below which a warning is issued
    pub min_service_pressure: f64,
    pub head_update: HeadUpdate,
    pub linear_solver: LinearSolver,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            max_iterations: 40,
            accuracy: 0.001,
            damping_factor: 1.0,
            check_valves: true,
            demand_model: DemandModel::Dda,
            min_pressure: 0.0,
            required_pressure: 20.0,
            max_velocity: 3.0,
            min_service_pressure: 10.0,
            head_update: HeadUpdate::Gradient,
            linear_solver: LinearSolver::ConjugateGradient,
        }
    }
}

impl SolverOptions {
    /// Reject settings the iteration cannot work with.
    pub fn validate(&self) -> SolverResult<()> {
        let bad = |what: &str| -> SolverResult<()> {
            Err(SolverError::ProblemSetup {
                what: what.to_string(),
            })
        };
        if self.max_iterations == 0 {
            return bad("max_iterations must be at least 1");
        }
        if !(self.accuracy > 0.0 && self.accuracy.is_finite()) {
            return bad("accuracy must be positive");
        }
        if !(self.damping_factor > 0.0 && self.damping_factor < 2.0) {
            return bad("damping_factor must be in (0, 2)");
        }
        if self.demand_model == DemandModel::Pda && self.required_pressure < self.min_pressure {
            return bad("required_pressure must not be below min_pressure");
        }
        Ok(())
    }
}
