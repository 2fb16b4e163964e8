//! Error types for simulation and fire-flow runs.

use hn_network::NetworkError;
use hn_solver::SolverError;
use thiserror::Error;

/// Errors encountered during extended-period or fire-flow analysis.
///
/// Non-converged timesteps and probes are reported on the results.
#[derive(Error, Debug)]
pub enum SimError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Node {id} is not a junction")]
    NotAJunction { id: String },

    #[error("Unknown node: {id}")]
    UnknownNode { id: String },

    #[error("Run cancelled at t = {time_h} h")]
    Cancelled { time_h: f64 },

    #[error("Solver error: {0}")]
    Solver(#[from] SolverError),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),
}

pub type SimResult<T> = Result<T, SimError>;
