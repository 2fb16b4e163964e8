//! Error types for solver operations.
//!
//! Non-convergence is not an error: it is reported on the solution.

use hn_components::ComponentError;
use hn_core::error::HnError;
use hn_network::NetworkError;
use thiserror::Error;

/// Errors that can occur while setting up or running a solve.
#[derive(Error, Debug)]
pub enum SolverError {
    #[error("Problem setup error: {what}")]
    ProblemSetup { what: String },

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Component error: {0}")]
    Component(#[from] ComponentError),

    #[error("Numeric error: {what}")]
    Numeric { what: String },
}

pub type SolverResult<T> = Result<T, SolverError>;

impl From<SolverError> for HnError {
    fn from(e: SolverError) -> Self {
        match e {
            SolverError::ProblemSetup { what } => HnError::Invariant { what },
            SolverError::Network(e) => e.into(),
            SolverError::Component(e) => e.into(),
            SolverError::Numeric { what } => HnError::Invariant { what },
        }
    }
}
