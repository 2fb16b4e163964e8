//! Error types for the hn-app service layer.

use std::path::PathBuf;

/// Application error wrapping the backend crates for the CLI.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Project error: {0}")]
    Project(String),

    #[error("Failed to read project file: {path}")]
    ProjectFileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write project file: {path}")]
    ProjectFileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Project validation failed: {0}")]
    Validation(String),

    #[error("Solver error: {0}")]
    Solver(String),

    #[error("Simulation error: {0}")]
    Simulation(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for hn-app operations.
pub type AppResult<T> = Result<T, AppError>;

impl From<hn_network::NetworkError> for AppError {
    fn from(err: hn_network::NetworkError) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<hn_solver::SolverError> for AppError {
    fn from(err: hn_solver::SolverError) -> Self {
        AppError::Solver(err.to_string())
    }
}

impl From<hn_sim::SimError> for AppError {
    fn from(err: hn_sim::SimError) -> Self {
        AppError::Simulation(err.to_string())
    }
}
