//! Steady-state hydraulic solver for water distribution networks.
//!
//! This crate provides a gradient-method (Todini-Pilati) solver where the
//! unknowns are junction heads and link flows. Tanks and reservoirs are
//! fixed-head boundaries; pumps, check valves and PRVs change status during
//! the iteration.

pub mod conditions;
pub mod error;
mod gradient;
pub mod options;
pub mod results;
pub mod solve;
pub mod sparse;
pub mod status;
pub mod warnings;

pub use conditions::{Conditions, LinkOverride, PatternMultipliers};
pub use error::{SolverError, SolverResult};
pub use options::{DemandModel, HeadUpdate, LinearSolver, SolverOptions};
pub use results::{HydraulicSolution, LinkResult, LinkType, NodeResult, NodeType};
pub use solve::{GradientSolver, solve_network};
pub use sparse::{LinearSolve, SparseMatrix};
pub use status::LinkState;
