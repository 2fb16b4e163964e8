//! Time-stepped and capacity analyses built on the steady solver.
//!
//! Provides:
//! - Extended-period simulation with patterns, controls and tank storage
//! - Fire-flow capacity search, one node or many in parallel
//! - Cooperative cancellation and progress reporting for long runs

pub mod cancel;
pub mod controls;
pub mod error;
pub mod extremes;
pub mod fire_flow;
pub mod patterns;
pub mod sim;
pub mod tank;

// Re-exports for public API
pub use cancel::CancelToken;
pub use error::{SimError, SimResult};
pub use extremes::{Extreme, Extremes};
pub use fire_flow::{
    DEFAULT_MIN_RESIDUAL_PRESSURE, DEFAULT_REQUIRED_FIRE_FLOW, FireFlowOptions, FireFlowRequest,
    FireFlowResult, analyze_fire_flow, analyze_fire_flow_many, analyze_fire_flow_with,
};
pub use patterns::{multipliers_at, pattern_index};
pub use sim::{
    RunControl, SimProgress, SimState, SimulationResult, TimeStepResult, run_simulation,
    run_simulation_with,
};
pub use tank::{Storage, TankLimit};
