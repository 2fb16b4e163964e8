//! Operational warnings collected during result assembly.
//!
//! Warnings never interrupt a solve; they are returned on the solution.

use tracing::debug;

use crate::options::{DemandModel, SolverOptions};

#[derive(Debug, Default)]
pub struct Warnings(Vec<String>);

impl Warnings {
    fn push(&mut self, message: String) {
        debug!(%message, "solver warning");
        self.0.push(message);
    }

    pub fn non_convergence(&mut self, iterations: usize, head_change: f64, flow_change: f64) {
        self.push(format!(
            "Hydraulic solution did not converge in {iterations} iterations \
             (last head change {head_change:.2e} m, flow change {flow_change:.2e} L/s)"
        ));
    }

    pub fn disconnected(&mut self, node: &str) {
        self.push(format!(
            "Junction {node} is disconnected from every tank and reservoir"
        ));
    }

    /// Negative or below-service pressure at a junction.
    pub fn pressure(&mut self, node: &str, pressure: f64, options: &SolverOptions) {
        if pressure < 0.0 {
            self.push(format!("Negative pressure at junction {node}: {pressure:.2} m"));
        } else if pressure < options.min_service_pressure {
            self.push(format!(
                "Low pressure at junction {node}: {pressure:.2} m (minimum {:.2} m)",
                options.min_service_pressure
            ));
        }
    }

    /// Pressure-driven demand advisory for a junction with demand.
    pub fn demand_shortfall(&mut self, node: &str, pressure: f64, options: &SolverOptions) {
        if options.demand_model != DemandModel::Pda {
            return;
        }
        if pressure < options.min_pressure {
            self.push(format!(
                "Demand at junction {node} cannot be met: pressure {pressure:.2} m below {:.2} m",
                options.min_pressure
            ));
        } else if pressure < options.required_pressure {
            self.push(format!(
                "Demand at junction {node} may be only partly met: pressure {pressure:.2} m below {:.2} m",
                options.required_pressure
            ));
        }
    }

    pub fn velocity(&mut self, link: &str, velocity: f64, options: &SolverOptions) {
        if velocity > options.max_velocity {
            self.push(format!(
                "High velocity in pipe {link}: {velocity:.2} m/s (maximum {:.2} m/s)",
                options.max_velocity
            ));
        }
    }

    pub fn pump_blocked(&mut self, link: &str) {
        self.push(format!("Pump {link} cannot deliver the required head and is shut"));
    }

    pub fn prv_open(&mut self, link: &str) {
        self.push(format!(
            "PRV {link} cannot hold its setting: upstream head is below the target"
        ));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}
