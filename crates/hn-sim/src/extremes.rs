//! System-wide extremes over a simulation.

use hn_solver::HydraulicSolution;
use serde::{Deserialize, Serialize};

/// One extreme value with where and when it occurred.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extreme {
    pub value: f64,
    pub id: String,
    pub time_h: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Extremes {
    /// Highest junction pressure (m)
    pub max_pressure: Option<Extreme>,
    /// Lowest pressure at a supplied junction (m)
    pub min_pressure: Option<Extreme>,
    /// Highest link velocity (m/s)
    pub max_velocity: Option<Extreme>,
    /// Largest absolute link head loss (m)
    pub max_head_loss: Option<Extreme>,
}

fn keep(slot: &mut Option<Extreme>, value: f64, id: &str, time_h: f64, better: fn(f64, f64) -> bool) {
    let replace = match slot {
        Some(current) => better(value, current.value),
        None => true,
    };
    if replace {
        *slot = Some(Extreme {
            value,
            id: id.to_string(),
            time_h,
        });
    }
}

impl Extremes {
    /// Fold one timestep's solution in. Ties keep the earliest occurrence.
    pub fn update(&mut self, time_h: f64, solution: &HydraulicSolution) {
        for node in solution.junctions() {
            keep(&mut self.max_pressure, node.pressure, &node.id, time_h, |a, b| a > b);
            if node.supplied {
                keep(&mut self.min_pressure, node.pressure, &node.id, time_h, |a, b| a < b);
            }
        }
        for link in &solution.links {
            keep(&mut self.max_velocity, link.velocity, &link.id, time_h, |a, b| a > b);
            keep(
                &mut self.max_head_loss,
                link.head_loss.abs(),
                &link.id,
                time_h,
                |a, b| a > b,
            );
        }
    }
}
