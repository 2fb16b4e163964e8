//! Extended-period simulation runner.
//!
//! The network description is never mutated: everything that changes
//! between timesteps (tank levels, link overrides from controls) lives in
//! a [`SimState`] threaded through the loop and handed to the solver as
//! [`Conditions`].

use std::collections::{BTreeMap, HashMap};

use hn_core::timing::Timer;
use hn_core::units::{hours, kw, to_kwh};
use hn_network::{Tank, WaterNetwork};
use hn_solver::{Conditions, GradientSolver, HydraulicSolution, LinkOverride, SolverOptions};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cancel::CancelToken;
use crate::controls::{apply_controls, check_controls};
use crate::error::{SimError, SimResult};
use crate::extremes::Extremes;
use crate::patterns::multipliers_at;
use crate::tank::{Storage, TankLimit, next_level};

/// State carried from one timestep to the next.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimState {
    /// Tank id to water level (m)
    pub tank_levels: BTreeMap<String, f64>,
    /// Link id to the override set by fired controls
    pub link_overrides: HashMap<String, LinkOverride>,
}

impl SimState {
    /// Tanks at their initial levels, no overrides.
    pub fn initial(network: &WaterNetwork) -> Self {
        Self {
            tank_levels: network
                .tanks()
                .map(|(node, tank)| (node.id.clone(), tank.init_level))
                .collect(),
            link_overrides: HashMap::new(),
        }
    }

    /// Solver conditions for one timestep.
    pub fn conditions(&self, multipliers: hn_solver::PatternMultipliers) -> Conditions {
        Conditions {
            multipliers,
            tank_levels: self
                .tank_levels
                .iter()
                .map(|(id, level)| (id.clone(), *level))
                .collect(),
            extra_demand: HashMap::new(),
            link_overrides: self.link_overrides.clone(),
        }
    }
}

/// Progress reported after each solved timestep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimProgress {
    /// Zero-based step just solved
    pub step: usize,
    pub total_steps: usize,
    pub time_h: f64,
    pub duration_h: f64,
}

/// Optional hooks for a run.
#[derive(Default)]
pub struct RunControl<'a> {
    pub cancel: Option<&'a CancelToken>,
    pub progress: Option<&'a mut dyn FnMut(SimProgress)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeStepResult {
    pub time_h: f64,
    pub solution: HydraulicSolution,
    /// Tank levels the step was solved with (m)
    pub tank_levels: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub steps: Vec<TimeStepResult>,
    pub extremes: Extremes,
    pub total_energy_kwh: f64,
    /// Total energy times the mean pump energy price
    pub energy_cost: f64,
    /// Pump id to energy (kWh)
    pub pump_energy: BTreeMap<String, f64>,
    pub all_converged: bool,
    pub warnings: Vec<String>,
}

impl SimulationResult {
    /// Level history of one tank.
    pub fn tank_series(&self, tank_id: &str) -> Vec<(f64, f64)> {
        self.steps
            .iter()
            .filter_map(|s| s.tank_levels.get(tank_id).map(|l| (s.time_h, *l)))
            .collect()
    }
}

/// Run an extended-period simulation over the network's time settings.
pub fn run_simulation(
    network: &WaterNetwork,
    options: &SolverOptions,
) -> SimResult<SimulationResult> {
    run_simulation_with(network, options, RunControl::default())
}

struct TankStore<'n> {
    id: &'n str,
    tank: &'n Tank,
    storage: Storage,
}

fn mean_energy_price(network: &WaterNetwork) -> f64 {
    let prices: Vec<f64> = network.pumps().map(|(_, p)| p.energy_price).collect();
    if prices.is_empty() {
        0.0
    } else {
        prices.iter().sum::<f64>() / prices.len() as f64
    }
}

/// Run with cancellation and progress hooks.
pub fn run_simulation_with(
    network: &WaterNetwork,
    options: &SolverOptions,
    mut control: RunControl<'_>,
) -> SimResult<SimulationResult> {
    let times = &network.times;
    let dt = times.hydraulic_step_h;
    if !(dt > 0.0 && dt.is_finite()) {
        return Err(SimError::InvalidArg {
            what: "hydraulic timestep must be positive",
        });
    }
    if !(times.duration_h >= 0.0 && times.duration_h.is_finite()) {
        return Err(SimError::InvalidArg {
            what: "simulation duration must be non-negative",
        });
    }
    options.validate()?;
    check_controls(network)?;

    let solver = GradientSolver::new(network)?;
    let tanks = network
        .tanks()
        .map(|(node, tank)| {
            Storage::for_tank(tank, network).map(|storage| TankStore {
                id: &node.id,
                tank,
                storage,
            })
        })
        .collect::<SimResult<Vec<_>>>()?;

    let last = (times.duration_h / dt + 1e-9).floor() as usize;
    let total_steps = last + 1;
    info!(
        network = %network.name,
        duration_h = times.duration_h,
        step_h = dt,
        steps = total_steps,
        "extended period simulation started"
    );
    let timer = Timer::start("extended period simulation");

    let mut state = SimState::initial(network);
    let mut steps: Vec<TimeStepResult> = Vec::with_capacity(total_steps);
    let mut extremes = Extremes::default();
    let mut pump_energy: BTreeMap<String, f64> = BTreeMap::new();
    let mut total_energy_kwh = 0.0;
    let mut all_converged = true;
    let mut warnings = Vec::new();

    for step in 0..total_steps {
        let time_h = step as f64 * dt;
        if control.cancel.is_some_and(CancelToken::is_cancelled) {
            warn!(time_h, "extended period simulation cancelled");
            return Err(SimError::Cancelled { time_h });
        }

        let previous = steps.last().map(|s| &s.solution);
        apply_controls(network, time_h, dt, &mut state, previous);
        let conditions = state.conditions(multipliers_at(network, time_h));
        let solution = solver.solve(options, &conditions)?;

        if !solution.converged {
            all_converged = false;
            warnings.push(format!(
                "t = {time_h:.2} h: hydraulic solution did not converge in {} iterations",
                solution.iterations
            ));
        }
        extremes.update(time_h, &solution);

        // the final step is a snapshot; energy and storage integrate over the
        // interval that follows each earlier step
        let interval = if step < last { dt } else { 0.0 };
        for pump in solution.pumps() {
            let energy = to_kwh(kw(pump.power_kw) * hours(interval));
            *pump_energy.entry(pump.id.clone()).or_default() += energy;
            total_energy_kwh += energy;
        }

        let levels = state.tank_levels.clone();
        if interval > 0.0 {
            for store in &tanks {
                let level = levels
                    .get(store.id)
                    .copied()
                    .unwrap_or(store.tank.init_level);
                // Net inflow over every connected link, pumps and valves
                // included, not only pipes.
                let inflow = solution.node(store.id).map_or(0.0, |n| n.demand);
                let (next, limit) = next_level(store.tank, &store.storage, level, inflow, interval);
                if let Some(limit) = limit {
                    if level != next {
                        let what = match limit {
                            TankLimit::Empty => "empty",
                            TankLimit::Full => "full",
                        };
                        warn!(tank = store.id, time_h = time_h + interval, "tank {what}");
                        warnings.push(format!(
                            "t = {:.2} h: tank {} is {what} (level {next:.2} m)",
                            time_h + interval,
                            store.id
                        ));
                    }
                }
                state.tank_levels.insert(store.id.to_string(), next);
            }
        }

        debug!(
            step,
            time_h,
            iterations = solution.iterations,
            converged = solution.converged,
            "timestep solved"
        );
        steps.push(TimeStepResult {
            time_h,
            solution,
            tank_levels: levels,
        });
        if let Some(progress) = control.progress.as_deref_mut() {
            progress(SimProgress {
                step,
                total_steps,
                time_h,
                duration_h: times.duration_h,
            });
        }
    }

    let energy_cost = total_energy_kwh * mean_energy_price(network);
    let elapsed_s = timer.stop_and_log();
    info!(
        network = %network.name,
        steps = steps.len(),
        all_converged,
        total_energy_kwh,
        elapsed_s,
        "extended period simulation finished"
    );

    Ok(SimulationResult {
        steps,
        extremes,
        total_energy_kwh,
        energy_cost,
        pump_energy,
        all_converged,
        warnings,
    })
}
