//! Plain-text rendering of run results.

use std::fmt::Write;

use hn_sim::{Extreme, FireFlowResult, SimulationResult};
use hn_solver::{HydraulicSolution, LinkState, LinkType, NodeType};

use crate::run_service::RunOutcome;

fn node_type(t: NodeType) -> &'static str {
    match t {
        NodeType::Junction => "junction",
        NodeType::Tank => "tank",
        NodeType::Reservoir => "reservoir",
    }
}

fn link_type(t: LinkType) -> &'static str {
    match t {
        LinkType::Pipe => "pipe",
        LinkType::Pump => "pump",
        LinkType::Valve => "valve",
    }
}

fn link_state(s: LinkState) -> &'static str {
    match s {
        LinkState::Open => "open",
        LinkState::Closed => "closed",
        LinkState::Blocked => "blocked",
        LinkState::Active => "active",
    }
}

fn push_warnings(out: &mut String, warnings: &[String]) {
    if warnings.is_empty() {
        return;
    }
    let _ = writeln!(out, "\nWarnings:");
    for w in warnings {
        let _ = writeln!(out, "  - {}", w);
    }
}

/// Node and link tables for one hydraulic snapshot.
pub fn render_solution(solution: &HydraulicSolution) -> String {
    let mut out = String::new();
    let status = if solution.converged {
        "converged"
    } else {
        "NOT converged"
    };
    let _ = writeln!(
        out,
        "Solution {} in {} iterations (dH = {:.2e} m, dQ = {:.2e} L/s)",
        status, solution.iterations, solution.max_head_error, solution.max_flow_error
    );
    let _ = writeln!(
        out,
        "  Demand: {:.3} L/s  Supply: {:.3} L/s  Pump power: {:.3} kW",
        solution.total_demand, solution.total_supply, solution.total_pump_power
    );

    let _ = writeln!(
        out,
        "\n{:<12} {:<10} {:>10} {:>10} {:>10}",
        "Node", "Type", "Head m", "Press m", "Demand L/s"
    );
    for n in &solution.nodes {
        let flag = if n.supplied { "" } else { "  (unsupplied)" };
        let _ = writeln!(
            out,
            "{:<12} {:<10} {:>10.3} {:>10.3} {:>10.3}{}",
            n.id,
            node_type(n.node_type),
            n.head,
            n.pressure,
            n.demand,
            flag
        );
    }

    let _ = writeln!(
        out,
        "\n{:<12} {:<6} {:>10} {:>8} {:>10} {:<8}",
        "Link", "Type", "Flow L/s", "Vel m/s", "Loss m", "Status"
    );
    for l in &solution.links {
        let _ = write!(
            out,
            "{:<12} {:<6} {:>10.3} {:>8.3} {:>10.4} {:<8}",
            l.id,
            link_type(l.link_type),
            l.flow,
            l.velocity,
            l.head_loss,
            link_state(l.status)
        );
        if l.link_type == LinkType::Pump && l.power_kw > 0.0 {
            let _ = write!(out, " {:.2} kW", l.power_kw);
        }
        let _ = writeln!(out);
    }

    push_warnings(&mut out, &solution.warnings);
    out
}

fn extreme_line(out: &mut String, label: &str, unit: &str, extreme: &Option<Extreme>) {
    if let Some(e) = extreme {
        let _ = writeln!(
            out,
            "  {:<14} {:>10.3} {:<4} at {} (t = {:.2} h)",
            label, e.value, unit, e.id, e.time_h
        );
    }
}

/// Period summary, tank trajectories and energy use.
pub fn render_simulation(result: &SimulationResult) -> String {
    let mut out = String::new();
    let (start, end) = match (result.steps.first(), result.steps.last()) {
        (Some(first), Some(last)) => (first.time_h, last.time_h),
        _ => (0.0, 0.0),
    };
    let _ = writeln!(
        out,
        "Extended period: {} steps, {:.2} - {:.2} h, {}",
        result.steps.len(),
        start,
        end,
        if result.all_converged {
            "all converged"
        } else {
            "some steps NOT converged"
        }
    );

    let _ = writeln!(out, "\nExtremes:");
    let ex = &result.extremes;
    extreme_line(&mut out, "max pressure", "m", &ex.max_pressure);
    extreme_line(&mut out, "min pressure", "m", &ex.min_pressure);
    extreme_line(&mut out, "max velocity", "m/s", &ex.max_velocity);
    extreme_line(&mut out, "max head loss", "m", &ex.max_head_loss);

    if let Some(first) = result.steps.first() {
        if !first.tank_levels.is_empty() {
            let _ = writeln!(out, "\nTank levels (m):");
            let _ = write!(out, "{:>8}", "t h");
            for id in first.tank_levels.keys() {
                let _ = write!(out, " {:>10}", id);
            }
            let _ = writeln!(out);
            for step in &result.steps {
                let _ = write!(out, "{:>8.2}", step.time_h);
                for level in step.tank_levels.values() {
                    let _ = write!(out, " {:>10.3}", level);
                }
                let _ = writeln!(out);
            }
        }
    }

    if !result.pump_energy.is_empty() {
        let _ = writeln!(out, "\nPump energy:");
        for (id, kwh) in &result.pump_energy {
            let _ = writeln!(out, "  {:<12} {:>12.3} kWh", id, kwh);
        }
    }
    let _ = writeln!(
        out,
        "  Total: {:.3} kWh, cost {:.2}",
        result.total_energy_kwh, result.energy_cost
    );

    push_warnings(&mut out, &result.warnings);
    out
}

/// One row per analyzed junction.
pub fn render_fire_flow(results: &[FireFlowResult]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<12} {:>9} {:>9} {:>9} {:>11} {:>11} {:>11}",
        "Node", "Req L/s", "Static m", "Resid m", "Avail L/s", "Max L/s", "Short L/s"
    );
    for r in results {
        let shortfall = r
            .deficiency
            .map(|d| format!("{:.2}", d))
            .unwrap_or_else(|| "-".to_string());
        let max = if r.maximum_limited_by_search {
            format!(">{:.2}", r.maximum_fire_flow)
        } else {
            format!("{:.2}", r.maximum_fire_flow)
        };
        let _ = write!(
            out,
            "{:<12} {:>9.2} {:>9.2} {:>9.2} {:>11.2} {:>11} {:>11}",
            r.node_id,
            r.required_fire_flow,
            r.static_pressure,
            r.residual_pressure_at_required,
            r.available_fire_flow,
            max,
            shortfall
        );
        if !r.all_probes_converged {
            let _ = write!(out, "  (unconverged probes)");
        }
        let _ = writeln!(out);
    }
    out
}

pub fn render_outcome(outcome: &RunOutcome) -> String {
    match outcome {
        RunOutcome::Steady(solution) => render_solution(solution),
        RunOutcome::ExtendedPeriod(result) => render_simulation(result),
        RunOutcome::FireFlow(results) => render_fire_flow(results),
    }
}
