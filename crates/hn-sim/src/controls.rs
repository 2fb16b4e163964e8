//! Simple link controls evaluated at the start of each timestep.

use hn_network::{Control, ControlAction, ControlCondition, LinkStatus, NodeKind, WaterNetwork};
use hn_solver::{HydraulicSolution, LinkOverride};
use tracing::debug;

use crate::error::{SimError, SimResult};
use crate::sim::SimState;

/// Check that every control names an existing link and node.
pub fn check_controls(network: &WaterNetwork) -> SimResult<()> {
    for control in &network.controls {
        if network.link(&control.link).is_none() {
            return Err(hn_network::NetworkError::UnknownId {
                what: "control link",
                id: control.link.clone(),
            }
            .into());
        }
        if let ControlCondition::NodeAbove { node, .. } | ControlCondition::NodeBelow { node, .. } =
            &control.condition
        {
            if network.node(node).is_none() {
                return Err(SimError::UnknownNode { id: node.clone() });
            }
        }
    }
    Ok(())
}

/// Level for tanks, pressure for junctions, head for reservoirs.
///
/// Junction and reservoir values come from the previous step's solution,
/// so they are unknown at the first step.
fn node_value(
    network: &WaterNetwork,
    node_id: &str,
    state: &SimState,
    previous: Option<&HydraulicSolution>,
) -> Option<f64> {
    let node = network.node(node_id)?;
    match node.kind {
        NodeKind::Tank(_) => state.tank_levels.get(node_id).copied(),
        NodeKind::Junction(_) => previous?.node(node_id).map(|n| n.pressure),
        NodeKind::Reservoir(_) => previous?.node(node_id).map(|n| n.head),
    }
}

fn fires(
    control: &Control,
    network: &WaterNetwork,
    time_h: f64,
    dt_h: f64,
    state: &SimState,
    previous: Option<&HydraulicSolution>,
) -> bool {
    match &control.condition {
        ControlCondition::AtTime { hours } => *hours <= time_h + 1e-9 && *hours > time_h - dt_h + 1e-9,
        ControlCondition::NodeAbove { node, value } => {
            node_value(network, node, state, previous).is_some_and(|v| v > *value)
        }
        ControlCondition::NodeBelow { node, value } => {
            node_value(network, node, state, previous).is_some_and(|v| v < *value)
        }
    }
}

fn apply(over: &mut LinkOverride, action: ControlAction, is_pump: bool) {
    match action {
        ControlAction::Open => over.status = Some(LinkStatus::Open),
        ControlAction::Close => over.status = Some(LinkStatus::Closed),
        ControlAction::Setting(v) if is_pump => over.speed = Some(v),
        ControlAction::Setting(v) => over.setting = Some(v),
        ControlAction::Speed(v) => {
            over.speed = Some(v);
            over.status = Some(if v > 0.0 {
                LinkStatus::Open
            } else {
                LinkStatus::Closed
            });
        }
    }
}

/// Fire every control whose condition holds, updating the link overrides
/// in `state`. Returns the number of controls fired.
pub fn apply_controls(
    network: &WaterNetwork,
    time_h: f64,
    dt_h: f64,
    state: &mut SimState,
    previous: Option<&HydraulicSolution>,
) -> usize {
    let mut fired = 0;
    for control in &network.controls {
        if !fires(control, network, time_h, dt_h, state, previous) {
            continue;
        }
        let is_pump = network
            .link(&control.link)
            .is_some_and(|l| l.as_pump().is_some());
        let over = state.link_overrides.entry(control.link.clone()).or_default();
        apply(over, control.action, is_pump);
        debug!(time_h, link = %control.link, action = ?control.action, "control fired");
        fired += 1;
    }
    fired
}
