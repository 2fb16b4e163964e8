//! Immutable snapshots produced at the end of a solve.
//!
//! Flows and demands are in L/s, heads, pressures and head losses in m,
//! velocities in m/s and power in kW.

use serde::{Deserialize, Serialize};

use crate::status::LinkState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeType {
    Junction,
    Tank,
    Reservoir,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LinkType {
    Pipe,
    Pump,
    Valve,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeResult {
    pub id: String,
    pub node_type: NodeType,
    pub head: f64,
    pub pressure: f64,
    /// Delivered demand for junctions; net inflow for tanks and reservoirs
    pub demand: f64,
    pub emitter_flow: f64,
    /// False when no open path connects the node to a tank or reservoir
    pub supplied: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkResult {
    pub id: String,
    pub link_type: LinkType,
    /// Positive from start node to end node
    pub flow: f64,
    pub velocity: f64,
    /// Start head minus end head; negative across a running pump
    pub head_loss: f64,
    pub status: LinkState,
    /// Shaft power drawn by a pump
    pub power_kw: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HydraulicSolution {
    pub converged: bool,
    pub iterations: usize,
    /// Largest head change of the last iteration (m)
    pub max_head_error: f64,
    /// Largest flow change of the last iteration (L/s)
    pub max_flow_error: f64,
    /// Junction demand plus emitter outflow
    pub total_demand: f64,
    /// Net outflow from tanks and reservoirs
    pub total_supply: f64,
    /// Summed absolute head loss over pipes and valves
    pub total_head_loss: f64,
    pub total_pump_power: f64,
    pub warnings: Vec<String>,
    /// In network order
    pub nodes: Vec<NodeResult>,
    /// In network order
    pub links: Vec<LinkResult>,
}

impl HydraulicSolution {
    pub fn node(&self, id: &str) -> Option<&NodeResult> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn link(&self, id: &str) -> Option<&LinkResult> {
        self.links.iter().find(|l| l.id == id)
    }

    pub fn junctions(&self) -> impl Iterator<Item = &NodeResult> {
        self.nodes
            .iter()
            .filter(|n| n.node_type == NodeType::Junction)
    }

    pub fn pumps(&self) -> impl Iterator<Item = &LinkResult> {
        self.links.iter().filter(|l| l.link_type == LinkType::Pump)
    }

    /// Net inflow (L/s) into a node from its incident links.
    ///
    /// Uses the network's link endpoints, so it also checks mass balance at
    /// junctions: inflow minus demand minus emitter flow should be near zero.
    pub fn net_inflow(&self, network: &hn_network::WaterNetwork, node_id: &str) -> f64 {
        network
            .links
            .iter()
            .zip(&self.links)
            .map(|(link, result)| {
                if link.end_node == node_id {
                    result.flow
                } else if link.start_node == node_id {
                    -result.flow
                } else {
                    0.0
                }
            })
            .sum()
    }
}
