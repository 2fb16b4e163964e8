//! Network model: plain data consumed by the solver.
//!
//! Units follow the usual SI engineering convention for distribution
//! networks: flows in L/s, pipe and valve diameters in mm, lengths,
//! elevations, heads and levels in m, tank diameters in m, pump power in
//! kW and time in hours.

use serde::{Deserialize, Serialize};

/// Friction head-loss formula used for every pipe in the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FrictionFormula {
    /// Hazen-Williams: roughness is the dimensionless C factor.
    #[default]
    HazenWilliams,
    /// Darcy-Weisbach: roughness is the absolute wall roughness in mm.
    DarcyWeisbach,
}

impl FrictionFormula {
    /// Flow exponent of the friction term.
    pub fn exponent(self) -> f64 {
        match self {
            FrictionFormula::HazenWilliams => 1.852,
            FrictionFormula::DarcyWeisbach => 2.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkOptions {
    #[serde(default)]
    pub friction_formula: FrictionFormula,
}

/// Extended-period time settings (hours).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeOptions {
    #[serde(default = "default_duration_h")]
    pub duration_h: f64,
    #[serde(default = "default_step_h")]
    pub hydraulic_step_h: f64,
    #[serde(default = "default_step_h")]
    pub pattern_step_h: f64,
    #[serde(default)]
    pub pattern_start_h: f64,
}

fn default_duration_h() -> f64 {
    24.0
}

fn default_step_h() -> f64 {
    1.0
}

impl Default for TimeOptions {
    fn default() -> Self {
        Self {
            duration_h: default_duration_h(),
            hydraulic_step_h: default_step_h(),
            pattern_step_h: default_step_h(),
            pattern_start_h: 0.0,
        }
    }
}

/// A complete network description.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WaterNetwork {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub options: NetworkOptions,
    #[serde(default)]
    pub times: TimeOptions,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(default)]
    pub patterns: Vec<Pattern>,
    #[serde(default)]
    pub curves: Vec<Curve>,
    #[serde(default)]
    pub controls: Vec<Control>,
}

impl WaterNetwork {
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn link(&self, id: &str) -> Option<&Link> {
        self.links.iter().find(|l| l.id == id)
    }

    pub fn pattern(&self, id: &str) -> Option<&Pattern> {
        self.patterns.iter().find(|p| p.id == id)
    }

    pub fn curve(&self, id: &str) -> Option<&Curve> {
        self.curves.iter().find(|c| c.id == id)
    }

    /// Position of a node in `nodes`.
    pub fn node_position(&self, id: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.id == id)
    }

    /// Position of a link in `links`.
    pub fn link_position(&self, id: &str) -> Option<usize> {
        self.links.iter().position(|l| l.id == id)
    }

    pub fn friction_formula(&self) -> FrictionFormula {
        self.options.friction_formula
    }

    pub fn junctions(&self) -> impl Iterator<Item = (&Node, &Junction)> {
        self.nodes.iter().filter_map(|n| match &n.kind {
            NodeKind::Junction(j) => Some((n, j)),
            _ => None,
        })
    }

    pub fn tanks(&self) -> impl Iterator<Item = (&Node, &Tank)> {
        self.nodes.iter().filter_map(|n| match &n.kind {
            NodeKind::Tank(t) => Some((n, t)),
            _ => None,
        })
    }

    pub fn pumps(&self) -> impl Iterator<Item = (&Link, &Pump)> {
        self.links.iter().filter_map(|l| match &l.kind {
            LinkKind::Pump(p) => Some((l, p)),
            _ => None,
        })
    }

    pub fn fixed_head_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_fixed_head()).count()
    }
}

/// A network node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    #[serde(default)]
    pub elevation: f64,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(flatten)]
    pub kind: NodeKind,
}

impl Node {
    pub fn is_junction(&self) -> bool {
        matches!(self.kind, NodeKind::Junction(_))
    }

    /// Tanks and reservoirs fix the head at their node.
    pub fn is_fixed_head(&self) -> bool {
        !self.is_junction()
    }

    pub fn as_junction(&self) -> Option<&Junction> {
        match &self.kind {
            NodeKind::Junction(j) => Some(j),
            _ => None,
        }
    }

    pub fn as_tank(&self) -> Option<&Tank> {
        match &self.kind {
            NodeKind::Tank(t) => Some(t),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum NodeKind {
    Junction(Junction),
    Tank(Tank),
    Reservoir(Reservoir),
}

impl NodeKind {
    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Junction(_) => "junction",
            NodeKind::Tank(_) => "tank",
            NodeKind::Reservoir(_) => "reservoir",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Junction {
    /// Base demand (L/s)
    #[serde(default)]
    pub base_demand: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub demand_pattern: Option<String>,
    /// Emitter coefficient (L/s per m^0.5); 0 disables the emitter
    #[serde(default)]
    pub emitter_coefficient: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tank {
    pub init_level: f64,
    pub min_level: f64,
    pub max_level: f64,
    /// Nominal diameter (m) of a cylindrical tank
    #[serde(default)]
    pub diameter: f64,
    /// Level (m) to volume (m³) curve, replaces the cylinder when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_curve: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reservoir {
    pub total_head: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head_pattern: Option<String>,
}

/// Initial / fixed status of a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LinkStatus {
    #[default]
    Open,
    Closed,
    /// Flow allowed only from start node to end node.
    CheckValve,
}

/// A network link between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub id: String,
    pub start_node: String,
    pub end_node: String,
    #[serde(default)]
    pub status: LinkStatus,
    #[serde(flatten)]
    pub kind: LinkKind,
}

impl Link {
    pub fn as_pipe(&self) -> Option<&Pipe> {
        match &self.kind {
            LinkKind::Pipe(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_pump(&self) -> Option<&Pump> {
        match &self.kind {
            LinkKind::Pump(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_valve(&self) -> Option<&Valve> {
        match &self.kind {
            LinkKind::Valve(v) => Some(v),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum LinkKind {
    Pipe(Pipe),
    Pump(Pump),
    Valve(Valve),
}

impl LinkKind {
    pub fn label(&self) -> &'static str {
        match self {
            LinkKind::Pipe(_) => "pipe",
            LinkKind::Pump(_) => "pump",
            LinkKind::Valve(_) => "valve",
        }
    }

    /// Ordering used by the indexer: pipes, then pumps, then valves.
    pub fn rank(&self) -> u8 {
        match self {
            LinkKind::Pipe(_) => 0,
            LinkKind::Pump(_) => 1,
            LinkKind::Valve(_) => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipe {
    /// Length (m)
    pub length: f64,
    /// Inner diameter (mm)
    pub diameter: f64,
    /// Hazen-Williams C, or Darcy-Weisbach roughness (mm)
    pub roughness: f64,
    /// Summed minor-loss coefficient K
    #[serde(default)]
    pub minor_loss: f64,
}

/// Head-flow relationship of a pump at nominal speed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum PumpCurve {
    /// H = A - B·Q^C with Q in L/s and H in m.
    PowerFunction { a: f64, b: f64, c: f64 },
    /// Head curve given by a named (flow L/s, head m) curve.
    Points { curve: String },
    /// Constant shaft power (kW).
    ConstantPower { power_kw: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pump {
    pub curve: PumpCurve,
    /// Relative speed (1.0 = nominal)
    #[serde(default = "default_speed")]
    pub speed: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed_pattern: Option<String>,
    /// Wire-to-water efficiency (0, 1]
    #[serde(default = "default_efficiency")]
    pub efficiency: f64,
    /// Energy price per kWh
    #[serde(default)]
    pub energy_price: f64,
}

fn default_speed() -> f64 {
    1.0
}

fn default_efficiency() -> f64 {
    0.75
}

impl Pump {
    pub fn new(curve: PumpCurve) -> Self {
        Self {
            curve,
            speed: default_speed(),
            speed_pattern: None,
            efficiency: default_efficiency(),
            energy_price: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ValveType {
    /// Pressure reducing valve (setting: downstream pressure, m)
    Prv,
    /// Pressure sustaining valve
    Psv,
    /// Pressure breaker valve
    Pbv,
    /// Flow control valve
    Fcv,
    /// Throttle control valve (setting: loss coefficient)
    Tcv,
    /// General purpose valve
    Gpv,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Valve {
    pub valve_type: ValveType,
    /// Diameter (mm)
    pub diameter: f64,
    #[serde(default)]
    pub setting: f64,
    /// Loss coefficient when the valve acts as a fixed resistance
    #[serde(default)]
    pub minor_loss: f64,
}

/// Time-indexed multipliers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    pub id: String,
    pub multipliers: Vec<f64>,
}

/// Named (x, y) data curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Curve {
    pub id: String,
    pub points: Vec<(f64, f64)>,
}

/// Simple rule that changes a link when a condition holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Control {
    pub link: String,
    pub action: ControlAction,
    pub condition: ControlCondition,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "kebab-case")]
pub enum ControlAction {
    Open,
    Close,
    Setting(f64),
    Speed(f64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ControlCondition {
    /// Fires once simulation time reaches `hours`.
    AtTime { hours: f64 },
    /// Tank level or junction pressure above `value`.
    NodeAbove { node: String, value: f64 },
    /// Tank level or junction pressure below `value`.
    NodeBelow { node: String, value: f64 },
}
