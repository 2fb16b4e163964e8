//! Incremental network builder.

use crate::error::NetworkResult;
use crate::model::{
    Control, Curve, FrictionFormula, Junction, Link, LinkKind, LinkStatus, Node, NodeKind,
    Pattern, Pipe, Pump, PumpCurve, Reservoir, Tank, TimeOptions, Valve, ValveType, WaterNetwork,
};
use crate::validate;

/// Builder for constructing a network incrementally.
///
/// Use the element methods to build up the network, then call `build()` to
/// validate it and hand back a `WaterNetwork`.
#[derive(Debug, Default)]
pub struct NetworkBuilder {
    network: WaterNetwork,
}

impl NetworkBuilder {
    /// Create a new empty builder.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            network: WaterNetwork {
                name: name.into(),
                ..WaterNetwork::default()
            },
        }
    }

    pub fn friction_formula(&mut self, formula: FrictionFormula) -> &mut Self {
        self.network.options.friction_formula = formula;
        self
    }

    pub fn times(&mut self, times: TimeOptions) -> &mut Self {
        self.network.times = times;
        self
    }

    fn push_node(&mut self, id: impl Into<String>, elevation: f64, kind: NodeKind) -> &mut Self {
        self.network.nodes.push(Node {
            id: id.into(),
            elevation,
            x: 0.0,
            y: 0.0,
            kind,
        });
        self
    }

    /// Add a junction with a constant base demand (L/s).
    pub fn junction(&mut self, id: impl Into<String>, elevation: f64, demand: f64) -> &mut Self {
        self.push_node(
            id,
            elevation,
            NodeKind::Junction(Junction {
                base_demand: demand,
                ..Junction::default()
            }),
        )
    }

    pub fn junction_with(
        &mut self,
        id: impl Into<String>,
        elevation: f64,
        junction: Junction,
    ) -> &mut Self {
        self.push_node(id, elevation, NodeKind::Junction(junction))
    }

    pub fn tank(&mut self, id: impl Into<String>, elevation: f64, tank: Tank) -> &mut Self {
        self.push_node(id, elevation, NodeKind::Tank(tank))
    }

    /// Add a cylindrical tank.
    pub fn cylinder_tank(
        &mut self,
        id: impl Into<String>,
        elevation: f64,
        diameter: f64,
        levels: (f64, f64, f64),
    ) -> &mut Self {
        let (min_level, init_level, max_level) = levels;
        self.tank(
            id,
            elevation,
            Tank {
                init_level,
                min_level,
                max_level,
                diameter,
                volume_curve: None,
            },
        )
    }

    /// Add a reservoir; its elevation is set to the total head.
    pub fn reservoir(&mut self, id: impl Into<String>, total_head: f64) -> &mut Self {
        self.push_node(
            id,
            total_head,
            NodeKind::Reservoir(Reservoir {
                total_head,
                head_pattern: None,
            }),
        )
    }

    pub fn reservoir_with(
        &mut self,
        id: impl Into<String>,
        elevation: f64,
        reservoir: Reservoir,
    ) -> &mut Self {
        self.push_node(id, elevation, NodeKind::Reservoir(reservoir))
    }

    fn push_link(
        &mut self,
        id: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
        kind: LinkKind,
    ) -> &mut Self {
        self.network.links.push(Link {
            id: id.into(),
            start_node: from.into(),
            end_node: to.into(),
            status: LinkStatus::Open,
            kind,
        });
        self
    }

    /// Add an open pipe (length m, diameter mm).
    pub fn pipe(
        &mut self,
        id: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
        length: f64,
        diameter: f64,
        roughness: f64,
    ) -> &mut Self {
        self.push_link(
            id,
            from,
            to,
            LinkKind::Pipe(Pipe {
                length,
                diameter,
                roughness,
                minor_loss: 0.0,
            }),
        )
    }

    pub fn pipe_with(
        &mut self,
        id: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
        pipe: Pipe,
    ) -> &mut Self {
        self.push_link(id, from, to, LinkKind::Pipe(pipe))
    }

    pub fn pump(
        &mut self,
        id: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
        curve: PumpCurve,
    ) -> &mut Self {
        self.push_link(id, from, to, LinkKind::Pump(Pump::new(curve)))
    }

    pub fn pump_with(
        &mut self,
        id: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
        pump: Pump,
    ) -> &mut Self {
        self.push_link(id, from, to, LinkKind::Pump(pump))
    }

    pub fn valve(
        &mut self,
        id: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
        valve_type: ValveType,
        diameter: f64,
        setting: f64,
    ) -> &mut Self {
        self.push_link(
            id,
            from,
            to,
            LinkKind::Valve(Valve {
                valve_type,
                diameter,
                setting,
                minor_loss: 0.0,
            }),
        )
    }

    pub fn valve_with(
        &mut self,
        id: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
        valve: Valve,
    ) -> &mut Self {
        self.push_link(id, from, to, LinkKind::Valve(valve))
    }

    /// Change the status of an already added link (no-op for unknown ids).
    pub fn status(&mut self, link_id: &str, status: LinkStatus) -> &mut Self {
        if let Some(link) = self.network.links.iter_mut().find(|l| l.id == link_id) {
            link.status = status;
        }
        self
    }

    /// Attach a demand pattern to an already added junction.
    pub fn demand_pattern(&mut self, node_id: &str, pattern: impl Into<String>) -> &mut Self {
        if let Some(node) = self.network.nodes.iter_mut().find(|n| n.id == node_id) {
            if let NodeKind::Junction(j) = &mut node.kind {
                j.demand_pattern = Some(pattern.into());
            }
        }
        self
    }

    pub fn pattern(&mut self, id: impl Into<String>, multipliers: Vec<f64>) -> &mut Self {
        self.network.patterns.push(Pattern {
            id: id.into(),
            multipliers,
        });
        self
    }

    pub fn curve(&mut self, id: impl Into<String>, points: Vec<(f64, f64)>) -> &mut Self {
        self.network.curves.push(Curve {
            id: id.into(),
            points,
        });
        self
    }

    pub fn control(&mut self, control: Control) -> &mut Self {
        self.network.controls.push(control);
        self
    }

    /// Validate and return the network.
    pub fn build(self) -> NetworkResult<WaterNetwork> {
        validate::validate_network(&self.network)?;
        Ok(self.network)
    }

    /// Return the network without validation.
    pub fn build_unchecked(self) -> WaterNetwork {
        self.network
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_basic() {
        let mut builder = NetworkBuilder::new("basic");
        builder
            .reservoir("R1", 100.0)
            .junction("J1", 80.0, 50.0)
            .pipe("P1", "R1", "J1", 1000.0, 300.0, 120.0);
        let net = builder.build().unwrap();

        assert_eq!(net.nodes.len(), 2);
        assert_eq!(net.links.len(), 1);
        assert_eq!(net.node("R1").unwrap().elevation, 100.0);
        assert_eq!(net.fixed_head_count(), 1);
    }

    #[test]
    fn builder_status_and_pattern() {
        let mut builder = NetworkBuilder::new("status");
        builder
            .reservoir("R1", 100.0)
            .junction("J1", 80.0, 10.0)
            .pipe("P1", "R1", "J1", 100.0, 200.0, 120.0)
            .status("P1", LinkStatus::Closed)
            .pattern("day", vec![0.5, 1.0, 1.5])
            .demand_pattern("J1", "day");
        let net = builder.build().unwrap();

        assert_eq!(net.link("P1").unwrap().status, LinkStatus::Closed);
        let j = net.node("J1").unwrap().as_junction().unwrap();
        assert_eq!(j.demand_pattern.as_deref(), Some("day"));
    }

    #[test]
    fn builder_accepts_full_element_records() {
        let mut builder = NetworkBuilder::new("records");
        builder
            .pattern("lift", vec![1.0, 1.1])
            .reservoir_with(
                "R1",
                100.0,
                Reservoir {
                    total_head: 100.0,
                    head_pattern: Some("lift".to_string()),
                },
            )
            .junction("J1", 60.0, 20.0)
            .junction("J2", 50.0, 5.0)
            .pipe_with(
                "P1",
                "R1",
                "J1",
                Pipe {
                    length: 500.0,
                    diameter: 250.0,
                    roughness: 130.0,
                    minor_loss: 2.5,
                },
            )
            .valve_with(
                "V1",
                "J1",
                "J2",
                Valve {
                    valve_type: ValveType::Prv,
                    diameter: 200.0,
                    setting: 25.0,
                    minor_loss: 0.0,
                },
            );
        let net = builder.build().unwrap();

        let LinkKind::Pipe(pipe) = &net.link("P1").unwrap().kind else {
            panic!("P1 should be a pipe");
        };
        assert_eq!(pipe.minor_loss, 2.5);
        let LinkKind::Valve(valve) = &net.link("V1").unwrap().kind else {
            panic!("V1 should be a valve");
        };
        assert_eq!(valve.valve_type, ValveType::Prv);
        let NodeKind::Reservoir(r) = &net.node("R1").unwrap().kind else {
            panic!("R1 should be a reservoir");
        };
        assert_eq!(r.head_pattern.as_deref(), Some("lift"));
    }

    #[test]
    fn builder_rejects_dangling_link() {
        let mut builder = NetworkBuilder::new("bad");
        builder
            .reservoir("R1", 100.0)
            .pipe("P1", "R1", "nowhere", 100.0, 200.0, 120.0);
        assert!(builder.build().is_err());
    }
}
