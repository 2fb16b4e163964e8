//! Network validation: the contract the solver assumes holds.
//!
//! Solver entry points do not call this; loaders and the builder do.

use std::collections::HashSet;

use crate::error::{NetworkError, NetworkResult};
use crate::model::{ControlCondition, LinkKind, NodeKind, PumpCurve, WaterNetwork};

/// Validate ids, references, geometry and tank levels.
pub fn validate_network(network: &WaterNetwork) -> NetworkResult<()> {
    let mut node_ids = HashSet::new();
    for node in &network.nodes {
        if !node_ids.insert(node.id.as_str()) {
            return Err(NetworkError::DuplicateId {
                id: node.id.clone(),
                context: "nodes",
            });
        }
    }

    let mut link_ids = HashSet::new();
    for link in &network.links {
        if !link_ids.insert(link.id.as_str()) {
            return Err(NetworkError::DuplicateId {
                id: link.id.clone(),
                context: "links",
            });
        }
    }

    let pattern_ids: HashSet<&str> = network.patterns.iter().map(|p| p.id.as_str()).collect();
    if pattern_ids.len() != network.patterns.len() {
        return Err(NetworkError::DuplicateId {
            id: duplicate(network.patterns.iter().map(|p| p.id.as_str())),
            context: "patterns",
        });
    }
    let curve_ids: HashSet<&str> = network.curves.iter().map(|c| c.id.as_str()).collect();
    if curve_ids.len() != network.curves.len() {
        return Err(NetworkError::DuplicateId {
            id: duplicate(network.curves.iter().map(|c| c.id.as_str())),
            context: "curves",
        });
    }

    let check_pattern = |owner: &str, pattern: &Option<String>| -> NetworkResult<()> {
        match pattern {
            Some(p) if !pattern_ids.contains(p.as_str()) => Err(NetworkError::MissingPattern {
                owner: owner.to_string(),
                pattern: p.clone(),
            }),
            _ => Ok(()),
        }
    };
    let check_curve = |owner: &str, curve: &str| -> NetworkResult<()> {
        if curve_ids.contains(curve) {
            Ok(())
        } else {
            Err(NetworkError::MissingCurve {
                owner: owner.to_string(),
                curve: curve.to_string(),
            })
        }
    };

    for node in &network.nodes {
        match &node.kind {
            NodeKind::Junction(j) => {
                check_pattern(&node.id, &j.demand_pattern)?;
                non_negative(&node.id, "emitter_coefficient", j.emitter_coefficient)?;
            }
            NodeKind::Tank(t) => {
                if !(t.min_level <= t.init_level && t.init_level <= t.max_level) {
                    return Err(NetworkError::InvalidValue {
                        field: format!("{}.init_level", node.id),
                        value: t.init_level,
                        reason: "tank levels must satisfy min <= init <= max",
                    });
                }
                match &t.volume_curve {
                    Some(curve) => check_curve(&node.id, curve)?,
                    None => positive(&node.id, "diameter", t.diameter)?,
                }
            }
            NodeKind::Reservoir(r) => check_pattern(&node.id, &r.head_pattern)?,
        }
    }

    for link in &network.links {
        for endpoint in [&link.start_node, &link.end_node] {
            if !node_ids.contains(endpoint.as_str()) {
                return Err(NetworkError::MissingNode {
                    link: link.id.clone(),
                    node: endpoint.clone(),
                });
            }
        }
        match &link.kind {
            LinkKind::Pipe(p) => {
                positive(&link.id, "length", p.length)?;
                positive(&link.id, "diameter", p.diameter)?;
                positive(&link.id, "roughness", p.roughness)?;
                non_negative(&link.id, "minor_loss", p.minor_loss)?;
            }
            LinkKind::Pump(p) => {
                check_pattern(&link.id, &p.speed_pattern)?;
                non_negative(&link.id, "speed", p.speed)?;
                if !(p.efficiency > 0.0 && p.efficiency <= 1.0) {
                    return Err(NetworkError::InvalidValue {
                        field: format!("{}.efficiency", link.id),
                        value: p.efficiency,
                        reason: "efficiency must be in (0, 1]",
                    });
                }
                match &p.curve {
                    PumpCurve::Points { curve } => check_curve(&link.id, curve)?,
                    PumpCurve::ConstantPower { power_kw } => {
                        positive(&link.id, "power_kw", *power_kw)?
                    }
                    PumpCurve::PowerFunction { a, .. } => positive(&link.id, "a", *a)?,
                }
            }
            LinkKind::Valve(v) => {
                positive(&link.id, "diameter", v.diameter)?;
                non_negative(&link.id, "minor_loss", v.minor_loss)?;
            }
        }
    }

    for control in &network.controls {
        if !link_ids.contains(control.link.as_str()) {
            return Err(NetworkError::UnknownId {
                what: "control link",
                id: control.link.clone(),
            });
        }
        if let ControlCondition::NodeAbove { node, .. } | ControlCondition::NodeBelow { node, .. } =
            &control.condition
        {
            if !node_ids.contains(node.as_str()) {
                return Err(NetworkError::UnknownId {
                    what: "control node",
                    id: node.clone(),
                });
            }
        }
    }

    if network.fixed_head_count() == 0 {
        return Err(NetworkError::NoFixedHead);
    }

    let times = &network.times;
    positive("times", "hydraulic_step_h", times.hydraulic_step_h)?;
    positive("times", "pattern_step_h", times.pattern_step_h)?;
    non_negative("times", "duration_h", times.duration_h)?;

    Ok(())
}

fn duplicate<'a>(ids: impl Iterator<Item = &'a str>) -> String {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return id.to_string();
        }
    }
    String::new()
}

fn positive(owner: &str, field: &str, value: f64) -> NetworkResult<()> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(NetworkError::InvalidValue {
            field: format!("{owner}.{field}"),
            value,
            reason: "must be positive",
        })
    }
}

fn non_negative(owner: &str, field: &str, value: f64) -> NetworkResult<()> {
    if value >= 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(NetworkError::InvalidValue {
            field: format!("{owner}.{field}"),
            value,
            reason: "must not be negative",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::NetworkBuilder;
    use crate::model::Tank;

    fn base() -> NetworkBuilder {
        let mut b = NetworkBuilder::new("v");
        b.reservoir("R1", 100.0)
            .junction("J1", 80.0, 10.0)
            .pipe("P1", "R1", "J1", 100.0, 200.0, 120.0);
        b
    }

    #[test]
    fn valid_network_passes() {
        assert!(validate_network(&base().build_unchecked()).is_ok());
    }

    #[test]
    fn duplicate_node_rejected() {
        let mut b = base();
        b.junction("J1", 10.0, 0.0);
        let err = validate_network(&b.build_unchecked()).unwrap_err();
        assert!(matches!(err, NetworkError::DuplicateId { context: "nodes", .. }));
    }

    #[test]
    fn missing_pattern_rejected() {
        let mut b = base();
        b.demand_pattern("J1", "nope");
        let err = validate_network(&b.build_unchecked()).unwrap_err();
        assert!(matches!(err, NetworkError::MissingPattern { .. }));
    }

    #[test]
    fn tank_levels_must_be_ordered() {
        let mut b = base();
        b.tank(
            "T1",
            50.0,
            Tank {
                init_level: 5.0,
                min_level: 0.5,
                max_level: 4.0,
                diameter: 10.0,
                volume_curve: None,
            },
        );
        let err = validate_network(&b.build_unchecked()).unwrap_err();
        assert!(matches!(err, NetworkError::InvalidValue { .. }));
    }

    #[test]
    fn network_without_source_rejected() {
        let mut b = NetworkBuilder::new("dry");
        b.junction("J1", 0.0, 1.0).junction("J2", 0.0, 1.0).pipe(
            "P1", "J1", "J2", 10.0, 100.0, 120.0,
        );
        let err = validate_network(&b.build_unchecked()).unwrap_err();
        assert!(matches!(err, NetworkError::NoFixedHead));
    }

    #[test]
    fn non_positive_pipe_diameter_rejected() {
        let mut b = base();
        b.pipe("P2", "R1", "J1", 100.0, 0.0, 120.0);
        assert!(validate_network(&b.build_unchecked()).is_err());
    }
}
