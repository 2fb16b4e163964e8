//! High-level solver interface.

use hn_components::{PipeModel, PumpModel, ValveModel};
use hn_core::units::{circle_area, mm, to_m2};
use hn_network::{LinkKind, LinkStatus, NetworkIndex, NodeKind, WaterNetwork};
use tracing::{debug, warn};

use crate::conditions::{Conditions, PatternMultipliers};
use crate::error::{SolverError, SolverResult};
use crate::gradient::{Element, Iterate, Problem, emitter_flow};
use crate::options::SolverOptions;
use crate::results::{HydraulicSolution, LinkResult, LinkType, NodeResult, NodeType};
use crate::status::{HTOL, LinkState};
use crate::warnings::Warnings;

/// Solve a network once with the given pattern multipliers.
///
/// Convenience wrapper around [`GradientSolver`] for one-off solves.
/// Non-convergence is reported on the solution, not as an error.
pub fn solve_network(
    network: &WaterNetwork,
    options: &SolverOptions,
    multipliers: &PatternMultipliers,
) -> SolverResult<HydraulicSolution> {
    let solver = GradientSolver::new(network)?;
    solver.solve(options, &Conditions::with_multipliers(multipliers.clone()))
}

/// Reusable solver for one network.
///
/// Building the index and element models happens once; every `solve` call
/// allocates its own head, flow and status arrays, so a shared reference
/// can serve concurrent solves.
#[derive(Debug)]
pub struct GradientSolver<'a> {
    network: &'a WaterNetwork,
    index: NetworkIndex,
    /// Element models at nominal speed and configured settings
    elements: Vec<Element>,
}

impl<'a> GradientSolver<'a> {
    pub fn new(network: &'a WaterNetwork) -> SolverResult<Self> {
        let index = NetworkIndex::build(network)?;
        if index.fixed_head_count() == 0 {
            return Err(SolverError::ProblemSetup {
                what: "network has no tank or reservoir".to_string(),
            });
        }
        let formula = network.friction_formula();

        let mut elements = Vec::with_capacity(index.link_count());
        for link_id in index.links() {
            let link = &network.links[index.link_position(link_id)];
            let element = match &link.kind {
                LinkKind::Pipe(pipe) => Element::Pipe(PipeModel::new(pipe, formula)?),
                LinkKind::Pump(pump) => Element::Pump(PumpModel::from_pump(pump, network)?),
                LinkKind::Valve(valve) => Element::Valve(ValveModel::new(valve)?),
            };
            elements.push(element);
        }

        debug!(
            network = %network.name,
            nodes = index.node_count(),
            junctions = index.junction_count(),
            links = index.link_count(),
            "gradient solver ready"
        );
        Ok(Self {
            network,
            index,
            elements,
        })
    }

    pub fn network(&self) -> &WaterNetwork {
        self.network
    }

    pub fn index(&self) -> &NetworkIndex {
        &self.index
    }

    /// Solve under the given conditions.
    pub fn solve(
        &self,
        options: &SolverOptions,
        conditions: &Conditions,
    ) -> SolverResult<HydraulicSolution> {
        options.validate()?;
        let problem = self.prepare(conditions)?;
        let iterate = problem.run(options)?;

        if !iterate.converged {
            warn!(
                network = %self.network.name,
                iterations = iterate.iterations,
                max_head_error = iterate.max_head_error,
                max_flow_error = iterate.max_flow_error,
                "hydraulic solution did not converge"
            );
        }
        Ok(self.collect(&problem, &iterate, options))
    }

    fn check_conditions(&self, conditions: &Conditions) -> SolverResult<()> {
        for node in conditions.extra_demand.keys() {
            let is_junction = self.network.node(node).is_some_and(|n| n.is_junction());
            if !is_junction {
                return Err(SolverError::ProblemSetup {
                    what: format!("extra demand at {node}, which is not a junction"),
                });
            }
        }
        for tank in conditions.tank_levels.keys() {
            if self.network.node(tank).and_then(|n| n.as_tank()).is_none() {
                return Err(SolverError::ProblemSetup {
                    what: format!("tank level given for {tank}, which is not a tank"),
                });
            }
        }
        for link in conditions.link_overrides.keys() {
            self.index.link_id(link)?;
        }
        Ok(())
    }

    fn prepare(&self, conditions: &Conditions) -> SolverResult<Problem<'_>> {
        self.check_conditions(conditions)?;
        let index = &self.index;
        let nodes = index.node_count();
        let nj = index.junction_count();

        let mut elevation = vec![0.0; nodes];
        let mut fixed_head = vec![0.0; nodes];
        let mut demand = vec![0.0; nj];
        let mut emitter = vec![0.0; nj];
        for node_id in index.nodes() {
            let i = node_id.ix();
            let node = &self.network.nodes[index.node_position(node_id)];
            elevation[i] = node.elevation;
            match &node.kind {
                NodeKind::Junction(j) => {
                    let extra = conditions.extra_demand.get(&node.id).copied().unwrap_or(0.0);
                    let base = j.base_demand * conditions.multiplier(j.demand_pattern.as_deref());
                    demand[i] = (base + extra) / 1000.0;
                    emitter[i] = j.emitter_coefficient;
                }
                NodeKind::Tank(t) => {
                    let level = conditions
                        .tank_levels
                        .get(&node.id)
                        .copied()
                        .unwrap_or(t.init_level);
                    fixed_head[i] = node.elevation + level;
                }
                NodeKind::Reservoir(r) => {
                    fixed_head[i] =
                        r.total_head * conditions.multiplier(r.head_pattern.as_deref());
                }
            }
        }

        let links = index.link_count();
        let mut elements = Vec::with_capacity(links);
        let mut closed = vec![false; links];
        let mut check_valve = vec![false; links];
        let mut prv_target = vec![None; links];
        let mut area = vec![0.0; links];
        for link_id in index.links() {
            let l = link_id.ix();
            let link = &self.network.links[index.link_position(link_id)];
            let over = conditions.link_override(&link.id);
            let configured = over.status.unwrap_or(link.status);
            closed[l] = configured == LinkStatus::Closed;

            let element = match (&self.elements[l], &link.kind) {
                (Element::Pump(model), LinkKind::Pump(pump)) => {
                    let speed = over.speed.unwrap_or_else(|| {
                        pump.speed * conditions.multiplier(pump.speed_pattern.as_deref())
                    });
                    if speed <= 0.0 {
                        closed[l] = true;
                    }
                    Element::Pump(model.with_speed(speed))
                }
                (Element::Valve(model), LinkKind::Valve(valve)) => {
                    let model = match over.setting {
                        Some(setting) => model.with_setting(setting),
                        None => *model,
                    };
                    let (_, end) = index.endpoints(link_id);
                    if model.is_prv() && index.is_junction(end) {
                        prv_target[l] = Some(hn_components::prv_target_head(
                            elevation[end.ix()],
                            model.setting,
                        ));
                    }
                    check_valve[l] = configured == LinkStatus::CheckValve;
                    area[l] = to_m2(circle_area(mm(valve.diameter)));
                    Element::Valve(model)
                }
                (Element::Pipe(model), LinkKind::Pipe(pipe)) => {
                    check_valve[l] = configured == LinkStatus::CheckValve;
                    area[l] = to_m2(circle_area(mm(pipe.diameter)));
                    Element::Pipe(*model)
                }
                _ => {
                    return Err(SolverError::ProblemSetup {
                        what: format!("link {} changed kind after indexing", link.id),
                    });
                }
            };
            elements.push(element);
        }

        Ok(Problem {
            index,
            elements,
            closed,
            check_valve,
            prv_target,
            area,
            elevation,
            fixed_head,
            demand,
            emitter,
        })
    }

    /// Turn the final iterate into result snapshots and warnings.
    fn collect(
        &self,
        problem: &Problem<'_>,
        it: &Iterate,
        options: &SolverOptions,
    ) -> HydraulicSolution {
        let index = &self.index;
        let mut warnings = Warnings::default();
        if !it.converged {
            warnings.non_convergence(it.iterations, it.max_head_error, it.max_flow_error);
        }

        let mut total_demand = 0.0;
        let mut total_supply = 0.0;
        let mut nodes = Vec::with_capacity(self.network.nodes.len());
        for (pos, node) in self.network.nodes.iter().enumerate() {
            let i = index.node_at(pos);
            let head = it.head[i.ix()];
            let pressure = head - node.elevation;
            let net_inflow: f64 = index
                .incident(i)
                .iter()
                .map(|inc| inc.sign * it.flow[inc.link.ix()])
                .sum::<f64>()
                * 1000.0;

            let (node_type, demand, emitter) = match &node.kind {
                NodeKind::Junction(_) => {
                    let j = i.ix();
                    let supplied = it.supplied[j];
                    let (demand, emitter) = if supplied {
                        let (qe, _) = emitter_flow(problem.emitter[j], pressure);
                        (problem.demand[j] * 1000.0, qe * 1000.0)
                    } else {
                        warnings.disconnected(&node.id);
                        (0.0, 0.0)
                    };
                    warnings.pressure(&node.id, pressure, options);
                    if demand > 0.0 {
                        warnings.demand_shortfall(&node.id, pressure, options);
                    }
                    total_demand += demand + emitter;
                    (NodeType::Junction, demand, emitter)
                }
                NodeKind::Tank(_) => {
                    total_supply -= net_inflow;
                    (NodeType::Tank, net_inflow, 0.0)
                }
                NodeKind::Reservoir(_) => {
                    total_supply -= net_inflow;
                    (NodeType::Reservoir, net_inflow, 0.0)
                }
            };
            nodes.push(NodeResult {
                id: node.id.clone(),
                node_type,
                head,
                pressure,
                demand,
                emitter_flow: emitter,
                supplied: it.supplied[i.ix()],
            });
        }

        let mut total_head_loss = 0.0;
        let mut total_pump_power = 0.0;
        let mut links = Vec::with_capacity(self.network.links.len());
        for (pos, link) in self.network.links.iter().enumerate() {
            let l = index.link_at(pos);
            let (s, e) = index.endpoints(l);
            let li = l.ix();
            let q = it.flow[li];
            let state = it.status[li];
            let head_loss = if state.carries_flow() {
                it.head[s.ix()] - it.head[e.ix()]
            } else {
                0.0
            };
            let velocity = if problem.area[li] > 0.0 {
                q.abs() / problem.area[li]
            } else {
                0.0
            };

            let mut power_kw = 0.0;
            let link_type = match &problem.elements[li] {
                Element::Pipe(_) => {
                    warnings.velocity(&link.id, velocity, options);
                    total_head_loss += head_loss.abs();
                    LinkType::Pipe
                }
                Element::Pump(pump) => {
                    if state == LinkState::Blocked {
                        warnings.pump_blocked(&link.id);
                    } else if state == LinkState::Open {
                        power_kw = pump.shaft_power_kw(q, -head_loss);
                        total_pump_power += power_kw;
                    }
                    LinkType::Pump
                }
                Element::Valve(_) => {
                    if let Some(h_set) = problem.prv_target[li] {
                        let starved = it.head[s.ix()] < h_set - HTOL;
                        if state == LinkState::Open && starved && it.supplied[e.ix()] {
                            warnings.prv_open(&link.id);
                        }
                    }
                    total_head_loss += head_loss.abs();
                    LinkType::Valve
                }
            };

            links.push(LinkResult {
                id: link.id.clone(),
                link_type,
                flow: q * 1000.0,
                velocity,
                head_loss,
                status: state,
                power_kw,
            });
        }

        HydraulicSolution {
            converged: it.converged,
            iterations: it.iterations,
            max_head_error: it.max_head_error,
            max_flow_error: it.max_flow_error,
            total_demand,
            total_supply,
            total_head_loss,
            total_pump_power,
            warnings: warnings.into_vec(),
            nodes,
            links,
        }
    }
}
