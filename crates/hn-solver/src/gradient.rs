//! Gradient method iteration (Todini-Pilati) over a prepared problem.
//!
//! Each iteration updates link statuses, linearizes every open link around
//! its current flow, solves the nodal head system over supplied junctions,
//! then corrects link flows from the new heads:
//!
//! ```text
//! (ΣA11 + de)·H_i − ΣA11·H_j = −d − qe + de·H_i⁰ + Σ±(Q − A11·hl) + A11·H_fixed
//! Q ← Q + A11·((H_start − H_end) − hl)
//! ```
//!
//! Pump and check-valve statuses are only re-examined on a fixed schedule
//! and at convergence. Without that, a blocked pump that isolates the
//! network can reopen every link on the next pass and the statuses cycle.

use hn_components::common::QF;
use hn_components::{LinkModel, Linearization, PipeModel, PumpModel, ValveModel};
use hn_core::LinkId;
use hn_network::{NetworkIndex, supplied_nodes};
use nalgebra::DVector;
use tracing::debug;

use crate::error::{SolverError, SolverResult};
use crate::options::{HeadUpdate, LinearSolver, SolverOptions};
use crate::sparse::{DEFAULT_MAX_SWEEPS, DEFAULT_TOLERANCE, SparseMatrix};
use crate::status::{self, LinkState, QTOL};

/// Penalty weight that pins an active PRV's downstream head.
const BIG: f64 = 1e8;

/// Relative tolerance of the inner conjugate-gradient solve.
const CG_TOLERANCE: f64 = 1e-10;

/// Initial pump flow guess (m³/s).
const PUMP_INITIAL_FLOW: f64 = 0.01;

/// Pumps and check valves are re-examined every `STATUS_CHECK_FREQUENCY`
/// iterations up to `MAX_STATUS_CHECKS`, and after that only at convergence.
const STATUS_CHECK_FREQUENCY: usize = 2;
const MAX_STATUS_CHECKS: usize = 10;

#[derive(Debug, Clone)]
pub(crate) enum Element {
    Pipe(PipeModel),
    Pump(PumpModel),
    Valve(ValveModel),
}

impl Element {
    fn model(&self) -> &dyn LinkModel {
        match self {
            Element::Pipe(m) => m,
            Element::Pump(m) => m,
            Element::Valve(m) => m,
        }
    }
}

/// One solve's inputs in dense solver order.
///
/// Link vectors are indexed by `LinkId`, node vectors by `NodeId`, and
/// `demand`/`emitter` by junction index.
pub(crate) struct Problem<'a> {
    pub index: &'a NetworkIndex,
    pub elements: Vec<Element>,
    /// Closed by configuration, a control or a stopped pump
    pub closed: Vec<bool>,
    pub check_valve: Vec<bool>,
    /// Downstream head held by an active PRV (end node must be a junction)
    pub prv_target: Vec<Option<f64>>,
    /// Cross-section (m²); zero for pumps
    pub area: Vec<f64>,
    pub elevation: Vec<f64>,
    /// Head of tanks and reservoirs; junction entries are unused
    pub fixed_head: Vec<f64>,
    /// Junction demand (m³/s)
    pub demand: Vec<f64>,
    /// Emitter coefficient (L/s per √m)
    pub emitter: Vec<f64>,
}

/// Solver state after the last iteration.
#[derive(Debug, Clone)]
pub(crate) struct Iterate {
    pub head: DVector<f64>,
    /// m³/s
    pub flow: DVector<f64>,
    pub status: Vec<LinkState>,
    pub supplied: Vec<bool>,
    pub iterations: usize,
    pub converged: bool,
    pub max_head_error: f64,
    /// L/s
    pub max_flow_error: f64,
}

/// Emitter outflow (m³/s) and its derivative with respect to head.
pub(crate) fn emitter_flow(coefficient: f64, pressure: f64) -> (f64, f64) {
    if coefficient <= 0.0 || pressure <= 0.0 {
        return (0.0, 0.0);
    }
    let q = coefficient * pressure.sqrt() / 1000.0;
    let dq = 0.5 * coefficient / pressure.max(1e-2).sqrt() / 1000.0;
    (q, dq)
}

impl Problem<'_> {
    fn endpoints(&self, link: usize) -> (usize, usize) {
        let (s, e) = self.index.endpoints(LinkId::from_index(link as u32));
        (s.ix(), e.ix())
    }

    fn junction_count(&self) -> usize {
        self.index.junction_count()
    }

    fn initial_state(&self) -> SolverResult<(DVector<f64>, DVector<f64>, Vec<LinkState>)> {
        let nj = self.junction_count();
        let n = self.index.node_count();
        let top = self.fixed_head[nj..]
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        if !top.is_finite() {
            return Err(SolverError::ProblemSetup {
                what: "network has no tank or reservoir with a finite head".to_string(),
            });
        }
        let head = DVector::from_fn(n, |i, _| if i < nj { top } else { self.fixed_head[i] });

        let status: Vec<LinkState> = self
            .closed
            .iter()
            .map(|&c| if c { LinkState::Closed } else { LinkState::Open })
            .collect();
        let flow = DVector::from_fn(self.elements.len(), |l, _| {
            match (status[l], &self.elements[l]) {
                (LinkState::Closed, _) => 0.0,
                (_, Element::Pump(_)) => PUMP_INITIAL_FLOW,
                // 1 m/s through the section
                _ => self.area[l],
            }
        });
        Ok((head, flow, status))
    }

    fn supplied(&self, status: &[LinkState]) -> Vec<bool> {
        supplied_nodes(self.index, |l| status[l.ix()].carries_flow())
    }

    /// Apply the PRV rules, and the check-valve and pump rules when
    /// `check_one_way` is set. Returns true on any change.
    fn update_statuses(
        &self,
        options: &SolverOptions,
        head: &DVector<f64>,
        flow: &mut DVector<f64>,
        status: &mut [LinkState],
        supplied: &[bool],
        check_one_way: bool,
    ) -> bool {
        let nj = self.junction_count();
        let mut changed = false;
        for l in 0..self.elements.len() {
            let old = status[l];
            if old == LinkState::Closed {
                continue;
            }
            let (s, e) = self.endpoints(l);
            let dh = head[s] - head[e];
            let q = flow[l];
            let new = match &self.elements[l] {
                Element::Pump(pump) if check_one_way => {
                    status::pump(old, q, dh, pump.shutoff_head())
                }
                Element::Pump(_) => old,
                Element::Valve(valve) if valve.is_prv() => match self.prv_target[l] {
                    Some(h_set) if e < nj && supplied[e] => {
                        status::prv(old, q, head[s], head[e], h_set)
                    }
                    _ => old,
                },
                _ if check_one_way && self.check_valve[l] && options.check_valves => {
                    status::check_valve(old, q, dh)
                }
                _ => old,
            };
            if new != old {
                debug!(link = l, from = ?old, to = ?new, "link status change");
                if new == LinkState::Blocked {
                    flow[l] = 0.0;
                }
                if old == LinkState::Blocked {
                    // Reopen at the flow the current head difference drives.
                    flow[l] = self.elements[l].model().flow_at_head_loss(dh).max(QF);
                }
                status[l] = new;
                changed = true;
            }
        }
        changed
    }

    /// Assemble the nodal head system over supplied junctions.
    ///
    /// `rows[i]` maps a dense node to its matrix row.
    fn assemble(
        &self,
        head: &DVector<f64>,
        flow: &DVector<f64>,
        status: &[LinkState],
        lin: &[Option<Linearization>],
        rows: &[Option<usize>],
        size: usize,
    ) -> SolverResult<(SparseMatrix, DVector<f64>)> {
        let nj = self.junction_count();
        let mut a = SparseMatrix::new(size, size);
        let mut b = DVector::zeros(size);

        for i in 0..nj {
            let Some(r) = rows[i] else { continue };
            b[r] = -self.demand[i];
            let (qe, de) = emitter_flow(self.emitter[i], head[i] - self.elevation[i]);
            if de > 0.0 {
                a.add(r, r, de)?;
                b[r] += -qe + de * head[i];
            }
        }

        for l in 0..self.elements.len() {
            let (s, e) = self.endpoints(l);
            if status[l] == LinkState::Active {
                let (Some(h_set), Some(re)) = (self.prv_target[l], rows[e]) else {
                    continue;
                };
                if let Some(rs) = rows[s] {
                    b[rs] -= flow[l];
                }
                b[re] += flow[l];
                a.add(re, re, BIG)?;
                b[re] += BIG * h_set;
                continue;
            }
            let Some(lin) = lin[l] else { continue };
            let p = lin.conductance;
            let y = lin.head_loss * p;
            let q = flow[l];

            match (rows[s], rows[e]) {
                (Some(rs), Some(re)) => {
                    a.add(rs, rs, p)?;
                    a.add(re, re, p)?;
                    a.add(rs, re, -p)?;
                    a.add(re, rs, -p)?;
                    b[rs] -= q - y;
                    b[re] += q - y;
                }
                (Some(rs), None) => {
                    a.add(rs, rs, p)?;
                    b[rs] -= q - y;
                    b[rs] += p * head[e];
                }
                (None, Some(re)) => {
                    a.add(re, re, p)?;
                    b[re] += q - y;
                    b[re] += p * head[s];
                }
                (None, None) => {}
            }
        }
        Ok((a, b))
    }

    /// New heads for the matrix rows, starting from `x0`.
    fn head_solve(
        &self,
        options: &SolverOptions,
        a: &SparseMatrix,
        b: &DVector<f64>,
        x0: &DVector<f64>,
    ) -> SolverResult<DVector<f64>> {
        let n = x0.len();
        match options.head_update {
            HeadUpdate::NodalRelaxation => {
                let residual = b - a.multiply_vector(x0)?;
                let diag = a.diagonal();
                Ok(DVector::from_fn(n, |i, _| {
                    if diag[i] > 0.0 {
                        x0[i] + residual[i] / diag[i]
                    } else {
                        x0[i]
                    }
                }))
            }
            HeadUpdate::Gradient => {
                let solve = match options.linear_solver {
                    LinearSolver::ConjugateGradient => {
                        a.solve_conjugate_gradient(b, x0, 2 * n + 10, CG_TOLERANCE)?
                    }
                    LinearSolver::GaussSeidel => {
                        a.solve_from(b, x0, DEFAULT_MAX_SWEEPS, DEFAULT_TOLERANCE)?
                    }
                };
                if !solve.converged {
                    debug!(
                        iterations = solve.iterations,
                        residual = solve.residual,
                        "head system solve hit its iteration cap"
                    );
                }
                Ok(solve.x)
            }
        }
    }

    fn is_one_way(&self, options: &SolverOptions, link: usize) -> bool {
        match self.elements[link] {
            Element::Pump(_) => true,
            _ => self.check_valve[link] && options.check_valves,
        }
    }

    /// Undo the blocking of one-way links made by the last status check.
    fn reopen_blocked(
        &self,
        options: &SolverOptions,
        before: &[LinkState],
        before_flow: &DVector<f64>,
        status: &mut [LinkState],
        flow: &mut DVector<f64>,
    ) {
        for l in 0..status.len() {
            if status[l] == LinkState::Blocked
                && before[l] == LinkState::Open
                && self.is_one_way(options, l)
            {
                status[l] = LinkState::Open;
                flow[l] = before_flow[l];
            }
        }
    }

    /// Continuity residual at a junction: inflow − outflow − demand − emitter.
    fn continuity_residual(&self, node: usize, head: &DVector<f64>, flow: &DVector<f64>) -> f64 {
        let (qe, _) = emitter_flow(self.emitter[node], head[node] - self.elevation[node]);
        let incident = self
            .index
            .incident(hn_core::NodeId::from_index(node as u32));
        let net: f64 = incident
            .iter()
            .map(|inc| inc.sign * flow[inc.link.ix()])
            .sum();
        net - self.demand[node] - qe
    }

    /// Run gradient iterations until converged or the iteration cap.
    pub fn run(&self, options: &SolverOptions) -> SolverResult<Iterate> {
        let nj = self.junction_count();
        let nl = self.elements.len();
        let damping = options.damping_factor;

        let (mut head, mut flow, mut status) = self.initial_state()?;
        let mut supplied = self.supplied(&status);

        let mut converged = false;
        let mut iterations = 0;
        let mut max_head_error = 0.0;
        let mut max_flow_error = 0.0;

        for iteration in 1..=options.max_iterations {
            iterations = iteration;
            let check_one_way =
                iteration <= MAX_STATUS_CHECKS && iteration % STATUS_CHECK_FREQUENCY == 0;
            let before = (status.clone(), flow.clone());
            let mut changed = self.update_statuses(
                options,
                &head,
                &mut flow,
                &mut status,
                &supplied,
                check_one_way,
            );

            let mut now_supplied = self.supplied(&status);
            let cuts_supply = (0..nj).any(|i| supplied[i] && !now_supplied[i]);
            if check_one_way && cuts_supply {
                // A periodic check may not isolate a supplied junction; the
                // check at convergence can.
                debug!(iteration, "status check would isolate junctions; deferred");
                self.reopen_blocked(options, &before.0, &before.1, &mut status, &mut flow);
                now_supplied = self.supplied(&status);
            }
            if now_supplied != supplied {
                changed = true;
                supplied = now_supplied;
            }
            for i in (0..nj).filter(|&i| !supplied[i]) {
                head[i] = self.elevation[i];
            }

            let mut rows = vec![None; nj];
            let mut size = 0;
            for (i, row) in rows.iter_mut().enumerate() {
                if supplied[i] {
                    *row = Some(size);
                    size += 1;
                }
            }
            let mut node_rows = rows.clone();
            node_rows.resize(self.index.node_count(), None);

            let mut lin: Vec<Option<Linearization>> = vec![None; nl];
            for l in 0..nl {
                let (s, _) = self.endpoints(l);
                if status[l] == LinkState::Open && supplied[s] {
                    lin[l] = Some(self.elements[l].model().linearize(flow[l]));
                } else if status[l] != LinkState::Active {
                    flow[l] = 0.0;
                }
            }

            let (a, b) = self.assemble(&head, &flow, &status, &lin, &node_rows, size)?;
            let x0 = DVector::from_iterator(size, (0..nj).filter(|&i| supplied[i]).map(|i| head[i]));
            let x = self.head_solve(options, &a, &b, &x0)?;

            let mut dh_max = 0.0_f64;
            for i in 0..nj {
                if let Some(r) = rows[i] {
                    let dh = damping * (x[r] - head[i]);
                    head[i] += dh;
                    dh_max = dh_max.max(dh.abs());
                }
            }

            let mut dq_max = 0.0_f64;
            for l in 0..nl {
                let Some(lin) = lin[l] else { continue };
                let (s, e) = self.endpoints(l);
                let e1 = (head[s] - head[e]) - lin.head_loss;
                let dq = damping * lin.conductance * e1;
                flow[l] += dq;
                dq_max = dq_max.max(1000.0 * dq.abs());
            }
            for l in 0..nl {
                if status[l] != LinkState::Active {
                    continue;
                }
                let (_, e) = self.endpoints(l);
                if e >= nj {
                    continue;
                }
                let dq = -damping * self.continuity_residual(e, &head, &flow);
                flow[l] += dq;
                dq_max = dq_max.max(1000.0 * dq.abs());
            }

            max_head_error = dh_max;
            max_flow_error = dq_max;
            debug!(
                iteration,
                max_head_change = dh_max,
                max_flow_change = dq_max,
                status_changed = changed,
                "gradient iteration"
            );

            if !dh_max.is_finite() || !dq_max.is_finite() {
                return Err(SolverError::Numeric {
                    what: format!("non-finite head or flow correction at iteration {iteration}"),
                });
            }
            if dh_max < options.accuracy && dq_max < 10.0 * options.accuracy && !changed {
                if self.update_statuses(options, &head, &mut flow, &mut status, &supplied, true) {
                    debug!(iteration, "link status changed at convergence; continuing");
                    continue;
                }
                converged = true;
                break;
            }
        }

        // A capped run can end on an iterate with reverse flow through a
        // one-way link.
        for l in 0..nl {
            if status[l] == LinkState::Open && self.is_one_way(options, l) && flow[l] < 0.0 {
                if flow[l] < -QTOL {
                    debug!(
                        link = l,
                        flow = flow[l],
                        "reverse flow blocked after the last iteration"
                    );
                    status[l] = LinkState::Blocked;
                }
                flow[l] = 0.0;
            }
        }
        supplied = self.supplied(&status);
        for i in (0..nj).filter(|&i| !supplied[i]) {
            head[i] = self.elevation[i];
        }
        for l in 0..nl {
            let (s, _) = self.endpoints(l);
            if !status[l].carries_flow() || !supplied[s] {
                flow[l] = 0.0;
            }
        }

        Ok(Iterate {
            head,
            flow,
            status,
            supplied,
            iterations,
            converged,
            max_head_error,
            max_flow_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emitter_off_without_pressure() {
        assert_eq!(emitter_flow(2.0, 0.0), (0.0, 0.0));
        assert_eq!(emitter_flow(0.0, 10.0), (0.0, 0.0));
    }

    #[test]
    fn emitter_square_root_law() {
        let (q, dq) = emitter_flow(2.0, 16.0);
        assert!((q - 0.008).abs() < 1e-12);
        assert!((dq - 0.5 * 2.0 / 4.0 / 1000.0).abs() < 1e-12);
    }
}
