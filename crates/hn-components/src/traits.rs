//! Core trait for link element models.

use crate::common::MIN_GRADIENT;

/// Upper bracket for `LinkModel::flow_at_head_loss` (m³/s).
const MAX_BRACKET_FLOW: f64 = 10.0;

const BISECTION_STEPS: usize = 60;

/// Linear model of a link around the current flow estimate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Linearization {
    /// A11 = 1 / (∂headloss/∂Q), m²/s
    pub conductance: f64,
    /// Head loss at the current flow (m); negative for a pump adding head
    pub head_loss: f64,
}

/// A two-node link whose head loss is a deterministic function of flow.
///
/// Flow is positive from the start node to the end node, in m³/s. Models
/// are immutable and shared across concurrent solves.
pub trait LinkModel: Send + Sync {
    /// Head loss from start to end node (m) at flow `q`.
    fn head_loss(&self, q: f64) -> f64;

    /// Derivative of `head_loss` with respect to flow, before flooring.
    fn gradient(&self, q: f64) -> f64;

    /// Conductance and head loss at flow `q`.
    ///
    /// The gradient is floored at `MIN_GRADIENT` so links with negligible
    /// resistance still yield a finite conductance.
    fn linearize(&self, q: f64) -> Linearization {
        let gradient = self.gradient(q).max(MIN_GRADIENT);
        Linearization {
            conductance: 1.0 / gradient,
            head_loss: self.head_loss(q),
        }
    }

    /// Forward flow whose head loss equals `head_loss`, by bisection.
    ///
    /// Head loss is non-decreasing in forward flow for every model. The
    /// result is clamped to `[0, MAX_BRACKET_FLOW]`.
    fn flow_at_head_loss(&self, head_loss: f64) -> f64 {
        let (mut lo, mut hi) = (0.0, MAX_BRACKET_FLOW);
        if self.head_loss(lo) >= head_loss {
            return lo;
        }
        if self.head_loss(hi) <= head_loss {
            return hi;
        }
        for _ in 0..BISECTION_STEPS {
            let mid = 0.5 * (lo + hi);
            if self.head_loss(mid) < head_loss {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        0.5 * (lo + hi)
    }
}
