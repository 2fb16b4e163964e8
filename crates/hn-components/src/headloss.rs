//! Pipe head loss: friction resistance and minor losses.

use crate::common::{check_finite, gradient_flow, signed_pow};
use crate::error::{ComponentError, ComponentResult};
use crate::traits::LinkModel;
use hn_core::units::{Length, circle_area, constants::G, mm, m, to_m, to_m2};
use hn_network::{FrictionFormula, Pipe};

/// Hazen-Williams resistance `10.67·L / (C^1.852·D^4.87)` (SI, Q in m³/s).
pub fn hazen_williams(length: Length, diameter: Length, c: f64) -> f64 {
    10.67 * to_m(length) / (c.powf(1.852) * to_m(diameter).powf(4.87))
}

/// Darcy-Weisbach resistance `f·L / (2g·D·A²)`.
///
/// Uses the fully rough Swamee-Jain friction factor
/// `f = 0.25 / log10(ε / 3.7D)²`.
pub fn darcy_weisbach(length: Length, diameter: Length, roughness: Length) -> f64 {
    let d = to_m(diameter);
    let area = to_m2(circle_area(diameter));
    let f = 0.25 / (to_m(roughness) / (3.7 * d)).log10().powi(2);
    f * to_m(length) / (2.0 * G * d * area * area)
}

/// Friction resistance coefficient of a pipe under the given formula.
///
/// Pipe length is in m, diameter in mm; roughness is the C factor for
/// Hazen-Williams and the absolute roughness in mm for Darcy-Weisbach.
pub fn resistance(pipe: &Pipe, formula: FrictionFormula) -> ComponentResult<f64> {
    if pipe.length <= 0.0 || pipe.diameter <= 0.0 || pipe.roughness <= 0.0 {
        return Err(ComponentError::NonPhysical {
            what: "pipe length, diameter and roughness must be positive",
        });
    }
    let length = m(pipe.length);
    let diameter = mm(pipe.diameter);
    let r = match formula {
        FrictionFormula::HazenWilliams => hazen_williams(length, diameter, pipe.roughness),
        FrictionFormula::DarcyWeisbach => darcy_weisbach(length, diameter, mm(pipe.roughness)),
    };
    check_finite(r, "pipe resistance")?;
    Ok(r)
}

/// Minor-loss coefficient `K / (2g·A²)` for a circular section.
pub fn minor_loss(k: f64, diameter: Length) -> f64 {
    let area = to_m2(circle_area(diameter));
    k / (2.0 * G * area * area)
}

/// A pipe reduced to `hl = r·Q|Q|^(n-1) + m·Q|Q|`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipeModel {
    /// Friction resistance
    pub r: f64,
    /// Minor-loss coefficient
    pub m: f64,
    /// Flow exponent
    pub n: f64,
}

impl PipeModel {
    pub fn new(pipe: &Pipe, formula: FrictionFormula) -> ComponentResult<Self> {
        Ok(Self {
            r: resistance(pipe, formula)?,
            m: minor_loss(pipe.minor_loss, mm(pipe.diameter)),
            n: formula.exponent(),
        })
    }
}

impl LinkModel for PipeModel {
    fn head_loss(&self, q: f64) -> f64 {
        self.r * signed_pow(q, self.n) + self.m * q * q.abs()
    }

    fn gradient(&self, q: f64) -> f64 {
        let aq = gradient_flow(q);
        self.n * self.r * aq.powf(self.n - 1.0) + 2.0 * self.m * aq
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::MIN_GRADIENT;

    fn pipe(length: f64, diameter: f64, roughness: f64) -> Pipe {
        Pipe {
            length,
            diameter,
            roughness,
            minor_loss: 0.0,
        }
    }

    #[test]
    fn hazen_williams_reference_value() {
        let r = resistance(&pipe(1000.0, 300.0, 120.0), FrictionFormula::HazenWilliams).unwrap();
        let expected = 10.67 * 1000.0 / (120.0_f64.powf(1.852) * 0.3_f64.powf(4.87));
        assert!((r - expected).abs() / expected < 1e-12);
    }

    #[test]
    fn darcy_weisbach_rough_pipe() {
        let r = resistance(&pipe(100.0, 200.0, 0.1), FrictionFormula::DarcyWeisbach).unwrap();
        // ε/D = 5e-4 gives f ≈ 0.0167 in the fully rough regime
        let area = std::f64::consts::PI * 0.01;
        let f = 0.25 / (0.0001_f64 / (3.7 * 0.2)).log10().powi(2);
        assert!((f - 0.0167).abs() < 1e-3);
        let expected = f * 100.0 / (2.0 * G * 0.2 * area * area);
        assert!((r - expected).abs() / expected < 1e-12);
    }

    #[test]
    fn non_physical_pipe_rejected() {
        assert!(resistance(&pipe(0.0, 300.0, 120.0), FrictionFormula::HazenWilliams).is_err());
        assert!(resistance(&pipe(10.0, 300.0, -1.0), FrictionFormula::DarcyWeisbach).is_err());
    }

    #[test]
    fn minor_loss_for_unit_k() {
        let m = minor_loss(1.0, mm(100.0));
        let area = std::f64::consts::PI * 0.0025;
        assert!((m - 1.0 / (2.0 * G * area * area)).abs() < 1e-6);
        assert_eq!(minor_loss(0.0, mm(100.0)), 0.0);
    }

    #[test]
    fn head_loss_is_odd_in_flow() {
        let model = PipeModel::new(&pipe(500.0, 150.0, 100.0), FrictionFormula::HazenWilliams)
            .unwrap();
        let q = 0.02;
        assert!((model.head_loss(q) + model.head_loss(-q)).abs() < 1e-12);
        assert!(model.head_loss(q) > 0.0);
    }

    #[test]
    fn gradient_matches_finite_difference() {
        let mut p = pipe(800.0, 250.0, 110.0);
        p.minor_loss = 2.0;
        let model = PipeModel::new(&p, FrictionFormula::HazenWilliams).unwrap();
        let q = 0.04;
        let h = 1e-7;
        let fd = (model.head_loss(q + h) - model.head_loss(q - h)) / (2.0 * h);
        assert!((model.gradient(q) - fd).abs() / fd < 1e-5);
    }

    #[test]
    fn zero_flow_linearization_is_finite() {
        let model = PipeModel::new(&pipe(100.0, 300.0, 130.0), FrictionFormula::HazenWilliams)
            .unwrap();
        let lin = model.linearize(0.0);
        assert!(lin.conductance.is_finite());
        assert!(lin.conductance <= 1.0 / MIN_GRADIENT);
        assert_eq!(lin.head_loss, 0.0);
    }

    #[test]
    fn flow_at_head_loss_inverts_friction() {
        let model = PipeModel::new(&pipe(600.0, 200.0, 120.0), FrictionFormula::HazenWilliams)
            .unwrap();
        let q = model.flow_at_head_loss(model.head_loss(0.025));
        assert!((q - 0.025).abs() < 1e-9);
        assert_eq!(model.flow_at_head_loss(-3.0), 0.0);
    }
}
