//! Pump head curves.

use crate::common::{FD_STEP, QF, check_finite};
use crate::error::{ComponentError, ComponentResult};
use crate::traits::LinkModel;
use hn_core::numeric::lerp;
use hn_core::units::constants::{G, RHO_WATER};
use hn_network::{Pump, PumpCurve, WaterNetwork};

/// Head-flow characteristic at nominal speed, flows in L/s.
#[derive(Debug, Clone, PartialEq)]
pub enum HeadCurve {
    /// H = A - B·Q^C
    PowerFunction { a: f64, b: f64, c: f64 },
    /// Piecewise linear through (Q, H) points sorted by flow.
    Points(Vec<(f64, f64)>),
    /// Shaft power in kW.
    ConstantPower { power_kw: f64 },
}

impl HeadCurve {
    /// Build a characteristic from (flow L/s, head m) points.
    ///
    /// A single design point becomes the power function
    /// `A = 4/3·h, B = h/(3·q²), C = 2`; longer curves are interpolated.
    pub fn from_points(curve_id: &str, points: &[(f64, f64)]) -> ComponentResult<Self> {
        match points {
            [] => Err(ComponentError::InvalidCurve {
                curve: curve_id.to_string(),
                reason: "pump curve has no points",
            }),
            [(q, h)] => {
                if *q <= 0.0 || *h <= 0.0 {
                    return Err(ComponentError::InvalidCurve {
                        curve: curve_id.to_string(),
                        reason: "design point must have positive flow and head",
                    });
                }
                Ok(HeadCurve::PowerFunction {
                    a: 4.0 / 3.0 * h,
                    b: h / (3.0 * q * q),
                    c: 2.0,
                })
            }
            _ => {
                let mut sorted = points.to_vec();
                sorted.sort_by(|a, b| a.0.total_cmp(&b.0));
                if sorted.windows(2).any(|w| w[1].0 <= w[0].0) {
                    return Err(ComponentError::InvalidCurve {
                        curve: curve_id.to_string(),
                        reason: "pump curve flows must be distinct",
                    });
                }
                Ok(HeadCurve::Points(sorted))
            }
        }
    }

    /// Head (m) at nominal speed for flow `q` (L/s, q >= 0).
    fn nominal_head(&self, q: f64) -> f64 {
        match self {
            HeadCurve::PowerFunction { a, b, c } => a - b * q.max(0.0).powf(*c),
            HeadCurve::Points(points) => interpolate(points, q),
            HeadCurve::ConstantPower { .. } => f64::INFINITY,
        }
    }
}

/// Linear interpolation, extrapolating from the end segments.
fn interpolate(points: &[(f64, f64)], x: f64) -> f64 {
    let n = points.len();
    let seg = points
        .windows(2)
        .position(|w| x <= w[1].0)
        .unwrap_or(n - 2);
    let (x0, y0) = points[seg];
    let (x1, y1) = points[seg + 1];
    lerp(x, x0, y0, x1, y1)
}

/// A pump at a given relative speed.
///
/// `head_gain` uses the affinity laws: at speed `s` the nominal curve is
/// evaluated at `Q/s` and scaled by `s²`.
#[derive(Debug, Clone, PartialEq)]
pub struct PumpModel {
    pub curve: HeadCurve,
    pub speed: f64,
    pub efficiency: f64,
}

impl PumpModel {
    pub fn new(curve: HeadCurve, speed: f64, efficiency: f64) -> ComponentResult<Self> {
        if !(efficiency > 0.0 && efficiency <= 1.0) {
            return Err(ComponentError::InvalidArg {
                what: "pump efficiency must be in (0,1]",
            });
        }
        if speed < 0.0 {
            return Err(ComponentError::InvalidArg {
                what: "pump speed cannot be negative",
            });
        }
        check_finite(speed, "pump speed")?;
        Ok(Self {
            curve,
            speed,
            efficiency,
        })
    }

    /// Resolve a model pump, looking up point curves in the network.
    pub fn from_pump(pump: &Pump, network: &WaterNetwork) -> ComponentResult<Self> {
        let curve = match &pump.curve {
            PumpCurve::PowerFunction { a, b, c } => {
                if *a <= 0.0 || *b < 0.0 || *c <= 0.0 {
                    return Err(ComponentError::InvalidArg {
                        what: "power-function pump coefficients must be positive",
                    });
                }
                HeadCurve::PowerFunction {
                    a: *a,
                    b: *b,
                    c: *c,
                }
            }
            PumpCurve::Points { curve } => {
                let data = network
                    .curve(curve)
                    .ok_or_else(|| ComponentError::InvalidCurve {
                        curve: curve.clone(),
                        reason: "curve not found",
                    })?;
                HeadCurve::from_points(curve, &data.points)?
            }
            PumpCurve::ConstantPower { power_kw } => {
                if *power_kw <= 0.0 {
                    return Err(ComponentError::InvalidArg {
                        what: "constant pump power must be positive",
                    });
                }
                HeadCurve::ConstantPower {
                    power_kw: *power_kw,
                }
            }
        };
        Self::new(curve, pump.speed, pump.efficiency)
    }

    /// The same pump running at another relative speed.
    pub fn with_speed(&self, speed: f64) -> Self {
        Self {
            curve: self.curve.clone(),
            speed: speed.max(0.0),
            efficiency: self.efficiency,
        }
    }

    /// Head added (m) at flow `q` (m³/s).
    pub fn head_gain(&self, q: f64) -> f64 {
        let s = self.speed;
        if s <= 0.0 {
            return 0.0;
        }
        match &self.curve {
            HeadCurve::ConstantPower { power_kw } => {
                let power_w = 1000.0 * power_kw * s.powi(3);
                power_w * self.efficiency / (RHO_WATER * G * q.max(QF))
            }
            curve => s * s * curve.nominal_head(1000.0 * q.max(0.0) / s),
        }
    }

    /// Forward finite-difference slope of `head_gain` at `max(q, QF)`.
    pub fn head_gain_slope(&self, q: f64) -> f64 {
        let q = q.max(QF);
        (self.head_gain(q + FD_STEP) - self.head_gain(q)) / FD_STEP
    }

    /// Head at zero flow; infinite for a constant-power pump.
    pub fn shutoff_head(&self) -> f64 {
        match &self.curve {
            HeadCurve::ConstantPower { .. } => f64::INFINITY,
            curve => self.speed * self.speed * curve.nominal_head(0.0),
        }
    }

    /// Power delivered to the water (kW) at flow `q` (m³/s) and lift `head` (m).
    pub fn hydraulic_power_kw(&self, q: f64, head: f64) -> f64 {
        RHO_WATER * G * q.max(0.0) * head.max(0.0) / 1000.0
    }

    /// Electrical power drawn (kW).
    pub fn shaft_power_kw(&self, q: f64, head: f64) -> f64 {
        self.hydraulic_power_kw(q, head) / self.efficiency
    }
}

impl LinkModel for PumpModel {
    /// Negative head gain; reverse flow is evaluated at zero.
    fn head_loss(&self, q: f64) -> f64 {
        -self.head_gain(q.max(0.0))
    }

    fn gradient(&self, q: f64) -> f64 {
        -self.head_gain_slope(q)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::MIN_GRADIENT;

    fn power(a: f64, b: f64, c: f64) -> PumpModel {
        PumpModel::new(HeadCurve::PowerFunction { a, b, c }, 1.0, 0.75).unwrap()
    }

    #[test]
    fn power_function_head() {
        let pump = power(50.0, 0.01, 2.0);
        // Q = 20 L/s -> 50 - 0.01·400
        assert!((pump.head_gain(0.02) - 46.0).abs() < 1e-9);
        assert_eq!(pump.shutoff_head(), 50.0);
    }

    #[test]
    fn affinity_scaling() {
        let pump = power(50.0, 0.01, 2.0).with_speed(0.5);
        assert_eq!(pump.shutoff_head(), 12.5);
        // at half speed, 10 L/s maps to 20 L/s nominal
        assert!((pump.head_gain(0.01) - 0.25 * 46.0).abs() < 1e-9);
    }

    #[test]
    fn operating_flow_for_a_lift() {
        let pump = power(60.0, 0.01, 2.0);
        // 60 - 0.01·30² = 51
        assert!((pump.flow_at_head_loss(-51.0) - 0.03).abs() < 1e-9);
        assert_eq!(pump.flow_at_head_loss(-70.0), 0.0);
    }

    #[test]
    fn stopped_pump_adds_nothing() {
        let pump = power(50.0, 0.01, 2.0).with_speed(0.0);
        assert_eq!(pump.head_gain(0.01), 0.0);
    }

    #[test]
    fn single_point_curve() {
        let curve = HeadCurve::from_points("C1", &[(30.0, 40.0)]).unwrap();
        let pump = PumpModel::new(curve, 1.0, 0.8).unwrap();
        assert!((pump.head_gain(0.03) - 40.0).abs() < 1e-9);
        assert!((pump.shutoff_head() - 160.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn multi_point_curve_interpolates_and_extrapolates() {
        let curve =
            HeadCurve::from_points("C2", &[(40.0, 30.0), (0.0, 50.0), (20.0, 45.0)]).unwrap();
        let pump = PumpModel::new(curve, 1.0, 0.8).unwrap();
        assert!((pump.head_gain(0.010) - 47.5).abs() < 1e-9);
        assert!((pump.head_gain(0.030) - 37.5).abs() < 1e-9);
        // beyond the last point the last segment continues
        assert!((pump.head_gain(0.050) - 22.5).abs() < 1e-9);
    }

    #[test]
    fn duplicate_curve_flows_rejected() {
        assert!(HeadCurve::from_points("C3", &[(10.0, 30.0), (10.0, 20.0)]).is_err());
        assert!(HeadCurve::from_points("C4", &[]).is_err());
    }

    #[test]
    fn constant_power_head() {
        let pump = PumpModel::new(HeadCurve::ConstantPower { power_kw: 10.0 }, 1.0, 0.75).unwrap();
        let q = 0.05;
        let expected = 10_000.0 * 0.75 / (RHO_WATER * G * q);
        assert!((pump.head_gain(q) - expected).abs() < 1e-9);
        assert!(pump.shutoff_head().is_infinite());
    }

    #[test]
    fn pump_gradient_is_positive_loss_slope() {
        let pump = power(50.0, 0.01, 2.0);
        let lin = pump.linearize(0.02);
        assert!(lin.head_loss < 0.0);
        // d(loss)/dQ = 2·B·Q·1e6 in SI = 400 s/m²
        assert!((1.0 / lin.conductance - 400.0).abs() < 0.1);
    }

    #[test]
    fn flat_curve_gradient_is_floored() {
        let pump = power(50.0, 0.0, 2.0);
        let lin = pump.linearize(0.0);
        assert!((lin.conductance - 1.0 / MIN_GRADIENT).abs() < 1e-9);
    }

    #[test]
    fn power_accounting() {
        let pump = power(50.0, 0.01, 2.0);
        let hyd = pump.hydraulic_power_kw(0.02, 46.0);
        assert!((hyd - RHO_WATER * G * 0.02 * 46.0 / 1000.0).abs() < 1e-12);
        assert!((pump.shaft_power_kw(0.02, 46.0) - hyd / 0.75).abs() < 1e-12);
    }

    #[test]
    fn bad_efficiency_rejected() {
        assert!(PumpModel::new(HeadCurve::ConstantPower { power_kw: 1.0 }, 1.0, 0.0).is_err());
        assert!(PumpModel::new(HeadCurve::ConstantPower { power_kw: 1.0 }, 1.0, 1.2).is_err());
    }
}
