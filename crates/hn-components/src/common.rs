//! Common constants and helpers for element linearization.

use crate::error::{ComponentError, ComponentResult};
use hn_core::numeric::ensure_finite;

/// Flow (m³/s) below which gradients are evaluated at this floor instead.
pub const QF: f64 = 1e-4;

/// Smallest head-loss gradient (s/m²) used to form a conductance.
pub const MIN_GRADIENT: f64 = 1e-3;

/// Forward finite-difference step for pump curve derivatives (m³/s).
pub const FD_STEP: f64 = 1e-6;

/// Ensure a value is finite, returning ComponentError if not.
pub fn check_finite(value: f64, what: &'static str) -> ComponentResult<()> {
    ensure_finite(value, what).map_err(|_| ComponentError::NonPhysical { what })?;
    Ok(())
}

/// Flow magnitude at which a gradient is evaluated.
#[inline]
pub fn gradient_flow(q: f64) -> f64 {
    q.abs().max(QF)
}

/// `Q·|Q|^(n-1)`, the signed power law.
#[inline]
pub fn signed_pow(q: f64, n: f64) -> f64 {
    q * q.abs().powf(n - 1.0)
}
