use crate::HnError;

/// Floating point type used throughout the system
pub type Real = f64;

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, HnError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(HnError::NonFinite { what, value: v })
    }
}

/// Linear interpolation of `y` at `x` on the segment `(x0, y0)`-`(x1, y1)`.
///
/// Degenerate segments (x0 == x1) return `y0`.
pub fn lerp(x: Real, x0: Real, y0: Real, x1: Real, y1: Real) -> Real {
    let dx = x1 - x0;
    if dx.abs() < Real::EPSILON {
        y0
    } else {
        y0 + (y1 - y0) * (x - x0) / dx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_finite_detects_nan() {
        let err = ensure_finite(Real::NAN, "test").unwrap_err();
        let msg = format!("{err}");
        assert!(msg.contains("Non-finite"));
    }

    #[test]
    fn lerp_midpoint_and_degenerate() {
        assert_eq!(lerp(5.0, 0.0, 10.0, 10.0, 20.0), 15.0);
        assert_eq!(lerp(5.0, 2.0, 7.0, 2.0, 9.0), 7.0);
    }
}
