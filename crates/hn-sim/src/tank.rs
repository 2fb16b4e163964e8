//! Tank storage: level update from net inflow.

use hn_core::numeric::lerp;
use hn_core::units::constants::LPS_TO_M3PH;
use hn_network::{Tank, WaterNetwork};

use crate::error::{SimError, SimResult};

/// Which bound a level update was clamped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TankLimit {
    Empty,
    Full,
}

/// Level-volume relation of one tank.
#[derive(Debug, Clone, PartialEq)]
pub enum Storage {
    /// Constant cross-section (m²).
    Cylinder { area: f64 },
    /// (level m, volume m³) points, increasing in level.
    Curve(Vec<(f64, f64)>),
}

impl Storage {
    pub fn for_tank(tank: &Tank, network: &WaterNetwork) -> SimResult<Self> {
        if let Some(id) = &tank.volume_curve {
            let curve = network.curve(id).ok_or(SimError::InvalidArg {
                what: "tank volume curve not found",
            })?;
            let mut points = curve.points.clone();
            points.sort_by(|a, b| a.0.total_cmp(&b.0));
            let increasing = points
                .windows(2)
                .all(|w| w[1].0 > w[0].0 && w[1].1 > w[0].1);
            if points.len() < 2 || !increasing {
                return Err(SimError::InvalidArg {
                    what: "tank volume curve needs two or more strictly increasing points",
                });
            }
            return Ok(Storage::Curve(points));
        }
        if tank.diameter <= 0.0 {
            return Err(SimError::InvalidArg {
                what: "tank diameter must be positive",
            });
        }
        let r = tank.diameter / 2.0;
        Ok(Storage::Cylinder {
            area: std::f64::consts::PI * r * r,
        })
    }

    pub fn volume(&self, level: f64) -> f64 {
        match self {
            Storage::Cylinder { area } => area * level,
            Storage::Curve(points) => interpolate(points, level, |p| p),
        }
    }

    pub fn level(&self, volume: f64) -> f64 {
        match self {
            Storage::Cylinder { area } => volume / area,
            Storage::Curve(points) => interpolate(points, volume, |(l, v)| (v, l)),
        }
    }
}

fn interpolate(points: &[(f64, f64)], x: f64, axes: impl Fn((f64, f64)) -> (f64, f64)) -> f64 {
    let seg = points
        .windows(2)
        .position(|w| x <= axes(w[1]).0)
        .unwrap_or(points.len() - 2);
    let (x0, y0) = axes(points[seg]);
    let (x1, y1) = axes(points[seg + 1]);
    lerp(x, x0, y0, x1, y1)
}

/// New level after `dt_h` hours of `net_inflow` (L/s), clamped to the
/// tank's bounds.
///
/// `ΔV = net_inflow · 3.6 · dt_h` (m³).
pub fn next_level(
    tank: &Tank,
    storage: &Storage,
    level: f64,
    net_inflow: f64,
    dt_h: f64,
) -> (f64, Option<TankLimit>) {
    let volume = storage.volume(level) + net_inflow * LPS_TO_M3PH * dt_h;
    let raw = storage.level(volume);
    if raw < tank.min_level {
        (tank.min_level, Some(TankLimit::Empty))
    } else if raw > tank.max_level {
        (tank.max_level, Some(TankLimit::Full))
    } else {
        (raw, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tank() -> Tank {
        Tank {
            init_level: 2.0,
            min_level: 0.5,
            max_level: 4.0,
            diameter: 10.0,
            volume_curve: None,
        }
    }

    #[test]
    fn cylinder_level_change() {
        let t = tank();
        let storage = Storage::for_tank(&t, &WaterNetwork::default()).unwrap();
        // 10 L/s for an hour is 36 m³ over 78.54 m²
        let (level, limit) = next_level(&t, &storage, 2.0, 10.0, 1.0);
        assert!((level - (2.0 + 36.0 / (std::f64::consts::PI * 25.0))).abs() < 1e-12);
        assert_eq!(limit, None);
    }

    #[test]
    fn levels_clamp_at_bounds() {
        let t = tank();
        let storage = Storage::for_tank(&t, &WaterNetwork::default()).unwrap();
        assert_eq!(next_level(&t, &storage, 1.0, -100.0, 1.0), (0.5, Some(TankLimit::Empty)));
        assert_eq!(next_level(&t, &storage, 3.9, 100.0, 1.0), (4.0, Some(TankLimit::Full)));
    }

    #[test]
    fn volume_curve_inverts() {
        let mut net = WaterNetwork::default();
        net.curves.push(hn_network::Curve {
            id: "VC".to_string(),
            points: vec![(0.0, 0.0), (2.0, 100.0), (4.0, 300.0)],
        });
        let t = Tank {
            volume_curve: Some("VC".to_string()),
            ..tank()
        };
        let storage = Storage::for_tank(&t, &net).unwrap();
        assert_eq!(storage.volume(3.0), 200.0);
        assert_eq!(storage.level(50.0), 1.0);

        // +36 m³ from level 2 lands in the upper segment
        let (level, _) = next_level(&t, &storage, 2.0, 10.0, 1.0);
        assert!((level - 2.36).abs() < 1e-12);
    }

    #[test]
    fn bad_geometry_rejected() {
        let flat = Tank {
            diameter: 0.0,
            ..tank()
        };
        assert!(Storage::for_tank(&flat, &WaterNetwork::default()).is_err());

        let missing = Tank {
            volume_curve: Some("nope".to_string()),
            ..tank()
        };
        assert!(Storage::for_tank(&missing, &WaterNetwork::default()).is_err());
    }
}
