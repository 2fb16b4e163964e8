//! Runtime link status and the hysteresis rules that change it.

use serde::{Deserialize, Serialize};

/// Head tolerance (m) for status transitions.
pub const HTOL: f64 = 5e-4;

/// Flow tolerance (m³/s) for detecting reverse flow.
pub const QTOL: f64 = 1e-7;

/// Status of a link during and after a solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LinkState {
    /// Carries flow according to its head-loss law.
    Open,
    /// Closed by configuration, a control or a stopped pump.
    Closed,
    /// Temporarily closed by the hydraulics: reversed check valve, pump
    /// unable to lift, or PRV with reverse flow.
    Blocked,
    /// PRV holding its downstream pressure.
    Active,
}

impl LinkState {
    /// True when the link takes part in the head system.
    pub fn carries_flow(self) -> bool {
        matches!(self, LinkState::Open | LinkState::Active)
    }
}

/// Check-valve rule: close on reverse flow, reopen once the head difference
/// would drive forward flow again.
pub fn check_valve(state: LinkState, q: f64, dh: f64) -> LinkState {
    match state {
        LinkState::Open if q < -QTOL => LinkState::Blocked,
        LinkState::Blocked if dh > HTOL => LinkState::Open,
        s => s,
    }
}

/// Pump rule: close when the required lift exceeds the shutoff head or flow
/// reverses; reopen when the shutoff head exceeds the lift again.
///
/// `dh` is start head minus end head, so the lift is `-dh`.
pub fn pump(state: LinkState, q: f64, dh: f64, shutoff_head: f64) -> LinkState {
    let lift = -dh;
    match state {
        LinkState::Open if q < -QTOL || lift > shutoff_head + HTOL => LinkState::Blocked,
        LinkState::Blocked if shutoff_head > lift + HTOL => LinkState::Open,
        s => s,
    }
}

/// Pressure reducing valve rule between open, active and blocked.
///
/// `h_set` is the downstream head the valve holds while active.
pub fn prv(state: LinkState, q: f64, h_start: f64, h_end: f64, h_set: f64) -> LinkState {
    match state {
        LinkState::Active => {
            if q < -QTOL {
                LinkState::Blocked
            } else if h_start < h_set - HTOL {
                LinkState::Open
            } else {
                LinkState::Active
            }
        }
        LinkState::Open => {
            if q < -QTOL {
                LinkState::Blocked
            } else if h_end >= h_set + HTOL {
                LinkState::Active
            } else {
                LinkState::Open
            }
        }
        LinkState::Blocked => {
            if h_start >= h_set + HTOL && h_end < h_set - HTOL {
                LinkState::Active
            } else if h_start < h_set - HTOL && h_start - h_end > HTOL {
                LinkState::Open
            } else {
                LinkState::Blocked
            }
        }
        LinkState::Closed => LinkState::Closed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_valve_blocks_reverse_flow() {
        assert_eq!(check_valve(LinkState::Open, -1e-3, -1.0), LinkState::Blocked);
        assert_eq!(check_valve(LinkState::Open, 1e-3, 1.0), LinkState::Open);
        // tiny reverse flow inside the tolerance keeps it open
        assert_eq!(check_valve(LinkState::Open, -1e-9, 0.0), LinkState::Open);
    }

    #[test]
    fn check_valve_reopens_on_forward_head() {
        assert_eq!(check_valve(LinkState::Blocked, 0.0, 1e-5), LinkState::Blocked);
        assert_eq!(check_valve(LinkState::Blocked, 0.0, 0.1), LinkState::Open);
    }

    #[test]
    fn pump_blocks_beyond_shutoff() {
        assert_eq!(pump(LinkState::Open, 0.01, -60.0, 50.0), LinkState::Blocked);
        assert_eq!(pump(LinkState::Open, 0.01, -40.0, 50.0), LinkState::Open);
        assert_eq!(pump(LinkState::Blocked, 0.0, -40.0, 50.0), LinkState::Open);
        assert_eq!(
            pump(LinkState::Open, 0.01, -1e6, f64::INFINITY),
            LinkState::Open
        );
    }

    #[test]
    fn prv_transitions() {
        let h_set = 70.0;
        // upstream high, downstream above target: starts regulating
        assert_eq!(prv(LinkState::Open, 0.01, 100.0, 80.0, h_set), LinkState::Active);
        // upstream below target: cannot regulate
        assert_eq!(prv(LinkState::Active, 0.01, 60.0, 59.0, h_set), LinkState::Open);
        assert_eq!(prv(LinkState::Active, -0.01, 100.0, 70.0, h_set), LinkState::Blocked);
        assert_eq!(prv(LinkState::Blocked, 0.0, 100.0, 60.0, h_set), LinkState::Active);
        assert_eq!(prv(LinkState::Blocked, 0.0, 65.0, 60.0, h_set), LinkState::Open);
        assert_eq!(prv(LinkState::Closed, 0.01, 100.0, 60.0, h_set), LinkState::Closed);
    }
}
