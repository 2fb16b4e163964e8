//! Per-solve inputs that vary between calls on the same network.
//!
//! A timestep of an extended-period run or one probe of a fire-flow search
//! is a `Conditions` value; the network itself is never modified.

use std::collections::HashMap;

use hn_network::LinkStatus;
use serde::{Deserialize, Serialize};

/// Pattern id to current multiplier.
pub type PatternMultipliers = HashMap<String, f64>;

/// Runtime replacement of a link's configured status, setting or speed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<LinkStatus>,
    /// Valve setting (PRV pressure, TCV loss coefficient)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setting: Option<f64>,
    /// Pump relative speed; replaces the speed pattern
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
}

impl LinkOverride {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.setting.is_none() && self.speed.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conditions {
    pub multipliers: PatternMultipliers,
    /// Tank id to water level (m); missing tanks use their initial level
    pub tank_levels: HashMap<String, f64>,
    /// Junction id to additional demand (L/s)
    pub extra_demand: HashMap<String, f64>,
    pub link_overrides: HashMap<String, LinkOverride>,
}

impl Conditions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_multipliers(multipliers: PatternMultipliers) -> Self {
        Self {
            multipliers,
            ..Self::default()
        }
    }

    /// Multiplier for an optional pattern reference; 1.0 when absent.
    pub fn multiplier(&self, pattern: Option<&str>) -> f64 {
        pattern
            .and_then(|p| self.multipliers.get(p))
            .copied()
            .unwrap_or(1.0)
    }

    pub fn set_extra_demand(&mut self, node: impl Into<String>, flow_lps: f64) -> &mut Self {
        self.extra_demand.insert(node.into(), flow_lps);
        self
    }

    pub fn set_tank_level(&mut self, tank: impl Into<String>, level: f64) -> &mut Self {
        self.tank_levels.insert(tank.into(), level);
        self
    }

    pub fn set_link_override(&mut self, link: impl Into<String>, over: LinkOverride) -> &mut Self {
        let link = link.into();
        if over.is_empty() {
            self.link_overrides.remove(&link);
        } else {
            self.link_overrides.insert(link, over);
        }
        self
    }

    pub fn link_override(&self, link: &str) -> LinkOverride {
        self.link_overrides.get(link).copied().unwrap_or_default()
    }
}
