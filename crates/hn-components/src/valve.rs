//! Valve loss model.
//!
//! A TCV throttles with its setting as the loss coefficient. PSV, PBV, FCV
//! and GPV are carried as fixed resistances from `minor_loss`; the PRV uses
//! the same resistance while open and is held at `prv_target_head` by the
//! solver while active.

use crate::common::gradient_flow;
use crate::error::{ComponentError, ComponentResult};
use crate::headloss::minor_loss;
use crate::traits::LinkModel;
use hn_core::units::mm;
use hn_network::{Valve, ValveType};

/// Downstream head a PRV holds: end-node elevation plus the pressure setting.
pub fn prv_target_head(end_elevation: f64, setting: f64) -> f64 {
    end_elevation + setting
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValveModel {
    pub valve_type: ValveType,
    /// Minor-loss coefficient `K/(2gA²)` of the open valve
    pub m: f64,
    /// Type-specific setting (pressure m for PRV, K for TCV)
    pub setting: f64,
    diameter_mm: f64,
    base_minor_loss: f64,
}

impl ValveModel {
    pub fn new(valve: &Valve) -> ComponentResult<Self> {
        if valve.diameter <= 0.0 {
            return Err(ComponentError::NonPhysical {
                what: "valve diameter must be positive",
            });
        }
        let mut model = Self {
            valve_type: valve.valve_type,
            m: 0.0,
            setting: valve.setting,
            diameter_mm: valve.diameter,
            base_minor_loss: valve.minor_loss.max(0.0),
        };
        model.m = model.loss_coefficient();
        Ok(model)
    }

    /// The same valve with another setting.
    pub fn with_setting(&self, setting: f64) -> Self {
        let mut model = *self;
        model.setting = setting;
        model.m = model.loss_coefficient();
        model
    }

    fn loss_coefficient(&self) -> f64 {
        let k = match self.valve_type {
            ValveType::Tcv => self.setting.max(0.0),
            _ => self.base_minor_loss,
        };
        minor_loss(k, mm(self.diameter_mm))
    }

    pub fn is_prv(&self) -> bool {
        self.valve_type == ValveType::Prv
    }
}

impl LinkModel for ValveModel {
    fn head_loss(&self, q: f64) -> f64 {
        self.m * q * q.abs()
    }

    fn gradient(&self, q: f64) -> f64 {
        2.0 * self.m * gradient_flow(q)
    }
}
