//! hn-components: hydraulic element models for network solving.
//!
//! Provides models for the three link families:
//! - Pipes with Hazen-Williams or Darcy-Weisbach friction plus minor losses
//! - Pumps with power-function, point-curve or constant-power characteristics
//! - Valves acting as fixed resistances, with the PRV target head helper
//!
//! Every model implements `LinkModel`, a deterministic function of flow that
//! the gradient solver linearizes once per iteration. Flows are in m³/s and
//! heads in m.
//!
//! # Example
//!
//! ```
//! use hn_components::{LinkModel, PipeModel};
//! use hn_network::{FrictionFormula, Pipe};
//!
//! let pipe = Pipe { length: 1000.0, diameter: 300.0, roughness: 120.0, minor_loss: 0.0 };
//! let model = PipeModel::new(&pipe, FrictionFormula::HazenWilliams).unwrap();
//!
//! let hl = model.head_loss(0.05);
//! assert!(hl > 2.0 && hl < 3.0);
//! ```

pub mod common;
pub mod error;
pub mod headloss;
pub mod pump;
pub mod traits;
pub mod valve;

// Re-exports
pub use error::{ComponentError, ComponentResult};
pub use headloss::{PipeModel, minor_loss, resistance};
pub use pump::{HeadCurve, PumpModel};
pub use traits::{LinkModel, Linearization};
pub use valve::{ValveModel, prv_target_head};
