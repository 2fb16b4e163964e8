//! hn-core: stable foundation for hydronet.
//!
//! Contains:
//! - units (uom SI types + engineering-unit constructors)
//! - numeric (Real + float helpers)
//! - ids (compact dense IDs for nodes and links)
//! - error (shared error types)
//! - timing (wall-clock timers for run summaries)

pub mod error;
pub mod ids;
pub mod numeric;
pub mod timing;
pub mod units;

// Re-exports: nice ergonomics for downstream crates
pub use error::{HnError, HnResult};
pub use ids::*;
pub use numeric::*;
pub use units::*;
