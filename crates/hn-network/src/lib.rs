//! hn-network: water network model and solver indexing for hydronet.
//!
//! Provides:
//! - Plain network data (junctions, tanks, reservoirs, pipes, pumps, valves,
//!   patterns, curves, controls)
//! - Incremental network builder with validation
//! - Dense indexing (junctions first) and node-link incidence for the solver
//! - Connectivity analysis over open links
//! - YAML / JSON loading and saving
//!
//! # Example
//!
//! ```
//! use hn_network::{NetworkBuilder, NetworkIndex};
//!
//! let mut builder = NetworkBuilder::new("demo");
//! builder
//!     .reservoir("R1", 100.0)
//!     .junction("J1", 80.0, 50.0)
//!     .pipe("P1", "R1", "J1", 1000.0, 300.0, 120.0);
//! let network = builder.build().unwrap();
//! let index = NetworkIndex::build(&network).unwrap();
//!
//! assert_eq!(index.junction_count(), 1);
//! assert_eq!(index.link_count(), 1);
//! ```

pub mod builder;
pub mod error;
pub mod indexing;
pub mod io;
pub mod model;
pub mod topology;
pub mod validate;

// Re-exports for ergonomics
pub use builder::NetworkBuilder;
pub use error::{NetworkError, NetworkResult};
pub use indexing::{Incidence, NetworkIndex};
pub use model::*;
pub use topology::supplied_nodes;
pub use validate::validate_network;
