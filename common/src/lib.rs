//! Shared building blocks for the discovr workspace.
//!
//! Everything every collector, the scanner and the rule engines agree on lives here:
//! the canonical [`model::AssetRecord`], port and rule primitives, target parsing,
//! run configuration and the fatal-input error taxonomy.

pub mod config;
pub mod error;
pub mod macros;
pub mod model;
pub mod network;
pub mod utils;

#[doc(hidden)]
pub use tracing as __tracing;
