//! The canonical asset shape and the labels derived from it.
//!
//! Every collector, whether it sweeps an address range or reads a cloud inventory,
//! emits [`AssetRecord`]s. Provider details that do not generalize go into the
//! record's extension map instead of widening the schema.

pub mod asset;
pub mod ports;
pub mod reconcile;
pub mod rules;
pub mod verdict;

pub use asset::{AssetKey, AssetRecord, Extension, Kind, Origin, UNKNOWN};
pub use ports::{PortSet, PortSpec};
pub use reconcile::reconcile;
pub use rules::{Access, Direction, SecurityRule};
pub use verdict::{Risk, Tag};
