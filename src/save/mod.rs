//! Save coordination
//!
//! Snapshot saves are expensive, so commits do not write snapshots
//! themselves. They raise a save request; one background loop turns any
//! number of requests into as few saves as possible.

mod coordinator;

pub use coordinator::{SaveCoordinator, SaveStats};
