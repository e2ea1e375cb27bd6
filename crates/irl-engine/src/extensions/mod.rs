// extensions/mod.rs
//
// Optional extension modules.
// These are decoupled from the turn cycle; front ends opt in by creating them.

pub mod practice;

pub use practice::{PracticeOverlay, Snapshot};
