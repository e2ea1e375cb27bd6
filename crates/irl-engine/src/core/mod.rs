pub mod physics;
pub mod roster;
