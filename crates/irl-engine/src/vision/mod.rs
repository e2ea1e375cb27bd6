pub mod locator;
pub mod mask;
pub mod shape;

pub use locator::{Detection, Locator};
