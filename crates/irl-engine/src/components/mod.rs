pub mod ball;
pub mod color_range;
