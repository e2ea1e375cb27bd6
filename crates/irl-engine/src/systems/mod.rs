pub mod collision;
pub mod overlay;
pub mod turn;
