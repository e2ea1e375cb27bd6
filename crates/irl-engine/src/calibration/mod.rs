pub mod store;

pub use store::CalibrationStore;
