#[cfg(feature = "camera")]
pub mod camera;
pub mod runner;
pub mod sink;
pub mod source;

#[cfg(feature = "camera")]
pub use camera::CameraSource;
pub use runner::SessionRunner;
pub use sink::{NullSink, PngSequenceSink, RenderSink};
pub use source::{ImageSequenceSource, StillSource, VideoSource};
