use std::path::Path;

use image::RgbImage;
use irl_engine::{IrlError, Result};
use opencv::core::Mat;
use opencv::imgproc;
use opencv::prelude::*;
use opencv::videoio::{self, VideoCapture};

use crate::source::VideoSource;

fn cv_error(e: opencv::Error) -> IrlError {
    IrlError::VideoSource(e.to_string())
}

/// Live capture device or video file, read through OpenCV.
pub struct CameraSource {
    capture: VideoCapture,
    dimensions: (u32, u32),
    released: bool,
}

impl CameraSource {
    /// Open capture device `index` (0 is the system default camera).
    pub fn open(index: i32) -> Result<Self> {
        let capture = VideoCapture::new(index, videoio::CAP_ANY).map_err(cv_error)?;
        Self::from_capture(capture, &format!("camera {}", index))
    }

    /// Play back a video file.
    pub fn open_file(path: &Path) -> Result<Self> {
        let name = path.to_string_lossy();
        let capture = VideoCapture::from_file(&name, videoio::CAP_ANY).map_err(cv_error)?;
        Self::from_capture(capture, &name)
    }

    fn from_capture(capture: VideoCapture, label: &str) -> Result<Self> {
        if !capture.is_opened().map_err(cv_error)? {
            return Err(IrlError::VideoSource(format!("{} could not be opened", label)));
        }
        let width = capture.get(videoio::CAP_PROP_FRAME_WIDTH).map_err(cv_error)? as u32;
        let height = capture.get(videoio::CAP_PROP_FRAME_HEIGHT).map_err(cv_error)? as u32;
        log::info!("Opened {} at {}x{}", label, width, height);
        Ok(Self {
            capture,
            dimensions: (width, height),
            released: false,
        })
    }
}

impl VideoSource for CameraSource {
    fn dimensions(&self) -> (u32, u32) {
        self.dimensions
    }

    fn read_frame(&mut self) -> Result<RgbImage> {
        if self.released {
            return Err(IrlError::VideoSource("source already released".to_string()));
        }
        let mut bgr = Mat::default();
        if !self.capture.read(&mut bgr).map_err(cv_error)? || bgr.empty() {
            return Err(IrlError::VideoSource("capture returned no frame".to_string()));
        }

        let mut rgb = Mat::default();
        imgproc::cvt_color(&bgr, &mut rgb, imgproc::COLOR_BGR2RGB, 0).map_err(cv_error)?;
        let actual = (rgb.cols() as u32, rgb.rows() as u32);
        if actual != self.dimensions {
            return Err(IrlError::FrameSize {
                expected: self.dimensions,
                actual,
            });
        }

        let bytes = rgb.data_bytes().map_err(cv_error)?.to_vec();
        RgbImage::from_raw(actual.0, actual.1, bytes)
            .ok_or_else(|| IrlError::VideoSource("frame buffer has the wrong length".to_string()))
    }

    fn release(&mut self) -> Result<()> {
        if self.released {
            return Err(IrlError::Teardown("source released twice".to_string()));
        }
        self.released = true;
        self.capture
            .release()
            .map_err(|e| IrlError::Teardown(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_video_file_does_not_open() {
        let dir = tempfile::tempdir().unwrap();
        let err = CameraSource::open_file(&dir.path().join("absent.avi"))
            .err()
            .expect("missing file must not open");
        assert!(matches!(err, IrlError::VideoSource(_)), "{err}");
    }
}
