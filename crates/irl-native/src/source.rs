use std::path::{Path, PathBuf};

use image::RgbImage;
use irl_engine::{IrlError, Result};

/// Producer of fixed-size RGB frames.
pub trait VideoSource {
    /// Frame size, fixed for the source's lifetime.
    fn dimensions(&self) -> (u32, u32);
    fn read_frame(&mut self) -> Result<RgbImage>;
    /// Release the underlying device or files. Further reads fail.
    fn release(&mut self) -> Result<()>;
}

const FRAME_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

fn is_frame_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| FRAME_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn load_rgb(path: &Path) -> Result<RgbImage> {
    Ok(image::open(path)?.to_rgb8())
}

/// Plays back a directory of still images in file-name order, looping.
pub struct ImageSequenceSource {
    files: Vec<PathBuf>,
    next: usize,
    dimensions: (u32, u32),
    released: bool,
}

impl ImageSequenceSource {
    pub fn open(dir: &Path) -> Result<Self> {
        let entries = std::fs::read_dir(dir).map_err(|e| IrlError::io(dir, e))?;
        let mut files = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| IrlError::io(dir, e))?.path();
            if path.is_file() && is_frame_file(&path) {
                files.push(path);
            }
        }
        files.sort();

        let first = files.first().ok_or_else(|| {
            IrlError::VideoSource(format!("no frames in {}", dir.display()))
        })?;
        let dimensions = load_rgb(first)?.dimensions();
        log::info!(
            "Opened {} frames ({}x{}) from {}",
            files.len(),
            dimensions.0,
            dimensions.1,
            dir.display()
        );
        Ok(Self {
            files,
            next: 0,
            dimensions,
            released: false,
        })
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl VideoSource for ImageSequenceSource {
    fn dimensions(&self) -> (u32, u32) {
        self.dimensions
    }

    fn read_frame(&mut self) -> Result<RgbImage> {
        if self.released {
            return Err(IrlError::VideoSource("source already released".to_string()));
        }
        let path = &self.files[self.next];
        self.next = (self.next + 1) % self.files.len();

        let frame = load_rgb(path)?;
        if frame.dimensions() != self.dimensions {
            return Err(IrlError::FrameSize {
                expected: self.dimensions,
                actual: frame.dimensions(),
            });
        }
        Ok(frame)
    }

    fn release(&mut self) -> Result<()> {
        if self.released {
            return Err(IrlError::Teardown("source released twice".to_string()));
        }
        self.released = true;
        Ok(())
    }
}

/// Repeats a single frame forever.
pub struct StillSource {
    frame: RgbImage,
    released: bool,
}

impl StillSource {
    pub fn new(frame: RgbImage) -> Self {
        Self {
            frame,
            released: false,
        }
    }

    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self::new(load_rgb(path)?))
    }
}

impl VideoSource for StillSource {
    fn dimensions(&self) -> (u32, u32) {
        self.frame.dimensions()
    }

    fn read_frame(&mut self) -> Result<RgbImage> {
        if self.released {
            return Err(IrlError::VideoSource("source already released".to_string()));
        }
        Ok(self.frame.clone())
    }

    fn release(&mut self) -> Result<()> {
        if self.released {
            return Err(IrlError::Teardown("source released twice".to_string()));
        }
        self.released = true;
        Ok(())
    }
}
