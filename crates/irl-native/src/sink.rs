use std::path::{Path, PathBuf};

use image::RgbImage;
use irl_engine::{IrlError, Result};

/// Consumer of annotated frames, one per tick.
pub trait RenderSink {
    fn present(&mut self, tick: u64, frame: &RgbImage) -> Result<()>;
    fn close(&mut self) -> Result<()>;
}

/// Writes every presented frame to `<dir>/frame_000123.png`.
pub struct PngSequenceSink {
    dir: PathBuf,
    written: u64,
}

impl PngSequenceSink {
    pub fn create(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir).map_err(|e| IrlError::io(dir, e))?;
        Ok(Self {
            dir: dir.to_path_buf(),
            written: 0,
        })
    }

    pub fn frame_path(&self, tick: u64) -> PathBuf {
        self.dir.join(format!("frame_{:06}.png", tick))
    }

    pub fn written(&self) -> u64 {
        self.written
    }
}

impl RenderSink for PngSequenceSink {
    fn present(&mut self, tick: u64, frame: &RgbImage) -> Result<()> {
        frame.save(self.frame_path(tick))?;
        self.written += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        log::info!("Wrote {} frames to {}", self.written, self.dir.display());
        Ok(())
    }
}

/// Discards frames, counting them.
#[derive(Debug, Default)]
pub struct NullSink {
    pub presented: u64,
}

impl RenderSink for NullSink {
    fn present(&mut self, _tick: u64, _frame: &RgbImage) -> Result<()> {
        self.presented += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
