use std::time::SystemTime;

use image::RgbImage;

use crate::systems::overlay::add_weighted;

/// Default blend weight of the selected snapshot.
pub const DEFAULT_OPACITY: f32 = 0.2;

/// A saved frame to ghost over the live feed.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub image: RgbImage,
    /// Tick at which the frame was captured.
    pub tick: u64,
    pub captured_at: SystemTime,
}

/// Practice-mode ghosting: saved frames blended over the live one so a player
/// can re-create a previous layout.
#[derive(Debug, Clone)]
pub struct PracticeOverlay {
    /// Newest first.
    snapshots: Vec<Snapshot>,
    selected: usize,
    opacity: f32,
}

impl PracticeOverlay {
    pub fn new() -> Self {
        Self {
            snapshots: Vec::new(),
            selected: 0,
            opacity: DEFAULT_OPACITY,
        }
    }

    /// Save `frame` as the newest snapshot and select it.
    pub fn save(&mut self, frame: &RgbImage, tick: u64) {
        self.snapshots.insert(
            0,
            Snapshot {
                image: frame.clone(),
                tick,
                captured_at: SystemTime::now(),
            },
        );
        self.selected = 0;
    }

    /// Select a snapshot by index. Out-of-range indices are ignored.
    pub fn select(&mut self, index: usize) -> bool {
        if index < self.snapshots.len() {
            self.selected = index;
            true
        } else {
            false
        }
    }

    pub fn selected(&self) -> Option<&Snapshot> {
        self.snapshots.get(self.selected)
    }

    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    /// Clamped to `[0, 1]`.
    pub fn set_opacity(&mut self, opacity: f32) {
        self.opacity = opacity.clamp(0.0, 1.0);
    }

    /// `frame + opacity * selected`, saturating. Passes the frame through when
    /// nothing is saved or the snapshot size differs.
    pub fn compose(&self, frame: &RgbImage) -> RgbImage {
        match self.selected() {
            Some(snapshot) if snapshot.image.dimensions() == frame.dimensions() => {
                add_weighted(frame, &snapshot.image, self.opacity)
            }
            Some(snapshot) => {
                log::warn!(
                    "Snapshot from tick {} is {:?}, frame is {:?}; not blended",
                    snapshot.tick,
                    snapshot.image.dimensions(),
                    frame.dimensions()
                );
                frame.clone()
            }
            None => frame.clone(),
        }
    }

    /// Forget every snapshot.
    pub fn clear(&mut self) {
        self.snapshots.clear();
        self.selected = 0;
    }
}

impl Default for PracticeOverlay {
    fn default() -> Self {
        Self::new()
    }
}
