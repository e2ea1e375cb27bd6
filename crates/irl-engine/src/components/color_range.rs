use serde::{Deserialize, Serialize};

use crate::error::{IrlError, Result};

/// Largest hue value on the 0..180 hue scale.
pub const HUE_MAX: u8 = 179;
/// Largest saturation / value.
pub const SV_MAX: u8 = 255;

/// Inclusive HSV window used to segment one ball.
///
/// Hue is on the half-degree scale (0..=179); saturation and value span
/// 0..=255. A window with `min > max` on any channel selects nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorRange {
    pub h_min: u8,
    pub h_max: u8,
    pub s_min: u8,
    pub s_max: u8,
    pub v_min: u8,
    pub v_max: u8,
}

impl ColorRange {
    pub fn new(h: (u8, u8), s: (u8, u8), v: (u8, u8)) -> Self {
        Self {
            h_min: h.0,
            h_max: h.1,
            s_min: s.0,
            s_max: s.1,
            v_min: v.0,
            v_max: v.1,
        }
    }

    /// The window that selects every pixel.
    pub fn full() -> Self {
        Self::new((0, HUE_MAX), (0, SV_MAX), (0, SV_MAX))
    }

    #[inline]
    pub fn contains(&self, h: u8, s: u8, v: u8) -> bool {
        (self.h_min..=self.h_max).contains(&h)
            && (self.s_min..=self.s_max).contains(&s)
            && (self.v_min..=self.v_max).contains(&v)
    }

    /// Check the hue bounds. Saturation and value fit in `u8` by construction.
    pub fn validate(&self, ball: &str) -> Result<()> {
        for (label, value) in [("hMin", self.h_min), ("hMax", self.h_max)] {
            if value > HUE_MAX {
                return Err(IrlError::InvalidColorRange {
                    ball: ball.to_string(),
                    reason: format!("{} = {} exceeds {}", label, value, HUE_MAX),
                });
            }
        }
        Ok(())
    }

    /// Build from the six raw bounds in file order, rejecting values out of range.
    pub fn from_bounds(ball: &str, bounds: [i64; 6]) -> Result<Self> {
        const LABELS: [&str; 6] = ["hMin", "hMax", "sMin", "sMax", "vMin", "vMax"];
        let mut out = [0u8; 6];
        for (i, &value) in bounds.iter().enumerate() {
            let limit = if i < 2 { HUE_MAX } else { SV_MAX } as i64;
            if !(0..=limit).contains(&value) {
                return Err(IrlError::InvalidColorRange {
                    ball: ball.to_string(),
                    reason: format!("{} = {} outside 0..={}", LABELS[i], value, limit),
                });
            }
            out[i] = value as u8;
        }
        Ok(Self::new((out[0], out[1]), (out[2], out[3]), (out[4], out[5])))
    }

    pub fn bounds(&self) -> [u8; 6] {
        [self.h_min, self.h_max, self.s_min, self.s_max, self.v_min, self.v_max]
    }
}

impl Default for ColorRange {
    fn default() -> Self {
        Self::full()
    }
}
