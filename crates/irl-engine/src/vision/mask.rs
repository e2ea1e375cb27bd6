//! Colour thresholding and mask cleanup.

use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::distance_transform::Norm;
use imageproc::map::map_colors;
use imageproc::morphology;

use crate::components::color_range::ColorRange;

/// Mask value for a selected pixel.
pub const MASK_ON: u8 = 255;

/// Convert one RGB pixel to 8-bit HSV with hue on the 0..180 scale.
pub fn rgb_to_hsv(rgb: [u8; 3]) -> [u8; 3] {
    let r = rgb[0] as f32;
    let g = rgb[1] as f32;
    let b = rgb[2] as f32;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let s = if max == 0.0 { 0.0 } else { delta * 255.0 / max };
    let mut h_deg = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * (g - b) / delta
    } else if max == g {
        60.0 * (b - r) / delta + 120.0
    } else {
        60.0 * (r - g) / delta + 240.0
    };
    if h_deg < 0.0 {
        h_deg += 360.0;
    }

    // 360 degrees rounds to hue 180, which wraps to 0.
    let h = (h_deg / 2.0).round() as u32 % 180;
    [h as u8, s.round() as u8, max as u8]
}

/// Select every pixel whose HSV value lies inside `range` (bounds inclusive).
pub fn threshold(frame: &RgbImage, range: &ColorRange) -> GrayImage {
    map_colors(frame, |px: Rgb<u8>| {
        let [h, s, v] = rgb_to_hsv(px.0);
        Luma([if range.contains(h, s, v) { MASK_ON } else { 0 }])
    })
}

/// Opening followed by closing with a square `kernel_size` × `kernel_size`
/// element. Opening drops specks, closing fills pinholes.
pub fn clean(mask: &GrayImage, kernel_size: u32) -> GrayImage {
    let k = (kernel_size / 2).min(u8::MAX as u32) as u8;
    if k == 0 {
        return mask.clone();
    }
    let opened = morphology::open(mask, Norm::LInf, k);
    morphology::close(&opened, Norm::LInf, k)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn on_pixels(mask: &GrayImage) -> Vec<(u32, u32)> {
        mask.enumerate_pixels()
            .filter(|(_, _, p)| p.0[0] == MASK_ON)
            .map(|(x, y, _)| (x, y))
            .collect()
    }

    #[test]
    fn primaries() {
        assert_eq!(rgb_to_hsv([255, 0, 0]), [0, 255, 255]);
        assert_eq!(rgb_to_hsv([0, 255, 0]), [60, 255, 255]);
        assert_eq!(rgb_to_hsv([0, 0, 255]), [120, 255, 255]);
        assert_eq!(rgb_to_hsv([255, 255, 0]), [30, 255, 255]);
    }

    #[test]
    fn greys_have_no_hue_or_saturation() {
        assert_eq!(rgb_to_hsv([0, 0, 0]), [0, 0, 0]);
        assert_eq!(rgb_to_hsv([128, 128, 128]), [0, 0, 128]);
        assert_eq!(rgb_to_hsv([255, 255, 255]), [0, 0, 255]);
    }

    #[test]
    fn hue_stays_below_180() {
        let [h, _, _] = rgb_to_hsv([255, 0, 1]);
        assert!(h < 180);
    }

    #[test]
    fn threshold_marks_only_matching_pixels() {
        let mut frame = RgbImage::from_pixel(4, 4, Rgb([128, 128, 128]));
        frame.put_pixel(1, 2, Rgb([0, 0, 255]));
        let blue = ColorRange::new((110, 130), (100, 255), (100, 255));
        assert_eq!(on_pixels(&threshold(&frame, &blue)), vec![(1, 2)]);
    }

    #[test]
    fn clean_removes_specks() {
        let mut mask = GrayImage::new(30, 30);
        mask.put_pixel(4, 4, Luma([MASK_ON]));
        mask.put_pixel(5, 4, Luma([MASK_ON]));
        assert!(on_pixels(&clean(&mask, 5)).is_empty());
    }

    #[test]
    fn clean_fills_pinholes_and_keeps_blocks() {
        let mut mask = GrayImage::new(40, 40);
        for y in 10..30 {
            for x in 10..30 {
                mask.put_pixel(x, y, Luma([MASK_ON]));
            }
        }
        mask.put_pixel(20, 20, Luma([0]));

        let cleaned = clean(&mask, 5);
        assert_eq!(cleaned.get_pixel(20, 20).0[0], MASK_ON);
        assert_eq!(cleaned.get_pixel(15, 25).0[0], MASK_ON);
        assert_eq!(cleaned.get_pixel(5, 5).0[0], 0);
        assert_eq!(on_pixels(&cleaned).len(), 400);
    }

    #[test]
    fn unit_kernel_is_identity() {
        let mut mask = GrayImage::new(5, 5);
        mask.put_pixel(2, 2, Luma([MASK_ON]));
        assert_eq!(clean(&mask, 1), mask);
    }
}
