use glam::Vec2;
use image::{GrayImage, RgbImage};

use crate::components::color_range::ColorRange;
use crate::vision::mask;
use crate::vision::shape::external_outlines;

/// One accepted sighting of a ball in a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    /// Area centroid of the largest matching region.
    pub position: Vec2,
    /// Radius of the region's minimal enclosing circle.
    pub radius: f32,
    /// Enclosed area of the region's outline.
    pub area: f64,
}

/// Colour-window ball finder.
#[derive(Debug, Clone, Copy)]
pub struct Locator {
    pub min_radius: f32,
    pub kernel_size: u32,
}

impl Locator {
    pub fn new(min_radius: f32, kernel_size: u32) -> Self {
        Self {
            min_radius,
            kernel_size,
        }
    }

    /// Find the ball selected by `range` in `frame`.
    ///
    /// Returns `None` when nothing matches or the best region's enclosing
    /// radius does not exceed `min_radius`.
    pub fn locate(&self, frame: &RgbImage, range: &ColorRange) -> Option<Detection> {
        let (_, mask) = self.preview(frame, range);
        self.locate_in_mask(&mask)
    }

    /// Pick the largest region of an already cleaned mask.
    pub fn locate_in_mask(&self, mask: &GrayImage) -> Option<Detection> {
        let outlines = external_outlines(mask);

        let mut best = None;
        let mut best_area = f64::NEG_INFINITY;
        for outline in &outlines {
            let area = outline.area();
            if area > best_area {
                best_area = area;
                best = Some(outline);
            }
        }
        let outline = best?;

        let (center, radius) = outline.enclosing_circle();
        if radius <= self.min_radius {
            return None;
        }
        Some(Detection {
            position: outline.centroid().unwrap_or(center),
            radius,
            area: best_area,
        })
    }

    /// The raw threshold mask and the cleaned (opened, then closed) mask.
    pub fn preview(&self, frame: &RgbImage, range: &ColorRange) -> (GrayImage, GrayImage) {
        let raw = mask::threshold(frame, range);
        let cleaned = mask::clean(&raw, self.kernel_size);
        (raw, cleaned)
    }
}

impl Default for Locator {
    fn default() -> Self {
        Self::new(10.0, 5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    const BLUE: Rgb<u8> = Rgb([0, 0, 255]);
    const FELT: Rgb<u8> = Rgb([128, 128, 128]);

    fn blue_range() -> ColorRange {
        ColorRange::new((110, 130), (150, 255), (150, 255))
    }

    fn disc(frame: &mut RgbImage, center: Vec2, radius: f32, color: Rgb<u8>) {
        for (x, y, px) in frame.enumerate_pixels_mut() {
            if Vec2::new(x as f32, y as f32).distance(center) <= radius {
                *px = color;
            }
        }
    }

    #[test]
    fn finds_single_disc() {
        let mut frame = RgbImage::from_pixel(200, 150, FELT);
        let center = Vec2::new(80.0, 60.0);
        disc(&mut frame, center, 20.0, BLUE);

        let det = Locator::default().locate(&frame, &blue_range()).expect("disc should be found");
        assert!(det.position.distance(center) <= 2.0, "position {:?}", det.position);
        assert!((det.radius - 20.0).abs() <= 2.0, "radius {}", det.radius);
        assert!(det.area > 1000.0);
    }

    #[test]
    fn empty_frame_yields_nothing() {
        let frame = RgbImage::from_pixel(100, 100, FELT);
        assert_eq!(Locator::default().locate(&frame, &blue_range()), None);
    }

    #[test]
    fn small_disc_is_rejected() {
        let mut frame = RgbImage::from_pixel(100, 100, FELT);
        disc(&mut frame, Vec2::new(50.0, 50.0), 8.0, BLUE);
        assert_eq!(Locator::default().locate(&frame, &blue_range()), None);
    }

    #[test]
    fn largest_region_wins() {
        let mut frame = RgbImage::from_pixel(300, 150, FELT);
        disc(&mut frame, Vec2::new(50.0, 50.0), 15.0, BLUE);
        disc(&mut frame, Vec2::new(200.0, 80.0), 30.0, BLUE);

        let det = Locator::default().locate(&frame, &blue_range()).unwrap();
        assert!(det.position.distance(Vec2::new(200.0, 80.0)) <= 2.0);
    }

    #[test]
    fn speckle_noise_is_ignored() {
        let mut frame = RgbImage::from_pixel(120, 120, FELT);
        for i in 0..10 {
            frame.put_pixel(5 + i * 11, 100, BLUE);
        }
        assert_eq!(Locator::default().locate(&frame, &blue_range()), None);
    }

    #[test]
    fn other_colours_do_not_match() {
        let mut frame = RgbImage::from_pixel(100, 100, FELT);
        disc(&mut frame, Vec2::new(50.0, 50.0), 20.0, Rgb([255, 0, 0]));
        assert_eq!(Locator::default().locate(&frame, &blue_range()), None);
    }

    #[test]
    fn preview_returns_raw_and_cleaned_masks() {
        let mut frame = RgbImage::from_pixel(60, 60, FELT);
        frame.put_pixel(3, 3, BLUE);
        let (raw, cleaned) = Locator::default().preview(&frame, &blue_range());
        assert_eq!(raw.get_pixel(3, 3).0[0], 255);
        assert_eq!(cleaned.get_pixel(3, 3).0[0], 0);
        assert_eq!(raw.dimensions(), (60, 60));
    }
}
