//! Annotation overlays: outlines, correction cues and target discs.
//!
//! The turn controller records overlay commands each tick; `compose` rasterises
//! them onto a copy of the frame.

use glam::Vec2;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_circle_mut, draw_polygon_mut};
use imageproc::map::map_colors2;
use imageproc::point::Point;

/// Line thickness for ball outlines.
pub const OUTLINE_THICKNESS: f32 = 2.0;
/// Line thickness for detected-to-target correction lines.
pub const CORRECTION_THICKNESS: f32 = 8.0;
/// Colour of correction lines.
pub const CORRECTION_COLOR: [u8; 3] = [0, 0, 0];
/// Weight of the target-disc layer when added onto the frame.
pub const TARGET_ALPHA: f32 = 0.25;

/// One drawing command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Overlay {
    /// Circle outline at a ball's detected or simulated position.
    Outline {
        center: Vec2,
        radius: f32,
        color: [u8; 3],
        thickness: f32,
    },
    /// Segment from where a ball is to where it should be.
    CorrectionLine {
        from: Vec2,
        to: Vec2,
        color: [u8; 3],
        thickness: f32,
    },
    /// Filled disc marking a target position, blended translucently.
    TargetDisc {
        center: Vec2,
        radius: f32,
        color: [u8; 3],
    },
}

impl Overlay {
    pub fn outline(center: Vec2, radius: f32, color: [u8; 3]) -> Self {
        Overlay::Outline {
            center,
            radius,
            color,
            thickness: OUTLINE_THICKNESS,
        }
    }

    pub fn correction(from: Vec2, to: Vec2) -> Self {
        Overlay::CorrectionLine {
            from,
            to,
            color: CORRECTION_COLOR,
            thickness: CORRECTION_THICKNESS,
        }
    }

    pub fn target(center: Vec2, radius: f32, color: [u8; 3]) -> Self {
        Overlay::TargetDisc {
            center,
            radius,
            color,
        }
    }
}

fn pixel(p: Vec2) -> (i32, i32) {
    (p.x.round() as i32, p.y.round() as i32)
}

/// Ring of `thickness` one-pixel circles centred on `radius`.
fn draw_ring(img: &mut RgbImage, center: Vec2, radius: f32, thickness: f32, color: Rgb<u8>) {
    let rings = thickness.round().max(1.0) as i32;
    let inner = radius.round() as i32 - rings / 2;
    for r in (inner..inner + rings).filter(|&r| r >= 0) {
        draw_hollow_circle_mut(img, pixel(center), r, color);
    }
}

/// Segment with round caps, `thickness` wide.
fn draw_thick_line(img: &mut RgbImage, from: Vec2, to: Vec2, thickness: f32, color: Rgb<u8>) {
    let half = thickness / 2.0;
    let cap = half.round() as i32;
    draw_filled_circle_mut(img, pixel(from), cap, color);
    draw_filled_circle_mut(img, pixel(to), cap, color);

    let Some(dir) = (to - from).try_normalize() else {
        return;
    };
    let n = dir.perp() * half;
    let corner = |p: Vec2| {
        let (x, y) = pixel(p);
        Point::new(x, y)
    };
    let quad = [corner(from + n), corner(to + n), corner(to - n), corner(from - n)];
    if quad[0] != quad[3] {
        draw_polygon_mut(img, &quad, color);
    }
}

/// Draw `overlays` onto a copy of `frame`.
///
/// Outlines and lines are painted opaquely in command order. Target discs are
/// collected into one layer that is added once at `TARGET_ALPHA`, saturating.
pub fn compose(frame: &RgbImage, overlays: &[Overlay]) -> RgbImage {
    let mut out = frame.clone();
    let mut layer: Option<RgbImage> = None;

    for overlay in overlays {
        match *overlay {
            Overlay::Outline {
                center,
                radius,
                color,
                thickness,
            } => draw_ring(&mut out, center, radius, thickness, Rgb(color)),
            Overlay::CorrectionLine {
                from,
                to,
                color,
                thickness,
            } => draw_thick_line(&mut out, from, to, thickness, Rgb(color)),
            Overlay::TargetDisc {
                center,
                radius,
                color,
            } => {
                let layer = layer.get_or_insert_with(|| RgbImage::new(frame.width(), frame.height()));
                draw_filled_circle_mut(layer, pixel(center), radius.round() as i32, Rgb(color));
            }
        }
    }

    match layer {
        Some(layer) => add_weighted(&out, &layer, TARGET_ALPHA),
        None => out,
    }
}

/// `base + weight * layer`, per channel, rounded and saturating at 255.
pub fn add_weighted(base: &RgbImage, layer: &RgbImage, weight: f32) -> RgbImage {
    map_colors2(base, layer, |b: Rgb<u8>, l: Rgb<u8>| {
        Rgb(std::array::from_fn(|c| {
            (b.0[c] as f32 + weight * l.0[c] as f32).round().clamp(0.0, 255.0) as u8
        }))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grey(w: u32, h: u32) -> RgbImage {
        RgbImage::from_pixel(w, h, Rgb([100, 100, 100]))
    }

    #[test]
    fn no_overlays_returns_frame_unchanged() {
        let frame = grey(20, 20);
        assert_eq!(compose(&frame, &[]), frame);
    }

    #[test]
    fn outline_draws_ring_only() {
        let frame = grey(100, 100);
        let out = compose(&frame, &[Overlay::outline(Vec2::new(50.0, 50.0), 20.0, [255, 0, 0])]);
        assert_eq!(out.get_pixel(70, 50).0, [255, 0, 0], "On the ring");
        assert_eq!(out.get_pixel(50, 50).0, [100, 100, 100], "Centre untouched");
        assert_eq!(out.get_pixel(90, 50).0, [100, 100, 100], "Outside untouched");
    }

    #[test]
    fn correction_line_is_black_and_thick() {
        let frame = grey(100, 100);
        let out = compose(
            &frame,
            &[Overlay::correction(Vec2::new(10.0, 50.0), Vec2::new(90.0, 50.0))],
        );
        assert_eq!(out.get_pixel(50, 50).0, [0, 0, 0]);
        assert_eq!(out.get_pixel(50, 54).0, [0, 0, 0], "Within half thickness");
        assert_eq!(out.get_pixel(50, 56).0, [100, 100, 100]);
        assert_eq!(out.get_pixel(5, 50).0, [100, 100, 100], "Beyond the end cap");
    }

    #[test]
    fn target_disc_is_added_at_quarter_weight() {
        let frame = grey(60, 60);
        let out = compose(&frame, &[Overlay::target(Vec2::new(30.0, 30.0), 10.0, [200, 0, 40])]);
        assert_eq!(out.get_pixel(30, 30).0, [150, 100, 110]);
        assert_eq!(out.get_pixel(5, 5).0, [100, 100, 100]);
    }

    #[test]
    fn overlapping_discs_composite_once() {
        let frame = grey(60, 60);
        let disc = Overlay::target(Vec2::new(30.0, 30.0), 10.0, [200, 200, 200]);
        let out = compose(&frame, &[disc, disc]);
        assert_eq!(out.get_pixel(30, 30).0, [150, 150, 150]);
    }

    #[test]
    fn addition_saturates() {
        let base = RgbImage::from_pixel(1, 1, Rgb([250, 0, 255]));
        let layer = RgbImage::from_pixel(1, 1, Rgb([255, 255, 255]));
        let out = add_weighted(&base, &layer, 0.25);
        assert_eq!(out.get_pixel(0, 0).0, [255, 64, 255]);
    }

    #[test]
    fn shapes_outside_frame_are_clipped() {
        let frame = grey(10, 10);
        let out = compose(
            &frame,
            &[
                Overlay::outline(Vec2::new(-50.0, -50.0), 5.0, [255, 255, 255]),
                Overlay::target(Vec2::new(200.0, 5.0), 8.0, [255, 255, 255]),
            ],
        );
        assert_eq!(out, frame);
    }
}
