//! Outer outlines of mask regions and the geometry the locator needs from them.

use glam::{DVec2, Vec2};
use image::GrayImage;
use imageproc::contours::{find_contours, BorderType};
use imageproc::point::Point;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

const ENCLOSING_SEED: u64 = 0x5eed_c1c1e;

/// Outer border of one top-level region, in tracing order.
#[derive(Debug, Clone, PartialEq)]
pub struct Outline {
    pub points: Vec<Point<i32>>,
}

/// Spatial moments of a closed polygon, up to first order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Moments {
    pub m00: f64,
    pub m10: f64,
    pub m01: f64,
}

/// Outer borders of every region of non-zero pixels that is not nested in
/// another region's hole, in raster order of their first pixel.
pub fn external_outlines(mask: &GrayImage) -> Vec<Outline> {
    find_contours::<i32>(mask)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .map(|c| Outline { points: c.points })
        .collect()
}

impl Outline {
    fn dpoints(&self) -> impl Iterator<Item = DVec2> + '_ {
        self.points.iter().map(|p| DVec2::new(p.x as f64, p.y as f64))
    }

    /// Polygon moments by Green's theorem, sign-normalised so `m00 >= 0`.
    pub fn moments(&self) -> Moments {
        let pts: Vec<DVec2> = self.dpoints().collect();
        if pts.len() < 3 {
            return Moments { m00: 0.0, m10: 0.0, m01: 0.0 };
        }
        let (mut a00, mut a10, mut a01) = (0.0f64, 0.0f64, 0.0f64);
        let mut prev = pts[pts.len() - 1];
        for &cur in &pts {
            let cross = prev.perp_dot(cur);
            a00 += cross;
            a10 += cross * (prev.x + cur.x);
            a01 += cross * (prev.y + cur.y);
            prev = cur;
        }
        let sign = if a00 < 0.0 { -1.0 } else { 1.0 };
        Moments {
            m00: sign * a00 / 2.0,
            m10: sign * a10 / 6.0,
            m01: sign * a01 / 6.0,
        }
    }

    /// Enclosed polygon area. Zero for outlines of one-pixel-wide shapes.
    pub fn area(&self) -> f64 {
        self.moments().m00
    }

    /// Area centroid, `None` when the outline encloses no area.
    pub fn centroid(&self) -> Option<Vec2> {
        let m = self.moments();
        (m.m00 != 0.0).then(|| Vec2::new((m.m10 / m.m00) as f32, (m.m01 / m.m00) as f32))
    }

    /// Smallest circle containing every outline point.
    pub fn enclosing_circle(&self) -> (Vec2, f32) {
        min_enclosing_circle(&self.dpoints().collect::<Vec<_>>())
    }
}

#[derive(Clone, Copy)]
struct Circle {
    center: DVec2,
    radius: f64,
}

impl Circle {
    fn contains(&self, p: DVec2) -> bool {
        p.distance(self.center) <= self.radius * (1.0 + 1e-9) + 1e-9
    }

    fn from_two(a: DVec2, b: DVec2) -> Self {
        let center = (a + b) * 0.5;
        Self {
            center,
            radius: center.distance(a),
        }
    }

    fn from_three(a: DVec2, b: DVec2, c: DVec2) -> Self {
        let ab = b - a;
        let ac = c - a;
        let d = 2.0 * ab.perp_dot(ac);
        if d.abs() < 1e-12 {
            // Collinear: the two farthest points span the circle.
            return [Self::from_two(a, b), Self::from_two(a, c), Self::from_two(b, c)]
                .into_iter()
                .fold(Self::from_two(a, b), |best, c| if c.radius > best.radius { c } else { best });
        }
        let ab2 = ab.length_squared();
        let ac2 = ac.length_squared();
        let offset = DVec2::new(ac.y * ab2 - ab.y * ac2, ab.x * ac2 - ac.x * ab2) / d;
        Self {
            center: a + offset,
            radius: offset.length(),
        }
    }
}

/// Welzl's randomised incremental algorithm, shuffled with a fixed seed so
/// the result is reproducible. `(ZERO, 0)` for no points.
pub fn min_enclosing_circle(points: &[DVec2]) -> (Vec2, f32) {
    if points.is_empty() {
        return (Vec2::ZERO, 0.0);
    }
    let mut pts = points.to_vec();
    pts.shuffle(&mut StdRng::seed_from_u64(ENCLOSING_SEED));

    let mut circle = Circle { center: pts[0], radius: 0.0 };
    for i in 1..pts.len() {
        if circle.contains(pts[i]) {
            continue;
        }
        circle = Circle { center: pts[i], radius: 0.0 };
        for j in 0..i {
            if circle.contains(pts[j]) {
                continue;
            }
            circle = Circle::from_two(pts[i], pts[j]);
            for k in 0..j {
                if !circle.contains(pts[k]) {
                    circle = Circle::from_three(pts[i], pts[j], pts[k]);
                }
            }
        }
    }
    (circle.center.as_vec2(), circle.radius as f32)
}
