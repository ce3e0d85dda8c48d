//! Procedural stand-ins for the emblem glyphs.
//!
//! Used when no font is loaded or the loaded font has no outline for an
//! emblem's symbol. Shapes are described as inside-tests in a local square
//! `[-1, 1]²` (y up) and painted with 4×4 supersampling so edges carry the
//! same kind of partial coverage a font rasterizer would produce.

use glam::Vec2;

use crate::raster::Raster;
use crate::shape::ShapeId;

const SUPERSAMPLE: u32 = 4;
/// Fraction of the raster the emblem spans.
const EMBLEM_SPAN: f32 = 0.8;
/// Downward nudge of the emblem center, as a fraction of the raster side.
const EMBLEM_DROP: f32 = 0.05;

/// Whether `shape` has a built-in silhouette.
pub fn has_silhouette(shape: ShapeId) -> bool {
    !matches!(shape, ShapeId::Text)
}

/// Paint the built-in silhouette for `shape` in white. Returns false when the
/// shape has none.
pub fn paint(shape: ShapeId, raster: &mut Raster) -> bool {
    if !has_silhouette(shape) {
        return false;
    }
    let side = raster.side();
    let inv_side = 1.0 / side as f32;
    let step = 1.0 / SUPERSAMPLE as f32;
    let samples = (SUPERSAMPLE * SUPERSAMPLE) as f32;

    for y in 0..side {
        for x in 0..side {
            let mut hits = 0u32;
            for sy in 0..SUPERSAMPLE {
                for sx in 0..SUPERSAMPLE {
                    let px = (x as f32 + (sx as f32 + 0.5) * step) * inv_side;
                    let py = (y as f32 + (sy as f32 + 0.5) * step) * inv_side;
                    let u = px * 2.0 - 1.0;
                    let v = 1.0 - py * 2.0;
                    let local = Vec2::new(u, v + EMBLEM_DROP * 2.0) / EMBLEM_SPAN;
                    if contains(shape, local) {
                        hits += 1;
                    }
                }
            }
            if hits > 0 {
                let coverage = (hits as f32 / samples * 255.0).round() as u8;
                raster.blend_white(x, y, coverage);
            }
        }
    }
    true
}

fn contains(shape: ShapeId, p: Vec2) -> bool {
    match shape {
        ShapeId::Tree => tree(p),
        ShapeId::Santa => santa(p),
        ShapeId::Heart => heart(p),
        ShapeId::Flower => flower(p),
        ShapeId::Saturn => saturn(p),
        ShapeId::ThumbsUp => thumbs_up(p),
        ShapeId::Text => false,
    }
}

fn heart(p: Vec2) -> bool {
    // (x² + y² − 1)³ − x²y³ ≤ 0, scaled to fill the local square.
    let x = p.x * 1.15;
    let y = p.y * 1.15 + 0.1;
    let a = x * x + y * y - 1.0;
    a * a * a - x * x * y * y * y <= 0.0
}

fn tree(p: Vec2) -> bool {
    const TIERS: [(f32, f32, f32); 3] = [(0.95, 0.25, 0.45), (0.55, -0.2, 0.65), (0.15, -0.7, 0.85)];
    let trunk = p.x.abs() <= 0.12 && p.y >= -1.0 && p.y <= -0.7;
    trunk
        || TIERS.iter().any(|&(apex, base, half_width)| {
            p.y >= base && p.y <= apex && p.x.abs() <= half_width * (apex - p.y) / (apex - base)
        })
}

fn flower(p: Vec2) -> bool {
    let r = p.length();
    let theta = p.y.atan2(p.x);
    let petal = 0.45 + 0.5 * (2.5 * theta).cos().abs();
    r <= petal
}

fn saturn(p: Vec2) -> bool {
    if p.length() <= 0.5 {
        return true;
    }
    let (sin, cos) = (-0.35f32).sin_cos();
    let q = Vec2::new(p.x * cos - p.y * sin, p.x * sin + p.y * cos);
    ellipse(q, Vec2::ZERO, Vec2::new(0.98, 0.32)) && !ellipse(q, Vec2::ZERO, Vec2::new(0.7, 0.2))
}

fn santa(p: Vec2) -> bool {
    let hat = triangle(p, Vec2::new(-0.55, 0.35), Vec2::new(0.45, 0.35), Vec2::new(0.35, 0.95));
    let brim = rect(p, Vec2::new(-0.6, 0.2), Vec2::new(0.6, 0.38));
    let pom = circle(p, Vec2::new(0.42, 0.9), 0.12);
    let face = circle(p, Vec2::new(0.0, -0.05), 0.45);
    let beard = p.y <= -0.1 && ellipse(p, Vec2::new(0.0, -0.45), Vec2::new(0.55, 0.5));
    hat || brim || pom || face || beard
}

fn thumbs_up(p: Vec2) -> bool {
    let fist = rounded_rect(p, Vec2::new(-0.55, -0.85), Vec2::new(0.45, 0.05), 0.15);
    let thumb = capsule(p, Vec2::new(-0.25, 0.0), Vec2::new(-0.05, 0.8), 0.17);
    let cuff = rect(p, Vec2::new(-0.85, -0.85), Vec2::new(-0.62, 0.0));
    fist || thumb || cuff
}

fn circle(p: Vec2, center: Vec2, radius: f32) -> bool {
    p.distance_squared(center) <= radius * radius
}

fn ellipse(p: Vec2, center: Vec2, radii: Vec2) -> bool {
    let d = (p - center) / radii;
    d.length_squared() <= 1.0
}

fn rect(p: Vec2, min: Vec2, max: Vec2) -> bool {
    p.cmpge(min).all() && p.cmple(max).all()
}

fn rounded_rect(p: Vec2, min: Vec2, max: Vec2, radius: f32) -> bool {
    let center = (min + max) * 0.5;
    let half = (max - min) * 0.5 - Vec2::splat(radius);
    let q = (p - center).abs() - half;
    q.max(Vec2::ZERO).length() + q.x.max(q.y).min(0.0) <= radius
}

fn capsule(p: Vec2, a: Vec2, b: Vec2, radius: f32) -> bool {
    let ab = b - a;
    let t = ((p - a).dot(ab) / ab.length_squared()).clamp(0.0, 1.0);
    p.distance_squared(a + ab * t) <= radius * radius
}

fn triangle(p: Vec2, a: Vec2, b: Vec2, c: Vec2) -> bool {
    let edge = |from: Vec2, to: Vec2| (to - from).perp_dot(p - from);
    let (e0, e1, e2) = (edge(a, b), edge(b, c), edge(c, a));
    (e0 >= 0.0 && e1 >= 0.0 && e2 >= 0.0) || (e0 <= 0.0 && e1 <= 0.0 && e2 <= 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heart_contains_lobes_but_not_the_notch() {
        assert!(heart(Vec2::new(-0.45, 0.4)));
        assert!(heart(Vec2::new(0.45, 0.4)));
        assert!(heart(Vec2::new(0.0, -0.5)));
        assert!(!heart(Vec2::new(0.0, 0.85)));
        assert!(!heart(Vec2::new(0.9, -0.9)));
    }

    #[test]
    fn saturn_ring_leaves_a_gap_outside_the_planet() {
        assert!(saturn(Vec2::ZERO));
        assert!(!saturn(Vec2::new(0.0, 0.9)));
    }

    #[test]
    fn every_emblem_paints_something_except_text() {
        for shape in ShapeId::ALL {
            let mut raster = Raster::new(64);
            let painted = paint(shape, &mut raster);
            let lit = raster.lit_mask().lit_count();
            if shape == ShapeId::Text {
                assert!(!painted);
                assert_eq!(lit, 0);
            } else {
                assert!(painted);
                assert!(lit > 64, "{shape} lit only {lit} pixels");
            }
        }
    }
}
