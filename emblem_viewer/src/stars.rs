//! Static starfield behind the emblem.

use rand::Rng;
use std::f32::consts::TAU;

pub const STAR_COUNT: usize = 2000;
pub const STAR_RADIUS: f32 = 100.0;
pub const STAR_DEPTH: f32 = 50.0;

/// `count` points scattered over spherical shells between `radius` and
/// `radius + depth`, flat `[x, y, z, ...]`. Shells shrink toward `radius` as
/// the index grows.
pub fn starfield<R: Rng + ?Sized>(count: usize, radius: f32, depth: f32, rng: &mut R) -> Vec<f32> {
    let mut coords = Vec::with_capacity(count * 3);
    let mut shell = radius + depth;
    let step = if count == 0 { 0.0 } else { depth / count as f32 };
    for _ in 0..count {
        shell -= step * rng.gen_range(0.0f32..1.0);
        let polar = (1.0 - rng.gen_range(0.0f32..2.0)).acos();
        let azimuth = rng.gen_range(0.0f32..TAU);
        let ring = shell * polar.sin();
        coords.extend_from_slice(&[
            ring * azimuth.sin(),
            shell * polar.cos(),
            ring * azimuth.cos(),
        ]);
    }
    coords
}
