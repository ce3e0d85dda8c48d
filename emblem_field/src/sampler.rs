//! Point cloud sampling: lit pixels in, a fixed-size 3D target set out.

use std::f32::consts::PI;

use rand::Rng;

use crate::config::FieldConfig;
use crate::raster::PixelMask;

/// Exactly N target points stored as a flat `[x0, y0, z0, x1, ...]` buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetPointSet {
    coords: Vec<f32>,
}

impl TargetPointSet {
    /// All points at the origin.
    pub fn zeroed(count: usize) -> Self {
        Self {
            coords: vec![0.0; count * 3],
        }
    }

    /// Number of points (not floats).
    pub fn len(&self) -> usize {
        self.coords.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    pub fn point(&self, index: usize) -> [f32; 3] {
        let i3 = index * 3;
        [self.coords[i3], self.coords[i3 + 1], self.coords[i3 + 2]]
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.coords
    }

    pub fn points(&self) -> impl Iterator<Item = [f32; 3]> + '_ {
        self.coords.chunks_exact(3).map(|c| [c[0], c[1], c[2]])
    }

    pub fn is_finite(&self) -> bool {
        self.coords.iter().all(|c| c.is_finite())
    }
}

/// Mapping from raster space into world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleSettings {
    pub world_extent: f32,
    pub depth_jitter: f32,
    pub fallback_radius: f32,
}

impl Default for SampleSettings {
    fn default() -> Self {
        Self::from(&FieldConfig::default())
    }
}

impl From<&FieldConfig> for SampleSettings {
    fn from(config: &FieldConfig) -> Self {
        Self {
            world_extent: config.world_extent,
            depth_jitter: config.depth_jitter,
            fallback_radius: config.fallback_radius,
        }
    }
}

/// Draw `count` points from the lit pixels of `mask`, uniformly and with
/// replacement. An empty mask yields [`fallback_sphere`].
pub fn sample<R: Rng + ?Sized>(
    mask: &PixelMask,
    count: usize,
    settings: &SampleSettings,
    rng: &mut R,
) -> TargetPointSet {
    let lit: Vec<(u32, u32)> = mask.lit_pixels().collect();
    if lit.is_empty() {
        log::debug!("[sampler] mask has no lit pixels; using sphere fallback");
        return fallback_sphere(count, settings.fallback_radius);
    }

    let side = mask.side() as f32;
    let jitter = settings.depth_jitter;
    let mut coords = Vec::with_capacity(count * 3);
    for _ in 0..count {
        let (x, y) = lit[rng.gen_range(0..lit.len())];
        let z = if jitter > 0.0 {
            rng.gen_range(-jitter..=jitter)
        } else {
            0.0
        };
        coords.push((x as f32 / side - 0.5) * settings.world_extent);
        coords.push(-(y as f32 / side - 0.5) * settings.world_extent);
        coords.push(z);
    }
    TargetPointSet { coords }
}

/// `count` points spread over a sphere of `radius` by the golden-spiral
/// parameterization `phi = acos(-1 + 2i/N)`, `theta = sqrt(N·π)·phi`.
pub fn fallback_sphere(count: usize, radius: f32) -> TargetPointSet {
    let n = count as f32;
    let mut coords = Vec::with_capacity(count * 3);
    for i in 0..count {
        let phi = (-1.0 + 2.0 * i as f32 / n).clamp(-1.0, 1.0).acos();
        let theta = (n * PI).sqrt() * phi;
        coords.push(radius * theta.cos() * phi.sin());
        coords.push(radius * theta.sin() * phi.sin());
        coords.push(radius * phi.cos());
    }
    TargetPointSet { coords }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn sampling_returns_exactly_n_points_from_few_pixels() {
        let mask = PixelMask::from_fn(16, |x, y| x == 4 && y == 4);
        let mut rng = StdRng::seed_from_u64(7);
        let set = sample(&mask, 500, &SampleSettings::default(), &mut rng);
        assert_eq!(set.len(), 500);
        for [x, y, z] in set.points() {
            assert_eq!(x, (4.0 / 16.0 - 0.5) * 10.0);
            assert_eq!(y, -(4.0 / 16.0 - 0.5) * 10.0);
            assert!((-1.0..=1.0).contains(&z));
        }
    }

    #[test]
    fn raster_rows_map_to_world_y_upward() {
        let top = PixelMask::from_fn(10, |_, y| y == 0);
        let bottom = PixelMask::from_fn(10, |_, y| y == 9);
        let mut rng = StdRng::seed_from_u64(1);
        let settings = SampleSettings::default();
        let top_y = sample(&top, 1, &settings, &mut rng).point(0)[1];
        let bottom_y = sample(&bottom, 1, &settings, &mut rng).point(0)[1];
        assert_eq!(top_y, 5.0);
        assert!(bottom_y < top_y);
    }

    #[test]
    fn empty_mask_falls_back_to_identical_spheres() {
        let mask = PixelMask::empty(32);
        let settings = SampleSettings::default();
        let a = sample(&mask, 300, &settings, &mut StdRng::seed_from_u64(1));
        let b = sample(&mask, 300, &settings, &mut StdRng::seed_from_u64(99));
        assert_eq!(a, b);
        assert_eq!(a, fallback_sphere(300, 2.0));
    }

    #[test]
    fn fallback_points_lie_on_the_sphere() {
        let set = fallback_sphere(1000, 2.0);
        assert_eq!(set.len(), 1000);
        for [x, y, z] in set.points() {
            let r = (x * x + y * y + z * z).sqrt();
            assert!((r - 2.0).abs() < 1e-4, "radius {r}");
        }
        // Poles are covered at both ends.
        assert!((set.point(0)[2] + 2.0).abs() < 1e-4);
    }

    #[test]
    fn zero_jitter_keeps_the_silhouette_flat() {
        let mask = PixelMask::from_fn(8, |x, _| x < 4);
        let settings = SampleSettings {
            depth_jitter: 0.0,
            ..SampleSettings::default()
        };
        let set = sample(&mask, 64, &settings, &mut StdRng::seed_from_u64(3));
        assert!(set.points().all(|[_, _, z]| z == 0.0));
    }
}
