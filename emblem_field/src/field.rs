//! Per-frame particle dynamics.
//!
//! Each frame the field
//! 1. eases the smoothed spread toward the raw gesture spread,
//! 2. scales the target set and pushes every particle along its own random
//!    offset in proportion to the spread,
//! 3. pulls the current positions a fixed fraction toward those effective
//!    targets (after integrating any leftover burst velocity), and
//! 4. adds a breathing term, so rendered positions never settle entirely.
//!
//! All buffers are allocated once at construction and rewritten in place.

use std::f32::consts::TAU;

use rand::Rng;

use crate::config::FieldConfig;
use crate::gesture::GestureSignal;
use crate::sampler::TargetPointSet;

/// Spread as seen by the field: openness when a hand is present, the
/// configured baseline otherwise. Never NaN and always inside `[0, 1]`.
pub fn raw_spread(signal: GestureSignal, baseline: f32) -> f32 {
    let spread = if signal.detected {
        signal.openness
    } else {
        baseline
    };
    if spread.is_finite() {
        spread.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// One spring step: moves `current` the fraction `rate` of the way to `target`.
#[inline]
pub fn spring_step(current: f32, target: f32, rate: f32) -> f32 {
    current + (target - current) * rate
}

static ORIGIN: [f32; 3] = [0.0; 3];

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

pub struct ParticleField {
    config: FieldConfig,
    current: Vec<f32>,
    offsets: Vec<f32>,
    velocities: Vec<f32>,
    output: Vec<f32>,
    spread: f32,
    rotation_y: f32,
}

impl ParticleField {
    /// Field of `config.particle_count` particles, all at the origin and at rest.
    pub fn new<R: Rng + ?Sized>(config: &FieldConfig, rng: &mut R) -> Self {
        let len = config.particle_count * 3;
        let offsets = (0..len).map(|_| rng.gen_range(-1.0f32..=1.0)).collect();
        Self {
            config: config.clone(),
            current: vec![0.0; len],
            offsets,
            velocities: vec![0.0; len],
            output: vec![0.0; len],
            spread: raw_spread(GestureSignal::NONE, config.baseline_spread),
            rotation_y: 0.0,
        }
    }

    pub fn count(&self) -> usize {
        self.current.len() / 3
    }

    /// Smoothed spread used by the last [`advance`](Self::advance).
    pub fn spread(&self) -> f32 {
        self.spread
    }

    pub fn rotation_y(&self) -> f32 {
        self.rotation_y
    }

    /// Positions before the breathing term.
    pub fn current(&self) -> &[f32] {
        &self.current
    }

    /// Positions as of the last frame, breathing included.
    pub fn output(&self) -> &[f32] {
        &self.output
    }

    pub fn velocities(&self) -> &[f32] {
        &self.velocities
    }

    pub fn offsets(&self) -> &[f32] {
        &self.offsets
    }

    /// Kick every particle with a small random velocity so a shape change
    /// reads as a burst rather than a uniform morph.
    pub fn retarget<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let strength = self.config.burst_strength;
        for v in &mut self.velocities {
            *v = rng.gen_range(-0.5f32..=0.5) * strength;
        }
    }

    /// Step the field one frame toward `target` and return the rendered
    /// positions. `elapsed` is seconds since the animation started.
    ///
    /// A target with fewer points than the field pulls the surplus
    /// particles toward the origin.
    pub fn advance(&mut self, elapsed: f32, signal: GestureSignal, target: &TargetPointSet) -> &[f32] {
        let cfg = &self.config;
        let elapsed = if elapsed.is_finite() { elapsed } else { 0.0 };

        let raw = raw_spread(signal, cfg.baseline_spread);
        self.spread = spring_step(self.spread, raw, cfg.spread_smoothing).clamp(0.0, 1.0);
        let spread = self.spread;

        let scale = lerp(cfg.base_scale, cfg.max_scale, spread);
        let diffusion = spread * cfg.diffusion_gain;
        let amplitude = lerp(cfg.noise_min, cfg.noise_max, spread);
        let phase = elapsed * cfg.noise_frequency;

        let targets = target.as_slice();
        for (i, ((((cur, vel), off), out), tgt)) in self
            .current
            .chunks_exact_mut(3)
            .zip(self.velocities.chunks_exact_mut(3))
            .zip(self.offsets.chunks_exact(3))
            .zip(self.output.chunks_exact_mut(3))
            .zip(targets.chunks_exact(3).chain(std::iter::repeat(&ORIGIN[..])))
            .enumerate()
        {
            let noise = (phase + i as f32 * cfg.noise_phase_offset).sin() * amplitude;
            for axis in 0..3 {
                cur[axis] += vel[axis];
                vel[axis] *= cfg.burst_damping;
                let effective = tgt[axis] * scale + off[axis] * diffusion;
                cur[axis] = spring_step(cur[axis], effective, cfg.spring_rate);
                out[axis] = cur[axis] + noise;
            }
        }

        self.rotation_y = (elapsed * cfg.rotation_speed).rem_euclid(TAU);
        &self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::fallback_sphere;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn small_config() -> FieldConfig {
        FieldConfig {
            particle_count: 64,
            ..FieldConfig::default()
        }
    }

    #[test]
    fn spring_closes_the_gap_geometrically() {
        let (mut c, t, k) = (0.0f32, 10.0f32, 0.08f32);
        for step in 1..=50 {
            c = spring_step(c, t, k);
            let expected = (1.0 - k).powi(step) * 10.0;
            assert!(((t - c) - expected).abs() < 1e-3, "step {step}");
        }
    }

    #[test]
    fn raw_spread_prefers_openness_and_sanitizes() {
        assert_eq!(raw_spread(GestureSignal::detected(0.7), 0.2), 0.7);
        assert_eq!(raw_spread(GestureSignal::NONE, 0.2), 0.2);
        let bogus = GestureSignal {
            detected: true,
            openness: f32::NAN,
        };
        assert_eq!(raw_spread(bogus, 0.5), 0.0);
        let too_wide = GestureSignal {
            detected: true,
            openness: 4.0,
        };
        assert_eq!(raw_spread(too_wide, 0.0), 1.0);
    }

    #[test]
    fn closed_hand_converges_onto_the_target() {
        let config = FieldConfig {
            noise_min: 0.0,
            ..small_config()
        };
        let mut rng = StdRng::seed_from_u64(5);
        let mut field = ParticleField::new(&config, &mut rng);
        let target = fallback_sphere(config.particle_count, 2.0);
        for frame in 0..400 {
            field.advance(frame as f32 / 60.0, GestureSignal::detected(0.0), &target);
        }
        for (out, tgt) in field.output().iter().zip(target.as_slice()) {
            assert!((out - tgt).abs() < 1e-3);
        }
    }

    #[test]
    fn open_hand_pushes_particles_outward() {
        let config = small_config();
        let target = fallback_sphere(config.particle_count, 2.0);
        let settle = |openness: f32| {
            let mut field = ParticleField::new(&config, &mut StdRng::seed_from_u64(9));
            for frame in 0..400 {
                field.advance(frame as f32 / 60.0, GestureSignal::detected(openness), &target);
            }
            let cur = field.current();
            cur.chunks_exact(3)
                .map(|p| (p[0] * p[0] + p[1] * p[1] + p[2] * p[2]).sqrt())
                .sum::<f32>()
                / config.particle_count as f32
        };
        assert!(settle(1.0) > settle(0.0) * 1.5);
    }

    #[test]
    fn output_stays_finite_for_any_openness() {
        let config = small_config();
        let target = fallback_sphere(config.particle_count, 2.0);
        let mut field = ParticleField::new(&config, &mut StdRng::seed_from_u64(2));
        for frame in 0..200 {
            let openness = (frame % 11) as f32 / 10.0;
            let out = field.advance(frame as f32 * 0.016, GestureSignal::detected(openness), &target);
            assert!(out.iter().all(|v| v.is_finite()));
        }
        let out = field.advance(f32::INFINITY, GestureSignal::NONE, &target);
        assert!(out.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn retarget_is_reproducible_and_bounded() {
        let config = small_config();
        let mut a = ParticleField::new(&config, &mut StdRng::seed_from_u64(1));
        let mut b = ParticleField::new(&config, &mut StdRng::seed_from_u64(1));
        a.retarget(&mut StdRng::seed_from_u64(42));
        b.retarget(&mut StdRng::seed_from_u64(42));
        assert_eq!(a.velocities(), b.velocities());
        let limit = config.burst_strength * 0.5;
        assert!(a.velocities().iter().all(|v| v.abs() <= limit));
        assert!(a.velocities().iter().any(|v| *v != 0.0));
    }

    #[test]
    fn burst_decays_away() {
        let config = small_config();
        let target = TargetPointSet::zeroed(config.particle_count);
        let mut rng = StdRng::seed_from_u64(3);
        let mut field = ParticleField::new(&config, &mut rng);
        field.retarget(&mut rng);
        for frame in 0..200 {
            field.advance(frame as f32 / 60.0, GestureSignal::NONE, &target);
        }
        assert!(field.velocities().iter().all(|v| v.abs() < 1e-6));
    }

    #[test]
    fn buffers_are_reused_between_frames() {
        let config = small_config();
        let target = fallback_sphere(config.particle_count, 2.0);
        let mut field = ParticleField::new(&config, &mut StdRng::seed_from_u64(4));
        let before = field.output().as_ptr();
        for frame in 0..10 {
            field.advance(frame as f32, GestureSignal::detected(0.5), &target);
        }
        assert_eq!(field.output().as_ptr(), before);
        assert_eq!(field.output().len(), config.particle_count * 3);
    }

    #[test]
    fn rotation_follows_elapsed_time() {
        let config = small_config();
        let target = TargetPointSet::zeroed(config.particle_count);
        let mut field = ParticleField::new(&config, &mut StdRng::seed_from_u64(4));
        field.advance(10.0, GestureSignal::NONE, &target);
        assert!((field.rotation_y() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn spread_eases_toward_the_raw_value() {
        let config = small_config();
        let target = TargetPointSet::zeroed(config.particle_count);
        let mut field = ParticleField::new(&config, &mut StdRng::seed_from_u64(4));
        field.advance(0.0, GestureSignal::detected(1.0), &target);
        assert!((field.spread() - config.spread_smoothing).abs() < 1e-6);
        for frame in 1..200 {
            field.advance(frame as f32, GestureSignal::detected(1.0), &target);
        }
        assert!((field.spread() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn breathing_is_shared_across_axes() {
        let config = FieldConfig {
            spread_smoothing: 1.0,
            ..small_config()
        };
        let target = fallback_sphere(config.particle_count, 2.0);
        let mut field = ParticleField::new(&config, &mut StdRng::seed_from_u64(6));
        let (elapsed, openness) = (1.7, 0.4);
        field.advance(elapsed, GestureSignal::detected(openness), &target);
        let amplitude = lerp(config.noise_min, config.noise_max, openness);
        for (i, (out, cur)) in field
            .output()
            .chunks_exact(3)
            .zip(field.current().chunks_exact(3))
            .enumerate()
        {
            let expected =
                (elapsed * config.noise_frequency + i as f32 * config.noise_phase_offset).sin()
                    * amplitude;
            for axis in 0..3 {
                assert!((out[axis] - cur[axis] - expected).abs() < 1e-5, "particle {i}");
            }
        }
    }

    #[test]
    fn breathing_never_feeds_back_into_positions() {
        let quiet = FieldConfig {
            noise_min: 0.0,
            noise_max: 0.0,
            ..small_config()
        };
        let loud = FieldConfig {
            noise_min: 0.3,
            noise_max: 2.0,
            ..small_config()
        };
        let target = fallback_sphere(quiet.particle_count, 2.0);
        let mut a = ParticleField::new(&quiet, &mut StdRng::seed_from_u64(8));
        let mut b = ParticleField::new(&loud, &mut StdRng::seed_from_u64(8));
        for frame in 0..120 {
            let signal = GestureSignal::detected((frame % 7) as f32 / 6.0);
            a.advance(frame as f32 / 60.0, signal, &target);
            b.advance(frame as f32 / 60.0, signal, &target);
        }
        assert_eq!(a.current(), b.current());
        assert_ne!(a.output(), b.output());
    }

    #[test]
    fn settled_positions_match_scaled_target_plus_diffusion() {
        let config = FieldConfig {
            spread_smoothing: 1.0,
            ..small_config()
        };
        let target = fallback_sphere(config.particle_count, 2.0);
        let mut field = ParticleField::new(&config, &mut StdRng::seed_from_u64(12));
        let openness = 0.6;
        for frame in 0..600 {
            field.advance(frame as f32 / 60.0, GestureSignal::detected(openness), &target);
        }
        let scale = lerp(config.base_scale, config.max_scale, openness);
        let diffusion = openness * config.diffusion_gain;
        for ((cur, tgt), off) in field
            .current()
            .iter()
            .zip(target.as_slice())
            .zip(field.offsets())
        {
            let expected = tgt * scale + off * diffusion;
            assert!((cur - expected).abs() < 1e-3, "{cur} vs {expected}");
        }
    }
}
