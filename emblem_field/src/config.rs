//! Tunables for rasterization, sampling, and the per-frame field update.
//!
//! Every field has a default, so a JSON preset only needs to name the values
//! it overrides:
//!
//! ```json
//! { "particle_count": 6000, "diffusion_gain": 4.5, "style": { "point_size": 0.1 } }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading field config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing field config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid field config: {0}")]
    Invalid(String),
}

/// Point sprite appearance pushed alongside the position buffer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderStyle {
    /// World-space sprite diameter (attenuated by distance).
    pub point_size: f32,
    pub opacity: f32,
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self {
            point_size: 0.15,
            opacity: 0.8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FieldConfig {
    pub particle_count: usize,
    /// Side length of the square silhouette raster, in pixels.
    pub raster_size: u32,
    /// Width of the world window the raster maps onto.
    pub world_extent: f32,
    /// Half-range of the uniform Z jitter given to sampled points.
    pub depth_jitter: f32,
    /// Radius of the sphere used when a silhouette has no lit pixels.
    pub fallback_radius: f32,
    pub spring_rate: f32,
    pub base_scale: f32,
    pub max_scale: f32,
    pub diffusion_gain: f32,
    pub noise_frequency: f32,
    /// Phase step between consecutive particles in the breathing noise.
    pub noise_phase_offset: f32,
    pub noise_min: f32,
    pub noise_max: f32,
    /// Spread used while no hand is detected.
    pub baseline_spread: f32,
    /// Fraction of the gap to the raw spread closed each frame; 1.0 disables smoothing.
    pub spread_smoothing: f32,
    pub burst_strength: f32,
    pub burst_damping: f32,
    /// Whole-field spin about the vertical axis, radians per second.
    pub rotation_speed: f32,
    pub style: RenderStyle,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            particle_count: 4000,
            raster_size: 128,
            world_extent: 10.0,
            depth_jitter: 1.0,
            fallback_radius: 2.0,
            spring_rate: 0.08,
            base_scale: 1.0,
            max_scale: 1.8,
            diffusion_gain: 3.0,
            noise_frequency: 2.0,
            noise_phase_offset: 1.0,
            noise_min: 0.05,
            noise_max: 0.5,
            baseline_spread: 0.0,
            spread_smoothing: 0.15,
            burst_strength: 0.1,
            burst_damping: 0.9,
            rotation_speed: 0.1,
            style: RenderStyle::default(),
        }
    }
}

const MIN_RASTER_SIZE: u32 = 8;
const MAX_RASTER_SIZE: u32 = 4096;

impl FieldConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: FieldConfig =
            serde_json::from_str(&data).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if self.particle_count == 0 {
            return invalid("particle_count must be at least 1".into());
        }
        if !(MIN_RASTER_SIZE..=MAX_RASTER_SIZE).contains(&self.raster_size) {
            return invalid(format!(
                "raster_size {} outside {MIN_RASTER_SIZE}..={MAX_RASTER_SIZE}",
                self.raster_size
            ));
        }
        let finite = [
            ("world_extent", self.world_extent),
            ("depth_jitter", self.depth_jitter),
            ("fallback_radius", self.fallback_radius),
            ("spring_rate", self.spring_rate),
            ("base_scale", self.base_scale),
            ("max_scale", self.max_scale),
            ("diffusion_gain", self.diffusion_gain),
            ("noise_frequency", self.noise_frequency),
            ("noise_phase_offset", self.noise_phase_offset),
            ("noise_min", self.noise_min),
            ("noise_max", self.noise_max),
            ("baseline_spread", self.baseline_spread),
            ("spread_smoothing", self.spread_smoothing),
            ("burst_strength", self.burst_strength),
            ("burst_damping", self.burst_damping),
            ("rotation_speed", self.rotation_speed),
            ("style.point_size", self.style.point_size),
            ("style.opacity", self.style.opacity),
        ];
        if let Some((name, value)) = finite.iter().find(|(_, value)| !value.is_finite()) {
            return invalid(format!("{name} must be finite (got {value})"));
        }
        if !(self.spring_rate > 0.0 && self.spring_rate < 1.0) {
            return invalid(format!(
                "spring_rate must lie in (0, 1) (got {})",
                self.spring_rate
            ));
        }
        if self.world_extent <= 0.0 || self.fallback_radius <= 0.0 {
            return invalid("world_extent and fallback_radius must be positive".into());
        }
        if self.depth_jitter < 0.0 || self.diffusion_gain < 0.0 || self.burst_strength < 0.0 {
            return invalid(
                "depth_jitter, diffusion_gain and burst_strength must not be negative".into(),
            );
        }
        if self.base_scale <= 0.0 || self.max_scale < self.base_scale {
            return invalid(format!(
                "scales must satisfy 0 < base_scale <= max_scale (got {} / {})",
                self.base_scale, self.max_scale
            ));
        }
        if self.noise_min < 0.0 || self.noise_max < self.noise_min {
            return invalid("noise amplitudes must satisfy 0 <= noise_min <= noise_max".into());
        }
        if !(0.0..=1.0).contains(&self.baseline_spread) {
            return invalid("baseline_spread must lie in [0, 1]".into());
        }
        if !(self.spread_smoothing > 0.0 && self.spread_smoothing <= 1.0) {
            return invalid("spread_smoothing must lie in (0, 1]".into());
        }
        if !(0.0..1.0).contains(&self.burst_damping) {
            return invalid("burst_damping must lie in [0, 1)".into());
        }
        if self.style.point_size <= 0.0 || !(0.0..=1.0).contains(&self.style.opacity) {
            return invalid("style needs a positive point_size and opacity in [0, 1]".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        FieldConfig::default().validate().unwrap();
    }

    #[test]
    fn partial_json_keeps_other_defaults() {
        let config: FieldConfig =
            serde_json::from_str(r#"{ "particle_count": 1200, "style": { "opacity": 0.5 } }"#)
                .unwrap();
        assert_eq!(config.particle_count, 1200);
        assert_eq!(config.spring_rate, 0.08);
        assert_eq!(config.style.opacity, 0.5);
        assert_eq!(config.style.point_size, 0.15);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let parsed = serde_json::from_str::<FieldConfig>(r#"{ "particle_cuont": 10 }"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn spring_rate_outside_unit_interval_is_invalid() {
        for rate in [0.0, 1.0, 1.5, f32::NAN] {
            let config = FieldConfig {
                spring_rate: rate,
                ..FieldConfig::default()
            };
            assert!(config.validate().is_err(), "rate {rate} accepted");
        }
    }

    #[test]
    fn raster_size_is_bounded_both_ways() {
        for (size, ok) in [(7, false), (8, true), (4096, true), (4097, false), (40_000, false)] {
            let config = FieldConfig {
                raster_size: size,
                ..FieldConfig::default()
            };
            assert_eq!(config.validate().is_ok(), ok, "raster_size {size}");
        }
    }

    #[test]
    fn inverted_scales_are_invalid() {
        let config = FieldConfig {
            base_scale: 2.0,
            max_scale: 1.0,
            ..FieldConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }
}
