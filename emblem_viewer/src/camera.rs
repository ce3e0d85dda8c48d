//! Orbit camera around the emblem: drag to orbit, wheel to zoom, and a slow
//! automatic turn while no hand is in view.

use std::f32::consts::{FRAC_PI_2, TAU};

use glam::Vec3;

pub const START_DISTANCE: f32 = 12.0;
pub const MIN_DISTANCE: f32 = 5.0;
pub const MAX_DISTANCE: f32 = 20.0;
/// Full turns per minute while auto-rotating.
const AUTO_ROTATE_SPEED: f32 = 0.5;
/// Radians per dragged pixel.
const DRAG_SENSITIVITY: f32 = 0.005;
/// Distance factor per wheel line.
const ZOOM_STEP: f32 = 0.95;
const ELEVATION_LIMIT: f32 = FRAC_PI_2 - 0.01;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitCamera {
    distance: f32,
    azimuth: f32,
    elevation: f32,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self {
            distance: START_DISTANCE,
            azimuth: 0.0,
            elevation: 0.0,
        }
    }
}

impl OrbitCamera {
    pub fn distance(&self) -> f32 {
        self.distance
    }

    /// Positive `lines` move closer.
    pub fn zoom(&mut self, lines: f32) {
        if !lines.is_finite() {
            return;
        }
        self.distance = (self.distance * ZOOM_STEP.powf(lines)).clamp(MIN_DISTANCE, MAX_DISTANCE);
    }

    pub fn drag(&mut self, dx: f32, dy: f32) {
        if !(dx.is_finite() && dy.is_finite()) {
            return;
        }
        self.azimuth = (self.azimuth - dx * DRAG_SENSITIVITY).rem_euclid(TAU);
        self.elevation =
            (self.elevation + dy * DRAG_SENSITIVITY).clamp(-ELEVATION_LIMIT, ELEVATION_LIMIT);
    }

    /// Turn by `dt` seconds of auto-rotation unless a hand is in view.
    pub fn auto_rotate(&mut self, dt: f32, hand_detected: bool) {
        if hand_detected || !dt.is_finite() || dt <= 0.0 {
            return;
        }
        let step = TAU / 60.0 * AUTO_ROTATE_SPEED * dt;
        self.azimuth = (self.azimuth + step).rem_euclid(TAU);
    }

    pub fn eye(&self) -> Vec3 {
        let (sin_az, cos_az) = self.azimuth.sin_cos();
        let (sin_el, cos_el) = self.elevation.sin_cos();
        Vec3::new(cos_el * sin_az, sin_el, cos_el * cos_az) * self.distance
    }
}
