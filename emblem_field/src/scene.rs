//! Selection state plus the per-tick update that turns it into a frame.

use glam::Mat4;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::{FieldConfig, RenderStyle};
use crate::field::ParticleField;
use crate::gesture::GestureSignal;
use crate::raster::Rasterizer;
use crate::sampler::{self, SampleSettings, TargetPointSet};
use crate::shape::{Rgb, ShapeId};

/// Per-tick input; time is passed in rather than read from a clock.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameContext {
    /// Seconds since the animation started.
    pub elapsed: f32,
}

/// Everything the renderer needs for one frame.
#[derive(Debug, Clone, Copy)]
pub struct RenderFrame<'a> {
    /// Flat `[x0, y0, z0, x1, ...]`, 3·N floats.
    pub positions: &'a [f32],
    pub color: Rgb,
    pub rotation_y: f32,
    pub spread: f32,
    pub style: RenderStyle,
    pub shape: ShapeId,
}

impl RenderFrame<'_> {
    pub fn particle_count(&self) -> usize {
        self.positions.len() / 3
    }

    /// Whole-field rotation about the vertical axis.
    pub fn model_matrix(&self) -> Mat4 {
        Mat4::from_rotation_y(self.rotation_y)
    }
}

pub struct EmblemScene {
    config: FieldConfig,
    rasterizer: Rasterizer,
    rng: StdRng,
    shape: ShapeId,
    color: Rgb,
    target: TargetPointSet,
    field: ParticleField,
    lit_pixels: usize,
}

impl EmblemScene {
    /// Scene showing the startup shape in its default color.
    pub fn new(config: FieldConfig, rasterizer: Rasterizer, mut rng: StdRng) -> Self {
        let field = ParticleField::new(&config, &mut rng);
        let target = TargetPointSet::zeroed(config.particle_count);
        let mut scene = Self {
            config,
            rasterizer,
            rng,
            shape: ShapeId::default(),
            color: ShapeId::default().default_color(),
            target,
            field,
            lit_pixels: 0,
        };
        scene.select_shape(ShapeId::default());
        scene
    }

    pub fn with_seed(config: FieldConfig, rasterizer: Rasterizer, seed: u64) -> Self {
        Self::new(config, rasterizer, StdRng::seed_from_u64(seed))
    }

    /// Rasterize and resample `shape`, replace the target set wholesale,
    /// kick the field into a burst and apply the shape's default color.
    pub fn select_shape(&mut self, shape: ShapeId) {
        let mask = self.rasterizer.rasterize(shape);
        self.lit_pixels = mask.lit_count();
        let settings = SampleSettings::from(&self.config);
        self.target = sampler::sample(&mask, self.config.particle_count, &settings, &mut self.rng);
        self.field.retarget(&mut self.rng);
        self.shape = shape;
        self.color = shape.default_color();
        log::info!(
            "[field] shape {} ({} lit pixels, color {})",
            shape.label(),
            self.lit_pixels,
            self.color
        );
    }

    /// Override the particle color until the next color or shape selection.
    pub fn select_color(&mut self, color: Rgb) {
        self.color = color;
        log::debug!("[field] color {color}");
    }

    pub fn tick(&mut self, ctx: FrameContext, signal: GestureSignal) -> RenderFrame<'_> {
        self.field.advance(ctx.elapsed, signal, &self.target);
        RenderFrame {
            positions: self.field.output(),
            color: self.color,
            rotation_y: self.field.rotation_y(),
            spread: self.field.spread(),
            style: self.config.style,
            shape: self.shape,
        }
    }

    pub fn shape(&self) -> ShapeId {
        self.shape
    }

    pub fn color(&self) -> Rgb {
        self.color
    }

    pub fn target(&self) -> &TargetPointSet {
        &self.target
    }

    pub fn field(&self) -> &ParticleField {
        &self.field
    }

    pub fn config(&self) -> &FieldConfig {
        &self.config
    }

    pub fn rasterizer(&self) -> &Rasterizer {
        &self.rasterizer
    }

    /// Lit pixel count of the current shape's mask; 0 means the sphere
    /// fallback is in use.
    pub fn lit_pixels(&self) -> usize {
        self.lit_pixels
    }
}
