//! Off-screen silhouette rasterization.
//!
//! A [`Rasterizer`] draws a shape's glyph into a square RGBA [`Raster`]
//! (white on opaque black) and reduces it to a [`PixelMask`] of lit pixels.
//! Glyphs come from a loaded font when it has an outline for them, otherwise
//! from the procedural silhouettes in [`crate::silhouette`].

use std::fs;
use std::path::{Path, PathBuf};

use fontdue::{Font, FontSettings, Metrics};
use thiserror::Error;

use crate::shape::{Glyph, ShapeId};
use crate::silhouette;

/// Raster side used when nothing else is configured.
pub const DEFAULT_RASTER_SIZE: u32 = 128;
/// A pixel is lit only when its alpha exceeds this value...
pub const LIT_ALPHA_THRESHOLD: u8 = 128;
/// ...and at least one color channel exceeds this one.
pub const LIT_BRIGHTNESS_THRESHOLD: u8 = 50;

const BACKGROUND: [u8; 4] = [0, 0, 0, 255];
const FOREGROUND: [u8; 3] = [255, 255, 255];

const SYMBOL_SIZE: f32 = 0.8;
const SYMBOL_DROP: f32 = 0.05;
const TEXT_SIZE: f32 = 0.25;
const TEXT_LINE_OFFSET: f32 = 0.15;

/// Two-part lit test: opaque enough and not near-black.
pub fn is_lit_pixel(rgba: [u8; 4]) -> bool {
    rgba[3] > LIT_ALPHA_THRESHOLD
        && rgba[..3]
            .iter()
            .any(|channel| *channel > LIT_BRIGHTNESS_THRESHOLD)
}

/// Square RGBA8 canvas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    side: u32,
    pixels: Vec<u8>,
}

impl Raster {
    pub fn new(side: u32) -> Self {
        let side = side.max(1);
        let mut raster = Self {
            side,
            pixels: vec![0u8; side as usize * side as usize * 4],
        };
        raster.clear();
        raster
    }

    pub fn side(&self) -> u32 {
        self.side
    }

    /// Row-major RGBA bytes.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let idx = self.index(x, y);
        [
            self.pixels[idx],
            self.pixels[idx + 1],
            self.pixels[idx + 2],
            self.pixels[idx + 3],
        ]
    }

    pub fn clear(&mut self) {
        for chunk in self.pixels.chunks_exact_mut(4) {
            chunk.copy_from_slice(&BACKGROUND);
        }
    }

    /// Composite the foreground color over the pixel at `coverage` (0-255).
    pub fn blend_white(&mut self, x: u32, y: u32, coverage: u8) {
        if x >= self.side || y >= self.side || coverage == 0 {
            return;
        }
        let idx = self.index(x, y);
        let alpha = coverage as u16;
        for (channel, fg) in FOREGROUND.iter().enumerate() {
            let dst = self.pixels[idx + channel] as u16;
            let blended = (*fg as u16 * alpha + dst * (255 - alpha)) / 255;
            self.pixels[idx + channel] = blended as u8;
        }
        let dst_alpha = self.pixels[idx + 3] as u16;
        self.pixels[idx + 3] = (alpha + dst_alpha * (255 - alpha) / 255).min(255) as u8;
    }

    pub fn lit_mask(&self) -> PixelMask {
        let lit = self
            .pixels
            .chunks_exact(4)
            .map(|px| is_lit_pixel([px[0], px[1], px[2], px[3]]))
            .collect();
        PixelMask {
            side: self.side,
            lit,
        }
    }

    fn index(&self, x: u32, y: u32) -> usize {
        (y as usize * self.side as usize + x as usize) * 4
    }
}

/// Square boolean raster: which pixels are eligible sampling sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelMask {
    side: u32,
    lit: Vec<bool>,
}

impl PixelMask {
    /// A mask of `side`×`side` pixels with nothing lit.
    pub fn empty(side: u32) -> Self {
        let side = side.max(1);
        Self {
            side,
            lit: vec![false; side as usize * side as usize],
        }
    }

    /// Build a mask by evaluating `lit(x, y)` for every pixel.
    pub fn from_fn(side: u32, mut lit: impl FnMut(u32, u32) -> bool) -> Self {
        let mut mask = Self::empty(side);
        for y in 0..mask.side {
            for x in 0..mask.side {
                mask.lit[y as usize * mask.side as usize + x as usize] = lit(x, y);
            }
        }
        mask
    }

    pub fn side(&self) -> u32 {
        self.side
    }

    pub fn is_lit(&self, x: u32, y: u32) -> bool {
        x < self.side && y < self.side && self.lit[y as usize * self.side as usize + x as usize]
    }

    pub fn lit_count(&self) -> usize {
        self.lit.iter().filter(|lit| **lit).count()
    }

    /// Lit pixel coordinates in row-major order.
    pub fn lit_pixels(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        let side = self.side;
        self.lit
            .iter()
            .enumerate()
            .filter(|(_, lit)| **lit)
            .map(move |(idx, _)| (idx as u32 % side, idx as u32 / side))
    }
}

#[derive(Debug, Error)]
pub enum FontError {
    #[error("reading font {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing font {origin}: {reason}")]
    Parse { origin: String, reason: String },
}

/// Outline font used to draw emblem symbols and text labels.
pub struct FontFace {
    font: Font,
    origin: String,
}

impl FontFace {
    pub fn from_file(path: &Path) -> Result<Self, FontError> {
        let bytes = fs::read(path).map_err(|source| FontError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_bytes(bytes, path.display().to_string())
    }

    pub fn from_bytes(bytes: Vec<u8>, origin: impl Into<String>) -> Result<Self, FontError> {
        let origin = origin.into();
        let font = Font::from_bytes(bytes, FontSettings::default()).map_err(|reason| {
            FontError::Parse {
                origin: origin.clone(),
                reason: reason.to_string(),
            }
        })?;
        Ok(Self { font, origin })
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn has_glyph(&self, ch: char) -> bool {
        self.font.lookup_glyph_index(ch) != 0
    }

    /// Draw `text` so the union of its inked glyph boxes is centered on
    /// (`center_x`, `center_y`). Returns false when nothing was inked.
    fn draw_line(&self, raster: &mut Raster, text: &str, px: f32, center_x: f32, center_y: f32) -> bool {
        let mut placed: Vec<(f32, Metrics, Vec<u8>)> = Vec::new();
        let mut pen_x = 0.0f32;
        for ch in text.chars() {
            let (metrics, coverage) = self.font.rasterize(ch, px);
            placed.push((pen_x, metrics, coverage));
            pen_x += metrics.advance_width;
        }

        // Ink bounds relative to (pen origin, baseline), y pointing down.
        let mut bounds: Option<(f32, f32, f32, f32)> = None;
        for (pen, metrics, _) in placed.iter().filter(|(_, m, _)| m.width > 0 && m.height > 0) {
            let left = pen + metrics.xmin as f32;
            let right = left + metrics.width as f32;
            let top = -((metrics.ymin + metrics.height as i32) as f32);
            let bottom = -(metrics.ymin as f32);
            bounds = Some(match bounds {
                None => (left, top, right, bottom),
                Some((l, t, r, b)) => (l.min(left), t.min(top), r.max(right), b.max(bottom)),
            });
        }
        let Some((left, top, right, bottom)) = bounds else {
            return false;
        };

        let offset_x = center_x - (left + right) * 0.5;
        let offset_y = center_y - (top + bottom) * 0.5;
        for (pen, metrics, coverage) in &placed {
            if metrics.width == 0 || metrics.height == 0 {
                continue;
            }
            let start_x = (offset_x + pen + metrics.xmin as f32).round() as i32;
            let start_y = (offset_y - (metrics.ymin + metrics.height as i32) as f32).round() as i32;
            for gy in 0..metrics.height {
                let dest_y = start_y + gy as i32;
                if dest_y < 0 || dest_y >= raster.side() as i32 {
                    continue;
                }
                let row = gy * metrics.width;
                for gx in 0..metrics.width {
                    let dest_x = start_x + gx as i32;
                    if dest_x < 0 || dest_x >= raster.side() as i32 {
                        continue;
                    }
                    raster.blend_white(dest_x as u32, dest_y as u32, coverage[row + gx]);
                }
            }
        }
        true
    }
}

impl std::fmt::Debug for FontFace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontFace").field("origin", &self.origin).finish()
    }
}

/// Turns a [`ShapeId`] into its lit-pixel mask.
#[derive(Debug)]
pub struct Rasterizer {
    side: u32,
    font: Option<FontFace>,
}

impl Rasterizer {
    pub fn new(side: u32) -> Self {
        Self {
            side: side.max(1),
            font: None,
        }
    }

    pub fn with_font(mut self, font: FontFace) -> Self {
        self.font = Some(font);
        self
    }

    pub fn side(&self) -> u32 {
        self.side
    }

    pub fn font(&self) -> Option<&FontFace> {
        self.font.as_ref()
    }

    /// Draw the shape's glyph into a fresh raster.
    pub fn render(&self, shape: ShapeId) -> Raster {
        let mut raster = Raster::new(self.side);
        let side = self.side as f32;
        let center = side * 0.5;

        match shape.glyph() {
            Glyph::Symbol(symbol) => {
                let drawn = match self.font.as_ref() {
                    Some(font) if font.has_glyph(symbol) => font.draw_line(
                        &mut raster,
                        symbol.encode_utf8(&mut [0u8; 4]),
                        side * SYMBOL_SIZE,
                        center,
                        center + side * SYMBOL_DROP,
                    ),
                    _ => false,
                };
                if !drawn {
                    log::debug!("[raster] {shape}: no font outline, painting built-in silhouette");
                    silhouette::paint(shape, &mut raster);
                }
            }
            Glyph::Lines(upper, lower) => match self.font.as_ref() {
                Some(font) => {
                    let px = side * TEXT_SIZE;
                    font.draw_line(&mut raster, upper, px, center, center - side * TEXT_LINE_OFFSET);
                    font.draw_line(&mut raster, lower, px, center, center + side * TEXT_LINE_OFFSET);
                }
                None => log::debug!("[raster] {shape}: text needs a font, leaving raster blank"),
            },
        }
        raster
    }

    pub fn rasterize(&self, shape: ShapeId) -> PixelMask {
        self.render(shape).lit_mask()
    }
}

impl Default for Rasterizer {
    fn default() -> Self {
        Self::new(DEFAULT_RASTER_SIZE)
    }
}
