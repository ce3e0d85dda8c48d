use std::fs::{self, File};
use std::path::Path;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use emblem_field::{EmblemScene, FrameDriver, Raster};
use image::{ColorType, ImageEncoder, codecs::png::PngEncoder};
use serde::Serialize;

use crate::cli::Args;
use crate::input::GestureInput;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionStats {
    pub mean_radius: f32,
    pub max_radius: f32,
    pub bounds_min: [f32; 3],
    pub bounds_max: [f32; 3],
}

impl PositionStats {
    pub fn from_positions(positions: &[f32]) -> Self {
        let mut bounds_min = [f32::INFINITY; 3];
        let mut bounds_max = [f32::NEG_INFINITY; 3];
        let mut radius_sum = 0.0f64;
        let mut max_radius = 0.0f32;
        let mut count = 0usize;
        for point in positions.chunks_exact(3) {
            for axis in 0..3 {
                bounds_min[axis] = bounds_min[axis].min(point[axis]);
                bounds_max[axis] = bounds_max[axis].max(point[axis]);
            }
            let radius = (point[0] * point[0] + point[1] * point[1] + point[2] * point[2]).sqrt();
            radius_sum += radius as f64;
            max_radius = max_radius.max(radius);
            count += 1;
        }
        if count == 0 {
            return Self {
                mean_radius: 0.0,
                max_radius: 0.0,
                bounds_min: [0.0; 3],
                bounds_max: [0.0; 3],
            };
        }
        Self {
            mean_radius: (radius_sum / count as f64) as f32,
            max_radius,
            bounds_min,
            bounds_max,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HeadlessReport {
    pub shape: String,
    pub color: String,
    pub gesture_source: String,
    pub frames: u32,
    pub particles: usize,
    pub lit_pixels: usize,
    pub final_spread: f32,
    pub rotation_y: f32,
    pub positions: PositionStats,
}

/// Simulate `args.frames` ticks without a window and summarize the last one.
pub fn run(args: &Args, scene: EmblemScene, input: GestureInput) -> Result<HeadlessReport> {
    ensure!(args.frames > 0, "headless mode needs at least one frame");
    let gesture_source = input.describe().to_string();
    // Recordings are paced in wall-clock time, so the simulation has to be too.
    let frame_time = Duration::try_from_secs_f32(1.0 / args.fps)
        .with_context(|| format!("unusable frame rate {}", args.fps))?;
    let pace = input.is_replay().then_some(frame_time);
    let lit_pixels = scene.lit_pixels();

    let mut driver = FrameDriver::new(scene, input);
    driver.start();

    let mut last = None;
    for frame in 0..args.frames {
        if let Some(delay) = pace {
            thread::sleep(delay);
        }
        let elapsed = frame as f32 / args.fps;
        if let Some(out) = driver.tick(elapsed) {
            ensure!(
                out.positions.iter().all(|v| v.is_finite()),
                "non-finite particle position at frame {frame}"
            );
            if frame + 1 == args.frames {
                last = Some(HeadlessReport {
                    shape: out.shape.label().to_string(),
                    color: out.color.to_hex(),
                    gesture_source: gesture_source.clone(),
                    frames: args.frames,
                    particles: out.particle_count(),
                    lit_pixels,
                    final_spread: out.spread,
                    rotation_y: out.rotation_y,
                    positions: PositionStats::from_positions(out.positions),
                });
            }
        }
    }
    driver.stop();
    last.context("driver produced no frames")
}

pub fn print_report(report: &HeadlessReport) {
    println!(
        "Simulated {} frames of {} ({} particles, color {}, {})",
        report.frames, report.shape, report.particles, report.color, report.gesture_source
    );
    if report.lit_pixels == 0 {
        println!("  silhouette had no lit pixels; sphere fallback in use");
    } else {
        println!("  silhouette lit pixels: {}", report.lit_pixels);
    }
    let stats = &report.positions;
    println!(
        "  spread {:.3}, rotation {:.3} rad, radius mean {:.3} max {:.3}",
        report.final_spread, report.rotation_y, stats.mean_radius, stats.max_radius
    );
    println!(
        "  bounds min ({:.2}, {:.2}, {:.2}) max ({:.2}, {:.2}, {:.2})",
        stats.bounds_min[0],
        stats.bounds_min[1],
        stats.bounds_min[2],
        stats.bounds_max[0],
        stats.bounds_max[1],
        stats.bounds_max[2]
    );
}

pub fn write_report_json(report: &HeadlessReport, destination: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("serializing headless report")?;
    fs::write(destination, json)
        .with_context(|| format!("writing headless report to {}", destination.display()))?;
    Ok(())
}

/// Write the current emblem's raster as a PNG; returns its lit pixel count.
pub fn dump_mask(scene: &EmblemScene, destination: &Path) -> Result<usize> {
    let raster = scene.rasterizer().render(scene.shape());
    export_raster_to_png(&raster, destination)?;
    Ok(raster.lit_mask().lit_count())
}

fn export_raster_to_png(raster: &Raster, destination: &Path) -> Result<()> {
    let side = raster.side();
    let data = raster.pixels();
    let expected_len = side as usize * side as usize * 4;
    ensure!(
        data.len() == expected_len,
        "RGBA buffer size {} does not match dimensions {side}x{side}",
        data.len()
    );

    let file = File::create(destination)
        .with_context(|| format!("creating {}", destination.display()))?;
    let encoder = PngEncoder::new(file);
    encoder.write_image(data, side, side, ColorType::Rgba8.into())?;
    Ok(())
}
