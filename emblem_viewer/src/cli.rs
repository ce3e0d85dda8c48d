use std::path::PathBuf;

use anyhow::{Context, Result, ensure};
use clap::Parser;
use emblem_field::{EmblemScene, FieldConfig, FontFace, Rasterizer, Rgb, ShapeId};

const MIN_FPS: f32 = 0.01;
const MAX_FPS: f32 = 1000.0;

#[derive(Parser, Debug)]
#[command(about = "Gesture-driven particle emblems rendered with wgpu", version)]
pub struct Args {
    /// Emblem to show at startup (tree, santa, heart, flower, saturn, text, like)
    #[arg(long, default_value = "tree")]
    pub shape: ShapeId,

    /// Particle color override as #rrggbb; defaults to the emblem's own color
    #[arg(long)]
    pub color: Option<Rgb>,

    /// Field tuning preset JSON; unspecified keys keep their defaults
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// TrueType/OpenType font used to rasterize emblem glyphs and the text emblem
    #[arg(long)]
    pub font: Option<PathBuf>,

    /// Landmark recording JSON to use as the hand tracker
    #[arg(long)]
    pub replay: Option<PathBuf>,

    /// Seed for sampling and burst randomness; random when omitted
    #[arg(long)]
    pub seed: Option<u64>,

    /// Override the particle count from the preset
    #[arg(long)]
    pub particles: Option<usize>,

    /// Skip creating a winit window/event loop; useful for headless automation
    #[arg(long)]
    pub headless: bool,

    /// Number of frames to simulate in headless mode
    #[arg(long, default_value_t = 180)]
    pub frames: u32,

    /// Simulated frame rate for headless runs
    #[arg(long, default_value_t = 60.0)]
    pub fps: f32,

    /// Openness (0-1) of a simulated hand for headless runs; no hand when omitted
    #[arg(long)]
    pub hand: Option<f32>,

    /// Write the startup emblem's silhouette raster to disk (PNG)
    #[arg(long)]
    pub dump_mask: Option<PathBuf>,

    /// Write headless run statistics as JSON
    #[arg(long)]
    pub stats_json: Option<PathBuf>,
}

impl Args {
    pub fn validate(&self) -> Result<()> {
        ensure!(
            (MIN_FPS..=MAX_FPS).contains(&self.fps),
            "fps must be between {MIN_FPS} and {MAX_FPS} (got {})",
            self.fps
        );
        if let Some(openness) = self.hand {
            ensure!(
                (0.0..=1.0).contains(&openness),
                "hand openness must be between 0 and 1 (got {openness})"
            );
        }
        Ok(())
    }
}

pub fn load_field_config(args: &Args) -> Result<FieldConfig> {
    let mut config = match args.config.as_ref() {
        Some(path) => FieldConfig::load(path)
            .with_context(|| format!("loading field preset {}", path.display()))?,
        None => FieldConfig::default(),
    };
    if let Some(count) = args.particles {
        config.particle_count = count;
    }
    config.validate().context("validating field config")?;
    Ok(config)
}

pub fn build_rasterizer(args: &Args, config: &FieldConfig) -> Result<Rasterizer> {
    let rasterizer = Rasterizer::new(config.raster_size);
    match args.font.as_ref() {
        Some(path) => {
            let font = FontFace::from_file(path)
                .with_context(|| format!("loading font {}", path.display()))?;
            log::info!("[viewer] rasterizing glyphs with {}", font.origin());
            Ok(rasterizer.with_font(font))
        }
        None => {
            log::info!("[viewer] no --font given; using built-in silhouettes");
            Ok(rasterizer)
        }
    }
}

/// Scene configured from the command line, on the requested shape and color.
pub fn build_scene(args: &Args) -> Result<EmblemScene> {
    let config = load_field_config(args)?;
    let rasterizer = build_rasterizer(args, &config)?;
    let seed = args.seed.unwrap_or_else(rand::random);
    log::info!(
        "[viewer] {} particles, raster {}px, seed {seed}",
        config.particle_count,
        config.raster_size
    );
    let mut scene = EmblemScene::with_seed(config, rasterizer, seed);
    if scene.shape() != args.shape {
        scene.select_shape(args.shape);
    }
    if let Some(color) = args.color {
        scene.select_color(color);
    }
    Ok(scene)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn parses_shape_and_color_flags() {
        let args = Args::try_parse_from([
            "emblem_viewer",
            "--shape",
            "Like",
            "--color",
            "#ff8800",
            "--particles",
            "900",
        ])
        .unwrap();
        assert_eq!(args.shape, ShapeId::ThumbsUp);
        assert_eq!(args.color, Some(Rgb::new(0xff, 0x88, 0x00)));
        assert_eq!(args.particles, Some(900));
        assert!(!args.headless);
    }

    #[test]
    fn rejects_unknown_shapes() {
        assert!(Args::try_parse_from(["emblem_viewer", "--shape", "cube"]).is_err());
    }

    #[test]
    fn particle_flag_overrides_the_preset() -> Result<()> {
        let dir = tempdir()?;
        let preset = dir.path().join("preset.json");
        fs::write(&preset, r#"{ "particle_count": 2000, "rotation_speed": 0.3 }"#)?;
        let preset_arg = preset.to_string_lossy().into_owned();
        let args = Args::try_parse_from([
            "emblem_viewer",
            "--config",
            preset_arg.as_str(),
            "--particles",
            "64",
        ])?;
        let config = load_field_config(&args)?;
        assert_eq!(config.particle_count, 64);
        assert_eq!(config.rotation_speed, 0.3);
        Ok(())
    }

    #[test]
    fn zero_particles_is_rejected() -> Result<()> {
        let args = Args::try_parse_from(["emblem_viewer", "--particles", "0"])?;
        assert!(load_field_config(&args).is_err());
        Ok(())
    }

    #[test]
    fn scene_starts_on_requested_shape_with_override() -> Result<()> {
        let args = Args::try_parse_from([
            "emblem_viewer",
            "--shape",
            "heart",
            "--color",
            "ffffff",
            "--particles",
            "100",
            "--seed",
            "4",
        ])?;
        let scene = build_scene(&args)?;
        assert_eq!(scene.shape(), ShapeId::Heart);
        assert_eq!(scene.color(), Rgb::WHITE);
        Ok(())
    }

    #[test]
    fn hand_openness_must_be_normalized() -> Result<()> {
        let args = Args::try_parse_from(["emblem_viewer", "--hand", "1.5"])?;
        assert!(args.validate().is_err());
        Ok(())
    }

    #[test]
    fn frame_rate_must_be_reasonable() -> Result<()> {
        for fps in ["0", "1e-40", "NaN", "5000"] {
            let args = Args::try_parse_from(["emblem_viewer", "--fps", fps])?;
            assert!(args.validate().is_err(), "fps {fps} accepted");
        }
        let args = Args::try_parse_from(["emblem_viewer", "--fps", "0.5"])?;
        args.validate()?;
        Ok(())
    }
}
