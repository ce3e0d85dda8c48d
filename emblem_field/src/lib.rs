//! Gesture-driven emblem particle field.
//!
//! A shape is rasterized into a small off-screen buffer, its lit pixels are
//! sampled into a fixed number of 3D target points, and a particle field
//! springs toward those targets every frame. Hand openness from a tracker
//! widens the formation and scatters particles along per-particle offsets.
//! Nothing here touches a window or GPU; the viewer uploads
//! [`RenderFrame::positions`] each tick.

pub mod config;
pub mod driver;
pub mod field;
pub mod gesture;
pub mod raster;
pub mod replay;
pub mod sampler;
pub mod scene;
pub mod shape;
mod silhouette;
pub mod tracker;

pub use config::{ConfigError, FieldConfig, RenderStyle};
pub use driver::FrameDriver;
pub use field::ParticleField;
pub use gesture::{GestureMailbox, GestureSignal, HandLandmarks, Landmark};
pub use raster::{FontError, FontFace, PixelMask, Raster, Rasterizer};
pub use replay::{LandmarkRecording, ReplayFeed};
pub use sampler::{SampleSettings, TargetPointSet, fallback_sphere, sample};
pub use scene::{EmblemScene, FrameContext, RenderFrame};
pub use shape::{ColorParseError, Rgb, ShapeId, ShapeParseError};
pub use tracker::{
    FeedItem, HandTracker, LandmarkFeed, ManualHand, ManualTracker, ThreadedTracker,
    TrackerError, TrackerStatus,
};
