//! Render loop driver: one `tick` per display refresh.
//!
//! The host event loop owns the clock and calls [`FrameDriver::tick`] with
//! the elapsed time; the driver reads the tracker's latest signal, advances
//! the scene, and hands back the positions to upload.

use crate::gesture::GestureSignal;
use crate::scene::{EmblemScene, FrameContext, RenderFrame};
use crate::shape::{Rgb, ShapeId};
use crate::tracker::{HandTracker, TrackerStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DriverState {
    Idle,
    Running,
    Stopped,
}

pub struct FrameDriver<T: HandTracker> {
    scene: EmblemScene,
    tracker: T,
    state: DriverState,
    frames: u64,
}

impl<T: HandTracker> FrameDriver<T> {
    pub fn new(scene: EmblemScene, tracker: T) -> Self {
        Self {
            scene,
            tracker,
            state: DriverState::Idle,
            frames: 0,
        }
    }

    /// Start the tracker and begin accepting ticks. A tracker that fails to
    /// start is logged and the field runs on the baseline spread.
    pub fn start(&mut self) {
        if self.state == DriverState::Running {
            return;
        }
        if let Err(err) = self.tracker.start() {
            log::warn!("[field] hand tracker did not start: {err}; using baseline spread");
        }
        self.state = DriverState::Running;
    }

    /// Advance one frame. Returns `None` before `start` and after `stop`.
    pub fn tick(&mut self, elapsed: f32) -> Option<RenderFrame<'_>> {
        if self.state != DriverState::Running {
            return None;
        }
        let signal = self.signal();
        self.frames += 1;
        Some(self.scene.tick(FrameContext { elapsed }, signal))
    }

    /// Release the tracker and stop producing frames.
    pub fn stop(&mut self) {
        if self.state == DriverState::Stopped {
            return;
        }
        self.tracker.stop();
        self.state = DriverState::Stopped;
        log::info!("[field] driver stopped after {} frames", self.frames);
    }

    /// Signal the next tick will use; NONE unless the tracker is running.
    pub fn signal(&self) -> GestureSignal {
        match self.tracker.status() {
            TrackerStatus::Running => self.tracker.latest_signal(),
            _ => GestureSignal::NONE,
        }
    }

    pub fn select_shape(&mut self, shape: ShapeId) {
        self.scene.select_shape(shape);
    }

    pub fn select_color(&mut self, color: Rgb) {
        self.scene.select_color(color);
    }

    pub fn is_running(&self) -> bool {
        self.state == DriverState::Running
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn scene(&self) -> &EmblemScene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut EmblemScene {
        &mut self.scene
    }

    pub fn tracker(&self) -> &T {
        &self.tracker
    }

    pub fn tracker_mut(&mut self) -> &mut T {
        &mut self.tracker
    }
}

impl<T: HandTracker> Drop for FrameDriver<T> {
    fn drop(&mut self) {
        if self.state == DriverState::Running {
            self.tracker.stop();
        }
    }
}
