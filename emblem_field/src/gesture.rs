//! Hand landmarks, the openness measure, and the single-slot signal mailbox
//! shared between a tracker thread and the render loop.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Landmarks per detected hand.
pub const LANDMARK_COUNT: usize = 21;
pub const WRIST: usize = 0;
pub const THUMB_TIP: usize = 4;
pub const INDEX_KNUCKLE: usize = 5;
pub const INDEX_TIP: usize = 8;

/// Pinch ratio that maps to openness 0.
const PINCH_OFFSET: f32 = 0.2;
/// Ratio span between a pinch and a fully spread hand.
const OPENNESS_RANGE: f32 = 1.0;

/// One landmark in frame-normalized coordinates (x, y in `[0, 1]`).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
}

impl Landmark {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y, z: 0.0 }
    }

    /// Distance in the image plane; depth is ignored.
    pub fn planar_distance(&self, other: &Landmark) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// The 21 landmarks of a single detected hand.
#[derive(Debug, Clone, PartialEq)]
pub struct HandLandmarks {
    points: [Landmark; LANDMARK_COUNT],
}

impl HandLandmarks {
    /// Returns `None` unless exactly 21 points are given.
    pub fn from_points(points: &[Landmark]) -> Option<Self> {
        let points: [Landmark; LANDMARK_COUNT] = points.try_into().ok()?;
        Some(Self { points })
    }

    pub fn point(&self, index: usize) -> Landmark {
        self.points[index]
    }

    pub fn points(&self) -> &[Landmark; LANDMARK_COUNT] {
        &self.points
    }

    /// Pinch distance normalized by hand scale, offset and clamped so a pinch
    /// reads ≈0 and a spread hand ≈1. `None` when the hand scale collapses.
    pub fn openness(&self) -> Option<f32> {
        let reference = self.points[INDEX_KNUCKLE].planar_distance(&self.points[WRIST]);
        if !(reference > f32::EPSILON) {
            return None;
        }
        let pinch = self.points[THUMB_TIP].planar_distance(&self.points[INDEX_TIP]);
        let normalized = ((pinch / reference - PINCH_OFFSET) / OPENNESS_RANGE).clamp(0.0, 1.0);
        normalized.is_finite().then_some(normalized)
    }
}

/// Latest gesture reading.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GestureSignal {
    pub detected: bool,
    /// In `[0, 1]`; meaningless when `detected` is false.
    pub openness: f32,
}

impl GestureSignal {
    pub const NONE: GestureSignal = GestureSignal {
        detected: false,
        openness: 0.0,
    };

    pub fn detected(openness: f32) -> Self {
        let openness = if openness.is_finite() {
            openness.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            detected: true,
            openness,
        }
    }

    /// Signal for one processed frame: a hand with a usable scale counts as
    /// detected, anything else does not.
    pub fn from_hand(hand: Option<&HandLandmarks>) -> Self {
        hand.and_then(HandLandmarks::openness)
            .map(Self::detected)
            .unwrap_or(Self::NONE)
    }

    fn pack(self) -> u64 {
        ((self.openness.to_bits() as u64) << 32) | self.detected as u64
    }

    fn unpack(bits: u64) -> Self {
        Self {
            detected: bits & 1 == 1,
            openness: f32::from_bits((bits >> 32) as u32),
        }
    }
}

/// Single-slot, last-write-wins exchange for [`GestureSignal`].
///
/// The producer overwrites the slot whenever a frame is processed; the
/// render loop reads whatever is there without blocking. Intermediate
/// values may be superseded unseen.
#[derive(Debug)]
pub struct GestureMailbox {
    slot: AtomicU64,
    publishes: AtomicU64,
}

impl GestureMailbox {
    pub fn new() -> Self {
        Self {
            slot: AtomicU64::new(GestureSignal::NONE.pack()),
            publishes: AtomicU64::new(0),
        }
    }

    pub fn publish(&self, signal: GestureSignal) {
        self.slot.store(signal.pack(), Ordering::Release);
        self.publishes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn latest(&self) -> GestureSignal {
        GestureSignal::unpack(self.slot.load(Ordering::Acquire))
    }

    /// Total number of publishes so far.
    pub fn publish_count(&self) -> u64 {
        self.publishes.load(Ordering::Relaxed)
    }
}

impl Default for GestureMailbox {
    fn default() -> Self {
        Self::new()
    }
}
