//! Recorded landmark streams.
//!
//! A recording stands in for camera + detector when none is available.
//! Format:
//!
//! ```json
//! {
//!   "frame_interval_ms": 33,
//!   "looped": true,
//!   "frames": [
//!     { "landmarks": [[0.51, 0.82, 0.0], [0.47, 0.74, -0.01], ...] },
//!     { "landmarks": null }
//!   ]
//! }
//! ```
//!
//! Each non-null `landmarks` array holds exactly 21 `[x, y, z]` triples.

use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::gesture::{HandLandmarks, LANDMARK_COUNT, Landmark};
use crate::tracker::{FeedItem, LandmarkFeed, TrackerError};

/// Longest accepted gap between recorded frames.
pub const MAX_FRAME_INTERVAL_MS: u64 = 5_000;

fn default_interval() -> u64 {
    33
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedFrame {
    #[serde(default)]
    pub landmarks: Option<Vec<[f32; 3]>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandmarkRecording {
    #[serde(default = "default_interval")]
    pub frame_interval_ms: u64,
    #[serde(default)]
    pub looped: bool,
    pub frames: Vec<RecordedFrame>,
}

impl LandmarkRecording {
    pub fn load(path: &Path) -> Result<Self, TrackerError> {
        let data = fs::read_to_string(path).map_err(|source| TrackerError::ReplayIo {
            path: path.to_path_buf(),
            source,
        })?;
        let recording: LandmarkRecording =
            serde_json::from_str(&data).map_err(|source| TrackerError::ReplayParse {
                path: path.to_path_buf(),
                source,
            })?;
        recording.validate()?;
        Ok(recording)
    }

    /// Rejects recordings that cannot be played at all. Frames with the wrong
    /// number of landmarks are kept; they fail individually on playback.
    pub fn validate(&self) -> Result<(), TrackerError> {
        if self.frames.is_empty() {
            return Err(TrackerError::ReplayInvalid("recording has no frames".into()));
        }
        if self.frame_interval_ms > MAX_FRAME_INTERVAL_MS {
            return Err(TrackerError::ReplayInvalid(format!(
                "frame interval {} ms exceeds {MAX_FRAME_INTERVAL_MS} ms",
                self.frame_interval_ms
            )));
        }
        let bad = self.frames.iter().position(|frame| {
            frame
                .landmarks
                .iter()
                .flatten()
                .flatten()
                .any(|c| !c.is_finite())
        });
        match bad {
            Some(index) => Err(TrackerError::ReplayInvalid(format!(
                "frame {index} has a non-finite coordinate"
            ))),
            None => Ok(()),
        }
    }

    /// Landmarks of frame `index`: `Ok(None)` for a frame without a hand,
    /// a detection error for a frame without exactly 21 points.
    pub fn hand(&self, index: usize) -> Result<Option<HandLandmarks>, TrackerError> {
        let Some(points) = self.frames.get(index).and_then(|f| f.landmarks.as_ref()) else {
            return Ok(None);
        };
        let landmarks: Vec<Landmark> = points
            .iter()
            .map(|&[x, y, z]| Landmark { x, y, z })
            .collect();
        HandLandmarks::from_points(&landmarks).map(Some).ok_or_else(|| {
            TrackerError::Detection(format!(
                "frame {index} has {} landmarks, expected {LANDMARK_COUNT}",
                points.len()
            ))
        })
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
}

/// Plays a [`LandmarkRecording`] back at its recorded frame rate. Polls
/// between frames return [`FeedItem::Pending`] instead of blocking.
#[derive(Debug)]
pub struct ReplayFeed {
    recording: LandmarkRecording,
    cursor: usize,
    next_due: Option<Instant>,
    paced: bool,
}

impl ReplayFeed {
    pub fn new(recording: LandmarkRecording) -> Self {
        Self {
            recording,
            cursor: 0,
            next_due: None,
            paced: true,
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, TrackerError> {
        Ok(Self::new(LandmarkRecording::load(path)?))
    }

    /// Deliver frames as fast as they are polled.
    pub fn unpaced(mut self) -> Self {
        self.paced = false;
        self
    }

    pub fn recording(&self) -> &LandmarkRecording {
        &self.recording
    }

    /// Index of the next frame to be delivered.
    pub fn cursor(&self) -> usize {
        self.cursor
    }
}

impl LandmarkFeed for ReplayFeed {
    fn open(&mut self) -> Result<(), TrackerError> {
        self.recording.validate()?;
        self.cursor = 0;
        self.next_due = None;
        log::info!(
            "[replay] playing {} frames every {} ms{}",
            self.recording.frames.len(),
            self.recording.frame_interval_ms,
            if self.recording.looped { " (looped)" } else { "" }
        );
        Ok(())
    }

    fn next_hand(&mut self) -> Result<FeedItem, TrackerError> {
        if self.cursor >= self.recording.frames.len() {
            if !self.recording.looped {
                return Ok(FeedItem::Ended);
            }
            self.cursor = 0;
        }
        if self.paced {
            let now = Instant::now();
            let interval = self.recording.frame_interval();
            let base = match self.next_due {
                Some(due) if now < due => return Ok(FeedItem::Pending),
                // Keep the recorded cadence unless playback fell a whole frame behind.
                Some(due) if now - due < interval => due,
                _ => now,
            };
            self.next_due = Some(base + interval);
        }
        let index = self.cursor;
        self.cursor += 1;
        Ok(FeedItem::Hand(self.recording.hand(index)?))
    }

    fn close(&mut self) {
        log::debug!("[replay] closed after frame {}", self.cursor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_hand_points() -> Vec<[f32; 3]> {
        let mut points = vec![[0.5, 0.5, 0.0]; LANDMARK_COUNT];
        points[0] = [0.5, 0.9, 0.0];
        points[5] = [0.5, 0.7, 0.0];
        points[4] = [0.3, 0.5, 0.0];
        points[8] = [0.5, 0.4, 0.0];
        points
    }

    fn recording(looped: bool) -> LandmarkRecording {
        LandmarkRecording {
            frame_interval_ms: 1,
            looped,
            frames: vec![
                RecordedFrame {
                    landmarks: Some(open_hand_points()),
                },
                RecordedFrame { landmarks: None },
            ],
        }
    }

    #[test]
    fn frames_play_in_order_then_end() {
        let mut feed = ReplayFeed::new(recording(false)).unpaced();
        feed.open().unwrap();
        assert!(matches!(feed.next_hand().unwrap(), FeedItem::Hand(Some(_))));
        assert_eq!(feed.next_hand().unwrap(), FeedItem::Hand(None));
        assert_eq!(feed.next_hand().unwrap(), FeedItem::Ended);
    }

    #[test]
    fn looped_recordings_wrap_around() {
        let mut feed = ReplayFeed::new(recording(true)).unpaced();
        feed.open().unwrap();
        for _ in 0..2 {
            feed.next_hand().unwrap();
        }
        assert!(matches!(feed.next_hand().unwrap(), FeedItem::Hand(Some(_))));
        assert_eq!(feed.cursor(), 1);
    }

    #[test]
    fn short_landmark_lists_fail_only_their_frame() {
        let mut rec = recording(false);
        rec.frames[0].landmarks = Some(vec![[0.0, 0.0, 0.0]; 20]);
        rec.validate().unwrap();
        let mut feed = ReplayFeed::new(rec).unpaced();
        feed.open().unwrap();
        let err = feed.next_hand().unwrap_err();
        assert!(!err.is_fatal());
        assert_eq!(feed.next_hand().unwrap(), FeedItem::Hand(None));
    }

    #[test]
    fn paced_feed_reports_pending_until_the_next_frame_is_due() {
        let mut rec = recording(true);
        rec.frame_interval_ms = 1_000;
        let mut feed = ReplayFeed::new(rec);
        feed.open().unwrap();
        assert!(matches!(feed.next_hand().unwrap(), FeedItem::Hand(Some(_))));
        let started = Instant::now();
        assert_eq!(feed.next_hand().unwrap(), FeedItem::Pending);
        assert!(started.elapsed() < Duration::from_millis(100));
        assert_eq!(feed.cursor(), 1);
    }

    #[test]
    fn oversized_frame_interval_is_invalid() {
        let mut rec = recording(false);
        rec.frame_interval_ms = MAX_FRAME_INTERVAL_MS;
        rec.validate().unwrap();
        rec.frame_interval_ms = MAX_FRAME_INTERVAL_MS + 1;
        assert!(matches!(rec.validate(), Err(TrackerError::ReplayInvalid(_))));
    }

    #[test]
    fn empty_and_non_finite_recordings_are_invalid() {
        let mut rec = recording(false);
        rec.frames[0].landmarks.as_mut().unwrap()[3][1] = f32::NAN;
        assert!(matches!(rec.validate(), Err(TrackerError::ReplayInvalid(_))));
        rec.frames.clear();
        assert!(matches!(rec.validate(), Err(TrackerError::ReplayInvalid(_))));
    }

    #[test]
    fn recorded_hand_has_expected_openness() {
        let hand = recording(false).hand(0).unwrap().unwrap();
        // pinch 0.223 over knuckle distance 0.2
        let openness = hand.openness().unwrap();
        assert!((openness - 0.918).abs() < 1e-2, "openness {openness}");
    }

    #[test]
    fn missing_fields_take_defaults() {
        let parsed: LandmarkRecording =
            serde_json::from_str(r#"{ "frames": [ {} ] }"#).unwrap();
        assert_eq!(parsed.frame_interval_ms, 33);
        assert!(!parsed.looped);
        assert_eq!(parsed.frames[0].landmarks, None);
    }
}
