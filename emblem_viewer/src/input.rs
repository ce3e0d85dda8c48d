use anyhow::{Context, Result};
use emblem_field::{
    GestureSignal, HandTracker, ManualHand, ManualTracker, ReplayFeed, ThreadedTracker,
    TrackerError, TrackerStatus,
};

use crate::cli::Args;

/// Hand source chosen on the command line.
pub enum GestureInput {
    Simulated(ManualTracker),
    Replay(ThreadedTracker<ReplayFeed>),
}

impl GestureInput {
    /// Recording when `--replay` is given, keyboard/flag-driven hand otherwise.
    /// The simulated hand's handle is returned alongside.
    pub fn from_args(args: &Args) -> Result<(Self, Option<ManualHand>)> {
        match args.replay.as_ref() {
            Some(path) => {
                let feed = ReplayFeed::from_file(path)
                    .with_context(|| format!("loading landmark recording {}", path.display()))?;
                log::info!("[viewer] replaying hand landmarks from {}", path.display());
                let tracker = ThreadedTracker::new(feed).with_thread_name("emblem_replay");
                Ok((GestureInput::Replay(tracker), None))
            }
            None => {
                let tracker = ManualTracker::new();
                let hand = tracker.hand();
                if let Some(openness) = args.hand {
                    hand.show(openness);
                }
                Ok((GestureInput::Simulated(tracker), Some(hand)))
            }
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            GestureInput::Simulated(_) => "simulated hand",
            GestureInput::Replay(_) => "landmark replay",
        }
    }

    pub fn is_replay(&self) -> bool {
        matches!(self, GestureInput::Replay(_))
    }
}

impl HandTracker for GestureInput {
    fn start(&mut self) -> Result<(), TrackerError> {
        match self {
            GestureInput::Simulated(tracker) => tracker.start(),
            GestureInput::Replay(tracker) => tracker.start(),
        }
    }

    fn stop(&mut self) {
        match self {
            GestureInput::Simulated(tracker) => tracker.stop(),
            GestureInput::Replay(tracker) => tracker.stop(),
        }
    }

    fn latest_signal(&self) -> GestureSignal {
        match self {
            GestureInput::Simulated(tracker) => tracker.latest_signal(),
            GestureInput::Replay(tracker) => tracker.latest_signal(),
        }
    }

    fn status(&self) -> TrackerStatus {
        match self {
            GestureInput::Simulated(tracker) => tracker.status(),
            GestureInput::Replay(tracker) => tracker.status(),
        }
    }
}
