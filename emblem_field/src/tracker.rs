//! Hand tracker lifecycle.
//!
//! A [`HandTracker`] owns whatever produces landmarks (camera + detector, a
//! recording, the keyboard) and exposes only the latest [`GestureSignal`].
//! Failures never reach the render loop: a tracker that cannot start reports
//! [`TrackerStatus::Unavailable`] and keeps publishing "no hand".

use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use thiserror::Error;

use crate::gesture::{GestureMailbox, GestureSignal, HandLandmarks};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(4);

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("camera unavailable: {0}")]
    CameraUnavailable(String),
    #[error("hand detector unavailable: {0}")]
    DetectorUnavailable(String),
    #[error("landmark detection failed: {0}")]
    Detection(String),
    #[error("reading landmark recording {path}: {source}")]
    ReplayIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("parsing landmark recording {path}: {source}")]
    ReplayParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid landmark recording: {0}")]
    ReplayInvalid(String),
    #[error("tracker is already running")]
    AlreadyRunning,
    #[error("spawning tracker thread: {0}")]
    Spawn(#[source] io::Error),
}

impl TrackerError {
    /// Fatal errors end the session; anything else only drops one frame.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, TrackerError::Detection(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TrackerStatus {
    #[default]
    Idle,
    Starting,
    Running,
    Stopped,
    Unavailable(String),
}

impl TrackerStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, TrackerStatus::Starting | TrackerStatus::Running)
    }
}

pub trait HandTracker {
    /// Begin producing signals. Returns once startup has been handed off;
    /// later failures show up in [`status`](Self::status).
    fn start(&mut self) -> Result<(), TrackerError>;
    /// Release the camera/detector. Idempotent.
    fn stop(&mut self);
    /// Most recent signal; [`GestureSignal::NONE`] while nothing is known.
    fn latest_signal(&self) -> GestureSignal;
    fn status(&self) -> TrackerStatus;
}

/// One poll of a landmark source.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedItem {
    /// A processed frame, with or without a hand in it.
    Hand(Option<HandLandmarks>),
    /// No new frame yet.
    Pending,
    /// The source has nothing more to give.
    Ended,
}

/// Blocking source of per-frame landmarks, driven from the tracker thread.
pub trait LandmarkFeed: Send + 'static {
    /// Acquire the device or input. Called once per session.
    fn open(&mut self) -> Result<(), TrackerError>;
    /// Next processed frame. Must not block for long; return
    /// [`FeedItem::Pending`] when nothing is ready so `stop` stays prompt.
    fn next_hand(&mut self) -> Result<FeedItem, TrackerError>;
    /// Release whatever `open` acquired. Called exactly once per `open`,
    /// including when `open` itself fails partway.
    fn close(&mut self) {}
}

#[derive(Debug, Default)]
struct Shared {
    mailbox: GestureMailbox,
    stop: AtomicBool,
    status: Mutex<TrackerStatus>,
}

impl Shared {
    fn status(&self) -> TrackerStatus {
        self.status
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn set_status(&self, status: TrackerStatus) {
        *self
            .status
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = status;
    }

    /// Moves an active status to `Stopped`; leaves `Unavailable` alone.
    fn settle_stopped(&self) {
        let mut status = self
            .status
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if status.is_active() {
            *status = TrackerStatus::Stopped;
        }
    }
}

/// Closes the feed when the session scope ends, however it ends.
struct OpenFeed<'a, F: LandmarkFeed>(&'a mut F);

impl<F: LandmarkFeed> Drop for OpenFeed<'_, F> {
    fn drop(&mut self) {
        self.0.close();
    }
}

/// Runs a [`LandmarkFeed`] on a background thread and publishes one
/// [`GestureSignal`] per processed frame.
pub struct ThreadedTracker<F: LandmarkFeed> {
    feed: Option<F>,
    worker: Option<JoinHandle<F>>,
    shared: Arc<Shared>,
    poll_interval: Duration,
    name: String,
}

impl<F: LandmarkFeed> ThreadedTracker<F> {
    pub fn new(feed: F) -> Self {
        Self {
            feed: Some(feed),
            worker: None,
            shared: Arc::new(Shared::default()),
            poll_interval: DEFAULT_POLL_INTERVAL,
            name: "emblem_tracker".to_string(),
        }
    }

    /// Sleep between polls that return [`FeedItem::Pending`].
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Number of signals published since construction.
    pub fn published(&self) -> u64 {
        self.shared.mailbox.publish_count()
    }

    /// The feed, when no session is running.
    pub fn feed(&self) -> Option<&F> {
        self.feed.as_ref()
    }

    /// Joins a worker whose session has already wound down.
    fn reap_finished(&mut self) {
        let finished = self.worker.as_ref().is_some_and(JoinHandle::is_finished);
        if finished || !self.shared.status().is_active() {
            self.join_worker();
        }
    }

    fn join_worker(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        match worker.join() {
            Ok(feed) => self.feed = Some(feed),
            Err(_) => {
                log::error!("[tracker] {} thread panicked; hand input disabled", self.name);
                self.shared
                    .set_status(TrackerStatus::Unavailable("tracker thread panicked".into()));
            }
        }
    }
}

impl<F: LandmarkFeed> HandTracker for ThreadedTracker<F> {
    fn start(&mut self) -> Result<(), TrackerError> {
        self.reap_finished();
        if self.worker.is_some() {
            return Err(TrackerError::AlreadyRunning);
        }
        let Some(feed) = self.feed.take() else {
            let reason = "landmark feed was lost".to_string();
            self.shared
                .set_status(TrackerStatus::Unavailable(reason.clone()));
            return Err(TrackerError::DetectorUnavailable(reason));
        };

        self.shared.stop.store(false, Ordering::SeqCst);
        self.shared.set_status(TrackerStatus::Starting);
        let shared = Arc::clone(&self.shared);
        let poll = self.poll_interval;
        let handle = thread::Builder::new()
            .name(self.name.clone())
            .spawn(move || run_session(feed, &shared, poll))
            .map_err(|err| {
                self.shared
                    .set_status(TrackerStatus::Unavailable(err.to_string()));
                TrackerError::Spawn(err)
            })?;
        self.worker = Some(handle);
        log::info!("[tracker] {} started", self.name);
        Ok(())
    }

    fn stop(&mut self) {
        if self.worker.is_none() {
            return;
        }
        self.shared.stop.store(true, Ordering::SeqCst);
        self.join_worker();
        self.shared.settle_stopped();
        self.shared.mailbox.publish(GestureSignal::NONE);
        log::info!("[tracker] {} stopped", self.name);
    }

    fn latest_signal(&self) -> GestureSignal {
        self.shared.mailbox.latest()
    }

    fn status(&self) -> TrackerStatus {
        self.shared.status()
    }
}

impl<F: LandmarkFeed> Drop for ThreadedTracker<F> {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_session<F: LandmarkFeed>(mut feed: F, shared: &Shared, poll: Duration) -> F {
    let mut session = OpenFeed(&mut feed);
    match session.0.open() {
        Ok(()) => {
            shared.set_status(TrackerStatus::Running);
            pump(&mut *session.0, shared, poll);
        }
        Err(err) => {
            log::warn!("[tracker] {err}; continuing without hand input");
            shared.set_status(TrackerStatus::Unavailable(err.to_string()));
            shared.mailbox.publish(GestureSignal::NONE);
        }
    }
    drop(session);
    feed
}

fn pump<F: LandmarkFeed>(feed: &mut F, shared: &Shared, poll: Duration) {
    while !shared.stop.load(Ordering::SeqCst) {
        match feed.next_hand() {
            Ok(FeedItem::Hand(hand)) => {
                shared.mailbox.publish(GestureSignal::from_hand(hand.as_ref()));
            }
            Ok(FeedItem::Pending) => thread::sleep(poll),
            Ok(FeedItem::Ended) => {
                log::info!("[tracker] landmark feed ended");
                shared.mailbox.publish(GestureSignal::NONE);
                shared.settle_stopped();
                return;
            }
            Err(err) if err.is_fatal() => {
                log::warn!("[tracker] {err}; hand input disabled");
                shared.set_status(TrackerStatus::Unavailable(err.to_string()));
                shared.mailbox.publish(GestureSignal::NONE);
                return;
            }
            Err(err) => {
                log::warn!("[tracker] dropping frame: {err}");
                shared.mailbox.publish(GestureSignal::NONE);
            }
        }
    }
}

/// Tracker driven by hand rather than by a camera: the viewer's keyboard
/// controls and tests set the signal directly through a [`ManualHand`].
#[derive(Debug, Default)]
pub struct ManualTracker {
    mailbox: Arc<GestureMailbox>,
    status: TrackerStatus,
}

/// Cloneable handle that feeds a [`ManualTracker`].
#[derive(Debug, Clone)]
pub struct ManualHand {
    mailbox: Arc<GestureMailbox>,
}

impl ManualHand {
    /// Report a visible hand with the given openness.
    pub fn show(&self, openness: f32) {
        self.mailbox.publish(GestureSignal::detected(openness));
    }

    pub fn hide(&self) {
        self.mailbox.publish(GestureSignal::NONE);
    }

    pub fn current(&self) -> GestureSignal {
        self.mailbox.latest()
    }
}

impl ManualTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hand(&self) -> ManualHand {
        ManualHand {
            mailbox: Arc::clone(&self.mailbox),
        }
    }
}

impl HandTracker for ManualTracker {
    fn start(&mut self) -> Result<(), TrackerError> {
        if self.status == TrackerStatus::Running {
            return Err(TrackerError::AlreadyRunning);
        }
        self.status = TrackerStatus::Running;
        Ok(())
    }

    fn stop(&mut self) {
        if self.status == TrackerStatus::Running {
            self.status = TrackerStatus::Stopped;
        }
    }

    fn latest_signal(&self) -> GestureSignal {
        if self.status == TrackerStatus::Running {
            self.mailbox.latest()
        } else {
            GestureSignal::NONE
        }
    }

    fn status(&self) -> TrackerStatus {
        self.status.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gesture::{INDEX_KNUCKLE, INDEX_TIP, LANDMARK_COUNT, Landmark};
    use std::collections::VecDeque;
    use std::time::Instant;

    fn hand(openness: f32) -> HandLandmarks {
        let mut points = [Landmark::default(); LANDMARK_COUNT];
        points[INDEX_KNUCKLE] = Landmark::new(0.0, 1.0);
        points[INDEX_TIP] = Landmark::new(0.0, openness + 0.2);
        HandLandmarks::from_points(&points).unwrap()
    }

    struct ScriptedFeed {
        open_error: Option<TrackerError>,
        script: VecDeque<Result<FeedItem, TrackerError>>,
        end_when_done: bool,
        closes: Arc<Mutex<u32>>,
    }

    impl ScriptedFeed {
        fn new(script: Vec<Result<FeedItem, TrackerError>>) -> Self {
            Self {
                open_error: None,
                script: script.into(),
                end_when_done: false,
                closes: Arc::default(),
            }
        }
    }

    impl LandmarkFeed for ScriptedFeed {
        fn open(&mut self) -> Result<(), TrackerError> {
            match self.open_error.take() {
                Some(err) => Err(err),
                None => Ok(()),
            }
        }

        fn next_hand(&mut self) -> Result<FeedItem, TrackerError> {
            match self.script.pop_front() {
                Some(item) => item,
                None if self.end_when_done => Ok(FeedItem::Ended),
                None => Ok(FeedItem::Pending),
            }
        }

        fn close(&mut self) {
            *self.closes.lock().unwrap() += 1;
        }
    }

    fn wait_until(mut cond: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !cond() {
            assert!(Instant::now() < deadline, "condition not reached in time");
            thread::sleep(Duration::from_millis(2));
        }
    }

    #[test]
    fn camera_failure_leaves_the_tracker_unavailable() {
        let mut feed = ScriptedFeed::new(Vec::new());
        feed.open_error = Some(TrackerError::CameraUnavailable("permission denied".into()));
        let closes = Arc::clone(&feed.closes);
        let mut tracker = ThreadedTracker::new(feed);
        tracker.start().unwrap();
        wait_until(|| matches!(tracker.status(), TrackerStatus::Unavailable(_)));
        assert_eq!(tracker.latest_signal(), GestureSignal::NONE);
        tracker.stop();
        assert!(matches!(tracker.status(), TrackerStatus::Unavailable(_)));
        assert_eq!(*closes.lock().unwrap(), 1);
    }

    /// Grabs a device handle, then fails to load its detector.
    #[derive(Default)]
    struct HalfOpenFeed {
        device_held: bool,
    }

    impl LandmarkFeed for HalfOpenFeed {
        fn open(&mut self) -> Result<(), TrackerError> {
            self.device_held = true;
            Err(TrackerError::DetectorUnavailable("model file missing".into()))
        }

        fn next_hand(&mut self) -> Result<FeedItem, TrackerError> {
            Ok(FeedItem::Pending)
        }

        fn close(&mut self) {
            self.device_held = false;
        }
    }

    #[test]
    fn failed_setup_still_releases_the_device() {
        let mut tracker = ThreadedTracker::new(HalfOpenFeed::default());
        tracker.start().unwrap();
        wait_until(|| matches!(tracker.status(), TrackerStatus::Unavailable(_)));
        tracker.stop();
        let feed = tracker.feed().expect("feed recovered after the session");
        assert!(!feed.device_held);
    }

    #[test]
    fn frames_are_published_in_order() {
        let feed = ScriptedFeed::new(vec![
            Ok(FeedItem::Hand(Some(hand(0.3)))),
            Ok(FeedItem::Hand(None)),
            Ok(FeedItem::Hand(Some(hand(0.9)))),
        ]);
        let closes = Arc::clone(&feed.closes);
        let mut tracker = ThreadedTracker::new(feed);
        tracker.start().unwrap();
        wait_until(|| tracker.published() >= 3);
        let latest = tracker.latest_signal();
        assert!(latest.detected);
        assert!((latest.openness - 0.9).abs() < 1e-5);
        assert_eq!(tracker.status(), TrackerStatus::Running);
        tracker.stop();
        assert_eq!(tracker.status(), TrackerStatus::Stopped);
        assert_eq!(tracker.latest_signal(), GestureSignal::NONE);
        assert_eq!(*closes.lock().unwrap(), 1);
    }

    #[test]
    fn detection_errors_drop_a_frame_but_keep_running() {
        let feed = ScriptedFeed::new(vec![
            Ok(FeedItem::Hand(Some(hand(0.5)))),
            Err(TrackerError::Detection("blurry frame".into())),
        ]);
        let mut tracker = ThreadedTracker::new(feed);
        tracker.start().unwrap();
        wait_until(|| tracker.published() >= 2);
        assert_eq!(tracker.latest_signal(), GestureSignal::NONE);
        assert_eq!(tracker.status(), TrackerStatus::Running);
    }

    #[test]
    fn fatal_errors_end_the_session_and_close_the_feed() {
        let feed = ScriptedFeed::new(vec![Err(TrackerError::DetectorUnavailable(
            "model missing".into(),
        ))]);
        let closes = Arc::clone(&feed.closes);
        let mut tracker = ThreadedTracker::new(feed);
        tracker.start().unwrap();
        wait_until(|| matches!(tracker.status(), TrackerStatus::Unavailable(_)));
        wait_until(|| *closes.lock().unwrap() == 1);
    }

    #[test]
    fn ended_feed_can_be_restarted() {
        let mut feed = ScriptedFeed::new(vec![Ok(FeedItem::Hand(Some(hand(0.4))))]);
        feed.end_when_done = true;
        let mut tracker = ThreadedTracker::new(feed);
        tracker.start().unwrap();
        wait_until(|| tracker.status() == TrackerStatus::Stopped);
        assert!(tracker.start().is_ok());
        tracker.stop();
        assert!(tracker.feed().is_some());
    }

    #[test]
    fn starting_twice_is_rejected() {
        let mut tracker = ThreadedTracker::new(ScriptedFeed::new(Vec::new()));
        tracker.start().unwrap();
        assert!(matches!(tracker.start(), Err(TrackerError::AlreadyRunning)));
        tracker.stop();
        tracker.stop();
    }

    #[test]
    fn manual_tracker_reports_only_while_running() {
        let mut tracker = ManualTracker::new();
        let hand = tracker.hand();
        hand.show(0.6);
        assert_eq!(tracker.latest_signal(), GestureSignal::NONE);
        tracker.start().unwrap();
        assert_eq!(tracker.latest_signal(), GestureSignal::detected(0.6));
        hand.hide();
        assert!(!tracker.latest_signal().detected);
        tracker.stop();
        assert_eq!(tracker.status(), TrackerStatus::Stopped);
    }
}
