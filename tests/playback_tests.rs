// Tests for the playback scheduler: the no-overlap cursor invariant, the
// refcounted speaking flag, and teardown behavior. A manual clock and a
// recording output stand in for the real device.

use exam_room::{
    AudioOutput, OutputClock, PlaybackEntry, PlaybackScheduler, SessionEvent, SessionState,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

struct ManualClock {
    now: Mutex<Duration>,
}

impl ManualClock {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            now: Mutex::new(Duration::ZERO),
        })
    }

    fn advance(&self, by: Duration) {
        *self.now.lock().unwrap() += by;
    }
}

impl OutputClock for ManualClock {
    fn now(&self) -> Duration {
        *self.now.lock().unwrap()
    }
}

#[derive(Default)]
struct RecordingOutput {
    scheduled: Mutex<Vec<(usize, PlaybackEntry)>>,
    stopped: AtomicBool,
}

impl RecordingOutput {
    fn entries(&self) -> Vec<PlaybackEntry> {
        self.scheduled.lock().unwrap().iter().map(|(_, e)| *e).collect()
    }
}

impl AudioOutput for RecordingOutput {
    fn play(&self, samples: Vec<f32>, entry: PlaybackEntry) {
        self.scheduled.lock().unwrap().push((samples.len(), entry));
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}

struct Harness {
    clock: Arc<ManualClock>,
    output: Arc<RecordingOutput>,
    state: Arc<SessionState>,
    scheduler: Arc<PlaybackScheduler>,
    events: mpsc::UnboundedReceiver<SessionEvent>,
}

fn harness(sample_rate: u32) -> Harness {
    let clock = ManualClock::new();
    let output = Arc::new(RecordingOutput::default());
    let state = Arc::new(SessionState::new());
    let (tx, rx) = mpsc::unbounded_channel();
    let scheduler = PlaybackScheduler::new(
        clock.clone(),
        output.clone(),
        sample_rate,
        state.clone(),
        tx,
    );
    Harness {
        clock,
        output,
        state,
        scheduler,
        events: rx,
    }
}

// 24000 samples at 24kHz = 1 second per buffer.
fn one_second_buffer() -> Vec<f32> {
    vec![0.1; 24000]
}

#[tokio::test]
async fn test_buffers_never_overlap_and_keep_order() {
    let h = harness(24000);

    for _ in 0..5 {
        h.scheduler.enqueue(one_second_buffer()).unwrap();
    }

    let entries = h.output.entries();
    assert_eq!(entries.len(), 5);
    for pair in entries.windows(2) {
        assert!(
            pair[1].start >= pair[0].end(),
            "entry at {:?} overlaps previous ending at {:?}",
            pair[1].start,
            pair[0].end()
        );
    }
}

#[tokio::test]
async fn test_back_to_back_scheduling_is_gapless_when_audio_arrives_fast() {
    let h = harness(24000);

    h.scheduler.enqueue(one_second_buffer()).unwrap();
    h.scheduler.enqueue(one_second_buffer()).unwrap();
    h.scheduler.enqueue(one_second_buffer()).unwrap();

    let entries = h.output.entries();
    assert_eq!(entries[1].start, entries[0].end());
    assert_eq!(entries[2].start, entries[1].end());
}

#[tokio::test]
async fn test_cursor_catches_up_after_a_silent_gap() {
    let h = harness(24000);

    let first = h.scheduler.enqueue(one_second_buffer()).unwrap();
    assert_eq!(first.start, Duration::ZERO);

    // The burst ended long ago; the next buffer starts "now", not at the
    // stale cursor.
    h.clock.advance(Duration::from_secs(10));
    let second = h.scheduler.enqueue(one_second_buffer()).unwrap();

    assert_eq!(second.start, Duration::from_secs(10));
}

#[tokio::test]
async fn test_speaking_flag_follows_in_flight_refcount() {
    let h = harness(24000);
    assert!(!h.state.is_agent_speaking());

    h.scheduler.enqueue(one_second_buffer()).unwrap();
    assert!(h.state.is_agent_speaking());

    h.scheduler.enqueue(one_second_buffer()).unwrap();
    assert_eq!(h.scheduler.in_flight(), 2);

    // First buffer ends while the second is still playing: still speaking.
    h.scheduler.complete_one();
    assert!(h.state.is_agent_speaking());

    // Last buffer ends: flag drops and the engine learns the floor passed.
    h.scheduler.complete_one();
    assert!(!h.state.is_agent_speaking());
}

#[tokio::test]
async fn test_playout_finished_event_emitted_once_per_burst() {
    let mut h = harness(24000);

    h.scheduler.enqueue(one_second_buffer()).unwrap();
    h.scheduler.enqueue(one_second_buffer()).unwrap();
    h.scheduler.complete_one();
    h.scheduler.complete_one();

    assert!(matches!(
        h.events.try_recv(),
        Ok(SessionEvent::PlayoutFinished)
    ));
    assert!(h.events.try_recv().is_err(), "only one event per burst");
}

#[tokio::test]
async fn test_empty_buffer_is_not_scheduled() {
    let h = harness(24000);

    assert!(h.scheduler.enqueue(Vec::new()).is_none());
    assert!(h.output.entries().is_empty());
    assert!(!h.state.is_agent_speaking());
}

#[tokio::test]
async fn test_closed_session_rejects_new_audio() {
    let h = harness(24000);

    h.state.close();

    assert!(h.scheduler.enqueue(one_second_buffer()).is_none());
    assert!(h.output.entries().is_empty());
}

#[tokio::test]
async fn test_stop_clears_speaking_and_flushes_output() {
    let h = harness(24000);

    h.scheduler.enqueue(one_second_buffer()).unwrap();
    assert!(h.state.is_agent_speaking());

    h.scheduler.stop();

    assert!(!h.state.is_agent_speaking());
    assert_eq!(h.scheduler.in_flight(), 0);
    assert!(h.output.stopped.load(Ordering::SeqCst));
}
