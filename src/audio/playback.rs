//! Gapless playback scheduling for agent audio
//!
//! Decoded buffers from the agent are scheduled back-to-back on a single
//! output-clock cursor: `start = max(now, next_start)`, then the cursor
//! advances by the buffer duration. No two buffers overlap and buffers
//! play in enqueue order.
//!
//! The "agent is speaking" signal is tracked with a reference count of
//! in-flight buffers rather than a timer, so a burst that keeps arriving
//! while earlier audio is still playing never drops the flag early. The
//! flag rises on the first buffer of a burst and falls only when the count
//! returns to zero, after a short grace window.

use crate::session::{SessionEvent, SessionState};
use anyhow::{anyhow, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc as std_mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Grace before the speaking flag drops after the last buffer finishes.
/// Absorbs the inter-chunk gap of a continuing burst.
const SPEAKING_GRACE: Duration = Duration::from_millis(200);

/// A scheduled slot on the output timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackEntry {
    /// Scheduled start, relative to the output clock's origin
    pub start: Duration,
    /// Buffer duration at the output sample rate
    pub duration: Duration,
}

impl PlaybackEntry {
    pub fn end(&self) -> Duration {
        self.start + self.duration
    }
}

/// Clock for the playout timeline. Real playback runs on a monotonic
/// clock; tests drive a manual one.
pub trait OutputClock: Send + Sync {
    fn now(&self) -> Duration;
}

/// Monotonic clock anchored at construction time.
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputClock for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Sink for scheduled samples. The real implementation drains into a cpal
/// output stream; tests record what was scheduled.
pub trait AudioOutput: Send + Sync {
    fn play(&self, samples: Vec<f32>, entry: PlaybackEntry);

    /// Discard everything scheduled and stop playout.
    fn stop(&self);
}

struct Cursor {
    next_start: Option<Duration>,
}

/// Schedules agent audio buffers gaplessly and owns the speaking signal.
pub struct PlaybackScheduler {
    clock: Arc<dyn OutputClock>,
    output: Arc<dyn AudioOutput>,
    sample_rate: u32,
    state: Arc<SessionState>,
    events: mpsc::UnboundedSender<SessionEvent>,
    cursor: Mutex<Cursor>,
    in_flight: AtomicUsize,
}

impl PlaybackScheduler {
    pub fn new(
        clock: Arc<dyn OutputClock>,
        output: Arc<dyn AudioOutput>,
        sample_rate: u32,
        state: Arc<SessionState>,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> Arc<Self> {
        Arc::new(Self {
            clock,
            output,
            sample_rate,
            state,
            events,
            cursor: Mutex::new(Cursor { next_start: None }),
            in_flight: AtomicUsize::new(0),
        })
    }

    /// Schedule a decoded buffer for playout immediately after everything
    /// already scheduled. Returns the slot it was given, or `None` if the
    /// buffer was empty or the session is closed.
    pub fn enqueue(self: &Arc<Self>, samples: Vec<f32>) -> Option<PlaybackEntry> {
        if samples.is_empty() || self.state.is_closed() {
            return None;
        }

        let duration = Duration::from_secs_f64(samples.len() as f64 / self.sample_rate as f64);

        let entry = {
            let mut cursor = match self.cursor.lock() {
                Ok(cursor) => cursor,
                Err(poisoned) => poisoned.into_inner(),
            };
            let now = self.clock.now();
            let start = match cursor.next_start {
                Some(next_start) => next_start.max(now),
                None => now,
            };
            cursor.next_start = Some(start + duration);
            PlaybackEntry { start, duration }
        };

        // Raise the speaking flag before the first sample can play.
        if self.in_flight.fetch_add(1, Ordering::SeqCst) == 0 {
            self.state.set_agent_speaking(true);
        }

        self.output.play(samples, entry);

        // Watcher drops the refcount once this slot has fully played out.
        let scheduler = Arc::clone(self);
        tokio::spawn(async move {
            let wait = entry.end().saturating_sub(scheduler.clock.now()) + SPEAKING_GRACE;
            tokio::time::sleep(wait).await;
            scheduler.complete_one();
        });

        Some(entry)
    }

    /// Mark one in-flight buffer as finished. When the count returns to
    /// zero the speaking flag drops and the engine is told the floor has
    /// passed back to the candidate.
    pub fn complete_one(&self) {
        let prev = self
            .in_flight
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if prev == Ok(1) && !self.state.is_closed() {
            self.state.set_agent_speaking(false);
            let _ = self.events.send(SessionEvent::PlayoutFinished);
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Stop all in-flight playback and clear the speaking flag. Called on
    /// session teardown after the state is marked closed.
    pub fn stop(&self) {
        self.output.stop();
        self.in_flight.store(0, Ordering::SeqCst);
        self.state.set_agent_speaking(false);
    }
}

struct OutputWorker {
    stop_tx: std_mpsc::Sender<()>,
    handle: thread::JoinHandle<()>,
}

/// Speaker sink backed by a cpal output stream on its own thread. Buffers
/// are appended to a FIFO the device callback drains in real time; the
/// callback emits silence on underrun. Since scheduled starts are
/// back-to-back, FIFO order realizes the schedule.
pub struct CpalOutput {
    queue: Arc<Mutex<VecDeque<f32>>>,
    worker: Mutex<Option<OutputWorker>>,
}

impl CpalOutput {
    pub fn start(sample_rate: u32) -> Result<Arc<Self>> {
        let queue: Arc<Mutex<VecDeque<f32>>> = Arc::new(Mutex::new(VecDeque::new()));
        let (stop_tx, stop_rx) = std_mpsc::channel::<()>();
        let (ready_tx, ready_rx) = std_mpsc::channel::<Result<()>>();

        let callback_queue = Arc::clone(&queue);
        let handle = thread::spawn(move || {
            let stream = match build_output_stream(sample_rate, callback_queue) {
                Ok(stream) => {
                    let _ = ready_tx.send(Ok(()));
                    stream
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };

            let _ = stop_rx.recv();
            drop(stream);
            info!("Playback device released");
        });

        match ready_rx.recv() {
            Ok(Ok(())) => {
                info!("Speaker playout started ({}Hz)", sample_rate);
                Ok(Arc::new(Self {
                    queue,
                    worker: Mutex::new(Some(OutputWorker { stop_tx, handle })),
                }))
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(anyhow!("playback thread exited before reporting readiness")),
        }
    }
}

impl AudioOutput for CpalOutput {
    fn play(&self, samples: Vec<f32>, _entry: PlaybackEntry) {
        if let Ok(mut queue) = self.queue.lock() {
            queue.extend(samples);
        }
    }

    fn stop(&self) {
        if let Ok(mut queue) = self.queue.lock() {
            queue.clear();
        }
        let worker = match self.worker.lock() {
            Ok(mut worker) => worker.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(worker) = worker {
            let _ = worker.stop_tx.send(());
            if worker.handle.join().is_err() {
                warn!("playback thread panicked during shutdown");
            }
        }
    }
}

impl Drop for CpalOutput {
    fn drop(&mut self) {
        self.stop();
    }
}

fn build_output_stream(
    sample_rate: u32,
    queue: Arc<Mutex<VecDeque<f32>>>,
) -> Result<cpal::Stream> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| anyhow!("no default output device found"))?;

    let stream_config = cpal::StreamConfig {
        channels: 1,
        sample_rate: cpal::SampleRate(sample_rate),
        buffer_size: cpal::BufferSize::Default,
    };

    let stream = device.build_output_stream(
        &stream_config,
        move |out: &mut [f32], _: &cpal::OutputCallbackInfo| {
            let mut queue = match queue.lock() {
                Ok(queue) => queue,
                Err(poisoned) => poisoned.into_inner(),
            };
            for slot in out.iter_mut() {
                *slot = queue.pop_front().unwrap_or(0.0);
            }
        },
        move |err| {
            warn!("playback stream error: {}", err);
        },
        None,
    )?;

    stream.play()?;

    Ok(stream)
}
