//! Microphone capture source
//!
//! Pulls fixed-size blocks from the default input device via cpal and
//! forwards them as encoded PCM16 frames. The cpal stream lives on a
//! dedicated thread because streams are not `Send`; stopping the source
//! joins that thread, which drops the stream and releases the device on
//! every exit path.
//!
//! Suppression policy: while the session is closed or muted, or the agent
//! is speaking, captured blocks are dropped rather than buffered. No
//! backlog is ever built up, so the agent can never hear a delayed replay
//! of itself. Likewise a full forwarding channel drops the frame (capture
//! overrun favors latency over completeness).

use crate::audio::codec;
use crate::session::SessionState;
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::mpsc as std_mpsc;
use std::sync::Arc;
use std::thread;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// One block of captured candidate audio, encoded and ready for the
/// transport. Immutable once created; ownership passes to the consumer.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// PCM16-LE bytes
    pub pcm: Vec<u8>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels (always 1 for the exam session)
    pub channels: u16,
    /// When the block was captured
    pub captured_at: DateTime<Utc>,
}

/// Configuration for the microphone capture source.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Capture sample rate (the agent expects 16kHz input)
    pub sample_rate: u32,
    /// Channel count (1 = mono)
    pub channels: u16,
    /// Samples per forwarded block
    pub block_size: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            channels: 1,
            block_size: 4096,
        }
    }
}

/// Decide whether a captured block may be forwarded.
///
/// Kept as a free function over the shared state so the suppression rule
/// is testable without a device.
pub fn should_forward(state: &SessionState) -> bool {
    !state.is_closed() && !state.is_muted() && !state.is_agent_speaking()
}

struct CaptureWorker {
    stop_tx: std_mpsc::Sender<()>,
    handle: thread::JoinHandle<()>,
}

/// Microphone capture source. Owns the input device exclusively between
/// `start()` and `stop()`.
pub struct AudioCaptureSource {
    config: CaptureConfig,
    state: Arc<SessionState>,
    worker: Option<CaptureWorker>,
}

impl AudioCaptureSource {
    pub fn new(config: CaptureConfig, state: Arc<SessionState>) -> Self {
        Self {
            config,
            state,
            worker: None,
        }
    }

    pub fn is_capturing(&self) -> bool {
        self.worker.is_some()
    }

    /// Start capturing. Returns a channel receiver that will receive one
    /// frame per block; frames arrive in capture order.
    pub fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        if self.worker.is_some() {
            return Err(anyhow!("capture already started"));
        }

        // Bounded: an overrun drops frames instead of queueing them.
        let (frame_tx, frame_rx) = mpsc::channel::<AudioFrame>(32);
        let (stop_tx, stop_rx) = std_mpsc::channel::<()>();
        let (ready_tx, ready_rx) = std_mpsc::channel::<Result<()>>();

        let config = self.config.clone();
        let state = Arc::clone(&self.state);

        let handle = thread::spawn(move || {
            let stream = match build_input_stream(&config, state, frame_tx) {
                Ok(stream) => {
                    let _ = ready_tx.send(Ok(()));
                    stream
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };

            // Park until stop is requested or the source is dropped, then
            // release the device by dropping the stream.
            let _ = stop_rx.recv();
            drop(stream);
            info!("Capture device released");
        });

        match ready_rx.recv() {
            Ok(Ok(())) => {
                info!(
                    "Microphone capture started ({}Hz, {} samples/block)",
                    self.config.sample_rate, self.config.block_size
                );
                self.worker = Some(CaptureWorker { stop_tx, handle });
                Ok(frame_rx)
            }
            Ok(Err(e)) => {
                Err(e).context("failed to open the microphone device")
            }
            Err(_) => Err(anyhow!("capture thread exited before reporting readiness")),
        }
    }

    /// Stop capturing and release the device. Safe to call when not
    /// capturing; never leaves the device held after returning.
    pub fn stop(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.stop_tx.send(());
            if worker.handle.join().is_err() {
                warn!("capture thread panicked during shutdown");
            }
            info!("Microphone capture stopped");
        }
    }
}

impl Drop for AudioCaptureSource {
    fn drop(&mut self) {
        self.stop();
    }
}

fn build_input_stream(
    config: &CaptureConfig,
    state: Arc<SessionState>,
    frame_tx: mpsc::Sender<AudioFrame>,
) -> Result<cpal::Stream> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| anyhow!("no default input device found"))?;

    let stream_config = cpal::StreamConfig {
        channels: config.channels,
        sample_rate: cpal::SampleRate(config.sample_rate),
        buffer_size: cpal::BufferSize::Default,
    };

    let sample_rate = config.sample_rate;
    let channels = config.channels;
    let block_size = config.block_size;
    let mut block: Vec<f32> = Vec::with_capacity(block_size);

    let stream = device.build_input_stream(
        &stream_config,
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
            if !should_forward(&state) {
                // Discard any partial block too: stale audio from before
                // the agent took the floor must not leak out later.
                block.clear();
                return;
            }

            for &sample in data {
                block.push(sample);
                if block.len() == block_size {
                    let frame = AudioFrame {
                        pcm: codec::encode(&block),
                        sample_rate,
                        channels,
                        captured_at: Utc::now(),
                    };
                    // Overrun: drop the frame, never block the callback.
                    let _ = frame_tx.try_send(frame);
                    block.clear();
                }
            }
        },
        move |err| {
            warn!("capture stream error: {}", err);
        },
        None,
    )?;

    stream.play()?;

    Ok(stream)
}
