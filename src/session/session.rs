//! Exam session orchestration
//!
//! One `ExamSession` per exam attempt. Every asynchronous source (the
//! transport reader, the capture forwarder, the 1Hz timer, the playback
//! watchers) posts typed events onto a single ordered queue consumed by
//! the engine task, which is the sole writer of phase and timer state.

use super::config::SessionConfig;
use super::instructions;
use super::phase::PhaseStateMachine;
use super::state::SessionState;
use super::timer::TurnTimer;
use super::transcript::{TranscriptAccumulator, TranscriptEvent};
use crate::audio::{
    codec, AudioCaptureSource, AudioOutput, CaptureConfig, CpalOutput, MonotonicClock,
    PlaybackScheduler,
};
use crate::config::Config;
use crate::transport::{LiveTransport, TransportConfig};
use anyhow::{Context, Result};
use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Everything the engine task can receive. Queue order is consumption
/// order; the transport's reader pushes its events in network order.
#[derive(Debug)]
pub enum SessionEvent {
    /// Decoded-from-base64 PCM16 audio from the agent
    AgentAudio(Vec<u8>),
    /// One transcript fragment, either leg
    Transcript(TranscriptEvent),
    /// 1Hz timer tick
    Tick,
    /// All scheduled agent audio finished playing
    PlayoutFinished,
    /// The transport reader ended (remote close or network error)
    TransportClosed,
    /// Explicit session-finish request from the host
    Finish,
}

/// A live exam attempt: capture, transport, playback, phase machine, and
/// transcript, wired together and torn down as a unit.
pub struct ExamSession {
    config: SessionConfig,
    examiner_name: String,
    state: Arc<SessionState>,
    transport: Arc<LiveTransport>,
    scheduler: Arc<PlaybackScheduler>,
    transcript: Arc<Mutex<TranscriptAccumulator>>,
    capture: Mutex<AudioCaptureSource>,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    events_rx: Mutex<Option<mpsc::UnboundedReceiver<SessionEvent>>>,
    engine_handle: Mutex<Option<JoinHandle<()>>>,
    forward_handle: Mutex<Option<JoinHandle<()>>>,
    timer: Mutex<Option<TurnTimer>>,
    done: Arc<Notify>,
    started_at: chrono::DateTime<Utc>,
}

impl ExamSession {
    /// Establish the agent channel and open the playout device. Any
    /// failure here is a setup failure: the attempt never starts and the
    /// error is terminal (the host may offer a retry).
    pub async fn connect(app: &Config, config: SessionConfig, api_key: String) -> Result<Self> {
        info!("Creating exam session: {}", config.session_id);

        let state = Arc::new(SessionState::new());
        let (events_tx, events_rx) = mpsc::unbounded_channel::<SessionEvent>();

        let system_instruction =
            instructions::build_system_instruction(&config, &app.exam.examiner_name);

        let transport = LiveTransport::connect(
            TransportConfig {
                url: app.agent.url.clone(),
                api_key,
                model: app.agent.model.clone(),
                voice: app.agent.voice.clone(),
                system_instruction,
                connect_timeout: Duration::from_secs(app.agent.connect_timeout_secs),
            },
            events_tx.clone(),
        )
        .await
        .context("failed to establish the agent session")?;

        let output: Arc<dyn AudioOutput> = CpalOutput::start(app.audio.output_sample_rate)
            .context("failed to open the playback device")?;

        let scheduler = PlaybackScheduler::new(
            Arc::new(MonotonicClock::new()),
            output,
            app.audio.output_sample_rate,
            Arc::clone(&state),
            events_tx.clone(),
        );

        let capture = AudioCaptureSource::new(
            CaptureConfig {
                sample_rate: app.audio.input_sample_rate,
                channels: app.audio.channels,
                block_size: app.audio.block_size,
            },
            Arc::clone(&state),
        );

        Ok(Self {
            config,
            examiner_name: app.exam.examiner_name.clone(),
            state,
            transport,
            scheduler,
            transcript: Arc::new(Mutex::new(TranscriptAccumulator::new())),
            capture: Mutex::new(capture),
            events_tx,
            events_rx: Mutex::new(Some(events_rx)),
            engine_handle: Mutex::new(None),
            forward_handle: Mutex::new(None),
            timer: Mutex::new(None),
            done: Arc::new(Notify::new()),
            started_at: Utc::now(),
        })
    }

    pub fn session_id(&self) -> &str {
        &self.config.session_id
    }

    pub fn state(&self) -> &Arc<SessionState> {
        &self.state
    }

    /// Toggle the candidate's microphone without touching the device.
    pub fn set_muted(&self, muted: bool) {
        self.state.set_muted(muted);
    }

    /// Start the microphone, the engine, and the turn timer.
    pub async fn start(&self) -> Result<()> {
        let events_rx = self
            .events_rx
            .lock()
            .await
            .take()
            .context("session already started")?;

        info!("Starting exam session: {}", self.config.session_id);

        // Capture forwarder: device blocks -> transport, dropped whenever
        // the suppression rules say so (handled inside the capture source).
        let frame_rx = self
            .capture
            .lock()
            .await
            .start()
            .context("failed to start audio capture")?;
        let forward = tokio::spawn(forward_loop(
            frame_rx,
            Arc::clone(&self.transport),
            Arc::clone(&self.state),
        ));
        *self.forward_handle.lock().await = Some(forward);

        // Engine: sole consumer of the event queue, sole writer of phase
        // and timer state.
        let engine = tokio::spawn(engine_loop(EngineContext {
            events_rx,
            phases: PhaseStateMachine::new(&self.examiner_name, Instant::now()),
            state: Arc::clone(&self.state),
            transport: Arc::clone(&self.transport),
            scheduler: Arc::clone(&self.scheduler),
            transcript: Arc::clone(&self.transcript),
            done: Arc::clone(&self.done),
        }));
        *self.engine_handle.lock().await = Some(engine);

        *self.timer.lock().await = Some(TurnTimer::start(self.events_tx.clone()));

        info!("Exam session started");

        Ok(())
    }

    /// Resolves once the session has ended, whether by host request or a
    /// mid-session transport close.
    pub async fn done(&self) {
        let notified = self.done.notified();
        if self.state.is_closed() {
            return;
        }
        notified.await;
    }

    /// End the attempt and release every resource, in order: mark closed,
    /// stop the capture device, stop the timer, close the transport, stop
    /// in-flight playback. Idempotent. Returns the full transcript for
    /// the host to hand to the scoring service.
    pub async fn stop(&self) -> Result<String> {
        if self.state.close() {
            info!("Stopping exam session: {}", self.config.session_id);
        }

        self.capture.lock().await.stop();

        if let Some(mut timer) = self.timer.lock().await.take() {
            timer.stop();
        }

        // Wake the engine so it observes the closed flag and exits.
        let _ = self.events_tx.send(SessionEvent::Finish);

        self.transport.close().await;
        self.scheduler.stop();

        if let Some(handle) = self.engine_handle.lock().await.take() {
            if let Err(e) = handle.await {
                error!("engine task panicked: {}", e);
            }
        }
        if let Some(handle) = self.forward_handle.lock().await.take() {
            if let Err(e) = handle.await {
                error!("capture forwarder panicked: {}", e);
            }
        }

        let transcript = self.transcript.lock().await.full_text();

        let elapsed = Utc::now().signed_duration_since(self.started_at);
        info!(
            "Exam session ended after {:.1}s ({} transcript bytes)",
            elapsed.num_milliseconds() as f64 / 1000.0,
            transcript.len()
        );

        Ok(transcript)
    }

    /// Accumulated transcript so far, without ending the session.
    pub async fn transcript_text(&self) -> String {
        self.transcript.lock().await.full_text()
    }
}

struct EngineContext {
    events_rx: mpsc::UnboundedReceiver<SessionEvent>,
    phases: PhaseStateMachine,
    state: Arc<SessionState>,
    transport: Arc<LiveTransport>,
    scheduler: Arc<PlaybackScheduler>,
    transcript: Arc<Mutex<TranscriptAccumulator>>,
    done: Arc<Notify>,
}

async fn engine_loop(mut ctx: EngineContext) {
    info!("Session engine started");

    while let Some(event) = ctx.events_rx.recv().await {
        if ctx.state.is_closed() {
            break;
        }

        match event {
            SessionEvent::AgentAudio(pcm) => match codec::decode(&pcm) {
                Ok(samples) => {
                    ctx.phases.on_agent_audio(Instant::now());
                    let _ = ctx.scheduler.enqueue(samples);
                }
                Err(e) => {
                    warn!("dropping malformed agent audio: {}", e);
                }
            },
            SessionEvent::Transcript(event) => {
                let nudge = ctx
                    .phases
                    .on_transcript(event.speaker, &event.text, Instant::now());
                ctx.transcript.lock().await.append(event);
                if let Some(nudge) = nudge {
                    send_nudge(&ctx.transport, nudge.text);
                }
            }
            SessionEvent::Tick => {
                let nudge = ctx
                    .phases
                    .on_tick(Instant::now(), ctx.state.is_agent_speaking());
                if let Some(nudge) = nudge {
                    send_nudge(&ctx.transport, nudge.text);
                }
            }
            SessionEvent::PlayoutFinished => {
                ctx.phases.on_playout_finished(Instant::now());
            }
            SessionEvent::TransportClosed => {
                warn!("agent connection ended mid-session");
                break;
            }
            SessionEvent::Finish => {
                ctx.phases.finish();
                break;
            }
        }
    }

    info!("Session engine stopped");
    ctx.state.close();
    ctx.done.notify_waiters();
}

/// Nudges go out on their own task: inbound event handling must never
/// block on an outbound send.
fn send_nudge(transport: &Arc<LiveTransport>, text: String) {
    let transport = Arc::clone(transport);
    tokio::spawn(async move {
        if let Err(e) = transport.send_control(&text).await {
            warn!("failed to deliver control nudge: {}", e);
        }
    });
}

async fn forward_loop(
    mut frame_rx: mpsc::Receiver<crate::audio::AudioFrame>,
    transport: Arc<LiveTransport>,
    state: Arc<SessionState>,
) {
    info!("Capture forwarder started");

    while let Some(frame) = frame_rx.recv().await {
        if state.is_closed() {
            break;
        }
        if let Err(e) = transport.send(&frame).await {
            error!("failed to forward audio frame: {}", e);
        }
    }

    info!("Capture forwarder stopped");
}
