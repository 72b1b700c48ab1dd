//! Live agent transport
//!
//! Owns the WebSocket connection to the conversational agent endpoint:
//! sends captured audio frames and advisory control notes, and delivers
//! inbound audio and transcript events onto the session's ordered event
//! queue. Events are dispatched in the order frames arrive from the
//! network; the reader task is the only reader, so no reordering can
//! happen. Connect failure is fatal to the exam attempt; a mid-session
//! close ends the session but leaves the accumulated transcript intact.

use crate::audio::AudioFrame;
use crate::session::{SessionEvent, Speaker, TranscriptEvent};
use crate::transport::messages::{
    ClientContentMessage, RealtimeInputMessage, ServerMessage, SetupMessage,
};
use anyhow::{Context, Result};
use base64::Engine;
use chrono::Utc;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{error, info, warn};

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsSource = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// Connect-time parameters for the agent channel.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// WebSocket endpoint, without the key query parameter
    pub url: String,
    pub api_key: String,
    pub model: String,
    pub voice: String,
    /// Phase-aware examiner instructions
    pub system_instruction: String,
    pub connect_timeout: Duration,
}

/// The connection to the external conversational agent.
pub struct LiveTransport {
    writer: Mutex<WsSink>,
    reader_handle: Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl LiveTransport {
    /// Establish the channel and send the session setup. The returned
    /// transport is already delivering inbound events onto `events`.
    pub async fn connect(
        config: TransportConfig,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> Result<Arc<Self>> {
        let url = format!("{}?key={}", config.url, config.api_key);
        info!("Connecting to live agent at {}", config.url);

        let (ws, _response) = tokio::time::timeout(config.connect_timeout, connect_async(url))
            .await
            .context("timed out connecting to the live agent")?
            .context("failed to connect to the live agent")?;

        let (mut writer, reader) = ws.split();

        let setup = SetupMessage::new(&config.model, &config.voice, &config.system_instruction);
        let payload = serde_json::to_string(&setup)?;
        writer
            .send(Message::Text(payload))
            .await
            .context("failed to send session setup")?;

        info!("Live agent session configured (model={})", config.model);

        let transport = Arc::new(Self {
            writer: Mutex::new(writer),
            reader_handle: Mutex::new(None),
            closed: AtomicBool::new(false),
        });

        let handle = tokio::spawn(read_loop(reader, events));
        *transport.reader_handle.lock().await = Some(handle);

        Ok(transport)
    }

    /// Forward a captured audio frame. Silently dropped (not queued) once
    /// the transport is closed.
    pub async fn send(&self, frame: &AudioFrame) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Ok(());
        }

        let message = RealtimeInputMessage::audio_chunk(&frame.pcm, frame.sample_rate);
        let payload = serde_json::to_string(&message)?;

        let mut writer = self.writer.lock().await;
        writer
            .send(Message::Text(payload))
            .await
            .context("failed to send audio frame")?;

        Ok(())
    }

    /// Send an advisory control note as a synthetic user-role message.
    /// No-op after close; nudges are advisory and losing one is fine.
    pub async fn send_control(&self, text: &str) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Ok(());
        }

        info!("Sending control note: {}", text);

        let message = ClientContentMessage::system_note(text);
        let payload = serde_json::to_string(&message)?;

        let mut writer = self.writer.lock().await;
        writer
            .send(Message::Text(payload))
            .await
            .context("failed to send control note")?;

        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Close the channel. Idempotent; safe from error paths.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        info!("Closing live agent connection");

        {
            let mut writer = self.writer.lock().await;
            let _ = writer.send(Message::Close(None)).await;
        }

        if let Some(handle) = self.reader_handle.lock().await.take() {
            handle.abort();
        }
    }
}

/// Reader task: one inbound frame at a time, dispatched in network order.
async fn read_loop(mut reader: WsSource, events: mpsc::UnboundedSender<SessionEvent>) {
    while let Some(frame) = reader.next().await {
        match frame {
            Ok(Message::Text(text)) => dispatch(&events, text.as_bytes()),
            Ok(Message::Binary(bytes)) => dispatch(&events, &bytes),
            Ok(Message::Close(_)) => {
                info!("Live agent closed the connection");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                error!("live agent connection error: {}", e);
                break;
            }
        }
    }

    let _ = events.send(SessionEvent::TransportClosed);
}

fn dispatch(events: &mpsc::UnboundedSender<SessionEvent>, payload: &[u8]) {
    let message: ServerMessage = match serde_json::from_slice(payload) {
        Ok(message) => message,
        Err(e) => {
            warn!("ignoring unparseable server message: {}", e);
            return;
        }
    };

    let Some(content) = message.server_content else {
        return;
    };

    if let Some(turn) = content.model_turn {
        for part in turn.parts {
            let Some(inline) = part.inline_data else {
                continue;
            };
            match base64::engine::general_purpose::STANDARD.decode(&inline.data) {
                Ok(pcm) => {
                    let _ = events.send(SessionEvent::AgentAudio(pcm));
                }
                Err(e) => {
                    // Undecodable audio is dropped; the session continues.
                    warn!("dropping undecodable audio chunk: {}", e);
                }
            }
        }
    }

    if let Some(fragment) = content.input_transcription {
        let _ = events.send(SessionEvent::Transcript(TranscriptEvent {
            speaker: Speaker::Candidate,
            text: fragment.text,
            timestamp: Utc::now(),
        }));
    }

    if let Some(fragment) = content.output_transcription {
        let _ = events.send(SessionEvent::Transcript(TranscriptEvent {
            speaker: Speaker::Examiner,
            text: fragment.text,
            timestamp: Utc::now(),
        }));
    }
}
