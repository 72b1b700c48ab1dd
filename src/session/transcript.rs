//! Transcript accumulation
//!
//! Append-only log of every transcript fragment the transport delivers,
//! in arrival order. Single-writer discipline: only the engine task's
//! event-delivery path calls `append`. The rendered text is what the
//! scoring service receives when the session ends.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who produced a transcript fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    /// The human taking the exam (the agent's "user")
    Candidate,
    /// The AI examiner
    Examiner,
}

impl Speaker {
    pub fn label(&self) -> &'static str {
        match self {
            Speaker::Candidate => "Candidate",
            Speaker::Examiner => "Examiner",
        }
    }
}

/// One transcribed fragment as received from the transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptEvent {
    pub speaker: Speaker,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// Ordered, purely additive transcript log.
#[derive(Debug, Default)]
pub struct TranscriptAccumulator {
    events: Vec<TranscriptEvent>,
}

impl TranscriptAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, event: TranscriptEvent) {
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[TranscriptEvent] {
        &self.events
    }

    /// Render the full transcript, one `Speaker: text` line per event, in
    /// arrival order.
    pub fn full_text(&self) -> String {
        let mut text = String::new();
        for event in &self.events {
            text.push_str(event.speaker.label());
            text.push_str(": ");
            text.push_str(&event.text);
            text.push('\n');
        }
        text
    }
}
