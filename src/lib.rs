pub mod audio;
pub mod config;
pub mod session;
pub mod transport;

pub use audio::{
    codec, should_forward, AudioCaptureSource, AudioFrame, AudioOutput, CaptureConfig,
    MonotonicClock, OutputClock, PlaybackEntry, PlaybackScheduler,
};
pub use config::Config;
pub use session::{
    build_system_instruction, ControlNudge, ExamSession, Phase, PhaseStateMachine, SessionConfig,
    SessionEvent, SessionState, Speaker, TopicMode, TranscriptAccumulator, TranscriptEvent,
    TurnTimer,
};
pub use transport::{LiveTransport, TransportConfig};
