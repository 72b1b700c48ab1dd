//! Exam session management
//!
//! This module provides the `ExamSession` abstraction that manages:
//! - Microphone capture and echo suppression
//! - The exam phase state machine and its timing rules
//! - Gapless playout of agent audio
//! - Transcript accumulation for the scoring service
//! - Session lifecycle and teardown ordering

mod config;
mod instructions;
mod phase;
mod session;
mod state;
mod timer;
mod transcript;

pub use config::{SessionConfig, TopicMode};
pub use instructions::build_system_instruction;
pub use phase::{
    ControlNudge, Phase, PhaseStateMachine, PART1_ANSWER_LIMIT, PART2_SPEAKING_LIMIT,
    PART3_ANSWER_LIMIT, PREP_WINDOW,
};
pub use session::{ExamSession, SessionEvent};
pub use state::SessionState;
pub use timer::TurnTimer;
pub use transcript::{Speaker, TranscriptAccumulator, TranscriptEvent};
