//! Audio capture, encoding, and playout for the exam session

pub mod capture;
pub mod codec;
pub mod playback;

pub use capture::{should_forward, AudioCaptureSource, AudioFrame, CaptureConfig};
pub use playback::{
    AudioOutput, CpalOutput, MonotonicClock, OutputClock, PlaybackEntry, PlaybackScheduler,
};
