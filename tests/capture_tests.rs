// Tests for the capture-side suppression rule and frame types. The rule is
// a pure function over the shared session flags, so it is verified without
// touching a device.

use chrono::Utc;
use exam_room::{codec, should_forward, AudioFrame, CaptureConfig, SessionState};

#[test]
fn test_forwarding_allowed_in_idle_state() {
    let state = SessionState::new();
    assert!(should_forward(&state));
}

#[test]
fn test_agent_speaking_suppresses_forwarding() {
    let state = SessionState::new();

    state.set_agent_speaking(true);
    assert!(!should_forward(&state), "echo suppression must hold while the agent speaks");

    state.set_agent_speaking(false);
    assert!(should_forward(&state));
}

#[test]
fn test_mute_suppresses_forwarding() {
    let state = SessionState::new();

    state.set_muted(true);
    assert!(!should_forward(&state));

    state.set_muted(false);
    assert!(should_forward(&state));
}

#[test]
fn test_closed_session_suppresses_forwarding_permanently() {
    let state = SessionState::new();

    assert!(state.close());
    assert!(!should_forward(&state));

    // close() is idempotent and reports only the first flip.
    assert!(!state.close());
    assert!(!should_forward(&state));
}

#[test]
fn test_capture_config_defaults() {
    let config = CaptureConfig::default();

    assert_eq!(config.sample_rate, 16000, "agent expects 16kHz input");
    assert_eq!(config.channels, 1, "mono capture");
    assert_eq!(config.block_size, 4096);
}

#[test]
fn test_audio_frame_carries_encoded_block() {
    let samples = vec![0.0f32; 4096];
    let frame = AudioFrame {
        pcm: codec::encode(&samples),
        sample_rate: 16000,
        channels: 1,
        captured_at: Utc::now(),
    };

    assert_eq!(frame.pcm.len(), 4096 * 2);
    assert_eq!(frame.sample_rate, 16000);
    assert_eq!(frame.channels, 1);
}
