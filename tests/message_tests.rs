// Serde tests for the live agent wire types, in both directions.

use base64::Engine;
use exam_room::transport::messages::{
    ClientContentMessage, RealtimeInputMessage, ServerMessage, SetupMessage,
};

#[test]
fn test_setup_message_shape() {
    let setup = SetupMessage::new("models/test-model", "Puck", "You are an examiner.");

    let json = serde_json::to_string(&setup).unwrap();

    assert!(json.contains("\"setup\""));
    assert!(json.contains("\"model\":\"models/test-model\""));
    assert!(json.contains("\"responseModalities\":[\"AUDIO\"]"));
    assert!(json.contains("\"voiceName\":\"Puck\""));
    assert!(json.contains("\"systemInstruction\""));
    assert!(json.contains("You are an examiner."));
    // Presence of the empty transcription objects enables both legs.
    assert!(json.contains("\"inputAudioTranscription\":{}"));
    assert!(json.contains("\"outputAudioTranscription\":{}"));
}

#[test]
fn test_audio_chunk_is_base64_pcm_with_rate() {
    let pcm = vec![0u8, 1, 2, 3];
    let message = RealtimeInputMessage::audio_chunk(&pcm, 16000);

    let json = serde_json::to_string(&message).unwrap();

    assert!(json.contains("\"realtimeInput\""));
    assert!(json.contains("\"mimeType\":\"audio/pcm;rate=16000\""));
    let expected = base64::engine::general_purpose::STANDARD.encode(&pcm);
    assert!(json.contains(&expected));
}

#[test]
fn test_system_note_is_a_user_role_turn() {
    let message = ClientContentMessage::system_note("SYSTEM: move on");

    let json = serde_json::to_string(&message).unwrap();

    assert!(json.contains("\"clientContent\""));
    assert!(json.contains("\"role\":\"user\""));
    assert!(json.contains("SYSTEM: move on"));
    assert!(json.contains("\"turnComplete\":true"));
}

#[test]
fn test_server_message_with_inline_audio() {
    let pcm = base64::engine::general_purpose::STANDARD.encode([0u8, 0, 255, 127]);
    let json = format!(
        r#"{{
            "serverContent": {{
                "modelTurn": {{
                    "parts": [
                        {{"inlineData": {{"mimeType": "audio/pcm;rate=24000", "data": "{pcm}"}}}}
                    ]
                }}
            }}
        }}"#
    );

    let message: ServerMessage = serde_json::from_str(&json).unwrap();

    let content = message.server_content.unwrap();
    let turn = content.model_turn.unwrap();
    assert_eq!(turn.parts.len(), 1);
    let inline = turn.parts[0].inline_data.as_ref().unwrap();
    assert_eq!(inline.data, pcm);
}

#[test]
fn test_server_message_with_both_transcription_legs() {
    let json = r#"{
        "serverContent": {
            "inputTranscription": {"text": "I am here"},
            "outputTranscription": {"text": "Good afternoon."},
            "turnComplete": true
        }
    }"#;

    let message: ServerMessage = serde_json::from_str(json).unwrap();

    let content = message.server_content.unwrap();
    assert_eq!(content.input_transcription.unwrap().text, "I am here");
    assert_eq!(content.output_transcription.unwrap().text, "Good afternoon.");
    assert_eq!(content.turn_complete, Some(true));
}

#[test]
fn test_setup_complete_parses_without_content() {
    let message: ServerMessage = serde_json::from_str(r#"{"setupComplete": {}}"#).unwrap();

    assert!(message.setup_complete.is_some());
    assert!(message.server_content.is_none());
}

#[test]
fn test_unknown_fields_are_tolerated() {
    let json = r#"{
        "serverContent": {
            "outputTranscription": {"text": "hello"},
            "groundingMetadata": {"something": 1}
        },
        "usageMetadata": {"tokens": 42}
    }"#;

    let message: ServerMessage = serde_json::from_str(json).unwrap();

    assert_eq!(
        message.server_content.unwrap().output_transcription.unwrap().text,
        "hello"
    );
}
