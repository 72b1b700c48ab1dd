//! Wire types for the live agent channel
//!
//! JSON messages in the bidirectional-generation shape the agent endpoint
//! speaks: one `setup` message at connect time, then `realtimeInput` media
//! chunks outbound and `serverContent` frames inbound. PCM payloads are
//! base64 on the wire.

use base64::Engine;
use serde::{Deserialize, Serialize};

// --- Outbound ---

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupMessage {
    pub setup: Setup,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Setup {
    pub model: String,
    pub generation_config: GenerationConfig,
    pub system_instruction: Content,
    /// Empty objects: presence alone enables transcription of each leg.
    pub input_audio_transcription: TranscriptionConfig,
    pub output_audio_transcription: TranscriptionConfig,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_modalities: Vec<String>,
    pub speech_config: SpeechConfig,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechConfig {
    pub voice_config: VoiceConfig,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceConfig {
    pub prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrebuiltVoiceConfig {
    pub voice_name: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct TranscriptionConfig {}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInputMessage {
    pub realtime_input: RealtimeInput,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInput {
    pub media_chunks: Vec<MediaChunk>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaChunk {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientContentMessage {
    pub client_content: ClientContent,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientContent {
    pub turns: Vec<Content>,
    pub turn_complete: bool,
}

impl SetupMessage {
    pub fn new(model: &str, voice: &str, system_instruction: &str) -> Self {
        Self {
            setup: Setup {
                model: model.to_string(),
                generation_config: GenerationConfig {
                    response_modalities: vec!["AUDIO".to_string()],
                    speech_config: SpeechConfig {
                        voice_config: VoiceConfig {
                            prebuilt_voice_config: PrebuiltVoiceConfig {
                                voice_name: voice.to_string(),
                            },
                        },
                    },
                },
                system_instruction: Content {
                    role: None,
                    parts: vec![Part {
                        text: system_instruction.to_string(),
                    }],
                },
                input_audio_transcription: TranscriptionConfig {},
                output_audio_transcription: TranscriptionConfig {},
            },
        }
    }
}

impl RealtimeInputMessage {
    /// Wrap one PCM16 frame as a realtime media chunk.
    pub fn audio_chunk(pcm: &[u8], sample_rate: u32) -> Self {
        Self {
            realtime_input: RealtimeInput {
                media_chunks: vec![MediaChunk {
                    mime_type: format!("audio/pcm;rate={}", sample_rate),
                    data: base64::engine::general_purpose::STANDARD.encode(pcm),
                }],
            },
        }
    }
}

impl ClientContentMessage {
    /// Wrap an advisory control note as a synthetic user-role turn.
    pub fn system_note(text: &str) -> Self {
        Self {
            client_content: ClientContent {
                turns: vec![Content {
                    role: Some("user".to_string()),
                    parts: vec![Part {
                        text: text.to_string(),
                    }],
                }],
                turn_complete: true,
            },
        }
    }
}

// --- Inbound ---

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub setup_complete: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_content: Option<ServerContent>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_turn: Option<ModelTurn>,
    /// Transcription of the candidate's audio
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_transcription: Option<TranscriptionFragment>,
    /// Transcription of the examiner's audio
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_transcription: Option<TranscriptionFragment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turn_complete: Option<bool>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelTurn {
    #[serde(default)]
    pub parts: Vec<ServerPart>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerPart {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// Base64 PCM16 at the output sample rate
    pub data: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptionFragment {
    pub text: String,
}
