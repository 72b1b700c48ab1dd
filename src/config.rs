use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub agent: AgentConfig,
    pub audio: AudioConfig,
    pub exam: ExamConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct AgentConfig {
    /// WebSocket endpoint of the conversational agent
    pub url: String,
    /// Model identifier sent in the session setup
    pub model: String,
    /// Prebuilt voice for the examiner
    pub voice: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct AudioConfig {
    /// Microphone rate the agent expects (16kHz)
    pub input_sample_rate: u32,
    /// Agent audio rate for playout (24kHz)
    pub output_sample_rate: u32,
    /// Samples per captured block
    pub block_size: usize,
    pub channels: u16,
}

#[derive(Debug, Deserialize)]
pub struct ExamConfig {
    /// Name the examiner introduces itself with; also a trigger keyword
    pub examiner_name: String,
    /// Curated cue-card topics for forecast mode
    #[serde(default)]
    pub forecast_topics: Vec<String>,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
