use serde::{Deserialize, Serialize};

/// How the examiner picks the Part 2 cue-card topic. Alters the
/// instruction text sent at connect time, never the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TopicMode {
    /// The examiner invents any personal cue-card topic
    Random,
    /// The examiner must pick from a curated forecast list
    Forecast,
}

/// Configuration for one exam attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Unique attempt identifier (e.g., "exam-5d3f...")
    pub session_id: String,

    /// Candidate display name the examiner addresses
    pub candidate_name: String,

    /// Target score band; only parameterizes the examiner instructions
    pub target_band: f32,

    /// Cue-card topic selection mode
    pub topic_mode: TopicMode,

    /// Curated topics used when `topic_mode` is `Forecast`
    pub forecast_topics: Vec<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_id: format!("exam-{}", uuid::Uuid::new_v4()),
            candidate_name: "Candidate".to_string(),
            target_band: 6.5,
            topic_mode: TopicMode::Random,
            forecast_topics: Vec::new(),
        }
    }
}
