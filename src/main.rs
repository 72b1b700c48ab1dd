use anyhow::{bail, Context, Result};
use clap::Parser;
use exam_room::{Config, ExamSession, SessionConfig, TopicMode};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "exam-room", about = "Live spoken-exam session")]
struct Args {
    /// Candidate display name the examiner addresses
    #[arg(long, default_value = "Candidate")]
    candidate: String,

    /// Target score band the examiner instructions are calibrated toward
    #[arg(long, default_value_t = 6.5)]
    target_band: f32,

    /// Cue-card topic selection: "random" or "forecast"
    #[arg(long, default_value = "random")]
    topics: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load("config/exam-room")?;

    info!("{} v0.1.0", cfg.service.name);

    let api_key = std::env::var(&cfg.agent.api_key_env)
        .with_context(|| format!("missing credential: set {}", cfg.agent.api_key_env))?;

    let topic_mode = match args.topics.as_str() {
        "random" => TopicMode::Random,
        "forecast" => TopicMode::Forecast,
        other => bail!("unknown topic mode {:?}, expected \"random\" or \"forecast\"", other),
    };

    let session_config = SessionConfig {
        candidate_name: args.candidate,
        target_band: args.target_band,
        topic_mode,
        forecast_topics: cfg.exam.forecast_topics.clone(),
        ..SessionConfig::default()
    };

    let session = ExamSession::connect(&cfg, session_config, api_key).await?;
    session.start().await?;

    info!("Say \"I am here, {}\" to begin the interview", cfg.exam.examiner_name);

    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("Finish requested"),
        _ = session.done() => info!("Session ended by the agent side"),
    }

    let transcript = session.stop().await?;
    println!("{}", transcript);

    Ok(())
}
