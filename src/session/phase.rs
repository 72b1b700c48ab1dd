//! Exam phase state machine
//!
//! Reproduces the speaking test's timing rules (fixed per-answer limits,
//! the silent one-minute preparation window, forced phase transitions)
//! from the only signals available: transcript text and elapsed time.
//!
//! Phase detection is heuristic keyword matching on the examiner's own
//! free-form speech. That is not a contractual signal: a differently
//! phrased announcement can desynchronize the machine from the real exam
//! stage. The elapsed-time rules exist as the deterministic backstop. A
//! structured out-of-band phase marker from the agent would be the firmer
//! contract if one ever becomes available.
//!
//! All transitions are one-way; no phase is revisited once left. The
//! machine is owned and driven by a single task.

use super::transcript::Speaker;
use std::time::{Duration, Instant};
use tracing::info;

/// The ordered exam stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    /// Examiner stays silent until the candidate says a trigger phrase
    WaitingTrigger,
    /// Introduction and interview, short answers
    Part1,
    /// Cue card announced; candidate prepares in silence for one minute
    Part2Prep,
    /// Candidate delivers the long turn
    Part2Speaking,
    /// Two-way discussion
    Part3,
    /// Terminal; entered on explicit finish
    Done,
}

/// Advisory pacing instruction injected into the agent session as a
/// system-authored note. Never part of the candidate-visible transcript.
/// Safe to repeat: the agent treats each one as a fresh reminder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlNudge {
    pub text: String,
}

impl ControlNudge {
    fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
        }
    }
}

/// Silent preparation window before the long turn.
pub const PREP_WINDOW: Duration = Duration::from_secs(60);
/// Per-answer limit during the interview.
pub const PART1_ANSWER_LIMIT: Duration = Duration::from_secs(25);
/// Hard cap on the long turn.
pub const PART2_SPEAKING_LIMIT: Duration = Duration::from_secs(120);
/// Per-answer limit during the discussion.
pub const PART3_ANSWER_LIMIT: Duration = Duration::from_secs(60);

/// Candidate phrases that wake the examiner up.
const TRIGGER_KEYWORDS: &[&str] = &["here", "ready", "start"];

/// Examiner phrases announcing the cue card / preparation minute.
const PREP_ANNOUNCEMENTS: &[&str] = &[
    "one minute to prepare",
    "1 minute to prepare",
    "cue card",
    "topic card",
    "part 2",
];

/// Examiner phrases ending the preparation window early.
const PREP_OVER_PHRASES: &[&str] = &["time is up", "start speaking"];

/// Examiner phrases opening the discussion.
const PART3_MARKERS: &[&str] = &["part 3", "discussion"];

const PREP_OVER_NUDGE: &str =
    "SYSTEM: Preparation time is strictly over. Ask the candidate to start speaking immediately.";
const PART1_OVERRUN_NUDGE: &str =
    "SYSTEM: [HIDDEN TIMER] Candidate exceeded 25 seconds. Politely interrupt and move to the next question.";
const PART2_OVERRUN_NUDGE: &str =
    "SYSTEM: [HIDDEN TIMER] Candidate exceeded 2 minutes. Interrupt politely, stop Part 2, and switch to Part 3.";
const PART3_OVERRUN_NUDGE: &str =
    "SYSTEM: [HIDDEN TIMER] Answer exceeded 60 seconds. Interrupt and move to the next question.";

fn contains_any(text: &str, phrases: &[&str]) -> bool {
    phrases.iter().any(|phrase| text.contains(phrase))
}

/// The exam's phase model. Consumes transcript events and timer ticks;
/// yields phase changes and advisory nudges for the transport.
pub struct PhaseStateMachine {
    examiner_name: String,
    phase: Phase,
    /// When the candidate's current answer started. Resets whenever the
    /// floor passes to them (agent audio begins or finishes playing out).
    turn_started_at: Instant,
    /// When the preparation window opened; set on entering Part2Prep.
    prep_started_at: Option<Instant>,
}

impl PhaseStateMachine {
    pub fn new(examiner_name: &str, now: Instant) -> Self {
        Self {
            examiner_name: examiner_name.to_lowercase(),
            phase: Phase::WaitingTrigger,
            turn_started_at: now,
            prep_started_at: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn prep_started_at(&self) -> Option<Instant> {
        self.prep_started_at
    }

    pub fn turn_started_at(&self) -> Instant {
        self.turn_started_at
    }

    fn transition(&mut self, to: Phase, now: Instant) {
        info!("Exam phase {:?} -> {:?}", self.phase, to);
        self.phase = to;
        self.turn_started_at = now;
    }

    /// Feed one transcript fragment through the phase edges that key off
    /// text. Returns a nudge when a transition requires one.
    pub fn on_transcript(
        &mut self,
        speaker: Speaker,
        text: &str,
        now: Instant,
    ) -> Option<ControlNudge> {
        let lower = text.to_lowercase();

        match (self.phase, speaker) {
            (Phase::WaitingTrigger, Speaker::Candidate) => {
                if contains_any(&lower, TRIGGER_KEYWORDS) || lower.contains(&self.examiner_name) {
                    self.transition(Phase::Part1, now);
                }
            }
            (Phase::Part1, Speaker::Examiner) => {
                if contains_any(&lower, PREP_ANNOUNCEMENTS) {
                    self.transition(Phase::Part2Prep, now);
                    self.prep_started_at = Some(now);
                }
            }
            (Phase::Part2Prep, Speaker::Examiner) => {
                // Early detection path: the examiner already broke its
                // silence and prompted the candidate, so no nudge here.
                // Whichever of this and the 60s timeout fires first wins.
                if contains_any(&lower, PREP_OVER_PHRASES) {
                    self.transition(Phase::Part2Speaking, now);
                }
            }
            (Phase::Part2Speaking, Speaker::Examiner) => {
                if contains_any(&lower, PART3_MARKERS) {
                    self.transition(Phase::Part3, now);
                }
            }
            _ => {}
        }

        None
    }

    /// Apply the elapsed-time rules on a 1Hz tick. At most one nudge per
    /// tick; every overrun nudge resets the answer clock, so repeats only
    /// occur after a full further overrun.
    pub fn on_tick(&mut self, now: Instant, agent_speaking: bool) -> Option<ControlNudge> {
        match self.phase {
            // Fires purely from elapsed time, regardless of transcript
            // content or the speaking flag: the examiner is required to
            // stay silent for the whole window, so without this rule the
            // transition would never happen on its own.
            Phase::Part2Prep => {
                let prep_started_at = self.prep_started_at?;
                if now.duration_since(prep_started_at) >= PREP_WINDOW {
                    self.transition(Phase::Part2Speaking, now);
                    return Some(ControlNudge::new(PREP_OVER_NUDGE));
                }
                None
            }
            Phase::Part1 if !agent_speaking => {
                if now.duration_since(self.turn_started_at) > PART1_ANSWER_LIMIT {
                    self.turn_started_at = now;
                    return Some(ControlNudge::new(PART1_OVERRUN_NUDGE));
                }
                None
            }
            Phase::Part2Speaking if !agent_speaking => {
                if now.duration_since(self.turn_started_at) > PART2_SPEAKING_LIMIT {
                    self.transition(Phase::Part3, now);
                    return Some(ControlNudge::new(PART2_OVERRUN_NUDGE));
                }
                None
            }
            Phase::Part3 if !agent_speaking => {
                if now.duration_since(self.turn_started_at) > PART3_ANSWER_LIMIT {
                    self.turn_started_at = now;
                    return Some(ControlNudge::new(PART3_OVERRUN_NUDGE));
                }
                None
            }
            _ => None,
        }
    }

    /// The agent has begun (or is continuing) an audio turn. The answer
    /// clock measures candidate speech, so it restarts here.
    pub fn on_agent_audio(&mut self, now: Instant) {
        self.turn_started_at = now;
    }

    /// All scheduled agent audio has finished playing; the floor passes to
    /// the candidate and their answer clock starts.
    pub fn on_playout_finished(&mut self, now: Instant) {
        self.turn_started_at = now;
    }

    /// Explicit session-finish request from the host. Terminal.
    pub fn finish(&mut self) {
        if self.phase != Phase::Done {
            info!("Exam phase {:?} -> {:?}", self.phase, Phase::Done);
            self.phase = Phase::Done;
        }
    }
}
