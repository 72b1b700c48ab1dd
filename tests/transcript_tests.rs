// Tests for transcript accumulation: arrival-order preservation and the
// rendered hand-off format.

use chrono::Utc;
use exam_room::{Speaker, TranscriptAccumulator, TranscriptEvent};

fn event(speaker: Speaker, text: &str) -> TranscriptEvent {
    TranscriptEvent {
        speaker,
        text: text.to_string(),
        timestamp: Utc::now(),
    }
}

#[test]
fn test_empty_transcript_renders_empty() {
    let transcript = TranscriptAccumulator::new();

    assert!(transcript.is_empty());
    assert_eq!(transcript.full_text(), "");
}

#[test]
fn test_lines_are_prefixed_by_speaker() {
    let mut transcript = TranscriptAccumulator::new();

    transcript.append(event(Speaker::Candidate, "I am here"));
    transcript.append(event(Speaker::Examiner, "Good afternoon."));

    assert_eq!(
        transcript.full_text(),
        "Candidate: I am here\nExaminer: Good afternoon.\n"
    );
}

#[test]
fn test_arrival_order_is_preserved_across_interleavings() {
    let mut transcript = TranscriptAccumulator::new();

    let lines = [
        (Speaker::Candidate, "one"),
        (Speaker::Candidate, "two"),
        (Speaker::Examiner, "three"),
        (Speaker::Candidate, "four"),
        (Speaker::Examiner, "five"),
        (Speaker::Examiner, "six"),
    ];
    for (speaker, text) in lines {
        transcript.append(event(speaker, text));
    }

    let rendered = transcript.full_text();
    let rendered_lines: Vec<&str> = rendered.lines().collect();
    assert_eq!(rendered_lines.len(), lines.len());
    for ((speaker, text), line) in lines.iter().zip(rendered_lines) {
        assert_eq!(line, format!("{}: {}", speaker.label(), text));
    }
}

#[test]
fn test_events_are_purely_additive() {
    let mut transcript = TranscriptAccumulator::new();

    transcript.append(event(Speaker::Candidate, "first"));
    let after_one = transcript.full_text();
    transcript.append(event(Speaker::Examiner, "second"));

    assert!(transcript.full_text().starts_with(&after_one));
    assert_eq!(transcript.len(), 2);
    assert_eq!(transcript.events()[0].text, "first");
}
