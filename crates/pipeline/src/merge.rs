use std::collections::HashSet;

use tracing::debug;

use crate::{MergedSegment, MergedTranscript, SpeakerMap, Transcript};

/// Merges per-track transcripts into one time-ordered dialogue.
///
/// Ordering is by segment start time, ties broken by track index
/// ascending. Every input segment appears exactly once: a track
/// without a mapped identity keeps a generic `Speaker {index}` label
/// rather than being dropped.
pub fn merge(
    recording_id: &str,
    transcripts: &[Transcript],
    speakers: &SpeakerMap,
) -> MergedTranscript {
    let mut indexed: Vec<(f64, usize, &str)> = Vec::new();
    for transcript in transcripts {
        for segment in &transcript.segments {
            indexed.push((segment.start, transcript.track_index, &segment.text));
        }
    }

    indexed.sort_by(|a, b| {
        a.0.partial_cmp(&b.0)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.1.cmp(&b.1))
    });

    let segments: Vec<MergedSegment> = indexed
        .into_iter()
        .map(|(timestamp, track_index, text)| MergedSegment {
            timestamp,
            speaker: label_for(speakers, track_index),
            text: text.to_string(),
        })
        .collect();

    let speaker_count = segments
        .iter()
        .map(|s| s.speaker.as_str())
        .collect::<HashSet<_>>()
        .len();

    debug!(
        recording_id,
        segments = segments.len(),
        speakers = speaker_count,
        "Transcripts merged"
    );

    MergedTranscript {
        recording_id: recording_id.to_string(),
        segments,
        speaker_count,
    }
}

fn label_for(speakers: &SpeakerMap, track_index: usize) -> String {
    speakers
        .get(&track_index)
        .cloned()
        .unwrap_or_else(|| format!("Speaker {track_index}"))
}

/// Flattens the dialogue into `Speaker: text` lines for prompt
/// substitution.
pub fn dialogue_text(merged: &MergedTranscript) -> String {
    let mut out = String::new();
    for segment in &merged.segments {
        out.push_str(&segment.speaker);
        out.push_str(": ");
        out.push_str(&segment.text);
        out.push('\n');
    }
    out
}
