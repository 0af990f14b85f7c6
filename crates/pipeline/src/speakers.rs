use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::{AudioTrack, SpeakerMap};

/// File the room-event sync service drops next to the recording.
pub const EVENTS_FILE: &str = "room_events.json";

/// One entry of the room-event timeline (join/leave/track events
/// keyed by endpoint).
#[derive(Debug, Deserialize)]
struct RoomEvent {
    #[serde(rename = "type")]
    kind: String,
    endpoint_id: Option<String>,
    display_name: Option<String>,
    media_type: Option<String>,
}

/// Correlates recorded tracks to participant identities.
///
/// This stage is optional by contract: an absent, unreadable, or
/// inconclusive timeline yields an empty map and the merge stage
/// falls back to generic `Speaker {index}` labels. It never fails the
/// job.
pub fn map_speakers(recording_dir: &Path, tracks: &[AudioTrack]) -> SpeakerMap {
    let path = recording_dir.join(EVENTS_FILE);
    let data = match std::fs::read(&path) {
        Ok(data) => data,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "No room-event timeline; using generic labels");
            return SpeakerMap::new();
        }
    };

    let events: Vec<RoomEvent> = match serde_json::from_slice(&data) {
        Ok(events) => events,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Unparseable room-event timeline; using generic labels");
            return SpeakerMap::new();
        }
    };

    correlate(&events, tracks)
}

/// Endpoint-to-track alignment. Exact matches first (the recorder
/// names track files after endpoint ids when it can), then ordinal
/// alignment of the remaining audio `track_added` events against the
/// remaining tracks in index order.
fn correlate(events: &[RoomEvent], tracks: &[AudioTrack]) -> SpeakerMap {
    let mut names_by_endpoint: HashMap<&str, &str> = HashMap::new();
    for event in events {
        if event.kind == "participant_joined" {
            if let (Some(endpoint), Some(name)) =
                (event.endpoint_id.as_deref(), event.display_name.as_deref())
            {
                names_by_endpoint.insert(endpoint, name);
            }
        }
    }

    let audio_endpoints: Vec<&str> = events
        .iter()
        .filter(|e| e.kind == "track_added" && e.media_type.as_deref() == Some("audio"))
        .filter_map(|e| e.endpoint_id.as_deref())
        .collect();

    let mut map = SpeakerMap::new();

    // Pass 1: stem == endpoint id.
    for track in tracks {
        if let Some(name) = names_by_endpoint.get(track.stem.as_str()) {
            map.insert(track.index, (*name).to_string());
        }
    }

    // Pass 2: ordinal alignment for whatever is left.
    let mut remaining_endpoints = audio_endpoints
        .iter()
        .filter(|ep| !tracks.iter().any(|t| t.stem == **ep))
        .copied();
    for track in tracks {
        if map.contains_key(&track.index) {
            continue;
        }
        let Some(endpoint) = remaining_endpoints.next() else {
            break;
        };
        if let Some(name) = names_by_endpoint.get(endpoint) {
            map.insert(track.index, (*name).to_string());
        }
    }

    debug!(mapped = map.len(), total = tracks.len(), "Speaker correlation done");
    map
}
