use crate::error::SyncError;
use serde_json::Value;

pub const UNKNOWN_ALBUM: &str = "Unknown Album";

/// When a scrobble happened, or that it is still playing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScrobbleTime {
    At(i64),
    NowPlaying,
}

impl ScrobbleTime {
    pub fn epoch_secs(self) -> Option<i64> {
        match self {
            ScrobbleTime::At(secs) => Some(secs),
            ScrobbleTime::NowPlaying => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalRecord {
    pub artist: String,
    pub track: String,
    pub album: String,
    pub timestamp: ScrobbleTime,
}

/// One listening event as the service sends it, borrowed from the response body.
#[derive(Debug, Clone, Copy)]
pub struct RawTrackEntry<'a>(pub &'a Value);

/// Pull the track entries out of a `user.getrecenttracks` body.
///
/// `recenttracks.track` is a list for most windows but a bare object when the
/// window holds exactly one event. A missing list means no entries.
pub fn extract_track_entries(body: &Value) -> Vec<RawTrackEntry<'_>> {
    match body.get("recenttracks").and_then(|rt| rt.get("track")) {
        Some(Value::Array(items)) => items.iter().map(RawTrackEntry).collect(),
        Some(item @ Value::Object(_)) => vec![RawTrackEntry(item)],
        _ => Vec::new(),
    }
}

/// Text of a field that is either a bare string or an object carrying
/// `#text` (or `name`, in the extended artist form).
fn text_field(value: Option<&Value>) -> Option<&str> {
    let text = match value? {
        Value::String(s) => s.as_str(),
        Value::Object(map) => map
            .get("#text")
            .or_else(|| map.get("name"))
            .and_then(Value::as_str)?,
        _ => return None,
    };
    let trimmed = text.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

fn parse_uts(date: &Value) -> Option<i64> {
    match date.get("uts")? {
        Value::String(s) => s.trim().parse::<i64>().ok(),
        Value::Number(n) => n.as_i64(),
        _ => None,
    }
}

pub fn normalize_entry(index: usize, entry: RawTrackEntry<'_>) -> Result<CanonicalRecord, SyncError> {
    let raw = entry.0;
    let malformed = |reason: &str| SyncError::MalformedRecord {
        index,
        reason: reason.to_string(),
    };

    if !raw.is_object() {
        return Err(malformed("entry is not an object"));
    }
    let artist = text_field(raw.get("artist")).ok_or_else(|| malformed("missing artist name"))?;
    let track = text_field(raw.get("name")).ok_or_else(|| malformed("missing track name"))?;
    let album = text_field(raw.get("album")).unwrap_or(UNKNOWN_ALBUM);

    let timestamp = match raw.get("date") {
        None | Some(Value::Null) => ScrobbleTime::NowPlaying,
        Some(date) => {
            ScrobbleTime::At(parse_uts(date).ok_or_else(|| malformed("date.uts is not Unix seconds"))?)
        }
    };

    Ok(CanonicalRecord {
        artist: artist.to_string(),
        track: track.to_string(),
        album: album.to_string(),
        timestamp,
    })
}

/// Normalize every entry, stopping at the first malformed one.
pub fn normalize_all(entries: &[RawTrackEntry<'_>]) -> Result<Vec<CanonicalRecord>, SyncError> {
    entries
        .iter()
        .enumerate()
        .map(|(idx, entry)| normalize_entry(idx, *entry))
        .collect()
}
