//! Validation of raw export records into typed play events.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

/// Timestamp layout used by the streaming-history export (always UTC).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

#[derive(Error, Debug)]
pub enum NormalizeError {
    #[error("Invalid timestamp {value:?}: {source}")]
    Timestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}

/// One play record as it appears in the export (partial — extra fields such
/// as `conn_country` or `episode_name` are ignored).
#[derive(Debug, Clone, Deserialize)]
pub struct RawEvent {
    pub ts: String,
    pub platform: Option<String>,
    pub ms_played: u64,
    pub master_metadata_track_name: Option<String>,
    pub master_metadata_album_artist_name: Option<String>,
    pub master_metadata_album_album_name: Option<String>,
    /// Null for podcast episodes and other non-music content
    pub spotify_track_uri: Option<String>,
    pub reason_start: Option<String>,
    pub reason_end: Option<String>,
    pub shuffle: Option<bool>,
    pub skipped: Option<bool>,
    pub offline: Option<bool>,
    pub incognito_mode: Option<bool>,
}

/// A play event that passed validation: a music track with a parsed timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedEvent {
    pub ts: DateTime<Utc>,
    pub uri: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub ms_played: u64,
    pub reason_start: String,
    pub reason_end: String,
    pub shuffle: bool,
    pub skipped: bool,
    pub offline: bool,
    pub incognito: bool,
    pub platform: String,
}

/// Normalize one raw record. Returns `Ok(None)` for non-music content
/// (podcast episodes, audiobooks, ads), which carry no track URI.
pub fn normalize_event(raw: &RawEvent) -> Result<Option<NormalizedEvent>, NormalizeError> {
    let Some(uri) = raw.spotify_track_uri.as_deref() else {
        return Ok(None);
    };

    let ts = parse_timestamp(&raw.ts)?;

    // Sparse records sometimes lack names; they still count as plays
    Ok(Some(NormalizedEvent {
        ts,
        uri: uri.to_string(),
        title: raw.master_metadata_track_name.clone().unwrap_or_default(),
        artist: raw.master_metadata_album_artist_name.clone().unwrap_or_default(),
        album: raw.master_metadata_album_album_name.clone().unwrap_or_default(),
        ms_played: raw.ms_played,
        reason_start: raw.reason_start.clone().unwrap_or_default(),
        reason_end: raw.reason_end.clone().unwrap_or_default(),
        shuffle: raw.shuffle.unwrap_or(false),
        skipped: raw.skipped.unwrap_or(false),
        offline: raw.offline.unwrap_or(false),
        incognito: raw.incognito_mode.unwrap_or(false),
        platform: raw.platform.clone().unwrap_or_default(),
    }))
}

/// Normalize a batch in order. The first invalid record aborts the batch.
pub fn normalize_events(raws: &[RawEvent]) -> Result<Vec<NormalizedEvent>, NormalizeError> {
    let mut events = Vec::with_capacity(raws.len());
    for raw in raws {
        if let Some(event) = normalize_event(raw)? {
            events.push(event);
        }
    }

    let dropped = raws.len() - events.len();
    if dropped > 0 {
        log::debug!("Dropped {dropped} non-music events");
    }
    Ok(events)
}

/// Parse an export timestamp such as `2023-01-14T18:02:45Z`.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, NormalizeError> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|source| NormalizeError::Timestamp {
            value: value.to_string(),
            source,
        })
}
