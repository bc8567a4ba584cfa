use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::normalize::NormalizedEvent;

/// One playback of a track.
#[derive(Debug, Clone, PartialEq)]
pub struct Listen {
    pub ts: DateTime<Utc>,
    pub ms_played: u64,
    pub reason_start: String,
    pub reason_end: String,
    pub shuffle: bool,
    pub skipped: bool,
    pub offline: bool,
    /// Played during a private session
    pub incognito: bool,
    pub platform: String,
}

/// A unique song and every recorded listen of it, in ingestion order.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub uri: String,
    pub listens: Vec<Listen>,
}

impl Track {
    fn from_event(event: &NormalizedEvent) -> Self {
        Self {
            title: event.title.clone(),
            artist: event.artist.clone(),
            album: event.album.clone(),
            uri: event.uri.clone(),
            listens: Vec::new(),
        }
    }
}

impl From<NormalizedEvent> for Listen {
    fn from(event: NormalizedEvent) -> Self {
        Self {
            ts: event.ts,
            ms_played: event.ms_played,
            reason_start: event.reason_start,
            reason_end: event.reason_end,
            shuffle: event.shuffle,
            skipped: event.skipped,
            offline: event.offline,
            incognito: event.incognito,
            platform: event.platform,
        }
    }
}

/// Tracks keyed by URI, iterated in order of first sighting.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackMap {
    tracks: Vec<Track>,
    index: HashMap<String, usize>,
}

/// Summary numbers for a whole export.
#[derive(Debug, Clone, PartialEq)]
pub struct LibraryStats {
    pub tracks: usize,
    pub artists: usize,
    pub listens: usize,
    pub total_ms: u64,
    pub first_listen: Option<DateTime<Utc>>,
    pub last_listen: Option<DateTime<Utc>>,
}

impl TrackMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn get(&self, uri: &str) -> Option<&Track> {
        self.index.get(uri).map(|&i| &self.tracks[i])
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Track> {
        self.tracks.iter()
    }

    /// Append a play, creating the track on first sighting. Identity fields
    /// of an existing track are never overwritten by later events.
    pub fn push(&mut self, event: NormalizedEvent) {
        let i = match self.index.get(&event.uri) {
            Some(&i) => i,
            None => {
                let i = self.tracks.len();
                self.tracks.push(Track::from_event(&event));
                self.index.insert(event.uri.clone(), i);
                i
            }
        };
        self.tracks[i].listens.push(event.into());
    }

    /// Fold another aggregation result into this one, as if its events had
    /// been concatenated after ours.
    pub fn merge(&mut self, other: TrackMap) {
        for track in other.tracks {
            match self.index.get(&track.uri) {
                Some(&i) => self.tracks[i].listens.extend(track.listens),
                None => {
                    self.index.insert(track.uri.clone(), self.tracks.len());
                    self.tracks.push(track);
                }
            }
        }
    }

    pub fn stats(&self) -> LibraryStats {
        let artists: HashSet<&str> = self.tracks.iter().map(|t| t.artist.as_str()).collect();
        let listens = || self.tracks.iter().flat_map(|t| t.listens.iter());

        LibraryStats {
            tracks: self.tracks.len(),
            artists: artists.len(),
            listens: listens().count(),
            total_ms: listens().map(|l| l.ms_played).sum(),
            first_listen: listens().map(|l| l.ts).min(),
            last_listen: listens().map(|l| l.ts).max(),
        }
    }
}

impl<'a> IntoIterator for &'a TrackMap {
    type Item = &'a Track;
    type IntoIter = std::slice::Iter<'a, Track>;

    fn into_iter(self) -> Self::IntoIter {
        self.tracks.iter()
    }
}

/// Group normalized events by track URI.
pub fn aggregate(events: impl IntoIterator<Item = NormalizedEvent>) -> TrackMap {
    let mut tracks = TrackMap::new();
    for event in events {
        tracks.push(event);
    }
    log::debug!("Aggregated {} distinct tracks", tracks.len());
    tracks
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;

    pub(crate) fn event(uri: &str, artist: &str, minute: u32, ms_played: u64) -> NormalizedEvent {
        NormalizedEvent {
            ts: Utc.with_ymd_and_hms(2023, 3, 1, 12, minute, 0).unwrap(),
            uri: uri.to_string(),
            title: format!("title of {uri}"),
            artist: artist.to_string(),
            album: "Album".to_string(),
            ms_played,
            reason_start: "trackdone".to_string(),
            reason_end: "trackdone".to_string(),
            shuffle: false,
            skipped: false,
            offline: false,
            incognito: false,
            platform: "linux".to_string(),
        }
    }

    #[test]
    fn test_groups_by_uri() {
        let tracks = aggregate(vec![
            event("a", "X", 0, 100),
            event("b", "Y", 1, 200),
            event("a", "X", 2, 300),
            event("c", "X", 3, 400),
            event("b", "Y", 4, 500),
        ]);

        assert_eq!(tracks.len(), 3);
        let uris: Vec<_> = tracks.iter().map(|t| t.uri.as_str()).collect();
        assert_eq!(uris, vec!["a", "b", "c"]);

        let a = tracks.get("a").unwrap();
        let played: Vec<_> = a.listens.iter().map(|l| l.ms_played).collect();
        assert_eq!(played, vec![100, 300]);
        assert!(tracks.iter().all(|t| !t.listens.is_empty()));
    }

    #[test]
    fn test_first_sighting_metadata_wins() {
        let mut renamed = event("a", "X (Remastered)", 5, 10);
        renamed.title = "Corrected Title".to_string();

        let tracks = aggregate(vec![event("a", "X", 0, 100), renamed]);
        let a = tracks.get("a").unwrap();
        assert_eq!(a.artist, "X");
        assert_eq!(a.title, "title of a");
        assert_eq!(a.listens.len(), 2);
    }

    #[test]
    fn test_listens_keep_ingestion_order() {
        // Out-of-order timestamps are not re-sorted
        let tracks = aggregate(vec![event("a", "X", 30, 1), event("a", "X", 10, 2)]);
        let played: Vec<_> = tracks.get("a").unwrap().listens.iter().map(|l| l.ms_played).collect();
        assert_eq!(played, vec![1, 2]);
    }

    #[test]
    fn test_merge_matches_concatenation() {
        let batch_a = vec![event("a", "X", 0, 1), event("b", "Y", 1, 2), event("a", "X", 2, 3)];
        let batch_b = vec![event("c", "Z", 3, 4), event("a", "X", 4, 5), event("b", "Y", 5, 6)];

        let whole = aggregate(batch_a.iter().chain(batch_b.iter()).cloned());

        let mut merged = aggregate(batch_a);
        merged.merge(aggregate(batch_b));

        assert_eq!(merged, whole);
        let played: Vec<_> = merged.get("a").unwrap().listens.iter().map(|l| l.ms_played).collect();
        assert_eq!(played, vec![1, 3, 5]);
    }

    #[test]
    fn test_empty_input() {
        let tracks = aggregate(Vec::<NormalizedEvent>::new());
        assert!(tracks.is_empty());
        let stats = tracks.stats();
        assert_eq!(stats.listens, 0);
        assert!(stats.first_listen.is_none());
    }

    #[test]
    fn test_stats() {
        let tracks = aggregate(vec![
            event("a", "X", 7, 100),
            event("b", "Y", 2, 200),
            event("a", "X", 9, 300),
        ]);
        let stats = tracks.stats();
        assert_eq!(stats.tracks, 2);
        assert_eq!(stats.artists, 2);
        assert_eq!(stats.listens, 3);
        assert_eq!(stats.total_ms, 600);
        assert_eq!(stats.first_listen, Some(Utc.with_ymd_and_hms(2023, 3, 1, 12, 2, 0).unwrap()));
        assert_eq!(stats.last_listen, Some(Utc.with_ymd_and_hms(2023, 3, 1, 12, 9, 0).unwrap()));
    }
}
