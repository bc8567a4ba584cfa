//! Per-query slicing of listening history.
//!
//! A [`ListenFilter`] is evaluated against every listen of every track. The
//! artist lists gate whole tracks; every other predicate gates single
//! listens. Each surviving track is reduced to a [`FilteredTrack`] that keeps
//! only what ranking needs: the durations of the kept listens and a skip
//! tally.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::aggregate::{Listen, Track, TrackMap};

/// Predicates for one query. The default value restricts nothing.
#[derive(Debug, Clone, Default)]
pub struct ListenFilter {
    /// Listens shorter than this many milliseconds are dropped.
    pub min_listen_ms: u64,
    /// Inclusive upper bound on the listen timestamp.
    pub before: Option<DateTime<Utc>>,
    /// Inclusive lower bound on the listen timestamp.
    pub after: Option<DateTime<Utc>>,
    /// When non-empty, only tracks by these artists are considered.
    pub artist_include: HashSet<String>,
    pub artist_exclude: HashSet<String>,
    /// When non-empty, only listens started for one of these reasons are kept.
    pub start_reasons: HashSet<String>,
    /// When non-empty, only listens ended for one of these reasons are kept.
    pub end_reasons: HashSet<String>,
    pub on_shuffle: Option<bool>,
    pub while_offline: Option<bool>,
    pub while_private: Option<bool>,
    pub skipped: Option<bool>,
}

/// A track reduced to the listens that survived a filter.
#[derive(Debug, Clone, PartialEq)]
pub struct FilteredTrack {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub uri: String,
    /// `ms_played` of every kept listen, in listen order
    pub kept_ms: Vec<u64>,
    /// Skipped listens that reached the skip check; may exceed `plays()`
    pub skips: u64,
}

impl FilteredTrack {
    fn empty(track: &Track) -> Self {
        Self {
            title: track.title.clone(),
            artist: track.artist.clone(),
            album: track.album.clone(),
            uri: track.uri.clone(),
            kept_ms: Vec::new(),
            skips: 0,
        }
    }

    pub fn plays(&self) -> usize {
        self.kept_ms.len()
    }

    pub fn total_ms(&self) -> u64 {
        self.kept_ms.iter().sum()
    }

    /// Skips per kept play, or -1.0 when nothing was kept.
    pub fn skip_ratio(&self) -> f64 {
        if self.kept_ms.is_empty() {
            -1.0
        } else {
            self.skips as f64 / self.kept_ms.len() as f64
        }
    }
}

/// Outcome of running a single listen through the per-listen predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    /// Excluded before the skip check was reached
    Dropped,
    /// Reached the skip check, then excluded by the `skipped` option
    DroppedAfterTally,
    Kept,
}

impl ListenFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a whole track passes the artist allow/deny lists.
    pub fn admits_artist(&self, artist: &str) -> bool {
        if !self.artist_include.is_empty() && !self.artist_include.contains(artist) {
            return false;
        }
        !self.artist_exclude.contains(artist)
    }

    /// Checks run in a fixed order and stop at the first failure. The skip
    /// tally sits between the context flags and the `skipped` option.
    fn judge(&self, listen: &Listen) -> Verdict {
        if listen.ms_played < self.min_listen_ms {
            return Verdict::Dropped;
        }

        if self.before.is_some_and(|before| listen.ts > before) {
            return Verdict::Dropped;
        }
        if self.after.is_some_and(|after| listen.ts < after) {
            return Verdict::Dropped;
        }

        if !self.start_reasons.is_empty() && !self.start_reasons.contains(&listen.reason_start) {
            return Verdict::Dropped;
        }
        if !self.end_reasons.is_empty() && !self.end_reasons.contains(&listen.reason_end) {
            return Verdict::Dropped;
        }

        if !flag_matches(self.on_shuffle, listen.shuffle)
            || !flag_matches(self.while_offline, listen.offline)
            || !flag_matches(self.while_private, listen.incognito)
        {
            return Verdict::Dropped;
        }

        if !flag_matches(self.skipped, listen.skipped) {
            return Verdict::DroppedAfterTally;
        }
        Verdict::Kept
    }

    /// Reduce one track, or `None` if its artist is filtered out.
    pub fn apply(&self, track: &Track) -> Option<FilteredTrack> {
        if !self.admits_artist(&track.artist) {
            return None;
        }

        let mut filtered = FilteredTrack::empty(track);
        for listen in &track.listens {
            let verdict = self.judge(listen);
            if verdict != Verdict::Dropped && listen.skipped {
                filtered.skips += 1;
            }
            if verdict == Verdict::Kept {
                filtered.kept_ms.push(listen.ms_played);
            }
        }
        Some(filtered)
    }
}

fn flag_matches(wanted: Option<bool>, actual: bool) -> bool {
    wanted.is_none_or(|w| w == actual)
}

/// Apply `filter` to every track, in map order. Tracks removed by the artist
/// lists are absent from the result; tracks with no kept listens are not.
pub fn filter_tracks(tracks: &TrackMap, filter: &ListenFilter) -> Vec<FilteredTrack> {
    let filtered: Vec<FilteredTrack> = tracks.iter().filter_map(|t| filter.apply(t)).collect();
    log::debug!(
        "Filter kept {} of {} tracks ({} listens)",
        filtered.len(),
        tracks.len(),
        filtered.iter().map(|f| f.plays()).sum::<usize>()
    );
    filtered
}
