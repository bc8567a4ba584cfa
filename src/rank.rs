use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use thiserror::Error;

use crate::filter::FilteredTrack;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RankError {
    #[error("Unknown ranking metric {0:?} (expected plays, time, skips or skip-ratio)")]
    UnknownMetric(String),
}

/// What to rank filtered tracks by. Every metric sorts descending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Metric {
    /// Number of kept listens
    Plays,
    /// Total kept listening time
    Time,
    /// Skip tally
    Skips,
    /// Skips per kept play; tracks with no kept plays rank last
    #[value(alias = "skip_ratio")]
    SkipRatio,
}

impl Metric {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Plays => "play count",
            Self::Time => "listening time",
            Self::Skips => "skips",
            Self::SkipRatio => "skip ratio",
        }
    }

    /// Sort key for a track under this metric.
    pub fn key(&self, track: &FilteredTrack) -> f64 {
        match self {
            Self::Plays => track.plays() as f64,
            Self::Time => track.total_ms() as f64,
            Self::Skips => track.skips as f64,
            Self::SkipRatio => track.skip_ratio(),
        }
    }
}

impl FromStr for Metric {
    type Err = RankError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "plays" => Ok(Self::Plays),
            "time" => Ok(Self::Time),
            "skips" => Ok(Self::Skips),
            "skip-ratio" | "skip_ratio" | "skipRatio" | "skip ratio" => Ok(Self::SkipRatio),
            other => Err(RankError::UnknownMetric(other.to_string())),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Sort tracks by `metric`, highest first. Ties keep their input order.
pub fn rank(mut tracks: Vec<FilteredTrack>, metric: Metric) -> Vec<FilteredTrack> {
    // sort_by is stable
    tracks.sort_by(|a, b| metric.key(b).total_cmp(&metric.key(a)));
    tracks
}
