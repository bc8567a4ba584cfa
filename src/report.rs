//! Named, reusable queries ("most played this year", ...) that can be
//! declared in the config file as `[[reports]]` tables.

use chrono::{DateTime, Months, NaiveDate, NaiveTime, Utc};
use serde::Deserialize;
use thiserror::Error;

use crate::aggregate::TrackMap;
use crate::filter::{self, FilteredTrack, ListenFilter};
use crate::rank::{self, Metric, RankError};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ReportError {
    #[error("Invalid date {value:?} (expected YYYY-MM-DD or RFC 3339)")]
    InvalidDate { value: String },
    #[error("Window of {months} months reaches before the earliest representable date")]
    InvalidWindow { months: u32 },
    #[error(transparent)]
    Rank(#[from] RankError),
}

/// A preset query. Dates are strings so the TOML stays simple to write.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub title: String,
    /// plays, time, skips or skip-ratio
    pub metric: String,
    pub limit: usize,
    /// Falls back to the config-wide `min_listen_ms` when unset.
    pub min_listen_ms: Option<u64>,
    pub after: Option<String>,
    pub before: Option<String>,
    /// Only count the last N months; takes precedence over `after`.
    pub since_months: Option<u32>,
    pub artist_include: Vec<String>,
    pub artist_exclude: Vec<String>,
    pub start_reasons: Vec<String>,
    pub end_reasons: Vec<String>,
    pub on_shuffle: Option<bool>,
    pub while_offline: Option<bool>,
    pub while_private: Option<bool>,
    pub skipped: Option<bool>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            title: "Top tracks".to_string(),
            metric: "plays".to_string(),
            limit: 10,
            min_listen_ms: None,
            after: None,
            before: None,
            since_months: None,
            artist_include: Vec::new(),
            artist_exclude: Vec::new(),
            start_reasons: Vec::new(),
            end_reasons: Vec::new(),
            on_shuffle: None,
            while_offline: None,
            while_private: None,
            skipped: None,
        }
    }
}

/// The ranked output of one report, truncated to its limit.
#[derive(Debug, Clone)]
pub struct Report {
    pub title: String,
    pub metric: Metric,
    pub rows: Vec<FilteredTrack>,
}

impl ReportConfig {
    /// Resolve into a concrete filter and metric. Relative windows are
    /// measured back from `now`.
    pub fn to_query(
        &self,
        now: DateTime<Utc>,
        default_min_ms: u64,
    ) -> Result<(ListenFilter, Metric), ReportError> {
        let metric: Metric = self.metric.parse()?;

        let after = match self.since_months {
            Some(months) => Some(
                now.checked_sub_months(Months::new(months))
                    .ok_or(ReportError::InvalidWindow { months })?,
            ),
            None => self.after.as_deref().map(parse_bound).transpose()?,
        };

        let filter = ListenFilter {
            min_listen_ms: self.min_listen_ms.unwrap_or(default_min_ms),
            before: self.before.as_deref().map(parse_bound).transpose()?,
            after,
            artist_include: self.artist_include.iter().cloned().collect(),
            artist_exclude: self.artist_exclude.iter().cloned().collect(),
            start_reasons: self.start_reasons.iter().cloned().collect(),
            end_reasons: self.end_reasons.iter().cloned().collect(),
            on_shuffle: self.on_shuffle,
            while_offline: self.while_offline,
            while_private: self.while_private,
            skipped: self.skipped,
        };
        Ok((filter, metric))
    }
}

/// Parse a filter bound: a bare date means midnight UTC at the start of it.
pub fn parse_bound(value: &str) -> Result<DateTime<Utc>, ReportError> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(|date| date.and_time(NaiveTime::MIN).and_utc())
        .map_err(|_| ReportError::InvalidDate {
            value: value.to_string(),
        })
}

/// Filter, rank and truncate in one go.
pub fn run_report(
    tracks: &TrackMap,
    config: &ReportConfig,
    now: DateTime<Utc>,
    default_min_ms: u64,
) -> Result<Report, ReportError> {
    let (filter, metric) = config.to_query(now, default_min_ms)?;
    log::debug!("Report {:?}: {:?} by {:?}", config.title, filter, metric);

    let mut rows = rank::rank(filter::filter_tracks(tracks, &filter), metric);
    rows.truncate(config.limit);

    Ok(Report {
        title: config.title.clone(),
        metric,
        rows,
    })
}

/// Reports used when the config file declares none.
pub fn default_reports() -> Vec<ReportConfig> {
    vec![
        ReportConfig {
            title: "Most played songs of the past year by play count (unskipped)".into(),
            metric: "plays".into(),
            since_months: Some(12),
            skipped: Some(false),
            ..ReportConfig::default()
        },
        ReportConfig {
            title: "Most played songs of the past year by time".into(),
            metric: "time".into(),
            since_months: Some(12),
            ..ReportConfig::default()
        },
        ReportConfig {
            title: "Most played songs of the past two years by play count (unskipped)".into(),
            metric: "plays".into(),
            since_months: Some(24),
            skipped: Some(false),
            ..ReportConfig::default()
        },
        ReportConfig {
            title: "Most played songs of all time by play count".into(),
            metric: "plays".into(),
            ..ReportConfig::default()
        },
        ReportConfig {
            title: "Most played songs of all time by time (total)".into(),
            metric: "time".into(),
            min_listen_ms: Some(0),
            ..ReportConfig::default()
        },
    ]
}
