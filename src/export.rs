//! Reading streaming-history export files.
//!
//! An export is a directory of `Streaming_History_Audio_*.json` files, each a
//! JSON array of play records. Files are concatenated in file-name order and
//! never re-sorted by timestamp.

use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use thiserror::Error;
use walkdir::WalkDir;

use crate::normalize::{self, NormalizeError, NormalizedEvent, RawEvent};

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid export data in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Normalize(#[from] NormalizeError),
}

/// Find export files directly inside `dir` whose name starts with `prefix`,
/// sorted by file name.
pub fn discover_exports(dir: &Path, prefix: &str) -> Result<Vec<PathBuf>, LoadError> {
    if !dir.is_dir() {
        return Err(LoadError::Io {
            path: dir.display().to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
        });
    }

    let files: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            let name = e.file_name().to_string_lossy();
            name.starts_with(prefix) && name.ends_with(".json")
        })
        .map(|e| e.into_path())
        .collect();

    log::info!("Found {} export files in {}", files.len(), dir.display());
    Ok(files)
}

/// Read and concatenate the raw records of every file, in argument order.
pub fn read_raw_events(paths: &[PathBuf]) -> Result<Vec<RawEvent>, LoadError> {
    let pb = ProgressBar::new(paths.len() as u64);
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} files {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );

    let mut events = Vec::new();
    for path in paths {
        pb.set_message(
            path.file_name()
                .map(|f| f.to_string_lossy().to_string())
                .unwrap_or_default(),
        );

        let contents = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let batch: Vec<RawEvent> =
            serde_json::from_str(&contents).map_err(|source| LoadError::Json {
                path: path.display().to_string(),
                source,
            })?;

        log::debug!("{}: {} records", path.display(), batch.len());
        events.extend(batch);
        pb.inc(1);
    }

    pb.finish_and_clear();
    Ok(events)
}

/// Read every file and normalize the concatenated records.
pub fn load_events(paths: &[PathBuf]) -> Result<Vec<NormalizedEvent>, LoadError> {
    let raws = read_raw_events(paths)?;
    let events = normalize::normalize_events(&raws)?;
    log::info!(
        "Loaded {} music plays from {} records",
        events.len(),
        raws.len()
    );
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const FILE_A: &str = r#"[
        {"ts": "2022-12-31T23:50:00Z", "platform": "ios", "ms_played": 180000,
         "conn_country": "NL",
         "master_metadata_track_name": "Ashes to Ashes",
         "master_metadata_album_artist_name": "David Bowie",
         "master_metadata_album_album_name": "Scary Monsters",
         "spotify_track_uri": "spotify:track:ashes",
         "reason_start": "clickrow", "reason_end": "trackdone",
         "shuffle": false, "skipped": null, "offline": false, "incognito_mode": false},
        {"ts": "2023-01-01T00:10:00Z", "platform": "ios", "ms_played": 1200000,
         "master_metadata_track_name": null,
         "master_metadata_album_artist_name": null,
         "master_metadata_album_album_name": null,
         "spotify_track_uri": null,
         "episode_name": "Some Podcast",
         "reason_start": "clickrow", "reason_end": "endplay",
         "shuffle": false, "skipped": null, "offline": false, "incognito_mode": false}
    ]"#;

    const FILE_B: &str = r#"[
        {"ts": "2023-01-02T08:00:00Z", "platform": "ios", "ms_played": 5000,
         "master_metadata_track_name": "Ashes to Ashes",
         "master_metadata_album_artist_name": "David Bowie",
         "master_metadata_album_album_name": "Scary Monsters",
         "spotify_track_uri": "spotify:track:ashes",
         "reason_start": "fwdbtn", "reason_end": "fwdbtn",
         "shuffle": true, "skipped": true, "offline": false, "incognito_mode": false}
    ]"#;

    fn write_export(dir: &Path) {
        fs::write(dir.join("Streaming_History_Audio_2023_1.json"), FILE_B).unwrap();
        fs::write(dir.join("Streaming_History_Audio_2022_0.json"), FILE_A).unwrap();
        fs::write(dir.join("Streaming_History_Video_2023.json"), "[]").unwrap();
        fs::write(dir.join("ReadMeFirst.pdf"), "not json").unwrap();
    }

    #[test]
    fn test_discover_sorted_and_prefixed() {
        let dir = tempfile::tempdir().unwrap();
        write_export(dir.path());

        let files = discover_exports(dir.path(), crate::EXPORT_FILE_PREFIX).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(
            names,
            vec![
                "Streaming_History_Audio_2022_0.json",
                "Streaming_History_Audio_2023_1.json"
            ]
        );
    }

    #[test]
    fn test_discover_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let err = discover_exports(&dir.path().join("nope"), crate::EXPORT_FILE_PREFIX);
        assert!(matches!(err, Err(LoadError::Io { .. })));
    }

    #[test]
    fn test_load_concatenates_in_order() {
        let dir = tempfile::tempdir().unwrap();
        write_export(dir.path());
        let files = discover_exports(dir.path(), crate::EXPORT_FILE_PREFIX).unwrap();

        let raws = read_raw_events(&files).unwrap();
        assert_eq!(raws.len(), 3);

        let events = load_events(&files).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].ms_played, 180000);
        assert_eq!(events[1].ms_played, 5000);
        assert!(events[1].skipped);
    }

    #[test]
    fn test_invalid_json_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Streaming_History_Audio_bad.json");
        fs::write(&path, r#"[{"ts": "2023-01-01T00:00:00Z"}]"#).unwrap();

        // ms_played is required
        let err = read_raw_events(&[path]).unwrap_err();
        assert!(matches!(err, LoadError::Json { .. }));
    }

    #[test]
    fn test_bad_timestamp_fails_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Streaming_History_Audio_bad.json");
        fs::write(
            &path,
            r#"[{"ts": "01/02/2023", "ms_played": 1000, "spotify_track_uri": "spotify:track:x",
                "master_metadata_track_name": "X", "master_metadata_album_artist_name": "Y",
                "master_metadata_album_album_name": "Z"}]"#,
        )
        .unwrap();

        let err = load_events(&[path]).unwrap_err();
        assert!(matches!(err, LoadError::Normalize(NormalizeError::Timestamp { .. })));
    }
}
