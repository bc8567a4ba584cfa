pub mod aggregate;
pub mod config;
pub mod duration;
pub mod export;
pub mod filter;
pub mod normalize;
pub mod rank;
pub mod report;

/// Default file-name prefix of the audio streaming-history export files.
pub const EXPORT_FILE_PREFIX: &str = "Streaming_History_Audio_";

/// Default minimum listen length (ms) for a play to count in reports.
pub const MIN_LISTEN_MS: u64 = 30_000;

/// Application name for XDG paths
pub const APP_NAME: &str = "spinback";
