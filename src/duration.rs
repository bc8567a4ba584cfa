/// Render a millisecond count as `H:MM:SS`. Hours are not padded or capped;
/// the sub-second remainder is dropped.
pub fn format_duration(ms: u64) -> String {
    let secs = ms / 1000;
    let hours = secs / 3600;
    let minutes = (secs / 60) % 60;
    let seconds = secs % 60;
    format!("{hours}:{minutes:02}:{seconds:02}")
}
