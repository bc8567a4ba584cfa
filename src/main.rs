use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use spinback::aggregate::TrackMap;
use spinback::duration::format_duration;
use spinback::filter::{FilteredTrack, ListenFilter};
use spinback::rank::Metric;
use spinback::report::parse_bound;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "spinback", version, about = "Streaming-history analyzer")]
struct Cli {
    /// Directory containing the export files
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Read these export files instead of scanning a directory (repeatable)
    #[arg(long = "file", global = true)]
    files: Vec<PathBuf>,

    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show top tracks for an ad-hoc query
    Top {
        /// Which metric to rank by
        #[arg(short, long, value_enum, default_value = "plays")]
        metric: Metric,

        /// Number of results (defaults to config top_count)
        #[arg(short = 'n', long)]
        limit: Option<usize>,

        /// Minimum listen length in milliseconds (defaults to config min_listen_ms)
        #[arg(long)]
        min_ms: Option<u64>,

        /// Only listens at or after this time (YYYY-MM-DD or RFC 3339)
        #[arg(long)]
        after: Option<String>,

        /// Only listens at or before this time (YYYY-MM-DD or RFC 3339)
        #[arg(long)]
        before: Option<String>,

        /// Only tracks by this artist (repeatable)
        #[arg(long = "artist")]
        artists: Vec<String>,

        /// Never tracks by this artist (repeatable)
        #[arg(long = "exclude-artist")]
        exclude_artists: Vec<String>,

        /// Only listens started for this reason, e.g. clickrow (repeatable)
        #[arg(long = "start-reason")]
        start_reasons: Vec<String>,

        /// Only listens ended for this reason, e.g. trackdone (repeatable)
        #[arg(long = "end-reason")]
        end_reasons: Vec<String>,

        /// Only listens with shuffle on (true) or off (false)
        #[arg(long)]
        shuffle: Option<bool>,

        /// Only listens played offline (true) or online (false)
        #[arg(long)]
        offline: Option<bool>,

        /// Only listens in (true) or outside (false) a private session
        #[arg(long)]
        private: Option<bool>,

        /// Only skipped (true) or unskipped (false) listens
        #[arg(long)]
        skipped: Option<bool>,
    },

    /// Run the preset reports from the config file (or the built-in set)
    Wrapped,

    /// Show export statistics
    Stats,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load config file (optional, defaults if missing)
    let config = spinback::config::AppConfig::load();

    // Resolve input files: --file > --data-dir > config > ./MyData
    let files = if !cli.files.is_empty() {
        cli.files
    } else {
        let dir = cli
            .data_dir
            .or(config.export_dir.clone())
            .unwrap_or_else(spinback::config::default_export_dir);
        log::info!("Export directory: {}", dir.display());
        spinback::export::discover_exports(&dir, &config.file_prefix)
            .context("Failed to locate export files")?
    };

    if files.is_empty() {
        anyhow::bail!(
            "No export files found. Pass --file or --data-dir, or set export_dir in config."
        );
    }

    let events = spinback::export::load_events(&files).context("Failed to load export")?;
    let tracks = spinback::aggregate::aggregate(events);

    match cli.command {
        Commands::Top {
            metric,
            limit,
            min_ms,
            after,
            before,
            artists,
            exclude_artists,
            start_reasons,
            end_reasons,
            shuffle,
            offline,
            private,
            skipped,
        } => {
            let filter = ListenFilter {
                min_listen_ms: min_ms.unwrap_or(config.min_listen_ms),
                before: before.as_deref().map(parse_bound).transpose()?,
                after: after.as_deref().map(parse_bound).transpose()?,
                artist_include: artists.into_iter().collect(),
                artist_exclude: exclude_artists.into_iter().collect(),
                start_reasons: start_reasons.into_iter().collect(),
                end_reasons: end_reasons.into_iter().collect(),
                on_shuffle: shuffle,
                while_offline: offline,
                while_private: private,
                skipped,
            };

            let filtered = spinback::filter::filter_tracks(&tracks, &filter);
            let mut ranked = spinback::rank::rank(filtered, metric);
            ranked.truncate(limit.unwrap_or(config.top_count));

            if ranked.is_empty() {
                println!("No results found.");
                return Ok(());
            }

            println!("Top {} tracks by {}:", ranked.len(), metric.label());
            println!();
            print_track_table(&ranked);
        }

        Commands::Wrapped => {
            let now = chrono::Utc::now();
            for report_config in config.reports_or_default() {
                let report = spinback::report::run_report(
                    &tracks,
                    &report_config,
                    now,
                    config.min_listen_ms,
                )
                .with_context(|| format!("Report \"{}\" failed", report_config.title))?;

                println!("{} (by {})", report.title, report.metric.label());
                println!();
                if report.rows.is_empty() {
                    println!("No results found.");
                } else {
                    print_track_table(&report.rows);
                }
                println!();
            }
        }

        Commands::Stats => print_stats(&tracks),
    }

    Ok(())
}

/// Print ranked tracks: rank, plays, time, skips, then "title by artist".
fn print_track_table(tracks: &[FilteredTrack]) {
    println!("{:>4}  {:>5}  {:>9}  {:>5}  Song", "#", "Plays", "Time", "Skips");
    println!("{}", "-".repeat(80));

    for (i, t) in tracks.iter().enumerate() {
        println!(
            "{:>4}  {:>5}  {:>9}  {:>5}  {} by {}",
            i + 1,
            t.plays(),
            format_duration(t.total_ms()),
            t.skips,
            t.title,
            t.artist,
        );
    }
}

fn print_stats(tracks: &TrackMap) {
    let stats = tracks.stats();
    println!("Listening Statistics");
    println!("====================");
    println!("Distinct tracks:  {}", stats.tracks);
    println!("Distinct artists: {}", stats.artists);
    println!("Total plays:      {}", stats.listens);
    println!("Total time:       {}", format_duration(stats.total_ms));
    if let (Some(first), Some(last)) = (stats.first_listen, stats.last_listen) {
        println!(
            "Date range:       {} to {}",
            first.format("%Y-%m-%d"),
            last.format("%Y-%m-%d")
        );
    }
}
