//! Implementation of the `lh report` command.
//!
//! Parses the given CSV, applies the persisted overlay, runs the aggregation
//! engine, and renders the snapshot (human-readable or `--json`).

use std::fmt::Write;
use std::path::Path;

use anyhow::{Context, Result};
use lh_core::{GroupCount, Overlay, Statistics, analyze};

/// How many entries each ranked section shows in human output before
/// collapsing to "... and N more". JSON output is never truncated here.
const DISPLAY_CAP: usize = 10;

/// Run the report command.
pub fn run(db: lh_db::Database, file: &Path, top: Option<usize>, json: bool) -> Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let mut library = lh_core::csv::parse(&text)
        .with_context(|| format!("failed to parse {}", file.display()))?;

    let overlay = Overlay::load(db).context("failed to load overlay")?;
    overlay.apply_to(&mut library);

    let stats = analyze(library.events(), top);

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        print!("{}", format_report(&stats, file));
    }
    Ok(())
}

// ========== Duration Formatting ==========

/// Formats seconds as a duration string: "Xh Ym" above an hour, "Xm Ys"
/// above a minute, plain seconds below that.
pub fn format_duration(secs: u64) -> String {
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;

    if hours >= 1 {
        format!("{hours}h {minutes}m")
    } else if minutes >= 1 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}

// ========== Progress Bar ==========

/// Generates a 10-character progress bar. Values under 5% of max get a
/// single block for visibility.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn progress_bar(value: u64, max: u64) -> String {
    if max == 0 {
        return "░░░░░░░░░░".to_string();
    }

    let ratio = value as f64 / max as f64;
    let filled = if ratio < 0.05 && value > 0 {
        1
    } else {
        (ratio * 10.0).round().min(10.0) as usize
    };

    let empty = 10 - filled;
    format!("{}{}", "█".repeat(filled), "░".repeat(empty))
}

// ========== Rendering ==========

fn write_ranked_section(output: &mut String, title: &str, groups: &[GroupCount]) {
    if groups.is_empty() {
        return;
    }
    let max = groups.first().map_or(0, |g| g.count);
    writeln!(output).unwrap();
    writeln!(output, "{title}").unwrap();
    writeln!(output, "{}", "─".repeat(title.len())).unwrap();
    for group in groups.iter().take(DISPLAY_CAP) {
        let bar = progress_bar(group.count, max);
        writeln!(output, "  {:<32} {:>6}  {bar}", group.name, group.count).unwrap();
    }
    let remaining = groups.len().saturating_sub(DISPLAY_CAP);
    if remaining > 0 {
        writeln!(output, "  ... and {remaining} more").unwrap();
    }
}

/// Formats the human-readable report output.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn format_report(stats: &Statistics, source: &Path) -> String {
    let mut output = String::new();

    writeln!(output, "LISTENING REPORT: {}", source.display()).unwrap();

    if stats.total_plays == 0 {
        writeln!(output).unwrap();
        writeln!(output, "No plays found in this file.").unwrap();
        return output;
    }

    write_ranked_section(&mut output, "TOP ARTISTS", &stats.top_artists);
    write_ranked_section(&mut output, "TOP ALBUMS", &stats.top_albums);

    if !stats.top_tracks.is_empty() {
        writeln!(output).unwrap();
        writeln!(output, "TOP TRACKS").unwrap();
        writeln!(output, "──────────").unwrap();
        let max = stats.top_tracks.first().map_or(0, |t| t.count);
        for tally in stats.top_tracks.iter().take(DISPLAY_CAP) {
            let bar = progress_bar(tally.count, max);
            let name = format!("{} — {}", tally.artist, tally.track);
            writeln!(output, "  {name:<32} {:>6}  {bar}", tally.count).unwrap();
        }
        let remaining = stats.top_tracks.len().saturating_sub(DISPLAY_CAP);
        if remaining > 0 {
            writeln!(output, "  ... and {remaining} more").unwrap();
        }
    }

    write_ranked_section(&mut output, "TOP GENRES", &stats.top_genres);

    // Time buckets only render when at least one record had a timestamp.
    let timestamped: u64 = stats.patterns.by_hour.iter().sum();
    if timestamped > 0 {
        writeln!(output).unwrap();
        writeln!(output, "LISTENING PATTERNS").unwrap();
        writeln!(output, "──────────────────").unwrap();
        let (peak_hour, peak_count) = stats
            .patterns
            .by_hour
            .iter()
            .enumerate()
            .max_by_key(|&(_, &c)| c)
            .map(|(h, &c)| (h, c))
            .unwrap_or((0, 0));
        writeln!(output, "  Peak hour:  {peak_hour:02}:00 ({peak_count} plays)").unwrap();
        if let Some(day) = stats.patterns.by_weekday.first() {
            writeln!(output, "  Top day:    {} ({} plays)", day.name, day.count).unwrap();
        }
        if let Some(month) = stats.patterns.by_month.first() {
            writeln!(output, "  Top month:  {} ({} plays)", month.name, month.count).unwrap();
        }
    }

    writeln!(output).unwrap();
    writeln!(output, "SUMMARY").unwrap();
    writeln!(output, "───────").unwrap();
    writeln!(output, "Total plays:     {}", stats.total_plays).unwrap();
    writeln!(
        output,
        "Total listening: {}",
        format_duration(stats.total_listening_secs)
    )
    .unwrap();
    if stats.average_track_duration_secs > 0.0 {
        writeln!(
            output,
            "Average track:   {}",
            format_duration(stats.average_track_duration_secs.round() as u64)
        )
        .unwrap();
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn sample_stats() -> Statistics {
        let library = lh_core::csv::parse(
            "Artist,Album,Track,Count,Duration\nA,X,T1,3,\nA,X,T2,5,240\nB,Y,T3,1,100\n",
        )
        .unwrap();
        analyze(library.events(), None)
    }

    #[test]
    fn format_duration_picks_sensible_units() {
        assert_eq!(format_duration(42), "42s");
        assert_eq!(format_duration(222), "3m 42s");
        assert_eq!(format_duration(16_320), "4h 32m");
    }

    #[test]
    fn progress_bar_scales_and_clamps() {
        assert_eq!(progress_bar(10, 10), "██████████");
        assert_eq!(progress_bar(5, 10), "█████░░░░░");
        assert_eq!(progress_bar(0, 10), "░░░░░░░░░░");
        assert_eq!(progress_bar(0, 0), "░░░░░░░░░░");
        // Tiny but nonzero values stay visible.
        assert_eq!(progress_bar(1, 1000), "█░░░░░░░░░");
    }

    #[test]
    fn report_contains_sections_and_totals() {
        let report = format_report(&sample_stats(), &PathBuf::from("history.csv"));
        assert!(report.contains("LISTENING REPORT: history.csv"));
        assert!(report.contains("TOP ARTISTS"));
        assert!(report.contains("TOP TRACKS"));
        assert!(report.contains("Total plays:     9"));
        // 240×5 + 100×1 = 1300s
        assert!(report.contains("Total listening: 21m 40s"));
    }

    #[test]
    fn empty_snapshot_renders_hint_instead_of_sections() {
        let report = format_report(&Statistics::default(), &PathBuf::from("empty.csv"));
        assert!(report.contains("No plays found"));
        assert!(!report.contains("TOP ARTISTS"));
    }
}
