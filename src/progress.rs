//! Progress reporting for a reconciliation pass.
//!
//! Interactive runs get an indicatif bar showing the source being matched;
//! `--log-only` runs hide it and print `[match] n/total sources` lines every
//! [`LOG_INTERVAL`] sources instead, which read better in captured logs.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::models::NameRecord;

/// Global flag for log-only mode (set from args in main)
pub static LOG_ONLY: AtomicBool = AtomicBool::new(false);

/// Phase tag used in log lines and `[STATS:match]` dumps.
pub const MATCH_PHASE: &str = "match";

/// Sources between two log-only progress lines.
pub const LOG_INTERVAL: u64 = 100;

/// Longest source name shown next to the bar.
const MAX_SHOWN_NAME: usize = 40;

pub fn set_log_only(value: bool) {
    LOG_ONLY.store(value, Ordering::Relaxed);
}

pub fn is_log_only() -> bool {
    LOG_ONLY.load(Ordering::Relaxed)
}

/// Format duration in human-readable format
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        format!("{:.1}m", secs / 60.0)
    }
}

/// Tracks sources processed during one reconciliation pass.
///
/// Feed it from the `reconcile_with_progress` callback.
pub struct MatchProgress {
    bar: ProgressBar,
    processed: u64,
    total: u64,
}

impl MatchProgress {
    pub fn new(total_sources: u64) -> Self {
        let bar = ProgressBar::new(total_sources);
        if is_log_only() {
            bar.set_draw_target(ProgressDrawTarget::hidden());
        } else {
            let style = ProgressStyle::default_bar()
                .template("Matching sources [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> ");
            bar.set_style(style);
        }
        Self {
            bar,
            processed: 0,
            total: total_sources,
        }
    }

    /// Count `source` as done.
    pub fn source_done(&mut self, source: &NameRecord) {
        self.processed += 1;
        self.bar.inc(1);
        if is_log_only() {
            if let Some(line) = progress_line(self.processed, self.total, LOG_INTERVAL) {
                eprintln!("{}", line);
            }
        } else {
            self.bar.set_message(shown_name(source));
        }
    }

    pub fn processed(&self) -> u64 {
        self.processed
    }

    pub fn finish(self) {
        self.bar.finish_and_clear();
    }
}

/// Log-only line for the `current`-th source, every `interval` sources and at the end.
fn progress_line(current: u64, total: u64, interval: u64) -> Option<String> {
    if total == 0 || (current % interval.max(1) != 0 && current != total) {
        return None;
    }
    Some(format!(
        "[{}] {}/{} sources ({:.1}%)",
        MATCH_PHASE,
        current,
        total,
        progress_percent(current, total)
    ))
}

fn progress_percent(current: u64, total: u64) -> f64 {
    if total == 0 {
        100.0
    } else {
        100.0 * current as f64 / total as f64
    }
}

/// Display name of the source, cut to fit beside the bar.
fn shown_name(source: &NameRecord) -> String {
    let name = source.display_name();
    let name = if name.is_empty() { source.id.as_str() } else { name };
    if name.chars().count() <= MAX_SHOWN_NAME {
        name.to_string()
    } else {
        let cut: String = name.chars().take(MAX_SHOWN_NAME - 1).collect();
        format!("{}…", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.5s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1.5m");
    }

    #[test]
    fn test_progress_percent() {
        assert_eq!(progress_percent(5, 20), 25.0);
        assert_eq!(progress_percent(0, 0), 100.0);
    }

    #[test]
    fn test_progress_line_interval() {
        assert_eq!(progress_line(100, 250, 100).as_deref(), Some("[match] 100/250 sources (40.0%)"));
        assert_eq!(progress_line(101, 250, 100), None);
        assert_eq!(progress_line(250, 250, 100).as_deref(), Some("[match] 250/250 sources (100.0%)"));
        assert_eq!(progress_line(0, 0, 100), None);
        assert!(progress_line(3, 10, 0).is_some());
    }

    #[test]
    fn test_shown_name() {
        assert_eq!(shown_name(&NameRecord::new("u1", "Taller I")), "Taller I");
        assert_eq!(shown_name(&NameRecord::with_names("u2", vec![])), "u2");
        let long = NameRecord::new("u3", "x".repeat(60));
        let shown = shown_name(&long);
        assert_eq!(shown.chars().count(), MAX_SHOWN_NAME);
        assert!(shown.ends_with('…'));
    }

    #[test]
    fn test_match_progress_counts_sources() {
        let mut progress = MatchProgress::new(2);
        progress.source_done(&NameRecord::new("u1", "Taller I"));
        progress.source_done(&NameRecord::new("u2", "Tipografia I"));
        assert_eq!(progress.processed(), 2);
        progress.finish();
    }
}
