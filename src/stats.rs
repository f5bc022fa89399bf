//! Before/after statistics for a filtered dataset and the reporters that deliver them.

use crate::frame::{Cell, Frame};
use crate::record::{AUTHOR, CREATED_UTC, SUBREDDIT};
use anyhow::Result;
use serde::Serialize;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::{info, warn};

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ComparisonStats {
    pub original_subreddits: usize,
    pub top_n_subreddits: usize,
    pub original_rows: usize,
    pub filtered_rows: usize,
    pub original_users: usize,
    pub filtered_users: usize,
    /// Earliest and latest `created_utc` in the original data.
    pub time_span: Option<(i64, i64)>,
}

fn ratio(part: usize, whole: usize) -> Option<f64> {
    (whole > 0).then(|| part as f64 / whole as f64)
}

fn rfc3339(ts: i64) -> String {
    OffsetDateTime::from_unix_timestamp(ts)
        .ok()
        .and_then(|dt| dt.format(&Rfc3339).ok())
        .unwrap_or_else(|| ts.to_string())
}

impl ComparisonStats {
    pub fn compute(original: &Frame, filtered: &Frame, top_n: &Frame) -> Result<Self> {
        let time_span = if original.has_column(CREATED_UTC) {
            let ts: Vec<i64> = original.column(CREATED_UTC)?.filter_map(Cell::as_i64).collect();
            ts.iter().min().copied().zip(ts.iter().max().copied())
        } else {
            None
        };
        Ok(Self {
            original_subreddits: original.distinct_count(SUBREDDIT)?,
            top_n_subreddits: top_n.distinct_count(SUBREDDIT)?,
            original_rows: original.len(),
            filtered_rows: filtered.len(),
            original_users: original.distinct_count(AUTHOR)?,
            filtered_users: filtered.distinct_count(AUTHOR)?,
            time_span,
        })
    }

    /// Share of original rows kept; `None` when there were none.
    pub fn row_coverage(&self) -> Option<f64> {
        ratio(self.filtered_rows, self.original_rows)
    }

    /// Share of original users kept; `None` when there were none.
    pub fn user_coverage(&self) -> Option<f64> {
        ratio(self.filtered_users, self.original_users)
    }

    pub fn time_span_rfc3339(&self) -> Option<(String, String)> {
        self.time_span.map(|(lo, hi)| (rfc3339(lo), rfc3339(hi)))
    }
}

/// Sink for the diagnostics produced while building a dataset.
pub trait StatsReporter: Send + Sync {
    fn preview(&self, label: &str, frame: &Frame);
    fn comparison(&self, label: &str, stats: &ComparisonStats);
    fn max_context_length(&self, length: Option<i64>);
}

/// Logs everything through `tracing` at `info`.
#[derive(Clone, Debug)]
pub struct TracingReporter {
    pub preview_rows: usize,
}

impl Default for TracingReporter {
    fn default() -> Self {
        Self { preview_rows: 20 }
    }
}

impl StatsReporter for TracingReporter {
    fn preview(&self, label: &str, frame: &Frame) {
        info!("{label} ({} rows):\n{}", frame.len(), frame.preview(self.preview_rows));
    }

    fn comparison(&self, label: &str, stats: &ComparisonStats) {
        info!(
            "{label}: {} subreddits originally, {} kept in top-N",
            stats.original_subreddits, stats.top_n_subreddits
        );
        match stats.row_coverage() {
            Some(r) => info!(
                "{label}: {} of {} rows kept ({:.2}%)",
                stats.filtered_rows,
                stats.original_rows,
                r * 100.0
            ),
            None => warn!("{label}: original dataset has no rows; coverage not computed"),
        }
        match stats.user_coverage() {
            Some(r) => info!(
                "{label}: {} of {} users kept ({:.2}%)",
                stats.filtered_users,
                stats.original_users,
                r * 100.0
            ),
            None => warn!("{label}: original dataset has no users; coverage not computed"),
        }
        if let Some((lo, hi)) = stats.time_span_rfc3339() {
            info!("{label}: data spans {lo} .. {hi}");
        }
    }

    fn max_context_length(&self, length: Option<i64>) {
        match length {
            Some(n) => info!("max context length: {n}"),
            None => info!("max context length: no contexts"),
        }
    }
}

/// Discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct SilentReporter;

impl StatsReporter for SilentReporter {
    fn preview(&self, _label: &str, _frame: &Frame) {}
    fn comparison(&self, _label: &str, _stats: &ComparisonStats) {}
    fn max_context_length(&self, _length: Option<i64>) {}
}
