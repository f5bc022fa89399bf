use crate::filters::{DEFAULT_TOP_N, DEFAULT_USER_EXCLUDE, USER_PAGE_PATTERN};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

pub const DEFAULT_MIN_SENTENCE_LENGTH: usize = 2;

/// Corpus-building options with defaults and builder chaining.
#[derive(Clone, Debug)]
pub struct BuildOptions {
    pub top_n: usize,
    pub min_sentence_length: usize,  // shortest author context kept
    pub exclude_top_perc: f64,       // fraction of most active users dropped
    pub max_time_delta: Option<i64>, // seconds; comments at or after this are dropped
    pub min_time_delta: Option<i64>, // seconds; only applied alongside a max
    pub user_page_pattern: String,
    pub quiet: bool,                 // skip statistics and previews
    pub preview_rows: usize,
    pub parallelism: Option<usize>,  // Some(N) to set rayon threads, None to use default
    pub file_concurrency: usize,     // limit number of input files decoded concurrently
    pub progress: bool,
    pub progress_label: Option<String>,

    // IO tuning
    pub read_buffer_bytes: usize,
    pub write_buffer_bytes: usize,

    // output
    pub output_partitions: usize,
    pub compression_level: i32,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            top_n: DEFAULT_TOP_N,
            min_sentence_length: DEFAULT_MIN_SENTENCE_LENGTH,
            exclude_top_perc: DEFAULT_USER_EXCLUDE,
            max_time_delta: None,
            min_time_delta: None,
            user_page_pattern: USER_PAGE_PATTERN.to_string(),
            quiet: false,
            preview_rows: 20,
            parallelism: None,
            file_concurrency: 1, // large zstd windows make parallel decoding memory hungry
            progress: false,
            progress_label: None,

            read_buffer_bytes: 256 * 1024,
            write_buffer_bytes: 256 * 1024,

            output_partitions: 8,
            compression_level: 3,
        }
    }
}

impl BuildOptions {
    pub fn with_top_n(mut self, n: usize) -> Self {
        self.top_n = n;
        self
    }
    pub fn with_min_sentence_length(mut self, n: usize) -> Self {
        self.min_sentence_length = n;
        self
    }
    pub fn with_exclude_top_perc(mut self, fraction: f64) -> Self {
        self.exclude_top_perc = fraction;
        self
    }
    pub fn with_time_window(mut self, min: Option<i64>, max: Option<i64>) -> Self {
        self.min_time_delta = min;
        self.max_time_delta = max;
        self
    }
    pub fn with_user_page_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.user_page_pattern = pattern.into();
        self
    }
    pub fn with_quiet(mut self, yes: bool) -> Self {
        self.quiet = yes;
        self
    }
    pub fn with_preview_rows(mut self, n: usize) -> Self {
        self.preview_rows = n;
        self
    }
    pub fn with_parallelism(mut self, threads: usize) -> Self {
        self.parallelism = Some(threads);
        self
    }
    pub fn with_file_concurrency(mut self, n: usize) -> Self {
        self.file_concurrency = n.max(1);
        self
    }
    pub fn with_progress(mut self, yes: bool) -> Self {
        self.progress = yes;
        self
    }
    pub fn with_progress_label(mut self, label: impl Into<String>) -> Self {
        self.progress_label = Some(label.into());
        self
    }
    pub fn with_io_buffers(mut self, read_bytes: usize, write_bytes: usize) -> Self {
        self.read_buffer_bytes = read_bytes.max(8 * 1024);
        self.write_buffer_bytes = write_bytes.max(8 * 1024);
        self
    }
    pub fn with_output_partitions(mut self, n: usize) -> Self {
        self.output_partitions = n.max(1);
        self
    }
    pub fn with_compression_level(mut self, level: i32) -> Self {
        self.compression_level = level;
        self
    }
}

/// Optional JSON configuration file. Every field is optional and overrides the
/// matching `BuildOptions` default; command-line flags are applied afterwards.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub log_level: Option<String>,
    pub top_n: Option<usize>,
    pub min_sentence_length: Option<usize>,
    pub exclude_top_perc: Option<f64>,
    pub max_time_delta: Option<i64>,
    pub min_time_delta: Option<i64>,
    pub user_page_pattern: Option<String>,
    pub preview_rows: Option<usize>,
    pub parallelism: Option<usize>,
    pub file_concurrency: Option<usize>,
    pub progress: Option<bool>,
    pub read_buffer_bytes: Option<usize>,
    pub write_buffer_bytes: Option<usize>,
    pub output_partitions: Option<usize>,
    pub compression_level: Option<i32>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn apply(&self, mut opts: BuildOptions) -> BuildOptions {
        if let Some(v) = self.top_n {
            opts = opts.with_top_n(v);
        }
        if let Some(v) = self.min_sentence_length {
            opts = opts.with_min_sentence_length(v);
        }
        if let Some(v) = self.exclude_top_perc {
            opts = opts.with_exclude_top_perc(v);
        }
        if self.max_time_delta.is_some() || self.min_time_delta.is_some() {
            opts = opts.with_time_window(self.min_time_delta, self.max_time_delta);
        }
        if let Some(v) = &self.user_page_pattern {
            opts = opts.with_user_page_pattern(v.clone());
        }
        if let Some(v) = self.preview_rows {
            opts = opts.with_preview_rows(v);
        }
        if let Some(v) = self.parallelism {
            opts = opts.with_parallelism(v);
        }
        if let Some(v) = self.file_concurrency {
            opts = opts.with_file_concurrency(v);
        }
        if let Some(v) = self.progress {
            opts = opts.with_progress(v);
        }
        if self.read_buffer_bytes.is_some() || self.write_buffer_bytes.is_some() {
            let read = self.read_buffer_bytes.unwrap_or(opts.read_buffer_bytes);
            let write = self.write_buffer_bytes.unwrap_or(opts.write_buffer_bytes);
            opts = opts.with_io_buffers(read, write);
        }
        if let Some(v) = self.output_partitions {
            opts = opts.with_output_partitions(v);
        }
        if let Some(v) = self.compression_level {
            opts = opts.with_compression_level(v);
        }
        opts
    }
}
