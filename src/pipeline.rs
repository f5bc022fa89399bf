use crate::config::BuildOptions;
use crate::export::{write_context_partitions, write_counts_csv, write_frame_dir};
use crate::filters::{
    aggregate_contexts, filter_by_regex, filter_by_time_window, filter_out_top_users, filter_to_matching, join_threads,
    max_context_length, prefix_id_column, remove_deleted_authors, remove_deleted_text, top_n_counts, JoinSpec,
    CONTEXT_LENGTH_COLUMN, FULLNAME_ID_COLUMN, TIME_DELTA_COLUMN,
};
use crate::frame::Frame;
use crate::loader::load_records;
use crate::record::{RedditType, AUTHOR, ID, SUBREDDIT};
use crate::stats::{ComparisonStats, StatsReporter, TracingReporter};
use crate::util::{configure_thread_pool, init_tracing_once};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Builds community2vec and bag-of-words datasets from Reddit records.
#[derive(Clone)]
pub struct CorpusBuilder {
    pub(crate) opts: BuildOptions,
    reporter: Arc<dyn StatsReporter>,
}

/// Output of [`CorpusBuilder::community2vec`].
#[derive(Clone, Debug)]
pub struct Community2Vec {
    /// `[subreddit, count]`, most popular first.
    pub subreddit_counts: Frame,
    /// `[subreddit_concat]`: one space-joined sentence of subreddits per author.
    pub contexts: Frame,
}

impl Community2Vec {
    /// Write the counts CSV and the partitioned sentence files; returns the partition paths.
    pub fn write(&self, counts_csv: &Path, contexts_dir: &Path, opts: &BuildOptions) -> Result<Vec<PathBuf>> {
        write_counts_csv(&self.subreddit_counts, counts_csv)?;
        let concat_col = format!("{SUBREDDIT}_concat");
        write_context_partitions(&self.contexts, &concat_col, contexts_dir, opts)
    }
}

impl Default for CorpusBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CorpusBuilder {
    pub fn new() -> Self {
        Self::with_options(BuildOptions::default())
    }

    pub fn with_options(opts: BuildOptions) -> Self {
        let reporter = Arc::new(TracingReporter { preview_rows: opts.preview_rows });
        Self { opts, reporter }
    }

    // -------- Builder methods --------
    pub fn top_n(mut self, n: usize) -> Self { self.opts = self.opts.with_top_n(n); self }
    pub fn min_sentence_length(mut self, n: usize) -> Self { self.opts = self.opts.with_min_sentence_length(n); self }
    pub fn exclude_top_perc(mut self, fraction: f64) -> Self { self.opts = self.opts.with_exclude_top_perc(fraction); self }
    pub fn time_window(mut self, min: Option<i64>, max: Option<i64>) -> Self { self.opts = self.opts.with_time_window(min, max); self }
    pub fn user_page_pattern(mut self, pattern: impl Into<String>) -> Self { self.opts = self.opts.with_user_page_pattern(pattern); self }
    pub fn quiet(mut self, yes: bool) -> Self { self.opts = self.opts.with_quiet(yes); self }
    pub fn parallelism(mut self, threads: usize) -> Self { self.opts = self.opts.with_parallelism(threads); self }
    pub fn file_concurrency(mut self, n: usize) -> Self { self.opts = self.opts.with_file_concurrency(n); self }
    pub fn progress(mut self, yes: bool) -> Self { self.opts = self.opts.with_progress(yes); self }
    pub fn progress_label(mut self, label: impl Into<String>) -> Self { self.opts = self.opts.with_progress_label(label); self }
    pub fn io_buffers(mut self, read_bytes: usize, write_bytes: usize) -> Self { self.opts = self.opts.with_io_buffers(read_bytes, write_bytes); self }
    pub fn output_partitions(mut self, n: usize) -> Self { self.opts = self.opts.with_output_partitions(n); self }
    pub fn reporter(mut self, reporter: Arc<dyn StatsReporter>) -> Self { self.reporter = reporter; self }

    pub fn options(&self) -> &BuildOptions {
        &self.opts
    }

    fn report(&self) -> Option<&dyn StatsReporter> {
        (!self.opts.quiet).then(|| self.reporter.as_ref())
    }

    fn prepare(&self) {
        init_tracing_once();
        configure_thread_pool(self.opts.parallelism);
    }

    /// Load `inputs` (files or directories of NDJSON, plain or zstd) as `kind` records.
    pub fn load(&self, inputs: &[PathBuf], kind: RedditType) -> Result<Frame> {
        self.prepare();
        load_records(inputs, kind, &self.opts).with_context(|| format!("loading {kind} from {inputs:?}"))
    }

    // -------- community2vec --------

    /// Per-author subreddit sentences over the `top_n` most popular subreddits.
    /// `reddit_type` must be `comments` or `submissions` and is checked before any input is read.
    pub fn community2vec(&self, inputs: &[PathBuf], reddit_type: &str) -> Result<Community2Vec> {
        let kind: RedditType = reddit_type.parse()?;
        let records = self.load(inputs, kind)?;
        self.community2vec_from_frame(records)
    }

    /// The in-memory part of [`community2vec`](Self::community2vec).
    ///
    /// Popularity is measured after user pages are removed but before deleted content is,
    /// so deleted posts still count toward a subreddit's rank. Deleted authors are then
    /// dropped; deleted text is kept since only the subreddit matters here.
    pub fn community2vec_from_frame(&self, records: Frame) -> Result<Community2Vec> {
        self.prepare();
        let o = &self.opts;
        let no_user_pages = filter_by_regex(records.clone(), SUBREDDIT, &o.user_page_pattern, true)?;
        let top_n = top_n_counts(&no_user_pages, SUBREDDIT, o.top_n)?;
        if let Some(r) = self.report() {
            r.preview(&format!("top {} subreddits", o.top_n), &top_n);
        }

        let filtered = remove_deleted_authors(filter_to_matching(no_user_pages, &top_n, SUBREDDIT)?)?;
        if let Some(r) = self.report() {
            let stats = ComparisonStats::compute(&records, &filtered, &top_n)?;
            r.comparison("community2vec", &stats);
        }
        drop(records);

        let contexts = aggregate_contexts(filtered, AUTHOR, SUBREDDIT, o.min_sentence_length, o.exclude_top_perc)?;
        if let Some(r) = self.report() {
            r.max_context_length(max_context_length(&contexts, CONTEXT_LENGTH_COLUMN)?);
            r.preview("author contexts", &contexts);
        }
        let contexts = contexts.drop_columns(&[CONTEXT_LENGTH_COLUMN]);
        info!(subreddits = top_n.len(), contexts = contexts.len(), "community2vec dataset built");
        Ok(Community2Vec { subreddit_counts: top_n, contexts })
    }

    // -------- bag of words --------

    /// Submissions joined with their comments, restricted to the `top_n` subreddits as
    /// counted in `type_for_top_n` data.
    pub fn bag_of_words(&self, comments: &[PathBuf], submissions: &[PathBuf], type_for_top_n: &str) -> Result<Frame> {
        let kind: RedditType = type_for_top_n.parse()?;
        let comments = self.load(comments, RedditType::Comments)?;
        let submissions = self.load(submissions, RedditType::Submissions)?;
        self.bag_of_words_from_frames(comments, submissions, kind)
    }

    /// The in-memory part of [`bag_of_words`](Self::bag_of_words).
    ///
    /// Top-activity authors are only dropped from comments; submissions keep every author.
    /// When a maximum time delta is set, only comments posted strictly between the minimum
    /// and maximum delta after their submission are kept.
    pub fn bag_of_words_from_frames(&self, comments: Frame, submissions: Frame, type_for_top_n: RedditType) -> Result<Frame> {
        self.prepare();
        let o = &self.opts;
        let comments = filter_by_regex(comments, SUBREDDIT, &o.user_page_pattern, true)?;
        let submissions = filter_by_regex(submissions, SUBREDDIT, &o.user_page_pattern, true)?;
        let top_n = match type_for_top_n {
            RedditType::Comments => top_n_counts(&comments, SUBREDDIT, o.top_n)?,
            RedditType::Submissions => top_n_counts(&submissions, SUBREDDIT, o.top_n)?,
        };
        if let Some(r) = self.report() {
            r.preview(&format!("top {} subreddits by {type_for_top_n}", o.top_n), &top_n);
        }

        let mut filtered_comments = remove_deleted_authors(remove_deleted_text(
            filter_to_matching(comments, &top_n, SUBREDDIT)?,
            RedditType::Comments,
        )?)?;
        if o.exclude_top_perc > 0.0 {
            filtered_comments = filter_out_top_users(filtered_comments, AUTHOR, o.exclude_top_perc)?;
        }

        let filtered_submissions = remove_deleted_authors(remove_deleted_text(
            filter_to_matching(submissions.clone(), &top_n, SUBREDDIT)?,
            RedditType::Submissions,
        )?)?;
        if let Some(r) = self.report() {
            let stats = ComparisonStats::compute(&submissions, &filtered_submissions, &top_n)?;
            r.comparison("submissions", &stats);
        }
        drop(submissions);

        let filtered_submissions =
            prefix_id_column(filtered_submissions, RedditType::Submissions.id_prefix(), ID, FULLNAME_ID_COLUMN)?;
        let mut joined = join_threads(filtered_submissions, filtered_comments, &JoinSpec::default())?;
        if o.max_time_delta.is_some() {
            joined = filter_by_time_window(joined, o.min_time_delta, o.max_time_delta, TIME_DELTA_COLUMN)?;
        }
        if let Some(r) = self.report() {
            r.preview("joined threads", &joined);
        }
        info!(rows = joined.len(), "bag-of-words dataset built");
        Ok(joined)
    }

    /// Write a bag-of-words frame as a partitioned directory routed by submission id.
    pub fn write_bag_of_words(&self, joined: &Frame, out_dir: &Path) -> Result<Vec<PathBuf>> {
        write_frame_dir(joined, out_dir, ID, &self.opts)
    }
}
