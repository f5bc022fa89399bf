//! Frame-to-frame filters and aggregations used by the corpus builders.
//!
//! Every function takes its input frame by value and returns a new one; an unknown
//! column is an error naming that column. Nulls follow SQL comparison semantics:
//! a predicate over a null value is never true, so such rows are dropped.

use crate::frame::{Cell, Frame, Key, Row};
use crate::record::{RedditType, AUTHOR, CREATED_UTC, DELETED, LINK_ID, OVERLAPPING_COLUMNS, REMOVED};
use ahash::{AHashMap, AHashSet};
use anyhow::{bail, Context, Result};
use rayon::prelude::*;
use regex::Regex;
use tracing::debug;

/// Matches user profile pages posing as subreddits (`u_<name>`).
pub const USER_PAGE_PATTERN: &str = "^u_.*";
pub const DEFAULT_TOP_N: usize = 10_000;
pub const DEFAULT_USER_EXCLUDE: f64 = 0.05;

pub const COUNT_COLUMN: &str = "count";
pub const CONTEXT_LENGTH_COLUMN: &str = "context_length";
pub const FULLNAME_ID_COLUMN: &str = "fullname_id";
pub const TIME_DELTA_COLUMN: &str = "time_to_comment_in_seconds";
pub const COMMENTS_PREFIX: &str = "comments";

/// Non-null keys of `col` with their row counts, in first-seen order.
fn group_counts(frame: &Frame, col: &str) -> Result<Vec<(Key, u64)>> {
    let idx = frame.column_index(col)?;
    let mut slots: AHashMap<Key, usize> = AHashMap::new();
    let mut out: Vec<(Key, u64)> = Vec::new();
    for row in frame.rows() {
        if let Some(k) = row[idx].key() {
            match slots.get(&k) {
                Some(&i) => out[i].1 += 1,
                None => {
                    slots.insert(k.clone(), out.len());
                    out.push((k, 1));
                }
            }
        }
    }
    Ok(out)
}

/// Frequency table `[col, count]` of the `n` most common values,
/// ordered by count descending then value ascending. Null values are not counted.
pub fn top_n_counts(frame: &Frame, col: &str, n: usize) -> Result<Frame> {
    let idx = frame.column_index(col)?;
    let counts: AHashMap<Key, u64> = frame
        .rows()
        .par_iter()
        .fold(AHashMap::new, |mut acc: AHashMap<Key, u64>, row| {
            if let Some(k) = row[idx].key() {
                *acc.entry(k).or_insert(0) += 1;
            }
            acc
        })
        .reduce(AHashMap::new, |mut a, b| {
            for (k, c) in b {
                *a.entry(k).or_insert(0) += c;
            }
            a
        });
    let mut ranked: Vec<(Key, u64)> = counts.into_iter().collect();
    ranked.sort_unstable_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(n);
    debug!(col, n, kept = ranked.len(), "top_n_counts");
    let rows = ranked.into_iter().map(|(k, c)| vec![k.into_cell(), Cell::Int(c as i64)]).collect();
    Frame::new(vec![col.to_string(), COUNT_COLUMN.to_string()], rows)
}

/// Left semi-join: keep rows of `frame` whose `col` value appears in `keys[col]`.
/// Rows are never duplicated, whatever the multiplicity in `keys`.
pub fn filter_to_matching(frame: Frame, keys: &Frame, col: &str) -> Result<Frame> {
    let idx = frame.column_index(col)?;
    let allowed: AHashSet<Key> = keys.column(col)?.filter_map(Cell::key).collect();
    let before = frame.len();
    let out = frame.filter(|r| r[idx].key().map_or(false, |k| allowed.contains(&k)));
    debug!(col, before, after = out.len(), "filter_to_matching");
    Ok(out)
}

/// Keep rows whose `col` contains a match for `pattern` (or, with `exclude_matches`,
/// rows that do not). Null values are dropped either way.
pub fn filter_by_regex(frame: Frame, col: &str, pattern: &str, exclude_matches: bool) -> Result<Frame> {
    let re = Regex::new(pattern).with_context(|| format!("invalid regex pattern '{pattern}'"))?;
    let idx = frame.column_index(col)?;
    let before = frame.len();
    let out = frame.filter(|r| match r[idx].as_text() {
        Some(text) => re.is_match(&text) != exclude_matches,
        None => false,
    });
    debug!(col, pattern, exclude_matches, before, after = out.len(), "filter_by_regex");
    Ok(out)
}

/// Drop rows whose `author` is `[deleted]` (and rows with no author).
pub fn remove_deleted_authors(frame: Frame) -> Result<Frame> {
    let idx = frame.column_index(AUTHOR)?;
    Ok(frame.filter(|r| r[idx].as_str().map_or(false, |a| a != DELETED)))
}

/// Drop rows whose main text field is `[deleted]` or `[removed]` (and rows with no text).
pub fn remove_deleted_text(frame: Frame, reddit_type: RedditType) -> Result<Frame> {
    let idx = frame.column_index(reddit_type.main_text_field())?;
    Ok(frame.filter(|r| r[idx].as_str().map_or(false, |t| t != DELETED && t != REMOVED)))
}

/// Drop the rows ranked in the top `fraction` by `count_col`.
///
/// Rank is `(rows with a strictly smaller count) / (rows - 1)`, 0 for a single row,
/// and rows with rank `<= 1 - fraction` are kept, so ties share a fate. A fraction of
/// zero keeps everything.
pub fn exclude_top_percentage(frame: Frame, count_col: &str, fraction: f64) -> Result<Frame> {
    if !(0.0..=1.0).contains(&fraction) {
        bail!("exclusion fraction must be within [0, 1], got {fraction}");
    }
    let idx = frame.column_index(count_col)?;
    if fraction == 0.0 || frame.is_empty() {
        return Ok(frame);
    }
    // Nulls sort first.
    let value = |r: &Row| r[idx].as_f64().unwrap_or(f64::NEG_INFINITY);
    let mut sorted: Vec<f64> = frame.rows().iter().map(value).collect();
    sorted.sort_unstable_by(f64::total_cmp);
    let denom = (sorted.len() - 1) as f64;
    let threshold = 1.0 - fraction;
    let before = frame.len();
    let out = frame.filter(|r| {
        if denom == 0.0 {
            return true;
        }
        let v = value(r);
        let smaller = sorted.partition_point(|x| x.total_cmp(&v).is_lt());
        (smaller as f64 / denom) <= threshold
    });
    debug!(count_col, fraction, before, after = out.len(), "exclude_top_percentage");
    Ok(out)
}

/// Drop every row by the authors in the top `fraction` by row count.
pub fn filter_out_top_users(frame: Frame, author_col: &str, fraction: f64) -> Result<Frame> {
    if fraction == 0.0 {
        return Ok(frame);
    }
    let rows: Vec<Row> = group_counts(&frame, author_col)?
        .into_iter()
        .map(|(k, c)| vec![k.into_cell(), Cell::Int(c as i64)])
        .collect();
    let counts = Frame::new(vec![author_col.to_string(), COUNT_COLUMN.to_string()], rows)?;
    let keep = exclude_top_percentage(counts, COUNT_COLUMN, fraction)?;
    filter_to_matching(frame, &keep, author_col)
}

/// Group by `group_col` and space-join `value_col` per group in encounter order.
///
/// Produces `[<value_col>_concat, context_length]`: groups in the top `exclude_fraction`
/// by length are dropped first, then groups shorter than `min_length`. Groups appear in
/// first-seen order; null group keys are skipped and null values are not joined (they
/// still count toward the length).
pub fn aggregate_contexts(
    frame: Frame,
    group_col: &str,
    value_col: &str,
    min_length: usize,
    exclude_fraction: f64,
) -> Result<Frame> {
    let gi = frame.column_index(group_col)?;
    let vi = frame.column_index(value_col)?;
    let mut slots: AHashMap<Key, usize> = AHashMap::new();
    // (joined text, any value joined yet, row count)
    let mut groups: Vec<(Key, String, bool, u64)> = Vec::new();
    for row in frame.rows() {
        let Some(k) = row[gi].key() else { continue };
        let i = match slots.get(&k) {
            Some(&i) => i,
            None => {
                slots.insert(k.clone(), groups.len());
                groups.push((k, String::new(), false, 0));
                groups.len() - 1
            }
        };
        let g = &mut groups[i];
        if let Some(text) = row[vi].as_text() {
            if g.2 {
                g.1.push(' ');
            }
            g.1.push_str(&text);
            g.2 = true;
        }
        g.3 += 1;
    }
    let concat_col = format!("{value_col}_concat");
    let rows: Vec<Row> = groups
        .into_iter()
        .map(|(k, text, _, n)| vec![k.into_cell(), Cell::Str(text), Cell::Int(n as i64)])
        .collect();
    let grouped = Frame::new(vec![group_col.to_string(), concat_col, CONTEXT_LENGTH_COLUMN.to_string()], rows)?;
    let groups_total = grouped.len();

    let trimmed = exclude_top_percentage(grouped, CONTEXT_LENGTH_COLUMN, exclude_fraction)?;
    let len_idx = trimmed.column_index(CONTEXT_LENGTH_COLUMN)?;
    let min = min_length as i64;
    let kept = trimmed.filter(|r| r[len_idx].as_i64().map_or(false, |n| n >= min));
    debug!(group_col, value_col, groups_total, kept = kept.len(), "aggregate_contexts");
    Ok(kept.drop_columns(&[group_col]))
}

/// Same as [`aggregate_contexts`] but only the `<value_col>_concat` column is returned.
pub fn aggregate_for_vectorization(
    frame: Frame,
    group_col: &str,
    value_col: &str,
    min_length: usize,
    exclude_fraction: f64,
) -> Result<Frame> {
    let contexts = aggregate_contexts(frame, group_col, value_col, min_length, exclude_fraction)?;
    Ok(contexts.drop_columns(&[CONTEXT_LENGTH_COLUMN]))
}

/// Largest integer value in `col`, `None` for an empty frame.
pub fn max_context_length(frame: &Frame, col: &str) -> Result<Option<i64>> {
    Ok(frame.column(col)?.filter_map(Cell::as_i64).max())
}

/// Add (or overwrite) `out_col` as `prefix + id_col`. A null id yields the bare prefix.
pub fn prefix_id_column(frame: Frame, prefix: &str, id_col: &str, out_col: &str) -> Result<Frame> {
    let idx = frame.column_index(id_col)?;
    Ok(frame.with_column(out_col, |r| {
        let id = r[idx].as_text().unwrap_or_default();
        Cell::Str(format!("{prefix}{id}"))
    }))
}

/// Rename each present column `c` in `columns` to `<prefix>_c`; absent ones are ignored.
pub fn rename_columns(frame: Frame, columns: &[&str], prefix: &str) -> Result<Frame> {
    columns
        .iter()
        .try_fold(frame, |f, c| f.rename(c, &format!("{prefix}_{c}")))
}

/// Column naming for [`join_threads`].
#[derive(Clone, Debug)]
pub struct JoinSpec {
    pub submission_id_col: String,
    pub comments_link_col: String,
    pub comments_prefix: String,
    pub timestamp_col: String,
    pub time_delta_col: String,
}

impl Default for JoinSpec {
    fn default() -> Self {
        Self {
            submission_id_col: FULLNAME_ID_COLUMN.to_string(),
            comments_link_col: LINK_ID.to_string(),
            comments_prefix: COMMENTS_PREFIX.to_string(),
            timestamp_col: CREATED_UTC.to_string(),
            time_delta_col: TIME_DELTA_COLUMN.to_string(),
        }
    }
}

/// Inner join of submissions with their comments.
///
/// Comment columns shared with submissions are prefixed first. Output columns are the
/// submission columns followed by the comment columns, plus the time delta (comment
/// timestamp minus submission timestamp) when both timestamps are present. Rows come out
/// per submission in input order, each followed by its comments in input order.
pub fn join_threads(submissions: Frame, comments: Frame, spec: &JoinSpec) -> Result<Frame> {
    let comments = rename_columns(comments, &OVERLAPPING_COLUMNS, &spec.comments_prefix)?;
    let sid = submissions.column_index(&spec.submission_id_col)?;
    let lid = comments.column_index(&spec.comments_link_col)?;

    let mut by_link: AHashMap<Key, Vec<usize>> = AHashMap::new();
    for (i, r) in comments.rows().iter().enumerate() {
        if let Some(k) = r[lid].key() {
            by_link.entry(k).or_default().push(i);
        }
    }

    let (s_cols, s_rows) = submissions.into_parts();
    let (c_cols, c_rows) = comments.into_parts();
    let rows: Vec<Row> = s_rows
        .par_iter()
        .flat_map_iter(|s| {
            let matches: Vec<Row> = match s[sid].key().and_then(|k| by_link.get(&k)) {
                Some(ids) => ids
                    .iter()
                    .map(|&ci| s.iter().chain(c_rows[ci].iter()).cloned().collect())
                    .collect(),
                None => Vec::new(),
            };
            matches
        })
        .collect();

    let columns: Vec<String> = s_cols.into_iter().chain(c_cols).collect();
    let joined = Frame::new(columns, rows).context("joining submissions with comments")?;
    debug!(rows = joined.len(), "join_threads");

    let comment_ts = format!("{}_{}", spec.comments_prefix, spec.timestamp_col);
    if joined.has_column(&spec.timestamp_col) && joined.has_column(&comment_ts) {
        let si = joined.column_index(&spec.timestamp_col)?;
        let ci = joined.column_index(&comment_ts)?;
        Ok(joined.with_column(&spec.time_delta_col, |r| match (r[ci].as_i64(), r[si].as_i64()) {
            (Some(c), Some(s)) => c.checked_sub(s).map_or(Cell::Null, Cell::Int),
            _ => Cell::Null,
        }))
    } else {
        Ok(joined)
    }
}

/// Keep rows with `min < col < max`; either bound may be absent. Null values are dropped
/// once any bound is set; with no bounds the frame is returned untouched.
pub fn filter_by_time_window(frame: Frame, min: Option<i64>, max: Option<i64>, col: &str) -> Result<Frame> {
    if min.is_none() && max.is_none() {
        return Ok(frame);
    }
    let idx = frame.column_index(col)?;
    let before = frame.len();
    let out = frame.filter(|r| match r[idx].as_f64() {
        Some(v) => max.map_or(true, |m| v < m as f64) && min.map_or(true, |m| v > m as f64),
        None => false,
    });
    debug!(col, ?min, ?max, before, after = out.len(), "filter_by_time_window");
    Ok(out)
}
