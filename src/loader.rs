//! Load NDJSON record files into a `Frame` with a fixed schema.

use crate::concurrency::map_files_limited;
use crate::config::BuildOptions;
use crate::frame::{Frame, Row};
use crate::mem::log_memory;
use crate::paths::{expand_inputs, InputFile};
use crate::progress::input_progress;
use crate::record::{parse_record, RedditType};
use crate::zstd_jsonl::for_each_line_with_progress;
use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::{info, warn};

struct FileRows {
    rows: Vec<Row>,
    skipped: u64,
}

/// Expand `inputs` (files or directories) and load every record as `kind`.
pub fn load_records(inputs: &[PathBuf], kind: RedditType, opts: &BuildOptions) -> Result<Frame> {
    let files = expand_inputs(inputs)?;
    load_files(&files, kind, opts)
}

/// Load already-expanded files. Row order is file order, then line order.
/// Blank lines are ignored; unparseable lines are skipped and counted.
pub fn load_files(files: &[InputFile], kind: RedditType, opts: &BuildOptions) -> Result<Frame> {
    if files.is_empty() {
        warn!(kind = kind.as_str(), "no input files; continuing with an empty frame");
        return Ok(Frame::empty(kind.columns()));
    }
    let label = opts.progress_label.clone().unwrap_or_else(|| format!("Loading {kind}"));
    let pb = input_progress(opts.progress, files, &label);

    let per_file = map_files_limited(files, opts.file_concurrency, |file| {
        let mut out = FileRows { rows: Vec::new(), skipped: 0 };
        for_each_line_with_progress(
            file,
            opts.read_buffer_bytes,
            |delta| pb.inc(delta),
            |line| {
                if line.trim().is_empty() {
                    return Ok(());
                }
                match parse_record(line, kind) {
                    Ok(row) => out.rows.push(row),
                    Err(e) => {
                        if out.skipped == 0 {
                            warn!(path = %file.path.display(), "skipping malformed record: {e}");
                        }
                        out.skipped += 1;
                    }
                }
                Ok(())
            },
        )
        .with_context(|| format!("reading {}", file.path.display()))?;
        if out.skipped > 0 {
            warn!(path = %file.path.display(), skipped = out.skipped, "malformed lines skipped");
        }
        Ok(out)
    })?;
    pb.finish_and_clear();

    let skipped: u64 = per_file.iter().map(|f| f.skipped).sum();
    let rows: Vec<Row> = per_file.into_iter().flat_map(|f| f.rows).collect();
    info!(kind = kind.as_str(), files = files.len(), rows = rows.len(), skipped, "loaded records");
    log_memory("load");
    Frame::new(kind.columns(), rows)
}
