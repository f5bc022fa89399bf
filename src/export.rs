//! Writers (and the one reader) for dataset outputs.

use crate::config::BuildOptions;
use crate::frame::{Cell, Frame, Row};
use crate::partition::PartitionWriters;
use crate::util::{create_with_backoff, open_with_backoff, write_json_atomic};
use anyhow::{anyhow, bail, Context, Result};
use serde_json::{Map, Value};
use std::fs;
use std::io::{BufRead, BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::info;
use zstd::stream::read::Decoder;

pub const COLUMNS_FILE: &str = "_columns.json";
const FRAME_STEM: &str = "part";
const CONTEXT_STEM: &str = "contexts";

fn csv_field(c: &Cell) -> String {
    match c {
        Cell::Null => String::new(),
        other => other.to_string(),
    }
}

/// Write a frame as CSV with a header row, in row order. Nulls become empty fields.
pub fn write_counts_csv(frame: &Frame, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    let f = create_with_backoff(path, 16, 50)?;
    let mut w = csv::Writer::from_writer(BufWriter::new(f));
    w.write_record(frame.columns())?;
    for row in frame.rows() {
        w.write_record(row.iter().map(csv_field))?;
    }
    w.flush().with_context(|| format!("flush {}", path.display()))?;
    info!(path = %path.display(), rows = frame.len(), "wrote counts csv");
    Ok(())
}

/// Write `col` as one line per row into `contexts_part_NNNN.txt.zst` files,
/// dealing rows out to parts in turn. Null cells are skipped.
pub fn write_context_partitions(frame: &Frame, col: &str, dir: &Path, opts: &BuildOptions) -> Result<Vec<PathBuf>> {
    let idx = frame.column_index(col)?;
    let pw = PartitionWriters::new(
        dir,
        CONTEXT_STEM,
        "txt",
        opts.output_partitions,
        opts.write_buffer_bytes,
        opts.compression_level,
    )?;
    for (i, row) in frame.rows().iter().enumerate() {
        if let Some(text) = row[idx].as_text() {
            pw.write_line_to(i % pw.parts(), &text)?;
        }
    }
    let paths = pw.finalize()?;
    info!(dir = %dir.display(), rows = frame.len(), parts = paths.len(), "wrote context partitions");
    Ok(paths)
}

/// Write a frame as `_columns.json` plus `part_NNNN.ndjson.zst` files of JSON objects.
/// Rows are routed by the value of `route_col`, so one key's rows share a part and
/// keep their relative order.
pub fn write_frame_dir(frame: &Frame, dir: &Path, route_col: &str, opts: &BuildOptions) -> Result<Vec<PathBuf>> {
    let route = frame.column_index(route_col)?;
    fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    let pw = PartitionWriters::new(
        dir,
        FRAME_STEM,
        "ndjson",
        opts.output_partitions,
        opts.write_buffer_bytes,
        opts.compression_level,
    )?;
    for row in frame.rows() {
        let obj: Map<String, Value> = frame
            .columns()
            .iter()
            .zip(row)
            .map(|(c, v)| Ok((c.clone(), serde_json::to_value(v)?)))
            .collect::<Result<_>>()?;
        let line = serde_json::to_string(&obj)?;
        pw.write_line_keyed(&row[route].to_string(), &line)?;
    }
    let paths = pw.finalize()?;
    write_json_atomic(&dir.join(COLUMNS_FILE), frame.columns())?;
    info!(dir = %dir.display(), rows = frame.len(), parts = paths.len(), "wrote frame directory");
    Ok(paths)
}

/// Load a directory written by [`write_frame_dir`]. Parts are read in name order.
pub fn read_frame_dir(dir: &Path) -> Result<Frame> {
    let columns_path = dir.join(COLUMNS_FILE);
    let f = open_with_backoff(&columns_path, 16, 50).context("frame directory is missing its column list")?;
    let columns: Vec<String> =
        serde_json::from_reader(BufReader::new(f)).with_context(|| format!("parse {}", columns_path.display()))?;

    let mut parts: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("list {}", dir.display()))?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .map_or(false, |n| n.starts_with(FRAME_STEM) && n.ends_with(".ndjson.zst"))
        })
        .collect();
    parts.sort();

    let mut rows: Vec<Row> = Vec::new();
    for part in &parts {
        let f = open_with_backoff(part, 16, 50)?;
        let reader = BufReader::new(Decoder::new(f).with_context(|| format!("zstd {}", part.display()))?);
        for (n, line) in reader.lines().enumerate() {
            let line = line.with_context(|| format!("read {}", part.display()))?;
            if line.trim().is_empty() {
                continue;
            }
            let v: Value =
                serde_json::from_str(&line).with_context(|| format!("{} line {}", part.display(), n + 1))?;
            let obj = v
                .as_object()
                .ok_or_else(|| anyhow!("{} line {}: expected a JSON object", part.display(), n + 1))?;
            if obj.len() != columns.len() {
                bail!("{} line {}: {} fields, expected {}", part.display(), n + 1, obj.len(), columns.len());
            }
            rows.push(columns.iter().map(|c| obj.get(c).map(Cell::from_json).unwrap_or(Cell::Null)).collect());
        }
    }
    Frame::new(columns, rows)
}
