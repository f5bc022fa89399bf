use anyhow::{bail, Result};
use regex::Regex;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use walkdir::WalkDir;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Compression {
    Zstd,
    Plain,
}

#[derive(Clone, Debug)]
pub struct InputFile {
    pub path: PathBuf,
    pub compression: Compression,
    pub bytes: u64,
}

impl InputFile {
    pub fn new(path: PathBuf) -> Self {
        let compression = match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("zst") => Compression::Zstd,
            _ => Compression::Plain,
        };
        let bytes = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        Self { path, compression, bytes }
    }
}

fn data_file_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\.(zst|json|jsonl|ndjson)$").unwrap())
}

/// Hidden files and `_`-prefixed markers (e.g. `_SUCCESS`, `_columns.json`) are not data.
fn is_data_file(name: &str) -> bool {
    !name.starts_with('.') && !name.starts_with('_') && data_file_re().is_match(name)
}

/// Expand user-supplied inputs into concrete files.
/// Files are taken as given; directories are walked recursively and their
/// data files added in sorted path order. Duplicates are dropped.
pub fn expand_inputs(inputs: &[PathBuf]) -> Result<Vec<InputFile>> {
    let mut seen: BTreeSet<PathBuf> = BTreeSet::new();
    let mut out = Vec::new();
    for input in inputs {
        if input.is_file() {
            if seen.insert(input.clone()) {
                out.push(InputFile::new(input.clone()));
            }
        } else if input.is_dir() {
            let mut found: Vec<PathBuf> = discover_dir(input);
            found.sort();
            for p in found {
                if seen.insert(p.clone()) {
                    out.push(InputFile::new(p));
                }
            }
        } else {
            bail!("input path does not exist: {}", input.display());
        }
    }
    Ok(out)
}

fn discover_dir(dir: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).follow_links(true) {
        match entry {
            Ok(ent) if ent.file_type().is_file() => {
                if let Some(name) = ent.file_name().to_str() {
                    if is_data_file(name) {
                        found.push(ent.path().to_path_buf());
                    }
                }
            }
            Ok(_) => {}
            Err(e) => tracing::warn!("skipping unreadable entry under {}: {}", dir.display(), e),
        }
    }
    found
}
