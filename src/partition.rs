use ahash::RandomState;
use anyhow::{Context, Result};
use parking_lot::Mutex;
use std::fs::{self, File};
use std::hash::{BuildHasher, Hash, Hasher};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use zstd::stream::write::Encoder as ZstdEncoder;

use crate::util::{create_with_backoff, replace_file_atomic_backoff};

type PartWriter = ZstdEncoder<'static, BufWriter<File>>;

/// A fixed set of zstd-compressed part files with stable key routing.
///
/// File layout:
///   <dir>/_staging/<stem>_part_XXXX.inprogress  (while writing)
///   <dir>/<stem>_part_XXXX.<ext>.zst            (after `finalize()`)
///
/// The same key always lands in the same part, across runs and machines.
pub struct PartitionWriters {
    writers: Vec<Mutex<PartWriter>>,
    tmp_paths: Vec<PathBuf>,
    final_paths: Vec<PathBuf>,
    staging: PathBuf,
    state: RandomState,
}

impl PartitionWriters {
    pub fn new(dir: &Path, stem: &str, ext: &str, parts: usize, write_buf: usize, level: i32) -> Result<Self> {
        let parts = parts.max(1);
        let staging = dir.join("_staging");
        fs::create_dir_all(&staging).with_context(|| format!("create {}", staging.display()))?;

        let mut writers = Vec::with_capacity(parts);
        let mut tmp_paths = Vec::with_capacity(parts);
        let mut final_paths = Vec::with_capacity(parts);
        for i in 0..parts {
            let tmp = staging.join(format!("{stem}_part_{i:04}.inprogress"));
            let final_p = dir.join(format!("{stem}_part_{i:04}.{ext}.zst"));
            let f = create_with_backoff(&tmp, 16, 50)?;
            let enc = ZstdEncoder::new(BufWriter::with_capacity(write_buf, f), level)
                .with_context(|| format!("zstd encoder for {}", tmp.display()))?;
            writers.push(Mutex::new(enc));
            tmp_paths.push(tmp);
            final_paths.push(final_p);
        }

        // Fixed seeds keep routing stable between runs.
        let state = RandomState::with_seeds(
            0x1357_9bdf_acce_55ed,
            0x2468_ace0_fdb9_8642,
            0xfeed_face_dead_beef,
            0x0bad_f00d_c0de_cafe,
        );

        Ok(Self { writers, tmp_paths, final_paths, staging, state })
    }

    pub fn parts(&self) -> usize {
        self.writers.len()
    }

    pub fn part_for<K: Hash + ?Sized>(&self, key: &K) -> usize {
        let mut h = self.state.build_hasher();
        key.hash(&mut h);
        (h.finish() as usize) % self.writers.len()
    }

    /// Write one line (a newline is appended) to partition `part`.
    pub fn write_line_to(&self, part: usize, line: &str) -> Result<()> {
        let mut w = self.writers[part % self.writers.len()].lock();
        w.write_all(line.as_bytes())?;
        w.write_all(b"\n")?;
        Ok(())
    }

    /// Write one line to the partition `key` routes to.
    pub fn write_line_keyed<K: Hash + ?Sized>(&self, key: &K, line: &str) -> Result<()> {
        self.write_line_to(self.part_for(key), line)
    }

    /// Finish every zstd stream, then promote the staged files. Returns final paths in part order.
    pub fn finalize(self) -> Result<Vec<PathBuf>> {
        for (w, tmp) in self.writers.into_iter().zip(&self.tmp_paths) {
            let mut inner = w
                .into_inner()
                .finish()
                .with_context(|| format!("finish zstd stream {}", tmp.display()))?;
            inner.flush()?;
        }
        for (tmp, final_p) in self.tmp_paths.iter().zip(&self.final_paths) {
            replace_file_atomic_backoff(tmp, final_p)?;
        }
        let _ = fs::remove_dir(&self.staging);
        Ok(self.final_paths)
    }
}
