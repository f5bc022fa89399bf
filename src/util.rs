use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::thread::sleep;
use std::time::Duration;

static INIT_ONCE: std::sync::Once = std::sync::Once::new();

/// Install the fmt subscriber once. `RUST_LOG` wins, then `fallback_level`, then `info`.
pub fn init_tracing(fallback_level: Option<&str>) {
    INIT_ONCE.call_once(|| {
        let env_filter = std::env::var("RUST_LOG")
            .ok()
            .or_else(|| fallback_level.map(str::to_string))
            .unwrap_or_else(|| "info".to_string());
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(io::stderr)
            .try_init();
    });
}

pub fn init_tracing_once() {
    init_tracing(None);
}

/// Size the global rayon pool. Only the first successful call takes effect.
pub fn configure_thread_pool(threads: Option<usize>) {
    if let Some(n) = threads {
        if rayon::ThreadPoolBuilder::new().num_threads(n).build_global().is_err() {
            tracing::debug!("rayon global pool already initialised; ignoring parallelism={n}");
        }
    }
}

/// Transient errors seen on network volumes and on Windows (sharing/AV locks).
fn is_retriable_io_error(e: &io::Error) -> bool {
    matches!(e.raw_os_error(), Some(5 | 21 | 32 | 33 | 225 | 433 | 1006 | 1117 | 1224))
}

fn with_backoff<T>(tries: usize, delay_ms: u64, mut op: impl FnMut() -> io::Result<T>) -> io::Result<T> {
    let mut last_err: Option<io::Error> = None;
    for i in 0..tries.max(1) {
        match op() {
            Ok(v) => return Ok(v),
            Err(e) if is_retriable_io_error(&e) => {
                last_err = Some(e);
                sleep(Duration::from_millis(delay_ms.saturating_mul((i + 1) as u64)));
            }
            Err(e) => return Err(e),
        }
    }
    Err(last_err.unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, "retries exhausted")))
}

/// Open a file with retries/backoff for transient errors.
pub fn open_with_backoff(path: &Path, tries: usize, delay_ms: u64) -> Result<File> {
    with_backoff(tries, delay_ms, || File::open(path)).with_context(|| format!("open {}", path.display()))
}

/// Create a file with retries/backoff for transient errors.
pub fn create_with_backoff(path: &Path, tries: usize, delay_ms: u64) -> Result<File> {
    with_backoff(tries, delay_ms, || File::create(path)).with_context(|| format!("create {}", path.display()))
}

/// Remove a file with retries/backoff. Succeeds if the file doesn't exist.
pub fn remove_with_backoff(path: &Path, tries: usize, delay_ms: u64) -> Result<()> {
    match with_backoff(tries, delay_ms, || fs::remove_file(path)) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("remove {}", path.display())),
    }
}

/// Atomically replace `dest` with `tmp`; falls back to copy+remove when rename fails.
pub fn replace_file_atomic_backoff(tmp: &Path, dest: &Path) -> Result<()> {
    let (tries, delay_ms) = (20usize, 50u64);
    if with_backoff(tries, delay_ms, || fs::rename(tmp, dest)).is_ok() {
        return Ok(());
    }
    if dest.exists() {
        remove_with_backoff(dest, tries, delay_ms)?;
    }
    with_backoff(tries, delay_ms, || fs::copy(tmp, dest))
        .with_context(|| format!("copy {} -> {}", tmp.display(), dest.display()))?;
    remove_with_backoff(tmp, tries, delay_ms)
}

/// Serialize `value` as pretty JSON to `dest` via a sibling temp file.
pub fn write_json_atomic<T: Serialize + ?Sized>(dest: &Path, value: &T) -> Result<()> {
    let tmp = dest.with_extension("json.tmp");
    {
        let f = create_with_backoff(&tmp, 16, 50)?;
        let mut w = BufWriter::new(f);
        serde_json::to_writer_pretty(&mut w, value).with_context(|| format!("serialize {}", dest.display()))?;
        w.flush().with_context(|| format!("flush {}", tmp.display()))?;
    }
    replace_file_atomic_backoff(&tmp, dest)
}
