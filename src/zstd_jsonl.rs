use anyhow::Result;
use std::fs;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use zstd::stream::read::Decoder;

use crate::mem::maybe_throttle_low_memory;
use crate::paths::{Compression, InputFile};
use crate::util::open_with_backoff;

/// Below this available-memory fraction line streaming backs off briefly.
const LOW_MEMORY_THRESHOLD: f64 = 0.10;

fn warn_decode_skip(path: &Path, e: &anyhow::Error) {
    let abs = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    tracing::warn!(
        path = %abs.display(),
        "skipping rest of input after decode error: {e:#} (the file is likely truncated or corrupt)"
    );
}

/// A `Read` wrapper that counts raw (on-disk) bytes read.
struct CountingReader<R: Read> {
    inner: R,
    counter: Arc<AtomicU64>,
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.counter.fetch_add(n as u64, Ordering::Relaxed);
        Ok(n)
    }
}

/// Stream an NDJSON file (zstd or plain) line by line, calling `on_progress(delta_bytes)`
/// as raw bytes are consumed.
///
/// Zstd frames are opened with `window_log_max(31)` so large-window Pushshift dumps decode.
/// Lines with invalid UTF-8 are decoded lossily. A decode error mid-stream is logged and ends the file (lines already delivered stay
/// delivered); the progress bar is advanced to the file's full size. Failing to open the
/// file at all is an error.
pub fn for_each_line_with_progress(
    file: &InputFile,
    read_buf_bytes: usize,
    mut on_progress: impl FnMut(u64),
    mut on_line: impl FnMut(&str) -> Result<()>,
) -> Result<()> {
    let raw = open_with_backoff(&file.path, 16, 50)?;
    let counter = Arc::new(AtomicU64::new(0));
    let counted = CountingReader { inner: raw, counter: counter.clone() };
    let reader: Box<dyn BufRead> = match file.compression {
        Compression::Zstd => {
            let mut decoder = Decoder::new(counted)?;
            decoder.window_log_max(31)?;
            Box::new(BufReader::with_capacity(read_buf_bytes, decoder))
        }
        Compression::Plain => Box::new(BufReader::with_capacity(read_buf_bytes, counted)),
    };
    match stream_lines(reader, &counter, &mut on_progress, &mut on_line) {
        Ok(()) => Ok(()),
        Err(e) if e.downcast_ref::<io::Error>().is_some() => {
            warn_decode_skip(&file.path, &e);
            let done = counter.load(Ordering::Relaxed);
            on_progress(file.bytes.saturating_sub(done));
            Ok(())
        }
        Err(e) => Err(e),
    }
}

fn stream_lines(
    mut reader: Box<dyn BufRead>,
    counter: &AtomicU64,
    on_progress: &mut impl FnMut(u64),
    on_line: &mut impl FnMut(&str) -> Result<()>,
) -> Result<()> {
    let mut buf: Vec<u8> = Vec::with_capacity(16 * 1024);
    let mut last = 0u64;
    loop {
        buf.clear();
        let n = reader.read_until(b'\n', &mut buf)?;
        let cur = counter.load(Ordering::Relaxed);
        if cur > last {
            on_progress(cur - last);
            last = cur;
        }
        if n == 0 {
            break;
        }
        if buf.ends_with(b"\n") {
            let _ = buf.pop();
            if buf.ends_with(b"\r") {
                let _ = buf.pop();
            }
        }
        // Invalid UTF-8 is replaced, not fatal; only reader errors end the file.
        on_line(&String::from_utf8_lossy(&buf))?;
        maybe_throttle_low_memory(LOW_MEMORY_THRESHOLD);
    }
    Ok(())
}
