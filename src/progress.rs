//! Progress reporting: byte-based bar for input loading.

use crate::paths::InputFile;
use indicatif::{ProgressBar, ProgressStyle};

pub fn make_progress_bar_labeled(total_bytes: u64, label: Option<&str>) -> ProgressBar {
    let pb = ProgressBar::new(total_bytes);
    let style = ProgressStyle::with_template(
        "{spinner:.green} {msg} {bytes:>10}/{total_bytes:<10} [{bar:.cyan/blue}] {percent:>3}%  \
         {bytes_per_sec}  elapsed: {elapsed_precise}  eta: {eta_precise}",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("█▉▊▋▌▍▎▏  ");
    pb.set_style(style);
    if let Some(msg) = label {
        pb.set_message(msg.to_string());
    }
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Bar when `enabled`, otherwise a hidden one so callers never branch.
pub fn input_progress(enabled: bool, files: &[InputFile], label: &str) -> ProgressBar {
    if enabled {
        make_progress_bar_labeled(total_input_size(files), Some(label))
    } else {
        ProgressBar::hidden()
    }
}

pub fn total_input_size(files: &[InputFile]) -> u64 {
    files.iter().map(|f| f.bytes).sum()
}
