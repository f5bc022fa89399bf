use parking_lot::Mutex;
use std::sync::OnceLock;
use std::time::{Duration, Instant};
use sysinfo::{System, SystemExt};

/// Cached memory watcher; refreshes at most every `REFRESH_EVERY`.
struct MemState {
    sys: System,
    last_check: Instant,
    last_frac: f64, // available / total
}

static STATE: OnceLock<Mutex<MemState>> = OnceLock::new();
const REFRESH_EVERY: Duration = Duration::from_millis(500);

fn with_state<T>(f: impl FnOnce(&mut MemState) -> T) -> T {
    let m = STATE.get_or_init(|| {
        let mut s = System::new();
        s.refresh_memory();
        Mutex::new(MemState {
            sys: s,
            last_check: Instant::now() - REFRESH_EVERY * 2,
            last_frac: 1.0,
        })
    });
    f(&mut m.lock())
}

/// Recent estimate of the available memory fraction (0.0..=1.0).
pub fn available_memory_fraction() -> f64 {
    with_state(|st| {
        let now = Instant::now();
        if now.duration_since(st.last_check) >= REFRESH_EVERY {
            st.sys.refresh_memory();
            let total = st.sys.total_memory() as f64;
            let avail = st.sys.available_memory() as f64;
            st.last_frac = if total > 0.0 { (avail / total).clamp(0.0, 1.0) } else { 1.0 };
            st.last_check = now;
        }
        st.last_frac
    })
}

/// Cooperative backoff: sleeps briefly when available memory is under `threshold`.
/// Returns whether it slept.
pub fn maybe_throttle_low_memory(threshold: f64) -> bool {
    if available_memory_fraction() < threshold {
        std::thread::sleep(Duration::from_millis(25));
        true
    } else {
        false
    }
}

/// Debug-level memory snapshot tagged with a stage name.
pub fn log_memory(stage: &str) {
    let frac = available_memory_fraction();
    tracing::debug!(stage, available_pct = frac * 100.0, "memory");
}
