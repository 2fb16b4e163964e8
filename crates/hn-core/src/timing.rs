//! Lightweight wall-clock timing for run summaries.
//!
//! Timers always measure; `stop_and_log` only writes when
//! `HN_TIMING` is set in the environment.

use std::time::Instant;

pub fn is_enabled() -> bool {
    std::env::var_os("HN_TIMING").is_some()
}

/// A simple timer that measures elapsed time.
#[derive(Debug, Clone, Copy)]
pub struct Timer {
    label: &'static str,
    start: Instant,
}

impl Timer {
    /// Create and start a new timer with the given label.
    pub fn start(label: &'static str) -> Self {
        Self {
            label,
            start: Instant::now(),
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Seconds since the timer started.
    pub fn elapsed_s(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    /// Stop the timer, returning elapsed seconds and printing when enabled.
    pub fn stop_and_log(self) -> f64 {
        let elapsed = self.elapsed_s();
        if is_enabled() {
            eprintln!("[TIMING] {}: {:.3}s", self.label, elapsed);
        }
        elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timer_is_monotonic() {
        let t = Timer::start("test");
        let a = t.elapsed_s();
        let b = t.elapsed_s();
        assert!(b >= a);
        assert_eq!(t.label(), "test");
        assert!(t.stop_and_log() >= 0.0);
    }
}
