//! Background progress reporting
//!
//! Advisory only: the reporter reads shared counters and prints a status
//! line on a fixed interval. It never touches pipeline state, and losing
//! it has no correctness impact.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use sysinfo::{System, SystemExt};
use tracing::info;

/// Segment counters shared between the controller and the reporter
#[derive(Debug, Default)]
pub struct ProgressCounters {
    current: AtomicUsize,
    total: AtomicUsize,
}

impl ProgressCounters {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_total(&self, total: usize) {
        self.total.store(total, Ordering::Relaxed);
    }

    pub fn set_current(&self, current: usize) {
        self.current.store(current, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> (usize, usize) {
        (
            self.current.load(Ordering::Relaxed),
            self.total.load(Ordering::Relaxed),
        )
    }
}

/// Handle to the reporter thread; stopping joins it
pub struct ProgressReporter {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ProgressReporter {
    /// Spawn the reporter. The stop flag is polled every second; a full
    /// status line goes out every `interval`.
    pub fn start(counters: Arc<ProgressCounters>, interval: Duration) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = stop.clone();

        let handle = std::thread::spawn(move || {
            let start_time = Instant::now();
            let mut sys = System::new();
            let mut last_report = Instant::now();

            while !stop_flag.load(Ordering::Relaxed) {
                std::thread::sleep(Duration::from_secs(1));

                if last_report.elapsed() < interval {
                    continue;
                }
                last_report = Instant::now();

                sys.refresh_memory();
                let memory_percent = if sys.total_memory() > 0 {
                    sys.used_memory() as f64 / sys.total_memory() as f64 * 100.0
                } else {
                    0.0
                };

                let elapsed_min = start_time.elapsed().as_secs_f64() / 60.0;
                let (current, total) = counters.snapshot();
                if total > 0 {
                    info!(
                        "Progress: {:.1}% | elapsed: {:.1} min | memory: {:.1}% | segments: {}/{}",
                        current as f64 / total as f64 * 100.0,
                        elapsed_min,
                        memory_percent,
                        current,
                        total
                    );
                } else {
                    info!(
                        "Elapsed: {:.1} min | memory: {:.1}% | working...",
                        elapsed_min, memory_percent
                    );
                }
            }
        });

        Self {
            stop,
            handle: Some(handle),
        }
    }

    /// Signal the thread and wait for it to exit.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_snapshot() {
        let counters = ProgressCounters::new();
        counters.set_total(10);
        counters.set_current(3);
        assert_eq!(counters.snapshot(), (3, 10));
    }

    #[test]
    fn test_reporter_stops_promptly() {
        let counters = ProgressCounters::new();
        let reporter = ProgressReporter::start(counters, Duration::from_secs(30));

        let begin = Instant::now();
        reporter.stop();
        // One polling tick plus slack
        assert!(begin.elapsed() < Duration::from_secs(5));
    }
}
