//! Progress and cancellation for the per-vertex section loop.
//!
//! ```ignore
//! use centerline::progress::{Progress, ProgressCallback};
//!
//! let callback: ProgressCallback = Box::new(|p| {
//!     eprintln!("vertex {} ({}/{})", p.vertex, p.finished, p.total);
//!     true // false cancels
//! });
//!
//! engine.compute(&mut centerline, Some(&callback))?;
//! ```
//!
//! In parallel mode vertices finish out of order; `vertex` is the one about to be
//! cut and `finished` counts completed vertices across all workers.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// State passed to a [`ProgressCallback`] before a vertex is cut.
#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
    pub vertex: usize,
    pub finished: usize,
    pub total: usize,
    pub elapsed: Duration,
}

impl Progress {
    /// Finished share of the centerline, 0.0 for an empty one.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.finished as f64 / self.total as f64
        }
    }

    /// Time left at the average rate so far.
    pub fn remaining(&self) -> Option<Duration> {
        if self.finished == 0 {
            return None;
        }
        let per_vertex = self.elapsed.as_secs_f64() / self.finished as f64;
        let left = self.total.saturating_sub(self.finished) as f64 * per_vertex;
        left.is_finite().then(|| Duration::from_secs_f64(left))
    }
}

/// Return `false` to stop the loop with [`CenterlineError::Cancelled`](crate::CenterlineError::Cancelled).
pub type ProgressCallback = Box<dyn Fn(&Progress) -> bool + Send + Sync>;

/// Counter of finished vertices with a cancel flag, shared by reference across
/// rayon workers.
#[derive(Debug)]
pub struct ProgressTracker {
    finished: AtomicUsize,
    total: usize,
    cancelled: AtomicBool,
    started: Instant,
    last_report: Mutex<Option<Instant>>,
    interval: Duration,
}

impl ProgressTracker {
    pub fn new(total: usize) -> Self {
        Self::with_interval(total, Duration::from_millis(100))
    }

    /// Callbacks run at most once per `interval`; the first always runs.
    pub fn with_interval(total: usize, interval: Duration) -> Self {
        Self {
            finished: AtomicUsize::new(0),
            total,
            cancelled: AtomicBool::new(false),
            started: Instant::now(),
            last_report: Mutex::new(None),
            interval,
        }
    }

    /// Mark one vertex done and return the new count.
    pub fn finish_vertex(&self) -> usize {
        self.finished.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn finished(&self) -> usize {
        self.finished.load(Ordering::Relaxed)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn progress(&self, vertex: usize) -> Progress {
        Progress {
            vertex,
            finished: self.finished(),
            total: self.total,
            elapsed: self.started.elapsed(),
        }
    }

    /// Ask the callback whether to go on with `vertex`.
    ///
    /// False once anything has cancelled, without consulting the callback again.
    pub fn proceed(&self, callback: Option<&ProgressCallback>, vertex: usize) -> bool {
        if self.is_cancelled() {
            return false;
        }
        let Some(callback) = callback else {
            return true;
        };

        if let Ok(mut last) = self.last_report.lock() {
            let now = Instant::now();
            if last.is_some_and(|t| now.duration_since(t) < self.interval) {
                return true;
            }
            *last = Some(now);
        }

        let go_on = callback(&self.progress(vertex));
        if !go_on {
            self.cancel();
        }
        go_on
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn counting(limit: usize) -> (ProgressCallback, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let callback: ProgressCallback = Box::new(move |p| {
            seen.fetch_add(1, Ordering::SeqCst);
            p.vertex < limit
        });
        (callback, calls)
    }

    #[test]
    fn test_fraction_and_remaining() {
        let p = Progress {
            vertex: 5,
            finished: 5,
            total: 20,
            elapsed: Duration::from_secs(10),
        };
        assert_eq!(p.fraction(), 0.25);
        assert_eq!(p.remaining(), Some(Duration::from_secs(30)));

        let empty = Progress {
            vertex: 0,
            finished: 0,
            total: 0,
            elapsed: Duration::ZERO,
        };
        assert_eq!(empty.fraction(), 0.0);
        assert_eq!(empty.remaining(), None);
    }

    #[test]
    fn test_callback_stops_at_vertex() {
        let tracker = ProgressTracker::with_interval(10, Duration::ZERO);
        let (callback, calls) = counting(3);

        for v in 0..3 {
            assert!(tracker.proceed(Some(&callback), v));
            tracker.finish_vertex();
        }
        assert!(!tracker.proceed(Some(&callback), 3));
        assert!(tracker.is_cancelled());
        assert!(!tracker.proceed(Some(&callback), 4));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(tracker.finished(), 3);
    }

    #[test]
    fn test_interval_skips_callbacks() {
        let tracker = ProgressTracker::with_interval(10, Duration::from_secs(3600));
        let (callback, calls) = counting(usize::MAX);
        for v in 0..5 {
            assert!(tracker.proceed(Some(&callback), v));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cancel_without_callback() {
        let tracker = ProgressTracker::new(2);
        assert!(tracker.proceed(None, 0));
        assert_eq!(tracker.finish_vertex(), 1);
        tracker.cancel();
        assert!(!tracker.proceed(None, 1));
        assert_eq!(tracker.progress(1).finished, 1);
    }
}
