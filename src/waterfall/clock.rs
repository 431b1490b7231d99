//! Admission timing for the waterfall history.
//!
//! New spectrum strips enter history at a fixed cadence independent of the
//! render frame rate. The clock keeps the sub-interval remainder when it
//! admits, so elapsed time accumulates correctly across frames instead of
//! drifting by up to one frame per admission.

use std::time::{Duration, Instant};

/// Decides once per render tick whether a new spectrum sample is due.
#[derive(Debug)]
pub struct AdmissionClock {
    interval: Duration,
    last_admitted: Instant,
    carry_over: Duration,
}

impl AdmissionClock {
    /// Creates a clock admitting at `admission_hz`, with the first interval
    /// measured from `now`.
    pub fn new(admission_hz: f64, now: Instant) -> Self {
        debug_assert!(admission_hz > 0.0 && admission_hz.is_finite());
        Self {
            interval: Duration::from_secs_f64(1.0 / admission_hz),
            last_admitted: now,
            carry_over: Duration::ZERO,
        }
    }

    /// Advances the clock to `now` and reports whether a sample should be
    /// admitted on this tick.
    ///
    /// At most one admission per tick: if the render loop stalled across
    /// several intervals, the surplus time folds into the carry-over instead
    /// of triggering a catch-up burst.
    pub fn tick(&mut self, now: Instant) -> bool {
        let delta = now.saturating_duration_since(self.last_admitted);
        if delta > self.interval {
            let remainder = delta.as_nanos() % self.interval.as_nanos();
            self.carry_over = Duration::from_nanos(remainder as u64);
            // Keep the remainder on the books: the next interval is measured
            // from the slot boundary we just crossed, not from this tick.
            self.last_admitted = now - self.carry_over;
            true
        } else {
            self.carry_over = delta;
            false
        }
    }

    /// Elapsed-but-not-yet-admitted time after the last `tick`.
    pub fn carry_over(&self) -> Duration {
        self.carry_over
    }

    /// The configured admission interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Fraction of the admission interval covered by the carry-over, in [0, 1).
    ///
    /// Drives the interpolation that makes scrolling look continuous between
    /// admissions.
    pub fn progress(&self) -> f32 {
        (self.carry_over.as_secs_f64() / self.interval.as_secs_f64()) as f32
    }
}
