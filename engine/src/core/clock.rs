/*!
 * Monotonic Clock
 * Coarse monotonic time source for timer scheduling
 */

use nix::time::{clock_gettime, ClockId};
use std::ops::Add;
use std::time::Duration;

#[cfg(target_os = "linux")]
const CLOCK: ClockId = ClockId::CLOCK_MONOTONIC_COARSE;
#[cfg(not(target_os = "linux"))]
const CLOCK: ClockId = ClockId::CLOCK_MONOTONIC;

/// A point on the monotonic clock, as a duration since the monotonic epoch.
///
/// Timer arithmetic never touches wall time: wall clock jumps must not
/// reorder or replay timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonotonicTime(Duration);

impl MonotonicTime {
    /// Read the coarse monotonic clock.
    ///
    /// Millisecond resolution is all the timer set needs; the coarse clock
    /// avoids a vDSO-miss on hot iteration paths.
    pub fn now_coarse() -> Self {
        match clock_gettime(CLOCK) {
            Ok(ts) => MonotonicTime(Duration::new(ts.tv_sec() as u64, ts.tv_nsec() as u32)),
            Err(e) => panic!("monotonic clock unavailable: {}", e),
        }
    }

    /// Duration from `earlier` to `self`, zero if `earlier` is in the future.
    #[inline]
    #[must_use]
    pub fn saturating_since(&self, earlier: MonotonicTime) -> Duration {
        self.0.saturating_sub(earlier.0)
    }

    #[cfg(test)]
    pub(crate) fn from_raw(since_epoch: Duration) -> Self {
        MonotonicTime(since_epoch)
    }
}

impl Add<Duration> for MonotonicTime {
    type Output = MonotonicTime;

    fn add(self, rhs: Duration) -> MonotonicTime {
        MonotonicTime(self.0 + rhs)
    }
}
