/*!
 * Timer Set
 * Pending timers: active min-heap plus the deferred (relative) list
 */

use super::heap::TimerHeap;
use super::timer::{Slot, Timer};
use crate::core::clock::MonotonicTime;
use std::sync::Arc;

/// The ordered set of pending timers for one thread.
///
/// A timer is in exactly one of three states: unscheduled, on the deferred
/// list (relative, awaiting an absolute anchor), or active in the heap.
#[derive(Default)]
pub(crate) struct TimerSet {
    heap: TimerHeap,
    deferred: Vec<Arc<Timer>>,
}

impl TimerSet {
    /// Insert an absolutely-scheduled timer into the heap.
    pub(crate) fn schedule_absolute(&mut self, timer: Arc<Timer>) {
        self.heap.insert(timer);
    }

    /// Append a relative timer to the deferred list. It is anchored against
    /// the clock at the top of the next iteration, so timers registered
    /// while the loop is stalled all share one consistent anchor, and
    /// zero-interval periodic timers coalesce to "next iteration" instead of
    /// spinning the heap.
    pub(crate) fn schedule_relative(&mut self, timer: Arc<Timer>) {
        timer.set_slot(Slot::Deferred(self.deferred.len()));
        self.deferred.push(timer);
    }

    /// Anchor every deferred timer against `now` and move it to the heap.
    pub(crate) fn absolutize_relative(&mut self, now: MonotonicTime) {
        for timer in std::mem::take(&mut self.deferred) {
            timer.absolutize(now);
            self.heap.insert(timer);
        }
    }

    /// Fire time of the soonest active timer, if any.
    pub(crate) fn next_expiration(&self) -> Option<MonotonicTime> {
        self.heap.peek_min().map(|timer| timer.fire_time())
    }

    /// Pop every timer with `fire_time <= now`, marking each unscheduled.
    ///
    /// A single pass: the caller fires the returned timers afterwards, and a
    /// timer that reschedules lands strictly in the future or on the
    /// deferred list, so it cannot be popped again this iteration.
    pub(crate) fn take_expired(&mut self, now: MonotonicTime) -> Vec<Arc<Timer>> {
        let mut expired = Vec::new();
        while self.heap.peek_min().map_or(false, |min| min.fire_time() <= now) {
            if let Some(timer) = self.heap.pop_min() {
                timer.set_slot(Slot::Unscheduled);
                expired.push(timer);
            }
        }
        expired
    }

    /// Remove a timer from whichever container holds it. Tolerates timers
    /// that are already unscheduled.
    pub(crate) fn unschedule(&mut self, timer: &Arc<Timer>) {
        match timer.slot() {
            Slot::Unscheduled => return,
            Slot::Deferred(index) => {
                let last = self.deferred.len() - 1;
                debug_assert!(Arc::ptr_eq(&self.deferred[index], timer));
                self.deferred.swap(index, last);
                self.deferred.pop();
                if index < self.deferred.len() {
                    self.deferred[index].set_slot(Slot::Deferred(index));
                }
            }
            Slot::Heap(index) => {
                let removed = self.heap.remove_at(index);
                debug_assert!(removed.map_or(false, |t| Arc::ptr_eq(&t, timer)));
            }
        }
        timer.set_slot(Slot::Unscheduled);
    }

    /// Mark every member unscheduled and empty both containers. Does not
    /// destroy the timers.
    pub(crate) fn clear(&mut self) {
        for timer in self.heap.drain() {
            timer.set_slot(Slot::Unscheduled);
        }
        for timer in self.deferred.drain(..) {
            timer.set_slot(Slot::Unscheduled);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.heap.len() + self.deferred.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Event, EventReceiver};
    use crate::timer::timer::FireWhenInvisible;
    use std::sync::Weak;
    use std::time::Duration;

    struct NullReceiver;
    impl EventReceiver for NullReceiver {
        fn handle_event(&self, _event: Event) {}
    }

    fn relative_timer(millis: u64) -> Arc<Timer> {
        Timer::new(
            Weak::<NullReceiver>::new(),
            std::thread::current().id(),
            Duration::from_millis(millis),
            false,
            FireWhenInvisible::No,
        )
    }

    fn absolute_timer(at: MonotonicTime) -> Arc<Timer> {
        let timer = relative_timer(0);
        timer.set_fire_at(at);
        timer
    }

    fn at(millis: u64) -> MonotonicTime {
        MonotonicTime::from_raw(Duration::from_millis(millis))
    }

    #[test]
    fn test_absolutize_moves_deferred_to_heap() {
        let mut set = TimerSet::default();
        let t1 = relative_timer(10);
        let t2 = relative_timer(5);
        set.schedule_relative(t1.clone());
        set.schedule_relative(t2.clone());
        assert_eq!(t1.slot(), Slot::Deferred(0));
        assert_eq!(t2.slot(), Slot::Deferred(1));
        assert_eq!(set.next_expiration(), None);

        set.absolutize_relative(at(100));
        assert_eq!(set.next_expiration(), Some(at(105)));
        assert!(matches!(t1.slot(), Slot::Heap(_)));
        assert!(matches!(t2.slot(), Slot::Heap(_)));
    }

    #[test]
    fn test_take_expired_fires_at_exact_boundary() {
        let mut set = TimerSet::default();
        set.schedule_absolute(absolute_timer(at(50)));
        set.schedule_absolute(absolute_timer(at(51)));

        let expired = set.take_expired(at(50));
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].slot(), Slot::Unscheduled);
        assert_eq!(set.next_expiration(), Some(at(51)));
    }

    #[test]
    fn test_take_expired_pops_in_order() {
        let mut set = TimerSet::default();
        for ms in [30, 10, 20] {
            set.schedule_absolute(absolute_timer(at(ms)));
        }
        let expired = set.take_expired(at(100));
        let times: Vec<_> = expired.iter().map(|t| t.fire_time()).collect();
        assert_eq!(times, vec![at(10), at(20), at(30)]);
        assert_eq!(set.len(), 0);
    }

    #[test]
    fn test_unschedule_from_deferred_list_middle() {
        let mut set = TimerSet::default();
        let timers: Vec<_> = (0..4).map(|ms| relative_timer(ms)).collect();
        for timer in &timers {
            set.schedule_relative(timer.clone());
        }

        set.unschedule(&timers[1]);
        assert_eq!(timers[1].slot(), Slot::Unscheduled);
        // The swapped-in tail entry took over the vacated position.
        assert_eq!(timers[3].slot(), Slot::Deferred(1));
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_unschedule_from_heap() {
        let mut set = TimerSet::default();
        let a = absolute_timer(at(10));
        let b = absolute_timer(at(20));
        set.schedule_absolute(a.clone());
        set.schedule_absolute(b.clone());

        set.unschedule(&a);
        assert_eq!(a.slot(), Slot::Unscheduled);
        assert_eq!(set.next_expiration(), Some(at(20)));
    }

    #[test]
    fn test_unschedule_is_idempotent() {
        let mut set = TimerSet::default();
        let timer = absolute_timer(at(10));
        set.schedule_absolute(timer.clone());
        set.unschedule(&timer);
        set.unschedule(&timer);
        assert_eq!(set.len(), 0);
    }

    #[test]
    fn test_clear_marks_all_unscheduled() {
        let mut set = TimerSet::default();
        let a = absolute_timer(at(10));
        let b = relative_timer(5);
        set.schedule_absolute(a.clone());
        set.schedule_relative(b.clone());

        set.clear();
        assert_eq!(a.slot(), Slot::Unscheduled);
        assert_eq!(b.slot(), Slot::Unscheduled);
        assert_eq!(set.len(), 0);
    }
}
