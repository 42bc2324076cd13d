/*!
 * Timer
 * One scheduled expiration, optionally periodic, bound to a weak receiver
 */

use crate::core::clock::MonotonicTime;
use crate::event::{Event, EventReceiver, ThreadEventQueue};
use crate::thread::ThreadData;
use log::debug;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread::ThreadId;
use std::time::Duration;

/// Delivery policy for a timer whose receiver reports itself as not visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FireWhenInvisible {
    /// Deliver only while the receiver is visible.
    #[default]
    No,
    /// Deliver regardless of receiver visibility.
    Yes,
    /// Keep the timer ticking but never deliver. A muted timer: periodic
    /// rescheduling continues so unmuting (re-registering) stays cheap.
    Never,
}

/// Where a timer currently sits. Replaces a signed-index encoding: the
/// variant is the discriminator, so position and payload cannot disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Slot {
    /// Not owned by any container.
    Unscheduled,
    /// Waiting on the deferred list at this position.
    Deferred(usize),
    /// Active in the heap at this position.
    Heap(usize),
}

/// The timer's deadline, discriminated by scheduling state: a deferred timer
/// carries the duration still to be anchored, an active timer the absolute
/// fire time.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Deadline {
    Pending(Duration),
    At(MonotonicTime),
}

pub(crate) struct Sched {
    pub(crate) slot: Slot,
    pub(crate) deadline: Deadline,
}

/// A scheduled expiration.
///
/// Configuration is immutable after construction; the scheduling cell is
/// mutated only by the owner thread (under its ThreadData lock) and `fire`.
pub(crate) struct Timer {
    interval: Duration,
    periodic: bool,
    fire_when_invisible: FireWhenInvisible,
    owner: Weak<dyn EventReceiver>,
    owner_thread: ThreadId,
    being_deleted: AtomicBool,
    sched: Mutex<Sched>,
}

impl Timer {
    pub(crate) fn new(
        owner: Weak<dyn EventReceiver>,
        owner_thread: ThreadId,
        interval: Duration,
        periodic: bool,
        fire_when_invisible: FireWhenInvisible,
    ) -> Arc<Timer> {
        Arc::new(Timer {
            interval,
            periodic,
            fire_when_invisible,
            owner,
            owner_thread,
            being_deleted: AtomicBool::new(false),
            sched: Mutex::new(Sched {
                slot: Slot::Unscheduled,
                deadline: Deadline::Pending(interval),
            }),
        })
    }

    pub(crate) fn owner_thread(&self) -> ThreadId {
        self.owner_thread
    }

    /// Claim the right to destroy this timer. Exactly one caller wins.
    pub(crate) fn mark_deleted(&self) -> bool {
        self.being_deleted
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Absolute fire time. Only meaningful while active in the heap.
    pub(crate) fn fire_time(&self) -> MonotonicTime {
        match self.sched.lock().deadline {
            Deadline::At(time) => time,
            Deadline::Pending(_) => unreachable!("fire_time read on a deferred timer"),
        }
    }

    pub(crate) fn slot(&self) -> Slot {
        self.sched.lock().slot
    }

    pub(crate) fn set_slot(&self, slot: Slot) {
        self.sched.lock().slot = slot;
    }

    pub(crate) fn set_fire_at(&self, time: MonotonicTime) {
        self.sched.lock().deadline = Deadline::At(time);
    }

    pub(crate) fn set_pending(&self, duration: Duration) {
        self.sched.lock().deadline = Deadline::Pending(duration);
    }

    /// Anchor a deferred timer against `now`. No-op if already absolute.
    pub(crate) fn absolutize(&self, now: MonotonicTime) {
        let mut sched = self.sched.lock();
        if let Deadline::Pending(duration) = sched.deadline {
            sched.deadline = Deadline::At(now + duration);
        }
    }

    /// Handle expiration at `now`. The timer has already been popped from
    /// the heap and marked unscheduled; no ThreadData lock is held, so the
    /// visibility predicate may re-enter the registration API.
    pub(crate) fn fire(self: &Arc<Timer>, thread_data: &ThreadData, now: MonotonicTime) {
        // An unregister may have won the deletion race after this timer was
        // popped; it must not resurrect itself into the heap.
        if self.being_deleted.load(Ordering::Acquire) {
            return;
        }
        let Some(owner) = self.owner.upgrade() else {
            debug!("Timer fired with destroyed receiver, dropping");
            return;
        };

        if self.periodic {
            let mut next = self.fire_time() + self.interval;
            if next <= now {
                // Fell behind: skip the missed ticks instead of replaying them.
                next = now + self.interval;
            }
            if next > now {
                self.set_fire_at(next);
                thread_data.with_inner(|inner| inner.timers.schedule_absolute(self.clone()));
            } else {
                // A zero interval would re-expire immediately and spin the
                // heap; the deferred list coalesces it to the next iteration.
                self.set_pending(Duration::ZERO);
                thread_data.with_inner(|inner| inner.timers.schedule_relative(self.clone()));
            }
        }

        let deliver = match self.fire_when_invisible {
            FireWhenInvisible::Yes => true,
            FireWhenInvisible::No => owner.is_visible_for_timers(),
            FireWhenInvisible::Never => false,
        };
        if deliver {
            let receiver: Arc<dyn EventReceiver> = owner;
            ThreadEventQueue::current().post_event(Arc::downgrade(&receiver), Event::Timer);
        }
    }
}

impl fmt::Debug for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sched = self.sched.lock();
        f.debug_struct("Timer")
            .field("interval", &self.interval)
            .field("periodic", &self.periodic)
            .field("fire_when_invisible", &self.fire_when_invisible)
            .field("slot", &sched.slot)
            .field("deadline", &sched.deadline)
            .finish()
    }
}

/// Opaque, cloneable handle to a registered timer.
///
/// Receivers typically keep the handle; unregistering through any clone is
/// idempotent.
#[derive(Clone)]
pub struct TimerId(pub(crate) Arc<Timer>);

impl fmt::Debug for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TimerId")
            .field(&Arc::as_ptr(&self.0))
            .finish()
    }
}
