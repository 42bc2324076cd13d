/*!
 * Event Loop Manager
 * Process-wide registration surface for timers, notifiers, and signals
 */

use crate::core::clock::MonotonicTime;
use crate::core::errors::EngineResult;
use crate::core::types::{HandlerId, SignalNumber};
use crate::driver::EventLoop;
use crate::event::EventReceiver;
use crate::notifier::Notifier;
use crate::signal::SignalRouter;
use crate::thread::{LoopStatsSnapshot, ThreadData};
use crate::timer::{FireWhenInvisible, Timer, TimerId};
use log::debug;
use std::sync::{Arc, OnceLock};
use std::thread;
use std::time::Duration;

/// Registration front for the engine.
///
/// Timers and notifiers bind to the calling thread; signals are
/// process-wide. Everything registered here is serviced by that thread's
/// `EventLoop`.
pub struct EventLoopManager {
    _private: (),
}

static MANAGER: OnceLock<EventLoopManager> = OnceLock::new();

impl EventLoopManager {
    pub fn the() -> &'static EventLoopManager {
        MANAGER.get_or_init(|| EventLoopManager { _private: () })
    }

    /// Build an event loop bound to the calling thread.
    pub fn make_implementation(&self) -> EventLoop {
        EventLoop::new()
    }

    /// Schedule a timer for `receiver` on the calling thread.
    ///
    /// A zero interval means "next loop iteration": the timer goes on the
    /// deferred list rather than committing to an absolute fire time now.
    pub fn register_timer<R>(
        &self,
        receiver: &Arc<R>,
        interval_ms: u64,
        periodic: bool,
        fire_when_invisible: FireWhenInvisible,
    ) -> TimerId
    where
        R: EventReceiver + 'static,
    {
        let thread_data = ThreadData::the();
        let interval = Duration::from_millis(interval_ms);
        let owner: Arc<dyn EventReceiver> = receiver.clone();
        let timer = Timer::new(
            Arc::downgrade(&owner),
            thread::current().id(),
            interval,
            periodic,
            fire_when_invisible,
        );

        thread_data.with_inner(|inner| {
            if interval.is_zero() {
                inner.timers.schedule_relative(timer.clone());
            } else {
                timer.set_fire_at(MonotonicTime::now_coarse() + interval);
                inner.timers.schedule_absolute(timer.clone());
            }
        });
        debug!(
            "Registered {} timer with interval {}ms",
            if periodic { "periodic" } else { "one-shot" },
            interval_ms
        );
        TimerId(timer)
    }

    /// Remove and destroy a timer. Idempotent: a second unregister through
    /// a cloned handle, or one arriving after the owner thread exited, is a
    /// no-op.
    pub fn unregister_timer(&self, id: TimerId) {
        let timer = id.0;
        let Some(thread_data) = ThreadData::for_thread(timer.owner_thread()) else {
            return;
        };
        if timer.mark_deleted() {
            thread_data.with_inner(|inner| inner.timers.unschedule(&timer));
            debug!("Unregistered timer");
        }
    }

    /// Watch a notifier's fd on the calling thread.
    pub fn register_notifier(&self, notifier: Arc<Notifier>) -> EngineResult<()> {
        let thread_data = ThreadData::the();
        let registered = notifier.clone();
        thread_data.with_inner(|inner| inner.notifiers.register(notifier))?;
        registered.set_owner_thread(Some(thread::current().id()));
        Ok(())
    }

    /// Stop watching a notifier's fd. Unknown notifiers and notifiers whose
    /// owner thread has exited are a no-op.
    pub fn unregister_notifier(&self, notifier: &Notifier) {
        let Some(owner_thread) = notifier.owner_thread() else {
            return;
        };
        let Some(thread_data) = ThreadData::for_thread(owner_thread) else {
            return;
        };
        thread_data.with_inner(|inner| inner.notifiers.unregister(notifier.fd()));
        notifier.set_owner_thread(None);
    }

    /// Register a process-wide signal callback, dispatched from this
    /// thread's loop. Returns a non-zero handler id.
    pub fn register_signal<F>(
        &self,
        signal_number: SignalNumber,
        callback: F,
    ) -> EngineResult<HandlerId>
    where
        F: Fn(SignalNumber) + Send + Sync + 'static,
    {
        // The trampoline forwards through this thread's wake pipe; make sure
        // it exists before the disposition can fire.
        let _ = ThreadData::the();
        let id = SignalRouter::the().register(signal_number, Arc::new(callback))?;
        Ok(id)
    }

    /// Remove a signal callback. Unknown or zero ids are a no-op.
    pub fn unregister_signal(&self, handler_id: HandlerId) {
        SignalRouter::the().unregister(handler_id);
    }

    /// Counters for the calling thread's loop.
    pub fn loop_stats(&self) -> LoopStatsSnapshot {
        ThreadData::the().stats().snapshot()
    }
}
