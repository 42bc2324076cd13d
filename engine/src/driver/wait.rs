/*!
 * Wait For Events
 * One blocking multiplex pass: timers, fd readiness, signals, wakes
 */

use super::PumpMode;
use crate::core::clock::MonotonicTime;
use crate::event::{Event, EventReceiver, ThreadEventQueue};
use crate::notifier::{NotificationType, NotifierActivation};
use crate::signal::SignalRouter;
use crate::thread::ThreadData;
use crate::wake::{DRAIN_CAPACITY, WAKE_TOKEN};
use log::error;
use nix::errno::Errno;
use std::sync::Arc;

/// Sleep bound for the readiness call, in poll's terms: milliseconds, with
/// `-1` meaning wait forever.
fn compute_timeout_ms(
    mode: PumpMode,
    has_pending_events: bool,
    next_expiration: Option<MonotonicTime>,
    now: MonotonicTime,
) -> i32 {
    if mode == PumpMode::DontWait || has_pending_events {
        return 0;
    }
    match next_expiration {
        Some(expiration) => {
            let millis = expiration.saturating_since(now).as_millis();
            if millis > i32::MAX as u128 {
                i32::MAX
            } else {
                millis as i32
            }
        }
        None => -1,
    }
}

/// Run one iteration of the multiplexer on the calling thread.
///
/// Ordering within the pass: signals are dispatched synchronously, then fd
/// readiness and expired timers are posted to the event queue in that
/// order. The caller processes the queue afterwards.
pub(crate) fn wait_for_events(mode: PumpMode) {
    let thread_data = ThreadData::the();
    let queue = ThreadEventQueue::current();

    // Re-entered when the wake-pipe drain fills its buffer: keep draining
    // (and re-polling) before trusting any fd readiness from the stale pass.
    'retry: loop {
        thread_data.stats().record_iteration();
        let has_pending_events = queue.has_pending();

        let time_at_iteration_start = MonotonicTime::now_coarse();
        let (mut poll_fds, timeout_ms) = thread_data.with_inner(|inner| {
            inner.timers.absolutize_relative(time_at_iteration_start);
            let timeout_ms = compute_timeout_ms(
                mode,
                has_pending_events,
                inner.timers.next_expiration(),
                time_at_iteration_start,
            );
            (inner.notifiers.snapshot_poll_fds(), timeout_ms)
        });

        // The lock is released while blocking: another thread may unregister
        // a notifier mid-sleep, so readiness below is re-checked against the
        // live registry by fd.
        let marked_fd_count = loop {
            let count = unsafe {
                libc::poll(
                    poll_fds.as_mut_ptr(),
                    poll_fds.len() as libc::nfds_t,
                    timeout_ms,
                )
            };
            if count >= 0 {
                break count;
            }
            let errno = Errno::last();
            if errno == Errno::EINTR {
                // Interrupted by a signal: the trampoline already funneled
                // it into the pipe. Poll again without re-absolutizing, which
                // would drift deferred timers.
                continue;
            }
            error!("Readiness poll failed: {}", errno);
            panic!("readiness poll failed: {}", errno);
        };

        let time_after_poll = MonotonicTime::now_coarse();

        // Wake pipe first: signals dispatch before any fd or timer event is
        // posted.
        if poll_fds[0].revents & libc::POLLIN != 0 {
            let mut tokens = [0i32; DRAIN_CAPACITY];
            let count = thread_data.wake_pipe().drain(&mut tokens);
            let mut wake_requested = false;
            for &token in &tokens[..count] {
                if token == WAKE_TOKEN {
                    wake_requested = true;
                    thread_data.stats().record_wake_request();
                } else {
                    SignalRouter::the().dispatch(token);
                    thread_data.stats().record_signal_dispatched();
                }
            }

            // A full buffer with no explicit wake means the pipe may hold
            // more signals; attributing this pass's readiness to them would
            // be wrong, so start over.
            if !wake_requested && count == DRAIN_CAPACITY {
                continue 'retry;
            }
        }

        if marked_fd_count != 0 {
            for poll_fd in &poll_fds[1..] {
                if poll_fd.revents == 0 {
                    continue;
                }
                let Some(notifier) =
                    thread_data.with_inner(|inner| inner.notifiers.get(poll_fd.fd))
                else {
                    continue;
                };
                let kind =
                    NotificationType::from_revents(poll_fd.revents) & notifier.interest();
                if kind.is_empty() {
                    continue;
                }
                let activation = NotifierActivation {
                    fd: notifier.fd(),
                    kind,
                };
                let receiver: Arc<dyn EventReceiver> = notifier;
                queue.post_event(
                    Arc::downgrade(&receiver),
                    Event::NotifierActivation(activation),
                );
                thread_data.stats().record_notifier_activation();
            }
        }

        // Expired timers last, against the post-sleep clock, so a timer that
        // elapsed during the sleep fires in the same pass as the fd that
        // shared the wake.
        let expired = thread_data.with_inner(|inner| inner.timers.take_expired(time_after_poll));
        thread_data.stats().record_timers_fired(expired.len() as u64);
        for timer in &expired {
            timer.fire(&thread_data, time_after_poll);
        }

        return;
    }
}
