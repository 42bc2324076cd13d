/*!
 * Loop Driver
 * The exec/pump/quit/wake/post_event surface over wait_for_events
 */

mod wait;

pub(crate) use wait::wait_for_events;

use crate::event::{Event, EventReceiver, ThreadEventQueue};
use crate::thread::ThreadData;
use log::debug;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::Arc;
use std::thread;

/// How one pump iteration treats an empty multiplexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpMode {
    /// Block until a timer, fd, signal, or wake arrives.
    WaitForEvents,
    /// Poll once with a zero timeout and return.
    DontWait,
}

/// One thread's event loop.
///
/// Owned by the thread that created it; `exec` and `pump` must run there.
/// The handle itself is shareable so other threads can `post_event`, `wake`,
/// and `quit`.
pub struct EventLoop {
    thread_data: Arc<ThreadData>,
    queue: Arc<ThreadEventQueue>,
    exit_requested: AtomicBool,
    exit_code: AtomicI32,
}

impl EventLoop {
    pub fn new() -> Self {
        Self {
            thread_data: ThreadData::the(),
            queue: ThreadEventQueue::current(),
            exit_requested: AtomicBool::new(false),
            exit_code: AtomicI32::new(0),
        }
    }

    /// Run until `quit`, returning the exit code. The iteration in flight
    /// when `quit` is called runs to completion.
    pub fn exec(&self) -> i32 {
        loop {
            if self.exit_requested.load(Ordering::Acquire) {
                debug!("Event loop exiting with code {}", self.exit_code.load(Ordering::Acquire));
                return self.exit_code.load(Ordering::Acquire);
            }
            self.pump(PumpMode::WaitForEvents);
        }
    }

    /// One multiplex pass followed by one queue-processing batch. Returns
    /// the number of events processed.
    pub fn pump(&self, mode: PumpMode) -> usize {
        debug_assert_eq!(thread::current().id(), self.queue.owner());
        wait_for_events(mode);
        self.queue.process()
    }

    /// Ask `exec` to return `code`. Only sets flags; observable at the next
    /// iteration boundary.
    pub fn quit(&self, code: i32) {
        self.exit_code.store(code, Ordering::Release);
        self.exit_requested.store(true, Ordering::Release);
    }

    /// Interrupt the loop's sleep from any thread. Harmless when the loop is
    /// not sleeping.
    pub fn wake(&self) {
        self.thread_data.wake_pipe().wake();
    }

    /// Enqueue an event for `receiver` on this loop's queue, waking the
    /// owner if posted from another thread.
    pub fn post_event<R>(&self, receiver: &Arc<R>, event: Event)
    where
        R: EventReceiver + 'static,
    {
        let receiver: Arc<dyn EventReceiver> = receiver.clone();
        self.queue.post_event(Arc::downgrade(&receiver), event);
        if thread::current().id() != self.queue.owner() {
            self.wake();
        }
    }
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}
