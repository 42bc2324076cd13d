/*!
 * Thread Event Queue
 * Per-thread FIFO of posted events, drained by the owning thread
 */

use super::receiver::EventReceiver;
use super::types::Event;
use crossbeam_queue::SegQueue;
use log::debug;
use std::cell::OnceCell;
use std::sync::{Arc, Weak};
use std::thread::{self, ThreadId};

struct PostedEvent {
    receiver: Weak<dyn EventReceiver>,
    event: Event,
}

/// The event queue owned by one thread.
///
/// Any thread may post; only the owning thread processes. Events are
/// delivered in the order they were enqueued.
pub struct ThreadEventQueue {
    owner: ThreadId,
    events: SegQueue<PostedEvent>,
}

thread_local! {
    static CURRENT_QUEUE: OnceCell<Arc<ThreadEventQueue>> = const { OnceCell::new() };
}

impl ThreadEventQueue {
    fn new() -> Self {
        Self {
            owner: thread::current().id(),
            events: SegQueue::new(),
        }
    }

    /// The calling thread's queue, created on first use.
    pub fn current() -> Arc<ThreadEventQueue> {
        CURRENT_QUEUE.with(|cell| cell.get_or_init(|| Arc::new(ThreadEventQueue::new())).clone())
    }

    /// The thread this queue delivers on.
    pub fn owner(&self) -> ThreadId {
        self.owner
    }

    /// Enqueue an event for a receiver. Callable from any thread.
    pub fn post_event(&self, receiver: Weak<dyn EventReceiver>, event: Event) {
        self.events.push(PostedEvent { receiver, event });
    }

    /// Whether any events are waiting.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.events.is_empty()
    }

    /// Deliver the events enqueued so far, returning the number delivered.
    ///
    /// Processes a snapshot of the queue: events posted while processing run
    /// in the next batch, so a receiver that re-posts cannot starve the loop.
    pub fn process(&self) -> usize {
        debug_assert_eq!(thread::current().id(), self.owner);

        let batch = self.events.len();
        let mut delivered = 0;
        for _ in 0..batch {
            let Some(posted) = self.events.pop() else {
                break;
            };
            match posted.receiver.upgrade() {
                Some(receiver) => {
                    receiver.handle_event(posted.event);
                    delivered += 1;
                }
                None => {
                    debug!("Dropping event for destroyed receiver");
                }
            }
        }
        delivered
    }
}
