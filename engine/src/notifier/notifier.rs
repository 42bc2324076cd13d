/*!
 * Notifier
 * One watched fd with a declared interest and an activation callback
 */

use super::types::{NotificationType, NotifierActivation};
use crate::core::types::Fd;
use crate::event::{Event, EventReceiver};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::thread::ThreadId;

type ActivationFn = Box<dyn Fn(NotifierActivation) + Send + Sync>;

/// A watched file descriptor.
///
/// The notifier borrows the fd; the caller keeps ownership and must
/// unregister before closing it. Activations arrive through the event queue
/// on the registering thread, so the callback runs loop-side, not poll-side.
pub struct Notifier {
    fd: Fd,
    interest: NotificationType,
    owner_thread: Mutex<Option<ThreadId>>,
    on_activation: ActivationFn,
}

impl Notifier {
    pub fn new<F>(fd: Fd, interest: NotificationType, on_activation: F) -> Arc<Notifier>
    where
        F: Fn(NotifierActivation) + Send + Sync + 'static,
    {
        Arc::new(Notifier {
            fd,
            interest,
            owner_thread: Mutex::new(None),
            on_activation: Box::new(on_activation),
        })
    }

    pub fn fd(&self) -> Fd {
        self.fd
    }

    /// The declared interest, used to narrow observed readiness.
    pub fn interest(&self) -> NotificationType {
        self.interest
    }

    /// The thread this notifier is registered on, if any.
    pub fn owner_thread(&self) -> Option<ThreadId> {
        *self.owner_thread.lock()
    }

    pub(crate) fn set_owner_thread(&self, thread: Option<ThreadId>) {
        *self.owner_thread.lock() = thread;
    }
}

impl EventReceiver for Notifier {
    fn handle_event(&self, event: Event) {
        if let Event::NotifierActivation(activation) = event {
            (self.on_activation)(activation);
        }
    }
}

impl fmt::Debug for Notifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier")
            .field("fd", &self.fd)
            .field("interest", &self.interest)
            .field("owner_thread", &*self.owner_thread.lock())
            .finish()
    }
}
