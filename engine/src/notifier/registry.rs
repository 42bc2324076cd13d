/*!
 * Notifier Registry
 * fd to notifier mapping, kept in lockstep with the poll vector
 */

use super::notifier::Notifier;
use crate::core::errors::NotifierError;
use crate::core::types::Fd;
use ahash::RandomState;
use log::debug;
use std::collections::HashMap;
use std::sync::Arc;

/// Registered notifiers for one thread plus the poll vector fed to the
/// readiness call.
///
/// Slot 0 of the poll vector is always the wake pipe's read end; slots past
/// it correspond one-to-one, in insertion order, with the registered
/// notifiers.
pub(crate) struct NotifierRegistry {
    notifiers: HashMap<Fd, Arc<Notifier>, RandomState>,
    poll_fds: Vec<libc::pollfd>,
}

impl NotifierRegistry {
    pub(crate) fn new(wake_read_fd: Fd) -> Self {
        Self {
            notifiers: HashMap::with_hasher(RandomState::new()),
            poll_fds: vec![libc::pollfd {
                fd: wake_read_fd,
                events: libc::POLLIN,
                revents: 0,
            }],
        }
    }

    /// Add a notifier and its poll slot. A given fd can be watched at most
    /// once per thread.
    pub(crate) fn register(&mut self, notifier: Arc<Notifier>) -> Result<(), NotifierError> {
        let fd = notifier.fd();
        if self.notifiers.contains_key(&fd) {
            return Err(NotifierError::AlreadyRegistered(fd));
        }
        self.poll_fds.push(libc::pollfd {
            fd,
            events: notifier.interest().poll_events(),
            revents: 0,
        });
        self.notifiers.insert(fd, notifier);
        debug!("Registered notifier for fd {}", fd);
        Ok(())
    }

    /// Remove the notifier watching `fd`, if any, along with its poll slot.
    pub(crate) fn unregister(&mut self, fd: Fd) -> bool {
        if self.notifiers.remove(&fd).is_none() {
            return false;
        }
        // Slot 0 is the wake pipe and never matches a notifier fd.
        self.poll_fds.retain(|poll_fd| poll_fd.fd != fd);
        debug!("Unregistered notifier for fd {}", fd);
        true
    }

    pub(crate) fn get(&self, fd: Fd) -> Option<Arc<Notifier>> {
        self.notifiers.get(&fd).cloned()
    }

    /// Copy of the poll vector with readiness cleared, for one poll call.
    pub(crate) fn snapshot_poll_fds(&self) -> Vec<libc::pollfd> {
        self.poll_fds
            .iter()
            .map(|poll_fd| libc::pollfd {
                fd: poll_fd.fd,
                events: poll_fd.events,
                revents: 0,
            })
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.notifiers.len()
    }
}
