/*!
 * Signal Router
 * Process-wide signal number to handler-list table and trampoline
 */

use super::handlers::{SignalCallback, SignalHandlers};
use crate::core::errors::{SignalError, SignalResult};
use crate::core::types::{HandlerId, SignalNumber};
use crate::thread::SIGNAL_TARGET;
use ahash::RandomState;
use dashmap::DashMap;
use log::{debug, info};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

/// The process-wide signal router.
///
/// Registration and dispatch belong to the thread that owns the loop
/// actively handling signals (normally the main thread); the table is
/// sharded only so that contract violations fail soft rather than race.
pub(crate) struct SignalRouter {
    handlers: DashMap<SignalNumber, Arc<SignalHandlers>, RandomState>,
    next_handler_id: AtomicU64,
}

static ROUTER: OnceLock<SignalRouter> = OnceLock::new();

impl SignalRouter {
    pub(crate) fn the() -> &'static SignalRouter {
        ROUTER.get_or_init(|| SignalRouter {
            handlers: DashMap::with_hasher(RandomState::new()),
            next_handler_id: AtomicU64::new(1),
        })
    }

    /// Register a callback for `signal_number`, installing the trampoline
    /// disposition if this is the signal's first handler.
    pub(crate) fn register(
        &self,
        signal_number: SignalNumber,
        callback: SignalCallback,
    ) -> SignalResult<HandlerId> {
        if signal_number == 0 {
            return Err(SignalError::InvalidSignal(signal_number));
        }

        let id = self.next_handler_id.fetch_add(1, Ordering::SeqCst);
        match self.handlers.entry(signal_number) {
            dashmap::mapref::entry::Entry::Occupied(entry) => {
                entry.get().add(id, callback);
            }
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                let handlers = SignalHandlers::install(signal_number, trampoline)?;
                handlers.add(id, callback);
                entry.insert(handlers);
            }
        }
        info!(
            "Registered handler {} for signal {}",
            id, signal_number
        );
        Ok(id)
    }

    /// Remove the handler registered under `id`. Unknown ids are a no-op;
    /// removing the last handler of a signal restores its prior disposition
    /// (deferred past any sweep still holding the list).
    pub(crate) fn unregister(&self, id: HandlerId) {
        if id == 0 {
            return;
        }

        let removed_from = self.handlers.iter().find_map(|entry| {
            if entry.value().remove(id) {
                Some((*entry.key(), entry.value().clone()))
            } else {
                None
            }
        });

        let Some((signal_number, handlers)) = removed_from else {
            debug!("Unregister for unknown handler {} ignored", id);
            return;
        };
        if handlers.is_empty() {
            self.handlers.remove(&signal_number);
        }
        info!("Unregistered handler {} for signal {}", id, signal_number);
    }

    /// Run the handler sweep for `signal_number`. Returns whether any
    /// handler list existed.
    pub(crate) fn dispatch(&self, signal_number: SignalNumber) -> bool {
        // Clone out of the shard so a callback may unregister the very list
        // being dispatched; teardown then waits for the sweep to finish.
        let Some(handlers) = self
            .handlers
            .get(&signal_number)
            .map(|entry| entry.value().clone())
        else {
            debug!("No handlers for dispatched signal {}", signal_number);
            return false;
        };
        handlers.dispatch();
        true
    }
}

/// The installed signal handler. Async-signal-safe by construction: one
/// thread-local read, a `getpid` comparison, and at most one `write`.
pub(crate) extern "C" fn trampoline(signal_number: libc::c_int) {
    let _ = SIGNAL_TARGET.try_with(|target| {
        let (wake_fd, recorded_pid) = target.get();
        if wake_fd < 0 {
            // No event loop state on this thread; nothing to forward to.
            return;
        }
        let current_pid = unsafe { libc::getpid() };
        if current_pid == recorded_pid {
            let bytes = signal_number.to_ne_bytes();
            let written =
                unsafe { libc::write(wake_fd, bytes.as_ptr().cast(), bytes.len()) };
            if written < 0 {
                // Losing the wake pipe mid-signal is unrecoverable.
                unsafe { libc::abort() };
            }
        } else {
            // We are a fork that inherited the parent's pipe: a signal meant
            // for us must not wake the parent. Record our pid and drop it.
            target.set((wake_fd, current_pid));
        }
    });
}
