/*!
 * Signal Handlers
 * Ordered callback list for one signal number, reentrancy-safe
 */

use crate::core::errors::{SignalError, SignalResult};
use crate::core::types::{HandlerId, SignalNumber};
use log::{debug, warn};
use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Callback invoked from the event loop when its signal number arrives.
pub type SignalCallback = Arc<dyn Fn(SignalNumber) + Send + Sync>;

struct HandlerTable {
    /// Callbacks invoked on dispatch, in handler-id order.
    active: BTreeMap<HandlerId, SignalCallback>,
    /// Mutations observed while a dispatch sweep is running. `None` marks a
    /// pending removal; entries merge into `active` when the sweep ends.
    pending: BTreeMap<HandlerId, Option<SignalCallback>>,
    dispatching: bool,
}

/// The handler list for one signal number.
///
/// Created when the first handler registers (installing the trampoline
/// disposition) and dropped when the last one leaves (restoring the prior
/// disposition). Dispatch holds a reference, so teardown requested from
/// inside a callback is deferred past the sweep.
pub(crate) struct SignalHandlers {
    signal_number: SignalNumber,
    original: Option<SigAction>,
    table: Mutex<HandlerTable>,
}

impl SignalHandlers {
    /// Point the process-wide disposition for `signal_number` at
    /// `trampoline`, remembering what it replaced.
    pub(crate) fn install(
        signal_number: SignalNumber,
        trampoline: extern "C" fn(libc::c_int),
    ) -> SignalResult<Arc<SignalHandlers>> {
        let signal = Signal::try_from(signal_number)
            .map_err(|_| SignalError::InvalidSignal(signal_number))?;
        let action = SigAction::new(
            SigHandler::Handler(trampoline),
            SaFlags::SA_RESTART,
            SigSet::empty(),
        );
        let original = unsafe { sigaction(signal, &action) }.map_err(|e| {
            SignalError::DispositionFailed {
                signal: signal_number,
                reason: e.to_string(),
            }
        })?;
        debug!("Installed trampoline disposition for signal {}", signal_number);

        Ok(Arc::new(SignalHandlers {
            signal_number,
            original: Some(original),
            table: Mutex::new(HandlerTable {
                active: BTreeMap::new(),
                pending: BTreeMap::new(),
                dispatching: false,
            }),
        }))
    }

    /// Add a callback under `id`. Lands in `pending` while a sweep runs.
    pub(crate) fn add(&self, id: HandlerId, callback: SignalCallback) {
        let mut table = self.table.lock();
        if table.dispatching {
            table.pending.insert(id, Some(callback));
        } else {
            table.active.insert(id, callback);
        }
    }

    /// Remove the callback registered under `id`. Returns whether this call
    /// took effect (a second removal of the same id does not).
    pub(crate) fn remove(&self, id: HandlerId) -> bool {
        let mut table = self.table.lock();
        if table.dispatching {
            if table.active.contains_key(&id) {
                // Tombstone: the sweep still runs it, the merge deletes it.
                table.pending.insert(id, None);
                return true;
            }
            return match table.pending.get_mut(&id) {
                Some(entry) if entry.is_some() => {
                    *entry = None;
                    true
                }
                _ => false,
            };
        }
        table.active.remove(&id).is_some()
    }

    /// Whether no handler remains, counting pending adds.
    pub(crate) fn is_empty(&self) -> bool {
        let table = self.table.lock();
        if table.dispatching && table.pending.values().any(|entry| entry.is_some()) {
            return false;
        }
        table.active.is_empty()
    }

    /// Invoke every active callback in id order, then fold in the mutations
    /// the callbacks made.
    pub(crate) fn dispatch(&self) {
        let callbacks: Vec<SignalCallback> = {
            let mut table = self.table.lock();
            table.dispatching = true;
            table.active.values().cloned().collect()
        };

        for callback in callbacks {
            callback(self.signal_number);
        }

        let mut table = self.table.lock();
        let pending = std::mem::take(&mut table.pending);
        for (id, entry) in pending {
            match entry {
                Some(callback) => {
                    table.active.insert(id, callback);
                }
                None => {
                    table.active.remove(&id);
                }
            }
        }
        table.dispatching = false;
    }

    #[cfg(test)]
    fn for_test(signal_number: SignalNumber) -> Arc<SignalHandlers> {
        Arc::new(SignalHandlers {
            signal_number,
            original: None,
            table: Mutex::new(HandlerTable {
                active: BTreeMap::new(),
                pending: BTreeMap::new(),
                dispatching: false,
            }),
        })
    }
}

impl Drop for SignalHandlers {
    fn drop(&mut self) {
        let Some(original) = self.original.take() else {
            return;
        };
        match Signal::try_from(self.signal_number) {
            Ok(signal) => {
                if let Err(e) = unsafe { sigaction(signal, &original) } {
                    warn!(
                        "Failed to restore disposition for signal {}: {}",
                        self.signal_number, e
                    );
                } else {
                    debug!("Restored disposition for signal {}", self.signal_number);
                }
            }
            Err(_) => warn!(
                "Cannot restore disposition for unknown signal {}",
                self.signal_number
            ),
        }
    }
}
