/*!
 * Thread Data
 * Per-thread aggregate: wake pipe, timer set, notifier registry, stats
 */

mod stats;

pub use stats::LoopStatsSnapshot;

pub(crate) use stats::LoopStats;

use crate::core::types::Fd;
use crate::notifier::NotifierRegistry;
use crate::timer::TimerSet;
use crate::wake::WakePipe;
use ahash::RandomState;
use log::{debug, error};
use parking_lot::{Mutex, RwLock};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};
use std::thread::{self, ThreadId};

thread_local! {
    /// Wake fd and pid mirror for the signal trampoline. A plain `Copy`
    /// cell: the trampoline runs in signal context and must not touch
    /// locks or allocate.
    pub(crate) static SIGNAL_TARGET: Cell<(Fd, libc::pid_t)> = const { Cell::new((-1, 0)) };

    static CURRENT: RefCell<Option<ThreadDataGuard>> = const { RefCell::new(None) };
}

static THREADS: OnceLock<RwLock<HashMap<ThreadId, Arc<ThreadData>, RandomState>>> =
    OnceLock::new();

fn threads() -> &'static RwLock<HashMap<ThreadId, Arc<ThreadData>, RandomState>> {
    THREADS.get_or_init(|| RwLock::new(HashMap::with_hasher(RandomState::new())))
}

/// Mutable per-thread loop state. Guarded by one mutex so cross-thread
/// unregister operations stay sound; the lock is never held across the
/// blocking readiness call.
pub(crate) struct ThreadDataInner {
    pub(crate) timers: TimerSet,
    pub(crate) notifiers: NotifierRegistry,
}

/// Everything one thread's event loop owns.
///
/// Created lazily on first use, registered in a process-global map for
/// cross-thread lookups, and removed from it when the thread exits. Timers
/// and notifiers are not freed on teardown; unregistering them afterwards
/// is a no-op.
pub(crate) struct ThreadData {
    thread: ThreadId,
    pid: libc::pid_t,
    wake_pipe: WakePipe,
    inner: Mutex<ThreadDataInner>,
    stats: LoopStats,
}

struct ThreadDataGuard(Arc<ThreadData>);

impl Drop for ThreadDataGuard {
    fn drop(&mut self) {
        // Members are marked unscheduled, not destroyed: handles held
        // elsewhere must observe a consistent state.
        self.0.with_inner(|inner| inner.timers.clear());
        threads().write().remove(&self.0.thread);
        let _ = SIGNAL_TARGET.try_with(|target| target.set((-1, 0)));
        debug!("Tore down event loop thread data");
    }
}

impl ThreadData {
    fn new() -> crate::core::errors::EngineResult<ThreadData> {
        let wake_pipe = WakePipe::new()?;
        let wake_read_fd = wake_pipe.read_fd();
        Ok(ThreadData {
            thread: thread::current().id(),
            pid: unsafe { libc::getpid() },
            wake_pipe,
            inner: Mutex::new(ThreadDataInner {
                timers: TimerSet::default(),
                notifiers: NotifierRegistry::new(wake_read_fd),
            }),
            stats: LoopStats::default(),
        })
    }

    /// The calling thread's data, created on first use.
    pub(crate) fn the() -> Arc<ThreadData> {
        CURRENT.with(|cell| {
            let mut current = cell.borrow_mut();
            if let Some(guard) = current.as_ref() {
                return guard.0.clone();
            }

            let data = match ThreadData::new() {
                Ok(data) => Arc::new(data),
                Err(e) => {
                    // The loop cannot exist without its wake funnel.
                    error!("Failed to create event loop thread data: {}", e);
                    panic!("failed to create event loop thread data: {}", e);
                }
            };
            threads().write().insert(data.thread, data.clone());
            SIGNAL_TARGET.with(|target| target.set((data.wake_pipe.write_fd(), data.pid)));
            debug!("Created event loop thread data");

            let result = data.clone();
            *current = Some(ThreadDataGuard(data));
            result
        })
    }

    /// Another thread's data, for cross-thread unregister operations.
    pub(crate) fn for_thread(thread: ThreadId) -> Option<Arc<ThreadData>> {
        threads().read().get(&thread).cloned()
    }

    pub(crate) fn with_inner<R>(&self, f: impl FnOnce(&mut ThreadDataInner) -> R) -> R {
        f(&mut self.inner.lock())
    }

    pub(crate) fn wake_pipe(&self) -> &WakePipe {
        &self.wake_pipe
    }

    pub(crate) fn stats(&self) -> &LoopStats {
        &self.stats
    }
}

impl fmt::Debug for ThreadData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("ThreadData")
            .field("thread", &self.thread)
            .field("pid", &self.pid)
            .field("wake_read_fd", &self.wake_pipe.read_fd())
            .field("timers", &inner.timers.len())
            .field("notifiers", &inner.notifiers.len())
            .finish()
    }
}
