/*!
 * Signal Module
 * Process-wide signal routing through the per-thread wake pipe
 */

mod handlers;
mod router;

pub use handlers::SignalCallback;

pub(crate) use router::SignalRouter;
