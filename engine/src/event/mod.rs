/*!
 * Event Module
 * Posted events, receivers, and the per-thread event queue
 */

mod queue;
mod receiver;
mod types;

pub use queue::ThreadEventQueue;
pub use receiver::EventReceiver;
pub use types::Event;
