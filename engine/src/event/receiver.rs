/*!
 * Event Receiver
 * Target surface for posted events
 */

use super::types::Event;

/// Anything that can be the target of posted events.
///
/// Receivers are held weakly by timers, notifiers, and the event queue: a
/// receiver that drops out from under a pending event causes the event to be
/// discarded silently.
pub trait EventReceiver: Send + Sync {
    /// Deliver one posted event. Runs on the receiver's owning thread during
    /// queue processing.
    fn handle_event(&self, event: Event);

    /// Visibility predicate consulted before delivering timer events.
    ///
    /// A hidden receiver only gets timer events whose fire policy allows
    /// delivery while invisible. Defaults to visible.
    fn is_visible_for_timers(&self) -> bool {
        true
    }
}
