/*!
 * Event Types
 * Payloads delivered through the per-thread event queue
 */

use crate::notifier::NotifierActivation;
use std::any::Any;
use std::fmt;

/// An event posted to a receiver.
pub enum Event {
    /// A timer registered for the receiver expired.
    Timer,
    /// A watched fd reported readiness matching the notifier's interest.
    NotifierActivation(NotifierActivation),
    /// Arbitrary caller-defined payload.
    User(Box<dyn Any + Send>),
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Timer => f.write_str("Timer"),
            Event::NotifierActivation(activation) => {
                f.debug_tuple("NotifierActivation").field(activation).finish()
            }
            Event::User(_) => f.write_str("User(..)"),
        }
    }
}
