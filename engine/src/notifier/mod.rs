/*!
 * Notifier Module
 * fd readiness interest registration and poll translation
 */

mod notifier;
mod registry;
mod types;

pub use notifier::Notifier;
pub use types::{NotificationType, NotifierActivation};

pub(crate) use registry::NotifierRegistry;
