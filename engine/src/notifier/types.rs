/*!
 * Notifier Types
 * Readiness interest flags and activation payloads
 */

use crate::core::types::Fd;
use bitflags::bitflags;

bitflags! {
    /// Readiness conditions a notifier can declare interest in.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct NotificationType: u8 {
        const READ = 0b0001;
        const WRITE = 0b0010;
        const HANG_UP = 0b0100;
        const ERROR = 0b1000;
    }
}

impl NotificationType {
    /// The poll request mask for this interest. Only read and write are
    /// requested; hangup and error are always reported by poll.
    #[inline]
    pub(crate) fn poll_events(self) -> libc::c_short {
        let mut events = 0;
        if self.contains(NotificationType::READ) {
            events |= libc::POLLIN;
        }
        if self.contains(NotificationType::WRITE) {
            events |= libc::POLLOUT;
        }
        events
    }

    /// Translate raw poll readiness bits. A hangup implies readability so a
    /// read-interested notifier observes the EOF.
    #[inline]
    pub(crate) fn from_revents(revents: libc::c_short) -> Self {
        let mut kind = NotificationType::empty();
        if revents & libc::POLLIN != 0 {
            kind |= NotificationType::READ;
        }
        if revents & libc::POLLOUT != 0 {
            kind |= NotificationType::WRITE;
        }
        if revents & libc::POLLHUP != 0 {
            kind |= NotificationType::READ | NotificationType::HANG_UP;
        }
        if revents & libc::POLLERR != 0 {
            kind |= NotificationType::ERROR;
        }
        kind
    }
}

/// Readiness observed on a watched fd, narrowed to the declared interest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotifierActivation {
    pub fd: Fd,
    pub kind: NotificationType,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poll_events_requests_read_and_write_only() {
        let all = NotificationType::all();
        assert_eq!(all.poll_events(), libc::POLLIN | libc::POLLOUT);
        assert_eq!(NotificationType::HANG_UP.poll_events(), 0);
    }

    #[test]
    fn test_from_revents_translation() {
        assert_eq!(
            NotificationType::from_revents(libc::POLLIN),
            NotificationType::READ
        );
        assert_eq!(
            NotificationType::from_revents(libc::POLLOUT),
            NotificationType::WRITE
        );
        assert_eq!(
            NotificationType::from_revents(libc::POLLHUP),
            NotificationType::READ | NotificationType::HANG_UP
        );
        assert_eq!(
            NotificationType::from_revents(libc::POLLERR),
            NotificationType::ERROR
        );
    }

    #[test]
    fn test_interest_masking() {
        // A write-only notifier must not observe a read-side hangup.
        let observed = NotificationType::from_revents(libc::POLLHUP);
        assert_eq!(
            observed & NotificationType::WRITE,
            NotificationType::empty()
        );
        let observed = NotificationType::from_revents(libc::POLLIN | libc::POLLOUT);
        assert_eq!(observed & NotificationType::READ, NotificationType::READ);
    }
}
