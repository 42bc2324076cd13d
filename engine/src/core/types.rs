/*!
 * Core Types
 * Common types used across the engine
 */

/// Raw file descriptor as it appears in the poll vector
pub type Fd = std::os::unix::io::RawFd;

/// POSIX signal number (always non-zero for real signals)
pub type SignalNumber = i32;

/// Process-wide signal handler registration id (never zero)
pub type HandlerId = u64;
