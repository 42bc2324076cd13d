/*!
 * Wake Pipe
 * Per-thread self-pipe funneling signals and cross-thread wake requests
 */

use crate::core::errors::{EngineError, EngineResult};
use crate::core::types::Fd;
use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::unistd::pipe2;
use std::os::fd::{AsRawFd, OwnedFd};

/// Integer written for a plain wake request; signal numbers are always
/// non-zero, so zero is unambiguous on the stream.
pub(crate) const WAKE_TOKEN: i32 = 0;

/// How many integers one drain call reads at most. A full buffer tells the
/// loop to go around again before trusting the poll results.
pub(crate) const DRAIN_CAPACITY: usize = 8;

/// The self-pipe owned by one thread's event loop.
///
/// The read end sits in poll slot 0. Writers push native-endian 4-byte
/// integers: `0` for a wake request, a signal number otherwise.
pub(crate) struct WakePipe {
    read: OwnedFd,
    write: OwnedFd,
}

impl WakePipe {
    /// Both ends are close-on-exec: an exec'd child must not inherit another
    /// process's wake funnel.
    pub(crate) fn new() -> EngineResult<Self> {
        let (read, write) = pipe2(OFlag::O_CLOEXEC)
            .map_err(|e| EngineError::WakePipe(format!("pipe2 failed: {}", e)))?;
        Ok(Self { read, write })
    }

    pub(crate) fn read_fd(&self) -> Fd {
        self.read.as_raw_fd()
    }

    pub(crate) fn write_fd(&self) -> Fd {
        self.write.as_raw_fd()
    }

    /// Request a wakeup. Callable from any thread; a no-op wake (loop not
    /// sleeping) costs one byte quartet consumed next iteration.
    pub(crate) fn wake(&self) {
        let token = WAKE_TOKEN.to_ne_bytes();
        loop {
            let written = unsafe {
                libc::write(
                    self.write.as_raw_fd(),
                    token.as_ptr().cast(),
                    token.len(),
                )
            };
            if written >= 0 {
                return;
            }
            let errno = Errno::last();
            if errno == Errno::EINTR {
                continue;
            }
            panic!("wake pipe write failed: {}", errno);
        }
    }

    /// Read pending integers into `buffer`, returning how many arrived.
    ///
    /// Retries on interruption: a signal landing mid-read goes through the
    /// trampoline and will be picked up by this very drain or the next.
    pub(crate) fn drain(&self, buffer: &mut [i32; DRAIN_CAPACITY]) -> usize {
        let mut bytes = [0u8; DRAIN_CAPACITY * 4];
        let read = loop {
            let read = unsafe {
                libc::read(
                    self.read.as_raw_fd(),
                    bytes.as_mut_ptr().cast(),
                    bytes.len(),
                )
            };
            if read >= 0 {
                break read as usize;
            }
            let errno = Errno::last();
            if errno == Errno::EINTR {
                continue;
            }
            panic!("wake pipe read failed: {}", errno);
        };

        // Writers emit whole integers atomically, so the stream never splits
        // one across reads.
        let count = read / 4;
        for (slot, chunk) in buffer.iter_mut().zip(bytes[..read].chunks_exact(4)) {
            *slot = i32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        count
    }
}
