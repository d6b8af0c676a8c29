use std::io;
use std::os::fd::RawFd;

/// Readiness a watcher is interested in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Interest {
    pub read: bool,
    pub write: bool,
}

impl Interest {
    pub const READ: Interest = Interest {
        read: true,
        write: false,
    };

    pub const WRITE: Interest = Interest {
        read: false,
        write: true,
    };

    pub const BOTH: Interest = Interest {
        read: true,
        write: true,
    };
}

/// Readiness reported to a watcher callback.
///
/// Errors and hang-ups set both flags, masked by the watcher's interest,
/// so a watcher observes them through its next `read(2)` or `SO_ERROR`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Readiness {
    pub readable: bool,
    pub writable: bool,
}

/// Write end of the poller wake-up channel.
///
/// Owns the descriptor and closes it on drop. Writing to it is
/// async-signal-safe, which the SIGINT bridge relies on.
pub(crate) struct Waker(pub(crate) RawFd);

impl Waker {
    /// Wake the poller.
    ///
    /// Writes an 8-byte counter increment, which is what `eventfd`
    /// expects and which a pipe accepts just as well.
    pub(crate) fn wake(&self) {
        wake_fd(self.0);
    }
}

impl Drop for Waker {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.0);
        }
    }
}

/// Raw wake-up write, usable from a signal handler.
pub(crate) fn wake_fd(fd: RawFd) {
    let buf: u64 = 1;
    unsafe {
        libc::write(fd, &buf as *const u64 as *const libc::c_void, 8);
    }
}

/// Drains every pending wake-up from a non-blocking descriptor.
pub(crate) fn drain_fd(fd: RawFd) {
    let mut buf = [0u8; 64];
    loop {
        let n = unsafe { libc::read(fd, buf.as_mut_ptr() as *mut libc::c_void, buf.len()) };
        if n <= 0 {
            break;
        }
    }
}

/// Converts a poll timeout to milliseconds, rounding up so that a timer
/// due in less than a millisecond does not cause a busy spin.
pub(crate) fn timeout_ms(timeout: Option<std::time::Duration>) -> i32 {
    match timeout {
        None => -1,
        Some(t) => {
            let ms = t.as_nanos().div_ceil(1_000_000);
            ms.min(i32::MAX as u128) as i32
        }
    }
}

/// Maps the return value of a libc call to `io::Result`.
pub(crate) fn cvt(rc: libc::c_int) -> io::Result<libc::c_int> {
    if rc < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(rc)
    }
}
