//! Linux `epoll` backend.
//!
//! Level-triggered: a watcher that leaves data unread is reported again
//! on the next wait. The wake-up `eventfd` is registered once under a
//! reserved token and drained whenever it fires.

use super::common::{Interest, Waker, cvt, drain_fd, timeout_ms};
use crate::reactor::event::Event;

use libc::{
    EFD_CLOEXEC, EFD_NONBLOCK, EPOLL_CLOEXEC, EPOLL_CTL_ADD, EPOLL_CTL_DEL, EPOLLERR, EPOLLHUP,
    EPOLLIN, EPOLLOUT, epoll_event,
};
use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::sync::Arc;
use std::time::Duration;

/// Token of the wake-up eventfd. Slab indices never get this high.
const WAKE_TOKEN: u64 = u64::MAX;

/// Maximum number of events collected per wait.
const BATCH: usize = 64;

pub(crate) struct EpollPoller {
    epoll: OwnedFd,
    buffer: Vec<epoll_event>,
    waker: Arc<Waker>,
}

impl EpollPoller {
    /// Creates the epoll instance and its wake-up eventfd.
    ///
    /// Both descriptors are owned from the moment they exist, so a
    /// failure halfway leaks nothing.
    pub(crate) fn new() -> io::Result<Self> {
        let epoll = cvt(unsafe { libc::epoll_create1(EPOLL_CLOEXEC) })?;
        let epoll = unsafe { OwnedFd::from_raw_fd(epoll) };

        let eventfd = cvt(unsafe { libc::eventfd(0, EFD_NONBLOCK | EFD_CLOEXEC) })?;
        let waker = Arc::new(Waker(eventfd));

        let poller = Self {
            epoll,
            buffer: Vec::with_capacity(BATCH),
            waker,
        };

        poller.ctl(EPOLL_CTL_ADD, eventfd, EPOLLIN as u32, WAKE_TOKEN)?;
        Ok(poller)
    }

    pub(crate) fn waker(&self) -> Arc<Waker> {
        self.waker.clone()
    }

    pub(crate) fn register(&mut self, fd: RawFd, token: usize, interest: Interest) -> io::Result<()> {
        let mut flags = 0;
        if interest.read {
            flags |= EPOLLIN;
        }
        if interest.write {
            flags |= EPOLLOUT;
        }

        self.ctl(EPOLL_CTL_ADD, fd, flags as u32, token as u64)
    }

    /// Errors are ignored: a descriptor closed before deregistration has
    /// already left the interest list.
    pub(crate) fn deregister(&mut self, fd: RawFd) {
        let _ = self.ctl(EPOLL_CTL_DEL, fd, 0, 0);
    }

    /// Waits for readiness, at most `timeout` (forever when `None`).
    ///
    /// A wait cut short by a signal returns `Ok` with no events; the
    /// caller decides whether the signal means anything. Errors and
    /// hang-ups are reported as both readable and writable so whichever
    /// side the watcher is waiting on notices them.
    pub(crate) fn poll(&mut self, events: &mut Vec<Event>, timeout: Option<Duration>) -> io::Result<()> {
        events.clear();
        self.buffer.clear();

        let n = unsafe {
            libc::epoll_wait(
                self.epoll.as_raw_fd(),
                self.buffer.as_mut_ptr(),
                BATCH as i32,
                timeout_ms(timeout),
            )
        };

        let n = match cvt(n) {
            Ok(n) => n as usize,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => return Ok(()),
            Err(err) => return Err(err),
        };

        // epoll_wait initialised the first `n` entries.
        unsafe { self.buffer.set_len(n) };

        for ev in &self.buffer {
            let (flags, token) = (ev.events, ev.u64);

            if token == WAKE_TOKEN {
                drain_fd(self.waker.0);
                continue;
            }

            let failed = flags & (EPOLLERR | EPOLLHUP) as u32 != 0;

            events.push(Event {
                token: token as usize,
                readable: failed || flags & EPOLLIN as u32 != 0,
                writable: failed || flags & EPOLLOUT as u32 != 0,
            });
        }

        Ok(())
    }

    fn ctl(&self, op: libc::c_int, fd: RawFd, flags: u32, token: u64) -> io::Result<()> {
        let mut event = epoll_event {
            events: flags,
            u64: token,
        };

        cvt(unsafe { libc::epoll_ctl(self.epoll.as_raw_fd(), op, fd, &mut event) }).map(|_| ())
    }
}
