//! `poll(2)` backend for Unix targets without `epoll`.
//!
//! Keeps its own `fd → (token, interest)` table and rebuilds the `pollfd`
//! array from it on every wait. Wake-ups go through a non-blocking
//! self-pipe whose read end always sits first in the array.

use super::common::{Interest, Waker, cvt, drain_fd, timeout_ms};
use super::unix::sys_set_nonblocking;
use crate::reactor::event::Event;

use libc::{POLLERR, POLLHUP, POLLIN, POLLOUT, pollfd};
use std::collections::HashMap;
use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::sync::Arc;
use std::time::Duration;

pub(crate) struct PollPoller {
    registered: HashMap<RawFd, (usize, Interest)>,
    wake_recv: OwnedFd,
    waker: Arc<Waker>,
    fds: Vec<pollfd>,
}

impl PollPoller {
    pub(crate) fn new() -> io::Result<Self> {
        let mut pipe = [0 as RawFd; 2];
        cvt(unsafe { libc::pipe(pipe.as_mut_ptr()) })?;

        let wake_recv = unsafe { OwnedFd::from_raw_fd(pipe[0]) };
        let waker = Arc::new(Waker(pipe[1]));

        sys_set_nonblocking(wake_recv.as_raw_fd())?;
        sys_set_nonblocking(waker.0)?;

        Ok(Self {
            registered: HashMap::new(),
            wake_recv,
            waker,
            fds: Vec::with_capacity(64),
        })
    }

    pub(crate) fn waker(&self) -> Arc<Waker> {
        self.waker.clone()
    }

    /// Fails with `AlreadyExists` if `fd` is already watched, like
    /// `EPOLL_CTL_ADD` does.
    pub(crate) fn register(&mut self, fd: RawFd, token: usize, interest: Interest) -> io::Result<()> {
        if self.registered.contains_key(&fd) {
            return Err(io::ErrorKind::AlreadyExists.into());
        }

        self.registered.insert(fd, (token, interest));
        Ok(())
    }

    pub(crate) fn deregister(&mut self, fd: RawFd) {
        self.registered.remove(&fd);
    }

    /// Waits for readiness, at most `timeout` (forever when `None`).
    ///
    /// Same contract as the `epoll` backend: `EINTR` is not an error, and
    /// errors or hang-ups show up on both sides.
    pub(crate) fn poll(&mut self, events: &mut Vec<Event>, timeout: Option<Duration>) -> io::Result<()> {
        events.clear();
        self.fds.clear();

        let wake_recv = self.wake_recv.as_raw_fd();
        self.fds.push(pollfd {
            fd: wake_recv,
            events: POLLIN,
            revents: 0,
        });

        self.fds
            .extend(self.registered.iter().map(|(&fd, &(_, interest))| pollfd {
                fd,
                events: (if interest.read { POLLIN } else { 0 })
                    | (if interest.write { POLLOUT } else { 0 }),
                revents: 0,
            }));

        let rc = unsafe {
            libc::poll(
                self.fds.as_mut_ptr(),
                self.fds.len() as libc::nfds_t,
                timeout_ms(timeout),
            )
        };

        match cvt(rc) {
            Ok(_) => {}
            Err(err) if err.kind() == io::ErrorKind::Interrupted => return Ok(()),
            Err(err) => return Err(err),
        }

        if self.fds[0].revents != 0 {
            drain_fd(wake_recv);
        }

        for pfd in &self.fds[1..] {
            if pfd.revents == 0 {
                continue;
            }

            let Some(&(token, _)) = self.registered.get(&pfd.fd) else {
                continue;
            };

            let failed = pfd.revents & (POLLERR | POLLHUP) != 0;

            events.push(Event {
                token,
                readable: failed || pfd.revents & POLLIN != 0,
                writable: failed || pfd.revents & POLLOUT != 0,
            });
        }

        Ok(())
    }
}
