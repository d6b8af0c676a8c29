//! SIGINT to loop-break bridge.
//!
//! Signal delivery is process-global, so at most one bridge may be armed
//! at a time across every reactor in the process. The handler only does
//! async-signal-safe work: it raises a pending flag and writes to the
//! owning reactor's wake-up descriptor. The reactor notices the flag on its
//! next iteration and returns from its loop.

#[cfg(unix)]
pub(crate) use unix::SignalBridge;

#[cfg(not(unix))]
pub(crate) use stub::SignalBridge;

#[cfg(unix)]
mod unix {
    use crate::error::{Error, Result};
    use crate::reactor::poller::{Waker, wake_fd};

    use libc::{SIGINT, c_int, sigaction, sigemptyset};
    use std::io;
    use std::mem;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

    /// Set while some bridge owns the SIGINT disposition.
    static ACTIVE: AtomicBool = AtomicBool::new(false);

    /// Raised by the handler, consumed by the reactor loop.
    static PENDING: AtomicBool = AtomicBool::new(false);

    /// Wake-up descriptor of the reactor owning the bridge, or -1.
    static WAKE_FD: AtomicI32 = AtomicI32::new(-1);

    extern "C" fn on_sigint(_signo: c_int) {
        PENDING.store(true, Ordering::SeqCst);

        let fd = WAKE_FD.load(Ordering::SeqCst);
        if fd >= 0 {
            wake_fd(fd);
        }
    }

    /// An armed SIGINT listener.
    ///
    /// Holds the previous disposition and restores it when disabled or
    /// dropped. Keeps the reactor's waker alive so that the descriptor the
    /// handler writes to cannot be closed underneath it.
    pub(crate) struct SignalBridge {
        previous: sigaction,
        waker: Option<Arc<Waker>>,
    }

    impl SignalBridge {
        pub(crate) fn enable(waker: Arc<Waker>) -> Result<Self> {
            if ACTIVE
                .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                .is_err()
            {
                return Err(Error::SignalRegistration(
                    "another reactor already handles SIGINT".to_owned(),
                ));
            }

            PENDING.store(false, Ordering::SeqCst);
            WAKE_FD.store(waker.0, Ordering::SeqCst);

            let mut action: sigaction = unsafe { mem::zeroed() };
            let mut previous: sigaction = unsafe { mem::zeroed() };

            action.sa_sigaction = on_sigint as extern "C" fn(c_int) as libc::sighandler_t;
            action.sa_flags = 0;

            let rc = unsafe {
                sigemptyset(&mut action.sa_mask);
                sigaction(SIGINT, &action, &mut previous)
            };

            if rc != 0 {
                let err = io::Error::last_os_error();
                WAKE_FD.store(-1, Ordering::SeqCst);
                ACTIVE.store(false, Ordering::SeqCst);
                return Err(Error::SignalRegistration(format!("cannot add SIGINT event: {err}")));
            }

            log::debug!("signal: SIGINT now breaks the loop");

            Ok(Self {
                previous,
                waker: Some(waker),
            })
        }

        pub(crate) fn disable(mut self) -> Result<()> {
            self.restore()
        }

        /// Consumes a SIGINT delivered since the last call.
        pub(crate) fn take_pending(&self) -> bool {
            PENDING.swap(false, Ordering::SeqCst)
        }

        fn restore(&mut self) -> Result<()> {
            if self.waker.is_none() {
                return Ok(());
            }

            let rc = unsafe { sigaction(SIGINT, &self.previous, std::ptr::null_mut()) };

            WAKE_FD.store(-1, Ordering::SeqCst);
            self.waker = None;
            ACTIVE.store(false, Ordering::SeqCst);

            if rc != 0 {
                let err = io::Error::last_os_error();
                return Err(Error::SignalRegistration(format!("cannot del SIGINT event: {err}")));
            }

            log::debug!("signal: SIGINT handler removed");
            Ok(())
        }
    }

    impl Drop for SignalBridge {
        fn drop(&mut self) {
            if let Err(err) = self.restore() {
                log::warn!("signal: {err}");
            }
        }
    }
}

#[cfg(not(unix))]
mod stub {
    use crate::error::Result;
    use crate::reactor::poller::Waker;

    use std::sync::Arc;

    /// No-op bridge for targets without process signals.
    pub(crate) struct SignalBridge;

    impl SignalBridge {
        pub(crate) fn enable(_waker: Arc<Waker>) -> Result<Self> {
            Ok(Self)
        }

        pub(crate) fn disable(self) -> Result<()> {
            Ok(())
        }

        pub(crate) fn take_pending(&self) -> bool {
            false
        }
    }
}
