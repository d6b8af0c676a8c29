//! Thin wrappers over the socket system calls used by the connector.

use libc::{
    AF_INET, AF_INET6, F_GETFL, F_SETFL, FD_CLOEXEC, F_SETFD, O_NONBLOCK, SO_ERROR, SOCK_STREAM,
    SOL_SOCKET, c_int, connect, fcntl, getsockopt, sockaddr, sockaddr_in, sockaddr_in6,
    sockaddr_storage, socket, socklen_t,
};
use std::net::SocketAddr;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::{io, mem};

use super::common::cvt;

/// Sets a file descriptor to non-blocking, close-on-exec mode.
pub(crate) fn sys_set_nonblocking(fd: RawFd) -> io::Result<()> {
    let flags = cvt(unsafe { fcntl(fd, F_GETFL) })?;
    cvt(unsafe { fcntl(fd, F_SETFL, flags | O_NONBLOCK) })?;
    cvt(unsafe { fcntl(fd, F_SETFD, FD_CLOEXEC) })?;

    Ok(())
}

/// Creates a non-blocking stream socket for the family of `addr`.
///
/// The descriptor is returned as an [`OwnedFd`] so that every early
/// return closes it.
pub(crate) fn sys_socket(addr: &SocketAddr) -> io::Result<OwnedFd> {
    let domain = match addr {
        SocketAddr::V4(_) => AF_INET,
        SocketAddr::V6(_) => AF_INET6,
    };

    let fd = cvt(unsafe { socket(domain, SOCK_STREAM, 0) })?;
    let fd = unsafe { OwnedFd::from_raw_fd(fd) };

    sys_set_nonblocking(fd.as_raw_fd())?;

    Ok(fd)
}

/// Initiates a non-blocking connection.
///
/// `Ok(true)` means the connection completed immediately, `Ok(false)`
/// that it is in progress and the socket must be watched for writability.
pub(crate) fn sys_connect(fd: RawFd, addr: &SocketAddr) -> io::Result<bool> {
    let (storage, len) = socketaddr_to_storage(addr);

    let rc = unsafe { connect(fd, &storage as *const _ as *const sockaddr, len) };
    if rc == 0 {
        return Ok(true);
    }

    let err = io::Error::last_os_error();
    match err.raw_os_error() {
        Some(libc::EINPROGRESS) | Some(libc::EINTR) => Ok(false),
        _ => Err(err),
    }
}

/// Retrieves the pending socket error via `SO_ERROR`.
///
/// Returns `Ok(())` if no error is pending, or the error otherwise.
pub(crate) fn sys_get_socket_error(fd: RawFd) -> io::Result<()> {
    let mut err: c_int = 0;
    let mut len = mem::size_of::<c_int>() as socklen_t;

    cvt(unsafe {
        getsockopt(
            fd,
            SOL_SOCKET,
            SO_ERROR,
            &mut err as *mut c_int as *mut libc::c_void,
            &mut len,
        )
    })?;

    if err != 0 {
        Err(io::Error::from_raw_os_error(err))
    } else {
        Ok(())
    }
}

/// Converts a `SocketAddr` to a `sockaddr_storage`.
pub(crate) fn socketaddr_to_storage(addr: &SocketAddr) -> (sockaddr_storage, socklen_t) {
    let mut storage: sockaddr_storage = unsafe { mem::zeroed() };

    match addr {
        SocketAddr::V4(v4) => {
            let sa = unsafe { &mut *(&mut storage as *mut _ as *mut sockaddr_in) };
            sa.sin_family = AF_INET as _;
            sa.sin_port = v4.port().to_be();
            sa.sin_addr.s_addr = u32::from(*v4.ip()).to_be();

            (storage, mem::size_of::<sockaddr_in>() as socklen_t)
        }

        SocketAddr::V6(v6) => {
            let sa = unsafe { &mut *(&mut storage as *mut _ as *mut sockaddr_in6) };
            sa.sin6_family = AF_INET6 as _;
            sa.sin6_port = v6.port().to_be();
            sa.sin6_addr.s6_addr = v6.ip().octets();
            sa.sin6_flowinfo = v6.flowinfo();
            sa.sin6_scope_id = v6.scope_id();

            (storage, mem::size_of::<sockaddr_in6>() as socklen_t)
        }
    }
}
