/// An I/O event reported by the poller.
///
/// An `Event` carries readiness information for one registered file
/// descriptor. It is produced by the poller and consumed by the reactor,
/// which uses the token to find the watcher to call.
#[derive(Debug)]
pub(crate) struct Event {
    /// Slab index of the watcher registered for the descriptor.
    pub(crate) token: usize,

    /// The descriptor is readable, or reported an error or hang-up.
    pub(crate) readable: bool,

    /// The descriptor is writable.
    pub(crate) writable: bool,
}
