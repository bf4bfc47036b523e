//! Error *kinds*, not types (spec.md §7): every fallible subsystem defines
//! its own `thiserror` enum, but each variant is tagged with one of these
//! kinds so cross-cutting policy (retry, suppress, revert, log-and-drop)
//! can be implemented once against the kind rather than per call site.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// EAGAIN/EINTR on a socket: retry via the event loop, no log noise.
    TransientIo,
    /// EBADF: tear down and recreate the offending socket.
    FatalIo,
    /// EPERM on send: warn, with per-target rate-limited suppression.
    PermissionRateLimited,
    /// RFC5444 malformed message: drop, count, continue.
    ParseReject,
    /// ACL/authentication failure: drop silently (debug-log only).
    PolicyReject,
    /// Route table operation not possible: revert the optimistic state.
    RouteOpError,
    /// Invalid configuration: section marked inactive, prior state kept.
    ConfigReject,
}

pub trait HasErrorKind {
    fn kind(&self) -> ErrorKind;
}
