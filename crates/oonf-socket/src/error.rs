use oonf_core::error::{ErrorKind, HasErrorKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SocketError {
    #[error("no socket open for {0:?}")]
    NotOpen(String),
    #[error("interface {0:?} has no acceptable bind address")]
    NoBindAddress(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl HasErrorKind for SocketError {
    fn kind(&self) -> ErrorKind {
        match self {
            SocketError::NotOpen(_) | SocketError::NoBindAddress(_) => ErrorKind::ConfigReject,
            SocketError::Io(e) => classify_io(e),
        }
    }
}

fn classify_io(e: &std::io::Error) -> ErrorKind {
    match e.raw_os_error() {
        Some(libc_eagain) if libc_eagain == 11 || libc_eagain == 4 => ErrorKind::TransientIo, // EAGAIN, EINTR
        Some(9) => ErrorKind::FatalIo,               // EBADF
        Some(1) => ErrorKind::PermissionRateLimited,  // EPERM
        _ => match e.kind() {
            std::io::ErrorKind::WouldBlock | std::io::ErrorKind::Interrupted => ErrorKind::TransientIo,
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionRateLimited,
            _ => ErrorKind::FatalIo,
        },
    }
}
