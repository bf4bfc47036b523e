use oonf_core::error::{ErrorKind, HasErrorKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Rfc5444Error {
    #[error("malformed packet: {0}")]
    Malformed(#[from] binbuf::BufferError),
    #[error("unknown address family tag {0}")]
    UnknownFamily(u8),
    #[error("no reader registered for target {0:?}")]
    NoReader(String),
}

impl HasErrorKind for Rfc5444Error {
    fn kind(&self) -> ErrorKind {
        ErrorKind::ParseReject
    }
}
