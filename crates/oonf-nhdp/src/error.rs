use oonf_core::error::{ErrorKind, HasErrorKind};

#[derive(Debug, thiserror::Error)]
pub enum NhdpError {
    #[error("no such NHDP interface: {0}")]
    NoSuchInterface(String),
    #[error("malformed HELLO: {0}")]
    MalformedHello(String),
    #[error("rfc5444 error: {0}")]
    Rfc5444(#[from] oonf_rfc5444::Rfc5444Error),
}

impl HasErrorKind for NhdpError {
    fn kind(&self) -> ErrorKind {
        match self {
            NhdpError::NoSuchInterface(_) => ErrorKind::ConfigReject,
            NhdpError::MalformedHello(_) => ErrorKind::ParseReject,
            NhdpError::Rfc5444(e) => e.kind(),
        }
    }
}
