use oonf_core::error::{ErrorKind, HasErrorKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Layer2Error {
    #[error("no such network interface {0:?}")]
    NoSuchNet(String),
    #[error("no such neighbor {mac} on {ifname:?}")]
    NoSuchNeigh { ifname: String, mac: String },
    #[error("origin {0:?} already removed or unknown")]
    UnknownOrigin(String),
}

impl HasErrorKind for Layer2Error {
    fn kind(&self) -> ErrorKind {
        match self {
            Layer2Error::NoSuchNet(_) => ErrorKind::PolicyReject,
            Layer2Error::NoSuchNeigh { .. } => ErrorKind::PolicyReject,
            Layer2Error::UnknownOrigin(_) => ErrorKind::PolicyReject,
        }
    }
}
