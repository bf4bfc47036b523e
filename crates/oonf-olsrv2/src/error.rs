use oonf_core::error::{ErrorKind, HasErrorKind};

#[derive(Debug, thiserror::Error)]
pub enum Olsrv2Error {
    #[error("malformed TC message: {0}")]
    MalformedTc(String),
    #[error("rfc5444 error: {0}")]
    Rfc5444(#[from] oonf_rfc5444::Rfc5444Error),
}

impl HasErrorKind for Olsrv2Error {
    fn kind(&self) -> ErrorKind {
        match self {
            Olsrv2Error::MalformedTc(_) => ErrorKind::ParseReject,
            Olsrv2Error::Rfc5444(e) => e.kind(),
        }
    }
}
