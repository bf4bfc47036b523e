#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BufferError {
    #[error("requested length exceeds the configured maximum")]
    MaxLengthOverflow,
    #[error("jump index is out of bounds")]
    InvalidJumpIndex,
    #[error("buffer does not contain enough bytes")]
    BufTooShort,
    #[error("buffer overflowed and is poisoned")]
    Overflow,
}
