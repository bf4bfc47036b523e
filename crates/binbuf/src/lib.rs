//! Minimal big-endian byte buffer primitives shared by every wire-facing
//! crate in the workspace: [`ReadBuffer`]/[`Readable`] for parsing and
//! [`WriteBuffer`]/[`Writeable`] for serializing. The RFC5444 packet/message
//! codec is layered on top of these (see `oonf-rfc5444`); this crate knows
//! nothing about RFC5444 itself.

mod error;
mod read;
mod write;

pub use error::BufferError;
pub use read::{ReadBuffer, ReadableMulti, Readable, ToReadBuffer};
pub use write::{ToWriteBuffer, WriteBuffer, Writeable};

pub mod prelude {
    pub use crate::{
        BufferError, ReadBuffer, Readable, ReadableMulti, ToReadBuffer, ToWriteBuffer, WriteBuffer,
        Writeable,
    };
}
