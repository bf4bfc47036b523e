//! RFC5444 packet framing, message aggregation and forwarding (spec.md
//! §4.3). The byte-level TLV codec is an external-collaborator interface
//! (see [`codec::Rfc5444Reader`]/[`codec::Rfc5444Writer`]); everything else
//! here is this daemon's own core logic.

pub mod codec;
pub mod error;
pub mod fabric;
pub mod metric;
pub mod packet;

pub use codec::{BinbufCodec, Rfc5444Reader, Rfc5444Writer};
pub use error::Rfc5444Error;
pub use fabric::{DuplicateSet, ForwardingPolicy, Rfc5444Fabric, TargetId, TlvBlockConsumer};
pub use metric::{decode_metric, encode_metric, RFC7181_METRIC_INFINITE, RFC7181_METRIC_MAX, RFC7181_METRIC_MIN};
pub use packet::{AddrEntry, Message, Packet, Tlv};
