//! Message and TLV type numbers for this daemon's own NHDP/OLSRv2 message
//! set (spec.md §4.3/§4.5/§4.8). These are configuration-visible in the
//! original but fixed constants here, matching spec.md §6's note that "the
//! concrete TLV extension numbers are configuration-visible and used to
//! demultiplex per-domain metric TLVs" — this daemon ships one built-in
//! domain extension.

pub const MSG_TYPE_HELLO: u8 = 1;
pub const MSG_TYPE_TC: u8 = 2;

pub const TLV_VALIDITY_TIME: u8 = 1;
pub const TLV_INTERVAL_TIME: u8 = 2;
pub const TLV_WILLINGNESS: u8 = 3;
pub const TLV_LINK_STATUS: u8 = 4;
pub const TLV_OTHER_NEIGHB: u8 = 5;
pub const TLV_LINK_METRIC: u8 = 6;
pub const TLV_ANSN: u8 = 7;
pub const TLV_GATEWAY: u8 = 8;
/// Carries a source-specific attachment's source prefix alongside its
/// destination address entry (spec.md §4.9's `(dst prefix, src prefix)`
/// endpoint); absent for an ordinary, non-source-specific attachment.
pub const TLV_SRC_PREFIX: u8 = 9;

/// Per-address link-status values carried by `TLV_LINK_STATUS`.
pub const LINK_STATUS_HEARD: u8 = 0;
pub const LINK_STATUS_SYMMETRIC: u8 = 1;
pub const LINK_STATUS_LOST: u8 = 2;

/// Per-address neighbor-status values carried by `TLV_OTHER_NEIGHB`.
pub const NEIGHB_STATUS_SYMMETRIC: u8 = 1;
pub const NEIGHB_STATUS_NOT_SYMMETRIC: u8 = 0;

/// `TLV_LINK_METRIC` value layout: one encoded metric byte plus a
/// direction/scope flag byte (spec.md §6's "two flag bits for direction
/// (incoming/outgoing) x scope (link/neighbor)").
pub const METRIC_FLAG_INCOMING: u8 = 0x01;
pub const METRIC_FLAG_OUTGOING: u8 = 0x02;
pub const METRIC_FLAG_NEIGHBOR_SCOPE: u8 = 0x04;

pub const DAT_RING_BUCKETS: usize = 32;
pub const WILLINGNESS_NEVER: u8 = 0;
pub const WILLINGNESS_DEFAULT: u8 = 7;
