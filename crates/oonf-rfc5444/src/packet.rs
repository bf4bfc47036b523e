use oonf_core::netaddr::NetAddr;
use oonf_core::serial::SerialU16;

/// One TLV (type, type-extension, value), attached either to a message or
/// to a single address within it (spec.md §4.3's metric and link-status
/// TLVs are address TLVs; the packet sequence number is a packet TLV
/// carried outside any message — see [`Packet::seqno`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tlv {
    pub tlv_type: u8,
    pub tlv_type_ext: u8,
    pub value: Vec<u8>,
}

impl Tlv {
    pub fn new(tlv_type: u8, value: Vec<u8>) -> Self {
        Self {
            tlv_type,
            tlv_type_ext: 0,
            value,
        }
    }

    pub fn with_ext(tlv_type: u8, tlv_type_ext: u8, value: Vec<u8>) -> Self {
        Self {
            tlv_type,
            tlv_type_ext,
            value,
        }
    }

    pub fn find<'a>(tlvs: &'a [Tlv], tlv_type: u8) -> Option<&'a Tlv> {
        tlvs.iter().find(|t| t.tlv_type == tlv_type)
    }
}

/// One address carried by a message (an interface address in a HELLO, an
/// advertised neighbor or attached-network prefix in a TC message) plus the
/// TLVs attached to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddrEntry {
    pub addr: NetAddr,
    pub tlvs: Vec<Tlv>,
}

impl AddrEntry {
    pub fn new(addr: NetAddr) -> Self {
        Self {
            addr,
            tlvs: Vec::new(),
        }
    }

    pub fn with_tlv(mut self, tlv: Tlv) -> Self {
        self.tlvs.push(tlv);
        self
    }

    pub fn tlv(&self, tlv_type: u8) -> Option<&Tlv> {
        Tlv::find(&self.tlvs, tlv_type)
    }
}

/// An RFC5444 message: one HELLO or one TC, this daemon's only two message
/// types. `msg_type` demultiplexes which.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub msg_type: u8,
    pub originator: Option<NetAddr>,
    pub hop_limit: u8,
    pub hop_count: u8,
    pub seqno: Option<SerialU16>,
    pub msg_tlvs: Vec<Tlv>,
    pub addrs: Vec<AddrEntry>,
}

impl Message {
    pub fn new(msg_type: u8) -> Self {
        Self {
            msg_type,
            originator: None,
            hop_limit: 0,
            hop_count: 0,
            seqno: None,
            msg_tlvs: Vec::new(),
            addrs: Vec::new(),
        }
    }

    /// True if this message may still propagate one more hop.
    pub fn forwardable(&self) -> bool {
        self.hop_limit > 1 && self.hop_count < self.hop_limit
    }

    pub fn msg_tlv(&self, tlv_type: u8) -> Option<&Tlv> {
        Tlv::find(&self.msg_tlvs, tlv_type)
    }
}

/// A packet as delivered by / handed to `oonf-socket`: zero or more
/// messages plus an optional packet sequence number (spec.md §4.3, §4.9
/// testable property 6).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Packet {
    pub seqno: Option<SerialU16>,
    pub messages: Vec<Message>,
}

impl Packet {
    pub fn new() -> Self {
        Self::default()
    }
}
