//! The RFC5444 TLV byte codec is an external-collaborator interface
//! (`Rfc5444Reader`/`Rfc5444Writer`); this module supplies the one concrete
//! `binbuf`-based implementation this daemon needs for its own HELLO/TC
//! message set. It is not a general-purpose RFC5444 library: address and
//! TLV framing here is internally consistent, not bit-exact to the RFC's
//! head/tail-compression scheme, which only matters when interoperating
//! with an unrelated implementation.

use std::net::{Ipv4Addr, Ipv6Addr};

use binbuf::{ReadBuffer, Readable, ToReadBuffer, ToWriteBuffer, WriteBuffer, Writeable};
use ipnetwork::{Ipv4Network, Ipv6Network};
use oonf_core::netaddr::{Eui64, Mac48, NetAddr};
use oonf_core::serial::SerialU16;

use crate::error::Rfc5444Error;
use crate::packet::{AddrEntry, Message, Packet, Tlv};

const FAMILY_V4: u8 = 0;
const FAMILY_V6: u8 = 1;
const FAMILY_MAC48: u8 = 2;
const FAMILY_EUI64: u8 = 3;

const FLAG_HAS_ORIGINATOR: u8 = 0x01;
const FLAG_HAS_HOP_INFO: u8 = 0x02;
const FLAG_HAS_SEQNO: u8 = 0x04;

const PACKET_FLAG_HAS_SEQNO: u8 = 0x01;

/// Decodes a wire packet into the core's in-memory representation.
pub trait Rfc5444Reader {
    fn read_packet(&self, bytes: &[u8]) -> Result<Packet, Rfc5444Error>;
}

/// Encodes the core's in-memory representation back to wire bytes.
pub trait Rfc5444Writer {
    fn write_packet(&self, packet: &Packet) -> Result<Vec<u8>, Rfc5444Error>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct BinbufCodec;

impl Rfc5444Reader for BinbufCodec {
    fn read_packet(&self, bytes: &[u8]) -> Result<Packet, Rfc5444Error> {
        let mut buf = ReadBuffer::new(bytes);
        let flags = buf.pop()?;
        let seqno = if flags & PACKET_FLAG_HAS_SEQNO != 0 {
            Some(SerialU16::new(u16::read(&mut buf)?))
        } else {
            None
        };
        let num_messages = u16::read(&mut buf)?;
        let mut messages = Vec::with_capacity(num_messages as usize);
        for _ in 0..num_messages {
            let msg_len = u16::read(&mut buf)? as usize;
            let msg_bytes = buf.read_slice(msg_len)?;
            messages.push(read_message(msg_bytes)?);
        }
        Ok(Packet { seqno, messages })
    }
}

impl Rfc5444Writer for BinbufCodec {
    fn write_packet(&self, packet: &Packet) -> Result<Vec<u8>, Rfc5444Error> {
        let mut buf = WriteBuffer::new();
        let flags = if packet.seqno.is_some() {
            PACKET_FLAG_HAS_SEQNO
        } else {
            0
        };
        flags.write(&mut buf)?;
        if let Some(seqno) = packet.seqno {
            seqno.0.write(&mut buf)?;
        }
        (packet.messages.len() as u16).write(&mut buf)?;
        for msg in &packet.messages {
            let msg_bytes = write_message(msg)?;
            (msg_bytes.len() as u16).write(&mut buf)?;
            buf.write_slice(&msg_bytes)?;
        }
        if buf.is_poisoned() {
            return Err(Rfc5444Error::Malformed(binbuf::BufferError::Overflow));
        }
        Ok(buf.into_vec())
    }
}

fn read_message(bytes: &[u8]) -> Result<Message, Rfc5444Error> {
    let mut buf = ReadBuffer::new(bytes);
    let msg_type = u8::read(&mut buf)?;
    let flags = u8::read(&mut buf)?;

    let originator = if flags & FLAG_HAS_ORIGINATOR != 0 {
        Some(read_addr(&mut buf)?)
    } else {
        None
    };
    let (hop_limit, hop_count) = if flags & FLAG_HAS_HOP_INFO != 0 {
        (u8::read(&mut buf)?, u8::read(&mut buf)?)
    } else {
        (0, 0)
    };
    let seqno = if flags & FLAG_HAS_SEQNO != 0 {
        Some(SerialU16::new(u16::read(&mut buf)?))
    } else {
        None
    };

    let num_msg_tlvs = u16::read(&mut buf)?;
    let mut msg_tlvs = Vec::with_capacity(num_msg_tlvs as usize);
    for _ in 0..num_msg_tlvs {
        msg_tlvs.push(read_tlv(&mut buf)?);
    }

    let num_addrs = u16::read(&mut buf)?;
    let mut addrs = Vec::with_capacity(num_addrs as usize);
    for _ in 0..num_addrs {
        let addr = read_addr(&mut buf)?;
        let num_tlvs = u16::read(&mut buf)?;
        let mut tlvs = Vec::with_capacity(num_tlvs as usize);
        for _ in 0..num_tlvs {
            tlvs.push(read_tlv(&mut buf)?);
        }
        addrs.push(AddrEntry { addr, tlvs });
    }

    Ok(Message {
        msg_type,
        originator,
        hop_limit,
        hop_count,
        seqno,
        msg_tlvs,
        addrs,
    })
}

fn write_message(msg: &Message) -> Result<Vec<u8>, Rfc5444Error> {
    let mut buf = WriteBuffer::new();
    msg.msg_type.write(&mut buf)?;

    let mut flags = 0u8;
    if msg.originator.is_some() {
        flags |= FLAG_HAS_ORIGINATOR;
    }
    if msg.hop_limit != 0 {
        flags |= FLAG_HAS_HOP_INFO;
    }
    if msg.seqno.is_some() {
        flags |= FLAG_HAS_SEQNO;
    }
    flags.write(&mut buf)?;

    if let Some(originator) = &msg.originator {
        write_addr(&mut buf, originator)?;
    }
    if flags & FLAG_HAS_HOP_INFO != 0 {
        msg.hop_limit.write(&mut buf)?;
        msg.hop_count.write(&mut buf)?;
    }
    if let Some(seqno) = msg.seqno {
        seqno.0.write(&mut buf)?;
    }

    (msg.msg_tlvs.len() as u16).write(&mut buf)?;
    for tlv in &msg.msg_tlvs {
        write_tlv(&mut buf, tlv)?;
    }

    (msg.addrs.len() as u16).write(&mut buf)?;
    for entry in &msg.addrs {
        write_addr(&mut buf, &entry.addr)?;
        (entry.tlvs.len() as u16).write(&mut buf)?;
        for tlv in &entry.tlvs {
            write_tlv(&mut buf, tlv)?;
        }
    }

    if buf.is_poisoned() {
        return Err(Rfc5444Error::Malformed(binbuf::BufferError::Overflow));
    }
    Ok(buf.into_vec())
}

fn read_tlv(buf: &mut ReadBuffer) -> Result<Tlv, Rfc5444Error> {
    let tlv_type = u8::read(buf)?;
    let tlv_type_ext = u8::read(buf)?;
    let len = u16::read(buf)? as usize;
    let value = buf.read_vec(len)?;
    Ok(Tlv {
        tlv_type,
        tlv_type_ext,
        value,
    })
}

fn write_tlv(buf: &mut WriteBuffer, tlv: &Tlv) -> Result<(), Rfc5444Error> {
    tlv.tlv_type.write(buf)?;
    tlv.tlv_type_ext.write(buf)?;
    (tlv.value.len() as u16).write(buf)?;
    buf.write_slice(&tlv.value)?;
    Ok(())
}

fn read_addr(buf: &mut ReadBuffer) -> Result<NetAddr, Rfc5444Error> {
    let family = u8::read(buf)?;
    let prefix_len = u8::read(buf)?;
    match family {
        FAMILY_V4 => {
            let bytes = buf.read_slice(4)?;
            let ip = Ipv4Addr::new(bytes[0], bytes[1], bytes[2], bytes[3]);
            Ok(NetAddr::V4(
                Ipv4Network::new(ip, prefix_len).map_err(|_| Rfc5444Error::UnknownFamily(family))?,
            ))
        }
        FAMILY_V6 => {
            let bytes = buf.read_slice(16)?;
            let arr: [u8; 16] = bytes.try_into().expect("read_slice(16) yields 16 bytes");
            let ip = Ipv6Addr::from(arr);
            Ok(NetAddr::V6(
                Ipv6Network::new(ip, prefix_len).map_err(|_| Rfc5444Error::UnknownFamily(family))?,
            ))
        }
        FAMILY_MAC48 => {
            let bytes = buf.read_slice(6)?;
            let arr: [u8; 6] = bytes.try_into().expect("read_slice(6) yields 6 bytes");
            Ok(NetAddr::Mac48(Mac48(arr)))
        }
        FAMILY_EUI64 => {
            let bytes = buf.read_slice(8)?;
            let arr: [u8; 8] = bytes.try_into().expect("read_slice(8) yields 8 bytes");
            Ok(NetAddr::Eui64(Eui64(arr)))
        }
        other => Err(Rfc5444Error::UnknownFamily(other)),
    }
}

fn write_addr(buf: &mut WriteBuffer, addr: &NetAddr) -> Result<(), Rfc5444Error> {
    match addr {
        NetAddr::V4(n) => {
            FAMILY_V4.write(buf)?;
            n.prefix().write(buf)?;
            buf.write_slice(&n.ip().octets())?;
        }
        NetAddr::V6(n) => {
            FAMILY_V6.write(buf)?;
            n.prefix().write(buf)?;
            buf.write_slice(&n.ip().octets())?;
        }
        NetAddr::Mac48(m) => {
            FAMILY_MAC48.write(buf)?;
            48u8.write(buf)?;
            buf.write_slice(&m.0)?;
        }
        NetAddr::Eui64(e) => {
            FAMILY_EUI64.write(buf)?;
            64u8.write(buf)?;
            buf.write_slice(&e.0)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use oonf_core::netaddr::NetAddr;

    #[test]
    fn round_trips_a_hello_like_message() {
        let mut msg = Message::new(1);
        msg.originator = Some(NetAddr::host_v4(Ipv4Addr::new(10, 0, 0, 1)));
        msg.hop_limit = 1;
        msg.msg_tlvs.push(Tlv::new(7, vec![1, 2, 3]));
        msg.addrs.push(
            AddrEntry::new(NetAddr::host_v4(Ipv4Addr::new(10, 0, 0, 2)))
                .with_tlv(Tlv::with_ext(2, 1, vec![0x12])),
        );

        let packet = Packet {
            seqno: Some(SerialU16::new(42)),
            messages: vec![msg.clone()],
        };

        let codec = BinbufCodec;
        let bytes = codec.write_packet(&packet).unwrap();
        let decoded = codec.read_packet(&bytes).unwrap();
        assert_eq!(decoded, packet);
        assert_eq!(decoded.messages[0], msg);
    }

    #[test]
    fn truncated_packet_is_a_parse_reject() {
        let codec = BinbufCodec;
        assert!(codec.read_packet(&[0, 0]).is_err());
    }
}
