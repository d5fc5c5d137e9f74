use std::net::Ipv4Addr;

use pnet::packet::arp::{ArpHardwareTypes, ArpOperation, ArpOperations, ArpPacket};
use pnet::packet::ethernet::{EtherTypes, EthernetPacket};
use pnet::packet::Packet;
use pnet::util::MacAddr;
use thiserror::Error as ThisError;

use crate::constants::{ARP_FIXED_HEADER_LEN, ARP_PACK_LEN, IP_V4_LEN, MAC_ADDR_LEN};

/// Address pair offered by a host answering one of our requests.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct ArpReply {
    pub sender_ip: Ipv4Addr,
    pub sender_mac: MacAddr,
}

/// Reason a captured frame was not accepted as an ARP reply.
#[derive(ThisError, Copy, Clone, Eq, PartialEq, Debug)]
pub enum Rejection {
    #[error("not an ARP frame")]
    NotArp,
    #[error("ARP operation {0} is not a reply")]
    NotReply(u16),
    #[error("truncated ARP packet ({0} bytes)")]
    Truncated(usize),
    #[error("hardware type {0:#06x} is not Ethernet")]
    HardwareType(u16),
    #[error("protocol type {0:#06x} is not IPv4")]
    ProtocolType(u16),
    #[error("hardware address length {0} is not 6")]
    HardwareLen(u8),
    #[error("protocol address length {0} is not 4")]
    ProtocolLen(u8),
}

impl Rejection {
    /// Traffic that is expected on any shared segment and not worth reporting.
    pub fn is_background(&self) -> bool {
        matches!(self, Rejection::NotArp | Rejection::NotReply(_))
    }
}

/// Parses a raw Ethernet frame, accepting only well-formed ARP replies.
pub fn parse_arp_reply(frame: &[u8]) -> Result<ArpReply, Rejection> {
    let ethernet_packet = EthernetPacket::new(frame).ok_or(Rejection::NotArp)?;
    if ethernet_packet.get_ethertype() != EtherTypes::Arp {
        return Err(Rejection::NotArp);
    }
    parse_arp_payload(ethernet_packet.payload())
}

/// Validates an ARP packet (without its Ethernet header) as a reply.
pub fn parse_arp_payload(payload: &[u8]) -> Result<ArpReply, Rejection> {
    let operation = payload
        .get(6..ARP_FIXED_HEADER_LEN)
        .map(|op| u16::from_be_bytes([op[0], op[1]]))
        .ok_or(Rejection::Truncated(payload.len()))?;
    if ArpOperation::new(operation) != ArpOperations::Reply {
        return Err(Rejection::NotReply(operation));
    }
    if payload.len() < ARP_PACK_LEN {
        return Err(Rejection::Truncated(payload.len()));
    }
    let arp_packet = ArpPacket::new(payload).ok_or(Rejection::Truncated(payload.len()))?;

    let hardware_type = arp_packet.get_hardware_type();
    if hardware_type != ArpHardwareTypes::Ethernet {
        return Err(Rejection::HardwareType(hardware_type.0));
    }
    let protocol_type = arp_packet.get_protocol_type();
    if protocol_type != EtherTypes::Ipv4 {
        return Err(Rejection::ProtocolType(protocol_type.0));
    }
    if arp_packet.get_hw_addr_len() != MAC_ADDR_LEN {
        return Err(Rejection::HardwareLen(arp_packet.get_hw_addr_len()));
    }
    if arp_packet.get_proto_addr_len() != IP_V4_LEN {
        return Err(Rejection::ProtocolLen(arp_packet.get_proto_addr_len()));
    }

    Ok(ArpReply {
        sender_ip: arp_packet.get_sender_proto_addr(),
        sender_mac: arp_packet.get_sender_hw_addr(),
    })
}
