use pnet::{
    packet::{
        arp::{ArpHardwareTypes, ArpOperations, MutableArpPacket},
        ethernet::{EtherTypes, MutableEthernetPacket},
    },
    util::MacAddr,
};
use std::net::Ipv4Addr;

use crate::constants::{
    ETH_HEADER_LEN, ETH_PACK_LEN, IP_V4_LEN, MAC_ADDR_LEN, TARGET_PROTO_OFFSET,
};
use crate::error::{Error, Result};

/// Broadcast "who-has" request frame reused for every probe of one interface.
///
/// Everything but the target protocol address is fixed at construction.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct RequestTemplate {
    buf: [u8; ETH_PACK_LEN],
}

impl RequestTemplate {
    /// Builds the template for an interface owning `sender_mac` and `sender_ip`.
    ///
    /// The target address starts out as `0.0.0.0`.
    pub fn new(sender_mac: MacAddr, sender_ip: Ipv4Addr) -> Result<Self> {
        let mut buf = [0; ETH_PACK_LEN];
        {
            let mut eth_packet = MutableEthernetPacket::new(&mut buf[..ETH_HEADER_LEN])
                .ok_or(Error::Opaque("failed to build Ethernet header".into()))?;
            eth_packet.set_destination(MacAddr::broadcast());
            eth_packet.set_source(sender_mac);
            eth_packet.set_ethertype(EtherTypes::Arp);
        }

        let mut arp_packet = MutableArpPacket::new(&mut buf[ETH_HEADER_LEN..])
            .ok_or(Error::Opaque("failed to build ARP request".into()))?;
        arp_packet.set_hardware_type(ArpHardwareTypes::Ethernet);
        arp_packet.set_protocol_type(EtherTypes::Ipv4);
        arp_packet.set_hw_addr_len(MAC_ADDR_LEN);
        arp_packet.set_proto_addr_len(IP_V4_LEN);
        arp_packet.set_operation(ArpOperations::Request);
        arp_packet.set_sender_hw_addr(sender_mac);
        arp_packet.set_sender_proto_addr(sender_ip);
        arp_packet.set_target_hw_addr(MacAddr::zero());
        arp_packet.set_target_proto_addr(Ipv4Addr::UNSPECIFIED);

        Ok(Self { buf })
    }

    pub fn set_target(&mut self, target_ip: Ipv4Addr) {
        self.buf[TARGET_PROTO_OFFSET..].copy_from_slice(&target_ip.octets());
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }
}
