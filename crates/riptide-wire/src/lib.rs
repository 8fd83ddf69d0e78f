#![warn(missing_docs)]

//! riptide-wire: wire formats for the link and internet layers.
//!
//! Each format offers `parse` for received bytes and `encode_into` for
//! transmission. Parsing validates the fields a correct peer would never
//! send wrong; callers drop the input on error.

/// ARP message format (RFC 826, Ethernet/IPv4 flavor).
pub mod arp;
/// Internet checksum (RFC 1071).
pub mod checksum;
/// Ethernet (DIX) framing.
pub mod ethernet;
/// IPv4 header and datagram (RFC 791).
pub mod ipv4;

pub use arp::{ArpMessage, OPCODE_REPLY, OPCODE_REQUEST};
pub use ethernet::{
    EthernetAddress, EthernetFrame, EthernetHeader, ETHERNET_BROADCAST, ETHERTYPE_ARP,
    ETHERTYPE_IPV4,
};
pub use ipv4::{InternetDatagram, Ipv4Header};
