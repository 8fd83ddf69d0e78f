//! ARP message format.
//!
//! Only the Ethernet/IPv4 flavor is spoken: hardware type 1, protocol type
//! 0x0800, 6-byte hardware addresses, 4-byte protocol addresses. Anything
//! else fails to parse and the frame is dropped by the caller.

use std::io::{self, Cursor, Read, Write};
use std::net::Ipv4Addr;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use riptide_core::error::{DecodingErrorKind, ErrorKind, Result};

use crate::ethernet::EthernetAddress;

/// Opcode of an ARP request.
pub const OPCODE_REQUEST: u16 = 1;
/// Opcode of an ARP reply.
pub const OPCODE_REPLY: u16 = 2;

const HARDWARE_TYPE_ETHERNET: u16 = 1;
const PROTOCOL_TYPE_IPV4: u16 = 0x0800;
const HARDWARE_ADDRESS_LEN: u8 = 6;
const PROTOCOL_ADDRESS_LEN: u8 = 4;

/// Size of an Ethernet/IPv4 ARP message on the wire.
pub const ARP_MESSAGE_SIZE: usize = 28;

/// An ARP request or reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArpMessage {
    /// `OPCODE_REQUEST` or `OPCODE_REPLY`.
    pub opcode: u16,
    /// Hardware address of the party sending this message.
    pub sender_ethernet_address: EthernetAddress,
    /// Protocol address of the party sending this message.
    pub sender_ip_address: Ipv4Addr,
    /// Hardware address being asked about (zeroed in requests).
    pub target_ethernet_address: EthernetAddress,
    /// Protocol address being asked about.
    pub target_ip_address: Ipv4Addr,
}

impl ArpMessage {
    /// Builds a broadcast request asking who holds `target_ip_address`.
    pub fn request(
        sender_ethernet_address: EthernetAddress,
        sender_ip_address: Ipv4Addr,
        target_ip_address: Ipv4Addr,
    ) -> Self {
        Self {
            opcode: OPCODE_REQUEST,
            sender_ethernet_address,
            sender_ip_address,
            target_ethernet_address: EthernetAddress::default(),
            target_ip_address,
        }
    }

    /// Builds a reply advertising the sender's own mapping.
    pub fn reply(
        sender_ethernet_address: EthernetAddress,
        sender_ip_address: Ipv4Addr,
        target_ethernet_address: EthernetAddress,
        target_ip_address: Ipv4Addr,
    ) -> Self {
        Self {
            opcode: OPCODE_REPLY,
            sender_ethernet_address,
            sender_ip_address,
            target_ethernet_address,
            target_ip_address,
        }
    }

    /// Parses a message from received bytes.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(data);

        let hardware_type = cursor.read_u16::<BigEndian>()?;
        let protocol_type = cursor.read_u16::<BigEndian>()?;
        let hardware_len = cursor.read_u8()?;
        let protocol_len = cursor.read_u8()?;
        let opcode = cursor.read_u16::<BigEndian>()?;

        let mut sender_ethernet_address = EthernetAddress::default();
        cursor.read_exact(&mut sender_ethernet_address)?;
        let sender_ip_address = Ipv4Addr::from(cursor.read_u32::<BigEndian>()?);
        let mut target_ethernet_address = EthernetAddress::default();
        cursor.read_exact(&mut target_ethernet_address)?;
        let target_ip_address = Ipv4Addr::from(cursor.read_u32::<BigEndian>()?);

        if hardware_type != HARDWARE_TYPE_ETHERNET
            || protocol_type != PROTOCOL_TYPE_IPV4
            || hardware_len != HARDWARE_ADDRESS_LEN
            || protocol_len != PROTOCOL_ADDRESS_LEN
        {
            return Err(ErrorKind::DecodingError(DecodingErrorKind::ArpAddressFormat));
        }
        if opcode != OPCODE_REQUEST && opcode != OPCODE_REPLY {
            return Err(ErrorKind::DecodingError(DecodingErrorKind::ArpOperation));
        }

        Ok(Self {
            opcode,
            sender_ethernet_address,
            sender_ip_address,
            target_ethernet_address,
            target_ip_address,
        })
    }

    /// Encodes the message into `buffer` (appends bytes).
    pub fn encode_into(&self, buffer: &mut Vec<u8>) -> io::Result<()> {
        buffer.write_u16::<BigEndian>(HARDWARE_TYPE_ETHERNET)?;
        buffer.write_u16::<BigEndian>(PROTOCOL_TYPE_IPV4)?;
        buffer.write_u8(HARDWARE_ADDRESS_LEN)?;
        buffer.write_u8(PROTOCOL_ADDRESS_LEN)?;
        buffer.write_u16::<BigEndian>(self.opcode)?;
        buffer.write_all(&self.sender_ethernet_address)?;
        buffer.write_u32::<BigEndian>(u32::from(self.sender_ip_address))?;
        buffer.write_all(&self.target_ethernet_address)?;
        buffer.write_u32::<BigEndian>(u32::from(self.target_ip_address))?;
        Ok(())
    }

    /// Convenience wrapper returning the encoded message as a fresh buffer.
    pub fn encode(&self) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(ARP_MESSAGE_SIZE);
        self.encode_into(&mut buffer).expect("encoding into a Vec");
        buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_request() -> ArpMessage {
        ArpMessage::request(
            [0x02, 0x00, 0x00, 0x00, 0x00, 0x01],
            Ipv4Addr::new(10, 0, 0, 1),
            Ipv4Addr::new(10, 0, 0, 2),
        )
    }

    #[test]
    fn test_request_round_trip() {
        let msg = sample_request();
        let bytes = msg.encode();
        assert_eq!(bytes.len(), ARP_MESSAGE_SIZE);
        assert_eq!(ArpMessage::parse(&bytes).unwrap(), msg);
    }

    #[test]
    fn test_reply_round_trip() {
        let msg = ArpMessage::reply(
            [0x02, 0x00, 0x00, 0x00, 0x00, 0x02],
            Ipv4Addr::new(10, 0, 0, 2),
            [0x02, 0x00, 0x00, 0x00, 0x00, 0x01],
            Ipv4Addr::new(10, 0, 0, 1),
        );
        assert_eq!(ArpMessage::parse(&msg.encode()).unwrap(), msg);
    }

    #[test]
    fn test_bad_hardware_type_rejected() {
        let mut bytes = sample_request().encode();
        bytes[1] = 6;
        let err = ArpMessage::parse(&bytes).unwrap_err();
        assert!(matches!(
            err,
            ErrorKind::DecodingError(DecodingErrorKind::ArpAddressFormat)
        ));
    }

    #[test]
    fn test_bad_opcode_rejected() {
        let mut bytes = sample_request().encode();
        bytes[7] = 3;
        let err = ArpMessage::parse(&bytes).unwrap_err();
        assert!(matches!(
            err,
            ErrorKind::DecodingError(DecodingErrorKind::ArpOperation)
        ));
    }

    #[test]
    fn test_truncated_message_rejected() {
        let bytes = sample_request().encode();
        let err = ArpMessage::parse(&bytes[..20]).unwrap_err();
        assert!(matches!(err, ErrorKind::CouldNotReadHeader(_)));
    }
}
