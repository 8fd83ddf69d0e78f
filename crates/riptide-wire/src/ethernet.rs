//! Ethernet (DIX) framing.

use std::io::{self, Cursor, Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use riptide_core::error::{DecodingErrorKind, ErrorKind, Result};

/// A 48-bit Ethernet (hardware) address.
pub type EthernetAddress = [u8; 6];

/// The all-ones broadcast address.
pub const ETHERNET_BROADCAST: EthernetAddress = [0xff; 6];

/// EtherType for IPv4 payloads.
pub const ETHERTYPE_IPV4: u16 = 0x0800;
/// EtherType for ARP payloads.
pub const ETHERTYPE_ARP: u16 = 0x0806;

/// Size of the Ethernet header on the wire.
pub const ETHERNET_HEADER_SIZE: usize = 14;

/// The 14-byte Ethernet header: destination, source, EtherType.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EthernetHeader {
    /// Destination hardware address.
    pub dst: EthernetAddress,
    /// Source hardware address.
    pub src: EthernetAddress,
    /// Payload protocol number.
    pub ethertype: u16,
}

impl EthernetHeader {
    fn decode(cursor: &mut Cursor<&[u8]>) -> io::Result<Self> {
        let mut dst = EthernetAddress::default();
        cursor.read_exact(&mut dst)?;
        let mut src = EthernetAddress::default();
        cursor.read_exact(&mut src)?;
        let ethertype = cursor.read_u16::<BigEndian>()?;
        Ok(Self { dst, src, ethertype })
    }

    fn encode_into(&self, buffer: &mut Vec<u8>) -> io::Result<()> {
        buffer.write_all(&self.dst)?;
        buffer.write_all(&self.src)?;
        buffer.write_u16::<BigEndian>(self.ethertype)?;
        Ok(())
    }
}

/// An Ethernet frame: header plus raw payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EthernetFrame {
    /// The frame header.
    pub header: EthernetHeader,
    /// The encapsulated payload bytes.
    pub payload: Vec<u8>,
}

impl EthernetFrame {
    /// Parses a frame from received bytes.
    ///
    /// Only recognized EtherTypes are accepted; the payload is carried
    /// opaquely for the dispatching layer to interpret.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(data);
        let header = EthernetHeader::decode(&mut cursor)
            .map_err(|e| ErrorKind::CouldNotReadHeader(e.to_string()))?;

        if header.ethertype != ETHERTYPE_IPV4 && header.ethertype != ETHERTYPE_ARP {
            return Err(ErrorKind::DecodingError(DecodingErrorKind::EtherType));
        }

        let payload = data[cursor.position() as usize..].to_vec();
        Ok(Self { header, payload })
    }

    /// Encodes the frame into `buffer` (appends bytes).
    pub fn encode_into(&self, buffer: &mut Vec<u8>) -> io::Result<()> {
        self.header.encode_into(buffer)?;
        buffer.write_all(&self.payload)?;
        Ok(())
    }

    /// Convenience wrapper returning the encoded frame as a fresh buffer.
    pub fn encode(&self) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(ETHERNET_HEADER_SIZE + self.payload.len());
        // Writing into a Vec cannot fail.
        self.encode_into(&mut buffer).expect("encoding into a Vec");
        buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let frame = EthernetFrame {
            header: EthernetHeader {
                dst: [1, 2, 3, 4, 5, 6],
                src: [7, 8, 9, 10, 11, 12],
                ethertype: ETHERTYPE_IPV4,
            },
            payload: vec![0xde, 0xad, 0xbe, 0xef],
        };

        let bytes = frame.encode();
        assert_eq!(bytes.len(), ETHERNET_HEADER_SIZE + 4);
        assert_eq!(EthernetFrame::parse(&bytes).unwrap(), frame);
    }

    #[test]
    fn test_truncated_header_rejected() {
        let err = EthernetFrame::parse(&[0u8; 10]).unwrap_err();
        assert!(matches!(err, ErrorKind::CouldNotReadHeader(_)));
    }

    #[test]
    fn test_unknown_ethertype_rejected() {
        let frame = EthernetFrame {
            header: EthernetHeader {
                dst: ETHERNET_BROADCAST,
                src: [0; 6],
                ethertype: 0x86dd,
            },
            payload: Vec::new(),
        };
        let err = EthernetFrame::parse(&frame.encode()).unwrap_err();
        assert!(matches!(
            err,
            ErrorKind::DecodingError(DecodingErrorKind::EtherType)
        ));
    }

    #[test]
    fn test_empty_payload() {
        let frame = EthernetFrame {
            header: EthernetHeader {
                dst: ETHERNET_BROADCAST,
                src: [0xaa; 6],
                ethertype: ETHERTYPE_ARP,
            },
            payload: Vec::new(),
        };
        let parsed = EthernetFrame::parse(&frame.encode()).unwrap();
        assert!(parsed.payload.is_empty());
    }
}
