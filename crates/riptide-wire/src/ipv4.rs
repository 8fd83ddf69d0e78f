//! IPv4 header and datagram.

use std::io::{self, Cursor, Read, Write};
use std::net::Ipv4Addr;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use riptide_core::error::{DecodingErrorKind, ErrorKind, Result};

use crate::checksum;

/// Size of the fixed IPv4 header, without options.
pub const IPV4_HEADER_SIZE: usize = 20;
/// Hop limit stamped on locally built datagrams.
pub const DEFAULT_TTL: u8 = 64;

const VERSION: u8 = 4;
const FLAG_DONT_FRAGMENT: u16 = 0x4000;
const FLAG_MORE_FRAGMENTS: u16 = 0x2000;
const FRAGMENT_OFFSET_MASK: u16 = 0x1fff;

/// The IPv4 header (RFC 791).
///
/// Options are carried opaquely; the header length field is derived from
/// them on encode so the two can never disagree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ipv4Header {
    /// Type-of-service / DSCP byte.
    pub tos: u8,
    /// Length of header plus payload, in bytes.
    pub total_length: u16,
    /// Identification field for fragment grouping.
    pub identification: u16,
    /// Don't-fragment flag.
    pub dont_fragment: bool,
    /// More-fragments flag.
    pub more_fragments: bool,
    /// Fragment offset in 8-byte units.
    pub fragment_offset: u16,
    /// Remaining hop count.
    pub ttl: u8,
    /// Payload protocol number.
    pub protocol: u8,
    /// Header checksum as stored on the wire.
    pub checksum: u16,
    /// Source address.
    pub src: Ipv4Addr,
    /// Destination address.
    pub dst: Ipv4Addr,
    /// Raw option bytes, a multiple of 4 long.
    pub options: Vec<u8>,
}

impl Ipv4Header {
    /// Header length in bytes, options included.
    pub fn header_length(&self) -> usize {
        IPV4_HEADER_SIZE + self.options.len()
    }

    /// Parses a header from the front of `data`.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < IPV4_HEADER_SIZE {
            return Err(ErrorKind::ReceivedDataTooShort);
        }

        let mut cursor = Cursor::new(data);
        let version_ihl = cursor.read_u8()?;
        if version_ihl >> 4 != VERSION {
            return Err(ErrorKind::DecodingError(DecodingErrorKind::IpVersion));
        }
        let header_words = usize::from(version_ihl & 0x0f);
        if header_words < 5 {
            return Err(ErrorKind::DecodingError(DecodingErrorKind::IpHeaderLength));
        }
        let header_len = header_words * 4;
        if data.len() < header_len {
            return Err(ErrorKind::ReceivedDataTooShort);
        }

        let tos = cursor.read_u8()?;
        let total_length = cursor.read_u16::<BigEndian>()?;
        if usize::from(total_length) < header_len || usize::from(total_length) > data.len() {
            return Err(ErrorKind::DecodingError(DecodingErrorKind::IpTotalLength));
        }

        let identification = cursor.read_u16::<BigEndian>()?;
        let flags_offset = cursor.read_u16::<BigEndian>()?;
        let ttl = cursor.read_u8()?;
        let protocol = cursor.read_u8()?;
        let stored_checksum = cursor.read_u16::<BigEndian>()?;
        let src = Ipv4Addr::from(cursor.read_u32::<BigEndian>()?);
        let dst = Ipv4Addr::from(cursor.read_u32::<BigEndian>()?);

        let mut options = vec![0u8; header_len - IPV4_HEADER_SIZE];
        cursor.read_exact(&mut options)?;

        if !checksum::verify(&data[..header_len]) {
            return Err(ErrorKind::DecodingError(DecodingErrorKind::IpChecksum));
        }

        Ok(Self {
            tos,
            total_length,
            identification,
            dont_fragment: flags_offset & FLAG_DONT_FRAGMENT != 0,
            more_fragments: flags_offset & FLAG_MORE_FRAGMENTS != 0,
            fragment_offset: flags_offset & FRAGMENT_OFFSET_MASK,
            ttl,
            protocol,
            checksum: stored_checksum,
            src,
            dst,
            options,
        })
    }

    /// Encodes the header into `buffer` (appends bytes).
    ///
    /// The stored `checksum` field is written as-is; call
    /// [`compute_checksum`](Self::compute_checksum) first when the header
    /// has been modified.
    pub fn encode_into(&self, buffer: &mut Vec<u8>) -> io::Result<()> {
        let header_words = (self.header_length() / 4) as u8;
        buffer.write_u8(VERSION << 4 | header_words)?;
        buffer.write_u8(self.tos)?;
        buffer.write_u16::<BigEndian>(self.total_length)?;
        buffer.write_u16::<BigEndian>(self.identification)?;

        let mut flags_offset = self.fragment_offset & FRAGMENT_OFFSET_MASK;
        if self.dont_fragment {
            flags_offset |= FLAG_DONT_FRAGMENT;
        }
        if self.more_fragments {
            flags_offset |= FLAG_MORE_FRAGMENTS;
        }
        buffer.write_u16::<BigEndian>(flags_offset)?;

        buffer.write_u8(self.ttl)?;
        buffer.write_u8(self.protocol)?;
        buffer.write_u16::<BigEndian>(self.checksum)?;
        buffer.write_u32::<BigEndian>(u32::from(self.src))?;
        buffer.write_u32::<BigEndian>(u32::from(self.dst))?;
        buffer.write_all(&self.options)?;
        Ok(())
    }

    /// Resets and recomputes the header checksum in place.
    pub fn compute_checksum(&mut self) {
        self.checksum = 0;
        let mut bytes = Vec::with_capacity(self.header_length());
        self.encode_into(&mut bytes).expect("encoding into a Vec");
        self.checksum = checksum::internet_checksum(&bytes);
    }
}

/// An IPv4 datagram: header plus payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternetDatagram {
    /// The datagram header.
    pub header: Ipv4Header,
    /// The encapsulated payload bytes.
    pub payload: Vec<u8>,
}

impl InternetDatagram {
    /// Builds a datagram with a fresh header and a correct checksum.
    pub fn new(src: Ipv4Addr, dst: Ipv4Addr, protocol: u8, payload: Vec<u8>) -> Self {
        let mut header = Ipv4Header {
            tos: 0,
            total_length: (IPV4_HEADER_SIZE + payload.len()) as u16,
            identification: 0,
            dont_fragment: true,
            more_fragments: false,
            fragment_offset: 0,
            ttl: DEFAULT_TTL,
            protocol,
            checksum: 0,
            src,
            dst,
            options: Vec::new(),
        };
        header.compute_checksum();
        Self { header, payload }
    }

    /// Parses a datagram from received bytes.
    ///
    /// Bytes past the header's `total_length` (link-layer padding) are
    /// ignored.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let header = Ipv4Header::parse(data)?;
        let payload = data[header.header_length()..usize::from(header.total_length)].to_vec();
        Ok(Self { header, payload })
    }

    /// Encodes the datagram into `buffer` (appends bytes).
    pub fn encode_into(&self, buffer: &mut Vec<u8>) -> io::Result<()> {
        self.header.encode_into(buffer)?;
        buffer.write_all(&self.payload)?;
        Ok(())
    }

    /// Convenience wrapper returning the encoded datagram as a fresh buffer.
    pub fn encode(&self) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(usize::from(self.header.total_length));
        self.encode_into(&mut buffer).expect("encoding into a Vec");
        buffer
    }
}
