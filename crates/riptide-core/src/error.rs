use std::{fmt, io};

/// Convenience alias for results produced by the stack.
pub type Result<T> = std::result::Result<T, ErrorKind>;

/// Identifies which field of a wire format failed to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodingErrorKind {
    /// The EtherType field held an unknown protocol number.
    EtherType,
    /// The ARP operation field was neither request nor reply.
    ArpOperation,
    /// The ARP hardware or protocol type was not Ethernet/IPv4.
    ArpAddressFormat,
    /// The IPv4 version field was not 4.
    IpVersion,
    /// The IPv4 header length field was shorter than the fixed header.
    IpHeaderLength,
    /// The IPv4 total length disagreed with the buffer.
    IpTotalLength,
    /// The IPv4 header checksum did not verify.
    IpChecksum,
}

impl fmt::Display for DecodingErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let field = match self {
            DecodingErrorKind::EtherType => "EtherType",
            DecodingErrorKind::ArpOperation => "ARP operation",
            DecodingErrorKind::ArpAddressFormat => "ARP address format",
            DecodingErrorKind::IpVersion => "IP version",
            DecodingErrorKind::IpHeaderLength => "IP header length",
            DecodingErrorKind::IpTotalLength => "IP total length",
            DecodingErrorKind::IpChecksum => "IP header checksum",
        };
        write!(f, "{}", field)
    }
}

/// Errors that can occur inside the stack.
///
/// None of these propagate to the host during normal operation: a frame that
/// fails to parse is dropped where it arrived. The type exists so the wire
/// layer has an honest API and so tests can assert on failure modes.
#[derive(Debug)]
pub enum ErrorKind {
    /// A header could not be read from the supplied bytes.
    CouldNotReadHeader(String),
    /// A field decoded to a value outside its legal range.
    DecodingError(DecodingErrorKind),
    /// The supplied buffer was shorter than the format requires.
    ReceivedDataTooShort,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::CouldNotReadHeader(reason) => {
                write!(f, "could not read header: {}", reason)
            }
            ErrorKind::DecodingError(kind) => write!(f, "unable to decode field: {}", kind),
            ErrorKind::ReceivedDataTooShort => {
                write!(f, "received data too short for the wire format")
            }
        }
    }
}

impl std::error::Error for ErrorKind {}

impl From<io::Error> for ErrorKind {
    fn from(error: io::Error) -> Self {
        ErrorKind::CouldNotReadHeader(error.to_string())
    }
}
