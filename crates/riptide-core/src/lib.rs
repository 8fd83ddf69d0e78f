#![warn(missing_docs)]

//! riptide-core: foundational types shared across the stack.
//!
//! This crate provides the minimal set of core pieces used by every layer:
//! - Protocol constants
//! - Configuration types
//! - Error handling
//! - The bounded byte stream between application and transport
//!
//! Protocol-specific logic lives in the specialized crates:
//! - `riptide-wire`: Ethernet, ARP, and IPv4 wire formats
//! - `riptide-transport`: reassembly and the TCP sender/receiver machines
//! - `riptide-net`: the link-layer interface and the router

/// Protocol constants shared across layers.
pub mod constants {
    /// Maximum payload carried by a single sender segment.
    ///
    /// Derived from ethernet_mtu - ipv4_header_size - tcp_header_size
    ///       1452 = 1500         - 20               - 20 - options slack
    ///
    /// The value is not wire-visible; it only bounds how much a single
    /// `push` call packs into one segment.
    pub const MAX_PAYLOAD_SIZE: usize = 1452;
    /// Default retransmission timeout before any backoff, in milliseconds.
    pub const DEFAULT_RTO_MS: u64 = 1000;
    /// How long a broadcast ARP request suppresses further requests for the
    /// same next hop, in milliseconds.
    pub const ARP_REQUEST_TIMEOUT_MS: u64 = 5000;
    /// Lifetime of a learned IPv4-to-Ethernet mapping, in milliseconds.
    pub const ADDRESS_CACHE_TTL_MS: u64 = 30000;
    /// Datagrams parked per unresolved next hop before new ones are dropped.
    pub const PENDING_DATAGRAM_LIMIT: usize = 8;
    /// Largest window a receiver can advertise in its 16-bit field.
    pub const MAX_WINDOW_SIZE: u64 = 65535;
}

/// Configuration options for the stack.
pub mod config;
/// Error types and results.
pub mod error;
/// Bounded byte stream between a writer role and a reader role.
pub mod stream;

pub use config::Config;
pub use error::{DecodingErrorKind, ErrorKind, Result};
pub use stream::ByteStream;
