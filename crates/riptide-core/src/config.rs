use std::default::Default;

use crate::constants::{
    ADDRESS_CACHE_TTL_MS, ARP_REQUEST_TIMEOUT_MS, DEFAULT_RTO_MS, MAX_PAYLOAD_SIZE,
    PENDING_DATAGRAM_LIMIT,
};

/// Configuration options to tune protocol behavior.
///
/// Every component also has a plain constructor taking exactly the
/// parameters it needs; `Config` feeds the `with_config` constructors when a
/// host wants one knob set for the whole stack.
#[derive(Clone, Debug)]
pub struct Config {
    /// Initial retransmission timeout in milliseconds, before any backoff.
    pub initial_rto_ms: u64,
    /// Max payload bytes packed into a single sender segment.
    pub max_payload_size: usize,
    /// How long an outstanding ARP request suppresses re-broadcasts.
    pub arp_request_timeout_ms: u64,
    /// Lifetime of a learned IPv4-to-Ethernet mapping.
    pub address_cache_ttl_ms: u64,
    /// Max datagrams queued per unresolved next hop.
    pub pending_queue_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            initial_rto_ms: DEFAULT_RTO_MS,
            max_payload_size: MAX_PAYLOAD_SIZE,
            arp_request_timeout_ms: ARP_REQUEST_TIMEOUT_MS,
            address_cache_ttl_ms: ADDRESS_CACHE_TTL_MS,
            pending_queue_limit: PENDING_DATAGRAM_LIMIT,
        }
    }
}
